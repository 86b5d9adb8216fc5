//! # Reservation Service
//!
//! Every mutation follows the same protocol:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  validate input (pure)                                               │
//! │  consult collaborators (reserve only, no transaction held)           │
//! │  BEGIN IMMEDIATE                  ◄── write lock, waits ≤ busy_timeout│
//! │    load reservation / check overlap                                  │
//! │    apply rule (transition table, pricing, policy)                    │
//! │    UPDATE ... WHERE status = <loaded status>                         │
//! │    INSERT history                                                    │
//! │  COMMIT                          (any early return drops → ROLLBACK)  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No pool-level query runs while a transaction is open. With an in-memory
//! database the pool has exactly one connection, which the transaction owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::directory::{CustomerDirectory, ProviderDirectory, ServiceCatalog};
use crate::error::{ReservationError, ReservationResult};
use slotbook_core::pricing::{calculate, effective_total, PricingInput};
use slotbook_core::status::validate_transition;
use slotbook_core::validation::{
    validate_duration, validate_guest, validate_id, validate_name, validate_non_negative,
    validate_text,
};
use slotbook_core::{
    Actor, Cancellation, CancelledBy, ChangeType, CustomerRef, HistoryEntry, Money,
    NewHistoryEntry, NewReservation, PaymentStatus, PricingBreakdown, Reservation,
    ReservationStatus, SlotWindow, TaxRate, ValidationError,
};
use slotbook_db::{
    begin_immediate, Database, DbError, HistoryRepository, ReservationStore, Sqlite,
    StatusStamps, Transaction,
};

// =============================================================================
// Requests
// =============================================================================

/// Input to [`ReservationService::reserve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRequest {
    pub provider_id: String,
    pub customer: CustomerRef,
    pub slot_id: String,
    pub window: SlotWindow,
    pub service: ServiceInfo,
    #[serde(default)]
    pub pricing: PricingInputs,
    #[serde(default)]
    pub notes: Option<String>,
}

/// The service being booked. The name defaults to the catalog's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service_id: String,
    #[serde(default)]
    pub service_name: Option<String>,
}

/// Caller-supplied pricing overrides.
///
/// On `reserve`, unset fields fall back to the catalog price, no discount,
/// and the configured tax rate and currency. On `reprice`, unset fields keep
/// the reservation's current values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingInputs {
    pub service_price: Option<Money>,
    pub discount: Option<Money>,
    pub tax_rate: Option<TaxRate>,
    pub currency: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

/// Orchestrates reservations over storage and collaborator lookups.
pub struct ReservationService {
    db: Database,
    store: ReservationStore,
    history: HistoryRepository,
    providers: Arc<dyn ProviderDirectory>,
    catalog: Arc<dyn ServiceCatalog>,
    customers: Arc<dyn CustomerDirectory>,
    config: ServiceConfig,
}

impl ReservationService {
    pub fn new(
        db: Database,
        config: ServiceConfig,
        providers: Arc<dyn ProviderDirectory>,
        catalog: Arc<dyn ServiceCatalog>,
        customers: Arc<dyn CustomerDirectory>,
    ) -> Self {
        let store = ReservationStore::new(db.pool().clone(), config.reference_prefix.clone());
        let history = db.history();

        ReservationService {
            db,
            store,
            history,
            providers,
            catalog,
            customers,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // -------------------------------------------------------------------------
    // Reserve
    // -------------------------------------------------------------------------

    /// Books a window for a provider.
    ///
    /// The new reservation starts `pending` with payment `pending`. Fails with
    /// `SlotConflict` when any slot-holding reservation of the provider
    /// overlaps the window, including one committed concurrently.
    pub async fn reserve(&self, request: ReserveRequest) -> ReservationResult<Reservation> {
        validate_reserve_request(&request)?;

        let ReserveRequest {
            provider_id,
            customer,
            slot_id,
            window,
            service,
            pricing,
            notes,
        } = request;

        let provider = self
            .providers
            .find_provider(&provider_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("Provider", &provider_id))?;
        if !provider.active {
            return Err(inactive("provider_id"));
        }

        if let CustomerRef::Registered { customer_id } = &customer {
            self.customers
                .find_customer(customer_id)
                .await?
                .ok_or_else(|| ReservationError::not_found("Customer", customer_id))?;
        }

        let definition = self
            .catalog
            .find_service(&service.service_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("Service", &service.service_id))?;
        if !definition.active {
            return Err(inactive("service_id"));
        }
        validate_duration(&window, definition.duration_minutes)?;

        let service_name = service.service_name.unwrap_or(definition.name);
        validate_name("service_name", &service_name)?;

        let pricing_input = PricingInput {
            service_price: pricing.service_price.unwrap_or(definition.price),
            discount: pricing.discount.unwrap_or_else(Money::zero),
            tax_rate: pricing.tax_rate.unwrap_or(self.config.default_tax_rate),
            currency: pricing
                .currency
                .or(definition.currency)
                .unwrap_or_else(|| self.config.default_currency.clone()),
        };

        let mut tx = begin_immediate(self.db.pool()).await?;

        if self
            .store
            .check_conflict_for_update(&mut tx, &provider_id, &window, None)
            .await?
        {
            warn!(provider_id = %provider_id, %window, "Slot conflict");
            return Err(ReservationError::SlotConflict {
                provider_id,
                window: window.to_string(),
            });
        }

        let breakdown = calculate(&pricing_input)?;

        let actor = match &customer {
            CustomerRef::Registered { customer_id } => Actor::customer(customer_id.clone()),
            CustomerRef::Guest(_) => Actor::guest(),
        };

        let reservation = self
            .store
            .create_in_transaction(
                &mut tx,
                &NewReservation {
                    provider_id,
                    customer,
                    service_id: service.service_id,
                    service_name,
                    slot_id,
                    window,
                    pricing: breakdown,
                    notes,
                },
            )
            .await?;

        self.history
            .append(
                &mut tx,
                &NewHistoryEntry {
                    reservation_id: reservation.id,
                    change_type: ChangeType::Created,
                    before: None,
                    after: created_snapshot(&reservation),
                    actor,
                    reason: None,
                },
            )
            .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            reservation_id = reservation.id,
            reference = %reservation.reference_code,
            provider_id = %reservation.provider_id,
            window = %reservation.window,
            total = %reservation.pricing.total,
            "Reservation created"
        );

        Ok(reservation)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Moves a reservation to `target` along the transition table.
    ///
    /// Entering `in_progress` stamps the actual start, entering `completed`
    /// the actual end. A cancelled target records cancellation metadata the
    /// same way [`cancel`](Self::cancel) does, which is how an in-progress
    /// reservation gets called off.
    pub async fn change_status(
        &self,
        id: i64,
        target: ReservationStatus,
        actor: Actor,
    ) -> ReservationResult<Reservation> {
        let (mut tx, current) = self.lock(id).await?;
        validate_transition(current.status, target)?;

        let now = Utc::now();
        match target {
            ReservationStatus::Cancelled(by) => {
                let cancellation = self.cancellation_for(&current, by, &actor, None, now);
                self.store
                    .cancel(&mut tx, id, current.status, &cancellation)
                    .await?;
            }
            _ => {
                let stamps = StatusStamps {
                    actual_start: (target == ReservationStatus::InProgress).then_some(now),
                    actual_end: (target == ReservationStatus::Completed).then_some(now),
                };
                self.store
                    .update_status(&mut tx, id, current.status, target, stamps)
                    .await?;
            }
        }

        let updated = self
            .commit_with_history(
                tx,
                NewHistoryEntry {
                    reservation_id: id,
                    change_type: ChangeType::StatusChanged,
                    before: Some(json!({ "status": current.status.as_str() })),
                    after: json!({ "status": target.as_str() }),
                    actor,
                    reason: None,
                },
            )
            .await?;

        info!(reservation_id = id, from = %current.status, to = %target, "Status changed");
        Ok(updated)
    }

    /// Moves a reservation to a new window of the same length.
    ///
    /// The reservation's own current window is ignored by the overlap check,
    /// so shifting by less than its duration is allowed. Status is unchanged.
    pub async fn reschedule(
        &self,
        id: i64,
        new_window: SlotWindow,
        actor: Actor,
    ) -> ReservationResult<Reservation> {
        let (mut tx, current) = self.lock(id).await?;
        ensure_modifiable(&current)?;

        if new_window.duration() != current.window.duration() {
            return Err(ValidationError::WrongDuration {
                field: "window".to_string(),
                expected_minutes: current.window.minutes(),
                actual_minutes: new_window.minutes(),
            }
            .into());
        }

        if self
            .store
            .check_conflict_for_update(&mut tx, &current.provider_id, &new_window, Some(id))
            .await?
        {
            warn!(reservation_id = id, provider_id = %current.provider_id, window = %new_window, "Slot conflict on reschedule");
            return Err(ReservationError::SlotConflict {
                provider_id: current.provider_id,
                window: new_window.to_string(),
            });
        }

        self.store
            .update_schedule(&mut tx, id, current.status, &new_window)
            .await?;

        let updated = self
            .commit_with_history(
                tx,
                NewHistoryEntry {
                    reservation_id: id,
                    change_type: ChangeType::Rescheduled,
                    before: Some(window_snapshot(&current.window)),
                    after: window_snapshot(&new_window),
                    actor,
                    reason: None,
                },
            )
            .await?;

        info!(reservation_id = id, from = %current.window, to = %new_window, "Reservation rescheduled");
        Ok(updated)
    }

    /// Cancels a `pending` or `confirmed` reservation on behalf of `actor`.
    ///
    /// Customers produce `cancelled_by_customer`; providers and the system
    /// produce `cancelled_by_provider`. The fee comes from the configured
    /// [`CancellationPolicy`](slotbook_core::CancellationPolicy).
    pub async fn cancel(
        &self,
        id: i64,
        actor: Actor,
        reason: Option<String>,
    ) -> ReservationResult<Reservation> {
        validate_text("reason", reason.as_deref())?;

        let (mut tx, current) = self.lock(id).await?;
        if !current.status.is_cancellable() {
            return Err(ReservationError::CancellationNotAllowed {
                reservation_id: id,
                status: current.status.to_string(),
            });
        }

        let by = actor.role.cancels_as();
        let target = ReservationStatus::Cancelled(by);
        validate_transition(current.status, target)?;

        let cancellation = self.cancellation_for(&current, by, &actor, reason.clone(), Utc::now());
        self.store
            .cancel(&mut tx, id, current.status, &cancellation)
            .await?;

        let updated = self
            .commit_with_history(
                tx,
                NewHistoryEntry {
                    reservation_id: id,
                    change_type: ChangeType::Cancelled,
                    before: Some(json!({ "status": current.status.as_str() })),
                    after: json!({
                        "status": target.as_str(),
                        "fee_cents": cancellation.fee.cents(),
                    }),
                    actor,
                    reason,
                },
            )
            .await?;

        info!(reservation_id = id, status = %target, fee = %cancellation.fee, "Reservation cancelled");
        Ok(updated)
    }

    // -------------------------------------------------------------------------
    // Money
    // -------------------------------------------------------------------------

    /// Moves the payment status. Allowed in every reservation status,
    /// including terminal ones, so completed work can still be settled.
    pub async fn update_payment_status(
        &self,
        id: i64,
        to: PaymentStatus,
        actor: Actor,
    ) -> ReservationResult<Reservation> {
        let (mut tx, current) = self.lock(id).await?;
        current.payment_status.validate_transition(to)?;

        self.store
            .update_payment_status(&mut tx, id, current.payment_status, to)
            .await?;

        let updated = self
            .commit_with_history(
                tx,
                NewHistoryEntry {
                    reservation_id: id,
                    change_type: ChangeType::PaymentStatusChanged,
                    before: Some(json!({ "payment_status": current.payment_status.as_str() })),
                    after: json!({ "payment_status": to.as_str() }),
                    actor,
                    reason: None,
                },
            )
            .await?;

        info!(reservation_id = id, from = %current.payment_status, %to, "Payment status changed");
        Ok(updated)
    }

    /// Recomputes the breakdown of a non-terminal reservation.
    pub async fn reprice(
        &self,
        id: i64,
        inputs: PricingInputs,
        actor: Actor,
    ) -> ReservationResult<Reservation> {
        let (mut tx, current) = self.lock(id).await?;
        ensure_modifiable(&current)?;

        let breakdown = calculate(&PricingInput {
            service_price: inputs
                .service_price
                .unwrap_or(current.pricing.service_price),
            discount: inputs.discount.unwrap_or(current.pricing.discount),
            tax_rate: inputs.tax_rate.unwrap_or(current.pricing.tax_rate),
            currency: inputs
                .currency
                .unwrap_or_else(|| current.pricing.currency.clone()),
        })?;

        self.store
            .update_pricing(&mut tx, id, current.status, &breakdown)
            .await?;

        let updated = self
            .commit_with_history(
                tx,
                NewHistoryEntry {
                    reservation_id: id,
                    change_type: ChangeType::Repriced,
                    before: Some(pricing_snapshot(&current.pricing)),
                    after: pricing_snapshot(&breakdown),
                    actor,
                    reason: None,
                },
            )
            .await?;

        info!(reservation_id = id, from = %current.pricing.total, to = %breakdown.total, "Reservation repriced");
        Ok(updated)
    }

    /// Sets the tip of a non-terminal reservation. The tip sits outside the
    /// tax base.
    pub async fn record_tip(
        &self,
        id: i64,
        tip: Money,
        actor: Actor,
    ) -> ReservationResult<Reservation> {
        let (mut tx, current) = self.lock(id).await?;
        ensure_modifiable(&current)?;
        let total = effective_total(&current.pricing, tip)?;

        self.store
            .update_tip(&mut tx, id, current.status, tip)
            .await?;

        let updated = self
            .commit_with_history(
                tx,
                NewHistoryEntry {
                    reservation_id: id,
                    change_type: ChangeType::TipRecorded,
                    before: Some(json!({ "tip_cents": current.tip.cents() })),
                    after: json!({ "tip_cents": tip.cents() }),
                    actor,
                    reason: None,
                },
            )
            .await?;

        info!(reservation_id = id, %tip, effective_total = %total, "Tip recorded");
        Ok(updated)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub async fn get(&self, id: i64) -> ReservationResult<Reservation> {
        Ok(self.store.find_by_id(id).await?)
    }

    pub async fn get_by_uuid(&self, uuid: &str) -> ReservationResult<Reservation> {
        Ok(self.store.find_by_uuid(uuid).await?)
    }

    /// Case-insensitive lookup by the customer-facing code.
    pub async fn get_by_reference(&self, reference_code: &str) -> ReservationResult<Reservation> {
        Ok(self.store.find_by_reference(reference_code).await?)
    }

    /// Audit trail of a reservation, newest first.
    pub async fn get_history(&self, id: i64) -> ReservationResult<Vec<HistoryEntry>> {
        self.store.find_by_id(id).await?;
        Ok(self.history.for_reservation(id).await?)
    }

    /// Whether `window` overlaps a slot-holding reservation of `provider_id`,
    /// ignoring `exclude_id`. Advisory: only `reserve` and `reschedule` check
    /// under the write lock.
    pub async fn check_conflict(
        &self,
        provider_id: &str,
        window: &SlotWindow,
        exclude_id: Option<i64>,
    ) -> ReservationResult<bool> {
        validate_id("provider_id", provider_id)?;
        Ok(self
            .store
            .check_conflict(provider_id, window, exclude_id)
            .await?)
    }

    /// Reservations of a provider overlapping `window`, by start time.
    pub async fn list_for_provider(
        &self,
        provider_id: &str,
        window: &SlotWindow,
    ) -> ReservationResult<Vec<Reservation>> {
        validate_id("provider_id", provider_id)?;
        Ok(self.store.list_for_provider(provider_id, window).await?)
    }

    // -------------------------------------------------------------------------
    // Transaction Helpers
    // -------------------------------------------------------------------------

    /// Opens a write transaction and loads the reservation inside it.
    async fn lock(&self, id: i64) -> ReservationResult<(Transaction<'static, Sqlite>, Reservation)> {
        let mut tx = begin_immediate(self.db.pool()).await?;
        let current = self.store.find_by_id_for_update(&mut tx, id).await?;
        debug!(reservation_id = id, status = %current.status, "Reservation locked");
        Ok((tx, current))
    }

    /// Appends `entry`, re-reads the reservation and commits.
    async fn commit_with_history(
        &self,
        mut tx: Transaction<'static, Sqlite>,
        entry: NewHistoryEntry,
    ) -> ReservationResult<Reservation> {
        self.history.append(&mut tx, &entry).await?;
        let updated = self
            .store
            .find_by_id_for_update(&mut tx, entry.reservation_id)
            .await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(updated)
    }

    fn cancellation_for(
        &self,
        current: &Reservation,
        by: CancelledBy,
        actor: &Actor,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Cancellation {
        Cancellation {
            cancelled_by: by,
            actor_id: actor.id.clone(),
            cancelled_at: now,
            reason,
            fee: self.config.cancellation.fee(
                by,
                now,
                current.window.start(),
                current.pricing.total,
            ),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_reserve_request(request: &ReserveRequest) -> ReservationResult<()> {
    validate_id("provider_id", &request.provider_id)?;
    validate_id("slot_id", &request.slot_id)?;
    validate_id("service_id", &request.service.service_id)?;
    if let Some(name) = &request.service.service_name {
        validate_name("service_name", name)?;
    }

    match &request.customer {
        CustomerRef::Registered { customer_id } => validate_id("customer_id", customer_id)?,
        CustomerRef::Guest(contact) => validate_guest(contact)?,
    }

    if let Some(price) = request.pricing.service_price {
        validate_non_negative("service_price", price)?;
    }
    validate_text("notes", request.notes.as_deref())?;

    Ok(())
}

fn ensure_modifiable(reservation: &Reservation) -> ReservationResult<()> {
    if reservation.is_terminal() {
        return Err(ReservationError::CannotModifyTerminal {
            reservation_id: reservation.id,
            status: reservation.status.to_string(),
        });
    }
    Ok(())
}

fn inactive(field: &str) -> ReservationError {
    ValidationError::Inactive {
        field: field.to_string(),
    }
    .into()
}

fn window_snapshot(window: &SlotWindow) -> Value {
    json!({
        "start": window.start().to_rfc3339(),
        "end": window.end().to_rfc3339(),
    })
}

fn pricing_snapshot(pricing: &PricingBreakdown) -> Value {
    json!({
        "service_price_cents": pricing.service_price.cents(),
        "discount_cents": pricing.discount.cents(),
        "sub_total_cents": pricing.sub_total.cents(),
        "tax_rate_bps": pricing.tax_rate.bps(),
        "tax_cents": pricing.tax.cents(),
        "total_cents": pricing.total.cents(),
        "currency": pricing.currency,
    })
}

fn created_snapshot(reservation: &Reservation) -> Value {
    json!({
        "reference_code": reservation.reference_code,
        "provider_id": reservation.provider_id,
        "service_id": reservation.service_id,
        "status": reservation.status.as_str(),
        "payment_status": reservation.payment_status.as_str(),
        "window": window_snapshot(&reservation.window),
        "pricing": pricing_snapshot(&reservation.pricing),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{
        CustomerInfo, InMemoryDirectory, LookupError, ProviderInfo, ServiceDefinition,
    };
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use slotbook_core::{ActorRole, CancellationPolicy, GuestContact};
    use slotbook_db::DbConfig;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    fn window(hour: u32, minute: u32, minutes: i64) -> SlotWindow {
        SlotWindow::starting_at(at(hour, minute), minutes).unwrap()
    }

    async fn directory() -> Arc<InMemoryDirectory> {
        let directory = Arc::new(InMemoryDirectory::new());
        for (id, active) in [("prov-1", true), ("prov-2", true), ("prov-off", false)] {
            directory
                .put_provider(ProviderInfo {
                    provider_id: id.to_string(),
                    display_name: id.to_uppercase(),
                    active,
                })
                .await;
        }
        directory
            .put_service(ServiceDefinition {
                service_id: "svc-cut".to_string(),
                name: "Haircut".to_string(),
                duration_minutes: 30,
                price: Money::from_cents(5000),
                currency: None,
                active: true,
            })
            .await;
        directory
            .put_service(ServiceDefinition {
                service_id: "svc-retired".to_string(),
                name: "Perm".to_string(),
                duration_minutes: 30,
                price: Money::from_cents(9000),
                currency: None,
                active: false,
            })
            .await;
        directory
            .put_customer(CustomerInfo {
                customer_id: "cust-1".to_string(),
                name: "Bo".to_string(),
                email: Some("bo@example.com".to_string()),
            })
            .await;
        directory
    }

    async fn service_with(db: Database, config: ServiceConfig) -> ReservationService {
        let directory = directory().await;
        ReservationService::new(
            db,
            config,
            directory.clone(),
            directory.clone(),
            directory,
        )
    }

    async fn service() -> ReservationService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        service_with(db, ServiceConfig::default()).await
    }

    fn request(provider_id: &str, window: SlotWindow) -> ReserveRequest {
        ReserveRequest {
            provider_id: provider_id.to_string(),
            customer: CustomerRef::Registered {
                customer_id: "cust-1".to_string(),
            },
            slot_id: "slot-1".to_string(),
            window,
            service: ServiceInfo {
                service_id: "svc-cut".to_string(),
                service_name: None,
            },
            pricing: PricingInputs::default(),
            notes: None,
        }
    }

    fn validation_field(err: &ReservationError) -> Option<&str> {
        match err {
            ReservationError::Validation(v) => Some(v.field()),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Reserve
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_reserve_prices_and_records_creation() {
        let service = service().await;
        let mut req = request("prov-1", window(10, 0, 30));
        req.pricing = PricingInputs {
            service_price: Some(Money::from_cents(10000)),
            discount: Some(Money::from_cents(1000)),
            tax_rate: TaxRate::parse_fraction("0.08"),
            currency: None,
        };

        let reservation = service.reserve(req).await.unwrap();

        assert_eq!(reservation.status, ReservationStatus::Pending);
        assert_eq!(reservation.payment_status, PaymentStatus::Pending);
        assert_eq!(reservation.service_name, "Haircut");
        assert_eq!(reservation.pricing.sub_total, Money::from_cents(9000));
        assert_eq!(reservation.pricing.tax, Money::from_cents(720));
        assert_eq!(reservation.pricing.total, Money::from_cents(9720));
        assert_eq!(reservation.pricing.currency, "USD");
        assert!(reservation.reference_code.starts_with("RSV-"));

        let history = service.get_history(reservation.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].change_type, ChangeType::Created);
        assert_eq!(history[0].actor, Actor::customer("cust-1"));
        assert_eq!(history[0].after["pricing"]["total_cents"], 9720);
    }

    #[tokio::test]
    async fn test_reserve_defaults_to_catalog_price_and_config() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = ServiceConfig {
            default_currency: "EUR".to_string(),
            default_tax_rate: TaxRate::from_bps(1000),
            reference_prefix: "BK".to_string(),
            ..ServiceConfig::default()
        };
        let service = service_with(db, config).await;

        let reservation = service.reserve(request("prov-1", window(9, 0, 30))).await.unwrap();

        assert_eq!(reservation.pricing.service_price, Money::from_cents(5000));
        assert_eq!(reservation.pricing.tax, Money::from_cents(500));
        assert_eq!(reservation.pricing.total, Money::from_cents(5500));
        assert_eq!(reservation.pricing.currency, "EUR");
        assert!(reservation.reference_code.starts_with("BK-"));
    }

    #[tokio::test]
    async fn test_guest_reservation() {
        let service = service().await;
        let mut req = request("prov-1", window(11, 0, 30));
        req.customer = CustomerRef::Guest(GuestContact {
            name: "Walk In".to_string(),
            email: "walkin@example.com".to_string(),
            phone: None,
        });

        let reservation = service.reserve(req).await.unwrap();

        assert!(reservation.customer.guest().is_some());
        let history = service.get_history(reservation.id).await.unwrap();
        assert_eq!(history[0].actor, Actor::guest());
    }

    #[tokio::test]
    async fn test_overlap_rules() {
        let service = service().await;
        service.reserve(request("prov-1", window(10, 0, 30))).await.unwrap();

        let err = service
            .reserve(request("prov-1", window(10, 15, 30)))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::SlotConflict { ref provider_id, .. } if provider_id == "prov-1"));
        assert!(!err.is_retryable());

        // Back-to-back on either side.
        service.reserve(request("prov-1", window(10, 30, 30))).await.unwrap();
        service.reserve(request("prov-1", window(9, 30, 30))).await.unwrap();

        // Another provider is unaffected.
        service.reserve(request("prov-2", window(10, 15, 30))).await.unwrap();

        let day = SlotWindow::new(at(0, 0), at(23, 59)).unwrap();
        let booked = service.list_for_provider("prov-1", &day).await.unwrap();
        assert_eq!(booked.len(), 3);
        assert!(booked.windows(2).all(|w| w[0].window.start() <= w[1].window.start()));
    }

    #[tokio::test]
    async fn test_rejected_reserve_leaves_nothing_behind() {
        let service = service().await;
        let mut req = request("prov-1", window(10, 0, 30));
        req.pricing.discount = Some(Money::from_cents(6000));

        let err = service.reserve(req).await.unwrap_err();
        assert!(matches!(
            err,
            ReservationError::InvalidPricingInput(slotbook_core::PricingError::DiscountExceedsPrice { .. })
        ));

        assert!(!service
            .check_conflict("prov-1", &window(10, 0, 30), None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_reserve_validation() {
        let service = service().await;

        let mut req = request("", window(10, 0, 30));
        let err = service.reserve(req.clone()).await.unwrap_err();
        assert_eq!(validation_field(&err), Some("provider_id"));

        // A padded id would be stored verbatim and never match the conflict
        // check for the bare id, so it is refused outright.
        let err = service
            .reserve(request(" prov-1", window(10, 0, 30)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReservationError::Validation(ValidationError::InvalidFormat { ref field, .. })
                if field == "provider_id"
        ));
        req = request("prov-1", window(10, 0, 30));
        req.slot_id = "slot-1 ".to_string();
        let err = service.reserve(req).await.unwrap_err();
        assert_eq!(validation_field(&err), Some("slot_id"));

        req = request("prov-1", window(10, 0, 30));
        req.customer = CustomerRef::Guest(GuestContact {
            name: "Walk In".to_string(),
            email: "not-an-email".to_string(),
            phone: None,
        });
        let err = service.reserve(req).await.unwrap_err();
        assert_eq!(validation_field(&err), Some("guest.email"));

        req = request("prov-1", window(10, 0, 30));
        req.pricing.service_price = Some(Money::from_cents(-1));
        let err = service.reserve(req).await.unwrap_err();
        assert_eq!(validation_field(&err), Some("service_price"));

        let err = service
            .reserve(request("prov-1", window(10, 0, 45)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReservationError::Validation(ValidationError::WrongDuration {
                expected_minutes: 30,
                actual_minutes: 45,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_reserve_consults_collaborators() {
        let service = service().await;

        let err = service
            .reserve(request("prov-404", window(10, 0, 30)))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::NotFound { ref entity, .. } if entity == "Provider"));

        let err = service
            .reserve(request("prov-off", window(10, 0, 30)))
            .await
            .unwrap_err();
        assert_eq!(validation_field(&err), Some("provider_id"));

        let mut req = request("prov-1", window(10, 0, 30));
        req.customer = CustomerRef::Registered {
            customer_id: "cust-404".to_string(),
        };
        let err = service.reserve(req).await.unwrap_err();
        assert!(matches!(err, ReservationError::NotFound { ref entity, .. } if entity == "Customer"));

        let mut req = request("prov-1", window(10, 0, 30));
        req.service.service_id = "svc-retired".to_string();
        let err = service.reserve(req).await.unwrap_err();
        assert_eq!(validation_field(&err), Some("service_id"));

        let mut req = request("prov-1", window(10, 0, 30));
        req.service.service_id = "svc-404".to_string();
        let err = service.reserve(req).await.unwrap_err();
        assert!(matches!(err, ReservationError::NotFound { ref entity, .. } if entity == "Service"));
    }

    struct DownDirectory;

    #[async_trait]
    impl ProviderDirectory for DownDirectory {
        async fn find_provider(
            &self,
            _provider_id: &str,
        ) -> Result<Option<ProviderInfo>, LookupError> {
            Err(LookupError::Unavailable("provider directory offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_collaborator_failure_is_unavailable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let directory = directory().await;
        let service = ReservationService::new(
            db,
            ServiceConfig::default(),
            Arc::new(DownDirectory),
            directory.clone(),
            directory,
        );

        let err = service
            .reserve(request("prov-1", window(10, 0, 30)))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::Unavailable(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_reserves_admit_one() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig {
            max_connections: 8,
            ..DbConfig::new(dir.path().join("slotbook.db"))
        })
        .await
        .unwrap();
        let service = Arc::new(service_with(db, ServiceConfig::default()).await);

        // Starts 10:00..10:25, all 30 minutes long: every pair overlaps.
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .reserve(request("prov-1", window(10, i * 5, 30)))
                        .await
                })
            })
            .collect();

        let mut admitted = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(ReservationError::SlotConflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(conflicts, 5);
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_full_lifecycle_stamps_actual_times() {
        let service = service().await;
        let reservation = service.reserve(request("prov-1", window(10, 0, 30))).await.unwrap();
        let id = reservation.id;
        let provider = Actor::provider("prov-1");

        let confirmed = service
            .change_status(id, ReservationStatus::Confirmed, provider.clone())
            .await
            .unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);
        assert!(confirmed.actual_start.is_none());

        let started = service
            .change_status(id, ReservationStatus::InProgress, provider.clone())
            .await
            .unwrap();
        assert!(started.actual_start.is_some());
        assert!(started.actual_end.is_none());

        let done = service
            .change_status(id, ReservationStatus::Completed, provider)
            .await
            .unwrap();
        assert_eq!(done.status, ReservationStatus::Completed);
        assert_eq!(done.actual_start, started.actual_start);
        assert!(done.actual_end.is_some());

        let history = service.get_history(id).await.unwrap();
        let changes: Vec<_> = history.iter().map(|h| h.change_type).collect();
        assert_eq!(
            changes,
            vec![
                ChangeType::StatusChanged,
                ChangeType::StatusChanged,
                ChangeType::StatusChanged,
                ChangeType::Created,
            ]
        );
        assert_eq!(history[0].before, Some(json!({ "status": "in_progress" })));
        assert_eq!(history[0].after, json!({ "status": "completed" }));
        assert_eq!(history[0].actor.role, ActorRole::Provider);
    }

    #[tokio::test]
    async fn test_repeated_transition_is_rejected() {
        let service = service().await;
        let id = service
            .reserve(request("prov-1", window(10, 0, 30)))
            .await
            .unwrap()
            .id;

        service
            .change_status(id, ReservationStatus::Confirmed, Actor::system())
            .await
            .unwrap();
        let err = service
            .change_status(id, ReservationStatus::Confirmed, Actor::system())
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::IllegalTransition { ref from, ref to, .. }
            if from == "confirmed" && to == "confirmed"));

        // Exactly one status change recorded.
        assert_eq!(service.get_history(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_illegal_transition_lists_allowed_targets() {
        let service = service().await;
        let id = service
            .reserve(request("prov-1", window(10, 0, 30)))
            .await
            .unwrap()
            .id;

        let err = service
            .change_status(id, ReservationStatus::InProgress, Actor::system())
            .await
            .unwrap_err();
        match err {
            ReservationError::IllegalTransition { allowed, .. } => {
                assert!(allowed.contains(&"confirmed".to_string()));
                assert!(allowed.contains(&"no_show".to_string()));
                assert!(!allowed.contains(&"in_progress".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = service
            .change_status(9999, ReservationStatus::Confirmed, Actor::system())
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_no_show_releases_slot() {
        let service = service().await;
        let id = service
            .reserve(request("prov-1", window(10, 0, 30)))
            .await
            .unwrap()
            .id;

        service
            .change_status(id, ReservationStatus::NoShow, Actor::provider("prov-1"))
            .await
            .unwrap();

        assert!(!service
            .check_conflict("prov-1", &window(10, 0, 30), None)
            .await
            .unwrap());
    }

    // -------------------------------------------------------------------------
    // Cancel
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cancel_variant_follows_actor_and_frees_slot() {
        let service = service().await;
        let first = service.reserve(request("prov-1", window(10, 0, 30))).await.unwrap();
        let second = service.reserve(request("prov-1", window(11, 0, 30))).await.unwrap();
        let third = service.reserve(request("prov-1", window(12, 0, 30))).await.unwrap();

        let by_customer = service
            .cancel(first.id, Actor::customer("cust-1"), Some("sick".to_string()))
            .await
            .unwrap();
        assert_eq!(
            by_customer.status,
            ReservationStatus::Cancelled(CancelledBy::Customer)
        );
        let meta = by_customer.cancellation.unwrap();
        assert_eq!(meta.actor_id.as_deref(), Some("cust-1"));
        assert_eq!(meta.reason.as_deref(), Some("sick"));

        let by_provider = service
            .cancel(second.id, Actor::provider("prov-1"), None)
            .await
            .unwrap();
        assert_eq!(
            by_provider.status,
            ReservationStatus::Cancelled(CancelledBy::Provider)
        );

        let by_system = service.cancel(third.id, Actor::system(), None).await.unwrap();
        assert_eq!(
            by_system.status,
            ReservationStatus::Cancelled(CancelledBy::Provider)
        );

        // The freed window can be booked again.
        service.reserve(request("prov-1", window(10, 0, 30))).await.unwrap();

        let history = service.get_history(first.id).await.unwrap();
        assert_eq!(history[0].change_type, ChangeType::Cancelled);
        assert_eq!(history[0].reason.as_deref(), Some("sick"));
    }

    #[tokio::test]
    async fn test_cancel_outside_allow_list() {
        let service = service().await;
        let id = service
            .reserve(request("prov-1", window(10, 0, 30)))
            .await
            .unwrap()
            .id;
        for status in [ReservationStatus::Confirmed, ReservationStatus::InProgress] {
            service.change_status(id, status, Actor::system()).await.unwrap();
        }

        let err = service
            .cancel(id, Actor::customer("cust-1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::CancellationNotAllowed { ref status, .. } if status == "in_progress"));

        // The transition table still permits calling off work in progress.
        let cancelled = service
            .change_status(
                id,
                ReservationStatus::Cancelled(CancelledBy::Provider),
                Actor::provider("prov-1"),
            )
            .await
            .unwrap();
        assert_eq!(
            cancelled.cancellation.unwrap().cancelled_by,
            CancelledBy::Provider
        );

        let err = service.cancel(id, Actor::system(), None).await.unwrap_err();
        assert!(matches!(err, ReservationError::CancellationNotAllowed { .. }));
    }

    #[tokio::test]
    async fn test_cancel_completed_fails() {
        let service = service().await;
        let id = service
            .reserve(request("prov-1", window(10, 0, 30)))
            .await
            .unwrap()
            .id;
        for status in [
            ReservationStatus::Confirmed,
            ReservationStatus::InProgress,
            ReservationStatus::Completed,
        ] {
            service.change_status(id, status, Actor::system()).await.unwrap();
        }

        let err = service
            .cancel(id, Actor::customer("cust-1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::CancellationNotAllowed { .. }));
        assert_eq!(
            service.get(id).await.unwrap().status,
            ReservationStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_late_customer_cancellation_pays_fee() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = ServiceConfig {
            cancellation: CancellationPolicy {
                free_cancellation_window: Duration::hours(24),
                fee_bps: 5000,
            },
            ..ServiceConfig::default()
        };
        let service = service_with(db, config).await;

        let soon = SlotWindow::starting_at(Utc::now() + Duration::hours(2), 30).unwrap();
        let later = SlotWindow::starting_at(Utc::now() + Duration::days(3), 30).unwrap();
        let late = service.reserve(request("prov-1", soon)).await.unwrap();
        let early = service.reserve(request("prov-1", later)).await.unwrap();
        let by_provider = service.reserve(request("prov-2", soon)).await.unwrap();

        let late = service
            .cancel(late.id, Actor::customer("cust-1"), None)
            .await
            .unwrap();
        assert_eq!(late.cancellation.unwrap().fee, Money::from_cents(2500));

        let early = service
            .cancel(early.id, Actor::customer("cust-1"), None)
            .await
            .unwrap();
        assert_eq!(early.cancellation.unwrap().fee, Money::zero());

        let by_provider = service
            .cancel(by_provider.id, Actor::provider("prov-2"), None)
            .await
            .unwrap();
        assert_eq!(by_provider.cancellation.unwrap().fee, Money::zero());
    }

    // -------------------------------------------------------------------------
    // Reschedule
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_reschedule_keeps_status_and_excludes_itself() {
        let service = service().await;
        let reservation = service.reserve(request("prov-1", window(10, 0, 30))).await.unwrap();

        // Overlaps only its own current window.
        let moved = service
            .reschedule(reservation.id, window(10, 15, 30), Actor::customer("cust-1"))
            .await
            .unwrap();
        assert_eq!(moved.status, ReservationStatus::Pending);
        assert_eq!(moved.window, window(10, 15, 30));
        assert_eq!(moved.pricing, reservation.pricing);

        let history = service.get_history(reservation.id).await.unwrap();
        assert_eq!(history[0].change_type, ChangeType::Rescheduled);
        assert_eq!(
            history[0].before.as_ref().unwrap()["start"],
            at(10, 0).to_rfc3339()
        );
    }

    #[tokio::test]
    async fn test_reschedule_rejections() {
        let service = service().await;
        let id = service
            .reserve(request("prov-1", window(10, 0, 30)))
            .await
            .unwrap()
            .id;
        service.reserve(request("prov-1", window(11, 0, 30))).await.unwrap();

        let err = service
            .reschedule(id, window(10, 45, 30), Actor::system())
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::SlotConflict { .. }));

        let err = service
            .reschedule(id, window(13, 0, 60), Actor::system())
            .await
            .unwrap_err();
        assert_eq!(validation_field(&err), Some("window"));

        service.cancel(id, Actor::system(), None).await.unwrap();
        let err = service
            .reschedule(id, window(13, 0, 30), Actor::system())
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::CannotModifyTerminal { .. }));

        assert_eq!(service.get(id).await.unwrap().window, window(10, 0, 30));
    }

    // -------------------------------------------------------------------------
    // Money
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_payment_lifecycle_including_terminal_reservations() {
        let service = service().await;
        let id = service
            .reserve(request("prov-1", window(10, 0, 30)))
            .await
            .unwrap()
            .id;
        service
            .change_status(id, ReservationStatus::NoShow, Actor::system())
            .await
            .unwrap();

        let paid = service
            .update_payment_status(id, PaymentStatus::Paid, Actor::system())
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);

        let err = service
            .update_payment_status(id, PaymentStatus::Pending, Actor::system())
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::IllegalTransition { .. }));

        let refunded = service
            .update_payment_status(id, PaymentStatus::Refunded, Actor::system())
            .await
            .unwrap();
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);

        let history = service.get_history(id).await.unwrap();
        assert_eq!(history[0].change_type, ChangeType::PaymentStatusChanged);
        assert_eq!(history[0].after, json!({ "payment_status": "refunded" }));
    }

    #[tokio::test]
    async fn test_reprice_keeps_unset_inputs() {
        let service = service().await;
        let mut req = request("prov-1", window(10, 0, 30));
        req.pricing.tax_rate = TaxRate::parse_fraction("0.08");
        let reservation = service.reserve(req).await.unwrap();
        assert_eq!(reservation.pricing.total, Money::from_cents(5400));

        let repriced = service
            .reprice(
                reservation.id,
                PricingInputs {
                    discount: Some(Money::from_cents(1000)),
                    ..PricingInputs::default()
                },
                Actor::provider("prov-1"),
            )
            .await
            .unwrap();
        assert_eq!(repriced.pricing.service_price, Money::from_cents(5000));
        assert_eq!(repriced.pricing.sub_total, Money::from_cents(4000));
        assert_eq!(repriced.pricing.tax, Money::from_cents(320));
        assert_eq!(repriced.pricing.total, Money::from_cents(4320));

        let history = service.get_history(reservation.id).await.unwrap();
        assert_eq!(history[0].change_type, ChangeType::Repriced);
        assert_eq!(history[0].before.as_ref().unwrap()["total_cents"], 5400);
        assert_eq!(history[0].after["total_cents"], 4320);

        let err = service
            .reprice(
                reservation.id,
                PricingInputs {
                    discount: Some(Money::from_cents(9999)),
                    ..PricingInputs::default()
                },
                Actor::provider("prov-1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::InvalidPricingInput(_)));
    }

    #[tokio::test]
    async fn test_terminal_pricing_is_frozen() {
        let service = service().await;
        let id = service
            .reserve(request("prov-1", window(10, 0, 30)))
            .await
            .unwrap()
            .id;
        service.cancel(id, Actor::customer("cust-1"), None).await.unwrap();

        let err = service
            .reprice(id, PricingInputs::default(), Actor::system())
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::CannotModifyTerminal { ref status, .. }
            if status == "cancelled_by_customer"));

        let err = service
            .record_tip(id, Money::from_cents(500), Actor::system())
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::CannotModifyTerminal { .. }));
    }

    #[tokio::test]
    async fn test_record_tip() {
        let service = service().await;
        let id = service
            .reserve(request("prov-1", window(10, 0, 30)))
            .await
            .unwrap()
            .id;

        let tipped = service
            .record_tip(id, Money::from_cents(750), Actor::customer("cust-1"))
            .await
            .unwrap();
        assert_eq!(tipped.tip, Money::from_cents(750));
        assert_eq!(tipped.pricing.total, Money::from_cents(5000));
        assert_eq!(tipped.effective_total(), Money::from_cents(5750));

        let err = service
            .record_tip(id, Money::from_cents(-1), Actor::customer("cust-1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReservationError::InvalidPricingInput(slotbook_core::PricingError::NegativeTip { .. })
        ));

        let err = service
            .record_tip(id, Money::from_cents(i64::MAX), Actor::customer("cust-1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReservationError::InvalidPricingInput(slotbook_core::PricingError::AmountTooLarge { .. })
        ));
        assert_eq!(service.get(id).await.unwrap().tip, Money::from_cents(750));
    }

    #[tokio::test]
    async fn test_oversized_price_is_a_pricing_error() {
        let service = service().await;
        let mut req = request("prov-1", window(10, 0, 30));
        req.pricing.service_price = Some(Money::from_cents(i64::MAX / 2 + 1));
        req.pricing.tax_rate = Some(TaxRate::from_bps(10_000));

        let err = service.reserve(req).await.unwrap_err();
        assert!(matches!(
            err,
            ReservationError::InvalidPricingInput(slotbook_core::PricingError::AmountTooLarge { .. })
        ));
        assert!(!service
            .check_conflict("prov-1", &window(10, 0, 30), None)
            .await
            .unwrap());
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_lookups() {
        let service = service().await;
        let reservation = service.reserve(request("prov-1", window(10, 0, 30))).await.unwrap();

        let by_reference = service
            .get_by_reference(&reservation.reference_code.to_lowercase())
            .await
            .unwrap();
        assert_eq!(by_reference.id, reservation.id);

        let by_uuid = service.get_by_uuid(&reservation.uuid).await.unwrap();
        assert_eq!(by_uuid.id, reservation.id);

        assert!(service
            .check_conflict("prov-1", &window(10, 0, 30), None)
            .await
            .unwrap());
        assert!(!service
            .check_conflict("prov-1", &window(10, 0, 30), Some(reservation.id))
            .await
            .unwrap());

        let err = service.get_history(9999).await.unwrap_err();
        assert!(matches!(err, ReservationError::NotFound { .. }));
        let err = service.get_by_reference("RSV-NOPE0000").await.unwrap_err();
        assert!(matches!(err, ReservationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_identifiers_reach_callers_typed() {
        async fn copy_row(
            service: &ReservationService,
            source_id: i64,
            uuid: &str,
            reference_code: &str,
        ) -> ReservationResult<()> {
            sqlx::query(
                r#"
                INSERT INTO reservations (
                    uuid, reference_code, provider_id, customer_id, service_id,
                    service_name, slot_id, scheduled_start, scheduled_end,
                    service_price_cents, discount_cents, sub_total_cents,
                    tax_rate_bps, tax_cents, total_cents, currency,
                    created_at, updated_at
                )
                SELECT ?, ?, provider_id, customer_id, service_id,
                       service_name, slot_id, scheduled_start, scheduled_end,
                       service_price_cents, discount_cents, sub_total_cents,
                       tax_rate_bps, tax_cents, total_cents, currency,
                       created_at, updated_at
                FROM reservations WHERE id = ?
                "#,
            )
            .bind(uuid)
            .bind(reference_code)
            .bind(source_id)
            .execute(service.database().pool())
            .await
            .map_err(DbError::from)?;
            Ok(())
        }

        let service = service().await;
        let reservation = service.reserve(request("prov-1", window(10, 0, 30))).await.unwrap();

        let err = copy_row(
            &service,
            reservation.id,
            "00000000-0000-4000-8000-000000000001",
            &reservation.reference_code,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReservationError::DuplicateReference(_)), "{err:?}");

        let err = copy_row(&service, reservation.id, &reservation.uuid, "RSV-FRESH01")
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::DuplicateReservation(_)), "{err:?}");
    }
}
