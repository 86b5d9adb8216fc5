//! # Reservation Store
//!
//! Persistence for reservations and the only place the overlap predicate is
//! evaluated against stored data.
//!
//! ## Write Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Conflict-Checked Write                               │
//! │                                                                         │
//! │  begin_immediate(pool)            ← write lock held from here          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  check_conflict_for_update(conn)  ← sees every committed row           │
//! │       │                                                                 │
//! │       ├── conflict ──► drop tx (rollback) ──► SlotConflict             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  create_in_transaction(conn) / update_schedule(conn)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  history.append(conn) ──► tx.commit()                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Compare-and-Update
//! Every field-scoped mutation names the state it expects
//! (`WHERE id = ?1 AND status = ?2`). If another writer moved the row first,
//! zero rows match and the call fails with `NotFound` for that state instead
//! of overwriting it.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::begin_immediate;
use slotbook_core::{
    Cancellation, CancelledBy, CustomerRef, GuestContact, Money, NewReservation, PaymentStatus,
    PricingBreakdown, Reservation, ReservationStatus, SlotWindow, TaxRate,
};

/// Prefix of generated reference codes when none is configured.
pub const DEFAULT_REFERENCE_PREFIX: &str = "RSV";

/// The status list is `ReservationStatus::holds_slot` spelled out.
const CONFLICT_SQL: &str = r#"
    SELECT EXISTS (
        SELECT 1 FROM reservations
        WHERE provider_id = ?1
          AND status IN ('pending', 'confirmed', 'in_progress')
          AND scheduled_start < ?3
          AND scheduled_end > ?2
          AND (?4 IS NULL OR id <> ?4)
    )
"#;

// =============================================================================
// Row Mapping
// =============================================================================

/// One `reservations` row as stored.
#[derive(Debug, sqlx::FromRow)]
struct ReservationRow {
    id: i64,
    uuid: String,
    reference_code: String,
    provider_id: String,
    customer_id: Option<String>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    service_id: String,
    service_name: String,
    slot_id: String,
    scheduled_start: i64,
    scheduled_end: i64,
    actual_start: Option<DateTime<Utc>>,
    actual_end: Option<DateTime<Utc>>,
    status: String,
    payment_status: PaymentStatus,
    service_price_cents: i64,
    discount_cents: i64,
    sub_total_cents: i64,
    tax_rate_bps: i64,
    tax_cents: i64,
    total_cents: i64,
    currency: String,
    tip_cents: i64,
    cancelled_by: Option<String>,
    cancelled_actor_id: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    cancellation_fee_cents: Option<i64>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn from_epoch(column: &str, secs: i64) -> DbResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| DbError::corrupt(column, secs))
}

impl ReservationRow {
    fn into_domain(self) -> DbResult<Reservation> {
        let window = SlotWindow::new(
            from_epoch("scheduled_start", self.scheduled_start)?,
            from_epoch("scheduled_end", self.scheduled_end)?,
        )
        .map_err(|e| DbError::corrupt("scheduled_end", e))?;

        let status: ReservationStatus = self
            .status
            .parse()
            .map_err(|e| DbError::corrupt("status", e))?;

        let customer = match (self.customer_id, self.guest_name, self.guest_email) {
            (Some(customer_id), _, _) => CustomerRef::Registered { customer_id },
            (None, Some(name), Some(email)) => CustomerRef::Guest(GuestContact {
                name,
                email,
                phone: self.guest_phone,
            }),
            _ => return Err(DbError::corrupt("customer_id", "neither customer nor guest")),
        };

        let cancellation = match (self.cancelled_by, self.cancelled_at) {
            (Some(by), Some(cancelled_at)) => Some(Cancellation {
                cancelled_by: by
                    .parse::<CancelledBy>()
                    .map_err(|e| DbError::corrupt("cancelled_by", e))?,
                actor_id: self.cancelled_actor_id,
                cancelled_at,
                reason: self.cancellation_reason,
                fee: Money::from_cents(self.cancellation_fee_cents.unwrap_or(0)),
            }),
            _ => None,
        };

        let tax_rate_bps =
            u32::try_from(self.tax_rate_bps).map_err(|e| DbError::corrupt("tax_rate_bps", e))?;

        Ok(Reservation {
            id: self.id,
            uuid: self.uuid,
            reference_code: self.reference_code,
            provider_id: self.provider_id,
            customer,
            service_id: self.service_id,
            service_name: self.service_name,
            slot_id: self.slot_id,
            window,
            actual_start: self.actual_start,
            actual_end: self.actual_end,
            status,
            payment_status: self.payment_status,
            pricing: PricingBreakdown {
                service_price: Money::from_cents(self.service_price_cents),
                discount: Money::from_cents(self.discount_cents),
                sub_total: Money::from_cents(self.sub_total_cents),
                tax_rate: TaxRate::from_bps(tax_rate_bps),
                tax: Money::from_cents(self.tax_cents),
                total: Money::from_cents(self.total_cents),
                currency: self.currency,
            },
            tip: Money::from_cents(self.tip_cents),
            cancellation,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

async fn select_by_id<'e, E>(executor: E, id: i64) -> DbResult<Option<Reservation>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ReservationRow>("SELECT * FROM reservations WHERE id = ?1")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(ReservationRow::into_domain)
        .transpose()
}

async fn conflict_exists<'e, E>(
    executor: E,
    provider_id: &str,
    window: &SlotWindow,
    exclude_id: Option<i64>,
) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let exists: i64 = sqlx::query_scalar(CONFLICT_SQL)
        .bind(provider_id)
        .bind(window.start().timestamp())
        .bind(window.end().timestamp())
        .bind(exclude_id)
        .fetch_one(executor)
        .await?;

    Ok(exists != 0)
}

// =============================================================================
// Store
// =============================================================================

/// Timestamps recorded together with a status change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusStamps {
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
}

/// Repository for reservation rows.
#[derive(Debug, Clone)]
pub struct ReservationStore {
    pool: SqlitePool,
    reference_prefix: String,
}

impl ReservationStore {
    /// Creates a new ReservationStore.
    pub fn new(pool: SqlitePool, reference_prefix: impl Into<String>) -> Self {
        ReservationStore {
            pool,
            reference_prefix: reference_prefix.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // -------------------------------------------------------------------------
    // Conflict checks
    // -------------------------------------------------------------------------

    /// Whether `window` overlaps a slot-holding reservation of `provider_id`,
    /// ignoring `exclude_id`.
    ///
    /// Read-only and lock-free: the answer may be stale by the time the caller
    /// acts on it. Use [`check_conflict_for_update`](Self::check_conflict_for_update)
    /// before writing.
    pub async fn check_conflict(
        &self,
        provider_id: &str,
        window: &SlotWindow,
        exclude_id: Option<i64>,
    ) -> DbResult<bool> {
        conflict_exists(&self.pool, provider_id, window, exclude_id).await
    }

    /// Same predicate as [`check_conflict`](Self::check_conflict), evaluated
    /// on a connection that holds the write lock (see
    /// [`begin_immediate`](crate::pool::begin_immediate)).
    ///
    /// No competing writer can commit between this check and the caller's
    /// write in the same transaction.
    pub async fn check_conflict_for_update(
        &self,
        conn: &mut SqliteConnection,
        provider_id: &str,
        window: &SlotWindow,
        exclude_id: Option<i64>,
    ) -> DbResult<bool> {
        let conflict = conflict_exists(&mut *conn, provider_id, window, exclude_id).await?;

        debug!(provider_id, %window, ?exclude_id, conflict, "Checked slot under write lock");
        Ok(conflict)
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    /// Checks for a conflict and inserts in a single write-locked transaction.
    ///
    /// ## Errors
    /// `SlotConflict` when the window is taken.
    pub async fn create(&self, new: &NewReservation) -> DbResult<Reservation> {
        let mut tx = begin_immediate(&self.pool).await?;

        if self
            .check_conflict_for_update(&mut tx, &new.provider_id, &new.window, None)
            .await?
        {
            return Err(DbError::SlotConflict {
                provider_id: new.provider_id.clone(),
                window: new.window.to_string(),
            });
        }

        let reservation = self.create_in_transaction(&mut tx, new).await?;
        tx.commit().await?;

        Ok(reservation)
    }

    /// Inserts a reservation in `Pending` with payment `pending`.
    ///
    /// Must follow [`check_conflict_for_update`](Self::check_conflict_for_update)
    /// on the same connection.
    pub async fn create_in_transaction(
        &self,
        conn: &mut SqliteConnection,
        new: &NewReservation,
    ) -> DbResult<Reservation> {
        let uuid = Uuid::new_v4();
        let reference_code = generate_reference_code(&self.reference_prefix, &uuid);
        let now = Utc::now();
        let guest = new.customer.guest();

        debug!(
            uuid = %uuid,
            reference = %reference_code,
            provider_id = %new.provider_id,
            "Inserting reservation"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO reservations (
                uuid, reference_code,
                provider_id, customer_id, guest_name, guest_email, guest_phone,
                service_id, service_name, slot_id,
                scheduled_start, scheduled_end,
                status, payment_status,
                service_price_cents, discount_cents, sub_total_cents,
                tax_rate_bps, tax_cents, total_cents, currency, tip_cents,
                notes, created_at, updated_at
            ) VALUES (
                ?1, ?2,
                ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12,
                ?13, ?14,
                ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, 0,
                ?22, ?23, ?23
            )
            "#,
        )
        .bind(uuid.to_string())
        .bind(&reference_code)
        .bind(&new.provider_id)
        .bind(new.customer.customer_id())
        .bind(guest.map(|g| g.name.as_str()))
        .bind(guest.map(|g| g.email.as_str()))
        .bind(guest.and_then(|g| g.phone.as_deref()))
        .bind(&new.service_id)
        .bind(&new.service_name)
        .bind(&new.slot_id)
        .bind(new.window.start().timestamp())
        .bind(new.window.end().timestamp())
        .bind(ReservationStatus::Pending.as_str())
        .bind(PaymentStatus::Pending)
        .bind(new.pricing.service_price.cents())
        .bind(new.pricing.discount.cents())
        .bind(new.pricing.sub_total.cents())
        .bind(i64::from(new.pricing.tax_rate.bps()))
        .bind(new.pricing.tax.cents())
        .bind(new.pricing.total.cents())
        .bind(&new.pricing.currency)
        .bind(new.notes.as_deref())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();
        info!(reservation_id = id, reference = %reference_code, "Reservation created");

        self.find_by_id_for_update(conn, id).await
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Gets a reservation by storage id.
    pub async fn find_by_id(&self, id: i64) -> DbResult<Reservation> {
        select_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::not_found("Reservation", id))
    }

    /// Re-reads a reservation on the caller's (locked) connection.
    pub async fn find_by_id_for_update(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> DbResult<Reservation> {
        select_by_id(&mut *conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Reservation", id))
    }

    /// Gets a reservation by its external UUID.
    pub async fn find_by_uuid(&self, uuid: &str) -> DbResult<Reservation> {
        sqlx::query_as::<_, ReservationRow>("SELECT * FROM reservations WHERE uuid = ?1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Reservation", uuid))?
            .into_domain()
    }

    /// Gets a reservation by its reference code (case-insensitive).
    pub async fn find_by_reference(&self, reference_code: &str) -> DbResult<Reservation> {
        let code = reference_code.trim().to_ascii_uppercase();

        sqlx::query_as::<_, ReservationRow>(
            "SELECT * FROM reservations WHERE reference_code = ?1",
        )
        .bind(&code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Reservation", reference_code))?
        .into_domain()
    }

    /// Slot-holding reservations of a provider that intersect `window`,
    /// earliest first.
    pub async fn list_for_provider(
        &self,
        provider_id: &str,
        window: &SlotWindow,
    ) -> DbResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT * FROM reservations
            WHERE provider_id = ?1
              AND status IN ('pending', 'confirmed', 'in_progress')
              AND scheduled_start < ?3
              AND scheduled_end > ?2
            ORDER BY scheduled_start, id
            "#,
        )
        .bind(provider_id)
        .bind(window.start().timestamp())
        .bind(window.end().timestamp())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ReservationRow::into_domain).collect()
    }

    // -------------------------------------------------------------------------
    // Field-scoped mutations (caller's transaction)
    // -------------------------------------------------------------------------

    /// Moves `from -> to`, stamping any provided actual times.
    pub async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        from: ReservationStatus,
        to: ReservationStatus,
        stamps: StatusStamps,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations SET
                status = ?3,
                actual_start = COALESCE(?4, actual_start),
                actual_end = COALESCE(?5, actual_end),
                updated_at = ?6
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(stamps.actual_start)
        .bind(stamps.actual_end)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        expect_one_row(result.rows_affected(), from.as_str(), id)?;
        debug!(reservation_id = id, %from, %to, "Status updated");
        Ok(())
    }

    /// Moves `from` to the cancelled variant named by `cancellation` and
    /// records its metadata.
    pub async fn cancel(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        from: ReservationStatus,
        cancellation: &Cancellation,
    ) -> DbResult<()> {
        let to = ReservationStatus::Cancelled(cancellation.cancelled_by);

        let result = sqlx::query(
            r#"
            UPDATE reservations SET
                status = ?3,
                cancelled_by = ?4,
                cancelled_actor_id = ?5,
                cancelled_at = ?6,
                cancellation_reason = ?7,
                cancellation_fee_cents = ?8,
                updated_at = ?6
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(cancellation.cancelled_by.as_str())
        .bind(cancellation.actor_id.as_deref())
        .bind(cancellation.cancelled_at)
        .bind(cancellation.reason.as_deref())
        .bind(cancellation.fee.cents())
        .execute(&mut *conn)
        .await?;

        expect_one_row(result.rows_affected(), from.as_str(), id)?;
        debug!(reservation_id = id, %to, fee = %cancellation.fee, "Reservation cancelled");
        Ok(())
    }

    /// Moves the payment status `from -> to`.
    pub async fn update_payment_status(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations SET
                payment_status = ?3,
                updated_at = ?4
            WHERE id = ?1 AND payment_status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        expect_one_row(result.rows_affected(), from.as_str(), id)?;
        debug!(reservation_id = id, %from, %to, "Payment status updated");
        Ok(())
    }

    /// Replaces the scheduled window of a reservation still in `status`.
    pub async fn update_schedule(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        status: ReservationStatus,
        window: &SlotWindow,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations SET
                scheduled_start = ?3,
                scheduled_end = ?4,
                updated_at = ?5
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(window.start().timestamp())
        .bind(window.end().timestamp())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        expect_one_row(result.rows_affected(), status.as_str(), id)?;
        debug!(reservation_id = id, %window, "Schedule updated");
        Ok(())
    }

    /// Replaces the stored breakdown of a reservation still in `status`.
    pub async fn update_pricing(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        status: ReservationStatus,
        pricing: &PricingBreakdown,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations SET
                service_price_cents = ?3,
                discount_cents = ?4,
                sub_total_cents = ?5,
                tax_rate_bps = ?6,
                tax_cents = ?7,
                total_cents = ?8,
                currency = ?9,
                updated_at = ?10
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(pricing.service_price.cents())
        .bind(pricing.discount.cents())
        .bind(pricing.sub_total.cents())
        .bind(i64::from(pricing.tax_rate.bps()))
        .bind(pricing.tax.cents())
        .bind(pricing.total.cents())
        .bind(&pricing.currency)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        expect_one_row(result.rows_affected(), status.as_str(), id)?;
        debug!(reservation_id = id, total = %pricing.total, "Pricing updated");
        Ok(())
    }

    /// Sets the tip of a reservation still in `status`.
    pub async fn update_tip(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        status: ReservationStatus,
        tip: Money,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE reservations SET tip_cents = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(tip.cents())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        expect_one_row(result.rows_affected(), status.as_str(), id)?;
        debug!(reservation_id = id, %tip, "Tip updated");
        Ok(())
    }
}

fn expect_one_row(rows_affected: u64, expected_state: &str, id: i64) -> DbResult<()> {
    if rows_affected == 0 {
        return Err(DbError::not_found(
            format!("Reservation ({expected_state})"),
            id,
        ));
    }
    Ok(())
}

// =============================================================================
// Reference Codes
// =============================================================================

/// Crockford base32: no I, L, O or U, so codes survive being read aloud.
const REFERENCE_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Generates a reference code in format: PREFIX-XXXXXXXX
///
/// The eight characters encode the first 40 bits of the reservation's UUID.
///
/// ## Example
/// `RSV-7Q2M9K4D`
pub fn generate_reference_code(prefix: &str, uuid: &Uuid) -> String {
    let bytes = uuid.as_bytes();
    let bits = bytes[..5]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));

    let code: String = (0..8)
        .rev()
        .map(|i| REFERENCE_ALPHABET[((bits >> (i * 5)) & 0x1f) as usize] as char)
        .collect();

    format!("{}-{}", prefix.to_ascii_uppercase(), code)
}

// =============================================================================
// Unit Tests
// =============================================================================
