//! # Collaborator Directories
//!
//! Reservations reference providers, services and customers owned by other
//! systems. The service reaches them through these traits, injected as
//! `Arc<dyn ...>`, and only before it opens a storage transaction.
//!
//! ```text
//! ReservationService::reserve
//!     │
//!     ├── ProviderDirectory::find_provider   exists? active?
//!     ├── CustomerDirectory::find_customer   exists? (registered only)
//!     ├── ServiceCatalog::find_service       exists? active? duration? price?
//!     │
//!     └── BEGIN IMMEDIATE ... COMMIT
//! ```
//!
//! [`InMemoryDirectory`] implements all three and backs the seed binary and
//! the tests.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use slotbook_core::Money;

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub provider_id: String,
    pub display_name: String,
    /// Inactive providers keep their reservations but take no new ones.
    pub active: bool,
}

/// A bookable service as the catalog describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub service_id: String,
    pub name: String,
    /// Every reservation window for this service must last exactly this long.
    pub duration_minutes: i64,
    pub price: Money,
    /// Overrides the configured default currency when set.
    pub currency: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerInfo {
    pub customer_id: String,
    pub name: String,
    pub email: Option<String>,
}

/// A failed lookup. "Not found" is `Ok(None)`, not an error.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("lookup timed out: {0}")]
    Timeout(String),

    #[error("lookup failed: {0}")]
    Unavailable(String),
}

// =============================================================================
// Traits
// =============================================================================

#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn find_provider(&self, provider_id: &str) -> Result<Option<ProviderInfo>, LookupError>;
}

#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn find_service(&self, service_id: &str)
        -> Result<Option<ServiceDefinition>, LookupError>;
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn find_customer(&self, customer_id: &str) -> Result<Option<CustomerInfo>, LookupError>;
}

// =============================================================================
// In-Memory Implementation
// =============================================================================

/// HashMap-backed directory for all three collaborator roles.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    providers: RwLock<HashMap<String, ProviderInfo>>,
    services: RwLock<HashMap<String, ServiceDefinition>>,
    customers: RwLock<HashMap<String, CustomerInfo>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a provider.
    pub async fn put_provider(&self, provider: ProviderInfo) {
        self.providers
            .write()
            .await
            .insert(provider.provider_id.clone(), provider);
    }

    /// Inserts or replaces a service.
    pub async fn put_service(&self, service: ServiceDefinition) {
        self.services
            .write()
            .await
            .insert(service.service_id.clone(), service);
    }

    /// Inserts or replaces a customer.
    pub async fn put_customer(&self, customer: CustomerInfo) {
        self.customers
            .write()
            .await
            .insert(customer.customer_id.clone(), customer);
    }
}

#[async_trait]
impl ProviderDirectory for InMemoryDirectory {
    async fn find_provider(&self, provider_id: &str) -> Result<Option<ProviderInfo>, LookupError> {
        Ok(self.providers.read().await.get(provider_id).cloned())
    }
}

#[async_trait]
impl ServiceCatalog for InMemoryDirectory {
    async fn find_service(
        &self,
        service_id: &str,
    ) -> Result<Option<ServiceDefinition>, LookupError> {
        Ok(self.services.read().await.get(service_id).cloned())
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryDirectory {
    async fn find_customer(&self, customer_id: &str) -> Result<Option<CustomerInfo>, LookupError> {
        Ok(self.customers.read().await.get(customer_id).cloned())
    }
}
