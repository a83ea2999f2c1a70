// Catalog Sync - Core Library
// Exposes every pipeline stage for use in the CLI and tests

pub mod config;
pub mod pagination;
pub mod avalara;
pub mod bigcommerce;
pub mod reconcile;
pub mod sync;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use avalara::{AvalaraClient, RegistryItem};
pub use bigcommerce::{
    BigCommerceClient, CatalogProduct, CustomField, ProductFieldStore,
    CUSTOM_FIELD_LIMIT,
};
pub use reconcile::{ReconciliationEngine, ReconciliationResult, ReconciliationSummary};
pub use sync::{SyncEngine, SyncLogEntry, SyncStatus, SyncSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
