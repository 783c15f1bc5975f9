//! # fraudlab-core — workshop helpers for the credit-card fraud demo
//!
//! Helper routines used while teaching feature engineering on a hosted
//! feature store:
//!
//! - **Catalog cleanup**: classify catalogs as disposable or protected and
//!   strip disposable ones of deployments and materialized tables.
//! - **Demo setup**: register the credit-card fraud tables and entities and
//!   tag entity columns, idempotently.
//! - **Naming**: turn display names into identifiers.
//!
//! All platform operations go through the [`store::FeatureStoreClient`]
//! trait, so everything here runs against the real REST API or the
//! in-memory store alike.

pub mod cleanup;
pub mod config;
pub mod demo;
pub mod error;
pub mod naming;
pub mod policy;
pub mod store;

pub use cleanup::{CatalogCleaner, CleanupReport, DerivedObjectCounts, cleanup};
pub use config::{FraudlabConfig, load_config};
pub use demo::{DemoRegistrar, PlaygroundCatalog, create_playground_catalog};
pub use error::{FraudlabError, StoreError};
pub use naming::to_identifier;
pub use policy::{CatalogClass, is_disposable};
pub use store::{FeatureStoreClient, HttpFeatureStore, InMemoryFeatureStore};

/// Build the client for the configured store, activating the configured
/// catalog if one is set. Otherwise the platform's default catalog is
/// active.
pub async fn connect(config: &FraudlabConfig) -> Result<HttpFeatureStore, FraudlabError> {
    let store = HttpFeatureStore::new(&config.store)?;
    if let Some(name) = &config.store.active_catalog {
        store.activate_catalog(name).await?;
        tracing::info!(catalog = %name, "Activated configured catalog");
    }
    Ok(store)
}
