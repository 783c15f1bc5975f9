//! Credit-card fraud demo setup.
//!
//! Every step is an "ensure it exists with this shape" operation: tables
//! already registered under the same name are reused, entities are
//! get-or-create, and tagging overwrites the same column tags. Running the
//! setup twice against the same catalog leaves it unchanged.

pub mod catalogue;

pub use catalogue::{COLUMN_TAGS, ColumnTag, ENTITIES, EntitySpec, TABLE_NAMES};

use crate::cleanup::{CatalogCleaner, CleanupReport};
use crate::config::{DemoConfig, FraudlabConfig};
use crate::error::{FraudlabError, StoreError};
use crate::store::{CatalogRef, EntityRef, FeatureStoreClient, TableRef};
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

/// Registers the demo tables, entities, and tags in a catalog.
pub struct DemoRegistrar<'a> {
    store: &'a dyn FeatureStoreClient,
    config: &'a DemoConfig,
}

impl<'a> DemoRegistrar<'a> {
    pub fn new(store: &'a dyn FeatureStoreClient, config: &'a DemoConfig) -> Self {
        Self { store, config }
    }

    /// Register the six source tables, reusing any already present, and
    /// apply the card-transaction feature job setting.
    ///
    /// Returns the tables in [`TABLE_NAMES`] order.
    pub async fn register_tables(&self, catalog: &CatalogRef) -> Result<Vec<TableRef>, StoreError> {
        let existing = self.store.list_tables(catalog).await?;
        let mut tables = Vec::with_capacity(TABLE_NAMES.len());

        for spec in catalogue::table_specs(self.config) {
            let table = match existing.iter().find(|t| t.name == spec.name) {
                Some(found) => {
                    debug!(table = %spec.name, "Table already registered");
                    found.clone()
                }
                None => {
                    let table = self
                        .store
                        .create_table(catalog, &self.config.feature_store, &spec)
                        .await?;
                    info!(table = %table.name, kind = ?table.kind, "Registered table");
                    table
                }
            };
            tables.push(table);
        }

        if let Some(transactions) = tables.iter().find(|t| t.name == catalogue::CARD_TRANSACTIONS) {
            self.store
                .update_default_feature_job_setting(
                    catalog,
                    transactions,
                    &catalogue::card_transactions_job_setting(),
                )
                .await?;
        }

        Ok(tables)
    }

    /// Get or create the seven demo entities.
    pub async fn register_entities(
        &self,
        catalog: &CatalogRef,
    ) -> Result<Vec<EntityRef>, StoreError> {
        let mut entities = Vec::with_capacity(ENTITIES.len());
        for spec in ENTITIES {
            let serving_names: Vec<String> =
                spec.serving_names.iter().map(|s| s.to_string()).collect();
            entities.push(
                self.store
                    .get_or_create_entity(catalog, spec.name, &serving_names)
                    .await?,
            );
        }
        Ok(entities)
    }

    /// Tag the entity columns of the registered tables.
    pub async fn tag_entities(
        &self,
        catalog: &CatalogRef,
        tables: &[TableRef],
    ) -> Result<(), FraudlabError> {
        for ColumnTag {
            table,
            column,
            entity,
        } in COLUMN_TAGS
        {
            let table_ref = tables.iter().find(|t| t.name == table).ok_or_else(|| {
                FraudlabError::invalid_input(format!("table {table} is not registered"))
            })?;
            self.store
                .tag_column_entity(catalog, table_ref, column, entity)
                .await?;
            debug!(table, column, entity, "Tagged column");
        }
        Ok(())
    }

    /// Tables, entities, and tags in one go.
    pub async fn register_all(&self, catalog: &CatalogRef) -> Result<Vec<TableRef>, FraudlabError> {
        info!("Registering the source tables");
        let tables = self.register_tables(catalog).await?;
        info!("Registering the entities");
        self.register_entities(catalog).await?;
        info!("Tagging the entities to columns in the data tables");
        self.tag_entities(catalog, &tables).await?;
        Ok(tables)
    }
}

/// Unique name for a playground catalog created at `now`.
pub fn playground_catalog_name<Tz>(prefix: &str, now: &DateTime<Tz>, id: Uuid) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{prefix} {}_{id}", now.format("%Y%m%d:%H%M"))
}

/// Result of [`create_playground_catalog`].
#[derive(Debug, Clone, Serialize)]
pub struct PlaygroundCatalog {
    pub catalog: CatalogRef,
    pub tables: Vec<TableRef>,
    pub cleanup: CleanupReport,
}

/// Clean up tutorial catalogs, then create and populate a fresh playground
/// catalog for the credit-card demo. The new catalog is left active.
pub async fn create_playground_catalog(
    store: &dyn FeatureStoreClient,
    config: &FraudlabConfig,
) -> Result<PlaygroundCatalog, FraudlabError> {
    config.validate()?;
    let cleanup = CatalogCleaner::new(store).verbose(true).run().await?;

    let name = playground_catalog_name(
        &config.demo.catalog_prefix,
        &chrono::Local::now(),
        Uuid::new_v4(),
    );
    info!("Building a playground catalog for credit cards named [{name}]");

    let exists = store.list_catalogs().await?.iter().any(|c| c.name == name);
    if exists {
        info!("Catalog already exists");
    } else {
        info!("Creating new catalog");
        store
            .create_catalog(&name, &config.demo.feature_store)
            .await?;
        info!("Catalog created");
    }
    let catalog = store.activate_catalog(&name).await?;

    let tables = DemoRegistrar::new(store, &config.demo)
        .register_all(&catalog)
        .await?;

    Ok(PlaygroundCatalog {
        catalog,
        tables,
        cleanup,
    })
}
