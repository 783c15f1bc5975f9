//! Feature-store client abstraction.
//!
//! Everything this crate does to the platform goes through
//! [`FeatureStoreClient`]. Catalog-scoped operations take the catalog they
//! act on explicitly instead of relying on whichever catalog happens to be
//! active, so a caller can reason about a sequence of calls without
//! tracking ambient state.
//!
//! Two implementations ship with the crate:
//! - [`HttpFeatureStore`]: talks to the feature-store REST API via reqwest.
//! - [`InMemoryFeatureStore`]: process-local store for tests and rehearsals.

pub mod http;
pub mod memory;

pub use http::{HttpFeatureStore, ReqwestTransport, StoreRequest, StoreResponse, StoreTransport};
pub use memory::{InMemoryFeatureStore, Mutation};

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A catalog as listed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogRef {
    pub id: String,
    pub name: String,
}

/// A deployment and whether it is currently serving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub id: String,
    pub name: String,
    pub enabled: bool,
}

/// Kinds of materialized tables a catalog accumulates from feature jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedKind {
    BatchFeatureTable,
    BatchRequestTable,
    HistoricalFeatureTable,
    ObservationTable,
}

impl DerivedKind {
    /// All kinds, in the order a cleanup pass deletes them.
    pub const ALL: [DerivedKind; 4] = [
        DerivedKind::BatchFeatureTable,
        DerivedKind::BatchRequestTable,
        DerivedKind::HistoricalFeatureTable,
        DerivedKind::ObservationTable,
    ];

    /// REST collection name.
    pub fn route(&self) -> &'static str {
        match self {
            DerivedKind::BatchFeatureTable => "batch_feature_table",
            DerivedKind::BatchRequestTable => "batch_request_table",
            DerivedKind::HistoricalFeatureTable => "historical_feature_table",
            DerivedKind::ObservationTable => "observation_table",
        }
    }

    /// Plural label used in log lines and reports.
    pub fn label(&self) -> &'static str {
        match self {
            DerivedKind::BatchFeatureTable => "batch feature tables",
            DerivedKind::BatchRequestTable => "batch request tables",
            DerivedKind::HistoricalFeatureTable => "historical feature tables",
            DerivedKind::ObservationTable => "observation tables",
        }
    }
}

impl fmt::Display for DerivedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

/// A named object inside a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: String,
    pub name: String,
}

/// How a source table is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Event,
    Scd,
    Dimension,
}

impl TableKind {
    pub fn route(&self) -> &'static str {
        match self {
            TableKind::Event => "event_table",
            TableKind::Scd => "scd_table",
            TableKind::Dimension => "dimension_table",
        }
    }
}

/// A table registered in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub id: String,
    pub name: String,
    pub kind: TableKind,
}

/// Location of a table in the data warehouse behind a feature store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTable {
    pub database_name: String,
    pub schema_name: String,
    pub table_name: String,
}

/// Column roles, per registration kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnRoles {
    Event {
        event_id_column: String,
        event_timestamp_column: String,
        event_timestamp_timezone_offset_column: Option<String>,
        record_creation_timestamp_column: Option<String>,
    },
    Scd {
        surrogate_key_column: Option<String>,
        natural_key_column: String,
        effective_timestamp_column: String,
        end_timestamp_column: Option<String>,
        record_creation_timestamp_column: Option<String>,
    },
    Dimension {
        dimension_id_column: String,
        record_creation_timestamp_column: Option<String>,
    },
}

impl ColumnRoles {
    pub fn kind(&self) -> TableKind {
        match self {
            ColumnRoles::Event { .. } => TableKind::Event,
            ColumnRoles::Scd { .. } => TableKind::Scd,
            ColumnRoles::Dimension { .. } => TableKind::Dimension,
        }
    }
}

/// Everything needed to register a source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub source: SourceTable,
    pub roles: ColumnRoles,
}

impl TableSpec {
    pub fn kind(&self) -> TableKind {
        self.roles.kind()
    }
}

/// A business entity with its serving names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
    pub serving_names: Vec<String>,
}

/// Default schedule for feature computation on a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureJobSetting {
    pub blind_spot: Duration,
    pub frequency: Duration,
    pub time_modulo_frequency: Duration,
}

impl FeatureJobSetting {
    pub fn from_secs(blind_spot: u64, frequency: u64, time_modulo_frequency: u64) -> Self {
        Self {
            blind_spot: Duration::from_secs(blind_spot),
            frequency: Duration::from_secs(frequency),
            time_modulo_frequency: Duration::from_secs(time_modulo_frequency),
        }
    }

    /// Wire form, durations as `"<n>s"` strings.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "blind_spot": format!("{}s", self.blind_spot.as_secs()),
            "frequency": format!("{}s", self.frequency.as_secs()),
            "time_modulo_frequency": format!("{}s", self.time_modulo_frequency.as_secs()),
        })
    }
}

/// Client API of the external feature store.
#[async_trait]
pub trait FeatureStoreClient: Send + Sync {
    async fn list_catalogs(&self) -> Result<Vec<CatalogRef>, StoreError>;

    async fn get_catalog(&self, name: &str) -> Result<CatalogRef, StoreError>;

    /// Create a catalog bound to the named feature store. Creating a catalog
    /// does not change which catalog is active.
    async fn create_catalog(
        &self,
        name: &str,
        feature_store: &str,
    ) -> Result<CatalogRef, StoreError>;

    /// The catalog currently active, if any.
    async fn active_catalog(&self) -> Result<Option<CatalogRef>, StoreError>;

    /// Make the named catalog the active one.
    async fn activate_catalog(&self, name: &str) -> Result<CatalogRef, StoreError>;

    /// Clear the active-catalog pointer, returning the store to the state it
    /// starts in.
    async fn deactivate_catalog(&self) -> Result<(), StoreError>;

    async fn list_deployments(
        &self,
        catalog: &CatalogRef,
    ) -> Result<Vec<DeploymentInfo>, StoreError>;

    async fn disable_deployment(&self, catalog: &CatalogRef, id: &str) -> Result<(), StoreError>;

    async fn list_derived(
        &self,
        catalog: &CatalogRef,
        kind: DerivedKind,
    ) -> Result<Vec<ObjectRef>, StoreError>;

    async fn delete_derived(
        &self,
        catalog: &CatalogRef,
        kind: DerivedKind,
        id: &str,
    ) -> Result<(), StoreError>;

    async fn list_tables(&self, catalog: &CatalogRef) -> Result<Vec<TableRef>, StoreError>;

    async fn get_table(&self, catalog: &CatalogRef, name: &str) -> Result<TableRef, StoreError>;

    /// Register a source table from the named feature store's data source.
    async fn create_table(
        &self,
        catalog: &CatalogRef,
        feature_store: &str,
        spec: &TableSpec,
    ) -> Result<TableRef, StoreError>;

    async fn update_default_feature_job_setting(
        &self,
        catalog: &CatalogRef,
        table: &TableRef,
        setting: &FeatureJobSetting,
    ) -> Result<(), StoreError>;

    async fn get_or_create_entity(
        &self,
        catalog: &CatalogRef,
        name: &str,
        serving_names: &[String],
    ) -> Result<EntityRef, StoreError>;

    /// Tag a table column as an instance of the named entity.
    async fn tag_column_entity(
        &self,
        catalog: &CatalogRef,
        table: &TableRef,
        column: &str,
        entity: &str,
    ) -> Result<(), StoreError>;
}
