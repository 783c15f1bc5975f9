//! In-memory feature store.
//!
//! Holds catalogs, their derived tables and registrations in process memory
//! and journals every state-changing call. Used by the test suite and by
//! the CLI's offline mode.

use super::{
    CatalogRef, DeploymentInfo, DerivedKind, EntityRef, FeatureJobSetting, FeatureStoreClient,
    ObjectRef, TableRef, TableSpec,
};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// A state-changing call recorded by [`InMemoryFeatureStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CatalogCreated { catalog: String },
    Activated { catalog: String },
    /// The pointer was cleared; `catalog` is the one that was active.
    Deactivated { catalog: String },
    DeploymentDisabled { catalog: String, id: String },
    DerivedDeleted { catalog: String, kind: DerivedKind, id: String },
    TableCreated { catalog: String, table: String },
    FeatureJobSettingUpdated { catalog: String, table: String },
    EntityCreated { catalog: String, entity: String },
    ColumnTagged { catalog: String, table: String, column: String, entity: String },
}

impl Mutation {
    /// Name of the catalog the call touched.
    pub fn catalog(&self) -> &str {
        match self {
            Mutation::CatalogCreated { catalog }
            | Mutation::Activated { catalog }
            | Mutation::Deactivated { catalog }
            | Mutation::DeploymentDisabled { catalog, .. }
            | Mutation::DerivedDeleted { catalog, .. }
            | Mutation::TableCreated { catalog, .. }
            | Mutation::FeatureJobSettingUpdated { catalog, .. }
            | Mutation::EntityCreated { catalog, .. }
            | Mutation::ColumnTagged { catalog, .. } => catalog,
        }
    }

    /// Whether the call changed catalog contents, as opposed to only moving
    /// the active-catalog pointer.
    pub fn changes_contents(&self) -> bool {
        !matches!(
            self,
            Mutation::Activated { .. } | Mutation::Deactivated { .. }
        )
    }
}

#[derive(Debug, Clone)]
struct StoredTable {
    table: TableRef,
    spec: TableSpec,
    feature_job_setting: Option<FeatureJobSetting>,
    column_entities: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct CatalogState {
    catalog: CatalogRef,
    feature_store: String,
    deployments: Vec<DeploymentInfo>,
    derived: HashMap<DerivedKind, Vec<ObjectRef>>,
    tables: Vec<StoredTable>,
    entities: Vec<EntityRef>,
}

#[derive(Debug, Default)]
struct State {
    catalogs: Vec<CatalogState>,
    active: Option<String>,
    journal: Vec<Mutation>,
    failing: Vec<String>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }

    fn by_name(&self, name: &str) -> Result<&CatalogState, StoreError> {
        self.catalogs
            .iter()
            .find(|c| c.catalog.name == name)
            .ok_or_else(|| StoreError::not_found("catalog", name))
    }

    fn by_ref(&self, catalog: &CatalogRef) -> Result<&CatalogState, StoreError> {
        self.catalogs
            .iter()
            .find(|c| c.catalog.id == catalog.id)
            .ok_or_else(|| StoreError::not_found("catalog", &catalog.name))
    }

    fn by_ref_mut(&mut self, catalog: &CatalogRef) -> Result<&mut CatalogState, StoreError> {
        if self.failing.iter().any(|n| *n == catalog.name) {
            return Err(StoreError::api(
                503,
                format!("catalog '{}' is unavailable", catalog.name),
            ));
        }
        self.catalogs
            .iter_mut()
            .find(|c| c.catalog.id == catalog.id)
            .ok_or_else(|| StoreError::not_found("catalog", &catalog.name))
    }
}

/// Feature store backed by process memory.
pub struct InMemoryFeatureStore {
    state: Mutex<State>,
}

impl InMemoryFeatureStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a catalog bound to the `playground` feature store.
    pub fn with_catalog(self, name: &str) -> Self {
        self.insert_catalog(name, "playground");
        self
    }

    /// Seed a deployment in an existing catalog.
    pub fn with_deployment(self, catalog: &str, name: &str, enabled: bool) -> Self {
        {
            let mut state = self.state();
            let id = state.next_id("deployment");
            if let Some(c) = state.catalogs.iter_mut().find(|c| c.catalog.name == catalog) {
                c.deployments.push(DeploymentInfo {
                    id,
                    name: name.to_string(),
                    enabled,
                });
            }
        }
        self
    }

    /// Seed a derived table in an existing catalog.
    pub fn with_derived(self, catalog: &str, kind: DerivedKind, name: &str) -> Self {
        {
            let mut state = self.state();
            let id = state.next_id(kind.route());
            if let Some(c) = state.catalogs.iter_mut().find(|c| c.catalog.name == catalog) {
                c.derived.entry(kind).or_default().push(ObjectRef {
                    id,
                    name: name.to_string(),
                });
            }
        }
        self
    }

    /// Set the active catalog without journaling it.
    pub fn with_active(self, name: &str) -> Self {
        {
            let mut state = self.state();
            let id = state
                .catalogs
                .iter()
                .find(|c| c.catalog.name == name)
                .map(|c| c.catalog.id.clone());
            state.active = id;
        }
        self
    }

    /// Make every state-changing call on the named catalog fail.
    pub fn with_failing_catalog(self, name: &str) -> Self {
        self.state().failing.push(name.to_string());
        self
    }

    /// Remove a catalog outright, as if another client had deleted it.
    pub fn drop_catalog(&self, name: &str) {
        self.state().catalogs.retain(|c| c.catalog.name != name);
    }

    fn insert_catalog(&self, name: &str, feature_store: &str) -> CatalogRef {
        let mut state = self.state();
        let catalog = CatalogRef {
            id: state.next_id("catalog"),
            name: name.to_string(),
        };
        state.catalogs.push(CatalogState {
            catalog: catalog.clone(),
            feature_store: feature_store.to_string(),
            deployments: Vec::new(),
            derived: HashMap::new(),
            tables: Vec::new(),
            entities: Vec::new(),
        });
        catalog
    }

    /// Every state-changing call so far, in order.
    pub fn journal(&self) -> Vec<Mutation> {
        self.state().journal.clone()
    }

    /// Name of the active catalog.
    pub fn active_name(&self) -> Option<String> {
        let state = self.state();
        let id = state.active.as_ref()?;
        state
            .catalogs
            .iter()
            .find(|c| &c.catalog.id == id)
            .map(|c| c.catalog.name.clone())
    }

    /// Enabled deployments plus every derived table in the catalog.
    pub fn derived_total(&self, catalog: &str) -> usize {
        let state = self.state();
        state
            .by_name(catalog)
            .map(|c| {
                c.deployments.iter().filter(|d| d.enabled).count()
                    + c.derived.values().map(Vec::len).sum::<usize>()
            })
            .unwrap_or(0)
    }

    /// Names of the tables registered in the catalog.
    pub fn table_names(&self, catalog: &str) -> Vec<String> {
        let state = self.state();
        state
            .by_name(catalog)
            .map(|c| c.tables.iter().map(|t| t.table.name.clone()).collect())
            .unwrap_or_default()
    }

    /// The [`TableSpec`] a table was registered with.
    pub fn table_spec(&self, catalog: &str, table: &str) -> Option<TableSpec> {
        let state = self.state();
        let c = state.by_name(catalog).ok()?;
        c.tables
            .iter()
            .find(|t| t.table.name == table)
            .map(|t| t.spec.clone())
    }

    pub fn feature_job_setting(&self, catalog: &str, table: &str) -> Option<FeatureJobSetting> {
        let state = self.state();
        let c = state.by_name(catalog).ok()?;
        c.tables
            .iter()
            .find(|t| t.table.name == table)
            .and_then(|t| t.feature_job_setting)
    }

    /// Column → entity tags on a table.
    pub fn column_entities(&self, catalog: &str, table: &str) -> BTreeMap<String, String> {
        let state = self.state();
        state
            .by_name(catalog)
            .ok()
            .and_then(|c| c.tables.iter().find(|t| t.table.name == table))
            .map(|t| t.column_entities.clone())
            .unwrap_or_default()
    }

    pub fn entities(&self, catalog: &str) -> Vec<EntityRef> {
        let state = self.state();
        state
            .by_name(catalog)
            .map(|c| c.entities.clone())
            .unwrap_or_default()
    }

    pub fn feature_store_of(&self, catalog: &str) -> Option<String> {
        let state = self.state();
        state.by_name(catalog).ok().map(|c| c.feature_store.clone())
    }
}

impl Default for InMemoryFeatureStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeatureStoreClient for InMemoryFeatureStore {
    async fn list_catalogs(&self) -> Result<Vec<CatalogRef>, StoreError> {
        Ok(self
            .state()
            .catalogs
            .iter()
            .map(|c| c.catalog.clone())
            .collect())
    }

    async fn get_catalog(&self, name: &str) -> Result<CatalogRef, StoreError> {
        Ok(self.state().by_name(name)?.catalog.clone())
    }

    async fn create_catalog(
        &self,
        name: &str,
        feature_store: &str,
    ) -> Result<CatalogRef, StoreError> {
        if self.state().by_name(name).is_ok() {
            return Err(StoreError::api(409, format!("Catalog '{name}' already exists")));
        }
        let catalog = self.insert_catalog(name, feature_store);
        self.state().journal.push(Mutation::CatalogCreated {
            catalog: name.to_string(),
        });
        Ok(catalog)
    }

    async fn active_catalog(&self) -> Result<Option<CatalogRef>, StoreError> {
        let state = self.state();
        let Some(id) = state.active.as_ref() else {
            return Ok(None);
        };
        Ok(state
            .catalogs
            .iter()
            .find(|c| &c.catalog.id == id)
            .map(|c| c.catalog.clone()))
    }

    async fn activate_catalog(&self, name: &str) -> Result<CatalogRef, StoreError> {
        let mut state = self.state();
        let catalog = state.by_name(name)?.catalog.clone();
        state.active = Some(catalog.id.clone());
        state.journal.push(Mutation::Activated {
            catalog: name.to_string(),
        });
        Ok(catalog)
    }

    async fn deactivate_catalog(&self) -> Result<(), StoreError> {
        let mut state = self.state();
        let Some(id) = state.active.take() else {
            return Ok(());
        };
        let catalog = state
            .catalogs
            .iter()
            .find(|c| c.catalog.id == id)
            .map(|c| c.catalog.name.clone())
            .unwrap_or_default();
        state.journal.push(Mutation::Deactivated { catalog });
        Ok(())
    }

    async fn list_deployments(
        &self,
        catalog: &CatalogRef,
    ) -> Result<Vec<DeploymentInfo>, StoreError> {
        Ok(self.state().by_ref(catalog)?.deployments.clone())
    }

    async fn disable_deployment(&self, catalog: &CatalogRef, id: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        let c = state.by_ref_mut(catalog)?;
        let deployment = c
            .deployments
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::not_found("deployment", id))?;
        deployment.enabled = false;
        state.journal.push(Mutation::DeploymentDisabled {
            catalog: catalog.name.clone(),
            id: id.to_string(),
        });
        Ok(())
    }

    async fn list_derived(
        &self,
        catalog: &CatalogRef,
        kind: DerivedKind,
    ) -> Result<Vec<ObjectRef>, StoreError> {
        Ok(self
            .state()
            .by_ref(catalog)?
            .derived
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_derived(
        &self,
        catalog: &CatalogRef,
        kind: DerivedKind,
        id: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let c = state.by_ref_mut(catalog)?;
        let objects = c.derived.entry(kind).or_default();
        let before = objects.len();
        objects.retain(|o| o.id != id);
        if objects.len() == before {
            return Err(StoreError::not_found(kind.route(), id));
        }
        state.journal.push(Mutation::DerivedDeleted {
            catalog: catalog.name.clone(),
            kind,
            id: id.to_string(),
        });
        Ok(())
    }

    async fn list_tables(&self, catalog: &CatalogRef) -> Result<Vec<TableRef>, StoreError> {
        Ok(self
            .state()
            .by_ref(catalog)?
            .tables
            .iter()
            .map(|t| t.table.clone())
            .collect())
    }

    async fn get_table(&self, catalog: &CatalogRef, name: &str) -> Result<TableRef, StoreError> {
        self.state()
            .by_ref(catalog)?
            .tables
            .iter()
            .find(|t| t.table.name == name)
            .map(|t| t.table.clone())
            .ok_or_else(|| StoreError::not_found("table", name))
    }

    async fn create_table(
        &self,
        catalog: &CatalogRef,
        feature_store: &str,
        spec: &TableSpec,
    ) -> Result<TableRef, StoreError> {
        let mut state = self.state();
        let id = state.next_id(spec.kind().route());
        let c = state.by_ref_mut(catalog)?;
        if c.feature_store != feature_store {
            return Err(StoreError::not_found("feature store", feature_store));
        }
        if c.tables.iter().any(|t| t.table.name == spec.name) {
            return Err(StoreError::api(
                409,
                format!("Table '{}' already exists", spec.name),
            ));
        }
        let table = TableRef {
            id,
            name: spec.name.clone(),
            kind: spec.kind(),
        };
        c.tables.push(StoredTable {
            table: table.clone(),
            spec: spec.clone(),
            feature_job_setting: None,
            column_entities: BTreeMap::new(),
        });
        state.journal.push(Mutation::TableCreated {
            catalog: catalog.name.clone(),
            table: spec.name.clone(),
        });
        Ok(table)
    }

    async fn update_default_feature_job_setting(
        &self,
        catalog: &CatalogRef,
        table: &TableRef,
        setting: &FeatureJobSetting,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let c = state.by_ref_mut(catalog)?;
        let stored = c
            .tables
            .iter_mut()
            .find(|t| t.table.id == table.id)
            .ok_or_else(|| StoreError::not_found("table", &table.name))?;
        stored.feature_job_setting = Some(*setting);
        state.journal.push(Mutation::FeatureJobSettingUpdated {
            catalog: catalog.name.clone(),
            table: table.name.clone(),
        });
        Ok(())
    }

    async fn get_or_create_entity(
        &self,
        catalog: &CatalogRef,
        name: &str,
        serving_names: &[String],
    ) -> Result<EntityRef, StoreError> {
        let mut state = self.state();
        if let Some(existing) = state.by_ref(catalog)?.entities.iter().find(|e| e.name == name) {
            return Ok(existing.clone());
        }
        let id = state.next_id("entity");
        let c = state.by_ref_mut(catalog)?;
        let entity = EntityRef {
            id,
            name: name.to_string(),
            serving_names: serving_names.to_vec(),
        };
        c.entities.push(entity.clone());
        state.journal.push(Mutation::EntityCreated {
            catalog: catalog.name.clone(),
            entity: name.to_string(),
        });
        Ok(entity)
    }

    async fn tag_column_entity(
        &self,
        catalog: &CatalogRef,
        table: &TableRef,
        column: &str,
        entity: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let c = state.by_ref_mut(catalog)?;
        if !c.entities.iter().any(|e| e.name == entity) {
            return Err(StoreError::not_found("entity", entity));
        }
        let stored = c
            .tables
            .iter_mut()
            .find(|t| t.table.id == table.id)
            .ok_or_else(|| StoreError::not_found("table", &table.name))?;
        stored
            .column_entities
            .insert(column.to_string(), entity.to_string());
        state.journal.push(Mutation::ColumnTagged {
            catalog: catalog.name.clone(),
            table: table.name.clone(),
            column: column.to_string(),
            entity: entity.to_string(),
        });
        Ok(())
    }
}
