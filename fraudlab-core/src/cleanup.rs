//! Cleanup pass over disposable catalogs.
//!
//! For every disposable catalog holding enabled deployments or derived
//! tables, the pass activates the catalog, disables the deployments, and
//! deletes the tables. Work is driven by a snapshot taken before any
//! mutation. Once anything was cleaned, the active-catalog pointer is put
//! back to what it was when the pass started: the original catalog is
//! activated again, or the pointer is cleared if nothing was active.
//!
//! Store errors abort the pass and are returned as-is.

use crate::error::StoreError;
use crate::policy::is_disposable;
use crate::store::{CatalogRef, DeploymentInfo, DerivedKind, FeatureStoreClient, ObjectRef};
use serde::Serialize;
use tracing::{debug, info};

/// Objects a cleanup pass removes from one catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DerivedObjectCounts {
    pub deployments: usize,
    pub batch_feature_tables: usize,
    pub batch_request_tables: usize,
    pub historical_feature_tables: usize,
    pub observation_tables: usize,
}

impl DerivedObjectCounts {
    pub fn total(&self) -> usize {
        self.deployments
            + self.batch_feature_tables
            + self.batch_request_tables
            + self.historical_feature_tables
            + self.observation_tables
    }

    /// Non-zero counts with their labels, in reporting order.
    pub fn nonzero(&self) -> Vec<(&'static str, usize)> {
        [
            ("deployments", self.deployments),
            (DerivedKind::BatchFeatureTable.label(), self.batch_feature_tables),
            (DerivedKind::BatchRequestTable.label(), self.batch_request_tables),
            (
                DerivedKind::HistoricalFeatureTable.label(),
                self.historical_feature_tables,
            ),
            (DerivedKind::ObservationTable.label(), self.observation_tables),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .collect()
    }

    fn set(&mut self, kind: DerivedKind, count: usize) {
        match kind {
            DerivedKind::BatchFeatureTable => self.batch_feature_tables = count,
            DerivedKind::BatchRequestTable => self.batch_request_tables = count,
            DerivedKind::HistoricalFeatureTable => self.historical_feature_tables = count,
            DerivedKind::ObservationTable => self.observation_tables = count,
        }
    }
}

/// What a catalog held when the pass looked at it.
#[derive(Debug, Clone, Default)]
pub struct DerivedSnapshot {
    pub enabled_deployments: Vec<DeploymentInfo>,
    pub derived: Vec<(DerivedKind, Vec<ObjectRef>)>,
}

impl DerivedSnapshot {
    pub async fn capture(
        store: &dyn FeatureStoreClient,
        catalog: &CatalogRef,
    ) -> Result<Self, StoreError> {
        let enabled_deployments = store
            .list_deployments(catalog)
            .await?
            .into_iter()
            .filter(|d| d.enabled)
            .collect();
        let mut derived = Vec::with_capacity(DerivedKind::ALL.len());
        for kind in DerivedKind::ALL {
            derived.push((kind, store.list_derived(catalog, kind).await?));
        }
        Ok(Self {
            enabled_deployments,
            derived,
        })
    }

    pub fn counts(&self) -> DerivedObjectCounts {
        let mut counts = DerivedObjectCounts {
            deployments: self.enabled_deployments.len(),
            ..Default::default()
        };
        for (kind, objects) in &self.derived {
            counts.set(*kind, objects.len());
        }
        counts
    }
}

/// A catalog the pass cleaned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanedCatalog {
    pub catalog: String,
    pub counts: DerivedObjectCounts,
}

/// Outcome of a cleanup pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub cleaned: Vec<CleanedCatalog>,
    /// Protected catalogs the pass left alone.
    pub protected: Vec<String>,
    /// Catalog re-activated at the end of the pass. `None` when nothing
    /// was cleaned or when no catalog was active to begin with.
    pub restored: Option<CatalogRef>,
}

impl CleanupReport {
    pub fn changed_anything(&self) -> bool {
        !self.cleaned.is_empty()
    }
}

/// Runs cleanup passes against a feature store.
pub struct CatalogCleaner<'a> {
    store: &'a dyn FeatureStoreClient,
    verbose: bool,
}

impl<'a> CatalogCleaner<'a> {
    pub fn new(store: &'a dyn FeatureStoreClient) -> Self {
        Self {
            store,
            verbose: true,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run one pass over every catalog in the store.
    pub async fn run(&self) -> Result<CleanupReport, StoreError> {
        let original = self.store.active_catalog().await?;
        let mut report = CleanupReport::default();

        for catalog in self.store.list_catalogs().await? {
            if !is_disposable(&catalog.name) {
                debug!(catalog = %catalog.name, "Skipping protected catalog");
                report.protected.push(catalog.name);
                continue;
            }

            let snapshot = DerivedSnapshot::capture(self.store, &catalog).await?;
            let counts = snapshot.counts();
            if counts.total() == 0 {
                continue;
            }

            self.log_counts(&catalog.name, &counts);
            self.clean(&catalog, &snapshot).await?;
            report.cleaned.push(CleanedCatalog {
                catalog: catalog.name,
                counts,
            });
        }

        if report.changed_anything() {
            match original {
                Some(original) => {
                    report.restored = Some(self.store.activate_catalog(&original.name).await?);
                    debug!(catalog = %original.name, "Restored active catalog");
                }
                None => {
                    self.store.deactivate_catalog().await?;
                    debug!("Cleared active catalog");
                }
            }
        }

        Ok(report)
    }

    async fn clean(
        &self,
        catalog: &CatalogRef,
        snapshot: &DerivedSnapshot,
    ) -> Result<(), StoreError> {
        let catalog = self.store.activate_catalog(&catalog.name).await?;

        for deployment in &snapshot.enabled_deployments {
            self.store.disable_deployment(&catalog, &deployment.id).await?;
            debug!(catalog = %catalog.name, deployment = %deployment.name, "Disabled deployment");
        }

        for (kind, objects) in &snapshot.derived {
            for object in objects {
                self.store.delete_derived(&catalog, *kind, &object.id).await?;
                debug!(catalog = %catalog.name, kind = %kind, table = %object.name, "Deleted");
            }
        }
        Ok(())
    }

    fn log_counts(&self, catalog: &str, counts: &DerivedObjectCounts) {
        if !self.verbose {
            debug!(catalog, total = counts.total(), "Cleaning catalog");
            return;
        }
        info!("Cleaning catalog: {catalog}");
        for (label, count) in counts.nonzero() {
            info!("  {count} {label}");
        }
    }
}

/// Run a cleanup pass against `store`.
pub async fn cleanup(
    store: &dyn FeatureStoreClient,
    verbose: bool,
) -> Result<CleanupReport, StoreError> {
    CatalogCleaner::new(store).verbose(verbose).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        EntityRef, FeatureJobSetting, InMemoryFeatureStore, Mutation, TableRef, TableSpec,
    };
    use pretty_assertions::assert_eq;

    fn workshop_store() -> InMemoryFeatureStore {
        InMemoryFeatureStore::new()
            .with_catalog("quick start fraud")
            .with_deployment("quick start fraud", "fraud model v1", true)
            .with_deployment("quick start fraud", "fraud model v0", false)
            .with_derived("quick start fraud", DerivedKind::BatchFeatureTable, "bft")
            .with_derived("quick start fraud", DerivedKind::ObservationTable, "obs 1")
            .with_derived("quick start fraud", DerivedKind::ObservationTable, "obs 2")
            .with_catalog("credit card playground 20250101:0900_x")
            .with_deployment("credit card playground 20250101:0900_x", "mine", true)
            .with_derived(
                "credit card playground 20250101:0900_x",
                DerivedKind::HistoricalFeatureTable,
                "training data",
            )
            .with_catalog("deep dive empty")
            .with_catalog("Healthcare Demo Intro")
            .with_derived(
                "Healthcare Demo Intro",
                DerivedKind::BatchRequestTable,
                "batch req",
            )
            .with_active("credit card playground 20250101:0900_x")
    }

    #[tokio::test]
    async fn test_cleanup_empties_disposable_catalogs() {
        let store = workshop_store();
        let report = cleanup(&store, true).await.unwrap();

        assert_eq!(store.derived_total("quick start fraud"), 0);
        assert_eq!(store.derived_total("Healthcare Demo Intro"), 0);
        assert_eq!(
            report.cleaned,
            vec![
                CleanedCatalog {
                    catalog: "quick start fraud".into(),
                    counts: DerivedObjectCounts {
                        deployments: 1,
                        batch_feature_tables: 1,
                        observation_tables: 2,
                        ..Default::default()
                    },
                },
                CleanedCatalog {
                    catalog: "Healthcare Demo Intro".into(),
                    counts: DerivedObjectCounts {
                        batch_request_tables: 1,
                        ..Default::default()
                    },
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_cleanup_never_touches_protected_catalogs() {
        let store = workshop_store();
        let report = cleanup(&store, false).await.unwrap();

        let playground = "credit card playground 20250101:0900_x";
        assert_eq!(store.derived_total(playground), 2);
        assert_eq!(report.protected, vec![playground.to_string()]);
        assert!(
            store
                .journal()
                .iter()
                .filter(|m| m.changes_contents())
                .all(|m| m.catalog() != playground)
        );
    }

    #[tokio::test]
    async fn test_cleanup_restores_original_active_catalog() {
        let store = workshop_store();
        let report = cleanup(&store, false).await.unwrap();

        assert_eq!(
            store.active_name().as_deref(),
            Some("credit card playground 20250101:0900_x")
        );
        assert_eq!(
            report.restored.map(|c| c.name).as_deref(),
            Some("credit card playground 20250101:0900_x")
        );
        let last = store.journal().last().cloned();
        assert_eq!(
            last,
            Some(Mutation::Activated {
                catalog: "credit card playground 20250101:0900_x".into()
            })
        );
    }

    #[tokio::test]
    async fn test_cleanup_without_work_leaves_pointer_alone() {
        let store = InMemoryFeatureStore::new()
            .with_catalog("deep dive empty")
            .with_catalog("playground")
            .with_deployment("playground", "d", true)
            .with_active("deep dive empty");
        let report = cleanup(&store, true).await.unwrap();

        assert!(!report.changed_anything());
        assert!(report.restored.is_none());
        assert!(store.journal().is_empty());
        assert_eq!(store.active_name().as_deref(), Some("deep dive empty"));
    }

    #[tokio::test]
    async fn test_disabled_deployments_are_not_counted_or_touched() {
        let store = InMemoryFeatureStore::new()
            .with_catalog("quick start x")
            .with_deployment("quick start x", "off", false);
        let report = cleanup(&store, true).await.unwrap();

        assert!(report.cleaned.is_empty());
        assert!(store.journal().is_empty());
    }

    #[tokio::test]
    async fn test_activates_each_catalog_before_mutating_it() {
        let store = workshop_store();
        cleanup(&store, false).await.unwrap();

        let journal = store.journal();
        let first_content_change = journal
            .iter()
            .position(|m| m.changes_contents() && m.catalog() == "quick start fraud")
            .unwrap();
        assert_eq!(
            journal[first_content_change - 1],
            Mutation::Activated {
                catalog: "quick start fraud".into()
            }
        );
    }

    #[tokio::test]
    async fn test_no_active_catalog_is_restored_as_none() {
        let store = InMemoryFeatureStore::new()
            .with_catalog("deep dive a")
            .with_derived("deep dive a", DerivedKind::ObservationTable, "o");
        let report = cleanup(&store, false).await.unwrap();

        assert!(report.changed_anything());
        assert!(report.restored.is_none());
        assert_eq!(store.active_name(), None);
        assert_eq!(
            store.journal().last().cloned(),
            Some(Mutation::Deactivated {
                catalog: "deep dive a".into()
            })
        );
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let store = InMemoryFeatureStore::new()
            .with_catalog("quick start broken")
            .with_derived("quick start broken", DerivedKind::BatchFeatureTable, "t")
            .with_catalog("quick start fine")
            .with_derived("quick start fine", DerivedKind::BatchFeatureTable, "t")
            .with_failing_catalog("quick start broken");

        let err = cleanup(&store, false).await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 503, .. }));
        // The pass stops at the first failure.
        assert_eq!(store.derived_total("quick start fine"), 1);
    }

    /// Drops `victim` from the inner store on the first table deletion.
    struct VanishingStore {
        inner: InMemoryFeatureStore,
        victim: String,
    }

    #[async_trait::async_trait]
    impl FeatureStoreClient for VanishingStore {
        async fn list_catalogs(&self) -> Result<Vec<CatalogRef>, StoreError> {
            self.inner.list_catalogs().await
        }
        async fn get_catalog(&self, name: &str) -> Result<CatalogRef, StoreError> {
            self.inner.get_catalog(name).await
        }
        async fn create_catalog(&self, name: &str, fs: &str) -> Result<CatalogRef, StoreError> {
            self.inner.create_catalog(name, fs).await
        }
        async fn active_catalog(&self) -> Result<Option<CatalogRef>, StoreError> {
            self.inner.active_catalog().await
        }
        async fn activate_catalog(&self, name: &str) -> Result<CatalogRef, StoreError> {
            self.inner.activate_catalog(name).await
        }
        async fn deactivate_catalog(&self) -> Result<(), StoreError> {
            self.inner.deactivate_catalog().await
        }
        async fn list_deployments(
            &self,
            c: &CatalogRef,
        ) -> Result<Vec<DeploymentInfo>, StoreError> {
            self.inner.list_deployments(c).await
        }
        async fn disable_deployment(&self, c: &CatalogRef, id: &str) -> Result<(), StoreError> {
            self.inner.disable_deployment(c, id).await
        }
        async fn list_derived(
            &self,
            c: &CatalogRef,
            kind: DerivedKind,
        ) -> Result<Vec<ObjectRef>, StoreError> {
            self.inner.list_derived(c, kind).await
        }
        async fn delete_derived(
            &self,
            c: &CatalogRef,
            kind: DerivedKind,
            id: &str,
        ) -> Result<(), StoreError> {
            self.inner.delete_derived(c, kind, id).await?;
            self.inner.drop_catalog(&self.victim);
            Ok(())
        }
        async fn list_tables(&self, c: &CatalogRef) -> Result<Vec<TableRef>, StoreError> {
            self.inner.list_tables(c).await
        }
        async fn get_table(&self, c: &CatalogRef, name: &str) -> Result<TableRef, StoreError> {
            self.inner.get_table(c, name).await
        }
        async fn create_table(
            &self,
            c: &CatalogRef,
            fs: &str,
            spec: &TableSpec,
        ) -> Result<TableRef, StoreError> {
            self.inner.create_table(c, fs, spec).await
        }
        async fn update_default_feature_job_setting(
            &self,
            c: &CatalogRef,
            t: &TableRef,
            s: &FeatureJobSetting,
        ) -> Result<(), StoreError> {
            self.inner.update_default_feature_job_setting(c, t, s).await
        }
        async fn get_or_create_entity(
            &self,
            c: &CatalogRef,
            name: &str,
            serving: &[String],
        ) -> Result<EntityRef, StoreError> {
            self.inner.get_or_create_entity(c, name, serving).await
        }
        async fn tag_column_entity(
            &self,
            c: &CatalogRef,
            t: &TableRef,
            column: &str,
            entity: &str,
        ) -> Result<(), StoreError> {
            self.inner.tag_column_entity(c, t, column, entity).await
        }
    }

    #[tokio::test]
    async fn test_restore_fails_when_original_catalog_vanished() {
        let store = VanishingStore {
            inner: InMemoryFeatureStore::new()
                .with_catalog("deep dive a")
                .with_derived("deep dive a", DerivedKind::ObservationTable, "o")
                .with_catalog("my playground")
                .with_active("my playground"),
            victim: "my playground".into(),
        };

        let err = cleanup(&store, false).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "catalog", .. }));
        assert_eq!(store.inner.derived_total("deep dive a"), 0);
    }

    #[test]
    fn test_counts_nonzero_labels() {
        let counts = DerivedObjectCounts {
            deployments: 2,
            historical_feature_tables: 1,
            ..Default::default()
        };
        assert_eq!(counts.total(), 3);
        assert_eq!(
            counts.nonzero(),
            vec![("deployments", 2), ("historical feature tables", 1)]
        );
    }
}
