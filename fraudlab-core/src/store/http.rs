//! Feature-store REST API client using reqwest.
//!
//! The active catalog is client-side state, as in the platform's own SDK:
//! [`HttpFeatureStore::activate_catalog`] resolves the catalog and remembers
//! it. Until a catalog is activated, or after the pointer is cleared, the
//! platform's default catalog counts as active. Catalog-scoped requests
//! carry the `active-catalog-id` header for the catalog passed to them, not
//! the remembered one.
//!
//! The HTTP round trip sits behind [`StoreTransport`]; [`ReqwestTransport`]
//! is the real implementation.

use super::{
    CatalogRef, DeploymentInfo, DerivedKind, EntityRef, FeatureJobSetting, FeatureStoreClient,
    ObjectRef, TableKind, TableRef, TableSpec,
};
use crate::config::StoreConfig;
use crate::error::StoreError;
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

const CATALOG_HEADER: &str = "active-catalog-id";

#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    #[serde(default)]
    total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct NamedDoc {
    #[serde(rename = "_id")]
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DeploymentDoc {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct TableDoc {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(rename = "type")]
    table_type: String,
}

#[derive(Debug, Deserialize)]
struct EntityDoc {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    serving_names: Vec<String>,
}

impl From<EntityDoc> for EntityRef {
    fn from(doc: EntityDoc) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            serving_names: doc.serving_names,
        }
    }
}

/// Map a REST `type` field to the table kinds this crate registers.
fn table_kind(table_type: &str) -> Option<TableKind> {
    match table_type {
        "event_table" => Some(TableKind::Event),
        "scd_table" => Some(TableKind::Scd),
        "dimension_table" => Some(TableKind::Dimension),
        _ => None,
    }
}

/// Extract a readable message from an error response body.
fn api_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(v) => match &v["detail"] {
            Value::String(s) => s.clone(),
            Value::Null => body.to_string(),
            other => other.to_string(),
        },
        Err(_) if body.is_empty() => "no response body".to_string(),
        Err(_) => body.to_string(),
    }
}

/// Body for registering a source table.
fn table_payload(feature_store_id: &str, spec: &TableSpec) -> Value {
    let mut payload = json!({
        "name": spec.name,
        "tabular_source": {
            "feature_store_id": feature_store_id,
            "table_details": {
                "database_name": spec.source.database_name,
                "schema_name": spec.source.schema_name,
                "table_name": spec.source.table_name,
            },
        },
    });
    if let (Value::Object(target), Ok(Value::Object(roles))) =
        (&mut payload, serde_json::to_value(&spec.roles))
    {
        for (key, value) in roles {
            if key != "type" && !value.is_null() {
                target.insert(key, value);
            }
        }
    }
    payload
}

/// One REST call, independent of the HTTP library carrying it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRequest {
    pub method: Method,
    /// Path relative to the API base URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Value of the `active-catalog-id` header.
    pub catalog_id: Option<String>,
    pub body: Option<Value>,
}

impl StoreRequest {
    fn new(method: Method, path: impl Into<String>, catalog: Option<&CatalogRef>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            catalog_id: catalog.map(|c| c.id.clone()),
            body: None,
        }
    }

    fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status and raw body of a REST response.
#[derive(Debug, Clone)]
pub struct StoreResponse {
    pub status: u16,
    pub body: String,
}

/// Trait for the HTTP round trip, so the client can run against a mock.
#[async_trait]
pub trait StoreTransport: Send + Sync {
    async fn execute(&self, request: StoreRequest) -> Result<StoreResponse, StoreError>;
}

/// Transport over reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl ReqwestTransport {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base_url = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))?;
        Ok(Self {
            client,
            base_url,
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
        })
    }
}

#[async_trait]
impl StoreTransport for ReqwestTransport {
    async fn execute(&self, request: StoreRequest) -> Result<StoreResponse, StoreError> {
        let url = self.base_url.join(&request.path)?;
        let mut req = self.client.request(request.method, url).query(&request.query);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }
        if let Some(catalog_id) = &request.catalog_id {
            req = req.header(CATALOG_HEADER, catalog_id);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(StoreResponse { status, body })
    }
}

/// Feature-store client speaking the REST API.
pub struct HttpFeatureStore {
    transport: Box<dyn StoreTransport>,
    page_size: usize,
    default_catalog: String,
    active: RwLock<Option<CatalogRef>>,
}

impl HttpFeatureStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        Ok(Self::with_transport(
            config,
            Box::new(ReqwestTransport::new(config)?),
        ))
    }

    pub fn with_transport(config: &StoreConfig, transport: Box<dyn StoreTransport>) -> Self {
        Self {
            transport,
            page_size: config.page_size.max(1),
            default_catalog: config.default_catalog.clone(),
            active: RwLock::new(None),
        }
    }

    async fn send(&self, request: StoreRequest) -> Result<String, StoreError> {
        let resp = self.transport.execute(request).await?;
        if (200..300).contains(&resp.status) {
            return Ok(resp.body);
        }
        Err(StoreError::api(resp.status, api_message(&resp.body)))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: StoreRequest) -> Result<T, StoreError> {
        let body = self.send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Walk every page of a listing endpoint.
    ///
    /// Stops once `total` items arrived, or, when the response carries no
    /// `total`, at the first short page.
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        filter: Option<(&str, &str)>,
        catalog: Option<&CatalogRef>,
    ) -> Result<Vec<T>, StoreError> {
        let mut items = Vec::new();
        let mut page = 1usize;
        loop {
            let mut request = StoreRequest::new(Method::GET, path, catalog)
                .query("page", page.to_string())
                .query("page_size", self.page_size.to_string());
            if let Some((key, value)) = filter {
                request = request.query(key, value);
            }
            let batch: Page<T> = self.send_json(request).await?;
            let received = batch.data.len();
            items.extend(batch.data);
            debug!(path, page, received, total = ?batch.total, "Listed page");
            let done = match batch.total {
                Some(total) => items.len() >= total,
                None => received < self.page_size,
            };
            if received == 0 || done {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    async fn feature_store_id(&self, name: &str) -> Result<String, StoreError> {
        let stores: Vec<NamedDoc> = self
            .list_all("feature_store", Some(("name", name)), None)
            .await?;
        stores
            .into_iter()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .ok_or_else(|| StoreError::not_found("feature store", name))
    }

    async fn find_entity(
        &self,
        catalog: &CatalogRef,
        name: &str,
    ) -> Result<Option<EntityRef>, StoreError> {
        let entities: Vec<EntityDoc> = self
            .list_all("entity", Some(("name", name)), Some(catalog))
            .await?;
        Ok(entities
            .into_iter()
            .find(|e| e.name == name)
            .map(EntityRef::from))
    }
}

#[async_trait]
impl FeatureStoreClient for HttpFeatureStore {
    async fn list_catalogs(&self) -> Result<Vec<CatalogRef>, StoreError> {
        let docs: Vec<NamedDoc> = self.list_all("catalog", None, None).await?;
        Ok(docs
            .into_iter()
            .map(|d| CatalogRef {
                id: d.id,
                name: d.name,
            })
            .collect())
    }

    async fn get_catalog(&self, name: &str) -> Result<CatalogRef, StoreError> {
        let docs: Vec<NamedDoc> = self.list_all("catalog", Some(("name", name)), None).await?;
        docs.into_iter()
            .find(|d| d.name == name)
            .map(|d| CatalogRef {
                id: d.id,
                name: d.name,
            })
            .ok_or_else(|| StoreError::not_found("catalog", name))
    }

    async fn create_catalog(
        &self,
        name: &str,
        feature_store: &str,
    ) -> Result<CatalogRef, StoreError> {
        let feature_store_id = self.feature_store_id(feature_store).await?;
        let request = StoreRequest::new(Method::POST, "catalog", None).json(json!({
            "name": name,
            "default_feature_store_ids": [feature_store_id],
        }));
        let doc: NamedDoc = self.send_json(request).await?;
        Ok(CatalogRef {
            id: doc.id,
            name: doc.name,
        })
    }

    async fn active_catalog(&self) -> Result<Option<CatalogRef>, StoreError> {
        if let Some(active) = self.active.read().await.clone() {
            return Ok(Some(active));
        }
        match self.get_catalog(&self.default_catalog).await {
            Ok(catalog) => Ok(Some(catalog)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn activate_catalog(&self, name: &str) -> Result<CatalogRef, StoreError> {
        let catalog = self.get_catalog(name).await?;
        *self.active.write().await = Some(catalog.clone());
        debug!(catalog = %catalog.name, id = %catalog.id, "Activated catalog");
        Ok(catalog)
    }

    async fn deactivate_catalog(&self) -> Result<(), StoreError> {
        *self.active.write().await = None;
        Ok(())
    }

    async fn list_deployments(
        &self,
        catalog: &CatalogRef,
    ) -> Result<Vec<DeploymentInfo>, StoreError> {
        let docs: Vec<DeploymentDoc> = self.list_all("deployment", None, Some(catalog)).await?;
        Ok(docs
            .into_iter()
            .map(|d| DeploymentInfo {
                id: d.id,
                name: d.name,
                enabled: d.enabled,
            })
            .collect())
    }

    async fn disable_deployment(&self, catalog: &CatalogRef, id: &str) -> Result<(), StoreError> {
        let request = StoreRequest::new(Method::PATCH, format!("deployment/{id}"), Some(catalog))
            .json(json!({ "enabled": false }));
        self.send(request).await?;
        Ok(())
    }

    async fn list_derived(
        &self,
        catalog: &CatalogRef,
        kind: DerivedKind,
    ) -> Result<Vec<ObjectRef>, StoreError> {
        let docs: Vec<NamedDoc> = self.list_all(kind.route(), None, Some(catalog)).await?;
        Ok(docs
            .into_iter()
            .map(|d| ObjectRef {
                id: d.id,
                name: d.name,
            })
            .collect())
    }

    async fn delete_derived(
        &self,
        catalog: &CatalogRef,
        kind: DerivedKind,
        id: &str,
    ) -> Result<(), StoreError> {
        let request = StoreRequest::new(
            Method::DELETE,
            format!("{}/{id}", kind.route()),
            Some(catalog),
        );
        self.send(request).await?;
        Ok(())
    }

    async fn list_tables(&self, catalog: &CatalogRef) -> Result<Vec<TableRef>, StoreError> {
        let docs: Vec<TableDoc> = self.list_all("table", None, Some(catalog)).await?;
        Ok(docs
            .into_iter()
            .filter_map(|d| match table_kind(&d.table_type) {
                Some(kind) => Some(TableRef {
                    id: d.id,
                    name: d.name,
                    kind,
                }),
                None => {
                    debug!(table = %d.name, table_type = %d.table_type, "Skipping table kind");
                    None
                }
            })
            .collect())
    }

    async fn get_table(&self, catalog: &CatalogRef, name: &str) -> Result<TableRef, StoreError> {
        self.list_tables(catalog)
            .await?
            .into_iter()
            .find(|t| t.name == name)
            .ok_or_else(|| StoreError::not_found("table", name))
    }

    async fn create_table(
        &self,
        catalog: &CatalogRef,
        feature_store: &str,
        spec: &TableSpec,
    ) -> Result<TableRef, StoreError> {
        let feature_store_id = self.feature_store_id(feature_store).await?;
        let request = StoreRequest::new(Method::POST, spec.kind().route(), Some(catalog))
            .json(table_payload(&feature_store_id, spec));
        let doc: NamedDoc = self.send_json(request).await?;
        Ok(TableRef {
            id: doc.id,
            name: doc.name,
            kind: spec.kind(),
        })
    }

    async fn update_default_feature_job_setting(
        &self,
        catalog: &CatalogRef,
        table: &TableRef,
        setting: &FeatureJobSetting,
    ) -> Result<(), StoreError> {
        let request = StoreRequest::new(
            Method::PATCH,
            format!("{}/{}", table.kind.route(), table.id),
            Some(catalog),
        )
        .json(json!({ "default_feature_job_setting": setting.to_payload() }));
        self.send(request).await?;
        Ok(())
    }

    async fn get_or_create_entity(
        &self,
        catalog: &CatalogRef,
        name: &str,
        serving_names: &[String],
    ) -> Result<EntityRef, StoreError> {
        if let Some(existing) = self.find_entity(catalog, name).await? {
            return Ok(existing);
        }
        let request = StoreRequest::new(Method::POST, "entity", Some(catalog))
            .json(json!({ "name": name, "serving_names": serving_names }));
        let doc: EntityDoc = self.send_json(request).await?;
        Ok(doc.into())
    }

    async fn tag_column_entity(
        &self,
        catalog: &CatalogRef,
        table: &TableRef,
        column: &str,
        entity: &str,
    ) -> Result<(), StoreError> {
        let entity = self
            .find_entity(catalog, entity)
            .await?
            .ok_or_else(|| StoreError::not_found("entity", entity))?;
        let request = StoreRequest::new(
            Method::PATCH,
            format!("{}/{}/column_entity", table.kind.route(), table.id),
            Some(catalog),
        )
        .json(json!({ "column_name": column, "entity_id": entity.id }));
        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ColumnRoles, SourceTable};
    use std::sync::{Arc, Mutex};

    type Responder = Box<dyn Fn(&StoreRequest) -> StoreResponse + Send + Sync>;

    /// Answers from a closure and records every request.
    struct MockTransport {
        respond: Responder,
        requests: Arc<Mutex<Vec<StoreRequest>>>,
    }

    #[async_trait]
    impl StoreTransport for MockTransport {
        async fn execute(&self, request: StoreRequest) -> Result<StoreResponse, StoreError> {
            let response = (self.respond)(&request);
            self.requests.lock().unwrap().push(request);
            Ok(response)
        }
    }

    fn mock_store(
        page_size: usize,
        respond: impl Fn(&StoreRequest) -> StoreResponse + Send + Sync + 'static,
    ) -> (HttpFeatureStore, Arc<Mutex<Vec<StoreRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let config = StoreConfig {
            page_size,
            ..StoreConfig::default()
        };
        let transport = MockTransport {
            respond: Box::new(respond),
            requests: Arc::clone(&requests),
        };
        (
            HttpFeatureStore::with_transport(&config, Box::new(transport)),
            requests,
        )
    }

    fn ok(body: Value) -> StoreResponse {
        StoreResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    fn docs(names: &[&str]) -> Value {
        Value::Array(
            names
                .iter()
                .map(|n| json!({ "_id": format!("id-{n}"), "name": n }))
                .collect(),
        )
    }

    fn query_param<'a>(request: &'a StoreRequest, key: &str) -> Option<&'a str> {
        request
            .query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn page_number(request: &StoreRequest) -> usize {
        query_param(request, "page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(1)
    }

    fn quick_start() -> CatalogRef {
        CatalogRef {
            id: "cat-1".into(),
            name: "quick start fraud".into(),
        }
    }

    fn transactions() -> TableRef {
        TableRef {
            id: "t1".into(),
            name: "CARDTRANSACTIONS".into(),
            kind: TableKind::Event,
        }
    }

    fn catalogs_by_name(request: &StoreRequest) -> StoreResponse {
        let names: &[&str] = match query_param(request, "name") {
            Some("default") => &["default"],
            Some("quick start fraud") => &["quick start fraud"],
            _ => &[],
        };
        ok(json!({ "data": docs(names), "total": names.len() }))
    }

    fn config(base_url: &str) -> StoreConfig {
        StoreConfig {
            base_url: base_url.to_string(),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let transport = ReqwestTransport::new(&config("http://localhost:8088/api/v1")).unwrap();
        assert_eq!(transport.base_url.as_str(), "http://localhost:8088/api/v1/");
        assert_eq!(
            transport.base_url.join("catalog").unwrap().as_str(),
            "http://localhost:8088/api/v1/catalog"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = HttpFeatureStore::new(&config("not a url"));
        assert!(matches!(result, Err(StoreError::Url(_))));
    }

    #[test]
    fn test_api_message_prefers_detail() {
        assert_eq!(
            api_message(r#"{"detail": "Catalog (name: \"x\") not found."}"#),
            "Catalog (name: \"x\") not found."
        );
        assert_eq!(api_message(""), "no response body");
        assert_eq!(api_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(
            api_message(r#"{"detail": [{"msg": "field required"}]}"#),
            r#"[{"msg":"field required"}]"#
        );
    }

    #[test]
    fn test_table_kind_mapping() {
        assert_eq!(table_kind("event_table"), Some(TableKind::Event));
        assert_eq!(table_kind("scd_table"), Some(TableKind::Scd));
        assert_eq!(table_kind("dimension_table"), Some(TableKind::Dimension));
        assert_eq!(table_kind("item_table"), None);
    }

    #[test]
    fn test_table_payload_flattens_roles() {
        let spec = TableSpec {
            name: "STATEDETAILS".into(),
            source: SourceTable {
                database_name: "spark_catalog".into(),
                schema_name: "CREDITCARD".into(),
                table_name: "STATEDETAILS".into(),
            },
            roles: ColumnRoles::Scd {
                surrogate_key_column: Some("StateGuid".into()),
                natural_key_column: "StateCode".into(),
                effective_timestamp_column: "ValidFrom".into(),
                end_timestamp_column: None,
                record_creation_timestamp_column: None,
            },
        };
        let payload = table_payload("fs-1", &spec);
        assert_eq!(payload["name"], "STATEDETAILS");
        assert_eq!(payload["tabular_source"]["feature_store_id"], "fs-1");
        assert_eq!(
            payload["tabular_source"]["table_details"]["schema_name"],
            "CREDITCARD"
        );
        assert_eq!(payload["natural_key_column"], "StateCode");
        assert_eq!(payload["surrogate_key_column"], "StateGuid");
        assert!(payload.get("end_timestamp_column").is_none());
        assert!(payload.get("type").is_none());
    }

    #[test]
    fn test_page_deserializes_documents() {
        let page: Page<DeploymentDoc> = serde_json::from_str(
            r#"{"page": 1, "page_size": 100, "total": 1,
                "data": [{"_id": "d1", "name": "fraud model", "enabled": true}]}"#,
        )
        .unwrap();
        assert_eq!(page.total, Some(1));
        assert!(page.data[0].enabled);
        assert_eq!(page.data[0].id, "d1");
    }

    #[tokio::test]
    async fn test_listing_walks_pages_until_total() {
        let (store, requests) = mock_store(2, |request| {
            let names: &[&str] = match page_number(request) {
                1 => &["a", "b"],
                2 => &["c", "d"],
                _ => &["e"],
            };
            ok(json!({ "data": docs(names), "total": 5 }))
        });

        let names: Vec<String> = store
            .list_catalogs()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(query_param(&requests[0], "page_size"), Some("2"));
        assert_eq!(query_param(&requests[2], "page"), Some("3"));
        assert!(
            requests
                .iter()
                .all(|r| r.method == Method::GET && r.path == "catalog" && r.catalog_id.is_none())
        );
    }

    #[tokio::test]
    async fn test_listing_without_total_reads_until_short_page() {
        let (store, requests) = mock_store(1, |request| {
            let names: &[&str] = match page_number(request) {
                1 => &["quick start a"],
                2 => &["quick start b"],
                _ => &[],
            };
            ok(json!({ "data": docs(names) }))
        });

        let catalogs = store.list_catalogs().await.unwrap();
        assert_eq!(catalogs.len(), 2);
        assert_eq!(catalogs[1].name, "quick start b");
        assert_eq!(requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_listing_without_total_stops_on_partial_page() {
        let (store, requests) = mock_store(2, |request| {
            let names: &[&str] = match page_number(request) {
                1 => &["a", "b"],
                _ => &["c"],
            };
            ok(json!({ "data": docs(names) }))
        });

        assert_eq!(store.list_catalogs().await.unwrap().len(), 3);
        assert_eq!(requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_error_status_becomes_api_error() {
        let (store, _) = mock_store(100, |_| StoreResponse {
            status: 404,
            body: r#"{"detail": "Catalog not found"}"#.into(),
        });
        let err = store.list_catalogs().await.unwrap_err();
        match err {
            StoreError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Catalog not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let (store, _) = mock_store(100, |_| StoreResponse {
            status: 200,
            body: "<html>".into(),
        });
        let err = store.list_catalogs().await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[tokio::test]
    async fn test_catalog_scoped_calls_carry_catalog_header() {
        let (store, requests) = mock_store(100, |_| {
            ok(json!({
                "data": [{ "_id": "d1", "name": "fraud model", "enabled": true }],
                "total": 1,
            }))
        });
        let catalog = quick_start();

        let deployments = store.list_deployments(&catalog).await.unwrap();
        assert!(deployments[0].enabled);
        store.disable_deployment(&catalog, "d1").await.unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].path, "deployment");
        assert_eq!(requests[0].catalog_id.as_deref(), Some("cat-1"));
        assert_eq!(requests[1].method, Method::PATCH);
        assert_eq!(requests[1].path, "deployment/d1");
        assert_eq!(requests[1].catalog_id.as_deref(), Some("cat-1"));
        assert_eq!(requests[1].body, Some(json!({ "enabled": false })));
    }

    #[tokio::test]
    async fn test_delete_derived_request() {
        let (store, requests) = mock_store(100, |_| ok(json!({})));
        store
            .delete_derived(&quick_start(), DerivedKind::ObservationTable, "o1")
            .await
            .unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].method, Method::DELETE);
        assert_eq!(requests[0].path, "observation_table/o1");
        assert_eq!(requests[0].catalog_id.as_deref(), Some("cat-1"));
        assert_eq!(requests[0].body, None);
    }

    #[tokio::test]
    async fn test_feature_job_setting_patch() {
        let (store, requests) = mock_store(100, |_| ok(json!({})));
        store
            .update_default_feature_job_setting(
                &quick_start(),
                &transactions(),
                &FeatureJobSetting::from_secs(120, 3600, 65),
            )
            .await
            .unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].method, Method::PATCH);
        assert_eq!(requests[0].path, "event_table/t1");
        assert_eq!(
            requests[0].body,
            Some(json!({
                "default_feature_job_setting": {
                    "blind_spot": "120s",
                    "frequency": "3600s",
                    "time_modulo_frequency": "65s",
                }
            }))
        );
    }

    #[tokio::test]
    async fn test_tag_column_entity_resolves_entity_id() {
        let (store, requests) = mock_store(100, |request| {
            if request.path == "entity" {
                ok(json!({
                    "data": [{ "_id": "e1", "name": "credit_card", "serving_names": ["AccountID"] }],
                    "total": 1,
                }))
            } else {
                ok(json!({}))
            }
        });
        store
            .tag_column_entity(&quick_start(), &transactions(), "AccountID", "credit_card")
            .await
            .unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(query_param(&requests[0], "name"), Some("credit_card"));
        assert_eq!(requests[0].catalog_id.as_deref(), Some("cat-1"));
        assert_eq!(requests[1].method, Method::PATCH);
        assert_eq!(requests[1].path, "event_table/t1/column_entity");
        assert_eq!(
            requests[1].body,
            Some(json!({ "column_name": "AccountID", "entity_id": "e1" }))
        );
    }

    #[tokio::test]
    async fn test_tagging_unknown_entity_is_not_found() {
        let (store, requests) = mock_store(100, |_| ok(json!({ "data": [], "total": 0 })));
        let err = store
            .tag_column_entity(&quick_start(), &transactions(), "AccountID", "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "entity", .. }));
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_active_catalog_falls_back_to_default() {
        let (store, _) = mock_store(100, catalogs_by_name);

        let active = store.active_catalog().await.unwrap().unwrap();
        assert_eq!(active.name, "default");

        store.activate_catalog("quick start fraud").await.unwrap();
        let active = store.active_catalog().await.unwrap().unwrap();
        assert_eq!(active.name, "quick start fraud");

        store.deactivate_catalog().await.unwrap();
        let active = store.active_catalog().await.unwrap().unwrap();
        assert_eq!(active.name, "default");
    }

    #[tokio::test]
    async fn test_no_default_catalog_means_nothing_active() {
        let (store, _) = mock_store(100, |_| ok(json!({ "data": [], "total": 0 })));
        assert!(store.active_catalog().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_active_catalog_lookup_errors_propagate() {
        let (store, _) = mock_store(100, |_| StoreResponse {
            status: 503,
            body: String::new(),
        });
        let err = store.active_catalog().await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 503, .. }));
    }
}
