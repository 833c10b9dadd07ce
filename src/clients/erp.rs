use std::sync::Arc;
use std::time::Instant;

use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{Map, Value as JsonValue};

use crate::core::error::ErpError;
use crate::domain::{doctype_slug, FilterTriple, QueryParams};
use crate::infra::config::ErpConfig;
use crate::infra::http::client::make_http_client;
use crate::infra::http::headers::{add_standard_headers, frappe_token_headers};
use crate::infra::logging::log_metric;

/// Read-only client for the Frappe `/api/resource` REST surface.
///
/// Every query method issues exactly one GET and returns the records found
/// under the response's `data` key.
#[derive(Clone)]
pub struct ErpClient {
    cfg: Arc<ErpConfig>,
    http: Client,
}

impl ErpClient {
    pub fn new(cfg: ErpConfig) -> Self {
        Self {
            cfg: Arc::new(cfg),
            http: make_http_client(),
        }
    }

    pub fn from_parts(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self::new(ErpConfig {
            base_url: base_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.cfg.base_url.trim_end_matches('/')
    }

    /// Base URL and auth headers for one request. Rebuilt on every call.
    pub fn request_context(&self) -> (String, HeaderMap) {
        (
            self.base_url().to_owned(),
            frappe_token_headers(&self.cfg.api_key, &self.cfg.api_secret),
        )
    }

    fn resource_url(&self, base: &str, segments: &[&str]) -> Result<Url, ErpError> {
        let mut url = Url::parse(base).map_err(|e| ErpError::InvalidUrl(format!("{base:?}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ErpError::InvalidUrl(format!("{base:?} cannot be a base")))?
            .pop_if_empty()
            .extend(["api", "resource"])
            .extend(segments);
        Ok(url)
    }

    /// GET `/api/resource/<segments..>` and return the `data` member
    /// (`Null` when the body has none).
    async fn get_data(
        &self,
        op: &'static str,
        segments: &[&str],
        params: &QueryParams,
    ) -> Result<JsonValue, ErpError> {
        let (base, headers) = self.request_context();
        let url = self.resource_url(&base, segments)?;
        tracing::debug!(op, endpoint = %url, params = ?params.pairs(), "erp request");

        let (builder, rid) = add_standard_headers(
            self.http.get(url).headers(headers).query(params.pairs()),
            None,
        );
        let start = Instant::now();
        let res = read_data(builder).await;
        log_metric(op, "erp_request_latency_ms", start.elapsed().as_millis() as f64);

        if let Err(e) = &res {
            tracing::warn!(op, request_id = %rid, kind = e.kind(), error = %e, "erp request failed");
        }
        res
    }

    pub async fn list_users(&self) -> Result<Vec<JsonValue>, ErpError> {
        let data = self.get_data("list_users", &["User"], &QueryParams::new()).await?;
        Ok(into_records(data))
    }

    pub async fn list_doctypes(&self, module: Option<&str>) -> Result<Vec<JsonValue>, ErpError> {
        let data = self
            .get_data("list_doctypes", &["DocType"], &doctypes_params(module))
            .await?;
        Ok(into_records(data))
    }

    pub async fn get_doctype_list(
        &self,
        doctype: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<JsonValue>, ErpError> {
        let params = QueryParams::new().limit(limit).offset(offset);
        let data = self.get_data("get_doctype_list", &[doctype], &params).await?;
        Ok(into_records(data))
    }

    pub async fn get_doctype_list_with_filters(
        &self,
        doctype: &str,
        filter: Option<FilterTriple>,
        limit: u32,
        order_by: Option<&str>,
    ) -> Result<Vec<JsonValue>, ErpError> {
        let params = filtered_list_params(filter, limit, order_by);
        let data = self
            .get_data("get_doctype_list_with_filters", &[doctype], &params)
            .await?;
        Ok(into_records(data))
    }

    /// Field definitions of a DocType, read from its meta record.
    pub async fn list_doctype_fields(&self, doctype_name: &str) -> Result<Vec<JsonValue>, ErpError> {
        let data = self
            .get_data("list_doctype_fields", &["DocType", doctype_name], &QueryParams::new())
            .await?;
        Ok(match data {
            JsonValue::Object(mut meta) => match meta.remove("fields") {
                Some(JsonValue::Array(fields)) => fields,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        })
    }

    /// One record by `name` (projected to `fields`), or the collection when
    /// no name is given.
    pub async fn fetch_doctype_with_fields(
        &self,
        doctype_name: &str,
        fields: &[String],
        name: Option<&str>,
    ) -> Result<Vec<JsonValue>, ErpError> {
        let mut segments = vec![doctype_name];
        segments.extend(name);
        let params = QueryParams::new().fields(fields);
        let data = self
            .get_data("fetch_doctype_with_fields", &segments, &params)
            .await?;
        Ok(match (name, data) {
            (Some(_), JsonValue::Object(record)) => vec![JsonValue::Object(project(record, fields))],
            (_, other) => into_records(other),
        })
    }

    /// Desk URL of a record. No network access.
    pub fn url_for_doctype(&self, doctype_name: &str, name: &str) -> String {
        format!("{}/app/{}/{}", self.base_url(), doctype_slug(doctype_name), name)
    }
}

async fn read_data(builder: RequestBuilder) -> Result<JsonValue, ErpError> {
    let resp = builder.send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    if status != StatusCode::OK {
        return Err(ErpError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let mut doc: JsonValue = serde_json::from_str(&body)?;
    Ok(doc.get_mut("data").map(JsonValue::take).unwrap_or(JsonValue::Null))
}

pub(crate) fn doctypes_params(module: Option<&str>) -> QueryParams {
    QueryParams::new().filter(module.map(|m| FilterTriple::new("module", "=", m)))
}

pub(crate) fn filtered_list_params(
    filter: Option<FilterTriple>,
    limit: u32,
    order_by: Option<&str>,
) -> QueryParams {
    QueryParams::new()
        .limit_page_length(limit)
        .filter(filter)
        .order_by(order_by)
}

fn into_records(data: JsonValue) -> Vec<JsonValue> {
    match data {
        JsonValue::Array(items) => items,
        JsonValue::Null => Vec::new(),
        other => vec![other],
    }
}

/// Keep only the requested keys that the record actually has.
fn project(mut record: Map<String, JsonValue>, fields: &[String]) -> Map<String, JsonValue> {
    if fields.is_empty() {
        return record;
    }
    fields
        .iter()
        .filter_map(|f| record.remove(f).map(|v| (f.clone(), v)))
        .collect()
}
