// ai
//! 🦕 EsApiV0: the legacy generation, and the foundation every newer one stands on.
//!
//! Metadata operations, bulk writes, and the pre-5.0 scroll dialect (scroll id shipped as
//! the raw request body, no slices). Newer generations borrow almost all of this.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use super::scroll_page::{PlainTotal, decode_scroll_page};
use super::{
    ClusterApi, ClusterHealth, IndexMappings, ProtocolGeneration, ScrollPage, ScrollRequest,
    expand_index_pattern, require_index_name, scroll_query_body, wrap_legacy_mappings,
};
use crate::transport::{HttpTransport, RequestBody};

/// 🦕 The base adapter. Owns the transport; everything newer owns one of these.
#[derive(Debug, Clone)]
pub(crate) struct EsApiV0 {
    transport: HttpTransport,
}

#[derive(Deserialize)]
struct BulkResponseSummary {
    #[serde(default)]
    errors: bool,
}

impl EsApiV0 {
    pub(crate) fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// 🚀 `POST {indices}/_search?scroll=..&size=..` with an optional body. Returns the raw
    /// response body so each generation can decode it in its own dialect.
    pub(crate) async fn post_scroll_search(
        &self,
        request: &ScrollRequest,
        body: Option<Value>,
    ) -> Result<String> {
        let path = format!(
            "{}/_search?scroll={}&size={}",
            request.indices, request.keepalive, request.page_size
        );
        let body = body.as_ref().map(RequestBody::json).transpose()?;
        self.transport
            .send(Method::POST, &path, body)
            .await?
            .into_success(&format!("Opening a scroll on '{}'", request.indices))
    }

    /// 🔧 The generic request helper behind the metadata operations.
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        what: &str,
    ) -> Result<String> {
        let body = body.map(RequestBody::json).transpose()?;
        self.transport
            .send(method, path, body)
            .await?
            .into_success(what)
    }

    async fn request_json_object(&self, path: &str, what: &str) -> Result<Map<String, Value>> {
        let body = self.request(Method::GET, path, None, what).await?;
        serde_json::from_str(&body).context(format!(
            "💀 {} returned something that isn't a JSON object. We were promised an object.",
            what
        ))
    }
}

#[async_trait]
impl ClusterApi for EsApiV0 {
    fn generation(&self) -> ProtocolGeneration {
        ProtocolGeneration::Legacy
    }

    async fn open_scroll(&self, request: &ScrollRequest) -> Result<ScrollPage> {
        if request.slice_count > 1 {
            warn!(
                "⚠️ sliced scroll needs a 5.x+ cluster; slice {} of {} on '{}' will read everything unsliced",
                request.slice_id, request.slice_count, request.indices
            );
        }
        let body = scroll_query_body(request.query.as_deref(), request.fields.as_deref(), None);
        let raw = self.post_scroll_search(request, body).await?;
        decode_scroll_page::<PlainTotal>(&raw)
    }

    async fn continue_scroll(&self, keepalive: &str, scroll_id: &str) -> Result<ScrollPage> {
        let path = format!("_search/scroll?scroll={}", keepalive);
        let raw = self
            .transport
            .send(Method::POST, &path, Some(RequestBody::text(scroll_id)))
            .await?
            .into_success("Continuing a scroll")?;
        decode_scroll_page::<PlainTotal>(&raw)
    }

    async fn bulk_write(&self, payload: Vec<u8>) -> Result<()> {
        if payload.is_empty() {
            return Ok(());
        }
        let payload_len = payload.len();
        let body = self
            .transport
            .send(Method::POST, "_bulk", Some(RequestBody::ndjson(payload)))
            .await?
            .into_success("The bulk request")?;

        let summary: BulkResponseSummary = serde_json::from_str(&body).context(
            "💀 The bulk request landed, but the response wasn't the bulk summary we expected.",
        )?;
        if summary.errors {
            // -- 🔍 only dig through the items when something actually went wrong
            let parsed: Value = serde_json::from_str(&body).unwrap_or_default();
            let failed_items: Vec<&Value> = parsed
                .get("items")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.as_object()?.values().next())
                        .filter(|action| action.get("error").is_some())
                        .collect()
                })
                .unwrap_or_default();
            let first_error = failed_items
                .first()
                .and_then(|action| action.get("error"))
                .map(Value::to_string)
                .unwrap_or_default();
            bail!(
                "💀 The cluster accepted the bulk request but rejected {} of its documents. \
                 First complaint on file: {}",
                failed_items.len(),
                first_error
            );
        }
        trace!("🚀 bulk request of {} bytes landed", payload_len);
        Ok(())
    }

    async fn get_index_settings(&self, indices: &str) -> Result<Map<String, Value>> {
        require_index_name(indices)?;
        self.request_json_object(
            &format!("{}/_settings", indices),
            &format!("Reading settings for '{}'", indices),
        )
        .await
    }

    async fn update_index_settings(&self, index: &str, settings: Value) -> Result<()> {
        require_index_name(index)?;
        self.request(
            Method::PUT,
            &format!("{}/_settings", index),
            Some(&settings),
            &format!("Updating settings for '{}'", index),
        )
        .await?;
        Ok(())
    }

    async fn get_index_mappings(&self, indices: &str) -> Result<IndexMappings> {
        require_index_name(indices)?;
        let mappings = self
            .request_json_object(
                &format!("{}/_mapping", indices),
                &format!("Reading mappings for '{}'", indices),
            )
            .await?;
        let expanded = expand_index_pattern(indices, mappings.keys())?;
        let count = mappings.len();
        debug!("🗂️ '{}' expanded to {:?}", indices, expanded);
        Ok(IndexMappings {
            indices: expanded,
            count,
            mappings: wrap_legacy_mappings(mappings),
        })
    }

    async fn update_index_mapping(&self, index: &str, mappings: Map<String, Value>) -> Result<()> {
        require_index_name(index)?;
        // -- 🏷️ typed era: one request per type, the type name lives in the path
        for (type_name, type_mapping) in mappings {
            self.request(
                Method::PUT,
                &format!("{}/{}/_mapping", index, type_name),
                Some(&type_mapping),
                &format!("Updating the '{}' mapping of '{}'", type_name, index),
            )
            .await?;
        }
        Ok(())
    }

    async fn create_index(&self, index: &str, body: Value) -> Result<()> {
        require_index_name(index)?;
        self.request(
            Method::PUT,
            index,
            Some(&body),
            &format!("Creating index '{}'", index),
        )
        .await?;
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        require_index_name(index)?;
        let response = self.transport.send(Method::DELETE, index, None).await?;
        if response.status == 404 {
            debug!("🗑️ '{}' was already gone. Can't delete what isn't there.", index);
            return Ok(());
        }
        response.into_success(&format!("Deleting index '{}'", index))?;
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        require_index_name(index)?;
        self.request(
            Method::POST,
            &format!("{}/_refresh", index),
            None,
            &format!("Refreshing '{}'", index),
        )
        .await?;
        Ok(())
    }

    async fn cluster_health(&self) -> Result<ClusterHealth> {
        let body = self
            .request(Method::GET, "_cluster/health", None, "The cluster health check")
            .await?;
        serde_json::from_str(&body).context("💀 The cluster health response was not health-shaped.")
    }
}
