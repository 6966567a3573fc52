//! 🍕 EsApiV5: sliced scrolls arrive. Everything else is the legacy adapter in a new hat.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};

use super::scroll_page::{PlainTotal, decode_scroll_page};
use super::{
    ClusterApi, ClusterHealth, EsApiV0, IndexMappings, ProtocolGeneration, ScrollPage,
    ScrollRequest, scroll_query_body,
};

#[derive(Debug, Clone)]
pub(crate) struct EsApiV5 {
    legacy: EsApiV0,
}

impl EsApiV5 {
    pub(crate) fn new(legacy: EsApiV0) -> Self {
        Self { legacy }
    }

    pub(crate) fn legacy(&self) -> &EsApiV0 {
        &self.legacy
    }

    /// 🍕 Open one slice. The raw body comes back so newer generations can pick the decoder.
    pub(crate) async fn open_scroll_raw(&self, request: &ScrollRequest) -> Result<String> {
        let body = scroll_query_body(
            request.query.as_deref(),
            request.fields.as_deref(),
            Some((request.slice_id, request.slice_count)),
        );
        self.legacy.post_scroll_search(request, body).await
    }

    /// 🔁 `GET _search/scroll?scroll=..&scroll_id=..`, id percent-encoded (base64 `+` would otherwise read as a space).
    pub(crate) async fn continue_scroll_raw(&self, keepalive: &str, scroll_id: &str) -> Result<String> {
        let path = format!(
            "_search/scroll?scroll={}&scroll_id={}",
            keepalive,
            urlencoding::encode(scroll_id)
        );
        self.legacy
            .request(Method::GET, &path, None, "Continuing a scroll")
            .await
    }
}

#[async_trait]
impl ClusterApi for EsApiV5 {
    fn generation(&self) -> ProtocolGeneration {
        ProtocolGeneration::Sliced
    }

    async fn open_scroll(&self, request: &ScrollRequest) -> Result<ScrollPage> {
        let raw = self.open_scroll_raw(request).await?;
        decode_scroll_page::<PlainTotal>(&raw)
    }

    async fn continue_scroll(&self, keepalive: &str, scroll_id: &str) -> Result<ScrollPage> {
        let raw = self.continue_scroll_raw(keepalive, scroll_id).await?;
        decode_scroll_page::<PlainTotal>(&raw)
    }

    async fn bulk_write(&self, payload: Vec<u8>) -> Result<()> {
        self.legacy.bulk_write(payload).await
    }

    async fn get_index_settings(&self, indices: &str) -> Result<Map<String, Value>> {
        self.legacy.get_index_settings(indices).await
    }

    async fn update_index_settings(&self, index: &str, settings: Value) -> Result<()> {
        self.legacy.update_index_settings(index, settings).await
    }

    async fn get_index_mappings(&self, indices: &str) -> Result<IndexMappings> {
        self.legacy.get_index_mappings(indices).await
    }

    async fn update_index_mapping(&self, index: &str, mut mappings: Map<String, Value>) -> Result<()> {
        // -- 🧹 dynamic templates don't survive the trip between versions
        mappings.remove("dynamic_templates");
        self.legacy.update_index_mapping(index, mappings).await
    }

    async fn create_index(&self, index: &str, body: Value) -> Result<()> {
        self.legacy.create_index(index, body).await
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        self.legacy.delete_index(index).await
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        self.legacy.refresh(index).await
    }

    async fn cluster_health(&self) -> Result<ClusterHealth> {
        self.legacy.cluster_health().await
    }
}
