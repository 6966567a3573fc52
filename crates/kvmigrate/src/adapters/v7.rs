// ai
//! 🚀 EsApiV7: the typeless era.
//!
//! Two things changed and we care about both: the hit count grew an envelope
//! (`{"value": n, "relation": "eq"}`), and mappings stopped being keyed by type.
//! Everything else forwards to the 5.x adapter, which forwards to the legacy one.
//! Turtles, but only three of them.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};

use super::scroll_page::{NestedTotal, decode_scroll_page};
use super::{
    ClusterApi, ClusterHealth, EsApiV5, IndexMappings, ProtocolGeneration, ScrollPage,
    ScrollRequest, require_index_name,
};

#[derive(Debug, Clone)]
pub(crate) struct EsApiV7 {
    mid: EsApiV5,
}

impl EsApiV7 {
    pub(crate) fn new(mid: EsApiV5) -> Self {
        Self { mid }
    }
}

#[async_trait]
impl ClusterApi for EsApiV7 {
    fn generation(&self) -> ProtocolGeneration {
        ProtocolGeneration::Typeless
    }

    async fn open_scroll(&self, request: &ScrollRequest) -> Result<ScrollPage> {
        let raw = self.mid.open_scroll_raw(request).await?;
        decode_scroll_page::<NestedTotal>(&raw)
    }

    async fn continue_scroll(&self, keepalive: &str, scroll_id: &str) -> Result<ScrollPage> {
        let raw = self.mid.continue_scroll_raw(keepalive, scroll_id).await?;
        decode_scroll_page::<NestedTotal>(&raw)
    }

    async fn bulk_write(&self, payload: Vec<u8>) -> Result<()> {
        self.mid.bulk_write(payload).await
    }

    async fn get_index_settings(&self, indices: &str) -> Result<Map<String, Value>> {
        self.mid.get_index_settings(indices).await
    }

    async fn update_index_settings(&self, index: &str, settings: Value) -> Result<()> {
        self.mid.update_index_settings(index, settings).await
    }

    async fn get_index_mappings(&self, indices: &str) -> Result<IndexMappings> {
        self.mid.get_index_mappings(indices).await
    }

    /// 🏷️ One PUT, no type in the path. The mapping body is the whole mapping.
    async fn update_index_mapping(&self, index: &str, mut mappings: Map<String, Value>) -> Result<()> {
        require_index_name(index)?;
        mappings.remove("dynamic_templates");
        self.mid
            .legacy()
            .request(
                Method::PUT,
                &format!("{}/_mapping", index),
                Some(&Value::Object(mappings)),
                &format!("Updating the mapping of '{}'", index),
            )
            .await?;
        Ok(())
    }

    async fn create_index(&self, index: &str, body: Value) -> Result<()> {
        self.mid.create_index(index, body).await
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        self.mid.delete_index(index).await
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        self.mid.refresh(index).await
    }

    async fn cluster_health(&self) -> Result<ClusterHealth> {
        self.mid.cluster_health().await
    }
}
