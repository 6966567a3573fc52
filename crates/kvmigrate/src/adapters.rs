// ai
//! # 📡 THE ADAPTERS: one capability set, three eras of cluster
//!
//! *Previously, on kvmigrate...*
//!
//! 🎬 COLD OPEN: INT. SERVER ROOM, 3:47 AM
//!
//! The source cluster is on 5.6. The destination is on 7.17. Someone asked why the hit
//! count came back as `{"value": 1204, "relation": "eq"}` instead of `1204`, and the room
//! went quiet. This module is the interpreter standing between them.
//!
//! ```text
//!   EsApiV0 (legacy, < 5)      metadata ops, bulk, raw-body scroll continuation
//!     └── EsApiV5 (5 – 6)      overrides: sliced scroll open, GET scroll continuation
//!           └── EsApiV7 (7 +)  overrides: nested hit count decoder, typeless mapping PUT
//! ```
//!
//! Each generation holds its predecessor and forwards everything that didn't change.
//! Composition, not inheritance. Nobody rewrites `delete_index` three times.
//!
//! 🦆 (the duck was on 2.4 once. it doesn't talk about it.)

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, trace};

use crate::transport::HttpTransport;

mod index_patterns;
mod scroll_page;
mod v0;
mod v5;
mod v7;

pub(crate) use index_patterns::{expand_index_pattern, wrap_legacy_mappings};
pub(crate) use scroll_page::ScrollPage;
pub(crate) use v0::EsApiV0;
pub(crate) use v5::EsApiV5;
pub(crate) use v7::EsApiV7;

/// 🗓️ The three wire-protocol eras we know how to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProtocolGeneration {
    /// 🦕 before 5.0: no sliced scroll, scroll id travels in the request body
    Legacy,
    /// 🍕 5.x and 6.x: sliced scroll, plain integer hit count, typed mappings
    Sliced,
    /// 🚀 7.0 and up: `hits.total.value`, typeless mapping updates
    Typeless,
}

impl ProtocolGeneration {
    /// 🔢 Pick a generation from a version string like `"6.8.23"` or just `"7"`.
    pub(crate) fn from_version(version: &str) -> Result<Self> {
        let major_part = version.trim().split('.').next().unwrap_or_default();
        let major: u32 = major_part.parse().context(format!(
            "💀 '{}' does not look like a cluster version. We wanted something like '7.10.2'. \
             We got something that looks like it was typed during a fire drill.",
            version
        ))?;
        Ok(match major {
            0..=4 => ProtocolGeneration::Legacy,
            5 | 6 => ProtocolGeneration::Sliced,
            _ => ProtocolGeneration::Typeless,
        })
    }
}

/// 📜 Everything needed to open one scroll cursor (or one slice of a sliced scroll).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScrollRequest {
    pub indices: String,
    pub keepalive: String,
    pub page_size: usize,
    pub query: Option<String>,
    pub slice_id: usize,
    pub slice_count: usize,
    /// 🎯 comma-separated `_source` field selector
    pub fields: Option<String>,
}

/// 📦 Index mappings after pattern expansion and legacy wrapping.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IndexMappings {
    /// 🗂️ concrete index names the request expanded to
    pub indices: Vec<String>,
    /// 🔢 how many indices the cluster returned mappings for
    pub count: usize,
    /// 📦 index name → `{"mappings": ...}`, always wrapped
    pub mappings: Map<String, Value>,
}

/// 🩺 The two facts we care about from `_cluster/health`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub(crate) struct ClusterHealth {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub status: String,
}

/// 🔌 The capability set every protocol generation implements.
///
/// # Contract
/// - Scroll operations return a normalized [`ScrollPage`] no matter what the wire looked like.
/// - `bulk_write` never retries. Errors come back to the caller, who decides to log them.
/// - Safe to share across workers: `&self` everywhere, one request in flight per caller.
#[async_trait]
pub(crate) trait ClusterApi: std::fmt::Debug + Send + Sync {
    fn generation(&self) -> ProtocolGeneration;

    async fn open_scroll(&self, request: &ScrollRequest) -> Result<ScrollPage>;
    async fn continue_scroll(&self, keepalive: &str, scroll_id: &str) -> Result<ScrollPage>;
    async fn bulk_write(&self, payload: Vec<u8>) -> Result<()>;

    async fn get_index_settings(&self, indices: &str) -> Result<Map<String, Value>>;
    async fn update_index_settings(&self, index: &str, settings: Value) -> Result<()>;
    async fn get_index_mappings(&self, indices: &str) -> Result<IndexMappings>;
    async fn update_index_mapping(&self, index: &str, mappings: Map<String, Value>) -> Result<()>;
    async fn create_index(&self, index: &str, body: Value) -> Result<()>;
    async fn delete_index(&self, index: &str) -> Result<()>;
    async fn refresh(&self, index: &str) -> Result<()>;
    async fn cluster_health(&self) -> Result<ClusterHealth>;
}

/// 🏭 Build the right adapter generation for an endpoint.
///
/// A configured version wins. Without one we knock on `GET /` and read `version.number`,
/// which every generation has answered the same way since the dawn of time.
pub(crate) async fn connect(
    transport: HttpTransport,
    configured_version: Option<&str>,
) -> Result<Arc<dyn ClusterApi>> {
    let version = match configured_version.filter(|v| !v.trim().is_empty()) {
        Some(version) => version.to_string(),
        None => detect_version(&transport).await?,
    };
    let generation = ProtocolGeneration::from_version(&version)?;
    info!(
        "🔌 {} speaks version {} ({:?} protocol)",
        transport.base_url(),
        version,
        generation
    );

    let legacy = EsApiV0::new(transport);
    Ok(match generation {
        ProtocolGeneration::Legacy => Arc::new(legacy),
        ProtocolGeneration::Sliced => Arc::new(EsApiV5::new(legacy)),
        ProtocolGeneration::Typeless => Arc::new(EsApiV7::new(EsApiV5::new(legacy))),
    })
}

#[derive(Deserialize)]
struct ClusterInfo {
    version: ClusterInfoVersion,
}

#[derive(Deserialize)]
struct ClusterInfoVersion {
    number: String,
}

async fn detect_version(transport: &HttpTransport) -> Result<String> {
    let body = transport
        .send(Method::GET, "", None)
        .await?
        .into_success("Asking the cluster for its version")?;
    let info: ClusterInfo = serde_json::from_str(&body).context(format!(
        "💀 The cluster at {} answered, but not with a version number we could find. \
         Set `version` in the config and we'll stop asking.",
        transport.base_url()
    ))?;
    trace!("🔎 detected version {}", info.version.number);
    Ok(info.version.number)
}

/// 🧾 The optional scroll search body: `_source` filter, `query_string`, and slice.
///
/// `None` when there is nothing to say, so the request goes out bodiless. A single field
/// selector stays a string; several comma-separated fields become an array.
pub(crate) fn scroll_query_body(
    query: Option<&str>,
    fields: Option<&str>,
    slice: Option<(usize, usize)>,
) -> Option<Value> {
    let query = query.filter(|q| !q.is_empty());
    let fields = fields.filter(|f| !f.is_empty());
    let slice = slice.filter(|(_, max)| *max > 1);
    if query.is_none() && fields.is_none() && slice.is_none() {
        return None;
    }

    let mut body = Map::new();
    if let Some(fields) = fields {
        let selector = if fields.contains(',') {
            Value::Array(
                fields
                    .split(',')
                    .map(|f| Value::String(f.trim().to_string()))
                    .collect(),
            )
        } else {
            Value::String(fields.to_string())
        };
        body.insert("_source".to_string(), selector);
    }
    if let Some(query) = query {
        body.insert(
            "query".to_string(),
            json!({ "query_string": { "query": query } }),
        );
    }
    if let Some((id, max)) = slice {
        body.insert("slice".to_string(), json!({ "id": id, "max": max }));
    }
    Some(Value::Object(body))
}

/// 🚫 Guard for index names that end up in URL paths. An empty one would turn
/// `DELETE {index}` into `DELETE /`, which is a sentence nobody wants to finish.
pub(crate) fn require_index_name(index: &str) -> Result<()> {
    if index.trim().is_empty() {
        bail!("💀 An index operation was asked to run against an empty index name. Refusing, loudly.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::transport::TransportConfig;

    #[test]
    fn the_one_where_version_strings_pick_their_era() -> Result<()> {
        assert_eq!(ProtocolGeneration::from_version("2.4.6")?, ProtocolGeneration::Legacy);
        assert_eq!(ProtocolGeneration::from_version("5.6.16")?, ProtocolGeneration::Sliced);
        assert_eq!(ProtocolGeneration::from_version("6")?, ProtocolGeneration::Sliced);
        assert_eq!(ProtocolGeneration::from_version("7.10.2")?, ProtocolGeneration::Typeless);
        assert_eq!(ProtocolGeneration::from_version(" 8.11.0 ")?, ProtocolGeneration::Typeless);
        assert!(ProtocolGeneration::from_version("latest").is_err());
        Ok(())
    }

    #[test]
    fn the_one_where_an_empty_scroll_body_stays_home() {
        assert_eq!(scroll_query_body(None, None, None), None);
        assert_eq!(scroll_query_body(Some(""), Some(""), Some((0, 1))), None);
    }

    #[test]
    fn the_one_where_the_scroll_body_has_everything_it_asked_for() {
        assert_eq!(
            scroll_query_body(Some("user:kimchy"), Some("a, b"), Some((1, 4))),
            Some(json!({
                "_source": ["a", "b"],
                "query": {"query_string": {"query": "user:kimchy"}},
                "slice": {"id": 1, "max": 4}
            }))
        );
        assert_eq!(
            scroll_query_body(None, Some("title"), None),
            Some(json!({"_source": "title"}))
        );
    }

    #[tokio::test]
    async fn the_one_where_the_cluster_tells_us_its_age() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"name":"node-1","version":{"number":"6.8.23"}}"#),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(TransportConfig {
            base_url: server.uri(),
            ..TransportConfig::default()
        })?;
        let api = connect(transport, None).await?;
        assert_eq!(api.generation(), ProtocolGeneration::Sliced);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_configured_version_skips_the_small_talk() -> Result<()> {
        // -- 🤐 no mocks mounted: any request would 404 and the version probe would fail
        let server = MockServer::start().await;
        let transport = HttpTransport::new(TransportConfig {
            base_url: server.uri(),
            ..TransportConfig::default()
        })?;
        let api = connect(transport, Some("8.11.1")).await?;
        assert_eq!(api.generation(), ProtocolGeneration::Typeless);
        Ok(())
    }
}
