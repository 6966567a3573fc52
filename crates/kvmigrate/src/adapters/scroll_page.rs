//! 📜 Scroll response decoders: two shapes, one [`ScrollPage`].
//!
//! Before 7.0: `"hits": {"total": 1204, "hits": [...]}`.
//! From 7.0:   `"hits": {"total": {"value": 1204, "relation": "eq"}, "hits": [...]}`.
//!
//! Same data. Different envelope. Like getting the same bill in a fancier font.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// 📦 One normalized scroll page, whatever generation produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ScrollPage {
    pub scroll_id: String,
    pub total_hits: u64,
    pub hits: Vec<Value>,
    pub shard_failures: Vec<String>,
}

/// 🔢 Anything that can tell us how many hits the query matched.
pub(crate) trait HitCount {
    fn count(&self) -> u64;
}

/// 🦕 `"total": 1204`
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub(crate) struct PlainTotal(u64);

impl HitCount for PlainTotal {
    fn count(&self) -> u64 {
        self.0
    }
}

/// 🚀 `"total": {"value": 1204, "relation": "eq"}`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct NestedTotal {
    #[serde(default)]
    value: u64,
}

impl HitCount for NestedTotal {
    fn count(&self) -> u64 {
        self.value
    }
}

#[derive(Debug, Deserialize)]
struct ScrollResponse<T> {
    #[serde(rename = "_scroll_id", default)]
    scroll_id: String,
    #[serde(default = "Option::default")]
    hits: Option<ScrollHits<T>>,
    #[serde(rename = "_shards", default)]
    shards: Option<ShardSummary>,
}

#[derive(Debug, Deserialize)]
struct ScrollHits<T> {
    #[serde(default = "Option::default")]
    total: Option<T>,
    #[serde(default)]
    hits: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ShardSummary {
    #[serde(default)]
    failures: Vec<ShardFailure>,
}

#[derive(Debug, Deserialize)]
struct ShardFailure {
    #[serde(default)]
    reason: Value,
}

/// 🧩 Decode a scroll response whose hit count has shape `T`.
pub(crate) fn decode_scroll_page<T>(body: &str) -> Result<ScrollPage>
where
    T: HitCount + DeserializeOwned,
{
    let response: ScrollResponse<T> = serde_json::from_str(body).context(format!(
        "💀 The scroll response was not the shape we expected. First 200 bytes for the post-mortem: '{}'",
        body.chars().take(200).collect::<String>()
    ))?;

    let (total_hits, hits) = match response.hits {
        Some(hits) => (hits.total.map(|t| t.count()).unwrap_or_default(), hits.hits),
        None => (0, Vec::new()),
    };
    let shard_failures = response
        .shards
        .map(|shards| {
            shards
                .failures
                .into_iter()
                .map(|failure| failure.reason.to_string())
                .collect()
        })
        .unwrap_or_default();

    Ok(ScrollPage {
        scroll_id: response.scroll_id,
        total_hits,
        hits,
        shard_failures,
    })
}
