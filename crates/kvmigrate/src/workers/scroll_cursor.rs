// ai
//! 📜 ScrollCursor: one scroll (or one slice of one) from open to exhausted.
//!
//! 🎬 *[the cursor opens. the first page arrives. 5000 hits, give or take.]*
//! *[it pushes them one by one into a channel that may or may not have room.]*
//! *[it asks for more. it always asks for more. until the page comes back empty.]*
//!
//! ```text
//!   Init ──open──▶ Opened ──▶ Continuing ⇄ Yielded ──▶ Exhausted
//!                                  │
//!                                  └── two errors in a row ──▶ Failed
//! ```
//!
//! 🧠 Knowledge graph:
//! - Opening is a setup step: failure comes back as `Err` through the join handle
//! - Continuation failures are retried once, then logged and counted as an early stop
//! - Pages with shard failures still deliver their hits; the failures are warnings
//! - The read bar grows by the slice's hit count and advances once per page

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{HitOutcome, Worker, forward_hit};
use crate::adapters::{ClusterApi, ScrollPage, ScrollRequest};
use crate::channel::DocumentSender;
use crate::common::WorkerTally;
use crate::progress::Progress;
use crate::transforms::HitMapper;
use crate::transport::TransportConfig;

// 📡 ElasticsearchSourceConfig: "It's just Elasticsearch", she said, before the cluster went red.
// Lives here because configs should live near the thing they configure.
// Wild concept, I know. Next up: socks living near feet.
#[derive(Debug, Deserialize, Clone)]
pub struct ElasticsearchSourceConfig {
    /// 📡 The URL of your cluster. Include scheme + port. Yes, all of it.
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// 🔒 API key auth. Wins over basic auth when both are set.
    #[serde(default)]
    pub api_key: Option<String>,
    /// 🗓️ Skip version detection and speak this version's dialect.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
    /// 🗜️ gzip request bodies.
    #[serde(default)]
    pub compress: bool,
    /// 🗂️ Index names or patterns, comma-separated. `_all` means all of them.
    #[serde(default = "default_indices")]
    pub indices: String,
    /// 🔎 A `query_string` query. Absent means everything.
    #[serde(default)]
    pub query: Option<String>,
    /// 🎯 Comma-separated `_source` fields to keep.
    #[serde(default)]
    pub fields: Option<String>,
    /// 📦 Hits per scroll page (per slice).
    #[serde(default = "default_scroll_size")]
    pub scroll_size: usize,
    /// 🍕 Parallel scroll slices. One means an ordinary scroll.
    #[serde(default = "default_slices")]
    pub slices: usize,
}

fn default_indices() -> String {
    "_all".to_string()
}

fn default_scroll_size() -> usize {
    5000
}

fn default_slices() -> usize {
    1
}

impl ElasticsearchSourceConfig {
    pub(crate) fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            base_url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            api_key: self.api_key.clone(),
            proxy: self.proxy.clone(),
            compress: self.compress,
        }
    }
}

/// 🔄 Where the cursor is in its life.
enum CursorState {
    Init,
    Opened { page: ScrollPage },
    Continuing { scroll_id: String, attempt: u8 },
    Yielded { page: ScrollPage },
    Exhausted,
    Failed,
}

/// 📜 A producer that walks one scroll slice and pushes every hit it can map.
#[derive(Debug)]
pub(crate) struct ScrollCursor {
    api: Arc<dyn ClusterApi>,
    request: ScrollRequest,
    mapper: Arc<HitMapper>,
    tx: DocumentSender,
    progress: Progress,
}

impl ScrollCursor {
    pub(crate) fn new(
        api: Arc<dyn ClusterApi>,
        request: ScrollRequest,
        mapper: Arc<HitMapper>,
        tx: DocumentSender,
        progress: Progress,
    ) -> Self {
        Self {
            api,
            request,
            mapper,
            tx,
            progress,
        }
    }

    fn origin(&self) -> String {
        format!(
            "scroll '{}' slice {}/{}",
            self.request.indices, self.request.slice_id, self.request.slice_count
        )
    }

    /// 🚚 Push one page of hits. `false` means stop reading.
    async fn deliver(&self, page: &mut ScrollPage, tally: &mut WorkerTally) -> bool {
        for failure in &page.shard_failures {
            warn!("⚠️ {}: shard failure: {}", self.origin(), failure);
        }
        let origin = self.origin();
        let mut pushed_this_page = 0u64;
        let mut keep_going = true;
        for raw_hit in page.hits.drain(..) {
            match forward_hit(&self.mapper, raw_hit, &self.tx, &origin).await {
                HitOutcome::Pushed => pushed_this_page += 1,
                HitOutcome::Skipped => tally.skipped += 1,
                HitOutcome::EndOfStream | HitOutcome::ConsumersGone => {
                    keep_going = false;
                    break;
                }
            }
        }
        tally.documents += pushed_this_page;
        self.progress.advance(pushed_this_page);
        keep_going
    }

    async fn run(self) -> Result<WorkerTally> {
        let mut tally = WorkerTally::default();
        let mut state = CursorState::Init;

        loop {
            state = match state {
                CursorState::Init => {
                    let page = self.api.open_scroll(&self.request).await.context(format!(
                        "💀 Could not open {}. The cluster said no before we even said hello.",
                        self.origin()
                    ))?;
                    info!("📜 {} opened: {} hits to read", self.origin(), page.total_hits);
                    self.progress.grow_length(page.total_hits);
                    CursorState::Opened { page }
                }
                CursorState::Opened { mut page } | CursorState::Yielded { mut page } => {
                    if page.hits.is_empty() {
                        CursorState::Exhausted
                    } else if self.deliver(&mut page, &mut tally).await {
                        CursorState::Continuing {
                            scroll_id: page.scroll_id,
                            attempt: 0,
                        }
                    } else {
                        CursorState::Failed
                    }
                }
                CursorState::Continuing { scroll_id, attempt } => {
                    match self
                        .api
                        .continue_scroll(&self.request.keepalive, &scroll_id)
                        .await
                    {
                        Ok(mut page) => {
                            if page.scroll_id.is_empty() {
                                page.scroll_id = scroll_id;
                            }
                            CursorState::Yielded { page }
                        }
                        Err(e) if attempt == 0 => {
                            warn!("🔁 {}: continuing the scroll failed, trying once more: {:#}", self.origin(), e);
                            CursorState::Continuing {
                                scroll_id,
                                attempt: attempt + 1,
                            }
                        }
                        Err(e) => {
                            error!("💀 {}: continuing the scroll failed twice in a row: {:#}", self.origin(), e);
                            CursorState::Failed
                        }
                    }
                }
                CursorState::Exhausted => {
                    debug!("🏁 {} exhausted after {} documents", self.origin(), tally.documents);
                    break;
                }
                CursorState::Failed => {
                    tally.stopped_early = true;
                    warn!("⚠️ {} stopped early after {} documents", self.origin(), tally.documents);
                    break;
                }
            };
        }

        // -- ✉️ self (and the sender inside it) drops here. last one out closes the channel.
        Ok(tally)
    }
}

impl Worker for ScrollCursor {
    fn start(self) -> JoinHandle<Result<WorkerTally>> {
        tokio::spawn(self.run())
    }
}
