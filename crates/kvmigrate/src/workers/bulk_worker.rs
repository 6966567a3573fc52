//! 🎬 *[a channel fills with documents. somewhere, a bulk endpoint waits.]*
//! *[the clock on the wall reads 2:47am.]*
//! *[nobody asked for this data migration. and yet, here we are.]*
//!
//! 🗑️ The BulkWorker: patient, tireless, and deeply unbothered by the chaos happening
//! upstream. It receives documents. It batches documents. It ships batches. It asks no
//! questions. It is, in many ways, the most emotionally stable part of this codebase.
//!
//! ```text
//!              ┌────────── doc fits ──────────┐
//!              ▼                              │
//!   ──▶ Reading ── doc overflows / idle ──▶ Flushing ──▶ Reading
//!          │  └── task timer ──▶ Flushing ──▶ Done
//!          └── channel closed ──▶ Draining ──▶ Done
//! ```
//!
//! 🧠 Knowledge graph:
//! - One `tokio::select!` per turn: the channel raced against an idle timer and a task timer
//! - The idle timer is fresh every turn, so a steady trickle never trips it
//! - The task timer is a deadline pushed back when a document arrives, and again when a
//!   size-triggered flush hands control back to reading. Time spent in a bulk request or
//!   the pause after it is not producer silence
//! - An idle flush does not push the task timer back, otherwise a stalled producer would keep
//!   the worker alive forever, flushing nothing, every five seconds
//! - A failed bulk request is logged and the batch is gone. No retries.
//!
//! 🦆 (the duck has no comment at this time)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, trace, warn};

use super::Worker;
use crate::adapters::ClusterApi;
use crate::app_config::{MigrationConfig, RuntimeConfig};
use crate::channel::DocumentReceiver;
use crate::common::{Document, WorkerTally};
use crate::progress::Progress;
use crate::transforms::{EgressTransform, ElasticsearchBulk};
use crate::transport::TransportConfig;

// 🚰 ElasticsearchSinkConfig: where the documents go to live out the rest of their days.
#[derive(Debug, Deserialize, Clone)]
pub struct ElasticsearchSinkConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// 🗓️ Skip version detection and speak this version's dialect.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub compress: bool,
}

impl ElasticsearchSinkConfig {
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

/// ⚙️ The numbers a bulk worker lives by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BulkSettings {
    pub threshold_bytes: usize,
    pub idle_timeout: Duration,
    pub task_timeout: Duration,
    pub pause_after_flush: Option<Duration>,
}

impl BulkSettings {
    pub(crate) fn from_config(migration: &MigrationConfig, runtime: &RuntimeConfig) -> Self {
        Self {
            threshold_bytes: migration.bulk_size_bytes,
            idle_timeout: Duration::from_secs(runtime.idle_timeout_secs),
            task_timeout: Duration::from_secs(runtime.task_timeout_secs),
            pause_after_flush: Some(Duration::from_secs(migration.sleep_after_bulk_secs))
                .filter(|pause| !pause.is_zero()),
        }
    }
}

/// 🔄 What the worker does after a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterFlush {
    KeepReading,
    /// 📎 the document that didn't fit goes into the fresh batch
    AppendPending,
    Stop,
}

/// ⏰ Whichever of the three waits finished first.
enum Wake {
    Received(Option<Document>),
    Idle,
    TaskTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulkState {
    Reading,
    Flushing { then: AfterFlush },
    Draining,
    Done,
}

/// 🗑️ Drains the channel into bulk requests. One batch in flight, one batch in hand.
#[derive(Debug)]
pub(crate) struct BulkWorker {
    api: Arc<dyn ClusterApi>,
    rx: DocumentReceiver,
    progress: Progress,
    settings: BulkSettings,
    batch: Vec<u8>,
    batch_docs: u64,
    encoded: Vec<u8>,
    tally: WorkerTally,
}

impl BulkWorker {
    pub(crate) fn new(
        api: Arc<dyn ClusterApi>,
        rx: DocumentReceiver,
        progress: Progress,
        settings: BulkSettings,
    ) -> Self {
        Self {
            api,
            rx,
            progress,
            settings,
            batch: Vec::new(),
            batch_docs: 0,
            encoded: Vec::new(),
            tally: WorkerTally::default(),
        }
    }

    /// 📥 Encode one document and decide whether it fits.
    fn absorb(&mut self, doc: Document) -> BulkState {
        if let Err(rejection) = doc.check_destination() {
            warn!("🗑️ bulk worker: skipping a document: {}", rejection);
            self.tally.skipped += 1;
            return BulkState::Reading;
        }

        self.encoded.clear();
        if let Err(e) = ElasticsearchBulk::transform_into(&doc, &mut self.encoded) {
            warn!("🗑️ bulk worker: could not encode a document for '{}': {:#}", doc.index, e);
            self.encoded.clear();
            self.tally.skipped += 1;
            return BulkState::Reading;
        }

        let would_overflow = !self.batch.is_empty()
            && self.batch.len() + self.encoded.len() > self.settings.threshold_bytes;
        if would_overflow {
            trace!("📦 batch would pass {} bytes, flushing first", self.settings.threshold_bytes);
            return BulkState::Flushing {
                then: AfterFlush::AppendPending,
            };
        }
        self.append_pending();
        BulkState::Reading
    }

    fn append_pending(&mut self) {
        if self.encoded.is_empty() {
            return;
        }
        self.batch.append(&mut self.encoded);
        self.batch_docs += 1;
    }

    /// 🚀 Ship the batch, count it, forget it. Empty batches stay home.
    async fn flush(&mut self) {
        if self.batch_docs == 0 {
            return;
        }
        let payload = std::mem::take(&mut self.batch);
        let docs = std::mem::take(&mut self.batch_docs);
        let payload_len = payload.len();

        match self.api.bulk_write(payload).await {
            Ok(()) => debug!("📦 flushed {} documents ({} bytes)", docs, payload_len),
            Err(e) => error!(
                "💀 bulk request of {} documents ({} bytes) failed and will not be retried: {:#}",
                docs, payload_len, e
            ),
        }
        self.tally.documents += docs;
        self.tally.batches += 1;
        self.progress.advance(docs);

        if let Some(pause) = self.settings.pause_after_flush {
            sleep(pause).await;
        }
    }

    async fn run(mut self) -> Result<WorkerTally> {
        let task_deadline = sleep(self.settings.task_timeout);
        tokio::pin!(task_deadline);
        let mut state = BulkState::Reading;

        loop {
            state = match state {
                BulkState::Reading => {
                    let idle = sleep(self.settings.idle_timeout);
                    let wake = tokio::select! {
                        biased;
                        received = self.rx.pull() => Wake::Received(received),
                        _ = idle => Wake::Idle,
                        _ = &mut task_deadline => Wake::TaskTimeout,
                    };
                    match wake {
                        Wake::Received(Some(doc)) => {
                            task_deadline
                                .as_mut()
                                .reset(Instant::now() + self.settings.task_timeout);
                            self.absorb(doc)
                        }
                        Wake::Received(None) => BulkState::Draining,
                        Wake::Idle => {
                            trace!("⏱️ idle for {:?}, flushing {} documents", self.settings.idle_timeout, self.batch_docs);
                            BulkState::Flushing { then: AfterFlush::KeepReading }
                        }
                        Wake::TaskTimeout => {
                            warn!(
                                "⏰ bulk worker heard nothing for {:?}; flushing {} documents and going home",
                                self.settings.task_timeout, self.batch_docs
                            );
                            BulkState::Flushing { then: AfterFlush::Stop }
                        }
                    }
                }
                BulkState::Flushing { then } => {
                    self.flush().await;
                    match then {
                        AfterFlush::KeepReading => BulkState::Reading,
                        AfterFlush::AppendPending => {
                            self.append_pending();
                            task_deadline
                                .as_mut()
                                .reset(Instant::now() + self.settings.task_timeout);
                            BulkState::Reading
                        }
                        AfterFlush::Stop => BulkState::Done,
                    }
                }
                BulkState::Draining => {
                    // -- 📎 a document mid-handoff still belongs in the last batch
                    self.append_pending();
                    self.flush().await;
                    BulkState::Done
                }
                BulkState::Done => break,
            };
        }

        debug!(
            "🏁 bulk worker done: {} documents in {} batches",
            self.tally.documents, self.tally.batches
        );
        Ok(self.tally)
    }
}

impl Worker for BulkWorker {
    fn start(self) -> JoinHandle<Result<WorkerTally>> {
        tokio::spawn(self.run())
    }
}
