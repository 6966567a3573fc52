//! 📂 FileProducer: reads a dump file back, one hit-shaped line at a time.
//!
//! Blank lines are skipped. Lines that aren't JSON are logged and skipped. Lines that are
//! JSON but not a proper hit end the read (same rules as a scroll page). An I/O error
//! mid-file also ends the read. The channel closes when this worker's sender drops.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::{HitOutcome, Worker, forward_hit};
use crate::channel::DocumentSender;
use crate::common::WorkerTally;
use crate::progress::Progress;
use crate::transforms::HitMapper;

#[derive(Debug, Deserialize, Clone)]
pub struct FileSourceConfig {
    /// 📂 Newline-delimited JSON, one hit per line.
    pub file_name: String,
}

#[derive(Debug)]
pub(crate) struct FileProducer {
    path: PathBuf,
    mapper: Arc<HitMapper>,
    tx: DocumentSender,
    progress: Progress,
}

impl FileProducer {
    pub(crate) fn new(
        path: impl Into<PathBuf>,
        mapper: Arc<HitMapper>,
        tx: DocumentSender,
        progress: Progress,
    ) -> Self {
        Self {
            path: path.into(),
            mapper,
            tx,
            progress,
        }
    }

    async fn run(self) -> Result<WorkerTally> {
        let file = File::open(&self.path).await.context(format!(
            "💀 Could not open '{}' for reading. We checked the couch cushions. Nothing.",
            self.path.display()
        ))?;
        let origin = format!("file '{}'", self.path.display());
        let mut lines = BufReader::new(file).lines();
        let mut tally = WorkerTally::default();
        let mut line_number = 0u64;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!("💀 {}: read failed after line {}: {}", origin, line_number, e);
                    tally.stopped_early = true;
                    break;
                }
            };
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }

            let raw_hit: Value = match serde_json::from_str(&line) {
                Ok(raw_hit) => raw_hit,
                Err(e) => {
                    warn!("🗑️ {}: line {} is not JSON, skipping: {}", origin, line_number, e);
                    tally.skipped += 1;
                    continue;
                }
            };

            match forward_hit(&self.mapper, raw_hit, &self.tx, &origin).await {
                HitOutcome::Pushed => {
                    tally.documents += 1;
                    self.progress.advance(1);
                }
                HitOutcome::Skipped => tally.skipped += 1,
                HitOutcome::EndOfStream | HitOutcome::ConsumersGone => {
                    tally.stopped_early = true;
                    break;
                }
            }
        }

        debug!("🏁 {}: {} documents read", origin, tally.documents);
        Ok(tally)
    }
}

impl Worker for FileProducer {
    fn start(self) -> JoinHandle<Result<WorkerTally>> {
        tokio::spawn(self.run())
    }
}
