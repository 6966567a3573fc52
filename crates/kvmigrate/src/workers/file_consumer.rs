//! 🗃️ FileConsumer: drains the channel into a dump file, one hit-shaped line per document.
//!
//! No batching. Each document becomes a [`DumpLine`] and goes into a buffered writer.
//! The file is opened for append (created if missing) and flushed exactly once, when the
//! channel closes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Worker;
use crate::channel::DocumentReceiver;
use crate::common::WorkerTally;
use crate::progress::Progress;
use crate::transforms::{DumpLine, EgressTransform};

#[derive(Debug, Deserialize, Clone)]
pub struct FileSinkConfig {
    /// 🗃️ Appended to, created if missing.
    pub file_name: String,
}

#[derive(Debug)]
pub(crate) struct FileConsumer {
    path: PathBuf,
    rx: DocumentReceiver,
    progress: Progress,
}

impl FileConsumer {
    pub(crate) fn new(path: impl Into<PathBuf>, rx: DocumentReceiver, progress: Progress) -> Self {
        Self {
            path: path.into(),
            rx,
            progress,
        }
    }

    async fn run(self) -> Result<WorkerTally> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .context(format!(
                "💀 Could not open '{}' for writing. The filesystem said 'new phone who dis'.",
                self.path.display()
            ))?;
        let mut writer = BufWriter::new(file);
        let mut line = Vec::with_capacity(1024);
        let mut tally = WorkerTally::default();

        while let Some(doc) = self.rx.pull().await {
            if let Err(rejection) = doc.check_destination() {
                warn!("🗑️ file consumer: skipping a document: {}", rejection);
                tally.skipped += 1;
                continue;
            }
            line.clear();
            if let Err(e) = DumpLine::transform_into(&doc, &mut line) {
                warn!("🗑️ file consumer: could not encode a document: {:#}", e);
                tally.skipped += 1;
                continue;
            }
            writer.write_all(&line).await.context(format!(
                "💀 Writing to '{}' failed mid-migration. The disk has opinions now.",
                self.path.display()
            ))?;
            tally.documents += 1;
            self.progress.advance(1);
        }

        writer.flush().await.context(format!(
            "💀 The last bytes for '{}' refused to leave the buffer.",
            self.path.display()
        ))?;
        debug!("🏁 file consumer wrote {} documents to '{}'", tally.documents, self.path.display());
        Ok(tally)
    }
}

impl Worker for FileConsumer {
    fn start(self) -> JoinHandle<Result<WorkerTally>> {
        tokio::spawn(self.run())
    }
}
