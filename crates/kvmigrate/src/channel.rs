// ai
//! ✉️ The Document Channel: the universal joint of the pipeline.
//!
//! Any producer (scroll cursor, file reader) pushes into it. Any consumer (bulk worker,
//! file writer) pulls from it. It is bounded, so a slow destination throttles the source
//! read rate instead of ballooning memory like a group chat after someone says "quick question".
//!
//! 🧠 Knowledge graph:
//! - Backed by `async_channel::bounded`: multi-producer, multi-consumer, fair wakeups
//! - Closing is ownership: the channel closes when the last [`DocumentSender`] is dropped.
//!   Error paths, early returns and panics all drop their sender, so consumers always see
//!   end-of-stream exactly once and never wait forever on a producer that died.
//! - A push fails once every [`DocumentReceiver`] is gone. Producers treat that as "stop".

use crate::common::Document;
use anyhow::{Result, anyhow};
use async_channel::{Receiver, Sender};

/// 🏗️ Make a bounded document channel. A capacity of zero is bumped to one, because
/// `async_channel` refuses rendezvous channels and we refuse to panic over a config typo.
pub(crate) fn document_channel(capacity: usize) -> (DocumentSender, DocumentReceiver) {
    let (tx, rx) = async_channel::bounded(capacity.max(1));
    (DocumentSender { tx }, DocumentReceiver { rx })
}

/// 📤 The producing end. Clone one per slice; the last drop closes the channel.
#[derive(Debug, Clone)]
pub(crate) struct DocumentSender {
    tx: Sender<Document>,
}

impl DocumentSender {
    /// 🚚 Push one document, suspending while the channel is full.
    pub(crate) async fn push(&self, doc: Document) -> Result<()> {
        self.tx.send(doc).await.map_err(|_| {
            anyhow!(
                "💀 Every consumer has left the building. The document channel has no one \
                 left to deliver to, so the producer is going home too."
            )
        })
    }
}

/// 📥 The consuming end. Clone one per worker; documents are load-balanced, not broadcast.
#[derive(Debug, Clone)]
pub(crate) struct DocumentReceiver {
    rx: Receiver<Document>,
}

impl DocumentReceiver {
    /// 🪣 Pull the next document. `None` means the channel is closed and drained.
    pub(crate) async fn pull(&self) -> Option<Document> {
        self.rx.recv().await.ok()
    }
}
