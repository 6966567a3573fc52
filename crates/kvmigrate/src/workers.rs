//! 🧵 Workers: the backbone of kvmigrate, the unsung heroes, the ones who actually
//! do the work while the Supervisor takes all the credit in the sprint retro.
//!
//! ```text
//!   producers                         consumers
//!  ┌───────────────┐                 ┌──────────────┐
//!  │ ScrollCursor  │ × slices ──┐ ┌──│ BulkWorker   │ × sink_parallelism
//!  ├───────────────┤            ├─┤  ├──────────────┤
//!  │ FileProducer  │ × 1 ───────┘ └──│ FileConsumer │ × 1
//!  └───────────────┘   channel       └──────────────┘
//! ```
//!
//! Every worker is spawned onto the runtime and hands back its [`WorkerTally`] through a
//! `JoinHandle`. Each worker's config type lives in its own file, next to the code that
//! reads it, and `app_config` re-exports them.
//!
//! ⚠️ "If you're reading this, the code review went poorly."

use anyhow::Result;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::channel::DocumentSender;
use crate::common::{HitRejection, WorkerTally};
use crate::transforms::HitMapper;

mod bulk_worker;
mod file_consumer;
mod file_producer;
mod scroll_cursor;

pub(crate) use bulk_worker::{BulkSettings, BulkWorker};
pub use bulk_worker::ElasticsearchSinkConfig;
pub(crate) use file_consumer::FileConsumer;
pub use file_consumer::FileSinkConfig;
pub(crate) use file_producer::FileProducer;
pub use file_producer::FileSourceConfig;
pub(crate) use scroll_cursor::ScrollCursor;
pub use scroll_cursor::ElasticsearchSourceConfig;

/// 🏗️ A background worker, that does work. duh.
///
/// "What's the DEAL with lifetime annotations? You borrow something,
///  you give it back. It's not that hard, Jerry!" - Seinfeld, on Rust
pub(crate) trait Worker {
    /// 🚀 Spawn the worker. The handle resolves to what it got done, or to why it couldn't start.
    fn start(self) -> JoinHandle<Result<WorkerTally>>;
}

/// 🚦 What happened to one raw hit on its way onto the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HitOutcome {
    Pushed,
    Skipped,
    /// 🛑 corrupt record, the producer stops reading
    EndOfStream,
    /// 🚪 nobody left on the consuming side
    ConsumersGone,
}

/// 📥 Map one raw hit and push it. Shared by every producer so they all judge hits alike.
pub(crate) async fn forward_hit(
    mapper: &HitMapper,
    raw_hit: Value,
    tx: &DocumentSender,
    origin: &str,
) -> HitOutcome {
    match mapper.map_hit(raw_hit) {
        Ok(doc) => match tx.push(doc).await {
            Ok(()) => HitOutcome::Pushed,
            Err(e) => {
                warn!("🚪 {}: {:#}", origin, e);
                HitOutcome::ConsumersGone
            }
        },
        Err(rejection @ HitRejection::ScrollError { .. }) => {
            warn!("⚠️ {}: skipping an error record: {}", origin, rejection);
            HitOutcome::Skipped
        }
        Err(rejection) if rejection.ends_stream() => {
            error!(
                "💀 {}: {}. Treating the rest of this stream as unreadable and stopping here.",
                origin, rejection
            );
            HitOutcome::EndOfStream
        }
        Err(rejection) => {
            warn!("🗑️ {}: skipping a document: {}", origin, rejection);
            HitOutcome::Skipped
        }
    }
}
