// ai
//! 📦 Common data structures: the building blocks of kvmigrate
//!
//! 🎬 COLD OPEN: INT. DATA CENTER, 3:47 AM
//!
//! The scroll has been running for six hours. A `Document` arrives on the channel.
//! It knows its index. It knows its type. It may or may not know its id, and it has
//! made peace with that. It carries its `_source` like a responsible adult carrying
//! groceries: every field, in the order they were put in the bag. 🦆
//!
//! This module holds the humble structs that ferry documents from a scroll page (or a
//! dump file line) to a bulk request (or another dump file line), plus the typed ways
//! a raw hit can disappoint us on the way in.

use serde_json::{Map, Value};
use thiserror::Error;

/// 🎯 One record being migrated. The atomic unit of "please move this over there".
///
/// `source` is an ordered map (serde_json's `preserve_order`), so a document that goes
/// in as `{"b":1,"a":2}` comes out as `{"b":1,"a":2}`. Cluster admins notice these things.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Document {
    /// 📡 Destination index. Never empty once a document is on the channel.
    pub index: String,
    /// 🏷️ Destination type. Also never empty on the channel (see [`Document::check_destination`]).
    pub doc_type: String,
    /// 🪪 Destination id. `None` means the destination cluster picks one.
    pub id: Option<String>,
    /// 🔧 Shard routing key, only when the source actually had a non-empty one.
    pub routing: Option<String>,
    /// 📦 The body. Arbitrary nesting, arbitrary opinions.
    pub source: Map<String, Value>,
}

impl Document {
    /// 🔒 The destination invariant: index and type must both be non-empty.
    ///
    /// Producers check this after mapping; consumers check it again on the way out,
    /// because producers may vary and trust is earned one document at a time.
    pub(crate) fn check_destination(&self) -> Result<(), HitRejection> {
        if self.index.is_empty() {
            return Err(HitRejection::EmptyIndex);
        }
        if self.doc_type.is_empty() {
            return Err(HitRejection::EmptyType);
        }
        Ok(())
    }
}

/// 💀 Every way a raw hit can fail to become a [`Document`].
///
/// Some of these are per-hit skips. Some end the whole read loop. [`HitRejection::ends_stream`]
/// is the one that decides, so callers don't have to memorize the list.
#[derive(Debug, Error, Clone, PartialEq)]
pub(crate) enum HitRejection {
    /// The server slipped an error object into the hit list (`status: 404`).
    #[error("scroll returned an error record instead of a hit: {response}")]
    ScrollError { response: String },

    /// `_index`, `_source` or `_id` is missing.
    #[error("hit is missing required field `{0}`")]
    MissingField(&'static str),

    /// The field is there but it's the wrong JSON shape.
    #[error("hit field `{field}` should be {expected}")]
    WrongShape {
        field: &'static str,
        expected: &'static str,
    },

    #[error("document has an empty destination index")]
    EmptyIndex,

    #[error("document has an empty destination type")]
    EmptyType,
}

impl HitRejection {
    /// 🛑 Corrupt stream records stop the producer cold instead of being skipped.
    /// Silently dropping one record would change the migrated count without telling anyone.
    pub(crate) fn ends_stream(&self) -> bool {
        matches!(
            self,
            HitRejection::MissingField(_) | HitRejection::WrongShape { .. }
        )
    }
}

/// 📊 What a worker did with its life. Returned through its `JoinHandle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WorkerTally {
    /// 📄 documents pushed (producers) or written (consumers)
    pub documents: u64,
    /// 📦 bulk requests sent. Zero for the file paths, which don't batch.
    pub batches: u64,
    /// 🗑️ documents skipped after a rejection
    pub skipped: u64,
    /// ⚠️ the worker gave up before its input was exhausted
    pub stopped_early: bool,
}

impl WorkerTally {
    /// 🧮 Fold two tallies together. Used by the supervisor when joining the crew.
    pub(crate) fn merge(self, other: WorkerTally) -> WorkerTally {
        WorkerTally {
            documents: self.documents + other.documents,
            batches: self.batches + other.batches,
            skipped: self.skipped + other.skipped,
            stopped_early: self.stopped_early || other.stopped_early,
        }
    }
}
