// ai
//! 🔄 Transforms: the Rosetta Stone of data migration 🎭🚀
//!
//! 🎬 COLD OPEN: INT. UNITED NATIONS, SIMULTANEOUS TRANSLATION BOOTH, 2:47 AM
//!
//! Scroll hits on the left screen. Bulk NDJSON on the right. A dump file in the
//! corner, glaring. In between: one intermediate [`Document`], and a translator who
//! has been awake for nineteen hours.
//!
//! ```text
//!   Ingest                    Intermediate            Egress
//!  ┌────────────────┐       ┌────────────┐       ┌──────────────────┐
//!  │ scroll raw hit │──┐    │            │    ┌──│ ES bulk pair     │
//!  ├────────────────┤  ├───▶│  Document  │───▶┤  ├──────────────────┤
//!  │ dump file line │──┘    │            │    └──│ dump file line   │
//!  └────────────────┘       └────────────┘       └──────────────────┘
//!      HitMapper                                    EgressTransform
//! ```
//!
//! Ingest needs configuration (overrides, rename rules), so it is a value: [`HitMapper`].
//! Egress needs nothing but the document, so it stays a zero-sized marker type with a
//! static method. The compiler monomorphizes it into straight-line code. 🦆

use crate::common::Document;
use anyhow::Result;

pub(crate) mod dump;
pub(crate) mod elasticsearch;
pub(crate) mod hit_mapper;

pub(crate) use dump::DumpLine;
pub(crate) use elasticsearch::ElasticsearchBulk;
pub(crate) use hit_mapper::HitMapper;

/// 📤 EgressTransform: converts a [`Document`] into a sink's wire format.
///
/// # Contract 📜
///
/// - Appends to `out`. Never clears it. The caller owns the buffer and its lifecycle.
/// - Output is newline-terminated, complete lines only. A half-written document
///   in a bulk body is how you get a 400 at 3am.
/// - On error, `out` may hold a partial write. Callers that care truncate it back.
pub(crate) trait EgressTransform {
    fn transform_into(doc: &Document, out: &mut Vec<u8>) -> Result<()>;
}
