//! 🗃️ Dump line transform: one document, one JSON object, one line.
//!
//! The dump file speaks the same dialect as a scroll hit (`_index`, `_type`, `_id`,
//! `_source`, `_routing`) so the file producer can read it back through the exact same
//! [`HitMapper`](super::HitMapper) as the network path. Dump, reload, same documents.

use super::EgressTransform;
use crate::common::Document;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// 🗃️ DumpLine: the flat-file cousin of the bulk pair.
pub(crate) struct DumpLine;

#[derive(Serialize)]
struct DumpRecord<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: &'a str,
    // -- 🪪 always written, empty when the destination picks ids, so the reader never trips
    // -- over a missing `_id` and calls it a corrupt stream
    #[serde(rename = "_id")]
    id: &'a str,
    #[serde(rename = "_source")]
    source: &'a Map<String, Value>,
    #[serde(rename = "_routing", skip_serializing_if = "Option::is_none")]
    routing: Option<&'a str>,
}

impl EgressTransform for DumpLine {
    fn transform_into(doc: &Document, out: &mut Vec<u8>) -> Result<()> {
        let the_record = DumpRecord {
            index: &doc.index,
            doc_type: &doc.doc_type,
            id: doc.id.as_deref().unwrap_or_default(),
            source: &doc.source,
            routing: doc.routing.as_deref().filter(|routing| !routing.is_empty()),
        };
        serde_json::to_writer(&mut *out, &the_record).context(
            "💀 A document refused to be flattened into a dump line. \
             It had one job. It was a JSON object. It is still, somehow, not JSON.",
        )?;
        out.push(b'\n');
        Ok(())
    }
}
