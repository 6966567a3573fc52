// ai
//! 📡 Elasticsearch Bulk Transform: formatting documents for the bulk API's peculiar tastes 🚀🔄
//!
//! Rule 1: Two lines per document. Action metadata, then document source. Always.
//! Rule 2: Newline-delimited. Not comma-separated. Not XML. NEWLINES.
//! Rule 3: Every line ends with `\n`, including the last one. The last one MATTERS.
//!
//! ## Knowledge Graph 🧠
//! - Implements: `EgressTransform` (`Document` → bulk wire format)
//! - Action line: `{"index":{"_index":..,"_type":..,"_id":..,"_routing":..}}`
//! - `_id` and `_routing` are omitted when absent or empty, never sent as null
//! - `_type` is always sent; the channel only carries documents with a type

use super::EgressTransform;
use crate::common::Document;
use anyhow::{Context, Result};
use serde::Serialize;

/// 📡 ElasticsearchBulk: the format whisperer for bulk indexing.
pub(crate) struct ElasticsearchBulk;

#[derive(Serialize)]
struct BulkAction<'a> {
    index: BulkActionMetadata<'a>,
}

#[derive(Serialize)]
struct BulkActionMetadata<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: &'a str,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(rename = "_routing", skip_serializing_if = "Option::is_none")]
    routing: Option<&'a str>,
}

impl EgressTransform for ElasticsearchBulk {
    fn transform_into(doc: &Document, out: &mut Vec<u8>) -> Result<()> {
        // 🏗️ the cover letter for each document. Like a resume, except actually read.
        let the_action_line = BulkAction {
            index: BulkActionMetadata {
                index: &doc.index,
                doc_type: &doc.doc_type,
                id: doc.id.as_deref().filter(|id| !id.is_empty()),
                routing: doc.routing.as_deref().filter(|routing| !routing.is_empty()),
            },
        };

        serde_json::to_writer(&mut *out, &the_action_line).context(
            "💀 Failed to serialize bulk action metadata. \
             The JSON that describes JSON has failed to become JSON.",
        )?;
        out.push(b'\n');
        serde_json::to_writer(&mut *out, &doc.source).context(
            "💀 Failed to serialize a document body for the bulk request. \
             The _source went in as JSON and refused to come back out as JSON.",
        )?;
        out.push(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn doc_with(id: Option<&str>, routing: Option<&str>) -> Document {
        let source = match json!({"meaning_of_life": 42, "towel": true}) {
            Value::Object(map) => map,
            _ => unreachable!("json! object literal is an object"),
        };
        Document {
            index: "the-answer-index".to_string(),
            doc_type: "_doc".to_string(),
            id: id.map(str::to_string),
            routing: routing.map(str::to_string),
            source,
        }
    }

    fn render(doc: &Document) -> Result<String> {
        let mut out = Vec::new();
        ElasticsearchBulk::transform_into(doc, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn the_one_where_a_fully_loaded_document_becomes_beautiful_bulk_format() -> Result<()> {
        let the_bulk_output = render(&doc_with(Some("doc-42"), Some("route-66")))?;

        assert!(
            the_bulk_output.ends_with('\n'),
            "the trailing newline is not optional"
        );
        let the_lines: Vec<&str> = the_bulk_output.trim_end_matches('\n').split('\n').collect();
        assert_eq!(the_lines.len(), 2, "two lines. no more. no less.");

        let the_action: Value = serde_json::from_str(the_lines[0])?;
        assert_eq!(the_action["index"]["_index"], "the-answer-index");
        assert_eq!(the_action["index"]["_type"], "_doc");
        assert_eq!(the_action["index"]["_id"], "doc-42");
        assert_eq!(the_action["index"]["_routing"], "route-66");

        assert_eq!(the_lines[1], r#"{"meaning_of_life":42,"towel":true}"#);
        Ok(())
    }

    #[test]
    fn the_one_where_missing_and_empty_ids_are_absent_not_null() -> Result<()> {
        for the_nobody in [None, Some("")] {
            let the_bulk_output = render(&doc_with(the_nobody, Some("")))?;
            let the_action: Value =
                serde_json::from_str(the_bulk_output.lines().next().unwrap_or_default())?;
            assert!(the_action["index"].get("_id").is_none());
            assert!(the_action["index"].get("_routing").is_none());
        }
        Ok(())
    }

    #[test]
    fn the_one_where_two_documents_share_a_buffer_politely() -> Result<()> {
        let mut out = Vec::new();
        ElasticsearchBulk::transform_into(&doc_with(Some("a"), None), &mut out)?;
        ElasticsearchBulk::transform_into(&doc_with(Some("b"), None), &mut out)?;
        let text = String::from_utf8(out)?;
        assert_eq!(text.lines().count(), 4);
        assert!(text.ends_with('\n'));
        Ok(())
    }
}
