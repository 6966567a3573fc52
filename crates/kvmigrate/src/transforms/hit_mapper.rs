// ai
//! 📥 HitMapper: customs at the airport for raw hits.
//!
//! Your hit arrives wearing whatever the source cluster dressed it in: `_index`, `_type`,
//! `_id`, `_source`, maybe `_routing`, and occasionally a `status: 404` where a document
//! should have been. The mapper stamps the passport (overrides, renames, id policy) and
//! either waves a [`Document`] through or explains, with a typed [`HitRejection`], why not.
//!
//! 🧠 Knowledge graph:
//! - Used by: `workers::scroll_cursor` and `workers::file_producer`, identically
//! - Order of operations matters and is fixed: sentinel → required fields → index →
//!   type → id policy → renames → routing → destination invariant
//! - Pure: no I/O, no logging. Callers decide what a rejection means for their loop.

use crate::app_config::MigrationConfig;
use crate::common::{Document, HitRejection};
use anyhow::{Result, bail};
use serde_json::{Map, Value};

/// 🔁 One `old:new` rename rule. `_type` as the old name means "copy the hit's type into
/// the body as `new`" rather than moving a body field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldRename {
    pub from: String,
    pub to: String,
}

impl FieldRename {
    /// 🧾 Parse `"a:b, _type:kind"` into rules, in declaration order.
    ///
    /// An empty list means no rules. Anything else that isn't `old:new` is a config error,
    /// surfaced before a single document moves.
    pub(crate) fn parse_list(rules: &str) -> Result<Vec<FieldRename>> {
        let mut the_rules = Vec::new();
        for raw_rule in rules.split(',') {
            let raw_rule = raw_rule.trim();
            if raw_rule.is_empty() {
                continue;
            }
            let Some((from, to)) = raw_rule.split_once(':') else {
                bail!(
                    "💀 Rename rule '{}' has no ':' in it. Rules look like 'old_field:new_field'. \
                     This one looks like a field name that wandered off from its partner.",
                    raw_rule
                );
            };
            let (from, to) = (from.trim(), to.trim());
            if from.is_empty() || to.is_empty() {
                bail!(
                    "💀 Rename rule '{}' is missing a side. Both the old and the new name are required. \
                     Renaming something to nothing is called deleting, and we don't do that here.",
                    raw_rule
                );
            }
            the_rules.push(FieldRename {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(the_rules)
    }
}

/// 📥 The configured mapping step from raw hit to [`Document`].
#[derive(Debug, Clone, Default)]
pub(crate) struct HitMapper {
    target_index: Option<String>,
    override_type: Option<String>,
    regenerate_id: bool,
    renames: Vec<FieldRename>,
}

impl HitMapper {
    /// 🏗️ Build from the migration config. Empty override strings count as "not configured".
    pub(crate) fn from_config(config: &MigrationConfig) -> Result<Self> {
        Ok(Self {
            target_index: config.target_index.clone().filter(|s| !s.is_empty()),
            override_type: config.override_type.clone().filter(|s| !s.is_empty()),
            regenerate_id: config.regenerate_id,
            renames: FieldRename::parse_list(&config.rename_fields)?,
        })
    }

    /// 🎯 Map one raw hit. See the module docs for the fixed order of operations.
    pub(crate) fn map_hit(&self, raw: Value) -> Result<Document, HitRejection> {
        let Value::Object(mut raw) = raw else {
            return Err(HitRejection::WrongShape {
                field: "hit",
                expected: "an object",
            });
        };

        // -- 🚨 some servers report partial scroll failures as fake hits. not a document. bye.
        if raw.get("status").and_then(Value::as_i64) == Some(404) {
            let response = raw
                .get("response")
                .map(Value::to_string)
                .unwrap_or_default();
            return Err(HitRejection::ScrollError { response });
        }

        let original_index = take_string(&mut raw, "_index")?;
        let mut source = take_object(&mut raw, "_source")?;
        let original_id = take_string(&mut raw, "_id")?;
        let original_type = raw
            .get("_type")
            .and_then(Value::as_str)
            .map(str::to_string);

        let index = self.target_index.clone().unwrap_or(original_index);
        let doc_type = self
            .override_type
            .clone()
            .or_else(|| original_type.clone())
            .unwrap_or_default();

        let id = if self.regenerate_id || original_id.is_empty() {
            None
        } else {
            Some(original_id)
        };

        for rule in &self.renames {
            if rule.from == "_type" {
                // -- 🏷️ type gets promoted into the body. the document keeps its own type too.
                if let Some(ref the_type) = original_type {
                    source.insert(rule.to.clone(), Value::String(the_type.clone()));
                }
            } else if let Some(the_value) = source.remove(&rule.from) {
                source.insert(rule.to.clone(), the_value);
            }
        }

        let routing = raw
            .get("_routing")
            .and_then(Value::as_str)
            .filter(|routing| !routing.is_empty())
            .map(str::to_string);

        let doc = Document {
            index,
            doc_type,
            id,
            routing,
            source,
        };
        doc.check_destination()?;
        Ok(doc)
    }
}

fn take_string(raw: &mut Map<String, Value>, field: &'static str) -> Result<String, HitRejection> {
    match raw.remove(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(HitRejection::WrongShape {
            field,
            expected: "a string",
        }),
        None => Err(HitRejection::MissingField(field)),
    }
}

fn take_object(
    raw: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Map<String, Value>, HitRejection> {
    match raw.remove(field) {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(HitRejection::WrongShape {
            field,
            expected: "an object",
        }),
        None => Err(HitRejection::MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapper(config: MigrationConfig) -> HitMapper {
        HitMapper::from_config(&config).expect("💀 test config should parse")
    }

    fn a_classic_hit() -> Value {
        json!({"_index": "a", "_type": "b", "_id": "1", "_source": {"x": 1}})
    }

    #[test]
    fn the_one_where_the_target_index_override_wins() {
        let the_mapper = mapper(MigrationConfig {
            target_index: Some("z".to_string()),
            ..MigrationConfig::default()
        });

        let doc = the_mapper.map_hit(a_classic_hit()).expect("should map");
        assert_eq!(doc.index, "z");
        assert_eq!(doc.doc_type, "b");
        assert_eq!(doc.id.as_deref(), Some("1"));
        assert_eq!(doc.source, json!({"x": 1}).as_object().cloned().unwrap_or_default());
    }

    #[test]
    fn the_one_where_the_type_override_and_id_regeneration_both_show_up() {
        let the_mapper = mapper(MigrationConfig {
            override_type: Some("_doc".to_string()),
            regenerate_id: true,
            ..MigrationConfig::default()
        });

        let doc = the_mapper.map_hit(a_classic_hit()).expect("should map");
        assert_eq!(doc.index, "a");
        assert_eq!(doc.doc_type, "_doc");
        assert_eq!(doc.id, None, "the destination gets to pick the id now");
    }

    #[test]
    fn the_one_where_renames_move_fields_and_promote_the_type() {
        let the_mapper = mapper(MigrationConfig {
            rename_fields: "x:y, _type:kind, ghost:nope".to_string(),
            ..MigrationConfig::default()
        });

        let doc = the_mapper.map_hit(a_classic_hit()).expect("should map");
        assert_eq!(doc.source.get("x"), None);
        assert_eq!(doc.source.get("y"), Some(&json!(1)));
        assert_eq!(doc.source.get("kind"), Some(&json!("b")));
        assert_eq!(doc.doc_type, "b", "promoting the type does not remove it");
        assert_eq!(doc.source.get("nope"), None, "absent fields are not invented");
    }

    #[test]
    fn the_one_where_routing_only_rides_along_when_it_has_something_to_say() {
        let the_mapper = HitMapper::default();

        let mut hit = a_classic_hit();
        hit["_routing"] = json!("shard-7");
        assert_eq!(
            the_mapper.map_hit(hit).expect("should map").routing.as_deref(),
            Some("shard-7")
        );

        let mut hit = a_classic_hit();
        hit["_routing"] = json!("");
        assert_eq!(the_mapper.map_hit(hit).expect("should map").routing, None);
    }

    #[test]
    fn the_one_where_a_404_sentinel_is_not_a_document() {
        let rejection = HitMapper::default()
            .map_hit(json!({"status": 404, "response": {"error": "gone"}}))
            .expect_err("sentinel should be rejected");
        assert!(matches!(rejection, HitRejection::ScrollError { .. }));
        assert!(!rejection.ends_stream());
    }

    #[test]
    fn the_one_where_missing_fields_end_the_stream() {
        for the_missing_one in ["_index", "_source", "_id"] {
            let mut hit = a_classic_hit();
            if let Some(obj) = hit.as_object_mut() {
                obj.remove(the_missing_one);
            }
            let rejection = HitMapper::default()
                .map_hit(hit)
                .expect_err("missing required field should be rejected");
            assert_eq!(rejection, HitRejection::MissingField(the_missing_one));
            assert!(rejection.ends_stream());
        }
    }

    #[test]
    fn the_one_where_a_typeless_hit_without_override_is_skipped_not_fatal() {
        let rejection = HitMapper::default()
            .map_hit(json!({"_index": "a", "_id": "1", "_source": {}}))
            .expect_err("empty type should be rejected");
        assert_eq!(rejection, HitRejection::EmptyType);
        assert!(!rejection.ends_stream());
    }

    #[test]
    fn the_one_where_wrong_shapes_are_typed_failures() {
        let rejection = HitMapper::default()
            .map_hit(json!({"_index": "a", "_type": "b", "_id": 7, "_source": {}}))
            .expect_err("numeric id should be rejected");
        assert_eq!(
            rejection,
            HitRejection::WrongShape {
                field: "_id",
                expected: "a string"
            }
        );
    }

    #[test]
    fn the_one_where_bad_rename_rules_are_caught_before_the_migration() {
        assert!(FieldRename::parse_list("x").is_err());
        assert!(FieldRename::parse_list("x:").is_err());
        assert_eq!(
            FieldRename::parse_list(" a:b ,, c:d ").expect("should parse"),
            vec![
                FieldRename {
                    from: "a".to_string(),
                    to: "b".to_string()
                },
                FieldRename {
                    from: "c".to_string(),
                    to: "d".to_string()
                },
            ]
        );
        assert!(FieldRename::parse_list("").expect("empty is fine").is_empty());
    }
}
