// ai
//! 🔎 Index-pattern expansion: turning `_all` and `logs-*` into actual index names.
//!
//! Shared by every adapter generation. The cluster hands back a mapping document per
//! index; we decide which of those names the user actually meant.
//!
//! 🧠 Knowledge graph:
//! - `_all` → every returned name, in response order
//! - contains `*` or `?` → each comma-separated pattern is compiled into an anchored
//!   regex (`*` → `.*`, `?` → `.`, everything else escaped), names matching any survive
//! - otherwise → the literal comma-separated names, untouched

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{Map, Value};

/// 🗂️ Expand `requested` against the index names the cluster returned.
pub(crate) fn expand_index_pattern<'a>(
    requested: &str,
    returned: impl IntoIterator<Item = &'a String>,
) -> Result<Vec<String>> {
    let requested = requested.trim();
    if requested == "_all" {
        return Ok(returned.into_iter().cloned().collect());
    }

    if requested.contains('*') || requested.contains('?') {
        let matchers = requested
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(compile_glob)
            .collect::<Result<Vec<Regex>>>()?;
        return Ok(returned
            .into_iter()
            .filter(|name| matchers.iter().any(|m| m.is_match(name)))
            .cloned()
            .collect());
    }

    Ok(requested
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect())
}

fn compile_glob(pattern: &str) -> Result<Regex> {
    let mut the_regex = String::with_capacity(pattern.len() + 8);
    the_regex.push('^');
    for piece in pattern.chars() {
        match piece {
            '*' => the_regex.push_str(".*"),
            '?' => the_regex.push('.'),
            other => the_regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    the_regex.push('$');
    Regex::new(&the_regex).context(format!(
        "💀 Index pattern '{}' would not compile into a regex. We tried. The regex engine sighed.",
        pattern
    ))
}

/// 🎁 Wrap every mapping-less index as `{"mappings": <original>}` so every consumer sees
/// one shape, even the ones migrating off a cluster old enough to vote.
pub(crate) fn wrap_legacy_mappings(mappings: Map<String, Value>) -> Map<String, Value> {
    mappings
        .into_iter()
        .map(|(name, index_doc)| {
            let already_wrapped = index_doc
                .as_object()
                .is_some_and(|obj| obj.contains_key("mappings"));
            if already_wrapped {
                (name, index_doc)
            } else {
                let mut envelope = Map::new();
                envelope.insert("mappings".to_string(), index_doc);
                (name, Value::Object(envelope))
            }
        })
        .collect()
}
