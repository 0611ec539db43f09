use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use serde_json::Value;

use crate::values::resolver::{ValueSpace, ignored_value};
use crate::values::{ValueError, ValueResult};

/// One `$NAME` or `${NAME}` occurrence in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub range: Range<usize>,
}

impl Placeholder {
    /// Config key the placeholder refers to.
    pub fn key(&self) -> String {
        self.name.to_ascii_lowercase()
    }
}

/// Whether generated names may still be left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Before the developer keys exist; generated names without a value are kept.
    Deferred,
    /// After generation; every name must resolve.
    Final,
}

#[derive(Debug, Clone)]
enum Resolution {
    Replace(String),
    Keep,
}

pub fn scan(text: &str) -> Vec<Placeholder> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let braced = bytes.get(i + 1) == Some(&b'{');
        let start = if braced { i + 2 } else { i + 1 };
        let mut end = start;
        while end < bytes.len() && is_name_byte(bytes[end]) {
            end += 1;
        }
        let long_enough = end - start >= 2;
        if braced {
            if long_enough && bytes.get(end) == Some(&b'}') {
                found.push(Placeholder {
                    name: text[start..end].to_string(),
                    range: i..end + 1,
                });
                i = end + 1;
                continue;
            }
        } else if long_enough {
            found.push(Placeholder {
                name: text[start..end].to_string(),
                range: i..end,
            });
            i = end;
            continue;
        }
        i += 1;
    }
    found
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_uppercase() || byte == b'_'
}

/// Substitutes placeholders in a single string.
pub fn substitute_str(text: &str, values: &ValueSpace) -> ValueResult<String> {
    let placeholders = scan(text);
    let resolved = resolve_all(
        placeholders.iter().map(Placeholder::key),
        values,
        Pass::Deferred,
    )?;
    Ok(apply(text, &placeholders, &resolved))
}

/// Substitutes placeholders in every string leaf of a JSON document.
///
/// All names are resolved before anything is rewritten; every unresolved
/// name is reported in a single error. Generated names with no value yet are
/// left as they are.
///
/// Only the original template may be fed in. A resolved value that itself
/// looks like `$NAME` (a title of `Costs $USD`) is scanned again if the output
/// is passed back through, and then fails as unresolved.
pub fn substitute_document(document: &Value, values: &ValueSpace) -> ValueResult<Value> {
    substitute_with(document, values, Pass::Deferred)
}

/// Like [`substitute_document`], but generated names must have a value too.
pub fn finalize_document(document: &Value, values: &ValueSpace) -> ValueResult<Value> {
    substitute_with(document, values, Pass::Final)
}

/// Generated names referenced anywhere in `document`, sorted and deduplicated.
pub fn generated_references(document: &Value) -> Vec<String> {
    let mut names = Vec::new();
    collect_keys(document, &mut names);
    names
        .into_iter()
        .filter(|key| ignored_value(key))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn substitute_with(document: &Value, values: &ValueSpace, pass: Pass) -> ValueResult<Value> {
    let mut names = Vec::new();
    collect_keys(document, &mut names);
    let resolved = resolve_all(names.into_iter(), values, pass)?;
    Ok(rewrite(document, &resolved))
}

fn resolve_all(
    keys: impl Iterator<Item = String>,
    values: &ValueSpace,
    pass: Pass,
) -> ValueResult<BTreeMap<String, Resolution>> {
    let mut resolved = BTreeMap::new();
    let mut missing = BTreeSet::new();
    for key in keys {
        if resolved.contains_key(&key) || missing.contains(&key) {
            continue;
        }
        if ignored_value(&key) {
            match (values.generated().get(&key), pass) {
                (Some(value), _) => {
                    resolved.insert(key, Resolution::Replace(value.to_string()));
                }
                (None, Pass::Deferred) => {
                    resolved.insert(key, Resolution::Keep);
                }
                (None, Pass::Final) => {
                    missing.insert(key);
                }
            }
            continue;
        }
        match values.lookup_value(&key) {
            Some(value) => {
                resolved.insert(key, Resolution::Replace(value));
            }
            None => {
                missing.insert(key);
            }
        }
    }
    if !missing.is_empty() {
        return Err(ValueError::Unresolved {
            keys: missing.into_iter().collect(),
        });
    }
    Ok(resolved)
}

fn apply(text: &str, placeholders: &[Placeholder], resolved: &BTreeMap<String, Resolution>) -> String {
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    for placeholder in placeholders {
        output.push_str(&text[cursor..placeholder.range.start]);
        match resolved.get(&placeholder.key()) {
            Some(Resolution::Replace(value)) => output.push_str(value),
            _ => output.push_str(&text[placeholder.range.clone()]),
        }
        cursor = placeholder.range.end;
    }
    output.push_str(&text[cursor..]);
    output
}

fn collect_keys(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(text) => names.extend(scan(text).iter().map(Placeholder::key)),
        Value::Array(items) => items.iter().for_each(|item| collect_keys(item, names)),
        Value::Object(map) => map.values().for_each(|item| collect_keys(item, names)),
        _ => {}
    }
}

fn rewrite(value: &Value, resolved: &BTreeMap<String, Resolution>) -> Value {
    match value {
        Value::String(text) => Value::String(apply(text, &scan(text), resolved)),
        Value::Array(items) => Value::Array(items.iter().map(|item| rewrite(item, resolved)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), rewrite(item, resolved)))
                .collect(),
        ),
        other => other.clone(),
    }
}
