//! Canvas developer key ids are larger than 2^53 and are only ever handled
//! as decimal strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Modulus Canvas applies to developer key ids in the external tools API.
const LOCAL_ID_DIGITS: usize = 13;

/// Accepts an id encoded as either a JSON string or a JSON number.
pub fn de_string_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

pub fn de_opt_string_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(Value::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// `id mod 10^13`, computed on the decimal digits so any length works.
///
/// Returns `None` when `id` is not a plain non-negative decimal integer.
pub fn truncated_id(id: &str) -> Option<String> {
    let id = id.trim();
    if id.is_empty() || !id.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let tail = &id[id.len().saturating_sub(LOCAL_ID_DIGITS)..];
    let trimmed = tail.trim_start_matches('0');
    Some(if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    })
}

/// Does `candidate` refer to the developer key `full_id`, in full or
/// truncated form?
pub fn matches_developer_key(full_id: &str, candidate: &str) -> bool {
    let full_id = full_id.trim();
    let candidate = candidate.trim();
    if candidate == full_id {
        return true;
    }
    truncated_id(full_id).is_some_and(|short| short == candidate)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::{de_opt_string_id, de_string_id, matches_developer_key, truncated_id};

    #[derive(Deserialize)]
    struct Record {
        #[serde(deserialize_with = "de_string_id")]
        id: String,
        #[serde(default, deserialize_with = "de_opt_string_id")]
        other: Option<String>,
    }

    #[test]
    fn ids_survive_as_strings() {
        let record: Record = serde_json::from_str(r#"{"id": 170000000000123, "other": "9"}"#).unwrap();
        assert_eq!(record.id, "170000000000123");
        assert_eq!(record.other.as_deref(), Some("9"));
        let record: Record = serde_json::from_str(r#"{"id": "170000000000123"}"#).unwrap();
        assert_eq!(record.id, "170000000000123");
        assert!(record.other.is_none());
    }

    #[test]
    fn truncation_is_modulo_ten_to_the_thirteenth() {
        assert_eq!(truncated_id("170000000000123").as_deref(), Some("123"));
        assert_eq!(truncated_id("98765432109876543210").as_deref(), Some("2109876543210"));
        assert_eq!(truncated_id("42").as_deref(), Some("42"));
        assert_eq!(truncated_id("10000000000000").as_deref(), Some("0"));
        assert!(truncated_id("12a").is_none());
        assert!(truncated_id("").is_none());
    }

    #[test]
    fn matcher_accepts_full_and_truncated_forms() {
        assert!(matches_developer_key("170000000000123", "170000000000123"));
        assert!(matches_developer_key("170000000000123", "123"));
        assert!(!matches_developer_key("170000000000123", "124"));
        assert!(!matches_developer_key("170000000000123", "0000000000123"));
    }
}
