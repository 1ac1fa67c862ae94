//! Serde helpers tolerating legacy mixed-type fields.
//!
//! Older collection files hold ids as JSON numbers where newer ones use
//! strings. These deserializers accept either and always yield strings, so
//! the string id contract holds from the load boundary onward.

use serde::de::{self, Deserializer, Unexpected};
use serde::Deserialize;
use serde_json::Value;

fn value_to_string<'de, D>(value: Value) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::invalid_type(
            unexpected(&other),
            &"a string or number",
        )),
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

/// Deserialize a string-or-number field into `String`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_string::<D>(value)
}

/// Deserialize an optional string-or-number field into `Option<String>`.
///
/// `null` and the empty string both map to `None`.
pub fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        other => {
            let s = value_to_string::<D>(other)?;
            Ok(if s.is_empty() { None } else { Some(s) })
        }
    }
}

/// Deserialize a list of string-or-number ids into `Vec<String>`.
pub fn lenient_string_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    values.into_iter().map(value_to_string::<D>).collect()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "super::lenient_string")]
        id: String,
        #[serde(default, deserialize_with = "super::lenient_opt_string")]
        link: Option<String>,
        #[serde(default, deserialize_with = "super::lenient_string_vec")]
        refs: Vec<String>,
    }

    #[test]
    fn test_numeric_id_becomes_string() {
        let p: Probe = serde_json::from_str(r#"{"id": 716131}"#).unwrap();
        assert_eq!(p.id, "716131");
        assert_eq!(p.link, None);
    }

    #[test]
    fn test_mixed_ref_list() {
        let p: Probe =
            serde_json::from_str(r#"{"id": "1", "refs": [42, "43"], "link": ""}"#).unwrap();
        assert_eq!(p.refs, vec!["42", "43"]);
        assert_eq!(p.link, None, "empty string collapses to None");
    }

    #[test]
    fn test_bool_id_rejected() {
        assert!(serde_json::from_str::<Probe>(r#"{"id": true}"#).is_err());
    }
}
