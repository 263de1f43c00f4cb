//! Scalar values in YAML/JSON documents
//!
//! Template variable defaults and project overrides are strings, but authors
//! routinely write `retries: 3` or `verbose: true`. These helpers accept any
//! scalar and keep its textual form.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::String(s) => s,
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

/// Deserialize an optional scalar as its string form.
pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(String::from))
}

/// Deserialize a map of scalars, keeping their string form.
pub fn string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Scalar>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, String::from(v)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Doc {
        #[serde(default, deserialize_with = "optional_string")]
        value: Option<String>,
        #[serde(default, deserialize_with = "string_map")]
        map: BTreeMap<String, String>,
    }

    #[test]
    fn test_scalars_become_strings() {
        let doc: Doc = serde_yaml::from_str("value: 3\nmap:\n  a: true\n  b: x\n  c: 1.5\n").unwrap();
        assert_eq!(doc.value.as_deref(), Some("3"));
        assert_eq!(doc.map["a"], "true");
        assert_eq!(doc.map["b"], "x");
        assert_eq!(doc.map["c"], "1.5");
    }

    #[test]
    fn test_missing_and_null() {
        let doc: Doc = serde_yaml::from_str("map: ~\n").unwrap();
        assert!(doc.value.is_none());
        assert!(doc.map.is_empty());
    }
}
