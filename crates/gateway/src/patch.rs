//! PATCH body deserialization helpers
//!
//! PATCH endpoints distinguish an absent field from an explicit null. Serde
//! collapses both to `None` for a plain `Option`, so nullable patch fields
//! use `Option<Option<T>>` together with [`double_option`]:
//!
//! - field absent        -> `None`           (leave the column untouched)
//! - field set to null   -> `Some(None)`     (clear the column)
//! - field set to value  -> `Some(Some(v))`  (replace the column)

use serde::{Deserialize, Deserializer};

/// Deserializer for `Option<Option<T>>` patch fields. Must be paired with
/// `#[serde(default)]` so an absent key stays `None`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        name: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        institute: Option<Option<String>>,
    }

    #[test]
    fn test_absent_field_is_unset() {
        let patch: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch.name, None);
        assert_eq!(patch.institute, None);
    }

    #[test]
    fn test_null_field_clears() {
        let patch: Patch = serde_json::from_str(r#"{"institute": null}"#).unwrap();
        assert_eq!(patch.institute, Some(None));
    }

    #[test]
    fn test_value_field_replaces() {
        let patch: Patch = serde_json::from_str(r#"{"institute": "MIT", "name": "Alice"}"#).unwrap();
        assert_eq!(patch.institute, Some(Some("MIT".to_string())));
        assert_eq!(patch.name, Some("Alice".to_string()));
    }
}
