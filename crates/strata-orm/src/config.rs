use serde::{Deserialize, Serialize};

/// What an index lookup does when a posting list names a primary row that
/// no longer exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingRefPolicy {
    /// Fail the lookup with `DanglingReference`.
    #[default]
    Error,
    /// Log a warning and leave the row out of the result.
    Skip,
}

/// Per-bucket behaviour settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    /// Handling of posting entries whose primary row is missing.
    pub dangling_refs: DanglingRefPolicy,
    /// Name of the bucket-scoped sequence used for auto-assigned keys.
    pub id_sequence: String,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            dangling_refs: DanglingRefPolicy::Error,
            id_sequence: "id".to_string(),
        }
    }
}

impl BucketConfig {
    /// Skip dangling references instead of failing on them.
    pub fn lenient() -> Self {
        Self {
            dangling_refs: DanglingRefPolicy::Skip,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = BucketConfig::default();
        assert_eq!(c.dangling_refs, DanglingRefPolicy::Error);
        assert_eq!(c.id_sequence, "id");
    }

    #[test]
    fn lenient_config() {
        let c = BucketConfig::lenient();
        assert_eq!(c.dangling_refs, DanglingRefPolicy::Skip);
        assert_eq!(c.id_sequence, "id");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let c: BucketConfig = serde_json::from_str(r#"{"dangling_refs":"skip"}"#).unwrap();
        assert_eq!(c.dangling_refs, DanglingRefPolicy::Skip);
        assert_eq!(c.id_sequence, "id");
    }
}
