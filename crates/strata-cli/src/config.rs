use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use strata_orm::{BucketConfig, DanglingRefPolicy};

/// File read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "strata.toml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub store: StoreConfig,
    pub buckets: Vec<BucketSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("strata.db"),
        }
    }
}

/// A bucket declared in the configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    #[serde(default)]
    pub dangling_refs: DanglingRefPolicy,
    #[serde(default)]
    pub id_sequence: Option<String>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    /// JSON pointer into the document, e.g. `/owner/id`.
    pub field: String,
    #[serde(default)]
    pub unique: bool,
}

impl BucketSpec {
    /// Settings for a bucket the configuration does not mention.
    pub fn undeclared(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dangling_refs: DanglingRefPolicy::default(),
            id_sequence: None,
            indexes: Vec::new(),
        }
    }

    pub fn bucket_config(&self) -> BucketConfig {
        let defaults = BucketConfig::default();
        BucketConfig {
            dangling_refs: self.dangling_refs,
            id_sequence: self.id_sequence.clone().unwrap_or(defaults.id_sequence),
        }
    }
}

impl CliConfig {
    /// Load `path`, or the default file if present, or built-in defaults.
    ///
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        for (i, bucket) in config.buckets.iter().enumerate() {
            if config.buckets[..i].iter().any(|b| b.name == bucket.name) {
                anyhow::bail!("bucket {:?} is declared twice", bucket.name);
            }
        }
        Ok(config)
    }

    /// The declared settings for `name`, or an index-less default.
    pub fn bucket(&self, name: &str) -> BucketSpec {
        self.buckets
            .iter()
            .find(|b| b.name == name)
            .cloned()
            .unwrap_or_else(|| BucketSpec::undeclared(name))
    }
}
