//! Engine configuration for ScribeDB.
//!
//! Configuration is plain data: it is parsed from TOML, validated once, and
//! then handed to the core by value. Every field has a default so an empty
//! document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

///
/// EngineConfig
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub sql: SqlConfig,
    pub allocator: AllocatorConfig,
    pub text: TextConfig,
    pub ranking: RankingConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&content)
    }

    /// Render the configuration back to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.allocator.validate()?;
        self.text.validate()?;
        self.ranking.validate()?;

        Ok(())
    }
}

///
/// SqlConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqlConfig {
    /// Default SQL mode for new sessions.
    pub strict: bool,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

///
/// AllocatorConfig
///
/// Row-id block sizing. Each refill claims a block twice the size of the
/// previous one, starting at `initial_step` and capped at `max_step`.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocatorConfig {
    pub initial_step: u64,
    pub max_step: u64,
}

impl AllocatorConfig {
    pub const DEFAULT_INITIAL_STEP: u64 = 64;
    pub const DEFAULT_MAX_STEP: u64 = 30_000;

    fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_step == 0 {
            return Err(ConfigError::Invalid {
                field: "allocator.initial_step",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_step < self.initial_step {
            return Err(ConfigError::Invalid {
                field: "allocator.max_step",
                reason: format!(
                    "must be >= initial_step ({} < {})",
                    self.max_step, self.initial_step
                ),
            });
        }

        Ok(())
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            initial_step: Self::DEFAULT_INITIAL_STEP,
            max_step: Self::DEFAULT_MAX_STEP,
        }
    }
}

///
/// TokenizerKind
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// Alphanumeric runs, lowercased.
    #[default]
    Word,
    /// Overlapping character n-grams of `ngram_size`, lowercased.
    Ngram,
}

///
/// TextConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    pub tokenizer: TokenizerKind,
    pub ngram_size: usize,
    /// Tokens longer than this are stored as a prefix plus a digest.
    pub max_token_bytes: usize,
}

impl TextConfig {
    pub const MIN_TOKEN_BYTES: usize = 24;

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tokenizer == TokenizerKind::Ngram && self.ngram_size == 0 {
            return Err(ConfigError::Invalid {
                field: "text.ngram_size",
                reason: "must be at least 1 for the ngram tokenizer".to_string(),
            });
        }
        if self.max_token_bytes < Self::MIN_TOKEN_BYTES {
            return Err(ConfigError::Invalid {
                field: "text.max_token_bytes",
                reason: format!("must be at least {}", Self::MIN_TOKEN_BYTES),
            });
        }

        Ok(())
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerKind::Word,
            ngram_size: 2,
            max_token_bytes: 64,
        }
    }
}

///
/// RankingConfig
///
/// BM25 free parameters.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankingConfig {
    pub k1: f64,
    pub b: f64,
}

impl RankingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(ConfigError::Invalid {
                field: "ranking.k1",
                reason: format!("must be a finite non-negative number, got {}", self.k1),
            });
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(ConfigError::Invalid {
                field: "ranking.b",
                reason: format!("must be within [0, 1], got {}", self.b),
            });
        }

        Ok(())
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

///
/// TESTS
///
