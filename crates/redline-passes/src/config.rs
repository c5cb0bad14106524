//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! suggestion_policy = "join"
//! scope = "per_block"
//!
//! [mapper]
//! max_issue_len = 60
//!
//! [[passes]]
//! id = "1"
//! name = "Brevity"
//! command = "brevity"
//! ```
//!
//! Every key is optional. Leaving out `passes` gives the stock checklist.

use std::collections::HashSet;
use std::path::Path;

use miette::{NamedSource, SourceSpan};
use redline_core::{MapperConfig, SuggestionPolicy};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pass::{Pass, default_passes};

/// How much text each analyzer call sees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisScope {
    /// One call over the whole flattened document.
    #[default]
    Document,
    /// One call per top-level block, publishing each block's annotations
    /// before analyzing the next.
    PerBlock,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mapper: MapperConfig,
    pub suggestion_policy: SuggestionPolicy,
    pub scope: AnalysisScope,
    pub passes: Vec<Pass>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mapper: MapperConfig::default(),
            suggestion_policy: SuggestionPolicy::default(),
            scope: AnalysisScope::default(),
            passes: default_passes(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a config from TOML source.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Self::parse(source, "redline.toml")
    }

    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&source, &path.display().to_string())?;
        tracing::debug!(target: "redline::config", path = %path.display(), passes = config.passes.len(), "loaded config");
        Ok(config)
    }

    fn parse(source: &str, name: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|err| ConfigError::Parse {
            message: err.message().to_owned(),
            span: err.span().map(|span| SourceSpan::from(span.start..span.end)),
            src: NamedSource::new(name, source.to_owned()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check limits are non-zero and pass ids are unique and non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mapper = &self.mapper;
        if mapper.max_issue_len == 0 || mapper.sentence_issue_len == 0 {
            return Err(ConfigError::Invalid(
                "mapper issue length limits must be greater than zero".into(),
            ));
        }

        let mut seen = HashSet::new();
        for pass in &self.passes {
            if pass.id.is_empty() {
                return Err(ConfigError::Invalid(format!("pass {:?} has an empty id", pass.name)));
            }
            if !seen.insert(pass.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate pass id {:?}", pass.id)));
            }
        }
        Ok(())
    }
}
