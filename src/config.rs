//! Compiler configuration
//!
//! A configuration file extends the built-in vocabulary and can point the
//! compiler at an operator-supplied rule table and template directory:
//!
//! ```toml
//! [vocabulary]
//! triggers = ["milestone_reached"]
//! actions = ["pay_milestone"]
//!
//! [roles]
//! guarantor = "payer"
//! mediator = "neutral"
//!
//! [sources]
//! rules = "rules.yaml"
//! templates = "templates"
//! ```
//!
//! Relative source paths are resolved against the directory of the
//! configuration file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::definition::{RoleClass, Vocabulary, VocabularyError};

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid vocabulary in config: {0}")]
    InvalidVocabulary(#[from] VocabularyError),
}

/// TOML structure for deserializing configuration
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    vocabulary: TomlVocabulary,
    #[serde(default)]
    roles: BTreeMap<String, RoleClass>,
    #[serde(default)]
    sources: TomlSources,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlVocabulary {
    #[serde(default)]
    triggers: Vec<String>,
    #[serde(default)]
    actions: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlSources {
    rules: Option<PathBuf>,
    templates: Option<PathBuf>,
}

/// Configuration for a [`Compiler`](crate::Compiler)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerConfig {
    /// Trigger verbs added to the built-in set
    pub triggers: Vec<String>,
    /// Action verbs added to the built-in set
    pub actions: Vec<String>,
    /// Party roles added to the built-in set
    pub roles: BTreeMap<String, RoleClass>,
    /// Rule table replacing the built-in one
    pub rules: Option<PathBuf>,
    /// Template directory replacing the built-in templates
    pub templates: Option<PathBuf>,
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.rules = config.rules.map(|p| base.join(p));
            config.templates = config.templates.map(|p| base.join(p));
        }
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let config = Self {
            triggers: parsed.vocabulary.triggers,
            actions: parsed.vocabulary.actions,
            roles: parsed.roles,
            rules: parsed.sources.rules,
            templates: parsed.sources.templates,
        };
        config.vocabulary()?;
        Ok(config)
    }

    /// Add a trigger verb
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.triggers.push(trigger.into());
        self
    }

    /// Add an action verb
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Add a party role
    pub fn with_role(mut self, role: impl Into<String>, class: RoleClass) -> Self {
        self.roles.insert(role.into(), class);
        self
    }

    /// Set the rule table file
    pub fn with_rules(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules = Some(path.into());
        self
    }

    /// Set the template directory
    pub fn with_templates(mut self, path: impl Into<PathBuf>) -> Self {
        self.templates = Some(path.into());
        self
    }

    /// The built-in vocabulary extended with the configured verbs and roles
    pub fn vocabulary(&self) -> Result<Vocabulary, ConfigError> {
        let mut vocabulary = Vocabulary::builtin();
        for trigger in &self.triggers {
            vocabulary.add_trigger(trigger)?;
        }
        for action in &self.actions {
            vocabulary.add_action(action)?;
        }
        for (role, class) in &self.roles {
            vocabulary.add_role(role, *class)?;
        }
        Ok(vocabulary)
    }
}
