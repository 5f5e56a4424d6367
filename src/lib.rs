//! Contract Forge - a compiler from contract definitions to smart-contract artifacts
//!
//! This library parses a declarative contract definition, checks it against
//! the legal rules of its jurisdiction and composes a Solidity contract, a
//! deployment script and a test scaffold from versioned templates.
//!
//! # Example
//!
//! ```rust
//! use contract_forge::Compiler;
//!
//! let artifact = Compiler::builtin().compile_source(r#"
//! contract:
//!   type: escrow
//!   jurisdiction: india
//!   parties:
//!     - { name: Buyer, role: payer }
//!     - { name: Seller, role: payee }
//!   conditions:
//!     - { trigger: delivery_confirmed, action: release_funds }
//!   legal_requirements: [kyc_verification, gst_compliance]
//! "#).unwrap();
//!
//! assert!(artifact.primary().contains("contract EscrowContract"));
//! ```

pub mod artifact;
pub mod compose;
pub mod config;
pub mod definition;
pub mod error;
pub mod ids;
pub mod rules;
pub mod template;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

pub use artifact::{ArtifactRole, GeneratedArtifact, TemplateProvenance};
pub use compose::{CompositionEngine, CompositionError, HandlerRegistry, JurisdictionHandler};
pub use config::{CompilerConfig, ConfigError};
pub use definition::{
    ContractDefinition, DefinitionParser, ValidationError, Vocabulary, VocabularyError,
};
pub use rules::{JurisdictionRuleSet, RegistryHandle, RuleError, RuleRegistry};
pub use template::{ResolvedTemplate, TemplateError, TemplateLibrary};

/// Errors that can occur during the compile pipeline
#[derive(Debug, Error)]
pub enum CompileError {
    /// The definition failed validation
    #[error("validation errors: {}", definition::format_validation_errors(.0))]
    Validation(Vec<ValidationError>),

    /// The rule table could not be loaded
    #[error("rule error: {0}")]
    Rules(#[from] RuleError),

    /// A template could not be loaded or resolved
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// The artifacts could not be composed
    #[error("composition error: {0}")]
    Composition(#[from] CompositionError),

    /// The configuration file could not be loaded
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<Vec<ValidationError>> for CompileError {
    fn from(errors: Vec<ValidationError>) -> Self {
        CompileError::Validation(errors)
    }
}

impl CompileError {
    /// Whether fixing the definition can make compilation succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CompileError::Validation(_))
    }

    /// The validation errors, if this is a validation failure
    pub fn validation_errors(&self) -> Option<&[ValidationError]> {
        match self {
            CompileError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// The complete compile pipeline over immutable, shareable handles
///
/// # Example
///
/// ```rust
/// use contract_forge::{Compiler, CompilerConfig};
///
/// let compiler = Compiler::from_config(
///     &CompilerConfig::new().with_trigger("milestone_reached"),
/// ).unwrap();
/// assert!(compiler.vocabulary().is_trigger("milestone_reached"));
/// ```
#[derive(Debug, Clone)]
pub struct Compiler {
    rules: RegistryHandle,
    templates: Arc<TemplateLibrary>,
    vocabulary: Arc<Vocabulary>,
    engine: CompositionEngine,
}

impl Compiler {
    pub fn new(
        rules: RegistryHandle,
        templates: TemplateLibrary,
        vocabulary: Vocabulary,
        engine: CompositionEngine,
    ) -> Self {
        Self {
            rules,
            templates: Arc::new(templates),
            vocabulary: Arc::new(vocabulary),
            engine,
        }
    }

    /// Built-in rules, templates, vocabulary and jurisdiction handlers
    pub fn builtin() -> Self {
        Self::new(
            RuleRegistry::builtin(),
            TemplateLibrary::builtin(),
            Vocabulary::builtin(),
            CompositionEngine::default(),
        )
    }

    /// Build a compiler from configuration; unset sources fall back to the
    /// built-in ones
    pub fn from_config(config: &CompilerConfig) -> Result<Self, CompileError> {
        let rules = match &config.rules {
            Some(path) => RuleRegistry::load_file(path)?,
            None => RuleRegistry::builtin(),
        };
        let templates = match &config.templates {
            Some(dir) => TemplateLibrary::from_dir(dir)?,
            None => TemplateLibrary::builtin(),
        };
        debug!(
            rule_sets = rules.len(),
            templates = templates.len(),
            "compiler configured"
        );
        Ok(Self::new(
            rules,
            templates,
            config.vocabulary()?,
            CompositionEngine::default(),
        ))
    }

    /// Replace the rule registry
    pub fn with_rules(mut self, rules: RegistryHandle) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the template library
    pub fn with_templates(mut self, templates: TemplateLibrary) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    /// Replace the vocabulary
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = Arc::new(vocabulary);
        self
    }

    /// Replace the composition engine, e.g. to add jurisdiction handlers
    pub fn with_engine(mut self, engine: CompositionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn engine(&self) -> &CompositionEngine {
        &self.engine
    }

    /// Parse and validate a definition
    pub fn parse(&self, raw: &str) -> Result<ContractDefinition, Vec<ValidationError>> {
        DefinitionParser::new(&self.rules, &self.vocabulary).parse(raw)
    }

    /// Compile a validated definition into its artifact triplet
    pub fn compile(&self, definition: &ContractDefinition) -> Result<GeneratedArtifact, CompileError> {
        let rule_set = self
            .rules
            .lookup(definition.jurisdiction(), definition.contract_type())
            .ok_or_else(|| unsupported(&self.rules, definition))?;
        let template = self
            .templates
            .resolve(definition.contract_type(), definition.jurisdiction())?;
        Ok(self.engine.compile(definition, &template, rule_set)?)
    }

    /// Parse, validate and compile raw definition text
    pub fn compile_source(&self, raw: &str) -> Result<GeneratedArtifact, CompileError> {
        let definition = self.parse(raw)?;
        self.compile(&definition)
    }

    /// Read a definition file and compile it
    pub fn compile_file(&self, path: &Path) -> Result<GeneratedArtifact, CompileError> {
        let definition = DefinitionParser::new(&self.rules, &self.vocabulary).parse_file(path)?;
        self.compile(&definition)
    }
}

/// A definition validated against other rules than this compiler's
fn unsupported(rules: &RuleRegistry, definition: &ContractDefinition) -> CompileError {
    let error = if rules.supports_jurisdiction(definition.jurisdiction()) {
        ValidationError::UnsupportedContractType {
            jurisdiction: definition.jurisdiction().to_string(),
            contract_type: definition.contract_type().to_string(),
        }
    } else {
        ValidationError::UnsupportedJurisdiction {
            jurisdiction: definition.jurisdiction().to_string(),
        }
    };
    CompileError::Validation(vec![error])
}
