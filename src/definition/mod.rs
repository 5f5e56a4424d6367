//! Contract definition parsing and validation
//!
//! Parsing runs in two stages over a single pass: a structural walk of the
//! YAML tree, then a conformance check against the jurisdiction rules. All
//! errors from both stages are collected and returned together.

mod conformance;
mod error;
mod model;
mod structure;
mod vocabulary;

use std::path::Path;

use tracing::{debug, warn};

use crate::rules::RuleRegistry;

pub use error::{format_validation_errors, ValidationError};
pub use model::{
    Address, Condition, ContractDefinition, Metadata, ParamValue, PartyRef, PartyRole, RoleClass,
    ZERO_ADDRESS,
};
pub use vocabulary::{Vocabulary, VocabularyError};

/// Parses raw definitions against a rule registry and vocabulary
#[derive(Debug, Clone, Copy)]
pub struct DefinitionParser<'a> {
    rules: &'a RuleRegistry,
    vocabulary: &'a Vocabulary,
}

impl<'a> DefinitionParser<'a> {
    pub fn new(rules: &'a RuleRegistry, vocabulary: &'a Vocabulary) -> Self {
        Self { rules, vocabulary }
    }

    /// Parse and validate a definition.
    ///
    /// Returns every schema and conformance error found, or a definition
    /// that satisfies its jurisdiction's rules.
    pub fn parse(&self, raw: &str) -> Result<ContractDefinition, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let draft = structure::parse_structure(raw, self.vocabulary, &mut errors);

        if let Some(draft) = &draft {
            conformance::check(draft, self.rules, &mut errors);
        }

        if !errors.is_empty() {
            warn!(errors = errors.len(), "contract definition rejected");
            return Err(errors);
        }

        match draft {
            Some(draft) => {
                let definition = draft.into_definition()?;
                debug!(
                    contract_type = definition.contract_type(),
                    jurisdiction = definition.jurisdiction(),
                    "contract definition accepted"
                );
                Ok(definition)
            }
            None => Err(vec![ValidationError::missing("contract")]),
        }
    }

    /// Read a definition file and parse it
    pub fn parse_file(&self, path: &Path) -> Result<ContractDefinition, Vec<ValidationError>> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            vec![ValidationError::schema(
                "<document>",
                format!("cannot read {}: {}", path.display(), e),
            )]
        })?;
        self.parse(&raw)
    }
}

/// Parse a definition with an explicit registry and vocabulary
pub fn parse(
    raw: &str,
    rules: &RuleRegistry,
    vocabulary: &Vocabulary,
) -> Result<ContractDefinition, Vec<ValidationError>> {
    DefinitionParser::new(rules, vocabulary).parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"
india:
  escrow:
    legal_requirements: [kyc_verification, gst_compliance]
"#;

    const DEFINITION: &str = r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - name: Buyer
      role: payer
      address: "0x1234567890123456789012345678901234567890"
    - name: Seller
      role: payee
  conditions:
    - trigger: delivery_confirmed
      action: release_funds
      time_limit: 7
  legal_requirements: [kyc_verification, gst_compliance]
"#;

    #[test]
    fn test_parse_valid_definition() {
        let rules = RuleRegistry::load(RULES).expect("Should load rules");
        let vocabulary = Vocabulary::builtin();
        let definition = parse(DEFINITION, &rules, &vocabulary).expect("Should parse");

        assert_eq!(definition.contract_type(), "escrow");
        assert_eq!(definition.payer().map(|p| p.name()), Some("Buyer"));
        assert_eq!(definition.payee().map(|p| p.address_or_zero()), Some(ZERO_ADDRESS));
        assert!(definition.parties()[0].verification_required());
        assert_eq!(definition.metadata().version(), "1.0.0");
        assert_eq!(definition.conditions()[0].time_limit(), Some(7));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let rules = RuleRegistry::load(RULES).expect("Should load rules");
        let vocabulary = Vocabulary::builtin();
        let parser = DefinitionParser::new(&rules, &vocabulary);
        assert_eq!(parser.parse(DEFINITION), parser.parse(DEFINITION));
    }

    #[test]
    fn test_to_json_includes_roles() {
        let rules = RuleRegistry::load(RULES).expect("Should load rules");
        let vocabulary = Vocabulary::builtin();
        let definition = parse(DEFINITION, &rules, &vocabulary).expect("Should parse");
        let json = definition.to_json().expect("Should serialize");
        assert!(json.contains("\"role\": \"payer\""));
        assert!(json.contains("\"jurisdiction\": \"india\""));
    }

    #[test]
    fn test_parse_file_missing() {
        let rules = RuleRegistry::load(RULES).expect("Should load rules");
        let vocabulary = Vocabulary::builtin();
        let errors = DefinitionParser::new(&rules, &vocabulary)
            .parse_file(Path::new("/nonexistent/definition.yaml"))
            .expect_err("Should fail");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), Some("<document>"));
    }
}
