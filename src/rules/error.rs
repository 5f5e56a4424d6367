//! Error types for rule registry loading

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a rule source
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    /// The source is not well-formed structured data, or violates the rule-set shape
    #[error("malformed rule source: {reason}")]
    MalformedRuleSource { reason: String },

    /// The same (jurisdiction, contract-type) pair appears more than once
    #[error("duplicate rule key ({jurisdiction}, {contract_type})")]
    DuplicateRuleKey {
        jurisdiction: String,
        contract_type: String,
    },

    /// The rule source file could not be read
    #[error("error reading rule source {path}: {message}")]
    Io { path: PathBuf, message: String },
}

impl RuleError {
    /// Create a malformed-source error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRuleSource {
            reason: reason.into(),
        }
    }

    /// Create a duplicate-key error
    pub fn duplicate(jurisdiction: impl Into<String>, contract_type: impl Into<String>) -> Self {
        Self::DuplicateRuleKey {
            jurisdiction: jurisdiction.into(),
            contract_type: contract_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_display() {
        let err = RuleError::duplicate("india", "escrow");
        assert_eq!(err.to_string(), "duplicate rule key (india, escrow)");
    }

    #[test]
    fn test_malformed_display() {
        let err = RuleError::malformed("expected a mapping");
        assert!(err.to_string().contains("expected a mapping"));
    }
}
