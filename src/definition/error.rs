//! Validation errors for contract definitions

use thiserror::Error;

/// A single problem found while parsing or validating a definition.
///
/// Validation reports every problem it finds, so these always travel as a
/// `Vec<ValidationError>`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The input does not match the definition schema
    #[error("{field}: {reason}")]
    SchemaError { field: String, reason: String },

    /// A legal requirement mandated by the rules was not requested
    #[error("missing legal requirement '{id}' mandated for {contract_type} contracts in {jurisdiction}")]
    MissingLegalRequirement {
        id: String,
        jurisdiction: String,
        contract_type: String,
    },

    /// A condition parameter breaks a numeric constraint of the rule set
    #[error("constraint '{id}' violated by {field}: {value} is outside the bound {limit}")]
    ConstraintViolation {
        id: String,
        field: String,
        value: f64,
        limit: f64,
    },

    /// No rules exist for the jurisdiction
    #[error("unsupported jurisdiction '{jurisdiction}'")]
    UnsupportedJurisdiction { jurisdiction: String },

    /// The jurisdiction has rules, but not for this contract type
    #[error("contract type '{contract_type}' is not supported in jurisdiction '{jurisdiction}'")]
    UnsupportedContractType {
        jurisdiction: String,
        contract_type: String,
    },
}

impl ValidationError {
    /// Create a schema error for a field path
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing-field schema error
    pub fn missing(field: impl Into<String>) -> Self {
        Self::schema(field, "missing required field")
    }

    /// The field path this error points at, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::SchemaError { field, .. } => Some(field),
            Self::ConstraintViolation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Join errors into one line, as the CLI and `CompileError` display them
pub fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let err = ValidationError::schema("contract.parties[1].role", "unregistered role 'boss'");
        insta::assert_snapshot!(err.to_string(), @"contract.parties[1].role: unregistered role 'boss'");
    }

    #[test]
    fn test_missing_requirement_display() {
        let err = ValidationError::MissingLegalRequirement {
            id: "gst_compliance".to_string(),
            jurisdiction: "india".to_string(),
            contract_type: "escrow".to_string(),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"missing legal requirement 'gst_compliance' mandated for escrow contracts in india"
        );
    }

    #[test]
    fn test_field_accessor() {
        assert_eq!(
            ValidationError::missing("contract.type").field(),
            Some("contract.type")
        );
        let err = ValidationError::UnsupportedJurisdiction {
            jurisdiction: "mars".to_string(),
        };
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_format_joins_all() {
        let errors = vec![
            ValidationError::missing("contract.type"),
            ValidationError::missing("contract.jurisdiction"),
        ];
        assert_eq!(
            format_validation_errors(&errors),
            "contract.type: missing required field; contract.jurisdiction: missing required field"
        );
    }
}
