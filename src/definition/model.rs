//! Typed model of a validated contract definition
//!
//! Values of these types are only built by the definition parser and are
//! never mutated afterwards: fields are private and exposed read-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Zero address used when a party has no on-chain address yet
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Which side of the payment flow a role sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleClass {
    /// Funds the contract (payer, insured, defendant)
    #[serde(rename = "payer")]
    PayerEquivalent,
    /// Receives funds (payee, insurer, plaintiff)
    #[serde(rename = "payee")]
    PayeeEquivalent,
    /// Takes part without moving funds (arbiter, witness)
    #[serde(rename = "neutral")]
    Neutral,
}

/// Role of a party in the contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartyRole {
    Payer,
    Payee,
    /// Any other role registered in the vocabulary, with its class
    Registered { name: String, class: RoleClass },
}

impl Serialize for PartyRole {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl PartyRole {
    pub fn name(&self) -> &str {
        match self {
            PartyRole::Payer => "payer",
            PartyRole::Payee => "payee",
            PartyRole::Registered { name, .. } => name,
        }
    }

    pub fn class(&self) -> RoleClass {
        match self {
            PartyRole::Payer => RoleClass::PayerEquivalent,
            PartyRole::Payee => RoleClass::PayeeEquivalent,
            PartyRole::Registered { class, .. } => *class,
        }
    }
}

/// An on-chain address as written in the definition.
///
/// The raw text is kept as-is; [`Address::is_well_formed`] is checked by the
/// validator, not on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x` followed by exactly 40 hex digits
    pub fn is_well_formed(&self) -> bool {
        match self.0.strip_prefix("0x") {
            Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => false,
        }
    }
}

/// A party to the contract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartyRef {
    pub(crate) name: String,
    pub(crate) role: PartyRole,
    pub(crate) address: Option<Address>,
    pub(crate) verification_required: bool,
}

impl PartyRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &PartyRole {
        &self.role
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    /// The address text, or the zero address when none was given
    pub fn address_or_zero(&self) -> &str {
        self.address.as_ref().map(|a| a.as_str()).unwrap_or(ZERO_ADDRESS)
    }

    pub fn verification_required(&self) -> bool {
        self.verification_required
    }
}

/// A scalar value in a condition's parameter bag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric view used by constraint checks
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(n) => Some(*n as f64),
            ParamValue::Float(f) => Some(*f),
            ParamValue::Bool(_) | ParamValue::Text(_) => None,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Integer(n) => write!(f, "{}", n),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// A trigger/action pair with an optional deadline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub(crate) trigger: String,
    pub(crate) action: String,
    pub(crate) time_limit: Option<u64>,
    pub(crate) parameters: BTreeMap<String, ParamValue>,
}

impl Condition {
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Deadline in days, always positive when present
    pub fn time_limit(&self) -> Option<u64> {
        self.time_limit
    }

    pub fn parameters(&self) -> &BTreeMap<String, ParamValue> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }
}

/// Free-form definition metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub(crate) version: String,
    pub(crate) description: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            description: String::new(),
        }
    }
}

impl Metadata {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A parsed and validated contract definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractDefinition {
    pub(crate) contract_type: String,
    pub(crate) jurisdiction: String,
    pub(crate) parties: Vec<PartyRef>,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) legal_requirements: Vec<String>,
    pub(crate) metadata: Metadata,
}

impl ContractDefinition {
    pub fn contract_type(&self) -> &str {
        &self.contract_type
    }

    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    pub fn parties(&self) -> &[PartyRef] {
        &self.parties
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Requested legal requirements, in request order without duplicates
    pub fn legal_requirements(&self) -> &[String] {
        &self.legal_requirements
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// First party whose role funds the contract
    pub fn payer(&self) -> Option<&PartyRef> {
        self.first_of_class(RoleClass::PayerEquivalent)
    }

    /// First party whose role receives funds
    pub fn payee(&self) -> Option<&PartyRef> {
        self.first_of_class(RoleClass::PayeeEquivalent)
    }

    pub fn requests(&self, requirement: &str) -> bool {
        self.legal_requirements.iter().any(|r| r == requirement)
    }

    /// Pretty JSON rendering for inspection and provenance records
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn first_of_class(&self, class: RoleClass) -> Option<&PartyRef> {
        self.parties.iter().find(|p| p.role.class() == class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_well_formed() {
        assert!(Address::new("0x1234567890123456789012345678901234567890").is_well_formed());
        assert!(Address::new("0xABCDEFabcdef0000000000000000000000000000").is_well_formed());
        assert!(!Address::new("0x1234").is_well_formed());
        assert!(!Address::new("1234567890123456789012345678901234567890").is_well_formed());
        assert!(!Address::new("0xZZ34567890123456789012345678901234567890").is_well_formed());
    }

    #[test]
    fn test_role_classes() {
        assert_eq!(PartyRole::Payer.class(), RoleClass::PayerEquivalent);
        assert_eq!(PartyRole::Payee.name(), "payee");
        let insurer = PartyRole::Registered {
            name: "insurer".to_string(),
            class: RoleClass::PayeeEquivalent,
        };
        assert_eq!(insurer.name(), "insurer");
        assert_eq!(insurer.class(), RoleClass::PayeeEquivalent);
    }

    #[test]
    fn test_param_value_numeric_view() {
        assert_eq!(ParamValue::Integer(5).as_f64(), Some(5.0));
        assert_eq!(ParamValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(ParamValue::Text("5".to_string()).as_f64(), None);
        assert_eq!(ParamValue::Text("x".to_string()).to_string(), "\"x\"");
    }
}
