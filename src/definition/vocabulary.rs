//! Known condition verbs and party roles

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::ids::{is_identifier, normalize_id};

use super::model::{PartyRole, RoleClass};

const BUILTIN_TRIGGERS: &[&str] = &[
    "delivery_confirmed",
    "dispute_raised",
    "claim_submitted",
    "claim_approved",
    "agreement_reached",
    "payment_received",
    "deadline_passed",
    "inspection_passed",
];

const BUILTIN_ACTIONS: &[&str] = &[
    "release_funds",
    "freeze_funds",
    "refund_payer",
    "process_claim",
    "pay_claim",
    "execute_settlement",
    "escalate_dispute",
    "notify_parties",
];

const BUILTIN_ROLES: &[(&str, RoleClass)] = &[
    ("insured", RoleClass::PayerEquivalent),
    ("defendant", RoleClass::PayerEquivalent),
    ("insurer", RoleClass::PayeeEquivalent),
    ("plaintiff", RoleClass::PayeeEquivalent),
    ("arbiter", RoleClass::Neutral),
    ("witness", RoleClass::Neutral),
    ("agent", RoleClass::Neutral),
];

/// A verb or role name that cannot be registered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabularyError {
    #[error("invalid {kind} '{name}': expected a lower-case identifier")]
    InvalidName { kind: &'static str, name: String },
}

/// Normalize a verb or role name and check it can appear in generated code
fn checked_name(kind: &'static str, raw: &str) -> Result<String, VocabularyError> {
    let name = normalize_id(raw);
    if is_identifier(&name) {
        Ok(name)
    } else {
        Err(VocabularyError::InvalidName {
            kind,
            name: raw.to_string(),
        })
    }
}

/// Registry of trigger verbs, action verbs and party roles a definition may use
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    triggers: BTreeSet<String>,
    actions: BTreeSet<String>,
    roles: BTreeMap<String, RoleClass>,
}

impl Vocabulary {
    /// An empty vocabulary; `payer` and `payee` are still always accepted
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in verbs and roles
    pub fn builtin() -> Self {
        Self {
            triggers: BUILTIN_TRIGGERS.iter().map(|t| t.to_string()).collect(),
            actions: BUILTIN_ACTIONS.iter().map(|a| a.to_string()).collect(),
            roles: BUILTIN_ROLES
                .iter()
                .map(|(role, class)| (role.to_string(), *class))
                .collect(),
        }
    }

    /// Register a trigger verb
    pub fn with_trigger(mut self, trigger: &str) -> Result<Self, VocabularyError> {
        self.add_trigger(trigger)?;
        Ok(self)
    }

    /// Register an action verb
    pub fn with_action(mut self, action: &str) -> Result<Self, VocabularyError> {
        self.add_action(action)?;
        Ok(self)
    }

    /// Register a role and the side of the payment flow it sits on
    pub fn with_role(mut self, role: &str, class: RoleClass) -> Result<Self, VocabularyError> {
        self.add_role(role, class)?;
        Ok(self)
    }

    /// Verbs are stored normalized and must be identifiers, since they
    /// become Solidity function and event names
    pub fn add_trigger(&mut self, trigger: &str) -> Result<(), VocabularyError> {
        self.triggers.insert(checked_name("trigger", trigger)?);
        Ok(())
    }

    pub fn add_action(&mut self, action: &str) -> Result<(), VocabularyError> {
        self.actions.insert(checked_name("action", action)?);
        Ok(())
    }

    /// Roles are looked up by normalized name
    pub fn add_role(&mut self, role: &str, class: RoleClass) -> Result<(), VocabularyError> {
        self.roles.insert(checked_name("role", role)?, class);
        Ok(())
    }

    pub fn is_trigger(&self, verb: &str) -> bool {
        self.triggers.contains(verb)
    }

    pub fn is_action(&self, verb: &str) -> bool {
        self.actions.contains(verb)
    }

    /// Resolve a role name to a [`PartyRole`], if it is known
    pub fn role(&self, name: &str) -> Option<PartyRole> {
        match name {
            "payer" => Some(PartyRole::Payer),
            "payee" => Some(PartyRole::Payee),
            other => self.roles.get(other).map(|class| PartyRole::Registered {
                name: other.to_string(),
                class: *class,
            }),
        }
    }

    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        self.triggers.iter().map(|s| s.as_str())
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_verbs() {
        let vocabulary = Vocabulary::builtin();
        assert!(vocabulary.is_trigger("delivery_confirmed"));
        assert!(vocabulary.is_action("release_funds"));
        assert!(!vocabulary.is_trigger("release_funds"));
        assert!(!vocabulary.is_action("teleport_funds"));
    }

    #[test]
    fn test_payer_and_payee_always_known() {
        let vocabulary = Vocabulary::new();
        assert_eq!(vocabulary.role("payer"), Some(PartyRole::Payer));
        assert_eq!(vocabulary.role("payee"), Some(PartyRole::Payee));
        assert_eq!(vocabulary.role("insurer"), None);
    }

    #[test]
    fn test_extend_vocabulary() {
        let vocabulary = Vocabulary::builtin()
            .with_trigger("milestone_reached")
            .and_then(|v| v.with_action("pay_milestone"))
            .and_then(|v| v.with_role("guarantor", RoleClass::PayerEquivalent))
            .expect("Should extend vocabulary");
        assert!(vocabulary.is_trigger("milestone_reached"));
        assert!(vocabulary.is_action("pay_milestone"));
        assert_eq!(
            vocabulary.role("guarantor").map(|r| r.class()),
            Some(RoleClass::PayerEquivalent)
        );
    }

    #[test]
    fn test_names_are_normalized() {
        let vocabulary = Vocabulary::new()
            .with_role(" Guarantor ", RoleClass::PayerEquivalent)
            .and_then(|v| v.with_trigger("Milestone_Reached"))
            .expect("Should extend vocabulary");
        assert_eq!(
            vocabulary.role("guarantor").map(|r| r.class()),
            Some(RoleClass::PayerEquivalent)
        );
        assert!(vocabulary.is_trigger("milestone_reached"));
    }

    #[test]
    fn test_non_identifier_names_rejected() {
        let mut vocabulary = Vocabulary::builtin();
        assert_eq!(
            vocabulary.add_trigger("milestone-reached"),
            Err(VocabularyError::InvalidName {
                kind: "trigger",
                name: "milestone-reached".to_string(),
            })
        );
        assert!(vocabulary.add_action("a{{b").is_err());
        assert!(vocabulary.add_role("lead counsel", RoleClass::Neutral).is_err());
        assert!(!vocabulary.is_trigger("milestone-reached"));
    }
}
