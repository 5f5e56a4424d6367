//! Jurisdiction handlers
//!
//! Jurisdiction-specific generator logic lives behind one trait and one
//! registry keyed by jurisdiction id. The engine looks a handler up once per
//! compilation; adding a jurisdiction means registering a handler.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::definition::ContractDefinition;
use crate::ids::{is_identifier, normalize_id};
use crate::rules::JurisdictionRuleSet;

use super::error::CompositionError;
use super::generate::whole_constant;
use super::jurisdictions::{EuHandler, IndiaHandler, UsHandler};

/// Read-only view of the inputs a handler generates from
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    definition: &'a ContractDefinition,
    rule_set: &'a JurisdictionRuleSet,
}

impl<'a> HandlerContext<'a> {
    pub fn new(definition: &'a ContractDefinition, rule_set: &'a JurisdictionRuleSet) -> Self {
        Self {
            definition,
            rule_set,
        }
    }

    pub fn definition(&self) -> &'a ContractDefinition {
        self.definition
    }

    pub fn rule_set(&self) -> &'a JurisdictionRuleSet {
        self.rule_set
    }

    /// True if the requirement is mandated by the rules or requested
    pub fn requires(&self, requirement: &str) -> bool {
        self.rule_set.requires(requirement) || self.definition.requests(requirement)
    }

    /// True if the generated contract declares a constant for this rule
    /// time limit or constraint
    pub fn has_constant(&self, name: &str) -> bool {
        self.rule_set.time_limit(name).is_some()
            || self
                .rule_set
                .constraint(name)
                .and_then(whole_constant)
                .is_some()
    }
}

/// State variables and constructor statements contributed by a handler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSlots {
    pub variables: Vec<String>,
    pub initialization: Vec<String>,
}

/// A jurisdiction-specific test in the generated test scaffold
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub body: Vec<String>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, body: Vec<String>) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }
}

/// Generator logic for one jurisdiction
pub trait JurisdictionHandler: Send + Sync {
    /// Jurisdiction id this handler is registered under
    fn id(&self) -> &str;

    /// Human-readable jurisdiction name
    fn display_name(&self) -> &str;

    /// State variables and constructor statements
    fn initialize_state(&self, ctx: &HandlerContext<'_>) -> StateSlots;

    /// Statements inside `verifyLegalCompliance`; they `return false` when
    /// a jurisdiction check fails
    fn verify_compliance(&self, ctx: &HandlerContext<'_>) -> Vec<String>;

    /// Statements run when a dispute is raised
    fn dispute_handling(&self, ctx: &HandlerContext<'_>) -> Vec<String>;

    /// Extra contract functions
    fn functions(&self, _ctx: &HandlerContext<'_>) -> Vec<String> {
        Vec::new()
    }

    fn test_cases(&self, _ctx: &HandlerContext<'_>) -> Vec<TestCase> {
        Vec::new()
    }
}

/// Jurisdiction handlers keyed by id
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn JurisdictionHandler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the `india`, `eu` and `us` handlers
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        let builtin: [Arc<dyn JurisdictionHandler>; 3] =
            [Arc::new(IndiaHandler), Arc::new(EuHandler), Arc::new(UsHandler)];
        for handler in builtin {
            registry
                .handlers
                .insert(handler.id().to_string(), handler);
        }
        registry
    }

    /// Register a handler under its normalized id
    pub fn register(&mut self, handler: impl JurisdictionHandler + 'static) -> Result<(), CompositionError> {
        let id = normalize_id(handler.id());
        if !is_identifier(&id) {
            return Err(CompositionError::InvalidHandlerId {
                id: handler.id().to_string(),
            });
        }
        if self.handlers.contains_key(&id) {
            return Err(CompositionError::DuplicateHandler { id });
        }
        self.handlers.insert(id, Arc::new(handler));
        Ok(())
    }

    pub fn get(&self, jurisdiction: &str) -> Option<&dyn JurisdictionHandler> {
        self.handlers.get(jurisdiction).map(|h| h.as_ref())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MarsHandler;

    impl JurisdictionHandler for MarsHandler {
        fn id(&self) -> &str {
            "mars"
        }

        fn display_name(&self) -> &str {
            "Mars Colony"
        }

        fn initialize_state(&self, _ctx: &HandlerContext<'_>) -> StateSlots {
            StateSlots::default()
        }

        fn verify_compliance(&self, _ctx: &HandlerContext<'_>) -> Vec<String> {
            vec!["// no checks".to_string()]
        }

        fn dispute_handling(&self, _ctx: &HandlerContext<'_>) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn test_builtin_ids() {
        let registry = HandlerRegistry::with_builtin();
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["eu", "india", "us"]);
        assert_eq!(registry.get("india").map(|h| h.display_name()), Some("India"));
    }

    #[test]
    fn test_register_new_jurisdiction() {
        let mut registry = HandlerRegistry::with_builtin();
        registry.register(MarsHandler).expect("Should register");
        assert_eq!(registry.get("mars").map(|h| h.display_name()), Some("Mars Colony"));

        let err = registry.register(MarsHandler).expect_err("Should reject duplicate");
        assert_eq!(
            err,
            CompositionError::DuplicateHandler {
                id: "mars".to_string()
            }
        );
    }

    struct NamedHandler(&'static str);

    impl JurisdictionHandler for NamedHandler {
        fn id(&self) -> &str {
            self.0
        }

        fn display_name(&self) -> &str {
            "Named"
        }

        fn initialize_state(&self, _ctx: &HandlerContext<'_>) -> StateSlots {
            StateSlots::default()
        }

        fn verify_compliance(&self, _ctx: &HandlerContext<'_>) -> Vec<String> {
            Vec::new()
        }

        fn dispute_handling(&self, _ctx: &HandlerContext<'_>) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn test_handler_ids_normalized() {
        let mut registry = HandlerRegistry::new();
        registry.register(NamedHandler(" UK ")).expect("Should register");
        assert_eq!(registry.get("uk").map(|h| h.display_name()), Some("Named"));

        let err = registry.register(NamedHandler("uk")).expect_err("Should reject duplicate");
        assert!(matches!(err, CompositionError::DuplicateHandler { .. }));

        let err = registry
            .register(NamedHandler("new-zealand"))
            .expect_err("Should reject non-identifier id");
        assert_eq!(
            err,
            CompositionError::InvalidHandlerId {
                id: "new-zealand".to_string()
            }
        );
    }
}
