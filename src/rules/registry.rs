//! Jurisdiction rule registry
//!
//! A rule source is a YAML mapping of jurisdiction id to contract-type id to
//! rule set. Loading produces an immutable [`RegistryHandle`]; reloading
//! produces a new handle and never touches the entries behind an old one.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::Serialize;
use tracing::debug;

use crate::ids::{is_identifier, normalize_id};

use super::error::RuleError;

const BUILTIN_RULES: &str = include_str!("../../assets/rules/jurisdictions.yaml");

/// Legal rules for one (jurisdiction, contract-type) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JurisdictionRuleSet {
    jurisdiction: String,
    contract_type: String,
    legal_requirements: Vec<String>,
    mandatory_clauses: Vec<String>,
    time_limits: BTreeMap<String, u64>,
    constraints: BTreeMap<String, f64>,
}

impl JurisdictionRuleSet {
    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    pub fn contract_type(&self) -> &str {
        &self.contract_type
    }

    /// Required legal-requirement ids, in source order. Never empty.
    pub fn legal_requirements(&self) -> &[String] {
        &self.legal_requirements
    }

    pub fn mandatory_clauses(&self) -> &[String] {
        &self.mandatory_clauses
    }

    /// Named time limits in days, e.g. `dispute_resolution_days`
    pub fn time_limits(&self) -> &BTreeMap<String, u64> {
        &self.time_limits
    }

    pub fn time_limit(&self, name: &str) -> Option<u64> {
        self.time_limits.get(name).copied()
    }

    /// Numeric constraints, e.g. `max_amount`
    pub fn constraints(&self) -> &BTreeMap<String, f64> {
        &self.constraints
    }

    pub fn constraint(&self, name: &str) -> Option<f64> {
        self.constraints.get(name).copied()
    }

    pub fn requires(&self, requirement: &str) -> bool {
        self.legal_requirements.iter().any(|r| r == requirement)
    }
}

/// Read-only index of rule sets by (jurisdiction, contract-type)
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<String, BTreeMap<String, JurisdictionRuleSet>>,
}

/// Shared immutable handle to a loaded [`RuleRegistry`]
#[derive(Debug, Clone)]
pub struct RegistryHandle(Arc<RuleRegistry>);

impl Deref for RegistryHandle {
    type Target = RuleRegistry;

    fn deref(&self) -> &RuleRegistry {
        &self.0
    }
}

impl RuleRegistry {
    /// Load a registry from a single YAML rule source
    pub fn load(source: &str) -> Result<RegistryHandle, RuleError> {
        Self::load_many(&[source])
    }

    /// Load several rule sources into one registry.
    ///
    /// A (jurisdiction, contract-type) pair defined by two sources is a
    /// [`RuleError::DuplicateRuleKey`].
    pub fn load_many(sources: &[&str]) -> Result<RegistryHandle, RuleError> {
        let mut registry = RuleRegistry::default();
        for source in sources {
            registry.absorb(source)?;
        }
        debug!(
            jurisdictions = registry.rules.len(),
            rule_sets = registry.len(),
            "rule registry loaded"
        );
        Ok(RegistryHandle(Arc::new(registry)))
    }

    /// Load a registry from a YAML file
    pub fn load_file(path: &Path) -> Result<RegistryHandle, RuleError> {
        let source = std::fs::read_to_string(path).map_err(|e| RuleError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::load(&source)
    }

    /// The rule table shipped with the crate
    pub fn builtin() -> RegistryHandle {
        Self::load(BUILTIN_RULES).expect("Built-in rule table should be valid")
    }

    /// Look up the rule set for a pair. Unknown pairs are `None`, never empty.
    pub fn lookup(&self, jurisdiction: &str, contract_type: &str) -> Option<&JurisdictionRuleSet> {
        self.rules
            .get(&normalize_id(jurisdiction))?
            .get(&normalize_id(contract_type))
    }

    pub fn supports_jurisdiction(&self, jurisdiction: &str) -> bool {
        self.rules.contains_key(&normalize_id(jurisdiction))
    }

    /// All jurisdiction ids, sorted
    pub fn jurisdictions(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(|s| s.as_str())
    }

    /// Contract types supported in a jurisdiction, sorted
    pub fn contract_types(&self, jurisdiction: &str) -> Vec<&str> {
        self.rules
            .get(&normalize_id(jurisdiction))
            .map(|types| types.keys().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Number of (jurisdiction, contract-type) pairs
    pub fn len(&self) -> usize {
        self.rules.values().map(|types| types.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn absorb(&mut self, source: &str) -> Result<(), RuleError> {
        let raw: Entries<Entries<RawRuleSet>> =
            serde_yaml::from_str(source).map_err(|e| RuleError::malformed(e.to_string()))?;

        for (raw_jurisdiction, types) in raw.0 {
            let jurisdiction = checked_id(&raw_jurisdiction, "jurisdiction id")?;
            for (raw_type, raw_rules) in types.0 {
                let contract_type = checked_id(&raw_type, "contract type id")?;
                let rule_set = raw_rules.into_rule_set(&jurisdiction, &contract_type)?;
                let by_type = self.rules.entry(jurisdiction.clone()).or_default();
                if by_type.contains_key(&contract_type) {
                    return Err(RuleError::duplicate(jurisdiction, contract_type));
                }
                by_type.insert(contract_type, rule_set);
            }
        }
        Ok(())
    }
}

fn checked_id(raw: &str, what: &str) -> Result<String, RuleError> {
    let id = normalize_id(raw);
    if is_identifier(&id) {
        Ok(id)
    } else {
        Err(RuleError::malformed(format!("invalid {} '{}'", what, raw)))
    }
}

/// Rule set as written in the source, before checks
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRuleSet {
    legal_requirements: Vec<String>,
    #[serde(default)]
    mandatory_clauses: Vec<String>,
    #[serde(default)]
    time_limits: Entries<u64>,
    #[serde(default)]
    constraints: Entries<f64>,
}

impl RawRuleSet {
    fn into_rule_set(
        self,
        jurisdiction: &str,
        contract_type: &str,
    ) -> Result<JurisdictionRuleSet, RuleError> {
        let context = format!("({}, {})", jurisdiction, contract_type);

        if self.legal_requirements.is_empty() {
            return Err(RuleError::malformed(format!(
                "{}: legal_requirements must not be empty",
                context
            )));
        }
        let legal_requirements = unique_ids(self.legal_requirements, "legal requirement", &context)?;
        let mandatory_clauses = unique_ids(self.mandatory_clauses, "mandatory clause", &context)?;

        let mut time_limits = BTreeMap::new();
        for (name, days) in self.time_limits.0 {
            if !is_identifier(&name) {
                return Err(RuleError::malformed(format!(
                    "{}: invalid time limit name '{}'",
                    context, name
                )));
            }
            if days == 0 {
                return Err(RuleError::malformed(format!(
                    "{}: time limit '{}' must be positive",
                    context, name
                )));
            }
            if time_limits.insert(name.clone(), days).is_some() {
                return Err(RuleError::malformed(format!(
                    "{}: time limit '{}' defined twice",
                    context, name
                )));
            }
        }

        let mut constraints = BTreeMap::new();
        for (name, value) in self.constraints.0 {
            if !is_identifier(&name) {
                return Err(RuleError::malformed(format!(
                    "{}: invalid constraint name '{}'",
                    context, name
                )));
            }
            if !value.is_finite() {
                return Err(RuleError::malformed(format!(
                    "{}: constraint '{}' must be a finite number",
                    context, name
                )));
            }
            if constraints.insert(name.clone(), value).is_some() {
                return Err(RuleError::malformed(format!(
                    "{}: constraint '{}' defined twice",
                    context, name
                )));
            }
        }

        Ok(JurisdictionRuleSet {
            jurisdiction: jurisdiction.to_string(),
            contract_type: contract_type.to_string(),
            legal_requirements,
            mandatory_clauses,
            time_limits,
            constraints,
        })
    }
}

fn unique_ids(ids: Vec<String>, what: &str, context: &str) -> Result<Vec<String>, RuleError> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !is_identifier(&id) {
            return Err(RuleError::malformed(format!(
                "{}: invalid {} id '{}'",
                context, what, id
            )));
        }
        if seen.contains(&id) {
            return Err(RuleError::malformed(format!(
                "{}: {} '{}' listed twice",
                context, what, id
            )));
        }
        seen.push(id);
    }
    Ok(seen)
}

/// Mapping entries in source order, duplicates included.
///
/// Deserializing into a map type would collapse or reject duplicate keys
/// before we can report which pair was duplicated.
struct Entries<V>(Vec<(String, V)>);

impl<V> Default for Entries<V> {
    fn default() -> Self {
        Entries(Vec::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = Entries<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}
