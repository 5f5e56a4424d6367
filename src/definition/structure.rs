//! Structural stage: map a YAML tree onto the typed definition model
//!
//! Every problem is pushed onto the error list and parsing carries on, so a
//! single pass reports all schema errors.

use std::collections::{BTreeMap, BTreeSet};

use serde_yaml::Value;

use crate::ids::{is_identifier, normalize_id};

use super::error::ValidationError;
use super::model::{
    Address, Condition, ContractDefinition, Metadata, ParamValue, PartyRef, RoleClass,
};
use super::vocabulary::Vocabulary;

/// A condition's parameters with its index in the input list
pub(crate) type ParameterBag = (usize, BTreeMap<String, ParamValue>);

/// Whatever could be recovered from the input, valid or not
#[derive(Debug, Default)]
pub(crate) struct Draft {
    pub contract_type: Option<String>,
    pub jurisdiction: Option<String>,
    pub parties: Vec<PartyRef>,
    /// Parsed conditions with their index in the input list
    pub conditions: Vec<(usize, Condition)>,
    /// Parameters of every condition by input index, including conditions
    /// rejected for their verbs, so constraints are still checked
    pub parameters: Vec<ParameterBag>,
    pub legal_requirements: Vec<String>,
    pub metadata: Metadata,
}

impl Draft {
    /// Finish a draft that passed every check
    pub fn into_definition(self) -> Result<ContractDefinition, Vec<ValidationError>> {
        match (self.contract_type, self.jurisdiction) {
            (Some(contract_type), Some(jurisdiction)) => Ok(ContractDefinition {
                contract_type,
                jurisdiction,
                parties: self.parties,
                conditions: self.conditions.into_iter().map(|(_, c)| c).collect(),
                legal_requirements: self.legal_requirements,
                metadata: self.metadata,
            }),
            (contract_type, _) => {
                let field = if contract_type.is_none() {
                    "contract.type"
                } else {
                    "contract.jurisdiction"
                };
                Err(vec![ValidationError::missing(field)])
            }
        }
    }
}

/// Parse raw definition text. Returns `None` when not even the `contract`
/// mapping could be found.
pub(crate) fn parse_structure(
    raw: &str,
    vocabulary: &Vocabulary,
    errors: &mut Vec<ValidationError>,
) -> Option<Draft> {
    let document: Value = match serde_yaml::from_str(raw) {
        Ok(doc) => doc,
        Err(e) => {
            errors.push(ValidationError::schema("<document>", e.to_string()));
            return None;
        }
    };

    let contract = match document.get("contract") {
        Some(contract) if contract.is_mapping() => contract,
        Some(_) => {
            errors.push(ValidationError::schema("contract", "expected a mapping"));
            return None;
        }
        None => {
            errors.push(ValidationError::missing("contract"));
            return None;
        }
    };

    let mut walker = Walker { vocabulary, errors };
    Some(walker.contract(contract))
}

struct Walker<'a, 'e> {
    vocabulary: &'a Vocabulary,
    errors: &'e mut Vec<ValidationError>,
}

impl Walker<'_, '_> {
    fn contract(&mut self, contract: &Value) -> Draft {
        let mut draft = Draft {
            contract_type: self.id_field(contract, "type", "contract"),
            jurisdiction: self.id_field(contract, "jurisdiction", "contract"),
            ..Draft::default()
        };

        draft.parties = self.parties(contract.get("parties"));
        (draft.conditions, draft.parameters) = self.conditions(contract.get("conditions"));
        draft.legal_requirements = self.legal_requirements(contract.get("legal_requirements"));
        draft.metadata = self.metadata(contract.get("metadata"));
        draft
    }

    fn fail(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.errors.push(ValidationError::schema(field, reason));
    }

    /// A required string field
    fn required_str<'v>(&mut self, map: &'v Value, key: &str, path: &str) -> Option<&'v str> {
        let field = format!("{}.{}", path, key);
        match map.get(key) {
            None | Some(Value::Null) => {
                self.errors.push(ValidationError::missing(field));
                None
            }
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                self.fail(field, "expected a string");
                None
            }
        }
    }

    /// An optional string field
    fn optional_str<'v>(&mut self, map: &'v Value, key: &str, path: &str) -> Option<&'v str> {
        match map.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                self.fail(format!("{}.{}", path, key), "expected a string");
                None
            }
        }
    }

    /// A required, normalized identifier (contract type, jurisdiction)
    fn id_field(&mut self, map: &Value, key: &str, path: &str) -> Option<String> {
        let raw = self.required_str(map, key, path)?;
        let id = normalize_id(raw);
        if is_identifier(&id) {
            Some(id)
        } else {
            self.fail(
                format!("{}.{}", path, key),
                format!("invalid identifier '{}'", raw),
            );
            None
        }
    }

    fn parties(&mut self, value: Option<&Value>) -> Vec<PartyRef> {
        const PATH: &str = "contract.parties";
        let entries = match value {
            None | Some(Value::Null) => {
                self.errors.push(ValidationError::missing(PATH));
                return Vec::new();
            }
            Some(Value::Sequence(entries)) => entries,
            Some(_) => {
                self.fail(PATH, "expected a list of parties");
                return Vec::new();
            }
        };

        if entries.len() < 2 {
            self.fail(
                PATH,
                format!("at least two parties are required, found {}", entries.len()),
            );
        }

        // Names are tracked as soon as they are read, so a duplicate is
        // reported even when the earlier party failed on another field
        let mut seen = BTreeSet::new();
        let mut parties: Vec<PartyRef> = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let path = format!("{}[{}]", PATH, i);
            if let Some(party) = self.party(entry, &path, &mut seen) {
                parties.push(party);
            }
        }

        // Role coverage is only meaningful once every party parsed
        if parties.len() == entries.len() && !entries.is_empty() {
            let has = |class| parties.iter().any(|p| p.role.class() == class);
            if !has(RoleClass::PayerEquivalent) {
                self.fail(PATH, "at least one payer-equivalent party is required");
            }
            if !has(RoleClass::PayeeEquivalent) {
                self.fail(PATH, "at least one payee-equivalent party is required");
            }
        }
        parties
    }

    fn party(
        &mut self,
        value: &Value,
        path: &str,
        seen: &mut BTreeSet<String>,
    ) -> Option<PartyRef> {
        if !value.is_mapping() {
            self.fail(path, "expected a mapping");
            return None;
        }

        let name = match self.required_str(value, "name", path) {
            Some(name) if name.trim().is_empty() => {
                self.fail(format!("{}.name", path), "must not be empty");
                None
            }
            Some(name) => {
                let name = name.trim().to_string();
                if seen.insert(name.clone()) {
                    Some(name)
                } else {
                    self.fail(
                        format!("{}.name", path),
                        format!("duplicate party name '{}'", name),
                    );
                    None
                }
            }
            None => None,
        };

        let role = self.required_str(value, "role", path).and_then(|raw| {
            match self.vocabulary.role(&normalize_id(raw)) {
                Some(role) => Some(role),
                None => {
                    self.fail(
                        format!("{}.role", path),
                        format!("unregistered role '{}'", raw),
                    );
                    None
                }
            }
        });

        let address = self.optional_str(value, "address", path).map(|raw| {
            let address = Address::new(raw.trim());
            if !address.is_well_formed() {
                self.fail(
                    format!("{}.address", path),
                    format!(
                        "malformed address '{}': expected 0x followed by 40 hex digits",
                        raw
                    ),
                );
            }
            address
        });

        let verification_required = match value.get("verification_required") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => {
                self.fail(
                    format!("{}.verification_required", path),
                    "expected a boolean",
                );
                true
            }
        };

        Some(PartyRef {
            name: name?,
            role: role?,
            address,
            verification_required,
        })
    }

    fn conditions(&mut self, value: Option<&Value>) -> (Vec<(usize, Condition)>, Vec<ParameterBag>) {
        const PATH: &str = "contract.conditions";
        let entries = match value {
            None | Some(Value::Null) => {
                self.errors.push(ValidationError::missing(PATH));
                return (Vec::new(), Vec::new());
            }
            Some(Value::Sequence(entries)) => entries,
            Some(_) => {
                self.fail(PATH, "expected a list of conditions");
                return (Vec::new(), Vec::new());
            }
        };

        if entries.is_empty() {
            self.fail(PATH, "at least one condition is required");
        }

        let mut conditions = Vec::with_capacity(entries.len());
        let mut parameters = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let (condition, bag) = self.condition(entry, &format!("{}[{}]", PATH, i));
            if let Some(condition) = condition {
                conditions.push((i, condition));
            }
            if !bag.is_empty() {
                parameters.push((i, bag));
            }
        }
        (conditions, parameters)
    }

    /// The condition, if its verbs were accepted, and its parameters either way
    fn condition(
        &mut self,
        value: &Value,
        path: &str,
    ) -> (Option<Condition>, BTreeMap<String, ParamValue>) {
        if !value.is_mapping() {
            self.fail(path, "expected a mapping");
            return (None, BTreeMap::new());
        }

        let trigger = self.required_str(value, "trigger", path).and_then(|raw| {
            let verb = normalize_id(raw);
            if self.vocabulary.is_trigger(&verb) {
                Some(verb)
            } else {
                self.fail(
                    format!("{}.trigger", path),
                    format!("unknown trigger verb '{}'", raw),
                );
                None
            }
        });

        let action = self.required_str(value, "action", path).and_then(|raw| {
            let verb = normalize_id(raw);
            if self.vocabulary.is_action(&verb) {
                Some(verb)
            } else {
                self.fail(
                    format!("{}.action", path),
                    format!("unknown action verb '{}'", raw),
                );
                None
            }
        });

        let time_limit_field = format!("{}.time_limit", path);
        let time_limit = match value.get("time_limit") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => match (n.as_u64(), n.as_i64()) {
                (Some(days), _) if days > 0 => Ok(Some(days)),
                (_, Some(days)) => Err(format!(
                    "time_limit must be a positive number of days, found {}",
                    days
                )),
                _ => Err("expected a positive integer number of days".to_string()),
            },
            Some(_) => Err("expected a positive integer number of days".to_string()),
        };
        let time_limit = match time_limit {
            Ok(limit) => limit,
            Err(reason) => {
                self.fail(time_limit_field, reason);
                None
            }
        };

        let parameters = self.parameters(value.get("parameters"), path);

        let condition = match (trigger, action) {
            (Some(trigger), Some(action)) => Some(Condition {
                trigger,
                action,
                time_limit,
                parameters: parameters.clone(),
            }),
            _ => None,
        };
        (condition, parameters)
    }

    fn parameters(&mut self, value: Option<&Value>, path: &str) -> BTreeMap<String, ParamValue> {
        let path = format!("{}.parameters", path);
        let mapping = match value {
            None | Some(Value::Null) => return BTreeMap::new(),
            Some(Value::Mapping(mapping)) => mapping,
            Some(_) => {
                self.fail(path, "expected a mapping of names to scalar values");
                return BTreeMap::new();
            }
        };

        let mut parameters = BTreeMap::new();
        for (key, value) in mapping {
            let Some(name) = key.as_str() else {
                self.fail(path.clone(), "parameter names must be strings");
                continue;
            };
            let scalar = match value {
                Value::Bool(b) => Some(ParamValue::Bool(*b)),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => Some(ParamValue::Integer(i)),
                    None => n.as_f64().map(ParamValue::Float),
                },
                Value::String(s) => Some(ParamValue::Text(s.clone())),
                _ => None,
            };
            match scalar {
                Some(scalar) => {
                    parameters.insert(name.to_string(), scalar);
                }
                None => self.fail(format!("{}.{}", path, name), "expected a scalar value"),
            }
        }
        parameters
    }

    fn legal_requirements(&mut self, value: Option<&Value>) -> Vec<String> {
        const PATH: &str = "contract.legal_requirements";
        let entries = match value {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Sequence(entries)) => entries,
            Some(_) => {
                self.fail(PATH, "expected a list of legal requirement ids");
                return Vec::new();
            }
        };

        let mut requirements: Vec<String> = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let field = format!("{}[{}]", PATH, i);
            let Some(raw) = entry.as_str() else {
                self.fail(field, "expected a string");
                continue;
            };
            let id = raw.trim();
            if !is_identifier(id) {
                self.fail(
                    field,
                    format!("invalid legal requirement id '{}': expected a lower-case identifier", raw),
                );
            } else if requirements.iter().any(|r| r == id) {
                self.fail(field, format!("duplicate legal requirement '{}'", id));
            } else {
                requirements.push(id.to_string());
            }
        }
        requirements
    }

    fn metadata(&mut self, value: Option<&Value>) -> Metadata {
        const PATH: &str = "contract.metadata";
        let mut metadata = Metadata::default();
        match value {
            None | Some(Value::Null) => {}
            Some(map @ Value::Mapping(_)) => {
                if let Some(version) = self.optional_str(map, "version", PATH) {
                    if version.trim().is_empty() {
                        self.fail(format!("{}.version", PATH), "must not be empty");
                    } else {
                        metadata.version = version.trim().to_string();
                    }
                }
                if let Some(description) = self.optional_str(map, "description", PATH) {
                    metadata.description = description.trim().to_string();
                }
            }
            Some(_) => self.fail(PATH, "expected a mapping"),
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(raw: &str) -> (Option<Draft>, Vec<ValidationError>) {
        let vocabulary = Vocabulary::builtin();
        let mut errors = Vec::new();
        let draft = parse_structure(raw, &vocabulary, &mut errors);
        (draft, errors)
    }

    fn fields(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().filter_map(|e| e.field()).collect()
    }

    const VALID: &str = r#"
contract:
  type: Escrow
  jurisdiction: " INDIA "
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
      parameters:
        amount: 5000
        note: "on delivery"
        partial: false
  legal_requirements: [kyc_verification, gst_compliance]
  metadata:
    version: "2.1.0"
    description: Purchase escrow
"#;

    #[test]
    fn test_valid_structure() {
        let (draft, errors) = structure(VALID);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        let draft = draft.expect("Should produce a draft");
        assert_eq!(draft.contract_type.as_deref(), Some("escrow"));
        assert_eq!(draft.jurisdiction.as_deref(), Some("india"));
        assert_eq!(draft.parties.len(), 2);
        assert_eq!(draft.conditions.len(), 1);

        let (_, condition) = &draft.conditions[0];
        assert_eq!(condition.time_limit(), Some(7));
        assert_eq!(condition.parameter("amount"), Some(&ParamValue::Integer(5000)));
        assert_eq!(condition.parameter("partial"), Some(&ParamValue::Bool(false)));
        assert_eq!(draft.metadata.version(), "2.1.0");
    }

    #[test]
    fn test_malformed_yaml() {
        let (draft, errors) = structure("contract: [unclosed");
        assert!(draft.is_none());
        assert_eq!(fields(&errors), vec!["<document>"]);
    }

    #[test]
    fn test_missing_contract_key() {
        let (draft, errors) = structure("agreement:\n  type: escrow\n");
        assert!(draft.is_none());
        assert_eq!(errors, vec![ValidationError::missing("contract")]);
    }

    #[test]
    fn test_missing_required_fields_all_reported() {
        let (_, errors) = structure("contract:\n  metadata: {}\n");
        assert_eq!(
            fields(&errors),
            vec![
                "contract.type",
                "contract.jurisdiction",
                "contract.parties",
                "contract.conditions"
            ]
        );
    }

    #[test]
    fn test_party_errors() {
        let raw = r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - name: Buyer
      role: payer
      address: "0x1234"
    - name: Buyer
      role: payee
    - name: ""
      role: overlord
  conditions:
    - trigger: delivery_confirmed
      action: release_funds
"#;
        let (_, errors) = structure(raw);
        assert_eq!(
            fields(&errors),
            vec![
                "contract.parties[0].address",
                "contract.parties[1].name",
                "contract.parties[2].name",
                "contract.parties[2].role",
            ]
        );
    }

    #[test]
    fn test_duplicate_name_reported_alongside_bad_role() {
        let raw = r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - {name: A, role: boss}
    - {name: A, role: payee}
  conditions:
    - trigger: delivery_confirmed
      action: release_funds
"#;
        let (_, errors) = structure(raw);
        assert_eq!(
            fields(&errors),
            vec!["contract.parties[0].role", "contract.parties[1].name"]
        );
    }

    #[test]
    fn test_rejected_condition_keeps_parameters() {
        let raw = r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - {name: Buyer, role: payer}
    - {name: Seller, role: payee}
  conditions:
    - {trigger: delivery_confirmed, action: release_funds}
    - trigger: delivery_confirmed
      action: teleport_funds
      parameters: {amount: 5000000}
"#;
        let (draft, errors) = structure(raw);
        assert_eq!(fields(&errors), vec!["contract.conditions[1].action"]);
        let draft = draft.expect("Should produce a draft");
        assert_eq!(draft.conditions.len(), 1);
        assert_eq!(draft.parameters.len(), 1);
        let (index, parameters) = &draft.parameters[0];
        assert_eq!(*index, 1);
        assert_eq!(parameters.get("amount"), Some(&ParamValue::Integer(5_000_000)));
    }

    #[test]
    fn test_single_party_and_missing_payee() {
        let raw = r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - name: Buyer
      role: payer
  conditions:
    - trigger: delivery_confirmed
      action: release_funds
"#;
        let (_, errors) = structure(raw);
        let reasons: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(reasons.len(), 2);
        assert!(reasons[0].contains("at least two parties"));
        assert!(reasons[1].contains("payee-equivalent"));
    }

    #[test]
    fn test_registered_roles_satisfy_payer_and_payee() {
        let raw = r#"
contract:
  type: insurance
  jurisdiction: eu
  parties:
    - name: Insurer Co
      role: insurer
    - name: Policy Holder
      role: Insured
  conditions:
    - trigger: claim_submitted
      action: process_claim
"#;
        let (draft, errors) = structure(raw);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        assert_eq!(draft.map(|d| d.parties.len()), Some(2));
    }

    #[test]
    fn test_condition_errors() {
        let raw = r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - {name: Buyer, role: payer}
    - {name: Seller, role: payee}
  conditions:
    - trigger: moon_landing
      action: release_funds
      time_limit: 0
    - trigger: delivery_confirmed
      action: teleport
      time_limit: -3
    - trigger: delivery_confirmed
      action: release_funds
      time_limit: "soon"
      parameters:
        tiers: [1, 2]
"#;
        let (draft, errors) = structure(raw);
        assert_eq!(
            fields(&errors),
            vec![
                "contract.conditions[0].trigger",
                "contract.conditions[0].time_limit",
                "contract.conditions[1].action",
                "contract.conditions[1].time_limit",
                "contract.conditions[2].time_limit",
                "contract.conditions[2].parameters.tiers",
            ]
        );
        // Only the third condition had valid verbs
        let draft = draft.expect("Should produce a draft");
        assert_eq!(draft.conditions.len(), 1);
        assert_eq!(draft.conditions[0].0, 2);
    }

    #[test]
    fn test_empty_conditions() {
        let raw = r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - {name: Buyer, role: payer}
    - {name: Seller, role: payee}
  conditions: []
"#;
        let (_, errors) = structure(raw);
        assert_eq!(
            errors,
            vec![ValidationError::schema(
                "contract.conditions",
                "at least one condition is required"
            )]
        );
    }

    #[test]
    fn test_legal_requirement_errors() {
        let raw = r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - {name: Buyer, role: payer}
    - {name: Seller, role: payee}
  conditions:
    - {trigger: delivery_confirmed, action: release_funds}
  legal_requirements: [kyc_verification, kyc_verification, "GST Compliance", 7]
"#;
        let (draft, errors) = structure(raw);
        assert_eq!(
            fields(&errors),
            vec![
                "contract.legal_requirements[1]",
                "contract.legal_requirements[2]",
                "contract.legal_requirements[3]",
            ]
        );
        assert_eq!(
            draft.map(|d| d.legal_requirements),
            Some(vec!["kyc_verification".to_string()])
        );
    }

    #[test]
    fn test_wrong_scalar_types() {
        let raw = r#"
contract:
  type: 42
  jurisdiction: india
  parties:
    - {name: Buyer, role: payer, verification_required: "yes"}
    - {name: Seller, role: payee}
  conditions:
    - {trigger: delivery_confirmed, action: release_funds}
  metadata:
    version: 1.0
"#;
        let (_, errors) = structure(raw);
        assert_eq!(
            fields(&errors),
            vec![
                "contract.type",
                "contract.parties[0].verification_required",
                "contract.metadata.version",
            ]
        );
    }
}
