//! Rule conformance stage: check a draft against its jurisdiction rule set

use crate::rules::{JurisdictionRuleSet, RuleRegistry};

use super::error::ValidationError;
use super::structure::{Draft, ParameterBag};

/// A numeric bound named by a `max_<param>` or `min_<param>` constraint
#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound<'a> {
    Max(&'a str),
    Min(&'a str),
}

impl<'a> Bound<'a> {
    fn parse(constraint: &'a str) -> Option<Self> {
        let bound = match constraint.strip_prefix("max_") {
            Some(param) => Bound::Max(param),
            None => Bound::Min(constraint.strip_prefix("min_")?),
        };
        Some(bound).filter(|bound| !bound.param().is_empty())
    }

    fn param(&self) -> &'a str {
        match self {
            Bound::Max(param) | Bound::Min(param) => param,
        }
    }

    /// Both bounds are inclusive
    fn admits(&self, value: f64, limit: f64) -> bool {
        match self {
            Bound::Max(_) => value <= limit,
            Bound::Min(_) => value >= limit,
        }
    }
}

/// Check whatever the draft recovered against the registry.
///
/// Runs even when the structural stage reported errors, so that one pass
/// reports both kinds.
pub(crate) fn check(draft: &Draft, rules: &RuleRegistry, errors: &mut Vec<ValidationError>) {
    let (Some(jurisdiction), Some(contract_type)) = (&draft.jurisdiction, &draft.contract_type)
    else {
        return;
    };

    if !rules.supports_jurisdiction(jurisdiction) {
        errors.push(ValidationError::UnsupportedJurisdiction {
            jurisdiction: jurisdiction.clone(),
        });
        return;
    }

    let Some(rule_set) = rules.lookup(jurisdiction, contract_type) else {
        errors.push(ValidationError::UnsupportedContractType {
            jurisdiction: jurisdiction.clone(),
            contract_type: contract_type.clone(),
        });
        return;
    };

    check_requirements(draft, rule_set, errors);
    check_constraints(&draft.parameters, rule_set, errors);
}

fn check_requirements(
    draft: &Draft,
    rule_set: &JurisdictionRuleSet,
    errors: &mut Vec<ValidationError>,
) {
    for id in rule_set.legal_requirements() {
        if !draft.legal_requirements.iter().any(|r| r == id) {
            errors.push(ValidationError::MissingLegalRequirement {
                id: id.clone(),
                jurisdiction: rule_set.jurisdiction().to_string(),
                contract_type: rule_set.contract_type().to_string(),
            });
        }
    }
}

fn check_constraints(
    parameters: &[ParameterBag],
    rule_set: &JurisdictionRuleSet,
    errors: &mut Vec<ValidationError>,
) {
    for (constraint, limit) in rule_set.constraints() {
        let Some(bound) = Bound::parse(constraint) else {
            continue;
        };

        for (index, bag) in parameters {
            let Some(value) = bag.get(bound.param()) else {
                continue;
            };
            let field = format!("contract.conditions[{}].parameters.{}", index, bound.param());
            match value.as_f64() {
                Some(number) if !bound.admits(number, *limit) => {
                    errors.push(ValidationError::ConstraintViolation {
                        id: constraint.clone(),
                        field,
                        value: number,
                        limit: *limit,
                    });
                }
                Some(_) => {}
                None => errors.push(ValidationError::schema(
                    field,
                    format!("expected a number, bounded by constraint '{}'", constraint),
                )),
            }
        }
    }
}
