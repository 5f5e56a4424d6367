//! Slot fills computed from the definition, the rule set and the
//! jurisdiction handler

use std::collections::BTreeSet;

use crate::definition::{Condition, ContractDefinition, PartyRef};
use crate::ids::{constant_case, pascal_case};
use crate::rules::JurisdictionRuleSet;
use crate::template::ResolvedTemplate;

use super::error::CompositionError;
use super::fill::FillMap;
use super::handlers::{HandlerContext, JurisdictionHandler, TestCase};

/// The value of a constraint as a `uint256` literal, if it is whole and
/// non-negative
pub(crate) fn whole_constant(value: f64) -> Option<u64> {
    // `u64::MAX as f64` rounds up to 2^64, which is already out of range
    if value >= 0.0 && value.fract() == 0.0 && value < u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}

/// Make user text safe for a single-line comment or string literal in any
/// target language: no line breaks, quotes, backslashes, comment closers or
/// slot markers
pub(crate) fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let c = match c {
            '"' => '\'',
            '\\' => '/',
            c if c.is_control() => ' ',
            c => c,
        };
        if (c == '{' && out.ends_with('{')) || (c == '/' && out.ends_with('*')) {
            out.push(' ');
        }
        out.push(c);
    }
    out.trim().to_string()
}

/// `["a", "b"]`
pub(crate) fn quoted_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = items
        .into_iter()
        .map(|item| format!("\"{}\"", sanitize(item)))
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Rule requirements in rule order, then extra requested ones in request
/// order
pub(crate) fn legal_requirement_list<'a>(
    definition: &'a ContractDefinition,
    rule_set: &'a JurisdictionRuleSet,
) -> Vec<&'a str> {
    let mut list: Vec<&str> = rule_set
        .legal_requirements()
        .iter()
        .map(String::as_str)
        .collect();
    for requested in definition.legal_requirements() {
        if !list.contains(&requested.as_str()) {
            list.push(requested);
        }
    }
    list
}

/// Build the full fill map for one compilation
pub(crate) fn build_fills(
    definition: &ContractDefinition,
    rule_set: &JurisdictionRuleSet,
    template: &ResolvedTemplate,
    handler: &dyn JurisdictionHandler,
) -> Result<FillMap, CompositionError> {
    let ctx = HandlerContext::new(definition, rule_set);
    let requirements = legal_requirement_list(definition, rule_set);
    let jurisdiction_name = sanitize(handler.display_name());
    let mut fills = FillMap::new();

    // Scalars
    fills.scalar("contract_name", contract_name(definition))?;
    fills.scalar("contract_type", definition.contract_type())?;
    fills.scalar("jurisdiction", definition.jurisdiction())?;
    fills.scalar("definition_version", sanitize(definition.metadata().version()))?;
    fills.scalar("description", description(definition, &jurisdiction_name))?;
    fills.scalar("jurisdiction_name", jurisdiction_name)?;
    fills.scalar("template_version", template.provenance().to_string())?;
    party_scalars(&mut fills, "payer", definition.payer())?;
    party_scalars(&mut fills, "payee", definition.payee())?;
    fills.scalar("legal_requirements", quoted_list(requirements.iter().copied()))?;
    fills.scalar("legal_requirement_count", requirements.len().to_string())?;
    fills.scalar(
        "mandatory_clauses",
        quoted_list(rule_set.mandatory_clauses().iter().map(String::as_str)),
    )?;

    // Blocks from the definition and rules
    fills.block("time_limit_constants", time_limit_constants(rule_set))?;
    fills.block("constraint_constants", constraint_constants(rule_set))?;
    fills.block("condition_handlers", condition_handlers(definition.conditions()))?;
    fills.block(
        "requirement_registration",
        requirements
            .iter()
            .map(|id| format!("legalRequirements.push(\"{}\");", id))
            .collect(),
    )?;
    fills.block("party_registration", party_registration(definition.parties()))?;

    let mut tests = base_test_cases(definition, &requirements);
    tests.extend(handler.test_cases(&ctx));
    fills.block("test_cases", render_test_cases(&tests))?;

    // Blocks from the jurisdiction handler
    let state = handler.initialize_state(&ctx);
    fills.block("jurisdiction_state", state.variables)?;
    fills.block("jurisdiction_initialization", state.initialization)?;
    fills.block("compliance_verification", handler.verify_compliance(&ctx))?;
    fills.block("dispute_handling", handler.dispute_handling(&ctx))?;
    fills.block("jurisdiction_functions", handler.functions(&ctx))?;

    // Template presets fill the remaining scalars
    for (slot, value) in template.presets() {
        fills.scalar(slot, value.clone())?;
    }

    Ok(fills)
}

fn contract_name(definition: &ContractDefinition) -> String {
    format!("{}Contract", pascal_case(definition.contract_type()))
}

fn description(definition: &ContractDefinition, jurisdiction_name: &str) -> String {
    let description = sanitize(definition.metadata().description());
    if description.is_empty() {
        format!(
            "{} contract governed by the law of {}",
            pascal_case(definition.contract_type()),
            jurisdiction_name
        )
    } else {
        description
    }
}

fn party_scalars(
    fills: &mut FillMap,
    prefix: &str,
    party: Option<&PartyRef>,
) -> Result<(), CompositionError> {
    let name = party.map(|p| sanitize(p.name())).unwrap_or_default();
    let address = party
        .map(|p| p.address_or_zero())
        .unwrap_or(crate::definition::ZERO_ADDRESS);
    fills.scalar(&format!("{}_name", prefix), name)?;
    fills.scalar(&format!("{}_address", prefix), sanitize(address))
}

fn time_limit_constants(rule_set: &JurisdictionRuleSet) -> Vec<String> {
    rule_set
        .time_limits()
        .iter()
        .map(|(name, days)| format!("uint256 public constant {} = {};", constant_case(name), days))
        .collect()
}

fn constraint_constants(rule_set: &JurisdictionRuleSet) -> Vec<String> {
    rule_set
        .constraints()
        .iter()
        .map(|(name, value)| match whole_constant(*value) {
            Some(whole) => format!("uint256 public constant {} = {};", constant_case(name), whole),
            None => format!("// {} = {} (not representable as uint256)", name, value),
        })
        .collect()
}

/// Solidity function names for conditions, unique across the contract.
///
/// Names shared by several conditions get the condition index as a suffix;
/// a suffixed name that lands on another condition's name gets underscores
/// until it is free.
fn handler_names(conditions: &[Condition]) -> Vec<String> {
    let bases: Vec<String> = conditions
        .iter()
        .map(|c| format!("on{}", pascal_case(c.trigger())))
        .collect();

    let mut used = BTreeSet::new();
    bases
        .iter()
        .enumerate()
        .map(|(i, base)| {
            let shared = bases.iter().filter(|b| *b == base).count() > 1;
            let mut name = if shared {
                format!("{}{}", base, i)
            } else {
                base.clone()
            };
            while (name != *base && bases.contains(&name)) || used.contains(&name) {
                name.push('_');
            }
            used.insert(name.clone());
            name
        })
        .collect()
}

fn condition_handlers(conditions: &[Condition]) -> Vec<String> {
    let mut out = Vec::new();
    for ((i, condition), name) in conditions.iter().enumerate().zip(handler_names(conditions)) {
        out.push(format!(
            "/// {} -> {}",
            condition.trigger(),
            condition.action()
        ));
        out.push(format!("function {}() external onlyParty {{", name));
        out.push(format!(
            "    require(!conditionExecuted[{}], \"Condition already executed\");",
            i
        ));
        if let Some(days) = condition.time_limit() {
            out.push(format!(
                "    require(block.timestamp <= createdAt + {} days, \"Condition deadline passed\");",
                days
            ));
        }
        for (param, value) in condition.parameters() {
            out.push(format!(
                "    // {} = {}",
                sanitize(param),
                sanitize(&value.to_string())
            ));
        }
        out.push(format!("    conditionExecuted[{}] = true;", i));
        out.push(format!("    _performAction(\"{}\");", condition.action()));
        out.push(format!(
            "    emit ConditionExecuted({}, \"{}\", \"{}\");",
            i,
            condition.trigger(),
            condition.action()
        ));
        out.push("}".to_string());
        out.push(String::new());
    }
    out
}

fn party_registration(parties: &[PartyRef]) -> Vec<String> {
    parties
        .iter()
        .map(|party| {
            format!(
                "{{ name: \"{}\", role: \"{}\", address: \"{}\", verificationRequired: {} }},",
                sanitize(party.name()),
                sanitize(party.role().name()),
                sanitize(party.address_or_zero()),
                party.verification_required()
            )
        })
        .collect()
}

fn base_test_cases(definition: &ContractDefinition, requirements: &[&str]) -> Vec<TestCase> {
    let mut tests = vec![
        TestCase::new(
            "Contract Creation",
            vec![
                "expect(await contract.payer()).to.equal(payer.address);".to_string(),
                "expect(await contract.payee()).to.equal(payee.address);".to_string(),
                format!(
                    "expect(await contract.JURISDICTION()).to.equal(\"{}\");",
                    definition.jurisdiction()
                ),
            ],
        ),
        TestCase::new(
            "Legal Compliance",
            vec![
                "const requirements = await contract.getLegalRequirements();".to_string(),
                format!(
                    "expect(requirements).to.deep.equal({});",
                    quoted_list(requirements.iter().copied())
                ),
                "expect(await contract.verifyLegalCompliance()).to.equal(false);".to_string(),
            ],
        ),
    ];

    let names = handler_names(definition.conditions());
    for ((i, condition), name) in definition.conditions().iter().enumerate().zip(names) {
        tests.push(TestCase::new(
            format!(
                "Condition {}: {} triggers {}",
                i + 1,
                condition.trigger(),
                condition.action()
            ),
            vec![format!(
                "await expect(contract.connect(payer).{}()).to.emit(contract, \"ConditionExecuted\");",
                name
            )],
        ));
    }
    tests
}

fn render_test_cases(tests: &[TestCase]) -> Vec<String> {
    let mut out = Vec::new();
    for (i, test) in tests.iter().enumerate() {
        if i > 0 {
            out.push(String::new());
        }
        out.push(format!("it(\"{}\", async function () {{", sanitize(&test.name)));
        out.extend(test.body.iter().map(|line| format!("  {}", line)));
        out.push("});".to_string());
    }
    out
}
