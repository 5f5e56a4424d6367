//! Integration tests for definition validation against jurisdiction rules

use std::fs;

use contract_forge::definition::RoleClass;
use contract_forge::{CompileError, Compiler, CompilerConfig, ConfigError, ValidationError};
use pretty_assertions::assert_eq;

fn fields(errors: &[ValidationError]) -> Vec<&str> {
    errors.iter().filter_map(|e| e.field()).collect()
}

#[test]
fn test_every_schema_error_reported() {
    let errors = Compiler::builtin()
        .parse(
            r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - name: Buyer
      role: payer
    - name: Buyer
      role: payee
    - name: Agency
      role: landlord
  conditions:
    - trigger: delivery_confirmed
      action: teleport_funds
      time_limit: 0
  legal_requirements: [kyc_verification, gst_compliance]
"#,
        )
        .expect_err("Should reject");

    assert_eq!(
        fields(&errors),
        vec![
            "contract.parties[1].name",
            "contract.parties[2].role",
            "contract.conditions[0].action",
            "contract.conditions[0].time_limit",
        ]
    );
}

#[test]
fn test_schema_and_rule_errors_together() {
    let errors = Compiler::builtin()
        .parse(
            r#"
contract:
  type: escrow
  jurisdiction: eu
  parties:
    - { name: Buyer, role: payer }
    - { name: Seller, role: payee }
  conditions:
    - trigger: delivery_confirmed
      action: release_funds
      parameters:
        amount: 2500000
  metadata:
    version: 3
"#,
        )
        .expect_err("Should reject");

    let missing = errors
        .iter()
        .filter(|e| matches!(e, ValidationError::MissingLegalRequirement { .. }))
        .count();
    assert_eq!(missing, 3);
    assert!(errors.contains(&ValidationError::ConstraintViolation {
        id: "max_amount".to_string(),
        field: "contract.conditions[0].parameters.amount".to_string(),
        value: 2_500_000.0,
        limit: 1_000_000.0,
    }));
    assert!(fields(&errors).contains(&"contract.metadata.version"));
}

#[test]
fn test_rejected_verb_does_not_hide_constraint_violation() {
    let errors = Compiler::builtin()
        .parse(
            r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - { name: Buyer, role: payer }
    - { name: Seller, role: payee }
  conditions:
    - trigger: delivery_confirmed
      action: teleport_funds
      parameters: { amount: 5000000 }
  legal_requirements: [kyc_verification, gst_compliance]
"#,
        )
        .expect_err("Should reject");

    assert_eq!(
        errors,
        vec![
            ValidationError::schema(
                "contract.conditions[0].action",
                "unknown action verb 'teleport_funds'"
            ),
            ValidationError::ConstraintViolation {
                id: "max_amount".to_string(),
                field: "contract.conditions[0].parameters.amount".to_string(),
                value: 5_000_000.0,
                limit: 1_000_000.0,
            },
        ]
    );
}

#[test]
fn test_duplicate_party_name_reported_with_role_error() {
    let errors = Compiler::builtin()
        .parse(
            r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - { name: A, role: boss }
    - { name: A, role: payee }
  conditions:
    - { trigger: delivery_confirmed, action: release_funds }
  legal_requirements: [kyc_verification, gst_compliance]
"#,
        )
        .expect_err("Should reject");
    assert_eq!(
        fields(&errors),
        vec!["contract.parties[0].role", "contract.parties[1].name"]
    );
}

#[test]
fn test_constraint_bound_is_inclusive() {
    let source = |amount: u64| {
        format!(
            r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - {{ name: Buyer, role: payer }}
    - {{ name: Seller, role: payee }}
  conditions:
    - trigger: delivery_confirmed
      action: release_funds
      parameters: {{ amount: {amount} }}
  legal_requirements: [kyc_verification, gst_compliance]
"#
        )
    };
    let compiler = Compiler::builtin();
    assert!(compiler.parse(&source(1_000_000)).is_ok());
    assert!(compiler.parse(&source(1_000_001)).is_err());
}

#[test]
fn test_unsupported_contract_type() {
    let errors = Compiler::builtin()
        .parse(
            r#"
contract:
  type: lease
  jurisdiction: US
  parties:
    - { name: Tenant, role: payer }
    - { name: Landlord, role: payee }
  conditions:
    - { trigger: payment_received, action: notify_parties }
"#,
        )
        .expect_err("Should reject");
    assert_eq!(
        errors,
        vec![ValidationError::UnsupportedContractType {
            jurisdiction: "us".to_string(),
            contract_type: "lease".to_string(),
        }]
    );
}

#[test]
fn test_missing_contract_document() {
    let errors = Compiler::builtin()
        .parse("name: not a contract\n")
        .expect_err("Should reject");
    assert_eq!(fields(&errors), vec!["contract"]);
}

#[test]
fn test_configured_vocabulary() {
    let source = r#"
contract:
  type: escrow
  jurisdiction: us
  parties:
    - { name: Guarantor Bank, role: guarantor }
    - { name: Builder, role: payee }
  conditions:
    - { trigger: milestone_reached, action: release_funds }
  legal_requirements: [aml_kyc_requirements, state_specific_laws, ucc_compliance]
"#;

    let errors = Compiler::builtin().parse(source).expect_err("Should reject unknown verbs");
    assert!(fields(&errors).contains(&"contract.conditions[0].trigger"));

    let dir = tempfile::tempdir().expect("Should create temp dir");
    let path = dir.path().join("forge.toml");
    fs::write(
        &path,
        "[vocabulary]\ntriggers = [\"milestone_reached\"]\n\n[roles]\nguarantor = \"payer\"\n",
    )
    .expect("Should write config");

    let config = CompilerConfig::from_file(&path).expect("Should load config");
    assert_eq!(config.roles.get("guarantor"), Some(&RoleClass::PayerEquivalent));

    let compiler = Compiler::from_config(&config).expect("Should configure");
    let artifact = compiler.compile_source(source).expect("Should compile");
    assert!(artifact.primary().contains("function onMilestoneReached() external onlyParty {"));
    assert!(artifact.primary().contains("/// Payer: Guarantor Bank ("));
}

#[test]
fn test_configured_verbs_must_be_identifiers() {
    for config in [
        CompilerConfig::new().with_trigger("milestone-reached"),
        CompilerConfig::new().with_action("a{{b"),
        CompilerConfig::new().with_role("lead counsel", RoleClass::Neutral),
    ] {
        let err = match Compiler::from_config(&config) {
            Ok(_) => panic!("Should reject {:?}", config),
            Err(err) => err,
        };
        assert!(matches!(err, CompileError::Config(ConfigError::InvalidVocabulary(_))));
    }
}

#[test]
fn test_configured_role_matches_case_insensitively() {
    let config = CompilerConfig::new().with_role("Guarantor", RoleClass::PayerEquivalent);
    let compiler = Compiler::from_config(&config).expect("Should configure");
    let artifact = compiler
        .compile_source(
            r#"
contract:
  type: escrow
  jurisdiction: us
  parties:
    - { name: Guarantor Bank, role: guarantor }
    - { name: Builder, role: payee }
  conditions:
    - { trigger: inspection_passed, action: release_funds }
  legal_requirements: [aml_kyc_requirements, state_specific_laws, ucc_compliance]
"#,
        )
        .expect("Should compile");
    assert!(artifact.primary().contains("/// Payer: Guarantor Bank ("));
}

#[test]
fn test_definition_file_not_found() {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let err = Compiler::builtin()
        .compile_file(&dir.path().join("missing.yaml"))
        .expect_err("Should fail");
    assert!(err.is_recoverable());
    assert_eq!(
        err.validation_errors().map(fields),
        Some(vec!["<document>"])
    );
}

#[test]
fn test_definition_to_json() {
    let definition = Compiler::builtin()
        .parse(
            r#"
contract:
  type: Insurance
  jurisdiction: India
  parties:
    - { name: Asha, role: insured }
    - { name: Shield Co, role: insurer }
  conditions:
    - { trigger: claim_approved, action: pay_claim, time_limit: 30 }
  legal_requirements: [kyc_verification, irdai_registration]
"#,
        )
        .expect("Should parse");
    assert_eq!(definition.contract_type(), "insurance");
    assert_eq!(definition.payer().map(|p| p.name()), Some("Asha"));

    let json: serde_json::Value =
        serde_json::from_str(&definition.to_json().expect("Should serialize")).expect("Should be JSON");
    assert_eq!(json["jurisdiction"], "india");
    assert_eq!(json["parties"][1]["role"], "insurer");
    assert_eq!(json["metadata"]["version"], "1.0.0");
}
