//! Built-in jurisdiction handlers: India, European Union, United States
//!
//! Every jurisdiction feature is keyed on a legal requirement id, so state,
//! checks, functions and tests appear only when the requirement applies.

use super::handlers::{HandlerContext, JurisdictionHandler, StateSlots, TestCase};

fn lines(src: &[&str]) -> Vec<String> {
    src.iter().map(|s| s.to_string()).collect()
}

/// `if (<condition>) { return false; }` as three lines
fn fail_if(condition: &str) -> Vec<String> {
    vec![
        format!("if ({}) {{", condition),
        "    return false;".to_string(),
        "}".to_string(),
    ]
}

/// Transaction ceiling check, when the rule set carries `max_amount`
fn ceiling_check(ctx: &HandlerContext<'_>, authority: &str) -> Vec<String> {
    if !ctx.has_constant("max_amount") {
        return Vec::new();
    }
    let mut out = vec![format!("// {} transaction ceiling", authority)];
    out.extend(fail_if("amount > MAX_AMOUNT"));
    out
}

/// Deadline assignment and escalation event shared by all handlers
fn escalation(ctx: &HandlerContext<'_>, note: &str, deadline_limits: &[&str]) -> Vec<String> {
    let mut out = vec![format!("// {}", note)];
    match deadline_limits.iter().find(|name| ctx.has_constant(name)) {
        Some(name) => {
            out.push(format!(
                "disputeDeadline = block.timestamp + {} * 1 days;",
                crate::ids::constant_case(name)
            ));
        }
        None => out.push("disputeDeadline = block.timestamp;".to_string()),
    }
    out.push("emit DisputeEscalated(DISPUTE_FORUM, disputeDeadline);".to_string());
    out
}

/// A blank separator line followed by a function
fn function(body: &[&str]) -> Vec<String> {
    let mut out = vec![String::new()];
    out.extend(lines(body));
    out
}

/// India: KYC (PAN/Aadhaar), GST and RBI rules
#[derive(Debug, Clone, Copy, Default)]
pub struct IndiaHandler;

impl JurisdictionHandler for IndiaHandler {
    fn id(&self) -> &str {
        "india"
    }

    fn display_name(&self) -> &str {
        "India"
    }

    fn initialize_state(&self, ctx: &HandlerContext<'_>) -> StateSlots {
        let mut variables = lines(&["address public nodalOfficer;"]);
        if ctx.requires("kyc_verification") {
            variables.extend(lines(&[
                "mapping(address => string) public panNumbers;",
                "mapping(address => string) public aadhaarNumbers;",
                "mapping(address => bool) public kycVerified;",
            ]));
        }
        if ctx.requires("gst_compliance") {
            variables.extend(lines(&[
                "mapping(address => string) public gstNumbers;",
                "mapping(address => bool) public gstCompliant;",
            ]));
        }
        if ctx.requires("stamp_duty_payment") {
            variables.push("bool public stampDutyPaid;".to_string());
        }
        StateSlots {
            variables,
            initialization: lines(&["nodalOfficer = msg.sender;"]),
        }
    }

    fn verify_compliance(&self, ctx: &HandlerContext<'_>) -> Vec<String> {
        let mut out = Vec::new();
        if ctx.requires("kyc_verification") {
            out.push("// KYC under the PML Act and RBI master directions".to_string());
            out.extend(fail_if("!kycVerified[payer] || !kycVerified[payee]"));
        }
        if ctx.requires("gst_compliance") {
            out.extend(fail_if("!gstCompliant[payee]"));
        }
        if ctx.requires("stamp_duty_payment") {
            out.extend(fail_if("!stampDutyPaid"));
        }
        out.extend(ceiling_check(ctx, "RBI"));
        out
    }

    fn dispute_handling(&self, ctx: &HandlerContext<'_>) -> Vec<String> {
        escalation(
            ctx,
            "Conciliation, then arbitration under the Arbitration and Conciliation Act, 1996",
            &["dispute_resolution_days"],
        )
    }

    fn functions(&self, ctx: &HandlerContext<'_>) -> Vec<String> {
        let mut out = Vec::new();
        if ctx.requires("kyc_verification") {
            out.extend(function(&[
                "function verifyKYC(address party, string calldata pan, string calldata aadhaar) external onlyOwner {",
                "    panNumbers[party] = pan;",
                "    aadhaarNumbers[party] = aadhaar;",
                "    kycVerified[party] = true;",
                "}",
            ]));
        }
        if ctx.requires("gst_compliance") {
            out.extend(function(&[
                "function verifyGSTCompliance(address party, string calldata gstNumber) external onlyOwner {",
                "    gstNumbers[party] = gstNumber;",
                "    gstCompliant[party] = true;",
                "}",
            ]));
        }
        if ctx.requires("stamp_duty_payment") {
            out.extend(function(&[
                "function recordStampDuty() external onlyOwner {",
                "    stampDutyPaid = true;",
                "}",
            ]));
        }
        out
    }

    fn test_cases(&self, ctx: &HandlerContext<'_>) -> Vec<TestCase> {
        let mut out = Vec::new();
        if ctx.requires("kyc_verification") {
            out.push(TestCase::new(
                "KYC Verification",
                lines(&[
                    "await contract.verifyKYC(payer.address, \"ABCDE1234F\", \"123456789012\");",
                    "expect(await contract.kycVerified(payer.address)).to.equal(true);",
                ]),
            ));
        }
        if ctx.requires("gst_compliance") {
            out.push(TestCase::new(
                "GST Compliance",
                lines(&[
                    "await contract.verifyGSTCompliance(payee.address, \"22AAAAA0000A1Z5\");",
                    "expect(await contract.gstCompliant(payee.address)).to.equal(true);",
                ]),
            ));
        }
        out
    }
}

/// European Union: GDPR, PSD2, AMLD and MiCA rules
#[derive(Debug, Clone, Copy, Default)]
pub struct EuHandler;

impl JurisdictionHandler for EuHandler {
    fn id(&self) -> &str {
        "eu"
    }

    fn display_name(&self) -> &str {
        "European Union"
    }

    fn initialize_state(&self, ctx: &HandlerContext<'_>) -> StateSlots {
        let mut variables = lines(&["address public dataProtectionOfficer;"]);
        if ctx.requires("gdpr_compliance") {
            variables.push("mapping(address => bool) public gdprCompliant;".to_string());
        }
        if ctx.requires("psd2_compliance") {
            variables.push("mapping(address => bool) public psd2Compliant;".to_string());
        }
        if ctx.requires("aml_kyc_requirements") {
            variables.push("mapping(address => bool) public amlCleared;".to_string());
        }
        if ctx.requires("mica_compliance") {
            variables.push("string public micaWhitePaperUri;".to_string());
        }
        StateSlots {
            variables,
            initialization: lines(&["dataProtectionOfficer = msg.sender;"]),
        }
    }

    fn verify_compliance(&self, ctx: &HandlerContext<'_>) -> Vec<String> {
        let mut out = Vec::new();
        if ctx.requires("gdpr_compliance") {
            out.push("// Lawful processing basis recorded under GDPR Art. 6".to_string());
            out.extend(fail_if("!gdprCompliant[payer] || !gdprCompliant[payee]"));
        }
        if ctx.requires("psd2_compliance") {
            out.extend(fail_if("!psd2Compliant[payer]"));
        }
        if ctx.requires("aml_kyc_requirements") {
            out.extend(fail_if("!amlCleared[payer] || !amlCleared[payee]"));
        }
        if ctx.requires("mica_compliance") {
            out.extend(fail_if("bytes(micaWhitePaperUri).length == 0"));
        }
        out.extend(ceiling_check(ctx, "ESMA"));
        out
    }

    fn dispute_handling(&self, ctx: &HandlerContext<'_>) -> Vec<String> {
        escalation(
            ctx,
            "Referral to an ADR entity under Directive 2013/11/EU",
            &["dispute_resolution_days"],
        )
    }

    fn functions(&self, ctx: &HandlerContext<'_>) -> Vec<String> {
        let mut out = function(&[
            "function setDataProtectionOfficer(address officer) external onlyOwner {",
            "    dataProtectionOfficer = officer;",
            "}",
        ]);
        if ctx.requires("gdpr_compliance") {
            out.extend(function(&[
                "function verifyGDPRCompliance(address party) external onlyOwner {",
                "    gdprCompliant[party] = true;",
                "}",
            ]));
        }
        if ctx.requires("psd2_compliance") {
            out.extend(function(&[
                "function verifyPSD2Compliance(address party) external onlyOwner {",
                "    psd2Compliant[party] = true;",
                "}",
            ]));
        }
        if ctx.requires("aml_kyc_requirements") {
            out.extend(function(&[
                "function clearAML(address party) external onlyOwner {",
                "    amlCleared[party] = true;",
                "}",
            ]));
        }
        if ctx.requires("mica_compliance") {
            out.extend(function(&[
                "function publishWhitePaper(string calldata uri) external onlyOwner {",
                "    micaWhitePaperUri = uri;",
                "}",
            ]));
        }
        out
    }

    fn test_cases(&self, ctx: &HandlerContext<'_>) -> Vec<TestCase> {
        let mut out = Vec::new();
        if ctx.requires("gdpr_compliance") {
            out.push(TestCase::new(
                "GDPR Compliance",
                lines(&[
                    "await contract.verifyGDPRCompliance(payer.address);",
                    "expect(await contract.gdprCompliant(payer.address)).to.equal(true);",
                ]),
            ));
        }
        if ctx.requires("psd2_compliance") {
            out.push(TestCase::new(
                "PSD2 Compliance",
                lines(&[
                    "await contract.verifyPSD2Compliance(payer.address);",
                    "expect(await contract.psd2Compliant(payer.address)).to.equal(true);",
                ]),
            ));
        }
        out
    }
}

/// United States: SEC/FINRA registration and state law
#[derive(Debug, Clone, Copy, Default)]
pub struct UsHandler;

impl JurisdictionHandler for UsHandler {
    fn id(&self) -> &str {
        "us"
    }

    fn display_name(&self) -> &str {
        "United States"
    }

    fn initialize_state(&self, ctx: &HandlerContext<'_>) -> StateSlots {
        let mut variables = lines(&["address public complianceOfficer;"]);
        if ctx.requires("sec_registration") {
            variables.extend(lines(&[
                "mapping(address => bool) public secRegistered;",
                "mapping(address => bool) public finraRegistered;",
            ]));
        }
        if ctx.requires("state_specific_laws") {
            variables.push("mapping(address => string) public stateOfResidence;".to_string());
        }
        if ctx.requires("state_insurance_license") {
            variables.push("mapping(address => bool) public stateLicensed;".to_string());
        }
        if ctx.requires("aml_kyc_requirements") {
            variables.push("mapping(address => bool) public amlCleared;".to_string());
        }
        StateSlots {
            variables,
            initialization: lines(&["complianceOfficer = msg.sender;"]),
        }
    }

    fn verify_compliance(&self, ctx: &HandlerContext<'_>) -> Vec<String> {
        let mut out = Vec::new();
        if ctx.requires("sec_registration") {
            out.push("// Registration with the SEC and FINRA".to_string());
            out.extend(fail_if("!secRegistered[payee] || !finraRegistered[payee]"));
        }
        if ctx.requires("state_specific_laws") {
            out.extend(fail_if("bytes(stateOfResidence[payer]).length == 0"));
        }
        if ctx.requires("state_insurance_license") {
            out.extend(fail_if("!stateLicensed[payee]"));
        }
        if ctx.requires("aml_kyc_requirements") {
            out.extend(fail_if("!amlCleared[payer] || !amlCleared[payee]"));
        }
        out.extend(ceiling_check(ctx, "FinCEN"));
        out
    }

    fn dispute_handling(&self, ctx: &HandlerContext<'_>) -> Vec<String> {
        escalation(
            ctx,
            "Escalation under the governing state's law; SEC matters follow federal procedure",
            &["sec_filing_days", "dispute_resolution_days"],
        )
    }

    fn functions(&self, ctx: &HandlerContext<'_>) -> Vec<String> {
        let mut out = Vec::new();
        if ctx.requires("sec_registration") {
            out.extend(function(&[
                "function verifySECRegistration(address party) external onlyOwner {",
                "    secRegistered[party] = true;",
                "}",
            ]));
            out.extend(function(&[
                "function verifyFINRARegistration(address party) external onlyOwner {",
                "    finraRegistered[party] = true;",
                "}",
            ]));
        }
        if ctx.requires("state_specific_laws") {
            out.extend(function(&[
                "function setStateOfResidence(address party, string calldata usState) external onlyOwner {",
                "    stateOfResidence[party] = usState;",
                "}",
            ]));
        }
        if ctx.requires("state_insurance_license") {
            out.extend(function(&[
                "function verifyStateLicense(address party) external onlyOwner {",
                "    stateLicensed[party] = true;",
                "}",
            ]));
        }
        if ctx.requires("aml_kyc_requirements") {
            out.extend(function(&[
                "function clearAML(address party) external onlyOwner {",
                "    amlCleared[party] = true;",
                "}",
            ]));
        }
        out
    }

    fn test_cases(&self, ctx: &HandlerContext<'_>) -> Vec<TestCase> {
        let mut out = Vec::new();
        if ctx.requires("sec_registration") {
            out.push(TestCase::new(
                "SEC Registration",
                lines(&[
                    "await contract.verifySECRegistration(payee.address);",
                    "expect(await contract.secRegistered(payee.address)).to.equal(true);",
                ]),
            ));
        }
        if ctx.requires("state_specific_laws") {
            out.push(TestCase::new(
                "State of Residence",
                lines(&[
                    "await contract.setStateOfResidence(payer.address, \"NY\");",
                    "expect(await contract.stateOfResidence(payer.address)).to.equal(\"NY\");",
                ]),
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{parse, Vocabulary};
    use crate::rules::RuleRegistry;

    const RULES: &str = r#"
india:
  escrow:
    legal_requirements: [kyc_verification]
    time_limits:
      dispute_resolution_days: 30
    constraints:
      max_amount: 1000000
"#;

    const DEFINITION: &str = r#"
contract:
  type: escrow
  jurisdiction: india
  parties:
    - {name: Buyer, role: payer}
    - {name: Seller, role: payee}
  conditions:
    - {trigger: delivery_confirmed, action: release_funds}
  legal_requirements: [kyc_verification]
"#;

    fn with_context<R>(f: impl FnOnce(&HandlerContext<'_>) -> R) -> R {
        let rules = RuleRegistry::load(RULES).expect("Should load rules");
        let definition =
            parse(DEFINITION, &rules, &Vocabulary::builtin()).expect("Should parse definition");
        let rule_set = rules.lookup("india", "escrow").expect("Should have rules");
        f(&HandlerContext::new(&definition, rule_set))
    }

    #[test]
    fn test_india_features_follow_requirements() {
        with_context(|ctx| {
            let state = IndiaHandler.initialize_state(ctx);
            assert!(state.variables.iter().any(|v| v.contains("kycVerified")));
            assert!(!state.variables.iter().any(|v| v.contains("gstCompliant")));

            let checks = IndiaHandler.verify_compliance(ctx).join("\n");
            assert!(checks.contains("!kycVerified[payer]"));
            assert!(checks.contains("amount > MAX_AMOUNT"));

            let names: Vec<String> = IndiaHandler
                .test_cases(ctx)
                .into_iter()
                .map(|t| t.name)
                .collect();
            assert_eq!(names, vec!["KYC Verification".to_string()]);
        });
    }

    #[test]
    fn test_dispute_deadline_uses_time_limit() {
        with_context(|ctx| {
            let dispute = IndiaHandler.dispute_handling(ctx);
            assert_eq!(
                dispute[1],
                "disputeDeadline = block.timestamp + DISPUTE_RESOLUTION_DAYS * 1 days;"
            );
            assert_eq!(
                dispute[2],
                "emit DisputeEscalated(DISPUTE_FORUM, disputeDeadline);"
            );
            // No sec_filing_days in these rules
            let us = UsHandler.dispute_handling(ctx);
            assert_eq!(
                us[1],
                "disputeDeadline = block.timestamp + DISPUTE_RESOLUTION_DAYS * 1 days;"
            );
        });
    }

    #[test]
    fn test_handler_output_has_no_markers() {
        with_context(|ctx| {
            let handlers: [&dyn JurisdictionHandler; 3] = [&IndiaHandler, &EuHandler, &UsHandler];
            for handler in handlers {
                let mut all = handler.functions(ctx);
                all.extend(handler.verify_compliance(ctx));
                all.extend(handler.dispute_handling(ctx));
                assert!(all.iter().all(|line| !line.contains("{{")));
            }
        });
    }
}
