//! Generated artifacts

use std::fmt;

use serde::Serialize;

use crate::definition::ContractDefinition;
use crate::rules::JurisdictionRuleSet;

/// The three artifacts produced for every definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactRole {
    /// Smart-contract source
    Primary,
    /// Deployment script
    Deploy,
    /// Test scaffold
    Test,
}

impl ArtifactRole {
    pub const ALL: [ArtifactRole; 3] = [ArtifactRole::Primary, ArtifactRole::Deploy, ArtifactRole::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactRole::Primary => "primary",
            ArtifactRole::Deploy => "deploy",
            ArtifactRole::Test => "test",
        }
    }

    /// Conventional file name for this artifact
    pub fn suggested_file_name(&self, definition: &ContractDefinition) -> String {
        let stem = format!("{}_{}", definition.contract_type(), definition.jurisdiction());
        match self {
            ArtifactRole::Primary => format!("{}.sol", stem),
            ArtifactRole::Deploy => format!("deploy_{}.js", stem),
            ArtifactRole::Test => format!("test_{}.js", stem),
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per artifact role
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bodies<T> {
    pub primary: T,
    pub deploy: T,
    pub test: T,
}

impl<T> Bodies<T> {
    pub fn get(&self, role: ArtifactRole) -> &T {
        match role {
            ArtifactRole::Primary => &self.primary,
            ArtifactRole::Deploy => &self.deploy,
            ArtifactRole::Test => &self.test,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactRole, &T)> {
        ArtifactRole::ALL.into_iter().map(move |role| (role, self.get(role)))
    }

    /// Map every body, stopping at the first error
    pub fn try_map<U, E>(
        self,
        mut f: impl FnMut(ArtifactRole, T) -> Result<U, E>,
    ) -> Result<Bodies<U>, E> {
        Ok(Bodies {
            primary: f(ArtifactRole::Primary, self.primary)?,
            deploy: f(ArtifactRole::Deploy, self.deploy)?,
            test: f(ArtifactRole::Test, self.test)?,
        })
    }
}

/// Which templates produced an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateProvenance {
    pub name: String,
    pub version: String,
    pub override_version: Option<String>,
}

impl fmt::Display for TemplateProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)?;
        if let Some(version) = &self.override_version {
            write!(f, "+override@{}", version)?;
        }
        Ok(())
    }
}

/// A complete, placeholder-free artifact triplet with its inputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedArtifact {
    bodies: Bodies<String>,
    definition: ContractDefinition,
    rule_set: JurisdictionRuleSet,
    template: TemplateProvenance,
}

impl GeneratedArtifact {
    pub(crate) fn new(
        bodies: Bodies<String>,
        definition: ContractDefinition,
        rule_set: JurisdictionRuleSet,
        template: TemplateProvenance,
    ) -> Self {
        Self {
            bodies,
            definition,
            rule_set,
            template,
        }
    }

    pub fn body(&self, role: ArtifactRole) -> &str {
        self.bodies.get(role)
    }

    /// Smart-contract source
    pub fn primary(&self) -> &str {
        &self.bodies.primary
    }

    pub fn deploy(&self) -> &str {
        &self.bodies.deploy
    }

    pub fn test(&self) -> &str {
        &self.bodies.test
    }

    pub fn bodies(&self) -> impl Iterator<Item = (ArtifactRole, &str)> {
        self.bodies.iter().map(|(role, body)| (role, body.as_str()))
    }

    pub fn definition(&self) -> &ContractDefinition {
        &self.definition
    }

    pub fn rule_set(&self) -> &JurisdictionRuleSet {
        &self.rule_set
    }

    pub fn template(&self) -> &TemplateProvenance {
        &self.template
    }

    pub fn suggested_file_name(&self, role: ArtifactRole) -> String {
        role.suggested_file_name(&self.definition)
    }

    /// Provenance record: definition, rule set and template versions
    pub fn provenance_json(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct Provenance<'a> {
            definition: &'a ContractDefinition,
            rule_set: &'a JurisdictionRuleSet,
            template: &'a TemplateProvenance,
            files: Bodies<String>,
        }

        let files = Bodies {
            primary: self.suggested_file_name(ArtifactRole::Primary),
            deploy: self.suggested_file_name(ArtifactRole::Deploy),
            test: self.suggested_file_name(ArtifactRole::Test),
        };
        serde_json::to_string_pretty(&Provenance {
            definition: &self.definition,
            rule_set: &self.rule_set,
            template: &self.template,
            files,
        })
    }
}
