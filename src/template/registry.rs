//! Template library for storing base templates and jurisdiction overrides

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::artifact::{ArtifactRole, Bodies};
use crate::error::{format_syntax_errors, TemplateSyntaxError};
use crate::ids::{is_identifier, normalize_id};

use super::text::{SlotKind, TemplateText};

/// Slots every body must reference so the three artifacts agree on what
/// they were generated for
pub const PROVENANCE_SLOTS: &[&str] = &["jurisdiction", "contract_type", "legal_requirements"];

const BUILTIN_BASES: &[(&str, &str)] = &[
    ("escrow.toml", include_str!("../../assets/templates/base/escrow.toml")),
    ("insurance.toml", include_str!("../../assets/templates/base/insurance.toml")),
    ("settlement.toml", include_str!("../../assets/templates/base/settlement.toml")),
];

const BUILTIN_OVERRIDES: &[(&str, &str)] = &[
    (
        "india_escrow.toml",
        include_str!("../../assets/templates/overrides/india_escrow.toml"),
    ),
    (
        "eu_insurance.toml",
        include_str!("../../assets/templates/overrides/eu_insurance.toml"),
    ),
    (
        "us_settlement.toml",
        include_str!("../../assets/templates/overrides/us_settlement.toml"),
    ),
];

/// Errors that can occur during template operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    /// No base template for the contract type
    #[error("template not found for contract type: {contract_type}")]
    NotFound { contract_type: String },

    /// Duplicate base template definition
    #[error("duplicate template definition: {name}")]
    Duplicate { name: String },

    /// Two overrides for the same (jurisdiction, contract type)
    #[error("duplicate override for {contract_type} in {jurisdiction}")]
    DuplicateOverride {
        contract_type: String,
        jurisdiction: String,
    },

    /// Error reading a template file or directory
    #[error("error reading template file {path}: {message}")]
    FileReadError { path: PathBuf, message: String },

    /// The template document is not valid TOML for its schema
    #[error("invalid template document {origin}: {message}")]
    Toml { origin: String, message: String },

    /// Template name or slot name is not a lower-case identifier
    #[error("invalid name '{name}' in template {template}")]
    InvalidName { template: String, name: String },

    /// A body failed to parse
    #[error("syntax error in template {template}, {body} body: {}", format_syntax_errors(errors))]
    Syntax {
        template: String,
        body: String,
        errors: Vec<TemplateSyntaxError>,
    },

    /// A body, preset or override refers to a slot the base does not declare
    #[error("template {template} references undeclared slot '{slot}'")]
    UndeclaredSlot { template: String, slot: String },

    /// A declared slot that no body references
    #[error("template {template} declares slot '{slot}' but never uses it")]
    UnusedSlot { template: String, slot: String },

    /// A slot used as a scalar where a block is declared, or the reverse
    #[error("template {template} uses {declared} slot '{slot}' as a {used}")]
    KindMismatch {
        template: String,
        slot: String,
        declared: SlotKind,
        used: SlotKind,
    },

    /// A preset value given for a block slot
    #[error("template {template} presets block slot '{slot}'")]
    PresetForBlock { template: String, slot: String },

    /// A body that does not reference a provenance slot
    #[error("{body} body of template {template} does not reference '{slot}'")]
    MissingProvenanceSlot {
        template: String,
        body: String,
        slot: String,
    },

    /// Override block content may hold text and scalar slots only
    #[error("override {template} nests a block inside block '{slot}'")]
    BlockInOverride { template: String, slot: String },
}

impl TemplateError {
    fn undeclared(template: &str, slot: &str) -> Self {
        Self::UndeclaredSlot {
            template: template.to_string(),
            slot: slot.to_string(),
        }
    }

    fn read_error(path: &Path, err: std::io::Error) -> Self {
        Self::FileReadError {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTemplate {
    template: RawHeader,
    slots: BTreeMap<String, SlotKind>,
    #[serde(default)]
    scalars: BTreeMap<String, String>,
    bodies: RawBodies,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHeader {
    name: String,
    version: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBodies {
    primary: String,
    deploy: String,
    test: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOverride {
    #[serde(rename = "override")]
    header: RawOverrideHeader,
    #[serde(default)]
    scalars: BTreeMap<String, String>,
    #[serde(default)]
    blocks: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOverrideHeader {
    contract_type: String,
    jurisdiction: String,
    version: String,
}

/// A base template for one contract type
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    version: String,
    slots: BTreeMap<String, SlotKind>,
    presets: BTreeMap<String, String>,
    bodies: Bodies<TemplateText>,
}

impl Template {
    /// Parse and check a base template document. `origin` names the source
    /// in error messages.
    pub fn from_str(source: &str, origin: &str) -> Result<Self, TemplateError> {
        let raw: RawTemplate = toml::from_str(source).map_err(|e| TemplateError::Toml {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;

        let name = normalize_id(&raw.template.name);
        if !is_identifier(&name) {
            return Err(TemplateError::InvalidName {
                template: origin.to_string(),
                name: raw.template.name,
            });
        }
        if let Some(bad) = raw.slots.keys().find(|slot| !is_identifier(slot)) {
            return Err(TemplateError::InvalidName {
                template: name,
                name: bad.clone(),
            });
        }

        let sources = Bodies {
            primary: raw.bodies.primary,
            deploy: raw.bodies.deploy,
            test: raw.bodies.test,
        };
        let bodies = sources.try_map(|role, body| {
            TemplateText::parse(body.as_str()).map_err(|errors| TemplateError::Syntax {
                template: name.clone(),
                body: role.to_string(),
                errors,
            })
        })?;

        let template = Self {
            name,
            version: raw.template.version,
            slots: raw.slots,
            presets: raw.scalars,
            bodies,
        };
        template.check()?;
        debug!(template = %template.name, version = %template.version, "loaded base template");
        Ok(template)
    }

    fn check(&self) -> Result<(), TemplateError> {
        let mut used = std::collections::BTreeSet::new();

        for (role, body) in self.bodies.iter() {
            let refs = body.references();
            for (slot, kind) in &refs {
                self.check_use(&slot.node, *kind)?;
                used.insert(slot.node.as_str());
            }
            for provenance in PROVENANCE_SLOTS {
                if !refs.iter().any(|(slot, _)| slot.node == *provenance) {
                    return Err(TemplateError::MissingProvenanceSlot {
                        template: self.name.clone(),
                        body: role.to_string(),
                        slot: provenance.to_string(),
                    });
                }
            }
        }

        if let Some(unused) = self.slots.keys().find(|slot| !used.contains(slot.as_str())) {
            return Err(TemplateError::UnusedSlot {
                template: self.name.clone(),
                slot: unused.clone(),
            });
        }

        for slot in self.presets.keys() {
            match self.slots.get(slot) {
                None => return Err(TemplateError::undeclared(&self.name, slot)),
                Some(SlotKind::Block) => {
                    return Err(TemplateError::PresetForBlock {
                        template: self.name.clone(),
                        slot: slot.clone(),
                    })
                }
                Some(SlotKind::Scalar) => {}
            }
        }
        Ok(())
    }

    /// Check that `slot` is declared with kind `used`
    fn check_use(&self, slot: &str, used: SlotKind) -> Result<(), TemplateError> {
        match self.slots.get(slot) {
            None => Err(TemplateError::undeclared(&self.name, slot)),
            Some(declared) if *declared != used => Err(TemplateError::KindMismatch {
                template: self.name.clone(),
                slot: slot.to_string(),
                declared: *declared,
                used,
            }),
            Some(_) => Ok(()),
        }
    }

    /// Contract-type id this template generates
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The closed set of declared slots
    pub fn slots(&self) -> &BTreeMap<String, SlotKind> {
        &self.slots
    }

    pub fn presets(&self) -> &BTreeMap<String, String> {
        &self.presets
    }

    pub fn body(&self, role: ArtifactRole) -> &TemplateText {
        self.bodies.get(role)
    }
}

/// A jurisdiction-specific fragment layered over a base template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateOverride {
    contract_type: String,
    jurisdiction: String,
    version: String,
    scalars: BTreeMap<String, String>,
    blocks: BTreeMap<String, TemplateText>,
}

impl TemplateOverride {
    pub fn from_str(source: &str, origin: &str) -> Result<Self, TemplateError> {
        let raw: RawOverride = toml::from_str(source).map_err(|e| TemplateError::Toml {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;

        let contract_type = normalize_id(&raw.header.contract_type);
        let jurisdiction = normalize_id(&raw.header.jurisdiction);
        for id in [&contract_type, &jurisdiction] {
            if !is_identifier(id) {
                return Err(TemplateError::InvalidName {
                    template: origin.to_string(),
                    name: id.clone(),
                });
            }
        }
        let label = format!("{}/{}", jurisdiction, contract_type);

        let mut blocks = BTreeMap::new();
        for (slot, mut content) in raw.blocks {
            if !content.ends_with('\n') {
                content.push('\n');
            }
            let text = TemplateText::parse(content).map_err(|errors| TemplateError::Syntax {
                template: label.clone(),
                body: slot.clone(),
                errors,
            })?;
            if !text.is_inline_only() {
                return Err(TemplateError::BlockInOverride {
                    template: label,
                    slot,
                });
            }
            blocks.insert(slot, text);
        }

        debug!(
            contract_type = %contract_type,
            jurisdiction = %jurisdiction,
            "loaded template override"
        );
        Ok(Self {
            contract_type,
            jurisdiction,
            version: raw.header.version,
            scalars: raw.scalars,
            blocks,
        })
    }

    pub fn contract_type(&self) -> &str {
        &self.contract_type
    }

    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn scalars(&self) -> &BTreeMap<String, String> {
        &self.scalars
    }

    /// Content appended to block slots, keyed by slot name
    pub fn blocks(&self) -> &BTreeMap<String, TemplateText> {
        &self.blocks
    }

    fn label(&self) -> String {
        format!("{}/{}", self.jurisdiction, self.contract_type)
    }

    /// Check this override against the base it layers over
    pub(crate) fn check_against(&self, base: &Template) -> Result<(), TemplateError> {
        let label = self.label();
        let expect_kind = |slot: &str, used: SlotKind| match base.slots().get(slot) {
            None => Err(TemplateError::undeclared(&label, slot)),
            Some(declared) if *declared != used => Err(TemplateError::KindMismatch {
                template: label.clone(),
                slot: slot.to_string(),
                declared: *declared,
                used,
            }),
            Some(_) => Ok(()),
        };

        for slot in self.scalars.keys() {
            expect_kind(slot, SlotKind::Scalar)?;
        }
        for (slot, text) in &self.blocks {
            expect_kind(slot, SlotKind::Block)?;
            for (inner, kind) in text.references() {
                expect_kind(&inner.node, kind)?;
            }
        }
        Ok(())
    }
}

/// Registry of base templates and overrides
#[derive(Debug, Default)]
pub struct TemplateLibrary {
    bases: BTreeMap<String, Arc<Template>>,
    /// Keyed by (contract type, jurisdiction)
    overrides: BTreeMap<(String, String), Arc<TemplateOverride>>,
}

impl TemplateLibrary {
    /// Create a new empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// The templates embedded in the crate
    pub fn builtin() -> Self {
        let mut library = Self::new();
        for (origin, source) in BUILTIN_BASES {
            let template = Template::from_str(source, origin).expect("built-in template is valid");
            library
                .register(template)
                .expect("built-in templates are unique");
        }
        for (origin, source) in BUILTIN_OVERRIDES {
            let overlay =
                TemplateOverride::from_str(source, origin).expect("built-in override is valid");
            library
                .register_override(overlay)
                .expect("built-in overrides are unique");
        }
        library
    }

    /// Load `base/*.toml` and, if present, `overrides/*.toml` under `dir`
    pub fn from_dir(dir: &Path) -> Result<Self, TemplateError> {
        let mut library = Self::new();

        for path in toml_files(&dir.join("base"))? {
            let source =
                std::fs::read_to_string(&path).map_err(|e| TemplateError::read_error(&path, e))?;
            library.register(Template::from_str(&source, &path.display().to_string())?)?;
        }

        let overrides = dir.join("overrides");
        if overrides.is_dir() {
            for path in toml_files(&overrides)? {
                let source = std::fs::read_to_string(&path)
                    .map_err(|e| TemplateError::read_error(&path, e))?;
                library.register_override(TemplateOverride::from_str(
                    &source,
                    &path.display().to_string(),
                )?)?;
            }
        }

        debug!(
            dir = %dir.display(),
            bases = library.bases.len(),
            overrides = library.overrides.len(),
            "loaded template directory"
        );
        Ok(library)
    }

    /// Register a base template; overrides registered earlier for its
    /// contract type are checked against it
    pub fn register(&mut self, template: Template) -> Result<(), TemplateError> {
        let name = template.name().to_string();
        if self.bases.contains_key(&name) {
            return Err(TemplateError::Duplicate { name });
        }
        for ((contract_type, _), overlay) in &self.overrides {
            if *contract_type == name {
                overlay.check_against(&template)?;
            }
        }
        self.bases.insert(name, Arc::new(template));
        Ok(())
    }

    /// Register an override. It is checked against its base now if the
    /// base is known, otherwise when the base is registered.
    pub fn register_override(&mut self, overlay: TemplateOverride) -> Result<(), TemplateError> {
        let key = (
            overlay.contract_type().to_string(),
            overlay.jurisdiction().to_string(),
        );
        if self.overrides.contains_key(&key) {
            return Err(TemplateError::DuplicateOverride {
                contract_type: key.0,
                jurisdiction: key.1,
            });
        }
        if let Some(base) = self.bases.get(&key.0) {
            overlay.check_against(base)?;
        }
        self.overrides.insert(key, Arc::new(overlay));
        Ok(())
    }

    /// Get a base template by contract type
    pub fn get(&self, contract_type: &str) -> Option<&Arc<Template>> {
        self.bases.get(&normalize_id(contract_type))
    }

    pub fn get_override(
        &self,
        contract_type: &str,
        jurisdiction: &str,
    ) -> Option<&Arc<TemplateOverride>> {
        self.overrides
            .get(&(normalize_id(contract_type), normalize_id(jurisdiction)))
    }

    /// Check if a base template exists
    pub fn contains(&self, contract_type: &str) -> bool {
        self.get(contract_type).is_some()
    }

    /// Contract types with a base template, in sorted order
    pub fn contract_types(&self) -> impl Iterator<Item = &str> {
        self.bases.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

fn toml_files(dir: &Path) -> Result<Vec<PathBuf>, TemplateError> {
    let entries = std::fs::read_dir(dir).map_err(|e| TemplateError::read_error(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| TemplateError::read_error(dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
