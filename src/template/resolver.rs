//! Base/override merge for one (contract type, jurisdiction) pair

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::artifact::{ArtifactRole, TemplateProvenance};
use crate::ids::normalize_id;

use super::registry::{Template, TemplateError, TemplateLibrary, TemplateOverride};
use super::text::{SlotKind, TemplateText};

/// A base template merged with its jurisdiction override, if any.
///
/// Scalar presets are merged override-wins; block content from the override
/// is kept separately and rendered after the base content of the block.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    base: Arc<Template>,
    overlay: Option<Arc<TemplateOverride>>,
    jurisdiction: String,
    presets: BTreeMap<String, String>,
}

impl ResolvedTemplate {
    fn new(base: Arc<Template>, overlay: Option<Arc<TemplateOverride>>, jurisdiction: String) -> Self {
        let mut presets = base.presets().clone();
        if let Some(overlay) = &overlay {
            for (slot, value) in overlay.scalars() {
                presets.insert(slot.clone(), value.clone());
            }
        }
        Self {
            base,
            overlay,
            jurisdiction,
            presets,
        }
    }

    pub fn contract_type(&self) -> &str {
        self.base.name()
    }

    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    /// The full declared slot set
    pub fn slots(&self) -> &BTreeMap<String, SlotKind> {
        self.base.slots()
    }

    pub fn slot_kind(&self, slot: &str) -> Option<SlotKind> {
        self.base.slots().get(slot).copied()
    }

    /// Scalar values supplied by the templates themselves
    pub fn presets(&self) -> &BTreeMap<String, String> {
        &self.presets
    }

    /// Override content appended to a block slot
    pub fn extension(&self, block: &str) -> Option<&TemplateText> {
        self.overlay.as_ref().and_then(|o| o.blocks().get(block))
    }

    pub fn body(&self, role: ArtifactRole) -> &TemplateText {
        self.base.body(role)
    }

    pub fn has_override(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn provenance(&self) -> TemplateProvenance {
        TemplateProvenance {
            name: self.base.name().to_string(),
            version: self.base.version().to_string(),
            override_version: self.overlay.as_ref().map(|o| o.version().to_string()),
        }
    }
}

/// Resolve the template for a (contract type, jurisdiction) pair
pub fn resolve_template(
    library: &TemplateLibrary,
    contract_type: &str,
    jurisdiction: &str,
) -> Result<ResolvedTemplate, TemplateError> {
    let base = library
        .get(contract_type)
        .cloned()
        .ok_or_else(|| TemplateError::NotFound {
            contract_type: normalize_id(contract_type),
        })?;
    let overlay = library.get_override(contract_type, jurisdiction).cloned();

    debug!(
        contract_type = base.name(),
        jurisdiction = jurisdiction,
        with_override = overlay.is_some(),
        "resolved template"
    );
    Ok(ResolvedTemplate::new(base, overlay, normalize_id(jurisdiction)))
}

impl TemplateLibrary {
    /// Resolve the template for a (contract type, jurisdiction) pair
    pub fn resolve(
        &self,
        contract_type: &str,
        jurisdiction: &str,
    ) -> Result<ResolvedTemplate, TemplateError> {
        resolve_template(self, contract_type, jurisdiction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
[template]
name = "escrow"
version = "2.0.0"

[slots]
jurisdiction = "scalar"
contract_type = "scalar"
legal_requirements = "scalar"
forum = "scalar"
license = "scalar"
checks = "block"

[scalars]
forum = "Local courts"
license = "MIT"

[bodies]
primary = '''
// SPDX-License-Identifier: {{ license }}
// {{ contract_type }} / {{ jurisdiction }} / {{ forum }} / {{ legal_requirements }}
{{#block checks}}
base_check();
{{/block}}
'''
deploy = "// {{ contract_type }} {{ jurisdiction }} {{ legal_requirements }}\n"
test = "// {{ contract_type }} {{ jurisdiction }} {{ legal_requirements }}\n"
"#;

    const OVERRIDE: &str = r#"
[override]
contract_type = "escrow"
jurisdiction = "india"
version = "1.3.0"

[scalars]
forum = "Arbitration and Conciliation Act, 1996"

[blocks]
checks = "india_check();"
"#;

    fn library() -> TemplateLibrary {
        let mut library = TemplateLibrary::new();
        library
            .register(Template::from_str(BASE, "base").expect("Should load base"))
            .expect("Should register base");
        library
            .register_override(TemplateOverride::from_str(OVERRIDE, "override").expect("Should load override"))
            .expect("Should register override");
        library
    }

    #[test]
    fn test_override_wins_for_scalars() {
        let resolved = library().resolve("escrow", "india").expect("Should resolve");
        assert_eq!(
            resolved.presets().get("forum").map(String::as_str),
            Some("Arbitration and Conciliation Act, 1996")
        );
        // Base presets the override does not mention survive
        assert_eq!(resolved.presets().get("license").map(String::as_str), Some("MIT"));
        assert_eq!(
            resolved.provenance().override_version.as_deref(),
            Some("1.3.0")
        );
    }

    #[test]
    fn test_block_extension_kept_separately() {
        let resolved = library().resolve("escrow", "india").expect("Should resolve");
        let extension = resolved.extension("checks").expect("Should have extension");
        assert_eq!(extension.source(), "india_check();\n");
        assert!(resolved.extension("missing").is_none());
    }

    #[test]
    fn test_base_alone_without_override() {
        let resolved = library().resolve("ESCROW", "eu").expect("Should resolve");
        assert!(!resolved.has_override());
        assert_eq!(resolved.jurisdiction(), "eu");
        assert_eq!(resolved.presets().get("forum").map(String::as_str), Some("Local courts"));
        assert_eq!(resolved.slots().len(), 6);
    }

    #[test]
    fn test_missing_base() {
        let err = library().resolve("lease", "india").expect_err("Should fail");
        assert_eq!(
            err,
            TemplateError::NotFound {
                contract_type: "lease".to_string()
            }
        );
    }
}
