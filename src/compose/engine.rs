//! The composition engine

use std::sync::Arc;

use tracing::debug;

use crate::artifact::{Bodies, GeneratedArtifact};
use crate::definition::ContractDefinition;
use crate::rules::JurisdictionRuleSet;
use crate::template::ResolvedTemplate;

use super::error::CompositionError;
use super::generate::build_fills;
use super::handlers::HandlerRegistry;
use super::render::render;

/// Marker prefix that must never survive rendering
const MARKER_OPEN: &str = "{{";

/// Merges a validated definition, its rule set and its resolved template
/// into an artifact triplet.
///
/// The engine holds only immutable state, so one instance can serve
/// concurrent compilations.
#[derive(Debug, Clone)]
pub struct CompositionEngine {
    handlers: Arc<HandlerRegistry>,
}

impl Default for CompositionEngine {
    fn default() -> Self {
        Self::new(HandlerRegistry::with_builtin())
    }
}

impl CompositionEngine {
    pub fn new(handlers: HandlerRegistry) -> Self {
        Self {
            handlers: Arc::new(handlers),
        }
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Compile one definition. Either all three bodies are rendered
    /// completely or an error is returned.
    pub fn compile(
        &self,
        definition: &ContractDefinition,
        template: &ResolvedTemplate,
        rule_set: &JurisdictionRuleSet,
    ) -> Result<GeneratedArtifact, CompositionError> {
        check_inputs(definition, template, rule_set)?;

        let handler = self.handlers.get(definition.jurisdiction()).ok_or_else(|| {
            CompositionError::MissingHandler {
                jurisdiction: definition.jurisdiction().to_string(),
            }
        })?;

        let fills = build_fills(definition, rule_set, template, handler)?;
        fills.verify(template)?;

        let bodies = Bodies {
            primary: (),
            deploy: (),
            test: (),
        }
        .try_map(|role, ()| {
            let body = render(template.body(role), &fills, template)?;
            if body.contains(MARKER_OPEN) {
                return Err(CompositionError::ResidualMarker { role });
            }
            Ok(body)
        })?;

        debug!(
            contract_type = definition.contract_type(),
            jurisdiction = definition.jurisdiction(),
            slots = fills.len(),
            "composed artifacts"
        );
        Ok(GeneratedArtifact::new(
            bodies,
            definition.clone(),
            rule_set.clone(),
            template.provenance(),
        ))
    }
}

/// The three inputs must describe the same (contract type, jurisdiction)
fn check_inputs(
    definition: &ContractDefinition,
    template: &ResolvedTemplate,
    rule_set: &JurisdictionRuleSet,
) -> Result<(), CompositionError> {
    let pair = (definition.contract_type(), definition.jurisdiction());
    if (rule_set.contract_type(), rule_set.jurisdiction()) != pair {
        return Err(CompositionError::mismatched(format!(
            "rule set is for {}/{}, definition is {}/{}",
            rule_set.jurisdiction(),
            rule_set.contract_type(),
            pair.1,
            pair.0
        )));
    }
    if (template.contract_type(), template.jurisdiction()) != pair {
        return Err(CompositionError::mismatched(format!(
            "template is for {}/{}, definition is {}/{}",
            template.jurisdiction(),
            template.contract_type(),
            pair.1,
            pair.0
        )));
    }
    Ok(())
}
