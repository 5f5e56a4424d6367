//! Composition errors
//!
//! Every variant means generator logic and templates disagree. None of them
//! can be fixed by changing the contract definition.

use thiserror::Error;

use crate::artifact::ArtifactRole;
use crate::template::SlotKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompositionError {
    /// A declared slot was left without a fill
    #[error("incomplete composition: slot '{slot}' has no fill")]
    IncompleteComposition { slot: String },

    /// A fill was produced for a slot the template does not declare
    #[error("unknown slot '{slot}': the template does not declare it")]
    UnknownSlot { slot: String },

    /// Two sources produced a fill for the same slot
    #[error("slot '{slot}' was filled twice")]
    DuplicateFill { slot: String },

    /// A scalar fill for a block slot, or the reverse
    #[error("slot '{slot}' is declared as {declared} but was filled as {filled}")]
    KindMismatch {
        slot: String,
        declared: SlotKind,
        filled: SlotKind,
    },

    /// No jurisdiction handler is registered for the jurisdiction
    #[error("no jurisdiction handler registered for '{jurisdiction}'")]
    MissingHandler { jurisdiction: String },

    /// Definition, template and rule set were not produced for the same pair
    #[error("mismatched inputs: {reason}")]
    MismatchedInputs { reason: String },

    /// Rendered output still contains a slot marker
    #[error("{role} artifact still contains a slot marker")]
    ResidualMarker { role: ArtifactRole },

    /// A handler was registered twice under the same id
    #[error("duplicate jurisdiction handler '{id}'")]
    DuplicateHandler { id: String },

    /// A handler id that can never match a normalized jurisdiction id
    #[error("invalid jurisdiction handler id '{id}': expected a lower-case identifier")]
    InvalidHandlerId { id: String },
}

impl CompositionError {
    pub fn incomplete(slot: impl Into<String>) -> Self {
        Self::IncompleteComposition { slot: slot.into() }
    }

    pub fn unknown(slot: impl Into<String>) -> Self {
        Self::UnknownSlot { slot: slot.into() }
    }

    pub fn mismatched(reason: impl Into<String>) -> Self {
        Self::MismatchedInputs {
            reason: reason.into(),
        }
    }

    /// Composition errors are internal consistency bugs, never input errors
    pub fn is_programmer_error(&self) -> bool {
        true
    }
}
