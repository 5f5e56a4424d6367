//! The slot-fill map built for one compilation

use std::collections::BTreeMap;

use crate::template::{ResolvedTemplate, SlotKind};

use super::error::CompositionError;

/// A value for one slot
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    /// Inline text substituted for `{{ name }}`
    Scalar(String),
    /// Statements appended to a block, one line each
    Block(Vec<String>),
}

impl Fill {
    pub fn kind(&self) -> SlotKind {
        match self {
            Fill::Scalar(_) => SlotKind::Scalar,
            Fill::Block(_) => SlotKind::Block,
        }
    }
}

/// Slot name to fill. Each slot may be filled exactly once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillMap {
    fills: BTreeMap<String, Fill>,
}

impl FillMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: impl Into<String>, fill: Fill) -> Result<(), CompositionError> {
        let slot = slot.into();
        if self.fills.contains_key(&slot) {
            return Err(CompositionError::DuplicateFill { slot });
        }
        self.fills.insert(slot, fill);
        Ok(())
    }

    pub fn scalar(&mut self, slot: &str, value: impl Into<String>) -> Result<(), CompositionError> {
        self.insert(slot, Fill::Scalar(value.into()))
    }

    pub fn block(&mut self, slot: &str, lines: Vec<String>) -> Result<(), CompositionError> {
        self.insert(slot, Fill::Block(lines))
    }

    pub fn get(&self, slot: &str) -> Option<&Fill> {
        self.fills.get(slot)
    }

    pub fn len(&self) -> usize {
        self.fills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    /// Check the map against the template's declared slots in both
    /// directions. Slots are checked in sorted order, so the reported slot
    /// is deterministic.
    pub fn verify(&self, template: &ResolvedTemplate) -> Result<(), CompositionError> {
        for slot in template.slots().keys() {
            if !self.fills.contains_key(slot) {
                return Err(CompositionError::incomplete(slot.as_str()));
            }
        }
        for (slot, fill) in &self.fills {
            match template.slot_kind(slot) {
                None => return Err(CompositionError::unknown(slot.as_str())),
                Some(declared) if declared != fill.kind() => {
                    return Err(CompositionError::KindMismatch {
                        slot: slot.clone(),
                        declared,
                        filled: fill.kind(),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
