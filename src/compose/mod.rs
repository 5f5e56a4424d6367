//! Composition of definitions, rule sets and templates into artifacts
//!
//! The engine builds one fill map per compilation: scalars computed from the
//! definition and rule set, blocks from the jurisdiction handler, and the
//! template's own presets. The map must cover the template's declared slots
//! exactly before anything is rendered.

mod engine;
mod error;
mod fill;
mod generate;
mod handlers;
mod jurisdictions;
mod render;

pub use engine::CompositionEngine;
pub use error::CompositionError;
pub use fill::{Fill, FillMap};
pub use handlers::{HandlerContext, HandlerRegistry, JurisdictionHandler, StateSlots, TestCase};
pub use jurisdictions::{EuHandler, IndiaHandler, UsHandler};
