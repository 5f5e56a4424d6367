//! Template system for contract artifacts
//!
//! A base template declares a closed set of slots and three bodies (contract
//! source, deploy script, test scaffold). A jurisdiction override may replace
//! scalar presets and append content to block slots.
//!
//! # Example
//!
//! ```text
//! [slots]
//! jurisdiction = "scalar"
//! compliance_verification = "block"
//!
//! [bodies]
//! primary = '''
//! string public constant JURISDICTION = "{{ jurisdiction }}";
//! function verifyLegalCompliance() public view returns (bool) {
//!     {{#block compliance_verification}}
//!     {{/block}}
//!     return true;
//! }
//! '''
//! ```

mod grammar;
pub mod lexer;
mod registry;
mod resolver;
mod text;

pub use registry::{Template, TemplateError, TemplateLibrary, TemplateOverride, PROVENANCE_SLOTS};
pub use resolver::{resolve_template, ResolvedTemplate};
pub use text::{Segment, SlotKind, Spanned, TemplateText};
