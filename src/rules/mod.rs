//! Jurisdiction rule registry
//!
//! Defines, per (jurisdiction, contract-type) pair, which legal requirements,
//! mandatory clauses, time limits and numeric constraints apply.

mod error;
mod registry;

pub use error::RuleError;
pub use registry::{JurisdictionRuleSet, RegistryHandle, RuleRegistry};
