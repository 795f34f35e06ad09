//! Recurrence rules and their bounded expansion into start instants.

pub mod error;
pub mod frequency;
pub mod params;
pub mod rule;
pub mod sequence;

pub use error::{RuleError, RuleResult};
pub use frequency::Frequency;
pub use params::{ParamKey, ParamValue, RuleParams};
pub use rule::{Rule, RuleSource};
pub use sequence::DateSequence;
