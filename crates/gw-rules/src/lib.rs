//! Detection rule sets for the inspection pipeline
//!
//! Two independent detectors plus the static technique tables the recorder
//! and dashboard use:
//!
//! - [`SignatureRuleSet`]: an ordered list of named boolean predicates,
//!   first match wins.
//! - [`RegexRuleSet`]: named patterns compiled into a single `RegexSet`,
//!   reporting every matching rule.
//! - [`techniques`]: keyword-to-technique and rule-to-tactic data tables.
//!
//! Both rule sets are built once at startup and are immutable afterwards,
//! so they can be shared across request tasks without locking.

pub mod regex_rules;
pub mod signature;
pub mod techniques;

pub use regex_rules::RegexRuleSet;
pub use signature::{SignatureRule, SignatureRuleSet};
