//! Rule engine for armlint
//!
//! Runs a [`RuleSet`] over documents loaded by `armlint-parser` and turns
//! the findings into located [`Message`](armlint_core::Message)s. The
//! [`lint`] function drives a whole pass; the pieces are public for callers
//! that want to assemble their own.

pub mod config;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod lint;
pub mod projector;
pub mod rule;
pub mod rules;
pub mod ruleset;
pub mod selector;

pub use config::{LintConfig, CONFIG_ENV};
pub use engine::{Phase, RuleEngine, RULE_EXECUTION_FAILED};
pub use error::{ConfigError, EngineError, RuleError};
pub use formatter::{Formatter, FATAL_ERROR};
pub use lint::{lint, LintOptions};
pub use projector::{CollectionApiInfo, OperationSite, SchemaProjector};
pub use rule::{
    DeclarativeInput, LegacyInput, MergeState, RuleBody, RuleContext, RuleDescriptor, RuleResult,
    Violation,
};
pub use rules::builtin_rules;
pub use ruleset::RuleSet;
pub use selector::Selector;
