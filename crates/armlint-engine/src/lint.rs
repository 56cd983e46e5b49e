//! One linting pass over a batch of documents

use std::collections::BTreeSet;
use std::sync::Arc;

use armlint_core::{Message, SpecKinds, SpecPath};
use armlint_parser::{
    ComposeLimits, DocumentInventory, FileSystem, LocalFileSystem, DEFAULT_COMPOSE_DEPTH,
};
use tracing::{info, instrument, warn};

use crate::engine::RuleEngine;
use crate::error::EngineError;
use crate::formatter::Formatter;
use crate::ruleset::RuleSet;

/// Inputs of a linting pass besides the document paths.
#[derive(Clone)]
pub struct LintOptions {
    pub rule_set: RuleSet,
    pub spec_kind: SpecKinds,
    pub file_system: Arc<dyn FileSystem>,
    pub compose_depth: usize,
}

impl LintOptions {
    /// Read from local disk, default kind, default compose depth.
    pub fn new(rule_set: RuleSet) -> Self {
        Self {
            rule_set,
            spec_kind: SpecKinds::default(),
            file_system: Arc::new(LocalFileSystem),
            compose_depth: DEFAULT_COMPOSE_DEPTH,
        }
    }

    pub fn with_spec_kind(mut self, spec_kind: SpecKinds) -> Self {
        self.spec_kind = spec_kind;
        self
    }

    pub fn with_file_system(mut self, file_system: Arc<dyn FileSystem>) -> Self {
        self.file_system = file_system;
        self
    }

    pub fn with_compose_depth(mut self, compose_depth: usize) -> Self {
        self.compose_depth = compose_depth;
        self
    }
}

/// Lint every document in `paths` and return located messages.
///
/// Documents are reported in the order given, duplicates once. A document
/// that cannot be loaded contributes a single fatal message and the rest of
/// the batch is still linted.
#[instrument(skip_all, fields(documents = paths.len(), kind = %options.spec_kind))]
pub async fn lint(paths: &[SpecPath], options: &LintOptions) -> Result<Vec<Message>, EngineError> {
    let mut seen = BTreeSet::new();
    let roots: Vec<SpecPath> = paths.iter().filter(|p| seen.insert(*p)).cloned().collect();

    let inventory = DocumentInventory::new(options.file_system.clone());
    let loaded = inventory.load_all(&roots).await;

    let limits = ComposeLimits {
        max_depth: options.compose_depth,
        ..ComposeLimits::default()
    };
    let engine = RuleEngine::new(&options.rule_set, options.spec_kind).with_compose_limits(limits);
    let formatter = Formatter::new(&inventory);

    let mut messages = Vec::new();
    for (path, result) in roots.iter().zip(loaded) {
        match result {
            Ok(document) => {
                let findings = engine.run_document(&inventory, &document);
                messages.extend(formatter.format_all(&findings)?);
            }
            Err(err) => {
                warn!("Could not load {}: {}", path, err);
                messages.push(Formatter::fatal(path, &err));
            }
        }
    }

    info!(
        "Linted {} documents ({} parsed), {} messages",
        roots.len(),
        inventory.parse_count(),
        messages.len()
    );
    Ok(messages)
}
