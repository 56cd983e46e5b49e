//! Runs a rule set over loaded documents

use std::any::Any;
use std::cell::OnceCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use armlint_core::{Finding, JsonPath, Severity, SpecKinds};
use armlint_parser::{compose, ComposeLimits, DocumentInventory, ParsedDocument};
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use crate::projector::SchemaProjector;
use crate::rule::{MergeState, RuleContext, RuleDescriptor};
use crate::ruleset::RuleSet;

/// Rule code of the finding emitted when a rule body fails.
pub const RULE_EXECUTION_FAILED: &str = "RuleExecutionFailed";

/// Where a document is in its pass through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Selecting,
    Executing,
    Emitting,
}

pub struct RuleEngine {
    rules: Vec<RuleDescriptor>,
    spec_kind: SpecKinds,
    compose_limits: ComposeLimits,
}

impl RuleEngine {
    /// Keep the rules that apply to `spec_kind`, ordered by id.
    pub fn new(rule_set: &RuleSet, spec_kind: SpecKinds) -> Self {
        let mut rules: Vec<RuleDescriptor> = rule_set
            .iter()
            .filter(|rule| rule.applies_to(spec_kind))
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.id.cmp(&b.id));

        Self {
            rules,
            spec_kind,
            compose_limits: ComposeLimits::default(),
        }
    }

    pub fn with_compose_limits(mut self, limits: ComposeLimits) -> Self {
        self.compose_limits = limits;
        self
    }

    pub fn rules(&self) -> &[RuleDescriptor] {
        &self.rules
    }

    /// All findings for one document, in rule order and then match order.
    #[instrument(skip_all, fields(document = %document.path()))]
    pub fn run_document(
        &self,
        inventory: &DocumentInventory,
        document: &Arc<ParsedDocument>,
    ) -> Vec<Finding> {
        let mut phase = Phase::Idle;
        let projector = SchemaProjector::new(document.clone(), inventory);
        let context = RuleContext {
            document: document.as_ref(),
            inventory,
            projector: &projector,
            spec_kind: self.spec_kind,
        };
        let composed: OnceCell<Value> = OnceCell::new();
        let mut findings = Vec::new();

        for rule in &self.rules {
            transition(&mut phase, Phase::Selecting);
            let tree = match rule.merge_state {
                MergeState::Individual => document.tree(),
                MergeState::Composed => composed.get_or_init(|| {
                    debug!("Composing {}", document.path());
                    compose(inventory, document.path(), self.compose_limits)
                        .unwrap_or_else(|| document.tree().clone())
                }),
            };
            let matches: Vec<(JsonPath, &Value)> = rule
                .selectors
                .iter()
                .flat_map(|selector| selector.query(tree))
                .collect();
            trace!("{} matched {} nodes", rule.id, matches.len());

            transition(&mut phase, Phase::Executing);
            for (path, value) in matches {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    rule.invoke(tree, value, &path, &context)
                }));
                match outcome {
                    Ok(Ok(violations)) => {
                        findings.extend(violations.into_iter().map(|violation| Finding {
                            rule_id: rule.id.clone(),
                            rule_name: rule.name.clone(),
                            category: rule.category.clone(),
                            severity: rule.severity,
                            message: violation.message,
                            path: violation.path.unwrap_or_else(|| path.clone()),
                            source: document.path().clone(),
                        }));
                    }
                    Ok(Err(err)) => {
                        warn!("Rule {} failed at {}: {}", rule.id, path, err);
                        findings.push(failure(rule, document, &path, err.to_string()));
                    }
                    Err(payload) => {
                        let reason = panic_message(payload.as_ref());
                        warn!("Rule {} panicked at {}: {}", rule.id, path, reason);
                        findings.push(failure(rule, document, &path, reason));
                    }
                }
            }
        }

        transition(&mut phase, Phase::Emitting);
        debug!("{} findings", findings.len());
        transition(&mut phase, Phase::Idle);
        findings
    }
}

fn transition(phase: &mut Phase, next: Phase) {
    trace!("{:?} -> {:?}", phase, next);
    *phase = next;
}

fn failure(
    rule: &RuleDescriptor,
    document: &ParsedDocument,
    path: &JsonPath,
    reason: String,
) -> Finding {
    Finding {
        rule_id: RULE_EXECUTION_FAILED.to_string(),
        rule_name: rule.name.clone(),
        category: "Internal".to_string(),
        severity: Severity::Error,
        message: format!("Rule {} ({}) failed: {}", rule.id, rule.name, reason),
        path: path.clone(),
        source: document.path().clone(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
