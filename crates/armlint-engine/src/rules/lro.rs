//! R4004: long-running operations name a known final state

use armlint_core::Severity;
use serde_json::{json, Value};

use super::SDK_VIOLATION;
use crate::error::{EngineError, RuleError};
use crate::rule::{DeclarativeInput, RuleDescriptor, RuleResult, Violation};

pub(super) fn rule() -> Result<RuleDescriptor, EngineError> {
    RuleDescriptor::builder("R4004", "LroFinalStateViaValid")
        .category(SDK_VIOLATION)
        .severity(Severity::Error)
        .description("x-ms-long-running-operation-options.final-state-via must be a known value")
        .selector("$.paths.*.*")
        .selector("$['x-ms-paths'].*.*")
        .field("$['x-ms-long-running-operation-options']['final-state-via']")
        .declarative(
            json!({
                "allowed": [
                    "azure-async-operation",
                    "location",
                    "original-uri",
                    "operation-location"
                ]
            }),
            check,
        )
}

fn check(input: &DeclarativeInput<'_>) -> RuleResult {
    let allowed: Vec<&str> = input
        .options
        .get("allowed")
        .and_then(Value::as_array)
        .ok_or_else(|| RuleError::Options("`allowed` must be a list".to_string()))?
        .iter()
        .filter_map(Value::as_str)
        .collect();

    match input.value.as_str() {
        Some(state) if allowed.contains(&state) => Ok(Vec::new()),
        _ => Ok(vec![Violation::new(format!(
            "final-state-via {} is not one of: {}",
            input.value,
            allowed.join(", ")
        ))]),
    }
}
