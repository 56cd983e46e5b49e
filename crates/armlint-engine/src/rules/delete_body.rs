//! R4002: DELETE operations take no request body

use armlint_core::{Severity, SpecKinds};
use serde_json::Value;

use super::ARM_VIOLATION;
use crate::error::EngineError;
use crate::rule::{DeclarativeInput, MergeState, RuleDescriptor, RuleResult, Violation};

pub(super) fn rule() -> Result<RuleDescriptor, EngineError> {
    RuleDescriptor::builder("R4002", "DeleteMustNotHaveRequestBody")
        .category(ARM_VIOLATION)
        .severity(Severity::Error)
        .kinds(SpecKinds::DEFAULT | SpecKinds::ARM | SpecKinds::DATA_PLANE)
        .merge_state(MergeState::Composed)
        .description("A DELETE operation must not declare a body parameter")
        .selector("$.paths.*.delete.parameters[?(@.in == 'body')]")
        .selector("$['x-ms-paths'].*.delete.parameters[?(@.in == 'body')]")
        .declarative(Value::Null, check)
}

fn check(input: &DeclarativeInput<'_>) -> RuleResult {
    let name = input.value.get("name").and_then(Value::as_str).unwrap_or("<unnamed>");
    Ok(vec![Violation::new(format!(
        "DELETE operation must not have a request body; remove parameter '{}'",
        name
    ))])
}
