//! R4001: PUT responses must match what GET returns

use armlint_core::{PathSegment, Severity, SpecKinds};
use serde_json::Value;

use super::ARM_VIOLATION;
use crate::error::{EngineError, RuleError};
use crate::rule::{LegacyInput, MergeState, RuleDescriptor, RuleResult, Violation};

const REQUIRED: [&str; 2] = ["200", "201"];

pub(super) fn rule() -> Result<RuleDescriptor, EngineError> {
    RuleDescriptor::builder("R4001", "PutResponseSchemaMatchesGet")
        .category(ARM_VIOLATION)
        .severity(Severity::Error)
        .kinds(SpecKinds::ARM)
        .merge_state(MergeState::Individual)
        .description("A PUT must define 200 and 201 responses returning the same schema as the GET")
        .selector("$.paths.*.put")
        .selector("$['x-ms-paths'].*.put")
        .legacy(check)
}

fn check(input: &LegacyInput<'_>) -> RuleResult {
    let responses_path = input.path.child("responses");
    let responses = input.value.get("responses").and_then(Value::as_object);

    let missing: Vec<&str> = REQUIRED
        .into_iter()
        .filter(|code| !responses.is_some_and(|r| r.contains_key(*code)))
        .collect();
    if !missing.is_empty() {
        return Ok(vec![Violation::at(
            format!(
                "PUT operation must define 200 and 201 responses; missing {}",
                missing.join(", ")
            ),
            responses_path,
        )]);
    }

    let template = match input.path.segments() {
        [_, PathSegment::Key(template), ..] => template.as_str(),
        _ => {
            return Err(RuleError::UnexpectedShape {
                path: input.path.to_string(),
                message: "PUT matched outside a path section".to_string(),
            })
        }
    };

    let projector = input.context.projector;
    let Some(expected) = projector.schema_of("get", template, "200") else {
        return Ok(Vec::new());
    };

    let mut violations = Vec::new();
    for code in responses.into_iter().flat_map(|r| r.keys()) {
        if !code.starts_with('2') {
            continue;
        }
        let Some(actual) = projector.response_schema(input.value, code) else {
            continue;
        };
        if actual != expected {
            violations.push(Violation::at(
                format!(
                    "PUT {} response returns '{}' but GET returns '{}'",
                    code, actual, expected
                ),
                responses_path.child(code.as_str()).child("schema"),
            ));
        }
    }
    Ok(violations)
}
