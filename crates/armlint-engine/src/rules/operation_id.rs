//! R4003: operation ids read `Noun_Verb`

use regex::Regex;
use serde_json::{json, Value};

use super::SDK_VIOLATION;
use crate::error::{EngineError, RuleError};
use crate::rule::{DeclarativeInput, RuleDescriptor, RuleResult, Violation};

const NAME: &str = "OperationIdNounVerb";
const NOUN_VERB: &str = "^[A-Za-z0-9]+_[A-Za-z0-9]+$";

pub(super) fn rule() -> Result<RuleDescriptor, EngineError> {
    with_pattern(NOUN_VERB)
}

/// The rule checking ids against `pattern`, compiled once here.
fn with_pattern(pattern: &str) -> Result<RuleDescriptor, EngineError> {
    let compiled = Regex::new(pattern).map_err(|e| EngineError::InvalidRule {
        rule: NAME.to_string(),
        message: e.to_string(),
    })?;

    RuleDescriptor::builder("R4003", NAME)
        .category(SDK_VIOLATION)
        .description("operationId must have the form Noun_Verb")
        .selector("$.paths.*.*.operationId")
        .selector("$['x-ms-paths'].*.*.operationId")
        .declarative(json!({ "pattern": pattern }), move |input: &DeclarativeInput<'_>| {
            check(&compiled, input)
        })
}

fn check(compiled: &Regex, input: &DeclarativeInput<'_>) -> RuleResult {
    let pattern = input
        .options
        .get("pattern")
        .and_then(Value::as_str)
        .ok_or_else(|| RuleError::Options("`pattern` must be a string".to_string()))?;

    let replaced;
    let regex = if compiled.as_str() == pattern {
        compiled
    } else {
        replaced = Regex::new(pattern)?;
        &replaced
    };

    match input.value.as_str() {
        Some(id) if regex.is_match(id) => Ok(Vec::new()),
        Some(id) => Ok(vec![Violation::new(format!(
            "operationId '{}' should have the form Noun_Verb with exactly one underscore",
            id
        ))]),
        None => Ok(vec![Violation::new("operationId must be a string")]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RuleEngine;
    use crate::ruleset::RuleSet;
    use armlint_core::SpecKinds;
    use armlint_parser::{DocumentInventory, MemoryFileSystem};
    use std::sync::Arc;

    async fn ids_flagged(rule: RuleDescriptor) -> Vec<String> {
        let doc = json!({
            "paths": {"/a": {"get": {"operationId": "A_Get"}, "put": {"operationId": "PutA"}}},
            "x-ms-paths": {"/a?x": {"get": {"operationId": "A_Get_Extra"}}}
        });
        let fs = MemoryFileSystem::new();
        let path = fs.insert("/specs/ids.json", doc.to_string()).unwrap();
        let inventory = DocumentInventory::new(Arc::new(fs));
        let document = inventory.load_document(&path).await.unwrap();

        let rules = RuleSet::from_rules([rule]);
        RuleEngine::new(&rules, SpecKinds::DEFAULT)
            .run_document(&inventory, &document)
            .into_iter()
            .map(|finding| finding.path.to_string())
            .collect()
    }

    #[test]
    fn test_default_pattern() {
        let rule = rule().unwrap();
        let crate::rule::RuleBody::Declarative { options, .. } = &rule.body else {
            panic!("expected a declarative rule");
        };
        let pattern = Regex::new(options["pattern"].as_str().unwrap()).unwrap();
        assert!(pattern.is_match("Widgets_Get"));
        assert!(!pattern.is_match("WidgetsGet"));
        assert!(!pattern.is_match("Widgets_Get_All"));
    }

    #[tokio::test]
    async fn test_flags_ids_in_both_path_sections() {
        let flagged = ids_flagged(rule().unwrap()).await;
        assert_eq!(
            flagged,
            vec![
                "$.paths['/a'].put.operationId",
                "$['x-ms-paths']['/a?x'].get.operationId",
            ]
        );
    }

    #[tokio::test]
    async fn test_custom_pattern_is_honored() {
        let flagged = ids_flagged(with_pattern("^[A-Za-z]+$").unwrap()).await;
        assert_eq!(
            flagged,
            vec![
                "$.paths['/a'].get.operationId",
                "$['x-ms-paths']['/a?x'].get.operationId",
            ]
        );
    }

    #[test]
    fn test_invalid_pattern_fails_at_build() {
        let err = with_pattern("([").unwrap_err();
        assert!(matches!(err, EngineError::InvalidRule { .. }));
    }
}
