//! R4005 and R4006: resources must be listable

use armlint_core::SpecKinds;

use super::ARM_VIOLATION;
use crate::error::EngineError;
use crate::projector::is_subscription_list;
use crate::rule::{LegacyInput, RuleDescriptor, RuleResult, Violation};

pub(super) fn nested_rule() -> Result<RuleDescriptor, EngineError> {
    RuleDescriptor::builder("R4005", "NestedResourceHasListOperation")
        .category(ARM_VIOLATION)
        .kinds(SpecKinds::ARM)
        .description("Every nested resource needs a GET listing it under its parent")
        .selector("$")
        .legacy(check_nested)
}

pub(super) fn subscription_rule() -> Result<RuleDescriptor, EngineError> {
    RuleDescriptor::builder("R4006", "TopLevelResourceListBySubscription")
        .category(ARM_VIOLATION)
        .kinds(SpecKinds::ARM)
        .description("Every top-level resource needs a GET listing it across the subscription")
        .selector("$")
        .legacy(check_subscription_list)
}

fn check_nested(input: &LegacyInput<'_>) -> RuleResult {
    let projector = input.context.projector;
    let collections = projector.collection_models();
    let pairs = projector.collection_api_info();

    let mut violations = Vec::new();
    for (name, sites) in projector.nested_resources() {
        for site in sites {
            let listed = pairs.iter().any(|info| {
                info.specific == site
                    && info
                        .collection_model
                        .as_ref()
                        .and_then(|model| collections.get(model))
                        .is_some_and(|item| *item == name)
            });
            if !listed {
                violations.push(Violation::at(
                    format!(
                        "Nested resource '{}' has no list operation returning a collection of it",
                        name
                    ),
                    site.operation_path("get"),
                ));
            }
        }
    }
    Ok(violations)
}

fn check_subscription_list(input: &LegacyInput<'_>) -> RuleResult {
    let projector = input.context.projector;
    let collections = projector.collection_models();
    let list_gets = projector.operations_returning("get", "200");

    let mut violations = Vec::new();
    for (name, sites) in projector.top_level_resources() {
        let listed = collections
            .iter()
            .filter(|(_, item)| **item == name)
            .filter_map(|(model, _)| list_gets.get(model))
            .flatten()
            .any(|site| is_subscription_list(&site.template));
        if listed {
            continue;
        }
        if let Some(site) = sites.first() {
            violations.push(Violation::at(
                format!(
                    "Top-level resource '{}' has no list operation at subscription scope",
                    name
                ),
                site.operation_path("get"),
            ));
        }
    }
    Ok(violations)
}
