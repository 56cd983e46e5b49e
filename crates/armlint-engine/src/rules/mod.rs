//! Built-in rules

mod delete_body;
mod list_operations;
mod lro;
mod operation_id;
mod put_response;

use crate::error::EngineError;
use crate::ruleset::RuleSet;

pub(crate) const ARM_VIOLATION: &str = "ARMViolation";
pub(crate) const SDK_VIOLATION: &str = "SDKViolation";

/// The rules shipped with armlint.
pub fn builtin_rules() -> Result<RuleSet, EngineError> {
    Ok(RuleSet::from_rules([
        put_response::rule()?,
        delete_body::rule()?,
        operation_id::rule()?,
        lro::rule()?,
        list_operations::nested_rule()?,
        list_operations::subscription_rule()?,
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use armlint_core::SpecKinds;

    #[test]
    fn test_catalog() {
        let rules = builtin_rules().unwrap();
        let ids: Vec<&str> = {
            let mut ids: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
            ids.sort();
            ids
        };
        assert_eq!(ids, vec!["R4001", "R4002", "R4003", "R4004", "R4005", "R4006"]);

        let data_plane = rules.filter_kinds(SpecKinds::DATA_PLANE);
        assert_eq!(data_plane.len(), 3);
        assert!(data_plane.contains("DeleteMustNotHaveRequestBody"));
    }
}
