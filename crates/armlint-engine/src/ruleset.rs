//! Named collections of rules

use std::collections::BTreeMap;

use armlint_core::{Severity, SpecKinds};

use crate::error::EngineError;
use crate::rule::RuleDescriptor;

/// Rules keyed by name. Built explicitly by the caller and passed to the
/// engine; lookups also accept a rule id.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: BTreeMap<String, RuleDescriptor>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = RuleDescriptor>) -> Self {
        let mut set = Self::new();
        for rule in rules {
            set.insert(rule);
        }
        set
    }

    /// Add a rule, returning the one it replaced.
    pub fn insert(&mut self, rule: RuleDescriptor) -> Option<RuleDescriptor> {
        self.rules.insert(rule.name.clone(), rule)
    }

    fn key_of(&self, name_or_id: &str) -> Option<String> {
        if self.rules.contains_key(name_or_id) {
            return Some(name_or_id.to_string());
        }
        self.rules
            .values()
            .find(|rule| rule.id.eq_ignore_ascii_case(name_or_id))
            .map(|rule| rule.name.clone())
    }

    pub fn get(&self, name_or_id: &str) -> Option<&RuleDescriptor> {
        self.key_of(name_or_id).and_then(|key| self.rules.get(&key))
    }

    pub fn contains(&self, name_or_id: &str) -> bool {
        self.key_of(name_or_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleDescriptor> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Union of both sets; rules in `other` win on a name collision.
    pub fn merge(mut self, other: RuleSet) -> Self {
        self.rules.extend(other.rules);
        self
    }

    /// Only the rules that apply to `kinds`.
    pub fn filter_kinds(&self, kinds: SpecKinds) -> Self {
        Self {
            rules: self
                .rules
                .iter()
                .filter(|(_, rule)| rule.applies_to(kinds))
                .map(|(name, rule)| (name.clone(), rule.clone()))
                .collect(),
        }
    }

    /// Drop the named rules. Unknown names are ignored.
    pub fn without<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            if let Some(key) = self.key_of(name.as_ref()) {
                self.rules.remove(&key);
            }
        }
        self
    }

    pub fn with_severity(
        mut self,
        name_or_id: &str,
        severity: Severity,
    ) -> Result<Self, EngineError> {
        let key = self
            .key_of(name_or_id)
            .ok_or_else(|| EngineError::UnknownRule(name_or_id.to_string()))?;
        if let Some(rule) = self.rules.get_mut(&key) {
            rule.severity = severity;
        }
        Ok(self)
    }
}
