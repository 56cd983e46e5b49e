//! Rule descriptors and the two body conventions rules are written in

use std::fmt;
use std::sync::Arc;

use armlint_core::{JsonPath, Severity, SpecKinds};
use armlint_parser::{DocumentInventory, ParsedDocument};
use serde_json::Value;

use crate::error::{EngineError, RuleError};
use crate::projector::SchemaProjector;
use crate::selector::Selector;

/// Which view of a document a rule's selectors run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeState {
    /// The document as written, with references rewritten but not substituted
    Individual,
    /// The fully dereferenced view
    Composed,
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeState::Individual => f.write_str("individual"),
            MergeState::Composed => f.write_str("composed"),
        }
    }
}

/// One problem reported by a rule body. Without a path it is reported at
/// the node the body was invoked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub message: String,
    pub path: Option<JsonPath>,
}

impl Violation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    pub fn at(message: impl Into<String>, path: JsonPath) -> Self {
        Self {
            message: message.into(),
            path: Some(path),
        }
    }
}

/// What every rule body can see besides its match.
pub struct RuleContext<'a> {
    pub document: &'a ParsedDocument,
    pub inventory: &'a DocumentInventory,
    pub projector: &'a SchemaProjector<'a>,
    pub spec_kind: SpecKinds,
}

/// Input of a whole-document rule.
pub struct LegacyInput<'a> {
    /// The tree the selectors ran against
    pub document: &'a Value,
    pub value: &'a Value,
    pub path: &'a JsonPath,
    pub context: &'a RuleContext<'a>,
}

/// Input of an options-driven rule.
pub struct DeclarativeInput<'a> {
    pub value: &'a Value,
    pub options: &'a Value,
    pub path: &'a JsonPath,
    pub context: &'a RuleContext<'a>,
}

pub type RuleResult = Result<Vec<Violation>, RuleError>;

pub type LegacyFn = dyn Fn(&LegacyInput<'_>) -> RuleResult + Send + Sync;

pub type DeclarativeFn = dyn Fn(&DeclarativeInput<'_>) -> RuleResult + Send + Sync;

#[derive(Clone)]
pub enum RuleBody {
    Legacy(Arc<LegacyFn>),
    Declarative {
        /// Applied to each match; the first hit replaces the match
        field: Option<Selector>,
        options: Value,
        check: Arc<DeclarativeFn>,
    },
}

impl fmt::Debug for RuleBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleBody::Legacy(_) => f.write_str("Legacy"),
            RuleBody::Declarative { field, options, .. } => f
                .debug_struct("Declarative")
                .field("field", field)
                .field("options", options)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuleDescriptor {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub severity: Severity,
    pub kinds: SpecKinds,
    pub merge_state: MergeState,
    pub selectors: Vec<Selector>,
    pub body: RuleBody,
}

impl RuleDescriptor {
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> RuleBuilder {
        RuleBuilder::new(id.into(), name.into())
    }

    pub fn applies_to(&self, kind: SpecKinds) -> bool {
        self.kinds.intersects(kind)
    }

    /// Run the body on one match. Every returned violation carries a path.
    pub(crate) fn invoke(
        &self,
        tree: &Value,
        value: &Value,
        path: &JsonPath,
        context: &RuleContext<'_>,
    ) -> RuleResult {
        let (target_path, violations) = match &self.body {
            RuleBody::Legacy(check) => {
                let input = LegacyInput {
                    document: tree,
                    value,
                    path,
                    context,
                };
                (path.clone(), check(&input)?)
            }
            RuleBody::Declarative {
                field,
                options,
                check,
            } => {
                let (target_path, target) = match field {
                    Some(field) => match field.first(value) {
                        Some((relative, hit)) => (path.join(&relative), hit),
                        None => return Ok(Vec::new()),
                    },
                    None => (path.clone(), value),
                };
                let input = DeclarativeInput {
                    value: target,
                    options,
                    path: &target_path,
                    context,
                };
                let violations = check(&input)?;
                (target_path, violations)
            }
        };

        Ok(violations
            .into_iter()
            .map(|mut violation| {
                violation.path.get_or_insert_with(|| target_path.clone());
                violation
            })
            .collect())
    }
}

/// Collects rule metadata; selectors are compiled when the body is attached
/// so a malformed selector fails before any document is scanned.
pub struct RuleBuilder {
    id: String,
    name: String,
    category: String,
    description: String,
    severity: Severity,
    kinds: SpecKinds,
    merge_state: MergeState,
    selectors: Vec<String>,
    field: Option<String>,
}

impl RuleBuilder {
    fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            category: "SDKViolation".to_string(),
            description: String::new(),
            severity: Severity::Warning,
            kinds: SpecKinds::DEFAULT | SpecKinds::ARM | SpecKinds::DATA_PLANE,
            merge_state: MergeState::Individual,
            selectors: Vec::new(),
            field: None,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn kinds(mut self, kinds: SpecKinds) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn merge_state(mut self, merge_state: MergeState) -> Self {
        self.merge_state = merge_state;
        self
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    /// Secondary query applied to each match of a declarative rule.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn legacy<F>(self, check: F) -> Result<RuleDescriptor, EngineError>
    where
        F: Fn(&LegacyInput<'_>) -> RuleResult + Send + Sync + 'static,
    {
        if self.field.is_some() {
            return Err(EngineError::InvalidRule {
                rule: self.name,
                message: "field selectors only apply to declarative rules".to_string(),
            });
        }
        self.build(RuleBody::Legacy(Arc::new(check)))
    }

    pub fn declarative<F>(self, options: Value, check: F) -> Result<RuleDescriptor, EngineError>
    where
        F: Fn(&DeclarativeInput<'_>) -> RuleResult + Send + Sync + 'static,
    {
        let field = self.field.as_deref().map(Selector::parse).transpose()?;
        self.build(RuleBody::Declarative {
            field,
            options,
            check: Arc::new(check),
        })
    }

    fn build(self, body: RuleBody) -> Result<RuleDescriptor, EngineError> {
        if self.selectors.is_empty() {
            return Err(EngineError::InvalidRule {
                rule: self.name,
                message: "at least one selector is required".to_string(),
            });
        }
        let selectors = self
            .selectors
            .iter()
            .map(|s| Selector::parse(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RuleDescriptor {
            id: self.id,
            name: self.name,
            category: self.category,
            description: self.description,
            severity: self.severity,
            kinds: self.kinds,
            merge_state: self.merge_state,
            selectors,
            body,
        })
    }
}
