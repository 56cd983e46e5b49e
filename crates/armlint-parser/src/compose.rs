//! Fully dereferenced views of a document

use std::collections::HashMap;
use std::fmt;

use armlint_core::SpecPath;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::inventory::DocumentInventory;

pub const DEFAULT_COMPOSE_DEPTH: usize = 32;

/// Default cap on the number of nodes in one composed view.
pub const DEFAULT_COMPOSE_NODES: usize = 250_000;

/// Bounds for building a composed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeLimits {
    /// Maximum number of nested `$ref` substitutions on one expansion chain
    pub max_depth: usize,
    /// Once the view holds this many nodes, remaining references are kept
    pub max_nodes: usize,
}

impl Default for ComposeLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_COMPOSE_DEPTH,
            max_nodes: DEFAULT_COMPOSE_NODES,
        }
    }
}

/// Copy of the document at `path` with every `$ref` object replaced by its
/// target. A reference back into a target that is still being expanded is
/// left as is, and so is any reference past the depth bound or past the node
/// budget.
///
/// Returns `None` when `path` has not been loaded.
pub fn compose(
    inventory: &DocumentInventory,
    path: &SpecPath,
    limits: ComposeLimits,
) -> Option<Value> {
    let document = inventory.get(path)?;
    let mut composer = Composer {
        inventory,
        limits,
        chain: Vec::new(),
        deepest: 0,
        nodes: 0,
        exhausted: false,
        finished: HashMap::new(),
    };
    let (view, _) = composer.expand(document.path(), document.tree());
    debug!(
        "Composed {} ({} nodes, {} shared targets)",
        path,
        composer.nodes,
        composer.finished.len()
    );
    Some(view)
}

/// A target expanded without hitting the chain or a bound, so the same copy
/// is valid wherever the target is referenced again.
struct Finished {
    value: Value,
    nodes: usize,
    /// Longest substitution chain inside the expansion, counting itself
    reach: usize,
}

enum Substitution {
    Expanded(Value, bool),
    /// The `$ref` stays; `true` when that depended on the current chain
    Kept(bool),
}

struct Composer<'a> {
    inventory: &'a DocumentInventory,
    limits: ComposeLimits,
    /// `document-key#pointer` of every target currently being expanded
    chain: Vec<String>,
    /// Longest chain seen since the innermost fresh expansion began
    deepest: usize,
    nodes: usize,
    exhausted: bool,
    finished: HashMap<String, Finished>,
}

impl Composer<'_> {
    /// Returns the expanded node and whether a reference inside it was kept
    /// because of the chain or a bound.
    fn expand(&mut self, owner: &SpecPath, node: &Value) -> (Value, bool) {
        self.nodes += 1;
        match node {
            Value::Object(map) => {
                let mut cut = false;
                if let Some(Value::String(reference)) = map.get("$ref") {
                    match self.substitute(owner, reference, map) {
                        Substitution::Expanded(value, cut) => return (value, cut),
                        Substitution::Kept(kept_cut) => cut = kept_cut,
                    }
                }
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    let (value, inner_cut) = self.expand(owner, v);
                    cut |= inner_cut;
                    out.insert(k.clone(), value);
                }
                (Value::Object(out), cut)
            }
            Value::Array(items) => {
                let mut cut = false;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    let (value, inner_cut) = self.expand(owner, item);
                    cut |= inner_cut;
                    out.push(value);
                }
                (Value::Array(out), cut)
            }
            other => (other.clone(), false),
        }
    }

    fn substitute(
        &mut self,
        owner: &SpecPath,
        reference: &str,
        siblings: &Map<String, Value>,
    ) -> Substitution {
        let Some(resolved) = self.inventory.resolve_pointer(owner, reference) else {
            debug!("Unresolved reference {} in {}", reference, owner);
            return Substitution::Kept(false);
        };

        let key = format!("{}#{}", resolved.document.path().key(), resolved.pointer);
        if self.chain.contains(&key) {
            debug!("Leaving cyclic reference {} in {}", reference, owner);
            return Substitution::Kept(true);
        }

        let (mut value, mut cut) = match self.reuse(&key) {
            Some(value) => (value, false),
            None => {
                if self.chain.len() >= self.limits.max_depth {
                    warn!(
                        "Reference depth limit {} reached at {} in {}",
                        self.limits.max_depth, reference, owner
                    );
                    return Substitution::Kept(true);
                }
                if !self.has_budget(0, reference, owner) {
                    return Substitution::Kept(true);
                }

                let outer_deepest = self.deepest;
                let start = self.nodes;
                self.chain.push(key.clone());
                self.deepest = self.chain.len();
                let target_owner = resolved.document.path().clone();
                let (value, cut) = self.expand(&target_owner, resolved.value());
                self.chain.pop();
                let reach = self.deepest - self.chain.len();
                self.deepest = self.deepest.max(outer_deepest);

                if !cut {
                    self.finished.insert(
                        key,
                        Finished {
                            value: value.clone(),
                            nodes: self.nodes - start,
                            reach,
                        },
                    );
                }
                (value, cut)
            }
        };

        // keys written next to the `$ref` win over the target's
        if let Value::Object(target) = &mut value {
            for (k, v) in siblings.iter().filter(|(k, _)| k.as_str() != "$ref") {
                let (expanded, sibling_cut) = self.expand(owner, v);
                cut |= sibling_cut;
                target.insert(k.clone(), expanded);
            }
        }
        Substitution::Expanded(value, cut)
    }

    /// A finished copy of `key` that fits the depth bound and the budget here.
    fn reuse(&mut self, key: &str) -> Option<Value> {
        let (nodes, reach) = self.finished.get(key).map(|f| (f.nodes, f.reach))?;
        if self.chain.len() + reach > self.limits.max_depth {
            return None;
        }
        if !self.has_budget(nodes, key, "a shared target") {
            return None;
        }
        self.nodes += nodes;
        self.deepest = self.deepest.max(self.chain.len() + reach);
        self.finished.get(key).map(|f| f.value.clone())
    }

    fn has_budget(&mut self, extra: usize, reference: &str, owner: impl fmt::Display) -> bool {
        if self.nodes + extra <= self.limits.max_nodes {
            return true;
        }
        if !self.exhausted {
            self.exhausted = true;
            warn!(
                "Composed view reached {} nodes at {} in {}; keeping remaining references",
                self.limits.max_nodes, reference, owner
            );
        }
        false
    }
}
