//! Rewrites cross-file `$ref` pointers to absolute form

use std::collections::BTreeSet;

use armlint_core::SpecPath;
use serde_json::Value;
use tracing::{debug, warn};

/// Directory segment whose documents are never followed.
const EXAMPLES_SEGMENT: &str = "examples";

/// Walks a document tree rewriting `file#fragment` references against the
/// owning document's path.
pub struct ReferenceResolver<'a> {
    base: &'a SpecPath,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(base: &'a SpecPath) -> Self {
        Self { base }
    }

    /// Rewrite every external reference in `tree` in place and return the set
    /// of documents referenced. Running it twice changes nothing further.
    pub fn resolve(&self, tree: &mut Value) -> BTreeSet<SpecPath> {
        let mut targets = BTreeSet::new();
        let mut pending = vec![tree];

        while let Some(node) = pending.pop() {
            match node {
                Value::Object(map) => {
                    if let Some(Value::String(reference)) = map.get_mut("$ref") {
                        if let Some((rewritten, target)) = self.rewrite(reference) {
                            *reference = rewritten;
                            targets.insert(target);
                        }
                    }
                    pending.extend(map.values_mut());
                }
                Value::Array(items) => pending.extend(items.iter_mut()),
                _ => {}
            }
        }

        targets.remove(self.base);
        targets
    }

    fn rewrite(&self, reference: &str) -> Option<(String, SpecPath)> {
        let (file, fragment) = reference.split_once('#')?;
        if file.is_empty() {
            return None;
        }

        let target = match self.base.join(file) {
            Ok(target) => target,
            Err(err) => {
                warn!("Skipping unresolvable reference {} in {}: {}", reference, self.base, err);
                return None;
            }
        };

        if target.has_segment(EXAMPLES_SEGMENT) {
            debug!("Not following example reference {}", reference);
            return None;
        }

        Some((format!("{}#{}", target, fragment), target))
    }
}
