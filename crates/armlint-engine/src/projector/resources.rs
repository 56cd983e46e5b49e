//! Resource classification and collection models

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use armlint_core::JsonPath;
use armlint_parser::ResolvedRef;
use serde_json::Value;
use tracing::trace;

use super::{ref_name, SchemaProjector};

/// Extension marking a schema as a manageable resource.
pub const RESOURCE_MARKER: &str = "x-ms-azure-resource";

/// Base schemas that make anything inheriting from them a resource.
pub const CANONICAL_RESOURCE_BASES: [&str; 4] =
    ["Resource", "TrackedResource", "ProxyResource", "AzureEntityResource"];

/// True when the marker is set anywhere in the schema's own subtree.
/// References are not followed.
fn has_marker(schema: &Value) -> bool {
    match schema {
        Value::Object(map) => map.iter().any(|(key, value)| {
            (key == RESOURCE_MARKER && value == &Value::Bool(true)) || has_marker(value)
        }),
        Value::Array(items) => items.iter().any(has_marker),
        _ => false,
    }
}

/// Walks `allOf` chains. Lives for one projector call.
struct Classifier<'p, 'a> {
    projector: &'p SchemaProjector<'a>,
    memo: HashMap<String, bool>,
    chain: HashSet<String>,
}

impl<'p, 'a> Classifier<'p, 'a> {
    fn new(projector: &'p SchemaProjector<'a>) -> Self {
        Self {
            projector,
            memo: HashMap::new(),
            chain: HashSet::new(),
        }
    }

    fn is_resource(&mut self, schema: &ResolvedRef) -> bool {
        self.classify(schema).0
    }

    /// Returns the classification and whether it was reached through a
    /// schema already on the chain. Such negative answers are not memoized.
    fn classify(&mut self, schema: &ResolvedRef) -> (bool, bool) {
        let key = format!("{}#{}", schema.document.path().key(), schema.pointer);
        if let Some(&known) = self.memo.get(&key) {
            return (known, false);
        }
        if !self.chain.insert(key.clone()) {
            trace!("Inheritance loop through {}", key);
            return (false, true);
        }

        let value = schema.value();
        let mut result = has_marker(value);
        let mut cut = false;

        if !result {
            let parents = value.get("allOf").and_then(Value::as_array).into_iter().flatten();
            for reference in parents.filter_map(|p| p.get("$ref").and_then(Value::as_str)) {
                if CANONICAL_RESOURCE_BASES.contains(&ref_name(reference)) {
                    result = true;
                    break;
                }
                let Some(parent) = self
                    .projector
                    .inventory()
                    .resolve_pointer(schema.document.path(), reference)
                else {
                    continue;
                };
                let (parent_result, parent_cut) = self.classify(&parent);
                cut |= parent_cut;
                if parent_result {
                    result = true;
                    break;
                }
            }
        }

        self.chain.remove(&key);
        if result || !cut {
            self.memo.insert(key, result);
        }
        (result, cut && !result)
    }
}

impl SchemaProjector<'_> {
    fn definition_ref(&self, name: &str) -> Option<ResolvedRef> {
        let pointer = JsonPath::from_segments(["definitions", name]).to_pointer();
        self.inventory()
            .resolve_pointer(self.document().path(), &format!("#{}", pointer))
    }

    /// Definitions of this document that are resources, by marker or by
    /// inheritance.
    pub fn resource_names(&self) -> BTreeSet<String> {
        let Some(definitions) = self.definitions() else {
            return BTreeSet::new();
        };
        let mut classifier = Classifier::new(self);
        definitions
            .keys()
            .filter(|name| {
                self.definition_ref(name)
                    .is_some_and(|schema| classifier.is_resource(&schema))
            })
            .cloned()
            .collect()
    }

    pub fn is_resource(&self, name: &str) -> bool {
        self.definition_ref(name)
            .is_some_and(|schema| Classifier::new(self).is_resource(&schema))
    }

    /// Wrapper schema to item schema, for every definition with an array
    /// property whose items reference a resource.
    pub fn collection_models(&self) -> BTreeMap<String, String> {
        let Some(definitions) = self.definitions() else {
            return BTreeMap::new();
        };
        let mut classifier = Classifier::new(self);
        let mut out = BTreeMap::new();

        for (name, schema) in definitions {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                continue;
            };
            for property in properties.values() {
                let Some(reference) = property
                    .get("items")
                    .and_then(|items| items.get("$ref"))
                    .and_then(Value::as_str)
                else {
                    continue;
                };
                let Some(item) = self
                    .inventory()
                    .resolve_pointer(self.document().path(), reference)
                else {
                    continue;
                };
                if classifier.is_resource(&item) {
                    out.insert(name.clone(), ref_name(reference).to_string());
                    break;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use armlint_core::SpecPath;
    use armlint_parser::{DocumentInventory, MemoryFileSystem, ParsedDocument};
    use armlint_test_fixtures::{cyclic_inheritance_document, fixture, FixtureType};
    use serde_json::json;

    async fn load_value(doc: &Value) -> (DocumentInventory, Arc<ParsedDocument>) {
        let fs = MemoryFileSystem::new();
        let path = fs.insert("/specs/test.json", doc.to_string()).unwrap();
        let inventory = DocumentInventory::new(Arc::new(fs));
        let parsed = inventory.load_document(&path).await.unwrap();
        (inventory, parsed)
    }

    #[tokio::test]
    async fn test_marker_true_and_false() {
        let on = json!({"definitions": {"W": {"type": "object", "x-ms-azure-resource": true}}});
        let off = json!({"definitions": {"W": {"type": "object", "x-ms-azure-resource": false}}});

        let (inventory, doc) = load_value(&on).await;
        assert!(SchemaProjector::new(doc, &inventory).resource_names().contains("W"));

        let (inventory, doc) = load_value(&off).await;
        assert!(SchemaProjector::new(doc, &inventory).resource_names().is_empty());
    }

    #[tokio::test]
    async fn test_marker_deep_in_subtree() {
        let doc = json!({
            "definitions": {"W": {"properties": {"inner": {"x-ms-azure-resource": true}}}}
        });
        let (inventory, doc) = load_value(&doc).await;
        assert!(SchemaProjector::new(doc, &inventory).is_resource("W"));
    }

    #[tokio::test]
    async fn test_cyclic_inheritance_terminates() {
        let (inventory, doc) = load_value(&cyclic_inheritance_document(false)).await;
        let projector = SchemaProjector::new(doc, &inventory);
        assert!(projector.resource_names().is_empty());
        // answers don't depend on which schema is asked first
        assert!(!projector.is_resource("T"));
        assert!(!projector.is_resource("S"));

        let (inventory, doc) = load_value(&cyclic_inheritance_document(true)).await;
        let projector = SchemaProjector::new(doc, &inventory);
        let names: Vec<String> = projector.resource_names().into_iter().collect();
        assert_eq!(names, vec!["S", "T"]);
        assert!(projector.is_resource("S"));
    }

    #[tokio::test]
    async fn test_inheritance_across_files() {
        let fixture = fixture(FixtureType::Widgets);
        let fs = MemoryFileSystem::new();
        for (path, text) in &fixture.files {
            fs.insert(path, text.as_str()).unwrap();
        }
        let inventory = DocumentInventory::new(Arc::new(fs));
        let root = SpecPath::new(&fixture.root).unwrap();
        let doc = inventory.load_document(&root).await.unwrap();
        let projector = SchemaProjector::new(doc, &inventory);

        let names: Vec<String> = projector.resource_names().into_iter().collect();
        assert_eq!(names, vec!["Widget"]);
        assert_eq!(
            projector.collection_models().get("WidgetList").map(String::as_str),
            Some("Widget")
        );

        let types = SpecPath::new("/specs/common/types.json").unwrap();
        let common = SchemaProjector::new(inventory.get(&types).unwrap(), &inventory);
        let base_names: Vec<String> = common.resource_names().into_iter().collect();
        assert_eq!(base_names, vec!["ProxyResource", "Resource", "TrackedResource"]);
    }

    #[tokio::test]
    async fn test_inheritance_through_local_parent() {
        let doc = json!({
            "definitions": {
                "Base": {"x-ms-azure-resource": true},
                "Mid": {"allOf": [{"$ref": "#/definitions/Base"}]},
                "Leaf": {"allOf": [{"$ref": "#/definitions/Mid"}]},
                "Other": {"allOf": [{"$ref": "#/definitions/Missing"}]}
            }
        });
        let (inventory, doc) = load_value(&doc).await;
        let names: Vec<String> = SchemaProjector::new(doc, &inventory)
            .resource_names()
            .into_iter()
            .collect();
        assert_eq!(names, vec!["Base", "Leaf", "Mid"]);
    }
}
