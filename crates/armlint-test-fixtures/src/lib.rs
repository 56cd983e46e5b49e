//! Test fixtures for armlint
//!
//! Small multi-file API descriptions covering the shapes the built-in rules
//! and the projector care about. Documents are built as values so tests can
//! tweak them before rendering to text.

use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory every fixture document lives under.
pub const FIXTURE_ROOT: &str = "/specs";

pub const WIDGET_ITEM: &str = concat!(
    "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}",
    "/providers/Microsoft.Foo/widgets/{widgetName}"
);
pub const WIDGET_RG_LIST: &str = concat!(
    "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}",
    "/providers/Microsoft.Foo/widgets"
);
pub const WIDGET_SUB_LIST: &str = "/subscriptions/{subscriptionId}/providers/Microsoft.Foo/widgets";
pub const GADGET_ITEM: &str = concat!(
    "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}",
    "/providers/Microsoft.Foo/widgets/{widgetName}/gadgets/{gadgetName}"
);

/// A set of documents plus the one a test should lint.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub root: String,
    pub files: Vec<(String, String)>,
}

impl Fixture {
    fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            files: Vec::new(),
        }
    }

    /// Add a document rendered as pretty JSON.
    pub fn with_json(mut self, path: &str, document: &Value) -> Self {
        let text = serde_json::to_string_pretty(document).unwrap_or_default();
        self.files.push((path.to_string(), text));
        self
    }

    pub fn with_text(mut self, path: &str, text: &str) -> Self {
        self.files.push((path.to_string(), text.to_string()));
        self
    }

    pub fn text_of(&self, path: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, text)| text.as_str())
    }

    /// Write every document below `dir`, keeping the layout under
    /// [`FIXTURE_ROOT`]. Returns the on-disk location of the root document.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        for (path, text) in &self.files {
            let target = dir.join(relative(path));
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(target, text)?;
        }
        Ok(dir.join(relative(&self.root)))
    }
}

fn relative(path: &str) -> &str {
    path.strip_prefix(FIXTURE_ROOT)
        .unwrap_or(path)
        .trim_start_matches('/')
}

/// Fixture categories
pub enum FixtureType {
    /// ARM widget service that every built-in rule accepts
    Widgets,
    /// Widget service whose PUT lacks a 201 response
    WidgetsMissingCreated,
    /// Widget service without the subscription-wide list
    WidgetsWithoutSubscriptionList,
    /// Widget service whose PUT 201 returns a different schema than GET
    PutSchemaMismatch,
    /// Widget service with an operationId that is not `Noun_Verb`
    BadOperationId,
    /// Widget service with its list operations under `x-ms-paths`
    ExtensionPathLists,
    /// Nested gadget resource that has no list operation
    NestedWithoutList,
    /// Data-plane DELETE carrying a body parameter
    DeleteWithBody,
    /// Long-running PUT with an unknown final-state-via
    LroBadFinalState,
    /// Two documents that reference each other
    CrossFileCycle,
    /// Text that does not parse
    Malformed,
}

/// Build the documents for `fixture_type`.
pub fn fixture(fixture_type: FixtureType) -> Fixture {
    match fixture_type {
        FixtureType::Widgets => widgets_fixture(widgets_document()),
        FixtureType::WidgetsMissingCreated => {
            let mut doc = widgets_document();
            if let Some(responses) = doc["paths"][WIDGET_ITEM]["put"]["responses"].as_object_mut() {
                responses.remove("201");
            }
            widgets_fixture(doc)
        }
        FixtureType::WidgetsWithoutSubscriptionList => {
            let mut doc = widgets_document();
            if let Some(paths) = doc["paths"].as_object_mut() {
                paths.remove(WIDGET_SUB_LIST);
            }
            widgets_fixture(doc)
        }
        FixtureType::PutSchemaMismatch => {
            let mut doc = widgets_document();
            doc["paths"][WIDGET_ITEM]["put"]["responses"]["201"]["schema"] =
                json!({"$ref": "#/definitions/WidgetUpdate"});
            doc["definitions"]["WidgetUpdate"] = json!({
                "type": "object",
                "properties": {"tags": {"type": "object"}}
            });
            widgets_fixture(doc)
        }
        FixtureType::BadOperationId => {
            let mut doc = widgets_document();
            doc["paths"][WIDGET_ITEM]["get"]["operationId"] = json!("GetWidget");
            widgets_fixture(doc)
        }
        FixtureType::ExtensionPathLists => {
            let mut doc = widgets_document();
            let mut extension = serde_json::Map::new();
            if let Some(paths) = doc["paths"].as_object_mut() {
                for list in [WIDGET_RG_LIST, WIDGET_SUB_LIST] {
                    if let Some(item) = paths.remove(list) {
                        extension.insert(list.to_string(), item);
                    }
                }
            }
            doc["x-ms-paths"] = Value::Object(extension);
            widgets_fixture(doc)
        }
        FixtureType::NestedWithoutList => {
            let mut doc = widgets_document();
            doc["paths"][GADGET_ITEM] = json!({
                "get": {
                    "operationId": "Gadgets_Get",
                    "parameters": [{"$ref": "./common/types.json#/parameters/ApiVersionParameter"}],
                    "responses": {
                        "200": {"description": "OK", "schema": {"$ref": "#/definitions/Gadget"}}
                    }
                }
            });
            doc["definitions"]["Gadget"] = json!({
                "type": "object",
                "allOf": [{"$ref": "./common/types.json#/definitions/ProxyResource"}],
                "properties": {"color": {"type": "string"}}
            });
            widgets_fixture(doc)
        }
        FixtureType::DeleteWithBody => {
            Fixture::new("/specs/data/items.json")
                .with_json("/specs/data/items.json", &delete_with_body_document())
        }
        FixtureType::LroBadFinalState => {
            let mut doc = widgets_document();
            doc["paths"][WIDGET_ITEM]["put"]["x-ms-long-running-operation"] = json!(true);
            doc["paths"][WIDGET_ITEM]["put"]["x-ms-long-running-operation-options"] =
                json!({"final-state-via": "eventually"});
            widgets_fixture(doc)
        }
        FixtureType::CrossFileCycle => Fixture::new("/specs/cycle/a.json")
            .with_json(
                "/specs/cycle/a.json",
                &json!({
                    "swagger": "2.0",
                    "info": {"title": "A", "version": "1.0"},
                    "paths": {},
                    "definitions": {
                        "A": {
                            "type": "object",
                            "properties": {"b": {"$ref": "./b.json#/definitions/B"}}
                        }
                    }
                }),
            )
            .with_json(
                "/specs/cycle/b.json",
                &json!({
                    "swagger": "2.0",
                    "info": {"title": "B", "version": "1.0"},
                    "paths": {},
                    "definitions": {
                        "B": {
                            "type": "object",
                            "properties": {"a": {"$ref": "./a.json#/definitions/A"}}
                        }
                    }
                }),
            ),
        FixtureType::Malformed => Fixture::new("/specs/broken.json")
            .with_text(
                "/specs/broken.json",
                "{\n  \"swagger\": \"2.0\",\n  \"paths\": {\n    \"/a\": [\n}\n",
            ),
    }
}

fn widgets_fixture(doc: Value) -> Fixture {
    Fixture::new("/specs/widgets.json")
        .with_json("/specs/widgets.json", &doc)
        .with_json("/specs/common/types.json", &common_types_document())
}

fn ok_response(definition: &str) -> Value {
    json!({
        "description": "OK",
        "schema": {"$ref": format!("#/definitions/{}", definition)}
    })
}

/// Widget service: top-level resource with item, resource-group and
/// subscription level operations.
pub fn widgets_document() -> Value {
    let api_version = json!({"$ref": "./common/types.json#/parameters/ApiVersionParameter"});

    json!({
        "swagger": "2.0",
        "info": {"title": "WidgetManagementClient", "version": "2024-01-01"},
        "host": "management.azure.com",
        "schemes": ["https"],
        "paths": {
            WIDGET_ITEM: {
                "put": {
                    "operationId": "Widgets_CreateOrUpdate",
                    "parameters": [
                        api_version,
                        {
                            "name": "body",
                            "in": "body",
                            "required": true,
                            "schema": {"$ref": "#/definitions/Widget"}
                        }
                    ],
                    "responses": {
                        "200": ok_response("Widget"),
                        "201": {
                            "description": "Created",
                            "schema": {"$ref": "#/definitions/Widget"}
                        }
                    }
                },
                "get": {
                    "operationId": "Widgets_Get",
                    "parameters": [api_version],
                    "responses": {"200": ok_response("Widget")}
                },
                "delete": {
                    "operationId": "Widgets_Delete",
                    "parameters": [api_version],
                    "responses": {
                        "200": {"description": "OK"},
                        "204": {"description": "No Content"}
                    }
                }
            },
            WIDGET_RG_LIST: {
                "get": {
                    "operationId": "Widgets_ListByResourceGroup",
                    "parameters": [api_version],
                    "responses": {"200": ok_response("WidgetList")}
                }
            },
            WIDGET_SUB_LIST: {
                "get": {
                    "operationId": "Widgets_ListBySubscription",
                    "parameters": [api_version],
                    "responses": {"200": ok_response("WidgetList")}
                }
            }
        },
        "definitions": {
            "Widget": {
                "type": "object",
                "allOf": [{"$ref": "./common/types.json#/definitions/TrackedResource"}],
                "properties": {"properties": {"$ref": "#/definitions/WidgetProperties"}}
            },
            "WidgetProperties": {
                "type": "object",
                "properties": {"size": {"type": "integer", "format": "int32"}}
            },
            "WidgetList": {
                "type": "object",
                "properties": {
                    "value": {"type": "array", "items": {"$ref": "#/definitions/Widget"}},
                    "nextLink": {"type": "string"}
                }
            }
        }
    })
}

/// Shared ARM types referenced by the widget service.
pub fn common_types_document() -> Value {
    json!({
        "swagger": "2.0",
        "info": {"title": "Common types", "version": "1.0"},
        "paths": {},
        "parameters": {
            "ApiVersionParameter": {
                "name": "api-version",
                "in": "query",
                "required": true,
                "type": "string"
            }
        },
        "definitions": {
            "Resource": {
                "type": "object",
                "properties": {
                    "id": {"type": "string", "readOnly": true},
                    "name": {"type": "string", "readOnly": true},
                    "type": {"type": "string", "readOnly": true}
                },
                "x-ms-azure-resource": true
            },
            "TrackedResource": {
                "allOf": [{"$ref": "#/definitions/Resource"}],
                "properties": {"location": {"type": "string"}}
            },
            "ProxyResource": {
                "allOf": [{"$ref": "#/definitions/Resource"}]
            }
        }
    })
}

/// Data-plane item service whose DELETE takes an inline body.
pub fn delete_with_body_document() -> Value {
    json!({
        "swagger": "2.0",
        "info": {"title": "Items", "version": "1.0"},
        "paths": {
            "/items/{name}": {
                "get": {
                    "operationId": "Items_Get",
                    "responses": {"200": {"description": "OK"}}
                },
                "delete": {
                    "operationId": "Items_Delete",
                    "parameters": [
                        {"name": "name", "in": "path", "required": true, "type": "string"},
                        {"name": "options", "in": "body", "schema": {"type": "object"}}
                    ],
                    "responses": {"204": {"description": "Deleted"}}
                }
            }
        }
    })
}

/// Definitions whose `allOf` chain loops `S -> T -> S`.
pub fn cyclic_inheritance_document(marker: bool) -> Value {
    json!({
        "swagger": "2.0",
        "info": {"title": "Loop", "version": "1.0"},
        "paths": {},
        "definitions": {
            "S": {"allOf": [{"$ref": "#/definitions/T"}]},
            "T": {"allOf": [{"$ref": "#/definitions/S"}], "x-ms-azure-resource": marker},
            "Plain": {"type": "object"}
        }
    })
}

/// Owns temporary directories holding fixtures written to disk.
pub struct TestFixtures {
    temp_dirs: Vec<tempfile::TempDir>,
}

impl Default for TestFixtures {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixtures {
    pub fn new() -> Self {
        Self {
            temp_dirs: Vec::new(),
        }
    }

    /// Write the fixture to a fresh temporary directory and return the
    /// on-disk path of its root document.
    pub fn setup(&mut self, fixture_type: FixtureType) -> PathBuf {
        let dir = tempfile::tempdir().unwrap();
        let root = fixture(fixture_type).write_to(dir.path()).unwrap();
        self.temp_dirs.push(dir);
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widgets_fixture_has_both_documents() {
        let fixture = fixture(FixtureType::Widgets);
        assert_eq!(fixture.root, "/specs/widgets.json");
        assert!(fixture.text_of("/specs/common/types.json").is_some());
    }

    #[test]
    fn test_missing_created_removes_201() {
        let fixture = fixture(FixtureType::WidgetsMissingCreated);
        let text = fixture.text_of("/specs/widgets.json").unwrap();
        let doc: Value = serde_json::from_str(text).unwrap();
        assert!(doc["paths"][WIDGET_ITEM]["put"]["responses"].get("201").is_none());
        assert!(doc["paths"][WIDGET_ITEM]["put"]["responses"].get("200").is_some());
    }

    #[test]
    fn test_setup_writes_to_disk() {
        let mut fixtures = TestFixtures::new();
        let root = fixtures.setup(FixtureType::Widgets);
        assert!(root.ends_with("widgets.json"));
        assert!(root.exists());
        assert!(root.parent().unwrap().join("common/types.json").exists());
    }

    #[test]
    fn test_extension_path_lists_move_both_lists() {
        let fixture = fixture(FixtureType::ExtensionPathLists);
        let text = fixture.text_of("/specs/widgets.json").unwrap();
        let doc: Value = serde_json::from_str(text).unwrap();
        assert!(doc["paths"].get(WIDGET_RG_LIST).is_none());
        assert!(doc["x-ms-paths"].get(WIDGET_RG_LIST).is_some());
        assert!(doc["x-ms-paths"].get(WIDGET_SUB_LIST).is_some());
    }
}
