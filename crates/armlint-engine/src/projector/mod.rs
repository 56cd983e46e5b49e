//! Read-only queries over one document's schemas and operations
//!
//! Every query recomputes from the document snapshot; nothing is cached
//! between calls.

mod paths;
mod resources;

use std::collections::BTreeMap;
use std::sync::Arc;

use armlint_core::JsonPath;
use armlint_parser::{DocumentInventory, ParsedDocument};
use serde_json::{Map, Value};

pub(crate) use paths::is_subscription_list;
pub use paths::{normalize_template, provider_namespace, resource_pair_count};
pub use resources::{CANONICAL_RESOURCE_BASES, RESOURCE_MARKER};

/// Sections of a document holding URL templates.
pub const PATH_SECTIONS: [&str; 2] = ["paths", "x-ms-paths"];

/// Where an operation lives: the section and the URL template within it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OperationSite {
    pub section: &'static str,
    pub template: String,
}

impl OperationSite {
    /// Path of the operation object for `verb` at this site.
    pub fn operation_path(&self, verb: &str) -> JsonPath {
        JsonPath::from_segments([self.section, self.template.as_str(), verb])
    }
}

/// A specific GET paired with the GET that lists its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionApiInfo {
    pub specific: OperationSite,
    pub collection: OperationSite,
    pub specific_model: Option<String>,
    pub collection_model: Option<String>,
}

pub struct SchemaProjector<'a> {
    document: Arc<ParsedDocument>,
    inventory: &'a DocumentInventory,
}

impl<'a> SchemaProjector<'a> {
    pub fn new(document: Arc<ParsedDocument>, inventory: &'a DocumentInventory) -> Self {
        Self {
            document,
            inventory,
        }
    }

    pub fn document(&self) -> &ParsedDocument {
        &self.document
    }

    pub(crate) fn inventory(&self) -> &DocumentInventory {
        self.inventory
    }

    pub fn definitions(&self) -> Option<&Map<String, Value>> {
        self.document.tree().get("definitions")?.as_object()
    }

    /// Every operation site in document order, across both path sections.
    fn sites(&self) -> impl Iterator<Item = (OperationSite, &Map<String, Value>)> + '_ {
        PATH_SECTIONS.into_iter().flat_map(move |section| {
            self.document
                .tree()
                .get(section)
                .and_then(Value::as_object)
                .into_iter()
                .flat_map(move |templates| {
                    templates.iter().filter_map(move |(template, item)| {
                        let item = item.as_object()?;
                        let site = OperationSite {
                            section,
                            template: template.clone(),
                        };
                        Some((site, item))
                    })
                })
        })
    }

    /// Sites that define a GET.
    pub fn get_operations(&self) -> Vec<OperationSite> {
        self.sites()
            .filter(|(_, item)| item.contains_key("get"))
            .map(|(site, _)| site)
            .collect()
    }

    /// Name of the schema the `verb` operation at `template` returns for
    /// `status`, when it references a named schema.
    pub fn schema_of(&self, verb: &str, template: &str, status: &str) -> Option<String> {
        self.sites()
            .filter(|(site, _)| site.template == template)
            .find_map(|(_, item)| self.response_schema(item.get(verb)?, status))
    }

    /// Schema name to the sites whose `verb`/`status` response returns it.
    pub fn operations_returning(
        &self,
        verb: &str,
        status: &str,
    ) -> BTreeMap<String, Vec<OperationSite>> {
        let mut out: BTreeMap<String, Vec<OperationSite>> = BTreeMap::new();
        for (site, item) in self.sites() {
            let Some(operation) = item.get(verb) else {
                continue;
            };
            if let Some(name) = self.response_schema(operation, status) {
                out.entry(name).or_default().push(site);
            }
        }
        out
    }

    /// Name of the schema `operation` returns for `status`, following a
    /// response-level `$ref`.
    pub fn response_schema(&self, operation: &Value, status: &str) -> Option<String> {
        let response = operation.get("responses")?.get(status)?;
        let schema_ref = match response.get("$ref").and_then(Value::as_str) {
            Some(reference) => {
                let resolved = self.inventory.resolve_pointer(self.document.path(), reference)?;
                resolved.value().get("schema")?.get("$ref")?.as_str()?.to_string()
            }
            None => response.get("schema")?.get("$ref")?.as_str()?.to_string(),
        };
        Some(ref_name(&schema_ref).to_string())
    }

    fn resources_by_pair_count(
        &self,
        keep: impl Fn(usize) -> bool,
    ) -> BTreeMap<String, Vec<OperationSite>> {
        let resources = self.resource_names();
        self.operations_returning("get", "200")
            .into_iter()
            .filter(|(name, _)| resources.contains(name))
            .filter_map(|(name, sites)| {
                let sites: Vec<OperationSite> = sites
                    .into_iter()
                    .filter(|site| keep(resource_pair_count(&site.template)))
                    .collect();
                (!sites.is_empty()).then_some((name, sites))
            })
            .collect()
    }

    /// Resources fetched at `.../providers/<ns>/<type>/{name}`.
    pub fn top_level_resources(&self) -> BTreeMap<String, Vec<OperationSite>> {
        self.resources_by_pair_count(|pairs| pairs == 1)
    }

    /// Resources fetched below another resource.
    pub fn nested_resources(&self) -> BTreeMap<String, Vec<OperationSite>> {
        self.resources_by_pair_count(|pairs| pairs > 1)
    }

    /// Pair each GET ending in `/{name}` with the GET at the same template
    /// minus that segment.
    pub fn collection_api_info(&self) -> Vec<CollectionApiInfo> {
        let gets = self.get_operations();
        let mut out = Vec::new();

        for specific in &gets {
            let Some(parent) = paths::strip_name_segment(&specific.template) else {
                continue;
            };
            let wanted = normalize_template(parent);
            let Some(collection) = gets
                .iter()
                .find(|other| normalize_template(&other.template) == wanted)
            else {
                continue;
            };

            out.push(CollectionApiInfo {
                specific: specific.clone(),
                collection: collection.clone(),
                specific_model: self.schema_of("get", &specific.template, "200"),
                collection_model: self.schema_of("get", &collection.template, "200"),
            });
        }
        out
    }
}

/// Last segment of a reference's pointer: `#/definitions/Widget` → `Widget`.
pub fn ref_name(reference: &str) -> &str {
    let fragment = reference.rsplit_once('#').map_or(reference, |(_, f)| f);
    fragment.rsplit('/').next().unwrap_or(fragment)
}
