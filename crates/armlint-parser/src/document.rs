use std::collections::BTreeSet;

use armlint_core::{JsonPath, Range, SpecPath};
use serde_json::Value;

use crate::error::ParserError;
use crate::location::LocationIndex;
use crate::resolver::ReferenceResolver;
use crate::text;

/// A document that has been parsed and had its cross-file references
/// rewritten to absolute form. Immutable once built.
#[derive(Debug)]
pub struct ParsedDocument {
    path: SpecPath,
    raw_text: String,
    tree: Value,
    locations: LocationIndex,
    references: BTreeSet<SpecPath>,
}

impl ParsedDocument {
    /// Parse `raw_text` as the content of `path` and resolve its references.
    pub fn parse(path: SpecPath, raw_text: String) -> Result<Self, ParserError> {
        let (mut tree, locations) =
            text::parse(&raw_text).map_err(|e| e.in_document(path.as_str()))?;
        let references = ReferenceResolver::new(&path).resolve(&mut tree);

        Ok(Self {
            path,
            raw_text,
            tree,
            locations,
            references,
        })
    }

    pub fn path(&self) -> &SpecPath {
        &self.path
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn tree(&self) -> &Value {
        &self.tree
    }

    pub fn locations(&self) -> &LocationIndex {
        &self.locations
    }

    /// Other documents this one points at through `$ref`.
    pub fn references(&self) -> &BTreeSet<SpecPath> {
        &self.references
    }

    /// Range of the node at `path`, falling back to its nearest ancestor.
    pub fn locate(&self, path: &JsonPath) -> Range {
        self.locations.locate(path)
    }

    /// Look up a node by RFC 6901 pointer (the fragment part of a `$ref`).
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        if pointer.is_empty() {
            return Some(&self.tree);
        }
        self.tree.pointer(&decode_fragment(pointer))
    }
}

/// Undo percent-encoding that sometimes appears in `$ref` fragments.
fn decode_fragment(fragment: &str) -> String {
    percent_encoding::percent_decode_str(fragment)
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pointer_lookup() {
        let doc = ParsedDocument::parse(
            SpecPath::new("/specs/a.json").unwrap(),
            r#"{"definitions": {"Foo Bar": {"type": "object"}}}"#.to_string(),
        )
        .unwrap();

        assert_eq!(
            doc.pointer("/definitions/Foo%20Bar"),
            Some(&json!({"type": "object"}))
        );
        assert_eq!(doc.pointer(""), Some(doc.tree()));
        assert!(doc.pointer("/definitions/Missing").is_none());
    }

    #[test]
    fn test_parse_error_names_document() {
        let err = ParsedDocument::parse(
            SpecPath::new("/specs/broken.json").unwrap(),
            "{ \"a\": ".to_string(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("/specs/broken.json"));
        assert!(err.position().is_some());
    }
}
