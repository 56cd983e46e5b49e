//! Turns findings into located messages

use armlint_core::{Finding, Message, Position, Range, Severity, SpecPath};
use armlint_parser::{DocumentInventory, ParserError};

use crate::error::EngineError;

/// Rule code of the message emitted for a document that could not be loaded.
pub const FATAL_ERROR: &str = "FatalError";

pub struct Formatter<'a> {
    inventory: &'a DocumentInventory,
}

impl<'a> Formatter<'a> {
    pub fn new(inventory: &'a DocumentInventory) -> Self {
        Self { inventory }
    }

    /// Locate `finding` in the text of its source document. A path that
    /// doesn't exist in the text lands on its nearest existing ancestor.
    pub fn format(&self, finding: &Finding) -> Result<Message, EngineError> {
        let document = self
            .inventory
            .get(&finding.source)
            .ok_or_else(|| EngineError::DocumentNotLoaded(finding.source.to_string()))?;

        Ok(Message {
            severity: finding.severity,
            rule_code: finding.rule_id.clone(),
            rule_name: finding.rule_name.clone(),
            message: finding.message.clone(),
            category: finding.category.clone(),
            json_path: finding.path.to_string(),
            source_document: finding.source.to_string(),
            range: document.locate(&finding.path),
        })
    }

    pub fn format_all(&self, findings: &[Finding]) -> Result<Vec<Message>, EngineError> {
        findings.iter().map(|f| self.format(f)).collect()
    }

    /// The single message reported for a document that failed to load.
    pub fn fatal(path: &SpecPath, error: &ParserError) -> Message {
        let at = error.position().unwrap_or(Position::new(1, 1));
        Message {
            severity: Severity::Fatal,
            rule_code: FATAL_ERROR.to_string(),
            rule_name: FATAL_ERROR.to_string(),
            message: error.to_string(),
            category: "Internal".to_string(),
            json_path: "$".to_string(),
            source_document: path.to_string(),
            range: Range::point(at),
        }
    }
}
