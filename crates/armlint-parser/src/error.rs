use armlint_core::{CoreError, Position};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Parse error at {line}:{column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error(transparent)]
    Path(#[from] CoreError),

    #[error("{path}: {source}")]
    InDocument {
        path: String,
        #[source]
        source: Box<ParserError>,
    },
}

impl ParserError {
    pub(crate) fn in_document(self, path: impl Into<String>) -> Self {
        ParserError::InDocument {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Where in the source text the error was detected, when known.
    pub fn position(&self) -> Option<Position> {
        match self {
            ParserError::Parse { line, column, .. } => Some(Position::new(*line, *column)),
            ParserError::InDocument { source, .. } => source.position(),
            _ => None,
        }
    }
}
