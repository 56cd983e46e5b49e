//! Source locations for nodes of a parsed document

use std::collections::HashMap;

use armlint_core::{JsonPath, Position, Range};

/// Maps character offsets to 1-based line/column positions.
#[derive(Debug, Clone)]
pub(crate) struct LineIndex {
    /// Character offset at which each line starts
    line_starts: Vec<usize>,
    char_count: usize,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut char_count = 0;
        for c in text.chars() {
            char_count += 1;
            if c == '\n' {
                line_starts.push(char_count);
            }
        }
        Self {
            line_starts,
            char_count,
        }
    }

    pub(crate) fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.char_count);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert_at) => insert_at - 1,
        };
        Position::new(line + 1, offset - self.line_starts[line] + 1)
    }
}

/// Start/end ranges of every node in a document, keyed by abstract path.
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    ranges: HashMap<JsonPath, Range>,
}

impl LocationIndex {
    pub(crate) fn insert(&mut self, path: JsonPath, range: Range) {
        self.ranges.insert(path, range);
    }

    /// Exact range of the node at `path`, if one was recorded.
    pub fn get(&self, path: &JsonPath) -> Option<Range> {
        self.ranges.get(path).copied()
    }

    /// Range of the node at `path`, or of its nearest recorded ancestor.
    ///
    /// The path is shortened from the tail until a node is found, so a
    /// finding on a missing leaf still lands on the object that should have
    /// contained it.
    pub fn locate(&self, path: &JsonPath) -> Range {
        for len in (0..=path.len()).rev() {
            if let Some(range) = self.ranges.get(&path.truncated(len)) {
                return *range;
            }
        }
        Range::point(Position::new(1, 1))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
