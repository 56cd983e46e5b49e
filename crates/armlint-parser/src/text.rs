//! Text parser that builds a value tree together with its location index.
//!
//! JSON and YAML documents go through the same event stream (YAML is a JSON
//! superset), so every node gets a start/end range in the original text.

use std::collections::HashMap;

use armlint_core::{JsonPath, Range};
use serde_json::{Map, Number, Value};
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::error::ParserError;
use crate::location::{LineIndex, LocationIndex};

const BOM: char = '\u{feff}';

/// Parse document text into a value tree plus the location of every node.
///
/// A leading byte order mark is skipped; positions still count it.
pub fn parse(text: &str) -> Result<(Value, LocationIndex), ParserError> {
    let (body, offset) = match text.strip_prefix(BOM) {
        Some(body) => (body, 1),
        None => (text, 0),
    };
    let mut builder = TreeBuilder::new(text, offset);
    let mut parser = Parser::new_from_str(body);

    if let Err(err) = parser.load(&mut builder, false) {
        let at = builder.lines.position(builder.at(err.marker()));
        return Err(ParserError::Parse {
            message: err.info().to_string(),
            line: at.line,
            column: at.column,
        });
    }

    builder.finish()
}

enum Frame {
    Sequence {
        path: JsonPath,
        start: usize,
        anchor: usize,
        items: Vec<Value>,
    },
    Mapping {
        path: JsonPath,
        start: usize,
        anchor: usize,
        entries: Map<String, Value>,
        pending_key: Option<String>,
    },
}

struct TreeBuilder {
    chars: Vec<char>,
    /// Characters skipped ahead of the parsed body
    offset: usize,
    lines: LineIndex,
    stack: Vec<Frame>,
    anchors: HashMap<usize, Value>,
    locations: LocationIndex,
    root: Option<Value>,
    error: Option<ParserError>,
}

impl TreeBuilder {
    fn new(text: &str, offset: usize) -> Self {
        Self {
            chars: text.chars().collect(),
            offset,
            lines: LineIndex::new(text),
            stack: Vec::new(),
            anchors: HashMap::new(),
            locations: LocationIndex::default(),
            root: None,
            error: None,
        }
    }

    /// Character offset of `marker` in the full text.
    fn at(&self, marker: &Marker) -> usize {
        marker.index() + self.offset
    }

    fn finish(self) -> Result<(Value, LocationIndex), ParserError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        match self.root {
            Some(root) => Ok((root, self.locations)),
            None => Err(ParserError::Parse {
                message: "document is empty".to_string(),
                line: 1,
                column: 1,
            }),
        }
    }

    /// Path of the next node, or `None` when the next node is a mapping key.
    fn next_path(&self) -> Option<JsonPath> {
        match self.stack.last() {
            None => Some(JsonPath::root()),
            Some(Frame::Sequence { path, items, .. }) => Some(path.child(items.len())),
            Some(Frame::Mapping {
                path,
                pending_key: Some(key),
                ..
            }) => Some(path.child(key.as_str())),
            Some(Frame::Mapping {
                pending_key: None, ..
            }) => None,
        }
    }

    fn set_key(&mut self, key: String) {
        if let Some(Frame::Mapping { pending_key, .. }) = self.stack.last_mut() {
            *pending_key = Some(key);
        }
    }

    fn complete(&mut self, value: Value) {
        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(Frame::Sequence { items, .. }) => items.push(value),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => {
                if let Some(key) = pending_key.take() {
                    entries.insert(key, value);
                }
            }
        }
    }

    fn record(&mut self, path: JsonPath, start: usize, end: usize) {
        let range = Range::new(self.lines.position(start), self.lines.position(end));
        self.locations.insert(path, range);
    }

    fn fail(&mut self, message: &str, marker: &Marker) {
        let at = self.lines.position(self.at(marker));
        self.error = Some(ParserError::Parse {
            message: message.to_string(),
            line: at.line,
            column: at.column,
        });
    }

    fn scalar_end(&self, start: usize, value: &str, style: TScalarStyle) -> usize {
        let quote = match style {
            TScalarStyle::DoubleQuoted => '"',
            TScalarStyle::SingleQuoted => '\'',
            _ => return (start + value.chars().count()).min(self.chars.len()),
        };

        let mut i = if self.chars.get(start) == Some(&quote) {
            start + 1
        } else {
            start
        };
        while i < self.chars.len() {
            let c = self.chars[i];
            if quote == '"' && c == '\\' {
                i += 2;
                continue;
            }
            if c == quote {
                if quote == '\'' && self.chars.get(i + 1) == Some(&'\'') {
                    i += 2;
                    continue;
                }
                return i + 1;
            }
            i += 1;
        }
        self.chars.len()
    }

    fn container_end(&self, marker_index: usize) -> usize {
        match self.chars.get(marker_index) {
            Some('}') | Some(']') => marker_index + 1,
            _ => {
                // block collections end where the next token starts
                let mut end = marker_index.min(self.chars.len());
                while end > 0 && self.chars[end - 1].is_whitespace() {
                    end -= 1;
                }
                end
            }
        }
    }

    fn alias_end(&self, start: usize) -> usize {
        let mut end = start + 1;
        while end < self.chars.len() {
            let c = self.chars[end];
            if c.is_whitespace() || matches!(c, ',' | ']' | '}') {
                break;
            }
            end += 1;
        }
        end
    }

    fn remember_anchor(&mut self, anchor: usize, value: &Value) {
        if anchor > 0 {
            self.anchors.insert(anchor, value.clone());
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }

        let at = self.at(&marker);
        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(value, style, anchor, _tag) => match self.next_path() {
                None => self.set_key(value),
                Some(path) => {
                    let node = scalar_value(&value, style);
                    let end = self.scalar_end(at, &value, style);
                    self.record(path, at, end);
                    self.remember_anchor(anchor, &node);
                    self.complete(node);
                }
            },

            Event::Alias(anchor) => {
                let target = self.anchors.get(&anchor).cloned().unwrap_or(Value::Null);
                match self.next_path() {
                    None => match target {
                        Value::String(key) => self.set_key(key),
                        _ => self.fail("mapping keys must be scalars", &marker),
                    },
                    Some(path) => {
                        let end = self.alias_end(at);
                        self.record(path, at, end);
                        self.complete(target);
                    }
                }
            }

            Event::SequenceStart(anchor, _tag) => match self.next_path() {
                None => self.fail("mapping keys must be scalars", &marker),
                Some(path) => self.stack.push(Frame::Sequence {
                    path,
                    start: at,
                    anchor,
                    items: Vec::new(),
                }),
            },

            Event::MappingStart(anchor, _tag) => match self.next_path() {
                None => self.fail("mapping keys must be scalars", &marker),
                Some(path) => self.stack.push(Frame::Mapping {
                    path,
                    start: at,
                    anchor,
                    entries: Map::new(),
                    pending_key: None,
                }),
            },

            Event::SequenceEnd | Event::MappingEnd => {
                let (path, start, anchor, node) = match self.stack.pop() {
                    Some(Frame::Sequence {
                        path,
                        start,
                        anchor,
                        items,
                    }) => (path, start, anchor, Value::Array(items)),
                    Some(Frame::Mapping {
                        path,
                        start,
                        anchor,
                        entries,
                        ..
                    }) => (path, start, anchor, Value::Object(entries)),
                    None => {
                        self.fail("unbalanced collection end", &marker);
                        return;
                    }
                };
                let end = self.container_end(at);
                self.record(path, start, end);
                self.remember_anchor(anchor, &node);
                self.complete(node);
            }
        }
    }
}

fn looks_numeric(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

fn scalar_value(value: &str, style: TScalarStyle) -> Value {
    if !matches!(style, TScalarStyle::Plain) {
        return Value::String(value.to_string());
    }

    match value {
        "null" | "Null" | "NULL" | "~" | "" => Value::Null,
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ if looks_numeric(value) => {
            if let Ok(i) = value.parse::<i64>() {
                Value::Number(i.into())
            } else if let Ok(u) = value.parse::<u64>() {
                Value::Number(u.into())
            } else {
                value
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(value.to_string()))
            }
        }
        _ => Value::String(value.to_string()),
    }
}
