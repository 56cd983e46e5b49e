//! Path queries used by rules to pick the nodes they inspect
//!
//! Supported forms: `$`, `.name`, `['name']`, `.*`, `[*]`, `[n]`,
//! `['a','b']`, `..name`, `..*`, and the filters `[?(@.f)]`,
//! `[?(@.f == 'x')]`, `[?(@.f != 'x')]`. Matches come back in document order.

use std::fmt;
use std::str::FromStr;

use armlint_core::JsonPath;
use serde_json::Value;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Child(String),
    Union(Vec<String>),
    Wildcard,
    Index(usize),
    /// `..name`, or `..*` when `None`
    Descendant(Option<String>),
    Filter(Filter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    field: Vec<String>,
    test: Option<(Comparison, Value)>,
}

impl Filter {
    fn matches(&self, candidate: &Value) -> bool {
        let target = self
            .field
            .iter()
            .try_fold(candidate, |node, key| node.as_object()?.get(key));
        match &self.test {
            None => target.is_some(),
            Some((Comparison::Eq, literal)) => target == Some(literal),
            Some((Comparison::Ne, literal)) => target != Some(literal),
        }
    }
}

/// A compiled query. Compile once when the rule is built, run against every
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    steps: Vec<Step>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, EngineError> {
        let steps = Cursor::new(source).selector()?;
        Ok(Self {
            source: source.trim().to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Every node matched in `root`, with its path relative to `root`.
    pub fn query<'v>(&self, root: &'v Value) -> Vec<(JsonPath, &'v Value)> {
        let mut current = vec![(JsonPath::root(), root)];
        for step in &self.steps {
            let mut next = Vec::new();
            for (path, value) in &current {
                apply(step, path, value, &mut next);
            }
            current = next;
        }
        current
    }

    pub fn first<'v>(&self, root: &'v Value) -> Option<(JsonPath, &'v Value)> {
        self.query(root).into_iter().next()
    }
}

impl FromStr for Selector {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn apply<'v>(step: &Step, path: &JsonPath, value: &'v Value, out: &mut Vec<(JsonPath, &'v Value)>) {
    match step {
        Step::Child(name) => push_key(path, value, name, out),
        Step::Union(names) => {
            for name in names {
                push_key(path, value, name, out);
            }
        }
        Step::Wildcard => children(path, value, out),
        Step::Index(index) => {
            if let Some(item) = value.as_array().and_then(|items| items.get(*index)) {
                out.push((path.child(*index), item));
            }
        }
        Step::Descendant(name) => descend(path, value, name.as_deref(), out),
        Step::Filter(filter) => {
            let mut candidates = Vec::new();
            children(path, value, &mut candidates);
            out.extend(candidates.into_iter().filter(|(_, v)| filter.matches(v)));
        }
    }
}

fn push_key<'v>(
    path: &JsonPath,
    value: &'v Value,
    key: &str,
    out: &mut Vec<(JsonPath, &'v Value)>,
) {
    if let Some(child) = value.as_object().and_then(|map| map.get(key)) {
        out.push((path.child(key), child));
    }
}

fn children<'v>(path: &JsonPath, value: &'v Value, out: &mut Vec<(JsonPath, &'v Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                out.push((path.child(key.as_str()), child));
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                out.push((path.child(index), item));
            }
        }
        _ => {}
    }
}

fn descend<'v>(
    path: &JsonPath,
    value: &'v Value,
    name: Option<&str>,
    out: &mut Vec<(JsonPath, &'v Value)>,
) {
    if let Some(name) = name {
        push_key(path, value, name, out);
    }

    let mut kids = Vec::new();
    children(path, value, &mut kids);
    for (kid_path, kid) in kids {
        if name.is_none() {
            out.push((kid_path.clone(), kid));
        }
        descend(&kid_path, kid, name, out);
    }
}

struct Cursor<'s> {
    source: &'s str,
    chars: Vec<char>,
    pos: usize,
}

impl<'s> Cursor<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            chars: source.trim().chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: &str) -> EngineError {
        EngineError::SelectorSyntax {
            selector: self.source.to_string(),
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        let len = s.chars().count();
        let matches = self
            .chars
            .get(self.pos..self.pos + len)
            .is_some_and(|window| window.iter().copied().eq(s.chars()));
        if matches {
            self.pos += len;
        }
        matches
    }

    fn expect(&mut self, c: char) -> Result<(), EngineError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", c)))
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn selector(&mut self) -> Result<Vec<Step>, EngineError> {
        if !self.eat('$') {
            return Err(self.error("selector must start with '$'"));
        }

        let mut steps = Vec::new();
        while !self.at_end() {
            let step = if self.eat_str("..") {
                if self.eat('*') {
                    Step::Descendant(None)
                } else if self.eat('[') {
                    let name = self.quoted()?;
                    self.expect(']')?;
                    Step::Descendant(Some(name))
                } else {
                    Step::Descendant(Some(self.name()?))
                }
            } else if self.eat('.') {
                if self.eat('*') {
                    Step::Wildcard
                } else {
                    Step::Child(self.name()?)
                }
            } else if self.eat('[') {
                self.skip_ws();
                let step = self.bracket()?;
                self.skip_ws();
                self.expect(']')?;
                step
            } else {
                return Err(self.error("expected '.', '..' or '['"));
            };
            steps.push(step);
        }
        Ok(steps)
    }

    fn bracket(&mut self) -> Result<Step, EngineError> {
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                Ok(Step::Wildcard)
            }
            Some('\'') | Some('"') => {
                let mut names = vec![self.quoted()?];
                loop {
                    self.skip_ws();
                    if !self.eat(',') {
                        break;
                    }
                    self.skip_ws();
                    names.push(self.quoted()?);
                }
                if names.len() == 1 {
                    Ok(Step::Child(names.remove(0)))
                } else {
                    Ok(Step::Union(names))
                }
            }
            Some('?') => {
                self.pos += 1;
                self.expect('(')?;
                let filter = self.filter()?;
                self.skip_ws();
                self.expect(')')?;
                Ok(Step::Filter(filter))
            }
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                digits
                    .parse()
                    .map(Step::Index)
                    .map_err(|_| self.error("index out of range"))
            }
            _ => Err(self.error("expected '*', a quoted name, an index or a filter")),
        }
    }

    fn name(&mut self) -> Result<String, EngineError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| {
            !matches!(c, '.' | '[' | ']' | '(' | ')' | '=' | '!') && !c.is_whitespace()
        }) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn quoted(&mut self) -> Result<String, EngineError> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted name")),
        };
        self.pos += 1;

        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => out.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => out.push(c),
            }
            self.pos += 1;
        }
    }

    fn filter(&mut self) -> Result<Filter, EngineError> {
        self.skip_ws();
        self.expect('@')?;

        let mut field = Vec::new();
        loop {
            if self.eat('.') {
                field.push(self.name()?);
            } else if self.peek() == Some('[') {
                self.pos += 1;
                field.push(self.quoted()?);
                self.expect(']')?;
            } else {
                break;
            }
        }
        if field.is_empty() {
            return Err(self.error("filter needs a field after '@'"));
        }

        self.skip_ws();
        let comparison = if self.eat_str("==") {
            Comparison::Eq
        } else if self.eat_str("!=") {
            Comparison::Ne
        } else {
            return Ok(Filter { field, test: None });
        };
        self.skip_ws();
        let literal = self.literal()?;
        Ok(Filter {
            field,
            test: Some((comparison, literal)),
        })
    }

    fn literal(&mut self) -> Result<Value, EngineError> {
        if matches!(self.peek(), Some('\'') | Some('"')) {
            return self.quoted().map(Value::String);
        }
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ')' && !c.is_whitespace()) {
            self.pos += 1;
        }
        let token: String = self.chars[start..self.pos].iter().collect();
        serde_json::from_str(&token)
            .map_err(|_| self.error("expected a string, number, boolean or null"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn paths(selector: &str, doc: &Value) -> Vec<String> {
        Selector::parse(selector)
            .unwrap()
            .query(doc)
            .into_iter()
            .map(|(p, _)| p.to_string())
            .collect()
    }

    fn doc() -> Value {
        json!({
            "paths": {
                "/a": {
                    "put": {"operationId": "A_Put"},
                    "delete": {
                        "parameters": [
                            {"name": "x", "in": "path"},
                            {"name": "body", "in": "body"}
                        ]
                    }
                },
                "/b": {"get": {"operationId": "B_Get"}}
            },
            "x-ms-paths": {"/c?op": {"put": {"operationId": "C_Put"}}}
        })
    }

    #[test]
    fn test_root() {
        assert_eq!(paths("$", &doc()), vec!["$"]);
    }

    #[test]
    fn test_wildcards_keep_document_order() {
        assert_eq!(
            paths("$.paths.*.*", &doc()),
            vec!["$.paths['/a'].put", "$.paths['/a'].delete", "$.paths['/b'].get"]
        );
    }

    #[test]
    fn test_bracket_names_and_unions() {
        assert_eq!(
            paths("$['x-ms-paths'][*].put", &doc()),
            vec!["$['x-ms-paths']['/c?op'].put"]
        );
        assert_eq!(
            paths("$.paths['/a']['delete','put']", &doc()),
            vec!["$.paths['/a'].delete", "$.paths['/a'].put"]
        );
    }

    #[test]
    fn test_index_and_filters() {
        assert_eq!(
            paths("$.paths.*.delete.parameters[1]", &doc()),
            vec!["$.paths['/a'].delete.parameters[1]"]
        );
        assert_eq!(
            paths("$.paths.*.delete.parameters[?(@.in == 'body')]", &doc()),
            vec!["$.paths['/a'].delete.parameters[1]"]
        );
        assert_eq!(
            paths("$.paths.*.delete.parameters[?(@.in != 'body')]", &doc()),
            vec!["$.paths['/a'].delete.parameters[0]"]
        );
        assert_eq!(
            paths("$.paths.*[?(@.operationId)]", &doc()),
            vec!["$.paths['/a'].put", "$.paths['/b'].get"]
        );
    }

    #[test]
    fn test_recursive_descent() {
        assert_eq!(
            paths("$..operationId", &doc()),
            vec![
                "$.paths['/a'].put.operationId",
                "$.paths['/b'].get.operationId",
                "$['x-ms-paths']['/c?op'].put.operationId"
            ]
        );
        let all = Selector::parse("$.paths['/b']..*").unwrap().query(&doc()).len();
        assert_eq!(all, 2);
    }

    #[test]
    fn test_numeric_literal_filter() {
        let value = json!({"items": [{"n": 1}, {"n": 2}]});
        assert_eq!(paths("$.items[?(@.n == 2)]", &value), vec!["$.items[1]"]);
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["paths", "$.", "$[", "$['open", "$[?(@ == 1)]", "$.a b", "$[?(@.a == )]"] {
            assert!(
                matches!(Selector::parse(bad), Err(EngineError::SelectorSyntax { .. })),
                "{} should not compile",
                bad
            );
        }
    }

    #[test]
    fn test_relative_query_on_match() {
        let field =
            Selector::parse("$['x-ms-long-running-operation-options']['final-state-via']").unwrap();
        let op = json!({"x-ms-long-running-operation-options": {"final-state-via": "location"}});
        let (path, value) = field.first(&op).unwrap();
        assert_eq!(value, &json!("location"));
        assert_eq!(path.len(), 2);
    }
}
