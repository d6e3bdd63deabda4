//! Indentation-driven decoder for the YAML subset used by workflow files.
//!
//! Lines are processed one at a time against a stack of open containers.
//! Before a line is handled, frames are closed until the top frame's indent is
//! strictly less than the line's indent; a closed frame is attached to its
//! parent. Malformed indentation never fails: the line simply lands in
//! whatever frame is on top.

use tracing::trace;

use super::value::{Mapping, Value};
use crate::error::{ParseError, ParseResult};

/// Decode YAML text into a generic value tree.
///
/// The result is always a mapping or a sequence at the root. An empty or
/// comment-only document decodes to an empty mapping.
pub fn decode(input: &str) -> ParseResult<Value> {
    let mut decoder = Decoder::new();
    for (idx, raw) in input.lines().enumerate() {
        decoder.line_no = idx + 1;
        decoder.feed(raw)?;
    }
    decoder.finish()
}

/// Container under construction. `Pending` is a `key:` whose children have
/// not revealed whether they form a mapping or a sequence yet.
#[derive(Debug)]
enum Container {
    Pending,
    Mapping(Mapping),
    Sequence(Vec<Value>),
}

impl Container {
    fn insert(&mut self, key: String, value: Value) {
        match self {
            Container::Pending => {
                let mut map = Mapping::new();
                map.insert(key, value);
                *self = Container::Mapping(map);
            }
            Container::Mapping(map) => {
                map.insert(key, value);
            }
            Container::Sequence(items) => {
                // A key line that lands inside a sequence becomes its own item.
                let mut map = Mapping::new();
                map.insert(key, value);
                items.push(Value::Mapping(map));
            }
        }
    }

    fn push(&mut self, value: Value) {
        match self {
            Container::Pending => *self = Container::Sequence(vec![value]),
            Container::Sequence(items) => items.push(value),
            Container::Mapping(_) => {
                trace!(kind = value.type_name(), "dropping sequence item inside mapping");
            }
        }
    }

    fn into_value(self) -> Value {
        match self {
            Container::Pending => Value::Mapping(Mapping::new()),
            Container::Mapping(map) => Value::Mapping(map),
            Container::Sequence(items) => Value::Sequence(items),
        }
    }
}

/// Where a frame's value goes once the frame is closed.
#[derive(Debug)]
enum Slot {
    Root,
    Key(String),
    Item,
}

#[derive(Debug)]
struct Frame {
    indent: isize,
    container: Container,
    slot: Slot,
}

impl Frame {
    /// A `key:` frame may own a sequence written at its own indent
    /// (`steps:` followed by `- run: ...` in the same column).
    fn accepts_compact_sequence(&self) -> bool {
        matches!(self.slot, Slot::Key(_))
            && matches!(self.container, Container::Pending | Container::Sequence(_))
    }
}

struct Decoder {
    stack: Vec<Frame>,
    /// Column of the key that opened a block scalar; deeper lines are skipped.
    block_scalar_owner: Option<usize>,
    line_no: usize,
}

impl Decoder {
    fn new() -> Self {
        Self {
            stack: vec![Frame {
                indent: -1,
                container: Container::Pending,
                slot: Slot::Root,
            }],
            block_scalar_owner: None,
            line_no: 0,
        }
    }

    fn feed(&mut self, raw: &str) -> ParseResult<()> {
        let Some(indent) = raw.find(|c: char| !c.is_whitespace()) else {
            return Ok(());
        };

        if let Some(owner) = self.block_scalar_owner {
            if indent > owner {
                return Ok(());
            }
            self.block_scalar_owner = None;
        }

        let content = raw[indent..].trim_end();
        if content.starts_with('#') {
            return Ok(());
        }

        self.close_frames(indent, sequence_item(content).is_some())?;
        self.line(content, indent)
    }

    fn close_frames(&mut self, indent: usize, is_item: bool) -> ParseResult<()> {
        let indent = indent as isize;
        while self.stack.len() > 1 {
            let top = self.top()?;
            let keep = top.indent < indent
                || (is_item && top.indent == indent && top.accepts_compact_sequence());
            if keep {
                break;
            }
            self.pop()?;
        }
        Ok(())
    }

    fn line(&mut self, content: &str, column: usize) -> ParseResult<()> {
        if let Some(rest) = sequence_item(content) {
            let offset = content.len() - rest.len();
            return self.sequence_item(rest, column, column + offset);
        }
        match split_mapping(content) {
            Some((key, value)) => self.mapping_entry(key, value, column),
            None => {
                trace!(line = self.line_no, "ignoring line without a mapping key");
                Ok(())
            }
        }
    }

    fn sequence_item(&mut self, rest: &str, column: usize, item_column: usize) -> ParseResult<()> {
        if rest.is_empty() || rest.starts_with('#') {
            self.push_frame(column, Container::Pending, Slot::Item);
            return Ok(());
        }

        if sequence_item(rest).is_some() {
            self.push_frame(column, Container::Sequence(Vec::new()), Slot::Item);
            return self.line(rest, item_column);
        }

        if !starts_flow_or_quote(rest) {
            if let Some((key, value)) = split_mapping(rest) {
                self.push_frame(column, Container::Mapping(Mapping::new()), Slot::Item);
                return self.mapping_entry(key, value, item_column);
            }
        }

        let value = parse_scalar(strip_comment(rest));
        self.top_mut()?.container.push(value);
        Ok(())
    }

    fn mapping_entry(&mut self, key: &str, value: &str, column: usize) -> ParseResult<()> {
        let key = unquote(key.trim()).to_string();
        let value = strip_comment(value).trim();

        if value.is_empty() {
            self.push_frame(column, Container::Pending, Slot::Key(key));
        } else if value.starts_with('|') || value.starts_with('>') {
            // Block scalar content is not reconstructed.
            self.top_mut()?
                .container
                .insert(key, Value::String(String::new()));
            self.block_scalar_owner = Some(column);
        } else {
            let parsed = parse_scalar(value);
            self.top_mut()?.container.insert(key, parsed);
        }
        Ok(())
    }

    fn push_frame(&mut self, column: usize, container: Container, slot: Slot) {
        self.stack.push(Frame {
            indent: column as isize,
            container,
            slot,
        });
    }

    fn pop(&mut self) -> ParseResult<()> {
        let frame = self.stack.pop().ok_or_else(|| self.lost_root())?;
        if matches!(frame.slot, Slot::Root) {
            return Err(self.lost_root());
        }
        let value = frame.container.into_value();
        let parent = self.top_mut()?;
        match frame.slot {
            Slot::Key(key) => parent.container.insert(key, value),
            Slot::Item | Slot::Root => parent.container.push(value),
        }
        Ok(())
    }

    fn finish(mut self) -> ParseResult<Value> {
        while self.stack.len() > 1 {
            self.pop()?;
        }
        let root = self.stack.pop().ok_or_else(|| self.lost_root())?;
        Ok(root.container.into_value())
    }

    fn top(&self) -> ParseResult<&Frame> {
        self.stack.last().ok_or_else(|| self.lost_root())
    }

    fn top_mut(&mut self) -> ParseResult<&mut Frame> {
        let line = self.line_no;
        self.stack
            .last_mut()
            .ok_or_else(|| ParseError::new("YAML decoder lost its root frame").at(line, 1))
    }

    fn lost_root(&self) -> ParseError {
        ParseError::new("YAML decoder lost its root frame").at(self.line_no, 1)
    }
}

/// If `content` is a block sequence item, return the text after the dash.
fn sequence_item(content: &str) -> Option<&str> {
    if content == "-" {
        Some("")
    } else {
        content.strip_prefix("- ").map(str::trim_start)
    }
}

fn starts_flow_or_quote(s: &str) -> bool {
    s.starts_with(['[', '{', '"', '\''])
}

/// Split `key: value` at the first colon that sits outside quotes and
/// brackets and is followed by whitespace or the end of the text.
fn split_mapping(content: &str) -> Option<(&str, &str)> {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut chars = content.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '{') => depth += 1,
            (None, ']' | '}') => depth = depth.saturating_sub(1),
            (None, ':') if depth == 0 => {
                let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
                if at_boundary {
                    return Some((&content[..idx], &content[idx + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove a trailing ` # comment` that sits outside quotes.
fn strip_comment(value: &str) -> &str {
    if value.starts_with('#') {
        return "";
    }
    let mut quote: Option<char> = None;
    let mut prev_is_space = false;
    for (idx, c) in value.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') if idx == 0 || prev_is_space => quote = Some(c),
            (None, '#') if prev_is_space => return value[..idx].trim_end(),
            _ => {}
        }
        prev_is_space = c.is_whitespace();
    }
    value
}

fn unquote(token: &str) -> &str {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &token[1..token.len() - 1];
        }
    }
    token
}

/// Coerce a scalar or flow collection token into a value.
fn parse_scalar(token: &str) -> Value {
    let token = token.trim();

    let unquoted = unquote(token);
    if unquoted.len() != token.len() {
        return Value::String(unquoted.to_string());
    }

    match token {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" | "~" => return Value::Null,
        _ => {}
    }

    if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return Value::Sequence(split_flow(inner).into_iter().map(parse_scalar).collect());
    }

    if let Some(inner) = token.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        let mut map = Mapping::new();
        for entry in split_flow(inner) {
            match split_mapping(entry) {
                Some((key, value)) => {
                    map.insert(unquote(key.trim()).to_string(), parse_scalar(value));
                }
                None => {
                    map.insert(unquote(entry).to_string(), Value::Null);
                }
            }
        }
        return Value::Mapping(map);
    }

    if let Some(n) = parse_number(token) {
        return Value::Number(n);
    }

    Value::String(token.to_string())
}

fn parse_number(token: &str) -> Option<f64> {
    let first = token.chars().next()?;
    if !(first.is_ascii_digit() || matches!(first, '-' | '+' | '.')) {
        return None;
    }
    token.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Split the inside of a flow collection on top-level commas.
fn split_flow(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, c) in inner.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '{') => depth += 1,
            (None, ']' | '}') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(inner[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(inner[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_map(yaml: &str) -> Mapping {
        match decode(yaml).unwrap() {
            Value::Mapping(m) => m,
            other => panic!("Expected mapping, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_scalar_coercion() {
        assert_eq!(parse_scalar("true"), Value::Bool(true));
        assert_eq!(parse_scalar("false"), Value::Bool(false));
        assert_eq!(parse_scalar("null"), Value::Null);
        assert_eq!(parse_scalar("~"), Value::Null);
        assert_eq!(parse_scalar("42"), Value::Number(42.0));
        assert_eq!(parse_scalar("-1.5"), Value::Number(-1.5));
        assert_eq!(parse_scalar("'quoted'"), Value::String("quoted".into()));
        assert_eq!(parse_scalar("\"true\""), Value::String("true".into()));
        assert_eq!(parse_scalar("18.x"), Value::String("18.x".into()));
        assert_eq!(parse_scalar("inf"), Value::String("inf".into()));
        assert_eq!(
            parse_scalar("ubuntu-latest"),
            Value::String("ubuntu-latest".into())
        );
    }

    #[test]
    fn test_quotes_are_stripped_without_escape_processing() {
        assert_eq!(
            parse_scalar(r#""a\nb""#),
            Value::String(r"a\nb".into())
        );
    }

    #[test]
    fn test_flow_collections() {
        assert_eq!(
            parse_scalar("[build, 'lint', 3]"),
            Value::Sequence(vec![
                Value::String("build".into()),
                Value::String("lint".into()),
                Value::Number(3.0),
            ])
        );
        assert_eq!(parse_scalar("[]"), Value::Sequence(vec![]));
        assert_eq!(parse_scalar("{}"), Value::Mapping(Mapping::new()));

        let nested = parse_scalar("{ os: [a, b], \"x, y\": 1 }");
        assert_eq!(nested.get("os").and_then(Value::as_sequence).map(<[_]>::len), Some(2));
        assert_eq!(nested.get("x, y"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_nested_mappings() {
        let root = decode_map(
            r#"
name: CI
on:
  push:
    branches: [main]
jobs:
  build:
    runs-on: ubuntu-latest
"#,
        );
        assert_eq!(root["name"], Value::String("CI".into()));
        let branches = root["on"].get("push").and_then(|p| p.get("branches")).unwrap();
        assert_eq!(branches, &Value::Sequence(vec![Value::String("main".into())]));
        assert_eq!(
            root["jobs"].get("build").and_then(|b| b.get("runs-on")),
            Some(&Value::String("ubuntu-latest".into()))
        );
    }

    #[test]
    fn test_block_sequence_of_mappings() {
        let root = decode_map(
            r#"
steps:
  - uses: actions/checkout@v4
    with:
      fetch-depth: 0
  - name: Test
    run: cargo test
  - plain
"#,
        );
        let steps = root["steps"].as_sequence().unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[0].get("uses"),
            Some(&Value::String("actions/checkout@v4".into()))
        );
        assert_eq!(
            steps[0].get("with").and_then(|w| w.get("fetch-depth")),
            Some(&Value::Number(0.0))
        );
        assert_eq!(steps[1].get("run"), Some(&Value::String("cargo test".into())));
        assert_eq!(steps[2], Value::String("plain".into()));
    }

    #[test]
    fn test_compact_sequence_at_key_indent() {
        let root = decode_map(
            r#"
job:
  needs:
  - build
  - lint
  name: after
"#,
        );
        let job = &root["job"];
        assert_eq!(
            job.get("needs"),
            Some(&Value::Sequence(vec![
                Value::String("build".into()),
                Value::String("lint".into()),
            ]))
        );
        assert_eq!(job.get("name"), Some(&Value::String("after".into())));
    }

    #[test]
    fn test_nested_sequences() {
        let root = decode_map("matrix:\n  - - a\n    - b\n  - - c\n");
        assert_eq!(
            root["matrix"],
            Value::Sequence(vec![
                Value::Sequence(vec![Value::String("a".into()), Value::String("b".into())]),
                Value::Sequence(vec![Value::String("c".into())]),
            ])
        );
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let root = decode_map(
            "# header\n\nname: x # trailing\n  # indented comment\nurl: 'a # b'\n",
        );
        assert_eq!(root["name"], Value::String("x".into()));
        assert_eq!(root["url"], Value::String("a # b".into()));
        assert_eq!(root.len(), 2);
    }

    #[test]
    fn test_block_scalar_resolves_to_empty_string() {
        let root = decode_map(
            r#"
steps:
  - run: |
      echo "key: value"
      cargo build
    name: build
folded: >
  some text
after: 1
"#,
        );
        let step = &root["steps"].as_sequence().unwrap()[0];
        assert_eq!(step.get("run"), Some(&Value::String(String::new())));
        assert_eq!(step.get("name"), Some(&Value::String("build".into())));
        assert!(step.get("echo \"key").is_none());
        assert_eq!(root["folded"], Value::String(String::new()));
        assert_eq!(root["after"], Value::Number(1.0));
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let root = decode_map("a: 1\nb: 2\na: 3\n");
        assert_eq!(root["a"], Value::Number(3.0));
        assert_eq!(root.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_block_is_empty_mapping() {
        let root = decode_map("jobs:\n");
        assert_eq!(root["jobs"], Value::Mapping(Mapping::new()));
        assert_eq!(decode("").unwrap(), Value::Mapping(Mapping::new()));
    }

    #[test]
    fn test_lines_without_colon_are_ignored() {
        let root = decode_map("---\njust text\nkey: value\nhttp://example.com\n");
        assert_eq!(root.len(), 1);
        assert_eq!(root["key"], Value::String("value".into()));
    }

    #[test]
    fn test_colon_inside_value_is_kept() {
        let root = decode_map("run: echo a:b\nurl: https://example.com:8080/x\n");
        assert_eq!(root["run"], Value::String("echo a:b".into()));
        assert_eq!(root["url"], Value::String("https://example.com:8080/x".into()));
    }

    #[test]
    fn test_malformed_indentation_degrades() {
        let root = decode_map("a:\n    deep: 1\n  shallow: 2\nb: 3\n");
        let a = root["a"].as_mapping().unwrap();
        assert_eq!(a["deep"], Value::Number(1.0));
        assert_eq!(a["shallow"], Value::Number(2.0));
        assert_eq!(root["b"], Value::Number(3.0));
    }

    #[test]
    fn test_root_sequence() {
        assert_eq!(
            decode("- a\n- b\n").unwrap(),
            Value::Sequence(vec![Value::String("a".into()), Value::String("b".into())])
        );
    }
}
