//! Placeholder templates.
//! A template is a path string with `{name}` or `{name:spec}` slots. It can be
//! rendered strictly, partially or as a glob pattern, and parsed back out of a
//! concrete path.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::constants::{SEPARATOR, WILDCARD};
use crate::error::{PathtreesError, PathtreesResult};
use crate::format_spec::{display_value, FormatSpec};

/// Slot values, keyed by placeholder name.
pub type Data = IndexMap<String, Value>;

/// What a placeholder captures when no spec narrows it down: one path segment.
pub(crate) const SEGMENT_PATTERN: &str = r"[^/]+?";

/// A single `{name}` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub spec: Option<FormatSpec>,
}

impl Field {
    /// Writes the placeholder back out in template syntax.
    fn raw(&self) -> String {
        match &self.spec {
            Some(spec) => format!("{{{}:{}}}", self.name, spec.as_str()),
            None => format!("{{{}}}", self.name),
        }
    }

    fn pattern(&self) -> String {
        match &self.spec {
            Some(spec) => spec.pattern(),
            None => SEGMENT_PATTERN.to_string(),
        }
    }
}

/// A template consists of literal strings and placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Literal(String),
    Field(Field),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    /// Full rendering that falls back to the plain value when a spec fails.
    Lenient,
    Partial,
    Glob,
}

#[derive(Debug)]
struct Inner {
    raw: String,
    pieces: Vec<Piece>,
    matcher: Regex,
}

/// A parsed placeholder template. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Template {
    inner: Arc<Inner>,
}

impl Template {
    /// Parses `raw`, failing on unbalanced braces or invalid placeholder names.
    pub fn new<S: Into<String>>(raw: S) -> PathtreesResult<Self> {
        let raw = raw.into();
        let pieces = tokenize(&raw)?;
        let matcher = build_matcher(&pieces).map_err(|e| PathtreesError::InvalidTemplate {
            template: raw.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { inner: Arc::new(Inner { raw, pieces, matcher }) })
    }

    fn from_pieces(pieces: Vec<Piece>) -> PathtreesResult<Self> {
        let raw: String = pieces.iter().map(piece_raw).collect();
        Self::new(raw)
    }

    pub fn raw(&self) -> &str {
        &self.inner.raw
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.inner.pieces
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.inner.pieces.iter().filter_map(|piece| match piece {
            Piece::Field(field) => Some(field),
            Piece::Literal(_) => None,
        })
    }

    /// Placeholder names in order of first appearance.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for field in self.fields() {
            if !names.contains(&field.name.as_str()) {
                names.push(&field.name);
            }
        }
        names
    }

    /// Placeholder names with no usable value in `data`.
    pub fn missing(&self, data: &Data) -> Vec<String> {
        self.names()
            .into_iter()
            .filter(|name| lookup(data, name).is_none())
            .map(str::to_string)
            .collect()
    }

    pub fn fully_specified(&self, data: &Data) -> bool {
        self.fields().all(|field| lookup(data, &field.name).is_some())
    }

    /// Substitutes the values present in `data` and keeps every other
    /// placeholder as template syntax. The result is itself a valid template.
    pub fn partial_format(&self, data: &Data) -> String {
        self.render(data, Mode::Partial).unwrap_or_default()
    }

    /// Substitutes every placeholder, failing if any is unbound.
    pub fn format(&self, data: &Data) -> PathtreesResult<String> {
        self.require_bound(data)?;
        self.render(data, Mode::Full)
    }

    /// Like `format`, but a value its format spec can't render is written as
    /// is. Only fails on unbound placeholders.
    pub fn format_lenient(&self, data: &Data) -> PathtreesResult<String> {
        self.require_bound(data)?;
        self.render(data, Mode::Lenient)
    }

    fn require_bound(&self, data: &Data) -> PathtreesResult<()> {
        let missing = self.missing(data);
        if missing.is_empty() {
            return Ok(());
        }
        Err(PathtreesError::MissingKey { target: format!("'{}'", self.raw()), keys: missing })
    }

    /// Like `partial_format` but unbound placeholders become `*`.
    pub fn glob_format(&self, data: &Data) -> String {
        self.render(data, Mode::Glob).unwrap_or_default()
    }

    fn render(&self, data: &Data, mode: Mode) -> PathtreesResult<String> {
        let mut out = String::with_capacity(self.raw().len());
        for piece in self.pieces() {
            match piece {
                Piece::Literal(text) => out.push_str(&literal(text, mode)),
                Piece::Field(field) => match lookup(data, &field.name) {
                    Some(value) => {
                        let rendered = render_value(field, value, mode)?;
                        out.push_str(&literal(&rendered, mode));
                    }
                    None if mode == Mode::Glob => out.push_str(WILDCARD),
                    None => out.push_str(&field.raw()),
                },
            }
        }
        Ok(out)
    }

    /// Extracts slot values from a concrete path.
    ///
    /// Each placeholder matches within a single path segment, so a path with
    /// a different number of segments never matches. Repeated placeholders
    /// must agree on their value.
    pub fn parse(&self, path: &str) -> PathtreesResult<Data> {
        let fail = |reason: String| PathtreesError::ParseError {
            template: self.raw().to_string(),
            path: path.to_string(),
            reason,
        };

        let captures = self.inner.matcher.captures(path).ok_or_else(|| {
            let expected = self.raw().split(SEPARATOR).count();
            let found = path.split(SEPARATOR).count();
            if expected != found {
                fail(format!("expected {expected} segments, found {found}"))
            } else {
                fail("literal text does not match".to_string())
            }
        })?;

        let mut data = Data::new();
        for (i, field) in self.fields().enumerate() {
            let text = captures.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
            let value = match &field.spec {
                Some(spec) => spec.convert(text),
                None => Some(Value::String(text.to_string())),
            }
            .ok_or_else(|| fail(format!("'{}' is not a valid value for {}", text, field.raw())))?;

            match data.get(&field.name) {
                Some(existing) if *existing != value => {
                    return Err(fail(format!(
                        "conflicting values for '{}': {} and {}",
                        field.name, existing, value
                    )));
                }
                Some(_) => {}
                None => {
                    data.insert(field.name.clone(), value);
                }
            }
        }
        Ok(data)
    }

    /// Appends `segment` (itself a template) after a separator.
    pub fn join(&self, segment: &str) -> PathtreesResult<Self> {
        Self::new(join_raw(self.raw(), segment))
    }

    /// The template of the enclosing directory, if there is a separator to cut at.
    pub fn parent(&self) -> Option<Self> {
        let pieces = self.pieces();
        let (index, offset) = pieces.iter().enumerate().rev().find_map(|(i, piece)| match piece {
            Piece::Literal(text) => text.rfind(SEPARATOR).map(|offset| (i, offset)),
            Piece::Field(_) => None,
        })?;

        // the parent of a top-level absolute path is the root itself
        let cut = if index == 0 && offset == 0 { 1 } else { offset };
        let mut head = pieces[..index].to_vec();
        if let Piece::Literal(text) = &pieces[index] {
            if cut > 0 {
                head.push(Piece::Literal(text[..cut].to_string()));
            }
        }
        Self::from_pieces(head).ok()
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.raw() == other.raw()
    }
}

impl Eq for Template {}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

/// Joins two raw templates, skipping empty sides.
pub(crate) fn join_raw(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (false, true) => head.to_string(),
        (false, false) => format!("{}{}{}", head.trim_end_matches(SEPARATOR), SEPARATOR, tail),
    }
}

/// Null means "not bound".
fn lookup<'a>(data: &'a Data, name: &str) -> Option<&'a Value> {
    data.get(name).filter(|value| !value.is_null())
}

fn literal(text: &str, mode: Mode) -> String {
    match mode {
        Mode::Full | Mode::Lenient => text.to_string(),
        Mode::Partial => text.replace('{', "{{").replace('}', "}}"),
        Mode::Glob => text.replace(['{', '}'], "?"),
    }
}

fn render_value(field: &Field, value: &Value, mode: Mode) -> PathtreesResult<String> {
    let Some(spec) = &field.spec else {
        return Ok(display_value(value));
    };
    match spec.apply(value) {
        Some(rendered) => Ok(rendered),
        None if mode == Mode::Full => Err(PathtreesError::FormatSpec {
            name: field.name.clone(),
            spec: spec.as_str().to_string(),
            value: value.to_string(),
        }),
        None => {
            log::warn!("Cannot apply '{}' to {}, rendering it as is", field.raw(), value);
            Ok(display_value(value))
        }
    }
}

fn piece_raw(piece: &Piece) -> String {
    match piece {
        Piece::Literal(text) => literal(text, Mode::Partial),
        Piece::Field(field) => field.raw(),
    }
}

fn build_matcher(pieces: &[Piece]) -> std::result::Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    for piece in pieces {
        match piece {
            Piece::Literal(text) => pattern.push_str(&regex::escape(text)),
            Piece::Field(field) => {
                pattern.push('(');
                pattern.push_str(&field.pattern());
                pattern.push(')');
            }
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn tokenize(raw: &str) -> PathtreesResult<Vec<Piece>> {
    let invalid =
        |reason: String| PathtreesError::InvalidTemplate { template: raw.to_string(), reason };

    let mut pieces = Vec::new();
    let mut literal_buf = String::new();
    let mut chars = raw.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '{' if chars.peek().map(|(_, c)| *c) == Some('{') => {
                chars.next();
                literal_buf.push('{');
            }
            '}' if chars.peek().map(|(_, c)| *c) == Some('}') => {
                chars.next();
                literal_buf.push('}');
            }
            '}' => return Err(invalid(format!("single '}}' at position {pos}"))),
            '{' => {
                let mut body = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    match c {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(invalid(format!("nested '{{' after position {pos}"))),
                        c => body.push(c),
                    }
                }
                if !closed {
                    return Err(invalid(format!("unclosed '{{' at position {pos}")));
                }

                let (name, spec) = match body.split_once(':') {
                    Some((name, spec)) => (name, Some(spec)),
                    None => (body.as_str(), None),
                };
                if !is_identifier(name) {
                    return Err(invalid(format!("'{name}' is not a valid placeholder name")));
                }
                let spec = match spec {
                    Some(spec) => Some(
                        FormatSpec::parse(spec)
                            .ok_or_else(|| invalid(format!("unsupported format spec '{spec}'")))?,
                    ),
                    None => None,
                };

                if !literal_buf.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal_buf)));
                }
                pieces.push(Piece::Field(Field { name: name.to_string(), spec }));
            }
            c => literal_buf.push(c),
        }
    }

    if !literal_buf.is_empty() {
        pieces.push(Piece::Literal(literal_buf));
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tokenize_escapes_and_specs() {
        let template = Template::new("a{{b}}/{x:03d}-{y}").unwrap();
        assert_eq!(
            template.pieces()[0],
            Piece::Literal("a{b}/".to_string())
        );
        assert_eq!(template.names(), vec!["x", "y"]);
    }

    #[test]
    fn test_tokenize_errors() {
        for raw in ["{", "a}", "{}", "{0}", "{a.b}", "{a{b}}", "{x:q}"] {
            assert!(
                matches!(Template::new(raw), Err(PathtreesError::InvalidTemplate { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_partial_keeps_template_valid() {
        let template = Template::new("{{lit}}/{a}/{b:>3}").unwrap();
        let data: Data = [("a".to_string(), json!("x{y}"))].into_iter().collect();
        let partial = template.partial_format(&data);
        assert_eq!(partial, "{{lit}}/x{{y}}/{b:>3}");
        assert_eq!(Template::new(partial).unwrap().names(), vec!["b"]);
    }

    #[test]
    fn test_parent() {
        let template = Template::new("logs/{log_id}/plots/{name}.png").unwrap();
        assert_eq!(template.parent().unwrap().raw(), "logs/{log_id}/plots");
        assert_eq!(Template::new("/root").unwrap().parent().unwrap().raw(), "/");
        assert!(Template::new("file.txt").unwrap().parent().is_none());
    }

    #[test]
    fn test_join_raw() {
        assert_eq!(join_raw("", "a"), "a");
        assert_eq!(join_raw("a", ""), "a");
        assert_eq!(join_raw("a/", "b"), "a/b");
        assert_eq!(join_raw("a", "b"), "a/b");
    }
}
