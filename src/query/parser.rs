//! Hand-written recursive descent parser for selection queries

use serde_json::Value;

use super::QueryError;
use super::ast::{CompareOp, Filter, JsonPath, RelativeStep, Segment, Selector};

/// Parse a query such as `$.items[*]` or `$..products[?(@.url)]`.
pub fn parse(query: &str) -> Result<JsonPath, QueryError> {
    let mut parser = Parser::new(query);
    parser.skip_ws();
    if !parser.eat('$') {
        return Err(parser.error("query must start with '$'"));
    }

    let mut segments = Vec::new();
    loop {
        parser.skip_ws();
        match parser.peek() {
            None => break,
            Some('.') => {
                parser.bump();
                if parser.eat('.') {
                    segments.push(Segment::Descendant(parser.dotted_or_bracket()?));
                } else {
                    segments.push(Segment::Child(parser.dotted()?));
                }
            }
            Some('[') => segments.push(Segment::Child(parser.bracket()?)),
            Some(other) => return Err(parser.error(format!("unexpected character '{other}'"))),
        }
    }

    Ok(JsonPath { segments })
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> QueryError {
        QueryError::Syntax {
            query: self.source.to_string(),
            position: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), QueryError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{expected}'")))
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let end = self.pos + keyword.chars().count();
        if end <= self.chars.len() && self.chars[self.pos..end].iter().copied().eq(keyword.chars()) {
            self.pos = end;
            true
        } else {
            false
        }
    }

    /// After `..`: `*`, a name or a bracket.
    fn dotted_or_bracket(&mut self) -> Result<Selector, QueryError> {
        if self.peek() == Some('[') {
            self.bracket()
        } else {
            self.dotted()
        }
    }

    /// After `.`: `*` or a member name.
    fn dotted(&mut self) -> Result<Selector, QueryError> {
        if self.eat('*') {
            return Ok(Selector::Wildcard);
        }
        let name = self.identifier();
        if name.is_empty() {
            return Err(self.error("expected member name or '*' after '.'"));
        }
        Ok(Selector::Name(name))
    }

    fn identifier(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || matches!(ch, '_' | '-' | '$') {
                name.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }
        name
    }

    fn bracket(&mut self) -> Result<Selector, QueryError> {
        self.expect('[')?;
        self.skip_ws();

        let selector = if self.eat('*') {
            Selector::Wildcard
        } else if self.eat('?') {
            Selector::Filter(self.filter()?)
        } else {
            let mut entries = vec![self.bracket_entry()?];
            self.skip_ws();
            while self.eat(',') {
                self.skip_ws();
                entries.push(self.bracket_entry()?);
                self.skip_ws();
            }
            if entries.len() == 1 {
                entries.remove(0)
            } else {
                Selector::Union(entries)
            }
        };

        self.skip_ws();
        self.expect(']')?;
        Ok(selector)
    }

    /// One entry of a bracket list: quoted name, index or slice.
    fn bracket_entry(&mut self) -> Result<Selector, QueryError> {
        match self.peek() {
            Some('\'' | '"') => Ok(Selector::Name(self.quoted()?)),
            Some(ch) if ch == '-' || ch == ':' || ch.is_ascii_digit() => self.index_or_slice(),
            Some(other) => Err(self.error(format!("unexpected '{other}' in brackets"))),
            None => Err(self.error("unterminated '['")),
        }
    }

    fn index_or_slice(&mut self) -> Result<Selector, QueryError> {
        let first = self.optional_integer()?;
        self.skip_ws();
        if !self.eat(':') {
            return first
                .map(Selector::Index)
                .ok_or_else(|| self.error("expected array index"));
        }

        self.skip_ws();
        let end = self.optional_integer()?;
        self.skip_ws();
        let step = if self.eat(':') {
            self.skip_ws();
            self.optional_integer()?.unwrap_or(1)
        } else {
            1
        };
        if step <= 0 {
            return Err(self.error("slice step must be a positive integer"));
        }

        Ok(Selector::Slice {
            start: first,
            end,
            step,
        })
    }

    fn optional_integer(&mut self) -> Result<Option<i64>, QueryError> {
        let start = self.pos;
        self.eat('-');
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Ok(None);
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits
            .parse::<i64>()
            .map(Some)
            .map_err(|_| self.error(format!("invalid integer '{digits}'")))
    }

    fn quoted(&mut self) -> Result<String, QueryError> {
        let quote = self.bump().ok_or_else(|| self.error("expected quote"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(ch) if ch == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(ch @ ('\\' | '\'' | '"' | '/')) => out.push(ch),
                    Some(other) => return Err(self.error(format!("unknown escape '\\{other}'"))),
                    None => return Err(self.error("unterminated string")),
                },
                Some(ch) => out.push(ch),
            }
        }
    }

    /// After `?`: `(@...)` or `@...`, up to (not including) the closing `]`.
    fn filter(&mut self) -> Result<Filter, QueryError> {
        self.skip_ws();
        let parenthesized = self.eat('(');
        self.skip_ws();
        if !self.eat('@') {
            return Err(self.error("filter must start with '@'"));
        }

        let mut path = Vec::new();
        loop {
            match self.peek() {
                Some('.') => {
                    self.bump();
                    let name = self.identifier();
                    if name.is_empty() {
                        return Err(self.error("expected member name in filter"));
                    }
                    path.push(RelativeStep::Name(name));
                }
                Some('[') => {
                    self.bump();
                    self.skip_ws();
                    let step = match self.peek() {
                        Some('\'' | '"') => RelativeStep::Name(self.quoted()?),
                        _ => RelativeStep::Index(
                            self.optional_integer()?
                                .ok_or_else(|| self.error("expected index in filter"))?,
                        ),
                    };
                    self.skip_ws();
                    self.expect(']')?;
                    path.push(step);
                }
                _ => break,
            }
        }

        self.skip_ws();
        let comparison = match self.compare_op() {
            Some(op) => {
                self.skip_ws();
                Some((op, self.literal()?))
            }
            None => None,
        };

        self.skip_ws();
        if parenthesized {
            self.expect(')')?;
        }
        Ok(Filter { path, comparison })
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        const OPS: [(&str, CompareOp); 6] = [
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ];
        OPS.iter()
            .find(|(token, _)| self.eat_keyword(token))
            .map(|(_, op)| *op)
    }

    fn literal(&mut self) -> Result<Value, QueryError> {
        match self.peek() {
            Some('\'' | '"') => Ok(Value::String(self.quoted()?)),
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.number(),
            _ if self.eat_keyword("true") => Ok(Value::Bool(true)),
            _ if self.eat_keyword("false") => Ok(Value::Bool(false)),
            _ if self.eat_keyword("null") => Ok(Value::Null),
            _ => Err(self.error("expected literal (number, string, true, false, null)")),
        }
    }

    fn number(&mut self) -> Result<Value, QueryError> {
        let start = self.pos;
        self.eat('-');
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+'))
        {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        serde_json::from_str::<serde_json::Number>(&raw)
            .map(Value::Number)
            .map_err(|_| self.error(format!("invalid number '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn parses_root_only() {
        assert_eq!(parse("$").unwrap(), JsonPath { segments: vec![] });
    }

    #[test]
    fn parses_dotted_and_bracketed_members() {
        let path = parse("$.store['book'][0].title").unwrap();
        assert_eq!(
            path.segments,
            vec![
                Segment::Child(Selector::Name("store".into())),
                Segment::Child(Selector::Name("book".into())),
                Segment::Child(Selector::Index(0)),
                Segment::Child(Selector::Name("title".into())),
            ]
        );
    }

    #[test]
    fn parses_wildcards_unions_and_slices() {
        let path = parse("$.items[*].tags[0, -1]..id[1:5:2]").unwrap();
        assert_eq!(
            path.segments,
            vec![
                Segment::Child(Selector::Name("items".into())),
                Segment::Child(Selector::Wildcard),
                Segment::Child(Selector::Name("tags".into())),
                Segment::Child(Selector::Union(vec![Selector::Index(0), Selector::Index(-1)])),
                Segment::Descendant(Selector::Name("id".into())),
                Segment::Child(Selector::Slice {
                    start: Some(1),
                    end: Some(5),
                    step: 2
                }),
            ]
        );
    }

    #[test]
    fn parses_filters() {
        let path = parse("$.items[?(@.price <= 10.5)]").unwrap();
        assert_eq!(
            path.segments[1],
            Segment::Child(Selector::Filter(Filter {
                path: vec![RelativeStep::Name("price".into())],
                comparison: Some((CompareOp::Le, json!(10.5))),
            }))
        );

        let path = parse("$.items[?@['url']]").unwrap();
        assert_eq!(
            path.segments[1],
            Segment::Child(Selector::Filter(Filter {
                path: vec![RelativeStep::Name("url".into())],
                comparison: None,
            }))
        );
    }

    #[rstest]
    #[case("")]
    #[case("items[*]")]
    #[case("$.")]
    #[case("$.items[")]
    #[case("$.items[*")]
    #[case("$['unterminated]")]
    #[case("$.items[1:2:0]")]
    #[case("$.items[?(@.a == )]")]
    #[case("$.items[?(.a)]")]
    #[case("$ items")]
    fn rejects_malformed_queries(#[case] query: &str) {
        let err = parse(query).unwrap_err();
        assert!(matches!(err, QueryError::Syntax { .. }), "{query}: {err}");
    }

    #[test]
    fn error_reports_position() {
        let QueryError::Syntax { position, .. } = parse("$.items[x]").unwrap_err();
        assert_eq!(position, 8);
    }
}
