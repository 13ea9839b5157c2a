// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive-descent parser for the prefix, parenthesised filter grammar.

use super::ast::{CompareOp, Filter};
use crate::properties::SubstringPattern;
use crate::scalar::Scalar;
use thiserror::Error;

/// Characters `\` is allowed to escape; anything else after a `\` is a
/// parse error.
const ESCAPABLE: &[char] = &['!', '&', '*', '(', ')', '<', '=', '>', '\\', '|'];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("expected '{expected}' at position {position}")]
    Expected { expected: char, position: usize },
    #[error("unexpected escape character '{0}'")]
    BadEscape(char),
    #[error("dangling escape character at end of input")]
    DanglingEscape,
    #[error("filter ended before matching ')'")]
    Unterminated,
    #[error("empty attribute name at position {0}")]
    EmptyAttribute(usize),
    #[error("'&'/'|' require at least one filter")]
    EmptyFilterList,
    #[error("trailing input after filter at position {0}")]
    TrailingInput(usize),
    #[error("'<'/'>' do not support wildcard values")]
    WildcardNotAllowed,
}

/// Parse a complete filter string, e.g. `(&(name=foo)(ver>15))`.
pub fn parse(input: &str) -> Result<Filter, FilterParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut parser = Parser { chars, pos: 0 };
    let filter = parser.parse_filter()?;
    if parser.pos != parser.chars.len() {
        return Err(FilterParseError::TrailingInput(parser.pos));
    }
    Ok(filter)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expect(&mut self, expected: char) -> Result<(), FilterParseError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(FilterParseError::Expected { expected, position: self.pos })
        }
    }

    fn parse_filter(&mut self) -> Result<Filter, FilterParseError> {
        self.expect('(')?;
        let node = match self.peek() {
            Some('&') => {
                self.advance();
                Filter::And(self.parse_filter_list()?)
            }
            Some('|') => {
                self.advance();
                Filter::Or(self.parse_filter_list()?)
            }
            Some('!') => {
                self.advance();
                Filter::Not(Box::new(self.parse_filter()?))
            }
            _ => self.parse_item()?,
        };
        self.expect(')')?;
        Ok(node)
    }

    fn parse_filter_list(&mut self) -> Result<Vec<Filter>, FilterParseError> {
        let mut list = Vec::new();
        while self.peek() == Some('(') {
            list.push(self.parse_filter()?);
        }
        if list.is_empty() {
            return Err(FilterParseError::EmptyFilterList);
        }
        Ok(list)
    }

    fn parse_item(&mut self) -> Result<Filter, FilterParseError> {
        let key_start = self.pos;
        let key = self.read_escaped_until(&['=', '<', '>'])?;
        if key.is_empty() {
            return Err(FilterParseError::EmptyAttribute(key_start));
        }
        let op = match self.advance() {
            Some('=') => CompareOp::Eq,
            Some('<') => CompareOp::Lt,
            Some('>') => CompareOp::Gt,
            _ => return Err(FilterParseError::Expected { expected: '=', position: self.pos }),
        };

        let segments = self.read_value_segments()?;

        if op != CompareOp::Eq && segments.len() > 1 {
            return Err(FilterParseError::WildcardNotAllowed);
        }

        if segments.len() == 1 {
            let value = Scalar::classify(&segments[0]);
            return Ok(Filter::Simple { key, op, value });
        }

        if segments.len() == 2 && segments[0].is_empty() && segments[1].is_empty() {
            return Ok(Filter::Present { key });
        }

        let initial = non_empty(&segments[0]);
        let fin = segments.last().and_then(|s| non_empty(s));
        let chunks = segments[1..segments.len() - 1].to_vec();
        Ok(Filter::Substring { key, pattern: SubstringPattern { initial, chunks, fin } })
    }

    /// Read an escaped literal up to (not including) the first unescaped
    /// character in `stop`. Errors if end-of-input is reached first.
    fn read_escaped_until(&mut self, stop: &[char]) -> Result<String, FilterParseError> {
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(FilterParseError::Unterminated),
                Some(c) if stop.contains(&c) => return Ok(out),
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        None => return Err(FilterParseError::DanglingEscape),
                        Some(c) if ESCAPABLE.contains(&c) => out.push(c),
                        Some(c) => return Err(FilterParseError::BadEscape(c)),
                    }
                }
                Some(c) => {
                    self.advance();
                    out.push(c);
                }
            }
        }
    }

    /// Read a value up to (not including) the first unescaped `)`,
    /// splitting on unescaped `*` into segments. A literal without any
    /// wildcard yields exactly one segment.
    fn read_value_segments(&mut self) -> Result<Vec<String>, FilterParseError> {
        let mut segments = vec![String::new()];
        loop {
            match self.peek() {
                None => return Err(FilterParseError::Unterminated),
                Some(')') => return Ok(segments),
                Some('*') => {
                    self.advance();
                    segments.push(String::new());
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        None => return Err(FilterParseError::DanglingEscape),
                        Some(c) if ESCAPABLE.contains(&c) => {
                            if let Some(last) = segments.last_mut() {
                                last.push(c);
                            }
                        }
                        Some(c) => return Err(FilterParseError::BadEscape(c)),
                    }
                }
                Some(c) => {
                    self.advance();
                    if let Some(last) = segments.last_mut() {
                        last.push(c);
                    }
                }
            }
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_equality() {
        let f = parse("(name=foo)").unwrap();
        assert_eq!(
            f,
            Filter::Simple {
                key: "name".into(),
                op: CompareOp::Eq,
                value: Scalar::String("foo".into())
            }
        );
    }

    #[test]
    fn parses_integer_comparison() {
        let f = parse("(ver>15)").unwrap();
        assert_eq!(
            f,
            Filter::Simple { key: "ver".into(), op: CompareOp::Gt, value: Scalar::Int(15) }
        );
    }

    #[test]
    fn parses_presence() {
        assert_eq!(parse("(name=*)").unwrap(), Filter::Present { key: "name".into() });
    }

    #[test]
    fn parses_and_or_not() {
        let f = parse("(&(name=foo)(ver>15))").unwrap();
        assert!(matches!(f, Filter::And(list) if list.len() == 2));

        let f = parse("(|(name=foo)(name=bar))").unwrap();
        assert!(matches!(f, Filter::Or(list) if list.len() == 2));

        let f = parse("(!(name=foo))").unwrap();
        assert!(matches!(f, Filter::Not(_)));
    }

    #[test]
    fn parses_substring_with_whitespace_value() {
        let f = parse("(game= a space adventure )").unwrap();
        match f {
            Filter::Simple { value: Scalar::String(s), .. } => {
                assert_eq!(s, " a space adventure ");
            }
            other => panic!("expected a simple string comparison, got {other:?}"),
        }
    }

    #[test]
    fn parses_substring_pattern() {
        let f = parse("(desc=a*space*re)").unwrap();
        match f {
            Filter::Substring { pattern, .. } => {
                assert_eq!(pattern.initial.as_deref(), Some("a"));
                assert_eq!(pattern.chunks, vec!["space".to_string()]);
                assert_eq!(pattern.fin.as_deref(), Some("re"));
            }
            other => panic!("expected a substring filter, got {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_escape() {
        assert!(matches!(parse(r"(name=fo\qo)"), Err(FilterParseError::BadEscape('q'))));
    }

    #[test]
    fn rejects_empty_filter_list() {
        assert!(matches!(parse("(&)"), Err(FilterParseError::EmptyFilterList)));
    }

    #[test]
    fn rejects_unterminated_filter() {
        assert!(matches!(parse("(name=foo"), Err(FilterParseError::Unterminated)));
    }

    #[test]
    fn rejects_inequality_with_wildcard() {
        assert!(matches!(parse("(name<fo*o)"), Err(FilterParseError::WildcardNotAllowed)));
    }

    #[test]
    fn escaped_special_characters_are_literal() {
        let f = parse(r"(name=a\(b\)c)").unwrap();
        assert_eq!(
            f,
            Filter::Simple {
                key: "name".into(),
                op: CompareOp::Eq,
                value: Scalar::String("a(b)c".into())
            }
        );
    }
}
