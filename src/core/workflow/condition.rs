//! Branch condition grammar.
//!
//! A condition has the shape `<identifier> == '<literal>'` (double quotes are
//! accepted too). Parsing yields a [`Comparison`] that is evaluated against the
//! `data` map of an action result.

use serde_json::{Map, Value};
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

/// Parsed `key == 'literal'` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub key: String,
    pub literal: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionParseError {
    #[error("condition is empty")]
    Empty,
    #[error("expected identifier at offset {0}")]
    ExpectedIdentifier(usize),
    #[error("expected '==' at offset {0}")]
    ExpectedEquals(usize),
    #[error("expected quoted literal at offset {0}")]
    ExpectedLiteral(usize),
    #[error("unterminated literal starting at offset {0}")]
    UnterminatedLiteral(usize),
    #[error("empty literal at offset {0}")]
    EmptyLiteral(usize),
    #[error("unexpected trailing input at offset {0}")]
    TrailingInput(usize),
}

struct Parser<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.source.len())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn identifier(&mut self) -> Result<String, ConditionParseError> {
        let start = self.offset();
        let mut ident = String::new();
        while let Some((_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || *c == '_' {
                ident.push(*c);
                self.chars.next();
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(ConditionParseError::ExpectedIdentifier(start));
        }
        Ok(ident)
    }

    fn equals(&mut self) -> Result<(), ConditionParseError> {
        let start = self.offset();
        for _ in 0..2 {
            match self.chars.next() {
                Some((_, '=')) => {}
                _ => return Err(ConditionParseError::ExpectedEquals(start)),
            }
        }
        Ok(())
    }

    fn literal(&mut self) -> Result<String, ConditionParseError> {
        let start = self.offset();
        let quote = match self.chars.next() {
            Some((_, c)) if c == '\'' || c == '"' => c,
            _ => return Err(ConditionParseError::ExpectedLiteral(start)),
        };
        let mut literal = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => break,
                Some((_, c)) => literal.push(c),
                None => return Err(ConditionParseError::UnterminatedLiteral(start)),
            }
        }
        if literal.is_empty() {
            return Err(ConditionParseError::EmptyLiteral(start));
        }
        Ok(literal)
    }

    fn end(&mut self) -> Result<(), ConditionParseError> {
        match self.chars.peek() {
            None => Ok(()),
            Some((idx, _)) => Err(ConditionParseError::TrailingInput(*idx)),
        }
    }
}

/// Parse a condition expression into a [`Comparison`].
pub fn parse(expression: &str) -> Result<Comparison, ConditionParseError> {
    if expression.trim().is_empty() {
        return Err(ConditionParseError::Empty);
    }
    let mut parser = Parser::new(expression);
    parser.skip_whitespace();
    let key = parser.identifier()?;
    parser.skip_whitespace();
    parser.equals()?;
    parser.skip_whitespace();
    let literal = parser.literal()?;
    parser.skip_whitespace();
    parser.end()?;
    Ok(Comparison { key, literal })
}

impl Comparison {
    /// True when `data[key]` exists, is not null, and renders to the literal.
    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        data.get(&self.key)
            .and_then(render_value)
            .map(|actual| actual == self.literal)
            .unwrap_or(false)
    }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parse and evaluate in one go. Malformed expressions never match.
pub fn evaluate(expression: &str, data: &Map<String, Value>) -> bool {
    match parse(expression) {
        Ok(comparison) => comparison.matches(data),
        Err(err) => {
            tracing::debug!(expression, error = %err, "condition does not parse; treating as no match");
            false
        }
    }
}
