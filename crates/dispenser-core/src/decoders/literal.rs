//! Python literal expressions
//!
//! Accepts the subset of Python that `repr()` produces for row-like data:
//! dicts, lists, tuples, sets, strings, numbers, `True`/`False`/`None` and
//! `OrderedDict([(key, value), ...])`. Dict order is kept.

use serde_json::{Number, Value};
use std::io::{BufRead, Read};
use thiserror::Error;

use super::{Decoder, RawRows};
use crate::error::BoxError;
use crate::format::FormatTag;
use crate::record::{Record, rows};
use crate::source::SourceOptions;

/// Decoder for Python literal text
pub struct LiteralDecoder;

impl Decoder for LiteralDecoder {
    fn format(&self) -> FormatTag {
        FormatTag::LiteralPython
    }

    fn decode(
        &self,
        mut input: Box<dyn BufRead>,
        _options: &SourceOptions,
    ) -> Result<RawRows, BoxError> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        Ok(Box::new(rows(parse(&text)?).map(Ok)))
    }
}

/// A literal that could not be parsed
#[derive(Error, Debug, PartialEq)]
#[error("invalid literal at offset {offset}: {message}")]
pub struct LiteralError {
    /// Byte offset of the failure
    pub offset: usize,
    /// What was expected
    pub message: String,
}

/// Containers nested deeper than this are rejected
const MAX_DEPTH: usize = 128;

/// Parse one Python literal expression
pub fn parse(text: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        src: text,
        pos: 0,
        depth: 0,
    };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos < text.len() {
        return Err(parser.error("trailing characters after literal"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn at_pair(&self, quote: char) -> bool {
        let mut chars = self.rest().chars();
        chars.next() == Some(quote) && chars.next() == Some(quote)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", expected)))
        }
    }

    fn skip_ws(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    let line_end = self.rest().find('\n').unwrap_or(self.rest().len());
                    self.pos += line_end;
                }
                _ => break,
            }
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {}", MAX_DEPTH)));
        }
        self.depth += 1;
        let value = self.term();
        self.depth -= 1;
        value
    }

    fn term(&mut self) -> Result<Value, LiteralError> {
        match self.peek() {
            Some('{') => self.dict_or_set(),
            Some('[') => {
                self.bump();
                self.items(']').map(Value::Array)
            }
            Some('(') => self.parenthesized(),
            Some('\'') | Some('"') => self.string().map(Value::String),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.word(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    /// Comma separated values up to `close`; a trailing comma is allowed
    fn items(&mut self, close: char) -> Result<Vec<Value>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(',')?;
        }
    }

    /// `(x)` is just `x`; `(x,)` and `(x, y)` are tuples
    fn parenthesized(&mut self) -> Result<Value, LiteralError> {
        self.expect('(')?;
        self.skip_ws();
        if self.eat(')') {
            return Ok(Value::Array(Vec::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        if self.eat(')') {
            return Ok(first);
        }
        self.expect(',')?;
        let mut items = vec![first];
        items.extend(self.items(')')?);
        Ok(Value::Array(items))
    }

    fn dict_or_set(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        self.skip_ws();
        if self.eat('}') {
            return Ok(Value::Object(Record::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        if !self.eat(':') {
            // A set literal
            let mut items = vec![first];
            if !self.eat('}') {
                self.expect(',')?;
                items.extend(self.items('}')?);
            }
            return Ok(Value::Array(items));
        }

        let mut record = Record::new();
        let mut key = first;
        loop {
            self.skip_ws();
            let value = self.value()?;
            record.insert(self.key_name(key)?, value);
            self.skip_ws();
            if self.eat('}') {
                return Ok(Value::Object(record));
            }
            self.expect(',')?;
            self.skip_ws();
            if self.eat('}') {
                return Ok(Value::Object(record));
            }
            key = self.value()?;
            self.skip_ws();
            self.expect(':')?;
        }
    }

    fn key_name(&self, key: Value) -> Result<String, LiteralError> {
        match key {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(true) => Ok("True".to_string()),
            Value::Bool(false) => Ok("False".to_string()),
            Value::Null => Ok("None".to_string()),
            _ => Err(self.error("unhashable dict key")),
        }
    }

    fn word(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                self.bump();
            } else {
                break;
            }
        }
        let src = self.src;
        let word = &src[start..self.pos];
        match word {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            "OrderedDict" | "collections.OrderedDict" | "dict" => self.mapping_call(),
            // String prefixes: r'', u'', b'' and their combinations
            _ if word.len() <= 2
                && word.chars().all(|c| "rRuUbB".contains(c))
                && matches!(self.peek(), Some('\'') | Some('"')) =>
            {
                let raw = word.contains(['r', 'R']);
                self.quoted(raw).map(Value::String)
            }
            _ => {
                self.pos = start;
                Err(self.error(format!("unsupported name '{}'", word)))
            }
        }
    }

    /// `OrderedDict([(k, v), ...])` or `dict({...})`
    fn mapping_call(&mut self) -> Result<Value, LiteralError> {
        self.skip_ws();
        self.expect('(')?;
        self.skip_ws();
        if self.eat(')') {
            return Ok(Value::Object(Record::new()));
        }
        let argument = self.value()?;
        self.skip_ws();
        self.eat(',');
        self.skip_ws();
        self.expect(')')?;
        match argument {
            Value::Object(record) => Ok(Value::Object(record)),
            Value::Array(pairs) => {
                let mut record = Record::new();
                for pair in pairs {
                    match pair {
                        Value::Array(mut kv) if kv.len() == 2 => {
                            let value = kv.pop().unwrap_or(Value::Null);
                            let key = kv.pop().unwrap_or(Value::Null);
                            record.insert(self.key_name(key)?, value);
                        }
                        _ => return Err(self.error("expected (key, value) pairs")),
                    }
                }
                Ok(Value::Object(record))
            }
            _ => Err(self.error("expected a mapping or a list of pairs")),
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        self.quoted(false)
    }

    fn quoted(&mut self, raw: bool) -> Result<String, LiteralError> {
        let quote = self.bump().ok_or_else(|| self.error("expected a string"))?;
        let triple = self.at_pair(quote);
        if triple {
            self.pos += 2 * quote.len_utf8();
        }

        let mut out = String::new();
        loop {
            let c = self
                .bump()
                .ok_or_else(|| self.error("unterminated string"))?;
            if c == quote {
                if !triple {
                    return Ok(out);
                }
                if self.at_pair(quote) {
                    self.pos += 2 * quote.len_utf8();
                    return Ok(out);
                }
                out.push(c);
            } else if c == '\n' && !triple {
                return Err(self.error("newline in single-quoted string"));
            } else if c == '\\' {
                self.escape(raw, &mut out)?;
            } else {
                out.push(c);
            }
        }
    }

    fn escape(&mut self, raw: bool, out: &mut String) -> Result<(), LiteralError> {
        let c = self
            .bump()
            .ok_or_else(|| self.error("unterminated escape"))?;
        if raw {
            out.push('\\');
            out.push(c);
            return Ok(());
        }
        match c {
            '\n' => {}
            '\\' | '\'' | '"' => out.push(c),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            'x' => out.push(self.code_point(2)?),
            'u' => out.push(self.code_point(4)?),
            'U' => out.push(self.code_point(8)?),
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or_default();
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).ok_or_else(|| self.error("invalid octal escape"))?);
            }
            // Python keeps unknown escapes verbatim
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn code_point(&mut self, digits: usize) -> Result<char, LiteralError> {
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .ok_or_else(|| self.error("truncated escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.bump();
        }
        let rest = self.rest();
        if rest.starts_with("0x") || rest.starts_with("0X") {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.bump();
            }
            let digits = self.src[digits_start..self.pos].replace('_', "");
            let magnitude =
                i64::from_str_radix(&digits, 16).map_err(|_| self.error("invalid hex integer"))?;
            let negative = self.src[start..].starts_with('-');
            return Ok(Value::from(if negative { -magnitude } else { magnitude }));
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    self.bump();
                    if matches!(self.peek(), Some('-') | Some('+')) {
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            self.bump();
        }
        let literal = self.src[start..self.pos].replace('_', "");
        if !is_float {
            if let Ok(int) = literal.parse::<i64>() {
                return Ok(Value::from(int));
            }
        }
        let float = literal
            .parse::<f64>()
            .map_err(|_| LiteralError {
                offset: start,
                message: format!("invalid number '{}'", literal),
            })?;
        Number::from_f64(float)
            .map(Value::Number)
            .ok_or_else(|| self.error("number is not finite"))
    }
}
