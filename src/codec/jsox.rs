//! JSOX format plugin.
//!
//! JSOX is a JSON superset. Output is JSON with object keys left unquoted
//! when they are plain identifiers (`{a:1}`). The parser accepts JSON plus:
//!
//! - unquoted identifier keys
//! - `'single'` and `` `back` `` quoted strings
//! - trailing commas
//! - `//` and `/* */` comments
//! - `0x`, `0o`, `0b` integers, a leading `+`, and a bigint `n` suffix
//! - `undefined` (read as null)
//!
//! Typed objects, class definitions, dates and other JSOX extensions with no
//! JSON counterpart are rejected.

use serde_json::{Map, Number, Value};

use super::{payload_text, FormatPlugin, MAX_DEPTH};
use crate::common::Format;
use crate::data::Data;
use crate::error::{Data64Error, Result};
use crate::state::State;

/// JSOX codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsoxFormat;

impl FormatPlugin for JsoxFormat {
    fn id(&self) -> Format {
        Format::Jsox
    }

    fn encode(&self, state: &mut State<'_>) -> Result<Option<Data>> {
        let mut value = state.input_value();
        if let Some(replacer) = &state.opts.replacer {
            value = replacer.apply(value);
        }
        Ok(Some(Data::Text(stringify(&value))))
    }

    fn decode(&self, state: &mut State<'_>) -> Result<Data> {
        let text = payload_text(state.decode()?)?;
        let mut value = parse(&text)?;
        if let Some(reviver) = &state.opts.reviver {
            value = reviver.apply(value);
        }
        Ok(Data::Value(value))
    }
}

const KEYWORDS: &[&str] = &["true", "false", "null", "undefined", "NaN", "Infinity"];

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c == '_' || c == '$' || c.is_alphabetic());
    first_ok
        && chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
        && !KEYWORDS.contains(&key)
}

/// Serialize a value as JSOX text.
pub fn stringify(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                if is_identifier(key) {
                    out.push_str(key);
                } else {
                    out.push_str(&Value::String(key.clone()).to_string());
                }
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Parse JSOX text.
///
/// # Errors
///
/// Returns [`Data64Error::Jsox`] on syntax errors or unsupported extensions.
pub fn parse(input: &str) -> Result<Value> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    parser.skip_space()?;
    let value = parser.value(0)?;
    parser.skip_space()?;
    if parser.pos != parser.chars.len() {
        return Err(parser.error("trailing data"));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn error(&self, msg: &str) -> Data64Error {
        Data64Error::Jsox(format!("{} at character {}", msg, self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Result<char> {
        let c = self.peek().ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        Ok(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_space(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == '\u{feff}' => self.pos += 1,
                Some('/') => match self.chars.get(self.pos + 1) {
                    Some('/') => {
                        while !matches!(self.peek(), None | Some('\n')) {
                            self.pos += 1;
                        }
                    }
                    Some('*') => {
                        self.pos += 2;
                        loop {
                            if self.peek().is_none() {
                                return Err(self.error("unterminated comment"));
                            }
                            if self.peek() == Some('*') && self.chars.get(self.pos + 1) == Some(&'/') {
                                self.pos += 2;
                                break;
                            }
                            self.pos += 1;
                        }
                    }
                    _ => return Err(self.error("unexpected '/'")),
                },
                _ => return Ok(()),
            }
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }

        match self.peek() {
            Some('{') => self.object(depth),
            Some('[') => self.array(depth),
            Some(q @ ('"' | '\'' | '`')) => {
                self.pos += 1;
                Ok(Value::String(self.string(q)?))
            }
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
                let word = self.identifier();
                match word.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" | "undefined" => Ok(Value::Null),
                    "NaN" | "Infinity" => Err(self.error("non-finite numbers are not supported")),
                    other => Err(self.error(&format!("unsupported token '{}'", other))),
                }
            }
            Some(c) => Err(self.error(&format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '_' || c == '$' || c.is_alphanumeric() {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn hex_digits(&mut self, len: usize) -> Result<u32> {
        let mut n = 0u32;
        for _ in 0..len {
            let c = self.bump()?;
            let d = c.to_digit(16).ok_or_else(|| self.error("invalid hex escape"))?;
            n = n * 16 + d;
        }
        Ok(n)
    }

    fn unicode_escape(&mut self) -> Result<char> {
        let code = if self.eat('{') {
            let mut n = 0u32;
            loop {
                let c = self.bump()?;
                if c == '}' {
                    break;
                }
                let d = c.to_digit(16).ok_or_else(|| self.error("invalid unicode escape"))?;
                n = n
                    .checked_mul(16)
                    .and_then(|n| n.checked_add(d))
                    .ok_or_else(|| self.error("unicode escape out of range"))?;
            }
            n
        } else {
            let high = self.hex_digits(4)?;
            if (0xd800..0xdc00).contains(&high) && self.eat('\\') {
                if !self.eat('u') {
                    return Err(self.error("expected low surrogate"));
                }
                let low = self.hex_digits(4)?;
                if !(0xdc00..0xe000).contains(&low) {
                    return Err(self.error("invalid low surrogate"));
                }
                0x10000 + ((high - 0xd800) << 10) + (low - 0xdc00)
            } else {
                high
            }
        };
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn string(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            let c = self.bump()?;
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'v' => out.push('\u{b}'),
                    '0' => out.push('\0'),
                    'x' => {
                        let n = self.hex_digits(2)?;
                        out.push(char::from_u32(n).ok_or_else(|| self.error("invalid hex escape"))?);
                    }
                    'u' => out.push(self.unicode_escape()?),
                    // Line continuation.
                    '\n' => {}
                    '\r' => {
                        self.eat('\n');
                    }
                    other => out.push(other),
                }
            } else if (c == '\n' || c == '\r') && quote != '`' {
                return Err(self.error("unterminated string"));
            } else {
                out.push(c);
            }
        }
    }

    fn number(&mut self) -> Result<Value> {
        let negative = if self.eat('-') {
            true
        } else {
            self.eat('+');
            false
        };

        if self.peek() == Some('I') {
            return Err(self.error("non-finite numbers are not supported"));
        }

        if self.peek() == Some('0') {
            let radix = match self.chars.get(self.pos + 1) {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_digit(radix)) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                self.eat('n');
                let n = i64::from_str_radix(&digits, radix)
                    .map_err(|_| self.error("invalid integer literal"))?;
                return Ok(Value::from(if negative { -n } else { n }));
            }
        }

        let start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {}
                '.' | 'e' | 'E' => is_float = true,
                '+' | '-' if matches!(self.chars.get(self.pos - 1), Some('e' | 'E')) => {}
                _ => break,
            }
            self.pos += 1;
        }
        let mut literal: String = self.chars[start..self.pos].iter().collect();
        if !is_float {
            self.eat('n');
        }
        if literal.starts_with('.') {
            literal.insert(0, '0');
        }
        if negative {
            literal.insert(0, '-');
        }

        if !is_float {
            if let Ok(i) = literal.parse::<i64>() {
                return Ok(Value::from(i));
            }
            if let Ok(u) = literal.parse::<u64>() {
                return Ok(Value::from(u));
            }
        }
        let f: f64 = literal
            .parse()
            .map_err(|_| self.error(&format!("invalid number '{}'", literal)))?;
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| self.error("non-finite numbers are not supported"))
    }

    fn array(&mut self, depth: usize) -> Result<Value> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_space()?;
            if self.eat(']') {
                return Ok(Value::Array(items));
            }
            items.push(self.value(depth + 1)?);
            self.skip_space()?;
            if !self.eat(',') {
                self.skip_space()?;
                if self.eat(']') {
                    return Ok(Value::Array(items));
                }
                return Err(self.error("expected ',' or ']'"));
            }
        }
    }

    fn object(&mut self, depth: usize) -> Result<Value> {
        self.pos += 1;
        let mut map = Map::new();
        loop {
            self.skip_space()?;
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            let key = match self.peek() {
                Some(q @ ('"' | '\'' | '`')) => {
                    self.pos += 1;
                    self.string(q)?
                }
                Some(c) if c == '_' || c == '$' || c.is_alphanumeric() => self.identifier(),
                _ => return Err(self.error("expected object key")),
            };
            self.skip_space()?;
            if !self.eat(':') {
                return Err(self.error("expected ':'"));
            }
            self.skip_space()?;
            let value = self.value(depth + 1)?;
            map.insert(key, value);
            self.skip_space()?;
            if !self.eat(',') {
                if self.eat('}') {
                    return Ok(Value::Object(map));
                }
                return Err(self.error("expected ',' or '}'"));
            }
        }
    }
}
