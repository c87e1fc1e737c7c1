//! PHP `serialize()` format plugin.
//!
//! ```text
//! N;                      null
//! b:1;                    bool
//! i:42;                   integer
//! d:0.5;                  float
//! s:5:"hello";            string (length in bytes)
//! a:2:{i:0;...;i:1;...;}  array / associative array
//! O:8:"stdClass":0:{}     empty object
//! O:5:"Point":1:{...}     object, any class (decode only, class name dropped)
//! ```
//!
//! JSON arrays encode with integer keys `0..n`. Non-empty objects encode as
//! associative arrays. The empty object is the only value written as `O:`,
//! since an empty `a:0:{}` decodes back to an empty array. On decode, arrays
//! whose keys are exactly `0..n` become JSON arrays; anything else an object.
//!
//! Both `N;` and `O:...` Base64-encode to a payload starting with `T`, right
//! after the header's format field.

use serde_json::{Map, Number, Value};

use super::{payload_text, FormatPlugin, MAX_DEPTH};
use crate::common::Format;
use crate::data::Data;
use crate::error::{Data64Error, Result};
use crate::state::State;

/// PHP serialize codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhpFormat;

impl FormatPlugin for PhpFormat {
    fn id(&self) -> Format {
        Format::Php
    }

    fn encode(&self, state: &mut State<'_>) -> Result<Option<Data>> {
        Ok(Some(Data::Text(serialize(&state.input_value()))))
    }

    fn decode(&self, state: &mut State<'_>) -> Result<Data> {
        let text = payload_text(state.decode()?)?;
        Ok(Data::Value(unserialize(&text)?))
    }
}

/// Serialize a value to PHP `serialize()` text.
pub fn serialize(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Parse PHP `serialize()` text.
///
/// # Errors
///
/// Returns [`Data64Error::Php`] on malformed input, unsupported tags, or
/// trailing data.
pub fn unserialize(input: &str) -> Result<Value> {
    let mut parser = Parser {
        input: input.as_bytes(),
        pos: 0,
    };
    let value = parser.value(0)?;
    if parser.pos != parser.input.len() {
        return Err(parser.error("trailing data"));
    }
    Ok(value)
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("N;"),
        Value::Bool(b) => out.push_str(if *b { "b:1;" } else { "b:0;" }),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push_str(&format!("a:{}:{{", items.len()));
            for (i, item) in items.iter().enumerate() {
                out.push_str(&format!("i:{};", i));
                write_value(out, item);
            }
            out.push('}');
        }
        Value::Object(map) if map.is_empty() => out.push_str("O:8:\"stdClass\":0:{}"),
        Value::Object(map) => {
            out.push_str(&format!("a:{}:{{", map.len()));
            for (key, item) in map {
                match integer_key(key) {
                    Some(i) => out.push_str(&format!("i:{};", i)),
                    None => write_string(out, key),
                }
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_number(out: &mut String, n: &Number) {
    if let Some(i) = n.as_i64() {
        out.push_str(&format!("i:{};", i));
    } else if let Some(u) = n.as_u64() {
        out.push_str(&format!("i:{};", u));
    } else {
        let f = n.as_f64().unwrap_or_default();
        out.push_str(&format!("d:{};", f));
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push_str(&format!("s:{}:\"{}\";", s.len(), s));
}

/// PHP turns canonical decimal string keys into integer keys.
fn integer_key(key: &str) -> Option<i64> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    let canonical = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
        && key != "-0";
    if canonical {
        key.parse().ok()
    } else {
        None
    }
}

enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    fn into_string(self) -> String {
        match self {
            Key::Int(i) => i.to_string(),
            Key::Str(s) => s,
        }
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, msg: &str) -> Data64Error {
        Data64Error::Php(format!("{} at offset {}", msg, self.pos))
    }

    fn byte(&mut self) -> Result<u8> {
        let b = *self
            .input
            .get(self.pos)
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        if self.byte()? != expected {
            self.pos -= 1;
            return Err(self.error(&format!("expected '{}'", expected as char)));
        }
        Ok(())
    }

    /// Read up to (and consume) `end`, returning the bytes before it as text.
    fn until(&mut self, end: u8) -> Result<&str> {
        let start = self.pos;
        let len = self.input[start..]
            .iter()
            .position(|&b| b == end)
            .ok_or_else(|| self.error(&format!("missing '{}'", end as char)))?;
        self.pos = start + len + 1;
        std::str::from_utf8(&self.input[start..start + len]).map_err(|_| self.error("invalid UTF-8"))
    }

    fn int_until(&mut self, end: u8) -> Result<i64> {
        let raw = self.until(end)?;
        raw.parse()
            .map_err(|_| Data64Error::Php(format!("invalid integer '{}'", raw)))
    }

    fn length_until(&mut self, end: u8) -> Result<usize> {
        let raw = self.until(end)?;
        raw.parse()
            .map_err(|_| Data64Error::Php(format!("invalid length '{}'", raw)))
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("length runs past end of input"))?;
        let bytes = &self.input[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Body of `s:<len>:"...";` after the tag.
    fn string_body(&mut self) -> Result<String> {
        self.expect(b':')?;
        let len = self.length_until(b':')?;
        self.expect(b'"')?;
        let bytes = self.take(len)?.to_vec();
        self.expect(b'"')?;
        self.expect(b';')?;
        String::from_utf8(bytes).map_err(|_| self.error("string is not UTF-8"))
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }

        match self.byte()? {
            b'N' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                match self.until(b';')? {
                    "0" => Ok(Value::Bool(false)),
                    "1" => Ok(Value::Bool(true)),
                    other => Err(Data64Error::Php(format!("invalid bool '{}'", other))),
                }
            }
            b'i' => {
                self.expect(b':')?;
                Ok(Value::from(self.int_until(b';')?))
            }
            b'd' => {
                self.expect(b':')?;
                let raw = self.until(b';')?;
                let f: f64 = raw
                    .parse()
                    .map_err(|_| Data64Error::Php(format!("invalid float '{}'", raw)))?;
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| Data64Error::Php(format!("non-finite float '{}'", raw)))
            }
            b's' => Ok(Value::String(self.string_body()?)),
            b'a' => {
                self.expect(b':')?;
                let count = self.length_until(b':')?;
                let entries = self.entries(count, depth)?;
                Ok(into_array_or_object(entries))
            }
            b'O' => {
                self.expect(b':')?;
                let name_len = self.length_until(b':')?;
                self.expect(b'"')?;
                self.take(name_len)?;
                self.expect(b'"')?;
                self.expect(b':')?;
                let count = self.length_until(b':')?;
                let entries = self.entries(count, depth)?;
                Ok(Value::Object(
                    entries
                        .into_iter()
                        .map(|(k, v)| (k.into_string(), v))
                        .collect(),
                ))
            }
            other => {
                self.pos -= 1;
                Err(self.error(&format!("unsupported tag '{}'", other as char)))
            }
        }
    }

    fn key(&mut self) -> Result<Key> {
        match self.byte()? {
            b'i' => {
                self.expect(b':')?;
                Ok(Key::Int(self.int_until(b';')?))
            }
            b's' => Ok(Key::Str(self.string_body()?)),
            _ => {
                self.pos -= 1;
                Err(self.error("array key must be an integer or string"))
            }
        }
    }

    /// `{key;value...}` with exactly `count` pairs.
    fn entries(&mut self, count: usize, depth: usize) -> Result<Vec<(Key, Value)>> {
        self.expect(b'{')?;
        let mut entries = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let key = self.key()?;
            let value = self.value(depth + 1)?;
            entries.push((key, value));
        }
        self.expect(b'}')?;
        Ok(entries)
    }
}

fn into_array_or_object(entries: Vec<(Key, Value)>) -> Value {
    let is_list = entries
        .iter()
        .enumerate()
        .all(|(i, (k, _))| matches!(k, Key::Int(n) if *n == i as i64));

    if is_list {
        Value::Array(entries.into_iter().map(|(_, v)| v).collect())
    } else {
        let map: Map<String, Value> = entries
            .into_iter()
            .map(|(k, v)| (k.into_string(), v))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_scalars() {
        assert_eq!(serialize(&json!(null)), "N;");
        assert_eq!(serialize(&json!(true)), "b:1;");
        assert_eq!(serialize(&json!(false)), "b:0;");
        assert_eq!(serialize(&json!(-7)), "i:-7;");
        assert_eq!(serialize(&json!(0.5)), "d:0.5;");
        assert_eq!(serialize(&json!("hello")), "s:5:\"hello\";");
    }

    #[test]
    fn test_serialize_string_length_in_bytes() {
        assert_eq!(serialize(&json!("é")), "s:2:\"é\";");
    }

    #[test]
    fn test_serialize_object() {
        assert_eq!(serialize(&json!({"a": 1})), "a:1:{s:1:\"a\";i:1;}");
    }

    #[test]
    fn test_serialize_array() {
        assert_eq!(
            serialize(&json!(["x", 2])),
            "a:2:{i:0;s:1:\"x\";i:1;i:2;}"
        );
    }

    #[test]
    fn test_serialize_numeric_keys() {
        assert_eq!(
            serialize(&json!({"10": true, "07": false})),
            "a:2:{s:2:\"07\";b:0;i:10;b:1;}"
        );
    }

    #[test]
    fn test_serialize_empty_object() {
        assert_eq!(serialize(&json!({})), "O:8:\"stdClass\":0:{}");
        assert_eq!(unserialize("O:8:\"stdClass\":0:{}").unwrap(), json!({}));
    }

    #[test]
    fn test_unserialize_roundtrip_nested() {
        let value = json!({"name": "test", "list": [1, 2.5, null], "flag": true});
        assert_eq!(unserialize(&serialize(&value)).unwrap(), value);
    }

    #[test]
    fn test_unserialize_sparse_array_becomes_object() {
        let value = unserialize("a:2:{i:0;s:1:\"a\";i:5;s:1:\"b\";}").unwrap();
        assert_eq!(value, json!({"0": "a", "5": "b"}));
    }

    #[test]
    fn test_unserialize_object_drops_class() {
        let value = unserialize("O:3:\"Foo\":1:{s:3:\"bar\";i:1;}").unwrap();
        assert_eq!(value, json!({"bar": 1}));
    }

    #[test]
    fn test_unserialize_string_with_quotes() {
        let value = unserialize("s:4:\"a\";b\";").unwrap();
        assert_eq!(value, json!("a\";b"));
    }

    #[test]
    fn test_unserialize_errors() {
        assert!(unserialize("").is_err());
        assert!(unserialize("i:abc;").is_err());
        assert!(unserialize("s:10:\"short\";").is_err());
        assert!(unserialize("N;N;").is_err());
        assert!(unserialize("r:1;").is_err());
        assert!(unserialize("d:INF;").is_err());
    }
}
