//! UBJSON (Universal Binary JSON) format plugin.
//!
//! All multi-byte numbers are Big Endian.
//!
//! | Marker | Type                         |
//! |--------|------------------------------|
//! | `Z`    | null                         |
//! | `N`    | no-op (skipped)              |
//! | `T` `F`| true / false                 |
//! | `i` `U`| int8 / uint8                 |
//! | `I` `l` `L` | int16 / int32 / int64   |
//! | `d` `D`| float32 / float64            |
//! | `H`    | high-precision number (text) |
//! | `C`    | char                         |
//! | `S`    | string                       |
//! | `[` `]`| array                        |
//! | `{` `}`| object                       |
//!
//! Integers are written with the smallest marker that fits. Decoding also
//! accepts optimized containers using `$` (element type) and `#` (count).
//! A count larger than the remaining input is rejected, and arrays of
//! zero-width elements are capped at [`MAX_EMPTY_ELEMENTS`].

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::{Map, Number, Value};

use super::{FormatPlugin, MAX_DEPTH};
use crate::common::Format;
use crate::data::Data;
use crate::error::{Data64Error, Result};
use crate::state::State;

/// Largest `#count` accepted for an array of `Z`, `T` or `F` elements.
pub const MAX_EMPTY_ELEMENTS: usize = 1 << 16;

/// UBJSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct UbjsonFormat;

impl FormatPlugin for UbjsonFormat {
    fn id(&self) -> Format {
        Format::Ubjson
    }

    fn encode(&self, state: &mut State<'_>) -> Result<Option<Data>> {
        Ok(Some(Data::Bytes(encode(&state.input_value()))))
    }

    fn decode(&self, state: &mut State<'_>) -> Result<Data> {
        state.opts.want_bytes = true;
        let bytes = match state.decode()? {
            Data::Bytes(b) => b,
            Data::Text(s) => Bytes::from(s.into_bytes()),
            Data::Value(_) => return Err(Data64Error::InvalidState("expected binary payload")),
        };
        Ok(Data::Value(decode(&bytes)?))
    }
}

/// Encode a value as UBJSON.
pub fn encode(value: &Value) -> Bytes {
    let mut buf = BytesMut::new();
    write_value(&mut buf, value);
    buf.freeze()
}

/// Decode a UBJSON document.
///
/// # Errors
///
/// Returns [`Data64Error::Ubjson`] on malformed input or trailing data.
pub fn decode(input: &[u8]) -> Result<Value> {
    let mut reader = Reader { input, pos: 0 };
    let value = reader.value(0)?;
    if reader.pos != input.len() {
        return Err(reader.error("trailing data"));
    }
    Ok(value)
}

fn write_int(buf: &mut BytesMut, n: i64) {
    if let Ok(v) = i8::try_from(n) {
        buf.put_u8(b'i');
        buf.put_i8(v);
    } else if let Ok(v) = u8::try_from(n) {
        buf.put_u8(b'U');
        buf.put_u8(v);
    } else if let Ok(v) = i16::try_from(n) {
        buf.put_u8(b'I');
        buf.put_i16(v);
    } else if let Ok(v) = i32::try_from(n) {
        buf.put_u8(b'l');
        buf.put_i32(v);
    } else {
        buf.put_u8(b'L');
        buf.put_i64(n);
    }
}

/// Length-prefixed string body (no `S` marker), as used by object keys.
fn write_str(buf: &mut BytesMut, s: &str) {
    write_int(buf, s.len() as i64);
    buf.put_slice(s.as_bytes());
}

fn write_value(buf: &mut BytesMut, value: &Value) {
    match value {
        Value::Null => buf.put_u8(b'Z'),
        Value::Bool(true) => buf.put_u8(b'T'),
        Value::Bool(false) => buf.put_u8(b'F'),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                write_int(buf, i);
            } else if let Some(u) = n.as_u64() {
                // Beyond int64: high-precision text.
                buf.put_u8(b'H');
                write_str(buf, &u.to_string());
            } else {
                buf.put_u8(b'D');
                buf.put_f64(n.as_f64().unwrap_or_default());
            }
        }
        Value::String(s) => {
            buf.put_u8(b'S');
            write_str(buf, s);
        }
        Value::Array(items) => {
            buf.put_u8(b'[');
            for item in items {
                write_value(buf, item);
            }
            buf.put_u8(b']');
        }
        Value::Object(map) => {
            buf.put_u8(b'{');
            for (key, item) in map {
                write_str(buf, key);
                write_value(buf, item);
            }
            buf.put_u8(b'}');
        }
    }
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn error(&self, msg: &str) -> Data64Error {
        Data64Error::Ubjson(format!("{} at offset {}", msg, self.pos))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let input = self.input;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= input.len())
            .ok_or_else(|| self.error("unexpected end of input"))?;
        let bytes = &input[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn marker(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Next marker, skipping no-ops.
    fn marker_skip_noop(&mut self) -> Result<u8> {
        loop {
            let m = self.marker()?;
            if m != b'N' {
                return Ok(m);
            }
        }
    }

    fn int_of(&mut self, marker: u8) -> Result<i64> {
        Ok(match marker {
            b'i' => i8::from_be_bytes(self.take_array()?) as i64,
            b'U' => u8::from_be_bytes(self.take_array()?) as i64,
            b'I' => i16::from_be_bytes(self.take_array()?) as i64,
            b'l' => i32::from_be_bytes(self.take_array()?) as i64,
            b'L' => i64::from_be_bytes(self.take_array()?),
            other => {
                return Err(self.error(&format!("expected integer marker, got '{}'", other as char)))
            }
        })
    }

    fn length(&mut self) -> Result<usize> {
        let marker = self.marker()?;
        let n = self.int_of(marker)?;
        usize::try_from(n).map_err(|_| self.error("negative length"))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.length()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| self.error("string is not UTF-8"))
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        let marker = self.marker_skip_noop()?;
        self.value_of(marker, depth)
    }

    fn value_of(&mut self, marker: u8, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }

        match marker {
            b'Z' => Ok(Value::Null),
            b'T' => Ok(Value::Bool(true)),
            b'F' => Ok(Value::Bool(false)),
            b'i' | b'U' | b'I' | b'l' | b'L' => Ok(Value::from(self.int_of(marker)?)),
            b'd' => {
                let f = f32::from_be_bytes(self.take_array()?) as f64;
                self.float(f)
            }
            b'D' => {
                let f = f64::from_be_bytes(self.take_array()?);
                self.float(f)
            }
            b'H' => {
                let text = self.string()?;
                match serde_json::from_str::<Number>(&text) {
                    Ok(n) => Ok(Value::Number(n)),
                    Err(_) => Err(self.error(&format!("invalid high-precision number '{}'", text))),
                }
            }
            b'C' => {
                let c = self.marker()?;
                if !c.is_ascii() {
                    return Err(self.error("char must be ASCII"));
                }
                Ok(Value::String((c as char).to_string()))
            }
            b'S' => Ok(Value::String(self.string()?)),
            b'[' => self.array(depth),
            b'{' => self.object(depth),
            other => Err(self.error(&format!("unknown marker '{}'", other as char))),
        }
    }

    fn float(&self, f: f64) -> Result<Value> {
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| self.error("non-finite float"))
    }

    /// Optional `$type` and `#count` after a container opener.
    fn container_header(&mut self) -> Result<(Option<u8>, Option<usize>)> {
        let mut element = None;
        if self.peek() == Some(b'$') {
            self.pos += 1;
            element = Some(self.marker()?);
            if self.peek() != Some(b'#') {
                return Err(self.error("typed container requires a count"));
            }
        }
        let mut count = None;
        if self.peek() == Some(b'#') {
            self.pos += 1;
            count = Some(self.length()?);
        }
        Ok((element, count))
    }

    /// Reject a `#count` the rest of the input cannot hold.
    ///
    /// Every element takes at least one byte, except array elements typed as
    /// `Z`, `T` or `F`, which take none and are capped instead.
    fn check_count(&self, count: usize, element: Option<u8>, keyed: bool) -> Result<usize> {
        let zero_width = !keyed && matches!(element, Some(b'Z' | b'T' | b'F'));
        let limit = if zero_width {
            MAX_EMPTY_ELEMENTS
        } else {
            self.input.len() - self.pos
        };
        if count > limit {
            return Err(self.error(&format!("count {} exceeds limit {}", count, limit)));
        }
        Ok(count)
    }

    fn element(&mut self, element: Option<u8>, depth: usize) -> Result<Value> {
        match element {
            Some(marker) => self.value_of(marker, depth),
            None => self.value(depth),
        }
    }

    fn array(&mut self, depth: usize) -> Result<Value> {
        let (element, count) = self.container_header()?;
        let mut items = Vec::new();

        match count {
            Some(n) => {
                for _ in 0..self.check_count(n, element, false)? {
                    items.push(self.element(element, depth + 1)?);
                }
            }
            None => loop {
                let marker = self.marker_skip_noop()?;
                if marker == b']' {
                    break;
                }
                items.push(self.value_of(marker, depth + 1)?);
            },
        }

        Ok(Value::Array(items))
    }

    fn object(&mut self, depth: usize) -> Result<Value> {
        let (element, count) = self.container_header()?;
        let mut map = Map::new();

        match count {
            Some(n) => {
                for _ in 0..self.check_count(n, element, true)? {
                    let key = self.string()?;
                    let value = self.element(element, depth + 1)?;
                    map.insert(key, value);
                }
            }
            None => loop {
                while self.peek() == Some(b'N') {
                    self.pos += 1;
                }
                if self.peek() == Some(b'}') {
                    self.pos += 1;
                    break;
                }
                let key = self.string()?;
                let value = self.value(depth + 1)?;
                map.insert(key, value);
            },
        }

        Ok(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_simple_object() {
        // {"a":1} => { i 1 'a' i 1 }
        assert_eq!(&encode(&json!({"a": 1}))[..], b"{i\x01ai\x01}");
    }

    #[test]
    fn test_encode_integer_markers() {
        assert_eq!(&encode(&json!(-5))[..], &[b'i', 0xfb]);
        assert_eq!(&encode(&json!(200))[..], &[b'U', 200]);
        assert_eq!(&encode(&json!(1000))[..], &[b'I', 0x03, 0xe8]);
        assert_eq!(&encode(&json!(70000))[..], &[b'l', 0x00, 0x01, 0x11, 0x70]);
        assert_eq!(encode(&json!(1i64 << 40))[0], b'L');
    }

    #[test]
    fn test_encode_scalars() {
        assert_eq!(&encode(&json!(null))[..], b"Z");
        assert_eq!(&encode(&json!(true))[..], b"T");
        assert_eq!(&encode(&json!(false))[..], b"F");
        assert_eq!(&encode(&json!("hi"))[..], b"Si\x02hi");
        assert_eq!(encode(&json!(1.5))[0], b'D');
    }

    #[test]
    fn test_roundtrip_nested() {
        let value = json!({
            "name": "data64",
            "tags": ["a", "b"],
            "n": [0, -1, 255, 40000, 1.25],
            "nested": {"ok": true, "none": null}
        });
        assert_eq!(decode(&encode(&value)).unwrap(), value);
    }

    #[test]
    fn test_high_precision_u64() {
        let value = json!(u64::MAX);
        let bytes = encode(&value);
        assert_eq!(bytes[0], b'H');
        assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_decode_optimized_array() {
        // [$U#i3 1 2 3
        let input = [b'[', b'$', b'U', b'#', b'i', 3, 1, 2, 3];
        assert_eq!(decode(&input).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_decode_counted_object() {
        // {#i1 i1 'k' S i1 'v'
        let input = b"{#i\x01i\x01kSi\x01v";
        assert_eq!(decode(input).unwrap(), json!({"k": "v"}));
    }

    #[test]
    fn test_decode_noop_and_char() {
        let input = b"[NCxN]";
        assert_eq!(decode(input).unwrap(), json!(["x"]));
    }

    #[test]
    fn test_decode_typed_null_array() {
        assert_eq!(decode(b"[$Z#i\x03").unwrap(), json!([null, null, null]));
        assert_eq!(decode(b"[$T#i\x02").unwrap(), json!([true, true]));
    }

    #[test]
    fn test_decode_rejects_oversized_counts() {
        // 16M nulls with no bytes behind them.
        assert!(matches!(
            decode(b"[$Z#l\x01\x00\x00\x00"),
            Err(Data64Error::Ubjson(_))
        ));
        assert!(matches!(
            decode(b"[#l\x7f\xff\xff\xff"),
            Err(Data64Error::Ubjson(_))
        ));
        assert!(matches!(
            decode(b"[$U#I\x00\x04\x01\x02\x03"),
            Err(Data64Error::Ubjson(_))
        ));
        assert!(matches!(
            decode(b"{$Z#l\x00\x10\x00\x00"),
            Err(Data64Error::Ubjson(_))
        ));
    }

    #[test]
    fn test_decode_float32() {
        let mut input = vec![b'd'];
        input.extend_from_slice(&0.5f32.to_be_bytes());
        assert_eq!(decode(&input).unwrap(), json!(0.5));
    }

    #[test]
    fn test_decode_errors() {
        assert!(decode(b"").is_err());
        assert!(decode(b"Si\x05ab").is_err());
        assert!(decode(b"[").is_err());
        assert!(decode(b"ZZ").is_err());
        assert!(decode(b"Q").is_err());
        assert!(decode(b"[$U]").is_err());
    }
}
