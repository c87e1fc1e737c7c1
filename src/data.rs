//! Payload values flowing through the pipeline.
//!
//! [`Data`] is what callers hand to `encode()` and what `decode()` hands
//! back: plain text, raw bytes, or a structured [`serde_json::Value`].

use bytes::Bytes;
use serde_json::Value;

/// A payload at some pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    /// Text, assumed to be already serialized unless `encode_strings` is set.
    Text(String),
    /// Raw binary payload.
    Bytes(Bytes),
    /// Structured value to be serialized by a format plugin.
    Value(Value),
}

impl Data {
    /// Returns the text if this is [`Data::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Data::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes if this is [`Data::Bytes`].
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Data::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the structured value if this is [`Data::Value`].
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Data::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Check if this is [`Data::Text`].
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self, Data::Text(_))
    }

    /// Check if this is empty text or empty bytes.
    pub fn is_empty(&self) -> bool {
        match self {
            Data::Text(s) => s.is_empty(),
            Data::Bytes(b) => b.is_empty(),
            Data::Value(_) => false,
        }
    }

    /// Convert into a structured value.
    ///
    /// Text becomes a JSON string; bytes become an array of numbers.
    pub fn into_value(self) -> Value {
        match self {
            Data::Text(s) => Value::String(s),
            Data::Bytes(b) => Value::Array(b.iter().map(|&n| Value::from(n)).collect()),
            Data::Value(v) => v,
        }
    }
}

impl Default for Data {
    fn default() -> Self {
        Data::Text(String::new())
    }
}

impl From<String> for Data {
    fn from(s: String) -> Self {
        Data::Text(s)
    }
}

impl From<&str> for Data {
    fn from(s: &str) -> Self {
        Data::Text(s.to_string())
    }
}

impl From<Bytes> for Data {
    fn from(b: Bytes) -> Self {
        Data::Bytes(b)
    }
}

impl From<Vec<u8>> for Data {
    fn from(b: Vec<u8>) -> Self {
        Data::Bytes(Bytes::from(b))
    }
}

impl From<&[u8]> for Data {
    fn from(b: &[u8]) -> Self {
        Data::Bytes(Bytes::copy_from_slice(b))
    }
}

impl From<Value> for Data {
    fn from(v: Value) -> Self {
        Data::Value(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conversions() {
        assert_eq!(Data::from("hi"), Data::Text("hi".to_string()));
        assert_eq!(
            Data::from(vec![1u8, 2]),
            Data::Bytes(Bytes::from_static(&[1, 2]))
        );
        assert_eq!(Data::from(json!({"a": 1})).as_value(), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_accessors() {
        let text = Data::from("abc");
        assert!(text.is_text());
        assert_eq!(text.as_text(), Some("abc"));
        assert!(text.as_bytes().is_none());

        let bytes = Data::from(&b"xyz"[..]);
        assert_eq!(bytes.as_bytes(), Some(&b"xyz"[..]));
        assert!(!bytes.is_text());
    }

    #[test]
    fn test_is_empty() {
        assert!(Data::default().is_empty());
        assert!(Data::from(Vec::new()).is_empty());
        assert!(!Data::Value(json!(null)).is_empty());
    }

    #[test]
    fn test_into_value() {
        assert_eq!(Data::from("s").into_value(), json!("s"));
        assert_eq!(Data::from(vec![7u8]).into_value(), json!([7]));
    }
}
