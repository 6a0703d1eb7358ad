//! Dynamically-typed session values
//!
//! Every value is written to the cache as a small tagged object:
//!
//! ```json
//! {"type": "int64", "value": 42}
//! ```
//!
//! The tag keeps the numeric width intact across a save/parse cycle, so a value
//! stored as `Int64` is read back as `Int64` and not as some normalised number.
//! Plain JSON written by other clients is accepted: strings and booleans map to
//! their variants, integers to `Int64` (or `UInt64` above `i64::MAX`), other
//! numbers to `Float64`, and everything else to [`Value::Json`]. Writers that
//! decode every JSON number as a float64 see a plain `12` as a float; here it
//! reads as `Int64`, so `float64("n", ..)` misses it and `int64("n", ..)` hits.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{self, Serialize, SerializeStruct, Serializer};
use serde_json::Value as JsonValue;

/// A single value held in a session
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(isize),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt(usize),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Any other JSON-representable value
    Json(JsonValue),
}

impl Value {
    /// Tag written next to the payload
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt(_) => "uint",
            Value::UInt8(_) => "uint8",
            Value::UInt16(_) => "uint16",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
        }
    }

    /// Map untagged JSON onto the closest variant
    fn from_plain(raw: JsonValue) -> Value {
        match raw {
            JsonValue::Bool(v) => Value::Bool(v),
            JsonValue::String(v) => Value::String(v),
            JsonValue::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Value::Int64(v)
                } else if let Some(v) = n.as_u64() {
                    Value::UInt64(v)
                } else {
                    match n.as_f64() {
                        Some(v) => Value::Float64(v),
                        None => Value::Json(JsonValue::Number(n)),
                    }
                }
            }
            other => Value::Json(other),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Value", 2)?;
        state.serialize_field("type", self.type_name())?;
        match self {
            Value::Bool(v) => state.serialize_field("value", v)?,
            Value::Int(v) => state.serialize_field("value", v)?,
            Value::Int8(v) => state.serialize_field("value", v)?,
            Value::Int16(v) => state.serialize_field("value", v)?,
            Value::Int32(v) => state.serialize_field("value", v)?,
            Value::Int64(v) => state.serialize_field("value", v)?,
            Value::UInt(v) => state.serialize_field("value", v)?,
            Value::UInt8(v) => state.serialize_field("value", v)?,
            Value::UInt16(v) => state.serialize_field("value", v)?,
            Value::UInt32(v) => state.serialize_field("value", v)?,
            Value::UInt64(v) => state.serialize_field("value", v)?,
            Value::Float32(v) => {
                // serde_json would silently write null for these
                if !v.is_finite() {
                    return Err(ser::Error::custom(format!("non-finite float32: {}", v)));
                }
                state.serialize_field("value", v)?
            }
            Value::Float64(v) => {
                if !v.is_finite() {
                    return Err(ser::Error::custom(format!("non-finite float64: {}", v)));
                }
                state.serialize_field("value", v)?
            }
            Value::String(v) => state.serialize_field("value", v)?,
            Value::Bytes(v) => state.serialize_field("value", &STANDARD.encode(v))?,
            Value::Json(v) => state.serialize_field("value", v)?,
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = JsonValue::deserialize(deserializer)?;

        let decoded = match &raw {
            JsonValue::Object(map) if map.len() == 2 => match (map.get("type"), map.get("value")) {
                (Some(JsonValue::String(tag)), Some(payload)) => decode_tagged(tag, payload),
                _ => None,
            },
            _ => None,
        };

        match decoded {
            Some(result) => result.map_err(de::Error::custom),
            None => Ok(Value::from_plain(raw)),
        }
    }
}

/// Decode a tagged payload. Returns None when the tag is unknown so the
/// whole object is treated as plain JSON.
fn decode_tagged(tag: &str, payload: &JsonValue) -> Option<Result<Value, String>> {
    let value = match tag {
        "bool" => payload.as_bool().map(Value::Bool),
        "int" => payload.as_i64().and_then(|n| isize::try_from(n).ok()).map(Value::Int),
        "int8" => payload.as_i64().and_then(|n| i8::try_from(n).ok()).map(Value::Int8),
        "int16" => payload.as_i64().and_then(|n| i16::try_from(n).ok()).map(Value::Int16),
        "int32" => payload.as_i64().and_then(|n| i32::try_from(n).ok()).map(Value::Int32),
        "int64" => payload.as_i64().map(Value::Int64),
        "uint" => payload.as_u64().and_then(|n| usize::try_from(n).ok()).map(Value::UInt),
        "uint8" => payload.as_u64().and_then(|n| u8::try_from(n).ok()).map(Value::UInt8),
        "uint16" => payload.as_u64().and_then(|n| u16::try_from(n).ok()).map(Value::UInt16),
        "uint32" => payload.as_u64().and_then(|n| u32::try_from(n).ok()).map(Value::UInt32),
        "uint64" => payload.as_u64().map(Value::UInt64),
        "float32" => payload.as_f64().map(|n| Value::Float32(n as f32)),
        "float64" => payload.as_f64().map(Value::Float64),
        "string" => payload.as_str().map(|s| Value::String(s.to_owned())),
        "bytes" => match payload.as_str().map(|s| STANDARD.decode(s)) {
            Some(Ok(bytes)) => Some(Value::Bytes(bytes)),
            Some(Err(e)) => return Some(Err(format!("invalid base64 in bytes value: {}", e))),
            None => None,
        },
        "json" => Some(Value::Json(payload.clone())),
        _ => return None,
    };
    Some(value.ok_or_else(|| format!("payload does not fit type `{}`: {}", tag, payload)))
}

/// Exact-variant extraction used by the typed accessors
///
/// There is no coercion: an `Int64` never satisfies a request for `isize`.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! value_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_conversions!(
    Bool => bool,
    Int => isize,
    Int8 => i8,
    Int16 => i16,
    Int32 => i32,
    Int64 => i64,
    UInt => usize,
    UInt8 => u8,
    UInt16 => u16,
    UInt32 => u32,
    UInt64 => u64,
    Float32 => f32,
    Float64 => f64,
    String => String,
    Bytes => Vec<u8>,
    Json => JsonValue,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

/// Generates the named `(value, found)` accessors on any type that has a
/// `typed::<T>(key, fallback)` method.
macro_rules! typed_accessors {
    () => {
        /// Get a `bool` stored under `key`
        pub fn bool(&self, key: &str, fallback: bool) -> (bool, bool) {
            self.typed(key, fallback)
        }

        /// Get an `isize` stored under `key`
        pub fn int(&self, key: &str, fallback: isize) -> (isize, bool) {
            self.typed(key, fallback)
        }

        pub fn int8(&self, key: &str, fallback: i8) -> (i8, bool) {
            self.typed(key, fallback)
        }

        pub fn int16(&self, key: &str, fallback: i16) -> (i16, bool) {
            self.typed(key, fallback)
        }

        pub fn int32(&self, key: &str, fallback: i32) -> (i32, bool) {
            self.typed(key, fallback)
        }

        pub fn int64(&self, key: &str, fallback: i64) -> (i64, bool) {
            self.typed(key, fallback)
        }

        /// Get a `usize` stored under `key`
        pub fn uint(&self, key: &str, fallback: usize) -> (usize, bool) {
            self.typed(key, fallback)
        }

        pub fn uint8(&self, key: &str, fallback: u8) -> (u8, bool) {
            self.typed(key, fallback)
        }

        pub fn uint16(&self, key: &str, fallback: u16) -> (u16, bool) {
            self.typed(key, fallback)
        }

        pub fn uint32(&self, key: &str, fallback: u32) -> (u32, bool) {
            self.typed(key, fallback)
        }

        pub fn uint64(&self, key: &str, fallback: u64) -> (u64, bool) {
            self.typed(key, fallback)
        }

        pub fn float32(&self, key: &str, fallback: f32) -> (f32, bool) {
            self.typed(key, fallback)
        }

        pub fn float64(&self, key: &str, fallback: f64) -> (f64, bool) {
            self.typed(key, fallback)
        }

        /// Get a string stored under `key`
        pub fn string(&self, key: &str, fallback: String) -> (String, bool) {
            self.typed(key, fallback)
        }

        /// Get a byte sequence stored under `key`
        pub fn bytes(&self, key: &str, fallback: Vec<u8>) -> (Vec<u8>, bool) {
            self.typed(key, fallback)
        }
    };
}

pub(crate) use typed_accessors;
