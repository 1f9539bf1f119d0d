//! Value kinds and their runtime representation.
//!
//! Every [`Kind`] accepts exactly one [`Value`] variant. There is no implicit
//! coercion: `Value::String("42")` is not a valid `int32`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Kind ─────────────────────────────────────────────────────────────────────

/// The closed set of primitive field kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Zero value; never valid on a field.
    #[default]
    Invalid,
    String,
    Bytes,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    /// Arbitrary precision integer carried as a base-10 string.
    Integer,
    /// Arbitrary precision decimal carried as a string.
    Decimal,
    Bool,
    /// UTC timestamp.
    Time,
    /// Signed duration in nanoseconds.
    Duration,
    Float32,
    Float64,
    /// Raw address bytes.
    Address,
    /// One label of an [`EnumDefinition`](crate::EnumDefinition).
    Enum,
    Json,
}

impl Kind {
    /// All kinds that may appear on a field.
    pub const ALL: [Kind; 20] = [
        Kind::String,
        Kind::Bytes,
        Kind::Int8,
        Kind::Uint8,
        Kind::Int16,
        Kind::Uint16,
        Kind::Int32,
        Kind::Uint32,
        Kind::Int64,
        Kind::Uint64,
        Kind::Integer,
        Kind::Decimal,
        Kind::Bool,
        Kind::Time,
        Kind::Duration,
        Kind::Float32,
        Kind::Float64,
        Kind::Address,
        Kind::Enum,
        Kind::Json,
    ];

    /// Stable lowercase name, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Invalid => "invalid",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Int8 => "int8",
            Kind::Uint8 => "uint8",
            Kind::Int16 => "int16",
            Kind::Uint16 => "uint16",
            Kind::Int32 => "int32",
            Kind::Uint32 => "uint32",
            Kind::Int64 => "int64",
            Kind::Uint64 => "uint64",
            Kind::Integer => "integer",
            Kind::Decimal => "decimal",
            Kind::Bool => "bool",
            Kind::Time => "time",
            Kind::Duration => "duration",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Address => "address",
            Kind::Enum => "enum",
            Kind::Json => "json",
        }
    }

    /// Returns `true` for every kind except [`Kind::Invalid`].
    pub fn is_valid(&self) -> bool {
        !matches!(self, Kind::Invalid)
    }

    /// Checks that `value` uses this kind's runtime representation.
    ///
    /// `Null` is never accepted here; nullability is a property of the field.
    /// Enum membership is also checked at the field level, since the kind
    /// alone does not know the declared labels.
    pub fn validate_value_type(&self, value: &Value) -> Result<(), String> {
        let ok = match (self, value) {
            (Kind::String, Value::String(_))
            | (Kind::Bytes, Value::Bytes(_))
            | (Kind::Int8, Value::Int8(_))
            | (Kind::Uint8, Value::Uint8(_))
            | (Kind::Int16, Value::Int16(_))
            | (Kind::Uint16, Value::Uint16(_))
            | (Kind::Int32, Value::Int32(_))
            | (Kind::Uint32, Value::Uint32(_))
            | (Kind::Int64, Value::Int64(_))
            | (Kind::Uint64, Value::Uint64(_))
            | (Kind::Bool, Value::Bool(_))
            | (Kind::Time, Value::Time(_))
            | (Kind::Duration, Value::Duration(_))
            | (Kind::Float32, Value::Float32(_))
            | (Kind::Float64, Value::Float64(_))
            | (Kind::Address, Value::Address(_))
            | (Kind::Enum, Value::Enum(_))
            | (Kind::Json, Value::Json(_)) => true,
            (Kind::Integer, Value::Integer(s)) => {
                if !is_integer_string(s) {
                    return Err(format!("expected integer, got malformed string {s:?}"));
                }
                true
            }
            (Kind::Decimal, Value::Decimal(s)) => {
                if !is_decimal_string(s) {
                    return Err(format!("expected decimal, got malformed string {s:?}"));
                }
                true
            }
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(format!("expected {}, got {}", self.name(), value.kind_name()))
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Value ────────────────────────────────────────────────────────────────────

/// A single typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    Null,
    String(String),
    Bytes(Vec<u8>),
    Int8(i8),
    Uint8(u8),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Integer(String),
    Decimal(String),
    Bool(bool),
    Time(DateTime<Utc>),
    Duration(i64),
    Float32(f32),
    Float64(f64),
    Address(Vec<u8>),
    Enum(String),
    Json(serde_json::Value),
}

impl Value {
    /// Name of the representation, matching [`Kind::name`] where one exists.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Int8(_) => "int8",
            Value::Uint8(_) => "uint8",
            Value::Int16(_) => "int16",
            Value::Uint16(_) => "uint16",
            Value::Int32(_) => "int32",
            Value::Uint32(_) => "uint32",
            Value::Int64(_) => "int64",
            Value::Uint64(_) => "uint64",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Bool(_) => "bool",
            Value::Time(_) => "time",
            Value::Duration(_) => "duration",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Address(_) => "address",
            Value::Enum(_) => "enum",
            Value::Json(_) => "json",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

// ─── String formats ───────────────────────────────────────────────────────────

/// `-?[0-9]+`
fn is_integer_string(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `[+-]?(digits(.digits*)?|.digits)([eE][+-]?digits)?`
fn is_decimal_string(s: &str) -> bool {
    let s = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
        None => (s, None),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = match frac_part {
        Some(f) => all_digits(int_part) && all_digits(f) && !(int_part.is_empty() && f.is_empty()),
        None => !int_part.is_empty() && all_digits(int_part),
    };
    if !mantissa_ok {
        return false;
    }

    match exponent {
        Some(e) => {
            let e = e.strip_prefix(['-', '+']).unwrap_or(e);
            !e.is_empty() && all_digits(e)
        }
        None => true,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
