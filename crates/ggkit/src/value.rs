//! Metadata values: one scalar or one homogeneous array

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Value kind tags as stored on the wire
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// 8-bit unsigned integer
    UInt8 = 0,
    /// 8-bit signed integer
    Int8 = 1,
    /// 16-bit unsigned integer
    UInt16 = 2,
    /// 16-bit signed integer
    Int16 = 3,
    /// 32-bit unsigned integer
    UInt32 = 4,
    /// 32-bit signed integer
    Int32 = 5,
    /// 32-bit float
    Float32 = 6,
    /// Boolean, one byte
    Bool = 7,
    /// Length-prefixed UTF-8 string
    String = 8,
    /// Homogeneous array of any non-array kind
    Array = 9,
    /// 64-bit unsigned integer
    UInt64 = 10,
    /// 64-bit signed integer
    Int64 = 11,
    /// 64-bit float
    Float64 = 12,
}

impl ValueKind {
    /// Wire tag
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Parse a wire tag
    pub fn from_tag(tag: u32) -> Result<Self> {
        Ok(match tag {
            0 => Self::UInt8,
            1 => Self::Int8,
            2 => Self::UInt16,
            3 => Self::Int16,
            4 => Self::UInt32,
            5 => Self::Int32,
            6 => Self::Float32,
            7 => Self::Bool,
            8 => Self::String,
            9 => Self::Array,
            10 => Self::UInt64,
            11 => Self::Int64,
            12 => Self::Float64,
            other => return Err(Error::UnknownValueKind(other)),
        })
    }

    /// Lowercase name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UInt8 => "uint8",
            Self::Int8 => "int8",
            Self::UInt16 => "uint16",
            Self::Int16 => "int16",
            Self::UInt32 => "uint32",
            Self::Int32 => "int32",
            Self::Float32 => "float32",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Array => "array",
            Self::UInt64 => "uint64",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
        }
    }

    /// Payload width for fixed-size kinds
    #[must_use]
    pub const fn scalar_width(self) -> Option<u64> {
        match self {
            Self::UInt8 | Self::Int8 | Self::Bool => Some(1),
            Self::UInt16 | Self::Int16 => Some(2),
            Self::UInt32 | Self::Int32 | Self::Float32 => Some(4),
            Self::UInt64 | Self::Int64 | Self::Float64 => Some(8),
            Self::String | Self::Array => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Homogeneous array payload
///
/// One vector per element kind, so the element kind can never change and the
/// declared length is always the vector's length.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    /// uint8 elements
    UInt8(Vec<u8>),
    /// int8 elements
    Int8(Vec<i8>),
    /// uint16 elements
    UInt16(Vec<u16>),
    /// int16 elements
    Int16(Vec<i16>),
    /// uint32 elements
    UInt32(Vec<u32>),
    /// int32 elements
    Int32(Vec<i32>),
    /// float32 elements
    Float32(Vec<f32>),
    /// bool elements
    Bool(Vec<bool>),
    /// string elements
    String(Vec<String>),
    /// uint64 elements
    UInt64(Vec<u64>),
    /// int64 elements
    Int64(Vec<i64>),
    /// float64 elements
    Float64(Vec<f64>),
}

impl Array {
    /// Element kind
    #[must_use]
    pub const fn element_kind(&self) -> ValueKind {
        match self {
            Self::UInt8(_) => ValueKind::UInt8,
            Self::Int8(_) => ValueKind::Int8,
            Self::UInt16(_) => ValueKind::UInt16,
            Self::Int16(_) => ValueKind::Int16,
            Self::UInt32(_) => ValueKind::UInt32,
            Self::Int32(_) => ValueKind::Int32,
            Self::Float32(_) => ValueKind::Float32,
            Self::Bool(_) => ValueKind::Bool,
            Self::String(_) => ValueKind::String,
            Self::UInt64(_) => ValueKind::UInt64,
            Self::Int64(_) => ValueKind::Int64,
            Self::Float64(_) => ValueKind::Float64,
        }
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::UInt8(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::String(v) => v.len(),
            Self::UInt64(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
        }
    }

    /// Whether the array has no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type name including the element kind, e.g. `array<int16>`
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self.element_kind() {
            ValueKind::UInt8 => "array<uint8>",
            ValueKind::Int8 => "array<int8>",
            ValueKind::UInt16 => "array<uint16>",
            ValueKind::Int16 => "array<int16>",
            ValueKind::UInt32 => "array<uint32>",
            ValueKind::Int32 => "array<int32>",
            ValueKind::Float32 => "array<float32>",
            ValueKind::Bool => "array<bool>",
            ValueKind::String => "array<string>",
            ValueKind::UInt64 => "array<uint64>",
            ValueKind::Int64 => "array<int64>",
            ValueKind::Float64 => "array<float64>",
            ValueKind::Array => "array<array>",
        }
    }
}

/// A metadata value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// uint8
    UInt8(u8),
    /// int8
    Int8(i8),
    /// uint16
    UInt16(u16),
    /// int16
    Int16(i16),
    /// uint32
    UInt32(u32),
    /// int32
    Int32(i32),
    /// float32
    Float32(f32),
    /// bool
    Bool(bool),
    /// UTF-8 string
    String(String),
    /// uint64
    UInt64(u64),
    /// int64
    Int64(i64),
    /// float64
    Float64(f64),
    /// Homogeneous array
    Array(Array),
}

impl Value {
    /// Value kind
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::UInt8(_) => ValueKind::UInt8,
            Self::Int8(_) => ValueKind::Int8,
            Self::UInt16(_) => ValueKind::UInt16,
            Self::Int16(_) => ValueKind::Int16,
            Self::UInt32(_) => ValueKind::UInt32,
            Self::Int32(_) => ValueKind::Int32,
            Self::Float32(_) => ValueKind::Float32,
            Self::Bool(_) => ValueKind::Bool,
            Self::String(_) => ValueKind::String,
            Self::UInt64(_) => ValueKind::UInt64,
            Self::Int64(_) => ValueKind::Int64,
            Self::Float64(_) => ValueKind::Float64,
            Self::Array(_) => ValueKind::Array,
        }
    }

    /// Type name; arrays include their element kind
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Array(array) => array.type_name(),
            other => other.kind().name(),
        }
    }

    /// Borrow as a string, if this is a string value
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as an array, if this is an array value
    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }
}

/// Typed extraction from a [`Value`] without coercion
pub trait FromValue<'a>: Sized {
    /// Name reported in type mismatches
    const TYPE_NAME: &'static str;

    /// Extract if the value has exactly this type
    fn from_value(value: &'a Value) -> Option<Self>;
}

macro_rules! impl_value_conversions {
    ($($ty:ty => $variant:ident, $name:literal;)*) => {
        $(
            impl<'a> FromValue<'a> for $ty {
                const TYPE_NAME: &'static str = $name;

                fn from_value(value: &'a Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }

            impl<'a> FromValue<'a> for &'a [$ty] {
                const TYPE_NAME: &'static str = concat!("array<", $name, ">");

                fn from_value(value: &'a Value) -> Option<Self> {
                    match value {
                        Value::Array(Array::$variant(items)) => Some(items.as_slice()),
                        _ => None,
                    }
                }
            }

            impl<'a> FromValue<'a> for Vec<$ty> {
                const TYPE_NAME: &'static str = concat!("array<", $name, ">");

                fn from_value(value: &'a Value) -> Option<Self> {
                    <&[$ty]>::from_value(value).map(<[$ty]>::to_vec)
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }

            impl From<Vec<$ty>> for Value {
                fn from(v: Vec<$ty>) -> Self {
                    Self::Array(Array::$variant(v))
                }
            }
        )*
    };
}

impl_value_conversions! {
    u8 => UInt8, "uint8";
    i8 => Int8, "int8";
    u16 => UInt16, "uint16";
    i16 => Int16, "int16";
    u32 => UInt32, "uint32";
    i32 => Int32, "int32";
    f32 => Float32, "float32";
    bool => Bool, "bool";
    u64 => UInt64, "uint64";
    i64 => Int64, "int64";
    f64 => Float64, "float64";
}

impl<'a> FromValue<'a> for &'a str {
    const TYPE_NAME: &'static str = "string";

    fn from_value(value: &'a Value) -> Option<Self> {
        value.as_str()
    }
}

impl<'a> FromValue<'a> for String {
    const TYPE_NAME: &'static str = "string";

    fn from_value(value: &'a Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl<'a> FromValue<'a> for &'a [String] {
    const TYPE_NAME: &'static str = "array<string>";

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Array(Array::String(items)) => Some(items.as_slice()),
            _ => None,
        }
    }
}

impl<'a> FromValue<'a> for Vec<String> {
    const TYPE_NAME: &'static str = "array<string>";

    fn from_value(value: &'a Value) -> Option<Self> {
        <&[String]>::from_value(value).map(<[String]>::to_vec)
    }
}

impl<'a> FromValue<'a> for &'a Array {
    const TYPE_NAME: &'static str = "array";

    fn from_value(value: &'a Value) -> Option<Self> {
        value.as_array()
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::Array(Array::String(v))
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Self::Array(Array::String(v.into_iter().map(str::to_owned).collect()))
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Self {
        Self::Array(v)
    }
}

const DISPLAY_ITEMS: usize = 8;

fn fmt_items<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    item: impl Fn(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    f.write_str("[")?;
    for (i, v) in items.iter().take(DISPLAY_ITEMS).enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item(f, v)?;
    }
    if items.len() > DISPLAY_ITEMS {
        write!(f, ", ... ({} total)", items.len())?;
    }
    f.write_str("]")
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt8(v) => fmt_items(f, v, |f, x| write!(f, "{x}")),
            Self::Int8(v) => fmt_items(f, v, |f, x| write!(f, "{x}")),
            Self::UInt16(v) => fmt_items(f, v, |f, x| write!(f, "{x}")),
            Self::Int16(v) => fmt_items(f, v, |f, x| write!(f, "{x}")),
            Self::UInt32(v) => fmt_items(f, v, |f, x| write!(f, "{x}")),
            Self::Int32(v) => fmt_items(f, v, |f, x| write!(f, "{x}")),
            Self::Float32(v) => fmt_items(f, v, |f, x| write!(f, "{x}")),
            Self::Bool(v) => fmt_items(f, v, |f, x| write!(f, "{x}")),
            Self::String(v) => fmt_items(f, v, |f, x| write!(f, "{x:?}")),
            Self::UInt64(v) => fmt_items(f, v, |f, x| write!(f, "{x}")),
            Self::Int64(v) => fmt_items(f, v, |f, x| write!(f, "{x}")),
            Self::Float64(v) => fmt_items(f, v, |f, x| write!(f, "{x}")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt8(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Array(a) => write!(f, "{a}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_roundtrip() {
        for tag in 0..=12 {
            let kind = ValueKind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
        assert!(matches!(
            ValueKind::from_tag(13),
            Err(Error::UnknownValueKind(13))
        ));
    }

    #[test]
    fn test_no_numeric_coercion() {
        let v = Value::from(5i32);
        assert_eq!(i32::from_value(&v), Some(5));
        assert_eq!(u32::from_value(&v), None);
        assert_eq!(i64::from_value(&v), None);
    }

    #[test]
    fn test_array_views() {
        let v = Value::from(vec![1i16, 2, 3, 4]);
        assert_eq!(v.kind(), ValueKind::Array);
        assert_eq!(v.type_name(), "array<int16>");
        assert_eq!(<&[i16]>::from_value(&v), Some(&[1i16, 2, 3, 4][..]));
        assert_eq!(<&[u16]>::from_value(&v), None);

        let s = Value::from(vec!["hello", "world", "!"]);
        let strings = Vec::<String>::from_value(&s).unwrap();
        assert_eq!(strings, vec!["hello", "world", "!"]);
    }

    #[test]
    fn test_display_truncates_long_arrays() {
        let v = Value::from((0u32..20).collect::<Vec<_>>());
        let shown = v.to_string();
        assert!(shown.starts_with("[0, 1, 2"));
        assert!(shown.ends_with("(20 total)]"));

        assert_eq!(Value::from("hi").to_string(), "\"hi\"");
    }
}
