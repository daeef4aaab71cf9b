//! Tensor element types and descriptors

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum tensor rank
pub const MAX_DIMS: usize = 4;

/// Tensor element type (GGML type tags)
///
/// Only fixed-width element types are supported; block-quantized types are
/// rejected as [`Error::UnsupportedElementType`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// 32-bit floating point
    F32 = 0,
    /// 16-bit floating point (IEEE)
    F16 = 1,
    /// 8-bit signed integer
    I8 = 24,
    /// 16-bit signed integer
    I16 = 25,
    /// 32-bit signed integer
    I32 = 26,
    /// 64-bit signed integer
    I64 = 27,
    /// 64-bit floating point
    F64 = 28,
    /// Brain floating point (bfloat16)
    BF16 = 30,
}

impl ElementType {
    /// Wire tag
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Parse a wire tag
    pub fn from_tag(tag: u32) -> Result<Self> {
        Ok(match tag {
            0 => Self::F32,
            1 => Self::F16,
            24 => Self::I8,
            25 => Self::I16,
            26 => Self::I32,
            27 => Self::I64,
            28 => Self::F64,
            30 => Self::BF16,
            other => return Err(Error::UnsupportedElementType(other)),
        })
    }

    /// Size of one element in bytes
    #[must_use]
    pub const fn width(self) -> u64 {
        match self {
            Self::I8 => 1,
            Self::F16 | Self::BF16 | Self::I16 => 2,
            Self::F32 | Self::I32 => 4,
            Self::F64 | Self::I64 => 8,
        }
    }

    /// Name of the element type
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F64 => "f64",
            Self::BF16 => "bf16",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ElementType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "float32" | "f32" => Ok(Self::F32),
            "float16" | "f16" => Ok(Self::F16),
            "bfloat16" | "bf16" => Ok(Self::BF16),
            "float64" | "f64" => Ok(Self::F64),
            "int8" | "i8" => Ok(Self::I8),
            "int16" | "i16" => Ok(Self::I16),
            "int32" | "i32" => Ok(Self::I32),
            "int64" | "i64" => Ok(Self::I64),
            _ => Err(format!("Unknown element type: {s}")),
        }
    }
}

/// Tensor descriptor: name, element type, shape and data offset
///
/// `dims[0]` is the innermost (fastest-varying) extent. `offset` is relative
/// to the start of the data section and is assigned by
/// [`Container::layout`](crate::Container::layout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorDescriptor {
    /// Tensor name
    pub name: String,
    /// Element type
    pub element_type: ElementType,
    /// Extents, innermost first
    pub dims: Vec<u64>,
    /// Byte offset within the data section
    pub offset: u64,
}

impl TensorDescriptor {
    /// Create a descriptor with offset 0
    pub fn new(name: impl Into<String>, element_type: ElementType, dims: &[u64]) -> Self {
        Self {
            name: name.into(),
            element_type,
            dims: dims.to_vec(),
            offset: 0,
        }
    }

    /// Number of dimensions
    #[must_use]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Product of the extents (saturating; call [`validate`](Self::validate) first)
    #[must_use]
    pub fn element_count(&self) -> u64 {
        self.dims.iter().fold(1u64, |acc, &d| acc.saturating_mul(d))
    }

    /// Size of the tensor data in bytes (saturating)
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        self.element_count().saturating_mul(self.element_type.width())
    }

    /// Check rank, extents and byte size
    pub fn validate(&self) -> Result<()> {
        if self.dims.is_empty() || self.dims.len() > MAX_DIMS {
            return Err(Error::InvalidRank {
                name: self.name.clone(),
                rank: self.dims.len() as u64,
            });
        }
        if let Some(axis) = self.dims.iter().position(|&d| d == 0 || d > i64::MAX as u64) {
            return Err(Error::InvalidDimension {
                name: self.name.clone(),
                message: format!(
                    "extent {} on axis {axis} is not positive",
                    self.dims[axis] as i64
                ),
            });
        }
        self.dims
            .iter()
            .try_fold(self.element_type.width(), |acc, &d| acc.checked_mul(d))
            .filter(|&size| size <= i64::MAX as u64)
            .ok_or_else(|| Error::InvalidDimension {
                name: self.name.clone(),
                message: format!("byte size of shape {:?} overflows", self.dims),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_element_width() {
        assert_eq!(ElementType::F32.width(), 4);
        assert_eq!(ElementType::F64.width(), 8);
        assert_eq!(ElementType::F16.width(), 2);
        assert_eq!(ElementType::BF16.width(), 2);
        assert_eq!(ElementType::I8.width(), 1);
    }

    #[test]
    fn test_element_tags() {
        for ty in [
            ElementType::F32,
            ElementType::F16,
            ElementType::I8,
            ElementType::I16,
            ElementType::I32,
            ElementType::I64,
            ElementType::F64,
            ElementType::BF16,
        ] {
            assert_eq!(ElementType::from_tag(ty.tag()).unwrap(), ty);
        }
        // Q4_0 is block-quantized
        assert!(matches!(
            ElementType::from_tag(2),
            Err(Error::UnsupportedElementType(2))
        ));
    }

    #[test]
    fn test_element_type_from_str() {
        assert_eq!(ElementType::from_str("float32"), Ok(ElementType::F32));
        assert_eq!(ElementType::from_str("BF16"), Ok(ElementType::BF16));
        assert!(ElementType::from_str("q4_0").is_err());
    }

    #[test]
    fn test_descriptor_sizes() {
        let desc = TensorDescriptor::new("weight", ElementType::F32, &[3, 2]);
        assert_eq!(desc.rank(), 2);
        assert_eq!(desc.element_count(), 6);
        assert_eq!(desc.byte_size(), 24);
        desc.validate().unwrap();
    }

    #[test]
    fn test_rank_bounds() {
        let scalar = TensorDescriptor::new("s", ElementType::F32, &[]);
        assert!(matches!(scalar.validate(), Err(Error::InvalidRank { rank: 0, .. })));

        let five = TensorDescriptor::new("t", ElementType::F32, &[1, 1, 1, 1, 1]);
        assert!(matches!(five.validate(), Err(Error::InvalidRank { rank: 5, .. })));

        let four = TensorDescriptor::new("t", ElementType::F32, &[1, 2, 3, 4]);
        four.validate().unwrap();
    }

    #[test]
    fn test_invalid_dimensions() {
        let zero = TensorDescriptor::new("z", ElementType::F32, &[4, 0]);
        assert!(matches!(zero.validate(), Err(Error::InvalidDimension { .. })));

        let negative = TensorDescriptor::new("n", ElementType::F32, &[(-3i64) as u64]);
        assert!(matches!(negative.validate(), Err(Error::InvalidDimension { .. })));

        let huge = TensorDescriptor::new("h", ElementType::F64, &[1 << 31, 1 << 31, 4]);
        assert!(matches!(huge.validate(), Err(Error::InvalidDimension { .. })));
    }
}
