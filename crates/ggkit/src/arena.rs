//! Tensor arena: owned, aligned byte buffers indexed by tensor name

use std::collections::HashMap;

use half::{bf16, f16};

use crate::error::{Error, Result};
use crate::tensor::{ElementType, TensorDescriptor};

/// Rust types that can view tensor data without copying
pub trait Element: bytemuck::Pod {
    /// Element type this Rust type corresponds to
    const ELEMENT_TYPE: ElementType;
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const ELEMENT_TYPE: ElementType = ElementType::$variant;
            }
        )*
    };
}

impl_element! {
    f32 => F32,
    f16 => F16,
    bf16 => BF16,
    f64 => F64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
}

/// One arena buffer
///
/// Backed by `u64` words so that every element type can be viewed in place.
#[derive(Debug)]
struct Slot {
    name: String,
    words: Vec<u64>,
    len: usize,
    element_type: Option<ElementType>,
    dims: Vec<u64>,
}

impl Slot {
    fn allocate(name: &str, byte_size: u64) -> Result<Self> {
        let failed = || Error::AllocationFailed {
            name: name.to_string(),
            size: byte_size,
        };
        let len = usize::try_from(byte_size).map_err(|_| failed())?;
        let word_count = len.div_ceil(8);

        let mut words = Vec::new();
        words.try_reserve_exact(word_count).map_err(|_| failed())?;
        words.resize(word_count, 0u64);

        Ok(Self {
            name: name.to_string(),
            words,
            len,
            element_type: None,
            dims: Vec::new(),
        })
    }

    fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.len]
    }
}

/// Owner of tensor data buffers
///
/// Buffers are fixed-size once allocated and are all freed when the arena is
/// dropped.
#[derive(Debug, Default)]
pub struct TensorArena {
    slots: Vec<Slot>,
    by_name: HashMap<String, usize>,
    total_bytes: u64,
}

impl TensorArena {
    /// Create an empty arena
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zeroed, untyped buffer of `byte_size` bytes
    pub fn allocate(&mut self, name: &str, byte_size: u64) -> Result<&mut [u8]> {
        let slot = self.push_slot(name, byte_size)?;
        Ok(slot.bytes_mut())
    }

    /// Allocate a zeroed buffer sized and typed for `descriptor`
    pub fn allocate_tensor(&mut self, descriptor: &TensorDescriptor) -> Result<&mut [u8]> {
        descriptor.validate()?;
        let slot = self.push_slot(&descriptor.name, descriptor.byte_size())?;
        slot.element_type = Some(descriptor.element_type);
        slot.dims.clone_from(&descriptor.dims);
        Ok(slot.bytes_mut())
    }

    /// Copy raw bytes into a new untyped buffer
    pub fn insert_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.allocate(name, bytes.len() as u64)?
            .copy_from_slice(bytes);
        Ok(())
    }

    /// Copy typed elements into a new buffer described by `descriptor`
    pub fn insert<T: Element>(&mut self, descriptor: &TensorDescriptor, data: &[T]) -> Result<()> {
        if T::ELEMENT_TYPE != descriptor.element_type {
            return Err(Error::TypeMismatch {
                key: descriptor.name.clone(),
                expected: descriptor.element_type.name(),
                found: T::ELEMENT_TYPE.name(),
            });
        }
        descriptor.validate()?;
        if data.len() as u64 != descriptor.element_count() {
            return Err(Error::LayoutInconsistent(format!(
                "tensor '{}' has {} elements but {} were supplied",
                descriptor.name,
                descriptor.element_count(),
                data.len()
            )));
        }
        self.allocate_tensor(descriptor)?
            .copy_from_slice(bytemuck::cast_slice(data));
        Ok(())
    }

    /// View a buffer by name
    pub fn get(&self, name: &str) -> Result<TensorView<'_>> {
        let slot = self.slot(name)?;
        Ok(TensorView {
            name: &slot.name,
            bytes: slot.bytes(),
            element_type: slot.element_type,
            dims: &slot.dims,
        })
    }

    /// View a buffer through `descriptor`'s element type and shape
    ///
    /// Untyped buffers (from [`allocate`](Self::allocate) or
    /// [`insert_bytes`](Self::insert_bytes)) take the descriptor's type, so
    /// [`TensorView::as_slice`] checks them against it.
    pub fn view<'a>(&'a self, descriptor: &'a TensorDescriptor) -> Result<TensorView<'a>> {
        let view = self.get(&descriptor.name)?;
        if let Some(found) = view.element_type {
            if found != descriptor.element_type {
                return Err(Error::TypeMismatch {
                    key: descriptor.name.clone(),
                    expected: descriptor.element_type.name(),
                    found: found.name(),
                });
            }
        }
        Ok(TensorView {
            element_type: Some(descriptor.element_type),
            dims: &descriptor.dims,
            ..view
        })
    }

    /// Mutable bytes of a buffer, for filling before a write
    pub fn get_mut(&mut self, name: &str) -> Result<&mut [u8]> {
        let idx = self.index(name)?;
        Ok(self.slots[idx].bytes_mut())
    }

    /// Whether a buffer exists for `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of buffers
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the arena holds no buffers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Sum of all buffer sizes in bytes
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Buffer names in allocation order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.name.as_str())
    }

    fn index(&self, name: &str) -> Result<usize> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::KeyNotFound(name.to_string()))
    }

    fn slot(&self, name: &str) -> Result<&Slot> {
        self.index(name).map(|idx| &self.slots[idx])
    }

    fn push_slot(&mut self, name: &str, byte_size: u64) -> Result<&mut Slot> {
        if self.by_name.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        let slot = Slot::allocate(name, byte_size)?;
        let idx = self.slots.len();
        self.by_name.insert(name.to_string(), idx);
        self.slots.push(slot);
        self.total_bytes += byte_size;
        Ok(&mut self.slots[idx])
    }
}

/// Borrowed view of one arena buffer
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    name: &'a str,
    bytes: &'a [u8],
    element_type: Option<ElementType>,
    dims: &'a [u64],
}

impl<'a> TensorView<'a> {
    /// Tensor name
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Raw bytes
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Element type, if the buffer was allocated for a descriptor
    #[must_use]
    pub fn element_type(&self) -> Option<ElementType> {
        self.element_type
    }

    /// Extents, innermost first; empty for untyped buffers
    #[must_use]
    pub fn dims(&self) -> &'a [u64] {
        self.dims
    }

    /// View the data as a slice of `T` without copying
    ///
    /// Checks the element type (for typed buffers) and that
    /// `element_count * width` equals the buffer length.
    pub fn as_slice<T: Element>(&self) -> Result<&'a [T]> {
        if let Some(ty) = self.element_type {
            if ty != T::ELEMENT_TYPE {
                return Err(Error::TypeMismatch {
                    key: self.name.to_string(),
                    expected: T::ELEMENT_TYPE.name(),
                    found: ty.name(),
                });
            }
            let expected = self
                .dims
                .iter()
                .fold(ty.width(), |acc, &d| acc.saturating_mul(d));
            if expected != self.bytes.len() as u64 {
                return Err(Error::LayoutInconsistent(format!(
                    "tensor '{}' expects {expected} bytes, buffer holds {}",
                    self.name,
                    self.bytes.len()
                )));
            }
        }
        bytemuck::try_cast_slice(self.bytes).map_err(|e| {
            Error::LayoutInconsistent(format!(
                "tensor '{}' cannot be viewed as {}: {e}",
                self.name,
                T::ELEMENT_TYPE
            ))
        })
    }

    /// Copy the data out as `f32`, widening half-precision types
    ///
    /// Untyped buffers are read as `f32`.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>> {
        match self.element_type.unwrap_or(ElementType::F32) {
            ElementType::F32 => self.as_slice::<f32>().map(<[f32]>::to_vec),
            ElementType::F16 => Ok(self.as_slice::<f16>()?.iter().map(|v| v.to_f32()).collect()),
            ElementType::BF16 => Ok(self.as_slice::<bf16>()?.iter().map(|v| v.to_f32()).collect()),
            other => Err(Error::TypeMismatch {
                key: self.name.to_string(),
                expected: "f32",
                found: other.name(),
            }),
        }
    }
}
