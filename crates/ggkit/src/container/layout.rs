//! Layout pass: header size, data offset and per-tensor offsets

use serde::Serialize;
use tracing::debug;

use super::wire::{descriptor_len, metadata_entry_len};
use super::{Container, HEADER_LEN};
use crate::catalog::TensorCatalog;
use crate::error::{Error, Result};
use crate::metadata::MetadataStore;

/// Computed byte layout of a serialized container
///
/// All tensor offsets are relative to `data_offset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    /// Alignment used for the data section and every tensor
    pub alignment: u64,
    /// Bytes occupied by the header, metadata and descriptors
    pub header_len: u64,
    /// Absolute start of the data section
    pub data_offset: u64,
    /// Offset of each tensor in catalog order
    pub offsets: Vec<u64>,
    /// Size of the data section including trailing padding
    pub data_len: u64,
}

impl Layout {
    /// Total serialized size in bytes
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.data_offset + self.data_len
    }

    /// Zero bytes between the descriptors and the data section
    #[must_use]
    pub fn header_padding(&self) -> u64 {
        self.data_offset - self.header_len
    }

    pub(crate) fn compute(
        metadata: &MetadataStore,
        tensors: &TensorCatalog,
        alignment: u64,
    ) -> Result<Self> {
        let header_len = metadata
            .iter()
            .map(|(key, value)| metadata_entry_len(key, value))
            .chain(tensors.iter().map(descriptor_len))
            .try_fold(HEADER_LEN, u64::checked_add)
            .ok_or_else(|| overflow("header"))?;
        let data_offset =
            checked_align_up(header_len, alignment).ok_or_else(|| overflow("header"))?;

        let mut offsets = Vec::with_capacity(tensors.count());
        let mut cursor = 0u64;
        for desc in tensors {
            offsets.push(cursor);
            cursor = cursor
                .checked_add(desc.byte_size())
                .and_then(|end| checked_align_up(end, alignment))
                .ok_or_else(|| overflow(&desc.name))?;
        }
        data_offset
            .checked_add(cursor)
            .ok_or_else(|| overflow("data section"))?;

        Ok(Self {
            alignment,
            header_len,
            data_offset,
            offsets,
            data_len: cursor,
        })
    }
}

fn checked_align_up(value: u64, alignment: u64) -> Option<u64> {
    value
        .checked_add(alignment - 1)
        .map(|v| v & !(alignment - 1))
}

fn overflow(what: &str) -> Error {
    Error::LayoutInconsistent(format!("size of {what} overflows u64"))
}

impl Container {
    /// Compute the byte layout and assign tensor offsets
    ///
    /// This is the first pass of a write: it re-reads `general.alignment`
    /// from metadata, sizes the header exactly, and stores each tensor's
    /// offset in the catalog. Calling it twice yields the same result.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAlignment`] or [`Error::TypeMismatch`] when
    /// `general.alignment` is unusable, and [`Error::LayoutInconsistent`]
    /// when sizes overflow.
    pub fn layout(&mut self) -> Result<Layout> {
        self.alignment = super::alignment_from_metadata(&self.metadata)?;
        let layout = Layout::compute(&self.metadata, &self.tensors, self.alignment)?;
        self.tensors.assign_offsets(&layout.offsets);
        self.data_offset = Some(layout.data_offset);
        debug!(
            alignment = layout.alignment,
            header_len = layout.header_len,
            data_offset = layout.data_offset,
            data_len = layout.data_len,
            "computed layout"
        );
        Ok(layout)
    }
}
