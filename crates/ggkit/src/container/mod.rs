//! Model container: metadata, tensor catalog and the binary format
//!
//! ## Format
//!
//! All integers are little-endian. Offsets in tensor descriptors are
//! relative to the data section.
//!
//! ```text
//! magic "GGUF" | version u32 | tensor count u64 | metadata count u64
//! metadata entry * n : key string | kind u32 | payload
//! descriptor * n     : name string | rank u32 | dims u64 * rank | type u32 | offset u64
//! zero padding to alignment
//! tensor data, each padded to alignment
//! ```

mod layout;
mod reader;
mod wire;
mod writer;

pub use layout::Layout;

use crate::arena::{Element, TensorArena};
use crate::catalog::TensorCatalog;
use crate::config::{check_alignment, DEFAULT_ALIGNMENT};
use crate::error::{Error, Result};
use crate::metadata::MetadataStore;
use crate::tensor::TensorDescriptor;

/// Magic bytes at the start of every container
pub const MAGIC: [u8; 4] = *b"GGUF";

/// Format version written by this crate
pub const VERSION: u32 = 3;

/// Oldest format version this crate reads
pub const MIN_VERSION: u32 = 2;

/// Metadata key holding the data alignment
pub const ALIGNMENT_KEY: &str = "general.alignment";

/// Fixed header size: magic, version and the two counts
pub(crate) const HEADER_LEN: u64 = 4 + 4 + 8 + 8;

/// Resolve the alignment declared in metadata, defaulting when absent
pub(crate) fn alignment_from_metadata(metadata: &MetadataStore) -> Result<u64> {
    match metadata.get_typed::<u32>(ALIGNMENT_KEY) {
        Ok(alignment) => check_alignment(u64::from(alignment)),
        Err(Error::KeyNotFound(_)) => Ok(u64::from(DEFAULT_ALIGNMENT)),
        Err(e) => Err(e),
    }
}

/// A model container
///
/// Owns the metadata store and tensor catalog. Tensor bytes live in a
/// separate [`TensorArena`] so a container can be inspected without loading
/// data.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    version: u32,
    alignment: u64,
    metadata: MetadataStore,
    tensors: TensorCatalog,
    data_offset: Option<u64>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Create an empty container with the default alignment
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: VERSION,
            alignment: u64::from(DEFAULT_ALIGNMENT),
            metadata: MetadataStore::new(),
            tensors: TensorCatalog::new(),
            data_offset: None,
        }
    }

    /// Format version (the version read, or [`VERSION`] for new containers)
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Data alignment in bytes
    #[must_use]
    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    /// Set the data alignment, recording it as `general.alignment`
    pub fn set_alignment(&mut self, alignment: u32) -> Result<()> {
        self.alignment = check_alignment(u64::from(alignment))?;
        self.metadata.set(ALIGNMENT_KEY, alignment);
        Ok(())
    }

    /// Absolute start of the data section, known after a read or layout
    #[must_use]
    pub fn data_offset(&self) -> Option<u64> {
        self.data_offset
    }

    /// Metadata store
    #[must_use]
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Mutable metadata store
    pub fn metadata_mut(&mut self) -> &mut MetadataStore {
        &mut self.metadata
    }

    /// Tensor catalog
    #[must_use]
    pub fn tensors(&self) -> &TensorCatalog {
        &self.tensors
    }

    /// Mutable tensor catalog
    pub fn tensors_mut(&mut self) -> &mut TensorCatalog {
        &mut self.tensors
    }

    /// Register a tensor and copy its data into `arena` in one step
    ///
    /// Nothing is registered if the shape, name or data length is rejected.
    pub fn add_tensor<T: Element>(
        &mut self,
        arena: &mut TensorArena,
        name: &str,
        dims: &[u64],
        data: &[T],
    ) -> Result<()> {
        let desc = TensorDescriptor::new(name, T::ELEMENT_TYPE, dims);
        desc.validate()?;
        if self.tensors.find(name).is_some() {
            return Err(Error::DuplicateName(name.to_string()));
        }
        arena.insert(&desc, data)?;
        self.tensors.add(desc)
    }
}
