//! Ordered tensor catalog with name lookup

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::tensor::TensorDescriptor;

/// Ordered collection of tensor descriptors
///
/// Order is registration order, which is also the order tensor data appears
/// in the data section.
#[derive(Debug, Clone, Default)]
pub struct TensorCatalog {
    descriptors: Vec<TensorDescriptor>,
    by_name: HashMap<String, usize>,
}

impl TensorCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor
    ///
    /// The descriptor's offset is ignored here and assigned by layout.
    pub fn add(&mut self, descriptor: TensorDescriptor) -> Result<()> {
        descriptor.validate()?;
        if self.by_name.contains_key(&descriptor.name) {
            return Err(Error::DuplicateName(descriptor.name));
        }
        self.by_name
            .insert(descriptor.name.clone(), self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Look up a descriptor by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&TensorDescriptor> {
        self.index_of(name).map(|idx| &self.descriptors[idx])
    }

    /// Position of a tensor in catalog order
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Descriptor at position `idx`
    #[must_use]
    pub fn at(&self, idx: usize) -> Option<&TensorDescriptor> {
        self.descriptors.get(idx)
    }

    /// Number of descriptors
    #[must_use]
    pub fn count(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Iterate descriptors in catalog order
    pub fn iter(&self) -> std::slice::Iter<'_, TensorDescriptor> {
        self.descriptors.iter()
    }

    /// Overwrite offsets in catalog order
    pub(crate) fn assign_offsets(&mut self, offsets: &[u64]) {
        debug_assert_eq!(offsets.len(), self.descriptors.len());
        for (desc, &offset) in self.descriptors.iter_mut().zip(offsets) {
            desc.offset = offset;
        }
    }
}

impl PartialEq for TensorCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.descriptors == other.descriptors
    }
}

impl<'a> IntoIterator for &'a TensorCatalog {
    type Item = &'a TensorDescriptor;
    type IntoIter = std::slice::Iter<'a, TensorDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
