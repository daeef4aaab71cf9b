//! Serializable summaries of a container

use serde::Serialize;

use crate::arena::TensorArena;
use crate::container::Container;
use crate::tensor::ElementType;

/// Elements shown per tensor when data is available
pub const PREVIEW_ELEMENTS: usize = 10;

/// One metadata entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeySummary {
    /// Key
    pub key: String,
    /// Type name, e.g. `uint32` or `array<string>`
    pub kind: String,
    /// Display form of the value
    pub value: String,
}

/// One tensor descriptor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TensorSummary {
    /// Tensor name
    pub name: String,
    /// Element type
    pub element_type: ElementType,
    /// Extents, innermost first
    pub dims: Vec<u64>,
    /// Offset within the data section
    pub offset: u64,
    /// Data size in bytes
    pub byte_size: u64,
    /// Leading elements widened to f32, when data was loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Vec<f32>>,
}

/// Whole-container summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Format version
    pub version: u32,
    /// Data alignment
    pub alignment: u64,
    /// Start of the data section
    pub data_offset: Option<u64>,
    /// Metadata entries in order
    pub metadata: Vec<KeySummary>,
    /// Tensors in catalog order
    pub tensors: Vec<TensorSummary>,
    /// Sum of tensor byte sizes
    pub total_tensor_bytes: u64,
}

impl Summary {
    /// Summarize headers only
    #[must_use]
    pub fn new(container: &Container) -> Self {
        Self::build(container, None)
    }

    /// Summarize headers plus the first elements of float tensors
    #[must_use]
    pub fn with_data(container: &Container, arena: &TensorArena) -> Self {
        Self::build(container, Some(arena))
    }

    fn build(container: &Container, arena: Option<&TensorArena>) -> Self {
        let metadata = container
            .metadata()
            .iter()
            .map(|(key, value)| KeySummary {
                key: key.to_string(),
                kind: value.type_name().to_string(),
                value: value.to_string(),
            })
            .collect();

        let tensors: Vec<TensorSummary> = container
            .tensors()
            .iter()
            .map(|desc| TensorSummary {
                name: desc.name.clone(),
                element_type: desc.element_type,
                dims: desc.dims.clone(),
                offset: desc.offset,
                byte_size: desc.byte_size(),
                preview: arena
                    .and_then(|arena| arena.view(desc).ok())
                    .and_then(|view| view.to_f32_vec().ok())
                    .map(|mut values| {
                        values.truncate(PREVIEW_ELEMENTS);
                        values
                    }),
            })
            .collect();

        Self {
            version: container.version(),
            alignment: container.alignment(),
            data_offset: container.data_offset(),
            total_tensor_bytes: tensors.iter().map(|t| t.byte_size).sum(),
            metadata,
            tensors,
        }
    }

    /// Metadata entry by key
    #[must_use]
    pub fn key(&self, key: &str) -> Option<&KeySummary> {
        self.metadata.iter().find(|entry| entry.key == key)
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "version:     {}", self.version)?;
        writeln!(f, "alignment:   {}", self.alignment)?;
        if let Some(offset) = self.data_offset {
            writeln!(f, "data offset: {offset}")?;
        }
        writeln!(f, "metadata:    {} entries", self.metadata.len())?;
        for entry in &self.metadata {
            writeln!(f, "  {} ({}) = {}", entry.key, entry.kind, entry.value)?;
        }
        writeln!(
            f,
            "tensors:     {} ({} bytes)",
            self.tensors.len(),
            self.total_tensor_bytes
        )?;
        for t in &self.tensors {
            write!(
                f,
                "  {} {} {:?} offset={} size={}",
                t.name, t.element_type, t.dims, t.offset, t.byte_size
            )?;
            if let Some(preview) = &t.preview {
                write!(f, " data={preview:?}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
