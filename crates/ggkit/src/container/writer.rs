//! Serialization: layout pass followed by the emit pass

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, trace};

use super::layout::Layout;
use super::wire::WireWriter;
use super::{Container, MAGIC, VERSION};
use crate::arena::{TensorArena, TensorView};
use crate::config::{align_up, WriteOptions};
use crate::error::{Error, Result};

impl Container {
    /// Serialize the container with tensor data taken from `arena`
    ///
    /// Every catalogued tensor must have a buffer in the arena whose size
    /// equals the descriptor's byte size. Those checks run before anything is
    /// written to `sink`.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] for a tensor without a buffer,
    /// [`Error::LayoutInconsistent`] for a buffer of the wrong size,
    /// [`Error::TypeMismatch`] for a typed buffer of another element type,
    /// and [`Error::Io`] when the sink fails.
    pub fn write<W: Write>(&mut self, sink: W, arena: &TensorArena) -> Result<Layout> {
        self.emit(sink, Some(arena))
    }

    /// Serialize header, metadata and descriptors only
    ///
    /// Offsets are still computed as if the data section followed.
    pub fn write_metadata_only<W: Write>(&mut self, sink: W) -> Result<Layout> {
        self.emit(sink, None)
    }

    /// Serialize with explicit options
    pub fn write_with_options<W: Write>(
        &mut self,
        sink: W,
        arena: &TensorArena,
        options: &WriteOptions,
    ) -> Result<Layout> {
        options.validate()?;
        if let Some(alignment) = options.alignment {
            self.set_alignment(alignment)?;
        }
        if options.metadata_only {
            self.emit(sink, None)
        } else {
            self.emit(sink, Some(arena))
        }
    }

    /// Serialize into a new byte vector
    pub fn to_bytes(&mut self, arena: &TensorArena) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write(&mut bytes, arena)?;
        Ok(bytes)
    }

    /// Serialize to a file, replacing any existing content
    pub fn write_to_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        arena: &TensorArena,
    ) -> Result<Layout> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let layout = self.write(BufWriter::new(file), arena)?;
        debug!(path = %path.display(), bytes = layout.total_len(), "wrote container file");
        Ok(layout)
    }

    fn emit<W: Write>(&mut self, sink: W, arena: Option<&TensorArena>) -> Result<Layout> {
        let layout = self.layout()?;
        let views = match arena {
            Some(arena) => self.collect_views(arena)?,
            None => Vec::new(),
        };

        let mut wire = WireWriter::new(sink);
        wire.write_bytes(&MAGIC)?;
        wire.write_u32(VERSION)?;
        wire.write_u64(self.tensors.count() as u64)?;
        wire.write_u64(self.metadata.count() as u64)?;

        for (key, value) in self.metadata.iter() {
            wire.write_string(key)?;
            wire.write_u32(value.kind().tag())?;
            wire.write_value(value)?;
        }

        for desc in &self.tensors {
            wire.write_string(&desc.name)?;
            wire.write_u32(desc.rank() as u32)?;
            for &dim in &desc.dims {
                wire.write_u64(dim)?;
            }
            wire.write_u32(desc.element_type.tag())?;
            wire.write_u64(desc.offset)?;
        }

        if wire.position() != layout.header_len {
            return Err(Error::LayoutInconsistent(format!(
                "header is {} bytes but layout computed {}",
                wire.position(),
                layout.header_len
            )));
        }
        wire.write_zeros(layout.header_padding())?;

        for (desc, view) in self.tensors.iter().zip(&views) {
            let start = layout.data_offset + desc.offset;
            if wire.position() != start {
                return Err(Error::LayoutInconsistent(format!(
                    "tensor '{}' would start at {} instead of {start}",
                    desc.name,
                    wire.position()
                )));
            }
            trace!(
                tensor = %desc.name,
                offset = desc.offset,
                bytes = view.len(),
                "writing tensor data"
            );
            wire.write_bytes(view.bytes())?;
            let end = start + view.len() as u64;
            wire.write_zeros(align_up(end, layout.alignment) - end)?;
        }
        wire.flush()?;

        debug!(
            tensors = self.tensors.count(),
            metadata = self.metadata.count(),
            bytes = wire.position(),
            with_data = arena.is_some(),
            "serialized container"
        );
        Ok(layout)
    }

    fn collect_views<'a>(&self, arena: &'a TensorArena) -> Result<Vec<TensorView<'a>>> {
        self.tensors
            .iter()
            .map(|desc| {
                let view = arena.get(&desc.name)?;
                if let Some(found) = view.element_type() {
                    if found != desc.element_type {
                        return Err(Error::TypeMismatch {
                            key: desc.name.clone(),
                            expected: desc.element_type.name(),
                            found: found.name(),
                        });
                    }
                }
                if view.len() as u64 != desc.byte_size() {
                    return Err(Error::LayoutInconsistent(format!(
                        "tensor '{}' needs {} bytes but its buffer holds {}",
                        desc.name,
                        desc.byte_size(),
                        view.len()
                    )));
                }
                Ok(view)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{ElementType, TensorDescriptor};

    fn one_tensor() -> (Container, TensorArena) {
        let mut container = Container::new();
        let mut arena = TensorArena::new();
        container
            .add_tensor(&mut arena, "t", &[3], &[1.0f32, 2.0, 3.0])
            .unwrap();
        (container, arena)
    }

    #[test]
    fn test_header_bytes() {
        let (mut container, arena) = one_tensor();
        let bytes = container.to_bytes(&arena).unwrap();

        assert_eq!(&bytes[0..4], b"GGUF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), VERSION);
        assert_eq!(u64::from_le_bytes(bytes[8..16].try_into().unwrap()), 1);
        assert_eq!(u64::from_le_bytes(bytes[16..24].try_into().unwrap()), 0);
    }

    #[test]
    fn test_output_length_matches_layout() {
        let (mut container, arena) = one_tensor();
        let mut bytes = Vec::new();
        let layout = container.write(&mut bytes, &arena).unwrap();
        assert_eq!(bytes.len() as u64, layout.total_len());
        assert_eq!(bytes.len() % 32, 0);

        let start = layout.data_offset as usize;
        let data: Vec<f32> = bytes[start..start + 12]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(data, vec![1.0, 2.0, 3.0]);
        assert!(bytes[start + 12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_metadata_only_stops_at_data_offset() {
        let (mut container, _arena) = one_tensor();
        let mut bytes = Vec::new();
        let layout = container.write_metadata_only(&mut bytes).unwrap();
        assert_eq!(bytes.len() as u64, layout.data_offset);
    }

    #[test]
    fn test_missing_buffer() {
        let mut container = Container::new();
        container
            .tensors_mut()
            .add(TensorDescriptor::new("ghost", ElementType::F32, &[2]))
            .unwrap();
        let mut sink = Vec::new();
        let err = container.write(&mut sink, &TensorArena::new()).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(name) if name == "ghost"));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_wrong_buffer_size() {
        let mut container = Container::new();
        container
            .tensors_mut()
            .add(TensorDescriptor::new("t", ElementType::F32, &[4]))
            .unwrap();
        let mut arena = TensorArena::new();
        arena.insert_bytes("t", &[0u8; 12]).unwrap();
        let err = container.to_bytes(&arena).unwrap_err();
        assert!(matches!(err, Error::LayoutInconsistent(_)));
    }

    #[test]
    fn test_wrong_buffer_type() {
        let mut container = Container::new();
        container
            .tensors_mut()
            .add(TensorDescriptor::new("t", ElementType::I32, &[2]))
            .unwrap();
        let mut arena = TensorArena::new();
        arena
            .insert(&TensorDescriptor::new("t", ElementType::F32, &[2]), &[0.5f32, 1.5])
            .unwrap();
        let err = container.to_bytes(&arena).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { expected: "i32", found: "f32", .. }));
    }

    #[test]
    fn test_write_with_alignment_override() {
        let (mut container, arena) = one_tensor();
        let options = WriteOptions {
            alignment: Some(128),
            metadata_only: false,
        };
        let mut bytes = Vec::new();
        let layout = container.write_with_options(&mut bytes, &arena, &options).unwrap();
        assert_eq!(layout.alignment, 128);
        assert_eq!(layout.data_offset % 128, 0);
        assert_eq!(bytes.len() % 128, 0);
        assert_eq!(container.alignment(), 128);
    }

    #[test]
    fn test_write_rejects_bad_alignment_option() {
        let (mut container, arena) = one_tensor();
        let options = WriteOptions {
            alignment: Some(3),
            metadata_only: false,
        };
        let err = container
            .write_with_options(Vec::new(), &arena, &options)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAlignment(3)));
    }
}
