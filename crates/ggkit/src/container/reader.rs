//! Parsing: header, metadata, descriptors, then optional tensor data

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, trace};

use super::wire::WireReader;
use super::{alignment_from_metadata, Container, MAGIC, MIN_VERSION, VERSION};
use crate::arena::TensorArena;
use crate::catalog::TensorCatalog;
use crate::config::{align_up, ReadOptions};
use crate::error::{Error, Result};
use crate::metadata::MetadataStore;
use crate::tensor::{ElementType, TensorDescriptor, MAX_DIMS};
use crate::value::ValueKind;

impl Container {
    /// Parse header, metadata and descriptors without loading tensor data
    pub fn open<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::open_with_options(reader, &ReadOptions::default(), None)
    }

    /// Parse a container and load every tensor into a new arena
    pub fn open_with_data<R: Read + Seek>(reader: R) -> Result<(Self, TensorArena)> {
        let mut arena = TensorArena::new();
        let container =
            Self::open_with_options(reader, &ReadOptions::default(), Some(&mut arena))?;
        Ok((container, arena))
    }

    /// Parse a container with explicit options
    ///
    /// Offsets are resolved against the reader's position at entry, so a
    /// container embedded in a larger stream can be read in place. When
    /// `arena` is given, one typed buffer per tensor is allocated and filled
    /// from the data section. On error the arena may hold buffers for the
    /// tensors read so far and the container must be discarded.
    ///
    /// # Errors
    ///
    /// Malformed input yields [`Error::BadMagic`], [`Error::UnsupportedVersion`],
    /// [`Error::CorruptHeader`], [`Error::UnknownValueKind`],
    /// [`Error::UnsupportedElementType`], [`Error::InvalidRank`],
    /// [`Error::InvalidDimension`], [`Error::DuplicateName`] or
    /// [`Error::LayoutInconsistent`]. A short stream yields
    /// [`Error::UnexpectedEof`].
    pub fn open_with_options<R: Read + Seek>(
        mut reader: R,
        options: &ReadOptions,
        arena: Option<&mut TensorArena>,
    ) -> Result<Self> {
        let base = reader.stream_position()?;
        let container = {
            let mut wire = WireReader::new(&mut reader);
            let mut container = read_header(&mut wire, options)?;
            container.data_offset = Some(align_up(wire.position(), container.alignment));
            container
        };
        let data_offset = container.data_offset.unwrap_or_default();

        debug!(
            version = container.version,
            tensors = container.tensors.count(),
            metadata = container.metadata.count(),
            alignment = container.alignment,
            data_offset,
            "parsed container header"
        );

        let stream_len = reader.seek(SeekFrom::End(0))?.saturating_sub(base);
        if options.strict {
            check_extents(&container.tensors, data_offset, stream_len)?;
        }

        if let Some(arena) = arena {
            for desc in container.tensors.iter() {
                let offset = data_offset.checked_add(desc.offset).ok_or_else(|| {
                    Error::LayoutInconsistent(format!("offset of tensor '{}' overflows", desc.name))
                })?;
                let byte_size = desc.byte_size();
                // the stream must hold the whole extent before a buffer is allocated
                if offset.saturating_add(byte_size) > stream_len {
                    return Err(Error::UnexpectedEof(format!(
                        "data of tensor '{}' ({byte_size} bytes at offset {offset}) \
                         runs past stream length {stream_len}",
                        desc.name
                    )));
                }
                trace!(
                    tensor = %desc.name,
                    offset = desc.offset,
                    bytes = byte_size,
                    "reading tensor data"
                );
                let buf = arena.allocate_tensor(desc)?;
                reader.seek(SeekFrom::Start(base + offset))?;
                reader.read_exact(buf).map_err(|e| match Error::from(e) {
                    Error::UnexpectedEof(_) => Error::UnexpectedEof(format!(
                        "data of tensor '{}' ({byte_size} bytes at offset {offset})",
                        desc.name
                    )),
                    other => other,
                })?;
            }
        }

        Ok(container)
    }

    /// Parse a container held in memory, without tensor data
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::open(Cursor::new(bytes))
    }

    /// Parse a container file, without tensor data
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_file_with_options(path, &ReadOptions::default(), None)
    }

    /// Parse a container file and load every tensor into a new arena
    pub fn open_file_with_data<P: AsRef<Path>>(path: P) -> Result<(Self, TensorArena)> {
        let mut arena = TensorArena::new();
        let container =
            Self::open_file_with_options(path, &ReadOptions::default(), Some(&mut arena))?;
        Ok((container, arena))
    }

    /// Parse a memory-mapped container file with explicit options
    pub fn open_file_with_options<P: AsRef<Path>>(
        path: P,
        options: &ReadOptions,
        arena: Option<&mut TensorArena>,
    ) -> Result<Self> {
        let mmap = map_file(path.as_ref())?;
        Self::open_with_options(Cursor::new(&mmap[..]), options, arena)
    }
}

fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path)?;
    // SAFETY: read-only map that lives only for one parse; the file must not
    // be truncated by another process meanwhile.
    let mmap = unsafe { Mmap::map(&file)? };
    debug!(path = %path.display(), bytes = mmap.len(), "mapped container file");
    Ok(mmap)
}

fn check_count(what: &str, count: u64, limit: u64) -> Result<()> {
    if count > i64::MAX as u64 {
        return Err(Error::CorruptHeader(format!(
            "{what} count is negative ({})",
            count as i64
        )));
    }
    if count > limit {
        return Err(Error::CorruptHeader(format!(
            "{what} count {count} exceeds limit {limit}"
        )));
    }
    Ok(())
}

fn read_header<R: Read>(wire: &mut WireReader<R>, options: &ReadOptions) -> Result<Container> {
    let magic = wire.read_array::<4>("magic")?;
    if magic != MAGIC {
        return Err(Error::BadMagic(magic));
    }
    let version = wire.read_u32("version")?;
    if !(MIN_VERSION..=VERSION).contains(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    let tensor_count = wire.read_u64("tensor count")?;
    let metadata_count = wire.read_u64("metadata count")?;
    check_count("tensor", tensor_count, options.max_tensor_count)?;
    check_count("metadata", metadata_count, options.max_metadata_count)?;

    let mut metadata = MetadataStore::new();
    for _ in 0..metadata_count {
        let key = wire.read_string("metadata key")?;
        let kind = ValueKind::from_tag(wire.read_u32("metadata value kind")?)?;
        let value = wire.read_value(kind)?;
        metadata.push_unique(key, value)?;
    }

    let alignment = alignment_from_metadata(&metadata)
        .map_err(|e| Error::CorruptHeader(format!("unusable general.alignment: {e}")))?;

    let mut tensors = TensorCatalog::new();
    for _ in 0..tensor_count {
        let desc = read_descriptor(wire)?;
        if desc.offset % alignment != 0 {
            return Err(Error::LayoutInconsistent(format!(
                "tensor '{}' offset {} is not a multiple of {alignment}",
                desc.name, desc.offset
            )));
        }
        tensors.add(desc)?;
    }

    Ok(Container {
        version,
        alignment,
        metadata,
        tensors,
        data_offset: None,
    })
}

fn read_descriptor<R: Read>(wire: &mut WireReader<R>) -> Result<TensorDescriptor> {
    let name = wire.read_string("tensor name")?;
    let rank = wire.read_u32("tensor rank")?;
    if rank == 0 || rank as usize > MAX_DIMS {
        return Err(Error::InvalidRank {
            name,
            rank: u64::from(rank),
        });
    }
    let mut dims = Vec::with_capacity(rank as usize);
    for _ in 0..rank {
        dims.push(wire.read_u64("tensor dimension")?);
    }
    let element_type = ElementType::from_tag(wire.read_u32("tensor element type")?)?;
    let offset = wire.read_u64("tensor offset")?;

    let desc = TensorDescriptor {
        name,
        element_type,
        dims,
        offset,
    };
    desc.validate()?;
    Ok(desc)
}

fn check_extents(tensors: &TensorCatalog, data_offset: u64, stream_len: u64) -> Result<()> {
    let mut extents: Vec<(u64, u64, &str)> = tensors
        .iter()
        .map(|d| (d.offset, d.offset.saturating_add(d.byte_size()), d.name.as_str()))
        .collect();
    extents.sort_unstable_by_key(|&(start, _, _)| start);

    for pair in extents.windows(2) {
        let (_, prev_end, prev) = pair[0];
        let (next_start, _, next) = pair[1];
        if prev_end > next_start {
            return Err(Error::LayoutInconsistent(format!(
                "tensors '{prev}' and '{next}' overlap"
            )));
        }
    }
    for &(_, end, name) in &extents {
        if data_offset.saturating_add(end) > stream_len {
            return Err(Error::LayoutInconsistent(format!(
                "tensor '{name}' ends at {} past stream length {stream_len}",
                data_offset.saturating_add(end)
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_count() {
        check_count("tensor", 3, 10).unwrap();
        assert!(matches!(
            check_count("tensor", 11, 10),
            Err(Error::CorruptHeader(_))
        ));
        assert!(matches!(
            check_count("metadata", (-1i64) as u64, u64::MAX),
            Err(Error::CorruptHeader(msg)) if msg.contains("negative")
        ));
    }

    #[test]
    fn test_check_extents() {
        let mut tensors = TensorCatalog::new();
        let mut a = TensorDescriptor::new("a", ElementType::F32, &[8]);
        let mut b = TensorDescriptor::new("b", ElementType::F32, &[8]);
        a.offset = 0;
        b.offset = 32;
        tensors.add(a.clone()).unwrap();
        tensors.add(b).unwrap();
        check_extents(&tensors, 64, 128).unwrap();
        assert!(matches!(
            check_extents(&tensors, 64, 100),
            Err(Error::LayoutInconsistent(_))
        ));

        let mut overlapping = TensorCatalog::new();
        let mut c = TensorDescriptor::new("c", ElementType::F32, &[8]);
        c.offset = 0;
        a.dims = vec![16];
        overlapping.add(a).unwrap();
        overlapping.add(c).unwrap();
        let err = check_extents(&overlapping, 64, 1024).unwrap_err();
        assert!(matches!(err, Error::LayoutInconsistent(msg) if msg.contains("overlap")));
    }

    #[test]
    fn test_rank_checked_before_dims() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.push(b't');
        bytes.extend_from_slice(&5u32.to_le_bytes());
        // no dims follow: rank must be rejected first
        let mut wire = WireReader::new(Cursor::new(bytes));
        let err = read_descriptor(&mut wire).unwrap_err();
        assert!(matches!(err, Error::InvalidRank { rank: 5, .. }));
    }
}
