//! Integration tests for rejecting malformed streams
//!
//! Streams are assembled by hand so that each test breaks exactly one rule.

use std::io::Cursor;

use ggkit::sample::build_sample;
use ggkit::{Container, Error, ReadOptions, TensorArena};

/// Hand-assembled container stream
struct Stream {
    bytes: Vec<u8>,
}

impl Stream {
    fn new(version: u32, tensors: u64, metadata: u64) -> Self {
        let mut s = Self { bytes: Vec::new() };
        s.raw(b"GGUF").u32(version).u64(tensors).u64(metadata);
        s
    }

    fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    fn u32(&mut self, v: u32) -> &mut Self {
        self.raw(&v.to_le_bytes())
    }

    fn u64(&mut self, v: u64) -> &mut Self {
        self.raw(&v.to_le_bytes())
    }

    fn string(&mut self, s: &str) -> &mut Self {
        self.u64(s.len() as u64).raw(s.as_bytes())
    }

    fn tensor(&mut self, name: &str, dims: &[u64], element_type: u32, offset: u64) -> &mut Self {
        self.string(name).u32(dims.len() as u32);
        for &d in dims {
            self.u64(d);
        }
        self.u32(element_type).u64(offset)
    }

    fn pad_to(&mut self, alignment: usize) -> &mut Self {
        while self.bytes.len() % alignment != 0 {
            self.bytes.push(0);
        }
        self
    }

    fn open(&self) -> ggkit::Result<Container> {
        Container::from_bytes(&self.bytes)
    }
}

#[test]
fn test_bad_magic() {
    let mut bytes = Stream::new(3, 0, 0).bytes;
    bytes[..4].copy_from_slice(b"GGML");
    let err = Container::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::BadMagic(magic) if &magic == b"GGML"));
    assert!(err.is_malformed_input());
}

#[test]
fn test_unsupported_versions() {
    for version in [0, 1, 4, 99] {
        let err = Stream::new(version, 0, 0).open().unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(v) if v == version));
    }
    Stream::new(2, 0, 0).open().unwrap();
}

#[test]
fn test_empty_container() {
    let container = Stream::new(3, 0, 0).open().unwrap();
    assert!(container.metadata().is_empty());
    assert!(container.tensors().is_empty());
    assert_eq!(container.data_offset(), Some(32));
}

#[test]
fn test_negative_counts() {
    let err = Stream::new(3, (-1i64) as u64, 0).open().unwrap_err();
    assert!(matches!(err, Error::CorruptHeader(_)));

    let err = Stream::new(3, 0, u64::MAX).open().unwrap_err();
    assert!(matches!(err, Error::CorruptHeader(_)));
}

#[test]
fn test_count_ceiling() {
    let stream = Stream::new(3, 5, 0);
    let options = ReadOptions {
        max_tensor_count: 4,
        ..ReadOptions::default()
    };
    let err = Container::open_with_options(Cursor::new(&stream.bytes), &options, None).unwrap_err();
    assert!(matches!(err, Error::CorruptHeader(_)));

    // under the ceiling the stream just runs out
    let err = stream.open().unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof(_)));
}

#[test]
fn test_unknown_value_kind() {
    let mut stream = Stream::new(3, 0, 1);
    stream.string("k").u32(13).u32(0);
    assert!(matches!(stream.open(), Err(Error::UnknownValueKind(13))));
}

#[test]
fn test_unknown_array_element_kind() {
    let mut stream = Stream::new(3, 0, 1);
    stream.string("k").u32(9).u32(200).u64(0);
    assert!(matches!(stream.open(), Err(Error::UnknownValueKind(200))));
}

#[test]
fn test_invalid_bool() {
    let mut stream = Stream::new(3, 0, 1);
    stream.string("flag").u32(7).raw(&[2]);
    assert!(matches!(stream.open(), Err(Error::CorruptHeader(_))));
}

#[test]
fn test_duplicate_metadata_key() {
    let mut stream = Stream::new(3, 0, 2);
    stream.string("k").u32(4).u32(1);
    stream.string("k").u32(4).u32(2);
    assert!(matches!(stream.open(), Err(Error::CorruptHeader(_))));
}

#[test]
fn test_bad_alignment_value() {
    let mut stream = Stream::new(3, 0, 1);
    stream.string("general.alignment").u32(4).u32(24);
    assert!(matches!(stream.open(), Err(Error::CorruptHeader(_))));

    let mut stream = Stream::new(3, 0, 1);
    stream.string("general.alignment").u32(10).u64(32);
    assert!(matches!(stream.open(), Err(Error::CorruptHeader(_))));
}

#[test]
fn test_invalid_rank_in_stream() {
    let mut stream = Stream::new(3, 1, 0);
    stream.tensor("t", &[1, 1, 1, 1, 1], 0, 0);
    assert!(matches!(stream.open(), Err(Error::InvalidRank { rank: 5, .. })));

    let mut stream = Stream::new(3, 1, 0);
    stream.tensor("t", &[], 0, 0);
    assert!(matches!(stream.open(), Err(Error::InvalidRank { rank: 0, .. })));
}

#[test]
fn test_invalid_dimension_in_stream() {
    let mut stream = Stream::new(3, 1, 0);
    stream.tensor("t", &[4, 0], 0, 0);
    assert!(matches!(stream.open(), Err(Error::InvalidDimension { .. })));

    let mut stream = Stream::new(3, 1, 0);
    stream.tensor("t", &[(-2i64) as u64], 0, 0);
    assert!(matches!(stream.open(), Err(Error::InvalidDimension { .. })));
}

#[test]
fn test_quantized_element_type_rejected() {
    let mut stream = Stream::new(3, 1, 0);
    stream.tensor("q", &[32], 2, 0);
    assert!(matches!(stream.open(), Err(Error::UnsupportedElementType(2))));
}

#[test]
fn test_duplicate_tensor_name() {
    let mut stream = Stream::new(3, 2, 0);
    stream.tensor("t", &[8], 0, 0).tensor("t", &[8], 0, 32);
    assert!(matches!(stream.open(), Err(Error::DuplicateName(name)) if name == "t"));
}

#[test]
fn test_misaligned_offset() {
    let mut stream = Stream::new(3, 1, 0);
    stream.tensor("t", &[1], 0, 4);
    assert!(matches!(stream.open(), Err(Error::LayoutInconsistent(_))));
}

#[test]
fn test_strict_mode_overlap() {
    let mut stream = Stream::new(3, 2, 0);
    stream.tensor("a", &[16], 0, 0).tensor("b", &[8], 0, 32).pad_to(32);
    stream.raw(&[0u8; 96]);

    // lenient parsing only checks alignment
    stream.open().unwrap();

    let err = Container::open_with_options(Cursor::new(&stream.bytes), &ReadOptions::strict(), None)
        .unwrap_err();
    assert!(matches!(err, Error::LayoutInconsistent(msg) if msg.contains("overlap")));
}

#[test]
fn test_strict_mode_past_end() {
    let mut stream = Stream::new(3, 1, 0);
    stream.tensor("a", &[16], 0, 0).pad_to(32);
    stream.raw(&[0u8; 32]);

    let err = Container::open_with_options(Cursor::new(&stream.bytes), &ReadOptions::strict(), None)
        .unwrap_err();
    assert!(matches!(err, Error::LayoutInconsistent(_)));
}

#[test]
fn test_short_data_section() {
    let mut stream = Stream::new(3, 1, 0);
    stream.tensor("a", &[16], 0, 0).pad_to(32);
    stream.raw(&[0u8; 40]);

    let mut arena = TensorArena::new();
    let err = Container::open_with_options(
        Cursor::new(&stream.bytes),
        &ReadOptions::default(),
        Some(&mut arena),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof(_)));
}

#[test]
fn test_oversized_tensor_is_eof_before_allocation() {
    let mut stream = Stream::new(3, 1, 0);
    stream.tensor("t", &[1 << 40], 24, 0).pad_to(32);
    stream.raw(&[0u8; 8]);
    assert_eq!(stream.bytes.len(), 72);

    let mut arena = TensorArena::new();
    let err = Container::open_with_options(
        Cursor::new(&stream.bytes),
        &ReadOptions::default(),
        Some(&mut arena),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof(ref msg) if msg.contains("'t'")), "{err:?}");
    assert!(arena.is_empty());

    let err = Container::open_with_data(Cursor::new(&stream.bytes)).unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof(_)));
}

#[test]
fn test_every_truncation_is_eof() {
    let (mut container, arena) = build_sample(3, 17).unwrap();
    let bytes = container.to_bytes(&arena).unwrap();
    let last = container.tensors().iter().last().unwrap();
    let data_end = (container.data_offset().unwrap() + last.offset + last.byte_size()) as usize;

    for len in 0..data_end {
        match Container::open_with_data(Cursor::new(&bytes[..len])) {
            Err(Error::UnexpectedEof(_)) => {}
            other => panic!("truncation at {len} gave {other:?}"),
        }
    }
}

#[test]
fn test_huge_string_length_is_eof() {
    let mut stream = Stream::new(3, 0, 1);
    stream.u64(u64::MAX).raw(b"key");
    assert!(matches!(stream.open(), Err(Error::UnexpectedEof(_))));
}
