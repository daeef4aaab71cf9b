//! Sample model used for smoke-testing readers and writers
//!
//! The sample carries one metadata key of every scalar kind, three arrays,
//! and `n` F32 tensors `tensor_<i>` of random shape, each filled with
//! `100 + i`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::arena::TensorArena;
use crate::container::Container;
use crate::error::Result;
use crate::metadata::MetadataStore;
use crate::tensor::MAX_DIMS;

/// Tensor count used by the CLI when none is given
pub const DEFAULT_SAMPLE_TENSORS: usize = 10;

/// Metadata entries every sample carries, in insertion order
#[must_use]
pub fn sample_metadata() -> MetadataStore {
    let mut metadata = MetadataStore::new();
    metadata.set("some.parameter.uint8", 0x12u8);
    metadata.set("some.parameter.int8", -0x13i8);
    metadata.set("some.parameter.uint16", 0x1234u16);
    metadata.set("some.parameter.int16", -0x1235i16);
    metadata.set("some.parameter.uint32", 0x1234_5678u32);
    metadata.set("some.parameter.int32", -0x1234_5679i32);
    metadata.set("some.parameter.float32", 0.123_456_79f32);
    metadata.set("some.parameter.uint64", 0x1234_5678_9abc_def0u64);
    metadata.set("some.parameter.int64", -0x1234_5678_9abc_def1i64);
    metadata.set("some.parameter.float64", 0.123_456_789_012_345_68f64);
    metadata.set("some.parameter.bool", true);
    metadata.set("some.parameter.string", "hello world");
    metadata.set("some.parameter.arr.i16", vec![1i16, 2, 3, 4]);
    metadata.set("some.parameter.arr.f32", vec![3.145f32, 2.718, 1.414]);
    metadata.set("some.parameter.arr.str", vec!["hello", "world", "!"]);
    metadata
}

/// Fill value of the `index`-th sample tensor
#[must_use]
pub fn fill_value(index: usize) -> f32 {
    100.0 + index as f32
}

/// Build a sample container and its tensor data
///
/// Shapes are drawn from a `StdRng` seeded with `seed`, so the same
/// arguments always produce the same bytes.
pub fn build_sample(n_tensors: usize, seed: u64) -> Result<(Container, TensorArena)> {
    let mut container = Container::new();
    *container.metadata_mut() = sample_metadata();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut arena = TensorArena::new();
    for i in 0..n_tensors {
        let rank = rng.gen_range(1..=MAX_DIMS);
        let dims: Vec<u64> = (0..rank).map(|_| rng.gen_range(1..=10u64)).collect();
        let count = dims.iter().product::<u64>() as usize;
        let data = vec![fill_value(i); count];
        container.add_tensor(&mut arena, &format!("tensor_{i}"), &dims, &data)?;
    }

    debug!(tensors = n_tensors, seed, bytes = arena.total_bytes(), "built sample");
    Ok((container, arena))
}

/// First tensor element that differs from the expected fill value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    /// Tensor name
    pub tensor: String,
    /// Flat element index
    pub index: usize,
    /// Expected value
    pub expected: f32,
    /// Value found
    pub found: f32,
}

/// Outcome of [`verify_sample`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SampleReport {
    /// Tensors whose data was checked
    pub tensors_checked: usize,
    /// Elements compared
    pub elements_checked: u64,
    /// Sample metadata keys that are missing or hold another value
    pub metadata_mismatches: Vec<String>,
    /// First bad element, if any
    pub mismatch: Option<Mismatch>,
}

impl SampleReport {
    /// Whether metadata and every tensor element matched
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.metadata_mismatches.is_empty() && self.mismatch.is_none()
    }
}

/// Check a loaded container against the sample contents
///
/// Tensor `i` in catalog order must hold `100 + i` in every element. Checking
/// stops at the first bad element.
///
/// # Errors
///
/// Fails when a tensor has no buffer in `arena` or is not F32/F16/BF16.
pub fn verify_sample(container: &Container, arena: &TensorArena) -> Result<SampleReport> {
    let mut report = SampleReport::default();

    for (key, expected) in sample_metadata().iter() {
        match container.metadata().get(key) {
            Ok(found) if found == expected => {}
            _ => report.metadata_mismatches.push(key.to_string()),
        }
    }

    for (i, desc) in container.tensors().iter().enumerate() {
        let values = arena.view(desc)?.to_f32_vec()?;
        let expected = fill_value(i);
        report.tensors_checked += 1;
        if let Some(index) = values.iter().position(|&v| v != expected) {
            report.elements_checked += index as u64 + 1;
            report.mismatch = Some(Mismatch {
                tensor: desc.name.clone(),
                index,
                expected,
                found: values[index],
            });
            break;
        }
        report.elements_checked += values.len() as u64;
    }

    debug!(
        tensors = report.tensors_checked,
        elements = report.elements_checked,
        ok = report.is_ok(),
        "verified sample"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_build_sample_is_deterministic() {
        let (mut a, arena_a) = build_sample(5, 7).unwrap();
        let (mut b, arena_b) = build_sample(5, 7).unwrap();
        assert_eq!(a.to_bytes(&arena_a).unwrap(), b.to_bytes(&arena_b).unwrap());
    }

    #[test]
    fn test_sample_shapes() {
        let (container, arena) = build_sample(DEFAULT_SAMPLE_TENSORS, 42).unwrap();
        assert_eq!(container.tensors().count(), DEFAULT_SAMPLE_TENSORS);
        assert_eq!(container.metadata().count(), 15);
        for (i, desc) in container.tensors().iter().enumerate() {
            assert_eq!(desc.name, format!("tensor_{i}"));
            assert!((1..=MAX_DIMS).contains(&desc.rank()));
            assert!(desc.dims.iter().all(|&d| (1..=10).contains(&d)));
            assert_eq!(arena.get(&desc.name).unwrap().len() as u64, desc.byte_size());
        }
    }

    #[test]
    fn test_verify_fresh_sample() {
        let (container, arena) = build_sample(4, 1).unwrap();
        let report = verify_sample(&container, &arena).unwrap();
        assert!(report.is_ok(), "{report:?}");
        assert_eq!(report.tensors_checked, 4);
    }

    #[test]
    fn test_verify_reports_first_mismatch() {
        let (container, mut arena) = build_sample(3, 1).unwrap();
        let buf = arena.get_mut("tensor_1").unwrap();
        buf[..4].copy_from_slice(&5.0f32.to_le_bytes());

        let report = verify_sample(&container, &arena).unwrap();
        let mismatch = report.mismatch.unwrap();
        assert_eq!(mismatch.tensor, "tensor_1");
        assert_eq!(mismatch.index, 0);
        assert_eq!(mismatch.expected, 101.0);
        assert_eq!(mismatch.found, 5.0);
        assert_eq!(report.tensors_checked, 2);
    }

    #[test]
    fn test_verify_reports_metadata_drift() {
        let (mut container, arena) = build_sample(1, 1).unwrap();
        container.metadata_mut().set("some.parameter.string", "changed");
        container.metadata_mut().remove("some.parameter.bool");

        let report = verify_sample(&container, &arena).unwrap();
        assert!(!report.is_ok());
        assert_eq!(
            report.metadata_mismatches,
            vec!["some.parameter.bool", "some.parameter.string"]
        );
    }

    #[test]
    fn test_verify_without_data_fails() {
        let (container, _) = build_sample(2, 1).unwrap();
        let err = verify_sample(&container, &TensorArena::new()).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(_)));
    }
}
