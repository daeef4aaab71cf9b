//! Read and write options

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default data alignment in bytes
pub const DEFAULT_ALIGNMENT: u32 = 32;

/// Default ceiling for tensor and metadata entry counts
pub const DEFAULT_MAX_ENTRIES: u64 = 1 << 20;

/// Options controlling how a container is parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Check that tensor extents do not overlap and fit inside the stream
    pub strict: bool,
    /// Largest tensor count accepted before the header is treated as corrupt
    pub max_tensor_count: u64,
    /// Largest metadata entry count accepted before the header is treated as corrupt
    pub max_metadata_count: u64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_tensor_count: DEFAULT_MAX_ENTRIES,
            max_metadata_count: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl ReadOptions {
    /// Options with strict layout checking enabled
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}

/// Options controlling how a container is serialized
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Alignment override; stored as `general.alignment` when set
    pub alignment: Option<u32>,
    /// Emit header, metadata and descriptors only
    pub metadata_only: bool,
}

impl WriteOptions {
    /// Reject alignments that are not a nonzero power of two
    pub fn validate(&self) -> Result<()> {
        if let Some(alignment) = self.alignment {
            check_alignment(u64::from(alignment))?;
        }
        Ok(())
    }
}

/// Check that an alignment is a nonzero power of two
pub fn check_alignment(alignment: u64) -> Result<u64> {
    if alignment.is_power_of_two() {
        Ok(alignment)
    } else {
        Err(Error::InvalidAlignment(alignment))
    }
}

/// Round `value` up to the next multiple of `alignment` (a power of two)
#[must_use]
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let read = ReadOptions::default();
        assert!(!read.strict);
        assert_eq!(read.max_tensor_count, DEFAULT_MAX_ENTRIES);
        assert!(ReadOptions::strict().strict);

        let write = WriteOptions::default();
        assert_eq!(write.alignment, None);
        write.validate().unwrap();
    }

    #[test]
    fn test_alignment_checks() {
        assert_eq!(check_alignment(32).unwrap(), 32);
        assert_eq!(check_alignment(1).unwrap(), 1);
        assert!(matches!(check_alignment(0), Err(Error::InvalidAlignment(0))));
        assert!(matches!(check_alignment(48), Err(Error::InvalidAlignment(48))));

        let opts = WriteOptions {
            alignment: Some(24),
            metadata_only: false,
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 32), 0);
        assert_eq!(align_up(1, 32), 32);
        assert_eq!(align_up(32, 32), 32);
        assert_eq!(align_up(33, 32), 64);
        assert_eq!(align_up(7, 1), 7);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let read: ReadOptions = serde_json::from_str(r#"{"strict": true}"#).unwrap();
        assert!(read.strict);
        assert_eq!(read.max_metadata_count, DEFAULT_MAX_ENTRIES);

        let write: WriteOptions = serde_json::from_str(r#"{"alignment": 64}"#).unwrap();
        assert_eq!(write.alignment, Some(64));
        assert!(!write.metadata_only);
    }
}
