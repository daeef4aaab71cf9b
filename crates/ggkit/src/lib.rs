//! GGUF model containers with an owned tensor arena
//!
//! A container holds typed key/value metadata and a catalog of tensor
//! descriptors. Tensor bytes live in a separate [`TensorArena`], so the
//! header of a large model can be inspected without touching its weights.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Container                            │
//! │  ┌───────────────┐  ┌───────────────┐  ┌──────────────────┐  │
//! │  │ MetadataStore │  │ TensorCatalog │  │ version/alignment│  │
//! │  │ (key → Value) │  │ (descriptors) │  │  + data offset   │  │
//! │  └───────┬───────┘  └───────┬───────┘  └────────┬─────────┘  │
//! │          └──────────┬───────┴───────────────────┘            │
//! │              layout() ─► write() / open*()                   │
//! └─────────────────────┬────────────────────────────────────────┘
//!                       │ tensor bytes by name
//! ┌─────────────────────▼────────────────────────────────────────┐
//! │                        TensorArena                            │
//! │        (aligned owned buffers, zero-copy typed views)         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use ggkit::{Container, TensorArena};
//!
//! let mut container = Container::new();
//! let mut arena = TensorArena::new();
//! container.metadata_mut().set("general.name", "tiny");
//! container.add_tensor(&mut arena, "t0", &[3, 2], &[7.0f32; 6])?;
//!
//! let bytes = container.to_bytes(&arena)?;
//! let (loaded, data) = Container::open_with_data(std::io::Cursor::new(bytes))?;
//!
//! assert_eq!(loaded.metadata().get_typed::<&str>("general.name")?, "tiny");
//! assert_eq!(data.get("t0")?.as_slice::<f32>()?, &[7.0; 6]);
//! # Ok::<(), ggkit::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]

#[cfg(not(target_endian = "little"))]
compile_error!("ggkit views tensor data in place and requires a little-endian target");

pub mod arena;
pub mod catalog;
pub mod config;
pub mod container;
pub mod error;
pub mod inspect;
pub mod metadata;
pub mod sample;
pub mod tensor;
pub mod value;

pub use arena::{Element, TensorArena, TensorView};
pub use catalog::TensorCatalog;
pub use config::{ReadOptions, WriteOptions, DEFAULT_ALIGNMENT};
pub use container::{Container, Layout, ALIGNMENT_KEY, MAGIC, VERSION};
pub use error::{Error, Result};
pub use inspect::Summary;
pub use metadata::MetadataStore;
pub use tensor::{ElementType, TensorDescriptor, MAX_DIMS};
pub use value::{Array, FromValue, Value, ValueKind};

/// Re-exported half-precision types used by [`Element`]
pub use half::{bf16, f16};
