//! CLI command implementations
//!
//! Each command writes its report to the given sink and returns an error
//! instead of exiting.

pub mod dump;
pub mod inspect;
pub mod verify;
pub mod write_sample;
