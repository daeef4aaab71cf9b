//! ggkit-cli library exports
//!
//! Argument definitions, configuration and command implementations for the
//! `ggkit` binary.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod config;
pub mod logging;

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "ggkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Write a sample container with every metadata kind and F32 tensors
    WriteSample {
        /// Output path
        path: PathBuf,
        /// Number of tensors
        #[arg(long, default_value_t = ggkit::sample::DEFAULT_SAMPLE_TENSORS)]
        tensors: usize,
        /// Seed for tensor shapes
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Data alignment override (power of two)
        #[arg(long)]
        alignment: Option<u32>,
    },
    /// Show metadata and tensor descriptors without loading data
    Inspect {
        /// Container path
        path: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
        /// Print only this metadata key's value
        #[arg(long)]
        key: Option<String>,
    },
    /// Load a sample container and check every tensor element
    Verify {
        /// Container path
        path: PathBuf,
    },
    /// Print the first elements of one tensor
    Dump {
        /// Container path
        path: PathBuf,
        /// Tensor name
        tensor: String,
        /// Maximum number of elements to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}
