//! Lockfetch - download locked Python packages for a target platform
//!
//! Reads a `poetry.lock` or `pdm.lock` file and downloads the wheels (or
//! source distributions) that fit a given interpreter, python version and
//! platform into a directory, verifying every file against the lock hash.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Lock files, platform tags and the fetch pipeline
//! - [`registry`] - Package index client and repository credentials
//! - [`infra`] - Downloads, host detection and directories
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
pub mod registry;

#[cfg(test)]
pub mod test_utils;
