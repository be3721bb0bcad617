//! Infrastructure layer
//!
//! Handles I/O that is not specific to package indexes: artifact downloads,
//! host inspection through external processes, and directory lookup.

pub mod dirs;
pub mod download;
pub mod host;
