//! Package index access
//!
//! Resolves which repository a package comes from, with which credentials,
//! and lists the release files the index publishes for a pinned version.

pub mod client;
pub mod credentials;
pub mod repository;

pub use client::IndexClient;
pub use repository::{Repository, RepositoryRegistry};
