//! Core business logic module
//!
//! Lock file models, target platforms and artifact selection are pure;
//! only [`fetch`] drives network and filesystem access through
//! [`crate::registry`] and [`crate::infra`].
//!
//! # Submodules
//!
//! - [`version`] - Python versions and `requires-python` constraints
//! - [`platform`] - Target interpreter and platform tags
//! - [`wheel`] - Artifact file names and tag compatibility
//! - [`lock`] - Lock file (poetry.lock, pdm.lock) parsing
//! - [`package`] - Per-package candidate selection
//! - [`fetch`] - Package fetch pipeline

pub mod fetch;
pub mod lock;
pub mod package;
pub mod platform;
pub mod version;
pub mod wheel;
