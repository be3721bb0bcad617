//! Configuration constants and the optional global settings file

pub mod defaults;
pub mod settings;
pub mod urls;
