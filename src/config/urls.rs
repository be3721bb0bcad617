//! Package index URLs

/// Default package index, serving the JSON API
pub const PYPI_URL: &str = "https://pypi.org";
