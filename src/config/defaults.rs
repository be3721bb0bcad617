//! Default configuration values

/// Default download directory
pub const DEFAULT_TARGET: &str = "./wheels";

/// Name of the repository used by packages without an explicit source
pub const DEFAULT_REPOSITORY_NAME: &str = "pypi.org";

/// Python version assumed when none is given and no interpreter is found
pub const DEFAULT_PYTHON_VERSION: &str = "3.12";

/// glibc version assumed on Linux when `ldd` gives no answer
pub const DEFAULT_GLIBC_VERSION: (u32, u32) = (2, 17);

/// Maximum number of download retry attempts
pub const MAX_DOWNLOAD_RETRIES: u32 = 3;

/// Default number of parallel downloads
pub const DEFAULT_PARALLEL_DOWNLOADS: usize = 4;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("lockfetch/", env!("CARGO_PKG_VERSION"));

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
