//! Repository credentials
//!
//! Credentials for a named repository are looked up in this order:
//! 1. `<NAME>_USERNAME` / `<NAME>_PASSWORD`
//! 2. `POETRY_HTTP_BASIC_<NAME>_USERNAME` / `..._PASSWORD`
//! 3. poetry's `auth.toml` (`[http-basic.<name>]`)
//! 4. userinfo embedded in the source URL
//!
//! `<NAME>` is the repository name upper-cased with every character that is
//! not alphanumeric replaced by `_`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use reqwest::Url;
use serde::Deserialize;

use crate::error::RegistryError;

/// HTTP basic credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// Password, if any
    pub password: Option<String>,
}

impl Credentials {
    /// Create credentials
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Split `https://user:pw@host/path` into the clean URL and its credentials
pub fn split_userinfo(url: &str) -> Result<(String, Option<Credentials>), RegistryError> {
    let mut parsed = Url::parse(url).map_err(|e| RegistryError::InvalidUrl {
        url: url.to_string(),
        error: e.to_string(),
    })?;

    let credentials = if parsed.username().is_empty() {
        None
    } else {
        Some(Credentials::new(
            parsed.username(),
            parsed.password().map(str::to_string),
        ))
    };

    if credentials.is_some() {
        // Only fails for cannot-be-a-base URLs, which have no userinfo
        let _ = parsed.set_username("");
        let _ = parsed.set_password(None);
    }

    Ok((parsed.to_string(), credentials))
}

/// Environment variable stem for a repository name
pub fn env_name(repository: &str) -> String {
    repository
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct PoetryAuth {
    #[serde(default, rename = "http-basic")]
    http_basic: HashMap<String, PoetryBasic>,
}

#[derive(Debug, Deserialize)]
struct PoetryBasic {
    username: String,
    password: Option<String>,
}

/// Read `[http-basic.<name>]` entries from poetry's `auth.toml`
///
/// A missing file yields no credentials.
pub fn load_poetry_auth(path: &Path) -> Result<HashMap<String, Credentials>, RegistryError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Credentials {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    let auth: PoetryAuth = toml::from_str(&content).map_err(|e| RegistryError::Credentials {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    Ok(auth
        .http_basic
        .into_iter()
        .map(|(name, basic)| (name, Credentials::new(basic.username, basic.password)))
        .collect())
}

/// Credential sources other than the URL itself
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    configured: HashMap<String, Credentials>,
    env: HashMap<String, String>,
}

impl CredentialStore {
    /// Create a store from configured credentials and an environment snapshot
    pub fn new(configured: HashMap<String, Credentials>, env: HashMap<String, String>) -> Self {
        Self { configured, env }
    }

    /// Create a store using the current process environment
    pub fn from_process_env(configured: HashMap<String, Credentials>) -> Self {
        Self::new(configured, std::env::vars().collect())
    }

    /// Resolve credentials for a repository
    pub fn resolve(&self, repository: &str, embedded: Option<Credentials>) -> Option<Credentials> {
        let stem = env_name(repository);

        self.from_env(&stem)
            .or_else(|| self.from_env(&format!("POETRY_HTTP_BASIC_{stem}")))
            .or_else(|| self.configured.get(repository).cloned())
            .or(embedded)
    }

    fn from_env(&self, stem: &str) -> Option<Credentials> {
        let username = self
            .env
            .get(&format!("{stem}_USERNAME"))
            .filter(|u| !u.is_empty())?;
        let password = self.env.get(&format!("{stem}_PASSWORD")).cloned();
        Some(Credentials::new(username.clone(), password))
    }
}
