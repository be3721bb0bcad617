//! Package index client
//!
//! Lists the release files of a pinned package version, together with
//! their download URLs and digests. Two protocols are supported:
//!
//! - the PyPI JSON API (`/pypi/{name}/{version}/json`)
//! - the simple repository API, as PEP 691 JSON or PEP 503 HTML

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use serde::Deserialize;

use crate::config::defaults;
use crate::core::lock::filename_from_url;
use crate::error::RegistryError;
use crate::registry::repository::{IndexKind, Repository};

const SIMPLE_JSON: &str = "application/vnd.pypi.simple.v1+json";

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#).expect("valid regex")
});

static NAME_SEPARATORS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("valid regex"));

/// A release file as listed by an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFile {
    /// File name
    pub filename: String,
    /// Absolute download URL
    pub url: String,
    /// Digests by algorithm name
    pub digests: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct JsonRelease {
    #[serde(default)]
    urls: Vec<JsonReleaseFile>,
}

#[derive(Debug, Deserialize)]
struct JsonReleaseFile {
    filename: String,
    url: String,
    #[serde(default)]
    digests: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SimpleProject {
    #[serde(default)]
    files: Vec<SimpleFile>,
}

#[derive(Debug, Deserialize)]
struct SimpleFile {
    filename: String,
    url: String,
    #[serde(default)]
    hashes: HashMap<String, String>,
}

/// PEP 503 name normalization
pub fn normalize_name(name: &str) -> String {
    NAME_SEPARATORS_RE
        .replace_all(&name.to_ascii_lowercase(), "-")
        .into_owned()
}

/// Parse the anchors of a PEP 503 project page
///
/// Each `<a href="URL#alg=digest">filename</a>` becomes an [`IndexFile`];
/// relative links are resolved against `base`.
pub fn parse_simple_html(html: &str, base: &Url) -> Vec<IndexFile> {
    ANCHOR_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let href = caps[1].replace("&amp;", "&");
            let (link, fragment) = match href.split_once('#') {
                Some((link, fragment)) => (link.to_string(), Some(fragment.to_string())),
                None => (href, None),
            };
            let url = base.join(&link).ok()?.to_string();

            let text = caps[2].trim();
            let filename = if text.is_empty() || text.contains('<') {
                filename_from_url(&url)?
            } else {
                text.to_string()
            };

            let digests = fragment
                .and_then(|f| {
                    f.split_once('=')
                        .map(|(alg, digest)| (alg.to_ascii_lowercase(), digest.to_ascii_lowercase()))
                })
                .into_iter()
                .collect();

            Some(IndexFile {
                filename,
                url,
                digests,
            })
        })
        .collect()
}

/// Client for package index metadata
#[derive(Debug, Clone)]
pub struct IndexClient {
    client: reqwest::Client,
}

impl IndexClient {
    /// Create a client with default timeouts
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .connect_timeout(Duration::from_secs(30))
                .user_agent(defaults::USER_AGENT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// List the release files of `name==version` in `repository`
    pub async fn files(
        &self,
        repository: &Repository,
        name: &str,
        version: &str,
    ) -> Result<Vec<IndexFile>, RegistryError> {
        match repository.kind {
            IndexKind::Json => self.json_api(repository, name, version).await,
            IndexKind::Simple => self.simple_api(repository, name).await,
            IndexKind::Direct => Ok(Vec::new()),
        }
    }

    async fn json_api(
        &self,
        repository: &Repository,
        name: &str,
        version: &str,
    ) -> Result<Vec<IndexFile>, RegistryError> {
        let url = format!("{}/pypi/{name}/{version}/json", repository.url);
        let response = self.get(repository, name, &url, "application/json").await?;

        let release: JsonRelease = response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidMetadata {
                package: name.to_string(),
                error: e.to_string(),
            })?;

        Ok(release
            .urls
            .into_iter()
            .map(|f| IndexFile {
                filename: f.filename,
                url: f.url,
                digests: f.digests,
            })
            .collect())
    }

    async fn simple_api(
        &self,
        repository: &Repository,
        name: &str,
    ) -> Result<Vec<IndexFile>, RegistryError> {
        let url = format!("{}/{}/", repository.url, normalize_name(name));
        let accept = format!("{SIMPLE_JSON}, text/html;q=0.1");
        let response = self.get(repository, name, &url, &accept).await?;

        let base = response.url().clone();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(SIMPLE_JSON));
        let invalid = |e: reqwest::Error| RegistryError::InvalidMetadata {
            package: name.to_string(),
            error: e.to_string(),
        };

        if is_json {
            let project: SimpleProject = response.json().await.map_err(invalid)?;
            return Ok(project
                .files
                .into_iter()
                .filter_map(|f| {
                    Some(IndexFile {
                        url: base.join(&f.url).ok()?.to_string(),
                        filename: f.filename,
                        digests: f.hashes,
                    })
                })
                .collect());
        }

        let html = response.text().await.map_err(invalid)?;
        Ok(parse_simple_html(&html, &base))
    }

    async fn get(
        &self,
        repository: &Repository,
        name: &str,
        url: &str,
        accept: &str,
    ) -> Result<reqwest::Response, RegistryError> {
        tracing::debug!("GET {url}");
        let metadata_error = |error: String| RegistryError::Metadata {
            package: name.to_string(),
            error,
        };

        let mut request = self.client.get(url).header(ACCEPT, accept);
        if let Some(credentials) = repository.credentials_for(url) {
            request = request.basic_auth(&credentials.username, credentials.password.as_ref());
        }

        let response = request.send().await.map_err(|e| metadata_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(metadata_error(format!("HTTP {}", response.status())));
        }
        Ok(response)
    }
}

impl Default for IndexClient {
    fn default() -> Self {
        Self::new()
    }
}
