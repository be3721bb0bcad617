//! Package repositories
//!
//! Every locked package is fetched through a named [`Repository`]. Packages
//! without an explicit source use the default repository (`pypi.org`);
//! poetry sources declare their own, keyed by the source `reference`.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Url;

use crate::config::defaults;
use crate::core::lock::{PackageSource, SourceKind};
use crate::error::{PackageError, RegistryError};
use crate::registry::credentials::{split_userinfo, CredentialStore, Credentials};

/// Protocol used to list a package's release files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// `{url}/pypi/{name}/{version}/json`
    Json,
    /// PEP 503 / PEP 691 simple index at `{url}/{name}/`
    Simple,
    /// No index, the lock file already points at the artifact
    Direct,
}

/// A package repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Repository name
    pub name: String,
    /// Base URL without credentials or trailing slash
    pub url: String,
    /// Index protocol
    pub kind: IndexKind,
    /// Basic auth credentials
    pub credentials: Option<Credentials>,
}

impl Repository {
    /// Create a repository from a URL that may embed credentials
    pub fn new(
        name: &str,
        url: &str,
        kind: IndexKind,
        store: &CredentialStore,
    ) -> Result<Self, RegistryError> {
        let (clean, embedded) = split_userinfo(url)?;
        Ok(Self {
            name: name.to_string(),
            url: clean.trim_end_matches('/').to_string(),
            kind,
            credentials: store.resolve(name, embedded),
        })
    }

    /// Host of the repository URL
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    /// Credentials to send with a request to `url`
    ///
    /// Credentials are only sent to the repository's own host, so files
    /// served from a CDN never see them.
    pub fn credentials_for(&self, url: &str) -> Option<&Credentials> {
        let credentials = self.credentials.as_ref()?;
        let target = Url::parse(url).ok()?;
        let host = self.host()?;
        (target.host_str() == Some(host.as_str())).then_some(credentials)
    }
}

/// All repositories known to a run
#[derive(Debug)]
pub struct RepositoryRegistry {
    default: Arc<Repository>,
    named: HashMap<String, Arc<Repository>>,
    store: CredentialStore,
}

impl RepositoryRegistry {
    /// Create a registry whose default repository lives at `default_url`
    pub fn new(default_url: &str, store: CredentialStore) -> Result<Self, RegistryError> {
        let default = Repository::new(
            defaults::DEFAULT_REPOSITORY_NAME,
            default_url,
            IndexKind::Json,
            &store,
        )?;
        Ok(Self {
            default: Arc::new(default),
            named: HashMap::new(),
            store,
        })
    }

    /// The default repository
    pub fn default_repository(&self) -> Arc<Repository> {
        Arc::clone(&self.default)
    }

    /// Repository a package is fetched from
    ///
    /// Named sources are registered on first use; later packages referring
    /// to the same name share that repository.
    pub fn for_source(
        &mut self,
        package: &str,
        source: Option<&PackageSource>,
    ) -> Result<Arc<Repository>, PackageError> {
        let Some(source) = source else {
            return Ok(self.default_repository());
        };

        let kind = match &source.kind {
            SourceKind::Json => IndexKind::Json,
            SourceKind::Legacy => IndexKind::Simple,
            SourceKind::Url => IndexKind::Direct,
            SourceKind::Unsupported(kind) => {
                return Err(PackageError::UnsupportedSource {
                    name: package.to_string(),
                    kind: kind.clone(),
                })
            }
        };

        let name = source.reference.clone().unwrap_or_else(|| source.url.clone());
        if kind != IndexKind::Direct {
            if let Some(existing) = self.named.get(&name) {
                return Ok(Arc::clone(existing));
            }
        }

        let repository = Arc::new(Repository::new(&name, &source.url, kind, &self.store)?);
        if kind != IndexKind::Direct {
            self.named.insert(name, Arc::clone(&repository));
        }
        Ok(repository)
    }
}
