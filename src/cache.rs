//! Versioned asset cache, the offline-caching collaborator.
//!
//! In-process model of the widget's asset cache with the usual
//! install/activate/fetch lifecycle: precache a manifest on install, drop
//! stale versions on activate, then serve cache-first with network
//! fallback and write-through. Bumping the version string is the only
//! supported invalidation trigger.

use std::collections::BTreeMap;

use crate::error::Error;

/// Document served when a navigation request fails and nothing newer is
/// cached for it.
pub const FALLBACK_DOC: &str = "/index.html";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RequestMode {
    /// Top-level document load; eligible for the offline fallback.
    Navigate,
    /// Subresource (script, style, image, ...).
    Asset,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Request {
    pub path: String,
    pub mode: RequestMode,
}

impl Request {
    pub fn asset(path: impl Into<String>) -> Self {
        Self { path: path.into(), mode: RequestMode::Asset }
    }

    pub fn navigate(path: impl Into<String>) -> Self {
        Self { path: path.into(), mode: RequestMode::Navigate }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self { status: 200, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The network behind the cache.
pub trait Fetcher {
    fn fetch(&mut self, request: &Request) -> Result<Response, Error>;
}

impl<F> Fetcher for F
where
    F: FnMut(&Request) -> Result<Response, Error>,
{
    fn fetch(&mut self, request: &Request) -> Result<Response, Error> {
        self(request)
    }
}

/// Set of versioned caches. Exactly one version is current; older versions
/// linger until `activate` sweeps them.
pub struct AssetCache {
    version: String,
    caches: BTreeMap<String, BTreeMap<String, Response>>,
}

impl AssetCache {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            caches: BTreeMap::new(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Precache the manifest into the current version's cache. Any failed
    /// fetch fails the whole install and leaves no partial cache behind.
    pub fn install(
        &mut self,
        manifest: &[&str],
        fetcher: &mut dyn Fetcher,
    ) -> Result<(), Error> {
        let mut cache = BTreeMap::new();
        for path in manifest {
            let request = Request::asset(*path);
            let response = fetcher.fetch(&request)?;
            cache.insert(path.to_string(), response);
        }
        log::debug!("installed cache {} with {} assets", self.version, cache.len());
        self.caches.insert(self.version.clone(), cache);
        Ok(())
    }

    /// Delete every cache whose version differs from the current one.
    pub fn activate(&mut self) {
        let current = self.version.clone();
        self.caches.retain(|version, _| {
            let keep = *version == current;
            if !keep {
                log::debug!("deleting old cache {version}");
            }
            keep
        });
    }

    /// Cache-first request handling: serve a cached response when any
    /// cache holds one; otherwise hit the network and write successful
    /// responses through into the current cache. A failed navigation
    /// falls back to the cached root document.
    pub fn handle(
        &mut self,
        request: &Request,
        fetcher: &mut dyn Fetcher,
    ) -> Result<Response, Error> {
        if let Some(cached) = self.lookup(&request.path) {
            return Ok(cached.clone());
        }
        match fetcher.fetch(request) {
            Ok(response) => {
                if response.is_success() {
                    self.caches
                        .entry(self.version.clone())
                        .or_default()
                        .insert(request.path.clone(), response.clone());
                }
                Ok(response)
            }
            Err(e) => {
                if request.mode == RequestMode::Navigate {
                    if let Some(doc) = self.lookup(FALLBACK_DOC) {
                        log::warn!("offline fallback for {}: {e}", request.path);
                        return Ok(doc.clone());
                    }
                }
                Err(e)
            }
        }
    }

    /// Search all caches, newest-version ordering not guaranteed - like
    /// the platform match, any cache may answer.
    fn lookup(&self, path: &str) -> Option<&Response> {
        self.caches.values().find_map(|cache| cache.get(path))
    }
}
