//! Disk-backed resource store
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<sha256(name)[..16]>/generation.json     namespace name + creation time
//! <root>/<sha256(name)[..16]>/<sha256(key)>.json  request + response metadata
//! <root>/<sha256(name)[..16]>/<sha256(key)>.body  response body bytes
//! ```
//!
//! Entry files are written to a temporary name and renamed into place, so a
//! concurrent reader sees either the old or the new entry. `put_all` builds
//! the whole namespace in a hidden `.staging-*` directory and renames it over
//! the live one, so a failed bulk write leaves the namespace untouched.
//! Hidden directories are never listed as namespaces.

use crate::error::{ShopError, ShopResult};
use crate::worker::request::{Request, Response};
use crate::worker::store::{CachedEntry, ResourceStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const GENERATION_FILE: &str = "generation.json";
const STAGING_PREFIX: &str = ".staging-";
const RETIRED_PREFIX: &str = ".retired-";

/// Namespace metadata persisted next to its entries
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenerationMeta {
    name: String,
    created_at: DateTime<Utc>,
}

/// Resource store persisted as files
pub struct DiskResourceStore {
    root: PathBuf,
}

impl DiskResourceStore {
    /// Create a store rooted at `root` (created on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn hash(input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn namespace_dir(&self, name: &str) -> PathBuf {
        self.root.join(&Self::hash(name)[..16])
    }

    fn entry_stem(request: &Request) -> String {
        Self::hash(&request.cache_key())
    }

    async fn ensure_namespace(&self, name: &str) -> ShopResult<PathBuf> {
        let dir = self.namespace_dir(name);
        let meta_path = dir.join(GENERATION_FILE);
        if meta_path.exists() {
            return Ok(dir);
        }

        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ShopError::io(format!("creating cache directory {}", dir.display()), e))?;

        let meta = GenerationMeta {
            name: name.to_string(),
            created_at: Utc::now(),
        };
        write_atomic(&meta_path, serde_json::to_vec_pretty(&meta)?).await?;
        debug!("Created cache generation {} at {}", name, dir.display());
        Ok(dir)
    }

    /// Write one entry's files into `dir`
    async fn write_entry(dir: &Path, request: Request, mut response: Response) -> ShopResult<()> {
        let stem = Self::entry_stem(&request);
        let body = std::mem::take(&mut response.body);
        let entry = CachedEntry::new(request, response);

        // Body first: a metadata file is only visible once its body exists.
        write_atomic(&dir.join(format!("{}.body", stem)), body).await?;
        write_atomic(
            &dir.join(format!("{}.json", stem)),
            serde_json::to_vec_pretty(&entry)?,
        )
        .await
    }

    /// Build the complete next version of namespace `name` in `staging`:
    /// its current files plus `entries`
    async fn stage(
        &self,
        name: &str,
        staging: &Path,
        entries: Vec<(Request, Response)>,
    ) -> ShopResult<()> {
        fs::create_dir_all(staging)
            .await
            .map_err(|e| ShopError::io("creating staging directory", e))?;

        let current = self.namespace_dir(name);
        if current.join(GENERATION_FILE).exists() {
            copy_visible_files(&current, staging).await?;
        } else {
            let meta = GenerationMeta {
                name: name.to_string(),
                created_at: Utc::now(),
            };
            write_atomic(&staging.join(GENERATION_FILE), serde_json::to_vec_pretty(&meta)?).await?;
        }

        for (request, response) in entries {
            Self::write_entry(staging, request, response).await?;
        }
        Ok(())
    }

    /// Swap `staging` in as namespace `name`. On failure the previous
    /// directory is put back.
    async fn commit(&self, name: &str, staging: &Path) -> ShopResult<()> {
        let dir = self.namespace_dir(name);
        if !dir.exists() {
            return fs::rename(staging, &dir)
                .await
                .map_err(|e| ShopError::io(format!("committing cache generation {}", name), e));
        }

        let retired = self
            .root
            .join(format!("{}{}", RETIRED_PREFIX, uuid::Uuid::new_v4()));
        fs::rename(&dir, &retired)
            .await
            .map_err(|e| ShopError::io(format!("retiring cache generation {}", name), e))?;

        if let Err(e) = fs::rename(staging, &dir).await {
            if let Err(restore) = fs::rename(&retired, &dir).await {
                warn!("Failed to restore cache generation {}: {}", name, restore);
            }
            return Err(ShopError::io(format!("committing cache generation {}", name), e));
        }

        discard(&retired).await;
        Ok(())
    }

    async fn read_entry(dir: &Path, stem: &str) -> ShopResult<Option<CachedEntry>> {
        let meta_path = dir.join(format!("{}.json", stem));
        if !meta_path.exists() {
            return Ok(None);
        }

        let meta = fs::read(&meta_path).await.map_err(|e| {
            ShopError::io(format!("reading cache entry {}", meta_path.display()), e)
        })?;
        let mut entry: CachedEntry = serde_json::from_slice(&meta)?;

        let body_path = dir.join(format!("{}.body", stem));
        entry.response.body = fs::read(&body_path).await.map_err(|e| {
            ShopError::io(format!("reading cache body {}", body_path.display()), e)
        })?;
        Ok(Some(entry))
    }
}

/// Remove a scratch directory, logging instead of failing
async fn discard(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir).await {
        warn!("Failed to remove {}: {}", dir.display(), e);
    }
}

/// Copy every non-hidden file of `from` into `to`
async fn copy_visible_files(from: &Path, to: &Path) -> ShopResult<()> {
    let mut files = fs::read_dir(from)
        .await
        .map_err(|e| ShopError::io(format!("reading {}", from.display()), e))?;

    while let Some(file) = files
        .next_entry()
        .await
        .map_err(|e| ShopError::io("reading cache entry", e))?
    {
        let file_name = file.file_name();
        if file_name.to_string_lossy().starts_with('.') {
            continue;
        }
        fs::copy(file.path(), to.join(&file_name))
            .await
            .map_err(|e| ShopError::io(format!("copying {}", file.path().display()), e))?;
    }
    Ok(())
}

/// Write `contents` to a temporary sibling and rename it over `path`
pub(crate) async fn write_atomic(path: &Path, contents: Vec<u8>) -> ShopResult<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ShopError::Internal(format!("invalid file path {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.{}", file_name, uuid::Uuid::new_v4()));

    fs::write(&tmp, contents)
        .await
        .map_err(|e| ShopError::io(format!("writing {}", tmp.display()), e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| ShopError::io(format!("renaming into {}", path.display()), e))
}

#[async_trait]
impl ResourceStore for DiskResourceStore {
    async fn open(&self, name: &str) -> ShopResult<()> {
        self.ensure_namespace(name).await.map(|_| ())
    }

    async fn has(&self, name: &str) -> ShopResult<bool> {
        Ok(self.namespace_dir(name).join(GENERATION_FILE).exists())
    }

    async fn put_all(&self, name: &str, entries: Vec<(Request, Response)>) -> ShopResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ShopError::io("creating resource store directory", e))?;
        let staging = self
            .root
            .join(format!("{}{}", STAGING_PREFIX, uuid::Uuid::new_v4()));

        let count = entries.len();
        if let Err(e) = self.stage(name, &staging, entries).await {
            discard(&staging).await;
            return Err(e);
        }
        if let Err(e) = self.commit(name, &staging).await {
            discard(&staging).await;
            return Err(e);
        }

        debug!("Stored {} entries in {}", count, name);
        Ok(())
    }

    async fn put(&self, name: &str, request: Request, response: Response) -> ShopResult<()> {
        let dir = self.ensure_namespace(name).await?;
        debug!("Storing {} in {}", request.url, name);
        Self::write_entry(&dir, request, response).await
    }

    async fn match_request(&self, name: &str, request: &Request) -> ShopResult<Option<Response>> {
        let dir = self.namespace_dir(name);
        let entry = Self::read_entry(&dir, &Self::entry_stem(request)).await?;
        Ok(entry
            .filter(|entry| entry.matches(request))
            .map(|entry| entry.response))
    }

    async fn keys(&self) -> ShopResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut names = vec![];
        let mut dirs = fs::read_dir(&self.root)
            .await
            .map_err(|e| ShopError::io("reading resource store directory", e))?;

        while let Some(dir) = dirs
            .next_entry()
            .await
            .map_err(|e| ShopError::io("reading resource store entry", e))?
        {
            if dir.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let meta_path = dir.path().join(GENERATION_FILE);
            let Ok(content) = fs::read(&meta_path).await else {
                continue;
            };
            match serde_json::from_slice::<GenerationMeta>(&content) {
                Ok(meta) => names.push(meta.name),
                Err(e) => warn!("Skipping unreadable generation {}: {}", meta_path.display(), e),
            }
        }

        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> ShopResult<bool> {
        let dir = self.namespace_dir(name);
        if !dir.exists() {
            return Ok(false);
        }

        fs::remove_dir_all(&dir)
            .await
            .map_err(|e| ShopError::io(format!("deleting cache generation {}", name), e))?;
        Ok(true)
    }

    async fn entries(&self, name: &str) -> ShopResult<Vec<CachedEntry>> {
        let dir = self.namespace_dir(name);
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut entries = vec![];
        let mut files = fs::read_dir(&dir)
            .await
            .map_err(|e| ShopError::io(format!("reading cache generation {}", name), e))?;

        while let Some(file) = files
            .next_entry()
            .await
            .map_err(|e| ShopError::io("reading cache entry", e))?
        {
            let path = file.path();
            let is_entry = path.extension().is_some_and(|ext| ext == "json")
                && path.file_name().is_some_and(|n| n != GENERATION_FILE);
            if !is_entry {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }
            if let Some(entry) = Self::read_entry(&dir, stem).await? {
                entries.push(entry);
            }
        }

        entries.sort_by(|a, b| a.request.cache_key().cmp(&b.request.cache_key()));
        Ok(entries)
    }

    fn backend_name(&self) -> &'static str {
        "disk"
    }
}
