//! Artifact cache keyed by the exact ordered word list and render options.
//!
//! Each entry is a video plus a small JSON sidecar with its metadata. An
//! entry counts as present only when both files exist.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use signpose_models::{AnimationRequest, DEFAULT_FPS};

use crate::metrics;

const MAX_STEM_LEN: usize = 120;
const HASH_LEN: usize = 12;

/// Identity of one rendered artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub words: Vec<String>,
    pub fps: u32,
    pub blend_width: usize,
    pub mirror: bool,
}

impl ArtifactKey {
    /// Key for `request` rendered at `fps` (the request's rate with the
    /// service default filled in).
    pub fn from_request(request: &AnimationRequest, fps: u32) -> Self {
        Self {
            words: request.normalized_words(),
            fps,
            blend_width: request.blend_width,
            mirror: request.mirror,
        }
    }

    fn canonical(&self) -> String {
        format!(
            "{}|fps={}|blend={}|mirror={}",
            self.words.join("\u{1f}"),
            self.fps,
            self.blend_width,
            self.mirror
        )
    }

    fn has_default_options(&self) -> bool {
        self.fps == DEFAULT_FPS && self.blend_width == 0 && !self.mirror
    }

    /// File name: `<w1>_<w2>..._asl.mp4`.
    ///
    /// A short hash is appended whenever the plain name could collide:
    /// non-default options, characters replaced during sanitizing, or a
    /// truncated name.
    pub fn file_name(&self) -> String {
        let sanitized: Vec<String> = self.words.iter().map(|w| sanitize_word(w)).collect();
        let mut stem = sanitized.join("_");

        let lossy = sanitized.iter().zip(&self.words).any(|(s, w)| s != w);
        let truncated = stem.len() > MAX_STEM_LEN;
        if truncated {
            stem.truncate(MAX_STEM_LEN);
        }

        if lossy || truncated || !self.has_default_options() {
            let digest = Sha256::digest(self.canonical().as_bytes());
            let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
            stem.push('_');
            stem.push_str(&hex[..HASH_LEN]);
        }

        format!("{}_asl.mp4", stem)
    }
}

fn sanitize_word(word: &str) -> String {
    word.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

/// A cache lookup result.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub path: PathBuf,
    pub file_name: String,
    pub meta: T,
    /// True when the artifact already existed.
    pub cached: bool,
}

/// Disk-backed cache of rendered videos with per-key single flight.
#[derive(Debug)]
pub struct ArtifactCache {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ArtifactCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Return the stored artifact, or run `compute` once to produce it.
    ///
    /// `compute` receives the destination path and must leave a complete
    /// file there on success. Concurrent calls for the same key wait for the
    /// first one and then see its result.
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &ArtifactKey, compute: F) -> Result<Cached<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let file_name = key.file_name();
        let path = self.dir.join(&file_name);
        let lock = self.key_lock(&file_name);

        let result = {
            let _guard = lock.lock().await;
            match self.load_meta::<T>(&path).await {
                Some(meta) => {
                    debug!(file = %file_name, "Artifact cache hit");
                    metrics::record_cache_lookup(true);
                    Ok(Cached { path, file_name: file_name.clone(), meta, cached: true })
                }
                None => {
                    metrics::record_cache_lookup(false);
                    match compute(path.clone()).await {
                        Ok(meta) => {
                            self.store_meta(&path, &meta).await;
                            Ok(Cached { path, file_name: file_name.clone(), meta, cached: false })
                        }
                        Err(e) => Err(e),
                    }
                }
            }
        };

        self.release_key_lock(&file_name, lock);
        result
    }

    fn key_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    fn release_key_lock(&self, name: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        // One reference in the map plus ours means nobody else is waiting.
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(name);
        }
    }

    fn meta_path(path: &Path) -> PathBuf {
        path.with_extension("json")
    }

    async fn load_meta<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return None;
        }
        let raw = tokio::fs::read(Self::meta_path(path)).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable cache metadata");
                None
            }
        }
    }

    async fn store_meta<T: Serialize>(&self, path: &Path, meta: &T) {
        let meta_path = Self::meta_path(path);
        let result = match serde_json::to_vec(meta) {
            Ok(bytes) => tokio::fs::write(&meta_path, bytes).await,
            Err(e) => Err(std::io::Error::other(e)),
        };
        if let Err(e) = result {
            warn!(path = %meta_path.display(), error = %e, "Failed to write cache metadata");
        }
    }
}
