//! Cache Module for the Lamia compiler
//!
//! Rendered output keyed by a sha256 of the source and the settings that
//! shape it, held in memory and optionally mirrored to disk as JSON.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::codegen::Target;

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub target: Target,
    pub output: String,
}

/// Rendered output keyed by `(hash, target)`. Optionally mirrored to disk as
/// one JSON file per entry. There is no expiry.
pub struct CompilationCache {
    entries: Mutex<HashMap<(String, Target), String>>,
    cache_dir: Option<PathBuf>,
}

impl CompilationCache {
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            cache_dir: None,
        }
    }

    pub fn persistent(cache_dir: &Path) -> Self {
        if !cache_dir.exists() {
            fs::create_dir_all(cache_dir).ok();
        }
        Self {
            entries: Mutex::new(HashMap::new()),
            cache_dir: Some(cache_dir.to_path_buf()),
        }
    }

    /// Hash of the source together with every setting that changes the output.
    pub fn key_for(source: &str, fingerprint: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update([0u8]);
        hasher.update(fingerprint.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, Target), String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entry_path(&self, hash: &str, target: Target) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.{}.json", hash, target.name())))
    }

    pub fn get(&self, hash: &str, target: Target) -> Option<String> {
        let mut entries = self.lock();
        if let Some(output) = entries.get(&(hash.to_string(), target)) {
            return Some(output.clone());
        }

        let cache_path = self.entry_path(hash, target)?;
        if !cache_path.exists() {
            return None;
        }
        let data = fs::read_to_string(&cache_path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                log::warn!(
                    "Cache deserialization failed for {}: {}",
                    cache_path.display(),
                    e
                );
                fs::remove_file(&cache_path).ok();
                return None;
            }
        };
        if entry.hash != hash || entry.target != target {
            return None;
        }
        entries.insert((hash.to_string(), target), entry.output.clone());
        Some(entry.output)
    }

    pub fn set(&self, hash: &str, target: Target, output: &str) {
        let mut entries = self.lock();
        entries.insert((hash.to_string(), target), output.to_string());

        let Some(cache_path) = self.entry_path(hash, target) else {
            return;
        };
        let entry = CacheEntry {
            hash: hash.to_string(),
            target,
            output: output.to_string(),
        };
        if let Ok(data) = serde_json::to_string(&entry) {
            if let Err(e) = fs::write(&cache_path, data) {
                log::debug!("Cache write failed for {}: {}", cache_path.display(), e);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
