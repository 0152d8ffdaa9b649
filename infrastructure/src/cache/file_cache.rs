//! On-disk response cache.

use celltype_application::{Fingerprint, ResponseCache};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    lines: Vec<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

/// Entry count and size of a cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}

/// Stores each response as `<fingerprint>.json` under one directory.
///
/// Unreadable or corrupt entries are treated as misses. Write failures are
/// logged and otherwise ignored.
pub struct FileResponseCache {
    dir: PathBuf,
}

impl FileResponseCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.json", fingerprint.as_str()))
    }

    fn entry_files(&self) -> io::Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Delete every cached response. Returns the number removed.
    pub fn clear(&self) -> io::Result<usize> {
        let files = self.entry_files()?;
        for path in &files {
            fs::remove_file(path)?;
        }
        Ok(files.len())
    }

    pub fn stats(&self) -> io::Result<CacheStats> {
        let mut stats = CacheStats::default();
        for path in self.entry_files()? {
            stats.entries += 1;
            stats.total_bytes += fs::metadata(&path)?.len();
        }
        Ok(stats)
    }

    fn write_entry(&self, path: &Path, lines: &[String]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let entry = CacheEntry {
            lines: lines.to_vec(),
            created_at: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&entry)?;

        // Readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)
    }
}

impl ResponseCache for FileResponseCache {
    fn get(&self, fingerprint: &Fingerprint) -> Option<Vec<String>> {
        let path = self.entry_path(fingerprint);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&content) {
            Ok(entry) => {
                debug!(fingerprint = %fingerprint, "Cache hit");
                Some(entry.lines)
            }
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    fn put(&self, fingerprint: &Fingerprint, lines: &[String]) {
        let path = self.entry_path(fingerprint);
        if let Err(e) = self.write_entry(&path, lines) {
            warn!("Could not write cache entry {}: {}", path.display(), e);
        }
    }
}
