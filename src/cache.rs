//! Content-addressed result cache.
//!
//! Every cached value lives in `<root>/<category>/<fingerprint>.json`. The
//! fingerprint is a SHA-256 digest over the operation name and a canonical
//! JSON rendering of its inputs, so identical inputs always land on the same
//! file and any change to an input lands somewhere else. That is the only
//! invalidation mechanism besides an explicit [`CacheManager::clear`].
//!
//! Reads fail open: a missing, truncated or foreign entry is a miss, never an
//! error. Writes are best effort and only counted when they fail.
//!
//! There is no eviction and no cross-process locking; two processes writing
//! the same fingerprint race and the last writer wins.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::error::{PipelineError, Result};

const ENTRY_EXTENSION: &str = "json";

/// Cache partition. Clearing one category never touches the others.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Loaded tables and text collections.
    Data,
    /// Statistical results.
    Analysis,
    /// Sentiment, entities, keywords, topics, readability.
    Nlp,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Data, Category::Analysis, Category::Nlp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Data => "data",
            Category::Analysis => "analysis",
            Category::Nlp => "nlp",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "data" => Ok(Category::Data),
            "analysis" => Ok(Category::Analysis),
            "nlp" => Ok(Category::Nlp),
            _ => Err(PipelineError::InvalidStrategy {
                kind: "cache category",
                value: s.to_string(),
                expected: "data, analysis, nlp",
            }),
        }
    }
}

/// Hex SHA-256 over `{"args": <inputs>, "op": <operation>}`.
///
/// `serde_json` objects keep their keys sorted, so the rendering is canonical:
/// two maps with the same entries hash the same regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of<K: Serialize + ?Sized>(operation: &str, inputs: &K) -> serde_json::Result<Self> {
        let canonical = json!({
            "op": operation,
            "args": serde_json::to_value(inputs)?,
        });
        let digest = Sha256::digest(canonical.to_string().as_bytes());
        Ok(Fingerprint(format!("{:x}", digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of an input file at a point in time.
///
/// Put one of these into the key inputs of any operation that reads a file:
/// rewriting or touching the file changes the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub path: String,
    pub len: u64,
    pub modified_nanos: u64,
}

impl FileStamp {
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let meta = fs::metadata(path)?;
        let modified_nanos = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Ok(FileStamp {
            path: path.to_string_lossy().into_owned(),
            len: meta.len(),
            modified_nanos,
        })
    }
}

/// One persisted cache file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub operation: String,
    pub created_at: DateTime<Utc>,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryUsage {
    pub entries: usize,
    pub bytes: u64,
}

/// Session counters plus the current on-disk footprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_errors: u64,
    pub entries: usize,
    pub bytes: u64,
    pub categories: BTreeMap<Category, CategoryUsage>,
}

impl CacheStats {
    /// Hit ratio over this session's lookups, `0.0` before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "hits: {}, misses: {} (hit rate {:.1}%), writes: {}, write errors: {}",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.writes,
            self.write_errors
        )?;
        for (category, usage) in &self.categories {
            writeln!(
                f,
                "  {:<9} {:>6} entries {:>10.2} KiB",
                category.as_str(),
                usage.entries,
                usage.bytes as f64 / 1024.0
            )?;
        }
        write!(
            f,
            "  {:<9} {:>6} entries {:>10.2} KiB",
            "total",
            self.entries,
            self.bytes as f64 / 1024.0
        )
    }
}

/// File-backed, category-partitioned result cache.
#[derive(Debug)]
pub struct CacheManager {
    root: PathBuf,
    hits: u64,
    misses: u64,
    writes: u64,
    write_errors: u64,
}

impl CacheManager {
    /// Open (or create) a cache rooted at `root`, including all category directories.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for category in Category::ALL {
            fs::create_dir_all(root.join(category.as_str()))?;
        }
        debug!("Cache initialized at {}", root.display());
        Ok(CacheManager {
            root,
            hits: 0,
            misses: 0,
            writes: 0,
            write_errors: 0,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.as_str())
    }

    fn entry_path(&self, category: Category, fingerprint: &Fingerprint) -> PathBuf {
        self.category_dir(category)
            .join(format!("{}.{}", fingerprint, ENTRY_EXTENSION))
    }

    /// Look up a cached result. Anything short of a clean decode is a miss.
    pub fn get<T, K>(&mut self, category: Category, operation: &str, inputs: &K) -> Option<T>
    where
        T: DeserializeOwned,
        K: Serialize + ?Sized,
    {
        let fingerprint = match Fingerprint::of(operation, inputs) {
            Ok(fp) => fp,
            Err(e) => {
                warn!("Cannot fingerprint inputs of '{}': {}", operation, e);
                self.misses += 1;
                return None;
            }
        };
        let path = self.entry_path(category, &fingerprint);
        match read_entry::<T>(&path) {
            Ok(Some(value)) => {
                debug!("Cache hit: {}/{} ({})", category, operation, fingerprint);
                self.hits += 1;
                Some(value)
            }
            Ok(None) => {
                debug!("Cache miss: {}/{} ({})", category, operation, fingerprint);
                self.misses += 1;
                None
            }
            Err(reason) => {
                warn!(
                    "Ignoring unreadable cache entry {}: {}",
                    path.display(),
                    reason
                );
                self.misses += 1;
                None
            }
        }
    }

    /// Store a result. Failures are logged and counted, not returned.
    pub fn put<T, K>(&mut self, category: Category, operation: &str, inputs: &K, result: &T)
    where
        T: Serialize + ?Sized,
        K: Serialize + ?Sized,
    {
        match self.write_entry(category, operation, inputs, result) {
            Ok(path) => {
                debug!("Cached {}/{} at {}", category, operation, path.display());
                self.writes += 1;
            }
            Err(e) => {
                warn!("Cache write error for {}/{}: {}", category, operation, e);
                self.write_errors += 1;
            }
        }
    }

    fn write_entry<T, K>(
        &self,
        category: Category,
        operation: &str,
        inputs: &K,
        result: &T,
    ) -> Result<PathBuf>
    where
        T: Serialize + ?Sized,
        K: Serialize + ?Sized,
    {
        let fingerprint = Fingerprint::of(operation, inputs)?;
        let path = self.entry_path(category, &fingerprint);
        let entry = CacheEntry {
            fingerprint,
            operation: operation.to_string(),
            created_at: Utc::now(),
            payload: serde_json::to_value(result)?,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_vec(&entry)?)?;
        Ok(path)
    }

    /// Return the cached value or run `compute`, caching its successful result.
    ///
    /// `compute` is not called at all on a hit.
    pub fn get_or_compute<T, K, F, E>(
        &mut self,
        category: Category,
        operation: &str,
        inputs: &K,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        K: Serialize + ?Sized,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        if let Some(hit) = self.get(category, operation, inputs) {
            return Ok(hit);
        }
        let value = compute()?;
        self.put(category, operation, inputs, &value);
        Ok(value)
    }

    pub fn exists<K: Serialize + ?Sized>(
        &self,
        category: Category,
        operation: &str,
        inputs: &K,
    ) -> bool {
        Fingerprint::of(operation, inputs)
            .map(|fp| self.entry_path(category, &fp).is_file())
            .unwrap_or(false)
    }

    /// Delete entries of one category, or of all categories for `None`.
    /// Returns the number of entry files removed.
    pub fn clear(&mut self, category: Option<Category>) -> Result<usize> {
        let targets: Vec<Category> = match category {
            Some(c) => vec![c],
            None => Category::ALL.to_vec(),
        };
        let mut removed = 0;
        for category in targets {
            let dir = self.category_dir(category);
            for path in entry_files(&dir)? {
                fs::remove_file(&path)?;
                removed += 1;
            }
            fs::create_dir_all(&dir)?;
            debug!("Cleared {} cache", category);
        }
        Ok(removed)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats {
            hits: self.hits,
            misses: self.misses,
            writes: self.writes,
            write_errors: self.write_errors,
            ..CacheStats::default()
        };
        for category in Category::ALL {
            let mut usage = CategoryUsage::default();
            for path in entry_files(&self.category_dir(category))? {
                usage.entries += 1;
                usage.bytes += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            }
            stats.entries += usage.entries;
            stats.bytes += usage.bytes;
            stats.categories.insert(category, usage);
        }
        Ok(stats)
    }
}

/// `Ok(None)` when the file is absent, `Err` with a reason when it is unusable.
fn read_entry<T: DeserializeOwned>(path: &Path) -> std::result::Result<Option<T>, String> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    let entry: CacheEntry = serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;
    let file_stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    if entry.fingerprint.as_str() != file_stem {
        return Err(format!(
            "entry claims fingerprint {} but is stored as {}",
            entry.fingerprint, file_stem
        ));
    }
    serde_json::from_value(entry.payload)
        .map(Some)
        .map_err(|e| e.to_string())
}

fn entry_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map(|e| e == ENTRY_EXTENSION).unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
