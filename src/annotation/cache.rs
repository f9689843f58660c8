//! Content-addressed annotation cache.
//!
//! Tagging a corpus is by far the slowest step of a run, so results are
//! persisted and reused. An entry is keyed by the SHA-256 of the batch it was
//! computed from, so changing the filtering thresholds (and therefore the set
//! of documents) selects a different entry instead of returning stale rows.
//!
//! Entries live in the cache directory as `annotations-<checksum>.json`:
//!
//! ```json
//! {"checksum": "9f86d0…", "annotator": "udpipe", "created_at": "2024-05-01T12:00:00Z", "documents": 412, "rows": [...]}
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::annotation::annotator::{AnnotationInput, AnnotationRow, Annotator};
use crate::error::{AktstkError, Result};

/// Whether a batch was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Hit,
    Miss,
    /// An entry existed but `overwrite` was requested.
    Overwritten,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    checksum: String,
    annotator: String,
    created_at: DateTime<Utc>,
    documents: usize,
    rows: Vec<AnnotationRow>,
}

/// A directory of cached annotation results.
#[derive(Debug, Clone)]
pub struct AnnotationCache {
    directory: PathBuf,
}

impl AnnotationCache {
    /// Open (and create if needed) a cache directory.
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            fs::create_dir_all(&directory).map_err(|e| {
                AktstkError::storage(format!("Failed to create cache directory: {e}"))
            })?;
        }

        if !directory.is_dir() {
            return Err(AktstkError::storage(format!(
                "Cache path is not a directory: {}",
                directory.display()
            )));
        }

        Ok(AnnotationCache { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Compute the cache key of a batch.
    ///
    /// The key depends on the set of (document id, text) pairs only, not on
    /// the order they are given in.
    pub fn checksum(batch: &[AnnotationInput]) -> String {
        let mut sorted: Vec<&AnnotationInput> = batch.iter().collect();
        sorted.sort_by(|a, b| a.doc_id.cmp(&b.doc_id).then_with(|| a.text.cmp(&b.text)));

        let mut hasher = Sha256::new();
        for input in sorted {
            hasher.update(input.doc_id.to_le_bytes());
            hasher.update((input.text.len() as u64).to_le_bytes());
            hasher.update(input.text.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Path of the entry for `checksum`.
    pub fn entry_path(&self, checksum: &str) -> PathBuf {
        self.directory.join(format!("annotations-{checksum}.json"))
    }

    /// Load the entry for `checksum`, if one exists.
    pub fn load(&self, checksum: &str) -> Result<Option<Vec<AnnotationRow>>> {
        let path = self.entry_path(checksum);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        let entry: CacheEntry = serde_json::from_reader(BufReader::new(file))?;

        if entry.checksum != checksum {
            return Err(AktstkError::StaleCache {
                expected: checksum.to_string(),
                found: entry.checksum,
            });
        }

        info!(
            "Cache hit: {} rows for {} documents from {} ({})",
            entry.rows.len(),
            entry.documents,
            entry.annotator,
            entry.created_at
        );
        Ok(Some(entry.rows))
    }

    /// Persist rows for `checksum`.
    ///
    /// The entry is written to a temporary file and renamed into place, so a
    /// reader never sees a partial entry.
    pub fn store(
        &self,
        checksum: &str,
        annotator: &str,
        documents: usize,
        rows: &[AnnotationRow],
    ) -> Result<PathBuf> {
        let path = self.entry_path(checksum);
        let entry = CacheEntryRef {
            checksum,
            annotator,
            created_at: Utc::now(),
            documents,
            rows,
        };

        let mut temp = NamedTempFile::new_in(&self.directory)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer(&mut writer, &entry)?;
            writer.flush()?;
        }
        temp.persist(&path).map_err(|e| AktstkError::from(e.error))?;

        info!("Cached {} rows at {}", rows.len(), path.display());
        Ok(path)
    }

    /// Serve `batch` from the cache, or annotate it and cache the result.
    ///
    /// Nothing is written when the annotator fails.
    pub fn annotate(
        &self,
        annotator: &dyn Annotator,
        batch: &[AnnotationInput],
        parallelism: usize,
        overwrite: bool,
    ) -> Result<(Vec<AnnotationRow>, CacheStatus)> {
        let checksum = Self::checksum(batch);
        let exists = self.entry_path(&checksum).exists();

        let status = if exists && overwrite {
            warn!("Overwriting cached annotations {checksum}");
            CacheStatus::Overwritten
        } else if exists {
            if let Some(rows) = self.load(&checksum)? {
                return Ok((rows, CacheStatus::Hit));
            }
            CacheStatus::Miss
        } else {
            info!("Cache miss for {} documents ({checksum})", batch.len());
            CacheStatus::Miss
        };

        let rows = annotator.annotate_batch(batch, parallelism)?;
        self.store(&checksum, annotator.name(), batch.len(), &rows)?;
        Ok((rows, status))
    }
}

/// Borrowed form of [`CacheEntry`] for writing without cloning rows.
#[derive(Serialize)]
struct CacheEntryRef<'a> {
    checksum: &'a str,
    annotator: &'a str,
    created_at: DateTime<Utc>,
    documents: usize,
    rows: &'a [AnnotationRow],
}

/// An [`Annotator`] that memoizes another one through an [`AnnotationCache`].
pub struct CachedAnnotator {
    inner: Arc<dyn Annotator>,
    cache: AnnotationCache,
    overwrite: bool,
}

impl CachedAnnotator {
    pub fn new(inner: Arc<dyn Annotator>, cache: AnnotationCache) -> Self {
        CachedAnnotator {
            inner,
            cache,
            overwrite: false,
        }
    }

    /// Recompute even when an entry exists.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Annotate and report whether the cache was used.
    pub fn annotate_with_status(
        &self,
        batch: &[AnnotationInput],
        parallelism: usize,
    ) -> Result<(Vec<AnnotationRow>, CacheStatus)> {
        self.cache
            .annotate(self.inner.as_ref(), batch, parallelism, self.overwrite)
    }
}

impl Annotator for CachedAnnotator {
    fn annotate_batch(
        &self,
        batch: &[AnnotationInput],
        parallelism: usize,
    ) -> Result<Vec<AnnotationRow>> {
        self.annotate_with_status(batch, parallelism)
            .map(|(rows, _)| rows)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::annotator::tests::row;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAnnotator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingAnnotator {
        fn new() -> Self {
            CountingAnnotator {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    impl Annotator for CountingAnnotator {
        fn annotate_batch(
            &self,
            batch: &[AnnotationInput],
            _parallelism: usize,
        ) -> Result<Vec<AnnotationRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AktstkError::annotation("model unavailable"));
            }
            Ok(batch
                .iter()
                .map(|input| row(input.doc_id, 1, 1, &input.text))
                .collect())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn batch() -> Vec<AnnotationInput> {
        vec![AnnotationInput::new(1, "Hus"), AnnotationInput::new(2, "Skib")]
    }

    #[test]
    fn test_checksum_ignores_order() {
        let mut reversed = batch();
        reversed.reverse();
        assert_eq!(
            AnnotationCache::checksum(&batch()),
            AnnotationCache::checksum(&reversed)
        );
    }

    #[test]
    fn test_checksum_depends_on_content() {
        let changed = vec![AnnotationInput::new(1, "Hus"), AnnotationInput::new(2, "Skibe")];
        let fewer = vec![AnnotationInput::new(1, "Hus")];

        let original = AnnotationCache::checksum(&batch());
        assert_ne!(original, AnnotationCache::checksum(&changed));
        assert_ne!(original, AnnotationCache::checksum(&fewer));
        assert_eq!(original.len(), 64);
    }

    #[test]
    fn test_checksum_frames_text() {
        // Without length framing these two batches would hash identically.
        let a = vec![AnnotationInput::new(1, "ab"), AnnotationInput::new(2, "c")];
        let b = vec![AnnotationInput::new(1, "a"), AnnotationInput::new(2, "bc")];
        assert_ne!(AnnotationCache::checksum(&a), AnnotationCache::checksum(&b));
    }

    #[test]
    fn test_miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AnnotationCache::new(dir.path().join("cache")).unwrap();
        let annotator = CountingAnnotator::new();

        let (rows, status) = cache.annotate(&annotator, &batch(), 1, false).unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(rows.len(), 2);

        let (cached, status) = cache.annotate(&annotator, &batch(), 1, false).unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(cached, rows);
        assert_eq!(annotator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_different_batch_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AnnotationCache::new(dir.path()).unwrap();
        let annotator = CountingAnnotator::new();

        cache.annotate(&annotator, &batch(), 1, false).unwrap();
        let (rows, status) = cache
            .annotate(&annotator, &[AnnotationInput::new(1, "Hus")], 1, false)
            .unwrap();

        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(rows.len(), 1);
        assert_eq!(annotator.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_overwrite_recomputes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AnnotationCache::new(dir.path()).unwrap();
        let annotator = CountingAnnotator::new();

        cache.annotate(&annotator, &batch(), 1, false).unwrap();
        let (_, status) = cache.annotate(&annotator, &batch(), 1, true).unwrap();

        assert_eq!(status, CacheStatus::Overwritten);
        assert_eq!(annotator.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_annotation_leaves_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AnnotationCache::new(dir.path()).unwrap();
        let annotator = CountingAnnotator {
            calls: AtomicUsize::new(0),
            fail: true,
        };

        assert!(cache.annotate(&annotator, &batch(), 1, false).is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_mismatched_entry_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AnnotationCache::new(dir.path()).unwrap();
        let checksum = AnnotationCache::checksum(&batch());

        // An entry written for another batch, stored under this batch's key.
        cache.store("0000", "counting", 2, &[]).unwrap();
        fs::rename(cache.entry_path("0000"), cache.entry_path(&checksum)).unwrap();

        match cache.load(&checksum) {
            Err(AktstkError::StaleCache { expected, found }) => {
                assert_eq!(expected, checksum);
                assert_eq!(found, "0000");
            }
            other => panic!("Expected stale cache, got {other:?}"),
        }
    }

    #[test]
    fn test_cached_annotator_wraps_inner() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(CountingAnnotator::new());
        let cached = CachedAnnotator::new(inner.clone(), AnnotationCache::new(dir.path()).unwrap());

        cached.annotate_batch(&batch(), 1).unwrap();
        let (_, status) = cached.annotate_with_status(&batch(), 1).unwrap();

        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(cached.name(), "counting");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
