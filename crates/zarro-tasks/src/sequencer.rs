//! Test file ordering and sharding
//!
//! Tests are split across workers with [`shard`], then each worker orders its
//! slice with [`TestSequencer::sort`]: priority suites first, then the
//! quickest tests by recorded duration, then the smallest files.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, instrument};

/// A test file to be run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFile {
    /// Path of the test file
    pub path: PathBuf,
    /// Duration of the previous run, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Size on disk, filled in by [`TestSequencer::sort`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl TestFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration_ms: None,
            file_size: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// File name without directory or extension, and without a trailing
    /// `.spec`
    pub fn base_name(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match stem.strip_suffix(".spec") {
            Some(base) => base.to_string(),
            None => stem,
        }
    }
}

/// Errors raised while ordering tests
#[derive(Error, Debug)]
pub enum SequencerError {
    #[error("Invalid shard {index}/{count}: index must be between 1 and {count}")]
    InvalidShard { index: usize, count: usize },

    #[error("Invalid shard '{0}': expected <index>/<count>, eg 2/5")]
    InvalidShardSpec(String),

    #[error("Unable to stat test file {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File size lookup was interrupted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Which slice of the tests this worker runs, eg `2/5`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSpec {
    /// 1-based shard number
    pub index: usize,
    /// Total number of shards
    pub count: usize,
}

impl FromStr for ShardSpec {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SequencerError::InvalidShardSpec(s.to_string());
        let (index, count) = s.split_once('/').ok_or_else(invalid)?;
        let index: usize = index.trim().parse().map_err(|_| invalid())?;
        let count: usize = count.trim().parse().map_err(|_| invalid())?;
        if count == 0 || index == 0 || index > count {
            return Err(SequencerError::InvalidShard { index, count });
        }
        Ok(Self { index, count })
    }
}

impl fmt::Display for ShardSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.count)
    }
}

/// Return shard `shard_index` (1-based) of `shard_count`.
///
/// Tests are sorted by path and cut into contiguous slices of
/// `ceil(total / shard_count)`; the last shards may be short or empty.
pub fn shard(
    mut tests: Vec<TestFile>,
    shard_index: usize,
    shard_count: usize,
) -> Result<Vec<TestFile>, SequencerError> {
    if shard_count == 0 || shard_index == 0 || shard_index > shard_count {
        return Err(SequencerError::InvalidShard {
            index: shard_index,
            count: shard_count,
        });
    }

    tests.sort_by(|a, b| a.path.cmp(&b.path));
    let size = tests.len().div_ceil(shard_count);
    let start = (size * (shard_index - 1)).min(tests.len());
    let end = (start + size).min(tests.len());
    Ok(tests.drain(start..end).collect())
}

/// Orders the tests of one shard
#[derive(Debug, Clone, Default)]
pub struct TestSequencer {
    priority: BTreeSet<String>,
    root_dir: Option<PathBuf>,
}

impl TestSequencer {
    /// Create a sequencer; tests whose base name is in `priority` run first
    pub fn new<I, S>(priority: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            priority: priority.into_iter().map(Into::into).collect(),
            root_dir: None,
        }
    }

    /// Resolve relative test paths against `root_dir`
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    fn is_priority(&self, test: &TestFile) -> bool {
        !self.priority.is_empty() && self.priority.contains(&test.base_name())
    }

    /// Pairwise ordering of two tests
    pub fn compare(&self, a: &TestFile, b: &TestFile) -> Ordering {
        match (self.is_priority(a), self.is_priority(b)) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        if a.path == b.path {
            return Ordering::Equal;
        }
        if let (Some(da), Some(db)) = (a.duration_ms, b.duration_ms) {
            return da.cmp(&db);
        }
        a.file_size.unwrap_or(0).cmp(&b.file_size.unwrap_or(0))
    }

    /// Attach file sizes and order the tests.
    ///
    /// Sizes are looked up concurrently. A file that cannot be stat'ed fails
    /// the whole call.
    #[instrument(skip_all, fields(tests = tests.len()))]
    pub async fn sort(&self, mut tests: Vec<TestFile>) -> Result<Vec<TestFile>, SequencerError> {
        let mut lookups = JoinSet::new();
        for (idx, test) in tests.iter().enumerate() {
            let path = self.resolve(&test.path);
            lookups.spawn(async move {
                let metadata = tokio::fs::metadata(&path).await;
                (idx, path, metadata)
            });
        }

        while let Some(joined) = lookups.join_next().await {
            let (idx, path, metadata) = joined?;
            let metadata = metadata.map_err(|source| SequencerError::Stat { path, source })?;
            tests[idx].file_size = Some(metadata.len());
        }

        self.order(&mut tests);
        debug!("tests ordered");
        Ok(tests)
    }

    /// Stable insertion ordering. Mixing durations and sizes can make
    /// [`compare`](Self::compare) non-transitive, which this tolerates.
    pub fn order(&self, tests: &mut [TestFile]) {
        for i in 1..tests.len() {
            let mut j = i;
            while j > 0 && self.compare(&tests[j - 1], &tests[j]) == Ordering::Greater {
                tests.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root_dir {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
