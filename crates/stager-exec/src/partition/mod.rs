//! Contiguous, restartable partitioning of line-delimited JSON datasets.
mod cache;
pub use cache::LineCountCache;

mod reader;
pub use reader::SliceRecords;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use stager_model::SliceSpec;
use tracing::{debug, instrument};

use crate::error::ExecResult;

/// Splits a dataset into `count` contiguous slices, counting each file at most once.
#[derive(Clone, Default)]
pub struct StreamPartitioner {
    cache: LineCountCache,
}

impl StreamPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partitioner sharing an existing line count cache.
    pub fn with_cache(cache: LineCountCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &LineCountCache {
        &self.cache
    }

    /// Physical line count of `path`, blank lines included.
    pub fn count_lines(&self, path: &Path) -> ExecResult<u64> {
        self.cache.count_lines(path)
    }

    /// Select slice `slice_index` of `num_slices` from `path`.
    ///
    /// Validation happens before the file is touched. The returned slice re-opens the file on
    /// every [`DataSlice::records`] call, so it can be iterated any number of times.
    #[instrument(level = "debug", skip(self, path), fields(path = %path.display()))]
    pub fn slice(&self, path: &Path, num_slices: usize, slice_index: usize) -> ExecResult<DataSlice> {
        let spec = SliceSpec::new(slice_index, num_slices)?;
        let total_lines = self.count_lines(path)?;

        let (start, end) = spec.bounds(total_lines);
        debug!(
            target: "stager.exec.partition",
            total_lines,
            start,
            end = ?end,
            "slice selected"
        );

        Ok(DataSlice { path: path.to_path_buf(), spec, total_lines })
    }
}

/// One partition of a dataset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSlice {
    path: PathBuf,
    spec: SliceSpec,
    total_lines: u64,
}

impl DataSlice {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spec(&self) -> SliceSpec {
        self.spec
    }

    pub fn total_lines(&self) -> u64 {
        self.total_lines
    }

    /// Physical line window `[start, end)`; `end` is `None` for the last slice.
    pub fn bounds(&self) -> (u64, Option<u64>) {
        self.spec.bounds(self.total_lines)
    }

    /// Fresh iterator over the slice's records decoded as `T`.
    pub fn records<T: DeserializeOwned>(&self) -> ExecResult<SliceRecords<T>> {
        let (start, end) = self.bounds();
        SliceRecords::open(&self.path, start, end)
    }

    /// Fresh iterator over the slice's records as untyped JSON.
    pub fn values(&self) -> ExecResult<SliceRecords<Value>> {
        self.records()
    }
}
