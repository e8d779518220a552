use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use tracing::debug;

use crate::error::{ExecError, ExecResult};

/// Physical line counts keyed by path.
///
/// Counting a large dataset is a full scan, so results are kept for as long as the cache lives.
/// Entries are never revalidated: a caller reusing the cache across edits of the same file must
/// [`invalidate`](Self::invalidate) it.
#[derive(Clone, Default)]
pub struct LineCountCache {
    inner: Arc<RwLock<HashMap<PathBuf, u64>>>,
}

impl LineCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached count for `path`, if any.
    pub fn get(&self, path: &Path) -> Option<u64> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.get(path).copied()
    }

    /// Count physical lines of `path`, scanning the file only on the first request.
    pub fn count_lines(&self, path: &Path) -> ExecResult<u64> {
        if let Some(count) = self.get(path) {
            return Ok(count);
        }

        let count = scan_lines(path)?;
        debug!(target: "stager.exec.partition", path = %path.display(), lines = count, "line count cached");
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.insert(path.to_path_buf(), count);
        Ok(count)
    }

    /// Forget the count for `path`; returns `true` if one was cached.
    pub fn invalidate(&self, path: &Path) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.remove(path).is_some()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.clear();
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Number of lines a line-by-line reader would yield: newline count plus an unterminated tail.
fn scan_lines(path: &Path) -> ExecResult<u64> {
    let file = File::open(path).map_err(ExecError::io(path))?;
    let mut reader = BufReader::new(file);

    let mut count = 0u64;
    let mut last = None;
    loop {
        let buf = reader.fill_buf().map_err(ExecError::io(path))?;
        if buf.is_empty() {
            break;
        }
        count += buf.iter().filter(|&&b| b == b'\n').count() as u64;
        last = buf.last().copied();
        let len = buf.len();
        reader.consume(len);
    }
    if last.is_some_and(|b| b != b'\n') {
        count += 1;
    }
    Ok(count)
}
