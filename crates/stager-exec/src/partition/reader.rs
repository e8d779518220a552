use std::{
    fs::File,
    io::{BufRead, BufReader},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ExecError, ExecResult};

/// Lazy iterator over the records of one slice window.
///
/// Physical lines before `start` are skipped without parsing. Blank lines inside the window
/// advance the line index but yield nothing. A malformed line yields a single
/// [`ExecError::MalformedRecord`] and ends the iteration.
pub struct SliceRecords<T = Value> {
    reader: BufReader<File>,
    path: PathBuf,
    line: u64,
    start: u64,
    end: Option<u64>,
    buf: Vec<u8>,
    done: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T> SliceRecords<T> {
    pub(crate) fn open(path: &Path, start: u64, end: Option<u64>) -> ExecResult<Self> {
        let file = File::open(path).map_err(ExecError::io(path))?;
        Ok(Self {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
            line: 0,
            start,
            end,
            buf: Vec::new(),
            done: false,
            _record: PhantomData,
        })
    }

    /// Zero-based physical index of the next line to be read.
    pub fn position(&self) -> u64 {
        self.line
    }

    fn fail(&mut self, err: ExecError) -> Option<ExecResult<T>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<T: DeserializeOwned> Iterator for SliceRecords<T> {
    type Item = ExecResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            if self.end.is_some_and(|end| self.line >= end) {
                self.done = true;
                break;
            }

            self.buf.clear();
            let read = match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(read) => read,
                Err(source) => {
                    let path = self.path.clone();
                    return self.fail(ExecError::Io { path, source });
                }
            };
            if read == 0 {
                self.done = true;
                break;
            }

            let index = self.line;
            self.line += 1;
            if index < self.start || self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return match serde_json::from_slice::<T>(&self.buf) {
                Ok(record) => Some(Ok(record)),
                Err(source) => {
                    let path = self.path.clone();
                    self.fail(ExecError::MalformedRecord { path, line: index + 1, source })
                }
            };
        }
        None
    }
}

impl<T: DeserializeOwned> std::iter::FusedIterator for SliceRecords<T> {}
