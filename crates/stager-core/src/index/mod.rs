//! Checks against the shared vector index server.
//!
//! The server is shared between experiments, so a worker must confirm it is talking to the
//! server that holds its collection before writing or querying.
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{CoreError, IndexError};

/// Client of the shared vector index / document store.
pub trait IndexClient {
    fn list_collections(&self) -> Result<Vec<String>, IndexError>;
    fn collection_size(&self, name: &str) -> Result<u64, IndexError>;
    fn write_records(&self, name: &str, batch: &[Value]) -> Result<(), IndexError>;
    fn delete_collection(&self, name: &str) -> Result<(), IndexError>;
}

/// What the server holds relative to one expected collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub name: String,
    /// Size of the expected collection, `None` if absent.
    pub size: Option<u64>,
    /// Every collection on the server with its size, in server order.
    pub collections: Vec<(String, u64)>,
}

impl IndexReport {
    pub fn is_present(&self) -> bool {
        self.size.is_some()
    }

    /// Collections other than the expected one.
    pub fn foreign(&self) -> impl Iterator<Item = &str> {
        self.collections
            .iter()
            .map(|(n, _)| n.as_str())
            .filter(move |n| *n != self.name)
    }

    /// `true` when the server is empty or holds only the expected collection.
    pub fn is_exclusive(&self) -> bool {
        self.foreign().next().is_none()
    }
}

/// Inspect the server for collection `name`.
///
/// A server holding other collections is reported with a warning: it usually means the
/// connection points at another experiment's server.
pub fn verify_index(client: &dyn IndexClient, name: &str) -> Result<IndexReport, CoreError> {
    let mut collections = Vec::new();
    for collection in client.list_collections()? {
        let size = client.collection_size(&collection)?;
        collections.push((collection, size));
    }

    let size = collections
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, size)| *size);
    let report = IndexReport {
        name: name.to_string(),
        size,
        collections,
    };

    if !report.is_exclusive() {
        warn!(
            target: "stager.core.index",
            expected = %name,
            foreign = ?report.foreign().collect::<Vec<_>>(),
            "index server holds other collections; the connection may point at the wrong server"
        );
    }
    info!(
        target: "stager.core.index",
        collection = %name,
        present = report.is_present(),
        size = report.size.unwrap_or(0),
        "index verified"
    );
    Ok(report)
}

/// Make room for a fresh build of `name`; returns `true` if a collection was dropped.
pub fn prepare_index(
    client: &dyn IndexClient,
    name: &str,
    delete_if_exists: bool,
) -> Result<bool, CoreError> {
    if !delete_if_exists {
        return Ok(false);
    }
    let exists = client.list_collections()?.iter().any(|c| c == name);
    if exists {
        client.delete_collection(name)?;
        info!(target: "stager.core.index", collection = %name, "existing collection deleted");
    }
    Ok(exists)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// In-memory index server.
    #[derive(Default)]
    pub struct MemoryIndex {
        pub collections: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl MemoryIndex {
        pub fn with(self, name: &str, size: usize) -> Self {
            self.collections
                .lock()
                .unwrap()
                .push((name.to_string(), vec![Value::Null; size]));
            self
        }
    }

    impl IndexClient for MemoryIndex {
        fn list_collections(&self) -> Result<Vec<String>, IndexError> {
            Ok(self
                .collections
                .lock()
                .unwrap()
                .iter()
                .map(|(n, _)| n.clone())
                .collect())
        }

        fn collection_size(&self, name: &str) -> Result<u64, IndexError> {
            self.collections
                .lock()
                .unwrap()
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, docs)| docs.len() as u64)
                .ok_or_else(|| IndexError::CollectionNotFound(name.to_string()))
        }

        fn write_records(&self, name: &str, batch: &[Value]) -> Result<(), IndexError> {
            let mut collections = self.collections.lock().unwrap();
            match collections.iter_mut().find(|(n, _)| n == name) {
                Some((_, docs)) => docs.extend_from_slice(batch),
                None => collections.push((name.to_string(), batch.to_vec())),
            }
            Ok(())
        }

        fn delete_collection(&self, name: &str) -> Result<(), IndexError> {
            self.collections.lock().unwrap().retain(|(n, _)| n != name);
            Ok(())
        }
    }

    #[test]
    fn exclusive_server_with_collection() {
        let server = MemoryIndex::default().with("expA___wiki", 3);
        let report = verify_index(&server, "expA___wiki").unwrap();
        assert!(report.is_present());
        assert_eq!(report.size, Some(3));
        assert!(report.is_exclusive());
    }

    #[test]
    fn foreign_collections_are_reported() {
        let server = MemoryIndex::default()
            .with("expB___wiki", 10)
            .with("expA___wiki", 1);
        let report = verify_index(&server, "expA___wiki").unwrap();
        assert!(!report.is_exclusive());
        assert_eq!(report.foreign().collect::<Vec<_>>(), vec!["expB___wiki"]);
    }

    #[test]
    fn missing_collection_on_empty_server() {
        let server = MemoryIndex::default();
        let report = verify_index(&server, "expA___wiki").unwrap();
        assert!(!report.is_present());
        assert!(report.is_exclusive());
    }

    #[test]
    fn prepare_deletes_only_when_asked() {
        let server = MemoryIndex::default().with("expA___wiki", 2);
        assert!(!prepare_index(&server, "expA___wiki", false).unwrap());
        assert_eq!(server.list_collections().unwrap().len(), 1);

        assert!(prepare_index(&server, "expA___wiki", true).unwrap());
        assert!(server.list_collections().unwrap().is_empty());
        assert!(!prepare_index(&server, "expA___wiki", true).unwrap());
    }
}
