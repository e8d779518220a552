use serde::{Deserialize, Serialize};

use crate::KeyValue;

/// Environment variables handed to a cluster job.
///
/// Stored as an ordered list of key–value pairs and serialized as a transparent array.
/// Later entries override earlier ones with the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobEnv(pub Vec<KeyValue>);

impl JobEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Create an environment containing a single key–value pair.
    pub fn single<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(vec![KeyValue::new(key, value)])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    /// Get the value for a key, returning the last matching entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|kv| kv.key() == key)
            .map(|kv| kv.value())
    }

    /// Append a key–value pair.
    ///
    /// Later entries override earlier ones when queried via [`JobEnv::get`].
    pub fn push<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.push(KeyValue::new(key, value));
    }

    /// Concatenate two environments; entries from `other` win.
    pub fn merged(&self, other: &JobEnv) -> JobEnv {
        let mut out = self.0.clone();
        out.extend(other.0.clone());
        JobEnv(out)
    }

    /// Collapse overridden entries.
    ///
    /// Each key keeps the position of its first occurrence and the value of its last one,
    /// so the result is stable for a given input and free of shadowed duplicates.
    pub fn compacted(&self) -> JobEnv {
        let mut out: Vec<KeyValue> = Vec::with_capacity(self.0.len());
        for kv in &self.0 {
            match out.iter_mut().find(|seen| seen.key() == kv.key()) {
                Some(seen) => *seen = kv.clone(),
                None => out.push(kv.clone()),
            }
        }
        JobEnv(out)
    }
}

impl Default for JobEnv {
    fn default() -> Self {
        Self::new()
    }
}
