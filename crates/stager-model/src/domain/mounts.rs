use serde::{Deserialize, Serialize};

/// Ordered, duplicate-free set of paths to mount into a job.
///
/// Blank entries are dropped on insert and duplicates keep their first position,
/// so the rendered list is stable for a given sequence of inserts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountSet(Vec<String>);

impl MountSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a path; returns `false` if it was blank or already present.
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        let path = path.trim();
        if path.is_empty() || self.contains(path) {
            return false;
        }
        self.0.push(path.to_string());
        true
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> Extend<S> for MountSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for path in iter {
            self.insert(path);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for MountSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::MountSet;

    #[test]
    fn drops_blank_and_duplicate_entries() {
        let set: MountSet = ["a.json", "", "  ", "b.jsonl", "a.json", " b.jsonl "]
            .into_iter()
            .collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["a.json", "b.jsonl"]);
    }
}
