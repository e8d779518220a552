use crate::error::CoreError;

/// Legacy dataset location that is renamed before slugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRewrite {
    pub pattern: String,
    pub replacement: String,
}

impl PathRewrite {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Turns dataset file paths into name fragments.
///
/// Steps, in order:
/// 1. drop the file extension;
/// 2. apply the first matching [`PathRewrite`] (legacy aliases);
/// 3. strip the first matching data-root prefix;
/// 4. replace path separators with `__`.
///
/// The rewrite and root tables are data: new aliases are appended, not coded.
#[derive(Debug, Clone)]
pub struct DatasetSlugger {
    rewrites: Vec<PathRewrite>,
    roots: Vec<String>,
}

impl DatasetSlugger {
    /// Slugger with no rewrites and no roots.
    pub fn empty() -> Self {
        Self {
            rewrites: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Append a legacy alias. Earlier entries take priority.
    pub fn with_rewrite(mut self, rewrite: PathRewrite) -> Self {
        self.rewrites.push(rewrite);
        self
    }

    /// Append a data-root prefix. Earlier entries take priority.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        let mut root = root.into();
        if !root.ends_with('/') {
            root.push('/');
        }
        self.roots.push(root);
        self
    }

    pub fn rewrites(&self) -> &[PathRewrite] {
        &self.rewrites
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn slug(&self, dataset_path: &str) -> Result<String, CoreError> {
        let trimmed = dataset_path.trim();
        let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(CoreError::InvalidInput("dataset path is empty".into()));
        }

        let mut path = strip_extension(trimmed).to_string();

        if let Some(rw) = self
            .rewrites
            .iter()
            .find(|rw| !rw.pattern.is_empty() && path.contains(rw.pattern.as_str()))
        {
            path = path.replacen(rw.pattern.as_str(), &rw.replacement, 1);
        }

        let stripped = self
            .roots
            .iter()
            .find_map(|root| path.strip_prefix(root.as_str()))
            .unwrap_or(path.as_str())
            .trim_matches('/');

        if stripped.is_empty() {
            return Err(CoreError::InvalidInput(format!(
                "dataset path `{dataset_path}` has nothing left after stripping its data root"
            )));
        }
        Ok(stripped.replace('/', "__"))
    }
}

impl Default for DatasetSlugger {
    /// The historical data layout: `processed_datasets/` superseded `processed_data/`,
    /// and the NatCQ wikipedia dump once lived outside both.
    fn default() -> Self {
        Self::empty()
            .with_rewrite(PathRewrite::new(
                "combined_cleaned_wikipedia_for_dpr",
                "processed_datasets/natcq",
            ))
            .with_root("processed_datasets")
            .with_root("processed_data")
    }
}

/// Drop the extension of the last path component; dotfiles keep their name.
fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..name_start + dot],
        _ => path,
    }
}
