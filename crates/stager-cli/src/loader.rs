use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use stager_core::{ConfigLoader, LoadError};
use stager_model::{ConfigTree, ExperimentName};
use tracing::debug;

/// Reads `<dir>/<experiment>.json`.
#[derive(Debug, Clone)]
pub struct FsConfigLoader {
    dir: PathBuf,
}

impl FsConfigLoader {
    pub const EXTENSION: &'static str = "json";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ConfigLoader for FsConfigLoader {
    fn load(&self, experiment: &ExperimentName) -> Result<ConfigTree, LoadError> {
        let path = self.locate(experiment);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LoadError::NotFound {
                    experiment: experiment.clone(),
                    path,
                });
            }
            Err(e) => {
                return Err(LoadError::Unreadable {
                    experiment: experiment.clone(),
                    reason: format!("{}: {e}", path.display()),
                });
            }
        };

        let tree: ConfigTree = serde_json::from_str(&raw).map_err(|e| LoadError::Unreadable {
            experiment: experiment.clone(),
            reason: format!("{}: {e}", path.display()),
        })?;
        if !tree.is_object() {
            return Err(LoadError::Unreadable {
                experiment: experiment.clone(),
                reason: format!("{}: top level is not an object", path.display()),
            });
        }

        debug!(target: "stager.cli.loader", experiment = %experiment, path = %path.display(), "config loaded");
        Ok(tree)
    }

    fn locate(&self, experiment: &ExperimentName) -> PathBuf {
        self.dir
            .join(format!("{}.{}", experiment.as_str(), Self::EXTENSION))
    }
}
