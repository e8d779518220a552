use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use stager_core::{JobScheduler, SchedulerError};
use stager_model::JobSpec;
use tracing::info;

/// Hands jobs over as spec files: `<dir>/<job name>.json`, or stdout on a dry run.
#[derive(Debug, Clone)]
pub struct SpecFileScheduler {
    dir: PathBuf,
    dry_run: bool,
}

impl SpecFileScheduler {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn render(spec: &JobSpec) -> Result<String, SchedulerError> {
        serde_json::to_string_pretty(spec).map_err(|e| SchedulerError::Rejected {
            name: spec.name.clone(),
            reason: e.to_string(),
        })
    }
}

impl JobScheduler for SpecFileScheduler {
    fn submit(&self, spec: &JobSpec) -> Result<String, SchedulerError> {
        let rendered = Self::render(spec)?;

        if self.dry_run {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{rendered}")?;
            info!(target: "stager.cli.scheduler", job = %spec.name, "dry run; spec printed");
            return Ok(spec.name.clone());
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", spec.name));
        fs::write(&path, rendered + "\n")?;
        info!(
            target: "stager.cli.scheduler",
            job = %spec.name,
            path = %path.display(),
            "job spec written"
        );
        Ok(path.display().to_string())
    }
}
