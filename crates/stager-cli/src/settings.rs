use std::path::PathBuf;

use anyhow::{Context, Result};
use stager_core::Layout;
use stager_model::{Infrastructure, Tracking};
use tracing::warn;

/// Process-level filesystem settings of the stage drivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub config_dir: PathBuf,
    pub serialization_dir: PathBuf,
    pub job_spec_dir: PathBuf,
    pub dockerfile: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("experiment_configs"),
            serialization_dir: PathBuf::from("serialization_dir"),
            job_spec_dir: PathBuf::from("job_specs"),
            dockerfile: PathBuf::from("dockerfiles").join("dpr.dockerfile"),
        }
    }
}

impl Settings {
    pub fn layout(&self) -> Layout {
        Layout {
            serialization_dir: self.serialization_dir.clone(),
            dockerfile: self.dockerfile.clone(),
            ..Layout::default()
        }
    }
}

/// Read the shared service locations from the process environment.
pub fn infrastructure_from_env() -> Result<Infrastructure> {
    infrastructure_from(|key| std::env::var(key).ok())
}

pub(crate) fn infrastructure_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Infrastructure> {
    let required = |key: &str| {
        lookup(key)
            .filter(|v| !v.trim().is_empty())
            .with_context(|| format!("environment variable {key} is not set"))
    };

    let infra = Infrastructure {
        postgresql_address: required(Infrastructure::POSTGRESQL_SERVER_ADDRESS)?,
        milvus_address: required(Infrastructure::MILVUS_SERVER_ADDRESS)?,
        postgresql_data_directory: required(Infrastructure::POSTGRESQL_DATA_DIRECTORY)?,
        milvus_data_directory: required(Infrastructure::MILVUS_DATA_DIRECTORY)?,
        tracking: tracking_from(&lookup),
    };
    Ok(infra)
}

fn tracking_from(lookup: &impl Fn(&str) -> Option<String>) -> Option<Tracking> {
    let api_key = lookup(Infrastructure::WANDB_API_KEY).filter(|v| !v.is_empty());
    let project = lookup(Infrastructure::WANDB_PROJECT).filter(|v| !v.is_empty());
    match (api_key, project) {
        (Some(api_key), Some(project)) => Some(Tracking { api_key, project }),
        (api_key, project) => {
            warn!(
                target: "stager.cli.settings",
                api_key = api_key.is_some(),
                project = project.is_some(),
                "experiment tracking is not configured; jobs will run without it"
            );
            None
        }
    }
}
