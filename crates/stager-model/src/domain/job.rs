use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{DependencyChain, ExperimentName, JobEnv, MountSet, Stage};

/// Scheduling priority of a cluster job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    #[default]
    Normal,
    /// May be evicted by higher-priority work.
    Preemptible,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::Preemptible => "preemptible",
        }
    }
}

/// Compute resources requested for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceShape {
    pub gpu_count: u32,
    pub cpu_count: u32,
    /// Memory request in scheduler notation, e.g. `"16GiB"`.
    pub memory: String,
    /// Number of identical replicas.
    pub parallel_run_count: u32,
}

impl ResourceShape {
    /// Default shape for a stage: indexing embeds on four GPUs, everything else on one.
    pub fn for_stage(stage: Stage) -> Self {
        Self {
            gpu_count: if stage == Stage::Index { 4 } else { 1 },
            cpu_count: 15,
            memory: "16GiB".to_string(),
            parallel_run_count: 1,
        }
    }
}

/// Where a job writes its results, locally and inside the cluster container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDirs {
    pub local: PathBuf,
    pub cluster: PathBuf,
}

/// Complete description of one job handed to the cluster scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    /// Length-bounded job name.
    pub name: String,
    pub stage: Stage,
    pub experiment: ExperimentName,
    /// Shell command run inside the container.
    pub command: String,
    /// Upstream experiments whose artifacts are mounted.
    #[serde(default, skip_serializing_if = "DependencyChain::is_empty")]
    pub dependencies: DependencyChain,
    pub mounts: MountSet,
    pub env: JobEnv,
    pub resources: ResourceShape,
    pub priority: Priority,
    pub cluster: String,
    pub dockerfile: PathBuf,
    pub output: OutputDirs,
}
