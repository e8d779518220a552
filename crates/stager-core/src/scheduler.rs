use stager_model::JobSpec;

use crate::error::SchedulerError;

/// Cluster job scheduler: owns submission, retries and placement.
pub trait JobScheduler {
    /// Submit `spec`, returning a scheduler-specific handle for the job.
    fn submit(&self, spec: &JobSpec) -> Result<String, SchedulerError>;
}
