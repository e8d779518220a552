use stager_core::{
    ConfigLoader, ConfigMaterializer, CoreError, DependencyResolver, JobRequest, JobScheduler,
    StageOptions,
};
use stager_model::{ExperimentName, Infrastructure, Stage};
use tracing::{info, instrument};

use crate::{loader::FsConfigLoader, scheduler::SpecFileScheduler, settings::Settings};

/// Resolves, materializes and submits one stage of an experiment.
pub struct StageDriver {
    loader: FsConfigLoader,
    materializer: ConfigMaterializer,
    scheduler: SpecFileScheduler,
}

impl StageDriver {
    pub fn new(settings: &Settings, infra: Infrastructure, dry_run: bool) -> Self {
        Self {
            loader: FsConfigLoader::new(&settings.config_dir),
            materializer: ConfigMaterializer::new(infra).with_layout(settings.layout()),
            scheduler: SpecFileScheduler::new(&settings.job_spec_dir).dry_run(dry_run),
        }
    }

    pub fn materializer(&self) -> &ConfigMaterializer {
        &self.materializer
    }

    /// Returns the scheduler's handle for the submitted job.
    #[instrument(level = "debug", skip(self, experiment, extra_mounts, options), fields(experiment = %experiment))]
    pub fn submit(
        &self,
        stage: Stage,
        experiment: &ExperimentName,
        extra_mounts: &[String],
        options: &StageOptions,
    ) -> Result<String, CoreError> {
        let (config, chain) = DependencyResolver::new(&self.loader).resolve_named(experiment)?;
        if !chain.is_empty() {
            info!(
                target: "stager.cli.driver",
                upstreams = ?chain.iter().map(ExperimentName::as_str).collect::<Vec<_>>(),
                "upstream experiments resolved"
            );
        }

        let config_path = self.loader.locate(experiment);
        let request = JobRequest {
            stage,
            experiment,
            chain: &chain,
            config: &config,
            config_path: &config_path,
            extra_mounts,
            options,
        };
        let spec = self.materializer.build_job_spec(&request)?;
        Ok(self.scheduler.submit(&spec)?)
    }
}
