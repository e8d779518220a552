//! Assembly of the job specification handed to the cluster scheduler.
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use stager_model::{
    ConfigTree, DependencyChain, ExperimentName, FlattenedConfig, IndexType, Infrastructure, JobEnv,
    JobSpec, MountSet, OutputDirs, Priority, ResourceShape, Stage,
};
use tracing::{debug, info, instrument};

use crate::{
    error::CoreError,
    naming::{DatasetSlugger, IdentifierCodec, SEPARATOR},
};

mod flatten;
pub use flatten::{env_key, flatten};

/// Always `true` inside a cluster job.
pub const IS_ON_CLUSTER: &str = "IS_ON_CLUSTER";
/// The job's own name.
pub const RUN_NAME: &str = "RUN_NAME";

const DEFAULT_DRIVER_ROOT: &str = ".";
const RETRIEVAL_RESULTS_DIR: &str = "retrieval_results";

/// Filesystem conventions shared by all stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Root of per-experiment training outputs.
    pub serialization_dir: PathBuf,
    /// Result directory inside the cluster container.
    pub cluster_output_dir: PathBuf,
    pub dockerfile: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            serialization_dir: PathBuf::from("serialization_dir"),
            cluster_output_dir: PathBuf::from("/run/output"),
            dockerfile: PathBuf::from("dockerfiles").join("dpr.dockerfile"),
        }
    }
}

/// Per-invocation knobs of a stage driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOptions {
    pub cluster: String,
    pub priority: Priority,
    /// Input of the predict stage; defaults to the config's dev split.
    pub prediction_input: Option<String>,
    /// Drop an existing collection before indexing.
    pub delete_if_exists: bool,
    pub batch_size: Option<u32>,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            cluster: "default".to_string(),
            priority: Priority::Normal,
            prediction_input: None,
            delete_if_exists: false,
            batch_size: None,
        }
    }
}

/// Everything needed to build one stage's job.
#[derive(Debug, Clone, Copy)]
pub struct JobRequest<'a> {
    pub stage: Stage,
    pub experiment: &'a ExperimentName,
    pub chain: &'a DependencyChain,
    pub config: &'a ConfigTree,
    /// Location of `experiment`'s own config, mounted into the job.
    pub config_path: &'a Path,
    pub extra_mounts: &'a [String],
    pub options: &'a StageOptions,
}

pub struct ConfigMaterializer {
    infra: Infrastructure,
    layout: Layout,
    slugger: DatasetSlugger,
}

impl ConfigMaterializer {
    pub fn new(infra: Infrastructure) -> Self {
        Self {
            infra,
            layout: Layout::default(),
            slugger: DatasetSlugger::default(),
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_slugger(mut self, slugger: DatasetSlugger) -> Self {
        self.slugger = slugger;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn slugger(&self) -> &DatasetSlugger {
        &self.slugger
    }

    pub fn flatten(config: &ConfigTree) -> Result<FlattenedConfig, CoreError> {
        flatten(config)
    }

    #[instrument(level = "debug", skip(self, req), fields(stage = %req.stage, experiment = %req.experiment))]
    pub fn build_job_spec(&self, req: &JobRequest<'_>) -> Result<JobSpec, CoreError> {
        let experiment = req.experiment;
        let config = req.config;

        let input = self.stage_input(req)?;
        if req.stage.needs_trained_model() {
            self.index_type(experiment, config)?;
        }
        if req.stage == Stage::Index {
            self.index_num_chunks(experiment, config)?;
        }
        let slug = input.as_deref().map(|p| self.slugger.slug(p)).transpose()?;
        let name = IdentifierCodec::job_name(req.stage, experiment, slug.as_deref())?;

        let mut mounts = MountSet::new();
        mounts.extend(req.extra_mounts.iter().map(String::as_str));
        mounts.insert(req.config_path.to_string_lossy());
        match req.stage {
            Stage::Train => {
                let data_dir = str_field(experiment, config, "data_dir")?.unwrap_or_default();
                for key in ["train_filename", "dev_filename"] {
                    if let Some(path) = data_path(data_dir, str_field(experiment, config, key)?) {
                        mounts.insert(path);
                    }
                }
            }
            Stage::Index | Stage::Predict => {
                if let Some(input) = &input {
                    mounts.insert(input.as_str());
                }
            }
        }
        for upstream in req.chain {
            mounts.insert(IdentifierCodec::upstream_mount(upstream)?);
        }
        if req.stage.needs_trained_model() && !bool_field(experiment, config, "dont_train")? {
            mounts.insert(IdentifierCodec::upstream_mount(experiment)?);
        }

        let mut env = config_env(experiment, config)?;
        env.push(IS_ON_CLUSTER, "true");
        env.push(RUN_NAME, name.as_str());
        let env = env.merged(&self.infra.env(&name)).compacted();

        let driver_root =
            str_field(experiment, config, "driver_root")?.unwrap_or(DEFAULT_DRIVER_ROOT);
        let output = self.output_dirs(req.stage, experiment);
        let command = stage_command(req, driver_root, input.as_deref(), &output);

        let spec = JobSpec {
            name,
            stage: req.stage,
            experiment: experiment.clone(),
            command,
            dependencies: req.chain.clone(),
            mounts,
            env,
            resources: ResourceShape::for_stage(req.stage),
            priority: req.options.priority,
            cluster: req.options.cluster.clone(),
            dockerfile: self.layout.dockerfile.clone(),
            output,
        };
        info!(
            target: "stager.core.materialize",
            job = %spec.name,
            mounts = spec.mounts.len(),
            env = spec.env.len(),
            upstreams = spec.dependencies.len(),
            "job spec assembled"
        );
        Ok(spec)
    }

    /// Collection name for `experiment`'s configured index dataset.
    pub fn index_name(
        &self,
        experiment: &ExperimentName,
        config: &ConfigTree,
    ) -> Result<String, CoreError> {
        let data = required_str(experiment, config, "index_data_path")?;
        IdentifierCodec::index_name(experiment, &self.slugger.slug(data)?)
    }

    /// Configured vector index layout; `None` leaves the choice to the index server.
    pub fn index_type(
        &self,
        experiment: &ExperimentName,
        config: &ConfigTree,
    ) -> Result<Option<IndexType>, CoreError> {
        Ok(str_field(experiment, config, "index_type")?
            .map(str::parse::<IndexType>)
            .transpose()?)
    }

    /// Number of slices the index stage streams its dataset in.
    pub fn index_num_chunks(
        &self,
        experiment: &ExperimentName,
        config: &ConfigTree,
    ) -> Result<usize, CoreError> {
        match config.get("index_num_chunks") {
            None | Some(serde_json::Value::Null) => Ok(1),
            Some(value) => value
                .as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    CoreError::InvalidInput(format!(
                        "experiment `{experiment}`: `index_num_chunks` must be a positive integer, got {value}"
                    ))
                }),
        }
    }

    /// Where the predict stage writes the top-`top_k` retrievals for `prediction_input`.
    pub fn prediction_output_path(
        &self,
        experiment: &ExperimentName,
        config: &ConfigTree,
        prediction_input: &str,
        top_k: usize,
    ) -> Result<PathBuf, CoreError> {
        let index_name = self.index_name(experiment, config)?;
        let prediction = self.slugger.slug(prediction_input)?;
        let file = format!("{index_name}{SEPARATOR}{prediction}__{top_k}_docs.jsonl");
        Ok(self
            .layout
            .serialization_dir
            .join(experiment.as_str())
            .join(RETRIEVAL_RESULTS_DIR)
            .join(file))
    }

    /// Dataset that keys the job: index data for index, prediction input for predict.
    fn stage_input(&self, req: &JobRequest<'_>) -> Result<Option<String>, CoreError> {
        let experiment = req.experiment;
        match req.stage {
            Stage::Train => Ok(None),
            Stage::Index => {
                required_str(experiment, req.config, "index_data_path").map(|p| Some(p.to_string()))
            }
            Stage::Predict => {
                if let Some(input) = req.options.prediction_input.as_deref()
                    && !input.trim().is_empty()
                {
                    return Ok(Some(input.to_string()));
                }
                let dev = self.dev_split(experiment, req.config)?;
                debug!(
                    target: "stager.core.materialize",
                    input = %dev,
                    "no prediction input given; using the dev split"
                );
                Ok(Some(dev))
            }
        }
    }

    /// `data_dir/dev_filename` of `config`, the fallback prediction input.
    pub fn dev_split(&self, experiment: &ExperimentName, config: &ConfigTree) -> Result<String, CoreError> {
        let data_dir = str_field(experiment, config, "data_dir")?.unwrap_or_default();
        data_path(data_dir, str_field(experiment, config, "dev_filename")?).ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "experiment `{experiment}`: no prediction input given and no `dev_filename` to fall back to"
            ))
        })
    }

    fn output_dirs(&self, stage: Stage, experiment: &ExperimentName) -> OutputDirs {
        let own = self.layout.serialization_dir.join(experiment.as_str());
        match stage {
            Stage::Train => OutputDirs {
                local: own.clone(),
                cluster: own,
            },
            Stage::Index => OutputDirs {
                local: own,
                cluster: self.layout.cluster_output_dir.clone(),
            },
            Stage::Predict => OutputDirs {
                local: own.join(RETRIEVAL_RESULTS_DIR),
                cluster: self.layout.cluster_output_dir.clone(),
            },
        }
    }
}

fn stage_command(
    req: &JobRequest<'_>,
    driver_root: &str,
    input: Option<&str>,
    output: &OutputDirs,
) -> String {
    let experiment = req.experiment;
    match req.stage {
        Stage::Train => format!("python {driver_root}/train_dpr.py {experiment} --force"),
        Stage::Index => {
            let mut cmd = format!("python {driver_root}/index_dpr.py {experiment}");
            if req.options.delete_if_exists {
                cmd.push_str(" --delete_if_exists");
            }
            cmd
        }
        Stage::Predict => {
            let mut cmd = format!(
                "python {driver_root}/predict_dpr.py {experiment} {} --output_directory {}",
                input.unwrap_or_default(),
                output.cluster.display()
            );
            if let Some(batch_size) = req.options.batch_size {
                cmd.push_str(&format!(" --batch_size {batch_size}"));
            }
            cmd
        }
    }
}

/// Config-derived variables; two keys that map to the same variable name are rejected.
fn config_env(experiment: &ExperimentName, config: &ConfigTree) -> Result<JobEnv, CoreError> {
    let flat = flatten(config)?;
    let mut env = JobEnv::new();
    let mut origin: HashMap<String, &str> = HashMap::new();
    for kv in flat.iter() {
        let name = env_key(kv.key());
        if let Some(first) = origin.insert(name.clone(), kv.key()) {
            return Err(CoreError::InvalidInput(format!(
                "experiment `{experiment}`: config keys `{first}` and `{}` both map to environment variable `{name}`",
                kv.key()
            )));
        }
        env.push(name, kv.value());
    }
    Ok(env)
}

fn data_path(data_dir: &str, filename: Option<&str>) -> Option<String> {
    let filename = filename.map(str::trim).filter(|f| !f.is_empty())?;
    if data_dir.trim().is_empty() {
        Some(filename.to_string())
    } else {
        Some(Path::new(data_dir).join(filename).to_string_lossy().into_owned())
    }
}

fn str_field<'c>(
    experiment: &ExperimentName,
    config: &'c ConfigTree,
    key: &str,
) -> Result<Option<&'c str>, CoreError> {
    match config.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(CoreError::InvalidInput(format!(
            "experiment `{experiment}`: `{key}` must be a string, got {other}"
        ))),
    }
}

fn required_str<'c>(
    experiment: &ExperimentName,
    config: &'c ConfigTree,
    key: &str,
) -> Result<&'c str, CoreError> {
    str_field(experiment, config, key)?
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| CoreError::InvalidInput(format!("experiment `{experiment}` has no `{key}`")))
}

fn bool_field(
    experiment: &ExperimentName,
    config: &ConfigTree,
    key: &str,
) -> Result<bool, CoreError> {
    match config.get(key) {
        None | Some(serde_json::Value::Null) => Ok(false),
        Some(serde_json::Value::Bool(b)) => Ok(*b),
        Some(other) => Err(CoreError::InvalidInput(format!(
            "experiment `{experiment}`: `{key}` must be a bool, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stager_model::{Infrastructure, ModelError};

    use super::*;

    fn exp(s: &str) -> ExperimentName {
        ExperimentName::new(s).unwrap()
    }

    fn infra() -> Infrastructure {
        Infrastructure {
            postgresql_address: "pg:5432".into(),
            milvus_address: "milvus:19530".into(),
            postgresql_data_directory: "/data/pg".into(),
            milvus_data_directory: "/data/milvus".into(),
            tracking: None,
        }
    }

    fn config() -> ConfigTree {
        json!({
            "query_model": "serialization_dir/base/query_encoder",
            "passage_model": "serialization_dir/base/passage_encoder",
            "data_dir": "processed_datasets/nq",
            "train_filename": "train.jsonl",
            "dev_filename": "dev.jsonl",
            "index_data_path": "processed_datasets/wiki/passages.jsonl",
            "index_type": "HNSW",
            "trainer": { "lr": 2e-5, "epochs": 3 },
            "MILVUS_SERVER_ADDRESS": "stale:1",
        })
    }

    fn chain(names: &[&str]) -> DependencyChain {
        DependencyChain::try_from(names.iter().map(|n| exp(n)).collect::<Vec<_>>()).unwrap()
    }

    fn build(stage: Stage, config: &ConfigTree, options: &StageOptions) -> Result<JobSpec, CoreError> {
        let e = exp("expB");
        let deps = chain(&["base"]);
        let extra = vec!["extra/vocab.txt".to_string(), "".to_string()];
        ConfigMaterializer::new(infra()).build_job_spec(&JobRequest {
            stage,
            experiment: &e,
            chain: &deps,
            config,
            config_path: Path::new("experiment_configs/expB.json"),
            extra_mounts: &extra,
            options,
        })
    }

    #[test]
    fn train_spec_mounts_splits_and_upstream() {
        let spec = build(Stage::Train, &config(), &StageOptions::default()).unwrap();
        assert_eq!(spec.name, "train___expB");
        assert_eq!(
            spec.mounts.iter().collect::<Vec<_>>(),
            vec![
                "extra/vocab.txt",
                "experiment_configs/expB.json",
                "processed_datasets/nq/train.jsonl",
                "processed_datasets/nq/dev.jsonl",
                "result_of_train___base",
            ]
        );
        assert_eq!(spec.command, "python ./train_dpr.py expB --force");
        assert_eq!(spec.resources.gpu_count, 1);
        assert_eq!(spec.output.local, PathBuf::from("serialization_dir/expB"));
        assert_eq!(spec.output.local, spec.output.cluster);
    }

    #[test]
    fn index_spec_is_keyed_by_dataset_and_mounts_own_training() {
        let options = StageOptions {
            delete_if_exists: true,
            ..Default::default()
        };
        let spec = build(Stage::Index, &config(), &options).unwrap();
        assert_eq!(spec.name, "index___expB___wiki__passages");
        assert!(spec.mounts.contains("processed_datasets/wiki/passages.jsonl"));
        assert!(spec.mounts.contains("result_of_train___base"));
        assert!(spec.mounts.contains("result_of_train___expB"));
        assert!(!spec.mounts.contains("processed_datasets/nq/train.jsonl"));
        assert_eq!(spec.command, "python ./index_dpr.py expB --delete_if_exists");
        assert_eq!(spec.resources.gpu_count, 4);
        assert_eq!(spec.output.cluster, PathBuf::from("/run/output"));
    }

    #[test]
    fn index_spec_requires_index_data() {
        let mut cfg = config();
        cfg.as_object_mut().unwrap().remove("index_data_path");
        let err = build(Stage::Index, &cfg, &StageOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn unknown_index_type_is_rejected_before_submission() {
        let mut cfg = config();
        cfg["index_type"] = json!("IVF_PQ");
        let err = build(Stage::Index, &cfg, &StageOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Model(ModelError::UnknownIndexType(_))));
        assert!(build(Stage::Train, &cfg, &StageOptions::default()).is_ok());
    }

    #[test]
    fn index_settings_have_defaults() {
        let m = ConfigMaterializer::new(infra());
        let e = exp("expB");
        let mut cfg = config();
        assert_eq!(m.index_type(&e, &cfg).unwrap(), Some(IndexType::Hnsw));
        assert_eq!(m.index_num_chunks(&e, &cfg).unwrap(), 1);

        cfg["index_num_chunks"] = json!(4);
        assert_eq!(m.index_num_chunks(&e, &cfg).unwrap(), 4);
        cfg["index_num_chunks"] = json!(0);
        assert!(build(Stage::Index, &cfg, &StageOptions::default()).is_err());

        cfg.as_object_mut().unwrap().remove("index_type");
        assert_eq!(m.index_type(&e, &cfg).unwrap(), None);
    }

    #[test]
    fn keys_colliding_as_env_names_are_rejected() {
        let mut cfg = config();
        cfg["trainer__lr"] = json!("1e-4");
        let err = build(Stage::Train, &cfg, &StageOptions::default()).unwrap_err();
        match err {
            CoreError::InvalidInput(msg) => {
                assert!(msg.contains("`trainer.lr`"));
                assert!(msg.contains("`trainer__lr`"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dont_train_skips_own_training_mount() {
        let mut cfg = config();
        cfg["dont_train"] = json!(true);
        let spec = build(Stage::Index, &cfg, &StageOptions::default()).unwrap();
        assert!(!spec.mounts.contains("result_of_train___expB"));
    }

    #[test]
    fn predict_defaults_to_dev_split() {
        let options = StageOptions {
            batch_size: Some(256),
            ..Default::default()
        };
        let spec = build(Stage::Predict, &config(), &options).unwrap();
        assert_eq!(spec.name, "predict___expB___nq__dev");
        assert!(spec.mounts.contains("processed_datasets/nq/dev.jsonl"));
        assert_eq!(
            spec.command,
            "python ./predict_dpr.py expB processed_datasets/nq/dev.jsonl --output_directory /run/output --batch_size 256"
        );
        assert_eq!(
            spec.output.local,
            PathBuf::from("serialization_dir/expB/retrieval_results")
        );
    }

    #[test]
    fn predict_uses_given_input() {
        let options = StageOptions {
            prediction_input: Some("processed_data/squad/test.jsonl".into()),
            ..Default::default()
        };
        let spec = build(Stage::Predict, &config(), &options).unwrap();
        assert_eq!(spec.name, "predict___expB___squad__test");
        assert!(spec.mounts.contains("processed_data/squad/test.jsonl"));
    }

    #[test]
    fn env_from_config_with_infrastructure_last() {
        let spec = build(Stage::Train, &config(), &StageOptions::default()).unwrap();
        assert_eq!(spec.env.get("trainer__epochs"), Some("3"));
        assert_eq!(spec.env.get("data_dir"), Some("processed_datasets/nq"));
        assert_eq!(spec.env.get(Infrastructure::MILVUS_SERVER_ADDRESS), Some("milvus:19530"));
        assert_eq!(spec.env.get(IS_ON_CLUSTER), Some("true"));
        assert_eq!(spec.env.get(RUN_NAME), Some("train___expB"));

        let keys: Vec<_> = spec.env.iter().map(|kv| kv.key()).collect();
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(keys.len(), unique.len());
    }

    #[test]
    fn build_is_deterministic() {
        let a = build(Stage::Index, &config(), &StageOptions::default()).unwrap();
        let b = build(Stage::Index, &config(), &StageOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn driver_root_comes_from_config() {
        let mut cfg = config();
        cfg["driver_root"] = json!("/opt/dpr");
        let spec = build(Stage::Train, &cfg, &StageOptions::default()).unwrap();
        assert_eq!(spec.command, "python /opt/dpr/train_dpr.py expB --force");
    }

    #[test]
    fn prediction_output_path_joins_index_and_input() {
        let m = ConfigMaterializer::new(infra());
        let path = m
            .prediction_output_path(&exp("expB"), &config(), "processed_data/nq/dev.jsonl", 20)
            .unwrap();
        assert_eq!(
            path,
            PathBuf::from(
                "serialization_dir/expB/retrieval_results/expB___wiki__passages___nq__dev__20_docs.jsonl"
            )
        );
    }
}
