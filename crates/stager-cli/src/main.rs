mod driver;
mod loader;
mod scheduler;
mod settings;

use std::{
    io::{BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use stager_core::{ConfigLoader, DatasetSlugger, IdentifierCodec, naming::JOB_NAME_LIMIT};
use stager_exec::StreamPartitioner;
use stager_model::{ExperimentName, Priority, Stage};
use stager_observe::{LoggerConfig, logger_init};

use crate::{driver::StageDriver, loader::FsConfigLoader, settings::Settings};

#[derive(Debug, Parser)]
#[command(name = "stager", version, about = "Stage train / index / predict jobs of retrieval experiments")]
struct Cli {
    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct PathArgs {
    /// Directory holding `<experiment>.json` configs.
    #[arg(long, global = true, env = "STAGER_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[arg(long, global = true, env = "STAGER_SERIALIZATION_DIR")]
    serialization_dir: Option<PathBuf>,

    /// Where submitted job specs are written.
    #[arg(long, global = true, env = "STAGER_JOB_SPEC_DIR")]
    job_spec_dir: Option<PathBuf>,

    #[arg(long, global = true, env = "STAGER_DOCKERFILE")]
    dockerfile: Option<PathBuf>,
}

impl PathArgs {
    fn settings(self) -> Settings {
        let defaults = Settings::default();
        Settings {
            config_dir: self.config_dir.unwrap_or(defaults.config_dir),
            serialization_dir: self.serialization_dir.unwrap_or(defaults.serialization_dir),
            job_spec_dir: self.job_spec_dir.unwrap_or(defaults.job_spec_dir),
            dockerfile: self.dockerfile.unwrap_or(defaults.dockerfile),
        }
    }
}

/// Flags shared by the three stage drivers.
#[derive(Debug, Args)]
struct StageArgs {
    experiment: ExperimentName,

    /// Extra path to mount into the job; repeatable.
    #[arg(long = "data-mount")]
    data_mounts: Vec<String>,

    #[arg(long, default_value = "default")]
    cluster: String,

    #[arg(long)]
    preemptible: bool,

    /// Print the job spec instead of writing it.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit the training job of an experiment.
    Train(StageArgs),

    /// Submit the indexing job of an experiment.
    Index {
        #[command(flatten)]
        stage: StageArgs,

        /// Drop an existing collection first.
        #[arg(long)]
        delete_if_exists: bool,
    },

    /// Submit the prediction job of an experiment.
    Predict {
        #[command(flatten)]
        stage: StageArgs,

        /// Dataset to predict on; defaults to the config's dev split.
        prediction_path: Option<String>,

        #[arg(long, default_value_t = 256)]
        batch_size: u32,
    },

    /// Print one slice of a line-delimited JSON file.
    Slice {
        path: PathBuf,

        #[arg(long, default_value_t = 1)]
        num_slices: usize,

        #[arg(long, default_value_t = 0)]
        slice_index: usize,
    },

    /// Count the physical lines of a file.
    Count { path: PathBuf },

    /// Build a bounded identifier from parts.
    Name {
        #[arg(required = true)]
        parts: Vec<String>,

        #[arg(long, default_value_t = JOB_NAME_LIMIT)]
        max_length: usize,
    },

    /// Print the slug of a dataset path.
    Slug { path: String },

    /// Print the index collection name of an experiment.
    IndexName { experiment: ExperimentName },

    /// Print where a prediction run writes its retrievals.
    PredictionPath {
        experiment: ExperimentName,

        prediction_path: Option<String>,

        #[arg(long, default_value_t = 20)]
        top_k: usize,
    },
}

fn main() -> Result<()> {
    let cfg = LoggerConfig::from_env().context("logger configuration")?;
    logger_init(&cfg).context("logger initialization")?;

    let cli = Cli::parse();
    let settings = cli.paths.settings();
    run(cli.command, &settings)
}

fn run(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Train(args) => submit(Stage::Train, args, settings, |_| {}),
        Command::Index { stage, delete_if_exists } => submit(Stage::Index, stage, settings, |o| {
            o.delete_if_exists = delete_if_exists;
        }),
        Command::Predict { stage, prediction_path, batch_size } => {
            submit(Stage::Predict, stage, settings, |o| {
                o.prediction_input = prediction_path;
                o.batch_size = Some(batch_size);
            })
        }
        Command::Slice { path, num_slices, slice_index } => {
            let slice = StreamPartitioner::new()
                .slice(&path, num_slices, slice_index)
                .with_context(|| format!("slicing {}", path.display()))?;
            let mut out = BufWriter::new(std::io::stdout().lock());
            let mut written = 0u64;
            for record in slice.values()? {
                serde_json::to_writer(&mut out, &record?)?;
                out.write_all(b"\n")?;
                written += 1;
            }
            out.flush()?;
            let (start, end) = slice.bounds();
            info!(target: "stager.cli", path = %path.display(), start, end = ?end, records = written, "slice printed");
            Ok(())
        }
        Command::Count { path } => {
            let lines = StreamPartitioner::new()
                .count_lines(&path)
                .with_context(|| format!("counting {}", path.display()))?;
            println!("{lines}");
            Ok(())
        }
        Command::Name { parts, max_length } => {
            println!("{}", IdentifierCodec::build(parts.as_slice(), max_length)?);
            Ok(())
        }
        Command::Slug { path } => {
            println!("{}", DatasetSlugger::default().slug(&path)?);
            Ok(())
        }
        Command::IndexName { experiment } => {
            let (driver, config) = inspect(settings, &experiment)?;
            println!("{}", driver.materializer().index_name(&experiment, &config)?);
            Ok(())
        }
        Command::PredictionPath { experiment, prediction_path, top_k } => {
            let (driver, config) = inspect(settings, &experiment)?;
            let input = match prediction_path {
                Some(path) => path,
                None => driver.materializer().dev_split(&experiment, &config)?,
            };
            let path = driver
                .materializer()
                .prediction_output_path(&experiment, &config, &input, top_k)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn submit(
    stage: Stage,
    args: StageArgs,
    settings: &Settings,
    configure: impl FnOnce(&mut stager_core::StageOptions),
) -> Result<()> {
    let mut options = stager_core::StageOptions {
        cluster: args.cluster,
        priority: if args.preemptible { Priority::Preemptible } else { Priority::Normal },
        ..Default::default()
    };
    configure(&mut options);

    let infra = settings::infrastructure_from_env()?;
    let driver = StageDriver::new(settings, infra, args.dry_run);
    let handle = driver
        .submit(stage, &args.experiment, &args.data_mounts, &options)
        .with_context(|| format!("{stage} job for `{}`", args.experiment))?;
    info!(target: "stager.cli", stage = %stage, experiment = %args.experiment, handle = %handle, "job submitted");
    Ok(())
}

/// Driver and own config for read-only inspection commands; no infrastructure needed.
fn inspect(
    settings: &Settings,
    experiment: &ExperimentName,
) -> Result<(StageDriver, serde_json::Value)> {
    let driver = StageDriver::new(settings, Default::default(), true);
    let config = FsConfigLoader::new(&settings.config_dir)
        .load(experiment)
        .with_context(|| format!("loading config of `{experiment}`"))?;
    Ok((driver, config))
}
