mod kv;
pub use kv::KeyValue;

mod job_env;
pub use job_env::JobEnv;

mod experiment;
pub use experiment::ExperimentName;

mod stage;
pub use stage::Stage;

mod slice;
pub use slice::SliceSpec;

mod chain;
pub use chain::{DependencyChain, MAX_CHAIN_DEPTH};

mod flat;
pub use flat::FlattenedConfig;

mod mounts;
pub use mounts::MountSet;

mod index_type;
pub use index_type::IndexType;

mod infra;
pub use infra::{Infrastructure, Tracking};

mod job;
pub use job::{JobSpec, OutputDirs, Priority, ResourceShape};

/// Free-form parsed configuration tree of one experiment.
///
/// Produced by an external loader; this workspace never parses the configuration language.
pub type ConfigTree = serde_json::Value;
