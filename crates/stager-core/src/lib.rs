pub mod error;
pub use error::{CoreError, IndexError, LoadError, SchedulerError};

pub mod naming;
pub use naming::{DatasetSlugger, IdentifierCodec, PathRewrite};

pub mod resolve;
pub use resolve::{ConfigLoader, DependencyResolver, ModelReference, ReferencePolicy};

pub mod materialize;
pub use materialize::{ConfigMaterializer, JobRequest, Layout, StageOptions};

pub mod index;
pub use index::{IndexClient, IndexReport, prepare_index, verify_index};

pub mod scheduler;
pub use scheduler::JobScheduler;
