mod error;
pub use error::{ExecError, ExecResult};

pub mod partition;
pub use partition::{DataSlice, LineCountCache, SliceRecords, StreamPartitioner};

pub mod writer;
pub use writer::{BatchWriter, WriteSummary};

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::{BatchWriter, DataSlice, LineCountCache, StreamPartitioner};
}
