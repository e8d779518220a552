//! Deterministic, length-bounded names for jobs, indexes and derived artifacts.
//!
//! Every name in the system goes through [`IdentifierCodec`]; there is exactly one naming policy.
//! Dataset paths are turned into name fragments by [`DatasetSlugger`] first.
mod codec;
pub use codec::{
    CodecVersion, HASH_WIDTH, INDEX_NAME_LIMIT, IdentifierCodec, JOB_NAME_LIMIT, SEPARATOR,
    UPSTREAM_MOUNT_PREFIX,
};

mod slug;
pub use slug::{DatasetSlugger, PathRewrite};
