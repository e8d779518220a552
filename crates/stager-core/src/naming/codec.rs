use sha2::{Digest, Sha256};
use stager_model::{ExperimentName, Stage};
use tracing::debug;

use crate::error::CoreError;

/// Separator between the namespace prefix and each semantic part.
pub const SEPARATOR: &str = "___";
/// Width of the decimal digest appended to shortened identifiers.
pub const HASH_WIDTH: usize = 8;
/// Cluster job names.
pub const JOB_NAME_LIMIT: usize = 100;
/// Vector index collections; longer names are refused on insert.
pub const INDEX_NAME_LIMIT: usize = 100;
/// Prefix of the mount that exposes a finished training job's results.
pub const UPSTREAM_MOUNT_PREFIX: &str = "result_of_";

const HASH_MODULUS: u64 = 100_000_000;

/// Naming policy revision. Only the current one is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecVersion {
    /// `___` joins, `[A-Za-z0-9_]` alphabet, keep-rightmost truncation with an 8-digit SHA-256 digest.
    V1,
}

/// Builds composite identifiers from ordered semantic parts.
///
/// The output only contains `[A-Za-z0-9_]`. When the sanitized join exceeds the limit,
/// the rightmost (most specific) characters are kept and a digest of the full sanitized
/// string is appended, so distinct inputs stay distinct after shortening and equal inputs
/// always shorten identically.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierCodec;

impl IdentifierCodec {
    pub const VERSION: CodecVersion = CodecVersion::V1;

    /// Join `parts` (namespace prefix first) into an identifier of at most `max_length` characters.
    pub fn build<S: AsRef<str>>(parts: &[S], max_length: usize) -> Result<String, CoreError> {
        if parts.is_empty() {
            return Err(CoreError::InvalidInput("identifier needs at least one part".into()));
        }
        if let Some(pos) = parts.iter().position(|p| p.as_ref().trim().is_empty()) {
            return Err(CoreError::InvalidInput(format!(
                "identifier part #{pos} is empty"
            )));
        }
        if max_length < HASH_WIDTH + 2 {
            return Err(CoreError::InvalidInput(format!(
                "max length {max_length} is below the minimum of {}",
                HASH_WIDTH + 2
            )));
        }

        let joined = parts
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(SEPARATOR);
        let sanitized = Self::sanitize(&joined);
        if sanitized.len() <= max_length {
            return Ok(sanitized);
        }

        let keep = max_length - HASH_WIDTH - 1;
        let digest = Self::digest(&sanitized);
        let tail = &sanitized[sanitized.len() - keep..];
        debug!(
            target: "stager.core.naming",
            full = %sanitized,
            max_length,
            "identifier shortened"
        );
        Ok(format!("{tail}_{digest}"))
    }

    /// Replace every character outside `[A-Za-z0-9_]` with `_`.
    pub fn sanitize(raw: &str) -> String {
        raw.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect()
    }

    /// Fixed-width decimal digest: SHA-256 of `text` read as a big-endian integer, modulo 10^8.
    pub fn digest(text: &str) -> String {
        let hash = Sha256::digest(text.as_bytes());
        let value = hash
            .iter()
            .fold(0u64, |acc, &byte| (acc * 256 + u64::from(byte)) % HASH_MODULUS);
        format!("{value:0width$}", width = HASH_WIDTH)
    }

    /// Cluster job name: `[stage, experiment]` plus the dataset slug for dataset-keyed stages.
    pub fn job_name(
        stage: Stage,
        experiment: &ExperimentName,
        dataset_slug: Option<&str>,
    ) -> Result<String, CoreError> {
        match dataset_slug {
            Some(slug) => Self::build(&[stage.as_str(), experiment.as_str(), slug], JOB_NAME_LIMIT),
            None => Self::build(&[stage.as_str(), experiment.as_str()], JOB_NAME_LIMIT),
        }
    }

    /// Vector index collection name, namespaced by the experiment.
    pub fn index_name(experiment: &ExperimentName, dataset_slug: &str) -> Result<String, CoreError> {
        Self::build(&[experiment.as_str(), dataset_slug], INDEX_NAME_LIMIT)
    }

    /// Mount reference for the results of `experiment`'s training job.
    pub fn upstream_mount(experiment: &ExperimentName) -> Result<String, CoreError> {
        let train_job = Self::job_name(Stage::Train, experiment, None)?;
        Ok(format!("{UPSTREAM_MOUNT_PREFIX}{train_job}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(s: &str) -> ExperimentName {
        ExperimentName::new(s).unwrap()
    }

    #[test]
    fn short_join_is_returned_unchanged() {
        let id = IdentifierCodec::build(&["train", "expA", "wiki__docs"], 100).unwrap();
        assert_eq!(id, "train___expA___wiki__docs");
    }

    #[test]
    fn sanitizes_instead_of_dropping() {
        let id = IdentifierCodec::build(&["index", "exp-1", "nq.dev/v2"], 100).unwrap();
        assert_eq!(id, "index___exp_1___nq_dev_v2");
    }

    #[test]
    fn long_join_is_shortened_to_exact_limit() {
        let tail = "x".repeat(140 - "train___".len());
        let id = IdentifierCodec::build(&["train", tail.as_str()], 100).unwrap();

        assert_eq!(id.len(), 100);
        let (kept, digest) = id.rsplit_once('_').unwrap();
        assert_eq!(digest.len(), HASH_WIDTH);
        assert!(digest.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(kept.len(), 100 - HASH_WIDTH - 1);
    }

    #[test]
    fn shared_suffix_window_still_differs() {
        let suffix = "s".repeat(130);
        let a = IdentifierCodec::build(&["predict", "expA", suffix.as_str()], 100).unwrap();
        let b = IdentifierCodec::build(&["predict", "expB", suffix.as_str()], 100).unwrap();

        assert_eq!(a[..90], b[..90]);
        assert_ne!(a, b);
    }

    #[test]
    fn near_duplicates_never_collide() {
        let suffix = "passages_".repeat(15);
        let mut seen = std::collections::HashSet::new();
        for i in 0..200 {
            let head = format!("exp{i}");
            let id = IdentifierCodec::build(&["index", head.as_str(), suffix.as_str()], 100).unwrap();
            assert!(id.len() <= 100);
            assert!(seen.insert(id), "collision for exp{i}");
        }
    }

    #[test]
    fn build_is_deterministic() {
        let long = "d".repeat(300);
        let parts = ["index", "expA", long.as_str()];
        for max in [10, 50, 100, 255] {
            let a = IdentifierCodec::build(&parts, max).unwrap();
            let b = IdentifierCodec::build(&parts, max).unwrap();
            assert_eq!(a, b);
            assert!(a.len() <= max);
        }
    }

    #[test]
    fn rejects_empty_parts_and_tiny_limits() {
        assert!(IdentifierCodec::build(&["train", ""], 100).is_err());
        assert!(IdentifierCodec::build(&["train", "  "], 100).is_err());
        assert!(IdentifierCodec::build::<&str>(&[], 100).is_err());
        assert!(IdentifierCodec::build(&["train"], HASH_WIDTH + 1).is_err());
        assert!(IdentifierCodec::build(&["train"], HASH_WIDTH + 2).is_ok());
    }

    #[test]
    fn digest_is_fixed_width() {
        for text in ["", "a", "train___expA"] {
            assert_eq!(IdentifierCodec::digest(text).len(), HASH_WIDTH);
        }
        assert_ne!(IdentifierCodec::digest("a"), IdentifierCodec::digest("b"));
    }

    #[test]
    fn helper_names() {
        let e = exp("expA");
        assert_eq!(
            IdentifierCodec::job_name(Stage::Train, &e, None).unwrap(),
            "train___expA"
        );
        assert_eq!(
            IdentifierCodec::job_name(Stage::Predict, &e, Some("nq__dev")).unwrap(),
            "predict___expA___nq__dev"
        );
        assert_eq!(
            IdentifierCodec::index_name(&e, "natcq").unwrap(),
            "expA___natcq"
        );
        assert_eq!(
            IdentifierCodec::upstream_mount(&e).unwrap(),
            "result_of_train___expA"
        );
    }
}
