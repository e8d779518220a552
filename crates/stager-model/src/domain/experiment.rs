use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Name of one configuration-driven run of the pipeline.
///
/// Experiment names end up inside filesystem paths and cluster resource names,
/// so they must be single path-safe tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExperimentName(String);

impl ExperimentName {
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("empty")
        } else if name == "." || name == ".." {
            Some("relative path component")
        } else if name.contains(['/', '\\']) {
            Some("contains a path separator")
        } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            Some("contains whitespace or control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ModelError::InvalidExperimentName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExperimentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ExperimentName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ExperimentName {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExperimentName> for String {
    fn from(name: ExperimentName) -> Self {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_tokens() {
        let name = ExperimentName::new("dpr_nq-base.v2").unwrap();
        assert_eq!(name.as_str(), "dpr_nq-base.v2");
        assert_eq!(name.to_string(), "dpr_nq-base.v2");
    }

    #[test]
    fn rejects_separators_and_blanks() {
        for bad in ["", ".", "..", "a/b", "a\\b", "with space", "tab\there"] {
            assert!(ExperimentName::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: ExperimentName = serde_json::from_str(r#""expA""#).unwrap();
        assert_eq!(ok.as_str(), "expA");
        assert!(serde_json::from_str::<ExperimentName>(r#""a/b""#).is_err());
    }
}
