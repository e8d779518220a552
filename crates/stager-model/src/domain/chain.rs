use serde::{Deserialize, Serialize};

use crate::{ExperimentName, ModelError};

/// Maximum number of upstream experiments a stage may depend on through transfer learning.
pub const MAX_CHAIN_DEPTH: usize = 2;

/// Ordered upstream experiments of a stage: immediate upstream first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ExperimentName>", into = "Vec<ExperimentName>")]
pub struct DependencyChain(Vec<ExperimentName>);

impl DependencyChain {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Append the next upstream level.
    pub fn push(&mut self, upstream: ExperimentName) -> Result<(), ModelError> {
        if self.0.len() >= MAX_CHAIN_DEPTH {
            let mut names: Vec<&str> = self.0.iter().map(ExperimentName::as_str).collect();
            names.push(upstream.as_str());
            return Err(ModelError::ChainTooDeep {
                max: MAX_CHAIN_DEPTH,
                chain: names.join(" -> "),
            });
        }
        self.0.push(upstream);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.0.len() >= MAX_CHAIN_DEPTH
    }

    pub fn contains(&self, name: &ExperimentName) -> bool {
        self.0.contains(name)
    }

    /// The immediate upstream, if any.
    pub fn immediate(&self) -> Option<&ExperimentName> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExperimentName> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ExperimentName] {
        &self.0
    }
}

impl TryFrom<Vec<ExperimentName>> for DependencyChain {
    type Error = ModelError;

    fn try_from(names: Vec<ExperimentName>) -> Result<Self, Self::Error> {
        let mut chain = Self::empty();
        for name in names {
            chain.push(name)?;
        }
        Ok(chain)
    }
}

impl From<DependencyChain> for Vec<ExperimentName> {
    fn from(chain: DependencyChain) -> Self {
        chain.0
    }
}

impl<'a> IntoIterator for &'a DependencyChain {
    type Item = &'a ExperimentName;
    type IntoIter = std::slice::Iter<'a, ExperimentName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
