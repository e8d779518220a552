//! Transfer-learning dependencies between experiments.
//!
//! A stage depends on the experiment that pretrained its encoders, which may itself have been
//! pretrained by one other experiment. The walk stops at [`MAX_CHAIN_DEPTH`]; a deeper chain is
//! truncated with a warning. A reference back into the chain before that depth is rejected.
use std::{borrow::Cow, path::PathBuf};

use stager_model::{ConfigTree, DependencyChain, ExperimentName, MAX_CHAIN_DEPTH};
use tracing::{debug, instrument, warn};

use crate::error::{CoreError, LoadError};

mod reference;
pub use reference::{ModelReference, ReferencePolicy};

/// Source of parsed experiment configurations.
pub trait ConfigLoader {
    /// Load the configuration tree of `experiment`.
    fn load(&self, experiment: &ExperimentName) -> Result<ConfigTree, LoadError>;

    /// Location of `experiment`'s configuration, whether or not it exists.
    fn locate(&self, experiment: &ExperimentName) -> PathBuf;
}

pub struct DependencyResolver<'a> {
    loader: &'a dyn ConfigLoader,
    policy: ReferencePolicy,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(loader: &'a dyn ConfigLoader) -> Self {
        Self {
            loader,
            policy: ReferencePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ReferencePolicy {
        &self.policy
    }

    /// Load `experiment`'s own config and resolve its chain.
    pub fn resolve_named(
        &self,
        experiment: &ExperimentName,
    ) -> Result<(ConfigTree, DependencyChain), CoreError> {
        let config = self.loader.load(experiment)?;
        let chain = self.resolve(experiment, &config)?;
        Ok((config, chain))
    }

    /// Upstream experiments that must be materialized before a stage of `experiment` runs.
    ///
    /// Immediate upstream first. Every level in the chain except the last must have a loadable
    /// config; the last level's config is only read to report truncation.
    #[instrument(level = "debug", skip(self, experiment, config), fields(experiment = %experiment))]
    pub fn resolve(
        &self,
        experiment: &ExperimentName,
        config: &ConfigTree,
    ) -> Result<DependencyChain, CoreError> {
        let mut chain = DependencyChain::empty();
        let mut owner = experiment.clone();
        let mut tree: Cow<'_, ConfigTree> = Cow::Borrowed(config);

        while let Some(upstream) = self.policy.upstream_of(&owner, &tree)? {
            if &upstream == experiment || chain.contains(&upstream) {
                return Err(CoreError::CyclicReference {
                    chain: render_cycle(experiment, &chain, &upstream),
                });
            }
            chain.push(upstream.clone())?;
            if chain.is_full() {
                self.inspect_beyond(experiment, &chain);
                break;
            }

            match self.loader.load(&upstream) {
                Ok(next) => {
                    owner = upstream;
                    tree = Cow::Owned(next);
                }
                Err(LoadError::NotFound { path, .. }) => {
                    return Err(CoreError::MissingUpstreamConfig {
                        experiment: upstream,
                        required_by: owner,
                        path,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        debug!(
            target: "stager.core.resolve",
            depth = chain.len(),
            "dependency chain resolved"
        );
        Ok(chain)
    }

    /// Look one level past a full chain, only to report what gets cut off.
    ///
    /// The last level's config is never needed to build the chain, so nothing found here
    /// (a missing or unreadable config, broken references, a cycle) fails the resolution.
    fn inspect_beyond(&self, experiment: &ExperimentName, chain: &DependencyChain) {
        let Some(last) = chain.as_slice().last() else {
            return;
        };
        let tree = match self.loader.load(last) {
            Ok(tree) => tree,
            Err(e) => {
                debug!(target: "stager.core.resolve", upstream = %last, error = %e, "level beyond the chain not inspected");
                return;
            }
        };

        match self.policy.upstream_of(last, &tree) {
            Ok(None) => {}
            Ok(Some(next)) if &next == experiment || chain.contains(&next) => {
                warn!(
                    target: "stager.core.resolve",
                    experiment = %experiment,
                    cycle = %render_cycle(experiment, chain, &next),
                    "reference beyond the chain loops back; ignored at max depth"
                );
            }
            Ok(Some(next)) => {
                warn!(
                    target: "stager.core.resolve",
                    experiment = %experiment,
                    dropped = %next,
                    max_depth = MAX_CHAIN_DEPTH,
                    "dependency chain truncated; deeper transfer chains must be flattened by hand"
                );
            }
            Err(e) => {
                debug!(target: "stager.core.resolve", upstream = %last, error = %e, "level beyond the chain not inspected");
            }
        }
    }
}

fn render_cycle(
    experiment: &ExperimentName,
    chain: &DependencyChain,
    repeated: &ExperimentName,
) -> String {
    std::iter::once(experiment)
        .chain(chain.iter())
        .chain(std::iter::once(repeated))
        .map(ExperimentName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
