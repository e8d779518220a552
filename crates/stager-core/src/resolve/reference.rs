use stager_model::{ConfigTree, ExperimentName};

use crate::error::CoreError;

/// Where a paired model's weights come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReference {
    /// A model identifier outside this pipeline, or no reference at all.
    External(Option<String>),
    /// Output of a previously trained experiment: `<marker>/<experiment>/<role>`.
    Upstream {
        experiment: ExperimentName,
        role: String,
    },
}

impl ModelReference {
    pub fn upstream(&self) -> Option<&ExperimentName> {
        match self {
            ModelReference::Upstream { experiment, .. } => Some(experiment),
            ModelReference::External(_) => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            ModelReference::External(Some(id)) => id.clone(),
            ModelReference::External(None) => "<unset>".to_string(),
            ModelReference::Upstream { experiment, role } => format!("{experiment}/{role}"),
        }
    }
}

/// Config keys and path conventions of the two cooperating encoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePolicy {
    /// First path segment that marks a reference to a trained experiment.
    pub marker: String,
    pub query_key: String,
    pub query_role: String,
    pub passage_key: String,
    pub passage_role: String,
}

impl Default for ReferencePolicy {
    fn default() -> Self {
        Self {
            marker: "serialization_dir".to_string(),
            query_key: "query_model".to_string(),
            query_role: "query_encoder".to_string(),
            passage_key: "passage_model".to_string(),
            passage_role: "passage_encoder".to_string(),
        }
    }
}

impl ReferencePolicy {
    /// Parse the reference stored under `key`, expecting `role` as its last segment.
    pub fn reference(
        &self,
        owner: &ExperimentName,
        config: &ConfigTree,
        key: &str,
        role: &str,
    ) -> Result<ModelReference, CoreError> {
        let raw = match config.get(key) {
            None | Some(serde_json::Value::Null) => return Ok(ModelReference::External(None)),
            Some(serde_json::Value::String(s)) => s.trim().trim_end_matches('/'),
            Some(other) => {
                return Err(CoreError::InvalidInput(format!(
                    "experiment `{owner}`: `{key}` must be a string, got {other}"
                )));
            }
        };

        let segments: Vec<&str> = raw.split('/').collect();
        if segments.first() != Some(&self.marker.as_str()) {
            return Ok(ModelReference::External(Some(raw.to_string())));
        }

        match segments.as_slice() {
            [_, experiment, last] if *last == role => {
                let experiment = ExperimentName::new(*experiment).map_err(|e| {
                    CoreError::InvalidInput(format!("experiment `{owner}`: `{key}`: {e}"))
                })?;
                Ok(ModelReference::Upstream {
                    experiment,
                    role: role.to_string(),
                })
            }
            _ => Err(CoreError::InvalidInput(format!(
                "experiment `{owner}`: `{key}` = `{raw}` is not of the form `{}/<experiment>/{role}`",
                self.marker
            ))),
        }
    }

    /// Immediate upstream experiment of `owner`, if its encoders were pretrained by one.
    pub fn upstream_of(
        &self,
        owner: &ExperimentName,
        config: &ConfigTree,
    ) -> Result<Option<ExperimentName>, CoreError> {
        let query = self.reference(owner, config, &self.query_key, &self.query_role)?;
        let passage = self.reference(owner, config, &self.passage_key, &self.passage_role)?;

        match (query.upstream(), passage.upstream()) {
            (None, None) => Ok(None),
            (Some(q), Some(p)) if q == p => Ok(Some(q.clone())),
            (Some(q), Some(p)) => Err(CoreError::InconsistentPair {
                experiment: owner.clone(),
                query_upstream: q.clone(),
                passage_upstream: p.clone(),
            }),
            _ => Err(CoreError::MismatchedReference {
                experiment: owner.clone(),
                query: query.describe(),
                passage: passage.describe(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exp(s: &str) -> ExperimentName {
        ExperimentName::new(s).unwrap()
    }

    #[test]
    fn both_structured_same_owner() {
        let cfg = json!({
            "query_model": "serialization_dir/expA/query_encoder/",
            "passage_model": "serialization_dir/expA/passage_encoder",
        });
        let up = ReferencePolicy::default().upstream_of(&exp("expB"), &cfg).unwrap();
        assert_eq!(up, Some(exp("expA")));
    }

    #[test]
    fn both_external() {
        let cfg = json!({
            "query_model": "facebook/dpr-question_encoder-single-nq-base",
            "passage_model": "facebook/dpr-ctx_encoder-single-nq-base",
        });
        let up = ReferencePolicy::default().upstream_of(&exp("expB"), &cfg).unwrap();
        assert_eq!(up, None);
    }

    #[test]
    fn half_pretrained_pair_is_mismatched() {
        let cfg = json!({
            "query_model": "serialization_dir/expA/query_encoder",
            "passage_model": "bert-base-uncased",
        });
        let err = ReferencePolicy::default()
            .upstream_of(&exp("expB"), &cfg)
            .unwrap_err();
        assert!(matches!(err, CoreError::MismatchedReference { ref experiment, .. } if experiment.as_str() == "expB"));
    }

    #[test]
    fn missing_reference_counts_as_external() {
        let cfg = json!({ "query_model": "serialization_dir/expA/query_encoder" });
        let err = ReferencePolicy::default()
            .upstream_of(&exp("expB"), &cfg)
            .unwrap_err();
        assert!(matches!(err, CoreError::MismatchedReference { .. }));
        assert_eq!(
            ReferencePolicy::default().upstream_of(&exp("expB"), &json!({})).unwrap(),
            None
        );
    }

    #[test]
    fn different_owners_are_inconsistent() {
        let cfg = json!({
            "query_model": "serialization_dir/expA/query_encoder",
            "passage_model": "serialization_dir/expC/passage_encoder",
        });
        let err = ReferencePolicy::default()
            .upstream_of(&exp("expB"), &cfg)
            .unwrap_err();
        assert!(matches!(err, CoreError::InconsistentPair { .. }));
    }

    #[test]
    fn wrong_role_or_shape_is_invalid() {
        let policy = ReferencePolicy::default();
        for bad in [
            "serialization_dir/expA/passage_encoder",
            "serialization_dir/expA",
            "serialization_dir/expA/query_encoder/extra",
        ] {
            let cfg = json!({ "query_model": bad });
            let err = policy
                .reference(&exp("expB"), &cfg, "query_model", "query_encoder")
                .unwrap_err();
            assert!(matches!(err, CoreError::InvalidInput(_)), "{bad}");
        }
    }

    #[test]
    fn non_string_reference_is_invalid() {
        let cfg = json!({ "query_model": 3 });
        let err = ReferencePolicy::default()
            .reference(&exp("expB"), &cfg, "query_model", "query_encoder")
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }
}
