//! Teardown error policy
//!
//! Every `Delete` step has a fixed `ErrorPolicy`. Policy deletions are
//! `Swallowed`; collection and knowledge-base deletions are `Fatal`. All
//! steps run and the persisted keys are purged whatever the outcomes; a
//! fatal outcome only decides the response status.

use kbprov_state::PurgeReport;
use kbprov_utils::ProvisionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// The response reports `FAILED`
    Fatal,
    /// Logged; the response is unaffected
    Swallowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    AccessPolicy,
    NetworkPolicy,
    EncryptionPolicy,
    Collection,
    KnowledgeBase,
}

impl TeardownStep {
    /// Execution order
    pub const ORDER: [Self; 5] = [
        Self::AccessPolicy,
        Self::NetworkPolicy,
        Self::EncryptionPolicy,
        Self::Collection,
        Self::KnowledgeBase,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::AccessPolicy => "delete_access_policy",
            Self::NetworkPolicy => "delete_network_policy",
            Self::EncryptionPolicy => "delete_encryption_policy",
            Self::Collection => "delete_collection",
            Self::KnowledgeBase => "delete_knowledge_base",
        }
    }

    #[must_use]
    pub fn policy(self) -> ErrorPolicy {
        match self {
            Self::AccessPolicy | Self::NetworkPolicy | Self::EncryptionPolicy => {
                ErrorPolicy::Swallowed
            }
            Self::Collection | Self::KnowledgeBase => ErrorPolicy::Fatal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// Nothing to delete: no persisted id, or the service no longer has it
    Absent(String),
    Swallowed(ProvisionError),
    Fatal(ProvisionError),
}

impl StepOutcome {
    /// Apply `step`'s error policy to its result
    #[must_use]
    pub fn classify(step: TeardownStep, result: Result<(), ProvisionError>) -> Self {
        match result {
            Ok(()) => Self::Completed,
            Err(ProvisionError::NotFound(what)) => Self::Absent(what),
            Err(err) => match step.policy() {
                ErrorPolicy::Fatal => Self::Fatal(err),
                ErrorPolicy::Swallowed => Self::Swallowed(err),
            },
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Everything one `Delete` did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub steps: Vec<(TeardownStep, StepOutcome)>,
    pub purge: PurgeReport,
}

impl TeardownReport {
    pub fn record(&mut self, step: TeardownStep, outcome: StepOutcome) {
        self.steps.push((step, outcome));
    }

    #[must_use]
    pub fn outcome(&self, step: TeardownStep) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, outcome)| outcome)
    }

    /// True when no step was fatal and every key was purged
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.steps.iter().any(|(_, outcome)| outcome.is_fatal()) && self.purge.is_clean()
    }

    /// Failure summary for the response `Reason`.
    ///
    /// Lists each fatal step and each unpurged key, then the identifiers that
    /// were purged so a manual cleanup keeps its reference.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        let mut failures: Vec<String> = self
            .steps
            .iter()
            .filter_map(|(step, outcome)| match outcome {
                StepOutcome::Fatal(err) => Some(format!("{}: {err}", step.name())),
                _ => None,
            })
            .collect();
        failures.extend(
            self.purge
                .failed
                .iter()
                .map(|(field, err)| format!("purge {field}: {err}")),
        );

        let purged: Vec<String> = self
            .purge
            .removed
            .iter()
            .filter_map(|(field, value)| value.as_ref().map(|v| format!("{field}={v}")))
            .collect();

        let mut reason = format!("DeleteKnowledgeBase failed: {}", failures.join("; "));
        if !purged.is_empty() {
            reason.push_str(&format!(" (purged {})", purged.join(", ")));
        }
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbprov_state::StateField;

    #[test]
    fn policy_table() {
        assert_eq!(TeardownStep::AccessPolicy.policy(), ErrorPolicy::Swallowed);
        assert_eq!(TeardownStep::NetworkPolicy.policy(), ErrorPolicy::Swallowed);
        assert_eq!(TeardownStep::EncryptionPolicy.policy(), ErrorPolicy::Swallowed);
        assert_eq!(TeardownStep::Collection.policy(), ErrorPolicy::Fatal);
        assert_eq!(TeardownStep::KnowledgeBase.policy(), ErrorPolicy::Fatal);
    }

    #[test]
    fn collection_precedes_knowledge_base() {
        let order = TeardownStep::ORDER;
        let position = |step| order.iter().position(|s| *s == step).unwrap();
        assert!(position(TeardownStep::EncryptionPolicy) < position(TeardownStep::Collection));
        assert!(position(TeardownStep::Collection) < position(TeardownStep::KnowledgeBase));
    }

    #[test]
    fn not_found_is_absent_under_either_policy() {
        for step in TeardownStep::ORDER {
            let outcome =
                StepOutcome::classify(step, Err(ProvisionError::NotFound("gone".to_string())));
            assert_eq!(outcome, StepOutcome::Absent("gone".to_string()));
        }
    }

    #[test]
    fn classification_follows_policy() {
        let err = || ProvisionError::CollectionDeletionFailed("boom".to_string());
        assert!(StepOutcome::classify(TeardownStep::Collection, Err(err())).is_fatal());
        assert!(matches!(
            StepOutcome::classify(TeardownStep::AccessPolicy, Err(err())),
            StepOutcome::Swallowed(_)
        ));
        assert_eq!(
            StepOutcome::classify(TeardownStep::KnowledgeBase, Ok(())),
            StepOutcome::Completed
        );
    }

    #[test]
    fn failure_reason_lists_fatal_steps_and_purged_ids() {
        let mut report = TeardownReport::default();
        report.record(
            TeardownStep::AccessPolicy,
            StepOutcome::Swallowed(ProvisionError::PolicyDeletionFailed {
                policy: "data".to_string(),
                reason: "denied".to_string(),
            }),
        );
        report.record(
            TeardownStep::Collection,
            StepOutcome::Fatal(ProvisionError::CollectionDeletionFailed("boom".to_string())),
        );
        report.purge.removed = vec![
            (StateField::CollectionId, Some("col-acme".to_string())),
            (StateField::DataSourceId, None),
        ];

        assert!(!report.is_success());
        let reason = report.failure_reason();
        assert!(reason.contains("delete_collection: Failed to delete collection: boom"));
        assert!(reason.contains("collectionId=col-acme"));
        assert!(!reason.contains("denied"));
        assert!(!reason.contains("dataSourceId"));
    }

    #[test]
    fn swallowed_only_is_success() {
        let mut report = TeardownReport::default();
        report.record(
            TeardownStep::NetworkPolicy,
            StepOutcome::Swallowed(ProvisionError::PolicyDeletionFailed {
                policy: "network".to_string(),
                reason: "denied".to_string(),
            }),
        );
        report.record(TeardownStep::Collection, StepOutcome::Absent("none".to_string()));
        assert!(report.is_success());
    }
}
