//! Top-level driver: decides the pending step and runs it on request.

use std::sync::Arc;

use crate::client::agent::PdsAgent;
use crate::migration::progress::ProgressReporter;
use crate::migration::steps::{
    finalize_migration, migrate_data, request_identity_transfer, sign_identity_transfer,
};
use crate::migration::types::{
    DataMigrationReport, MigrationDecision, MigrationError, PlcTransition, StatusOverview,
    StatusReport,
};
use crate::status::{next_step, readiness_for, MigrationStep};

/// Owns the session handles for both services for the duration of a run.
///
/// `advance` only decides; the `run_*` methods act. The split lets callers
/// show the decision (to a human, or a separate trigger) before committing
/// to a side-effecting step. All resumability comes from the fresh status
/// reads — the orchestrator keeps no cross-step memory, so calling
/// `advance` repeatedly with no external change returns the same decision.
pub struct MigrationOrchestrator {
    origin: Arc<dyn PdsAgent>,
    destination: Option<Arc<dyn PdsAgent>>,
}

impl MigrationOrchestrator {
    /// Orchestrator for a migration whose destination account does not
    /// exist yet.
    pub fn new(origin: Arc<dyn PdsAgent>) -> Self {
        Self {
            origin,
            destination: None,
        }
    }

    pub fn with_destination(origin: Arc<dyn PdsAgent>, destination: Arc<dyn PdsAgent>) -> Self {
        Self {
            origin,
            destination: Some(destination),
        }
    }

    /// Attach the destination handle once the account has been created.
    pub fn set_destination(&mut self, destination: Arc<dyn PdsAgent>) {
        self.destination = Some(destination);
    }

    fn destination(&self) -> Result<&Arc<dyn PdsAgent>, MigrationError> {
        self.destination
            .as_ref()
            .ok_or(MigrationError::MissingDestination)
    }

    /// Re-derive the pending step from fresh status on both services.
    pub async fn advance(&self) -> Result<MigrationDecision, MigrationError> {
        let Some(destination) = self.destination.as_ref() else {
            return Ok(MigrationDecision {
                step: MigrationStep::CreateAccount,
                next_step: MigrationStep::CreateAccount.step_number(),
                completed: false,
                current_status: None,
            });
        };

        // Two separate reads at slightly different instants; the small race
        // window is accepted.
        let origin_status = self.origin.check_account_status().await?;
        let destination_status = destination.check_account_status().await?;

        let step = next_step(&origin_status, Some(&destination_status));
        Ok(MigrationDecision {
            step,
            next_step: step.step_number(),
            completed: step == MigrationStep::Completed,
            current_status: Some(StatusOverview::from_statuses(
                &origin_status,
                &destination_status,
            )),
        })
    }

    /// Diagnostic readiness report for one named step.
    pub async fn readiness(&self, step: MigrationStep) -> Result<StatusReport, MigrationError> {
        let destination = self.destination()?;
        let origin_status = self.origin.check_account_status().await?;
        let destination_status = destination.check_account_status().await?;
        let readiness = readiness_for(step, &origin_status, Some(&destination_status));
        Ok(StatusReport {
            status: StatusOverview::from_statuses(&origin_status, &destination_status),
            ready: readiness.ready,
            reason: readiness.reason(),
        })
    }

    /// Run step 2: repository, blobs, preferences.
    pub async fn run_data_migration(
        &self,
        reporter: &dyn ProgressReporter,
    ) -> Result<DataMigrationReport, MigrationError> {
        let destination = self.destination()?;
        migrate_data(self.origin.as_ref(), destination.as_ref(), reporter)
            .await
            .map_err(MigrationError::from)
    }

    /// Run the first phase of step 3: email the PLC signing token.
    pub async fn run_identity_request(&self) -> Result<(), MigrationError> {
        request_identity_transfer(self.origin.as_ref())
            .await
            .map_err(MigrationError::from)
    }

    /// Run the second phase of step 3 with the externally delivered token.
    pub async fn run_identity_sign(&self, token: &str) -> Result<PlcTransition, MigrationError> {
        let destination = self.destination()?;
        sign_identity_transfer(self.origin.as_ref(), destination.as_ref(), token)
            .await
            .map_err(MigrationError::from)
    }

    /// Run step 4: activate destination, deactivate origin.
    pub async fn run_finalize(&self) -> Result<(), MigrationError> {
        let destination = self.destination()?;
        finalize_migration(self.origin.as_ref(), destination.as_ref())
            .await
            .map_err(MigrationError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::client::agent::MockPdsAgent;
    use crate::client::types::AccountStatus;

    fn origin_status(activated: bool) -> AccountStatus {
        AccountStatus {
            activated,
            valid_did: true,
            repo_commit: Some("bafyorigin".to_string()),
            indexed_records: 10,
            private_state_values: 0,
            expected_blobs: 3,
            imported_blobs: 3,
            ..AccountStatus::default()
        }
    }

    fn destination_status(
        imported: bool,
        valid_did: bool,
        activated: bool,
    ) -> AccountStatus {
        AccountStatus {
            activated,
            valid_did,
            repo_commit: imported.then(|| "bafydest".to_string()),
            indexed_records: if imported { 10 } else { 0 },
            private_state_values: 0,
            expected_blobs: if imported { 3 } else { 0 },
            imported_blobs: if imported { 3 } else { 0 },
            ..AccountStatus::default()
        }
    }

    #[tokio::test]
    async fn missing_destination_decides_account_creation_without_polling() {
        let mut origin = MockPdsAgent::new();
        // No status call may happen before the destination exists.
        origin.expect_check_account_status().times(0);

        let orchestrator = MigrationOrchestrator::new(Arc::new(origin));
        let decision = orchestrator.advance().await.unwrap();
        assert_eq!(decision.step, MigrationStep::CreateAccount);
        assert_eq!(decision.next_step, Some(1));
        assert!(!decision.completed);
        assert!(decision.current_status.is_none());
    }

    #[tokio::test]
    async fn advance_is_idempotent_without_state_change() {
        let mut origin = MockPdsAgent::new();
        let mut destination = MockPdsAgent::new();
        origin
            .expect_check_account_status()
            .times(2)
            .returning(|| Ok(origin_status(true)));
        destination
            .expect_check_account_status()
            .times(2)
            .returning(|| Ok(destination_status(false, false, false)));

        let orchestrator =
            MigrationOrchestrator::with_destination(Arc::new(origin), Arc::new(destination));
        let first = orchestrator.advance().await.unwrap();
        let second = orchestrator.advance().await.unwrap();
        assert_eq!(first.step, MigrationStep::TransferData);
        assert_eq!(second.step, first.step);
    }

    /// Decisions across the whole lifecycle as each step completes
    /// externally between polls.
    #[tokio::test]
    async fn decisions_follow_remote_progress() {
        let mut origin = MockPdsAgent::new();
        let mut destination = MockPdsAgent::new();

        let origin_polls = AtomicUsize::new(0);
        origin.expect_check_account_status().returning(move || {
            let n = origin_polls.fetch_add(1, Ordering::SeqCst);
            // Origin is deactivated only after finalize ran.
            Ok(origin_status(n < 3))
        });
        let destination_polls = AtomicUsize::new(0);
        destination
            .expect_check_account_status()
            .returning(move || {
                let n = destination_polls.fetch_add(1, Ordering::SeqCst);
                Ok(match n {
                    0 => destination_status(false, false, false),
                    1 => destination_status(true, false, false),
                    2 => destination_status(true, true, false),
                    _ => destination_status(true, true, true),
                })
            });

        let orchestrator =
            MigrationOrchestrator::with_destination(Arc::new(origin), Arc::new(destination));

        let mut steps = Vec::new();
        for _ in 0..4 {
            let decision = orchestrator.advance().await.unwrap();
            steps.push(decision.next_step);
        }
        assert_eq!(steps, vec![Some(2), Some(3), Some(4), None]);

        let final_decision = orchestrator.advance().await.unwrap();
        assert!(final_decision.completed);
    }

    #[tokio::test]
    async fn decision_carries_merged_status() {
        let mut origin = MockPdsAgent::new();
        let mut destination = MockPdsAgent::new();
        origin
            .expect_check_account_status()
            .returning(|| Ok(origin_status(true)));
        destination
            .expect_check_account_status()
            .returning(|| Ok(destination_status(false, false, false)));

        let orchestrator =
            MigrationOrchestrator::with_destination(Arc::new(origin), Arc::new(destination));
        let decision = orchestrator.advance().await.unwrap();
        let status = decision.current_status.unwrap();
        // Expected records come from the origin, the rest from the destination.
        assert_eq!(status.expected_records, 10);
        assert_eq!(status.indexed_records, 0);
        assert!(!status.activated);
    }

    #[tokio::test]
    async fn readiness_reports_unmet_conditions() {
        let mut origin = MockPdsAgent::new();
        let mut destination = MockPdsAgent::new();
        origin
            .expect_check_account_status()
            .returning(|| Ok(origin_status(true)));
        destination
            .expect_check_account_status()
            .returning(|| Ok(destination_status(false, false, false)));

        let orchestrator =
            MigrationOrchestrator::with_destination(Arc::new(origin), Arc::new(destination));
        let report = orchestrator
            .readiness(MigrationStep::TransferData)
            .await
            .unwrap();
        assert!(!report.ready);
        let reason = report.reason.unwrap();
        assert!(reason.contains("Repository not imported."));
        assert!(reason.contains("Not all blobs imported."));
    }

    #[tokio::test]
    async fn step_runners_require_a_destination() {
        let origin = MockPdsAgent::new();
        let orchestrator = MigrationOrchestrator::new(Arc::new(origin));
        assert!(matches!(
            orchestrator.run_finalize().await,
            Err(MigrationError::MissingDestination)
        ));
        assert!(matches!(
            orchestrator.run_identity_sign("059762").await,
            Err(MigrationError::MissingDestination)
        ));
    }
}
