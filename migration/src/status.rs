//! Next-step derivation from account status.
//!
//! Nothing here is persisted: the pending step is recomputed from a fresh
//! pair of [`AccountStatus`] snapshots every time it is needed, which is
//! what makes an interrupted migration resumable. The checks form a strict
//! precondition chain and each one is re-verified on every call, since a
//! snapshot can regress between polls.

use serde::{Deserialize, Serialize};

use crate::client::types::AccountStatus;

/// One step of the migration process, derived from live status and never
/// stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationStep {
    /// Step 1: create the account on the destination under the origin DID.
    CreateAccount,
    /// Step 2: repository snapshot, blobs, and preferences.
    TransferData,
    /// Step 3: PLC identity transfer.
    EstablishIdentity,
    /// Step 4: activate destination, deactivate origin.
    Finalize,
    /// Nothing left to do.
    Completed,
}

impl MigrationStep {
    /// Step number as surfaced to callers; `None` once completed.
    pub fn step_number(&self) -> Option<u8> {
        match self {
            MigrationStep::CreateAccount => Some(1),
            MigrationStep::TransferData => Some(2),
            MigrationStep::EstablishIdentity => Some(3),
            MigrationStep::Finalize => Some(4),
            MigrationStep::Completed => None,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(MigrationStep::CreateAccount),
            2 => Some(MigrationStep::TransferData),
            3 => Some(MigrationStep::EstablishIdentity),
            4 => Some(MigrationStep::Finalize),
            _ => None,
        }
    }
}

/// Whether the destination holds everything the origin reports.
fn data_transfer_complete(origin: &AccountStatus, destination: &AccountStatus) -> bool {
    destination.repo_commit.is_some()
        && destination.indexed_records == origin.indexed_records
        && destination.private_state_values == origin.private_state_values
        && destination.expected_blobs == destination.imported_blobs
        && destination.imported_blobs == origin.imported_blobs
}

/// Compute the next required step from a fresh pair of snapshots.
///
/// `destination` is `None` until the destination account exists.
pub fn next_step(origin: &AccountStatus, destination: Option<&AccountStatus>) -> MigrationStep {
    let Some(destination) = destination else {
        return MigrationStep::CreateAccount;
    };
    if !data_transfer_complete(origin, destination) {
        return MigrationStep::TransferData;
    }
    if !destination.valid_did {
        return MigrationStep::EstablishIdentity;
    }
    if !(destination.activated && !origin.activated) {
        return MigrationStep::Finalize;
    }
    MigrationStep::Completed
}

/// Readiness of a single named step, with every unmet sub-condition listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReadiness {
    pub ready: bool,
    pub reasons: Vec<String>,
}

impl StepReadiness {
    fn ready() -> Self {
        Self {
            ready: true,
            reasons: Vec::new(),
        }
    }

    fn blocked(reasons: Vec<String>) -> Self {
        Self {
            ready: false,
            reasons,
        }
    }

    /// All reasons joined for display, `None` when ready.
    pub fn reason(&self) -> Option<String> {
        if self.reasons.is_empty() {
            None
        } else {
            Some(self.reasons.join(", "))
        }
    }
}

/// Evaluate one step's own condition in isolation.
///
/// Unlike [`next_step`] this does not short-circuit: every unmet
/// sub-condition is enumerated so the caller can report exactly what is
/// still missing.
pub fn readiness_for(
    step: MigrationStep,
    origin: &AccountStatus,
    destination: Option<&AccountStatus>,
) -> StepReadiness {
    match step {
        MigrationStep::CreateAccount => {
            if destination.is_some() {
                StepReadiness::ready()
            } else {
                StepReadiness::blocked(vec!["New account status not available.".to_string()])
            }
        }
        MigrationStep::TransferData => {
            let Some(destination) = destination else {
                return StepReadiness::blocked(vec![
                    "New account status not available.".to_string()
                ]);
            };
            if data_transfer_complete(origin, destination) {
                return StepReadiness::ready();
            }
            let mut reasons = Vec::new();
            if destination.repo_commit.is_none() {
                reasons.push("Repository not imported.".to_string());
            }
            if destination.indexed_records < origin.indexed_records {
                reasons.push("Not all records imported.".to_string());
            }
            if destination.private_state_values < origin.private_state_values {
                reasons.push("Not all private state values imported.".to_string());
            }
            if destination.expected_blobs != destination.imported_blobs {
                reasons.push("Expected blobs not fully imported.".to_string());
            }
            if destination.imported_blobs < origin.imported_blobs {
                reasons.push("Not all blobs imported.".to_string());
            }
            StepReadiness::blocked(reasons)
        }
        MigrationStep::EstablishIdentity => {
            let Some(destination) = destination else {
                return StepReadiness::blocked(vec![
                    "New account status not available.".to_string()
                ]);
            };
            if destination.valid_did {
                StepReadiness::ready()
            } else {
                StepReadiness::blocked(vec!["DID not valid.".to_string()])
            }
        }
        MigrationStep::Finalize => {
            let Some(destination) = destination else {
                return StepReadiness::blocked(vec![
                    "New account status not available.".to_string()
                ]);
            };
            let mut reasons = Vec::new();
            if !destination.activated {
                reasons.push("New account not activated.".to_string());
            }
            if origin.activated {
                reasons.push("Old account still activated.".to_string());
            }
            if reasons.is_empty() {
                StepReadiness::ready()
            } else {
                StepReadiness::blocked(reasons)
            }
        }
        MigrationStep::Completed => {
            StepReadiness::blocked(vec!["Not a runnable migration step.".to_string()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin_status() -> AccountStatus {
        AccountStatus {
            activated: true,
            valid_did: true,
            repo_commit: Some("bafyorigin".to_string()),
            repo_rev: Some("3juf".to_string()),
            repo_blocks: Some(42),
            indexed_records: 10,
            private_state_values: 2,
            expected_blobs: 3,
            imported_blobs: 3,
        }
    }

    fn migrated_destination() -> AccountStatus {
        AccountStatus {
            activated: false,
            valid_did: false,
            repo_commit: Some("bafydest".to_string()),
            repo_rev: Some("3juf".to_string()),
            repo_blocks: Some(42),
            indexed_records: 10,
            private_state_values: 2,
            expected_blobs: 3,
            imported_blobs: 3,
        }
    }

    #[test]
    fn missing_destination_requires_account_creation() {
        assert_eq!(
            next_step(&origin_status(), None),
            MigrationStep::CreateAccount
        );
    }

    #[test]
    fn empty_destination_requires_data_transfer() {
        let destination = AccountStatus {
            activated: false,
            ..AccountStatus::default()
        };
        // Origin has records and blobs the destination lacks.
        assert_eq!(
            next_step(&origin_status(), Some(&destination)),
            MigrationStep::TransferData
        );
    }

    #[test]
    fn complete_data_never_yields_transfer_step() {
        let destination = migrated_destination();
        let step = next_step(&origin_status(), Some(&destination));
        assert_ne!(step, MigrationStep::TransferData);
        assert_eq!(step, MigrationStep::EstablishIdentity);
    }

    #[test]
    fn partial_blob_import_requires_data_transfer() {
        let mut destination = migrated_destination();
        destination.imported_blobs = 2;
        destination.expected_blobs = 3;
        assert_eq!(
            next_step(&origin_status(), Some(&destination)),
            MigrationStep::TransferData
        );
    }

    #[test]
    fn valid_did_but_inactive_requires_finalize() {
        let mut destination = migrated_destination();
        destination.valid_did = true;
        assert_eq!(
            next_step(&origin_status(), Some(&destination)),
            MigrationStep::Finalize
        );
    }

    #[test]
    fn both_active_is_not_completed() {
        // Origin deactivation failed after destination activation: finalize
        // must still be the pending step.
        let mut destination = migrated_destination();
        destination.valid_did = true;
        destination.activated = true;
        let origin = origin_status(); // still activated
        assert_eq!(
            next_step(&origin, Some(&destination)),
            MigrationStep::Finalize
        );
    }

    #[test]
    fn finished_migration_is_completed() {
        let mut destination = migrated_destination();
        destination.valid_did = true;
        destination.activated = true;
        let mut origin = origin_status();
        origin.activated = false;
        assert_eq!(
            next_step(&origin, Some(&destination)),
            MigrationStep::Completed
        );
    }

    #[test]
    fn transfer_readiness_enumerates_all_unmet_conditions() {
        // Destination missing the repo commit and behind on blobs must list
        // both reasons, not just the first.
        let destination = AccountStatus {
            indexed_records: 10,
            private_state_values: 2,
            expected_blobs: 1,
            imported_blobs: 1,
            ..AccountStatus::default()
        };
        let readiness = readiness_for(
            MigrationStep::TransferData,
            &origin_status(),
            Some(&destination),
        );
        assert!(!readiness.ready);
        assert!(readiness
            .reasons
            .contains(&"Repository not imported.".to_string()));
        assert!(readiness
            .reasons
            .contains(&"Not all blobs imported.".to_string()));
    }

    #[test]
    fn transfer_readiness_when_complete() {
        let readiness = readiness_for(
            MigrationStep::TransferData,
            &origin_status(),
            Some(&migrated_destination()),
        );
        assert!(readiness.ready);
        assert_eq!(readiness.reason(), None);
    }

    #[test]
    fn finalize_readiness_lists_both_activation_conditions() {
        let destination = migrated_destination(); // not activated
        let origin = origin_status(); // still activated
        let readiness = readiness_for(MigrationStep::Finalize, &origin, Some(&destination));
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reasons,
            vec![
                "New account not activated.".to_string(),
                "Old account still activated.".to_string(),
            ]
        );
    }

    #[test]
    fn readiness_without_destination_is_blocked() {
        for step in [
            MigrationStep::TransferData,
            MigrationStep::EstablishIdentity,
            MigrationStep::Finalize,
        ] {
            let readiness = readiness_for(step, &origin_status(), None);
            assert!(!readiness.ready, "{:?} should be blocked", step);
        }
        assert!(readiness_for(MigrationStep::CreateAccount, &origin_status(), None)
            .reason()
            .is_some());
    }

    #[test]
    fn step_number_round_trip() {
        for n in 1..=4 {
            assert_eq!(MigrationStep::from_number(n).unwrap().step_number(), Some(n));
        }
        assert_eq!(MigrationStep::Completed.step_number(), None);
        assert_eq!(MigrationStep::from_number(5), None);
    }

    /// Successive decisions as each step completes externally, for a
    /// 10-record, 3-blob account.
    #[test]
    fn step_sequence_over_successive_polls() {
        let mut origin = origin_status();
        let mut destination = AccountStatus::default();

        assert_eq!(
            next_step(&origin, Some(&destination)),
            MigrationStep::TransferData
        );

        // Data migrated; DID still points at the origin.
        destination = migrated_destination();
        assert_eq!(
            next_step(&origin, Some(&destination)),
            MigrationStep::EstablishIdentity
        );

        // Identity transferred.
        destination.valid_did = true;
        assert_eq!(
            next_step(&origin, Some(&destination)),
            MigrationStep::Finalize
        );

        // Activation swapped.
        destination.activated = true;
        origin.activated = false;
        assert_eq!(
            next_step(&origin, Some(&destination)),
            MigrationStep::Completed
        );
    }
}
