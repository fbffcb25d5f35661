//! Result and error shapes for the migration steps.

use std::collections::BTreeSet;

use cid::Cid;
use serde::Serialize;
use thiserror::Error;

use crate::client::errors::ClientError;
use crate::client::types::AccountStatus;
use crate::crypto::RecoveryKeypair;
use crate::status::MigrationStep;

/// A blob that could not be copied; the batch continues past it.
#[derive(Debug, Clone)]
pub struct FailedBlob {
    pub cid: Cid,
    pub reason: String,
}

/// Accumulated outcome of one blob-transfer run.
#[derive(Debug, Clone, Default)]
pub struct BlobTransferReport {
    pub migrated: BTreeSet<Cid>,
    pub failed: Vec<FailedBlob>,
    /// Listing stopped early on a non-auth error; the report covers only
    /// the pages seen before that.
    pub truncated: bool,
}

impl BlobTransferReport {
    /// Every listed blob was copied and the full listing was seen.
    pub fn is_complete(&self) -> bool {
        !self.truncated && self.failed.is_empty()
    }
}

/// Fatal blob-transfer abort: the session is no longer usable.
///
/// Carries the progress accumulated before the abort so callers cannot
/// lose it by treating this as an opaque error.
#[derive(Debug, Error)]
#[error("blob transfer aborted: {source}")]
pub struct BlobTransferAbort {
    pub partial: BlobTransferReport,
    #[source]
    pub source: ClientError,
}

/// Outcome of the full data-transfer step.
///
/// The repository import either succeeded (this value exists) or the step
/// failed outright; blob and preference problems are recorded here rather
/// than rolling the import back.
#[derive(Debug)]
pub struct DataMigrationReport {
    pub blobs: BlobTransferReport,
    /// Set when the blob phase aborted on a dead session; `blobs` then
    /// holds the partial progress.
    pub blob_abort: Option<ClientError>,
    pub preferences_error: Option<ClientError>,
}

impl DataMigrationReport {
    pub fn fully_migrated(&self) -> bool {
        self.blob_abort.is_none() && self.preferences_error.is_none() && self.blobs.is_complete()
    }
}

/// Merged caller-facing view of both services' status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOverview {
    pub activated: bool,
    pub valid_did: bool,
    pub repo_commit: Option<String>,
    pub repo_rev: Option<String>,
    pub repo_blocks: Option<i64>,
    /// Record count the origin reports, i.e. what the destination should
    /// eventually index.
    pub expected_records: i64,
    pub indexed_records: i64,
    pub private_state_values: i64,
    pub expected_blobs: i64,
    pub imported_blobs: i64,
}

impl StatusOverview {
    pub fn from_statuses(origin: &AccountStatus, destination: &AccountStatus) -> Self {
        Self {
            activated: destination.activated,
            valid_did: destination.valid_did,
            repo_commit: destination.repo_commit.clone(),
            repo_rev: destination.repo_rev.clone(),
            repo_blocks: destination.repo_blocks,
            expected_records: origin.indexed_records,
            indexed_records: destination.indexed_records,
            private_state_values: destination.private_state_values,
            expected_blobs: destination.expected_blobs,
            imported_blobs: destination.imported_blobs,
        }
    }
}

/// Decision returned by [`crate::MigrationOrchestrator::advance`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationDecision {
    #[serde(skip)]
    pub step: MigrationStep,
    /// `1..=4`, or `None` when the migration is complete.
    pub next_step: Option<u8>,
    pub completed: bool,
    /// Absent until the destination account exists.
    pub current_status: Option<StatusOverview>,
}

/// Diagnostic readiness report for one named step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(flatten)]
    pub status: StatusOverview,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of the identity signing phase.
///
/// The private key is returned in exportable form and must be surfaced to
/// the account owner; losing it makes account recovery impossible.
#[derive(Debug)]
pub struct PlcTransition {
    pub recovery_key_did: String,
    pub private_key_hex: String,
    pub keypair: RecoveryKeypair,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The destination recommended no rotation keys at all; that is a
    /// server misconfiguration, not something to retry.
    #[error("destination recommended no rotation keys")]
    NoRotationKeys,
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Error)]
pub enum CreateAccountError {
    #[error("destination requires an invite code but none was provided")]
    MissingInviteCode,
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("destination session is not configured")]
    MissingDestination,
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}
