//! Injectable progress observer for the data-transfer step.

use cid::Cid;
use tracing::{info, warn};

/// Progress events emitted while data is copied between services.
#[derive(Debug, Clone)]
pub enum MigrationEvent {
    RepositoryExported { bytes: u64 },
    RepositoryImported,
    BlobMigrated { cid: Cid },
    BlobFailed { cid: Cid, reason: String },
    BlobListingTruncated { reason: String },
    PreferencesMigrated,
}

/// Observer for migration progress.
///
/// The transfer loops report through this trait instead of logging
/// directly, which keeps them side-effect-free and lets front ends render
/// progress however they like.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: MigrationEvent);
}

/// Reporter that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: MigrationEvent) {}
}

/// Reporter that forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: MigrationEvent) {
        match event {
            MigrationEvent::RepositoryExported { bytes } => {
                info!(bytes, "repository exported from origin")
            }
            MigrationEvent::RepositoryImported => info!("repository imported into destination"),
            MigrationEvent::BlobMigrated { cid } => info!(%cid, "blob migrated"),
            MigrationEvent::BlobFailed { cid, reason } => {
                warn!(%cid, %reason, "blob failed, continuing")
            }
            MigrationEvent::BlobListingTruncated { reason } => {
                warn!(%reason, "blob listing stopped early, partial results returned")
            }
            MigrationEvent::PreferencesMigrated => info!("preferences migrated"),
        }
    }
}
