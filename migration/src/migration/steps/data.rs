//! The data-transfer step: repository snapshot, blobs, preferences.

use tracing::{info, warn};

use crate::client::agent::PdsAgent;
use crate::client::errors::ClientError;
use crate::migration::progress::{MigrationEvent, ProgressReporter};
use crate::migration::steps::blob::transfer_blobs;
use crate::migration::types::DataMigrationReport;

/// Copy the account's data from origin to destination.
///
/// The repository import is the service's own transactional unit: if it
/// fails nothing else is attempted and the error propagates. Blob and
/// preference failures after a successful import are recorded in the
/// report instead, since the import cannot be rolled back anyway.
pub async fn migrate_data(
    origin: &dyn PdsAgent,
    destination: &dyn PdsAgent,
    reporter: &dyn ProgressReporter,
) -> Result<DataMigrationReport, ClientError> {
    let car = origin.export_repository().await?;
    reporter.report(MigrationEvent::RepositoryExported {
        bytes: car.len() as u64,
    });
    destination.import_repository(car).await?;
    reporter.report(MigrationEvent::RepositoryImported);

    let (blobs, blob_abort) = match transfer_blobs(origin, destination, reporter).await {
        Ok(report) => (report, None),
        Err(abort) => {
            warn!(
                migrated = abort.partial.migrated.len(),
                "blob transfer aborted: {}", abort.source
            );
            (abort.partial, Some(abort.source))
        }
    };

    let preferences_error = match migrate_preferences(origin, destination).await {
        Ok(()) => {
            reporter.report(MigrationEvent::PreferencesMigrated);
            None
        }
        Err(e) => {
            warn!("preference migration failed: {}", e);
            Some(e)
        }
    };

    info!(
        blobs_migrated = blobs.migrated.len(),
        blobs_failed = blobs.failed.len(),
        aborted = blob_abort.is_some(),
        "data migration finished"
    );
    Ok(DataMigrationReport {
        blobs,
        blob_abort,
        preferences_error,
    })
}

/// Overwrite the destination's preferences with the origin's, wholesale.
async fn migrate_preferences(
    origin: &dyn PdsAgent,
    destination: &dyn PdsAgent,
) -> Result<(), ClientError> {
    let preferences = origin.get_preferences().await?;
    destination.put_preferences(preferences).await
}
