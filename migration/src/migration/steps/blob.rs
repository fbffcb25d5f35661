//! Paginated blob copy from origin to destination.

use cid::Cid;
use tracing::info;

use crate::client::agent::PdsAgent;
use crate::migration::progress::{MigrationEvent, ProgressReporter};
use crate::migration::types::{BlobTransferAbort, BlobTransferReport, FailedBlob};

/// Largest blob the transfer will attempt, by declared content length.
pub const MAX_BLOB_BYTES: u64 = 95 * 1024 * 1024;

/// Copy every blob the origin lists into the destination.
///
/// Failure policy, in order of severity:
/// - a single blob failing to fetch or upload is recorded and skipped;
/// - a listing failure that signals a dead session aborts the run, with
///   the progress so far attached to the abort value;
/// - any other listing failure stops pagination and returns the partial
///   report marked `truncated`.
///
/// Re-running after a partial run is safe: blobs already present on the
/// destination are deduplicated by CID, so a repeated upload is a no-op.
pub async fn transfer_blobs(
    origin: &dyn PdsAgent,
    destination: &dyn PdsAgent,
    reporter: &dyn ProgressReporter,
) -> Result<BlobTransferReport, BlobTransferAbort> {
    let mut report = BlobTransferReport::default();
    let mut cursor: Option<String> = None;

    loop {
        let page = match origin.list_blobs(cursor.clone()).await {
            Ok(page) => page,
            Err(e) if e.is_auth() => {
                return Err(BlobTransferAbort {
                    partial: report,
                    source: e,
                });
            }
            Err(e) => {
                reporter.report(MigrationEvent::BlobListingTruncated {
                    reason: e.to_string(),
                });
                report.truncated = true;
                break;
            }
        };

        for cid in &page.cids {
            match copy_blob(origin, destination, cid).await {
                Ok(()) => {
                    report.migrated.insert(*cid);
                    reporter.report(MigrationEvent::BlobMigrated { cid: *cid });
                }
                Err(reason) => {
                    reporter.report(MigrationEvent::BlobFailed {
                        cid: *cid,
                        reason: reason.clone(),
                    });
                    report.failed.push(FailedBlob { cid: *cid, reason });
                }
            }
        }

        // An absent or empty cursor ends the listing.
        match page.cursor {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => break,
        }
    }

    info!(
        migrated = report.migrated.len(),
        failed = report.failed.len(),
        truncated = report.truncated,
        "blob transfer finished"
    );
    Ok(report)
}

async fn copy_blob(
    origin: &dyn PdsAgent,
    destination: &dyn PdsAgent,
    cid: &Cid,
) -> Result<(), String> {
    let blob = origin.get_blob(cid).await.map_err(|e| e.to_string())?;
    let declared_size = blob.content_length.unwrap_or(blob.data.len() as u64);
    if declared_size > MAX_BLOB_BYTES {
        return Err(format!(
            "blob exceeds maximum size limit ({} bytes)",
            declared_size
        ));
    }
    destination
        .upload_blob(blob.data, blob.content_type)
        .await
        .map_err(|e| e.to_string())
}
