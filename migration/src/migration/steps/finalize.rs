//! Final activation swap between the two services.

use tracing::info;

use crate::client::agent::PdsAgent;
use crate::client::errors::ClientError;

/// Activate the destination account, then deactivate the origin.
///
/// The order guarantees the account is never dark on both services. If
/// origin deactivation fails after the destination is live, both accounts
/// are active at once; that state is surfaced to the caller for manual
/// intervention, never auto-corrected here.
pub async fn finalize_migration(
    origin: &dyn PdsAgent,
    destination: &dyn PdsAgent,
) -> Result<(), ClientError> {
    destination.activate_account().await?;
    origin.deactivate_account().await?;
    info!("migration finalized; origin account deactivated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;

    use crate::client::agent::MockPdsAgent;

    #[tokio::test]
    async fn destination_activates_strictly_before_origin_deactivates() {
        let mut origin = MockPdsAgent::new();
        let mut destination = MockPdsAgent::new();
        let mut seq = Sequence::new();

        destination
            .expect_activate_account()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        origin
            .expect_deactivate_account()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        finalize_migration(&origin, &destination).await.unwrap();
    }

    #[tokio::test]
    async fn activation_failure_leaves_origin_untouched() {
        let mut origin = MockPdsAgent::new();
        let mut destination = MockPdsAgent::new();

        destination
            .expect_activate_account()
            .times(1)
            .returning(|| {
                Err(ClientError::PdsOperation {
                    operation: "activateAccount".to_string(),
                    message: "account not ready".to_string(),
                })
            });
        origin.expect_deactivate_account().times(0);

        assert!(finalize_migration(&origin, &destination).await.is_err());
    }

    #[tokio::test]
    async fn deactivation_failure_surfaces_after_activation() {
        // Two simultaneously active accounts is a caller-visible terminal
        // state, not something this layer retries.
        let mut origin = MockPdsAgent::new();
        let mut destination = MockPdsAgent::new();

        destination
            .expect_activate_account()
            .times(1)
            .returning(|| Ok(()));
        origin.expect_deactivate_account().times(1).returning(|| {
            Err(ClientError::Network {
                message: "connection reset".to_string(),
            })
        });

        assert!(finalize_migration(&origin, &destination).await.is_err());
    }
}
