//! Two-phase PLC identity transfer.
//!
//! Phase one asks the origin to email a one-time signing token to the
//! account owner. Phase two runs once the caller has that token: it builds
//! the new rotation-key set around a freshly generated recovery key, has
//! the origin sign the PLC operation, and submits it to the destination.
//! There is no partial state to resume between the sub-steps of phase two;
//! on failure the whole phase re-runs with a fresh token.

use tracing::info;

use crate::client::agent::PdsAgent;
use crate::client::errors::ClientError;
use crate::crypto::RecoveryKeypair;
use crate::migration::types::{IdentityError, PlcTransition};

/// Ask the origin to send the PLC signing token to the account's email.
///
/// Must only be called once the data transfer is verified complete; the
/// token invalidates on use and a premature identity transfer would leave
/// the DID pointing at an incomplete account.
pub async fn request_identity_transfer(origin: &dyn PdsAgent) -> Result<(), ClientError> {
    origin.request_plc_signature().await
}

/// Sign and submit the PLC operation that moves the identity.
///
/// The returned keypair is the account's new recovery key; the caller must
/// persist the private key out-of-band or recovery becomes impossible.
pub async fn sign_identity_transfer(
    origin: &dyn PdsAgent,
    destination: &dyn PdsAgent,
    token: &str,
) -> Result<PlcTransition, IdentityError> {
    let keypair = RecoveryKeypair::generate();
    let recovery_key_did = keypair.did();

    let mut credentials = destination.get_recommended_credentials().await?;
    if credentials.rotation_keys.is_empty() {
        return Err(IdentityError::NoRotationKeys);
    }
    // Recovery key goes first so it outranks the destination's own keys.
    credentials
        .rotation_keys
        .insert(0, recovery_key_did.clone());

    let operation = origin.sign_plc_operation(token, &credentials).await?;
    destination.submit_plc_operation(operation).await?;

    info!(%recovery_key_did, "PLC operation submitted; recovery key custody is now the caller's");
    Ok(PlcTransition {
        private_key_hex: keypair.to_hex(),
        recovery_key_did,
        keypair,
    })
}
