//! Account creation on the destination PDS under the origin's DID.

use tracing::info;

use crate::client::agent::{PdsAgent, PdsHost};
use crate::client::types::{CreateAccountRequest, NewAccountParams, SessionCredentials};
use crate::migration::types::CreateAccountError;

/// Lexicon method the service-auth token is restricted to.
const CREATE_ACCOUNT_LXM: &str = "com.atproto.server.createAccount";

/// Create the destination account, keyed to the origin's DID.
///
/// The origin issues a service-auth token addressed to the destination
/// server's DID; that token is what authorizes creating an account with an
/// already-existing DID.
pub async fn create_account(
    origin: &dyn PdsAgent,
    destination: &dyn PdsHost,
    params: &NewAccountParams,
) -> Result<SessionCredentials, CreateAccountError> {
    let description = destination.describe_server().await?;
    if description.invite_code_required && params.invite_code.is_none() {
        return Err(CreateAccountError::MissingInviteCode);
    }

    let service_auth = origin
        .get_service_auth(&description.did, Some(CREATE_ACCOUNT_LXM.to_string()))
        .await?;

    let session = destination
        .create_account(CreateAccountRequest {
            did: origin.did(),
            handle: params.handle.clone(),
            email: params.email.clone(),
            password: params.password.clone(),
            invite_code: params.invite_code.clone(),
            service_auth_token: Some(service_auth),
        })
        .await?;

    info!(
        did = %session.did,
        handle = %session.handle,
        "account created on destination"
    );
    Ok(session)
}
