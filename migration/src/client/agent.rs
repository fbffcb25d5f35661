//! Trait boundary between the migration steps and the two remote services.
//!
//! One [`PdsAgent`] is an authenticated handle to one PDS; the orchestrator
//! owns one for the origin and, once created, one for the destination.
//! [`PdsHost`] covers the unauthenticated server-level calls needed before
//! a destination session exists.

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
#[cfg(test)]
use mockall::automock;

use super::errors::ClientResult;
use super::types::{
    AccountStatus, CreateAccountRequest, FetchedBlob, ListedBlobs, PlcCredentials,
    ServerDescription, SessionCredentials,
};

/// Authenticated operations against one PDS.
///
/// Implementations issue one remote call per method and do not retry; a
/// stalled call blocks until the caller's own timeout fires.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PdsAgent: Send + Sync {
    /// DID of the account this session belongs to.
    fn did(&self) -> String;

    /// `com.atproto.server.checkAccountStatus`
    async fn check_account_status(&self) -> ClientResult<AccountStatus>;

    /// `com.atproto.server.getServiceAuth` scoped to `aud` and optionally
    /// restricted to the lexicon method `lxm`. Returns the JWT.
    async fn get_service_auth(&self, aud: &str, lxm: Option<String>) -> ClientResult<String>;

    /// `com.atproto.sync.getRepo` — full repository snapshot as a CAR file.
    async fn export_repository(&self) -> ClientResult<Bytes>;

    /// `com.atproto.repo.importRepo` — all-or-nothing repository import.
    async fn import_repository(&self, car: Bytes) -> ClientResult<()>;

    /// `com.atproto.sync.listBlobs` — one page of the account's blob CIDs.
    async fn list_blobs(&self, cursor: Option<String>) -> ClientResult<ListedBlobs>;

    /// `com.atproto.sync.getBlob`
    async fn get_blob(&self, cid: &Cid) -> ClientResult<FetchedBlob>;

    /// `com.atproto.repo.uploadBlob` under the given content type.
    async fn upload_blob(&self, data: Bytes, content_type: Option<String>) -> ClientResult<()>;

    /// `app.bsky.actor.getPreferences`
    async fn get_preferences(&self) -> ClientResult<serde_json::Value>;

    /// `app.bsky.actor.putPreferences` — wholesale overwrite, no merge.
    async fn put_preferences(&self, preferences: serde_json::Value) -> ClientResult<()>;

    /// `com.atproto.identity.requestPlcOperationSignature` — sends the
    /// one-time signing token to the account's registered email.
    async fn request_plc_signature(&self) -> ClientResult<()>;

    /// `com.atproto.identity.getRecommendedDidCredentials`
    async fn get_recommended_credentials(&self) -> ClientResult<PlcCredentials>;

    /// `com.atproto.identity.signPlcOperation` — returns the signed
    /// operation document.
    async fn sign_plc_operation(
        &self,
        token: &str,
        credentials: &PlcCredentials,
    ) -> ClientResult<serde_json::Value>;

    /// `com.atproto.identity.submitPlcOperation`
    async fn submit_plc_operation(&self, operation: serde_json::Value) -> ClientResult<()>;

    /// `com.atproto.server.activateAccount`
    async fn activate_account(&self) -> ClientResult<()>;

    /// `com.atproto.server.deactivateAccount`
    async fn deactivate_account(&self) -> ClientResult<()>;
}

/// Unauthenticated server-level operations on a PDS host.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PdsHost: Send + Sync {
    /// `com.atproto.server.describeServer`
    async fn describe_server(&self) -> ClientResult<ServerDescription>;

    /// `com.atproto.server.createAccount`; the request's service-auth token
    /// authorizes reuse of an existing DID.
    async fn create_account(
        &self,
        request: CreateAccountRequest,
    ) -> ClientResult<SessionCredentials>;
}
