use cid::Cid;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

fn current_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Session credentials for one PDS.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionCredentials {
    pub did: String,
    pub handle: String,
    /// Base URL of the PDS this session belongs to.
    pub pds: String,
    #[serde(rename = "accessJwt")]
    pub access_jwt: String,
    #[serde(rename = "refreshJwt")]
    pub refresh_jwt: String,
    pub expires_at: Option<u64>,
}

impl SessionCredentials {
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => current_time_secs() >= expires_at,
            None => false,
        }
    }

    pub fn needs_refresh(&self) -> bool {
        match self.expires_at {
            // Refresh if within 5 minutes of expiry
            Some(expires_at) => current_time_secs() >= expires_at.saturating_sub(300),
            None => false,
        }
    }
}

/// Point-in-time account status read from one PDS.
///
/// Fetched fresh on every poll and discarded after use; a cached snapshot
/// would corrupt the next-step decision.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    #[serde(default)]
    pub activated: bool,
    #[serde(default)]
    pub valid_did: bool,
    pub repo_commit: Option<String>,
    pub repo_rev: Option<String>,
    pub repo_blocks: Option<i64>,
    #[serde(default)]
    pub indexed_records: i64,
    #[serde(default)]
    pub private_state_values: i64,
    #[serde(default)]
    pub expected_blobs: i64,
    #[serde(default)]
    pub imported_blobs: i64,
}

/// Server description fields relevant to account creation.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServerDescription {
    /// Service DID of the PDS, used as the service-auth audience.
    pub did: String,
    #[serde(default)]
    pub invite_code_required: bool,
}

/// Desired credentials for the account on the destination PDS.
#[derive(Debug, Clone)]
pub struct NewAccountParams {
    pub handle: String,
    pub email: String,
    pub password: String,
    pub invite_code: Option<String>,
}

/// `com.atproto.server.createAccount` request payload.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    /// Existing DID carried over from the origin account.
    pub did: String,
    pub handle: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    /// Sent as an Authorization header, not part of the request body.
    #[serde(skip)]
    pub service_auth_token: Option<String>,
}

/// One page of a blob listing.
#[derive(Debug, Clone, Default)]
pub struct ListedBlobs {
    pub cids: Vec<Cid>,
    /// Opaque pagination cursor; `None` or empty ends the listing.
    pub cursor: Option<String>,
}

/// Fetched blob payload with the metadata the service declared for it.
#[derive(Debug, Clone)]
pub struct FetchedBlob {
    pub data: bytes::Bytes,
    pub content_type: Option<String>,
    /// Declared Content-Length; the payload itself may be trusted when the
    /// header is absent.
    pub content_length: Option<u64>,
}

/// Recommended DID credentials returned by the destination PDS.
///
/// Everything except the rotation keys is carried opaquely; the migration
/// only ever edits the rotation-key list.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlcCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub also_known_as: Option<serde_json::Value>,
    #[serde(default)]
    pub rotation_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_methods: Option<serde_json::Value>,
}
