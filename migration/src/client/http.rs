//! `reqwest` implementations of the PDS transport traits.
//!
//! Every method maps to one XRPC endpoint. Failed responses are classified
//! into [`ClientError`] kinds at this boundary: HTTP 401/403 and the
//! token-related XRPC error codes become auth kinds, everything else stays
//! an ordinary operation failure.

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::convert::TryFrom;
use tracing::{error, info, instrument};

use super::agent::{PdsAgent, PdsHost};
use super::errors::{ClientError, ClientResult};
use super::types::{
    AccountStatus, CreateAccountRequest, FetchedBlob, ListedBlobs, PlcCredentials,
    ServerDescription, SessionCredentials,
};

const USER_AGENT: &str = concat!("pds-migration/", env!("CARGO_PKG_VERSION"));

/// Page size for `com.atproto.sync.listBlobs`.
const LIST_BLOBS_PAGE_SIZE: u32 = 500;

fn build_http_client() -> ClientResult<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ClientError::Network {
            message: format!("failed to build HTTP client: {}", e),
        })
}

fn network_error(operation: &str, err: reqwest::Error) -> ClientError {
    ClientError::Network {
        message: format!("{}: {}", operation, err),
    }
}

/// Structured XRPC error body, e.g. `{"error":"ExpiredToken","message":"..."}`.
#[derive(Deserialize, Default)]
struct XrpcErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Classify a failed XRPC response into an error kind.
async fn classify_failure(operation: &str, response: Response) -> ClientError {
    let status = response.status();
    let body_text = response.text().await.unwrap_or_default();
    let body: XrpcErrorBody = serde_json::from_str(&body_text).unwrap_or_default();
    let code = body.error.unwrap_or_default();
    let message = body.message.unwrap_or(body_text);

    error!(operation, %status, code, "PDS call failed: {}", message);

    let auth_code = matches!(
        code.as_str(),
        "ExpiredToken" | "InvalidToken" | "AuthenticationRequired" | "AuthMissing"
    );
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN || auth_code {
        if code == "ExpiredToken" {
            ClientError::SessionExpired
        } else {
            ClientError::Auth {
                message: format!("{} rejected: {}", operation, message),
            }
        }
    } else {
        ClientError::PdsOperation {
            operation: operation.to_string(),
            message,
        }
    }
}

/// Authenticated client for one PDS.
#[derive(Clone)]
pub struct HttpPdsAgent {
    http_client: Client,
    session: SessionCredentials,
}

impl HttpPdsAgent {
    pub fn new(session: SessionCredentials) -> ClientResult<Self> {
        Ok(Self {
            http_client: build_http_client()?,
            session,
        })
    }

    /// Reuse an existing client, e.g. the one that performed the login.
    pub fn with_client(http_client: Client, session: SessionCredentials) -> Self {
        Self {
            http_client,
            session,
        }
    }

    pub fn session(&self) -> &SessionCredentials {
        &self.session
    }

    fn xrpc_url(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.session.pds, nsid)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.session.access_jwt)
    }
}

#[async_trait]
impl PdsAgent for HttpPdsAgent {
    fn did(&self) -> String {
        self.session.did.clone()
    }

    #[instrument(skip(self), err)]
    async fn check_account_status(&self) -> ClientResult<AccountStatus> {
        let operation = "checkAccountStatus";
        let response = self
            .http_client
            .get(self.xrpc_url("com.atproto.server.checkAccountStatus"))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        let status: AccountStatus = response
            .json()
            .await
            .map_err(|e| network_error(operation, e))?;
        Ok(status)
    }

    #[instrument(skip(self), err)]
    async fn get_service_auth(&self, aud: &str, lxm: Option<String>) -> ClientResult<String> {
        let operation = "getServiceAuth";
        let mut query: Vec<(&str, &str)> = vec![("aud", aud)];
        if let Some(lxm) = lxm.as_deref() {
            query.push(("lxm", lxm));
        }
        let response = self
            .http_client
            .get(self.xrpc_url("com.atproto.server.getServiceAuth"))
            .query(&query)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| network_error(operation, e))?;
        body.get("token")
            .and_then(|t| t.as_str())
            .map(String::from)
            .ok_or_else(|| ClientError::InvalidResponse {
                expected: "token field".to_string(),
                got: body.to_string(),
            })
    }

    #[instrument(skip(self), err)]
    async fn export_repository(&self) -> ClientResult<Bytes> {
        let operation = "getRepo";
        info!("Exporting repository for DID: {}", self.session.did);
        let response = self
            .http_client
            .get(self.xrpc_url("com.atproto.sync.getRepo"))
            .query(&[("did", self.session.did.as_str())])
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        let car = response
            .bytes()
            .await
            .map_err(|e| network_error(operation, e))?;
        info!("Repository exported, {} bytes", car.len());
        Ok(car)
    }

    #[instrument(skip(self, car), err)]
    async fn import_repository(&self, car: Bytes) -> ClientResult<()> {
        let operation = "importRepo";
        info!(
            "Importing repository for DID: {}, {} bytes",
            self.session.did,
            car.len()
        );
        let response = self
            .http_client
            .post(self.xrpc_url("com.atproto.repo.importRepo"))
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/vnd.ipld.car")
            .body(car)
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        info!("Repository imported successfully");
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_blobs(&self, cursor: Option<String>) -> ClientResult<ListedBlobs> {
        let operation = "listBlobs";
        let limit = LIST_BLOBS_PAGE_SIZE.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("did", self.session.did.as_str()),
            ("limit", limit.as_str()),
        ];
        if let Some(cursor) = cursor.as_deref() {
            query.push(("cursor", cursor));
        }
        let response = self
            .http_client
            .get(self.xrpc_url("com.atproto.sync.listBlobs"))
            .query(&query)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| network_error(operation, e))?;

        let mut cids = Vec::new();
        for value in body
            .get("cids")
            .and_then(|c| c.as_array())
            .into_iter()
            .flatten()
        {
            let text = value.as_str().ok_or_else(|| ClientError::InvalidResponse {
                expected: "CID string".to_string(),
                got: value.to_string(),
            })?;
            let cid = Cid::try_from(text).map_err(|e| ClientError::InvalidResponse {
                expected: "valid CID".to_string(),
                got: format!("{} ({})", text, e),
            })?;
            cids.push(cid);
        }
        let next_cursor = body
            .get("cursor")
            .and_then(|c| c.as_str())
            .map(|s| s.to_string());

        Ok(ListedBlobs {
            cids,
            cursor: next_cursor,
        })
    }

    #[instrument(skip(self), err)]
    async fn get_blob(&self, cid: &Cid) -> ClientResult<FetchedBlob> {
        let operation = "getBlob";
        let cid_text = cid.to_string();
        let response = self
            .http_client
            .get(self.xrpc_url("com.atproto.sync.getBlob"))
            .query(&[
                ("did", self.session.did.as_str()),
                ("cid", cid_text.as_str()),
            ])
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let content_length = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let data = response
            .bytes()
            .await
            .map_err(|e| network_error(operation, e))?;

        Ok(FetchedBlob {
            data,
            content_type,
            content_length,
        })
    }

    #[instrument(skip(self, data), err)]
    async fn upload_blob(&self, data: Bytes, content_type: Option<String>) -> ClientResult<()> {
        let operation = "uploadBlob";
        let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
        let response = self
            .http_client
            .post(self.xrpc_url("com.atproto.repo.uploadBlob"))
            .header("Authorization", self.bearer())
            .header("Content-Type", content_type)
            .header("Content-Length", data.len().to_string())
            .body(data)
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get_preferences(&self) -> ClientResult<serde_json::Value> {
        let operation = "getPreferences";
        let response = self
            .http_client
            .get(self.xrpc_url("app.bsky.actor.getPreferences"))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| network_error(operation, e))
    }

    #[instrument(skip(self, preferences), err)]
    async fn put_preferences(&self, preferences: serde_json::Value) -> ClientResult<()> {
        let operation = "putPreferences";
        // Forward the preferences array exactly as exported; last writer wins.
        let body = serde_json::json!({
            "preferences": preferences.get("preferences").cloned()
                .unwrap_or_else(|| serde_json::json!([])),
        });
        let response = self
            .http_client
            .post(self.xrpc_url("app.bsky.actor.putPreferences"))
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn request_plc_signature(&self) -> ClientResult<()> {
        let operation = "requestPlcOperationSignature";
        let response = self
            .http_client
            .post(self.xrpc_url("com.atproto.identity.requestPlcOperationSignature"))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        info!("PLC signing token sent to the account's email");
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get_recommended_credentials(&self) -> ClientResult<PlcCredentials> {
        let operation = "getRecommendedDidCredentials";
        let response = self
            .http_client
            .get(self.xrpc_url("com.atproto.identity.getRecommendedDidCredentials"))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| network_error(operation, e))
    }

    #[instrument(skip(self, token, credentials), err)]
    async fn sign_plc_operation(
        &self,
        token: &str,
        credentials: &PlcCredentials,
    ) -> ClientResult<serde_json::Value> {
        let operation = "signPlcOperation";
        let payload = serde_json::json!({
            "token": token,
            "alsoKnownAs": credentials.also_known_as,
            "rotationKeys": credentials.rotation_keys,
            "services": credentials.services,
            "verificationMethods": credentials.verification_methods,
        });
        let response = self
            .http_client
            .post(self.xrpc_url("com.atproto.identity.signPlcOperation"))
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| network_error(operation, e))?;
        body.get("operation")
            .cloned()
            .ok_or_else(|| ClientError::InvalidResponse {
                expected: "operation field".to_string(),
                got: body.to_string(),
            })
    }

    #[instrument(skip(self, operation), err)]
    async fn submit_plc_operation(&self, operation: serde_json::Value) -> ClientResult<()> {
        let operation_name = "submitPlcOperation";
        let response = self
            .http_client
            .post(self.xrpc_url("com.atproto.identity.submitPlcOperation"))
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "operation": operation }))
            .send()
            .await
            .map_err(|e| network_error(operation_name, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation_name, response).await);
        }
        info!("PLC operation submitted successfully");
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn activate_account(&self) -> ClientResult<()> {
        let operation = "activateAccount";
        // POST with no body per the lexicon.
        let response = self
            .http_client
            .post(self.xrpc_url("com.atproto.server.activateAccount"))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        info!("Account activated for DID: {}", self.session.did);
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn deactivate_account(&self) -> ClientResult<()> {
        let operation = "deactivateAccount";
        let response = self
            .http_client
            .post(self.xrpc_url("com.atproto.server.deactivateAccount"))
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        info!("Account deactivated for DID: {}", self.session.did);
        Ok(())
    }
}

/// Unauthenticated client for server-level calls on one PDS host.
#[derive(Clone)]
pub struct HttpPdsHost {
    http_client: Client,
    base_url: String,
}

impl HttpPdsHost {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        Ok(Self {
            http_client: build_http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn xrpc_url(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.base_url, nsid)
    }

    /// `com.atproto.server.createSession` — authenticate against this host
    /// and return credentials usable to build an [`HttpPdsAgent`].
    #[instrument(skip(self, password), err)]
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> ClientResult<SessionCredentials> {
        let operation = "createSession";
        let response = self
            .http_client
            .post(self.xrpc_url("com.atproto.server.createSession"))
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "identifier": identifier,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        let session = parse_session(
            response
                .json()
                .await
                .map_err(|e| network_error(operation, e))?,
            &self.base_url,
        )?;
        info!("Logged in as {} on {}", session.did, self.base_url);
        Ok(session)
    }

    /// Build an authenticated agent for a session created on this host.
    pub fn agent(&self, session: SessionCredentials) -> HttpPdsAgent {
        HttpPdsAgent::with_client(self.http_client.clone(), session)
    }
}

fn parse_session(body: serde_json::Value, pds: &str) -> ClientResult<SessionCredentials> {
    let field = |name: &str| -> ClientResult<String> {
        body.get(name)
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| ClientError::InvalidResponse {
                expected: format!("{} field", name),
                got: body.to_string(),
            })
    };
    Ok(SessionCredentials {
        did: field("did")?,
        handle: field("handle")?,
        pds: pds.to_string(),
        access_jwt: field("accessJwt")?,
        refresh_jwt: field("refreshJwt")?,
        expires_at: None,
    })
}

#[async_trait]
impl PdsHost for HttpPdsHost {
    #[instrument(skip(self), err)]
    async fn describe_server(&self) -> ClientResult<ServerDescription> {
        let operation = "describeServer";
        let response = self
            .http_client
            .get(self.xrpc_url("com.atproto.server.describeServer"))
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| network_error(operation, e))
    }

    #[instrument(skip(self, request), err)]
    async fn create_account(
        &self,
        request: CreateAccountRequest,
    ) -> ClientResult<SessionCredentials> {
        let operation = "createAccount";
        info!(
            "Creating account {} with existing DID {}",
            request.handle, request.did
        );
        let mut builder = self
            .http_client
            .post(self.xrpc_url("com.atproto.server.createAccount"))
            .header("Content-Type", "application/json");
        if let Some(token) = request.service_auth_token.as_deref() {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|e| network_error(operation, e))?;

        if !response.status().is_success() {
            return Err(classify_failure(operation, response).await);
        }
        let session = parse_session(
            response
                .json()
                .await
                .map_err(|e| network_error(operation, e))?,
            &self.base_url,
        )?;
        info!("Account created, DID: {}", session.did);
        Ok(session)
    }
}
