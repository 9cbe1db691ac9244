//! Hosted-realm directory.
//!
//! A realm is a server that only has an address while it is awake; the
//! directory tells us which realms an account can join and where a given
//! realm currently lives.

use std::future::Future;

use serde::Deserialize;

use crate::{Identity, RealmError};

/// Production directory endpoint.
pub const REALMS_URL: &str = "https://pc.realms.minecraft.net";

/// Client version sent in the session cookie.
pub const DEFAULT_CLIENT_VERSION: &str = "1.20.4";

/// Looks up hosted realms for an identity.
pub trait RealmDirectory: Send + Sync + 'static {
    /// Human-readable lines describing the realms the identity can join.
    fn list_candidate_realms(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Vec<String>, RealmError>> + Send;

    /// Accepts the directory's terms of service for this identity.
    fn accept_terms(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<(), RealmError>> + Send;

    /// Asks where `realm_id` can be joined.
    ///
    /// Returns `Ok(None)` while the realm is still starting up.
    fn resolve_address(
        &self,
        identity: &Identity,
        realm_id: i64,
    ) -> impl Future<Output = Result<Option<String>, RealmError>> + Send;
}

// ---------------------------------------------------------------------------
// RealmsClient
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WorldList {
    #[serde(default)]
    servers: Vec<World>,
}

#[derive(Debug, Deserialize)]
struct World {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    motd: String,
}

#[derive(Debug, Deserialize)]
struct JoinInfo {
    #[serde(default)]
    address: Option<String>,
}

/// HTTP client for the hosted-realm API.
#[derive(Debug, Clone)]
pub struct RealmsClient {
    client: reqwest::Client,
    base_url: String,
    version: String,
}

impl RealmsClient {
    /// Client for the production directory.
    pub fn new() -> Self {
        Self::with_base_url(REALMS_URL)
    }

    /// Client for a directory at `base_url` (no trailing slash).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            version: DEFAULT_CLIENT_VERSION.to_string(),
        }
    }

    /// Overrides the client version reported to the directory.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    fn get(&self, path: &str, identity: &Identity) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .header(reqwest::header::COOKIE, session_cookie(identity, &self.version))
    }
}

impl Default for RealmsClient {
    fn default() -> Self {
        Self::new()
    }
}

/// The cookie the directory uses to identify the caller.
pub fn session_cookie(identity: &Identity, version: &str) -> String {
    format!(
        "sid=token:{}:{};user={};version={version}",
        identity.access_token().unwrap_or_default(),
        identity.profile_id().unwrap_or_default(),
        identity.username(),
    )
}

async fn error_for_status(resp: reqwest::Response) -> RealmError {
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    RealmError::Status { status, message }
}

impl RealmDirectory for RealmsClient {
    async fn list_candidate_realms(&self, identity: &Identity) -> Result<Vec<String>, RealmError> {
        let resp = self.get("/worlds", identity).send().await?;
        if !resp.status().is_success() {
            return Err(error_for_status(resp).await);
        }
        let worlds: WorldList = resp.json().await?;
        Ok(worlds
            .servers
            .iter()
            .map(|w| format!("{}: {} by {} ({})", w.id, w.name, w.owner, w.motd))
            .collect())
    }

    async fn accept_terms(&self, identity: &Identity) -> Result<(), RealmError> {
        let resp = self
            .client
            .post(format!("{}/mco/tos/agree", self.base_url))
            .header(reqwest::header::COOKIE, session_cookie(identity, &self.version))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_for_status(resp).await);
        }
        Ok(())
    }

    async fn resolve_address(
        &self,
        identity: &Identity,
        realm_id: i64,
    ) -> Result<Option<String>, RealmError> {
        let resp = self
            .get(&format!("/worlds/v1/{realm_id}/join/pc"), identity)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(error_for_status(resp).await);
        }
        let info: JoinInfo = resp.json().await?;
        Ok(info.address.filter(|a| !a.is_empty()))
    }
}
