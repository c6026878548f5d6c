//! Canvas LMS implementation of [`IdentityVerifier`].
//!
//! Only the two calls the registry needs are implemented: reading the
//! profile that owns a bearer token, and searching a course roster for a
//! login id.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{IdentityVerifier, Profile, StudentIdentity};
use crate::RegistryError;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Canvas connection settings.
#[derive(Debug, Clone)]
pub struct CanvasConfig {
    /// API root, e.g. `https://school.instructure.com/api/v1`
    pub base_url: String,
    /// Token used for roster searches on behalf of the service
    pub service_token: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl CanvasConfig {
    /// Load from environment variables.
    ///
    /// Requires `CANVAS_BASE_URL` and `CANVAS_SERVICE_TOKEN`; reads the optional
    /// `CANVAS_TIMEOUT_SECS` (default 10).
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("CANVAS_BASE_URL").ok()?;
        let service_token = std::env::var("CANVAS_SERVICE_TOKEN").ok()?;
        if base_url.is_empty() || service_token.is_empty() {
            return None;
        }

        let timeout = std::env::var("CANVAS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Some(Self {
            base_url,
            service_token,
            timeout: Duration::from_secs(timeout),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CanvasProfile {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sortable_name: Option<String>,
    #[serde(default)]
    primary_email: Option<String>,
}

impl From<CanvasProfile> for Profile {
    fn from(p: CanvasProfile) -> Self {
        let sortable_name = p.sortable_name.or(p.name).unwrap_or_default();
        Profile {
            canvas_id: p.id.to_string(),
            sortable_name,
            primary_email: p.primary_email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CanvasUser {
    id: u64,
    name: String,
    #[serde(default)]
    login_id: Option<String>,
}

/// Picks the student from a fuzzy roster search.
///
/// When the results carry login ids, only an exact match counts. Without
/// login ids (the token may not see them) the first hit is taken.
fn pick_student(users: Vec<CanvasUser>, login_id: &str) -> Option<CanvasUser> {
    if users.iter().any(|u| u.login_id.is_some()) {
        users
            .into_iter()
            .find(|u| u.login_id.as_deref() == Some(login_id))
    } else {
        users.into_iter().next()
    }
}

/// HTTP client for the Canvas REST API.
pub struct CanvasClient {
    config: CanvasConfig,
    http: reqwest::Client,
}

impl CanvasClient {
    /// Create a new Canvas client.
    pub fn new(config: CanvasConfig) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RegistryError::ConfigError(format!("HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

fn transport_error(e: reqwest::Error) -> RegistryError {
    if e.is_timeout() {
        RegistryError::UpstreamUnavailable("Canvas request timed out".to_string())
    } else {
        RegistryError::UpstreamUnavailable(e.to_string())
    }
}

#[async_trait]
impl IdentityVerifier for CanvasClient {
    async fn verify_token(&self, raw_token: &str) -> Result<Profile, RegistryError> {
        let resp = self
            .http
            .get(self.url("users/self/profile"))
            .bearer_auth(raw_token)
            .send()
            .await
            .map_err(transport_error)?;

        match resp.status() {
            StatusCode::OK => {
                let profile: CanvasProfile = resp.json().await.map_err(transport_error)?;
                Ok(profile.into())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RegistryError::InvalidToken),
            status => Err(RegistryError::UpstreamUnavailable(format!(
                "Canvas profile request returned {status}"
            ))),
        }
    }

    async fn resolve_student(
        &self,
        course_id: &str,
        login_id: &str,
    ) -> Result<StudentIdentity, RegistryError> {
        let not_found = || RegistryError::StudentNotFound {
            login_id: login_id.to_string(),
            course_id: course_id.to_string(),
        };

        let resp = self
            .http
            .get(self.url(&format!("courses/{course_id}/search_users")))
            .bearer_auth(&self.config.service_token)
            .query(&[("search_term", login_id)])
            .send()
            .await
            .map_err(transport_error)?;

        match resp.status() {
            StatusCode::OK => {
                let users: Vec<CanvasUser> = resp.json().await.map_err(transport_error)?;
                let user = pick_student(users, login_id).ok_or_else(not_found)?;
                Ok(StudentIdentity {
                    canvas_id: user.id.to_string(),
                    full_name: user.name,
                })
            }
            StatusCode::NOT_FOUND => Err(not_found()),
            status => Err(RegistryError::UpstreamUnavailable(format!(
                "Canvas roster search returned {status}"
            ))),
        }
    }
}
