//! Access tokens for the storage API.
//!
//! The interactive OAuth consent flow belongs to the host (a browser page, a
//! desktop helper, `gcloud auth print-access-token`). This crate only needs
//! a bearer token with the `drive.file` scope at the moment it uploads, so
//! the seam is a single async call on [`AccessTokenProvider`].

use crate::error::CaptureError;
use async_trait::async_trait;
use std::fmt;

/// Scope that lets the app see and manage only files it created itself.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Environment variable holding a ready-to-use bearer token.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_DRIVE_ACCESS_TOKEN";
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";

/// Client registration details sent alongside API calls.
#[derive(Clone, Default)]
pub struct DriveCredentials {
    /// API key, appended as `key=` to every request when present.
    pub api_key: Option<String>,
    /// OAuth client id the token was issued to.
    pub client_id: Option<String>,
    /// Requested permission scope.
    pub scope: String,
}

impl fmt::Debug for DriveCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish()
    }
}

impl DriveCredentials {
    /// Read `GOOGLE_API_KEY` and `GOOGLE_CLIENT_ID`; scope is `drive.file`.
    pub fn from_env() -> Self {
        Self {
            api_key: non_empty_env(API_KEY_ENV),
            client_id: non_empty_env(CLIENT_ID_ENV),
            scope: DRIVE_FILE_SCOPE.to_string(),
        }
    }
}

/// Produces a bearer token for each storage request sequence.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, CaptureError>;
}

/// A fixed token, e.g. pasted from an OAuth playground.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Result<Self, CaptureError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(CaptureError::AuthFailed {
                detail: "access token is empty".into(),
            });
        }
        Ok(Self { token })
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, CaptureError> {
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every call, so an
/// external helper can refresh it while the session runs.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new(ACCESS_TOKEN_ENV)
    }
}

#[async_trait]
impl AccessTokenProvider for EnvTokenProvider {
    async fn access_token(&self) -> Result<String, CaptureError> {
        non_empty_env(&self.var).ok_or_else(|| CaptureError::AuthFailed {
            detail: format!("{} is not set", self.var),
        })
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
