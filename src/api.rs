//! Client for the podcast API.
//!
//! Two calls matter to the generator:
//!
//! - `POST <api>/token` with basic auth returns an access token (the body).
//! - `GET <api>/podcasts/{uid}/profile-photo` with that token returns the
//!   episode artwork.
//!
//! The token is fetched on the first authenticated call and then held for the
//! lifetime of the client. Nothing here ever invalidates it; a process that
//! needs a fresh token builds a new client.

use crate::config::ApiConfig;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("authentication against {uri} as {username:?} failed: {status}")]
    Auth {
        uri: String,
        username: String,
        status: StatusCode,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },
    #[error("{0} returned an empty body")]
    EmptyBody(String),
}

impl ApiError {
    /// Whether the failure is about credentials rather than the resource.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth { .. })
    }
}

/// Anything that can produce episode artwork bytes for a uid.
///
/// `Sync` so one source can serve the parallel artwork fan-out.
pub trait ArtworkSource: Sync {
    fn fetch_artwork(&self, uid: &str) -> Result<Vec<u8>, ApiError>;
}

/// Blocking HTTP client for the podcast API.
pub struct ApiClient {
    client: Client,
    base: String,
    username: String,
    password: String,
    token: Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base: config.uri.trim().trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            token: Mutex::new(None),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// The access token, fetching it on first use.
    ///
    /// The lock is held across the fetch so concurrent first callers issue a
    /// single token request.
    pub fn token(&self) -> Result<String, ApiError> {
        let mut guard = self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let token = self.request_token()?;
        *guard = Some(token.clone());
        Ok(token)
    }

    fn request_token(&self) -> Result<String, ApiError> {
        let url = format!("{}/token", self.base);
        tracing::debug!(%url, "requesting access token");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()?;
        let status = response.status();
        if !status.is_success() {
            // Never echo the password.
            return Err(ApiError::Auth {
                uri: self.base.clone(),
                username: self.username.clone(),
                status,
            });
        }
        Ok(response.text()?.trim().to_string())
    }

    fn profile_photo_url(&self, uid: &str) -> String {
        format!("{}/podcasts/{}/profile-photo", self.base, uid)
    }
}

impl ArtworkSource for ApiClient {
    fn fetch_artwork(&self, uid: &str) -> Result<Vec<u8>, ApiError> {
        let token = self.token()?;
        let url = self.profile_photo_url(uid);
        tracing::info!(%url, "downloading artwork");
        let response = self.client.get(&url).bearer_auth(token).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }
        let bytes = response.bytes()?;
        if bytes.is_empty() {
            return Err(ApiError::EmptyBody(url));
        }
        Ok(bytes.to_vec())
    }
}
