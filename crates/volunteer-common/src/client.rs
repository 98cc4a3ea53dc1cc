//! Client for the volunteer management REST API.
//!
//! Only the endpoints the session layer depends on live here: profile
//! lookup and submission, and credential login. The traits are the seam the
//! session service is generic over, so tests can swap in a scripted double.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::profile::{LoginRequest, LoginResponse, Profile};

/// Profile lookups keyed by account email.
#[cfg_attr(
    not(all(target_family = "wasm", target_os = "unknown")),
    trait_variant::make(Send)
)]
#[allow(async_fn_in_trait)]
pub trait ProfileApi {
    /// Fetch the profile for `email`. An unknown user (empty body, `null` or
    /// `{}`) is `Ok(None)`, not an error.
    async fn get_profile(&self, email: &str) -> Result<Option<Profile>, ApiError>;

    /// Submit onboarding data, returning the record as stored.
    async fn complete_profile(&self, profile: &Profile) -> Result<Profile, ApiError>;
}

#[cfg_attr(
    not(all(target_family = "wasm", target_os = "unknown")),
    trait_variant::make(Send)
)]
#[allow(async_fn_in_trait)]
pub trait LoginApi {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;
}

#[derive(Clone, Debug)]
pub struct HttpApi {
    client: Client,
    config: ApiConfig,
}

impl HttpApi {
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: ApiConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

/// Turn a non-2xx response into [`ApiError::Status`], otherwise hand back
/// the body text.
async fn body_text(response: Response) -> Result<String, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(ApiError::from_status(status.as_u16(), &body))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = body_text(response).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Decode a profile body, treating empty, `null` and `{}` as "no profile".
pub fn decode_profile(body: &str) -> Result<Option<Profile>, ApiError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let profile: Option<Profile> = serde_json::from_str(body)?;
    Ok(profile.filter(|p| !p.is_empty()))
}

impl ProfileApi for HttpApi {
    async fn get_profile(&self, email: &str) -> Result<Option<Profile>, ApiError> {
        let url = self.config.profile_url()?;
        tracing::debug!(%url, email, "fetching profile");
        let response = self
            .client
            .get(url)
            .query(&[("email", email)])
            .send()
            .await?;
        decode_profile(&body_text(response).await?)
    }

    async fn complete_profile(&self, profile: &Profile) -> Result<Profile, ApiError> {
        let url = self.config.profile_url()?;
        tracing::debug!(%url, email = %profile.email, "submitting profile");
        let response = self.client.post(url).json(profile).send().await?;
        decode(response).await
    }
}

impl LoginApi for HttpApi {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = self.config.login_url()?;
        let response = self
            .client
            .post(url)
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        decode(response).await
    }
}
