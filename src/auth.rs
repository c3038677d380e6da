//! Client for the hosted auth collaborator.
//!
//! Authentication (is this bearer token a real user?) happens here;
//! authorization (is that user an admin?) is a separate lookup against the
//! `admin_profiles` table so the two failure modes stay distinguishable.

use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::StorefrontError;

const COLLABORATOR: &str = "auth service";

#[derive(Clone, Debug, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AuthClient {
    pub fn new(config: &AuthConfig) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| StorefrontError::Collaborator {
                collaborator: COLLABORATOR,
                source,
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        })
    }

    /// Verifies a bearer token. `Ok(None)` means the token is missing its
    /// user — invalid or expired; any other non-success from the service is
    /// an upstream error, not an auth decision.
    pub async fn verify_bearer(&self, token: &str) -> crate::Result<Option<AuthUser>> {
        let response = self
            .http
            .get(format!("{}/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| StorefrontError::Collaborator {
                collaborator: COLLABORATOR,
                source,
            })?;

        match response.status() {
            status if status.is_success() => {
                let user = response.json::<AuthUser>().await.map_err(|source| {
                    StorefrontError::Collaborator {
                        collaborator: COLLABORATOR,
                        source,
                    }
                })?;
                Ok(Some(user))
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Ok(None),
            status => Err(StorefrontError::CollaboratorRejected {
                collaborator: COLLABORATOR,
                status: status.as_u16(),
                message: "token verification failed".to_owned(),
            }),
        }
    }
}
