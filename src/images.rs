//! Client for the image-hosting collaborator.
//!
//! Uploads one binary file per request bound to an account/token pair and
//! returns a stable image id plus delivery URLs; that pair is all the
//! catalog ever stores.

use serde::Deserialize;
use std::time::Duration;

use crate::config::ImageHostConfig;
use crate::error::StorefrontError;

const COLLABORATOR: &str = "image host";

#[derive(Clone, Debug)]
pub struct HostedImage {
    pub id: String,
    pub url: String,
    pub variants: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UploadEnvelope {
    success: bool,
    #[serde(default)]
    result: Option<UploadResult>,
    #[serde(default)]
    errors: Vec<UploadError>,
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    id: String,
    #[serde(default)]
    variants: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UploadError {
    message: String,
}

#[derive(Clone, Debug)]
pub struct ImageHostClient {
    http: reqwest::Client,
    api_base: String,
    account_id: String,
    api_token: String,
    delivery_url: String,
}

impl ImageHostClient {
    pub fn new(config: &ImageHostConfig) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| StorefrontError::Collaborator {
                collaborator: COLLABORATOR,
                source,
            })?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            account_id: config.account_id.clone(),
            api_token: config.api_token.clone(),
            delivery_url: config.delivery_url.trim_end_matches('/').to_owned(),
        })
    }

    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: String,
        content_type: &str,
    ) -> crate::Result<HostedImage> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str(content_type)
            .map_err(|source| StorefrontError::Collaborator {
                collaborator: COLLABORATOR,
                source,
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = format!("{}/accounts/{}/images/v1", self.api_base, self.account_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_token)
            .multipart(form)
            .send()
            .await
            .map_err(|source| StorefrontError::Collaborator {
                collaborator: COLLABORATOR,
                source,
            })?;

        let status = response.status().as_u16();
        let envelope: UploadEnvelope =
            response
                .json()
                .await
                .map_err(|source| StorefrontError::Collaborator {
                    collaborator: COLLABORATOR,
                    source,
                })?;

        match envelope.result {
            Some(result) if envelope.success => {
                let url = result.variants.first().cloned().unwrap_or_else(|| {
                    format!("{}/{}/public", self.delivery_url, result.id)
                });
                Ok(HostedImage {
                    id: result.id,
                    url,
                    variants: result.variants,
                })
            }
            _ => {
                let message = envelope
                    .errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "upload rejected".to_owned());
                Err(StorefrontError::CollaboratorRejected {
                    collaborator: COLLABORATOR,
                    status,
                    message,
                })
            }
        }
    }
}
