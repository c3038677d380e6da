//! Admin image upload: multipart in, image-hosting collaborator out.
//!
//! Guarded by a fixed-window per-client-IP rate limit held in process
//! memory; a restart forgets the windows.

use axum::{
    extract::{ConnectInfo, Multipart, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{require_admin, ApiError, AppState};
use crate::domain::aggregates::product::ProductImage;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const RATE_LIMIT_MAX: usize = 20;
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct IpWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window request limiter keyed by client IP.
#[derive(Clone)]
pub struct UploadRateLimit {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<HashMap<IpAddr, IpWindow>>>,
}

impl Default for UploadRateLimit {
    fn default() -> Self {
        Self::new(RATE_LIMIT_MAX, RATE_LIMIT_WINDOW)
    }
}

impl UploadRateLimit {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn allow(&self, ip: IpAddr) -> bool {
        let mut windows = self.state.lock().await;
        // keep the map from growing without bound
        if windows.len() > 4096 {
            let window = self.window;
            windows.retain(|_, w| w.started_at.elapsed() < window);
        }
        let entry = windows.entry(ip).or_insert_with(|| IpWindow {
            started_at: Instant::now(),
            count: 0,
        });
        if entry.started_at.elapsed() >= self.window {
            entry.started_at = Instant::now();
            entry.count = 0;
        }
        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }
}

/// Proxies usually sit in front; prefer the forwarded address when present.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_else(|| addr.ip())
}

pub async fn upload_image(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ProductImage>), ApiError> {
    let ip = client_ip(&headers, addr);
    if !state.upload_limiter.allow(ip).await {
        return Err(ApiError::rate_limited());
    }

    require_admin(&state, &headers).await?;

    let mut file: Option<(Vec<u8>, String, String)> = None;
    let mut product_id: Option<Uuid> = None;
    let mut is_primary = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Expected a multipart/form-data body."))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let content_type = field.content_type().unwrap_or_default().to_owned();
                if !content_type.starts_with("image/") {
                    return Err(ApiError::bad_request("Only image files are accepted."));
                }
                let filename = field
                    .file_name()
                    .unwrap_or("upload")
                    .to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("The file exceeds the 10MB limit."))?;
                if bytes.len() > MAX_UPLOAD_BYTES {
                    return Err(ApiError::bad_request("The file exceeds the 10MB limit."));
                }
                file = Some((bytes.to_vec(), filename, content_type));
            }
            "productId" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Malformed productId field."))?;
                let id = raw
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::bad_request("productId must be a UUID."))?;
                product_id = Some(id);
            }
            "isPrimary" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Malformed isPrimary field."))?;
                is_primary = raw.trim() == "true";
            }
            _ => {}
        }
    }

    let (bytes, filename, content_type) =
        file.ok_or_else(|| ApiError::bad_request("Missing \"file\" in form data."))?;
    let product_id =
        product_id.ok_or_else(|| ApiError::bad_request("Missing \"productId\" in form data."))?;

    if !state.backend.product_exists(product_id).await? {
        return Err(ApiError::bad_request("Unknown product."));
    }

    let hosted = state.images.upload(bytes, filename, &content_type).await?;
    let image = state
        .backend
        .insert_product_image(product_id, &hosted, is_primary)
        .await?;

    tracing::info!(product_id = %product_id, image_id = %image.id, "product image uploaded");
    Ok((StatusCode::CREATED, Json(image)))
}
