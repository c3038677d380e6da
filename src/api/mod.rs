//! HTTP surface: storefront routes, admin routes and the image upload
//! endpoint, glued over the library core.

mod analytics;
mod catalog;
mod checkout;
mod orders;
mod upload;
mod upsell;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::AuthClient;
use crate::db::rows::AdminProfile;
use crate::db::PgBackend;
use crate::domain::events::DomainEvent;
use crate::error::StorefrontError;
use crate::images::ImageHostClient;

pub use upload::UploadRateLimit;

#[derive(Clone)]
pub struct AppState {
    pub backend: PgBackend,
    pub auth: AuthClient,
    pub images: ImageHostClient,
    pub nats: Option<async_nats::Client>,
    pub upload_limiter: UploadRateLimit,
}

pub fn build_router(state: AppState) -> Router {
    let upload_routes = Router::new()
        .route("/api/images/upload", post(upload::upload_image))
        .layer(DefaultBodyLimit::max(upload::MAX_UPLOAD_BYTES + 16 * 1024));

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(catalog::list_products))
        .route("/api/v1/products/:slug", get(catalog::get_product))
        .route("/api/v1/categories", get(catalog::list_categories))
        .route("/api/v1/upsell/offer", post(upsell::evaluate_offer))
        .route("/api/v1/checkout", post(checkout::submit_checkout))
        .route("/api/v1/checkout/draft", post(checkout::save_draft))
        .route("/api/v1/orders/:order_number", get(orders::get_order_by_number))
        .route("/api/v1/admin/orders", get(orders::list_orders))
        .route("/api/v1/admin/orders/:id", get(orders::get_order))
        .route("/api/v1/admin/orders/:id/status", put(orders::update_status))
        .route("/api/v1/admin/analytics", get(analytics::summary))
        .merge(upload_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "matjar-storefront"}))
}

/// Page envelope for list endpoints.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

#[derive(Debug, serde::Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).min(100)
    }
}

/// API error body: a small fixed taxonomy of uppercase codes plus a
/// human-readable message. Internal diagnostic detail is logged where the
/// error is converted and never reaches the body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    fields: Option<BTreeMap<String, String>>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            fields: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn validation(fields: BTreeMap<String, String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "VALIDATION_ERROR",
            message: "Please correct the highlighted fields.".to_owned(),
            fields: Some(fields),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "Too many requests. Please retry in a minute.",
        )
    }

    pub fn upstream() -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_ERROR",
            "An upstream service failed. Please try again.",
        )
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL",
            "Something went wrong. Please try again.",
        )
    }

    pub fn retryable_submit() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SUBMIT_FAILED",
            "Your order could not be saved. Your cart is untouched — please try again.",
        )
    }
}

#[derive(Serialize)]
struct ApiErrorBody<'a> {
    error: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a BTreeMap<String, String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.code,
            message: &self.message,
            fields: self.fields.as_ref(),
        };
        (self.status, Json(&body)).into_response()
    }
}

impl From<StorefrontError> for ApiError {
    fn from(err: StorefrontError) -> Self {
        match &err {
            StorefrontError::Collaborator { .. } | StorefrontError::CollaboratorRejected { .. } => {
                tracing::error!(error = %err, "collaborator failure");
                Self::upstream()
            }
            _ => {
                tracing::error!(error = %err, "internal failure");
                Self::internal()
            }
        }
    }
}

/// Verifies the bearer token against the auth collaborator, then checks
/// `admin_profiles`. Authenticated-but-not-registered-admin is a distinct,
/// actionable error, not a generic credential failure.
pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<AdminProfile, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            ApiError::unauthorized("Missing or invalid Authorization header. Expected: Bearer <token>")
        })?;

    let user = state
        .auth
        .verify_bearer(token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token. Please sign in again."))?;

    state.backend.find_admin(user.id).await?.ok_or_else(|| {
        ApiError::forbidden("This account is signed in but not registered as an admin.")
    })
}

/// Publishes domain events over NATS when a client is configured; always
/// best-effort, the request outcome never depends on it.
pub(crate) async fn publish_events(state: &AppState, events: &[DomainEvent]) {
    for event in events {
        tracing::info!(subject = event.subject(), "domain event");
        let Some(nats) = &state.nats else { continue };
        match serde_json::to_vec(event) {
            Ok(payload) => {
                if let Err(err) = nats.publish(event.subject().to_string(), payload.into()).await {
                    tracing::warn!(subject = event.subject(), error = %err, "event publish failed");
                }
            }
            Err(err) => tracing::warn!(error = %err, "event serialization failed"),
        }
    }
}
