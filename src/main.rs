//! Matjar Storefront - service entry point.

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matjar_storefront::api::{build_router, AppState, UploadRateLimit};
use matjar_storefront::auth::AuthClient;
use matjar_storefront::config::Config;
use matjar_storefront::db::PgBackend;
use matjar_storefront::images::ImageHostClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::warn!(error = %err, "NATS connect failed; event publication disabled");
                None
            }
        },
        None => None,
    };

    let state = AppState {
        backend: PgBackend::new(db),
        auth: AuthClient::new(&config.auth)?,
        images: ImageHostClient::new(&config.images)?,
        nats,
        upload_limiter: UploadRateLimit::default(),
    };
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("matjar-storefront listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
