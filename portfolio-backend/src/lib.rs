pub mod asset;
pub mod cli;
pub mod csrf;
pub mod document;
pub mod entity;
pub mod logging;
pub mod middleware;
pub mod migration;
pub mod openapi;
pub mod pdf;
pub mod portfolio;
pub mod storage;
pub mod store;
#[cfg(test)]
mod tests;
pub mod view;

use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use portfolio::{
    background_image, create_portfolio_form, csrf_token, download_portfolio, home,
    submit_portfolio, view_portfolio,
};
use portfolio_shared::error::PortfolioError;
use sea_orm::DatabaseConnection;
use sqlx::SqlitePool;
use std::{borrow::Cow, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tower::{BoxError, ServiceBuilder};
use tower_http::services::ServeDir;
use tracing::{debug, error};

use crate::{
    asset::AssetStore, cli::CliOpts, document::DocumentRenderer, logging::logging_layer,
    view::Views,
};

/// Largest accepted form submission, picture included.
pub const SUBMIT_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub type SharedState = Arc<RwLock<AppState>>;

pub struct AppState {
    pub conn: DatabaseConnection,
    pub assets: AssetStore,
    pub documents: DocumentRenderer,
    pub views: Views,
}

impl AppState {
    pub async fn new(cli: &CliOpts) -> Result<Self, PortfolioError> {
        let conn = storage::new(&cli.db_path()).await?;
        Self::with_dirs(conn, cli.upload_dir(), cli.output_dir()).await
    }

    /// Assemble the state around an open database, creating the upload and output
    /// directories if they don't exist yet.
    pub async fn with_dirs(
        conn: DatabaseConnection,
        upload_dir: PathBuf,
        output_dir: PathBuf,
    ) -> Result<Self, PortfolioError> {
        let assets = AssetStore::new(upload_dir);
        assets.ensure_dir().await?;
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|err| {
                PortfolioError::Configuration(format!(
                    "Failed to create output directory {}: {err}",
                    output_dir.display()
                ))
            })?;
        debug!(
            "Uploads in {}, documents in {}",
            assets.upload_dir().display(),
            output_dir.display()
        );

        Ok(Self {
            conn,
            documents: DocumentRenderer::new(assets.clone(), output_dir),
            assets,
            views: Views::new()?,
        })
    }

    #[cfg(test)]
    pub async fn test(dir: &std::path::Path) -> Self {
        let db = storage::start_db(None)
            .await
            .expect("Failed to start test DB");
        Self::with_dirs(db, dir.join("uploads"), dir.join("downloads"))
            .await
            .expect("Failed to set up test state")
    }
}

pub async fn build_app(
    shared_state: &SharedState,
    dbpool: SqlitePool,
) -> Result<Router, PortfolioError> {
    let uploads = ServeDir::new(shared_state.read().await.assets.upload_dir());
    let session_layer = middleware::session_layer(dbpool).await?;

    // Build our application by composing routes
    let router = Router::new()
        .route("/", get(home))
        .route("/create-portfolio/", get(create_portfolio_form))
        .route("/csrftoken/", get(csrf_token))
        .route(
            "/submit-portfolio/",
            post(submit_portfolio).layer(DefaultBodyLimit::max(SUBMIT_BODY_LIMIT)),
        )
        .route("/portfolio/{id}", get(view_portfolio))
        .route("/download-portfolio/{id}", get(download_portfolio))
        .route(view::BACKGROUND_IMAGE_PATH, get(background_image))
        .nest_service("/static/uploads", uploads)
        .merge(openapi::api_route())
        .layer(session_layer);

    Ok(router
        // Add middleware to all routes
        .layer(
            ServiceBuilder::new()
                .layer(middleware::corslayer())
                .layer(middleware::cache_control_layer())
                // Handle errors from middleware
                .layer(HandleErrorLayer::new(handle_error))
                .load_shed()
                .concurrency_limit(1024)
                .timeout(Duration::from_secs(10))
                .layer(logging_layer()),
        )
        .with_state(shared_state.clone()))
}

async fn handle_error(error: BoxError) -> impl IntoResponse {
    if error.is::<tower::timeout::error::Elapsed>() {
        return (StatusCode::REQUEST_TIMEOUT, Cow::from("request timed out"));
    }

    if error.is::<tower::load_shed::error::Overloaded>() {
        let msg = "service is overloaded, try again later";
        error!("{}", msg);
        return (StatusCode::SERVICE_UNAVAILABLE, Cow::from(msg));
    }

    let msg = format!("Unhandled internal error: {error}");
    error!("{}", msg);
    (StatusCode::INTERNAL_SERVER_ERROR, Cow::from(msg))
}

#[tokio::test]
async fn test_handle_error() {
    let err = tower::timeout::error::Elapsed::new();
    let res = handle_error(Box::new(err)).await.into_response();
    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);

    let err = tower::load_shed::error::Overloaded::new();
    let res = handle_error(Box::new(err)).await.into_response();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = handle_error("boom".into()).await.into_response();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
