//! Axum middleware things
//!

use axum::body::Body;
use axum::http::{header, Method, Response, StatusCode};
use portfolio_shared::error::PortfolioError;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::SqliteStore;
use tracing::error;

pub fn corslayer() -> CorsLayer {
    CorsLayer::new()
        // the site only reads pages and posts the intake form
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any)
}

pub const CACHE_CONTROL_VALUE: &str = "private, no-transform, max-age=0";

type CacheControlFn = fn(&Response<Body>) -> Option<header::HeaderValue>;

/// Successful responses are built per request and shouldn't be cached along the way.
pub fn cache_control_layer() -> SetResponseHeaderLayer<CacheControlFn> {
    SetResponseHeaderLayer::overriding(header::CACHE_CONTROL, |response: &Response<Body>| {
        if response.status() == StatusCode::OK {
            CACHE_CONTROL_VALUE.parse().ok()
        } else {
            None
        }
    })
}

/// Sessions live in the application's own SQLite database.
pub async fn session_layer(
    pool: SqlitePool,
) -> Result<SessionManagerLayer<SqliteStore>, PortfolioError> {
    let store = SqliteStore::new(pool);
    store.migrate().await.map_err(|err| {
        error!("Failed to create session table: {:?}", err);
        PortfolioError::Database(format!("Failed to create session table: {err}"))
    })?;
    Ok(SessionManagerLayer::new(store)
        .with_name("portfolio_session")
        .with_secure(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_layer_shares_pool() {
        let conn = crate::storage::start_db(None)
            .await
            .expect("Failed to start test DB");
        let pool = conn.get_sqlite_connection_pool().clone();
        session_layer(pool.clone())
            .await
            .expect("Failed to build session layer");

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'tower_sessions'",
        )
        .fetch_one(&pool)
        .await
        .expect("Failed to query sqlite_master");
        assert_eq!(count, 1);
    }
}
