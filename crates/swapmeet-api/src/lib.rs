//! REST gateway for the marketplace: auth token issuance and the product
//! document resource consumed by `swapmeet-client`.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod products;
pub mod seed;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tracing::error;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;

/// Build the `/api` router. `body_limit` caps request bodies in bytes;
/// anything larger is answered with 413.
pub fn router(state: AppState, body_limit: usize) -> Router {
    let require_auth = from_fn_with_state(state.clone(), middleware::require_auth);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/products", get(products::list_products))
        .route(
            "/api/products",
            post(products::create_product).route_layer(require_auth),
        )
        .route("/api/products/{id}", get(products::get_product))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true }))
}

/// Run a blocking closure (SQLite, password hashing) off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
    })?
}
