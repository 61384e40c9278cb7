use crate::shared::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

async fn health() -> &'static str {
    "OK"
}

/// One merged router for the whole API surface; each module contributes its
/// own routes through a `configure()` function.
pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(crate::auth::configure())
        .merge(crate::drive::configure())
        .merge(crate::posts::configure())
}
