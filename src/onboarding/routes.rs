//! HTTP endpoints: liveness and profile lookup.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::store::ProfileStore;

/// Shared state for the profile routes.
#[derive(Clone)]
pub struct ProfileRouteState {
    pub profiles: ProfileStore,
}

/// GET /
///
/// Liveness check for hosting platforms.
async fn health() -> &'static str {
    "Companion bot is running"
}

/// GET /api/profiles/{user_id}
///
/// Returns the stored profile, or 404 if the user has none.
async fn get_profile(
    State(state): State<ProfileRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.profiles.get(&user_id).await {
        Some(profile) => Json(profile).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No profile for this user"})),
        )
            .into_response(),
    }
}

/// Build the HTTP routes.
pub fn profile_routes(state: ProfileRouteState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/profiles/{user_id}", get(get_profile))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
