//! HTTP surface for listshare: routes, bearer-token gate and status mapping.

pub mod api;
pub mod auth;
pub mod error;
pub mod extract;
pub mod state;

pub use auth::{AuthError, AuthGate, Caller, Claims, JwtAuthGate};
pub use error::ApiError;
pub use extract::JsonBody;
pub use state::AppState;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

/// Builds the list routes over `state` with permissive CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/lists", get(api::list_owned).post(api::create_list))
        .route("/lists/shared", get(api::list_shared))
        .route(
            "/lists/{list_id}",
            get(api::get_list)
                .put(api::update_list)
                .delete(api::delete_list),
        )
        .route("/lists/{list_id}/{item_id}", delete(api::remove_item))
        .route("/lists/{list_id}/items/new", post(api::add_item))
        .layer(cors)
        .with_state(state)
}
