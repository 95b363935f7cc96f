use crate::app::AppState;
use axum::Router;

pub(crate) mod health;

pub const HEALTH_PATH: &str = "/health";
pub const USERS_PATH: &str = "/user";
pub const USER_PATH: &str = "/user/:id";

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::domains::users::http::router())
}

/// True when `path` would shadow or collide with one of the API routes.
pub fn is_api_path(path: &str) -> bool {
    let path = path.trim_end_matches('/');
    path == HEALTH_PATH || path == USERS_PATH || path.starts_with("/user/")
}
