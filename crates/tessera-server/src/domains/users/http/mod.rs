use axum::{
    routing::{get, post},
    Router,
};

use crate::app::AppState;
use crate::http::routes::{USERS_PATH, USER_PATH};

mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(USERS_PATH, post(handlers::create_user))
        .route(
            USER_PATH,
            get(handlers::get_user).delete(handlers::delete_user),
        )
}
