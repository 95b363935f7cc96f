use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tessera_core::User;

use crate::app::AppState;
use crate::domains::users::service::{self, UserError};

const INVALID_ID: &str = "Invalid user ID format";
const INVALID_BODY: &str = "Invalid request body";
const NOT_FOUND: &str = "User not found";
const INTERNAL: &str = "Internal server error";
const INTERNAL_CREATE: &str = "Internal server error during user creation";
const INTERNAL_DELETE: &str = "Internal server error during user deletion";

fn plain_error(status: StatusCode, message: &str) -> Response {
    (status, format!("{message}\n")).into_response()
}

/// Maps a service failure to a generic plain-text response. Store details were
/// already logged by the service; none of them reach the client.
fn map_user_error(error: UserError, internal_message: &str) -> Response {
    match error {
        UserError::InvalidId(_) => plain_error(StatusCode::BAD_REQUEST, INVALID_ID),
        UserError::InvalidBody(_) => plain_error(StatusCode::BAD_REQUEST, INVALID_BODY),
        UserError::NotFound => plain_error(StatusCode::NOT_FOUND, NOT_FOUND),
        UserError::Store(_) => plain_error(StatusCode::INTERNAL_SERVER_ERROR, internal_message),
    }
}

fn json_user(status: StatusCode, user: &User) -> Response {
    match user.to_json_vec() {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => {
            tracing::error!(event = "user_serialize_failed", user_id = %user.id, error = %err);
            plain_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
        }
    }
}

/// The id segment, or the 400 response for one that cannot even be decoded
/// (invalid percent-encoding or non UTF-8 bytes).
fn path_id(path: Result<Path<String>, PathRejection>) -> Result<String, Response> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(err) => {
            tracing::debug!(event = "user_id_rejected", error = %err);
            Err(plain_error(StatusCode::BAD_REQUEST, INVALID_ID))
        }
    }
}

#[tracing::instrument(skip_all)]
pub(crate) async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Response {
    let id = match path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match service::get_user(&state, &id).await {
        Ok(user) => json_user(StatusCode::OK, &user),
        Err(err) => map_user_error(err, INTERNAL),
    }
}

#[tracing::instrument(skip_all)]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(event = "user_body_rejected", error = %err);
            return plain_error(StatusCode::BAD_REQUEST, INVALID_BODY);
        }
    };
    match service::create_user(&state, &body).await {
        Ok(user) => json_user(StatusCode::CREATED, &user),
        Err(err) => map_user_error(err, INTERNAL_CREATE),
    }
}

#[tracing::instrument(skip_all)]
pub(crate) async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Response {
    let id = match path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match service::delete_user(&state, &id).await {
        Ok(id) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            format!("Deleted User {id}\n"),
        )
            .into_response(),
        Err(err) => map_user_error(err, INTERNAL_DELETE),
    }
}
