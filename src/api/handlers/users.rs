use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use super::{
    auth::{password::MAX_PASSWORD_BYTES, require_auth, AuthGate},
    error::PASSWORD_TOO_LONG_MESSAGE,
    ApiError,
};

pub const MISSING_CREDENTIALS_MESSAGE: &str = "Request requires username and password";
pub const INVALID_USERNAME_MESSAGE: &str = "Username must not contain ':' or NUL characters";

// No Debug: the plaintext password lives here until it is wrapped.
#[derive(ToSchema, Deserialize)]
pub struct UserRegister {
    #[schema(value_type = String)]
    username: Option<String>,
    #[schema(value_type = String, format = Password)]
    password: Option<String>,
}

#[utoipa::path(
    post,
    path= "/user/",
    request_body = UserRegister,
    responses (
        (status = 200, description = "User registered"),
        (status = 400, description = "Missing or invalid username or password, or username already in use"),
    ),
    tag= "user"
)]
// axum handler for registration
#[instrument(skip_all)]
pub async fn register(
    Extension(gate): Extension<Arc<AuthGate>>,
    payload: Option<Json<UserRegister>>,
) -> Result<StatusCode, ApiError> {
    let Some(Json(user)) = payload else {
        return Err(ApiError::Validation(MISSING_CREDENTIALS_MESSAGE));
    };

    let username = user.username.filter(|username| !username.is_empty());
    let password = user
        .password
        .filter(|password| !password.is_empty())
        .map(SecretString::from);
    let (Some(username), Some(password)) = (username, password) else {
        debug!("Registration rejected: missing username or password");
        return Err(ApiError::Validation(MISSING_CREDENTIALS_MESSAGE));
    };

    // Basic auth splits on the first ':', and PostgreSQL TEXT rejects NUL.
    if username.contains([':', '\0']) {
        debug!("Registration rejected: username cannot be sent as Basic credentials");
        return Err(ApiError::Validation(INVALID_USERNAME_MESSAGE));
    }
    if password.expose_secret().len() > MAX_PASSWORD_BYTES {
        debug!("Registration rejected: password too long");
        return Err(ApiError::Validation(PASSWORD_TOO_LONG_MESSAGE));
    }

    let password_hash = gate.hasher().hash(&password).await?;

    // The store enforces uniqueness atomically; a lost race is a duplicate.
    gate.credentials()
        .create_user(&username, &password_hash)
        .await?;

    info!(%username, "User registered");

    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path= "/user/",
    responses (
        (status = 200, description = "Credentials are valid"),
        (status = 401, description = "Missing or invalid credentials"),
    ),
    security(("basic_auth" = [])),
    tag= "user"
)]
pub async fn check(
    headers: HeaderMap,
    Extension(gate): Extension<Arc<AuthGate>>,
) -> Result<StatusCode, ApiError> {
    let principal = require_auth(&headers, &gate).await?;
    debug!(username = %principal.username, "Credentials checked");
    Ok(StatusCode::OK)
}
