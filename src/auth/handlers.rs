use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest, RegisterResponse, RegisteredUser, TokenResponse},
        jwt::JwtKeys,
        password,
    },
    error::AppError,
    state::AppState,
    users::repo_types::Account,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_all_digits(phone: &str) -> bool {
    !phone.is_empty() && phone.bytes().all(|b| b.is_ascii_digit())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();
    payload.phone = payload.phone.trim().to_string();

    if payload.email.is_empty()
        || payload.phone.is_empty()
        || payload.username.is_empty()
        || payload.password.is_empty()
    {
        return Err(AppError::Validation("All fields are required".into()));
    }

    if !is_all_digits(&payload.phone) {
        return Err(AppError::Validation(
            "Phone number must contain only digits".into(),
        ));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    // Friendly pre-check; the unique constraint closes the race on insert.
    if Account::username_taken(&state.db, &payload.username).await? {
        warn!(username = %payload.username, "username already taken");
        return Err(AppError::Conflict("Username already taken".into()));
    }

    // Argon2 is CPU-bound, keep it off the request loop.
    let plain = payload.password.clone();
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(anyhow::Error::from)??;

    let account = Account::create_with_password(
        &state.db,
        &payload.email,
        &payload.phone,
        &payload.username,
        &hash,
    )
    .await?;

    info!(account_id = account.id, username = %account.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            user: RegisteredUser {
                id: account.id,
                email: account.email,
                username: account.username,
                phone: account.phone,
                created_at: account.created_at,
            },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let account = Account::find_by_username(&state.db, &payload.username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    // OAuth-only accounts have no password to check against.
    let Some(hash) = account.password_hash.clone() else {
        warn!(username = %payload.username, "login against passwordless account");
        return Err(AppError::Auth("Invalid credentials".into()));
    };

    let plain = payload.password.clone();
    let ok = tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
        .await
        .map_err(anyhow::Error::from)??;

    if !ok {
        warn!(username = %payload.username, "login invalid password");
        return Err(AppError::Auth("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(account.id, &account.username)?;

    info!(account_id = account.id, username = %account.username, "user logged in");
    Ok(Json(TokenResponse { token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
    }

    #[test]
    fn email_regex_rejects_garbage() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x"));
    }

    #[test]
    fn phone_must_be_digits_only() {
        assert!(is_all_digits("123456789"));
        assert!(!is_all_digits("12-34"));
        assert!(!is_all_digits("+49123"));
        assert!(!is_all_digits(""));
    }
}
