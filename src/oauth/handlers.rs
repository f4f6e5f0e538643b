use axum::{
    extract::{FromRef, Query, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::{dto::TokenResponse, jwt::JwtKeys},
    error::AppError,
    oauth::{google::GoogleOAuthClient, service},
    state::AppState,
};

pub fn oauth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

/// GET /auth/google: send the user to Google's consent screen.
pub async fn google_redirect(State(state): State<AppState>) -> Redirect {
    let client = GoogleOAuthClient::new(&state.config.google);
    Redirect::temporary(&client.auth_url())
}

/// GET /auth/google/callback: exchange the code, reconcile the profile
/// into a local account and hand back the same JWT as password login.
#[instrument(skip(state, query))]
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<TokenResponse>, AppError> {
    let code = query
        .code
        .ok_or_else(|| AppError::Validation("Missing authorization code".into()))?;

    let client = GoogleOAuthClient::new(&state.config.google);
    let profile = client.exchange_code(&code).await.map_err(|e| {
        warn!(error = %e, "google code exchange failed");
        AppError::Validation("Failed to authenticate with Google".into())
    })?;

    let account = service::reconcile(&state.db, &profile).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(account.id, &account.username)?;

    info!(account_id = account.id, username = %account.username, "oauth login");
    Ok(Json(TokenResponse { token }))
}
