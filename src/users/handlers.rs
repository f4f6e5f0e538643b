use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    state::AppState,
    storage::avatar_key,
    users::{
        dto::{
            ImageResponse, LocationResponse, MessageResponse, ProfileResponse, RateRequest,
            UpdateLocationRequest, UpdateUsernameRequest, UsernameResponse,
        },
        repo_types::Account,
    },
};

const PRESIGN_TTL_SECS: u64 = 30 * 60;

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/users/location", put(update_location))
        .route("/users/username", put(update_username))
        .route("/users/rate/:username", post(rate_user))
        .route(
            "/users/image",
            put(update_image).layer(DefaultBodyLimit::max(5 * 1024 * 1024)),
        )
}

/// Resolve the account behind the token by its immutable id, so tokens
/// issued before a rename still work.
async fn current_account(state: &AppState, account_id: i64) -> Result<Account, AppError> {
    Account::find_by_id(&state.db, account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[instrument(skip(state, user))]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let account = current_account(&state, user.0.sub).await?;

    let image = match &account.image {
        Some(key) => Some(state.storage.presign_get(key, PRESIGN_TTL_SECS).await?),
        None => None,
    };

    Ok(Json(ProfileResponse {
        id: account.id,
        username: account.username,
        full_name: account.full_name,
        phone: account.phone,
        created_at: account.created_at,
        location: account.location,
        ratings: account.ratings.0,
        image,
        badge: account.badge,
    }))
}

#[instrument(skip(state, user, payload))]
pub async fn update_location(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<LocationResponse>, AppError> {
    let location = payload.location.trim();
    if location.is_empty() {
        return Err(AppError::Validation("Valid location is required".into()));
    }

    let account = Account::update_location(&state.db, user.0.sub, location).await?;

    Ok(Json(LocationResponse {
        message: "Location updated successfully".into(),
        location: account.location,
    }))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

#[instrument(skip(state, user, mp))]
pub async fn update_image(
    State(state): State<AppState>,
    user: AuthUser,
    mut mp: Multipart,
) -> Result<Json<ImageResponse>, AppError> {
    let account = current_account(&state, user.0.sub).await?;

    let mut upload: Option<(bytes::Bytes, &'static str, String)> = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let Some(ext) = ext_from_mime(&content_type) else {
            return Err(AppError::Validation("Only images are allowed".into()));
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;
        upload = Some((data, ext, content_type));
        break;
    }

    let Some((data, ext, content_type)) = upload else {
        return Err(AppError::Validation("No image uploaded".into()));
    };

    let key = avatar_key(account.id, ext);
    state.storage.put_object(&key, data, &content_type).await?;

    let updated = Account::update_image(&state.db, account.id, &key).await?;

    // best-effort cleanup of the replaced avatar
    if let Some(old_key) = account.image.as_deref() {
        if let Err(e) = state.storage.delete_object(old_key).await {
            warn!(error = %e, key = old_key, "failed to delete previous avatar");
        }
    }

    info!(account_id = account.id, key = %key, "avatar updated");
    Ok(Json(ImageResponse {
        message: "Image updated successfully".into(),
        image: updated.image,
    }))
}

#[instrument(skip(state, user, payload))]
pub async fn update_username(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateUsernameRequest>,
) -> Result<Json<UsernameResponse>, AppError> {
    let new_username = payload.new_username.trim();
    if new_username.len() < 3 {
        return Err(AppError::Validation("Invalid new username".into()));
    }

    if Account::username_taken(&state.db, new_username).await? {
        return Err(AppError::Conflict("Username already taken".into()));
    }

    // Unique constraint turns a lost race into a 409, not a duplicate.
    let account = Account::rename(&state.db, user.0.sub, new_username).await?;

    info!(account_id = account.id, username = %account.username, "username changed");
    Ok(Json(UsernameResponse {
        message: "Username updated successfully".into(),
        username: account.username,
    }))
}

pub(crate) fn grade_in_range(grade: f32) -> bool {
    grade.is_finite() && (0.0..=5.0).contains(&grade)
}

#[instrument(skip(state, user, payload))]
pub async fn rate_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(target_username): Path<String>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let grade = payload.grade.filter(|g| grade_in_range(*g)).ok_or_else(|| {
        AppError::Validation("Grade must be a number between 0 and 5".into())
    })?;

    // The rater's current username, not the (possibly stale) token snapshot.
    let rater = current_account(&state, user.0.sub).await?;

    if rater.username == target_username {
        return Err(AppError::Forbidden("You cannot rate yourself".into()));
    }

    let merged =
        Account::merge_rating(&state.db, &target_username, &rater.username, grade).await?;
    if !merged {
        return Err(AppError::NotFound("User not found".into()));
    }

    info!(
        rater = %rater.username,
        target = %target_username,
        grade,
        "user rated"
    );
    Ok(Json(MessageResponse {
        message: format!("You rated {} with {}", target_username, grade),
    }))
}
