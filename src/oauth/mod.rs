mod google;
pub mod handlers;
mod service;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::oauth_routes()
}
