use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::users::repo_types::RatingMap;

/// Profile returned by GET /users/me. `image` is a presigned URL, not the
/// raw storage key.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub phone: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub location: Option<String>,
    pub ratings: RatingMap,
    pub image: Option<String>,
    pub badge: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateLocationRequest {
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub message: String,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub message: String,
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUsernameRequest {
    #[serde(alias = "newUsername")]
    pub new_username: String,
}

#[derive(Debug, Serialize)]
pub struct UsernameResponse {
    pub message: String,
    pub username: String,
}

/// `grade` stays optional so a missing grade is our 400, not a decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RateRequest {
    pub grade: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_request_accepts_both_spellings() {
        let camel: UpdateUsernameRequest =
            serde_json::from_str(r#"{"newUsername":"alice"}"#).unwrap();
        assert_eq!(camel.new_username, "alice");
        let snake: UpdateUsernameRequest =
            serde_json::from_str(r#"{"new_username":"bob"}"#).unwrap();
        assert_eq!(snake.new_username, "bob");
    }

    #[test]
    fn rate_request_parses_numeric_grades() {
        let req: RateRequest = serde_json::from_str(r#"{"grade":4.5}"#).unwrap();
        assert_eq!(req.grade, Some(4.5));
        assert!(serde_json::from_str::<RateRequest>(r#"{"grade":"four"}"#).is_err());
    }

    #[test]
    fn rate_request_tolerates_a_missing_grade() {
        let req: RateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.grade, None);
    }

    #[test]
    fn profile_serializes_rating_map_as_object() {
        let mut ratings = RatingMap::new();
        ratings.insert("bob".into(), 4.0);
        let profile = ProfileResponse {
            id: 1,
            username: "alice".into(),
            full_name: "alice".into(),
            phone: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            location: Some("Berlin".into()),
            ratings,
            image: None,
            badge: false,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["ratings"]["bob"], 4.0);
        assert_eq!(json["location"], "Berlin");
    }
}
