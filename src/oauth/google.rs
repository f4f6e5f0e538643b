use anyhow::{bail, Context};
use serde::Deserialize;

use crate::config::GoogleConfig;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Identity assertion fetched from Google after a successful code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

/// Server side of the Google authorization-code flow.
pub struct GoogleOAuthClient {
    client_id: String,
    client_secret: String,
    callback_url: String,
    http: reqwest::Client,
}

impl GoogleOAuthClient {
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            callback_url: config.callback_url.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Authorization URL the user is redirected to. Google redirects back to
    /// the callback URL with a `code` query parameter.
    pub fn auth_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}",
            GOOGLE_AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.callback_url),
            urlencoding::encode("openid email profile"),
        )
    }

    /// Exchange an authorization code for the user's Google profile.
    pub async fn exchange_code(&self, code: &str) -> anyhow::Result<GoogleProfile> {
        let token_response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", &self.callback_url),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("request Google token")?;

        if !token_response.status().is_success() {
            let status = token_response.status();
            bail!("Google token exchange failed ({})", status);
        }

        let token: TokenExchangeResponse = token_response
            .json()
            .await
            .context("parse Google token response")?;

        let userinfo_response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("request Google userinfo")?;

        if !userinfo_response.status().is_success() {
            let status = userinfo_response.status();
            bail!("Google userinfo fetch failed ({})", status);
        }

        userinfo_response
            .json::<GoogleProfile>()
            .await
            .context("parse Google userinfo response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GoogleConfig {
        GoogleConfig {
            client_id: "123456.apps.googleusercontent.com".into(),
            client_secret: "secret123".into(),
            callback_url: "http://localhost:8080/auth/google/callback".into(),
        }
    }

    #[test]
    fn auth_url_carries_client_and_callback() {
        let client = GoogleOAuthClient::new(&test_config());
        let url = client.auth_url();
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("123456.apps.googleusercontent.com"));
        assert!(url.contains(&urlencoding::encode(
            "http://localhost:8080/auth/google/callback"
        ).into_owned()));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn profile_parses_with_missing_optional_fields() {
        let profile: GoogleProfile = serde_json::from_str(r#"{"email":"a@x.com"}"#).unwrap();
        assert_eq!(profile.email.as_deref(), Some("a@x.com"));
        assert!(!profile.email_verified);
        assert!(profile.given_name.is_none());
        assert!(profile.picture.is_none());
    }

    #[test]
    fn profile_parses_full_payload() {
        let json = r#"{
            "sub": "1",
            "email": "jane.doe@gmail.com",
            "email_verified": true,
            "given_name": "Jane",
            "family_name": "Doe",
            "picture": "https://lh3.googleusercontent.com/a/photo"
        }"#;
        let profile: GoogleProfile = serde_json::from_str(json).unwrap();
        assert!(profile.email_verified);
        assert_eq!(profile.given_name.as_deref(), Some("Jane"));
        assert_eq!(profile.family_name.as_deref(), Some("Doe"));
    }
}
