use serde::{Deserialize, Serialize};

/// JWT payload used for authentication.
///
/// Identity is keyed by `sub`, the immutable account id; `username` is a
/// snapshot taken at issuance and may lag behind a later rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,        // account ID
    pub username: String,
    pub iat: usize,      // issued at (unix timestamp)
    pub exp: usize,      // expires at (unix timestamp)
    pub iss: String,     // issuer
    pub aud: String,     // audience
}
