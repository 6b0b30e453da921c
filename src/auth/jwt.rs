use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwks::JwksCache;
use crate::config::AuthConfig;

/// Supabase JWT claims.
///
/// The `sub` field is the user's UUID in `auth.users`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: Option<usize>,
    pub iss: Option<String>,
    pub email: Option<String>,
    /// Supabase role (e.g. "authenticated"), not the marketplace role.
    pub role: Option<String>,
    pub user_metadata: Option<UserMetadata>,
}

/// Metadata populated by the OAuth provider (Google).
#[derive(Debug, Serialize, Deserialize)]
pub struct UserMetadata {
    pub full_name: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub picture: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
}

impl Claims {
    /// Extract the user UUID from the `sub` claim.
    pub fn user_id(&self) -> Result<Uuid, String> {
        Uuid::parse_str(&self.sub).map_err(|e| format!("Invalid UUID in sub claim: {e}"))
    }

    /// Best-effort display name from metadata.
    pub fn display_name(&self) -> Option<String> {
        self.user_metadata
            .as_ref()
            .and_then(|m| m.full_name.clone().or_else(|| m.name.clone()))
    }

    /// Best-effort avatar URL from metadata.
    pub fn avatar_url(&self) -> Option<String> {
        self.user_metadata
            .as_ref()
            .and_then(|m| m.avatar_url.clone().or_else(|| m.picture.clone()))
    }

    /// Best-effort email: prefer top-level, fall back to metadata.
    pub fn user_email(&self) -> Option<String> {
        self.email
            .clone()
            .or_else(|| self.user_metadata.as_ref().and_then(|m| m.email.clone()))
    }
}

/// Validate an HS256 token signed with the project's shared JWT secret.
pub fn validate_token_with_secret(token: &str, secret: &str) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|td| td.claims)
    .map_err(|e| format!("Token validation failed: {e:?}"))
}

/// Verifies bearer tokens against whichever key source is configured.
pub enum TokenVerifier {
    Jwks(JwksCache),
    Secret(String),
}

impl TokenVerifier {
    pub fn from_config(config: &AuthConfig) -> Self {
        match config {
            AuthConfig::Jwks {
                project_ref,
                anon_key,
            } => Self::Jwks(JwksCache::new(project_ref, anon_key)),
            AuthConfig::Secret(secret) => Self::Secret(secret.clone()),
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<Claims, String> {
        match self {
            Self::Jwks(cache) => cache.validate_token(token).await.map(|td| td.claims),
            Self::Secret(secret) => validate_token_with_secret(token, secret),
        }
    }
}
