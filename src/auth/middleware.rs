use actix_web::FromRequest;
use actix_web::{Error, HttpRequest, dev::Payload, web};
use sea_orm::DatabaseConnection;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::auth::Principal;
use crate::auth::jwt::TokenVerifier;
use crate::db::users::find_or_create_from_auth;
use crate::errors::AppError;
use crate::models::users::{self, CreateUserFromAuth, Roles};

/// Extractor for the authenticated caller; creates the user row on first sight.
pub struct AuthenticatedUser(pub users::Model);

impl AuthenticatedUser {
    pub fn principal(&self) -> Principal {
        Principal::from(&self.0)
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            // 1. Extract the Bearer token from the Authorization header.
            let token = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?
                .strip_prefix("Bearer ")
                .ok_or_else(|| {
                    AppError::Unauthorized("Authorization header must be: Bearer <token>".into())
                })?
                .to_string();

            // 2. Validate it with the configured key source.
            let verifier = req
                .app_data::<web::Data<Arc<TokenVerifier>>>()
                .ok_or_else(|| AppError::Internal("Token verifier not configured".into()))?;

            let claims = verifier
                .validate_token(&token)
                .await
                .map_err(|e| AppError::Unauthorized(format!("Invalid token: {e}")))?;

            // 3. Extract user info from claims.
            let user_id = claims.user_id().map_err(AppError::Unauthorized)?;
            let email = claims
                .user_email()
                .ok_or_else(|| AppError::Unauthorized("No email in token claims".into()))?;

            let db = req
                .app_data::<web::Data<DatabaseConnection>>()
                .ok_or_else(|| AppError::Internal("Database not configured".into()))?;

            // 4. Find or create the user.
            let user = find_or_create_from_auth(
                db.get_ref(),
                CreateUserFromAuth {
                    id: user_id,
                    email,
                    display_name: claims.display_name(),
                    avatar_url: claims.avatar_url(),
                    auth_provider: "google".to_string(),
                    role: Roles::Client, // default role for new users
                },
            )
            .await
            .map_err(AppError::from)?;

            Ok(AuthenticatedUser(user))
        })
    }
}
