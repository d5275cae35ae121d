//! User registration and login

pub mod jwt;
pub mod password;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AuthConfig;
use crate::store::models::{NewUser, Role, User};
use crate::store::{RecordStore, StoreError};
pub use jwt::{Claims, JwtIssuer};
pub use password::{hash_password, verify_password};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidToken(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub farm_size: Option<f64>,
    #[serde(default)]
    pub crops: Vec<String>,
    pub language_preference: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub struct AuthService {
    store: Arc<RecordStore>,
    issuer: JwtIssuer,
}

impl AuthService {
    pub fn new(store: Arc<RecordStore>, config: &AuthConfig) -> Result<Self, AuthError> {
        Ok(Self {
            store,
            issuer: JwtIssuer::new(config.jwt_secret.clone(), config.token_expiry_secs)?,
        })
    }

    pub async fn register(&self, registration: Registration) -> Result<Session, AuthError> {
        let email = registration.email.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidInput("A valid email is required".into()));
        }
        if registration.password.is_empty() {
            return Err(AuthError::InvalidInput("Password is required".into()));
        }
        if self.store.user_by_email(&email).await.is_some() {
            return Err(AuthError::EmailTaken);
        }

        // Argon2 is CPU-bound; keep it off the async workers
        let password = registration.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task failed: {e}")))??;

        let draft = NewUser {
            email,
            password_hash,
            name: registration.name.unwrap_or_else(|| "New Farmer".to_string()),
            phone: registration.phone,
            location: registration.location,
            farm_size: registration.farm_size,
            crops: registration.crops,
            role: Role::Farmer,
            language_preference: registration
                .language_preference
                .unwrap_or_else(|| "en".to_string()),
        };

        // A concurrent registration may have taken the email while hashing
        let email = draft.email.to_lowercase();
        let user = self
            .store
            .users
            .create_unless(draft, |u| u.email.to_lowercase() == email)
            .await?
            .ok_or(AuthError::EmailTaken)?;

        info!(user_id = %user.id, "User registered");
        let token = self.issuer.issue(&user)?;
        Ok(Session { user, token })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self
            .store
            .user_by_email(email.trim())
            .await
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = user.password_hash.clone();
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Verification task failed: {e}")))??;
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, "User logged in");
        let token = self.issuer.issue(&user)?;
        Ok(Session { user, token })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.issuer.verify(token)
    }
}
