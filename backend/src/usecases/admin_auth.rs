use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use gallery::domain::repositories::admin_users::AdminUserRepository;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{auth::issue_admin_token, config::config_model::AdminSecret};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUserDto {
    pub id: i32,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AdminUserDto,
}

#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AdminAuthError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AdminAuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AdminAuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub struct AdminAuthUseCase<U>
where
    U: AdminUserRepository + Send + Sync + 'static,
{
    admin_user_repo: Arc<U>,
    admin_secret: AdminSecret,
}

impl<U> AdminAuthUseCase<U>
where
    U: AdminUserRepository + Send + Sync + 'static,
{
    pub fn new(admin_user_repo: Arc<U>, admin_secret: AdminSecret) -> Self {
        Self {
            admin_user_repo,
            admin_secret,
        }
    }

    /// Unknown usernames and wrong passwords are indistinguishable to the caller.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AdminAuthError> {
        let username = request.username.trim();

        let user = self
            .admin_user_repo
            .find_by_username(username)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "admin_auth: failed to load admin user");
                AdminAuthError::Internal(err)
            })?;

        let Some(user) = user else {
            warn!(security_event = "admin_login_failed", "admin_auth: unknown username");
            return Err(AdminAuthError::InvalidCredentials);
        };

        if !password_matches(&request.password, &user.password_hash) {
            warn!(
                security_event = "admin_login_failed",
                admin_id = user.id,
                "admin_auth: wrong password"
            );
            return Err(AdminAuthError::InvalidCredentials);
        }

        let token = issue_admin_token(user.id, &user.username, &self.admin_secret)
            .map_err(|err| {
                error!(admin_id = user.id, error = ?err, "admin_auth: failed to sign token");
                AdminAuthError::Internal(err)
            })?;

        info!(admin_id = user.id, "admin_auth: login succeeded");

        Ok(LoginResponse {
            token,
            user: AdminUserDto {
                id: user.id,
                username: user.username,
            },
        })
    }
}

fn password_matches(password: &str, phc_hash: &str) -> bool {
    match PasswordHash::new(phc_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            error!(error = %err, "admin_auth: stored password hash is not a PHC string");
            false
        }
    }
}
