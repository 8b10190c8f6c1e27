use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    axum_http::error_responses::error_body,
    config::{config_loader, config_model::AdminSecret},
};

const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Admin user id.
    pub sub: String,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// An authenticated back-office user.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminUser {
    pub admin_id: i32,
    pub username: String,
}

pub fn issue_admin_token(
    admin_id: i32,
    username: &str,
    admin_secret: &AdminSecret,
) -> anyhow::Result<String> {
    let now = Utc::now();
    let claims = AdminClaims {
        sub: admin_id.to_string(),
        username: username.to_string(),
        role: ADMIN_ROLE.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(admin_secret.token_ttl_hours)).timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(admin_secret.secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn validate_admin_jwt(token: &str, admin_secret: &AdminSecret) -> anyhow::Result<AdminClaims> {
    let decoding_key = DecodingKey::from_secret(admin_secret.secret.as_bytes());
    let validation = Validation::new(jsonwebtoken::Algorithm::HS256);

    let token_data = decode::<AdminClaims>(token, &decoding_key, &validation)
        .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;

    if token_data.claims.role != ADMIN_ROLE {
        anyhow::bail!("token is not an admin token");
    }

    Ok(token_data.claims)
}

fn unauthorized(message: &str) -> axum::response::Response {
    error_body(StatusCode::UNAUTHORIZED, message)
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = axum::response::Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| {
                    if rejection.is_missing() {
                        unauthorized("Missing Authorization header")
                    } else {
                        unauthorized("Invalid Authorization header format")
                    }
                })?;
        let token = bearer.token();

        let admin_secret = config_loader::get_admin_secret().map_err(|err| {
            warn!(error = ?err, "auth: admin secret is not configured");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })?;

        let claims = validate_admin_jwt(token, &admin_secret).map_err(|err| {
            warn!(security_event = "invalid_admin_token", error = %err, "auth: token rejected");
            unauthorized("Unauthorized")
        })?;

        let admin_id = claims
            .sub
            .parse()
            .map_err(|_| unauthorized("Invalid user ID in token"))?;

        Ok(AdminUser {
            admin_id,
            username: claims.username,
        })
    }
}

#[cfg(test)]
mod tests;
