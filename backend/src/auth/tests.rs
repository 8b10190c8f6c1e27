use super::*;
use axum::http::Request;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::env;

const SECRET: &str = "supersecretadminsecretforunittesting123";

fn set_env_vars() {
    unsafe {
        env::set_var("JWT_ADMIN_SECRET", SECRET);
        env::set_var("JWT_ADMIN_TTL_HOURS", "1");
    }
}

fn admin_secret() -> AdminSecret {
    AdminSecret {
        secret: SECRET.to_string(),
        token_ttl_hours: 1,
    }
}

fn parts_with_auth(value: Option<&str>) -> Parts {
    let mut builder = Request::builder().uri("/api/orders");
    if let Some(value) = value {
        builder = builder.header(axum::http::header::AUTHORIZATION, value);
    }
    builder.body(()).unwrap().into_parts().0
}

#[test]
fn test_issued_token_validates() {
    let token = issue_admin_token(3, "galeria", &admin_secret()).unwrap();

    let claims = validate_admin_jwt(&token, &admin_secret()).expect("Valid token should pass");
    assert_eq!(claims.sub, "3");
    assert_eq!(claims.username, "galeria");
    assert_eq!(claims.role, "admin");
}

#[test]
fn test_validate_admin_jwt_expired() {
    let claims = AdminClaims {
        sub: "3".to_string(),
        username: "galeria".to_string(),
        role: "admin".to_string(),
        iat: 1,
        exp: 2, // past
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    assert!(validate_admin_jwt(&token, &admin_secret()).is_err());
}

#[test]
fn test_validate_admin_jwt_invalid_signature() {
    let other = AdminSecret {
        secret: "wrongsecret".to_string(),
        token_ttl_hours: 1,
    };
    let token = issue_admin_token(3, "galeria", &other).unwrap();

    assert!(validate_admin_jwt(&token, &admin_secret()).is_err());
}

#[test]
fn test_validate_admin_jwt_rejects_other_roles() {
    let claims = AdminClaims {
        sub: "3".to_string(),
        username: "galeria".to_string(),
        role: "customer".to_string(),
        iat: Utc::now().timestamp(),
        exp: 9_999_999_999,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    assert!(validate_admin_jwt(&token, &admin_secret()).is_err());
}

#[tokio::test]
async fn test_extractor_accepts_bearer_token() {
    set_env_vars();
    let token = issue_admin_token(3, "galeria", &admin_secret()).unwrap();
    let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));

    let user = AdminUser::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(
        user,
        AdminUser {
            admin_id: 3,
            username: "galeria".to_string()
        }
    );
}

#[tokio::test]
async fn test_extractor_rejects_missing_header() {
    set_env_vars();
    let mut parts = parts_with_auth(None);

    let rejection = AdminUser::from_request_parts(&mut parts, &())
        .await
        .unwrap_err();
    assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_extractor_rejects_non_bearer_scheme() {
    set_env_vars();
    let mut parts = parts_with_auth(Some("Basic Z2FsZXJpYTpwYXNz"));

    let rejection = AdminUser::from_request_parts(&mut parts, &())
        .await
        .unwrap_err();
    assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_extractor_rejects_garbage_token() {
    set_env_vars();
    let mut parts = parts_with_auth(Some("Bearer not.a.jwt"));

    let rejection = AdminUser::from_request_parts(&mut parts, &())
        .await
        .unwrap_err();
    assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
}
