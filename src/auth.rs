use actix_web::{HttpRequest, HttpResponse};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::response as resp;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MASYARAKAT: &str = "masyarakat";
pub const ROLE_PETUGAS: &str = "petugas kesehatan";

/// Signing configuration, loaded once at startup and injected as app data
/// instead of being read from the environment on every request.
#[derive(Clone)]
pub struct JwtConfig {
    secret: String,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        JwtConfig {
            secret: secret.into(),
        }
    }

    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("JWT_SECRET tidak di-set, memakai secret default");
            "secret_key".to_string()
        });
        JwtConfig { secret }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub user_id: String,
    pub role: String,
    pub exp: usize,
}

/// Tokens are valid for 24 hours.
pub fn generate_jwt(
    config: &JwtConfig,
    user_id: &str,
    role: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        user_id: user_id.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + chrono::Duration::hours(24)).timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

fn bearer_token(req: &HttpRequest) -> Result<String, String> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| "Authorization header is required".to_string())?;

    let value = header
        .to_str()
        .map_err(|_| "Invalid Authorization header".to_string())?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err("Authorization header must be in format: Bearer {token}".to_string()),
    }
}

pub fn verify_jwt(req: &HttpRequest, config: &JwtConfig) -> Result<Claims, String> {
    let token = bearer_token(req)?;
    decode_token(&token, config)
}

fn decode_token(token: &str, config: &JwtConfig) -> Result<Claims, String> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        log::debug!("JWT verification failed: {:?}", e);
        "Invalid or expired token".to_string()
    })?;

    Ok(token_data.claims)
}

/// Shared gate for every protected handler: 401 on a missing/invalid
/// token, 403 when the role does not match.
pub fn require_role(
    req: &HttpRequest,
    config: &JwtConfig,
    role: &str,
) -> Result<Claims, HttpResponse> {
    let claims = verify_jwt(req, config).map_err(resp::unauthorized)?;

    if claims.role != role {
        return Err(resp::forbidden(format!(
            "Access denied. {} role required",
            capitalize(role)
        )));
    }

    Ok(claims)
}

/// Variant for endpoints shared between roles (community master data is
/// readable by masyarakat and admin alike).
pub fn require_any_role(
    req: &HttpRequest,
    config: &JwtConfig,
    roles: &[&str],
) -> Result<Claims, HttpResponse> {
    let claims = verify_jwt(req, config).map_err(resp::unauthorized)?;

    if !roles.contains(&claims.role.as_str()) {
        return Err(resp::forbidden("Access denied for this role"));
    }

    Ok(claims)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig::new("test-secret")
    }

    #[test]
    fn jwt_round_trip() {
        let token = generate_jwt(&config(), "42", ROLE_ADMIN).unwrap();
        let claims = decode_token(&token, &config()).unwrap();
        assert_eq!(claims.user_id, "42");
        assert_eq!(claims.role, ROLE_ADMIN);
    }

    #[test]
    fn jwt_rejects_wrong_secret() {
        let token = generate_jwt(&config(), "42", ROLE_MASYARAKAT).unwrap();
        let other = JwtConfig::new("another-secret");
        assert!(decode_token(&token, &other).is_err());
    }

    #[test]
    fn jwt_rejects_expired_token() {
        let claims = Claims {
            user_id: "42".to_string(),
            role: ROLE_ADMIN.to_string(),
            exp: (Utc::now() - chrono::Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(decode_token(&token, &config()).is_err());
    }

    #[test]
    fn jwt_rejects_garbage() {
        assert!(decode_token("not.a.token", &config()).is_err());
    }
}
