use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::config::AuthMode;
use crate::error::AppError;

/// Who made the request. API-key callers have no subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub subject: Option<String>,
}

/// Checks bearer tokens against either an HS256 secret or a static API key.
#[derive(Clone)]
pub enum Authenticator {
    Jwt {
        key: DecodingKey,
        validation: Validation,
    },
    ApiKey(String),
}

impl Authenticator {
    pub fn new(mode: &AuthMode) -> Self {
        match mode {
            AuthMode::Jwt { secret } => Self::Jwt {
                key: DecodingKey::from_secret(secret.as_bytes()),
                validation: Validation::new(Algorithm::HS256),
            },
            AuthMode::ApiKey { key } => Self::ApiKey(key.clone()),
        }
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Caller, AppError> {
        let token = extract_bearer_token(headers)?;
        match self {
            Self::Jwt { key, validation } => {
                let decoded = decode::<Claims>(token, key, validation).map_err(|error| {
                    tracing::debug!(error = %error, "Rejected bearer JWT");
                    AppError::unauthorized("Unauthorized")
                })?;
                Ok(Caller {
                    subject: decoded.claims.sub,
                })
            }
            Self::ApiKey(expected) => {
                if constant_time_eq(token.as_bytes(), expected.as_bytes()) {
                    Ok(Caller { subject: None })
                } else {
                    Err(AppError::unauthorized("Invalid API key"))
                }
            }
        }
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid Authorization header format"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Invalid Authorization header format",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0_u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
