use crate::{
    error::AppError,
    roles::{Permission, Role},
};
use axum::{
    async_trait,
    extract::{FromRequest, RequestParts},
    http::{header::AUTHORIZATION, StatusCode},
};
use jsonwebtoken::{
    errors::Result as JwtResult, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

lazy_static::lazy_static! {
    // without JWT_SECRET the server runs in development mode and accepts any bearer token
    static ref KEYS: Option<Keys> = std::env::var("JWT_SECRET").ok().map(|secret| Keys {
        encoding: EncodingKey::from_base64_secret(&secret).expect("JWT_SECRET is not valid base64"),
        decoding: DecodingKey::from_base64_secret(&secret).expect("JWT_SECRET is not valid base64"),
    });
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub exp: u64,
}

/// Whether bearer tokens are accepted unverified. Loads the keys, so a
/// malformed secret panics here at startup rather than on first request.
pub fn development_mode() -> bool {
    KEYS.is_none()
}

/// Signs a session token, or returns `None` in development mode.
pub fn generate_jwt(
    uid: &str,
    email: &str,
    name: &str,
    role: Role,
    exp: Duration,
) -> JwtResult<Option<String>> {
    let Some(keys) = KEYS.as_ref() else {
        return Ok(None);
    };
    jsonwebtoken::encode(
        &Header::default(),
        &Claims {
            sub: uid.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            exp: jsonwebtoken::get_current_timestamp() + exp.as_secs(),
        },
        &keys.encoding,
    )
    .map(Some)
}

fn validate_jwt(keys: &Keys, token: &str) -> JwtResult<TokenData<Claims>> {
    jsonwebtoken::decode::<Claims>(token, &keys.decoding, &Validation::default())
}

/// The authenticated caller of a protected route.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl AuthUser {
    fn development() -> Self {
        Self {
            uid: format!("dev-user-{}", chrono::Utc::now().timestamp_millis()),
            email: "dev@example.com".to_string(),
            name: "Development User".to_string(),
            role: Role::Admin,
        }
    }

    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.role.can(permission) {
            Ok(())
        } else {
            Err(AppError::from(
                StatusCode::FORBIDDEN,
                "you do not have permission to do that",
            ))
        }
    }

    /// Allows acting on one's own record, or on anyone's with `permission`.
    pub fn require_self_or(&self, uid: &str, permission: Permission) -> Result<(), AppError> {
        if self.uid == uid {
            Ok(())
        } else {
            self.require(permission)
        }
    }
}

fn unauthorized(message: &'static str) -> AppError {
    AppError::from(StatusCode::UNAUTHORIZED, message)
}

#[async_trait]
impl<B> FromRequest<B> for AuthUser
where
    B: Send,
{
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .ok_or_else(|| unauthorized("No token provided"))?
            .to_str()
            .map_err(|_| unauthorized("Invalid token format"))?;

        let token = match header.split_once(' ') {
            Some(("Bearer", token)) => token.trim(),
            _ => return Err(unauthorized("Invalid token format")),
        };

        let Some(keys) = KEYS.as_ref() else {
            tracing::debug!("development mode: accepting token without verification");
            return Ok(AuthUser::development());
        };

        let claims = validate_jwt(keys, token)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected bearer token");
                unauthorized("Invalid token")
            })?
            .claims;

        Ok(AuthUser {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
            role: claims.role,
        })
    }
}
