use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use jsonwebtoken::{DecodingKey, Validation, decode};
use std::future::{Ready, ready};

use crate::{
    error::ApiError,
    models::{TokenPayload, User},
    services::users::UserRepository,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (User ID)
    pub exp: usize,  // Expiration
}

impl Claims {
    /// Typed view of the token contents; a non-numeric subject yields `sub: None`
    pub fn payload(&self) -> TokenPayload {
        TokenPayload {
            sub: self.sub.parse().ok(),
        }
    }
}

/// Signing secret and lifetime for access tokens
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub expire_minutes: i64,
}

/// The active user behind the request's bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// An active user that also holds the superuser flag
#[derive(Debug, Clone)]
pub struct CurrentSuperuser(pub User);

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(resolve_token_user(req).and_then(|user| {
            if user.is_active {
                Ok(CurrentUser(user))
            } else {
                Err(ApiError::BadRequest("Inactive user".to_string()))
            }
        }))
    }
}

impl FromRequest for CurrentSuperuser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(resolve_token_user(req).and_then(|user| {
            if !user.is_active {
                Err(ApiError::Forbidden("Inactive user".to_string()))
            } else if is_active_superuser(&user) {
                Ok(CurrentSuperuser(user))
            } else {
                Err(ApiError::Forbidden(
                    "The user doesn't have enough privileges".to_string(),
                ))
            }
        }))
    }
}

pub fn is_active_superuser(user: &User) -> bool {
    user.is_active && user.is_superuser
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves the bearer token to a stored user; the active flag is left to the caller
fn resolve_token_user(req: &HttpRequest) -> Result<User, ApiError> {
    let settings = req
        .app_data::<web::Data<TokenSettings>>()
        .ok_or_else(|| ApiError::Internal("TokenSettings not registered".to_string()))?;
    let users = req
        .app_data::<web::Data<dyn UserRepository>>()
        .ok_or_else(|| ApiError::Internal("UserRepository not registered".to_string()))?;

    let token = bearer_token(req).ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    let claims = decode_jwt(token, &settings.secret).map_err(|e| {
        log::debug!("Rejected access token: {}", e);
        ApiError::Unauthorized("Could not validate credentials".to_string())
    })?;

    let user_id = claims
        .payload()
        .sub
        .ok_or_else(|| ApiError::Unauthorized("Could not validate credentials".to_string()))?;

    users
        .get_by_id(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| e.to_string())?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, String> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| e.to_string())?;
    let argon2 = Argon2::default();
    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn create_jwt(user_id: i32, settings: &TokenSettings) -> Result<String, String> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| e.to_string())?
        .as_secs() as usize
        + (settings.expire_minutes.max(1) as usize) * 60;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )
    .map_err(|e| e.to_string())
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
