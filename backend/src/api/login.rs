use crate::{
    error::ApiError,
    models::{Token, UserPublic},
    services::{
        auth::{self, CurrentUser, TokenSettings},
        users::{self, UserRepository},
    },
};
use actix_web::{HttpResponse, post, web};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String, // email address
    pub password: String,
}

/// Exchange email + password for a bearer access token
#[post("/access-token")]
pub async fn login_access_token(
    repo: web::Data<dyn UserRepository>,
    settings: web::Data<TokenSettings>,
    item: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = users::authenticate(repo.get_ref(), &item.username, &item.password)?
        .ok_or_else(|| ApiError::BadRequest("Incorrect email or password".to_string()))?;

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    let token = auth::create_jwt(user.id, &settings).map_err(ApiError::Internal)?;
    log::info!("Issued access token for user {}", user.id);

    Ok(HttpResponse::Ok().json(Token::bearer(token)))
}

/// Echo the user the bearer token belongs to
#[post("/test-token")]
pub async fn test_token(current: CurrentUser) -> HttpResponse {
    HttpResponse::Ok().json(UserPublic::from(current.0))
}
