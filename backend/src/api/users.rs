use crate::{models::UserPublic, services::auth::CurrentUser};
use actix_web::{HttpResponse, Responder, get};

/// Get the authenticated user
#[get("/me")]
pub async fn read_user_me(current: CurrentUser) -> impl Responder {
    HttpResponse::Ok().json(UserPublic::from(current.0))
}
