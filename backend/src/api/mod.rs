use actix_web::web;

pub mod login;
pub mod price;
pub mod users;

pub fn config(cfg: &mut web::ServiceConfig) {
    // Token issuance (public)
    cfg.service(
        web::scope("/api/login")
            .service(login::login_access_token)
            .service(login::test_token),
    );

    // Current user (protected)
    cfg.service(web::scope("/api/users").service(users::read_user_me));

    // Price proxy (superuser only)
    cfg.service(web::scope("/api/price").service(price::read_latest_price));
}
