use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger, web};
use std::sync::Arc;

use gold_price_backend::{
    api,
    config::Config,
    db,
    services::{
        price_feed::{ExgoldClient, PriceFeed},
        users::{self, DieselUserRepository, UserRepository},
    },
};

#[get("/")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "Gold Price Backend",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    // DB Pool initialization
    let pool = match db::init_pool(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let user_repo: Arc<dyn UserRepository> = Arc::new(DieselUserRepository::new(pool));

    if let (Some(email), Some(password)) = (
        config.first_superuser.as_deref(),
        config.first_superuser_password.as_deref(),
    ) {
        match users::ensure_first_superuser(user_repo.as_ref(), email, password) {
            Ok(Some(user)) => log::info!("Created first superuser {}", user.email),
            Ok(None) => {}
            Err(e) => log::warn!("Could not create first superuser {}: {:?}", email, e),
        }
    }

    let price_feed: Arc<dyn PriceFeed> = match ExgoldClient::new(config.price_upstream_url.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            log::error!("Failed to build price upstream client: {}", e);
            std::process::exit(1);
        }
    };
    let token_settings = config.token_settings();

    log::info!(
        "Starting Gold Price Backend at http://{}:{}",
        config.host,
        config.port
    );
    log::info!("Price upstream: {}", config.price_upstream_url);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .app_data(web::Data::new(token_settings.clone()))
            .app_data(web::Data::from(user_repo.clone()))
            .app_data(web::Data::from(price_feed.clone()))
            .service(health_check)
            .configure(api::config)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
