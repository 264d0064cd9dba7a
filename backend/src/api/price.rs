use crate::{
    error::ApiError,
    services::{auth::CurrentSuperuser, price_feed::PriceFeed},
};
use actix_web::{HttpResponse, get, http::header::ContentType, web};

/// Relay the latest domestic precious-metal prices.
///
/// The upstream JSON is returned byte for byte; it is not parsed into
/// `PriceResponse`, so extra or missing upstream fields pass through.
#[get("/latest")]
pub async fn read_latest_price(
    superuser: CurrentSuperuser,
    feed: web::Data<dyn PriceFeed>,
) -> Result<HttpResponse, ApiError> {
    log::debug!("User {} requested latest prices", superuser.0.id);

    let body = feed.fetch_latest().await?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(body))
}
