pub mod auth;
pub mod price_feed;
pub mod users;
