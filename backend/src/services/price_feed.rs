use actix_web::web::Bytes;
use async_trait::async_trait;

/// Domestic live-price document published by exgold.
pub const DEFAULT_UPSTREAM_URL: &str =
    "https://prod-api.exgold.co.kr/api/v1/main/detail/domestic/price";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceFeedError {
    /// Upstream answered with a non-2xx status
    UpstreamFailure { status: u16 },
    /// Request never produced a response (DNS, connect, TLS, body read)
    Unreachable(String),
    /// Upstream answered 2xx but the body is not JSON
    InvalidBody(String),
}

impl PriceFeedError {
    /// Status to answer the caller with: upstream 5xx passes through, the rest is 502.
    pub fn relayed_status(&self) -> u16 {
        match self {
            PriceFeedError::UpstreamFailure { status } if (500..600).contains(status) => *status,
            _ => 502,
        }
    }
}

impl std::fmt::Display for PriceFeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceFeedError::UpstreamFailure { status } => {
                write!(f, "Price upstream returned HTTP {}", status)
            }
            PriceFeedError::Unreachable(msg) => write!(f, "Price upstream unreachable: {}", msg),
            PriceFeedError::InvalidBody(msg) => {
                write!(f, "Price upstream returned invalid JSON: {}", msg)
            }
        }
    }
}

impl std::error::Error for PriceFeedError {}

/// Source of the latest price document
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Fetches the raw JSON body. One call is one upstream request; no retries.
    async fn fetch_latest(&self) -> Result<Bytes, PriceFeedError>;
}

pub struct ExgoldClient {
    client: reqwest::Client,
    url: String,
}

impl ExgoldClient {
    /// Builds a client that never follows redirects, so a 3xx surfaces as
    /// `UpstreamFailure` and each fetch is a single request.
    pub fn new(url: String) -> Result<Self, reqwest::Error> {
        let client = client_builder().build()?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PriceFeed for ExgoldClient {
    async fn fetch_latest(&self) -> Result<Bytes, PriceFeedError> {
        log::debug!("Fetching latest prices from {}", self.url);

        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PriceFeedError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            log::warn!("Price upstream {} answered {}", self.url, status);
            return Err(PriceFeedError::UpstreamFailure {
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| PriceFeedError::Unreachable(e.to_string()))?;

        ensure_json(&body)?;
        Ok(body)
    }
}

pub fn client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder().redirect(reqwest::redirect::Policy::none())
}

/// Checks that `body` is a JSON document without building a value tree.
pub fn ensure_json(body: &[u8]) -> Result<(), PriceFeedError> {
    serde_json::from_slice::<serde::de::IgnoredAny>(body)
        .map(|_| ())
        .map_err(|e| PriceFeedError::InvalidBody(e.to_string()))
}
