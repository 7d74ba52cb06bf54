use crate::config::HttpConfig;
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use metrics::counter;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Attempt budget for one fetch. Attempts run back-to-back with no backoff;
/// callers space out requests themselves.
pub const MAX_ATTEMPTS: u32 = 5;

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub body: String,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Why a single GET attempt produced no usable response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptFailure {
    Timeout,
    Status(u16),
    Transport(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Timeout => write!(f, "timed out"),
            AttemptFailure::Status(code) => write!(f, "HTTP status {}", code),
            AttemptFailure::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<HttpGetResult, AttemptFailure>;
}

pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClientPort for ReqwestHttp {
    async fn get(&self, url: &str) -> std::result::Result<HttpGetResult, AttemptFailure> {
        let resp = self.client.get(url).send().await.map_err(classify)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(classify)?;
        Ok(HttpGetResult { status, body })
    }
}

fn classify(err: reqwest::Error) -> AttemptFailure {
    if err.is_timeout() {
        AttemptFailure::Timeout
    } else {
        AttemptFailure::Transport(err.to_string())
    }
}

/// Retrieves raw page text with a bounded retry budget.
#[derive(Clone)]
pub struct Fetcher {
    http: Arc<dyn HttpClientPort>,
    max_attempts: u32,
}

impl Fetcher {
    pub fn new(http: Arc<dyn HttpClientPort>) -> Self {
        Self {
            http,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub async fn fetch(&self, url: &str) -> Result<String> {
        for attempt in 1..=self.max_attempts {
            counter!("gridwatch_fetch_attempts_total").increment(1);
            let failure = match self.http.get(url).await {
                Ok(resp) if resp.is_success() => {
                    debug!(url, attempt, bytes = resp.body.len(), "fetched page");
                    return Ok(resp.body);
                }
                Ok(resp) => AttemptFailure::Status(resp.status),
                Err(failure) => failure,
            };
            counter!("gridwatch_fetch_failures_total").increment(1);
            warn!(url, attempt, max_attempts = self.max_attempts, "fetch attempt failed: {}", failure);
        }
        counter!("gridwatch_fetch_exhausted_total").increment(1);
        error!(url, attempts = self.max_attempts, "giving up on fetch");
        Err(ScraperError::FetchExhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
        })
    }
}
