//! HTTP fetching for the crawl loop.
//!
//! One shared session (cookie store included) per crawl run. Transient
//! connection failures are retried a bounded number of times with a fixed
//! cooldown and a fresh user agent between attempts; PTT blocks on request
//! volume per identity, so rotation beats exponential backoff here.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::constants::{random_user_agent, OVER18_CONSENT_PATH};

/// Bound on fetch attempts for a single URL.
pub const MAX_FETCH_ATTEMPTS: u32 = 5;

/// Injectable sleep strategy so tests can run the retry loop with zero delay.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeping.
#[derive(Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// No-op sleeper for tests.
#[derive(Debug, Default)]
pub struct NoopSleeper;

#[async_trait]
impl Sleeper for NoopSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: StatusCode },
    #[error("connection to {url} failed after {attempts} attempts: {source}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

enum AttemptError {
    Network(reqwest::Error),
    Status(StatusCode),
    InvalidUrl(url::ParseError),
}

/// HTTP session for crawling one or more boards.
pub struct PttClient {
    client: reqwest::Client,
    sleeper: Arc<dyn Sleeper>,
    retry_cooldown: Duration,
    user_agent: Mutex<&'static str>,
}

impl PttClient {
    /// Create a client with real sleeping.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(retry_cooldown: Duration) -> Result<Self> {
        Self::with_sleeper(retry_cooldown, Arc::new(TokioSleeper))
    }

    /// Create a client with an injected sleep strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn with_sleeper(retry_cooldown: Duration, sleeper: Arc<dyn Sleeper>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            sleeper,
            retry_cooldown,
            user_agent: Mutex::new(random_user_agent()),
        })
    }

    /// Fetch a page, retrying transient connection failures.
    ///
    /// A landing on the over-18 interstitial is answered by POSTing consent
    /// once and re-requesting; the consent cookie then rides along for the
    /// rest of the session.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Status`] on a non-2xx response (not retried)
    /// and [`FetchError::Exhausted`] after [`MAX_FETCH_ATTEMPTS`] transport
    /// failures.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(AttemptError::Status(status)) => {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status,
                    });
                }
                Err(AttemptError::InvalidUrl(source)) => {
                    return Err(FetchError::InvalidUrl {
                        url: url.to_string(),
                        source,
                    });
                }
                Err(AttemptError::Network(source)) => {
                    if attempts >= MAX_FETCH_ATTEMPTS {
                        return Err(FetchError::Exhausted {
                            url: url.to_string(),
                            attempts,
                            source,
                        });
                    }
                    warn!(
                        url,
                        attempt = attempts,
                        "Connection failed, cooling down and rotating user agent: {source}"
                    );
                    self.sleeper.sleep(self.retry_cooldown).await;
                    self.rotate_user_agent();
                }
            }
        }
    }

    /// Sleep through a pacing delay using the injected strategy.
    pub async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            self.sleeper.sleep(duration).await;
        }
    }

    async fn attempt(&self, url: &str) -> Result<String, AttemptError> {
        let mut response = self
            .client
            .get(url)
            .header(USER_AGENT, self.current_user_agent())
            .send()
            .await
            .map_err(AttemptError::Network)?;

        if response.url().as_str().contains("over18") {
            debug!(url, "Hit age-verification interstitial, posting consent");
            self.accept_over18(url).await?;
            response = self
                .client
                .get(url)
                .header(USER_AGENT, self.current_user_agent())
                .send()
                .await
                .map_err(AttemptError::Network)?;
        }

        if !response.status().is_success() {
            return Err(AttemptError::Status(response.status()));
        }

        response.text().await.map_err(AttemptError::Network)
    }

    async fn accept_over18(&self, requested_url: &str) -> Result<(), AttemptError> {
        let requested = Url::parse(requested_url).map_err(AttemptError::InvalidUrl)?;
        let mut consent = requested.clone();
        consent.set_path(OVER18_CONSENT_PATH);
        consent.set_query(None);

        self.client
            .post(consent)
            .header(USER_AGENT, self.current_user_agent())
            .form(&[("from", requested.path()), ("yes", "yes")])
            .send()
            .await
            .map_err(AttemptError::Network)?;

        Ok(())
    }

    fn current_user_agent(&self) -> &'static str {
        *self.user_agent.lock().unwrap()
    }

    fn rotate_user_agent(&self) {
        *self.user_agent.lock().unwrap() = random_user_agent();
    }
}

impl std::fmt::Debug for PttClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PttClient")
            .field("retry_cooldown", &self.retry_cooldown)
            .finish_non_exhaustive()
    }
}
