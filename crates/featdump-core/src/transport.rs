//! Request transport: a single parameterized GET, bounded retries and pacing.

use std::thread;
use std::time::Duration;

use crate::error::{ExtractError, Result};

/// Query parameters of one request, in the order they are sent
pub type Query = Vec<(&'static str, String)>;

/// Issues one request and returns the raw response text
pub trait Transport {
    fn request(&self, query: &[(&'static str, String)]) -> Result<String>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn request(&self, query: &[(&'static str, String)]) -> Result<String> {
        (**self).request(query)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn request(&self, query: &[(&'static str, String)]) -> Result<String> {
        (**self).request(query)
    }
}

/// Options applied to every HTTP request of a run
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub verify_tls: bool,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self {
            timeout: None,
            verify_tls: true,
            headers: Vec::new(),
        }
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a `Name: value` header argument
pub fn parse_header(s: &str) -> Result<(String, String)> {
    match s.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ExtractError::config(
            "header",
            format!("'{}' is not of the form <name>:<value>", s),
        )),
    }
}

/// Blocking HTTP transport against one service endpoint
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, options: &RequestOptions) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in &options.headers {
            let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ExtractError::config("header", format!("{}: {}", name, e)))?;
            let value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| ExtractError::config("header", format!("{}: {}", value, e)))?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!options.verify_tls);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ExtractError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ExtractError::Io)?;

        Ok(Self {
            url: url.into(),
            client,
            runtime,
        })
    }
}

impl Transport for HttpTransport {
    fn request(&self, query: &[(&'static str, String)]) -> Result<String> {
        let url = reqwest::Url::parse_with_params(
            &self.url,
            query.iter().map(|(k, v)| (*k, v.as_str())),
        )
        .map_err(|e| ExtractError::config("url", format!("{}: {}", self.url, e)))?;

        tracing::debug!("GET {}", url);

        self.runtime.block_on(async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| ExtractError::Network(e.to_string()))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| ExtractError::Network(e.to_string()))?;

            if !status.is_success() {
                return Err(ExtractError::HttpStatus {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(body)
        })
    }
}

/// Retries transient failures with linear backoff.
///
/// Attempt `n` that fails is followed by a sleep of `n * retry_delay`. Server
/// exceptions and other non-transient errors are returned immediately.
pub struct Retrying<T> {
    inner: T,
    max_attempts: u32,
    retry_delay: Duration,
    sleep: fn(Duration),
}

impl<T> Retrying<T> {
    pub fn new(inner: T, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            retry_delay,
            sleep: thread::sleep,
        }
    }

    #[cfg(test)]
    fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }
}

impl<T: Transport> Transport for Retrying<T> {
    fn request(&self, query: &[(&'static str, String)]) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.request(query) {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() => {
                    if attempt >= self.max_attempts {
                        return Err(ExtractError::RetriesExhausted {
                            attempts: attempt,
                            source: Box::new(e),
                        });
                    }
                    let delay = self.retry_delay * attempt;
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    (self.sleep)(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Sleeps after every `every` requests to stay under server rate limits
#[derive(Debug, Clone)]
pub struct Pacer {
    every: u32,
    pause: Duration,
    issued: u32,
    sleep: fn(Duration),
}

impl Pacer {
    /// `every == 0` disables pacing
    pub fn new(every: u32, pause: Duration) -> Self {
        Self {
            every,
            pause,
            issued: 0,
            sleep: thread::sleep,
        }
    }

    #[cfg(test)]
    fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    /// Count one request about to be issued, pausing first when due.
    ///
    /// Returns whether a pause happened.
    pub fn tick(&mut self) -> bool {
        if self.every == 0 {
            return false;
        }
        self.issued += 1;
        if self.issued < self.every {
            return false;
        }
        self.issued = 0;
        tracing::info!("Pausing for {:?}", self.pause);
        (self.sleep)(self.pause);
        true
    }
}
