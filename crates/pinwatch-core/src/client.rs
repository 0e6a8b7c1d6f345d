//! Safe call wrapper: one bounded HTTP GET whose every failure comes back as a
//! [`FetchError`] value.

use std::time::{Duration, Instant};

use log::debug;
use serde_json::Value;

use crate::error::{ConfigError, FetchError, FetchErrorKind};
use crate::normalize::JsonObject;

/// Key under which the measured round-trip time is inserted into a response.
pub const RESPONSE_TIME_KEY: &str = "_response_time_ms";

/// Shared HTTP client with a connect-phase sub-timeout and a per-call budget.
///
/// Performs no retries; see [`crate::RetryPolicy`] for the opt-in layer above.
#[derive(Debug, Clone)]
pub struct SafeCaller {
    http: reqwest::Client,
    default_timeout: Duration,
    connect_timeout: Duration,
}

impl SafeCaller {
    /// `connect_timeout` is clamped to `default_timeout`.
    pub fn new(default_timeout: Duration, connect_timeout: Duration) -> Result<Self, ConfigError> {
        let connect_timeout = connect_timeout.min(default_timeout);
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .no_proxy()
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            default_timeout,
            connect_timeout,
        })
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Effective connect-phase budget, never longer than the call budget.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// GET `url` and decode a JSON object.
    ///
    /// On success the object carries [`RESPONSE_TIME_KEY`] with the elapsed
    /// milliseconds. `timeout` overrides the default budget for this call.
    pub async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<JsonObject, FetchError> {
        let budget = timeout.unwrap_or(self.default_timeout);
        let start = Instant::now();
        let result = self.get_inner(url, budget).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(mut obj) => {
                debug!("GET {url} -> ok in {elapsed_ms}ms");
                obj.insert(RESPONSE_TIME_KEY.to_string(), Value::from(elapsed_ms));
                Ok(obj)
            }
            Err(err) => {
                debug!("GET {url} -> {} after {elapsed_ms}ms", err.kind);
                Err(err.with_url(url))
            }
        }
    }

    async fn get_inner(&self, url: &str, budget: Duration) -> Result<JsonObject, FetchError> {
        let response = self
            .http
            .get(url)
            .timeout(budget)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::new(
                FetchErrorKind::HttpError {
                    status: status.as_u16(),
                },
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let body = response.bytes().await.map_err(classify)?;
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(obj)) => Ok(obj),
            Ok(other) => Err(FetchError::new(
                FetchErrorKind::InvalidJson,
                format!("expected a JSON object, got {}", json_type(&other)),
            )),
            Err(e) => Err(FetchError::new(
                FetchErrorKind::InvalidJson,
                format!("invalid JSON response: {e}"),
            )),
        }
    }
}

/// Map a transport error onto the taxonomy. A connect-phase timeout is a
/// connection failure, not a call timeout.
fn classify(err: reqwest::Error) -> FetchError {
    let kind = if err.is_connect() {
        FetchErrorKind::ConnectionFailed
    } else if err.is_timeout() {
        FetchErrorKind::Timeout
    } else if err.is_decode() || err.is_body() {
        FetchErrorKind::InvalidJson
    } else {
        FetchErrorKind::Unknown
    };
    FetchError::new(kind, err.to_string())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
