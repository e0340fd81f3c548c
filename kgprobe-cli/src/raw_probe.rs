//! Direct HTTP probes that bypass the pipeline library.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// A raw probe could not get an acceptable answer from its endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid header '{name}'")]
    InvalidHeader { name: String },

    #[error("request to {url} timed out after {:.1}s", timeout.as_secs_f64())]
    Timeout { url: String, timeout: Duration },

    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
}

/// What a raw endpoint answered.
#[derive(Debug, Clone)]
pub struct RawProbeResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
}

impl RawProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx answer into [`TransportError::Status`].
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                url: self.url,
                status: self.status,
                body: self.body,
            })
        }
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// First `max_chars` characters of the body.
    pub fn body_preview(&self, max_chars: usize) -> String {
        let preview: String = self.body.chars().take(max_chars).collect();
        if preview.len() < self.body.len() {
            format!("{preview}...")
        } else {
            preview
        }
    }
}

fn header_map(headers: &[(&str, &str)]) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let invalid = || TransportError::InvalidHeader {
            name: name.to_string(),
        };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn classify(url: &str, timeout: Duration, source: reqwest::Error) -> TransportError {
    if source.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else if source.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            source,
        }
    } else {
        TransportError::Request {
            url: url.to_string(),
            source,
        }
    }
}

/// Send one request to `url`: a GET without `payload`, a JSON POST with it.
///
/// Any HTTP status is returned as a response; only failures to get an answer
/// at all (bad url or header, timeout, refused connection) are errors. The
/// client lives for this call only.
pub async fn probe_raw_endpoint(
    url: &str,
    payload: Option<&Value>,
    headers: &[(&str, &str)],
    timeout: Duration,
) -> Result<RawProbeResponse, TransportError> {
    let parsed = Url::parse(url).map_err(|err| TransportError::InvalidUrl {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(TransportError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    let headers = header_map(headers)?;

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|source| TransportError::Request {
            url: url.to_string(),
            source,
        })?;

    let request = match payload {
        Some(body) => client.post(parsed).json(body),
        None => client.get(parsed),
    }
    .headers(headers);

    let started = Instant::now();
    let response = request
        .send()
        .await
        .map_err(|err| classify(url, timeout, err))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|err| classify(url, timeout, err))?;
    let elapsed = started.elapsed();

    debug!("{} answered {} in {} ms", url, status, elapsed.as_millis());
    Ok(RawProbeResponse {
        url: url.to_string(),
        status,
        body,
        elapsed,
    })
}
