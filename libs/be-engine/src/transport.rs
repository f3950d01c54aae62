use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Request, Response, StatusCode};

use crate::error::SessionError;

/// Authentication header carried by every platform request.
pub const TOKEN_HEADER: &str = "X-Token";

/// Diagnostic target for the verbose request/response echo.
pub const WIRE_TARGET: &str = "be_engine::wire";

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub url: String,
    pub connect_timeout: Duration,
    /// Bounds waiting for response headers and every later body read.
    pub read_timeout: Duration,
}

/// Authenticated long-lived GET against one stream endpoint.
///
/// No overall request timeout is set on the client: the body is expected to
/// stay open indefinitely. Silence is bounded by `read_timeout` instead.
pub struct Transport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl Transport {
    pub fn new(config: TransportConfig) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(SessionError::Client)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Send the GET and wait for response headers.
    ///
    /// 401 maps to `Unauthorized`, any other non-2xx to `Status`.
    pub async fn open(
        &self,
        token: &str,
        query: &[(&str, &str)],
        verbose: bool,
    ) -> Result<Response, SessionError> {
        let mut builder = self.client.get(&self.config.url).header(TOKEN_HEADER, token);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let request = builder.build().map_err(SessionError::Client)?;
        if verbose {
            echo_request(&request);
        }

        let response = match tokio::time::timeout(self.config.read_timeout, self.client.execute(request)).await {
            Err(_) => return Err(SessionError::ConnectTimeout(self.config.read_timeout)),
            Ok(Err(e)) if e.is_timeout() => {
                return Err(SessionError::ConnectTimeout(self.config.connect_timeout));
            }
            Ok(Err(e)) => return Err(SessionError::Connect(e)),
            Ok(Ok(response)) => response,
        };
        if verbose {
            echo_response(&response);
        }

        check_status(response)
    }
}

fn check_status(response: Response) -> Result<Response, SessionError> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(SessionError::Unauthorized),
        status if status.is_success() => Ok(response),
        status => Err(SessionError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        }),
    }
}

fn redacted_headers(headers: &HeaderMap) -> Vec<String> {
    headers
        .iter()
        .map(|(name, value)| {
            if name.as_str().eq_ignore_ascii_case(TOKEN_HEADER) {
                format!("{name}: <redacted>")
            } else {
                format!("{name}: {}", value.to_str().unwrap_or("<binary>"))
            }
        })
        .collect()
}

fn echo_request(request: &Request) {
    tracing::info!(
        target: WIRE_TARGET,
        method = %request.method(),
        url = %request.url(),
        headers = ?redacted_headers(request.headers()),
        "request"
    );
}

fn echo_response(response: &Response) {
    tracing::info!(
        target: WIRE_TARGET,
        status = %response.status(),
        version = ?response.version(),
        headers = ?redacted_headers(response.headers()),
        "response"
    );
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderValue, CONTENT_TYPE};

    use super::*;

    #[test]
    fn token_is_never_echoed() {
        let mut headers = HeaderMap::new();
        headers.insert("x-token", HeaderValue::from_static("s3cret"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let echoed = redacted_headers(&headers);

        assert!(echoed.contains(&"x-token: <redacted>".to_string()));
        assert!(echoed.contains(&"content-type: application/json".to_string()));
        assert!(echoed.iter().all(|h| !h.contains("s3cret")));
    }
}
