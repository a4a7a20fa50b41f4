//! HTTP utilities for GCE REST and metadata calls

use reqwest::{Client, StatusCode};
use std::time::Duration;

const USER_AGENT: &str = concat!("gce-sd/", env!("CARGO_PKG_VERSION"));

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Status and body of a completed request
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// HTTP client wrapper shared by the token source and the group resolver
#[derive(Clone)]
pub struct GceHttpClient {
    client: Client,
}

impl GceHttpClient {
    /// Create a client that connects directly, ignoring proxy environment variables
    pub fn direct(timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT).no_proxy();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Create a client routed through `proxy_url`.
    ///
    /// An unparsable proxy URL is logged and ignored, leaving a direct client.
    pub fn with_proxy(proxy_url: Option<&str>, timeout: Option<Duration>) -> reqwest::Result<Self> {
        let proxy = match proxy_url.filter(|u| !u.is_empty()) {
            Some(url) => match reqwest::Proxy::all(url) {
                Ok(proxy) => Some(proxy),
                Err(e) => {
                    tracing::warn!("Ignoring invalid API proxy URL {:?}: {}", url, e);
                    None
                }
            },
            None => None,
        };

        let Some(proxy) = proxy else {
            return Self::direct(timeout);
        };

        let mut builder = Client::builder().user_agent(USER_AGENT).proxy(proxy);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// GET `url` with one extra header and return the raw status and body
    pub async fn get(&self, url: &str, header: (&str, &str)) -> reqwest::Result<RawResponse> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(header.0, header.1)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!("{} returned {}: {}", url, status, sanitize_for_log(&body));
        }

        Ok(RawResponse { status, body })
    }
}
