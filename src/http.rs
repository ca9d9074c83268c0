//! Blocking HTTP client shared by search providers and the image inspector.
use crate::error::{FetchError, ProviderError};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Browser-like agent string; image hosts frequently refuse bare clients.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Upper bound on a downloaded image body.
pub const MAX_IMAGE_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            user_agent: user_agent.to_string(),
        }
    }

    /// Download a body of at most `limit` bytes.
    pub fn get_bytes(&self, url: &str, limit: u64) -> Result<Vec<u8>, FetchError> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .map_err(|err| fetch_error(url, err))?;
        response
            .body_mut()
            .with_config()
            .limit(limit)
            .read_to_vec()
            .map_err(|err| fetch_error(url, err))
    }

    /// GET a text page with query parameters.
    pub fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, ProviderError> {
        let mut request = self
            .agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str());
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let mut response = request
            .call()
            .map_err(|err| ProviderError::Http(format!("{url}: {err}")))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|err| ProviderError::Http(format!("{url}: {err}")))
    }

    /// GET a JSON document with query parameters and an explicit referer.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        referer: &str,
    ) -> Result<T, ProviderError> {
        let mut request = self
            .agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .header("Referer", referer);
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let mut response = request
            .call()
            .map_err(|err| ProviderError::Http(format!("{url}: {err}")))?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|err| ProviderError::Layout(format!("{url}: {err}")))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
    }
}

fn fetch_error(url: &str, err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(status) => FetchError::Status {
            url: url.to_string(),
            status,
        },
        ureq::Error::Timeout(_) => FetchError::Timeout {
            url: url.to_string(),
        },
        other => FetchError::Transport {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}
