use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// Header NYC Open Data (Socrata) reads application tokens from.
pub const SOCRATA_APP_TOKEN_HEADER: &str = "X-App-Token";

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// Anonymous Socrata requests are throttled; sending an app token lifts the
/// shared limit.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    /// # Errors
    ///
    /// Fails if `header_name` or `key` cannot be used in an HTTP header.
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .with_context(|| format!("invalid header name '{header_name}'"))?;
        let mut value = HeaderValue::from_str(key).context("API key is not a valid header value")?;
        value.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// Sends `key` as a Socrata application token.
    pub fn socrata(inner: C, key: &str) -> Result<Self> {
        Self::new(inner, SOCRATA_APP_TOKEN_HEADER, key)
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    #[test]
    fn test_rejects_invalid_header_name() {
        assert!(ApiKey::new(BasicClient::new(), "bad header", "k").is_err());
    }

    #[test]
    fn test_rejects_invalid_key() {
        assert!(ApiKey::socrata(BasicClient::new(), "line\nbreak").is_err());
    }

    #[test]
    fn test_socrata_header() {
        let client = ApiKey::socrata(BasicClient::new(), "token").unwrap();
        assert_eq!(client.header_name.as_str(), "x-app-token");
        assert!(client.value.is_sensitive());
    }
}
