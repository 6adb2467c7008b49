//! HTTP access for remote CSV feeds.

mod basic;
mod client;
pub mod auth;

pub use auth::ApiKey;
pub use basic::BasicClient;
pub use client::HttpClient;

use bytes::Bytes;
use tracing::debug;

use crate::error::LoadError;

/// GETs `url` and returns the response body.
///
/// # Errors
///
/// Returns [`LoadError::InvalidUrl`] for unparsable URLs,
/// [`LoadError::Http`] for transport failures and [`LoadError::Status`]
/// for non-success responses.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes, LoadError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| LoadError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let http_err = |source| LoadError::Http {
        url: url.to_string(),
        source,
    };

    let resp = client.execute(req).await.map_err(http_err)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(LoadError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = resp.bytes().await.map_err(http_err)?;
    debug!(url, bytes = body.len(), "Response body received");
    Ok(body)
}

