use async_trait::async_trait;
use reqwest::{Request, Response};

/// Sends one HTTP request. Wrappers such as [`ApiKey`](super::ApiKey)
/// decorate an inner client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for Box<T> {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
