//! Endpoint Providers - Sources of the Base Event URL

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{EventError, EventResult};
use crate::ports::transport::EndpointProvider;

/// Fixed URL from configuration.
#[derive(Debug, Clone)]
pub struct StaticEndpoint {
    url: String,
}

impl StaticEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl EndpointProvider for StaticEndpoint {
    async fn event_url(&self) -> EventResult<String> {
        if self.url.trim().is_empty() {
            return Err(EventError::EndpointUnavailable("event url is not configured".to_string()));
        }
        Ok(self.url.clone())
    }
}

/// URL published by the login session.
///
/// Unavailable until [`set`](Self::set) is called; [`clear`](Self::clear)
/// on logout.
#[derive(Debug, Default)]
pub struct SharedEndpoint {
    url: RwLock<Option<String>>,
}

impl SharedEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, url: impl Into<String>) {
        *self.url.write() = Some(url.into());
    }

    pub fn clear(&self) {
        *self.url.write() = None;
    }
}

#[async_trait]
impl EndpointProvider for SharedEndpoint {
    async fn event_url(&self) -> EventResult<String> {
        self.url
            .read()
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| EventError::EndpointUnavailable("not logged in".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_endpoint() {
        assert_eq!(StaticEndpoint::new("wss://a/ws").event_url().await.unwrap(), "wss://a/ws");
        assert!(matches!(
            StaticEndpoint::new(" ").event_url().await,
            Err(EventError::EndpointUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn shared_endpoint_follows_login() {
        let endpoint = SharedEndpoint::new();
        assert!(endpoint.event_url().await.is_err());
        endpoint.set("wss://b/ws");
        assert_eq!(endpoint.event_url().await.unwrap(), "wss://b/ws");
        endpoint.clear();
        assert!(endpoint.event_url().await.is_err());
    }
}
