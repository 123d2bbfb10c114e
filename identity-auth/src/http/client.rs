//! HTTP client builder shared by every provider instance.

use std::time::Duration;

use reqwest_middleware::ClientBuilder;

use super::RequestLogger;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout enforced by the transport.
    pub timeout: Duration,
    /// User agent string. Some providers (GitHub) reject requests without one.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("identity-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client used for token exchange and userinfo calls.
///
/// Cheap to clone; clones share one connection pool.
pub type HttpClient = reqwest_middleware::ClientWithMiddleware;

/// Builder for the provider HTTP client.
///
/// Failed requests are never retried here; a single failure is surfaced to the
/// caller, which owns any retry policy.
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    log_requests: bool,
}

impl HttpClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
            log_requests: true,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    /// Enable or disable the request logging middleware.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    /// Build the configured HTTP client.
    pub fn build(self) -> Result<HttpClient, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent)
            .build()?;

        let mut builder = ClientBuilder::new(client);
        if self.log_requests {
            builder = builder.with(RequestLogger);
        }

        Ok(builder.build())
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let builder = HttpClientBuilder::new();
        assert_eq!(builder.config.timeout, Duration::from_secs(30));
        assert!(builder.config.user_agent.starts_with("identity-auth/"));
        assert!(builder.log_requests);
    }

    #[test]
    fn test_builder_with_timeout() {
        let builder = HttpClientBuilder::new().with_timeout(Duration::from_secs(5));
        assert_eq!(builder.config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_with_user_agent() {
        let builder = HttpClientBuilder::new().with_user_agent("gateway/1.0".to_string());
        assert_eq!(builder.config.user_agent, "gateway/1.0");
    }

    #[tokio::test]
    async fn test_build_client() {
        let result = HttpClientBuilder::new().with_request_logging(false).build();
        assert!(result.is_ok());
    }
}
