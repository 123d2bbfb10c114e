//! Request logging middleware.

use std::time::Instant;

use async_trait::async_trait;
use http::Extensions;
use log::*;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};

/// Logs every outbound provider request.
///
/// Only the host and path are logged. Query strings are dropped because
/// authorization codes and states travel there.
pub struct RequestLogger;

#[async_trait]
impl Middleware for RequestLogger {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let method = req.method().clone();
        let target = loggable_target(req.url());
        let started = Instant::now();

        let result = next.run(req, extensions).await;
        let elapsed_ms = started.elapsed().as_millis();

        match &result {
            Ok(response) => debug!(
                "{} {} -> {} ({} ms)",
                method,
                target,
                response.status(),
                elapsed_ms
            ),
            Err(e) => warn!("{} {} failed after {} ms: {}", method, target, elapsed_ms, e),
        }

        result
    }
}

fn loggable_target(url: &url::Url) -> String {
    format!("{}{}", url.host_str().unwrap_or_default(), url.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loggable_target_drops_query() {
        let url = url::Url::parse("https://accounts.zoho.com/oauth/v2/token?code=secret").unwrap();
        assert_eq!(loggable_target(&url), "accounts.zoho.com/oauth/v2/token");
    }
}
