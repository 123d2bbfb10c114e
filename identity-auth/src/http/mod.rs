//! Outbound HTTP client building with middleware.

mod client;
mod middleware;

pub use client::{HttpClient, HttpClientBuilder, HttpClientConfig};
pub use middleware::RequestLogger;
