//! Shared HTTP plumbing for upstream model APIs

pub mod http_client;

pub use http_client::{ByteStream, HttpClient, HttpClientTrait};

#[cfg(test)]
pub use http_client::mock;
