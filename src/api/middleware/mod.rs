//! API middleware components

pub mod logging;
pub mod metrics;

pub use logging::{logging_middleware, RequestId};
pub use metrics::metrics_middleware;
