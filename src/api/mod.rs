//! API layer - HTTP endpoints and middleware

pub mod cache;
pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod types;
pub mod v1;

pub use router::{create_cache_service_router, create_router, MetricsEndpoint};
pub use state::{AppState, CacheServiceState};
