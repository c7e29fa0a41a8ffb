//! service-core: Shared infrastructure for the credential gateway services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod registry;
pub mod retry;

pub use axum;
pub use reqwest;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tokio_util;
pub use tracing;
pub use validator;
