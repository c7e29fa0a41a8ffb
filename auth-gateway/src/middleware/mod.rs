pub mod auth;
pub mod context;

pub use auth::{auth_middleware, bearer_token, strip_bearer, Session};
pub use context::{request_context_middleware, RequestContext};
