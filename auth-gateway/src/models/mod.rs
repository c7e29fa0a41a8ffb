pub mod operation;
pub mod request;
pub mod upstream;

pub use operation::{AuthScheme, GatewayBinding, Operation, ResponseShape};
pub use request::{AuthRequest, AuthResponse, AuthenticatedSession, SessionToken};
