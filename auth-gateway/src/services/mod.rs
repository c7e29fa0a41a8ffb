pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod mock;
pub mod upstream;

pub use credentials::{Claims, CredentialValidator, HttpKeySource, KeySource, TokenValidation};
pub use dispatcher::AuthDispatcher;
pub use error::{GatewayError, ValidatorError};
pub use mock::MockIdentityProvider;
pub use upstream::{CallContext, ClientCredentials, CognitoClient, IdentityProvider, UpstreamAuth};
