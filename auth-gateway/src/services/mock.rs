use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use super::error::GatewayError;
use super::upstream::{CallContext, IdentityProvider, UpstreamAuth};
use crate::models::{Operation, ResponseShape};

/// One call as seen by [`MockIdentityProvider`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: Operation,
    pub payload: Value,
    pub auth: UpstreamAuth,
}

/// In-process identity provider with scripted results.
///
/// Scripted results are consumed in order per operation; once exhausted the
/// mock answers with a plausible success for the operation's shape.
#[derive(Default)]
pub struct MockIdentityProvider {
    scripted: Mutex<HashMap<Operation, VecDeque<Result<Value, GatewayError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, operation: Operation, result: Result<Value, GatewayError>) -> &Self {
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(operation)
            .or_default()
            .push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn default_result(operation: Operation) -> Value {
        match operation.binding().shape {
            ResponseShape::Tokens | ResponseShape::RefreshedTokens => json!({
                "AuthenticationResult": {
                    "AccessToken": "mock-access-token",
                    "IdToken": "mock-id-token",
                    "RefreshToken": "mock-refresh-token",
                    "ExpiresIn": 3600,
                    "TokenType": "Bearer"
                }
            }),
            ResponseShape::SignUp => json!({
                "UserConfirmed": false,
                "UserSub": "mock-user-sub"
            }),
            ResponseShape::Message => json!({}),
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn call(
        &self,
        operation: Operation,
        payload: Value,
        auth: UpstreamAuth,
        ctx: &CallContext,
    ) -> Result<Value, GatewayError> {
        if ctx.cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                operation,
                payload,
                auth,
            });

        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&operation)
            .and_then(VecDeque::pop_front);

        scripted.unwrap_or_else(|| Ok(Self::default_result(operation)))
    }
}
