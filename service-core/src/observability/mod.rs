pub mod logging;
pub mod redact;
pub mod trace_context;

pub use logging::init_tracing;
pub use redact::{redact_json, Redacted, REDACTED_PLACEHOLDER};
pub use trace_context::{inject_trace_headers, REQUEST_ID_HEADER, TRACEPARENT_HEADER};
