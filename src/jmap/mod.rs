//! JMAP request processing core
//!
//! Parses the request envelope, resolves back-references between calls and
//! dispatches each call through the [`MethodRegistry`]. Nothing here knows
//! about HTTP.

pub mod cache;
pub mod envelope;
pub mod errors;
pub mod executor;
pub mod pointer;
pub mod reference;
pub mod registry;

pub use envelope::{MethodCall, MethodResponse, Request, Response, ERROR_RESPONSE_NAME};
pub use errors::{MethodError, ProblemDetails, RequestError};
pub use executor::{Executor, RequestLimits, DEFAULT_MAX_CALLS_IN_REQUEST};
pub use reference::{ResultReference, REFERENCE_PREFIX};
pub use registry::{Method, MethodRegistry, CORE_CAPABILITY};
