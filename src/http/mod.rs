//! HTTP transport for the JMAP API
//!
//! Exposes the session resource, the API endpoint that feeds requests to the
//! executor, and a health probe.

pub mod handlers;
