//! # Middleware Stack
//!
//! - [`metrics`]: Prometheus request metrics and ingestion counters.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly in
//! [`crate::app`]; admin authentication lives in [`crate::auth`].

pub mod metrics;
