//! HTTP adapter that turns each inbound request into one invocation of a
//! user-supplied function and renders exactly one response from its report.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod invoke;
pub mod logger;
pub mod server;
