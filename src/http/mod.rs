//! HTTP boundary module
//!
//! Body negotiation and the responses produced before a function is invoked.
//! Kept free of invocation logic.

pub mod body;
pub mod response;

// Re-export commonly used items
pub use body::{check_content_length, ensure_content_type, parser_for, read_body, Parser};
pub use response::{
    build_400_response, build_405_response, build_413_response, build_body_error_response,
};
