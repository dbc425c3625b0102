//! Module for the metrics command API.
//!
//! The host process registers these handlers as its diagnostic and stop
//! commands; this crate only implements what they do.

pub mod handlers;

pub use handlers::{diagnostic, stop, ApiError};
