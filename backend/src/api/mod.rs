//! Central module for the command surface exposed to the host process.
//!
//! The host (plugin registration layer) owns command parsing and transport;
//! the handlers here implement the diagnostic query and the stop trigger.

pub mod metrics;
