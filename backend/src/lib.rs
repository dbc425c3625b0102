//! Metric core of the lnmetrics reporter.
//!
//! Collects periodic health snapshots of a Lightning node (channel liveness,
//! peer identity, forwarding outcomes), keeps them in a versioned document
//! with an append-only history, persists the document after every lifecycle
//! step and optionally exports it to a remote metrics server.
//!
//! The node, the durable storage writer and the server transport are
//! collaborators reached through [`adapters::NodeAdapter`],
//! [`database::SnapshotStore`] and [`publisher::MetricPublisher`].

pub mod api;
pub mod config;
pub mod database;
pub mod errors;
pub mod publisher;
pub mod services;

pub use config::Config;
pub use errors::{MetricError, MetricResult};
