//! Module for core business logic services.
//!
//! This module encapsulates the metric state model and the logic around it:
//! channel ledger reconciliation, snapshot aggregation, schema migration and
//! the scheduler that drives each metric's lifecycle.

pub mod data_aggregator;
pub mod ledger;
pub mod metric;
pub mod metric_one;
pub mod migration;
pub mod models;
pub mod scheduler;

pub use data_aggregator::SnapshotBuilder;
pub use ledger::ChannelLedger;
pub use metric::{Metric, MetricPhase};
pub use metric_one::{MetricDocument, MetricOne, MetricState};
pub use scheduler::{DispatchOutcome, Lifecycle, MetricRegistry, Scheduler};
