//! Handler functions for the metrics commands.
//!
//! `diagnostic` accepts a comma separated list of metric ids (e.g. `"1"` or
//! `"1,2"`) and answers with each metric's current document keyed by id.
//! `stop` forwards the host's shutdown notification to the scheduler.

use std::collections::BTreeMap;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::MetricError;
use crate::services::models::MetricKind;
use crate::services::scheduler::{MetricRegistry, Scheduler, SchedulerError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid metric id {0:?}")]
    InvalidMetricId(String),

    #[error("metric {0} is not registered")]
    NotRegistered(MetricKind),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Current document of every requested metric, keyed by metric id.
pub async fn diagnostic(
    registry: &MetricRegistry,
    metrics_id: &str,
) -> Result<BTreeMap<u32, Value>, ApiError> {
    let mut answer = BTreeMap::new();
    for raw in metrics_id.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        let kind = raw
            .parse::<u32>()
            .ok()
            .and_then(MetricKind::from_id)
            .ok_or_else(|| ApiError::InvalidMetricId(raw.to_string()))?;
        let handle = registry.get(kind).ok_or(ApiError::NotRegistered(kind))?;
        let json = handle.lock().await.to_json()?;
        answer.insert(kind.id(), serde_json::from_str(&json)?);
    }
    debug!(metrics = answer.len(), "diagnostic answered");
    Ok(answer)
}

/// Runs the stop path, returning the spawned close tasks.
pub fn stop(scheduler: &Scheduler) -> Result<Vec<JoinHandle<()>>, ApiError> {
    Ok(scheduler.stop()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::Config;
    use crate::database::MemoryStore;
    use crate::services::metric_one::MetricOne;
    use crate::services::models::Environment;
    use adapters::mock::{MockNode, MOCK_NODE_ID};

    fn registry() -> MetricRegistry {
        let mut registry = MetricRegistry::new();
        registry
            .register(Box::new(MetricOne::new(
                MOCK_NODE_ID,
                Environment::detect(),
                Arc::new(MemoryStore::new()),
            )))
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn diagnostic_returns_documents_by_id() {
        let answer = diagnostic(&registry(), " 1 ,").await.unwrap();
        assert_eq!(answer.len(), 1);
        assert_eq!(answer[&1]["metric_name"], "metric_one");
        assert_eq!(answer[&1]["node_id"], MOCK_NODE_ID);
    }

    #[tokio::test]
    async fn diagnostic_rejects_unknown_ids() {
        assert!(matches!(
            diagnostic(&registry(), "1,9").await,
            Err(ApiError::InvalidMetricId(id)) if id == "9"
        ));
        assert!(matches!(
            diagnostic(&MetricRegistry::new(), "1").await,
            Err(ApiError::NotRegistered(MetricKind::MetricOne))
        ));
    }

    #[tokio::test]
    async fn stop_closes_metrics_once() {
        let (scheduler, _outcomes) = Scheduler::new(
            registry(),
            Arc::new(MockNode::with_sample_identity()),
            None,
            Config::new(),
        );
        for task in stop(&scheduler).unwrap() {
            task.await.unwrap();
        }
        let answer = diagnostic(scheduler.registry(), "1").await.unwrap();
        assert_eq!(answer[&1]["history"][0]["event"], "on_close");
        assert!(matches!(
            stop(&scheduler),
            Err(ApiError::Scheduler(SchedulerError::Stopped))
        ));
    }
}
