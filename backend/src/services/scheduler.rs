//! Drives the registered metrics through their lifecycle.
//!
//! Two timers run independently: a one-shot that initializes every metric
//! after a delay (the node RPC may not be ready at process start) and a
//! recurring one that updates them. Each fire spawns one task per metric and
//! does not wait for it. A stop closes every metric and halts the recurring
//! timer for good.
//!
//! Every metric sits behind its own async mutex, so overlapping tasks for the
//! same metric run one after the other. Task results are reported as
//! [`DispatchOutcome`]s on the channel returned by [`Scheduler::new`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use adapters::NodeAdapter;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::metric::Metric;
use super::models::MetricKind;
use crate::config::{Config, ConfigError};
use crate::errors::{MetricError, MetricResult};
use crate::publisher::MetricPublisher;

pub type MetricHandle = Arc<Mutex<Box<dyn Metric>>>;

/// Metrics known to the scheduler, filled before it starts.
#[derive(Default)]
pub struct MetricRegistry {
    metrics: BTreeMap<MetricKind, MetricHandle>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, metric: Box<dyn Metric>) -> MetricResult<()> {
        let kind = metric.kind();
        if self.metrics.contains_key(&kind) {
            error!(metric = %kind, "metric already registered");
            return Err(MetricError::AlreadyRegistered(kind));
        }
        self.metrics.insert(kind, Arc::new(Mutex::new(metric)));
        Ok(())
    }

    pub fn get(&self, kind: MetricKind) -> Option<MetricHandle> {
        self.metrics.get(&kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = MetricKind> + '_ {
        self.metrics.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Lifecycle step a task ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Init,
    Update,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    Disabled,
    Published,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// The step ran and was persisted.
    Completed(PublishStatus),
    Failed(String),
}

/// Result of one dispatched task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub metric: MetricKind,
    pub lifecycle: Lifecycle,
    pub status: OutcomeStatus,
}

impl DispatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Completed(_))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("scheduler already started")]
    AlreadyStarted,

    #[error("scheduler stopped")]
    Stopped,

    #[error("invalid scheduler configuration: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Stopped,
}

/// Spawns lifecycle tasks and reports their outcome.
#[derive(Clone)]
struct Dispatcher {
    registry: Arc<MetricRegistry>,
    node: Arc<dyn NodeAdapter>,
    publisher: Option<Arc<dyn MetricPublisher>>,
    outcomes: mpsc::UnboundedSender<DispatchOutcome>,
}

impl Dispatcher {
    fn fan_out(&self, lifecycle: Lifecycle) -> Vec<JoinHandle<()>> {
        self.registry
            .metrics
            .iter()
            .map(|(kind, handle)| {
                let task = self.clone().run(*kind, handle.clone(), lifecycle);
                tokio::spawn(task)
            })
            .collect()
    }

    async fn run(self, kind: MetricKind, handle: MetricHandle, lifecycle: Lifecycle) {
        let mut metric = handle.lock().await;
        let node = self.node.as_ref();
        let result = match lifecycle {
            Lifecycle::Init => metric.on_init(node).await,
            Lifecycle::Update => metric.update(node).await,
            Lifecycle::Close => metric.on_close().await,
        };

        let status = match result {
            Ok(()) => OutcomeStatus::Completed(self.publish(&**metric, lifecycle).await),
            Err(err) => {
                error!(metric = %kind, step = ?lifecycle, error = %err, "metric step failed");
                OutcomeStatus::Failed(err.to_string())
            }
        };
        drop(metric);

        // Nobody listening is fine, the outcome was already logged.
        let _ = self.outcomes.send(DispatchOutcome {
            metric: kind,
            lifecycle,
            status,
        });
    }

    async fn publish(&self, metric: &dyn Metric, lifecycle: Lifecycle) -> PublishStatus {
        let Some(publisher) = self.publisher.as_deref() else {
            return PublishStatus::Disabled;
        };
        let node = self.node.as_ref();
        let result = match lifecycle {
            Lifecycle::Init => metric.init_on_repo(publisher, node).await,
            Lifecycle::Update | Lifecycle::Close => metric.upload_on_repo(publisher, node).await,
        };
        match result {
            Ok(()) => PublishStatus::Published,
            Err(err) => {
                warn!(metric = %metric.kind(), error = %err, "publishing metric failed");
                PublishStatus::Failed(err.to_string())
            }
        }
    }
}

pub struct Scheduler {
    dispatcher: Dispatcher,
    config: Config,
    stop_tx: watch::Sender<bool>,
    state: StdMutex<RunState>,
}

impl Scheduler {
    /// Builds a scheduler over a frozen registry. Publishing only happens
    /// when a publisher is given and `config.publish` is set.
    pub fn new(
        registry: MetricRegistry,
        node: Arc<dyn NodeAdapter>,
        publisher: Option<Arc<dyn MetricPublisher>>,
        config: Config,
    ) -> (Self, mpsc::UnboundedReceiver<DispatchOutcome>) {
        let (outcomes, outcome_rx) = mpsc::unbounded_channel();
        let (stop_tx, _) = watch::channel(false);
        let publisher = if config.publish { publisher } else { None };
        let scheduler = Self {
            dispatcher: Dispatcher {
                registry: Arc::new(registry),
                node,
                publisher,
                outcomes,
            },
            config,
            stop_tx,
            state: StdMutex::new(RunState::Idle),
        };
        (scheduler, outcome_rx)
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.dispatcher.registry
    }

    /// Arms both timers. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), SchedulerError> {
        self.config.validate()?;
        let mut state = self.lock_state();
        match *state {
            RunState::Running => return Err(SchedulerError::AlreadyStarted),
            RunState::Stopped => return Err(SchedulerError::Stopped),
            RunState::Idle => *state = RunState::Running,
        }

        tokio::spawn(one_shot(
            self.dispatcher.clone(),
            self.config.init_delay,
            self.stop_tx.subscribe(),
        ));
        tokio::spawn(recurring(
            self.dispatcher.clone(),
            self.config.update_interval,
            self.stop_tx.subscribe(),
        ));
        info!(
            metrics = self.registry().len(),
            init_delay = ?self.config.init_delay,
            update_interval = ?self.config.update_interval,
            "scheduler started"
        );
        Ok(())
    }

    /// Closes every metric, then halts the timers. Terminal.
    pub fn stop(&self) -> Result<Vec<JoinHandle<()>>, SchedulerError> {
        let mut state = self.lock_state();
        if *state == RunState::Stopped {
            return Err(SchedulerError::Stopped);
        }
        *state = RunState::Stopped;

        let closing = self.dispatcher.fan_out(Lifecycle::Close);
        self.stop_tx.send_replace(true);
        info!("close command received");
        Ok(closing)
    }

    pub fn is_stopped(&self) -> bool {
        *self.lock_state() == RunState::Stopped
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn one_shot(dispatcher: Dispatcher, delay: Duration, mut stop_rx: watch::Receiver<bool>) {
    tokio::select! {
        biased;
        _ = stop_rx.changed() => {
            debug!("stopped before the init timer fired");
        }
        _ = tokio::time::sleep(delay) => {
            debug!("init timer fired");
            dispatcher.fan_out(Lifecycle::Init);
        }
    }
}

async fn recurring(dispatcher: Dispatcher, period: Duration, mut stop_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    debug!("recurring timer halted");
                    break;
                }
            }
            _ = ticker.tick() => {
                debug!("recurring timer fired");
                dispatcher.fan_out(Lifecycle::Update);
            }
        }
    }
}
