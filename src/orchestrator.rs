//! Runs one strategy over two tables with parameter coercion and a fault boundary

use crate::error::TabcompareError;
use crate::params::{Parameters, RawParams};
use crate::registry::{self, StrategyRegistry};
use crate::result::{ComparisonResult, ErrorKind};
use crate::strategy::{CancellationToken, ComparisonStrategy};
use crate::table::Table;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use uuid::Uuid;

/// Lifecycle of one comparison run. A failed run is terminal; callers
/// re-invoke explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Validating,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A finished run: final state plus the result, failed or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRun {
    pub run_id: String,
    pub strategy: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub result: ComparisonResult,
}

/// Tracks a run through its states and stamps the final result
struct RunTracker {
    run_id: String,
    strategy: String,
    state: RunState,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl RunTracker {
    fn start(strategy: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            strategy: strategy.to_string(),
            state: RunState::Idle,
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    fn advance(&mut self, next: RunState) {
        log::debug!("Run {} ({}): {:?} -> {:?}", self.run_id, self.strategy, self.state, next);
        self.state = next;
    }

    fn finish(mut self, mut result: ComparisonResult) -> ComparisonRun {
        let state = if result.is_failure() {
            RunState::Failed
        } else {
            RunState::Completed
        };
        self.advance(state);

        result.metadata.insert("strategy".to_string(), self.strategy.clone().into());
        result.metadata.insert("run_id".to_string(), self.run_id.clone().into());

        ComparisonRun {
            run_id: self.run_id,
            strategy: self.strategy,
            state: self.state,
            started_at: self.started_at,
            duration_ms: self.clock.elapsed().as_millis() as u64,
            result,
        }
    }

    fn fail(self, kind: ErrorKind, message: String, params: &Parameters) -> ComparisonRun {
        log::warn!("Comparison with '{}' failed ({}): {}", self.strategy, kind.as_str(), message);
        let mut result = ComparisonResult::failure(kind, message);
        result.set_parameters(params);
        self.finish(result)
    }
}

/// Entry point for running comparisons against a strategy registry
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<StrategyRegistry>,
}

impl Orchestrator {
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self { registry }
    }

    /// Orchestrator over the process-wide registry
    pub fn global() -> Self {
        Self::new(registry::global())
    }

    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    /// Compare two tables and return only the result
    pub fn compare(
        &self,
        a: Option<&Table>,
        b: Option<&Table>,
        strategy: &str,
        raw_params: &RawParams,
    ) -> ComparisonResult {
        self.run(a, b, strategy, raw_params, &CancellationToken::new()).result
    }

    /// Compare two tables, reporting the final run state.
    ///
    /// Never panics and never returns an error: every failure becomes a
    /// failed result with `metadata.error` and `metadata.error_kind` set.
    pub fn run(
        &self,
        a: Option<&Table>,
        b: Option<&Table>,
        strategy_name: &str,
        raw_params: &RawParams,
        cancel: &CancellationToken,
    ) -> ComparisonRun {
        let mut tracker = RunTracker::start(strategy_name);

        let Some(strategy) = self.registry.get_by_name(strategy_name) else {
            let message = TabcompareError::StrategyNotFound {
                name: strategy_name.to_string(),
            }
            .to_string();
            return tracker.fail(ErrorKind::Discovery, message, &Parameters::new());
        };

        let resolved = strategy.parameters().resolve(raw_params);
        let params = resolved.params;

        tracker.advance(RunState::Validating);
        if let Some(message) = strategy.validate(a, b) {
            return tracker.fail(ErrorKind::Validation, message, &params);
        }
        let (Some(a), Some(b)) = (a, b) else {
            return tracker.fail(ErrorKind::Validation, "Both tables must be provided".to_string(), &params);
        };
        if cancel.is_cancelled() {
            return tracker.fail(ErrorKind::Cancelled, TabcompareError::Cancelled.to_string(), &params);
        }

        tracker.advance(RunState::Running);
        match contain(strategy.as_ref(), a, b, &params, cancel) {
            Ok(mut result) => {
                result.set_parameters(&params);
                if !resolved.fallbacks.is_empty() {
                    result
                        .metadata
                        .insert("parameter_fallbacks".to_string(), resolved.fallbacks.into());
                }
                tracker.finish(result)
            }
            Err(e) if e.is_cancelled() => tracker.fail(ErrorKind::Cancelled, e.to_string(), &params),
            Err(e) => tracker.fail(ErrorKind::Execution, e.to_string(), &params),
        }
    }

    /// Run a comparison on a background thread
    pub fn spawn(
        &self,
        a: Arc<Table>,
        b: Arc<Table>,
        strategy: &str,
        raw_params: RawParams,
    ) -> ComparisonHandle {
        let cancel = CancellationToken::new();
        let orchestrator = self.clone();
        let strategy = strategy.to_string();
        let token = cancel.clone();

        let handle = thread::spawn(move || {
            orchestrator.run(Some(&a), Some(&b), &strategy, &raw_params, &token)
        });

        ComparisonHandle { cancel, handle }
    }
}

/// Call `compare`, turning panics into execution errors
fn contain(
    strategy: &dyn ComparisonStrategy,
    a: &Table,
    b: &Table,
    params: &Parameters,
    cancel: &CancellationToken,
) -> crate::Result<ComparisonResult> {
    panic::catch_unwind(AssertUnwindSafe(|| strategy.compare(a, b, params, cancel)))
        .unwrap_or_else(|payload| {
            Err(TabcompareError::Generic(anyhow!(
                "strategy '{}' panicked: {}",
                strategy.name(),
                panic_message(payload.as_ref())
            )))
        })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to a comparison running on a background thread
pub struct ComparisonHandle {
    cancel: CancellationToken,
    handle: JoinHandle<ComparisonRun>,
}

impl ComparisonHandle {
    /// Request cooperative cancellation; the run ends as a cancelled failure
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to end
    pub fn join(self) -> ComparisonRun {
        match self.handle.join() {
            Ok(run) => run,
            Err(payload) => {
                let message = format!("comparison thread panicked: {}", panic_message(payload.as_ref()));
                RunTracker::start("unknown").fail(ErrorKind::Execution, message, &Parameters::new())
            }
        }
    }
}
