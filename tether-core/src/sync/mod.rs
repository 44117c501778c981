mod divergence;
mod executor;
mod guard;
mod plan;
mod queue;
mod state;
mod strategy;

pub use divergence::{DivergenceChoice, DivergencePrompter, parse_divergence_choice};
pub use guard::{needs_stash, run_guarded};
pub use plan::{DryRunPlan, PlannedAction};
pub use queue::{OfflineQueue, QueuedOperation};
pub use state::{BranchState, Classification, analyze, classify};
pub use strategy::resolve_strategy;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::display::{self, LogLevel};
use crate::errors::SyncError;
use crate::repo::{ForceMode, Probe, RepoAdapter, Strategy};

/// Everything one reconciliation needs; immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationRequest {
    pub remote: String,
    /// Defaults to the current branch when absent.
    pub branch: Option<String>,
    pub strategy_override: Option<Strategy>,
    pub force_mode: ForceMode,
    pub dry_run: bool,
    pub allow_unrelated_histories: bool,
}

impl ReconciliationRequest {
    pub fn new<S: Into<String>>(remote: S) -> Self {
        Self {
            remote: remote.into(),
            branch: None,
            strategy_override: None,
            force_mode: ForceMode::None,
            dry_run: false,
            allow_unrelated_histories: false,
        }
    }
}

/// Terminal outcome of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    UpToDate,
    Pushed(usize),
    Integrated { strategy: Strategy, commits: usize },
    /// `None` when the best-effort queue write failed; the failure itself is
    /// reported as a warning, never as an error.
    Queued(Option<i64>),
    DryRun(DryRunPlan),
}

/// Run one reconciliation against the per-user offline queue.
pub fn reconcile(
    adapter: &mut dyn RepoAdapter,
    prompter: &mut dyn DivergencePrompter,
    request: &ReconciliationRequest,
) -> Result<SyncOutcome, SyncError> {
    let queue = OfflineQueue::open_default()?;
    reconcile_with_queue(adapter, prompter, request, &queue)
}

pub fn reconcile_with_queue(
    adapter: &mut dyn RepoAdapter,
    prompter: &mut dyn DivergencePrompter,
    request: &ReconciliationRequest,
    queue: &OfflineQueue,
) -> Result<SyncOutcome, SyncError> {
    let configured = adapter.list_remotes()?;
    if !configured.iter().any(|name| name == &request.remote) {
        return Err(SyncError::UnknownRemote {
            remote: request.remote.clone(),
            configured,
        });
    }

    if let Probe::Unreachable(reason) = adapter.probe_remote(&request.remote)? {
        display::emit(
            LogLevel::Warn,
            format!(
                "remote `{}` is unreachable ({reason}); queueing this sync for later",
                request.remote
            ),
        );
        let branch = match &request.branch {
            Some(name) => name.clone(),
            None => adapter.current_branch()?,
        };
        let id = match queue.append(&adapter.working_directory(), &branch, request) {
            Ok(id) => Some(id),
            Err(err) => {
                display::emit(
                    LogLevel::Warn,
                    format!("could not record the queued sync: {err}"),
                );
                None
            }
        };
        return Ok(SyncOutcome::Queued(id));
    }

    adapter.fetch(&request.remote)?;

    let state = analyze(adapter, &request.remote, request.branch.as_deref())?;
    display::emit(
        LogLevel::Debug,
        format!(
            "branch {} vs {}: {} (ahead {}, behind {}, dirty {})",
            state.branch,
            state.remote_ref,
            state.classification.label(),
            state.ahead,
            state.behind,
            state.dirty
        ),
    );

    let strategy = resolve_strategy(
        request.strategy_override,
        config::get_config().default_strategy,
    );

    if request.dry_run {
        return Ok(SyncOutcome::DryRun(plan::build(
            &state,
            strategy,
            request.force_mode,
        )));
    }

    let (result, restore_warning) = run_guarded(adapter, &state, |adapter| {
        executor::execute(
            adapter,
            prompter,
            &state,
            strategy,
            request.force_mode,
            request.allow_unrelated_histories,
        )
    });

    if let Some(warning) = &restore_warning {
        display::emit(LogLevel::Warn, warning.to_string());
    }

    result
}

#[cfg(test)]
mod tests;
