use super::SyncOutcome;
use super::state::BranchState;
use crate::errors::SyncError;
use crate::repo::{ForceMode, Integration, RepoAdapter, Strategy};

/// The only four ways out of a diverged branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceChoice {
    RebaseThenPush,
    MergeThenPush,
    ForceWithLease,
    Cancel,
}

/// Interactive seam for the diverged state; tests script the answers.
pub trait DivergencePrompter {
    fn choose(&mut self, state: &BranchState) -> Result<DivergenceChoice, SyncError>;

    /// Second confirmation required before any force push runs.
    fn confirm_force_push(&mut self, state: &BranchState) -> Result<bool, SyncError>;
}

/// Map a menu answer onto a choice; anything unrecognized cancels.
pub fn parse_divergence_choice(answer: &str) -> DivergenceChoice {
    match answer.trim().to_ascii_lowercase().as_str() {
        "1" | "rebase" => DivergenceChoice::RebaseThenPush,
        "2" | "merge" => DivergenceChoice::MergeThenPush,
        "3" | "force" | "force-with-lease" => DivergenceChoice::ForceWithLease,
        _ => DivergenceChoice::Cancel,
    }
}

pub(crate) fn resolve_divergence(
    adapter: &mut dyn RepoAdapter,
    prompter: &mut dyn DivergencePrompter,
    state: &BranchState,
    allow_unrelated: bool,
) -> Result<SyncOutcome, SyncError> {
    match prompter.choose(state)? {
        DivergenceChoice::RebaseThenPush => {
            integrate_then_push(adapter, state, Strategy::Rebase, allow_unrelated)
        }
        DivergenceChoice::MergeThenPush => {
            integrate_then_push(adapter, state, Strategy::Merge, allow_unrelated)
        }
        DivergenceChoice::ForceWithLease => {
            if !prompter.confirm_force_push(state)? {
                return Err(SyncError::Cancelled);
            }
            adapter.push(&state.remote, &state.branch, ForceMode::ForceWithLease)?;
            Ok(SyncOutcome::Pushed(state.ahead))
        }
        DivergenceChoice::Cancel => Err(SyncError::Cancelled),
    }
}

fn integrate_then_push(
    adapter: &mut dyn RepoAdapter,
    state: &BranchState,
    strategy: Strategy,
    allow_unrelated: bool,
) -> Result<SyncOutcome, SyncError> {
    match adapter.integrate(strategy, &state.remote, &state.branch, allow_unrelated)? {
        // The push never runs when integration stopped on conflicts.
        Integration::Conflicted { files } => Err(SyncError::Conflict {
            operation: strategy,
            files,
        }),
        Integration::Completed { commits } => {
            adapter.push(&state.remote, &state.branch, ForceMode::None)?;
            Ok(SyncOutcome::Integrated { strategy, commits })
        }
    }
}
