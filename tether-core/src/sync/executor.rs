use super::divergence::{self, DivergencePrompter};
use super::state::{BranchState, Classification};
use super::SyncOutcome;
use crate::errors::SyncError;
use crate::repo::{ForceMode, Integration, RepoAdapter, Strategy};

/// One-shot dispatch over the classified state. Failures surface to the
/// caller with guidance; nothing is retried here.
pub(crate) fn execute(
    adapter: &mut dyn RepoAdapter,
    prompter: &mut dyn DivergencePrompter,
    state: &BranchState,
    strategy: Strategy,
    force: ForceMode,
    allow_unrelated: bool,
) -> Result<SyncOutcome, SyncError> {
    match state.classification {
        Classification::UpToDate => Ok(SyncOutcome::UpToDate),
        Classification::Ahead => {
            adapter.push(&state.remote, &state.branch, force)?;
            Ok(SyncOutcome::Pushed(state.ahead))
        }
        Classification::Behind => {
            match adapter.integrate(strategy, &state.remote, &state.branch, allow_unrelated)? {
                Integration::Conflicted { files } => Err(SyncError::Conflict {
                    operation: strategy,
                    files,
                }),
                Integration::Completed { commits } => {
                    Ok(SyncOutcome::Integrated { strategy, commits })
                }
            }
        }
        Classification::Diverged => {
            divergence::resolve_divergence(adapter, prompter, state, allow_unrelated)
        }
        Classification::NewBranch => {
            adapter.push_set_upstream(&state.remote, &state.branch)?;
            Ok(SyncOutcome::Pushed(state.ahead))
        }
    }
}
