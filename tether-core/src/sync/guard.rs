use chrono::{DateTime, Utc};

use super::state::{BranchState, Classification};
use crate::errors::{RestoreWarning, SyncError};
use crate::repo::RepoAdapter;

pub(crate) fn stash_label(now: DateTime<Utc>) -> String {
    format!("tether auto-stash {}", now.format("%Y-%m-%dT%H:%M:%S%.3fZ"))
}

/// An ahead-only push never touches the working tree, so dirty state is safe
/// to leave in place for it.
pub fn needs_stash(state: &BranchState) -> bool {
    state.dirty && state.classification != Classification::Ahead
}

/// Bracket `action` with a conditional stash/restore.
///
/// When a stash is created, exactly one pop is attempted regardless of how
/// `action` ends. A failed pop is returned as a warning beside the action's
/// result; it never replaces it.
pub fn run_guarded<T, F>(
    adapter: &mut dyn RepoAdapter,
    state: &BranchState,
    action: F,
) -> (Result<T, SyncError>, Option<RestoreWarning>)
where
    F: FnOnce(&mut dyn RepoAdapter) -> Result<T, SyncError>,
{
    if !needs_stash(state) {
        return (action(adapter), None);
    }

    let label = stash_label(Utc::now());
    if let Err(err) = adapter.stash_push(&label) {
        return (Err(err), None);
    }

    let result = action(adapter);

    let warning = match adapter.stash_pop(&label) {
        Ok(()) => None,
        Err(err) => Some(RestoreWarning {
            label,
            detail: err.to_string(),
        }),
    };

    (result, warning)
}
