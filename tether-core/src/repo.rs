use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Rebase,
    Merge,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Rebase => "rebase",
            Strategy::Merge => "merge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForceMode {
    #[default]
    None,
    Force,
    ForceWithLease,
}

impl ForceMode {
    pub fn label(&self) -> &'static str {
        match self {
            ForceMode::None => "push",
            ForceMode::Force => "force push",
            ForceMode::ForceWithLease => "force-with-lease push",
        }
    }
}

/// Result of the lightweight reachability check against a remote.
///
/// `Unreachable` is not an error: callers route it to the offline queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Reachable,
    Unreachable(String),
}

/// Result of integrating remote commits into the local branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Integration {
    Completed { commits: usize },
    Conflicted { files: Vec<String> },
}

/// The repository operations the reconciliation engine consumes.
///
/// Receivers are `&mut self` because libgit2 remote and stash calls mutate
/// repository state. The engine never touches git2 directly; tests substitute
/// a recording mock.
pub trait RepoAdapter {
    fn current_branch(&mut self) -> Result<String, SyncError>;

    fn list_remotes(&mut self) -> Result<Vec<String>, SyncError>;

    fn probe_remote(&mut self, remote: &str) -> Result<Probe, SyncError>;

    fn fetch(&mut self, remote: &str) -> Result<(), SyncError>;

    /// Commits only on the local branch / only on the remote tracking ref.
    /// When the remote branch does not exist yet, `ahead` counts every local
    /// commit and `behind` is zero.
    fn ahead_behind(&mut self, remote: &str, branch: &str) -> Result<(usize, usize), SyncError>;

    fn remote_branch_exists(&mut self, remote: &str, branch: &str) -> Result<bool, SyncError>;

    fn is_working_tree_dirty(&mut self) -> Result<bool, SyncError>;

    /// Push the branch. A non-fast-forward rejection surfaces as
    /// `SyncError::PushRejected`; a moved lease as `SyncError::StaleLease`.
    fn push(&mut self, remote: &str, branch: &str, mode: ForceMode) -> Result<(), SyncError>;

    /// Push the branch and establish upstream tracking in the same operation.
    fn push_set_upstream(&mut self, remote: &str, branch: &str) -> Result<(), SyncError>;

    fn integrate(
        &mut self,
        strategy: Strategy,
        remote: &str,
        branch: &str,
        allow_unrelated: bool,
    ) -> Result<Integration, SyncError>;

    fn stash_push(&mut self, label: &str) -> Result<(), SyncError>;

    /// Restore the stash entry carrying `label`; entries are located by label,
    /// never by position, so pre-existing user stashes are left alone.
    fn stash_pop(&mut self, label: &str) -> Result<(), SyncError>;

    fn working_directory(&self) -> PathBuf;
}
