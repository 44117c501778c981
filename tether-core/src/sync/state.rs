use crate::errors::SyncError;
use crate::repo::RepoAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    UpToDate,
    Ahead,
    Behind,
    Diverged,
    NewBranch,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::UpToDate => "up-to-date",
            Classification::Ahead => "ahead",
            Classification::Behind => "behind",
            Classification::Diverged => "diverged",
            Classification::NewBranch => "new-branch",
        }
    }
}

/// Snapshot of the branch relationship, derived fresh after every fetch and
/// never cached across invocations.
#[derive(Debug, Clone)]
pub struct BranchState {
    pub branch: String,
    pub remote: String,
    pub remote_ref: String,
    pub remote_branch_exists: bool,
    pub ahead: usize,
    pub behind: usize,
    pub dirty: bool,
    pub classification: Classification,
}

/// Pure classification over (remote existence, ahead, behind). The dirty flag
/// never participates.
pub fn classify(remote_branch_exists: bool, ahead: usize, behind: usize) -> Classification {
    if !remote_branch_exists {
        return Classification::NewBranch;
    }
    match (ahead > 0, behind > 0) {
        (false, false) => Classification::UpToDate,
        (true, false) => Classification::Ahead,
        (false, true) => Classification::Behind,
        (true, true) => Classification::Diverged,
    }
}

pub fn analyze(
    adapter: &mut dyn RepoAdapter,
    remote: &str,
    branch_override: Option<&str>,
) -> Result<BranchState, SyncError> {
    let branch = match branch_override {
        Some(name) => name.to_string(),
        None => adapter.current_branch()?,
    };
    let remote_branch_exists = adapter.remote_branch_exists(remote, &branch)?;
    let (ahead, behind) = adapter.ahead_behind(remote, &branch)?;
    let dirty = adapter.is_working_tree_dirty()?;

    Ok(BranchState {
        remote_ref: format!("{remote}/{branch}"),
        classification: classify(remote_branch_exists, ahead, behind),
        branch,
        remote: remote.to_string(),
        remote_branch_exists,
        ahead,
        behind,
        dirty,
    })
}
