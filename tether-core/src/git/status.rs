use git2::{ErrorCode, Repository, StatusOptions};

use super::{branch_ref, tracking_ref};
use crate::errors::SyncError;

pub(crate) fn current_branch(repo: &Repository) -> Result<String, SyncError> {
    let head = repo
        .head()
        .map_err(|err| SyncError::git("failed to resolve HEAD", err))?;
    if !head.is_branch() {
        return Err(SyncError::Repo(
            "HEAD is detached; checkout a branch before syncing".to_string(),
        ));
    }
    head.shorthand()
        .map(|name| name.to_string())
        .ok_or_else(|| SyncError::Repo("current branch name is not valid UTF-8".to_string()))
}

pub(crate) fn is_dirty(repo: &Repository) -> Result<bool, SyncError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .exclude_submodules(true);
    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(|err| SyncError::git("failed to read working tree status", err))?;
    Ok(!statuses.is_empty())
}

pub(crate) fn remote_branch_exists(
    repo: &Repository,
    remote: &str,
    branch: &str,
) -> Result<bool, SyncError> {
    match repo.find_reference(&tracking_ref(remote, branch)) {
        Ok(_) => Ok(true),
        Err(err) if err.code() == ErrorCode::NotFound => Ok(false),
        Err(err) => Err(SyncError::git(
            "failed to look up remote tracking ref",
            err,
        )),
    }
}

pub(crate) fn ahead_behind(
    repo: &Repository,
    remote: &str,
    branch: &str,
) -> Result<(usize, usize), SyncError> {
    let local = repo
        .find_reference(&branch_ref(branch))
        .map_err(|err| SyncError::git("failed to resolve local branch", err))?;
    let local_oid = local
        .target()
        .ok_or_else(|| SyncError::Repo(format!("branch `{branch}` does not point at a commit")))?;

    match repo.find_reference(&tracking_ref(remote, branch)) {
        Ok(upstream) => {
            let upstream_oid = upstream.target().ok_or_else(|| {
                SyncError::Repo(format!(
                    "remote tracking ref for `{remote}/{branch}` does not point at a commit"
                ))
            })?;
            repo.graph_ahead_behind(local_oid, upstream_oid)
                .map_err(|err| SyncError::git("failed to compute ahead/behind counts", err))
        }
        // No upstream yet: every local commit counts as ahead.
        Err(err) if err.code() == ErrorCode::NotFound => {
            let mut walk = repo
                .revwalk()
                .map_err(|err| SyncError::git("failed to start revision walk", err))?;
            walk.push(local_oid)
                .map_err(|err| SyncError::git("failed to seed revision walk", err))?;
            let mut ahead = 0usize;
            for oid in walk {
                oid.map_err(|err| SyncError::git("failed to walk local commits", err))?;
                ahead += 1;
            }
            Ok((ahead, 0))
        }
        Err(err) => Err(SyncError::git(
            "failed to look up remote tracking ref",
            err,
        )),
    }
}
