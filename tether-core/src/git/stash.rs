use git2::{Repository, Signature, StashFlags};

use crate::errors::SyncError;

pub(crate) fn stash_push(repo: &mut Repository, label: &str) -> Result<(), SyncError> {
    let sig = repo
        .signature()
        .or_else(|_| Signature::now("tether", "tether@localhost"))
        .map_err(|err| SyncError::git("failed to resolve stash identity", err))?;
    repo.stash_save2(&sig, Some(label), Some(StashFlags::INCLUDE_UNTRACKED))
        .map_err(|err| SyncError::git("failed to stash working tree changes", err))?;
    Ok(())
}

/// Pop the stash entry carrying `label`. Entries are located by message so a
/// pre-existing user stash can never be popped by mistake.
pub(crate) fn stash_pop(repo: &mut Repository, label: &str) -> Result<(), SyncError> {
    let mut target: Option<usize> = None;
    {
        let label = label.to_string();
        repo.stash_foreach(|index, message, _oid| {
            if target.is_none() && message.contains(&label) {
                target = Some(index);
            }
            true
        })
        .map_err(|err| SyncError::git("failed to scan the stash list", err))?;
    }

    let Some(index) = target else {
        return Err(SyncError::Repo(format!(
            "auto-stash `{label}` is missing from the stash list"
        )));
    };

    repo.stash_pop(index, None)
        .map_err(|err| SyncError::git("failed to restore stashed changes", err))
}
