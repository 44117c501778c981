use git2::{Direction, ErrorClass, FetchOptions, PushOptions, Repository};
use std::cell::RefCell;
use std::rc::Rc;

use super::{auth, branch_ref, tracking_ref};
use crate::errors::SyncError;
use crate::repo::{ForceMode, Probe};

pub(crate) fn list_remotes(repo: &Repository) -> Result<Vec<String>, SyncError> {
    let remotes = repo
        .remotes()
        .map_err(|err| SyncError::git("failed to list remotes", err))?;
    Ok(remotes.iter().flatten().map(|name| name.to_string()).collect())
}

fn is_network_failure(err: &git2::Error) -> bool {
    if matches!(err.class(), ErrorClass::Net | ErrorClass::Os) {
        return true;
    }
    let message = err.message().to_ascii_lowercase();
    [
        "could not resolve",
        "failed to resolve",
        "connection refused",
        "network is unreachable",
        "timed out",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}

/// Non-mutating reachability check: connect and disconnect without fetching.
pub(crate) fn probe(repo: &Repository, remote_name: &str) -> Result<Probe, SyncError> {
    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|err| SyncError::git("unable to locate remote", err))?;
    let config = repo.config().ok().map(Rc::new);
    let callbacks = auth::remote_callbacks(config);

    let connected = remote
        .connect_auth(Direction::Fetch, Some(callbacks), None)
        .map(drop);
    match connected {
        Ok(()) => {
            remote.disconnect().ok();
            Ok(Probe::Reachable)
        }
        Err(err) if is_network_failure(&err) => {
            Ok(Probe::Unreachable(err.message().trim().to_string()))
        }
        Err(err) => Err(SyncError::git("failed to probe remote", err)),
    }
}

pub(crate) fn fetch(repo: &Repository, remote_name: &str) -> Result<(), SyncError> {
    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|err| SyncError::git("unable to locate remote", err))?;
    let config = repo.config().ok().map(Rc::new);
    let mut opts = FetchOptions::new();
    opts.remote_callbacks(auth::remote_callbacks(config));

    // Empty refspec list uses the remote's configured fetch refspecs.
    remote
        .fetch(&[] as &[&str], Some(&mut opts), None)
        .map_err(|err| SyncError::git("failed to fetch from remote", err))
}

fn is_non_fast_forward(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("non-fast-forward")
        || message.contains("fetch first")
        || message.contains("cannot push")
}

fn push_refspec(repo: &Repository, remote_name: &str, branch: &str, refspec: &str) -> Result<(), SyncError> {
    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|err| SyncError::git("unable to locate remote", err))?;
    let config = repo.config().ok().map(Rc::new);
    let mut callbacks = auth::remote_callbacks(config);

    let rejections: Rc<RefCell<Vec<(String, String)>>> = Rc::new(RefCell::new(Vec::new()));
    let rejections_for_cb = Rc::clone(&rejections);
    callbacks.push_update_reference(move |refname, status| {
        if let Some(status) = status
            && let Ok(mut entries) = rejections_for_cb.try_borrow_mut()
        {
            entries.push((refname.to_string(), status.to_string()));
        }
        Ok(())
    });

    let mut opts = PushOptions::new();
    opts.remote_callbacks(callbacks);

    if let Err(err) = remote.push(&[refspec], Some(&mut opts)) {
        if is_non_fast_forward(err.message()) {
            return Err(SyncError::PushRejected {
                remote: remote_name.to_string(),
                branch: branch.to_string(),
            });
        }
        return Err(SyncError::git("failed to push to remote", err));
    }
    remote.disconnect().ok();

    let rejections = rejections.borrow();
    if let Some((refname, status)) = rejections.first() {
        if is_non_fast_forward(status) {
            return Err(SyncError::PushRejected {
                remote: remote_name.to_string(),
                branch: branch.to_string(),
            });
        }
        return Err(SyncError::git(
            "remote rejected the push",
            git2::Error::from_str(&format!("{refname}: {status}")),
        ));
    }

    Ok(())
}

/// Require the remote branch tip to match our last-fetched tracking ref.
///
/// libgit2 has no native force-with-lease, so the lease is checked by listing
/// the remote's refs immediately before the forced push.
fn verify_lease(repo: &Repository, remote_name: &str, branch: &str) -> Result<(), SyncError> {
    let expected = repo
        .find_reference(&tracking_ref(remote_name, branch))
        .ok()
        .and_then(|reference| reference.target());

    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|err| SyncError::git("unable to locate remote", err))?;
    let config = repo.config().ok().map(Rc::new);
    let callbacks = auth::remote_callbacks(config);
    let connection = remote
        .connect_auth(Direction::Fetch, Some(callbacks), None)
        .map_err(|err| SyncError::git("failed to connect for lease check", err))?;

    let wanted = branch_ref(branch);
    let actual = connection
        .list()
        .map_err(|err| SyncError::git("failed to list remote refs", err))?
        .iter()
        .find(|head| head.name() == wanted)
        .map(|head| head.oid());
    drop(connection);

    match (expected, actual) {
        (Some(expected), Some(actual)) if expected == actual => Ok(()),
        (None, None) => Ok(()),
        _ => Err(SyncError::StaleLease {
            remote: remote_name.to_string(),
            branch: branch.to_string(),
        }),
    }
}

fn record_tracking_ref(repo: &Repository, remote_name: &str, branch: &str) -> Result<(), SyncError> {
    let local_oid = repo
        .find_reference(&branch_ref(branch))
        .ok()
        .and_then(|reference| reference.target());
    if let Some(oid) = local_oid {
        repo.reference(
            &tracking_ref(remote_name, branch),
            oid,
            true,
            "tether: update remote tracking ref after push",
        )
        .map_err(|err| SyncError::git("failed to update remote tracking ref", err))?;
    }
    Ok(())
}

pub(crate) fn push(
    repo: &Repository,
    remote_name: &str,
    branch: &str,
    mode: ForceMode,
) -> Result<(), SyncError> {
    let reference = branch_ref(branch);
    let local_oid = repo
        .find_reference(&reference)
        .map_err(|err| SyncError::git("failed to resolve local branch", err))?
        .target()
        .ok_or_else(|| SyncError::Repo(format!("branch `{branch}` does not point at a commit")))?;

    match mode {
        ForceMode::None => {
            // Pre-check against the tracking ref so a doomed push fails fast.
            if let Ok(upstream) = repo.find_reference(&tracking_ref(remote_name, branch))
                && let Some(upstream_oid) = upstream.target()
                && upstream_oid != local_oid
            {
                let fast_forward = repo
                    .graph_descendant_of(local_oid, upstream_oid)
                    .map_err(|err| {
                        SyncError::git("unable to compute fast-forward relationship", err)
                    })?;
                if !fast_forward {
                    return Err(SyncError::PushRejected {
                        remote: remote_name.to_string(),
                        branch: branch.to_string(),
                    });
                }
            }
            push_refspec(repo, remote_name, branch, &format!("{reference}:{reference}"))?;
        }
        ForceMode::Force => {
            push_refspec(repo, remote_name, branch, &format!("+{reference}:{reference}"))?;
        }
        ForceMode::ForceWithLease => {
            verify_lease(repo, remote_name, branch)?;
            push_refspec(repo, remote_name, branch, &format!("+{reference}:{reference}"))?;
        }
    }

    record_tracking_ref(repo, remote_name, branch)
}

pub(crate) fn push_set_upstream(
    repo: &Repository,
    remote_name: &str,
    branch: &str,
) -> Result<(), SyncError> {
    let reference = branch_ref(branch);
    push_refspec(repo, remote_name, branch, &format!("{reference}:{reference}"))?;
    record_tracking_ref(repo, remote_name, branch)?;

    let mut local = repo
        .find_branch(branch, git2::BranchType::Local)
        .map_err(|err| SyncError::git("failed to resolve local branch", err))?;
    local
        .set_upstream(Some(&format!("{remote_name}/{branch}")))
        .map_err(|err| SyncError::git("failed to set upstream tracking", err))
}
