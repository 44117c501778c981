use git2::build::CheckoutBuilder;
use git2::{
    AnnotatedCommit, ErrorCode, Index, MergeOptions, Oid, RebaseOptions, Repository,
    RepositoryState, Signature,
};

use super::{branch_ref, tracking_ref};
use crate::errors::SyncError;
use crate::repo::{Integration, Strategy};

pub(crate) fn integrate(
    repo: &Repository,
    strategy: Strategy,
    remote: &str,
    branch: &str,
    allow_unrelated: bool,
) -> Result<Integration, SyncError> {
    if repo.state() != RepositoryState::Clean {
        return Err(SyncError::Repo(
            "another git operation is in progress; finish or abort it first".to_string(),
        ));
    }

    match strategy {
        Strategy::Merge => merge_remote(repo, remote, branch, allow_unrelated),
        Strategy::Rebase => rebase_onto_remote(repo, remote, branch),
    }
}

fn signature(repo: &Repository) -> Result<Signature<'static>, SyncError> {
    repo.signature()
        .map_err(|err| SyncError::git("failed to resolve committer identity", err))
}

/// Commits reachable from `tip` but not from `base`.
fn count_commits(repo: &Repository, base: Oid, tip: Oid) -> Result<usize, SyncError> {
    let mut walk = repo
        .revwalk()
        .map_err(|err| SyncError::git("failed to start revision walk", err))?;
    walk.push(tip)
        .map_err(|err| SyncError::git("failed to seed revision walk", err))?;
    walk.hide(base)
        .map_err(|err| SyncError::git("failed to bound revision walk", err))?;

    let mut commits = 0usize;
    for oid in walk {
        oid.map_err(|err| SyncError::git("failed to walk commits", err))?;
        commits += 1;
    }
    Ok(commits)
}

fn collect_conflict_paths(index: &mut Index) -> Vec<String> {
    let mut files = Vec::new();
    if let Ok(conflicts) = index.conflicts() {
        for conflict in conflicts.flatten() {
            let path_bytes = conflict
                .our
                .as_ref()
                .or(conflict.their.as_ref())
                .or(conflict.ancestor.as_ref())
                .map(|entry| entry.path.clone());
            if let Some(bytes) = path_bytes {
                files.push(String::from_utf8_lossy(&bytes).to_string());
            }
        }
    }

    files.sort();
    files.dedup();
    files
}

/// Write the conflicted merge into the working tree so the user can resolve
/// it with their normal tools.
fn materialize_conflicts(repo: &Repository, annotated: &AnnotatedCommit) -> Result<(), SyncError> {
    let mut checkout = CheckoutBuilder::new();
    checkout
        .allow_conflicts(true)
        .conflict_style_merge(true)
        .force();

    let mut merge_opts = MergeOptions::new();
    merge_opts.fail_on_conflict(false);

    repo.merge(&[annotated], Some(&mut merge_opts), Some(&mut checkout))
        .map_err(|err| SyncError::git("failed to materialize merge conflicts", err))
}

fn merge_remote(
    repo: &Repository,
    remote: &str,
    branch: &str,
    allow_unrelated: bool,
) -> Result<Integration, SyncError> {
    let remote_ref = repo
        .find_reference(&tracking_ref(remote, branch))
        .map_err(|err| SyncError::git("failed to resolve remote tracking ref", err))?;
    let annotated = repo
        .reference_to_annotated_commit(&remote_ref)
        .map_err(|err| SyncError::git("failed to resolve remote commit", err))?;
    let remote_commit = remote_ref
        .peel_to_commit()
        .map_err(|err| SyncError::git("failed to resolve remote commit", err))?;
    let head_commit = repo
        .head()
        .and_then(|head| head.peel_to_commit())
        .map_err(|err| SyncError::git("failed to resolve HEAD commit", err))?;

    let (analysis, _) = repo
        .merge_analysis(&[&annotated])
        .map_err(|err| SyncError::git("failed to analyze merge", err))?;

    if analysis.is_up_to_date() {
        return Ok(Integration::Completed { commits: 0 });
    }

    let commits = count_commits(repo, head_commit.id(), remote_commit.id())?;

    if analysis.is_fast_forward() {
        let refname = branch_ref(branch);
        let mut reference = repo
            .find_reference(&refname)
            .map_err(|err| SyncError::git("failed to resolve local branch", err))?;
        reference
            .set_target(remote_commit.id(), "tether: fast-forward to remote")
            .map_err(|err| SyncError::git("failed to fast-forward branch", err))?;
        repo.set_head(&refname)
            .map_err(|err| SyncError::git("failed to update HEAD", err))?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_head(Some(&mut checkout))
            .map_err(|err| SyncError::git("failed to checkout fast-forwarded branch", err))?;
        return Ok(Integration::Completed { commits });
    }

    if !allow_unrelated {
        if let Err(err) = repo.merge_base(head_commit.id(), remote_commit.id()) {
            if err.code() == ErrorCode::NotFound {
                return Err(SyncError::Repo(format!(
                    "local branch and {remote}/{branch} share no history; \
                     rerun with --allow-unrelated-histories to merge them anyway"
                )));
            }
            return Err(SyncError::git("failed to compute merge base", err));
        }
    }

    let mut index = repo
        .merge_commits(&head_commit, &remote_commit, None)
        .map_err(|err| SyncError::git("failed to merge remote commits", err))?;
    if index.has_conflicts() {
        let files = collect_conflict_paths(&mut index);
        materialize_conflicts(repo, &annotated)?;
        return Ok(Integration::Conflicted { files });
    }

    let tree_oid = index
        .write_tree_to(repo)
        .map_err(|err| SyncError::git("failed to write merged tree", err))?;
    let tree = repo
        .find_tree(tree_oid)
        .map_err(|err| SyncError::git("failed to resolve merged tree", err))?;
    let sig = signature(repo)?;
    let message = format!("Merge remote-tracking branch '{remote}/{branch}'");
    repo.commit(
        Some("HEAD"),
        &sig,
        &sig,
        &message,
        &tree,
        &[&head_commit, &remote_commit],
    )
    .map_err(|err| SyncError::git("failed to create merge commit", err))?;

    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_head(Some(&mut checkout))
        .map_err(|err| SyncError::git("failed to checkout merge result", err))?;

    Ok(Integration::Completed { commits })
}

/// Replay local commits onto the remote tracking ref. On conflict the rebase
/// is left in progress so the user can resolve and continue (or abort) with
/// their normal git workflow.
fn rebase_onto_remote(
    repo: &Repository,
    remote: &str,
    branch: &str,
) -> Result<Integration, SyncError> {
    let remote_ref = repo
        .find_reference(&tracking_ref(remote, branch))
        .map_err(|err| SyncError::git("failed to resolve remote tracking ref", err))?;
    let upstream = repo
        .reference_to_annotated_commit(&remote_ref)
        .map_err(|err| SyncError::git("failed to resolve remote commit", err))?;
    let remote_oid = remote_ref
        .target()
        .ok_or_else(|| SyncError::Repo("remote tracking ref does not point at a commit".to_string()))?;
    let head_oid = repo
        .head()
        .and_then(|head| head.peel_to_commit())
        .map_err(|err| SyncError::git("failed to resolve HEAD commit", err))?
        .id();

    let commits = count_commits(repo, head_oid, remote_oid)?;
    let sig = signature(repo)?;

    let mut opts = RebaseOptions::new();
    let mut rebase = repo
        .rebase(None, Some(&upstream), None, Some(&mut opts))
        .map_err(|err| SyncError::git("failed to start rebase", err))?;

    while let Some(operation) = rebase.next() {
        operation.map_err(|err| SyncError::git("failed to apply commit during rebase", err))?;

        let mut index = repo
            .index()
            .map_err(|err| SyncError::git("failed to read index during rebase", err))?;
        if index.has_conflicts() {
            let files = collect_conflict_paths(&mut index);
            return Ok(Integration::Conflicted { files });
        }

        match rebase.commit(None, &sig, None) {
            Ok(_) => {}
            // Patch already present upstream; skip it.
            Err(err) if err.code() == ErrorCode::Applied => {}
            Err(err) => return Err(SyncError::git("failed to commit during rebase", err)),
        }
    }

    rebase
        .finish(Some(&sig))
        .map_err(|err| SyncError::git("failed to finish rebase", err))?;

    Ok(Integration::Completed { commits })
}
