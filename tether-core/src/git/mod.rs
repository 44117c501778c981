mod auth;
mod integrate;
mod remotes;
mod stash;
mod status;

use git2::Repository;
use std::path::{Path, PathBuf};

use crate::errors::SyncError;
use crate::repo::{ForceMode, Integration, Probe, RepoAdapter, Strategy};

/// libgit2-backed implementation of the repository adapter.
pub struct GitRepo {
    repo: Repository,
    workdir: PathBuf,
}

impl GitRepo {
    pub fn discover() -> Result<Self, SyncError> {
        Self::open(".")
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SyncError> {
        let repo = Repository::discover(path)
            .map_err(|err| SyncError::git("failed to discover git repository", err))?;
        let workdir = repo
            .workdir()
            .map(|dir| dir.to_path_buf())
            .ok_or_else(|| SyncError::Repo("cannot sync a bare repository".to_string()))?;
        Ok(Self { repo, workdir })
    }
}

impl RepoAdapter for GitRepo {
    fn current_branch(&mut self) -> Result<String, SyncError> {
        status::current_branch(&self.repo)
    }

    fn list_remotes(&mut self) -> Result<Vec<String>, SyncError> {
        remotes::list_remotes(&self.repo)
    }

    fn probe_remote(&mut self, remote: &str) -> Result<Probe, SyncError> {
        remotes::probe(&self.repo, remote)
    }

    fn fetch(&mut self, remote: &str) -> Result<(), SyncError> {
        remotes::fetch(&self.repo, remote)
    }

    fn ahead_behind(&mut self, remote: &str, branch: &str) -> Result<(usize, usize), SyncError> {
        status::ahead_behind(&self.repo, remote, branch)
    }

    fn remote_branch_exists(&mut self, remote: &str, branch: &str) -> Result<bool, SyncError> {
        status::remote_branch_exists(&self.repo, remote, branch)
    }

    fn is_working_tree_dirty(&mut self) -> Result<bool, SyncError> {
        status::is_dirty(&self.repo)
    }

    fn push(&mut self, remote: &str, branch: &str, mode: ForceMode) -> Result<(), SyncError> {
        remotes::push(&self.repo, remote, branch, mode)
    }

    fn push_set_upstream(&mut self, remote: &str, branch: &str) -> Result<(), SyncError> {
        remotes::push_set_upstream(&self.repo, remote, branch)
    }

    fn integrate(
        &mut self,
        strategy: Strategy,
        remote: &str,
        branch: &str,
        allow_unrelated: bool,
    ) -> Result<Integration, SyncError> {
        integrate::integrate(&self.repo, strategy, remote, branch, allow_unrelated)
    }

    fn stash_push(&mut self, label: &str) -> Result<(), SyncError> {
        stash::stash_push(&mut self.repo, label)
    }

    fn stash_pop(&mut self, label: &str) -> Result<(), SyncError> {
        stash::stash_pop(&mut self.repo, label)
    }

    fn working_directory(&self) -> PathBuf {
        self.workdir.clone()
    }
}

fn tracking_ref(remote: &str, branch: &str) -> String {
    format!("refs/remotes/{remote}/{branch}")
}

fn branch_ref(branch: &str) -> String {
    format!("refs/heads/{branch}")
}
