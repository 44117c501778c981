use std::collections::VecDeque;
use std::path::PathBuf;

use super::*;
use crate::errors::SyncError;
use crate::repo::{ForceMode, Integration, Probe, RepoAdapter, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PushResponse {
    Accept,
    RejectNonFastForward,
    RejectStaleLease,
}

/// Recording adapter with scripted responses.
struct MockRepo {
    branch: String,
    remotes: Vec<String>,
    reachable: bool,
    remote_branch_exists: bool,
    ahead: usize,
    behind: usize,
    dirty: bool,
    push_response: PushResponse,
    integrate_response: Option<Integration>,
    stash_pop_fails: bool,
    calls: Vec<String>,
}

impl MockRepo {
    fn new() -> Self {
        Self {
            branch: "main".to_string(),
            remotes: vec!["origin".to_string()],
            reachable: true,
            remote_branch_exists: true,
            ahead: 0,
            behind: 0,
            dirty: false,
            push_response: PushResponse::Accept,
            integrate_response: None,
            stash_pop_fails: false,
            calls: Vec::new(),
        }
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn mutating_calls(&self) -> usize {
        ["push", "integrate", "stash"]
            .iter()
            .map(|prefix| self.count(prefix))
            .sum()
    }
}

impl RepoAdapter for MockRepo {
    fn current_branch(&mut self) -> Result<String, SyncError> {
        Ok(self.branch.clone())
    }

    fn list_remotes(&mut self) -> Result<Vec<String>, SyncError> {
        Ok(self.remotes.clone())
    }

    fn probe_remote(&mut self, _remote: &str) -> Result<Probe, SyncError> {
        self.calls.push("probe".to_string());
        if self.reachable {
            Ok(Probe::Reachable)
        } else {
            Ok(Probe::Unreachable("could not resolve host".to_string()))
        }
    }

    fn fetch(&mut self, _remote: &str) -> Result<(), SyncError> {
        self.calls.push("fetch".to_string());
        Ok(())
    }

    fn ahead_behind(&mut self, _remote: &str, _branch: &str) -> Result<(usize, usize), SyncError> {
        Ok((self.ahead, self.behind))
    }

    fn remote_branch_exists(&mut self, _remote: &str, _branch: &str) -> Result<bool, SyncError> {
        Ok(self.remote_branch_exists)
    }

    fn is_working_tree_dirty(&mut self) -> Result<bool, SyncError> {
        Ok(self.dirty)
    }

    fn push(&mut self, remote: &str, branch: &str, mode: ForceMode) -> Result<(), SyncError> {
        self.calls.push(format!("push:{mode:?}"));
        match self.push_response {
            PushResponse::Accept => Ok(()),
            PushResponse::RejectNonFastForward => Err(SyncError::PushRejected {
                remote: remote.to_string(),
                branch: branch.to_string(),
            }),
            PushResponse::RejectStaleLease => Err(SyncError::StaleLease {
                remote: remote.to_string(),
                branch: branch.to_string(),
            }),
        }
    }

    fn push_set_upstream(&mut self, _remote: &str, _branch: &str) -> Result<(), SyncError> {
        self.calls.push("push_set_upstream".to_string());
        self.remote_branch_exists = true;
        Ok(())
    }

    fn integrate(
        &mut self,
        strategy: Strategy,
        _remote: &str,
        _branch: &str,
        _allow_unrelated: bool,
    ) -> Result<Integration, SyncError> {
        self.calls.push(format!("integrate:{}", strategy.label()));
        Ok(self
            .integrate_response
            .clone()
            .expect("unexpected integrate call"))
    }

    fn stash_push(&mut self, _label: &str) -> Result<(), SyncError> {
        self.calls.push("stash_push".to_string());
        Ok(())
    }

    fn stash_pop(&mut self, _label: &str) -> Result<(), SyncError> {
        self.calls.push("stash_pop".to_string());
        if self.stash_pop_fails {
            Err(SyncError::Repo(
                "stashed changes do not apply cleanly".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn working_directory(&self) -> PathBuf {
        PathBuf::from("/work/mock")
    }
}

struct ScriptedPrompter {
    choices: VecDeque<DivergenceChoice>,
    confirmations: VecDeque<bool>,
}

impl ScriptedPrompter {
    fn none() -> Self {
        Self {
            choices: VecDeque::new(),
            confirmations: VecDeque::new(),
        }
    }

    fn choosing(choice: DivergenceChoice) -> Self {
        Self {
            choices: VecDeque::from(vec![choice]),
            confirmations: VecDeque::new(),
        }
    }

    fn confirming(choice: DivergenceChoice, confirm: bool) -> Self {
        Self {
            choices: VecDeque::from(vec![choice]),
            confirmations: VecDeque::from(vec![confirm]),
        }
    }
}

impl DivergencePrompter for ScriptedPrompter {
    fn choose(&mut self, _state: &BranchState) -> Result<DivergenceChoice, SyncError> {
        Ok(self
            .choices
            .pop_front()
            .expect("unexpected divergence prompt"))
    }

    fn confirm_force_push(&mut self, _state: &BranchState) -> Result<bool, SyncError> {
        Ok(self
            .confirmations
            .pop_front()
            .expect("unexpected force-push confirmation"))
    }
}

fn temp_queue(dir: &tempfile::TempDir) -> OfflineQueue {
    OfflineQueue::at(dir.path().join("queue.jsonl"))
}

fn run(
    mock: &mut MockRepo,
    prompter: &mut ScriptedPrompter,
    request: &ReconciliationRequest,
) -> Result<SyncOutcome, SyncError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let queue = temp_queue(&dir);
    reconcile_with_queue(mock, prompter, request, &queue)
}

#[test]
fn classification_follows_precedence_rule() {
    for exists in [false, true] {
        for ahead in [0usize, 1, 3] {
            for behind in [0usize, 2] {
                let got = classify(exists, ahead, behind);
                let want = if !exists {
                    Classification::NewBranch
                } else if ahead == 0 && behind == 0 {
                    Classification::UpToDate
                } else if ahead > 0 && behind == 0 {
                    Classification::Ahead
                } else if ahead == 0 {
                    Classification::Behind
                } else {
                    Classification::Diverged
                };
                assert_eq!(got, want, "exists={exists} ahead={ahead} behind={behind}");
            }
        }
    }
}

#[test]
fn classification_ignores_working_tree_state() {
    for dirty in [false, true] {
        let mut mock = MockRepo::new();
        mock.ahead = 1;
        mock.behind = 1;
        mock.dirty = dirty;
        let state = analyze(&mut mock, "origin", None).unwrap();
        assert_eq!(state.classification, Classification::Diverged);
        assert_eq!(state.dirty, dirty);
    }
}

#[test]
fn unknown_remote_fails_before_any_probe() {
    let mut mock = MockRepo::new();
    let mut prompter = ScriptedPrompter::none();
    let request = ReconciliationRequest::new("upstream");

    let err = run(&mut mock, &mut prompter, &request).unwrap_err();
    match err {
        SyncError::UnknownRemote { remote, configured } => {
            assert_eq!(remote, "upstream");
            assert_eq!(configured, vec!["origin".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(mock.count("probe"), 0);
}

#[test]
fn up_to_date_twice_makes_no_mutating_calls() {
    let mut mock = MockRepo::new();
    let mut prompter = ScriptedPrompter::none();
    let request = ReconciliationRequest::new("origin");

    for _ in 0..2 {
        let outcome = run(&mut mock, &mut prompter, &request).unwrap();
        assert_eq!(outcome, SyncOutcome::UpToDate);
    }
    assert_eq!(mock.mutating_calls(), 0);
    assert_eq!(mock.count("fetch"), 2);
}

#[test]
fn ahead_pushes_and_reports_commit_count() {
    // Scenario A.
    let mut mock = MockRepo::new();
    mock.ahead = 3;
    let mut prompter = ScriptedPrompter::none();
    let request = ReconciliationRequest::new("origin");

    let outcome = run(&mut mock, &mut prompter, &request).unwrap();
    assert_eq!(outcome, SyncOutcome::Pushed(3));
    assert_eq!(mock.count("push:None"), 1);
    assert_eq!(mock.count("stash"), 0);
}

#[test]
fn rejected_push_surfaces_without_a_stash() {
    // Scenario B: ahead never stashes, even with a dirty tree.
    let mut mock = MockRepo::new();
    mock.ahead = 3;
    mock.dirty = true;
    mock.push_response = PushResponse::RejectNonFastForward;
    let mut prompter = ScriptedPrompter::none();
    let request = ReconciliationRequest::new("origin");

    let err = run(&mut mock, &mut prompter, &request).unwrap_err();
    assert!(matches!(err, SyncError::PushRejected { .. }));
    assert_eq!(mock.count("stash"), 0);
}

#[test]
fn behind_integrates_with_the_resolved_strategy() {
    let mut mock = MockRepo::new();
    mock.behind = 2;
    mock.integrate_response = Some(Integration::Completed { commits: 2 });
    let mut prompter = ScriptedPrompter::none();
    let mut request = ReconciliationRequest::new("origin");
    request.strategy_override = Some(Strategy::Merge);

    let outcome = run(&mut mock, &mut prompter, &request).unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Integrated {
            strategy: Strategy::Merge,
            commits: 2,
        }
    );
    assert_eq!(mock.count("integrate:merge"), 1);
}

#[test]
fn conflicted_integration_still_pops_the_stash() {
    // Scenario C.
    let mut mock = MockRepo::new();
    mock.behind = 2;
    mock.dirty = true;
    mock.integrate_response = Some(Integration::Conflicted {
        files: vec!["src/lib.rs".to_string()],
    });
    let mut prompter = ScriptedPrompter::none();
    let mut request = ReconciliationRequest::new("origin");
    request.strategy_override = Some(Strategy::Rebase);

    let err = run(&mut mock, &mut prompter, &request).unwrap_err();
    match err {
        SyncError::Conflict { operation, files } => {
            assert_eq!(operation, Strategy::Rebase);
            assert_eq!(files, vec!["src/lib.rs".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(mock.count("stash_push"), 1);
    assert_eq!(mock.count("stash_pop"), 1);
}

#[test]
fn cancelled_divergence_unwinds_through_the_stash() {
    // Scenario D, with a dirty tree so the stash pairing is observable.
    let mut mock = MockRepo::new();
    mock.ahead = 2;
    mock.behind = 3;
    mock.dirty = true;
    let mut prompter = ScriptedPrompter::choosing(DivergenceChoice::Cancel);
    let request = ReconciliationRequest::new("origin");

    let err = run(&mut mock, &mut prompter, &request).unwrap_err();
    assert!(matches!(err, SyncError::Cancelled));
    assert_eq!(mock.count("push"), 0);
    assert_eq!(mock.count("integrate"), 0);
    assert_eq!(mock.count("stash_push"), 1);
    assert_eq!(mock.count("stash_pop"), 1);
}

#[test]
fn cancelled_divergence_on_clean_tree_makes_no_mutating_calls() {
    // Scenario D as written: only the fetch happens.
    let mut mock = MockRepo::new();
    mock.ahead = 2;
    mock.behind = 3;
    let mut prompter = ScriptedPrompter::choosing(DivergenceChoice::Cancel);
    let request = ReconciliationRequest::new("origin");

    let err = run(&mut mock, &mut prompter, &request).unwrap_err();
    assert!(matches!(err, SyncError::Cancelled));
    assert_eq!(mock.mutating_calls(), 0);
    assert_eq!(mock.count("fetch"), 1);
}

#[test]
fn diverged_rebase_choice_integrates_before_pushing() {
    let mut mock = MockRepo::new();
    mock.ahead = 2;
    mock.behind = 3;
    mock.integrate_response = Some(Integration::Completed { commits: 3 });
    let mut prompter = ScriptedPrompter::choosing(DivergenceChoice::RebaseThenPush);
    let request = ReconciliationRequest::new("origin");

    let outcome = run(&mut mock, &mut prompter, &request).unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Integrated {
            strategy: Strategy::Rebase,
            commits: 3,
        }
    );
    let integrate_at = mock
        .calls
        .iter()
        .position(|call| call.starts_with("integrate"))
        .unwrap();
    let push_at = mock
        .calls
        .iter()
        .position(|call| call.starts_with("push"))
        .unwrap();
    assert!(integrate_at < push_at, "integration must precede the push");
}

#[test]
fn diverged_conflict_never_reaches_the_push() {
    let mut mock = MockRepo::new();
    mock.ahead = 1;
    mock.behind = 1;
    mock.integrate_response = Some(Integration::Conflicted {
        files: vec!["README.md".to_string()],
    });
    let mut prompter = ScriptedPrompter::choosing(DivergenceChoice::MergeThenPush);
    let request = ReconciliationRequest::new("origin");

    let err = run(&mut mock, &mut prompter, &request).unwrap_err();
    assert!(matches!(err, SyncError::Conflict { .. }));
    assert_eq!(mock.count("push"), 0);
}

#[test]
fn force_push_requires_a_second_confirmation() {
    let mut mock = MockRepo::new();
    mock.ahead = 1;
    mock.behind = 1;
    let mut prompter = ScriptedPrompter::confirming(DivergenceChoice::ForceWithLease, false);
    let request = ReconciliationRequest::new("origin");

    let err = run(&mut mock, &mut prompter, &request).unwrap_err();
    assert!(matches!(err, SyncError::Cancelled));
    assert_eq!(mock.count("push"), 0);
}

#[test]
fn stale_lease_surfaces_and_the_stash_still_pops() {
    let mut mock = MockRepo::new();
    mock.ahead = 1;
    mock.behind = 1;
    mock.dirty = true;
    mock.push_response = PushResponse::RejectStaleLease;
    let mut prompter = ScriptedPrompter::confirming(DivergenceChoice::ForceWithLease, true);
    let request = ReconciliationRequest::new("origin");

    let err = run(&mut mock, &mut prompter, &request).unwrap_err();
    assert!(matches!(err, SyncError::StaleLease { .. }));
    assert_eq!(mock.count("push:ForceWithLease"), 1);
    assert_eq!(mock.count("stash_push"), 1);
    assert_eq!(mock.count("stash_pop"), 1);
}

#[test]
fn new_branch_pushes_with_upstream_tracking() {
    // Scenario E.
    let mut mock = MockRepo::new();
    mock.remote_branch_exists = false;
    mock.ahead = 1;
    let mut prompter = ScriptedPrompter::none();
    let request = ReconciliationRequest::new("origin");

    let outcome = run(&mut mock, &mut prompter, &request).unwrap();
    assert_eq!(outcome, SyncOutcome::Pushed(1));
    assert_eq!(mock.count("push_set_upstream"), 1);

    let state = analyze(&mut mock, "origin", None).unwrap();
    assert!(state.remote_branch_exists);
}

#[test]
fn unreachable_remote_queues_instead_of_failing() {
    // Scenario F.
    let mut mock = MockRepo::new();
    mock.reachable = false;
    let mut prompter = ScriptedPrompter::none();
    let mut request = ReconciliationRequest::new("origin");
    request.strategy_override = Some(Strategy::Merge);

    let dir = tempfile::tempdir().unwrap();
    let queue = temp_queue(&dir);
    let outcome = reconcile_with_queue(&mut mock, &mut prompter, &request, &queue).unwrap();

    let SyncOutcome::Queued(Some(id)) = outcome else {
        panic!("expected a queued outcome, got {outcome:?}");
    };

    assert_eq!(mock.count("fetch"), 0);
    assert_eq!(mock.mutating_calls(), 0);

    let entries = queue.load().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, id);
    assert_eq!(entries[0].branch, "main");
    assert_eq!(entries[0].working_directory, PathBuf::from("/work/mock"));
    assert_eq!(entries[0].request.remote, "origin");
    assert_eq!(entries[0].request.strategy_override, Some(Strategy::Merge));
}

#[test]
fn queue_appends_preserve_existing_entries() {
    let mut mock = MockRepo::new();
    mock.reachable = false;
    let mut prompter = ScriptedPrompter::none();
    let request = ReconciliationRequest::new("origin");

    let dir = tempfile::tempdir().unwrap();
    let queue = temp_queue(&dir);
    for _ in 0..2 {
        reconcile_with_queue(&mut mock, &mut prompter, &request, &queue).unwrap();
    }

    let entries = queue.load().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].timestamp <= entries[1].timestamp);
}

#[test]
fn queue_write_failure_degrades_to_a_warning() {
    let mut mock = MockRepo::new();
    mock.reachable = false;
    let mut prompter = ScriptedPrompter::none();
    let request = ReconciliationRequest::new("origin");

    // Parent of the queue path is a file, so the append cannot succeed.
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    let queue = OfflineQueue::at(blocker.join("queue.jsonl"));

    let outcome = reconcile_with_queue(&mut mock, &mut prompter, &request, &queue).unwrap();
    assert_eq!(outcome, SyncOutcome::Queued(None));
}

#[test]
fn dry_run_plans_without_mutating_calls() {
    let mut mock = MockRepo::new();
    mock.behind = 2;
    mock.dirty = true;
    let mut prompter = ScriptedPrompter::none();
    let mut request = ReconciliationRequest::new("origin");
    request.dry_run = true;
    request.strategy_override = Some(Strategy::Rebase);

    let outcome = run(&mut mock, &mut prompter, &request).unwrap();
    let SyncOutcome::DryRun(plan) = outcome else {
        panic!("expected a dry-run plan");
    };
    assert!(plan.stash);
    assert_eq!(
        plan.actions,
        vec![PlannedAction::Integrate {
            strategy: Strategy::Rebase,
            remote_ref: "origin/main".to_string(),
            commits: 2,
        }]
    );
    assert_eq!(mock.mutating_calls(), 0);
    assert_eq!(mock.count("fetch"), 1);
}

#[test]
fn restore_warning_never_masks_the_primary_error() {
    let mut mock = MockRepo::new();
    mock.behind = 1;
    mock.dirty = true;
    mock.stash_pop_fails = true;
    mock.integrate_response = Some(Integration::Conflicted {
        files: vec!["Cargo.toml".to_string()],
    });

    let state = analyze(&mut mock, "origin", None).unwrap();
    let (result, warning) = run_guarded(&mut mock, &state, |adapter| {
        match adapter.integrate(Strategy::Rebase, "origin", "main", false)? {
            Integration::Conflicted { files } => Err(SyncError::Conflict {
                operation: Strategy::Rebase,
                files,
            }),
            Integration::Completed { commits } => Ok(commits),
        }
    });

    assert!(matches!(result, Err(SyncError::Conflict { .. })));
    let warning = warning.expect("expected a restore warning");
    assert!(warning.to_string().contains("git stash pop"));
    assert_eq!(mock.count("stash_pop"), 1);
}
