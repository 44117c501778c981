use super::guard;
use super::state::{BranchState, Classification};
use crate::repo::{ForceMode, Strategy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    Nothing,
    Push {
        remote_ref: String,
        commits: usize,
        mode: ForceMode,
    },
    Integrate {
        strategy: Strategy,
        remote_ref: String,
        commits: usize,
    },
    PromptDivergence {
        ahead: usize,
        behind: usize,
    },
    PushSetUpstream {
        remote_ref: String,
    },
}

/// What a real run would do, computed without any mutating adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunPlan {
    pub actions: Vec<PlannedAction>,
    pub stash: bool,
}

pub(crate) fn build(state: &BranchState, strategy: Strategy, force: ForceMode) -> DryRunPlan {
    let actions = match state.classification {
        Classification::UpToDate => vec![PlannedAction::Nothing],
        Classification::Ahead => vec![PlannedAction::Push {
            remote_ref: state.remote_ref.clone(),
            commits: state.ahead,
            mode: force,
        }],
        Classification::Behind => vec![PlannedAction::Integrate {
            strategy,
            remote_ref: state.remote_ref.clone(),
            commits: state.behind,
        }],
        Classification::Diverged => vec![PlannedAction::PromptDivergence {
            ahead: state.ahead,
            behind: state.behind,
        }],
        Classification::NewBranch => vec![PlannedAction::PushSetUpstream {
            remote_ref: state.remote_ref.clone(),
        }],
    };

    DryRunPlan {
        actions,
        stash: guard::needs_stash(state),
    }
}

impl DryRunPlan {
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        if self.stash {
            lines.push("would stash uncommitted changes before syncing".to_string());
        }
        for action in &self.actions {
            lines.push(match action {
                PlannedAction::Nothing => "nothing to do; branch is up to date".to_string(),
                PlannedAction::Push {
                    remote_ref,
                    commits,
                    mode,
                } => format!("would {} {commits} commit(s) to {remote_ref}", mode.label()),
                PlannedAction::Integrate {
                    strategy,
                    remote_ref,
                    commits,
                } => match strategy {
                    Strategy::Rebase => format!(
                        "would rebase onto {remote_ref}, integrating {commits} remote commit(s)"
                    ),
                    Strategy::Merge => format!(
                        "would merge {remote_ref}, integrating {commits} remote commit(s)"
                    ),
                },
                PlannedAction::PromptDivergence { ahead, behind } => format!(
                    "would prompt for a divergence resolution \
                     ({ahead} local and {behind} remote commit(s))"
                ),
                PlannedAction::PushSetUpstream { remote_ref } => {
                    format!("would push and set upstream to {remote_ref}")
                }
            });
        }
        if self.stash {
            lines.push("would restore the stashed changes afterwards".to_string());
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(classification: Classification, ahead: usize, behind: usize, dirty: bool) -> BranchState {
        BranchState {
            branch: "main".to_string(),
            remote: "origin".to_string(),
            remote_ref: "origin/main".to_string(),
            remote_branch_exists: classification != Classification::NewBranch,
            ahead,
            behind,
            dirty,
            classification,
        }
    }

    #[test]
    fn behind_plan_reports_stash_and_restore() {
        let plan = build(
            &state(Classification::Behind, 0, 2, true),
            Strategy::Rebase,
            ForceMode::None,
        );
        assert!(plan.stash);
        let rendered = plan.render();
        assert!(rendered.contains("would stash uncommitted changes"));
        assert!(rendered.contains("would rebase onto origin/main"));
        assert!(rendered.contains("restore the stashed changes afterwards"));
    }

    #[test]
    fn ahead_plan_never_stashes() {
        let plan = build(
            &state(Classification::Ahead, 3, 0, true),
            Strategy::Rebase,
            ForceMode::None,
        );
        assert!(!plan.stash);
        assert_eq!(
            plan.actions,
            vec![PlannedAction::Push {
                remote_ref: "origin/main".to_string(),
                commits: 3,
                mode: ForceMode::None,
            }]
        );
    }

    #[test]
    fn new_branch_plan_sets_upstream() {
        let plan = build(
            &state(Classification::NewBranch, 1, 0, false),
            Strategy::Merge,
            ForceMode::None,
        );
        assert_eq!(
            plan.actions,
            vec![PlannedAction::PushSetUpstream {
                remote_ref: "origin/main".to_string(),
            }]
        );
    }
}
