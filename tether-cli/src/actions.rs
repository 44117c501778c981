use std::io::{self, BufRead, IsTerminal, Write};

use colored::Colorize;

use tether_core::display::{self, LogLevel};
use tether_core::errors::SyncError;
use tether_core::git::GitRepo;
use tether_core::repo::{ForceMode, Strategy};
use tether_core::sync::{
    self, BranchState, DivergenceChoice, DivergencePrompter, OfflineQueue, ReconciliationRequest,
    SyncOutcome, parse_divergence_choice,
};

use crate::SyncCmd;

pub fn run_sync(cmd: SyncCmd) -> Result<(), SyncError> {
    let mut request = ReconciliationRequest::new(cmd.remote);
    request.branch = cmd.branch;
    request.strategy_override = if cmd.rebase {
        Some(Strategy::Rebase)
    } else if cmd.merge {
        Some(Strategy::Merge)
    } else {
        None
    };
    request.force_mode = if cmd.force {
        ForceMode::Force
    } else if cmd.force_with_lease {
        ForceMode::ForceWithLease
    } else {
        ForceMode::None
    };
    request.dry_run = cmd.dry_run;
    request.allow_unrelated_histories = cmd.allow_unrelated_histories;

    let mut adapter = GitRepo::discover()?;
    let mut prompter = TerminalPrompter;
    let outcome = sync::reconcile(&mut adapter, &mut prompter, &request)?;
    render_outcome(&outcome);

    Ok(())
}

fn render_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::UpToDate => println!("already up to date"),
        SyncOutcome::Pushed(commits) => println!("pushed {commits} commit(s)"),
        SyncOutcome::Integrated { strategy, commits } => {
            println!("integrated {commits} remote commit(s) via {}", strategy.label())
        }
        SyncOutcome::Queued(Some(id)) => println!(
            "sync queued as entry {id}; run `tether sync` again once the remote is reachable"
        ),
        SyncOutcome::Queued(None) => {
            println!("remote unreachable; retry once the network is back")
        }
        SyncOutcome::DryRun(plan) => println!("{}", plan.render()),
    }
}

pub fn list_queue() -> Result<(), SyncError> {
    let queue = OfflineQueue::open_default()?;
    let entries = queue.load()?;
    if entries.is_empty() {
        display::emit(LogLevel::Info, "the offline queue is empty");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{}  {}  {}  {}",
            entry.id,
            entry.timestamp,
            entry.branch.as_str().bold(),
            entry.working_directory.display()
        );
    }

    Ok(())
}

/// Asks on stderr and reads stdin. A non-interactive stdin cancels rather
/// than hanging a scripted invocation.
struct TerminalPrompter;

impl TerminalPrompter {
    fn read_answer(prompt: &str) -> Result<String, SyncError> {
        if !io::stdin().is_terminal() {
            return Err(SyncError::Cancelled);
        }

        eprint!("{prompt}");
        io::stderr()
            .flush()
            .map_err(|err| SyncError::Io {
                context: "failed to flush prompt".to_string(),
                source: err,
            })?;

        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(|err| SyncError::Io {
                context: "failed to read prompt answer".to_string(),
                source: err,
            })?;
        Ok(answer)
    }
}

impl DivergencePrompter for TerminalPrompter {
    fn choose(&mut self, state: &BranchState) -> Result<DivergenceChoice, SyncError> {
        eprintln!(
            "{} has diverged from {} ({} local and {} remote commit(s))",
            state.branch.as_str().bold(),
            state.remote_ref,
            state.ahead,
            state.behind
        );
        eprintln!("  1) rebase local commits onto {}", state.remote_ref);
        eprintln!("  2) merge {} into {}", state.remote_ref, state.branch);
        eprintln!("  3) force push local history (with lease)");
        eprintln!("  anything else cancels");

        let answer = Self::read_answer("> ")?;
        Ok(parse_divergence_choice(&answer))
    }

    fn confirm_force_push(&mut self, state: &BranchState) -> Result<bool, SyncError> {
        let prompt = format!(
            "{} overwrite {} with local history? [y/N] ",
            "this discards remote commits:".yellow().bold(),
            state.remote_ref
        );
        let answer = Self::read_answer(&prompt)?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}
