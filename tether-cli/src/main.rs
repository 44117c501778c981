use clap::{ArgGroup, Args as ClapArgs, Parser, Subcommand};
use tether_core::display::{self, LogLevel};

mod actions;
use crate::actions::*;

/// Keep local branches and their remotes in agreement.
#[derive(Parser, Debug)]
#[command(
    name = "tether",
    version,
    about,
    // Show help when you forget a subcommand
    arg_required_else_help = true,
    // Make version available to subcommands automatically
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs, Debug, Default)]
struct GlobalOpts {
    /// Enable debug logging
    #[arg(short = 'd', long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile a branch with its remote counterpart
    ///
    /// Examples:
    ///   tether sync                  # current branch against origin
    ///   tether sync --merge          # integrate remote commits by merging
    ///   tether sync -n               # report the plan without acting
    Sync(SyncCmd),

    /// List syncs queued while their remote was unreachable
    Queue(QueueCmd),
}

#[derive(ClapArgs, Debug)]
#[command(
    group = ArgGroup::new("strategy")
        .args(&["rebase", "merge"])
        .multiple(false),
    group = ArgGroup::new("force_mode")
        .args(&["force", "force_with_lease"])
        .multiple(false)
)]
pub struct SyncCmd {
    /// Branch to sync; defaults to the current branch
    #[arg(value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Remote to sync against
    #[arg(short = 'r', long, default_value = "origin")]
    pub remote: String,

    /// Integrate remote commits by rebasing local work onto them
    #[arg(long)]
    pub rebase: bool,

    /// Integrate remote commits with a merge commit
    #[arg(long)]
    pub merge: bool,

    /// Overwrite remote history unconditionally
    #[arg(long)]
    pub force: bool,

    /// Overwrite remote history only if it still matches the last fetch
    #[arg(long = "force-with-lease")]
    pub force_with_lease: bool,

    /// Report what would happen without touching the repository
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Permit merging branches that share no common history
    #[arg(long = "allow-unrelated-histories")]
    pub allow_unrelated_histories: bool,
}

#[derive(ClapArgs, Debug)]
pub struct QueueCmd {}

fn main() {
    let cli = Cli::parse();

    display::set_debug(cli.global.debug);

    let result = match cli.command {
        Commands::Sync(cmd) => run_sync(cmd),
        Commands::Queue(_cmd) => list_queue(),
    };

    if let Err(err) = result {
        display::emit(LogLevel::Error, err.to_string());
        std::process::exit(1);
    }
}
