use std::path::PathBuf;

use clap::{Parser, Subcommand};

use warden_core::assignment::{ActorRef, ScopeRef};
use warden_core::domain::ScopeKind;

#[derive(Debug, Parser)]
#[command(name = "warden", version, about = "Inspect and evaluate warden permissions")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print resolution counters in Prometheus text format to stderr.
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve an actor's ability in a scope and evaluate one query.
    Check {
        #[arg(long)]
        fixture: PathBuf,
        /// Actor as `type:id`, e.g. `user:alice`.
        #[arg(long)]
        actor: ActorRef,
        /// Scope as `kind:id`, e.g. `project:p1`.
        #[arg(long)]
        scope: ScopeRef,
        #[arg(long)]
        action: String,
        #[arg(long)]
        subject: String,
        /// Resource instance as a JSON object, for conditional rules.
        #[arg(long)]
        instance: Option<String>,
    },
    /// Check whether `requestor` may grant everything `target` holds.
    Boundary {
        #[arg(long)]
        fixture: PathBuf,
        #[arg(long)]
        scope: ScopeRef,
        #[arg(long)]
        requestor: ActorRef,
        #[arg(long)]
        target: ActorRef,
    },
    /// Print the built-in role catalog.
    Roles {
        #[arg(long)]
        scope_kind: Option<ScopeKind>,
    },
    /// Create the Postgres tables.
    Migrate,
}
