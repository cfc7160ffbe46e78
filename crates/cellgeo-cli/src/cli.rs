use clap::{Parser, Subcommand, ValueEnum};

/// Server queried when neither `--server` nor `CELLGEO_URL` is given.
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5265";

#[derive(Parser)]
#[command(name = "cellgeo")]
#[command(about = "cellgeo CLI: look up cell tower locations on a cellgeo server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server base URL
    #[arg(short, long, global = true, env = "CELLGEO_URL", default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the location of one cell
    Lookup(LookupArgs),
    /// Check server health and dataset version
    Status,
    /// Show resolver counters and tier sizes
    Stats,
    /// Prune a writable tier of entries known to a more trusted tier
    Reconcile(ReconcileArgs),
    /// Ask a provider again about its stale cached answers
    Refresh(RefreshArgs),
}

#[derive(clap::Args)]
pub struct LookupArgs {
    /// Mobile country code
    pub mcc: i64,
    /// Mobile network code
    pub mnc: i64,
    /// Location area code
    pub lac: i64,
    /// Cell id
    pub cellid: i64,
}

#[derive(clap::Args)]
pub struct ReconcileArgs {
    /// Tier to sweep (glm, unwiredlabs, own)
    pub tier: String,
}

#[derive(clap::Args)]
pub struct RefreshArgs {
    /// Provider cache tier to refresh (glm, unwiredlabs)
    pub tier: String,

    /// Only entries not written for this many seconds; 0 for all
    #[arg(long)]
    pub max_age_secs: Option<u64>,
}
