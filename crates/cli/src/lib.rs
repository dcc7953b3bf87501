use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use reactrack_text_chunker::{PackingPolicy, DEFAULT_MAX_LEN};
use std::io;
use std::path::PathBuf;

mod replay;
mod split;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    print_stdout(&text)
}

#[derive(Parser)]
#[command(name = "reactrack")]
#[command(about = "Reaction-tracked items: text layout and event replay", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay text out over bounded segments
    Split(SplitArgs),

    /// Replay a JSON-lines script of sheet commands and reactions
    Replay(ReplayArgs),

    /// Print the JSON schema of registry snapshots
    #[command(name = "snapshot-schema")]
    SnapshotSchema,
}

#[derive(Args)]
struct SplitArgs {
    /// Input file (stdin when omitted)
    file: Option<PathBuf>,

    /// Exact number of segments (computed from the text when omitted)
    #[arg(long)]
    slots: Option<usize>,

    /// Lower bound for the computed number of segments
    #[arg(long, default_value_t = 4)]
    min_slots: usize,

    /// Segments added on top of what the text needs
    #[arg(long, default_value_t = 2)]
    reserve: usize,

    /// Maximum segment length in characters
    #[arg(long, default_value_t = DEFAULT_MAX_LEN)]
    max_len: usize,

    /// Packing policy
    #[arg(long, value_enum, default_value = "bottom")]
    policy: PolicyArg,

    /// Print segments as a JSON array
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Bottom,
    Top,
}

impl From<PolicyArg> for PackingPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Bottom => PackingPolicy::BottomWeighted,
            PolicyArg::Top => PackingPolicy::TopGreedy,
        }
    }
}

#[derive(Args)]
struct ReplayArgs {
    /// Script with one JSON step per line
    script: PathBuf,

    /// Tracker config file (JSON or TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for machine-readable output
    let json_output = match &cli.command {
        Commands::Split(args) => args.json,
        Commands::Replay(_) | Commands::SnapshotSchema => true,
    };
    if json_output && !cli.verbose {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Split(args) => split::run(args)?,
        Commands::Replay(args) => replay::run(args).await?,
        Commands::SnapshotSchema => print_json(&reactrack_protocol::snapshot::snapshot_json_schema())?,
    }

    Ok(())
}
