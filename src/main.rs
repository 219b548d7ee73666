use std::path::Path;
use std::sync::Arc;

/// Reset SIGPIPE to default behavior so piping (e.g. `partlaunch status | head`)
/// exits cleanly instead of panicking on broken pipe.
#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use partlaunch::config::loader;
use partlaunch::config::types::LaunchConfig;
use partlaunch::launch::resolver::PartitionSetState;
use partlaunch::launch::session::{LaunchAttempt, LaunchSession};
use partlaunch::launch::LaunchOutcome;
use partlaunch::output::formatter;
use partlaunch::partition::health::PartitionHealthIndex;
use partlaunch::partition::span::parse_range_text;
use partlaunch::remote::graphql::GraphqlClient;
use partlaunch::remote::PartitionService;

/// partlaunch - Launch runs and backfills for partitioned assets
#[derive(Parser)]
#[command(name = "partlaunch", version, about, long_about = None)]
struct Cli {
    /// Path to the launch config file or its directory
    #[arg(short, long, default_value = "partlaunch.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// GraphQL endpoint (overrides the config file)
    #[arg(long, env = "PARTLAUNCH_ENDPOINT")]
    endpoint: Option<String>,

    /// API token sent as a bearer token
    #[arg(long, env = "PARTLAUNCH_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration without contacting the server
    Validate,

    /// Show materialized and missing partitions per asset
    Status,

    /// Launch a run (one partition) or a backfill (several partitions)
    Launch(LaunchArgs),
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("selection").args(["most_recent", "all", "missing", "partitions"])
))]
struct LaunchArgs {
    /// Launch only the most recent partition (default)
    #[arg(long)]
    most_recent: bool,

    /// Launch every partition
    #[arg(long)]
    all: bool,

    /// Launch partitions no launched asset has materialized
    #[arg(long)]
    missing: bool,

    /// Partitions to launch, e.g. "2023-01-01, [2023-01-03...2023-01-05]"
    #[arg(short, long)]
    partitions: Option<String>,

    /// Drop partitions whose upstream data is missing
    #[arg(long)]
    skip_upstream_missing: bool,

    /// Print the launch plan without submitting it
    #[arg(long)]
    dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(unix)]
    reset_sigpipe();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Validate => cmd_validate(&cli),
        Commands::Status => cmd_status(&cli).await,
        Commands::Launch(ref args) => cmd_launch(&cli, args).await,
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn load(cli: &Cli) -> Result<LaunchConfig> {
    let mut config = loader::load_config(Path::new(&cli.config))?;
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    Ok(config)
}

fn client(cli: &Cli, config: &LaunchConfig) -> Result<Arc<dyn PartitionService>> {
    let client = GraphqlClient::new(&config.endpoint, cli.token.clone(), config.timeout())?;
    Ok(Arc::new(client))
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;

    println!("\n{} Only '{}' will be accepted.", prompt, "yes".bold());
    print!("  Enter a value: ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim() == "yes")
}

// ─── Commands ────────────────────────────────────────────────────────────────

fn cmd_validate(cli: &Cli) -> Result<()> {
    let config = load(cli)?;
    let target = config.target()?;

    println!(
        "  {} {} on {}",
        "→".blue(),
        target.job_name.bold(),
        target.repo
    );
    println!(
        "  {} {} asset(s), {} upstream asset(s)",
        "→".blue(),
        target.assets.len(),
        config.upstream.len()
    );
    for asset in &target.assets {
        println!(
            "    {} {} {}",
            "•".dimmed(),
            asset.asset_key,
            format!("(op {})", asset.op_name).dimmed()
        );
    }

    formatter::print_success("Configuration is valid.");
    Ok(())
}

async fn cmd_status(cli: &Cli) -> Result<()> {
    let config = load(cli)?;
    let service = client(cli, &config)?;

    let health = service
        .fetch_partition_health(&config.asset_keys())
        .await
        .context("Failed to fetch partition health")?;
    formatter::print_health(&PartitionHealthIndex::new(health));

    let upstream = config.upstream_keys();
    if !upstream.is_empty() {
        let upstream_health = service
            .fetch_partition_health(&upstream)
            .await
            .context("Failed to fetch upstream partition health")?;
        println!();
        println!("{}", "Upstream".bold());
        formatter::print_health(&PartitionHealthIndex::new(upstream_health));
    }
    Ok(())
}

async fn cmd_launch(cli: &Cli, args: &LaunchArgs) -> Result<()> {
    let config = load(cli)?;
    let target = config.target()?;
    let service = client(cli, &config)?;

    let session = LaunchSession::new(
        target,
        config.upstream_keys(),
        service,
        config.settings.reseed,
    );

    session
        .refresh_health()
        .await
        .context("Failed to fetch partition health")?;
    let partition_set = session.open().await;

    let primary = session.selection().primary_keys().to_vec();
    if primary.is_empty() {
        bail!("Job '{}' has no partitions to launch.", config.job);
    }

    if let Some(text) = &args.partitions {
        let keys = parse_range_text(text, &primary)?;
        session.update_selection(|s| s.set_selection(keys));
    } else if args.most_recent || !(args.all || args.missing) {
        session.update_selection(|s| s.set_most_recent());
    } else if args.all {
        session.update_selection(|s| s.set_all());
    } else {
        session.update_selection(|s| s.set_missing());
    }

    if args.skip_upstream_missing {
        session.update_selection(|s| s.remove_upstream_unavailable());
    }

    let state = session.selection();
    formatter::print_launch_plan(
        session.target(),
        partition_set.partition_set(),
        &session.running_backfills(),
        &state,
    );

    if let PartitionSetState::Failed(failure) = &partition_set {
        formatter::print_warning(&failure.to_string());
    }

    if args.dry_run {
        return Ok(());
    }

    if !args.yes && !confirm("Do you want to launch?")? {
        println!("\n{}", "Launch cancelled.".yellow());
        return Ok(());
    }

    match session.launch().await {
        LaunchAttempt::Completed(outcome) | LaunchAttempt::Discarded(outcome) => {
            formatter::print_outcome(&outcome);
            if let LaunchOutcome::Failed { stage, .. } = outcome {
                bail!("Launch failed at {}", stage);
            }
            Ok(())
        }
        LaunchAttempt::AlreadyLaunching => bail!("A launch is already in progress."),
        LaunchAttempt::NotOpen => bail!("The launch session is not open."),
    }
}
