use crate::control::{
    identity_seed_path, init_storage, load_or_create_identity, open_result_archive,
    open_task_ledger, open_validator,
};
use crate::ledger::TaskLedger;
use crate::settings::ValidatorSettings;
use crate::storage::ResultArchive;
use crate::types::{EventKind, TimeWindow, TokenPair};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "poolwatch")]
#[command(about = "Liquidity pool event validator")]
pub struct Cli {
    #[command(subcommand)]
    command: RootCommand,

    #[arg(long, default_value = ".poolwatch")]
    state_dir: PathBuf,

    /// JSON settings file; defaults apply to missing fields.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long = "pg-url")]
    pg_url: Option<String>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum RootCommand {
    Validator(ValidatorCommand),
    Ledger(LedgerCommand),
    Archive(ArchiveCommand),
    Identity(IdentityCommand),
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
struct ValidatorCommand {
    #[command(subcommand)]
    action: ValidatorAction,
}

#[derive(Subcommand, Debug)]
enum ValidatorAction {
    /// Run validation rounds until interrupted.
    Run {
        /// Run a single round and print its report.
        #[arg(long)]
        once: bool,
        #[arg(long)]
        max_rounds: Option<u64>,
    },
}

#[derive(Args, Debug)]
struct LedgerCommand {
    #[command(subcommand)]
    action: LedgerAction,
}

#[derive(Args, Debug)]
struct WindowArgs {
    #[arg(long)]
    start: NaiveDate,
    #[arg(long)]
    end: NaiveDate,
}

impl WindowArgs {
    fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }
}

#[derive(Args, Debug)]
struct PairArgs {
    token_a: String,
    token_b: String,
    fee: u32,
}

impl PairArgs {
    fn pair(&self) -> TokenPair {
        TokenPair::new(self.token_a.clone(), self.token_b.clone(), self.fee)
    }
}

#[derive(Subcommand, Debug)]
enum LedgerAction {
    Init,
    Windows,
    NextWindow,
    CompleteWindow(WindowArgs),
    Pairs(WindowArgs),
    AddPair {
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        pair: PairArgs,
    },
    CompletePair {
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        pair: PairArgs,
    },
}

#[derive(Args, Debug)]
struct ArchiveCommand {
    #[command(subcommand)]
    action: ArchiveAction,
}

#[derive(Subcommand, Debug)]
enum ArchiveAction {
    Count {
        #[command(flatten)]
        pair: PairArgs,
        #[arg(long)]
        kind: Option<EventKind>,
    },
}

#[derive(Args, Debug)]
struct IdentityCommand {
    #[command(subcommand)]
    action: IdentityAction,
}

#[derive(Subcommand, Debug)]
enum IdentityAction {
    Show,
}

#[derive(Args, Debug)]
struct ConfigCommand {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective settings after file and environment overrides.
    Show,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = ValidatorSettings::load(cli.config.as_deref())?;
    if let Some(url) = cli.pg_url {
        settings.database_url = url;
    }

    match cli.command {
        RootCommand::Validator(cmd) => handle_validator(cmd, &settings, &cli.state_dir),
        RootCommand::Ledger(cmd) => handle_ledger(cmd, &settings),
        RootCommand::Archive(cmd) => handle_archive(cmd, &settings),
        RootCommand::Identity(cmd) => handle_identity(cmd, &cli.state_dir),
        RootCommand::Config(cmd) => match cmd.action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
                Ok(())
            }
        },
    }
}

/// `RUST_LOG` wins; otherwise verbosity picks the level for poolwatch crates.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,poolwatch={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_validator(
    cmd: ValidatorCommand,
    settings: &ValidatorSettings,
    state_dir: &Path,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")?;

    match cmd.action {
        ValidatorAction::Run { once, max_rounds } => {
            runtime.block_on(run_validator(settings, state_dir, once, max_rounds))
        }
    }
}

async fn run_validator(
    settings: &ValidatorSettings,
    state_dir: &Path,
    once: bool,
    max_rounds: Option<u64>,
) -> Result<()> {
    let validator = open_validator(settings, state_dir).await?;
    let mut rng = StdRng::from_entropy();
    if once {
        let report = validator.run_round(&mut rng).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    tokio::select! {
        finished = validator.run_loop(&mut rng, max_rounds) => {
            let rounds = finished?;
            info!(rounds, "validator loop finished");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("listen for shutdown signal")?;
            warn!("shutdown requested, stopping validator");
        }
    }
    Ok(())
}

fn handle_ledger(cmd: LedgerCommand, settings: &ValidatorSettings) -> Result<()> {
    let ledger = open_task_ledger(settings);
    match cmd.action {
        LedgerAction::Init => {
            init_storage(settings)?;
            println!("ledger and archive schema initialized");
        }
        LedgerAction::Windows => {
            println!("{}", serde_json::to_string_pretty(&ledger.windows()?)?);
        }
        LedgerAction::NextWindow => {
            let window = ledger.next_time_window()?;
            println!("{}", serde_json::to_string(&window)?);
        }
        LedgerAction::CompleteWindow(args) => {
            let changed = ledger.mark_window_complete(args.start, args.end)?;
            println!("window {} completed={changed}", args.window());
        }
        LedgerAction::Pairs(args) => {
            let pairs = ledger.token_pairs(&args.window())?;
            println!("{}", serde_json::to_string_pretty(&pairs)?);
        }
        LedgerAction::AddPair { window, pair } => {
            let inserted = ledger.ensure_token_pairs(&window.window(), &[pair.pair()])?;
            println!("inserted {inserted} pair(s) into {}", window.window());
        }
        LedgerAction::CompletePair { window, pair } => {
            let changed = ledger.mark_token_pair_complete(
                &window.window(),
                &pair.token_a,
                &pair.token_b,
                pair.fee,
            )?;
            if !changed {
                return Err(anyhow!("pair {} not found in {}", pair.pair(), window.window()));
            }
            println!("pair {} completed", pair.pair());
        }
    }
    Ok(())
}

fn handle_archive(cmd: ArchiveCommand, settings: &ValidatorSettings) -> Result<()> {
    let archive = open_result_archive(settings);
    match cmd.action {
        ArchiveAction::Count { pair, kind } => {
            let count = archive.count_events(&pair.pair(), kind)?;
            println!(
                "{}",
                serde_json::to_string(&serde_json::json!({
                    "pool": pair.pair().to_string(),
                    "kind": kind.map(|k| k.as_str()),
                    "events": count,
                }))?
            );
        }
    }
    Ok(())
}

fn handle_identity(cmd: IdentityCommand, state_dir: &Path) -> Result<()> {
    match cmd.action {
        IdentityAction::Show => {
            let seed_file = identity_seed_path(state_dir);
            let identity = load_or_create_identity(&seed_file)?;
            println!(
                "{}",
                serde_json::to_string(&serde_json::json!({
                    "identity_key": identity.identity_key(),
                    "seed_file": seed_file.display().to_string(),
                }))?
            );
        }
    }
    Ok(())
}
