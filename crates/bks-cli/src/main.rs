use anyhow::{Context, Result};
use bks_config::{
    load_layered_yaml, report_unused_keys, LoadedConfig, SourceConfig, SyncConfig, UnusedKeyPolicy,
};
use bks_journal::{verify_hash_chain, JournalWriter, VerifyResult};
use bks_providers::JsonFileProvider;
use bks_runtime::{SideHandle, StatusPrinter, SyncHandle, SyncOrchestrator, SyncSettings};
use bks_store::{FileSnapshotStore, SnapshotStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "bks")]
#[command(about = "bricksync: keep two inventory providers' quantities in step", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> local overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Fetch both sides and print the actions a cycle would take. Writes nothing.
    Plan {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Run exactly one sync cycle.
    SyncOnce {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Run cycles every interval until Ctrl-C.
    Run {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Snapshot file utilities
    Snapshot {
        #[command(subcommand)]
        cmd: SnapshotCmd,
    },

    /// Cycle journal utilities
    Journal {
        #[command(subcommand)]
        cmd: JournalCmd,
    },
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// Layered config paths in merge order
    #[arg(long = "config", required = true)]
    config_paths: Vec<String>,

    /// Fail instead of warning when the config has keys nothing reads.
    #[arg(long, default_value_t = false)]
    strict_config: bool,
}

#[derive(Subcommand)]
enum SnapshotCmd {
    /// Print every entry of a snapshot file as key=quantity.
    Show {
        #[arg(long)]
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum JournalCmd {
    /// Verify the hash chain of a cycle journal.
    Verify {
        #[arg(long)]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
            let loaded = load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Plan { config } => {
            let (loaded, cfg) = load_sync_config(&config)?;
            let orch = build_orchestrator(&cfg, false)?;
            let plan = orch.plan().await?;

            println!("config_hash={}", loaded.config_hash);
            println!("strategy={}", cfg.strategy);
            println!("actions={}", plan.outcome.actions.len());
            println!("requires_create={}", plan.outcome.summary.requires_create);
            println!("conflicts={}", plan.outcome.summary.conflicts);
            print!("{}", plan.render_status());
        }

        Commands::SyncOnce { config } => {
            let (loaded, cfg) = load_sync_config(&config)?;
            let orch = build_orchestrator(&cfg, true)?;
            orch.preflight()?;
            let report = orch.run_cycle().await?;
            let counts = report.execution.counts();

            println!("config_hash={}", loaded.config_hash);
            println!("cycle_id={}", report.cycle_id);
            println!("actions={}", report.outcome.actions.len());
            println!("applied={}", counts.applied);
            println!("failed={}", counts.failed);
            println!("skipped_needs_create={}", counts.skipped_needs_create);
            println!("snapshot_entries={}", report.outcome.snapshot.len());
            for r in report.execution.failures() {
                println!("failed_action={} outcome={:?}", r.action, r.outcome);
            }
        }

        Commands::Run { config } => {
            let (loaded, cfg) = load_sync_config(&config)?;
            let orch = build_orchestrator(&cfg, true)?.with_observer(Arc::new(StatusPrinter));
            info!(config_hash = %loaded.config_hash, "starting sync loop");

            let handle = SyncHandle::new();
            let stopper = handle.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("ctrl-c received; stopping after the current cycle");
                    stopper.stop();
                }
            });

            let summary = orch.run(handle).await?;
            println!("cycles_ok={}", summary.cycles_ok);
            println!("cycles_failed={}", summary.cycles_failed);
        }

        Commands::Snapshot { cmd } => match cmd {
            SnapshotCmd::Show { path } => {
                let store = FileSnapshotStore::new(&path);
                let snapshot = store.load()?;
                println!("path={}", path.display());
                println!("entries={}", snapshot.len());
                for (key, qty) in snapshot.iter() {
                    println!("{}={}", key.to_storage_key(), qty);
                }
            }
        },

        Commands::Journal { cmd } => match cmd {
            JournalCmd::Verify { path } => match verify_hash_chain(&path)? {
                VerifyResult::Valid { lines } => {
                    println!("journal_valid=true lines={}", lines);
                }
                VerifyResult::Broken { line, reason } => {
                    println!("journal_valid=false line={}", line);
                    anyhow::bail!("JOURNAL_CHAIN_BROKEN line={}: {}", line, reason);
                }
            },
        },
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn load_sync_config(args: &ConfigArgs) -> Result<(LoadedConfig, SyncConfig)> {
    let path_refs: Vec<&str> = args.config_paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&path_refs)?;

    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(&loaded.config_json, policy)?;
    if !report.is_clean() {
        warn!(
            unused = ?report.unused_leaf_pointers,
            "config has keys nothing reads"
        );
    }

    let cfg = SyncConfig::from_config_json(&loaded.config_json)
        .context("invalid sync config")?;
    Ok((loaded, cfg))
}

fn file_side(src: &SourceConfig) -> SideHandle {
    SideHandle::new(Arc::new(JsonFileProvider::new(
        src.name.clone(),
        src.file.clone(),
        src.format,
    )))
}

fn build_orchestrator(cfg: &SyncConfig, with_journal: bool) -> Result<SyncOrchestrator> {
    let store: Arc<dyn SnapshotStore> = Arc::new(FileSnapshotStore::new(&cfg.snapshot_path));
    let mut orch = SyncOrchestrator::new(
        file_side(&cfg.side_a),
        file_side(&cfg.side_b),
        store,
        SyncSettings::from(cfg),
    );

    if with_journal {
        if let Some(j) = &cfg.journal {
            let writer = JournalWriter::open(&j.path, j.hash_chain)
                .with_context(|| format!("open journal {}", j.path.display()))?;
            orch = orch.with_journal(writer);
        }
    }
    Ok(orch)
}
