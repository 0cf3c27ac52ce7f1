use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plansyn_adapters::analyze_document;
use plansyn_recon::KeywordTable;

mod config;
mod run;

use config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "plansyn")]
#[command(about = "Norwegian planning-data reconciliation")]
struct Cli {
    /// Path to the source configuration file.
    #[arg(long, default_value = "sources.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect from all enabled sources, reconcile, and write a snapshot.
    Integrate,
    /// Print the analysis report from the most recent snapshot.
    Report,
    /// Reconcile a saved batch file offline and write a snapshot.
    Export { batches: PathBuf },
    /// Analyze one extracted plan-document text file and print the result.
    AnalyzeDoc { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,plansyn=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command.unwrap_or(Commands::Integrate) {
        Commands::Integrate => {
            let summary = run::run_integration(&config).await?;
            println!(
                "integration complete: records={} cross_referenced={} coverage={:.1}% review_queue={} downloads={} snapshot={}",
                summary.total_records,
                summary.cross_reference_count,
                summary.coverage_percent,
                summary.review_queue_len,
                summary.documents_downloaded,
                summary.snapshot_path.display()
            );
        }
        Commands::Report => {
            let path = latest_snapshot(&config.output_dir)?;
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let snapshot: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?;
            let report = &snapshot["data"]["report"];
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        Commands::Export { batches } => {
            let summary = run::export_saved_batches(&config, &batches)?;
            println!(
                "export complete: records={} cross_referenced={} snapshot={}",
                summary.total_records,
                summary.cross_reference_count,
                summary.snapshot_path.display()
            );
        }
        Commands::AnalyzeDoc { path } => {
            let table = KeywordTable::load(&config.keywords)?;
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let analysis = analyze_document(&text, &path.display().to_string(), &table);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
    }

    Ok(())
}

/// Snapshot filenames embed a sortable timestamp, so the lexicographically
/// greatest name is the newest snapshot.
fn latest_snapshot(output_dir: &Path) -> Result<PathBuf> {
    let mut snapshots: Vec<PathBuf> = std::fs::read_dir(output_dir)
        .with_context(|| format!("reading {}", output_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(run::SNAPSHOT_PREFIX) && n.ends_with(".json"))
        })
        .collect();
    snapshots.sort();
    snapshots
        .pop()
        .with_context(|| format!("no snapshots found in {}", output_dir.display()))
}
