use anyhow::{Context, Result};
use brandforge::runner::progress::CancelFlag;
use brandforge::{Brief, PipelineConfig, PipelineRunner, ProgressEvent};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "brandforge", about = "Two-phase brand identity pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Phase 1: generate four directions and their logos from a brief.
    Logos {
        /// Path to the parsed brief (JSON).
        #[arg(long)]
        brief: PathBuf,
    },
    /// Phase 2: generate the full asset kit for a chosen direction.
    Assets {
        /// Option number chosen during review (1-4).
        #[arg(long)]
        option: u8,
        /// Phase-1 run directory containing directions.json.
        #[arg(long)]
        run_dir: PathBuf,
        /// Path to the parsed brief (JSON).
        #[arg(long)]
        brief: PathBuf,
    },
}

fn load_brief(path: &PathBuf) -> Result<Brief> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading brief {}", path.display()))?;
    let brief: Brief = serde_json::from_str(&raw).context("brief is not valid JSON")?;
    Ok(brief)
}

fn print_progress(event: ProgressEvent) {
    match &event.item {
        Some(item) => eprintln!(
            "[{:>6}ms] {:?} {item}: {:?}",
            event.elapsed_ms, event.stage, event.status
        ),
        None => eprintln!("[{:>6}ms] {:?}", event.elapsed_ms, event.stage),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = PipelineConfig::load();
    let runner = PipelineRunner::from_config(config).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let cancel = CancelFlag::new();
    let on_progress = Some(Arc::new(print_progress) as Arc<brandforge::runner::progress::ProgressFn>);

    match cli.command {
        Command::Logos { brief } => {
            let brief = load_brief(&brief)?;
            let result = runner.run_logos_phase(&brief, on_progress, &cancel).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Assets {
            option,
            run_dir,
            brief,
        } => {
            let brief = load_brief(&brief)?;
            let result = runner
                .run_assets_phase(option, &run_dir, &brief, on_progress, &cancel)
                .await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
