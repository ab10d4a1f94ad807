// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde_json::json;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use linkage_lib::matching::manager::{prepare_filings, LinkageEngine};
use linkage_lib::models::records::{CompanyInput, FilingInput};
use linkage_lib::utils::config::LinkageConfig;
use linkage_lib::utils::env::load_env;
use linkage_lib::utils::exclusion_filter::ExclusionConfig;
use linkage_lib::utils::input::read_json_lines;
use linkage_lib::utils::progress_bars::progress_config::ProgressConfig;
use linkage_lib::RunStats;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Company registry, one JSON record per line
    #[arg(long)]
    companies: PathBuf,

    /// Benefit-plan filings, one JSON record per line
    #[arg(long)]
    filings: PathBuf,

    /// Registry identifiers to exclude, one per line
    #[arg(long)]
    exclude: Option<PathBuf>,

    /// Where to write match results (JSON lines); stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,

    /// Worker threads, overriding LINKAGE_WORKER_THREADS
    #[arg(long)]
    threads: Option<usize>,

    /// Where to write the run summary as JSON
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Loaded first so RUST_LOG may come from .env; reported once logging is up.
    let env_load = load_env();
    env_logger::init();
    env_load.log();
    let cli = Cli::parse();
    let start = Instant::now();
    info!("Starting registry linkage run");

    let mut config = LinkageConfig::from_env().context("Failed to load linkage configuration")?;
    if let Some(threads) = cli.threads {
        config.worker_threads = threads;
    }
    config.validate().context("Invalid linkage configuration")?;
    config.log_config();

    let mut exclusion = ExclusionConfig::from_env();
    if let Some(path) = &cli.exclude {
        exclusion = exclusion.with_file(path)?;
    }
    exclusion.log_config();

    let progress_config = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, preparation={}, memory={}",
        progress_config.enabled, progress_config.preparation, progress_config.report_memory
    );
    let multi_progress = progress_config.create_multi_progress();

    let filings = read_json_lines::<FilingInput>(&cli.filings)?;
    let prepared = prepare_filings(
        filings,
        exclusion.identifiers(),
        &config,
        progress_config.preparation_target(multi_progress.as_ref()),
    );
    progress_config.log_memory("filing preparation");

    let engine = LinkageEngine::new(config, prepared)?;
    let companies = read_json_lines::<CompanyInput>(&cli.companies)?;
    let output = engine.run(companies, multi_progress.as_ref());
    progress_config.log_memory("matching");

    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(sink);
    for result in &output.results {
        serde_json::to_writer(&mut writer, result).context("Failed to serialize match result")?;
        writer.write_all(b"\n").context("Failed to write match result")?;
    }
    writer.flush().context("Failed to flush match results")?;

    if let Some(path) = &cli.summary {
        let summary = json!({
            "run_id": output.run_id,
            "started_at": output.started_at,
            "filing_signature": output.filing_signature,
            "avg_composite_score": RunStats::avg_composite_score(&output.results),
            "stats": output.stats,
        });
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &summary)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    }

    info!(
        "Registry linkage finished in {:.2?}: {} matches written",
        start.elapsed(),
        output.results.len()
    );
    Ok(())
}
