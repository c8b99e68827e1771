mod aggregate;
mod collectors;
mod config;
mod engine;
mod error;
mod models;
mod util;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use collectors::{file::FileSource, knife::KnifeSource, InventorySource};
use config::Config;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hvreport", about = "KVM hypervisor utilization report", version = "0.1")]
struct Cli {
    /// Role to search for, or a full search query (e.g. "virtualization_system:kvm")
    role: Option<String>,

    /// Read node records from a JSON file or directory instead of querying the registry
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Print reports as JSON and exit
    #[arg(long)]
    json: bool,

    /// Exit with status 1 if any host was skipped
    #[arg(long)]
    strict: bool,

    /// Worker threads for per-host processing (0 = one per CPU)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Hide the probe's own guest_*_total figures
    #[arg(long)]
    no_probe_totals: bool,

    /// Print config file path and current values, then exit
    #[arg(long)]
    config: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<clap_complete::Shell>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "hvreport", &mut io::stdout());
        return Ok(());
    }

    let cfg = Config::load();
    if cli.config {
        return run_print_config(&cfg);
    }

    let source = build_source(&cli, &cfg);
    let nodes = source.fetch()?;
    tracing::info!(source = %source.describe(), nodes = nodes.len(), "fetched node records");

    let workers = cli.workers.unwrap_or(cfg.general.workers);
    let outcome = engine::process(&nodes, workers);

    if cli.json {
        run_json_snapshot(&outcome, &source.describe())?;
    } else {
        let opts = util::report::RenderOptions {
            source:            source.describe(),
            show_probe_totals: cfg.report.show_probe_totals && !cli.no_probe_totals,
        };
        print!("{}", util::report::generate(&outcome, &opts, chrono::Utc::now()));
    }

    if (cli.strict || cfg.general.strict) && !outcome.skipped.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn build_source(cli: &Cli, cfg: &Config) -> Box<dyn InventorySource> {
    if let Some(path) = &cli.file {
        return Box::new(FileSource::new(path));
    }
    let inv = &cfg.inventory;
    let role = cli.role.as_deref().unwrap_or(&inv.default_role);
    Box::new(KnifeSource::new(
        inv.knife_bin.as_str(),
        inv.knife_args.clone(),
        role,
        Duration::from_secs(inv.timeout_secs),
    ))
}

fn json_snapshot(outcome: &engine::Outcome, source: &str) -> serde_json::Value {
    serde_json::json!({
        "hvreport_version": "0.1",
        "timestamp": chrono::Local::now().to_rfc3339(),
        "source":    source,
        "reports":   outcome.reports,
        "skipped":   outcome.skipped,
    })
}

fn run_json_snapshot(outcome: &engine::Outcome, source: &str) -> Result<()> {
    let snapshot = json_snapshot(outcome, source);
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn run_print_config(cfg: &Config) -> Result<()> {
    let path = Config::config_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    println!("Config: {}", path);
    println!();
    println!("[general]");
    println!("  workers = {}", cfg.general.workers);
    println!("  strict  = {}", cfg.general.strict);
    println!();
    println!("[inventory]");
    println!("  knife_bin    = {}", cfg.inventory.knife_bin);
    println!("  knife_args   = {:?}", cfg.inventory.knife_args);
    println!("  default_role = {}", cfg.inventory.default_role);
    println!("  timeout_secs = {}", cfg.inventory.timeout_secs);
    println!();
    println!("[report]");
    println!("  show_probe_totals = {}", cfg.report.show_probe_totals);
    Ok(())
}
