//! Charge reconciliation CLI
//!
//! Reads a processor CSV and a billing CSV, reconciles them and writes one
//! comparison per line to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- charges.csv invoices.csv --config recon.toml --stats stats.json > comparisons.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use charge_recon::{ReconConfig, ReconEngine, Result};
use clap::Parser;
use log::info;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "charge-recon", version, about = "Reconcile processor charges against billing invoices")]
struct Args {
    /// Processor charges CSV
    processor: PathBuf,

    /// Billing invoices CSV
    billing: PathBuf,

    /// TOML file with tolerances and selection limits
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,

    /// Write run statistics as JSON to this path
    #[arg(long, value_name = "JSON_PATH")]
    stats: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ReconConfig::from_toml(&fs::read_to_string(path)?)?,
        None => ReconConfig::default(),
    };

    let mut engine = ReconEngine::new(config);
    engine.load_processor_csv(BufReader::new(File::open(&args.processor)?))?;
    engine.load_billing_csv(BufReader::new(File::open(&args.billing)?))?;

    let registry = engine.run();

    let stdout = io::stdout();
    let handle = stdout.lock();
    ReconEngine::write_output(&registry, handle)?;

    if let Some(path) = &args.stats {
        let stats = registry.statistics();
        ReconEngine::write_statistics(&stats, BufWriter::new(File::create(path)?))?;
        info!("Statistics written to {}", path.display());
    }

    Ok(())
}
