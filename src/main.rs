//! Command-line entry point: re-register a working catalog against a master
//! astrometric solution and write delta diagnostics plus the corrected
//! catalog.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use ::remaster::catalog::{self, Catalog};
use ::remaster::{remaster, RemasterConfig, DEFAULT_THRESHOLDS};

#[derive(Parser)]
#[command(
    name = "remaster",
    about = "Re-register a star catalog against a master astrometric solution"
)]
struct Cli {
    /// Working catalog to correct (whitespace-delimited: ra dec [aux...]).
    working: PathBuf,

    /// Master (reference) catalog.
    master: PathBuf,

    /// Output file for per-match delta diagnostics.
    delta_output: PathBuf,

    /// Output file for the corrected catalog.
    corrected_output: PathBuf,

    /// Comma-separated chord-distance thresholds, one refinement round each,
    /// strictly decreasing.
    #[arg(long, value_delimiter = ',', num_args = 1.., default_values_t = DEFAULT_THRESHOLDS)]
    thresholds: Vec<f64>,

    /// Minimum matches within the threshold a round needs.
    #[arg(long, default_value_t = 6)]
    min_matches: usize,

    /// Header lines to skip at the top of the master catalog.
    #[arg(long, default_value_t = 0)]
    master_skip_header: usize,

    /// Stop early once the largest applied correction (degrees) drops below
    /// this value.
    #[arg(long)]
    stop_tolerance: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut working = Catalog::from_file(&cli.working, 0)
        .with_context(|| format!("reading working catalog {}", cli.working.display()))?;
    let master = Catalog::from_file(&cli.master, cli.master_skip_header)
        .with_context(|| format!("reading master catalog {}", cli.master.display()))?;

    let config = RemasterConfig {
        thresholds: cli.thresholds,
        min_matches: cli.min_matches,
        stop_tolerance: cli.stop_tolerance,
    };
    let result = remaster(&mut working, &master, &config)?;

    for (i, round) in result.rounds.iter().enumerate() {
        info!(
            "round {i}: threshold {:.2e}, {} matches, max correction {:.3e} deg",
            round.threshold, round.kept, round.max_correction_deg
        );
    }
    info!(
        "writing {} delta rows to {} and {} corrected records to {}",
        result.deltas.len(),
        cli.delta_output.display(),
        working.len(),
        cli.corrected_output.display()
    );

    catalog::write_deltas(&cli.delta_output, &result.deltas)
        .with_context(|| format!("writing {}", cli.delta_output.display()))?;
    catalog::write_corrected(&cli.corrected_output, &working)
        .with_context(|| format!("writing {}", cli.corrected_output.display()))?;

    Ok(())
}
