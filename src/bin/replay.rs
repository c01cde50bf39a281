//! Replay a recorded JSON-lines report trace through the interpolator and
//! write the emitted reports as JSON lines.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use bezier_interp_lib::filter::InterpolatorConfig;
use bezier_interp_lib::replay::{parse_trace, replay};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "replay")]
#[command(about = "Replay a report trace through the Bezier interpolator")]
struct Cli {
    /// JSON-lines trace of device reports
    trace: PathBuf,
    /// JSON config file (smoothingFactor, tiltSmoothingFactor)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Position smoothing factor, overrides the config file
    #[arg(long)]
    smoothing: Option<f32>,
    /// Tilt smoothing factor, overrides the config file
    #[arg(long = "tilt-smoothing")]
    tilt_smoothing: Option<f32>,
    /// Host evaluation rate in Hz between reports (0 = per report only)
    #[arg(long, default_value_t = 0.0)]
    hz: f64,
    /// Output path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    bezier_interp_lib::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => InterpolatorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => InterpolatorConfig::default(),
    };
    if let Some(value) = cli.smoothing {
        config.set_smoothing_factor(value);
    }
    if let Some(value) = cli.tilt_smoothing {
        config.set_tilt_smoothing_factor(value);
    }

    let file = File::open(&cli.trace)
        .with_context(|| format!("failed to open trace {}", cli.trace.display()))?;
    let reports = parse_trace(BufReader::new(file))?;
    tracing::info!("Loaded {} reports from {}", reports.len(), cli.trace.display());

    let output = replay(&reports, config, cli.hz)?;

    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(sink);
    for report in &output.emitted {
        serde_json::to_writer(&mut writer, report)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    tracing::info!(
        "Emitted {} reports: {}",
        output.emitted.len(),
        serde_json::to_string(&output.diagnostics)?
    );
    Ok(())
}
