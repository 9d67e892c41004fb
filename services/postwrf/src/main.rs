//! WRF post-processor.
//!
//! Reads one `wrfout` NetCDF file and writes quantized, time-batched
//! `NNN.json_gz` archives plus a `batch_summary.json` under
//! `<output-dir>/<YYYYMMDD>/`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use forecast_export::config::ENV_CONFIG;
use forecast_export::{ExportConfig, Exporter, VariablePolicy};
use wrf_reader::{GridSource, NetCdfSource};

#[derive(Parser, Debug)]
#[command(name = "postwrf")]
#[command(about = "Convert WRF output into compressed forecast batch archives")]
struct Args {
    /// Path to the wrfout NetCDF file
    file_path: PathBuf,

    /// YAML configuration file [env: POSTWRF_CONFIG]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base directory for the per-date output folders
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Maximum timesteps per archive
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Variables to export (comma separated)
    #[arg(long, value_delimiter = ',')]
    variables: Option<Vec<String>>,

    /// gzip compression level (0-9)
    #[arg(long)]
    compression_level: Option<u32>,

    /// List the dataset's variables and exit
    #[arg(long)]
    list_variables: bool,

    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    dotenv: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    match &args.dotenv {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load environment from {:?}", path))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    init_tracing(&args.log_level, args.json_logs)?;

    let source = NetCdfSource::open(&args.file_path)
        .with_context(|| format!("Failed to open dataset {:?}", args.file_path))?;

    if args.list_variables {
        list_variables(&source);
        return Ok(());
    }

    // After dotenv, so a .env file can name the config file too.
    let config = build_config(&args, |key| std::env::var(key).ok())?;
    info!(
        file = %source.path().display(),
        output_base = %config.output_base.display(),
        batch_size = config.batch_size,
        variables = ?config.variables,
        "Starting WRF export"
    );

    let exporter = Exporter::new(&source, config)?;
    let report = exporter.run()?;

    info!(
        output_dir = %report.output_dir.display(),
        files = report.summary.total_files_created,
        failed = report.summary.failed_batches.len(),
        elapsed_secs = %format!("{:.2}", report.elapsed.as_secs_f64()),
        "Export finished"
    );

    if !report.summary.failed_batches.is_empty() {
        anyhow::bail!(
            "{} of {} batches could not be written",
            report.summary.failed_batches.len(),
            report.summary.total_batches
        );
    }
    Ok(())
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Defaults, then the YAML file, then `POSTWRF_*` variables, then flags.
fn build_config<F>(args: &Args, lookup: F) -> Result<ExportConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = args
        .config
        .clone()
        .or_else(|| lookup(ENV_CONFIG).filter(|v| !v.is_empty()).map(PathBuf::from));
    let mut config = match &config_path {
        Some(path) => ExportConfig::from_yaml_file(path)?,
        None => ExportConfig::default(),
    };
    config.apply_overrides(&lookup);

    if let Some(dir) = &args.output_dir {
        config.output_base = dir.clone();
    }
    if let Some(size) = args.batch_size {
        config.batch_size = size;
    }
    if let Some(variables) = &args.variables {
        config.variables = variables
            .iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
    }
    if let Some(level) = args.compression_level {
        config.compression_level = level;
    }

    config.validate()?;
    Ok(config)
}

fn list_variables(source: &dyn GridSource) {
    let mut names = source.variable_names();
    names.sort();
    for name in names {
        let shape = source.variable_shape(&name).unwrap_or_default();
        let policy = VariablePolicy::lookup(&name);
        if VariablePolicy::is_known(&name) {
            println!(
                "{:<12} {:?}  {} (scale {}, {})",
                name, shape, policy.label, policy.scale, policy.dtype
            );
        } else {
            println!("{:<12} {:?}", name, shape);
        }
    }
}
