use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use framebench::logging::{self, LogConfig, LogFormat};
use framebench::scenario::{
    DEFAULT_FRAME_BUDGET, DEFAULT_TIMEOUT_MS, ExecutableLauncher, SuiteReport,
};
use framebench::{BenchConfig, BenchError, SuiteConfig, SuiteRunner, run_benchmark};
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "framebench",
    version,
    about = "Frame-rate benchmark and conformance harness for remote game-rendering servers"
)]
struct Cli {
    /// Log level when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Multi-line colored log output.
    #[arg(long, global = true)]
    pretty: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to one server, collect frames and print a single result line.
    Run(RunArgs),
    /// Run every scenario of a suite file, each in its own process.
    Suite(SuiteArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// Server address, `host:port` or a ws:// URL.
    #[arg(long)]
    target: String,
    /// Server tick rate, for the log.
    #[arg(long)]
    tick_rate: Option<u32>,
    /// Codec the server must announce. Any known codec when omitted.
    #[arg(long)]
    codec_version: Option<String>,
    /// Server scale factor, for the log.
    #[arg(long)]
    scale_factor: Option<f64>,
    /// Frames to collect before stopping.
    #[arg(long, default_value_t = DEFAULT_FRAME_BUDGET)]
    frames: usize,
    /// Give up waiting for frames after this many milliseconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,
}

#[derive(Parser)]
struct SuiteArgs {
    /// YAML suite file.
    file: PathBuf,
    /// Also write a JSON summary of every outcome here.
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    let outcome = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Suite(args) => suite(args).await,
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            if let Some(bench) = e.downcast_ref::<BenchError>() {
                for suggestion in bench.recovery_suggestions() {
                    info!("hint: {suggestion}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = logging::parse_level(&cli.log_level)?;
    let format = if cli.pretty { LogFormat::Pretty } else { LogFormat::Compact };
    logging::init(&LogConfig::new(level).with_format(format))?;
    Ok(())
}

async fn run(args: RunArgs) -> Result<bool> {
    let config = BenchConfig {
        codec_version: args.codec_version,
        frame_budget: args.frames,
        timeout: Duration::from_millis(args.timeout_ms),
        tick_rate: args.tick_rate,
        scale_factor: args.scale_factor,
        ..BenchConfig::new(args.target)
    };

    let result = run_benchmark(&config)
        .await
        .with_context(|| format!("benchmark against {}", config.target))?;
    println!("{}", result.to_marker_line()?);
    Ok(true)
}

async fn suite(args: SuiteArgs) -> Result<bool> {
    let config = SuiteConfig::load(&args.file)
        .with_context(|| format!("load suite {}", args.file.display()))?;
    config.validate()?;
    let launcher = ExecutableLauncher::current_exe()?;

    let report = SuiteRunner::new(config, Arc::new(launcher)).run().await;
    println!("{report}");

    if let Some(path) = &args.summary_json {
        write_summary_json(path, &report)?;
        info!(path = %path.display(), "Wrote summary");
    }
    Ok(report.all_passed())
}

fn write_summary_json(path: &Path, report: &SuiteReport) -> Result<()> {
    let contents = serde_json::to_string_pretty(&report.summary()).context("serialize summary")?;
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
