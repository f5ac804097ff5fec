use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use lireg_core::config_file;
use lireg_core::{PdfBackend, Pipeline, PipelineEvent, ReportJson, find_mc_numbers, join_pages};
use lireg_pdf_mupdf::MupdfBackend;

mod output;

use output::ColorMode;

/// FMCSA L&I register tool: find newly listed MC numbers and enrich them with
/// carrier registration details
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the register for a date and look up every MC number in it
    Run {
        /// Register date as YYYYMMDD
        date: String,

        /// Print the JSON report instead of the human-readable one
        #[arg(long)]
        json: bool,

        /// Path to output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Timeout for the USDOT lookup, in seconds
        #[arg(long)]
        lookup_timeout: Option<u64>,

        /// Timeout for the registration page, in seconds
        #[arg(long)]
        detail_timeout: Option<u64>,

        /// Timeout for the register download, in seconds (default: none)
        #[arg(long)]
        document_timeout: Option<u64>,

        /// Delay before each registration page fetch, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// List the MC numbers in a local register PDF (no network)
    Scan {
        /// Path to the register PDF
        file_path: PathBuf,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            date,
            json,
            output,
            no_color,
            lookup_timeout,
            detail_timeout,
            document_timeout,
            delay_ms,
        } => {
            // CLI flags > env vars > config file > defaults
            let file = config_file::load_config();
            let mut config = config_file::resolve_config(&file);
            if let Some(secs) = lookup_timeout {
                config.lookup_timeout_secs = secs;
            }
            if let Some(secs) = detail_timeout {
                config.detail_timeout_secs = secs;
            }
            if let Some(secs) = document_timeout {
                config.document_timeout_secs = Some(secs);
            }
            if let Some(ms) = delay_ms {
                config.detail_delay_ms = ms;
            }

            run(date, config, json, output, no_color).await
        }
        Command::Scan {
            file_path,
            no_color,
        } => scan(file_path, no_color).await,
    }
}

async fn run(
    date: String,
    config: lireg_core::Config,
    json: bool,
    output: Option<PathBuf>,
    no_color: bool,
) -> anyhow::Result<()> {
    let color = ColorMode(!no_color && !json && output.is_none());

    let mut writer: Box<dyn Write> = if let Some(ref output_path) = output {
        Box::new(std::fs::File::create(output_path)?)
    } else {
        Box::new(std::io::stdout())
    };

    tracing::debug!(?config, "pipeline configuration");
    let pipeline = Pipeline::live(config, Arc::new(MupdfBackend::new()));

    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap());
    bar.set_message(format!("Fetching register {date}..."));
    bar.enable_steady_tick(Duration::from_millis(120));

    let progress_cb = {
        let bar = bar.clone();
        move |event: PipelineEvent| update_progress(&bar, event)
    };

    let result = pipeline.run(&date, &progress_cb).await;
    bar.finish_and_clear();
    let result = result?;

    if json {
        serde_json::to_writer_pretty(&mut writer, &ReportJson::from(&result))?;
        writeln!(writer)?;
    } else {
        output::print_report(&mut writer, &result, color)?;
        output::print_summary(&mut writer, &result, color)?;
    }

    Ok(())
}

fn update_progress(bar: &ProgressBar, event: PipelineEvent) {
    match event {
        PipelineEvent::DocumentFetched { bytes, .. } => {
            bar.set_message(format!(
                "Extracting text ({})...",
                indicatif::HumanBytes(bytes as u64)
            ));
        }
        PipelineEvent::TextExtracted { pages, .. } => {
            bar.set_message(format!("Scanning {pages} pages..."));
        }
        PipelineEvent::IdentifiersFound { total } => {
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {msg} [{bar:40.green/dim}] {pos}/{len} (eta {eta})",
                )
                .unwrap()
                .progress_chars("=> "),
            );
            bar.set_length(total as u64);
            bar.set_position(0);
        }
        PipelineEvent::Resolving { mc, .. } => {
            bar.set_message(format!("Resolving {mc}"));
        }
        PipelineEvent::Pacing { wait, .. } => {
            if !wait.is_zero() {
                bar.set_message(format!("Waiting {:.1}s", wait.as_secs_f32()));
            }
        }
        PipelineEvent::Completed { outcome, .. } => {
            if let Some(failure) = outcome.failure() {
                bar.println(format!("{}: {}", outcome.mc, failure.message));
            }
            bar.inc(1);
        }
    }
}

async fn scan(file_path: PathBuf, no_color: bool) -> anyhow::Result<()> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }

    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.display().to_string());

    let bytes = std::fs::read(&file_path)?;
    let pages = tokio::task::spawn_blocking(move || MupdfBackend::new().extract_pages(&bytes))
        .await?
        .map_err(|e| anyhow::anyhow!("PDF extraction failed: {}", e))?;
    let text = join_pages(&pages);
    let merged = find_mc_numbers(&text);

    let mut stdout = std::io::stdout();
    output::print_scan(&mut stdout, &file_name, &text, &merged, ColorMode(!no_color))?;
    Ok(())
}
