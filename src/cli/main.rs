//! Background Removal Workflow CLI
//!
//! Terminal front end for the image workflow. Every input is selected in
//! turn, the removal command runs while a spinner is shown, and completed
//! results are saved as downloads.

use super::config::CliConfigBuilder;
use crate::services::{DroppedFiles, FileSource, TracingObserver};
use crate::tracing_config::{events, init_cli_tracing, spans, TracingFormat};
use crate::utils::MediaTypeValidator;
use crate::{DownloadStatus, FileCandidate, ImageWorkflow, SelectionOutcome, WorkflowError};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn, Instrument};

/// Remove image backgrounds through an external removal command
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-workflow")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Image files, processed in order (use "-" for stdin)
    #[arg(value_name = "INPUT")]
    pub input: Vec<String>,

    /// Treat the inputs as a single drag-and-drop delivery; only the first file is used
    #[arg(long)]
    pub drop: bool,

    /// Media type declared for stdin input [default: detected from the content]
    #[arg(long, value_name = "TYPE")]
    pub media_type: Option<String>,

    /// Command that reads an image on stdin and writes the cut-out to stdout
    #[arg(short = 'c', long, default_value = "imgly-bgremove - -o -")]
    pub remover_command: String,

    /// JSON workflow configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory downloads are saved into [default: the user download directory]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Download file name [default: processed-image.png]
    #[arg(long, value_name = "NAME")]
    pub file_name: Option<String>,

    /// Load each input first and start removal as a separate step
    #[arg(long)]
    pub no_auto_process: bool,

    /// Skip reading image dimensions for previews
    #[arg(long)]
    pub no_dimensions: bool,

    /// Do not save results
    #[arg(long)]
    pub no_download: bool,

    /// Print the workflow snapshot after each input as a JSON line
    #[arg(long)]
    pub json: bool,

    /// Log line format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => TracingFormat::Console,
            CliLogFormat::Compact => TracingFormat::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => TracingFormat::Json,
        }
    }
}

/// One delivery handed to the workflow
#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Path(PathBuf),
    Stdin,
    Drop(DroppedFiles),
}

impl InputSource {
    fn label(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Stdin => "stdin".to_string(),
            Self::Drop(drop) => drop
                .first()
                .map_or_else(|| "empty drop".to_string(), |path| path.display().to_string()),
        }
    }
}

/// How one input ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputOutcome {
    Completed,
    /// Removal failed, or the input could not be read or saved
    Failed,
    Rejected,
    /// The run ended without a result or an error
    Interrupted,
}

#[derive(Debug, Default)]
struct RunSummary {
    completed: usize,
    failed: usize,
    rejected: usize,
    interrupted: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: InputOutcome) {
        match outcome {
            InputOutcome::Completed => self.completed += 1,
            InputOutcome::Failed => self.failed += 1,
            InputOutcome::Rejected => self.rejected += 1,
            InputOutcome::Interrupted => self.interrupted += 1,
        }
    }

    fn unsuccessful(&self) -> usize {
        self.failed + self.rejected + self.interrupted
    }

    fn is_success(&self) -> bool {
        self.unsuccessful() == 0
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id =
        init_cli_tracing(cli.verbose, cli.log_format.into()).context("Failed to initialize tracing")?;

    if cli.input.is_empty() && !cli.drop {
        anyhow::bail!("At least one input is required");
    }

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    let remover = CliConfigBuilder::remover(&cli)?;

    let session = spans::session(&session_id, remover.program());
    let mut builder = ImageWorkflow::builder(Arc::new(remover)).config(config);
    if cli.verbose > 0 {
        builder = builder.observer(Arc::new(TracingObserver));
    }
    let workflow = builder.build().context("Failed to create workflow")?;

    let summary = run_inputs(&cli, &workflow).instrument(session).await?;
    workflow.reset();

    println!(
        "Done: {} completed, {} failed, {} rejected",
        summary.completed, summary.failed, summary.rejected
    );
    if summary.interrupted > 0 {
        println!("{} input(s) ended without a result", summary.interrupted);
    }
    if !summary.is_success() {
        anyhow::bail!("{} input(s) did not complete", summary.unsuccessful());
    }
    Ok(())
}

fn input_sources(cli: &Cli) -> Vec<InputSource> {
    if cli.drop {
        return vec![InputSource::Drop(DroppedFiles::new(&cli.input))];
    }
    cli.input
        .iter()
        .map(|input| {
            if input == "-" {
                InputSource::Stdin
            } else {
                InputSource::Path(PathBuf::from(input))
            }
        })
        .collect()
}

async fn run_inputs(cli: &Cli, workflow: &ImageWorkflow) -> Result<RunSummary> {
    let inputs = input_sources(cli);
    let total = inputs.len();
    let mut summary = RunSummary::default();

    for (index, input) in inputs.iter().enumerate() {
        let label = input.label();
        let started = Instant::now();
        let outcome = match process_input(cli, workflow, input, total > 1)
            .instrument(spans::input(&label, index + 1, total))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                events::error_with_context(e.as_ref(), &label);
                println!("❌ {label}: {e:#}");
                InputOutcome::Failed
            },
        };
        summary.record(outcome);

        if cli.json {
            let snapshot = serde_json::to_string(&workflow.snapshot())
                .context("Failed to serialize workflow snapshot")?;
            println!("{snapshot}");
        }
        events::input_finished(
            &label,
            &workflow.phase().to_string(),
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        );
    }

    Ok(summary)
}

async fn load_candidate(input: &InputSource, media_type: Option<&str>) -> Result<Option<FileCandidate>> {
    match input {
        InputSource::Path(path) => FileSource::from_path(path)
            .await
            .map(Some)
            .with_context(|| format!("Failed to read {}", path.display())),
        InputSource::Stdin => {
            let file = FileSource::from_reader(tokio::io::stdin(), "stdin", media_type.unwrap_or(""))
                .await
                .context("Failed to read stdin")?;
            if media_type.is_some() {
                return Ok(Some(file));
            }
            match MediaTypeValidator::sniff(file.bytes()) {
                Some(detected) => {
                    debug!(media_type = %detected, "Detected stdin media type");
                    Ok(Some(file.with_media_type(detected)))
                },
                None => {
                    warn!("Could not detect an image format on stdin; use --media-type to declare one");
                    Ok(Some(file))
                },
            }
        },
        InputSource::Drop(drop) => FileSource::from_drop(drop)
            .await
            .context("Failed to read dropped file"),
    }
}

async fn process_input(
    cli: &Cli,
    workflow: &ImageWorkflow,
    input: &InputSource,
    name_per_input: bool,
) -> Result<InputOutcome> {
    let label = input.label();
    let candidate = load_candidate(input, cli.media_type.as_deref()).await?;
    let source_name = candidate.as_ref().map(|file| file.name().to_string());

    let pending = match workflow.select_file(candidate) {
        Ok(pending) => pending,
        Err(WorkflowError::InvalidInput(message)) => {
            println!("⚠️  {label}: {message}");
            return Ok(InputOutcome::Rejected);
        },
        Err(e) => return Err(e).context("Failed to select file"),
    };

    let pending = if pending.run().is_none() {
        pending.wait().await;
        println!("📂 {label}: loaded");
        workflow.process().context("Failed to start processing")?
    } else {
        pending
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    spinner.set_message(format!("Removing background from {label}"));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let outcome = pending.wait().await;
    spinner.finish_and_clear();

    match outcome {
        SelectionOutcome::Completed(handle) => {
            println!(
                "✅ {label}: background removed ({} bytes)",
                handle.size_bytes()
            );
            if !cli.no_download {
                save_download(workflow, source_name.as_deref(), name_per_input).await?;
            }
            Ok(InputOutcome::Completed)
        },
        SelectionOutcome::Failed => {
            let message = workflow.snapshot().error.unwrap_or_default();
            println!("❌ {label}: {message}");
            Ok(InputOutcome::Failed)
        },
        // Inputs run one at a time and the workflow outlives the loop, so a
        // run is never superseded or detached here
        other @ (SelectionOutcome::Superseded
        | SelectionOutcome::Detached
        | SelectionOutcome::Loaded) => {
            warn!(outcome = ?other, phase = %workflow.phase(), "Removal ended without a result");
            Ok(InputOutcome::Interrupted)
        },
    }
}

async fn save_download(
    workflow: &ImageWorkflow,
    source_name: Option<&str>,
    name_per_input: bool,
) -> Result<()> {
    let status = if name_per_input {
        let file_name = download_name_for(source_name, &workflow.config().download_file_name);
        workflow.request_download_as(&file_name).await
    } else {
        workflow.request_download().await
    }
    .context("Failed to save download")?;

    match status {
        DownloadStatus::Saved { location, .. } => println!("💾 Saved {location}"),
        DownloadStatus::NotReady => warn!("Result was replaced before it could be saved"),
    }
    Ok(())
}

/// Download name for one of several inputs: `<source stem>-<configured name>`
fn download_name_for(source_name: Option<&str>, configured: &str) -> String {
    let stem = source_name
        .and_then(|name| Path::new(name).file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty());
    match stem {
        Some(stem) => format!("{stem}-{configured}"),
        None => configured.to_string(),
    }
}
