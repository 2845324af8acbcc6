use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use client_core::{http_controller, load_settings, WorkflowController, WorkflowError};
use shared::domain::WorkflowStatus;
use tracing_subscriber::EnvFilter;

mod consent;
mod media;

/// Time given to the teardown cleanup signal before the process exits on
/// Ctrl-C. Delivery is still not confirmed.
const INTERRUPT_GRACE: Duration = Duration::from_millis(300);

#[derive(Parser, Debug)]
#[command(about = "Submit an image or video for deepfake analysis")]
struct Args {
    /// Image or video to analyze.
    file: PathBuf,
    /// Analysis service base URL; overrides analyzer.toml and the environment.
    #[arg(long)]
    api_base_url: Option<String>,
    /// Analyze every Nth video frame; 0 lets the server decide.
    #[arg(long)]
    sample_every: Option<u32>,
    /// Where to write the model output; defaults to deepfake_output.<ext>.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Use this MIME type instead of guessing from the file extension.
    #[arg(long)]
    mime_type: Option<String>,
    /// Record that the disclaimer was read so it is not shown again.
    #[arg(long)]
    accept_disclaimer: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    consent::show_disclaimer_if_needed(consent::consent_path().as_deref(), args.accept_disclaimer);

    let mut settings = load_settings();
    if let Some(base_url) = &args.api_base_url {
        settings = settings.with_base_url(base_url);
    }
    if let Some(sample_every) = args.sample_every {
        settings = settings.with_sample_every(sample_every);
    }

    let controller = http_controller(&settings).context("failed to build analysis client")?;
    let outcome = run(&controller, &args, &settings.api_base_url).await;
    controller.teardown();
    outcome
}

async fn run(controller: &WorkflowController, args: &Args, api_base_url: &str) -> Result<()> {
    let file = media::load_selected_file(&args.file, args.mime_type.as_deref()).await?;
    if controller.select(Some(file))? != WorkflowStatus::Ready {
        let snapshot = controller.snapshot();
        return Err(anyhow!(snapshot
            .error
            .unwrap_or_else(|| "Invalid selection.".to_string())));
    }

    let snapshot = controller.snapshot();
    if let Some(file) = &snapshot.file {
        println!("Selected: {} ({:.2} MB)", file.name, file.size_mb());
    }
    println!("API: {api_base_url}");
    println!("Analyzing...");

    let submitted = tokio::select! {
        outcome = controller.submit() => outcome,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted; releasing resources");
            controller.teardown();
            tokio::time::sleep(INTERRUPT_GRACE).await;
            return Err(anyhow!("analysis interrupted"));
        }
    };

    let job = match submitted {
        Ok(job) => job,
        Err(err) => return Err(anyhow!(failure_message(controller, &err))),
    };

    if let Some(label) = job.display_label() {
        let marker = if job.is_fake() { "!!" } else { "ok" };
        println!("[{marker}] {label}");
    }
    if let Some(confidence) = job.confidence {
        println!("Confidence: {:.1}%", confidence * 100.0);
    }
    if let Some(frames) = job.frames_processed {
        println!("Frames processed: {frames}");
    }

    let result = controller
        .snapshot()
        .result
        .context("analysis succeeded without a result handle")?;
    let blob = controller
        .resolve(&result.url)
        .context("result handle was released before export")?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| media::default_output_path(result.media_kind()));
    tokio::fs::write(&output, &blob.bytes)
        .await
        .with_context(|| format!("failed to write model output to '{}'", output.display()))?;
    println!("Model output saved to {}", output.display());

    Ok(())
}

fn failure_message(controller: &WorkflowController, err: &WorkflowError) -> String {
    controller
        .snapshot()
        .error
        .unwrap_or_else(|| err.user_message())
}
