use std::{fs::File, io::Write, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use summarize_anything::{
    config, logging,
    pipeline::{DisplaySurface, UploadPipeline, UploadedFile},
    rendering::RenderedOutput,
};

#[derive(Parser)]
#[command(
    name = "summarize-file",
    about = "Summarize a local document and print the rendered HTML"
)]
struct Cli {
    /// Document to summarize.
    path: PathBuf,
    /// File name used for format detection (defaults to the path's file name).
    #[arg(long)]
    name: Option<String>,
}

/// Warnings and errors go to stderr, rendered HTML to stdout.
struct TerminalSurface;

impl DisplaySurface for TerminalSurface {
    fn notify(&self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn show_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn replace_output(&self, output: &RenderedOutput) {
        let mut stdout = std::io::stdout().lock();
        if let Err(err) = writeln!(stdout, "{output}") {
            eprintln!("error: failed to write output: {err}");
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Pipeline errors were already shown by the surface.
            tracing::debug!(error = ?err, "summarize-file failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::load_dotenv();
    logging::init_tracing_with(std::io::stderr);
    if let Err(err) = config::init_config() {
        eprintln!("error: {err}");
        return Err(err.into());
    }

    let file_name = cli
        .name
        .clone()
        .or_else(|| {
            cli.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_default();
    let source =
        File::open(&cli.path).with_context(|| format!("failed to open {}", cli.path.display()));
    let upload = match source.and_then(|file| {
        UploadedFile::spool(&file_name, file).context("failed to spool document")
    }) {
        Ok(upload) => upload,
        Err(err) => {
            eprintln!("error: {err:#}");
            return Err(err);
        }
    };

    let pipeline = match UploadPipeline::from_config() {
        Ok(pipeline) => pipeline,
        Err(err) => {
            eprintln!("error: {err}");
            return Err(err.into());
        }
    };

    pipeline.run(upload, &TerminalSurface).await?;
    Ok(())
}
