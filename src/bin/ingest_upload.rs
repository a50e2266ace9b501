//! Terminal client: upload files to an ingest server and show the results.

use clap::Parser;
use doc_ingest::config::{ClientConfig, DEFAULT_MAX_FILES};
use doc_ingest::render::{render_banner, render_record, render_selected, render_summary, ViewMode};
use doc_ingest::{SelectedFile, StateHandle, UploadClient};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ingest-upload", about = "Upload documents for AI extraction")]
struct Cli {
    /// Files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Upload endpoint
    #[arg(long, env = "ENDPOINT_URL", default_value = "http://localhost:3000/upload")]
    endpoint: String,

    /// Extraction prompt to use instead of a generated one
    #[arg(long)]
    prompt: Option<String>,

    /// Maximum files per upload
    #[arg(long, default_value_t = DEFAULT_MAX_FILES)]
    max_files: usize,

    /// How to show extracted data
    #[arg(long, value_enum, default_value_t = ViewMode::Json)]
    view: ViewMode,

    /// Show this file's result instead of the first one with data
    #[arg(long, value_name = "FILE")]
    select: Option<String>,

    /// Show every result, not only the selected one
    #[arg(long, conflicts_with = "select")]
    all: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut files = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        match SelectedFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let state = StateHandle::new();
    let client = UploadClient::new(
        ClientConfig::with_max_files(cli.endpoint, cli.max_files),
        state.clone(),
    );
    let result = client.upload(files, cli.prompt.as_deref()).await;

    if let Some(file_name) = cli.select.as_deref() {
        state.update(|s| s.select_file(file_name));
    }

    let snapshot = state.snapshot();
    if let Some(banner) = &snapshot.banner {
        eprintln!("{}", render_banner(banner));
    }
    eprint!("{}", render_summary(&snapshot));
    if cli.all {
        for record in &snapshot.records {
            println!("{}", render_record(record, cli.view));
        }
    } else {
        print!("{}", render_selected(&snapshot, cli.view));
    }

    match result {
        Ok(()) if snapshot.records.iter().all(|r| r.error().is_none()) => ExitCode::SUCCESS,
        Ok(()) => ExitCode::from(2),
        Err(_) => ExitCode::FAILURE,
    }
}
