#![forbid(unsafe_code)]
mod cli;
mod ui_manager;

use std::sync::Arc;

use clap::Parser;
use cli::Cli;
use color_eyre::{eyre, Report};
use netdrop::model::source_file::SourceFile;
use netdrop::services::transport::HttpTransport;
use netdrop::services::upload_tracker::UploadTracker;
use netdrop::settings::app_settings::{Settings, SettingsOverrides};
use netdrop::settings::base_address::BaseAddress;
use netdrop::utils::{initialize_logging, initialize_panic_handler};
use ui_manager::{render_summary, Outcome, UiManager};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    initialize_logging()?;
    initialize_panic_handler()?;
    let args = Cli::parse();

    let settings = Settings::load(SettingsOverrides {
        dev: args.dev,
        origin: args.origin.clone(),
    })?;
    let base = BaseAddress::resolve(&settings)?;
    tracing::info!("Uploading to {}", base);

    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        match SourceFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                eprintln!("Skipping {}: {}", path.display(), e);
            }
        }
    }
    if files.is_empty() {
        return Err(Report::msg("No readable files to upload"));
    }

    let transport = Arc::new(HttpTransport::new(&settings)?);
    let (tracker, state_rx) = UploadTracker::new(base, transport, settings.abort_on_remove);

    let worker = tracker.clone();
    let batch = tokio::spawn(async move { worker.enqueue(files).await });

    let snapshot = match UiManager::new().main_loop(tracker, state_rx, batch).await? {
        Outcome::Finished(snapshot) => snapshot,
        Outcome::Interrupted => {
            eprintln!("Interrupted");
            std::process::exit(libc::EXIT_FAILURE);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot.records)?);
    } else {
        for line in render_summary(&snapshot) {
            println!("{}", line);
        }
    }

    let failed = snapshot.error_count();
    if failed > 0 {
        tracing::error!("{} upload(s) failed", failed);
        std::process::exit(libc::EXIT_FAILURE);
    }
    Ok(())
}
