mod bootstrap;

use std::sync::Arc;

use anyhow::Result;
use tally_core::formatting;
use tally_core::models::CategoryTotals;
use tally_core::settings::Settings;
use tally_runtime::diagnostics::TracingSink;
use tally_runtime::orchestrator::{BatchConfig, BatchOrchestrator, BatchProcessor};
use tally_ui::app::App;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;

    // Log lines must never draw over the TUI.
    let log_file = match (&settings.log_file, settings.is_interactive()) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(bootstrap::default_log_file()),
        (None, false) => None,
    };
    bootstrap::setup_logging(&settings.log_level, log_file.as_deref())?;

    tracing::info!("CSV Tally v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Delimiter: {:?}, Extension: {}, Theme: {}",
        settings.delimiter,
        settings.extension,
        settings.theme
    );

    let config = BatchConfig {
        delimiter: settings.delimiter_byte(),
        extension: settings.extension.clone(),
    };

    if settings.is_interactive() {
        tracing::info!("Starting interactive drop zone...");

        let orchestrator = BatchOrchestrator::new(config, Arc::new(TracingSink));
        let (submitter, rx, handle) = orchestrator.start();

        let app = App::new(&settings.theme, settings.delimiter, settings.extension.clone());

        // Ctrl+C is also caught at the OS level in case the terminal is not
        // in raw mode yet.
        tokio::select! {
            result = app.run(submitter, rx) => {
                handle.abort();
                result?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received; shutting down batch service");
                handle.abort();
            }
        }
    } else {
        let mut processor = BatchProcessor::new(config, Arc::new(TracingSink));
        if let Some(outcome) = processor.process_batch(settings.files.clone()).await {
            tracing::info!(
                files_received = outcome.files_received,
                files_tallied = outcome.files_tallied,
                diagnostics = outcome.diagnostics.len(),
                "batch finished"
            );
            print!("{}", render_output(&outcome.totals, &settings.format)?);
        }
    }

    Ok(())
}

/// Render one-shot results in the requested `--format`.
fn render_output(totals: &CategoryTotals, format: &str) -> Result<String> {
    match format {
        "json" => Ok(format!("{}\n", formatting::render_json(totals)?)),
        _ => Ok(formatting::render_plain(totals)),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
