use std::process::ExitCode;

use anyhow::Context;
use logbook_report::{ReportConfig, logging, run};
use tokio::sync::watch;

/// Exit status when reports were written from an incomplete fetch.
const EXIT_PARTIAL: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Values from a local .env file; real environment variables win.
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let log_env = logging::init();
    tracing::info!(%log_env, dotenv_loaded, "logbook_report: log filter");

    let config = ReportConfig::from_env().context("invalid configuration; aborting startup")?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping before the next page");
            let _ = cancel_tx.send(true);
        }
    });

    let today = chrono::Local::now().date_naive();
    match run(&config, today, cancel_rx).await {
        Ok(summary) => {
            for path in &summary.outcome.outputs {
                tracing::info!(path = %path.display(), "output written");
            }
            if let Some(incomplete) = &summary.incomplete {
                tracing::warn!(
                    pages = incomplete.pages_completed,
                    "report written from an incomplete fetch: {}",
                    incomplete.source
                );
                return Ok(ExitCode::from(EXIT_PARTIAL));
            }
            tracing::info!(
                weeks = summary.outcome.report.weeks.len(),
                records = summary.outcome.records,
                "logbook_report: done"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            match e.pages_completed() {
                Some(pages) => {
                    tracing::error!(pages_completed = pages, "run failed after partial fetch: {e}")
                }
                None => tracing::error!("run failed: {e}"),
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
