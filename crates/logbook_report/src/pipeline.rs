//! One full run: fetch every page, aggregate, write both tables.

use crate::aggregate::{WeeklyReport, aggregate};
use crate::config::ReportConfig;
use crate::error::ReportResult;
use crate::report::{CsvReportSink, RECORDS_FILE, ReportSink, WEEKLY_FILE, records_table, weekly_table};
use chrono::{NaiveDate, Weekday};
use logbook_client::credentials::{FileCredentialStore, OAuthClient};
use logbook_client::http_client::ReqwestLogbookClient;
use logbook_client::store::JsonPageStore;
use logbook_client::{FetchIncomplete, FetchSummary, RecordStore, TokenManager, fetch_all};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{info, warn};

/// Outcome of [`write_reports`].
#[derive(Debug)]
pub struct ReportOutcome {
    pub records: usize,
    pub report: WeeklyReport,
    pub outputs: Vec<PathBuf>,
}

/// Outcome of a complete [`run`].
#[derive(Debug)]
pub struct RunSummary {
    /// Set when every page was fetched.
    pub fetch: Option<FetchSummary>,
    /// Set when the fetch stopped early and partial output was allowed.
    pub incomplete: Option<FetchIncomplete>,
    pub outcome: ReportOutcome,
}

impl RunSummary {
    pub fn is_partial(&self) -> bool {
        self.incomplete.is_some()
    }
}

/// Load every stored record, aggregate by week, and write the raw and
/// weekly tables through `sink`.
pub async fn write_reports<S, K>(
    store: &S,
    sink: &K,
    anchor: Weekday,
    now: NaiveDate,
) -> ReportResult<ReportOutcome>
where
    S: RecordStore + Sync + ?Sized,
    K: ReportSink + ?Sized,
{
    let records = store.load_all().await?;
    let report = aggregate(&records, anchor, now);
    if report.excluded > 0 {
        warn!(
            excluded = report.excluded,
            "records with malformed dates were left out of the weekly report"
        );
    }

    let raw = sink.write_table(&records_table(&records), RECORDS_FILE).await?;
    let weekly = sink
        .write_table(&weekly_table(&report.weeks, anchor), WEEKLY_FILE)
        .await?;
    info!(
        records = records.len(),
        weeks = report.weeks.len(),
        excluded = report.excluded,
        "reports written"
    );

    Ok(ReportOutcome {
        records: records.len(),
        report,
        outputs: vec![raw, weekly],
    })
}

/// Fetch the full history, then aggregate and write reports.
///
/// An incomplete fetch fails the run, unless `allow_partial` is set and at
/// least one page from this run was persisted; the summary then carries the
/// [`FetchIncomplete`] so callers can tell the report is short.
pub async fn run(
    config: &ReportConfig,
    now: NaiveDate,
    cancel: watch::Receiver<bool>,
) -> ReportResult<RunSummary> {
    let endpoint = OAuthClient::from_config(&config.logbook)?;
    let credentials = FileCredentialStore::new(&config.logbook.credentials_path);
    let mut tokens =
        TokenManager::bootstrap(credentials, endpoint, config.logbook.auth_code.as_ref()).await?;

    let fetcher = ReqwestLogbookClient::from_config(&config.logbook)?;
    let mut store = JsonPageStore::new(&config.pages_dir);
    let start_url = config.logbook.start_url();
    info!(%start_url, pages_dir = %config.pages_dir.display(), "fetching logbook results");

    let (fetch, incomplete) =
        match fetch_all(&fetcher, &mut tokens, &mut store, &start_url, &cancel).await {
            Ok(summary) => (Some(summary), None),
            Err(incomplete) if config.allow_partial && incomplete.pages_completed > 0 => {
                warn!(
                    pages = incomplete.pages_completed,
                    "fetch incomplete, reporting on partial data: {}", incomplete.source
                );
                (None, Some(incomplete))
            }
            Err(incomplete) => return Err(incomplete.into()),
        };

    let sink = CsvReportSink::new(&config.output_dir);
    let outcome = write_reports(&store, &sink, config.week_start, now).await?;

    Ok(RunSummary {
        fetch,
        incomplete,
        outcome,
    })
}
