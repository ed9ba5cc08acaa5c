//! Sequential page walk with bounded token-refresh recovery.
//!
//! Each page's URL is only known from the previous page's response, so the
//! walk is a single loop handing out pages one at a time. [`PageWalker`] is
//! the state machine; [`fetch_all`] drives it into a [`RecordStore`].

use crate::{FetchResult, LogbookError, Page, PageFetcher, RecordStore, TokenSource};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug)]
enum WalkState {
    /// `refreshed` is set when this request is the retry after a refresh.
    Fetching {
        url: String,
        page: u32,
        refreshed: bool,
    },
    Refreshing {
        url: String,
        page: u32,
    },
    Done,
    Failed,
}

/// Lazy, finite, non-restartable sequence of pages.
///
/// At most one refresh is attempted per expiry event. A second consecutive
/// expiry on the same page, after a successful refresh, fails the walk with
/// `Unauthorized` instead of refreshing again.
///
/// With a cancel flag attached, the flag is checked before every request,
/// including the retry that follows a refresh.
pub struct PageWalker<'a, F: ?Sized, T: ?Sized> {
    fetcher: &'a F,
    tokens: &'a mut T,
    state: WalkState,
    refreshes: u32,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, F, T> PageWalker<'a, F, T>
where
    F: PageFetcher + ?Sized,
    T: TokenSource + ?Sized,
{
    pub fn new(fetcher: &'a F, tokens: &'a mut T, start_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            tokens,
            state: WalkState::Fetching {
                url: start_url.into(),
                page: 1,
                refreshed: false,
            },
            refreshes: 0,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Number of successful token refreshes so far.
    pub fn refreshes(&self) -> u32 {
        self.refreshes
    }

    /// True once the walk reached `Done` or `Failed`.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, WalkState::Done | WalkState::Failed)
    }

    /// Fetch the next page. Returns `None` after the last page or after an
    /// error has been returned once.
    pub async fn next_page(&mut self) -> Option<Result<Page, LogbookError>> {
        loop {
            // Failed until proven otherwise; every error path below leaves it there.
            match std::mem::replace(&mut self.state, WalkState::Failed) {
                WalkState::Done => {
                    self.state = WalkState::Done;
                    return None;
                }
                WalkState::Failed => return None,
                WalkState::Fetching {
                    url,
                    page,
                    refreshed,
                } => {
                    if self.is_cancelled() {
                        warn!(page, retry = refreshed, "fetch cancelled");
                        return Some(Err(LogbookError::Cancelled));
                    }
                    info!(page, %url, "fetching page");
                    let token = self.tokens.access_token();
                    match self.fetcher.fetch(&url, &token).await {
                        Ok(FetchResult::Success { records, next_link }) => {
                            self.state = match &next_link {
                                Some(next) => WalkState::Fetching {
                                    url: next.clone(),
                                    page: page + 1,
                                    refreshed: false,
                                },
                                None => WalkState::Done,
                            };
                            metrics::counter!("logbook_pages_fetched_total").increment(1);
                            debug!(page, records = records.len(), "page fetched");
                            return Some(Ok(Page {
                                number: page,
                                records,
                                next_link,
                            }));
                        }
                        Ok(FetchResult::AuthExpired) if refreshed => {
                            warn!(page, "access token rejected again right after a refresh");
                            return Some(Err(LogbookError::Unauthorized(format!(
                                "access token still rejected after refresh on page {page}"
                            ))));
                        }
                        Ok(FetchResult::AuthExpired) => {
                            warn!(page, "access token expired, refreshing");
                            self.state = WalkState::Refreshing { url, page };
                        }
                        Err(e) => {
                            warn!(page, "page fetch failed: {e}");
                            return Some(Err(e));
                        }
                    }
                }
                WalkState::Refreshing { url, page } => match self.tokens.refresh().await {
                    Ok(()) => {
                        self.refreshes += 1;
                        info!(page, "retrying page with refreshed token");
                        self.state = WalkState::Fetching {
                            url,
                            page,
                            refreshed: true,
                        };
                    }
                    Err(e) => {
                        warn!(page, "token refresh failed: {e}");
                        return Some(Err(match e {
                            LogbookError::Unauthorized(_) => e,
                            other => LogbookError::Unauthorized(format!(
                                "token refresh failed: {other}"
                            )),
                        }));
                    }
                },
            }
        }
    }
}

/// Result of a complete walk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub pages: u32,
    pub records: usize,
    pub refreshes: u32,
}

/// A walk that stopped before the last page. Pages already persisted are
/// kept; `pages_completed == 0` means nothing was retrieved at all.
#[derive(Debug, Error)]
#[error("fetch incomplete after {pages_completed} page(s): {source}")]
pub struct FetchIncomplete {
    pub pages_completed: u32,
    pub records_persisted: usize,
    #[source]
    pub source: LogbookError,
}

impl FetchSummary {
    fn incomplete(&self, source: LogbookError) -> FetchIncomplete {
        FetchIncomplete {
            pages_completed: self.pages,
            records_persisted: self.records,
            source,
        }
    }
}

/// Walk every page from `start_url`, persisting each page's records before
/// asking for the next. `cancel` is checked before every page request and
/// before the retry after a token refresh.
pub async fn fetch_all<F, T, S>(
    fetcher: &F,
    tokens: &mut T,
    store: &mut S,
    start_url: &str,
    cancel: &watch::Receiver<bool>,
) -> Result<FetchSummary, FetchIncomplete>
where
    F: PageFetcher + ?Sized,
    T: TokenSource + ?Sized,
    S: RecordStore + ?Sized,
{
    let mut walker = PageWalker::new(fetcher, tokens, start_url).with_cancel(cancel.clone());
    let mut summary = FetchSummary::default();

    loop {
        let Some(next) = walker.next_page().await else {
            break;
        };
        summary.refreshes = walker.refreshes();
        let page = match next {
            Ok(page) => page,
            Err(e) => return Err(summary.incomplete(e)),
        };
        if let Err(e) = store.append(page.number, &page.records).await {
            return Err(summary.incomplete(e));
        }
        summary.pages += 1;
        summary.records += page.records.len();
    }

    info!(
        pages = summary.pages,
        records = summary.records,
        refreshes = summary.refreshes,
        "all pages fetched"
    );
    Ok(summary)
}
