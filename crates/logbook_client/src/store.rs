//! Page-per-file JSON record storage.

use crate::{LogbookError, Record, RecordStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Serialize)]
struct PageFileOut<'a> {
    page: u32,
    data: &'a [Record],
}

// Also reads raw provider response bodies, which carry `data` plus `meta`.
#[derive(Deserialize)]
struct PageFileIn {
    #[serde(default)]
    data: Vec<Record>,
}

/// Writes `page{N}.json` files into a directory. The first append of a run
/// clears page files left by earlier runs, since every run re-fetches the
/// full history.
#[derive(Clone, Debug)]
pub struct JsonPageStore {
    dir: PathBuf,
    cleared: bool,
}

impl JsonPageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cleared: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn page_path(&self, page_number: u32) -> PathBuf {
        self.dir.join(format!("page{page_number}.json"))
    }

    async fn page_files(&self) -> Result<Vec<(u32, PathBuf)>, LogbookError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(n) = name.to_str().and_then(page_number_of) {
                files.push((n, entry.path()));
            }
        }
        files.sort_by_key(|(n, _)| *n);
        Ok(files)
    }

    async fn clear_previous_run(&mut self) -> Result<(), LogbookError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let stale = self.page_files().await?;
        if !stale.is_empty() {
            info!(count = stale.len(), dir = %self.dir.display(), "removing page files from previous run");
        }
        for (_, path) in stale {
            tokio::fs::remove_file(&path).await?;
        }
        self.cleared = true;
        Ok(())
    }
}

/// `page12.json` -> 12
fn page_number_of(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("page")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

#[async_trait]
impl RecordStore for JsonPageStore {
    async fn append(&mut self, page_number: u32, records: &[Record]) -> Result<(), LogbookError> {
        if !self.cleared {
            self.clear_previous_run().await?;
        }
        let payload = serde_json::to_vec_pretty(&PageFileOut {
            page: page_number,
            data: records,
        })
        .map_err(|e| LogbookError::Decode(format!("encoding page {page_number}: {e}")))?;
        let path = self.page_path(page_number);
        tokio::fs::write(&path, payload).await?;
        debug!(path = %path.display(), records = records.len(), "page persisted");
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Record>, LogbookError> {
        let mut all = Vec::new();
        for (_, path) in self.page_files().await? {
            let bytes = tokio::fs::read(&path).await?;
            let page: PageFileIn = serde_json::from_slice(&bytes).map_err(|e| {
                LogbookError::Decode(format!("decoding {}: {e}", path.display()))
            })?;
            all.extend(page.data);
        }
        info!(records = all.len(), dir = %self.dir.display(), "records loaded");
        Ok(all)
    }
}
