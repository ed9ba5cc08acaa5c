//! Client for the rowing logbook results API: paginated fetch with OAuth2
//! bearer-token recovery, credential persistence and on-disk page storage.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub mod config;
pub mod credentials;
pub mod http_client;
pub mod pagination;
pub mod store;
pub mod utils;

pub use credentials::{TokenManager, TokenPair};
pub use pagination::{FetchIncomplete, FetchSummary, PageWalker, fetch_all};

#[derive(Debug, Error)]
pub enum LogbookError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("credentials missing: {0}")]
    CredentialMissing(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("cancelled")]
    Cancelled,
}

/// One logged activity. `id`, `date`, `distance` and `calories_total` are
/// read explicitly; every other provider field is carried through in `extra`.
///
/// Decoding never fails on a single bad field: an odd `id`/`date` is kept as
/// its JSON text and a non-numeric amount becomes NaN, so the record can be
/// counted as malformed later instead of sinking the whole page.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Record {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub date: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_number",
        serialize_with = "serialize_number"
    )]
    pub distance: f64,
    #[serde(
        default,
        deserialize_with = "deserialize_number",
        serialize_with = "serialize_number"
    )]
    pub calories_total: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// False when `distance` or `calories_total` arrived as something other
    /// than a number.
    pub fn has_valid_amounts(&self) -> bool {
        self.distance.is_finite() && self.calories_total.is_finite()
    }
}

/// One fetched response unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub number: u32,
    pub records: Vec<Record>,
    pub next_link: Option<String>,
}

/// Outcome of a single authenticated page request that the pagination loop
/// can act on. Transport and other failures are returned as `Err`.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchResult {
    Success {
        records: Vec<Record>,
        next_link: Option<String>,
    },
    AuthExpired,
}

fn deserialize_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

// The provider occasionally sends numeric fields as strings or null.
// Anything that is not a number decodes as NaN.
fn deserialize_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => 0.0,
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => 0.0,
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        Some(_) => f64::NAN,
    })
}

// JSON has no NaN; write it as a string that decodes back to NaN.
fn serialize_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_str("NaN")
    }
}

/// Issues one authenticated GET for a results page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        access_token: &SecretString,
    ) -> Result<FetchResult, LogbookError>;
}

/// Holder of the current access token. Only `refresh` mutates it, and callers
/// must re-read `access_token` after every successful refresh.
#[async_trait]
pub trait TokenSource: Send {
    fn access_token(&self) -> SecretString;
    async fn refresh(&mut self) -> Result<(), LogbookError>;
}

/// Durable per-page record persistence.
#[async_trait]
pub trait RecordStore: Send {
    /// Persist one page's records. Called once per successful page, in page order.
    async fn append(&mut self, page_number: u32, records: &[Record]) -> Result<(), LogbookError>;
    /// Load every persisted record, in page order.
    async fn load_all(&self) -> Result<Vec<Record>, LogbookError>;
}
