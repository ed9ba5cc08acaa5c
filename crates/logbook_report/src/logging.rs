use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Log filter from `LOGBOOK_LOG_LEVEL`, falling back to `RUST_LOG`, then `info`.
pub fn log_filter_from<F>(mut get: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    get("LOGBOOK_LOG_LEVEL")
        .or_else(|| get("RUST_LOG"))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Parse `filter`, keeping reqwest/hyper internals quiet; invalid filters fall back to `info`.
pub fn env_filter(filter: &str) -> EnvFilter {
    let combined = format!("{filter},hyper=warn,reqwest=warn");
    EnvFilter::try_new(combined).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the compact stderr subscriber. Returns the filter in effect.
pub fn init() -> String {
    let log_env = log_filter_from(|k| std::env::var(k).ok());
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter(&log_env))
        .init();
    log_env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_variable_takes_priority() {
        let get = |k: &str| match k {
            "LOGBOOK_LOG_LEVEL" => Some("debug".into()),
            "RUST_LOG" => Some("trace".into()),
            _ => None,
        };
        assert_eq!(log_filter_from(get), "debug");
    }

    #[test]
    fn falls_back_to_rust_log_then_info() {
        let get = |k: &str| match k {
            "RUST_LOG" => Some("warn".into()),
            _ => None,
        };
        assert_eq!(log_filter_from(get), "warn");
        assert_eq!(log_filter_from(|_: &str| None), "info");
    }

    #[test]
    fn invalid_filter_falls_back() {
        // Should not panic and create a valid filter
        let filter = env_filter("invalid[[[filter");
        assert!(!format!("{filter:?}").is_empty());
    }
}
