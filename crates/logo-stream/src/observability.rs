use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_LOG_FILE: &str = "logo-spark.logs.jsonl";

/// Where log records go.
#[derive(Debug, PartialEq, Eq)]
enum LogSink {
    Off,
    Stderr,
    /// JSONL records appended to `dir/file`.
    JsonFile { dir: PathBuf, file: String },
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn resolve_sink(enabled: Option<&str>, json_path: Option<&str>) -> LogSink {
    if enabled.and_then(parse_flag) == Some(false) {
        return LogSink::Off;
    }
    let Some(raw) = json_path.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return LogSink::Stderr;
    };
    let path = Path::new(raw);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    LogSink::JsonFile { dir, file }
}

fn resolve_filter() -> EnvFilter {
    if let Ok(level) = std::env::var("LOGO_SPARK_LOG_LEVEL")
        && let Ok(filter) = EnvFilter::try_new(level)
    {
        return filter;
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `LOGO_SPARK_OBSERVABILITY`: `off`/`false`/`0` disables logging (default on).
/// - `LOGO_SPARK_LOG_LEVEL`: filter override (`info`, `logo_stream=debug`, ...).
/// - `LOGO_SPARK_JSON_LOG_PATH`: write JSONL to this file instead of stderr.
/// - `RUST_LOG`: fallback filter.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let enabled = std::env::var("LOGO_SPARK_OBSERVABILITY").ok();
        let json_path = std::env::var("LOGO_SPARK_JSON_LOG_PATH").ok();
        match resolve_sink(enabled.as_deref(), json_path.as_deref()) {
            LogSink::Off => {}
            LogSink::Stderr => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(resolve_filter())
                    .with(layer)
                    .try_init();
            }
            LogSink::JsonFile { dir, file } => {
                let _ = std::fs::create_dir_all(&dir);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(tracing_appender::rolling::never(dir, file));
                let _ = tracing_subscriber::registry()
                    .with(resolve_filter())
                    .with(layer)
                    .try_init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_values() {
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn sink_defaults_to_stderr() {
        assert_eq!(resolve_sink(None, None), LogSink::Stderr);
        assert_eq!(resolve_sink(Some("maybe"), Some("  ")), LogSink::Stderr);
    }

    #[test]
    fn disabled_wins_over_json_path() {
        assert_eq!(resolve_sink(Some("off"), Some("logs/a.jsonl")), LogSink::Off);
    }

    #[test]
    fn json_path_is_split_into_dir_and_file() {
        assert_eq!(
            resolve_sink(None, Some("logs/run.jsonl")),
            LogSink::JsonFile {
                dir: PathBuf::from("logs"),
                file: "run.jsonl".into()
            }
        );
        assert_eq!(
            resolve_sink(Some("on"), Some("run.jsonl")),
            LogSink::JsonFile {
                dir: PathBuf::from("."),
                file: "run.jsonl".into()
            }
        );
    }

    #[test]
    fn init_is_idempotent() {
        init_observability();
        init_observability();
    }
}
