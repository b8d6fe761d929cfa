//! Editor logging bootstrap and safety policy.
//!
//! # Responsibility
//! - Start one rolling file logger per process, configured either directly
//!   or from an [`EditorConfig`].
//! - Record which settings the editor runs with (level, where the level came
//!   from, session tunables) as metadata-only events.
//! - Keep panic payloads, which may quote document text, to one short line.
//!
//! # Invariants
//! - Repeating init with the same level and directory is a no-op.
//! - A different level or directory after init is rejected, never applied.
//! - Initialization never panics.

use crate::config::EditorConfig;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "lazynote_editor";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGER: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

/// Where the active log level was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSource {
    /// Passed to [`init_logging`] by the host.
    Explicit,
    /// `log_level` of the editor configuration.
    Config,
    /// Build-mode default, used when the configuration names no level.
    BuildDefault,
}

impl LevelSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Config => "config",
            Self::BuildDefault => "build_default",
        }
    }
}

/// Snapshot of the running logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingStatus {
    pub level: &'static str,
    pub level_source: LevelSource,
    pub log_dir: PathBuf,
}

struct ActiveLogger {
    status: LoggingStatus,
    _handle: LoggerHandle,
}

/// Starts editor logging at `level` under the absolute directory `log_dir`.
///
/// # Errors
/// - `level` is not one of trace|debug|info|warn|error.
/// - `log_dir` is empty, relative, or cannot be created.
/// - Logging already runs with a different level or directory.
/// - The logger backend fails to start.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let level = normalize_level(level)?;
    start(level, LevelSource::Explicit, log_dir, None)
}

/// Starts editor logging with the level carried by `config` and records the
/// session tunables it was started with.
///
/// A config without `log_level` runs at [`default_log_level`]. The config is
/// validated first, so a rejected config never starts the logger.
pub fn init_logging_from_config(config: &EditorConfig, log_dir: &str) -> Result<(), String> {
    config.validate().map_err(|err| err.to_string())?;
    let (level, source) = resolve_level(config)?;
    start(level, source, log_dir, Some(config))
}

/// Active logger metadata, or `None` before the first successful init.
pub fn logging_status() -> Option<LoggingStatus> {
    LOGGER.get().map(|active| active.status.clone())
}

/// Default log level for the current build mode: `debug` in debug builds,
/// `info` in release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn resolve_level(config: &EditorConfig) -> Result<(&'static str, LevelSource), String> {
    match config.log_level.as_deref() {
        Some(level) => Ok((normalize_level(level)?, LevelSource::Config)),
        None => Ok((default_log_level(), LevelSource::BuildDefault)),
    }
}

fn start(
    level: &'static str,
    source: LevelSource,
    log_dir: &str,
    config: Option<&EditorConfig>,
) -> Result<(), String> {
    let log_dir = normalize_log_dir(log_dir)?;
    if let Some(active) = LOGGER.get() {
        return ensure_same(&active.status, level, &log_dir);
    }

    let active = LOGGER.get_or_try_init(|| -> Result<ActiveLogger, String> {
        std::fs::create_dir_all(&log_dir).map_err(|err| {
            format!("failed to create log directory `{}`: {err}", log_dir.display())
        })?;
        let handle = Logger::try_with_str(level)
            .map_err(|err| format!("invalid log level `{level}`: {err}"))?
            .log_to_file(
                FileSpec::default()
                    .directory(log_dir.as_path())
                    .basename(LOG_FILE_BASENAME),
            )
            .rotate(
                Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(MAX_LOG_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            // [YYYY-MM-DD HH:MM:SS.ffffff TZ] LEVEL [module] file:line: message
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|err| format!("failed to start logger: {err}"))?;

        install_panic_hook_once();
        info!(
            "event=editor_start module=logging status=ok platform={} build_mode={} version={}",
            std::env::consts::OS,
            build_mode(),
            env!("CARGO_PKG_VERSION")
        );
        info!(
            "event=logging_init module=logging status=ok level={} level_source={} log_dir={}",
            level,
            source.as_str(),
            log_dir.display()
        );
        if let Some(config) = config {
            info!(
                "event=editor_config module=logging status=ok outline_debounce_ms={} autosave_debounce_ms={} slug_max_chars={} markdown_paste={} history_limit={}",
                config.outline_debounce_ms,
                config.autosave_debounce_ms,
                config.slug_max_chars,
                config.markdown_paste,
                config.history_limit
            );
        }

        Ok(ActiveLogger {
            status: LoggingStatus {
                level,
                level_source: source,
                log_dir: log_dir.clone(),
            },
            _handle: handle,
        })
    })?;

    // Another thread may have won the init race with other settings.
    ensure_same(&active.status, level, &log_dir)
}

fn ensure_same(status: &LoggingStatus, level: &str, log_dir: &Path) -> Result<(), String> {
    if status.log_dir != log_dir {
        return Err(format!(
            "logging already initialized at `{}`; refusing to switch to `{}`",
            status.log_dir.display(),
            log_dir.display()
        ));
    }
    if status.level != level {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            status.level, level
        ));
    }
    Ok(())
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn normalize_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(format!("log_dir must be an absolute path, got `{trimmed}`"));
    }
    Ok(path.to_path_buf())
}

fn build_mode() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.get().is_some() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=editor status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));

    let _ = PANIC_HOOK_INSTALLED.set(());
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    single_line(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

/// Flattens `value` to one line of at most `max_chars` chars (plus `...`).
fn single_line(value: &str, max_chars: usize) -> String {
    let flattened: String = value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let mut truncated: String = flattened.chars().take(max_chars).collect();
    if flattened.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, init_logging_from_config, logging_status, normalize_level,
        normalize_log_dir, resolve_level, single_line, LevelSource,
    };
    use crate::config::EditorConfig;

    fn dir_str(dir: &tempfile::TempDir) -> String {
        dir.path()
            .to_str()
            .expect("temp dir should be valid UTF-8")
            .to_string()
    }

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(normalize_level("INFO").expect("INFO should normalize"), "info");
        assert_eq!(
            normalize_level(" warning ").expect("warning should normalize"),
            "warn"
        );
        let error = normalize_level("verbose").expect_err("unknown level must fail");
        assert!(error.contains("expected trace|debug|info|warn|error"));
    }

    #[test]
    fn normalize_log_dir_rejects_relative_path() {
        let error = normalize_log_dir("logs/dev").expect_err("relative paths must be rejected");
        assert!(error.contains("absolute"));
    }

    #[test]
    fn config_level_wins_over_build_default() {
        let mut config = EditorConfig::default();
        assert_eq!(
            resolve_level(&config).expect("default level"),
            (super::default_log_level(), LevelSource::BuildDefault)
        );

        config.log_level = Some("Warning".to_string());
        assert_eq!(
            resolve_level(&config).expect("configured level"),
            ("warn", LevelSource::Config)
        );

        config.log_level = Some("loud".to_string());
        assert!(resolve_level(&config).is_err());
    }

    #[test]
    fn single_line_flattens_control_chars_and_truncates() {
        let flattened = single_line("line1\nline2\rline3\u{1}", 8);
        assert_eq!(flattened, "line1 li...");
    }

    #[test]
    fn init_from_config_records_source_and_rejects_conflicts() {
        let log_dir = tempfile::tempdir().expect("temp dir");
        let other_dir = tempfile::tempdir().expect("temp dir");
        let log_dir_str = dir_str(&log_dir);

        let invalid = EditorConfig {
            history_limit: 0,
            ..EditorConfig::default()
        };
        init_logging_from_config(&invalid, &log_dir_str).expect_err("invalid config");
        assert!(logging_status().is_none());

        let config = EditorConfig {
            log_level: Some("info".to_string()),
            ..EditorConfig::default()
        };
        init_logging_from_config(&config, &log_dir_str).expect("first init should succeed");
        init_logging("info", &log_dir_str).expect("same settings should be idempotent");

        let level_error =
            init_logging("debug", &log_dir_str).expect_err("level conflict should fail");
        assert!(level_error.contains("refusing to switch"));
        let dir_error = init_logging("info", &dir_str(&other_dir))
            .expect_err("directory conflict should fail");
        assert!(dir_error.contains("refusing to switch"));

        let status = logging_status().expect("logging should be active");
        assert_eq!(status.level, "info");
        assert_eq!(status.level_source, LevelSource::Config);
        assert_eq!(status.log_dir, log_dir.path());
    }
}
