/// Logging setup: terminal output plus optional rotating log files.
///
/// - compact, human-readable output on stderr
/// - with a log directory, daily-rotated text and JSON files written in the
///   background
/// - level filtering from `RUST_LOG`, falling back to `info` (or `debug` when
///   verbose)
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps the background log writers alive. Dropping it flushes pending lines.
#[must_use = "log files stop receiving output once the guard is dropped"]
pub struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

fn env_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Initialize the tracing subscriber.
///
/// # Arguments
/// * `log_dir` - when set, `app.log` and `app.json.log` are rotated daily there
/// * `verbose` - default to `debug` instead of `info` when `RUST_LOG` is unset
///
/// # Environment Variables
/// * `RUST_LOG` - e.g. `RUST_LOG=playdrone_archiver=debug,reqwest=warn`
pub fn init_logging(
    log_dir: Option<&Path>,
    verbose: bool,
) -> Result<LoggingGuard, Box<dyn std::error::Error>> {
    let mut guards = Vec::new();

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(env_filter(verbose));

    let (text_layer, json_layer) = match log_dir {
        Some(log_path) => {
            std::fs::create_dir_all(log_path)?;

            let text_file_appender = tracing_appender::rolling::daily(log_path, "app.log");
            let (text_writer, text_guard) = tracing_appender::non_blocking(text_file_appender);
            guards.push(text_guard);

            let json_file_appender = tracing_appender::rolling::daily(log_path, "app.json.log");
            let (json_writer, json_guard) = tracing_appender::non_blocking(json_file_appender);
            guards.push(json_guard);

            let text_layer = fmt::layer()
                .with_writer(text_writer)
                .with_target(true)
                .with_line_number(true)
                .with_ansi(false)
                .compact()
                .with_filter(env_filter(verbose));

            let json_layer = fmt::layer()
                .json()
                .with_writer(json_writer)
                .with_target(true)
                .with_line_number(true)
                .with_current_span(true)
                .with_filter(env_filter(verbose));

            (Some(text_layer), Some(json_layer))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(text_layer)
        .with(json_layer)
        .try_init()?;

    if let Some(log_path) = log_dir {
        tracing::debug!("Logs are also written to {}", log_path.display());
    }

    Ok(LoggingGuard { _guards: guards })
}
