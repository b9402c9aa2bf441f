use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "battlefield-watch.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Console-only subscriber for the window before the config is loaded and
/// the log directory is known. Scope it to the load with `with_subscriber`.
pub fn startup_subscriber<W>(writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    fmt().with_env_filter(env_filter()).with_writer(writer).finish()
}

/// Diagnostics go to stderr so stdout stays free for the mob table. With a
/// log directory, a daily rolling JSON file is added. Keep the guard alive
/// until exit or buffered lines are lost.
pub fn init_logging(log_dir: Option<&str>) -> Option<WorkerGuard> {
    let env_filter = env_filter();
    let console_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir.map(|dir| (dir, std::fs::create_dir_all(dir))) {
        Some((dir, Ok(()))) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        Some((dir, Err(err))) => {
            eprintln!("log directory {} unavailable, logging to stderr only: {}", dir, err);
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}
