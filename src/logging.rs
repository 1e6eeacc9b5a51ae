use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_ENV: &str = "BLOG_READER_LOG";

/// Installs the global subscriber. Filtering follows `RUST_LOG` and
/// defaults to `warn`. Output goes to stderr unless `BLOG_READER_LOG`
/// names a file.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Some(path) = std::env::var_os(LOG_FILE_ENV) {
        match std::fs::File::create(&path) {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true);
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(file_layer)
                    .try_init();
                return;
            }
            Err(err) => {
                eprintln!(
                    "Warning: failed to create log file {}: {err}",
                    std::path::Path::new(&path).display()
                );
            }
        }
    }

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}
