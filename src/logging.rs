use crate::settings::LogLevel;
use tracing_subscriber::EnvFilter;

/// Default filter: our crates at `level`, everything else at `warn`.
pub fn filter_directive(level: LogLevel) -> String {
    format!("warn,unggah={0},unggah_lib={0}", level.as_str())
}

/// Installs the stderr subscriber. `RUST_LOG` takes precedence over `level`.
/// Records emitted through the `log` macros are forwarded to it.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("Logging was already initialised: {}", e);
    }
}
