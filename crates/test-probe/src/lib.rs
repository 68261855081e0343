use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Send allocprobe's logs to stderr so stdout stays machine-readable.
/// `RUST_LOG` controls the level, `warn` by default.
pub fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
