use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable read when `RUST_LOG` is not set
pub const LOG_ENV: &str = "OCC_LOGLEVEL";

/// Install the stderr subscriber
///
/// `RUST_LOG` wins over `OCC_LOGLEVEL`; with neither set only warnings are
/// shown, or debug output when `verbose` is true.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let env_filter = EnvFilter::builder().with_default_directive(default_level.into());
    let env_filter = env_filter
        .try_from_env()
        .or_else(|_| env_filter.with_env_var(LOG_ENV).from_env())?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).try_init()?;
    Ok(())
}
