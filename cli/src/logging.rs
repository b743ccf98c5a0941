// Logging setup
//
// Installs a tracing-subscriber writing to stderr so stdout stays reserved
// for JSON output. `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::EnvFilter;

use metalog_kernel::config::LoggingConfig;

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.level.to_lowercase())
            .map_err(|e| anyhow::anyhow!("invalid log level '{}': {}", config.level, e))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    result.map_err(|e| anyhow::anyhow!("cannot install tracing subscriber: {e}"))
}
