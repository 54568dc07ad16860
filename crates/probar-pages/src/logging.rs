//! Log output for test runs.
//!
//! Page objects only emit `tracing` events. Test binaries that want to see them call
//! [`init_test_logging`] once (or many times; later calls are ignored).

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Settings;
use crate::result::PagesResult;

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV_VAR: &str = "PROBAR_PAGES_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Filter directive derived from `settings.driver_log_level`
pub fn default_directive(settings: &Settings) -> PagesResult<String> {
    let level = settings.log_level()?;
    Ok(level.as_str().to_ascii_lowercase())
}

fn build_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install a formatting subscriber filtered by [`LOG_ENV_VAR`], defaulting to `warn`
pub fn init_test_logging() {
    install(DEFAULT_DIRECTIVE);
}

/// Like [`init_test_logging`], defaulting to the settings' driver log level
pub fn init_logging_from(settings: &Settings) -> PagesResult<()> {
    install(&default_directive(settings)?);
    Ok(())
}

fn install(fallback: &str) {
    let subscriber = tracing_subscriber::registry()
        .with(build_filter(fallback))
        .with(fmt::layer().with_test_writer().with_target(false));
    if subscriber.try_init().is_err() {
        tracing::trace!("log subscriber already installed");
    }
}
