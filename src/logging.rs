use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "tokensync=info";
const VERBOSE_FILTER: &str = "tokensync=debug";

/// Installs the global subscriber. `RUST_LOG` wins over `verbose`.
///
/// Logs go to stderr; stdout is reserved for reports. Calling this twice is
/// harmless.
pub fn init(verbose: bool) {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
