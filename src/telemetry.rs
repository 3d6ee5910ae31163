use tracing_subscriber::Layer;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

/// Directive used when `RUST_LOG` is not set
const DEFAULT_DIRECTIVE: &str = "folio=info";

// Console output goes to stderr so chapter text on stdout stays clean.
pub fn init_tracing_subscriber(verbose: bool) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("folio=debug"),
        Err(_) => EnvFilter::new(DEFAULT_DIRECTIVE),
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_filter(filter);

    tracing_subscriber::registry().with(console_layer).init();
}
