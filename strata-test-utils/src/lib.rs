//! Shared test support for the strata workspace.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a tracing subscriber for test binaries, honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call has an effect. With no
/// `RUST_LOG` set the filter defaults to `info`, which is enough to surface
/// the layout compiler's schema-class diagnostics.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).with_target(false).init();
    });
}
