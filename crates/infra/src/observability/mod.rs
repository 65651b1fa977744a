//! Tracing initialisation
//!
//! Library code only emits `tracing` events; binaries and tests call
//! [`init_tracing`] once to install a fmt subscriber. `RUST_LOG` wins over the
//! defaults chosen here.

use tracing_subscriber::EnvFilter;

const DEBUG_DIRECTIVES: &str = "info,signway_core=debug,signway_infra=debug";
const DEFAULT_DIRECTIVES: &str = "info";

/// Filter directives used when `RUST_LOG` is unset.
pub const fn default_directives(debug_logging: bool) -> &'static str {
    if debug_logging {
        DEBUG_DIRECTIVES
    } else {
        DEFAULT_DIRECTIVES
    }
}

/// Install a global fmt subscriber.
///
/// Returns `false` when a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_tracing(debug_logging: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug_logging)));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init().is_ok()
}
