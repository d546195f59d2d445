//! Tracing setup for the CLI.
//!
//! Everything goes to stderr. `RUST_LOG` wins when set; otherwise the
//! `-v` count picks the level for this crate.

use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "corpai=warn,corpai_core=warn",
        1 => "corpai=info,corpai_core=info",
        _ => "corpai=debug,corpai_core=debug",
    }
}

pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
