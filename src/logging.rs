//! Diagnostic logging for the `ral` binary.
//!
//! Logs go to stderr so stdout stays parseable (`--json`). `RUST_LOG`,
//! when set, overrides the verbosity flag.

use tracing_subscriber::EnvFilter;

/// Filter directive for `-v` repetitions: warn, info, debug, trace.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
