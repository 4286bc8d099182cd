//! Tracing subscriber setup for the `arxid` binary.

use tracing_subscriber::EnvFilter;

/// Log target of this crate (module paths start with it).
const CRATE_TARGET: &str = "arx_ident";

/// Map a `-v` count to a level name.
fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize tracing to stderr based on CLI verbosity.
///
/// `RUST_LOG` overrides the flag if set. Logs go to stderr so `--json` output
/// on stdout stays machine-readable.
pub fn init(verbosity: u8) {
    let default_filter = format!("{CRATE_TARGET}={}", level_for(verbosity));
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
