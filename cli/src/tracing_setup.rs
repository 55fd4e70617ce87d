//! Log output for the CLI.
//!
//! Logs go to stderr so `--json` output on stdout stays machine-readable.
//!
//!   resepku --debug list            # debug logging
//!   RUST_LOG=resepku_core=trace ... # fine-grained control

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

pub fn init_tracing(debug: bool) -> Result<()> {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
