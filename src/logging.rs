//! Structured logging bootstrap using `tracing`.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset: this crate at `info`, dependencies at `warn`.
const DEFAULT_DIRECTIVES: &str = "warn,promptore=info";

/// Install the global subscriber once. Logs go to stderr; stdout is reserved
/// for the JSON and paths the CLI prints.
pub fn init_tracing() -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(DEFAULT_DIRECTIVES)?,
    };

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter);

    tracing_subscriber::registry().with(stderr).try_init()?;
    tracing::debug!("tracing initialised");
    Ok(())
}
