use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize tracing for a bot process.
///
/// Default: info for everything, including our crates and `service_name`.
/// Can be overridden with `RUST_LOG`.
pub fn init(service_name: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {e}")))
}

fn default_directives(service_name: &str) -> String {
    format!(
        "info,tbot=info,tbot_core=info,tbot_telegram=info,{}=info",
        service_name.replace('-', "_")
    )
}
