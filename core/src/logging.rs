use crate::error::{CoreError, CoreResult};
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

/// Installs the global subscriber. `RUST_LOG` overrides the `info` default;
/// `json_output` switches to one JSON object per line for log shippers.
///
/// Fails if a subscriber is already installed in this process.
pub fn init_tracing(json_output: bool) -> CoreResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let result = if json_output {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init()
    } else {
        fmt()
            .compact()
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init()
    };
    result.map_err(|e| CoreError::TracingInit(e.to_string()))
}

pub fn json_requested() -> bool {
    std::env::var(ENV_LOG_FORMAT)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
