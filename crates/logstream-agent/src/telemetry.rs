//! # Logging
//!
//! The agent always logs through `tracing`, printed to stderr by
//! `tracing_subscriber::fmt`. Stdout is left alone so the agent can sit in
//! the middle of a pipeline.
//!
//! - Verbosity follows `RUST_LOG` and defaults to `info`.
//! - `--json-logs` switches to one JSON object per line for log collectors.
//! - `RUST_LOG=logstream=trace` additionally shows per-chunk uploads and the
//!   worker pool's liveness ticks.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                    .with_target(true)
                    .json(),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                    .with_file(true),
            )
            .try_init()?;
    }

    Ok(())
}
