use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use logstream::{
    DEFAULT_CONCURRENCY, DEFAULT_QUEUE_CAPACITY, MAX_CHUNK_SIZE, RetryPolicy, StreamerConfig,
};
use std::path::PathBuf;

/// Runtime configuration for the `logstream-agent` binary.
///
/// All values are parsed from CLI arguments or environment variables, with
/// defaults matching the library's.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "logstream-agent",
    version,
    about = "Streams captured job output to a log store in ordered chunks"
)]
pub struct CliArgs {
    /// Number of chunks uploaded concurrently.
    ///
    /// Environment variable: `CONCURRENCY`
    #[arg(long, env = "CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Largest chunk, in bytes. New output is split into chunks of exactly
    /// this size, except the last one of each flush.
    ///
    /// Environment variable: `MAX_CHUNK_SIZE`
    #[arg(long, env = "MAX_CHUNK_SIZE", default_value_t = MAX_CHUNK_SIZE)]
    pub max_chunk_size: usize,

    /// Capacity of the queue between submission and the upload workers.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Period, in milliseconds, of the worker pool's liveness log line.
    ///
    /// Environment variable: `POOL_TICK_INTERVAL_MS`
    #[arg(long, env = "POOL_TICK_INTERVAL_MS", default_value_t = 1_000)]
    pub pool_tick_interval_ms: u64,

    /// How often, in milliseconds, buffered output is chunked and queued.
    ///
    /// Environment variable: `FLUSH_INTERVAL_MS`
    #[arg(long, env = "FLUSH_INTERVAL_MS", default_value_t = 1_000)]
    pub flush_interval_ms: u64,

    /// Upload attempts per chunk, including the first.
    ///
    /// Environment variable: `MAX_ATTEMPTS`
    #[arg(long, env = "MAX_ATTEMPTS", default_value_t = 1)]
    pub max_attempts: u32,

    /// Delay, in milliseconds, before the first retry. Doubles on every
    /// further retry.
    ///
    /// Environment variable: `RETRY_BACKOFF_MS`
    #[arg(long, env = "RETRY_BACKOFF_MS", default_value_t = 250)]
    pub retry_backoff_ms: u64,

    /// Give up waiting for uploads this many seconds after shutdown starts.
    /// 0 waits indefinitely.
    ///
    /// Environment variable: `DRAIN_TIMEOUT_SECS`
    #[arg(long, env = "DRAIN_TIMEOUT_SECS", default_value_t = 0)]
    pub drain_timeout_secs: u64,

    /// Directory receiving one file per chunk. When unset, chunks are only
    /// logged.
    ///
    /// Environment variable: `OUTPUT_DIR`
    #[arg(long, env = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Emit logs as JSON lines instead of human-readable output.
    ///
    /// Environment variable: `JSON_LOGS`
    #[arg(long, env = "JSON_LOGS", default_value_t = false)]
    pub json_logs: bool,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub streamer: StreamerConfig,
    pub flush_interval: Duration,
    pub output_dir: Option<PathBuf>,
    pub json_logs: bool,
}

impl TryFrom<CliArgs> for AgentConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.concurrency == 0 {
            bail!("CONCURRENCY must be greater than 0");
        }

        if args.max_chunk_size == 0 {
            bail!("MAX_CHUNK_SIZE must be greater than 0");
        }

        if args.flush_interval_ms == 0 {
            bail!("FLUSH_INTERVAL_MS must be greater than 0");
        }

        if args.max_attempts == 0 {
            bail!("MAX_ATTEMPTS must be at least 1");
        }

        let drain_timeout =
            (args.drain_timeout_secs > 0).then(|| Duration::from_secs(args.drain_timeout_secs));

        let streamer = StreamerConfig::default()
            .with_concurrency(args.concurrency)
            .with_max_chunk_size(args.max_chunk_size)
            .with_queue_capacity(args.queue_capacity)
            .with_pool_tick_interval(Duration::from_millis(args.pool_tick_interval_ms))
            .with_retry(RetryPolicy::exponential(
                args.max_attempts,
                Duration::from_millis(args.retry_backoff_ms),
            ))
            .with_drain_timeout(drain_timeout);

        // Catches whatever the checks above don't, e.g. a zero queue capacity.
        streamer.validate()?;

        Ok(Self {
            streamer,
            flush_interval: Duration::from_millis(args.flush_interval_ms),
            output_dir: args.output_dir,
            json_logs: args.json_logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<AgentConfig> {
        let argv = core::iter::once("logstream-agent").chain(args.iter().copied());
        AgentConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn defaults_match_library() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.streamer.concurrency, 5);
        assert_eq!(config.streamer.max_chunk_size, 100_000);
        assert_eq!(config.streamer.pool_tick_interval, Duration::from_secs(1));
        assert_eq!(config.streamer.retry.max_attempts, 1);
        assert_eq!(config.streamer.drain_timeout, None);
        assert_eq!(config.flush_interval, Duration::from_secs(1));
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--concurrency",
            "8",
            "--max-attempts",
            "4",
            "--retry-backoff-ms",
            "10",
            "--drain-timeout-secs",
            "30",
            "--output-dir",
            "/tmp/job-logs",
        ])
        .unwrap();

        assert_eq!(config.streamer.concurrency, 8);
        assert_eq!(config.streamer.retry.max_attempts, 4);
        assert_eq!(config.streamer.retry.initial_backoff, Duration::from_millis(10));
        assert_eq!(config.streamer.drain_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/job-logs")));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = parse(&["--concurrency", "0"]).unwrap_err();
        assert!(err.to_string().contains("CONCURRENCY"));
    }

    #[test]
    fn rejects_zero_queue_capacity() {
        assert!(parse(&["--queue-capacity", "0"]).is_err());
    }
}
