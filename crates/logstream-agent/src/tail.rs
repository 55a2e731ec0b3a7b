use core::{future::Future, time::Duration};
use logstream::Streamer;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::{MissedTickBehavior, interval},
};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Why [`tail`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailEnd {
    /// The input reached end of file.
    Eof,
    /// The shutdown future completed first.
    Shutdown,
}

/// Accumulates everything read from `reader` and offers the full output to
/// `streamer` every `flush_interval`.
///
/// Returns once `reader` hits EOF or `shutdown` completes, after a final
/// flush. The streamer is left running; the caller stops it.
pub async fn tail<R, S>(
    streamer: &mut Streamer,
    mut reader: R,
    flush_interval: Duration,
    shutdown: S,
) -> anyhow::Result<TailEnd>
where
    R: AsyncRead + Unpin,
    S: Future<Output = ()>,
{
    let mut output = Vec::new();
    let mut buf = vec![0_u8; READ_BUFFER_SIZE];
    let mut ticker = interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let end = loop {
        tokio::select! {
            // Shutdown first, so a chatty producer can't starve it.
            biased;

            () = &mut shutdown => break TailEnd::Shutdown,
            read = reader.read(&mut buf) => match read? {
                0 => break TailEnd::Eof,
                n => output.extend_from_slice(&buf[..n]),
            },
            _ = ticker.tick() => flush(streamer, &output)?,
        }
    };

    flush(streamer, &output)?;
    tracing::debug!("Stopped tailing after {} bytes ({end:?})", output.len());
    Ok(end)
}

fn flush(streamer: &mut Streamer, output: &[u8]) -> logstream::Result<()> {
    let chunks = streamer.process(output)?;
    if let (Some(first), Some(last)) = (chunks.first(), chunks.last()) {
        tracing::debug!(
            "Queued chunks {}..={} ({} bytes total)",
            first.order(),
            last.order(),
            output.len()
        );
    }
    Ok(())
}
