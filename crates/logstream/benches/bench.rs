use bytes::Bytes;
use core::hint::black_box;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use logstream::{
    Chunk, Chunker, Client, MAX_CHUNK_SIZE, Streamer, StreamerConfig, UploadError, async_trait,
    new_output,
};
use tokio::runtime::Builder;

struct Discard;

#[async_trait]
impl Client for Discard {
    async fn upload(&self, chunk: &Chunk) -> Result<(), UploadError> {
        black_box(chunk.len());
        Ok(())
    }
}

fn output(len: usize) -> Vec<u8> {
    b"[build] compiling target with a reasonably long log line\n"
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");

    for len in [1_000, MAX_CHUNK_SIZE, 10 * MAX_CHUNK_SIZE] {
        let data = output(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &data, |b, data| {
            let chunker = Chunker::default();
            b.iter(|| {
                let suffix = new_output(black_box(data), 0).unwrap_or_default();
                let mut next_order = 1;
                black_box(chunker.split(Bytes::copy_from_slice(suffix), &mut next_order))
            });
        });
    }

    group.finish();
}

fn bench_stream(c: &mut Criterion) {
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    let total = 10 * MAX_CHUNK_SIZE;
    let data = output(total);
    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Bytes(total as u64));

    for concurrency in [1, 5, 16] {
        group.bench_with_input(
            BenchmarkId::new("concurrency", concurrency),
            &concurrency,
            |b, &concurrency| {
                let data = &data;
                b.to_async(&runtime).iter(|| async move {
                    let config = StreamerConfig::default().with_concurrency(concurrency);
                    let mut streamer = Streamer::with_config(Discard, config).unwrap();
                    streamer.start().unwrap();
                    // Grow the output in 64kB steps, as an agent polling a
                    // busy job would.
                    for end in (0..=data.len()).step_by(64 * 1024).chain([data.len()]) {
                        streamer.process(&data[..end]).unwrap();
                    }
                    black_box(streamer.stop().await.unwrap())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_split, bench_stream);
criterion_main!(benches);
