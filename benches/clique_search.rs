#![forbid(unsafe_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use linkclique::generator::{GraphShape, LinkGraphGenerator};
use linkclique::ingest::{IngestOptions, Ingestor, LinkDocument};
use linkclique::storage::{GraphStore, MemoryGraphStore, SqliteGraphStore, StoreOptions};
use linkclique::{CliqueSearch, PivotRule, RankingBuffer, SearchOptions};
use tempfile::TempDir;

const SEED: u64 = 0x5eed;

fn shape(vertices: usize) -> GraphShape {
    GraphShape {
        vertices,
        avg_links: 12,
        mutual_ratio: 0.4,
        planted: vec![16, 12, 10],
    }
}

fn load<S: GraphStore + ?Sized>(store: &mut S, docs: &[LinkDocument]) {
    let opts = IngestOptions {
        info_interval: None,
        ..IngestOptions::default()
    };
    let mut ingestor = Ingestor::new(store, opts).expect("ingestor");
    for doc in docs {
        ingestor.ingest(doc).expect("ingest");
    }
    ingestor.finish().expect("finish");
    store.seal().expect("seal");
}

fn search<S: GraphStore + ?Sized>(store: &S, pivot: PivotRule, cache: usize) -> usize {
    let opts = SearchOptions {
        top_k: 10,
        pivot,
        info_interval: None,
        neighbor_cache_capacity: cache,
        ..SearchOptions::default()
    };
    let mut ranking = RankingBuffer::new(opts.top_k).expect("ranking");
    CliqueSearch::new(store, opts)
        .expect("search")
        .run(&mut ranking)
        .expect("run");
    ranking.best().len()
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search/memory");
    group.sample_size(20);
    for vertices in [1_000usize, 5_000] {
        let docs = LinkGraphGenerator::new(SEED).generate(&shape(vertices));
        let mut store = MemoryGraphStore::new();
        load(&mut store, &docs);
        group.throughput(Throughput::Elements(vertices as u64));
        for pivot in [PivotRule::First, PivotRule::MaxCandidates] {
            group.bench_with_input(
                BenchmarkId::new(format!("{pivot:?}"), vertices),
                &pivot,
                |b, &pivot| b.iter(|| black_box(search(&store, pivot, 1 << 16))),
            );
        }
    }
    group.finish();

    let mut group = c.benchmark_group("search/sqlite");
    group.sample_size(10);
    let docs = LinkGraphGenerator::new(SEED).generate(&shape(2_000));
    let tmpdir = TempDir::new().expect("tmpdir");
    let mut store =
        SqliteGraphStore::create(tmpdir.path().join("bench.sqlite"), StoreOptions::default())
            .expect("store");
    load(&mut store, &docs);
    for cache in [0usize, 1 << 16] {
        group.bench_with_input(BenchmarkId::new("neighbor_cache", cache), &cache, |b, &cache| {
            b.iter(|| black_box(search(&store, PivotRule::First, cache)))
        });
    }
    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest/sqlite");
    group.sample_size(10);
    let docs = LinkGraphGenerator::new(SEED).generate(&shape(2_000));
    let edges: u64 = docs.iter().map(|d| d.targets.len() as u64).sum();
    group.throughput(Throughput::Elements(edges));
    for defer in [false, true] {
        group.bench_with_input(BenchmarkId::new("defer_indexes", defer), &defer, |b, &defer| {
            b.iter_with_setup(
                || TempDir::new().expect("tmpdir"),
                |dir| {
                    let opts = StoreOptions::default().defer_indexes(defer);
                    let mut store = SqliteGraphStore::create(dir.path().join("ingest.sqlite"), opts)
                        .expect("store");
                    load(&mut store, &docs);
                    black_box(store.is_sealed())
                },
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search, bench_ingest);
criterion_main!(benches);
