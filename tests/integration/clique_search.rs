#![allow(missing_docs)]

use std::collections::{BTreeSet, HashMap};

use linkclique::generator::{GraphShape, LinkGraphGenerator};
use linkclique::ingest::{IngestOptions, Ingestor, LinkDocument};
use linkclique::storage::{GraphStore, MemoryGraphStore, SqliteGraphStore, StoreOptions};
use linkclique::{AbortReason, CliqueSearch, PivotRule, RankingBuffer, SearchOptions, SearchReport};

fn example_docs() -> Vec<LinkDocument> {
    vec![
        LinkDocument::new("A", ["B", "C", "D"]),
        LinkDocument::new("B", ["A", "C"]),
        LinkDocument::new("C", ["A", "B", "D"]),
        LinkDocument::new("D", ["A", "B"]),
    ]
}

fn load<S: GraphStore + ?Sized>(store: &mut S, docs: &[LinkDocument]) {
    let opts = IngestOptions {
        batch_documents: 64,
        ..IngestOptions::default()
    };
    let mut ingestor = Ingestor::new(store, opts).expect("ingestor");
    for doc in docs {
        ingestor.ingest(doc).expect("ingest");
    }
    ingestor.finish().expect("finish");
    store.seal().expect("seal");
}

fn search<S: GraphStore + ?Sized>(store: &S, opts: SearchOptions) -> SearchReport {
    let mut ranking = RankingBuffer::new(opts.top_k).expect("ranking");
    let outcome = CliqueSearch::new(store, opts)
        .expect("search")
        .run(&mut ranking)
        .expect("run");
    SearchReport::build(store, &ranking, Some(&outcome)).expect("report")
}

fn sizes(report: &SearchReport) -> Vec<usize> {
    report.cliques.iter().map(|c| c.size).collect()
}

#[test]
fn example_graph_ranks_triangle_before_pair() {
    let mut store = SqliteGraphStore::in_memory(StoreOptions::default()).unwrap();
    load(&mut store, &example_docs());
    for pivot in [PivotRule::First, PivotRule::MaxCandidates] {
        let report = search(
            &store,
            SearchOptions {
                top_k: 2,
                pivot,
                ..SearchOptions::default()
            },
        );
        assert!(report.complete);
        assert_eq!(
            report.render_lines(),
            ["1 Result of length 3: A, B, C", "2 Result of length 2: A, D"],
            "pivot {pivot:?}"
        );
    }
}

#[test]
fn planted_cliques_are_recovered() {
    let shape = GraphShape {
        vertices: 300,
        avg_links: 4,
        mutual_ratio: 0.3,
        planted: vec![9, 7, 6],
    };
    let docs = LinkGraphGenerator::new(11).generate(&shape);
    let mut store = SqliteGraphStore::in_memory(StoreOptions::default()).unwrap();
    load(&mut store, &docs);

    let report = search(
        &store,
        SearchOptions {
            top_k: 3,
            ..SearchOptions::default()
        },
    );
    assert!(report.complete);
    assert_eq!(sizes(&report), [9, 7, 6]);

    let links: HashMap<&str, &BTreeSet<String>> = docs
        .iter()
        .map(|doc| (doc.source.as_str(), &doc.targets))
        .collect();
    for clique in &report.cliques {
        for a in &clique.members {
            for b in &clique.members {
                if a != b {
                    assert!(links[a.as_str()].contains(b), "{a} -> {b} missing");
                }
            }
        }
    }
}

#[test]
fn backends_produce_the_same_ranking() {
    let shape = GraphShape {
        vertices: 120,
        avg_links: 6,
        mutual_ratio: 0.5,
        planted: vec![5],
    };
    let docs = LinkGraphGenerator::new(3).generate(&shape);
    let mut sqlite = SqliteGraphStore::in_memory(StoreOptions::default()).unwrap();
    let mut memory = MemoryGraphStore::new();
    load(&mut sqlite, &docs);
    load(&mut memory, &docs);

    let opts = SearchOptions {
        top_k: 5,
        pivot: PivotRule::MaxCandidates,
        ..SearchOptions::default()
    };
    let from_sqlite = search(&sqlite, opts.clone());
    let from_memory = search(&memory, opts);
    assert_eq!(sizes(&from_sqlite), sizes(&from_memory));
    assert_eq!(from_sqlite.cliques[0], from_memory.cliques[0]);
    assert_eq!(sizes(&from_sqlite)[0], 5);
}

#[test]
fn call_limit_keeps_partial_ranking() {
    let docs = LinkGraphGenerator::new(5).generate(&GraphShape {
        vertices: 200,
        avg_links: 6,
        mutual_ratio: 0.5,
        planted: vec![6],
    });
    let mut store = MemoryGraphStore::new();
    load(&mut store, &docs);

    let mut ranking = RankingBuffer::new(4).unwrap();
    let outcome = CliqueSearch::new(
        &store,
        SearchOptions {
            top_k: 4,
            max_calls: Some(25),
            ..SearchOptions::default()
        },
    )
    .unwrap()
    .run(&mut ranking)
    .unwrap();

    assert_eq!(outcome.aborted, Some(AbortReason::CallLimit));
    assert!(outcome.stats.calls <= 26);
    let report = SearchReport::build(&store, &ranking, Some(&outcome)).unwrap();
    assert!(!report.complete);
    assert_eq!(report.cliques.len(), 4);
    let found = sizes(&report);
    assert!(found.windows(2).all(|w| w[0] >= w[1]), "{found:?}");
}
