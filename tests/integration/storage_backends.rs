#![allow(missing_docs)]

use linkclique::search::NeighborResolver;
use linkclique::storage::{
    EdgeStore, GraphStore, MemoryGraphStore, SqliteGraphStore, StoreOptions, VertexCatalog,
};
use linkclique::{CliqueError, VertexId, VertexSet};
use tempfile::TempDir;

const LINKS: &[(&str, &str)] = &[
    ("A", "B"),
    ("A", "B"),
    ("B", "A"),
    ("B", "C"),
    ("C", "B"),
    ("C", "C"),
    ("D", "A"),
];

fn load(store: &mut dyn GraphStore) {
    store.begin_bulk().expect("begin");
    for (from, to) in LINKS {
        let from = store.intern(from).expect("intern");
        let to = store.intern(to).expect("intern");
        store.insert_edge(from, to).expect("edge");
    }
    store.commit_bulk().expect("commit");
    store.seal().expect("seal");
}

fn neighbor_labels<S: GraphStore + ?Sized>(store: &S, label: &str) -> Vec<String> {
    let id = store.lookup(label).expect("lookup").expect("known label");
    let mut resolver = NeighborResolver::new(store, 16);
    let mut labels: Vec<String> = resolver
        .neighbors_of(id)
        .expect("neighbors")
        .iter()
        .map(|&n| store.resolve(n).expect("resolve"))
        .collect();
    labels.sort();
    labels
}

#[test]
fn backends_agree_on_mutual_neighbors() {
    let dir = TempDir::new().expect("tempdir");
    let mut sqlite =
        SqliteGraphStore::create(dir.path().join("graph.sqlite"), StoreOptions::default())
            .expect("create");
    let mut memory = MemoryGraphStore::new();
    load(&mut sqlite);
    load(&mut memory);

    for label in ["A", "B", "C", "D"] {
        assert_eq!(
            neighbor_labels(&sqlite, label),
            neighbor_labels(&memory, label),
            "neighbors of {label}"
        );
    }
    assert_eq!(neighbor_labels(&sqlite, "B"), ["A", "C"]);
    assert!(neighbor_labels(&sqlite, "C").iter().all(|l| l != "C"));
    assert!(neighbor_labels(&memory, "D").is_empty());
}

#[test]
fn duplicate_edges_do_not_change_neighbors() {
    let mut once = MemoryGraphStore::new();
    let mut twice = MemoryGraphStore::new();
    for (store, copies) in [(&mut once, 1), (&mut twice, 2)] {
        let a = store.intern("A").unwrap();
        let b = store.intern("B").unwrap();
        for _ in 0..copies {
            store.insert_edge(a, b).unwrap();
        }
        store.insert_edge(b, a).unwrap();
    }
    let a = VertexId(1);
    let expected: VertexSet = [VertexId(2)].into_iter().collect();
    assert_eq!(*NeighborResolver::new(&once, 4).neighbors_of(a).unwrap(), expected);
    assert_eq!(*NeighborResolver::new(&twice, 4).neighbors_of(a).unwrap(), expected);
    assert_eq!(twice.edge_count().unwrap(), 3);
}

#[test]
fn reopened_store_is_read_only_after_seal() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("graph.sqlite");
    {
        let mut store = SqliteGraphStore::create(&path, StoreOptions::durable()).expect("create");
        load(&mut store);
    }
    let mut store = SqliteGraphStore::open(&path, StoreOptions::default()).expect("open");
    assert_eq!(store.vertex_count().unwrap(), 4);
    assert_eq!(store.edge_count().unwrap(), LINKS.len() as u64);
    store.seal().expect("seal");
    let a = store.lookup("A").unwrap().unwrap();
    assert!(matches!(store.insert_edge(a, a), Err(CliqueError::Sealed)));
}
