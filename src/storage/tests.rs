use super::*;
use crate::error::CliqueError;
use crate::types::VertexId;

fn backends() -> Vec<(&'static str, Box<dyn GraphStore>)> {
    vec![
        ("memory", Box::new(MemoryGraphStore::new())),
        (
            "sqlite",
            Box::new(SqliteGraphStore::in_memory(StoreOptions::default()).unwrap()),
        ),
    ]
}

fn ids(raw: &[u64]) -> VertexSet {
    raw.iter().copied().map(VertexId).collect()
}

#[test]
fn intern_is_idempotent_and_resolves() {
    for (name, mut store) in backends() {
        let a = store.intern("Alpha").unwrap();
        let b = store.intern("Beta").unwrap();
        assert_eq!(store.intern("Alpha").unwrap(), a, "{name}");
        assert_ne!(a, b, "{name}");
        assert_eq!(store.resolve(a).unwrap(), "Alpha", "{name}");
        assert_eq!(store.lookup("Beta").unwrap(), Some(b), "{name}");
        assert_eq!(store.lookup("Gamma").unwrap(), None, "{name}");
        assert_eq!(store.vertex_count().unwrap(), 2, "{name}");
    }
}

#[test]
fn resolve_unknown_id_is_not_found() {
    for (name, store) in backends() {
        let err = store.resolve(VertexId(42)).unwrap_err();
        assert!(
            matches!(err, CliqueError::VertexNotFound(VertexId(42))),
            "{name}: {err}"
        );
    }
}

#[test]
fn directional_queries_follow_edges() {
    for (name, mut store) in backends() {
        let a = store.intern("a").unwrap();
        let b = store.intern("b").unwrap();
        let c = store.intern("c").unwrap();
        store.insert_edges(&[(a, b), (a, c), (c, a)]).unwrap();
        assert_eq!(store.outgoing(a).unwrap(), ids(&[b.0, c.0]), "{name}");
        assert_eq!(store.incoming(a).unwrap(), ids(&[c.0]), "{name}");
        assert!(store.outgoing(b).unwrap().is_empty(), "{name}");
        assert_eq!(store.all_vertex_ids().unwrap(), ids(&[a.0, b.0, c.0]), "{name}");
        assert_eq!(store.edge_count().unwrap(), 3, "{name}");
    }
}

#[test]
fn duplicate_edges_keep_multiplicity_unless_deduplicated() {
    let opts = StoreOptions::default().dedup_edges(true);
    let mut plain = MemoryGraphStore::new();
    let mut dedup = MemoryGraphStore::with_options(&opts);
    let mut sqlite_dedup = SqliteGraphStore::in_memory(opts).unwrap();
    let stores: [&mut dyn GraphStore; 3] = [&mut plain, &mut dedup, &mut sqlite_dedup];
    let mut counts = Vec::new();
    for store in stores {
        let a = store.intern("a").unwrap();
        let b = store.intern("b").unwrap();
        store.insert_edge(a, b).unwrap();
        store.insert_edge(a, b).unwrap();
        assert_eq!(store.outgoing(a).unwrap(), ids(&[b.0]));
        counts.push(store.edge_count().unwrap());
    }
    assert_eq!(counts, vec![2, 1, 1]);
}

#[test]
fn sealed_store_rejects_writes() {
    for (name, mut store) in backends() {
        let a = store.intern("a").unwrap();
        store.seal().unwrap();
        assert!(store.is_sealed(), "{name}");
        assert!(matches!(store.intern("new"), Err(CliqueError::Sealed)), "{name}");
        assert!(matches!(store.insert_edge(a, a), Err(CliqueError::Sealed)), "{name}");
        assert_eq!(store.intern("a").unwrap(), a, "{name}: existing labels still resolve");
    }
}

#[test]
fn edges_require_interned_endpoints() {
    for (name, mut store) in backends() {
        let a = store.intern("a").unwrap();
        assert!(store.insert_edge(a, VertexId(99)).is_err(), "{name}");
    }
}

#[test]
fn create_refuses_existing_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.sqlite");
    drop(SqliteGraphStore::create(&path, StoreOptions::default()).unwrap());
    let err = SqliteGraphStore::create(&path, StoreOptions::default())
        .err()
        .expect("second create must fail");
    assert!(matches!(err, CliqueError::StoreExists(_)));
}

#[test]
fn open_missing_store_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = SqliteGraphStore::open(dir.path().join("absent.sqlite"), StoreOptions::default())
        .err()
        .expect("open must fail");
    assert!(matches!(err, CliqueError::MissingStore(_)));
}
