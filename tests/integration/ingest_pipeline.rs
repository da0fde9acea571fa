#![allow(missing_docs)]

use std::fs;
use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use linkclique::ingest::{DocumentReader, IngestOptions, Ingestor, InputFormat, ReaderOptions};
use linkclique::storage::{EdgeStore, GraphStore, SqliteGraphStore, StoreOptions, VertexCatalog};
use linkclique::CliqueError;
use tempfile::TempDir;

fn reader_for(path: &std::path::Path, has_header: bool) -> DocumentReader {
    let format = InputFormat::detect(path).expect("known extension");
    DocumentReader::open(path, ReaderOptions { format, has_header }).expect("open input")
}

#[test]
fn csv_file_ingests_into_sqlite() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("links.csv");
    fs::write(&input, "source,target\nA,B\nA,C\nB,A\nC,A\nIsland,\n").unwrap();
    let mut store =
        SqliteGraphStore::create(dir.path().join("g.sqlite"), StoreOptions::default()).unwrap();

    let stats = {
        let mut ingestor = Ingestor::new(&mut store, IngestOptions::default()).unwrap();
        ingestor.ingest_all(reader_for(&input, true)).unwrap();
        ingestor.finish().unwrap()
    };
    store.seal().unwrap();

    assert_eq!(stats.documents, 4);
    assert_eq!(stats.vertices, 4);
    assert_eq!(stats.edges_inserted, 4);
    let island = store.lookup("Island").unwrap().expect("declared vertex");
    assert!(store.outgoing(island).unwrap().is_empty());
    assert!(store.lookup("source").unwrap().is_none(), "header row is skipped");
}

#[test]
fn gzipped_json_lines_ingest_with_deferred_indexes() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("links.jsonl.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&input).unwrap(), Compression::fast());
    for line in [
        r#"{"source": "A", "targets": ["B", "C"]}"#,
        "",
        r#"{"source": "B", "targets": ["A", "C"]}"#,
        r#"{"source": "C", "targets": ["A", "B"]}"#,
    ] {
        writeln!(encoder, "{line}").unwrap();
    }
    encoder.finish().unwrap();

    let opts = StoreOptions::default().defer_indexes(true).dedup_edges(true);
    let mut store = SqliteGraphStore::create(dir.path().join("g.sqlite"), opts).unwrap();
    let ingest = IngestOptions {
        batch_documents: 2,
        ..IngestOptions::default()
    };
    let stats = {
        let mut ingestor = Ingestor::new(&mut store, ingest).unwrap();
        ingestor.ingest_all(reader_for(&input, false)).unwrap();
        ingestor.finish().unwrap()
    };
    store.seal().unwrap();
    assert_eq!(stats.documents, 3);
    assert_eq!(store.edge_count().unwrap(), 6);
}

#[test]
fn malformed_input_aborts_ingestion() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("links.jsonl");
    fs::write(&input, "{\"source\": \"A\", \"targets\": [\"B\"]}\nnot json\n").unwrap();
    let mut store = SqliteGraphStore::in_memory(StoreOptions::default()).unwrap();
    let mut ingestor = Ingestor::new(&mut store, IngestOptions::default()).unwrap();
    let err = ingestor.ingest_all(reader_for(&input, false)).unwrap_err();
    assert!(matches!(err, CliqueError::Input { line: 2, .. }));
}
