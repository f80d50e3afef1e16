// Integration tests for the concurrent index writer

use catalog_search::core::error::{CatalogError, Result};
use catalog_search::core::indexer::{
    ConcurrentIndexWriter, DocumentEncoder, DocumentMapper, DocumentSink,
};
use catalog_search::core::schema::{EntitySchema, SchemaCatalog};
use catalog_search::core::types::Row;
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tantivy::TantivyDocument;

/// Sink whose `add` blocks until the gate's sender is dropped
struct GatedSink {
    gate: Receiver<()>,
    added: Arc<AtomicU64>,
}

impl DocumentSink for GatedSink {
    fn add(&mut self, _doc: TantivyDocument) -> Result<()> {
        let _ = self.gate.recv();
        self.added.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&mut self) -> Result<u64> {
        Ok(1)
    }
}

/// Sink that fails on its n-th document
struct FailingSink {
    added: u64,
    fail_on: u64,
}

impl DocumentSink for FailingSink {
    fn add(&mut self, _doc: TantivyDocument) -> Result<()> {
        self.added += 1;
        if self.added == self.fail_on {
            return Err(CatalogError::Commit("segment write failed".to_string()));
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<u64> {
        Ok(1)
    }
}

fn label_schema() -> EntitySchema {
    SchemaCatalog::builtin()
        .unwrap()
        .get("label")
        .unwrap()
        .clone()
}

fn label_row(id: u64) -> Row {
    Row::new(id).column("name", format!("Label {id}"))
}

#[test]
fn test_stalled_sink_blocks_producer_without_losing_documents() {
    let schema = label_schema();
    let encoder = DocumentEncoder::new("label", &schema.to_tantivy());
    let (gate_tx, gate_rx) = bounded::<()>(0);
    let added = Arc::new(AtomicU64::new(0));
    let sink = GatedSink {
        gate: gate_rx,
        added: Arc::clone(&added),
    };

    let mut writer = ConcurrentIndexWriter::new(encoder, sink, 2, 1).unwrap();
    let submitted = Arc::new(AtomicU64::new(0));

    let producer = {
        let submitted = Arc::clone(&submitted);
        std::thread::spawn(move || {
            let mapper = DocumentMapper::new(&schema);
            for id in 1..=100 {
                writer.submit(mapper.map(&label_row(id)).unwrap()).unwrap();
                submitted.fetch_add(1, Ordering::SeqCst);
            }
            writer
        })
    };

    std::thread::sleep(Duration::from_millis(300));
    let in_flight = submitted.load(Ordering::SeqCst);
    // Task queue (2) + worker (1) + encoded queue (2) + committer (1)
    assert!(
        in_flight <= 8,
        "producer should block on a full queue, got {in_flight} submitted"
    );
    assert_eq!(added.load(Ordering::SeqCst), 0);

    drop(gate_tx);
    let writer = producer.join().expect("producer panicked");
    let (_sink, stats) = writer.flush().unwrap();

    assert_eq!(stats.submitted, 100);
    assert_eq!(stats.committed, 100);
    assert_eq!(added.load(Ordering::SeqCst), 100);
}

#[test]
fn test_many_workers_commit_every_document() {
    let schema = label_schema();
    let mapper = DocumentMapper::new(&schema);
    let encoder = DocumentEncoder::new("label", &schema.to_tantivy());
    let (gate_tx, gate_rx) = bounded::<()>(0);
    drop(gate_tx);
    let added = Arc::new(AtomicU64::new(0));
    let sink = GatedSink {
        gate: gate_rx,
        added: Arc::clone(&added),
    };

    let mut writer = ConcurrentIndexWriter::new(encoder, sink, 4, 4).unwrap();
    for id in 1..=1000 {
        writer.submit(mapper.map(&label_row(id)).unwrap()).unwrap();
    }
    let (_sink, stats) = writer.flush().unwrap();

    assert_eq!(stats.committed, 1000);
    assert_eq!(added.load(Ordering::SeqCst), 1000);
}

#[test]
fn test_first_sink_error_fails_flush() {
    let schema = label_schema();
    let mapper = DocumentMapper::new(&schema);
    let encoder = DocumentEncoder::new("label", &schema.to_tantivy());
    let sink = FailingSink {
        added: 0,
        fail_on: 3,
    };

    let mut writer = ConcurrentIndexWriter::new(encoder, sink, 2, 2).unwrap();
    for id in 1..=200 {
        // Submission fails fast once the committer has failed
        if writer.submit(mapper.map(&label_row(id)).unwrap()).is_err() {
            break;
        }
    }

    let err = writer.flush().err().expect("flush should fail");
    assert!(matches!(err, CatalogError::Commit(_)), "got {err:?}");
}
