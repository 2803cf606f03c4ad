//! Logging Tests
//!
//! Skipped and failed items each leave a log line naming their submission.

mod common;

use std::io;
use std::sync::Arc;

use common::{event_log, orchestrator, test_settings, FakeFetcher, FakeResponse, FakeSourceClient};
use harvester::{DatasetDirectory, Source, Submission};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Shared buffer the fmt layer writes into
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's events into a buffer for the guard's lifetime
fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    (captured, tracing::subscriber::set_default(subscriber))
}

#[tokio::test]
async fn test_timed_out_item_is_logged_with_its_submission() {
    let (captured, _guard) = capture();

    let temp = TempDir::new().unwrap();
    let dataset = Arc::new(DatasetDirectory::open(temp.path()).await.unwrap());
    let log = event_log();

    let client = FakeSourceClient::new(log.clone()).with_listing(
        "alpha",
        vec![
            Submission::new("a", "Street", "https://i.redd.it/a.jpg"),
            Submission::new("b", "Stuck", "https://i.redd.it/b.jpg"),
        ],
    );
    let fetcher = FakeFetcher::new(log.clone())
        .with("https://i.redd.it/a.jpg", FakeResponse::image("image/jpeg"))
        .with("https://i.redd.it/b.jpg", FakeResponse::Hang);

    let catalog = vec![Source::new("alpha", "Photography")];
    let report = orchestrator(client, fetcher, dataset, test_settings())
        .run(&catalog)
        .await;
    assert_eq!(report.sources[0].saved(), 1);

    let output = captured.text();
    let line = output
        .lines()
        .find(|l| l.contains("Skipping media item") && l.contains("submission=b"))
        .unwrap_or_else(|| panic!("no timeout warning in:\n{}", output));
    assert!(line.contains("WARN"));
    assert!(line.contains("Timeout"));
    assert!(output.contains("Saved alphaa_a.jpg"));
}

#[tokio::test]
async fn test_skipped_submissions_are_logged() {
    let (captured, _guard) = capture();

    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("alphaold_old.jpg"), b"old").unwrap();
    let dataset = Arc::new(DatasetDirectory::open(temp.path()).await.unwrap());
    let log = event_log();

    let empty = Submission::new("g9", "Removed gallery", "https://www.reddit.com/gallery/g9");
    let client = FakeSourceClient::new(log.clone())
        .with_listing(
            "alpha",
            vec![
                empty.clone(),
                Submission::new("old", "Already here", "https://i.redd.it/old.jpg"),
            ],
        )
        .with_detail(empty.with_media([]));

    let catalog = vec![Source::new("alpha", "Art")];
    orchestrator(client, FakeFetcher::new(log.clone()), dataset, test_settings())
        .run(&catalog)
        .await;

    let output = captured.text();
    assert!(
        output
            .lines()
            .any(|l| l.contains("submission=g9") && l.contains("no downloadable media")),
        "missing empty-gallery skip in:\n{}",
        output
    );
    assert!(
        output
            .lines()
            .any(|l| l.contains("submission=old") && l.contains("already exists")),
        "missing dedup skip in:\n{}",
        output
    );
}
