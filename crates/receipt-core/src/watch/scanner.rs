//! Orchestration: change events and batch enumeration driving
//! image pipeline → parser → ledger.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::models::config::ScannerConfig;
use crate::models::record::ReceiptRecord;
use crate::ocr::{ImagePipeline, OcrEngine, TesseractEngine};
use crate::receipt::{ReceiptParser, RuleBasedParser};
use crate::sink::{CsvLedger, RecordSink};

use super::files::{enumerate_receipts, wait_until_settled};
use super::source::ChangeSource;

/// How long the run loop waits for an event before re-checking for shutdown.
const LIVENESS_CHECK: Duration = Duration::from_millis(250);

/// Upper bound on waiting for a file that is still being written.
const MAX_SETTLE_WAIT: Duration = Duration::from_secs(30);

/// What happened to one candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Parsed (and appended unless in dry-run mode).
    Processed(ReceiptRecord),
    /// Not a receipt image.
    Skipped(SkipReason),
    /// Processing failed; the message was logged.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Directory,
    UnsupportedExtension,
}

/// Counts from a batch pass over existing files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Processed(_) => self.processed += 1,
            FileOutcome::Failed(_) => self.failed += 1,
            FileOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.processed + self.failed + self.skipped
    }
}

/// Drives receipts from the watch directory into the ledger.
///
/// The scanner holds only configuration and stateless components, so every
/// file is handled independently and one failure never affects the next.
pub struct ReceiptScanner<E: OcrEngine, S: RecordSink = CsvLedger> {
    config: ScannerConfig,
    pipeline: ImagePipeline<E>,
    parser: RuleBasedParser,
    sink: S,
}

impl ReceiptScanner<TesseractEngine, CsvLedger> {
    /// Scanner using Tesseract and a CSV ledger at `config.output_csv`.
    pub fn from_config(config: ScannerConfig) -> Self {
        let pipeline = ImagePipeline::from_config(&config.ocr);
        let sink = CsvLedger::new(config.output_csv.clone());
        Self::new(config, pipeline, sink)
    }
}

impl<E: OcrEngine, S: RecordSink> ReceiptScanner<E, S> {
    pub fn new(config: ScannerConfig, pipeline: ImagePipeline<E>, sink: S) -> Self {
        Self {
            config,
            pipeline,
            parser: RuleBasedParser::new(),
            sink,
        }
    }

    /// Replace the parser, e.g. to pin the reference date.
    pub fn with_parser(mut self, parser: RuleBasedParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// OCR one image, parse it, and append the record unless in dry-run mode.
    pub fn process_receipt(&self, path: &Path) -> Result<ReceiptRecord> {
        let start = Instant::now();
        info!("Processing receipt: {}", path.display());

        let text = self.pipeline.extract_text(path)?;
        if text.trim().is_empty() {
            warn!("No text detected in {}", path.display());
        }

        let result = self.parser.parse(&text);
        for warning in &result.warnings {
            warn!("{}: {}", path.display(), warning);
        }
        let record = result.record;

        if self.config.dry_run {
            let json = serde_json::to_string(&record).unwrap_or_else(|_| format!("{:?}", record));
            info!("Dry run mode - record would be appended: {}", json);
        } else {
            self.sink.append(&record)?;
            info!(
                "Appended receipt to {} in {}ms",
                self.config.output_csv.display(),
                start.elapsed().as_millis()
            );
        }

        Ok(record)
    }

    /// Handle a "file created" notification. Never fails: errors are logged
    /// and reported as [`FileOutcome::Failed`].
    pub fn handle_created(&self, path: &Path) -> FileOutcome {
        if path.is_dir() {
            debug!("Skipping directory: {}", path.display());
            return FileOutcome::Skipped(SkipReason::Directory);
        }
        if !self.config.accepts(path) {
            debug!("Skipping unsupported file: {}", path.display());
            return FileOutcome::Skipped(SkipReason::UnsupportedExtension);
        }

        match self.process_receipt(path) {
            Ok(record) => FileOutcome::Processed(record),
            Err(e) => {
                error!("Failed to process receipt {}: {}", path.display(), e);
                FileOutcome::Failed(e.to_string())
            }
        }
    }

    /// Handle a change-source event: wait until the file stops growing, then
    /// [`handle_created`](Self::handle_created).
    pub fn handle_event(&self, path: &Path) -> FileOutcome {
        let interval = self.config.settle_interval();
        if !interval.is_zero()
            && path.is_file()
            && self.config.accepts(path)
            && !wait_until_settled(path, interval, MAX_SETTLE_WAIT)
        {
            debug!("{} is still changing, processing anyway", path.display());
        }
        self.handle_created(path)
    }

    /// Process every receipt already in the watch directory, in enumeration order.
    pub fn process_existing(&self) -> Result<BatchSummary> {
        self.process_existing_with(|_, _| {})
    }

    /// Like [`process_existing`](Self::process_existing), calling `on_file`
    /// after each file.
    pub fn process_existing_with(
        &self,
        on_file: impl FnMut(&Path, &FileOutcome),
    ) -> Result<BatchSummary> {
        let paths = self.enumerate()?;
        info!(
            "Processing {} existing receipts in {}",
            paths.len(),
            self.config.watch_dir.display()
        );

        Ok(self.process_paths(&paths, on_file))
    }

    /// Handle each path in order, isolating failures.
    pub fn process_paths(
        &self,
        paths: &[PathBuf],
        mut on_file: impl FnMut(&Path, &FileOutcome),
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for path in paths {
            let outcome = self.handle_created(path);
            summary.record(&outcome);
            on_file(path, &outcome);
        }
        summary
    }

    /// Receipt images currently in the watch directory.
    pub fn enumerate(&self) -> Result<Vec<PathBuf>> {
        self.config.ensure_directories()?;
        Ok(enumerate_receipts(
            &self.config.watch_dir,
            &self.config.supported_extensions,
            self.config.recursive,
        )?)
    }

    /// Watch for new files until `shutdown` is set or the source goes away.
    ///
    /// Events are handled one at a time on the calling thread. The source is
    /// stopped before returning whenever subscription succeeded.
    pub fn run(&self, source: &mut dyn ChangeSource, shutdown: &AtomicBool) -> Result<()> {
        self.config.ensure_directories()?;

        let (tx, rx) = mpsc::channel();
        source.subscribe(&self.config.watch_dir, self.config.recursive, tx)?;
        info!(
            "Watching directory: {} ({} events)",
            self.config.watch_dir.display(),
            source.name()
        );

        loop {
            if shutdown.load(Ordering::SeqCst) {
                info!("Stopping receipt scanner...");
                break;
            }

            match rx.recv_timeout(LIVENESS_CHECK) {
                Ok(path) => {
                    self.handle_event(&path);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Change source {} closed its event stream", source.name());
                    break;
                }
            }
        }

        source.stop()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::mpsc::Sender;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use chrono::NaiveDate;
    use image::{GrayImage, Luma};
    use pretty_assertions::assert_eq;

    use crate::error::{OcrError, SinkError, WatchError};
    use crate::ocr::PageSegMode;
    use crate::watch::PollingSource;

    const RECEIPT_TEXT: &str =
        "株式会社テスト\n内訳：文房具\n合計 1,500円\n2024年3月15日\nT12-345678-90123\n\u{0c}";

    struct StubEngine(&'static str);

    impl OcrEngine for StubEngine {
        fn recognize(&self, _: &GrayImage, _: &str, _: PageSegMode) -> std::result::Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Clone, Default)]
    struct MemorySink(Arc<Mutex<Vec<ReceiptRecord>>>);

    impl MemorySink {
        fn records(&self) -> Vec<ReceiptRecord> {
            self.0.lock().unwrap().clone()
        }
    }

    impl RecordSink for MemorySink {
        fn append(&self, record: &ReceiptRecord) -> std::result::Result<(), SinkError> {
            self.0.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    /// Sends a fixed list of paths on subscribe, then closes the stream.
    struct ScriptedSource {
        paths: Vec<PathBuf>,
        stopped: Arc<AtomicBool>,
    }

    impl ChangeSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn subscribe(
            &mut self,
            _root: &Path,
            _recursive: bool,
            events: Sender<PathBuf>,
        ) -> std::result::Result<(), WatchError> {
            for path in self.paths.drain(..) {
                events.send(path).unwrap();
            }
            Ok(())
        }

        fn stop(&mut self) -> std::result::Result<(), WatchError> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn write_png(path: &Path) {
        GrayImage::from_pixel(24, 12, Luma([200])).save(path).unwrap();
    }

    fn scanner(config: ScannerConfig, sink: MemorySink) -> ReceiptScanner<StubEngine, MemorySink> {
        ReceiptScanner::new(config, ImagePipeline::new(StubEngine(RECEIPT_TEXT)), sink)
            .with_parser(RuleBasedParser::new().with_reference_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()))
    }

    fn expected_record() -> ReceiptRecord {
        ReceiptRecord::new("2024-03-15", "株式会社テスト", "内訳：文房具", "¥1,500", "T12-345678-90123")
    }

    #[test]
    fn test_process_receipt_appends_record() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("r.png");
        write_png(&image);
        let sink = MemorySink::default();

        let record = scanner(ScannerConfig::new(dir.path(), dir.path().join("l.csv")), sink.clone())
            .process_receipt(&image)
            .unwrap();

        assert_eq!(record, expected_record());
        assert_eq!(sink.records(), vec![expected_record()]);
    }

    #[test]
    fn test_dry_run_skips_sink() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("r.png");
        write_png(&image);
        let mut config = ScannerConfig::new(dir.path(), dir.path().join("l.csv"));
        config.dry_run = true;
        let sink = MemorySink::default();

        let record = scanner(config, sink.clone()).process_receipt(&image).unwrap();

        assert_eq!(record, expected_record());
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_reprocessing_appends_twice() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("r.png");
        write_png(&image);
        let sink = MemorySink::default();
        let scanner = scanner(ScannerConfig::new(dir.path(), dir.path().join("l.csv")), sink.clone());

        scanner.process_receipt(&image).unwrap();
        scanner.process_receipt(&image).unwrap();

        assert_eq!(sink.records().len(), 2);
    }

    #[test]
    fn test_handle_created_filters() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("folder.png")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        let scanner = scanner(ScannerConfig::new(dir.path(), dir.path().join("l.csv")), MemorySink::default());

        assert_eq!(
            scanner.handle_created(&dir.path().join("folder.png")),
            FileOutcome::Skipped(SkipReason::Directory)
        );
        assert_eq!(
            scanner.handle_created(&dir.path().join("notes.txt")),
            FileOutcome::Skipped(SkipReason::UnsupportedExtension)
        );
    }

    #[test]
    fn test_handle_created_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.jpg");
        fs::write(&broken, b"not an image").unwrap();
        let scanner = scanner(ScannerConfig::new(dir.path(), dir.path().join("l.csv")), MemorySink::default());

        match scanner.handle_created(&broken) {
            FileOutcome::Failed(message) => assert!(message.contains("broken.jpg"), "{message}"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_process_existing_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("inbox");
        fs::create_dir_all(root.join("sub")).unwrap();
        write_png(&root.join("a.png"));
        fs::write(root.join("b.png"), b"corrupt").unwrap();
        write_png(&root.join("c.PNG"));
        fs::write(root.join("d.txt"), b"ignored").unwrap();
        write_png(&root.join("sub/e.png"));

        let sink = MemorySink::default();
        let scanner = scanner(ScannerConfig::new(&root, dir.path().join("l.csv")), sink.clone());

        let mut seen = Vec::new();
        let summary = scanner
            .process_existing_with(|path, _| seen.push(path.file_name().unwrap().to_string_lossy().into_owned()))
            .unwrap();

        assert_eq!(seen, ["a.png", "b.png", "c.PNG"]);
        assert_eq!(summary, BatchSummary { processed: 2, failed: 1, skipped: 0 });
        assert_eq!(summary.total(), 3);
        assert_eq!(sink.records().len(), 2);
    }

    #[test]
    fn test_process_existing_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("inbox");
        fs::create_dir_all(root.join("sub")).unwrap();
        write_png(&root.join("a.png"));
        write_png(&root.join("sub/e.png"));

        let mut config = ScannerConfig::new(&root, dir.path().join("l.csv"));
        config.recursive = true;
        let sink = MemorySink::default();

        let summary = scanner(config, sink.clone()).process_existing().unwrap();

        assert_eq!(summary.processed, 2);
    }

    #[test]
    fn test_process_existing_creates_watch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("not-yet");
        let scanner = scanner(ScannerConfig::new(&root, dir.path().join("l.csv")), MemorySink::default());

        let summary = scanner.process_existing().unwrap();

        assert_eq!(summary, BatchSummary::default());
        assert!(root.is_dir());
    }

    #[test]
    fn test_handle_event_waits_for_slow_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow.png");
        let mut png = std::io::Cursor::new(Vec::new());
        GrayImage::from_pixel(24, 12, Luma([200]))
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();
        let bytes = png.into_inner();

        let mut file = fs::File::create(&path).unwrap();
        let writer = thread::spawn(move || {
            use std::io::Write;
            for chunk in bytes.chunks(8) {
                file.write_all(chunk).unwrap();
                thread::sleep(Duration::from_millis(20));
            }
        });
        thread::sleep(Duration::from_millis(30));

        let mut config = ScannerConfig::new(dir.path(), dir.path().join("l.csv"));
        config.settle_secs = 0.1;
        let sink = MemorySink::default();
        let outcome = scanner(config, sink.clone()).handle_event(&path);
        writer.join().unwrap();

        assert_eq!(outcome, FileOutcome::Processed(expected_record()));
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn test_handle_event_skips_without_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ScannerConfig::new(dir.path(), dir.path().join("l.csv"));
        config.settle_secs = 60.0;
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let start = Instant::now();
        let outcome = scanner(config, MemorySink::default()).handle_event(&dir.path().join("notes.txt"));

        assert_eq!(outcome, FileOutcome::Skipped(SkipReason::UnsupportedExtension));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_run_handles_events_in_order_and_stops_source() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"));
        fs::write(dir.path().join("b.png"), b"corrupt").unwrap();
        write_png(&dir.path().join("c.png"));

        let stopped = Arc::new(AtomicBool::new(false));
        let mut source = ScriptedSource {
            paths: vec![
                dir.path().join("a.png"),
                dir.path().join("b.png"),
                dir.path().join("readme.md"),
                dir.path().join("c.png"),
            ],
            stopped: Arc::clone(&stopped),
        };
        let sink = MemorySink::default();
        let scanner = scanner(ScannerConfig::new(dir.path(), dir.path().join("l.csv")), sink.clone());

        scanner.run(&mut source, &AtomicBool::new(false)).unwrap();

        assert!(stopped.load(Ordering::SeqCst));
        assert_eq!(sink.records().len(), 2);
    }

    #[test]
    fn test_run_returns_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let stopped = Arc::new(AtomicBool::new(false));
        let mut source = ScriptedSource {
            paths: vec![dir.path().join("a.png")],
            stopped: Arc::clone(&stopped),
        };
        write_png(&dir.path().join("a.png"));
        let sink = MemorySink::default();
        let scanner = scanner(ScannerConfig::new(dir.path(), dir.path().join("l.csv")), sink.clone());

        scanner.run(&mut source, &AtomicBool::new(true)).unwrap();

        assert!(stopped.load(Ordering::SeqCst));
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_run_with_polling_source() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::default();
        let scanner = scanner(ScannerConfig::new(dir.path(), dir.path().join("l.csv")), sink.clone());
        let mut source = PollingSource::new(Duration::from_millis(20));
        let shutdown = Arc::new(AtomicBool::new(false));

        let helper = {
            let root = dir.path().to_path_buf();
            let sink = sink.clone();
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                // Rename so the poller never sees a half-written image.
                GrayImage::from_pixel(24, 12, Luma([200]))
                    .save_with_format(root.join("new.part"), image::ImageFormat::Png)
                    .unwrap();
                fs::rename(root.join("new.part"), root.join("new.png")).unwrap();
                let deadline = Instant::now() + Duration::from_secs(10);
                while sink.records().is_empty() && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(20));
                }
                shutdown.store(true, Ordering::SeqCst);
            })
        };

        scanner.run(&mut source, &shutdown).unwrap();
        helper.join().unwrap();

        assert_eq!(sink.records(), vec![expected_record()]);
    }
}
