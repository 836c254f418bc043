//! Ingestion pipeline: fetch, parse, and persist a batch of report files.
//!
//! Every eligible file is processed by its own task. Tasks wait on a
//! semaphore of [`MAX_CONCURRENT_FILES`] permits before doing any work, so at
//! most that many files are fetched, parsed, and persisted at once.
//!
//! Tasks are detached from the caller: once spawned, a file runs to
//! completion even if the `ingest` future is dropped.
//!
//! The batch is all-or-nothing towards the caller: the first recorded error
//! is returned and every collected report is discarded. Rows written before
//! the failure stay written; there is no rollback across files.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::Instrument;
use uuid::Uuid;

use crate::db::ScanWriter;
use crate::errors::IngestError;
use crate::models::scan::ScanReport;
use crate::parsers;
use crate::services::fetcher::Fetch;

/// Upper bound on files processed simultaneously within one batch.
pub const MAX_CONCURRENT_FILES: usize = 3;

/// Suffix a file name must carry to be ingested.
pub const REPORT_FILE_SUFFIX: &str = ".json";

/// Whether a file name is eligible for ingestion (case-sensitive suffix match).
pub fn is_report_file(file_name: &str) -> bool {
    file_name.ends_with(REPORT_FILE_SUFFIX)
}

/// Coordinates concurrent ingestion of report files into a scan store.
#[derive(Debug)]
pub struct Ingestor<F, S> {
    fetcher: Arc<F>,
    store: Arc<S>,
}

impl<F, S> Ingestor<F, S>
where
    F: Fetch + 'static,
    S: ScanWriter + 'static,
{
    pub fn new(fetcher: F, store: S) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            store: Arc::new(store),
        }
    }

    /// Ingest `files` from `source`, returning every persisted report.
    ///
    /// Non-JSON names are skipped. Report order is not related to the order
    /// of `files`. On any fetch or persistence failure the first recorded
    /// error is returned instead of the reports.
    pub async fn ingest(
        &self,
        source: &str,
        files: &[String],
    ) -> Result<Vec<ScanReport>, IngestError> {
        let batch_id = Uuid::now_v7();
        let span = tracing::info_span!("ingest", %batch_id, source = %source);

        async {
            let limiter = Arc::new(Semaphore::new(MAX_CONCURRENT_FILES));
            let batch = Arc::new(Batch::default());
            let source: Arc<str> = Arc::from(source);
            let mut tasks = Vec::new();

            for file_name in files {
                if !is_report_file(file_name) {
                    tracing::info!(file = %file_name, "Skipping non-JSON file");
                    continue;
                }

                let fetcher = Arc::clone(&self.fetcher);
                let store = Arc::clone(&self.store);
                let batch = Arc::clone(&batch);
                let limiter = Arc::clone(&limiter);
                let source = Arc::clone(&source);
                let file_name = file_name.clone();
                let span = tracing::info_span!("file", file = %file_name);

                tasks.push(tokio::spawn(
                    async move {
                        let _permit = match acquire_slot(limiter).await {
                            Ok(permit) => permit,
                            Err(err) => {
                                batch.record_error(err).await;
                                return;
                            }
                        };
                        if batch.has_failed().await {
                            tracing::debug!("Batch already failed, skipping file");
                            return;
                        }
                        if let Err(err) =
                            process_file(fetcher.as_ref(), store.as_ref(), &batch, &source, &file_name)
                                .await
                        {
                            tracing::error!(error = %err, "File ingestion failed");
                            batch.record_error(err).await;
                        }
                    }
                    .instrument(span),
                ));
            }

            // Dropped handles detach; a dispatched file finishes even if this future is dropped.
            for task in tasks {
                if let Err(e) = task.await {
                    batch.record_error(IngestError::Task(e.to_string())).await;
                }
            }

            let outcome = batch.finish().await;
            match &outcome {
                Ok(reports) => {
                    tracing::info!(total = reports.len(), "Completed ingestion batch");
                }
                Err(err) => tracing::error!(error = %err, "Ingestion batch failed"),
            }
            outcome
        }
        .instrument(span)
        .await
    }
}

/// Wait for one of the batch's file slots.
async fn acquire_slot(limiter: Arc<Semaphore>) -> Result<OwnedSemaphorePermit, IngestError> {
    limiter
        .acquire_owned()
        .await
        .map_err(|_| IngestError::Task("file limiter closed".to_string()))
}

/// State shared by the tasks of one batch.
#[derive(Debug, Default)]
struct Batch {
    reports: Mutex<Vec<ScanReport>>,
    first_error: Mutex<Option<IngestError>>,
}

impl Batch {
    async fn push(&self, report: ScanReport) {
        self.reports.lock().await.push(report);
    }

    /// Keep `err` if it is the first error of the batch.
    async fn record_error(&self, err: IngestError) {
        let mut slot = self.first_error.lock().await;
        if slot.is_none() {
            *slot = Some(err);
        } else {
            tracing::debug!(error = %err, "Additional ingestion error");
        }
    }

    async fn has_failed(&self) -> bool {
        self.first_error.lock().await.is_some()
    }

    /// The first error if any, otherwise all collected reports.
    async fn finish(&self) -> Result<Vec<ScanReport>, IngestError> {
        if let Some(err) = self.first_error.lock().await.take() {
            return Err(err);
        }
        Ok(std::mem::take(&mut *self.reports.lock().await))
    }
}

/// Fetch, parse, and persist one file, appending each persisted report to the batch.
///
/// Stops at the first failure; reports of the file persisted before it stay
/// in the batch (and are discarded with it).
async fn process_file<F: Fetch, S: ScanWriter>(
    fetcher: &F,
    store: &S,
    batch: &Batch,
    source: &str,
    file_name: &str,
) -> Result<(), IngestError> {
    let content = fetcher.fetch(source, file_name).await?;

    let reports = parsers::parse(&content, file_name);
    if reports.is_empty() {
        tracing::warn!("No scan reports parsed from file");
        return Ok(());
    }

    for report in reports {
        persist_report(store, &report).await?;
        tracing::debug!(scan_id = %report.scan_id, "Persisted scan report");
        batch.push(report).await;
    }
    Ok(())
}

/// Write every row of a report in the fixed order: header, vulnerabilities
/// with their risk factors, summary, metadata with rules and excluded paths.
async fn persist_report<S: ScanWriter>(store: &S, report: &ScanReport) -> Result<(), IngestError> {
    let scan_id = report.scan_id.as_str();

    store
        .store_scan_header(report)
        .await
        .map_err(persist_error("scan result", scan_id))?;

    for vulnerability in &report.vulnerabilities {
        store
            .store_vulnerability(scan_id, vulnerability)
            .await
            .map_err(persist_error("vulnerability", scan_id))?;

        for risk_factor in &vulnerability.risk_factors {
            store
                .store_risk_factor(scan_id, &vulnerability.id, risk_factor)
                .await
                .map_err(persist_error("risk factor", scan_id))?;
        }
    }

    if let Some(summary) = &report.summary {
        store
            .store_summary(scan_id, summary)
            .await
            .map_err(persist_error("scan summary", scan_id))?;
    }

    if let Some(metadata) = &report.metadata {
        store
            .store_metadata(scan_id, metadata)
            .await
            .map_err(persist_error("scan metadata", scan_id))?;

        for rule in &metadata.scanning_rules {
            store
                .store_rule(scan_id, rule)
                .await
                .map_err(persist_error("scanning rule", scan_id))?;
        }

        for path in &metadata.excluded_paths {
            store
                .store_excluded_path(scan_id, path)
                .await
                .map_err(persist_error("excluded path", scan_id))?;
        }
    }

    Ok(())
}

fn persist_error<'a>(
    entity: &'static str,
    scan_id: &'a str,
) -> impl FnOnce(sqlx::Error) -> IngestError + 'a {
    move |source| IngestError::Persist {
        entity,
        scan_id: scan_id.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::errors::FetchError;
    use crate::models::scan::{ScanMetadata, ScanSummary};
    use crate::models::vulnerability::Vulnerability;

    /// In-memory fetcher with an optional delay and peak-concurrency tracking.
    #[derive(Default)]
    struct FakeFetcher {
        files: HashMap<String, Vec<u8>>,
        delay: Duration,
        calls: std::sync::Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeFetcher {
        fn with_files(files: &[(&str, String)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(name, body)| (name.to_string(), body.clone().into_bytes()))
                    .collect(),
                ..Self::default()
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> Vec<String> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort();
            calls
        }
    }

    impl Fetch for FakeFetcher {
        async fn fetch(&self, _source: &str, file_name: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.lock().unwrap().push(file_name.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.files.get(file_name).cloned().ok_or_else(|| FetchError::Local {
                file: file_name.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            })
        }
    }

    /// Store recording every write, optionally failing one kind of write.
    #[derive(Default)]
    struct RecordingStore {
        ops: std::sync::Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingStore {
        fn failing_on(kind: &'static str) -> Self {
            Self {
                fail_on: Some(kind),
                ..Self::default()
            }
        }

        fn record(&self, kind: &str, op: String) -> Result<(), sqlx::Error> {
            if self.fail_on == Some(kind) {
                return Err(sqlx::Error::Protocol(format!("injected {kind} failure")));
            }
            self.ops.lock().unwrap().push(op);
            Ok(())
        }

        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }
    }

    impl ScanWriter for RecordingStore {
        async fn store_scan_header(&self, report: &ScanReport) -> Result<(), sqlx::Error> {
            self.record("header", format!("header:{}", report.scan_id))
        }

        async fn store_vulnerability(
            &self,
            scan_id: &str,
            vulnerability: &Vulnerability,
        ) -> Result<(), sqlx::Error> {
            self.record("vulnerability", format!("vulnerability:{scan_id}:{}", vulnerability.id))
        }

        async fn store_risk_factor(
            &self,
            scan_id: &str,
            vulnerability_id: &str,
            risk_factor: &str,
        ) -> Result<(), sqlx::Error> {
            self.record(
                "risk_factor",
                format!("risk_factor:{scan_id}:{vulnerability_id}:{risk_factor}"),
            )
        }

        async fn store_summary(&self, scan_id: &str, _summary: &ScanSummary) -> Result<(), sqlx::Error> {
            self.record("summary", format!("summary:{scan_id}"))
        }

        async fn store_metadata(
            &self,
            scan_id: &str,
            _metadata: &ScanMetadata,
        ) -> Result<(), sqlx::Error> {
            self.record("metadata", format!("metadata:{scan_id}"))
        }

        async fn store_rule(&self, scan_id: &str, rule: &str) -> Result<(), sqlx::Error> {
            self.record("rule", format!("rule:{scan_id}:{rule}"))
        }

        async fn store_excluded_path(&self, scan_id: &str, path: &str) -> Result<(), sqlx::Error> {
            self.record("excluded_path", format!("excluded_path:{scan_id}:{path}"))
        }
    }

    /// Document holding one minimal report per scan id.
    fn document(scan_ids: &[&str]) -> String {
        let wrappers: Vec<_> = scan_ids
            .iter()
            .map(|id| serde_json::json!({"scanResults": {"scan_id": id}}))
            .collect();
        serde_json::to_string(&wrappers).unwrap()
    }

    fn full_document() -> String {
        serde_json::json!([{
            "scanResults": {
                "scan_id": "s1",
                "vulnerabilities": [
                    {"id": "v1", "severity": "High", "risk_factors": ["RF1", "RF2"]},
                    {"id": "v2", "severity": "Low"}
                ],
                "summary": {"total_vulnerabilities": 2},
                "scan_metadata": {
                    "scanning_rules": ["rule-a"],
                    "excluded_paths": ["vendor/"]
                }
            }
        }])
        .to_string()
    }

    fn names(files: &[&str]) -> Vec<String> {
        files.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn report_file_suffix_is_case_sensitive() {
        assert!(is_report_file("scan.json"));
        assert!(is_report_file("nested/dir/scan.json"));
        assert!(!is_report_file("scan.JSON"));
        assert!(!is_report_file("scan.json.bak"));
        assert!(!is_report_file("scan.txt"));
    }

    #[tokio::test]
    async fn skips_files_without_json_suffix() {
        let fetcher = FakeFetcher::with_files(&[("a.json", document(&["s1"]))]);
        let ingestor = Ingestor::new(fetcher, RecordingStore::default());

        let reports = ingestor
            .ingest("/repo", &names(&["a.json", "b.txt", "c.JSON", "d.json.bak"]))
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(ingestor.fetcher.calls(), vec!["a.json".to_string()]);
    }

    #[tokio::test]
    async fn returns_every_report_from_every_file() {
        let fetcher = FakeFetcher::with_files(&[
            ("a.json", document(&["s1", "s2"])),
            ("b.json", document(&["s3"])),
        ]);
        let ingestor = Ingestor::new(fetcher, RecordingStore::default());

        let reports = ingestor.ingest("/repo", &names(&["a.json", "b.json"])).await.unwrap();

        let mut ids: Vec<_> = reports.iter().map(|r| r.scan_id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
        assert!(reports
            .iter()
            .filter(|r| r.scan_id == "s3")
            .all(|r| r.source_file == "b.json"));
    }

    #[tokio::test]
    async fn empty_batch_returns_no_reports() {
        let ingestor = Ingestor::new(FakeFetcher::default(), RecordingStore::default());
        let reports = ingestor.ingest("/repo", &[]).await.unwrap();
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn persists_rows_in_fixed_order() {
        let fetcher = FakeFetcher::with_files(&[("a.json", full_document())]);
        let ingestor = Ingestor::new(fetcher, RecordingStore::default());

        ingestor.ingest("/repo", &names(&["a.json"])).await.unwrap();

        assert_eq!(
            ingestor.store.ops(),
            vec![
                "header:s1",
                "vulnerability:s1:v1",
                "risk_factor:s1:v1:RF1",
                "risk_factor:s1:v1:RF2",
                "vulnerability:s1:v2",
                "summary:s1",
                "metadata:s1",
                "rule:s1:rule-a",
                "excluded_path:s1:vendor/",
            ]
        );
    }

    #[tokio::test]
    async fn undecodable_document_is_not_an_error() {
        let fetcher = FakeFetcher::with_files(&[
            ("broken.json", "{not json".to_string()),
            ("good.json", document(&["s1"])),
        ]);
        let ingestor = Ingestor::new(fetcher, RecordingStore::default());

        let reports = ingestor
            .ingest("/repo", &names(&["broken.json", "good.json"]))
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].scan_id, "s1");
    }

    #[tokio::test]
    async fn fetch_failure_fails_the_batch() {
        let fetcher = FakeFetcher::with_files(&[("good.json", document(&["s1"]))]);
        let ingestor = Ingestor::new(fetcher, RecordingStore::default());

        let err = ingestor
            .ingest("/repo", &names(&["good.json", "missing.json"]))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Fetch(FetchError::Local { ref file, .. }) if file == "missing.json"));
    }

    #[tokio::test]
    async fn persist_failure_fails_the_batch_and_stops_the_report() {
        let fetcher = FakeFetcher::with_files(&[("a.json", full_document())]);
        let ingestor = Ingestor::new(fetcher, RecordingStore::failing_on("risk_factor"));

        let err = ingestor.ingest("/repo", &names(&["a.json"])).await.unwrap_err();

        match err {
            IngestError::Persist { entity, scan_id, .. } => {
                assert_eq!(entity, "risk factor");
                assert_eq!(scan_id, "s1");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ingestor.store.ops(), vec!["header:s1", "vulnerability:s1:v1"]);
    }

    #[tokio::test]
    async fn persist_failure_discards_reports_already_collected() {
        let mut wrappers: Vec<serde_json::Value> =
            serde_json::from_str(&document(&["s0"])).unwrap();
        let full: Vec<serde_json::Value> = serde_json::from_str(&full_document()).unwrap();
        wrappers.extend(full);
        let fetcher =
            FakeFetcher::with_files(&[("a.json", serde_json::to_string(&wrappers).unwrap())]);
        let ingestor = Ingestor::new(fetcher, RecordingStore::failing_on("summary"));

        let result = ingestor.ingest("/repo", &names(&["a.json"])).await;

        assert!(matches!(result, Err(IngestError::Persist { entity: "scan summary", .. })));
        // Rows written for the first report are not rolled back.
        assert!(ingestor.store.ops().contains(&"header:s0".to_string()));
    }

    #[tokio::test]
    async fn never_exceeds_concurrency_limit() {
        let files: Vec<(String, String)> = (0..12)
            .map(|i| (format!("scan-{i}.json"), document(&[&format!("s{i}")])))
            .collect();
        let refs: Vec<(&str, String)> = files.iter().map(|(n, d)| (n.as_str(), d.clone())).collect();
        let fetcher = FakeFetcher::with_files(&refs).delayed(Duration::from_millis(50));
        let ingestor = Ingestor::new(fetcher, RecordingStore::default());

        let file_names: Vec<String> = files.iter().map(|(n, _)| n.clone()).collect();
        let reports = ingestor.ingest("/repo", &file_names).await.unwrap();

        assert_eq!(reports.len(), 12);
        assert_eq!(ingestor.fetcher.peak.load(Ordering::SeqCst), MAX_CONCURRENT_FILES);
    }

    #[tokio::test]
    async fn failure_skips_files_not_yet_started() {
        let mut files: Vec<(String, String)> = (1..6)
            .map(|i| (format!("slow-{i}.json"), document(&[&format!("s{i}")])))
            .collect();
        files.sort();
        let refs: Vec<(&str, String)> = files.iter().map(|(n, d)| (n.as_str(), d.clone())).collect();
        let fetcher = FakeFetcher::with_files(&refs).delayed(Duration::from_millis(20));
        let ingestor = Ingestor::new(fetcher, RecordingStore::default());

        let mut batch = names(&["missing.json"]);
        batch.extend(files.iter().map(|(n, _)| n.clone()));
        let result = ingestor.ingest("/repo", &batch).await;

        assert!(result.is_err());
        assert!(ingestor.fetcher.calls().len() < batch.len());
    }

    #[tokio::test]
    async fn dispatched_files_finish_when_caller_gives_up() {
        let fetcher = FakeFetcher::with_files(&[("a.json", document(&["s1"]))])
            .delayed(Duration::from_millis(100));
        let ingestor = Ingestor::new(fetcher, RecordingStore::default());

        let files = names(&["a.json"]);
        let outcome =
            tokio::time::timeout(Duration::from_millis(20), ingestor.ingest("/repo", &files)).await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(ingestor.store.ops(), vec!["header:s1"]);
    }

    #[tokio::test]
    async fn closed_limiter_is_a_task_error() {
        let limiter = Arc::new(Semaphore::new(1));
        limiter.close();

        let err = acquire_slot(limiter).await.unwrap_err();
        assert!(matches!(err, IngestError::Task(ref msg) if msg == "file limiter closed"));
    }
}
