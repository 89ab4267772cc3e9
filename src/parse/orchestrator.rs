//! Parse orchestration
//!
//! Probes the page count, chunks large documents, dispatches chunk calls on
//! a bounded worker pool and merges whatever succeeded.
//!
//! # Design
//!
//! ```text
//! parse_cached(path)
//!   ├─ hash_file ──► cache.get ──► hit: return payload (zero service calls)
//!   └─ miss ──► parse(path) ──► cache.put (complete results only)
//!
//! parse(path)
//!   ├─ probe page count (spawn_blocking)
//!   ├─ pages <= chunk_size or unknown ──► one call with the whole file
//!   └─ else: open the document once, plan chunks
//!        ├─ parallel pass: one task per chunk, semaphore-bounded
//!        ├─ sequential pass: chunks that exhausted their retries
//!        └─ merge by start page
//! ```
//!
//! A failed chunk never aborts the document; its pages are simply missing
//! and the page mismatch is reported. When the document cannot be cut into
//! pages at all, the whole file goes out as one request instead. Only a
//! document where every chunk failed at the service is an error.

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::cache::{hash_file, FileFingerprint, ParseCache};
use crate::config::ChunkingConfig;
use crate::error::{IngestError, Result};

use super::client::ParseService;
use super::error::ParseError;
use super::merge::merge_chunks;
use super::pdf::{PageSlicer, PageSource};
use super::retry::{call_with_retry, RetryPolicy};
use super::types::{plan_chunks, ChunkFailure, ChunkJob, ChunkResult, ParseResponse, RawDocument};

type ChunkOutcome = std::result::Result<ChunkResult, ChunkFailure>;

/// Parse result together with its cache provenance
#[derive(Debug, Clone)]
pub struct CachedParse {
    pub fingerprint: FileFingerprint,
    pub document: RawDocument,
    pub cache_hit: bool,
}

/// Drives the external parse service for whole documents
pub struct ParseOrchestrator {
    service: Arc<dyn ParseService>,
    slicer: Arc<dyn PageSlicer>,
    cache: Arc<dyn ParseCache>,
    chunk_size: usize,
    max_workers: usize,
    retry: RetryPolicy,
}

impl ParseOrchestrator {
    pub fn new(
        service: Arc<dyn ParseService>,
        slicer: Arc<dyn PageSlicer>,
        cache: Arc<dyn ParseCache>,
        config: &ChunkingConfig,
    ) -> Self {
        Self {
            service,
            slicer,
            cache,
            chunk_size: config.chunk_size.max(1),
            max_workers: config.max_workers.max(1),
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn cache(&self) -> &Arc<dyn ParseCache> {
        &self.cache
    }

    /// Parse through the content-addressed cache
    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn parse_cached(&self, path: &Path) -> Result<CachedParse> {
        let fingerprint = hash_file(path)
            .await
            .map_err(|e| IngestError::from_input_io(path, e))?;

        if let Some(payload) = self.cache.get(&fingerprint.content_hash).await {
            match RawDocument::from_payload(payload) {
                Ok(document) => {
                    tracing::info!(
                        content_hash = %fingerprint.content_hash,
                        elements = document.elements.len(),
                        "Using cached parse result"
                    );
                    return Ok(CachedParse {
                        fingerprint,
                        document,
                        cache_hit: true,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        content_hash = %fingerprint.content_hash,
                        error = %e,
                        "Cached payload no longer decodes, parsing again"
                    );
                }
            }
        }

        let (document, payload) = self.parse_with_payload(path).await?;

        if document.is_partial() {
            tracing::warn!(
                content_hash = %fingerprint.content_hash,
                failed_chunks = document.failed_chunks.len(),
                "Partial parse result, not caching"
            );
        } else {
            self.cache.put(&fingerprint, &payload).await;
        }

        Ok(CachedParse {
            fingerprint,
            document,
            cache_hit: false,
        })
    }

    /// Parse without consulting the cache
    pub async fn parse(&self, path: &Path) -> Result<RawDocument> {
        self.parse_with_payload(path).await.map(|(document, _)| document)
    }

    /// Parse and also return the payload to cache
    async fn parse_with_payload(&self, path: &Path) -> Result<(RawDocument, serde_json::Value)> {
        tokio::fs::metadata(path)
            .await
            .map_err(|e| IngestError::from_input_io(path, e))?;

        let page_count = self.probe_page_count(path).await;

        match page_count {
            Some(pages) if pages > self.chunk_size => self.parse_chunked(path, pages).await,
            _ => self.parse_single(path, page_count).await,
        }
    }

    async fn probe_page_count(&self, path: &Path) -> Option<usize> {
        let slicer = self.slicer.clone();
        let owned = path.to_path_buf();

        let probed = tokio::task::spawn_blocking(move || slicer.page_count(&owned))
            .await
            .unwrap_or_else(|e| Err(ParseError::Probe(format!("probe task failed: {}", e))));

        match probed {
            Ok(pages) => {
                tracing::debug!(pages = pages, "Probed page count");
                Some(pages)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Page count probe failed, using single request");
                None
            }
        }
    }

    async fn parse_single(
        &self,
        path: &Path,
        page_count: Option<usize>,
    ) -> Result<(RawDocument, serde_json::Value)> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| IngestError::from_input_io(path, e))?;
        let file_name = file_name_of(path);

        let outcome = call_with_retry(&self.retry, &file_name, || {
            self.service.parse_document(&file_name, data.clone())
        })
        .await;

        let mut payload = outcome.result?;
        let response = ParseResponse::from_value(payload.clone())?;
        let document = RawDocument::from_single(response, page_count);

        // Keep the probed page count across cache hits
        document.annotate_payload(&mut payload)?;

        log_page_mismatch(&document);
        tracing::info!(
            elements = document.elements.len(),
            pages = document.total_pages_parsed,
            attempts = outcome.attempts,
            "Parsed document in a single request"
        );

        Ok((document, payload))
    }

    async fn parse_chunked(
        &self,
        path: &Path,
        page_count: usize,
    ) -> Result<(RawDocument, serde_json::Value)> {
        let source = match self.open_source(path).await {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(error = %e, "Document cannot be split into pages, using single request");
                return self.parse_single(path, Some(page_count)).await;
            }
        };

        let jobs = plan_chunks(page_count, self.chunk_size);
        let chunk_count = jobs.len();

        tracing::info!(
            pages = page_count,
            chunks = chunk_count,
            chunk_size = self.chunk_size,
            max_workers = self.max_workers,
            "Parsing document in chunks"
        );

        let worker = ChunkWorker {
            service: self.service.clone(),
            source,
            retry: self.retry.clone(),
            file_name: Arc::new(file_name_of(path)),
        };

        let (mut succeeded, failed) = self.run_parallel(&worker, &jobs).await;

        // Second chance, one chunk at a time
        let mut permanent: Vec<ChunkFailure> = Vec::new();
        for failure in failed {
            if !failure.retryable {
                permanent.push(failure);
                continue;
            }

            tracing::info!(chunk = failure.job.index, "Retrying exhausted chunk sequentially");
            match worker.run(failure.job).await {
                Ok(result) => succeeded.push(result),
                Err(mut retry_failure) => {
                    retry_failure.attempts += failure.attempts;
                    permanent.push(retry_failure);
                }
            }
        }

        permanent.sort_by_key(|f| f.job.start_page);

        if succeeded.is_empty() && permanent.iter().all(|f| f.extraction_failed) {
            tracing::warn!(
                chunks = chunk_count,
                "No page range could be extracted, using single request"
            );
            return self.parse_single(path, Some(page_count)).await;
        }

        if succeeded.is_empty() {
            tracing::error!(chunks = chunk_count, "Every chunk failed");
            return Err(IngestError::AllChunksFailed(permanent));
        }

        for failure in &permanent {
            tracing::warn!(
                chunk = failure.job.index,
                start_page = failure.job.start_page,
                end_page = failure.job.end_page,
                attempts = failure.attempts,
                error = %failure.error,
                "Dropping failed chunk from merged result"
            );
        }

        let merged = merge_chunks(succeeded);
        let document = RawDocument {
            api: merged.api,
            model: merged.model,
            elements: merged.elements,
            total_pages_expected: Some(page_count),
            total_pages_parsed: merged.pages_parsed,
            chunked: true,
            chunk_count,
            failed_chunks: permanent,
        };

        log_page_mismatch(&document);
        tracing::info!(
            elements = document.elements.len(),
            pages = document.total_pages_parsed,
            failed_chunks = document.failed_chunks.len(),
            "Merged chunked parse"
        );

        let payload = document.to_payload()?;
        Ok((document, payload))
    }

    async fn open_source(&self, path: &Path) -> std::result::Result<Arc<dyn PageSource>, ParseError> {
        let slicer = self.slicer.clone();
        let owned = path.to_path_buf();

        tokio::task::spawn_blocking(move || slicer.open(&owned))
            .await
            .unwrap_or_else(|e| Err(ParseError::Open(format!("open task failed: {}", e))))
    }

    /// Run every job on the bounded pool and wait for all of them
    async fn run_parallel(
        &self,
        worker: &ChunkWorker,
        jobs: &[ChunkJob],
    ) -> (Vec<ChunkResult>, Vec<ChunkFailure>) {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let outcomes: Arc<Mutex<Vec<ChunkOutcome>>> =
            Arc::new(Mutex::new(Vec::with_capacity(jobs.len())));

        let handles: Vec<_> = jobs
            .iter()
            .copied()
            .map(|job| {
                let semaphore = semaphore.clone();
                let outcomes = outcomes.clone();
                let worker = worker.clone();

                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    let outcome = worker.run(job).await;
                    outcomes.lock().push(outcome);
                })
            })
            .collect();

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Chunk worker task panicked");
            }
        }

        let outcomes = std::mem::take(&mut *outcomes.lock());
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(result) => succeeded.push(result),
                Err(failure) => failed.push(failure),
            }
        }

        // Jobs whose task died without reporting
        for job in jobs {
            let reported = succeeded.iter().any(|r| r.job == *job) || failed.iter().any(|f| f.job == *job);
            if !reported {
                failed.push(ChunkFailure {
                    job: *job,
                    attempts: 0,
                    error: "worker task aborted".to_string(),
                    retryable: true,
                    extraction_failed: false,
                });
            }
        }

        (succeeded, failed)
    }
}

/// Everything one chunk call needs, cheap to clone into tasks
#[derive(Clone)]
struct ChunkWorker {
    service: Arc<dyn ParseService>,
    source: Arc<dyn PageSource>,
    retry: RetryPolicy,
    file_name: Arc<String>,
}

impl ChunkWorker {
    async fn run(&self, job: ChunkJob) -> ChunkOutcome {
        let source = self.source.clone();
        let sliced = tokio::task::spawn_blocking(move || {
            source.extract_pages(job.start_page, job.end_page)
        })
        .await
        .unwrap_or_else(|e| {
            Err(ParseError::Slice {
                start: job.start_page,
                end: job.end_page,
                message: format!("slice task failed: {}", e),
            })
        });

        let data = match sliced {
            Ok(data) => data,
            Err(e) => return Err(ChunkFailure::new(job, 0, &e)),
        };

        let label = format!("{}#chunk{}", self.file_name, job.index);
        let chunk_name = chunk_file_name(&self.file_name, job);

        let outcome = call_with_retry(&self.retry, &label, || {
            self.service.parse_document(&chunk_name, data.clone())
        })
        .await;

        let attempts = outcome.attempts;
        let response = outcome
            .result
            .and_then(ParseResponse::from_value)
            .map_err(|e| ChunkFailure::new(job, attempts, &e))?;

        tracing::debug!(
            chunk = job.index,
            start_page = job.start_page,
            elements = response.elements.len(),
            attempts = attempts,
            "Chunk parsed"
        );

        Ok(ChunkResult {
            job,
            response,
            attempts,
        })
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document.pdf".to_string())
}

fn chunk_file_name(file_name: &str, job: ChunkJob) -> String {
    let stem = file_name.strip_suffix(".pdf").unwrap_or(file_name);
    format!("{}_p{}-{}.pdf", stem, job.start_page + 1, job.end_page)
}

fn log_page_mismatch(document: &RawDocument) {
    if let Some((expected, parsed)) = document.page_mismatch() {
        tracing::warn!(
            expected_pages = expected,
            parsed_pages = parsed,
            "Parsed page count differs from expected"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FileParseCache, NoopCache};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Slicer that encodes the page range into the "document" bytes
    #[derive(Default)]
    struct FakeSlicer {
        pages: Option<usize>,
        opens: AtomicUsize,
        unopenable: bool,
        uncuttable: bool,
    }

    impl FakeSlicer {
        fn with_pages(pages: Option<usize>) -> Self {
            Self {
                pages,
                ..Default::default()
            }
        }
    }

    impl PageSlicer for FakeSlicer {
        fn page_count(&self, _path: &Path) -> std::result::Result<usize, ParseError> {
            self.pages
                .ok_or_else(|| ParseError::Probe("unreadable xref".into()))
        }

        fn open(&self, _path: &Path) -> std::result::Result<Arc<dyn PageSource>, ParseError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.unopenable {
                return Err(ParseError::Open("encrypted document".into()));
            }
            Ok(Arc::new(FakeSource {
                uncuttable: self.uncuttable,
            }))
        }
    }

    struct FakeSource {
        uncuttable: bool,
    }

    impl PageSource for FakeSource {
        fn extract_pages(&self, start: usize, end: usize) -> std::result::Result<Vec<u8>, ParseError> {
            if self.uncuttable {
                return Err(ParseError::Slice {
                    start,
                    end,
                    message: "broken page tree".into(),
                });
            }
            Ok(format!("{}-{}", start, end).into_bytes())
        }
    }

    /// Scripted service: per-range error queue, then one element per page
    #[derive(Default)]
    struct MockService {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        scripted_errors: parking_lot::Mutex<HashMap<String, Vec<ParseError>>>,
        always_fail: Vec<String>,
        delay_by_start: bool,
    }

    impl MockService {
        fn with_errors(range: &str, errors: Vec<ParseError>) -> Self {
            let service = Self::default();
            service.scripted_errors.lock().insert(range.to_string(), errors);
            service
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ParseService for MockService {
        async fn parse_document(
            &self,
            _file_name: &str,
            data: Vec<u8>,
        ) -> std::result::Result<Value, ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let range = String::from_utf8(data).unwrap();
            let (start, end) = match range.split_once('-') {
                Some((s, e)) => (s.parse::<usize>().unwrap(), e.parse::<usize>().unwrap()),
                // Whole-file request
                None => (0, 3),
            };

            // Later chunks finish first
            if self.delay_by_start {
                tokio::time::sleep(Duration::from_millis(1000 - start as u64 * 10)).await;
            } else {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.always_fail.contains(&range) {
                return Err(ParseError::Transient("connection reset".into()));
            }
            if let Some(err) = self
                .scripted_errors
                .lock()
                .get_mut(&range)
                .and_then(|queue| (!queue.is_empty()).then(|| queue.remove(0)))
            {
                return Err(err);
            }

            // Chunk-local pages, 0-based, ids restart at 0 in every chunk
            let elements: Vec<Value> = (0..end - start)
                .map(|local| {
                    json!({
                        "id": local,
                        "page": local,
                        "category": "paragraph",
                        "coordinates": [{ "x": 0.1, "y": 0.1 }, { "x": 0.4, "y": 0.2 }],
                        "content": { "html": format!("<p>page {}</p>", start + local) }
                    })
                })
                .collect();

            Ok(json!({
                "api": "2.0",
                "model": "document-parse",
                "usage": { "pages": end - start },
                "elements": elements
            }))
        }
    }

    fn config() -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: 10,
            max_workers: 5,
            max_retries: 3,
            call_timeout_secs: 120,
            backoff_base_ms: 1000,
        }
    }

    fn input_file(dir: &TempDir, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn orchestrator(
        service: Arc<MockService>,
        pages: Option<usize>,
        cache: Arc<dyn ParseCache>,
    ) -> ParseOrchestrator {
        ParseOrchestrator::new(service, Arc::new(FakeSlicer::with_pages(pages)), cache, &config())
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_document_uses_single_request() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"whole");
        let service = Arc::new(MockService::default());

        let document = orchestrator(service.clone(), Some(3), Arc::new(NoopCache))
            .parse(&path)
            .await
            .unwrap();

        assert!(!document.chunked);
        assert_eq!(document.chunk_count, 1);
        assert_eq!(document.elements.len(), 3);
        assert_eq!(document.total_pages_expected, Some(3));
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_falls_back_to_single_request() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"whole");
        let service = Arc::new(MockService::default());

        let document = orchestrator(service.clone(), None, Arc::new(NoopCache))
            .parse(&path)
            .await
            .unwrap();

        assert!(!document.chunked);
        assert_eq!(service.calls(), 1);
        // Without a probe the service's own count is the expectation
        assert_eq!(document.total_pages_expected, Some(3));
        assert!(document.page_mismatch().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_25_pages_split_into_three_chunks_and_offset() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"big");
        let service = Arc::new(MockService {
            delay_by_start: true,
            ..Default::default()
        });

        let document = orchestrator(service.clone(), Some(25), Arc::new(NoopCache))
            .parse(&path)
            .await
            .unwrap();

        assert!(document.chunked);
        assert_eq!(document.chunk_count, 3);
        assert_eq!(service.calls(), 3);
        assert_eq!(document.total_pages_parsed, 25);
        assert!(document.page_mismatch().is_none());

        // Chunk 2 local page 0 -> 10, chunk 3 local page 0 -> 20
        assert_eq!(document.elements[10].page, 10);
        assert_eq!(document.elements[20].page, 20);

        // Reverse completion order still yields ordered, unique ids
        let ids: Vec<u64> = document.elements.iter().map(|e| e.id).collect();
        assert_eq!(ids, (0..25).collect::<Vec<u64>>());
        let pages: Vec<u32> = document.elements.iter().map(|e| e.page).collect();
        assert_eq!(pages, (0..25).collect::<Vec<u32>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_pool_is_bounded() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"huge");
        let service = Arc::new(MockService::default());

        let mut chunking = config();
        chunking.max_workers = 2;
        let orchestrator = ParseOrchestrator::new(
            service.clone(),
            Arc::new(FakeSlicer::with_pages(Some(95))),
            Arc::new(NoopCache),
            &chunking,
        );

        let document = orchestrator.parse(&path).await.unwrap();

        assert_eq!(document.chunk_count, 10);
        assert_eq!(service.calls(), 10);
        assert!(service.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_chunk_recovers_within_retries() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"big");
        let service = Arc::new(MockService::with_errors(
            "10-20",
            vec![
                ParseError::RateLimited { retry_after: None },
                ParseError::RateLimited { retry_after: None },
            ],
        ));

        let document = orchestrator(service.clone(), Some(25), Arc::new(NoopCache))
            .parse(&path)
            .await
            .unwrap();

        assert!(document.failed_chunks.is_empty());
        assert_eq!(document.elements.len(), 25);
        // 3 chunks + 2 rejected attempts
        assert_eq!(service.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_pass_recovers_exhausted_chunk() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"big");
        let service = Arc::new(MockService::with_errors(
            "20-25",
            (0..3).map(|_| ParseError::Transient("reset".into())).collect(),
        ));

        let document = orchestrator(service.clone(), Some(25), Arc::new(NoopCache))
            .parse(&path)
            .await
            .unwrap();

        assert!(document.failed_chunks.is_empty());
        assert_eq!(document.elements.len(), 25);
        // Two clean chunks, 3 failed parallel attempts, then the sequential pass succeeds
        assert_eq!(service.calls(), 2 + 3 + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanently_failing_chunk_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"big");
        let service = Arc::new(MockService {
            always_fail: vec!["10-20".to_string()],
            ..Default::default()
        });

        let document = orchestrator(service.clone(), Some(25), Arc::new(NoopCache))
            .parse(&path)
            .await
            .unwrap();

        assert_eq!(document.failed_chunks.len(), 1);
        let failure = &document.failed_chunks[0];
        assert_eq!(failure.job.start_page, 10);
        assert_eq!(failure.attempts, 6);
        assert_eq!(document.elements.len(), 15);
        assert_eq!(document.page_mismatch(), Some((25, 15)));

        // Pages of the dropped chunk are simply absent
        assert!(document.elements.iter().all(|e| !(10..20).contains(&e.page)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_chunk_skips_sequential_pass() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"big");
        let service = Arc::new(MockService::with_errors(
            "0-10",
            vec![ParseError::Http {
                status: 422,
                body: "unprocessable".into(),
            }],
        ));

        let document = orchestrator(service.clone(), Some(25), Arc::new(NoopCache))
            .parse(&path)
            .await
            .unwrap();

        assert_eq!(document.failed_chunks.len(), 1);
        assert!(!document.failed_chunks[0].retryable);
        assert_eq!(service.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_chunks_failing_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"big");
        let service = Arc::new(MockService {
            always_fail: vec!["0-10".into(), "10-20".into(), "20-25".into()],
            ..Default::default()
        });

        let result = orchestrator(service, Some(25), Arc::new(NoopCache))
            .parse(&path)
            .await;

        match result {
            Err(IngestError::AllChunksFailed(failures)) => assert_eq!(failures.len(), 3),
            other => panic!("expected AllChunksFailed, got {:?}", other.map(|d| d.elements.len())),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_is_opened_once_per_chunked_parse() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"big");
        let service = Arc::new(MockService::default());
        let slicer = Arc::new(FakeSlicer::with_pages(Some(25)));
        let orchestrator =
            ParseOrchestrator::new(service.clone(), slicer.clone(), Arc::new(NoopCache), &config());

        let document = orchestrator.parse(&path).await.unwrap();

        assert_eq!(document.chunk_count, 3);
        assert_eq!(slicer.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsplittable_document_falls_back_to_single_request() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"whole");

        for slicer in [
            FakeSlicer {
                unopenable: true,
                ..FakeSlicer::with_pages(Some(25))
            },
            FakeSlicer {
                uncuttable: true,
                ..FakeSlicer::with_pages(Some(25))
            },
        ] {
            let service = Arc::new(MockService::default());
            let orchestrator =
                ParseOrchestrator::new(service.clone(), Arc::new(slicer), Arc::new(NoopCache), &config());

            let document = orchestrator.parse(&path).await.unwrap();

            assert!(!document.chunked);
            assert_eq!(service.calls(), 1);
            assert_eq!(document.elements.len(), 3);
            // The probe still sets the expectation
            assert_eq!(document.total_pages_expected, Some(25));
            assert_eq!(document.page_mismatch(), Some((25, 3)));
        }
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(MockService::default());

        let result = orchestrator(service.clone(), Some(3), Arc::new(NoopCache))
            .parse_cached(&dir.path().join("absent.pdf"))
            .await;

        assert!(matches!(result, Err(IngestError::FileNotFound(_))));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_parse_is_cache_hit_with_zero_calls() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"identical bytes");
        let service = Arc::new(MockService::default());
        let cache = Arc::new(FileParseCache::new(dir.path().join("cache")));
        let orchestrator = orchestrator(service.clone(), Some(25), cache);

        let first = orchestrator.parse_cached(&path).await.unwrap();
        assert!(!first.cache_hit);
        assert_eq!(service.calls(), 3);

        // Same bytes under another name
        let copy = dir.path().join("renamed copy.pdf");
        std::fs::copy(&path, &copy).unwrap();

        let second = orchestrator.parse_cached(&copy).await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(service.calls(), 3);
        assert_eq!(first.fingerprint.content_hash, second.fingerprint.content_hash);
        assert_eq!(second.document.elements, first.document.elements);
        assert!(second.document.chunked);
        assert_eq!(second.document.chunk_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_request_cache_hit_keeps_page_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"short scan");
        let service = Arc::new(MockService::default());
        let cache = Arc::new(FileParseCache::new(dir.path().join("cache")));
        // Probe says 5 pages, the whole-file response covers 3
        let orchestrator = orchestrator(service.clone(), Some(5), cache);

        let first = orchestrator.parse_cached(&path).await.unwrap();
        assert!(!first.cache_hit);
        assert_eq!(first.document.page_mismatch(), Some((5, 3)));

        let second = orchestrator.parse_cached(&path).await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(service.calls(), 1);
        assert!(!second.document.chunked);
        assert_eq!(second.document.total_pages_expected, Some(5));
        assert_eq!(second.document.page_mismatch(), Some((5, 3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_result_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let path = input_file(&dir, b"flaky");
        let service = Arc::new(MockService {
            always_fail: vec!["20-25".into()],
            ..Default::default()
        });
        let cache = Arc::new(FileParseCache::new(dir.path().join("cache")));
        let orchestrator = orchestrator(service, Some(25), cache.clone());

        let parsed = orchestrator.parse_cached(&path).await.unwrap();

        assert!(parsed.document.is_partial());
        assert!(!cache.contains(&parsed.fingerprint.content_hash).await);
    }

    #[test]
    fn test_chunk_file_name() {
        let job = ChunkJob {
            index: 1,
            start_page: 10,
            end_page: 20,
        };
        assert_eq!(chunk_file_name("book.pdf", job), "book_p11-20.pdf");
    }
}
