//! Ingestion and summarization pipeline.
//!
//! One call to [`handle_text`] or [`handle_document`] processes one incoming
//! message: classification, optional download and extraction, a single
//! summarization attempt, and the progress events along the way.

pub mod classify;
pub mod compose;
pub mod extract;

use crate::llm::Summarizer;
use crate::utils::truncate_str;
use async_trait::async_trait;
use classify::{check_text, classify, screen_document, Classification, IncomingMessage};
use compose::{Origin, PipelineFailure, ProgressEvent, ResponseComposer, Stage};
use extract::{extract, DocumentFormat, ExtractionError};
use tracing::{debug, error, info, warn};

/// Terminal result of one request
pub type RequestOutcome = Result<String, PipelineFailure>;

/// Receives progress events for one request
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Deliver one event to the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be delivered.
    async fn emit(&self, event: ProgressEvent) -> anyhow::Result<()>;
}

/// A document attachment that has not been downloaded yet
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// File name as sent by the user
    fn file_name(&self) -> Option<&str>;

    /// Declared size in bytes
    fn size(&self) -> u64;

    /// Fetch the raw file content.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to deliver the file.
    async fn download(&self) -> anyhow::Result<Vec<u8>>;
}

struct Request<'a> {
    composer: ResponseComposer,
    sink: &'a dyn ProgressSink,
}

impl<'a> Request<'a> {
    fn new(origin: Origin, sink: &'a dyn ProgressSink) -> Self {
        Self {
            composer: ResponseComposer::new(origin),
            sink,
        }
    }

    async fn enter(&mut self, stage: Stage) {
        match self.composer.progress(stage) {
            Ok(event) => self.deliver(event).await,
            Err(e) => error!("Progress event dropped: {e}"),
        }
    }

    async fn finish(mut self, outcome: RequestOutcome) -> RequestOutcome {
        let event = match &outcome {
            Ok(summary) => self.composer.done(summary),
            Err(failure) => self.composer.failed(failure),
        };
        match event {
            Ok(event) => self.deliver(event).await,
            Err(e) => error!("Final event dropped: {e}"),
        }
        outcome
    }

    async fn deliver(&self, event: ProgressEvent) {
        let stage = event.stage;
        if let Err(e) = self.sink.emit(event).await {
            warn!(?stage, "Failed to deliver progress event: {e:#}");
        }
    }

    /// Acts on the classifier's decision for `message`.
    async fn process(self, message: IncomingMessage, summarizer: &dyn Summarizer) -> RequestOutcome {
        match classify(message) {
            Classification::ReadyText(text) => {
                info!(
                    chars = text.chars().count(),
                    preview = %truncate_str(&text, 100),
                    "Summarizing text"
                );
                self.summarize(&text, summarizer).await
            }
            Classification::ExtractionCandidate { format, bytes } => {
                self.extract_and_summarize(format, bytes, summarizer).await
            }
            Classification::Rejected(rejection) => {
                info!(origin = ?self.composer.origin(), ?rejection, "Message rejected");
                self.finish(Err(PipelineFailure::Rejected(rejection))).await
            }
        }
    }

    async fn extract_and_summarize(
        mut self,
        format: DocumentFormat,
        bytes: Vec<u8>,
        summarizer: &dyn Summarizer,
    ) -> RequestOutcome {
        self.enter(Stage::Extracting).await;
        let extracted = tokio::task::spawn_blocking(move || extract(format, &bytes))
            .await
            .unwrap_or_else(|e| {
                error!("Extraction task failed: {e}");
                Err(ExtractionError::NoExtractableContent)
            });
        let text = match extracted {
            Ok(text) => text,
            Err(error) => {
                info!(origin = ?self.composer.origin(), %error, "No text extracted");
                return self
                    .finish(Err(PipelineFailure::Extraction { format, error }))
                    .await;
            }
        };

        match check_text(&text) {
            Ok(content) => {
                info!(
                    origin = ?self.composer.origin(),
                    chars = content.chars().count(),
                    "Summarizing document"
                );
                self.summarize(content, summarizer).await
            }
            Err(rejection) => self.finish(Err(PipelineFailure::Rejected(rejection))).await,
        }
    }

    async fn summarize(mut self, text: &str, summarizer: &dyn Summarizer) -> RequestOutcome {
        self.enter(Stage::Summarizing).await;
        let outcome = summarizer
            .summarize(text)
            .await
            .map_err(PipelineFailure::Summarization);
        self.finish(outcome).await
    }
}

/// Summarizes text typed directly into the chat.
pub async fn handle_text(
    text: &str,
    summarizer: &dyn Summarizer,
    sink: &dyn ProgressSink,
) -> RequestOutcome {
    let mut request = Request::new(Origin::Text, sink);
    request.enter(Stage::Validating).await;

    let message = IncomingMessage::PlainText {
        content: text.to_string(),
    };
    request.process(message, summarizer).await
}

/// Downloads, extracts and summarizes a document attachment.
///
/// The file name and declared size are checked before anything is
/// downloaded.
pub async fn handle_document(
    source: &dyn DocumentSource,
    summarizer: &dyn Summarizer,
    sink: &dyn ProgressSink,
) -> RequestOutcome {
    let name = source.file_name().unwrap_or_default().to_string();
    let mut request = Request::new(Origin::File(name.clone()), sink);
    request.enter(Stage::Validating).await;

    if let Err(rejection) = screen_document(source.file_name(), source.size()) {
        info!(file = %name, ?rejection, "Document rejected before download");
        return request.finish(Err(PipelineFailure::Rejected(rejection))).await;
    }

    request.enter(Stage::Downloading).await;
    let bytes = match source.download().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(file = %name, "Document download failed: {e:#}");
            return request
                .finish(Err(PipelineFailure::Download(e.to_string())))
                .await;
        }
    };
    debug!(file = %name, bytes = bytes.len(), "Document downloaded");

    let message = IncomingMessage::Document {
        filename: name,
        bytes,
    };
    request.process(message, summarizer).await
}

#[cfg(test)]
mod tests {
    use super::classify::Rejection;
    use super::extract::{fixtures, DocumentFormat};
    use super::*;
    use crate::llm::{MockSummarizer, SummarizationError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl RecordingSink {
        async fn stages(&self) -> Vec<Stage> {
            self.events.lock().await.iter().map(|e| e.stage).collect()
        }

        async fn last_message(&self) -> String {
            self.events
                .lock()
                .await
                .last()
                .map(|e| e.message.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn emit(&self, event: ProgressEvent) -> anyhow::Result<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl ProgressSink for BrokenSink {
        async fn emit(&self, _event: ProgressEvent) -> anyhow::Result<()> {
            anyhow::bail!("chat not found")
        }
    }

    struct FakeDocument {
        name: Option<String>,
        size: u64,
        content: Option<Vec<u8>>,
        downloads: AtomicUsize,
    }

    impl FakeDocument {
        fn new(name: &str, content: Vec<u8>) -> Self {
            Self {
                name: Some(name.to_string()),
                size: content.len() as u64,
                content: Some(content),
                downloads: AtomicUsize::new(0),
            }
        }

        fn downloads(&self) -> usize {
            self.downloads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentSource for FakeDocument {
        fn file_name(&self) -> Option<&str> {
            self.name.as_deref()
        }

        fn size(&self) -> u64 {
            self.size
        }

        async fn download(&self) -> anyhow::Result<Vec<u8>> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            self.content
                .clone()
                .ok_or_else(|| anyhow::anyhow!("file is temporarily unavailable"))
        }
    }

    fn summarizer_returning(summary: &'static str) -> MockSummarizer {
        let mut mock = MockSummarizer::new();
        mock.expect_summarize()
            .times(1)
            .returning(move |_| Ok(summary.to_string()));
        mock
    }

    fn summarizer_unused() -> MockSummarizer {
        let mut mock = MockSummarizer::new();
        mock.expect_summarize().times(0);
        mock
    }

    #[tokio::test]
    async fn test_text_success() {
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .withf(|text: &str| text == "This is a sufficiently long sentence.")
            .times(1)
            .returning(|_| Ok("Short summary.".to_string()));
        let sink = RecordingSink::default();

        let outcome =
            handle_text("  This is a sufficiently long sentence. ", &summarizer, &sink).await;

        assert_eq!(outcome, Ok("Short summary.".to_string()));
        assert_eq!(
            sink.stages().await,
            vec![Stage::Validating, Stage::Summarizing, Stage::Done]
        );
        assert!(sink.last_message().await.ends_with("Short summary."));
    }

    #[tokio::test]
    async fn test_short_text_never_summarized() {
        let summarizer = summarizer_unused();
        let sink = RecordingSink::default();

        let outcome = handle_text("hi there", &summarizer, &sink).await;

        assert_eq!(
            outcome,
            Err(PipelineFailure::Rejected(Rejection::TooShort))
        );
        assert_eq!(sink.stages().await, vec![Stage::Validating, Stage::Failed]);
    }

    #[tokio::test]
    async fn test_summarization_failure_is_reported() {
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .returning(|_| Err(SummarizationError::Timeout));
        let sink = RecordingSink::default();

        let outcome = handle_text("A long enough message to summarize", &summarizer, &sink).await;

        assert_eq!(
            outcome,
            Err(PipelineFailure::Summarization(SummarizationError::Timeout))
        );
        assert_eq!(
            sink.stages().await,
            vec![Stage::Validating, Stage::Summarizing, Stage::Failed]
        );
        assert!(sink.last_message().await.starts_with("⏱️"));
    }

    #[tokio::test]
    async fn test_undeliverable_progress_does_not_abort() {
        let summarizer = summarizer_returning("Summary");
        let outcome = handle_text("A long enough message to summarize", &summarizer, &BrokenSink).await;
        assert_eq!(outcome, Ok("Summary".to_string()));
    }

    #[tokio::test]
    async fn test_document_success() -> TestResult {
        let document = FakeDocument::new(
            "Report.DOCX",
            fixtures::docx(&["Quarterly results", "", "Revenue grew"])?,
        );
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .withf(|text: &str| text == "Quarterly results\n\nRevenue grew")
            .times(1)
            .returning(|_| Ok("Growth.".to_string()));
        let sink = RecordingSink::default();

        let outcome = handle_document(&document, &summarizer, &sink).await;

        assert_eq!(outcome, Ok("Growth.".to_string()));
        assert_eq!(document.downloads(), 1);
        assert_eq!(
            sink.stages().await,
            vec![
                Stage::Validating,
                Stage::Downloading,
                Stage::Extracting,
                Stage::Summarizing,
                Stage::Done,
            ]
        );
        assert!(sink.last_message().await.contains("(Report.DOCX)"));
        Ok(())
    }

    #[tokio::test]
    async fn test_legacy_doc_not_downloaded() {
        let document = FakeDocument::new("report.doc", vec![0xD0, 0xCF, 0x11, 0xE0]);
        let summarizer = summarizer_unused();
        let sink = RecordingSink::default();

        let outcome = handle_document(&document, &summarizer, &sink).await;

        assert!(matches!(
            outcome,
            Err(PipelineFailure::Rejected(ref r)) if r.is_legacy_doc()
        ));
        assert_eq!(document.downloads(), 0);
        assert_eq!(sink.stages().await, vec![Stage::Validating, Stage::Failed]);
    }

    #[tokio::test]
    async fn test_oversized_document_not_downloaded() {
        let mut document = FakeDocument::new("big.pdf", Vec::new());
        document.size = crate::config::MAX_DOCUMENT_BYTES + 1;
        let summarizer = summarizer_unused();
        let sink = RecordingSink::default();

        let outcome = handle_document(&document, &summarizer, &sink).await;

        assert!(matches!(
            outcome,
            Err(PipelineFailure::Rejected(Rejection::FileTooLarge { .. }))
        ));
        assert_eq!(document.downloads(), 0);
    }

    #[tokio::test]
    async fn test_empty_pdf_fails_extraction() -> TestResult {
        let document = FakeDocument::new("notes.pdf", fixtures::pdf(&["", ""])?);
        let summarizer = summarizer_unused();
        let sink = RecordingSink::default();

        let outcome = handle_document(&document, &summarizer, &sink).await;

        assert_eq!(
            outcome,
            Err(PipelineFailure::Extraction {
                format: DocumentFormat::Pdf,
                error: ExtractionError::NoExtractableContent,
            })
        );
        assert_eq!(
            sink.stages().await,
            vec![
                Stage::Validating,
                Stage::Downloading,
                Stage::Extracting,
                Stage::Failed,
            ]
        );
        assert!(sink.last_message().await.contains("notes.pdf"));
        Ok(())
    }

    #[tokio::test]
    async fn test_download_failure() {
        let document = FakeDocument {
            name: Some("notes.pdf".to_string()),
            size: 1024,
            content: None,
            downloads: AtomicUsize::new(0),
        };
        let summarizer = summarizer_unused();
        let sink = RecordingSink::default();

        let outcome = handle_document(&document, &summarizer, &sink).await;

        assert!(matches!(outcome, Err(PipelineFailure::Download(_))));
        assert_eq!(
            sink.stages().await,
            vec![Stage::Validating, Stage::Downloading, Stage::Failed]
        );
    }

    #[tokio::test]
    async fn test_short_extracted_text_rejected() -> TestResult {
        let document = FakeDocument::new("memo.docx", fixtures::docx(&["Hi"])?);
        let summarizer = summarizer_unused();
        let sink = RecordingSink::default();

        let outcome = handle_document(&document, &summarizer, &sink).await;

        assert_eq!(
            outcome,
            Err(PipelineFailure::Rejected(Rejection::TooShort))
        );
        assert!(sink.last_message().await.contains("The file does not contain"));
        Ok(())
    }
}
