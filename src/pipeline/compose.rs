//! User-facing progress and result messages.
//!
//! A [`ResponseComposer`] is created per request and hands out one
//! [`ProgressEvent`] per stage, refusing any transition that is not strictly
//! forward or that follows a terminal stage.

use super::classify::Rejection;
use super::extract::{DocumentFormat, ExtractionError};
use crate::config::MIN_TEXT_CHARS;
use crate::llm::SummarizationError;
use thiserror::Error;

/// Steps of a request, in the order they may occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// The message is being checked
    Validating,
    /// The attachment is being fetched
    Downloading,
    /// Text is being pulled out of the document
    Extracting,
    /// The completion service is working
    Summarizing,
    /// The summary is ready
    Done,
    /// The request stopped with an error
    Failed,
}

impl Stage {
    /// Whether nothing may follow this stage
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// One message to show the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Stage this message belongs to
    pub stage: Stage,
    /// Text shown to the user
    pub message: String,
}

/// Where the summarized content came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Typed directly into the chat
    Text,
    /// An attachment with the given file name
    File(String),
}

/// Why a request ended without a summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineFailure {
    /// Rejected before any network call
    Rejected(Rejection),
    /// The transport could not fetch the attachment
    Download(String),
    /// The document yielded no text
    Extraction {
        /// Format the document was parsed as
        format: DocumentFormat,
        /// Extraction failure
        error: ExtractionError,
    },
    /// The completion call failed
    Summarization(SummarizationError),
}

/// Invalid stage transitions
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ComposeError {
    /// The stage does not come after the previous one
    #[error("stage {to:?} cannot follow {from:?}")]
    OutOfOrder {
        /// Last emitted stage
        from: Stage,
        /// Rejected stage
        to: Stage,
    },
    /// A terminal stage was already emitted
    #[error("request already finished with {0:?}")]
    AlreadyFinished(Stage),
}

/// Sequences the messages of a single request
#[derive(Debug, Clone)]
pub struct ResponseComposer {
    origin: Origin,
    last: Option<Stage>,
}

impl ResponseComposer {
    /// Start composing for content of the given origin
    #[must_use]
    pub const fn new(origin: Origin) -> Self {
        Self { origin, last: None }
    }

    /// Origin of the content being summarized
    #[must_use]
    pub const fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Last stage handed out, if any
    #[must_use]
    pub const fn last_stage(&self) -> Option<Stage> {
        self.last
    }

    /// Event for a non-terminal stage.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError`] for terminal stages, and when `stage` does not
    /// come after the last one handed out.
    pub fn progress(&mut self, stage: Stage) -> Result<ProgressEvent, ComposeError> {
        let message = match stage {
            Stage::Validating => "🔎 Checking your message...".to_string(),
            Stage::Downloading => "📥 Downloading the file...".to_string(),
            Stage::Extracting => "🔍 Extracting text from the file...".to_string(),
            Stage::Summarizing => match self.origin {
                Origin::Text => "⏳ Summarizing... please wait".to_string(),
                Origin::File(_) => "⏳ Summarizing the content... please wait".to_string(),
            },
            Stage::Done | Stage::Failed => {
                return Err(ComposeError::OutOfOrder {
                    from: self.last.unwrap_or(Stage::Validating),
                    to: stage,
                })
            }
        };
        self.advance(stage, message)
    }

    /// Terminal event carrying the summary.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::AlreadyFinished`] after a terminal stage.
    pub fn done(&mut self, summary: &str) -> Result<ProgressEvent, ComposeError> {
        let message = match &self.origin {
            Origin::Text => format!("📝 Summary of your text:\n\n{summary}"),
            Origin::File(name) => format!("📄 Summary of the file ({name}):\n\n{summary}"),
        };
        self.advance(Stage::Done, message)
    }

    /// Terminal event explaining a failure.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::AlreadyFinished`] after a terminal stage.
    pub fn failed(&mut self, failure: &PipelineFailure) -> Result<ProgressEvent, ComposeError> {
        let message = failure_message(failure, &self.origin);
        self.advance(Stage::Failed, message)
    }

    fn advance(&mut self, stage: Stage, message: String) -> Result<ProgressEvent, ComposeError> {
        if let Some(last) = self.last {
            if last.is_terminal() {
                return Err(ComposeError::AlreadyFinished(last));
            }
            if stage <= last {
                return Err(ComposeError::OutOfOrder {
                    from: last,
                    to: stage,
                });
            }
        }
        self.last = Some(stage);
        Ok(ProgressEvent { stage, message })
    }
}

/// User-facing explanation for a failure.
#[must_use]
pub fn failure_message(failure: &PipelineFailure, origin: &Origin) -> String {
    match failure {
        PipelineFailure::Rejected(rejection) => rejection_message(rejection, origin),
        PipelineFailure::Download(_) => {
            "❌ Failed to download the file.\n\nPlease try again or send another file.".to_string()
        }
        PipelineFailure::Extraction {
            format,
            error: ExtractionError::NoExtractableContent,
        } => {
            let hint = match format {
                DocumentFormat::Pdf => "Make sure the PDF contains real text, not only images.",
                DocumentFormat::Docx => {
                    "Make sure the Word document contains text, not only images or empty tables."
                }
            };
            let subject = match origin {
                Origin::File(name) => format!("the {} file {name}", format.display_name()),
                Origin::Text => format!("the {} file", format.display_name()),
            };
            format!("❌ Sorry, I could not extract text from {subject}.\n\n{hint}")
        }
        PipelineFailure::Summarization(error) => summarization_message(error),
    }
}

fn rejection_message(rejection: &Rejection, origin: &Origin) -> String {
    match rejection {
        Rejection::TooShort => match origin {
            Origin::Text => format!(
                "⚠️ Please send enough text to summarize (at least {MIN_TEXT_CHARS} characters)."
            ),
            Origin::File(_) => format!(
                "⚠️ The file does not contain enough text to summarize (at least {MIN_TEXT_CHARS} characters)."
            ),
        },
        Rejection::UnsupportedFormat { .. } => {
            unsupported_format_message(rejection.is_legacy_doc())
        }
        Rejection::MissingFileName => "⚠️ I could not recognize the file name.".to_string(),
        Rejection::FileTooLarge { size, limit } => format!(
            "⚠️ The file is too large ({} MB). The maximum supported size is {} MB.",
            size.div_ceil(1024 * 1024),
            limit / (1024 * 1024)
        ),
    }
}

fn unsupported_format_message(legacy_doc: bool) -> String {
    if legacy_doc {
        "⚠️ Legacy Word .doc files are not supported.\n\n\
         Please convert the file to .docx and send it again."
            .to_string()
    } else {
        "⚠️ Sorry, only PDF and Word (DOCX) files are supported.\n\n\
         Note: legacy .doc files are not supported, please convert them to .docx."
            .to_string()
    }
}

fn summarization_message(error: &SummarizationError) -> String {
    match error {
        SummarizationError::Timeout => {
            "⏱️ Sorry, summarizing took too long. Please try again with a shorter text.".to_string()
        }
        SummarizationError::AuthError => {
            "🔑 Sorry, there is a problem with the summarization service configuration. \
             Please contact the bot administrator."
                .to_string()
        }
        SummarizationError::RateLimited => {
            "⏳ Sorry, the request limit has been exceeded. Please wait a moment and try again."
                .to_string()
        }
        SummarizationError::ServiceError(code) => format!(
            "❌ Sorry, the summarization service returned an error (code: {code}). \
             Please try again later."
        ),
        SummarizationError::NetworkError(_) => {
            "🌐 Sorry, I cannot reach the summarization service. \
             Please check the connection and try again."
                .to_string()
        }
        SummarizationError::MalformedResponse(_) => {
            "📋 Sorry, the summarization service sent an unexpected response. Please try again."
                .to_string()
        }
        SummarizationError::Unknown(_) => {
            "❌ Sorry, an unexpected error occurred. Please try again.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_stages_must_increase() -> Result<(), ComposeError> {
        let mut composer = ResponseComposer::new(Origin::Text);
        composer.progress(Stage::Validating)?;
        composer.progress(Stage::Summarizing)?;

        assert_eq!(
            composer.progress(Stage::Summarizing),
            Err(ComposeError::OutOfOrder {
                from: Stage::Summarizing,
                to: Stage::Summarizing,
            })
        );
        assert_eq!(
            composer.progress(Stage::Extracting),
            Err(ComposeError::OutOfOrder {
                from: Stage::Summarizing,
                to: Stage::Extracting,
            })
        );
        assert_eq!(composer.last_stage(), Some(Stage::Summarizing));
        Ok(())
    }

    #[test]
    fn test_nothing_after_terminal() -> Result<(), ComposeError> {
        let mut composer = ResponseComposer::new(Origin::Text);
        composer.failed(&PipelineFailure::Rejected(Rejection::TooShort))?;

        assert_eq!(
            composer.done("late"),
            Err(ComposeError::AlreadyFinished(Stage::Failed))
        );
        assert_eq!(
            composer.progress(Stage::Summarizing),
            Err(ComposeError::AlreadyFinished(Stage::Failed))
        );
        Ok(())
    }

    #[test]
    fn test_progress_rejects_terminal_stage() {
        let mut composer = ResponseComposer::new(Origin::Text);
        assert!(composer.progress(Stage::Done).is_err());
        assert_eq!(composer.last_stage(), None);
    }

    #[test]
    fn test_done_prefix_names_origin() -> Result<(), ComposeError> {
        let text = ResponseComposer::new(Origin::Text).done("Short summary.")?;
        assert_eq!(text.stage, Stage::Done);
        assert!(text.message.starts_with("📝 Summary of your text"));
        assert!(text.message.ends_with("Short summary."));

        let file = ResponseComposer::new(Origin::File("notes.pdf".to_string())).done("S")?;
        assert!(file.message.contains("(notes.pdf)"));
        Ok(())
    }

    #[test]
    fn test_failure_messages_are_distinct() {
        let origin = Origin::File("notes.pdf".to_string());
        let failures = [
            PipelineFailure::Summarization(SummarizationError::Timeout),
            PipelineFailure::Summarization(SummarizationError::AuthError),
            PipelineFailure::Summarization(SummarizationError::RateLimited),
            PipelineFailure::Summarization(SummarizationError::ServiceError(500)),
            PipelineFailure::Summarization(SummarizationError::NetworkError("refused".into())),
            PipelineFailure::Summarization(SummarizationError::MalformedResponse("x".into())),
            PipelineFailure::Summarization(SummarizationError::Unknown("x".into())),
            PipelineFailure::Rejected(Rejection::TooShort),
            PipelineFailure::Rejected(Rejection::MissingFileName),
            PipelineFailure::Rejected(Rejection::UnsupportedFormat { extension: None }),
            PipelineFailure::Rejected(Rejection::UnsupportedFormat {
                extension: Some("doc".into()),
            }),
            PipelineFailure::Download("boom".into()),
            PipelineFailure::Extraction {
                format: DocumentFormat::Pdf,
                error: ExtractionError::NoExtractableContent,
            },
            PipelineFailure::Extraction {
                format: DocumentFormat::Docx,
                error: ExtractionError::NoExtractableContent,
            },
        ];

        let messages: HashSet<String> = failures
            .iter()
            .map(|f| failure_message(f, &origin))
            .collect();
        assert_eq!(messages.len(), failures.len());
    }

    #[test]
    fn test_service_error_includes_status() {
        let message = failure_message(
            &PipelineFailure::Summarization(SummarizationError::ServiceError(503)),
            &Origin::Text,
        );
        assert!(message.contains("503"));
    }

    #[test]
    fn test_unsupported_format_mentions_doc_conversion() {
        for extension in [None, Some("doc".to_string()), Some("txt".to_string())] {
            let message = failure_message(
                &PipelineFailure::Rejected(Rejection::UnsupportedFormat { extension }),
                &Origin::File("x".to_string()),
            );
            assert!(message.contains(".doc"));
            assert!(message.contains(".docx"));
        }
    }

    #[test]
    fn test_extraction_message_names_document() {
        let message = failure_message(
            &PipelineFailure::Extraction {
                format: DocumentFormat::Pdf,
                error: ExtractionError::NoExtractableContent,
            },
            &Origin::File("notes.pdf".to_string()),
        );
        assert!(message.contains("notes.pdf"));
        assert!(message.contains("not only images"));
    }

    #[test]
    fn test_too_large_message() {
        let message = failure_message(
            &PipelineFailure::Rejected(Rejection::FileTooLarge {
                size: 25 * 1024 * 1024,
                limit: 20 * 1024 * 1024,
            }),
            &Origin::File("big.pdf".to_string()),
        );
        assert!(message.contains("25 MB"));
        assert!(message.contains("20 MB"));
    }
}
