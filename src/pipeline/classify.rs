//! Incoming message classification.
//!
//! Pure functions: no I/O, no side effects. Decides once whether a message is
//! ready text, a document to extract, or a rejection.

use super::extract::DocumentFormat;
use crate::config::{MAX_DOCUMENT_BYTES, MIN_TEXT_CHARS};

/// A message handed to the pipeline by the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingMessage {
    /// Text typed directly into the chat
    PlainText {
        /// Raw message text
        content: String,
    },
    /// A downloaded attachment
    Document {
        /// File name as sent by the user
        filename: String,
        /// Raw file content
        bytes: Vec<u8>,
    },
}

/// Why a message will not be summarized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Fewer than the minimum number of characters after trimming
    TooShort,
    /// File extension missing or outside the supported set
    UnsupportedFormat {
        /// Lowercased extension, if the name had one
        extension: Option<String>,
    },
    /// The attachment carried no file name
    MissingFileName,
    /// The attachment exceeds the download limit
    FileTooLarge {
        /// Declared size in bytes
        size: u64,
        /// Largest accepted size in bytes
        limit: u64,
    },
}

impl Rejection {
    /// Whether the rejected file is a legacy Word `.doc`
    #[must_use]
    pub fn is_legacy_doc(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { extension: Some(ext) } if ext == "doc")
    }
}

/// Routing decision for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Trimmed text ready for summarization
    ReadyText(String),
    /// A document whose text must be extracted first
    ExtractionCandidate {
        /// Format resolved from the file name
        format: DocumentFormat,
        /// Raw file content
        bytes: Vec<u8>,
    },
    /// The message is not processed further
    Rejected(Rejection),
}

/// Classifies an incoming message.
#[must_use]
pub fn classify(message: IncomingMessage) -> Classification {
    match message {
        IncomingMessage::PlainText { content } => match check_text(&content) {
            Ok(text) => Classification::ReadyText(text.to_string()),
            Err(rejection) => Classification::Rejected(rejection),
        },
        IncomingMessage::Document { filename, bytes } => match document_format(&filename) {
            Ok(format) => Classification::ExtractionCandidate { format, bytes },
            Err(rejection) => Classification::Rejected(rejection),
        },
    }
}

/// Returns the trimmed text if it is long enough to summarize.
///
/// # Errors
///
/// Returns [`Rejection::TooShort`] below the minimum length.
pub fn check_text(text: &str) -> Result<&str, Rejection> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_TEXT_CHARS {
        return Err(Rejection::TooShort);
    }
    Ok(trimmed)
}

/// Resolves a supported format from a file name, ignoring case.
///
/// # Errors
///
/// Returns [`Rejection::MissingFileName`] for blank names and
/// [`Rejection::UnsupportedFormat`] for any other extension.
pub fn document_format(filename: &str) -> Result<DocumentFormat, Rejection> {
    if filename.trim().is_empty() {
        return Err(Rejection::MissingFileName);
    }
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty());

    match extension.as_deref().and_then(DocumentFormat::from_extension) {
        Some(format) => Ok(format),
        None => Err(Rejection::UnsupportedFormat { extension }),
    }
}

/// Checks an attachment before it is downloaded.
///
/// # Errors
///
/// Returns the same rejections as [`document_format`], or
/// [`Rejection::FileTooLarge`] when the declared size exceeds the limit.
pub fn screen_document(filename: Option<&str>, size: u64) -> Result<DocumentFormat, Rejection> {
    let format = document_format(filename.unwrap_or_default())?;
    if size > MAX_DOCUMENT_BYTES {
        return Err(Rejection::FileTooLarge {
            size,
            limit: MAX_DOCUMENT_BYTES,
        });
    }
    Ok(format)
}
