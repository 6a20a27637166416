//! Plain-text extraction from binary documents.
//!
//! Extraction is all-or-nothing: a document either yields non-empty trimmed
//! text or fails with [`ExtractionError::NoExtractableContent`].

use crate::config::MAX_DOCX_XML_BYTES;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use thiserror::Error;
use tracing::debug;

/// Document formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// Portable Document Format
    Pdf,
    /// Office Open XML word processing document
    Docx,
}

impl DocumentFormat {
    /// Every supported format
    pub const SUPPORTED: [Self; 2] = [Self::Pdf, Self::Docx];

    /// Lowercase file extension without the dot
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// Resolves a file extension (without the dot), ignoring case.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::SUPPORTED
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(extension))
    }

    /// Human-readable name used in user-facing messages
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word (DOCX)",
        }
    }
}

/// Why a document produced no text
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionError {
    /// The document could not be parsed, or parsed to empty text
    #[error("no extractable text in document")]
    NoExtractableContent,
}

/// Result of extracting text from one document
pub type ExtractionOutcome = Result<String, ExtractionError>;

/// Extracts plain text from `bytes` interpreted as `format`.
///
/// # Errors
///
/// Returns [`ExtractionError::NoExtractableContent`] when parsing fails or
/// the trimmed text is empty.
pub fn extract(format: DocumentFormat, bytes: &[u8]) -> ExtractionOutcome {
    let text = match format {
        DocumentFormat::Pdf => extract_pdf(bytes),
        DocumentFormat::Docx => extract_docx(bytes),
    }?;
    non_empty(&text)
}

fn non_empty(text: &str) -> ExtractionOutcome {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ExtractionError::NoExtractableContent)
    } else {
        Ok(trimmed.to_string())
    }
}

fn extract_pdf(bytes: &[u8]) -> ExtractionOutcome {
    let document = lopdf::Document::load_mem(bytes).map_err(|e| {
        debug!("PDF parse failed: {e}");
        ExtractionError::NoExtractableContent
    })?;

    // get_pages is keyed by page number, so iteration follows page order
    let pages: Vec<String> = document
        .get_pages()
        .keys()
        .map(|&number| {
            document.extract_text(&[number]).unwrap_or_else(|e| {
                debug!("No text on PDF page {number}: {e}");
                String::new()
            })
        })
        .collect();

    debug!(pages = pages.len(), "PDF parsed");
    Ok(pages.join("\n"))
}

#[derive(Debug, Error)]
enum DocxError {
    #[error("archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("read: {0}")]
    Io(#[from] std::io::Error),
    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("document.xml expands beyond {0} bytes")]
    TooLarge(u64),
}

fn extract_docx(bytes: &[u8]) -> ExtractionOutcome {
    let paragraphs = read_document_xml(bytes, MAX_DOCX_XML_BYTES)
        .and_then(|xml| docx_paragraphs(&xml))
        .map_err(|e| {
            debug!("DOCX parse failed: {e}");
            ExtractionError::NoExtractableContent
        })?;

    debug!(paragraphs = paragraphs.len(), "DOCX parsed");
    Ok(paragraphs.join("\n"))
}

/// Reads the main document part, decompressing at most `limit` bytes.
fn read_document_xml(bytes: &[u8], limit: u64) -> Result<String, DocxError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let entry = archive.by_name("word/document.xml")?;
    if entry.size() > limit {
        return Err(DocxError::TooLarge(limit));
    }

    // The declared size can lie, so the read itself is bounded too
    let mut xml = String::new();
    let read = entry.take(limit.saturating_add(1)).read_to_string(&mut xml)?;
    if u64::try_from(read).unwrap_or(u64::MAX) > limit {
        return Err(DocxError::TooLarge(limit));
    }
    Ok(xml)
}

/// Collects paragraph texts in document order. Empty paragraphs are kept.
///
/// Paragraph properties are skipped, so tab stop definitions never become
/// text. Of an `mc:AlternateContent` block only `mc:Choice` is read.
fn docx_paragraphs(xml: &str) -> Result<Vec<String>, DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    // Text boxes can nest paragraphs inside paragraphs
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    let mut runs = 0_usize;
    // Depth inside a skipped subtree
    let mut skipped = 0_usize;

    loop {
        let event = reader.read_event()?;
        if skipped > 0 {
            match event {
                Event::Start(_) => skipped += 1,
                Event::End(_) => skipped -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"r" => runs += 1,
                b"t" => in_text = true,
                b"pPr" | b"Fallback" => skipped = 1,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if runs > 0 => push_char(&mut open, '\t'),
                b"br" | b"cr" if runs > 0 => push_char(&mut open, '\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape()?;
                if let Some(paragraph) = open.last_mut() {
                    paragraph.push_str(&text);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => runs = runs.saturating_sub(1),
                b"p" => {
                    if let Some(paragraph) = open.pop() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn push_char(open: &mut [String], c: char) {
    if let Some(paragraph) = open.last_mut() {
        paragraph.push(c);
    }
}
