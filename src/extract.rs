//! Raw text extraction from resume documents.
//!
//! PDFs are read page by page with `lopdf`; a page that fails to decode contributes no text
//! instead of failing the document. Anything that is not a PDF is read as UTF-8 text.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading a document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The document could not be read from disk.
    #[error("Failed to read document {path}: {source}")]
    ReadDocument {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The PDF structure could not be parsed at all.
    #[error("Failed to parse PDF {path}: {message}")]
    Pdf {
        /// Path of the malformed PDF.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },
}

/// Turns a document on disk into raw text.
pub trait TextExtractor: Send + Sync {
    /// Extract the document's text. Per-page failures must degrade to empty text for that page.
    fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Extractor for PDF and plain-text resumes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let _span = tracing::info_span!("extract.document", path = %path.display()).entered();

        let bytes = std::fs::read(path).map_err(|source| ExtractionError::ReadDocument {
            path: path.to_path_buf(),
            source,
        })?;

        if is_pdf(path, &bytes) {
            let doc = lopdf::Document::load_mem(&bytes).map_err(|e| ExtractionError::Pdf {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            Ok(extract_pdf_pages(&doc))
        } else {
            Ok(String::from_utf8_lossy(&bytes).trim().to_string())
        }
    }
}

fn is_pdf(path: &Path, bytes: &[u8]) -> bool {
    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    by_extension || bytes.starts_with(b"%PDF-")
}

fn extract_pdf_pages(doc: &lopdf::Document) -> String {
    let pages = doc.get_pages();
    let total = pages.len();
    let texts = pages.into_keys().map(|page_num| {
        doc.extract_text(&[page_num]).unwrap_or_else(|error| {
            tracing::warn!(page = page_num, %error, "Failed to extract page text; skipping");
            String::new()
        })
    });
    let text = join_pages(texts);
    tracing::debug!(pages = total, chars = text.chars().count(), "Extracted PDF text");
    text
}

/// Join page texts with a blank line, skipping pages that produced nothing.
pub(crate) fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    pages
        .into_iter()
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_plain_text_documents() {
        let mut file = tempfile::Builder::new()
            .suffix(".txt")
            .tempfile()
            .expect("temp file");
        write!(file, "\n  Jane Doe\nStaff Engineer  \n").expect("write");

        let text = DocumentExtractor.extract(file.path()).expect("extract");
        assert_eq!(text, "Jane Doe\nStaff Engineer");
    }

    #[test]
    fn missing_document_is_a_read_error() {
        let error = DocumentExtractor
            .extract(Path::new("/definitely/not/here.pdf"))
            .unwrap_err();
        assert!(matches!(error, ExtractionError::ReadDocument { .. }));
    }

    #[test]
    fn malformed_pdf_is_a_parse_error() {
        let mut file = tempfile::Builder::new()
            .suffix(".pdf")
            .tempfile()
            .expect("temp file");
        file.write_all(b"not really a pdf").expect("write");

        let error = DocumentExtractor.extract(file.path()).unwrap_err();
        assert!(matches!(error, ExtractionError::Pdf { .. }));
    }

    #[test]
    fn pdf_detection_uses_extension_or_magic() {
        assert!(is_pdf(Path::new("resume.PDF"), b""));
        assert!(is_pdf(Path::new("resume.bin"), b"%PDF-1.7"));
        assert!(!is_pdf(Path::new("resume.txt"), b"plain"));
    }

    #[test]
    fn join_pages_skips_empty_pages() {
        let joined = join_pages(vec![
            "Page one".to_string(),
            String::new(),
            "Page three\n".to_string(),
        ]);
        assert_eq!(joined, "Page one\n\nPage three");
    }

    #[test]
    fn join_pages_of_nothing_is_empty() {
        assert_eq!(join_pages(Vec::<String>::new()), "");
    }
}
