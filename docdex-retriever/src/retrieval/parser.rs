//! Plain-text extraction from heterogeneous document files
//!
//! Dispatch is by file extension. A fixed set of basic text formats is read
//! verbatim as UTF-8 (invalid bytes replaced, never fatal). Structured
//! formats (PDF, Word, slides, HTML, spreadsheets) are routed to an optional
//! [`DocumentConverter`] capability that extracts body text, tables
//! (serialized to markdown so structure is not lost), and document metadata
//! prepended as a header block. When the converter is absent or fails, the
//! file is skipped with a warning, never silently truncated to empty.
//!
//! Office lock files (`~$...`) and unknown extensions are always skipped.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Extensions read verbatim as UTF-8 text.
pub const BASIC_TEXT_EXTENSIONS: &[&str] = &["txt", "md", "py", "json", "csv", "log"];

/// Extensions requiring the structured-document conversion capability.
pub const ADVANCED_EXTENSIONS: &[&str] = &["pdf", "docx", "pptx", "html", "htm", "xlsx"];

/// Prefix marking Office temp/lock files, always skipped.
pub const TEMP_FILE_PREFIX: &str = "~$";

/// Structured extraction result from an advanced document format.
#[derive(Debug, Clone, Default)]
pub struct ConvertedDocument {
    /// Body text, one entry per extracted element.
    pub text_blocks: Vec<String>,
    /// Tables serialized to a markdown-like form.
    pub tables: Vec<String>,
    pub title: Option<String>,
    pub authors: Option<String>,
}

impl ConvertedDocument {
    /// Flatten the extraction into indexable plain text: a metadata header
    /// (when present) followed by body and tables, paragraph-separated.
    pub fn into_text(self) -> String {
        let mut header_lines = Vec::new();
        if let Some(title) = &self.title {
            header_lines.push(format!("title: {title}"));
        }
        if let Some(authors) = &self.authors {
            header_lines.push(format!("authors: {authors}"));
        }

        let mut parts: Vec<String> = Vec::new();
        if !header_lines.is_empty() {
            parts.push(header_lines.join("\n"));
        }
        parts.extend(self.text_blocks);
        parts.extend(self.tables);
        parts.join("\n\n")
    }
}

/// Optional capability for extracting text from structured document formats.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, path: &Path) -> Result<ConvertedDocument>;
}

/// Extension-dispatched document parser.
pub struct DocumentParser {
    converter: Option<Arc<dyn DocumentConverter>>,
}

impl std::fmt::Debug for DocumentParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentParser")
            .field("converter", &self.converter.is_some())
            .finish()
    }
}

impl DocumentParser {
    pub fn new(converter: Option<Arc<dyn DocumentConverter>>) -> Self {
        Self { converter }
    }

    /// True for Office temp/lock files.
    pub fn is_temp_file(filename: &str) -> bool {
        filename.starts_with(TEMP_FILE_PREFIX)
    }

    /// Whether this parser can produce text for `path` in its current
    /// configuration. Advanced formats count only when a converter is wired.
    pub fn supports(&self, path: &Path) -> bool {
        match extension_of(path) {
            Some(ext) if BASIC_TEXT_EXTENSIONS.contains(&ext.as_str()) => true,
            Some(ext) if ADVANCED_EXTENSIONS.contains(&ext.as_str()) => self.converter.is_some(),
            _ => false,
        }
    }

    /// Extract plain text from `path`, or `None` if the file is skipped
    /// (temp file, unsupported extension, converter absent or failing).
    pub async fn parse(&self, path: &Path) -> Result<Option<String>> {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if Self::is_temp_file(name) {
                debug!("Skipping temp file: {}", path.display());
                return Ok(None);
            }
        }

        let Some(ext) = extension_of(path) else {
            debug!("Skipping file without extension: {}", path.display());
            return Ok(None);
        };

        if BASIC_TEXT_EXTENSIONS.contains(&ext.as_str()) {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
        }

        if ADVANCED_EXTENSIONS.contains(&ext.as_str()) {
            let Some(converter) = &self.converter else {
                warn!(
                    "No document converter available, skipping: {}",
                    path.display()
                );
                return Ok(None);
            };
            return match converter.convert(path).await {
                Ok(converted) => {
                    let text = converted.into_text();
                    debug!(
                        "Converted {}: {} chars extracted",
                        path.display(),
                        text.len()
                    );
                    Ok(Some(text))
                }
                Err(e) => {
                    warn!("Document conversion failed for {}: {e:#}", path.display());
                    Ok(None)
                }
            };
        }

        debug!("Skipping unsupported file type: {}", path.display());
        Ok(None)
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FixedConverter(ConvertedDocument);

    #[async_trait]
    impl DocumentConverter for FixedConverter {
        async fn convert(&self, _path: &Path) -> Result<ConvertedDocument> {
            Ok(self.0.clone())
        }
    }

    struct FailingConverter;

    #[async_trait]
    impl DocumentConverter for FailingConverter {
        async fn convert(&self, _path: &Path) -> Result<ConvertedDocument> {
            anyhow::bail!("converter exploded")
        }
    }

    #[test]
    fn test_temp_file_detection() {
        assert!(DocumentParser::is_temp_file("~$report.docx"));
        assert!(!DocumentParser::is_temp_file("report.docx"));
    }

    #[test]
    fn test_supports_depends_on_converter() {
        let bare = DocumentParser::new(None);
        assert!(bare.supports(&PathBuf::from("notes.txt")));
        assert!(bare.supports(&PathBuf::from("FAQ.MD")));
        assert!(!bare.supports(&PathBuf::from("report.pdf")));
        assert!(!bare.supports(&PathBuf::from("binary.exe")));
        assert!(!bare.supports(&PathBuf::from("Makefile")));

        let with_converter =
            DocumentParser::new(Some(Arc::new(FixedConverter(ConvertedDocument::default()))));
        assert!(with_converter.supports(&PathBuf::from("report.pdf")));
    }

    #[tokio::test]
    async fn test_basic_text_read_lossy() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("notes.txt");
        // Invalid UTF-8 in the middle must not be fatal.
        tokio::fs::write(&path, b"hello \xFF world").await?;

        let parser = DocumentParser::new(None);
        let text = parser.parse(&path).await?.expect("basic text parses");
        assert!(text.starts_with("hello "));
        assert!(text.ends_with(" world"));

        Ok(())
    }

    #[tokio::test]
    async fn test_advanced_without_converter_skips() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("report.pdf");
        tokio::fs::write(&path, b"%PDF-1.4 fake").await?;

        let parser = DocumentParser::new(None);
        assert!(parser.parse(&path).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_converter_failure_skips_with_warning() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("report.pdf");
        tokio::fs::write(&path, b"%PDF-1.4 fake").await?;

        let parser = DocumentParser::new(Some(Arc::new(FailingConverter)));
        assert!(parser.parse(&path).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_converted_document_assembly() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("guide.docx");
        tokio::fs::write(&path, b"fake docx").await?;

        let converted = ConvertedDocument {
            text_blocks: vec!["First section.".to_string(), "Second section.".to_string()],
            tables: vec!["| fee | amount |\n| --- | --- |\n| wire | 25 |".to_string()],
            title: Some("Fee Guide".to_string()),
            authors: Some("Operations".to_string()),
        };
        let parser = DocumentParser::new(Some(Arc::new(FixedConverter(converted))));

        let text = parser.parse(&path).await?.expect("converts");
        assert!(text.starts_with("title: Fee Guide\nauthors: Operations"));
        assert!(text.contains("First section."));
        assert!(text.contains("| wire | 25 |"));

        Ok(())
    }

    #[tokio::test]
    async fn test_temp_file_skipped_even_with_known_extension() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("~$draft.txt");
        tokio::fs::write(&path, "lock file noise").await?;

        let parser = DocumentParser::new(None);
        assert!(parser.parse(&path).await?.is_none());

        Ok(())
    }
}
