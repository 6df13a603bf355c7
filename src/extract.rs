// Text Extractor - uploaded catalog bytes → ordered text lines
// PDF and CSV backends behind one swappable trait

use crate::error::MergeError;
use serde::{Deserialize, Serialize};

// ============================================================================
// PRODUCT FORMAT
// ============================================================================

/// ProductFormat - declared format of the uploaded product catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductFormat {
    Pdf,
    Csv,
}

impl ProductFormat {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            ProductFormat::Pdf => "PDF",
            ProductFormat::Csv => "CSV",
        }
    }

    /// Resolve a content-type / format hint from the upload layer.
    ///
    /// Accepts short names ("pdf", "csv") and the common MIME types.
    pub fn from_hint(hint: &str) -> Result<Self, MergeError> {
        let hint_lower = hint.trim().to_lowercase();

        if hint_lower == "pdf" || hint_lower.contains("application/pdf") {
            return Ok(ProductFormat::Pdf);
        }

        if hint_lower == "csv" || hint_lower.contains("text/csv") {
            return Ok(ProductFormat::Csv);
        }

        Err(MergeError::UnsupportedFormat(hint.to_string()))
    }

    /// Detect format from an uploaded filename's extension.
    pub fn from_filename(filename: &str) -> Result<Self, MergeError> {
        match filename.rsplit('.').next().map(|ext| ext.to_lowercase()) {
            Some(ext) if ext == "pdf" => Ok(ProductFormat::Pdf),
            Some(ext) if ext == "csv" => Ok(ProductFormat::Csv),
            _ => Err(MergeError::UnsupportedFormat(filename.to_string())),
        }
    }
}

// ============================================================================
// LINE EXTRACTOR TRAIT
// ============================================================================

/// LineExtractor - narrow capability interface for text extraction.
///
/// The PDF backend is a third-party heuristic; keeping it behind this
/// trait means it can be substituted without touching parsing/matching.
pub trait LineExtractor {
    /// Extract trimmed, non-empty text lines in source order.
    fn extract_lines(&self, bytes: &[u8]) -> Result<Vec<String>, MergeError>;

    /// Which format this extractor handles
    fn format(&self) -> ProductFormat;
}

/// Dispatch on the declared format and extract lines.
pub fn extract_lines(bytes: &[u8], format: ProductFormat) -> Result<Vec<String>, MergeError> {
    let extractor: Box<dyn LineExtractor> = match format {
        ProductFormat::Pdf => Box::new(PdfExtractor::new()),
        ProductFormat::Csv => Box::new(CsvExtractor::new()),
    };
    extractor.extract_lines(bytes)
}

// ============================================================================
// PDF BACKEND
// ============================================================================

/// PDF text extraction via the `pdf-extract` crate.
///
/// Best-effort: pages with only images yield no lines. Page order is
/// preserved; lines within a page come out in document order.
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        PdfExtractor
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineExtractor for PdfExtractor {
    fn extract_lines(&self, bytes: &[u8]) -> Result<Vec<String>, MergeError> {
        // Magic-bytes check up front: plain text declared as PDF must
        // fail fast, before the extraction backend sees it.
        if !bytes.starts_with(b"%PDF-") {
            return Err(MergeError::CorruptInput {
                format: "PDF",
                reason: "missing %PDF- header".to_string(),
            });
        }

        let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
            MergeError::CorruptInput {
                format: "PDF",
                reason: e.to_string(),
            }
        })?;

        Ok(text
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    fn format(&self) -> ProductFormat {
        ProductFormat::Pdf
    }
}

// ============================================================================
// CSV BACKEND
// ============================================================================

/// CSV catalog extraction: each record becomes one text line, fields
/// rejoined with a single space so the rule regexes see natural text.
pub struct CsvExtractor;

impl CsvExtractor {
    pub fn new() -> Self {
        CsvExtractor
    }
}

impl Default for CsvExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineExtractor for CsvExtractor {
    fn extract_lines(&self, bytes: &[u8]) -> Result<Vec<String>, MergeError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut lines = Vec::new();
        let mut records_read = 0usize;
        let mut last_error: Option<csv::Error> = None;

        for result in reader.records() {
            // An individually unreadable record (e.g. invalid UTF-8) is
            // skipped; CorruptInput is reserved for streams where no
            // record parses at all.
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            };
            records_read += 1;

            let line = record
                .iter()
                .map(|field| field.trim())
                .filter(|field| !field.is_empty())
                .collect::<Vec<_>>()
                .join(" ");

            if !line.is_empty() {
                lines.push(line);
            }
        }

        if records_read == 0 {
            if let Some(e) = last_error {
                return Err(MergeError::CorruptInput {
                    format: "CSV",
                    reason: e.to_string(),
                });
            }
        }

        Ok(lines)
    }

    fn format(&self) -> ProductFormat {
        ProductFormat::Csv
    }
}

// ============================================================================
// TESTS
// ============================================================================
