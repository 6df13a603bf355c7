// Pipeline - one synchronous pass from uploaded bytes to CSV bytes
// Fail fast: no downstream stage runs on unrecoverable input

use crate::customers::load_customers;
use crate::emit::emit_csv;
use crate::error::MergeError;
use crate::extract::{extract_lines, ProductFormat};
use crate::matcher::{match_rows, MatchConfig};
use crate::products::{ExtractionRule, ProductParser};
use crate::templates::EmailTemplate;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// PipelineConfig - immutable per-request configuration. Nothing here
/// is ambient state: two concurrent requests never share anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Declared format of the product file
    pub product_format: ProductFormat,

    /// Extraction rules; `None` uses the built-in rule set
    pub rules: Option<Vec<ExtractionRule>>,

    pub match_config: MatchConfig,

    /// When set, subject/body columns are appended to the output
    pub template: Option<EmailTemplate>,
}

impl PipelineConfig {
    pub fn new(product_format: ProductFormat) -> Self {
        PipelineConfig {
            product_format,
            rules: None,
            match_config: MatchConfig::default(),
            template: None,
        }
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

/// PipelineReport - counters surfaced to the caller alongside the CSV.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    pub lines_extracted: usize,
    pub products_extracted: usize,
    pub customers_loaded: usize,

    /// Customer rows excluded for a malformed email (partial success,
    /// reported, never fatal)
    pub customers_skipped: usize,

    pub customers_without_matches: usize,

    /// Zero here is the soft "no matches" outcome: the CSV is
    /// header-only and this is NOT an error.
    pub match_count: usize,
}

/// PipelineOutput - the merge CSV plus its report. Only materialized
/// after the full pipeline completes; fatal errors produce no bytes.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub csv: Vec<u8>,
    pub report: PipelineReport,
}

// ============================================================================
// RUN
// ============================================================================

/// Run the whole pipeline:
/// extract → parse products → load customers → match → emit.
pub fn run_pipeline(
    product_bytes: &[u8],
    customer_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<PipelineOutput, MergeError> {
    // 1. Text extraction (UnsupportedFormat/CorruptInput surface here)
    let lines = extract_lines(product_bytes, config.product_format)?;

    // 2. Product extraction
    let parser = match &config.rules {
        Some(rules) => ProductParser::from_rules(rules.clone())?,
        None => ProductParser::new(),
    };
    let products = parser.parse_lines(&lines);

    // 3. Customer load (MissingColumn surfaces here)
    let table = load_customers(customer_bytes)?;

    // 4. Match
    let outcome = match_rows(&products, &table, &config.match_config)?;

    // 5. Emit
    let csv = emit_csv(&outcome.rows, &table.extra_headers, config.template.as_ref())?;

    Ok(PipelineOutput {
        report: PipelineReport {
            lines_extracted: lines.len(),
            products_extracted: products.len(),
            customers_loaded: table.records.len(),
            customers_skipped: table.skipped_rows,
            customers_without_matches: outcome.customers_without_matches,
            match_count: outcome.rows.len(),
        },
        csv,
    })
}

// ============================================================================
// TESTS
// ============================================================================
