// Catalog Mail-Merge - Core Library
// Exposes the pipeline for use in the CLI, web server, and tests

pub mod customers;
pub mod emit;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod pipeline;
pub mod products;
pub mod templates;

// Re-export commonly used types
pub use customers::{load_customers, CustomerRecord, CustomerTable};
pub use emit::{emit_csv, OUTPUT_FILENAME, OUTPUT_MIME};
pub use error::MergeError;
pub use extract::{extract_lines, CsvExtractor, LineExtractor, PdfExtractor, ProductFormat};
pub use matcher::{match_rows, MatchConfig, MatchOutcome, MatchPredicate, MatchRow};
pub use pipeline::{run_pipeline, PipelineConfig, PipelineOutput, PipelineReport};
pub use products::{parse_products, ExtractionRule, ProductParser, ProductRecord};
pub use templates::EmailTemplate;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
