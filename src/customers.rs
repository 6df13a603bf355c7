// Customer Loader - customer CSV → ordered, validated customer records
// Malformed rows are skipped and counted, never fatal

use crate::error::MergeError;
use serde::{Deserialize, Serialize};

// ============================================================================
// CUSTOMER RECORD
// ============================================================================

/// CustomerRecord - one validated row of the uploaded customer CSV.
/// Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Well-formed email address (rows failing validation never load)
    pub email: String,

    /// Customer name, empty when the CSV has no name column
    pub name: String,

    /// Pass-through column values, aligned with `CustomerTable::extra_headers`
    pub extras: Vec<String>,
}

impl CustomerRecord {
    /// Value of a pass-through column by header name, if present.
    pub fn extra<'a>(&'a self, table: &CustomerTable, header: &str) -> Option<&'a str> {
        let idx = table
            .extra_headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(header))?;
        self.extras.get(idx).map(|s| s.as_str())
    }
}

/// CustomerTable - ordered records plus the load report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerTable {
    /// Valid records in input order
    pub records: Vec<CustomerRecord>,

    /// Headers of pass-through columns, in source column order
    pub extra_headers: Vec<String>,

    /// Rows excluded for an empty or malformed email (or unreadable row)
    pub skipped_rows: usize,

    /// Total data rows seen (records + skipped)
    pub total_rows: usize,
}

// ============================================================================
// LOADER
// ============================================================================

/// Parse the customer CSV byte stream.
///
/// Required column: an email-like header (case-insensitive, "email" or a
/// header containing "email"). Missing header → `MissingColumn`. A
/// header row that cannot be read at all → `CorruptInput`. Rows with an
/// empty or syntactically invalid email are skipped and counted.
pub fn load_customers(bytes: &[u8]) -> Result<CustomerTable, MergeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| MergeError::CorruptInput {
            format: "customer CSV",
            reason: e.to_string(),
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() {
        return Err(MergeError::CorruptInput {
            format: "customer CSV",
            reason: "no header row".to_string(),
        });
    }

    let email_idx = find_column(&headers, "email")
        .ok_or_else(|| MergeError::MissingColumn("email".to_string()))?;
    let name_idx = find_column(&headers, "name");

    // Everything that is not the email/name column passes through
    // verbatim, source column order preserved.
    let extra_indices: Vec<usize> = (0..headers.len())
        .filter(|&i| i != email_idx && Some(i) != name_idx)
        .collect();
    let extra_headers: Vec<String> = extra_indices
        .iter()
        .map(|&i| headers[i].clone())
        .collect();

    let mut records = Vec::new();
    let mut skipped_rows = 0usize;
    let mut total_rows = 0usize;

    for result in reader.records() {
        total_rows += 1;

        // A row-level read error is a malformed row, not a fatal one.
        let record = match result {
            Ok(r) => r,
            Err(_) => {
                skipped_rows += 1;
                continue;
            }
        };

        let email = record.get(email_idx).unwrap_or("").trim().to_string();
        if !is_valid_email(&email) {
            skipped_rows += 1;
            continue;
        }

        let name = name_idx
            .and_then(|i| record.get(i))
            .unwrap_or("")
            .trim()
            .to_string();

        let extras: Vec<String> = extra_indices
            .iter()
            .map(|&i| record.get(i).unwrap_or("").to_string())
            .collect();

        records.push(CustomerRecord {
            email,
            name,
            extras,
        });
    }

    Ok(CustomerTable {
        records,
        extra_headers,
        skipped_rows,
        total_rows,
    })
}

/// Locate a column whose header equals or contains `needle`
/// (case-insensitive). Exact match wins over containment.
fn find_column(headers: &[String], needle: &str) -> Option<usize> {
    let needle_lower = needle.to_lowercase();

    if let Some(idx) = headers
        .iter()
        .position(|h| h.to_lowercase() == needle_lower)
    {
        return Some(idx);
    }

    headers
        .iter()
        .position(|h| h.to_lowercase().contains(&needle_lower))
}

/// Syntactic email check: one '@', non-empty local part, domain with a
/// dot and no leading/trailing dot, no whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    if local.is_empty() || domain.is_empty() {
        return false;
    }

    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

// ============================================================================
// TESTS
// ============================================================================
