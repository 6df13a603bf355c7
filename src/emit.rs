// CSV Emitter - matched rows → mail_merge.csv bytes
// Fixed schema + pass-through columns; all quoting via the csv crate

use crate::error::MergeError;
use crate::matcher::MatchRow;
use crate::templates::EmailTemplate;

/// Download filename the upload layer should attach.
pub const OUTPUT_FILENAME: &str = "mail_merge.csv";

/// MIME type of the emitted bytes.
pub const OUTPUT_MIME: &str = "text/csv";

/// Fixed leading columns of every merge output.
const FIXED_HEADERS: [&str; 4] = ["email", "name", "product_sku", "product_name"];

/// Serialize matched rows to CSV bytes.
///
/// Header: `email,name,product_sku,product_name`, then the customer
/// pass-through headers verbatim, then `subject,body` when a template
/// is configured. Zero rows yield a header-only CSV (soft no-matches,
/// never an error). No row reaching this stage is ever dropped.
pub fn emit_csv(
    rows: &[MatchRow],
    extra_headers: &[String],
    template: Option<&EmailTemplate>,
) -> Result<Vec<u8>, MergeError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = FIXED_HEADERS.to_vec();
    header.extend(extra_headers.iter().map(|h| h.as_str()));
    if template.is_some() {
        header.push("subject");
        header.push("body");
    }
    writer.write_record(&header)?;

    let mut i = 0;
    while i < rows.len() {
        // Rows arrive grouped by customer (input order); the template
        // body lists every product matched for that customer.
        let group_end = match template {
            Some(_) => customer_group_end(rows, i),
            None => i + 1,
        };

        let rendered = template.map(|t| {
            let customer = &rows[i].customer;
            let products: Vec<_> = rows[i..group_end].iter().map(|r| &r.product).collect();
            (t.render_subject(customer), t.render_body(customer, &products))
        });

        for row in &rows[i..group_end] {
            let mut record: Vec<&str> = vec![
                row.customer.email.as_str(),
                row.customer.name.as_str(),
                row.product.identifier.as_str(),
                row.product.name.as_str(),
            ];
            record.extend(row.customer.extras.iter().map(|v| v.as_str()));
            if let Some((subject, body)) = &rendered {
                record.push(subject.as_str());
                record.push(body.as_str());
            }
            writer.write_record(&record)?;
        }

        i = group_end;
    }

    writer.flush().map_err(|e| MergeError::OutputCsv(e.to_string()))?;
    writer
        .into_inner()
        .map_err(|e| MergeError::OutputCsv(e.to_string()))
}

/// End of the run of consecutive rows belonging to the same customer.
fn customer_group_end(rows: &[MatchRow], start: usize) -> usize {
    let mut end = start + 1;
    while end < rows.len() && rows[end].customer == rows[start].customer {
        end += 1;
    }
    end
}

// ============================================================================
// TESTS
// ============================================================================
