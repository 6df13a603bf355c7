// Matcher - join extracted products against customer records
// Predicate-filtered cross join, order preserving, O(products) per customer

use crate::customers::{CustomerRecord, CustomerTable};
use crate::error::MergeError;
use crate::products::ProductRecord;
use serde::{Deserialize, Serialize};

// ============================================================================
// MATCH PREDICATE
// ============================================================================

/// Rule deciding whether a product is relevant to a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPredicate {
    /// Default: case-insensitive substring containment of the customer's
    /// name (or their `preferred_category` pass-through value, when that
    /// column exists) in the product's name or identifier.
    NameSubstring,

    /// The customer CSV carries a column of explicitly assigned SKUs
    /// (semicolon or comma separated); a product matches when its
    /// identifier is listed.
    SkuList { column: String },
}

impl Default for MatchPredicate {
    fn default() -> Self {
        MatchPredicate::NameSubstring
    }
}

/// MatchConfig - immutable matcher configuration, passed in at call
/// time so each pipeline run is independently testable and reentrant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchConfig {
    pub predicate: MatchPredicate,

    /// Cap on matched products per customer, applied in product order.
    /// `None` keeps every match.
    pub max_matches_per_customer: Option<usize>,
}

// ============================================================================
// MATCH ROW
// ============================================================================

/// MatchRow - one (customer, matched product) pair, consumed once by
/// the CSV emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    pub customer: CustomerRecord,
    pub product: ProductRecord,
}

/// MatchOutcome - ordered rows plus counts for the pipeline report.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Rows in (customer input order, product extraction order)
    pub rows: Vec<MatchRow>,

    /// Customers that matched nothing (policy: they emit no row)
    pub customers_without_matches: usize,
}

// ============================================================================
// MATCHER
// ============================================================================

/// Product fields lowercased once up front; predicate evaluation per
/// customer is then a plain scan, never a re-parse.
struct IndexedProduct<'a> {
    product: &'a ProductRecord,
    name_lower: String,
    identifier_lower: String,
    category_lower: Option<String>,
}

/// Join products against customers under the configured predicate.
///
/// For each customer in input order, products are scanned in extraction
/// order; every match becomes its own MatchRow. A customer matching
/// zero products yields no row. A numeric `max_budget` pass-through
/// value excludes products whose known price exceeds it; products with
/// no price guess always pass.
pub fn match_rows(
    products: &[ProductRecord],
    table: &CustomerTable,
    config: &MatchConfig,
) -> Result<MatchOutcome, MergeError> {
    // SkuList needs its column up front: a missing column is a
    // configuration error, detected before any row is produced.
    let sku_column_idx = match &config.predicate {
        MatchPredicate::SkuList { column } => {
            let idx = table
                .extra_headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(column))
                .ok_or_else(|| MergeError::MissingColumn(column.clone()))?;
            Some(idx)
        }
        MatchPredicate::NameSubstring => None,
    };

    let preferred_category_idx = table
        .extra_headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("preferred_category"));

    let max_budget_idx = table
        .extra_headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("max_budget"));

    let indexed: Vec<IndexedProduct> = products
        .iter()
        .map(|p| IndexedProduct {
            product: p,
            name_lower: p.name.to_lowercase(),
            identifier_lower: p.identifier.to_lowercase(),
            category_lower: p.category.as_ref().map(|c| c.to_lowercase()),
        })
        .collect();

    let mut rows = Vec::new();
    let mut customers_without_matches = 0usize;

    for customer in &table.records {
        let mut matched_any = false;
        let mut matched_count = 0usize;

        // Per-customer needles, computed once before the product scan
        let needles = match &config.predicate {
            MatchPredicate::NameSubstring => {
                substring_needles(customer, preferred_category_idx)
            }
            MatchPredicate::SkuList { .. } => Vec::new(),
        };
        let sku_set = sku_column_idx.map(|idx| sku_set_for(customer, idx));

        // Budget from the customer's `max_budget` cell, when it parses
        let max_budget = max_budget_idx
            .and_then(|idx| customer.extras.get(idx))
            .and_then(|cell| cell.trim().parse::<f64>().ok());

        for item in &indexed {
            let is_match = match &config.predicate {
                MatchPredicate::NameSubstring => substring_match(item, &needles),
                MatchPredicate::SkuList { .. } => sku_set
                    .as_ref()
                    .is_some_and(|set| {
                        !item.identifier_lower.is_empty()
                            && set.iter().any(|sku| *sku == item.identifier_lower)
                    }),
            };

            if !is_match {
                continue;
            }

            // Unknown prices pass; a known price must fit the budget
            if let (Some(budget), Some(price)) = (max_budget, item.product.price) {
                if price > budget {
                    continue;
                }
            }

            if let Some(cap) = config.max_matches_per_customer {
                if matched_count >= cap {
                    break;
                }
            }

            rows.push(MatchRow {
                customer: customer.clone(),
                product: item.product.clone(),
            });
            matched_any = true;
            matched_count += 1;
        }

        if !matched_any {
            customers_without_matches += 1;
        }
    }

    Ok(MatchOutcome {
        rows,
        customers_without_matches,
    })
}

/// Needles for the default predicate: the customer's name, plus their
/// preferred category when that pass-through column has a value.
fn substring_needles(
    customer: &CustomerRecord,
    preferred_category_idx: Option<usize>,
) -> Vec<String> {
    let mut needles = Vec::new();

    let name = customer.name.trim().to_lowercase();
    if !name.is_empty() {
        needles.push(name);
    }

    if let Some(idx) = preferred_category_idx {
        if let Some(category) = customer.extras.get(idx) {
            let category = category.trim().to_lowercase();
            if !category.is_empty() {
                needles.push(category);
            }
        }
    }

    needles
}

fn substring_match(item: &IndexedProduct, needles: &[String]) -> bool {
    needles.iter().any(|needle| {
        item.name_lower.contains(needle)
            || (!item.identifier_lower.is_empty() && item.identifier_lower.contains(needle))
            || item
                .category_lower
                .as_ref()
                .is_some_and(|c| c.contains(needle))
    })
}

/// Split the customer's assigned-SKU cell on ';' and ','.
fn sku_set_for(customer: &CustomerRecord, idx: usize) -> Vec<String> {
    customer
        .extras
        .get(idx)
        .map(|cell| {
            cell.split([';', ','])
                .map(|sku| sku.trim().to_lowercase())
                .filter(|sku| !sku.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customers::load_customers;

    fn product(identifier: &str, name: &str) -> ProductRecord {
        ProductRecord {
            identifier: identifier.to_string(),
            name: name.to_string(),
            raw_line: format!("{} {}", identifier, name),
            price: None,
            category: None,
        }
    }

    #[test]
    fn test_name_substring_default_predicate() {
        let products = vec![
            product("PN-1", "Widget deluxe"),
            product("PN-2", "Gadget mini"),
        ];
        let table = load_customers(b"email,name\nw@x.com,Widget\n").unwrap();

        let outcome = match_rows(&products, &table, &MatchConfig::default()).unwrap();

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].product.identifier, "PN-1");
        assert_eq!(outcome.customers_without_matches, 0);
    }

    #[test]
    fn test_two_customers_one_product() {
        let products = vec![product("SKU1", "Widget")];
        let table =
            load_customers(b"email,name\nfirst@x.com,Widget\nsecond@y.com,widget\n").unwrap();

        let outcome = match_rows(&products, &table, &MatchConfig::default()).unwrap();

        // Two rows, same product fields, customer input order preserved
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].customer.email, "first@x.com");
        assert_eq!(outcome.rows[1].customer.email, "second@y.com");
        assert_eq!(outcome.rows[0].product, outcome.rows[1].product);
    }

    #[test]
    fn test_zero_match_customer_yields_no_row() {
        let products = vec![product("SKU1", "Widget")];
        let table = load_customers(b"email,name\nnobody@x.com,Sprocket\n").unwrap();

        let outcome = match_rows(&products, &table, &MatchConfig::default()).unwrap();

        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.customers_without_matches, 1);
    }

    #[test]
    fn test_empty_product_set_is_not_an_error() {
        let table = load_customers(b"email,name\na@x.com,Widget\n").unwrap();
        let outcome = match_rows(&[], &table, &MatchConfig::default()).unwrap();

        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.customers_without_matches, 1);
    }

    #[test]
    fn test_product_order_preserved_within_customer() {
        let products = vec![
            product("PN-1", "Widget alpha"),
            product("PN-2", "Widget beta"),
            product("PN-3", "Widget gamma"),
        ];
        let table = load_customers(b"email,name\nw@x.com,Widget\n").unwrap();

        let outcome = match_rows(&products, &table, &MatchConfig::default()).unwrap();

        let ids: Vec<&str> = outcome
            .rows
            .iter()
            .map(|r| r.product.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["PN-1", "PN-2", "PN-3"]);
    }

    #[test]
    fn test_max_matches_per_customer_cap() {
        let products = vec![
            product("PN-1", "Widget alpha"),
            product("PN-2", "Widget beta"),
            product("PN-3", "Widget gamma"),
        ];
        let table = load_customers(b"email,name\nw@x.com,Widget\n").unwrap();

        let config = MatchConfig {
            predicate: MatchPredicate::NameSubstring,
            max_matches_per_customer: Some(2),
        };
        let outcome = match_rows(&products, &table, &config).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[1].product.identifier, "PN-2");
    }

    #[test]
    fn test_preferred_category_needle() {
        let mut pen = product("PN-1", "Brass item");
        pen.category = Some("Pen".to_string());
        let products = vec![pen, product("NB-1", "Plain item")];

        let table =
            load_customers(b"email,name,preferred_category\nc@x.com,Zelda,Pen\n").unwrap();

        let outcome = match_rows(&products, &table, &MatchConfig::default()).unwrap();

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].product.identifier, "PN-1");
    }

    #[test]
    fn test_max_budget_filters_priced_products() {
        let mut cheap = product("PN-1", "Widget basic");
        cheap.price = Some(5.0);
        let mut dear = product("PN-2", "Widget luxe");
        dear.price = Some(50.0);
        let mystery = product("PN-3", "Widget mystery"); // no price guess
        let products = vec![cheap, dear, mystery];

        let table = load_customers(b"email,name,max_budget\nw@x.com,Widget,10\n").unwrap();
        let outcome = match_rows(&products, &table, &MatchConfig::default()).unwrap();

        let ids: Vec<&str> = outcome
            .rows
            .iter()
            .map(|r| r.product.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["PN-1", "PN-3"]);
    }

    #[test]
    fn test_unparseable_budget_is_ignored() {
        let mut dear = product("PN-1", "Widget luxe");
        dear.price = Some(50.0);
        let products = vec![dear];

        let table = load_customers(b"email,name,max_budget\nw@x.com,Widget,plenty\n").unwrap();
        let outcome = match_rows(&products, &table, &MatchConfig::default()).unwrap();

        assert_eq!(outcome.rows.len(), 1);
    }

    #[test]
    fn test_sku_list_predicate() {
        let products = vec![
            product("PN-1", "Widget"),
            product("PN-2", "Gadget"),
            product("PN-3", "Sprocket"),
        ];
        let table = load_customers(
            b"email,name,assigned_skus\na@x.com,Alice,PN-1; PN-3\nb@y.com,Bob,\n",
        )
        .unwrap();

        let config = MatchConfig {
            predicate: MatchPredicate::SkuList {
                column: "assigned_skus".to_string(),
            },
            max_matches_per_customer: None,
        };
        let outcome = match_rows(&products, &table, &config).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].product.identifier, "PN-1");
        assert_eq!(outcome.rows[1].product.identifier, "PN-3");
        assert_eq!(outcome.customers_without_matches, 1);
    }

    #[test]
    fn test_sku_list_missing_column_is_fatal() {
        let products = vec![product("PN-1", "Widget")];
        let table = load_customers(b"email,name\na@x.com,Alice\n").unwrap();

        let config = MatchConfig {
            predicate: MatchPredicate::SkuList {
                column: "assigned_skus".to_string(),
            },
            max_matches_per_customer: None,
        };
        let err = match_rows(&products, &table, &config).unwrap_err();

        assert_eq!(err.kind(), "missing_column");
    }

    #[test]
    fn test_customer_with_empty_name_matches_nothing() {
        let products = vec![product("PN-1", "Widget")];
        let table = load_customers(b"email,name\nanon@x.com,\n").unwrap();

        let outcome = match_rows(&products, &table, &MatchConfig::default()).unwrap();
        assert!(outcome.rows.is_empty());
    }
}
