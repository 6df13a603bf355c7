// Product Parser - heuristic extraction rules over catalog text lines
// Rules as data: ordered regex patterns, first match wins per line

use crate::error::MergeError;
use crate::extract::ProductFormat;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

// ============================================================================
// PRODUCT RECORD
// ============================================================================

/// ProductRecord - one normalized product extracted from the catalog.
///
/// Identifier uniqueness is not guaranteed by the source; records are
/// de-duplicated by the (identifier, name) pair, insertion order kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// SKU-like identifier when a rule captured one, empty otherwise
    pub identifier: String,

    /// Product name as captured by the winning rule
    pub name: String,

    /// Original line, kept for debugging and predicate matching
    pub raw_line: String,

    /// Best-effort price guess from the line (currency symbol stripped)
    pub price: Option<f64>,

    /// Category keyword found in the line, if any
    pub category: Option<String>,
}

// ============================================================================
// EXTRACTION RULES
// ============================================================================

/// ExtractionRule - one pattern in the ordered rule list.
///
/// The regex must define a named capture group `name`; a `sku` group is
/// optional. Rules are serde-loadable so rule sets live as JSON data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRule {
    /// Rule ID for tracking
    pub id: String,

    /// Regex with named capture groups `sku` (optional) and `name`
    pub pattern: String,

    /// Priority (higher = tried first)
    #[serde(default)]
    pub priority: i32,

    /// Description/notes about this rule
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug)]
struct CompiledRule {
    priority: i32,
    regex: Regex,
}

/// Category keywords guessed from catalog lines (stationery domain).
const CATEGORY_KEYWORDS: [&str; 7] = [
    "Pen",
    "Ink",
    "Paper",
    "Notebook",
    "Accessory",
    "Set",
    "Refill",
];

/// Price token: optional currency symbol, up to 4 integer digits,
/// optional 2 decimals with '.' or ',' separator.
const PRICE_PATTERN: &str = r"[£$€]?\s?(\d{1,4}(?:[.,]\d{2})?)";

// ============================================================================
// PRODUCT PARSER
// ============================================================================

#[derive(Debug)]
pub struct ProductParser {
    /// Compiled rules, sorted by priority (higher first, stable)
    rules: Vec<CompiledRule>,

    price_regex: Regex,

    /// Cap on extracted products, guards against degenerate catalogs
    max_products: usize,
}

impl ProductParser {
    /// Create a parser with the built-in rule set.
    pub fn new() -> Self {
        // Built-in patterns are compile-tested; see tests below.
        Self::from_rules(Self::default_rules())
            .expect("built-in extraction rules must compile")
    }

    /// The built-in rule set, in priority order:
    /// 1. SKU-led line: "PN-1042 Brass Fountain Pen"
    /// 2. Price-terminated line: "Brass Fountain Pen £24.99"
    /// 3. Any line with a word of 3+ letters becomes a name-only record
    pub fn default_rules() -> Vec<ExtractionRule> {
        vec![
            ExtractionRule {
                id: "sku-led".to_string(),
                pattern: r"^(?P<sku>[A-Z]{2,8}-?\d{1,6})\s+(?P<name>.+)$".to_string(),
                priority: 100,
                description: Some("SKU-like token at line start, rest is the name".to_string()),
            },
            ExtractionRule {
                id: "price-terminated".to_string(),
                pattern:
                    r"^(?P<name>.+?)\s+(?:[£$€]\s?\d{1,4}(?:[.,]\d{2})?|\d{1,4}[.,]\d{2})$"
                        .to_string(),
                priority: 50,
                description: Some("name followed by a trailing price token".to_string()),
            },
            ExtractionRule {
                id: "worded-line".to_string(),
                pattern: r"^(?P<name>.*[A-Za-z]{3,}.*)$".to_string(),
                priority: 0,
                description: Some("fallback: any line with a 3+ letter word".to_string()),
            },
        ]
    }

    /// Create a parser from an explicit rule list.
    pub fn from_rules(rules: Vec<ExtractionRule>) -> Result<Self, MergeError> {
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            let regex = Regex::new(&rule.pattern).map_err(|e| MergeError::InvalidRule {
                id: rule.id.clone(),
                reason: e.to_string(),
            })?;

            if regex.capture_names().flatten().all(|n| n != "name") {
                return Err(MergeError::InvalidRule {
                    id: rule.id.clone(),
                    reason: "pattern has no named capture group 'name'".to_string(),
                });
            }

            compiled.push(CompiledRule {
                priority: rule.priority,
                regex,
            });
        }

        // Sort by priority (higher first); stable sort keeps insertion
        // order for equal priorities.
        compiled.sort_by(|a, b| b.priority.cmp(&a.priority));

        let price_regex =
            Regex::new(PRICE_PATTERN).map_err(|e| MergeError::InvalidRule {
                id: "price".to_string(),
                reason: e.to_string(),
            })?;

        Ok(ProductParser {
            rules: compiled,
            price_regex,
            max_products: 1000,
        })
    }

    /// Load a rule list from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rules: Vec<ExtractionRule> =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        Ok(Self::from_rules(rules)?)
    }

    /// Number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Scan lines and extract product records.
    ///
    /// Per line, rules are tried in priority order and the first match
    /// wins; unmatched lines are silently skipped. Records are
    /// de-duplicated across the whole input by (identifier, name), with
    /// insertion order preserved. Deterministic for identical input.
    pub fn parse_lines(&self, lines: &[String]) -> Vec<ProductRecord> {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut records = Vec::new();

        for line in lines {
            let Some(candidate) = self.parse_line(line) else {
                continue;
            };

            let key = (candidate.identifier.clone(), candidate.name.clone());
            if seen.insert(key) {
                records.push(candidate);
                if records.len() >= self.max_products {
                    break;
                }
            }
        }

        records
    }

    /// Apply the rule list to one line; first matching rule wins.
    fn parse_line(&self, line: &str) -> Option<ProductRecord> {
        for rule in &self.rules {
            let Some(caps) = rule.regex.captures(line) else {
                continue;
            };

            let name = caps
                .name("name")
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            if name.is_empty() {
                // A rule that matched but captured nothing usable does
                // not fall through to later rules: first match wins.
                return None;
            }

            let identifier = caps
                .name("sku")
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();

            return Some(ProductRecord {
                identifier,
                name,
                raw_line: line.to_string(),
                price: self.guess_price(line),
                category: guess_category(line),
            });
        }

        None
    }

    /// Best-effort price guess: first price-shaped token on the line.
    fn guess_price(&self, line: &str) -> Option<f64> {
        let caps = self.price_regex.captures(line)?;
        caps.get(1)?.as_str().replace(',', ".").parse::<f64>().ok()
    }
}

impl Default for ProductParser {
    fn default() -> Self {
        Self::new()
    }
}

/// First category keyword appearing as a whole word on the line.
fn guess_category(line: &str) -> Option<String> {
    for keyword in CATEGORY_KEYWORDS {
        let keyword_lower = keyword.to_lowercase();
        let found = line
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word.to_lowercase() == keyword_lower);
        if found {
            return Some(keyword.to_string());
        }
    }
    None
}

/// Convenience: extract lines then parse them in one call.
pub fn parse_products(
    bytes: &[u8],
    format: ProductFormat,
    parser: &ProductParser,
) -> Result<Vec<ProductRecord>, MergeError> {
    let lines = crate::extract::extract_lines(bytes, format)?;
    Ok(parser.parse_lines(&lines))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_rules_compile() {
        let parser = ProductParser::new();
        assert_eq!(parser.rule_count(), 3);
    }

    #[test]
    fn test_sku_led_line() {
        let parser = ProductParser::new();
        let records = parser.parse_lines(&lines(&["PN-1042 Brass Fountain Pen"]));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier, "PN-1042");
        assert_eq!(records[0].name, "Brass Fountain Pen");
        assert_eq!(records[0].raw_line, "PN-1042 Brass Fountain Pen");
    }

    #[test]
    fn test_price_terminated_line() {
        let parser = ProductParser::new();
        let records = parser.parse_lines(&lines(&["Brass Fountain Pen £24.99"]));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier, "");
        assert_eq!(records[0].name, "Brass Fountain Pen");
        assert_eq!(records[0].price, Some(24.99));
    }

    #[test]
    fn test_first_rule_wins_per_line() {
        // A SKU-led line that also ends in a price must be claimed by
        // the higher-priority SKU rule.
        let parser = ProductParser::new();
        let records = parser.parse_lines(&lines(&["PN-1042 Brass Fountain Pen 24.99"]));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier, "PN-1042");
        assert_eq!(records[0].name, "Brass Fountain Pen 24.99");
    }

    #[test]
    fn test_fallback_rule_takes_whole_line() {
        let parser = ProductParser::new();
        let records = parser.parse_lines(&lines(&["Limited edition notebook"]));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Limited edition notebook");
        assert_eq!(records[0].category, Some("Notebook".to_string()));
    }

    #[test]
    fn test_unmatched_lines_silently_skipped() {
        let parser = ProductParser::new();
        let records = parser.parse_lines(&lines(&["12345", "-- ** --", "99.99"]));
        assert!(records.is_empty());
    }

    #[test]
    fn test_dedup_by_identifier_and_name() {
        let parser = ProductParser::new();
        let records = parser.parse_lines(&lines(&[
            "PN-1042 Brass Fountain Pen",
            "PN-1042 Brass Fountain Pen",
            "PN-1042 Steel Fountain Pen",
        ]));

        // Same (identifier, name) collapses; same identifier with a
        // different name does not.
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Brass Fountain Pen");
        assert_eq!(records[1].name, "Steel Fountain Pen");
    }

    #[test]
    fn test_insertion_order_preserved() {
        let parser = ProductParser::new();
        let records = parser.parse_lines(&lines(&[
            "Zinc Paperweight £5.00",
            "Aluminium Ruler £3.00",
        ]));

        assert_eq!(records[0].name, "Zinc Paperweight");
        assert_eq!(records[1].name, "Aluminium Ruler");
    }

    #[test]
    fn test_determinism() {
        let parser = ProductParser::new();
        let input = lines(&[
            "PN-1042 Brass Fountain Pen",
            "Bottled Ink £8.50",
            "Limited edition notebook",
        ]);

        let first = parser.parse_lines(&input);
        let second = parser.parse_lines(&input);
        assert_eq!(first, second);
    }

    #[test]
    fn test_price_guess_with_comma_separator() {
        let parser = ProductParser::new();
        let records = parser.parse_lines(&lines(&["Bottled Ink €8,50"]));
        assert_eq!(records[0].price, Some(8.5));
    }

    #[test]
    fn test_category_keyword_is_whole_word() {
        // "Pencil" must not match the "Pen" keyword
        assert_eq!(guess_category("Pencil sharpener deluxe"), None);
        assert_eq!(
            guess_category("Fountain Pen nib"),
            Some("Pen".to_string())
        );
    }

    #[test]
    fn test_invalid_rule_pattern_rejected() {
        let err = ProductParser::from_rules(vec![ExtractionRule {
            id: "broken".to_string(),
            pattern: "(unclosed".to_string(),
            priority: 0,
            description: None,
        }])
        .unwrap_err();

        assert_eq!(err.kind(), "invalid_rule");
    }

    #[test]
    fn test_rule_without_name_group_rejected() {
        let err = ProductParser::from_rules(vec![ExtractionRule {
            id: "no-name".to_string(),
            pattern: r"^(?P<sku>[A-Z]+)$".to_string(),
            priority: 0,
            description: None,
        }])
        .unwrap_err();

        assert_eq!(err.kind(), "invalid_rule");
    }

    #[test]
    fn test_rules_load_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(
            &path,
            r#"[{"id": "item", "pattern": "^ITEM\\s+(?P<name>.+)$", "priority": 5}]"#,
        )
        .unwrap();

        let parser = ProductParser::from_file(&path).unwrap();
        assert_eq!(parser.rule_count(), 1);

        let records = parser.parse_lines(&lines(&["ITEM Brass Fountain Pen", "noise"]));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Brass Fountain Pen");
    }

    #[test]
    fn test_custom_rule_priority_order() {
        let parser = ProductParser::from_rules(vec![
            ExtractionRule {
                id: "low".to_string(),
                pattern: r"^(?P<name>.+)$".to_string(),
                priority: 1,
                description: None,
            },
            ExtractionRule {
                id: "high".to_string(),
                pattern: r"^ITEM\s+(?P<name>.+)$".to_string(),
                priority: 10,
                description: None,
            },
        ])
        .unwrap();

        let records = parser.parse_lines(&lines(&["ITEM Brass Fountain Pen"]));
        assert_eq!(records[0].name, "Brass Fountain Pen");
    }
}
