// Email templates - per-customer subject/body rendering
// Plain-text bodies with {name} / {sender_name} placeholder substitution

use crate::customers::CustomerRecord;
use crate::products::ProductRecord;
use serde::{Deserialize, Serialize};

/// EmailTemplate - settings for the optional subject/body columns.
///
/// Placeholders: `{name}` is replaced with the customer's name (or
/// "there" when empty), `{sender_name}` with the configured sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub sender_name: String,
    pub subject: String,
    pub greeting: String,
    pub intro: String,
    pub footer: String,
}

impl Default for EmailTemplate {
    fn default() -> Self {
        EmailTemplate {
            sender_name: "Customer Success".to_string(),
            subject: "Your picks from our latest catalogue".to_string(),
            greeting: "Hi {name},".to_string(),
            intro: "We picked a few things we think you'll like:".to_string(),
            footer: "If you have any questions, just hit reply.\n\nBest,\n{sender_name}"
                .to_string(),
        }
    }
}

impl EmailTemplate {
    pub fn render_subject(&self, customer: &CustomerRecord) -> String {
        self.fill(&self.subject, customer)
    }

    /// Plain-text body: greeting, intro, one bullet per matched
    /// product, footer.
    pub fn render_body(&self, customer: &CustomerRecord, products: &[&ProductRecord]) -> String {
        let greeting = self.fill(&self.greeting, customer);
        let intro = self.fill(&self.intro, customer);
        let footer = self.fill(&self.footer, customer);

        let bullets = if products.is_empty() {
            "- (No suitable items found yet)".to_string()
        } else {
            products
                .iter()
                .map(|p| product_bullet(p))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!("{}\n\n{}\n\n{}\n\n{}", greeting, intro, bullets, footer)
            .trim()
            .to_string()
    }

    fn fill(&self, template: &str, customer: &CustomerRecord) -> String {
        let name = customer.name.trim();
        let name = if name.is_empty() { "there" } else { name };

        template
            .replace("{name}", name)
            .replace("{sender_name}", &self.sender_name)
    }
}

/// One bullet line per product: name, then price when known.
fn product_bullet(product: &ProductRecord) -> String {
    let name = if product.name.trim().is_empty() {
        "Product"
    } else {
        product.name.trim()
    };

    match product.price {
        Some(price) => format!("- {} ({})", name, format_price(price)),
        None => format!("- {}", name),
    }
}

fn format_price(price: f64) -> String {
    format!("£{:.2}", price)
}

// ============================================================================
// TESTS
// ============================================================================
