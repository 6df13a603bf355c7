// Catalog Mail-Merge - CLI
// mail-merge <products.pdf|csv> <customers.csv> [options]

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::Path;

use mail_merge::{
    run_pipeline, EmailTemplate, MatchPredicate, PipelineConfig, ProductFormat, ProductParser,
    OUTPUT_FILENAME,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        print_usage();
        return Ok(());
    }

    run_merge(&args)
}

fn print_usage() {
    println!("Catalog Mail-Merge v{}", mail_merge::VERSION);
    println!();
    println!("Usage: mail-merge <products.pdf|csv> <customers.csv> [options]");
    println!();
    println!("Options:");
    println!("  -o <file>          Output path (default: {})", OUTPUT_FILENAME);
    println!("  --rules <file>     Extraction rules JSON (default: built-in rules)");
    println!("  --sku-column <col> Match by assigned-SKU column instead of name substring");
    println!("  --max <n>          Cap matched products per customer");
    println!("  --emails           Append templated subject/body columns");
}

fn run_merge(args: &[String]) -> Result<()> {
    if args.len() < 2 {
        print_usage();
        bail!("expected a product file and a customer file");
    }

    let product_path = Path::new(&args[0]);
    let customer_path = Path::new(&args[1]);

    let mut output_path = OUTPUT_FILENAME.to_string();
    let mut rules_path: Option<String> = None;
    let mut sku_column: Option<String> = None;
    let mut max_matches: Option<usize> = None;
    let mut emails = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-o" => {
                output_path = take_value(args, &mut i, "-o")?;
            }
            "--rules" => {
                rules_path = Some(take_value(args, &mut i, "--rules")?);
            }
            "--sku-column" => {
                sku_column = Some(take_value(args, &mut i, "--sku-column")?);
            }
            "--max" => {
                let raw = take_value(args, &mut i, "--max")?;
                max_matches =
                    Some(raw.parse().with_context(|| format!("invalid --max: {}", raw))?);
            }
            "--emails" => {
                emails = true;
                i += 1;
            }
            other => bail!("unknown option: {}", other),
        }
    }

    // Format comes from the product file's extension
    let format = ProductFormat::from_filename(&args[0])?;

    println!("📦 Catalog Mail-Merge v{}", mail_merge::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Reading {} catalog: {}", format.name(), product_path.display());
    let product_bytes = fs::read(product_path)
        .with_context(|| format!("Failed to read product file: {}", product_path.display()))?;

    println!("📂 Reading customers: {}", customer_path.display());
    let customer_bytes = fs::read(customer_path)
        .with_context(|| format!("Failed to read customer file: {}", customer_path.display()))?;

    let mut config = PipelineConfig::new(format);
    if let Some(path) = &rules_path {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file: {}", path))?;
        let rules: Vec<mail_merge::ExtractionRule> =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        // Compile eagerly so a broken rule fails before the pipeline
        let parser = ProductParser::from_rules(rules.clone())?;
        println!("✓ Loaded {} extraction rules from {}", parser.rule_count(), path);
        config.rules = Some(rules);
    }
    if let Some(column) = sku_column {
        config.match_config.predicate = MatchPredicate::SkuList { column };
    }
    config.match_config.max_matches_per_customer = max_matches;
    if emails {
        config.template = Some(EmailTemplate::default());
    }

    println!("\n🔁 Running pipeline...");
    let output = run_pipeline(&product_bytes, &customer_bytes, &config)?;
    let report = &output.report;

    println!("✓ Extracted {} lines → {} products", report.lines_extracted, report.products_extracted);
    println!(
        "✓ Loaded {} customers ({} malformed rows skipped)",
        report.customers_loaded, report.customers_skipped
    );
    println!(
        "✓ Matched {} rows ({} customers without matches)",
        report.match_count, report.customers_without_matches
    );

    fs::write(&output_path, &output.csv)
        .with_context(|| format!("Failed to write output: {}", output_path))?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if report.match_count == 0 {
        println!("⚠️  No matches found - wrote header-only CSV to {}", output_path);
    } else {
        println!("🎉 Wrote {} rows to {}", report.match_count, output_path);
    }

    Ok(())
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> Result<String> {
    let Some(value) = args.get(*i + 1) else {
        bail!("{} requires a value", flag);
    };
    *i += 2;
    Ok(value.clone())
}
