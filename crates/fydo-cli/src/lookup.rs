//! `lookup` command: fetch a single product by barcode.

use std::fmt::Write as _;

use fydo_openfoodfacts::{ProductLookupClient, ProductRecord, QueryOutcome};

use crate::describe_failure;

/// Looks up `barcode` and prints the product or the classified outcome.
///
/// # Errors
///
/// Returns an error only if the product cannot be serialized for `--json`
/// output; every lookup failure is reported through the returned outcome.
pub(crate) async fn run_lookup(
    client: &ProductLookupClient,
    barcode: &str,
    json: bool,
) -> anyhow::Result<QueryOutcome<ProductRecord>> {
    let outcome = client.lookup_by_barcode(barcode).await;

    match &outcome {
        QueryOutcome::Success(product) if json => {
            println!("{}", serde_json::to_string_pretty(product)?);
        }
        QueryOutcome::Success(product) => print!("{}", format_product(product)),
        QueryOutcome::NotFound => println!("no product found for barcode {}", barcode.trim()),
        failure => eprintln!("lookup failed: {}", describe_failure(failure)),
    }

    Ok(outcome)
}

/// Multi-line summary of the commonly populated product fields. Absent
/// fields are skipped.
pub(crate) fn format_product(product: &ProductRecord) -> String {
    let mut out = String::new();
    let name = product.product_name().unwrap_or("(unnamed product)");
    let _ = writeln!(out, "{name}");

    let fields = [
        ("barcode", product.code()),
        ("brands", product.brands().map(str::to_owned)),
        ("quantity", product.quantity().map(str::to_owned)),
        (
            "nutri-score",
            product.nutriscore_grade().map(str::to_uppercase),
        ),
        ("eco-score", product.ecoscore_grade().map(str::to_uppercase)),
        ("image", product.image_url().map(str::to_owned)),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "  {label:<12}{value}");
        }
    }

    let allergens = product.allergens_tags();
    if !allergens.is_empty() {
        let cleaned: Vec<&str> = allergens
            .iter()
            .map(|tag| tag.split_once(':').map_or(*tag, |(_, name)| name))
            .collect();
        let _ = writeln!(out, "  {:<12}{}", "allergens", cleaned.join(", "));
    }
    if let Some(ingredients) = product.ingredients_text() {
        let _ = writeln!(out, "  {:<12}{ingredients}", "ingredients");
    }
    out
}
