use crate::price::PriceMatcher;
use crate::product::Product;

/// What a single non-blank line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// A heading; its trimmed text becomes the current category.
    Category(String),
    Product(Product),
}

pub struct LineClassifier;

impl LineClassifier {
    /// Classify one line against the category currently in effect.
    ///
    /// A line ending in a price is a product: the name is everything before the
    /// last occurrence of the matched price text. Any other line is a category
    /// heading, OCR garbage included.
    pub fn classify(line: &str, current_category: &str) -> LineOutcome {
        let line = line.trim();
        match PriceMatcher::find(line) {
            Some(m) => {
                let split = line.rfind(m.text).unwrap_or(m.start);
                LineOutcome::Product(Product {
                    name: line[..split].trim().to_string(),
                    category: current_category.to_string(),
                    price: m.text.to_string(),
                })
            }
            None => LineOutcome::Category(line.to_string()),
        }
    }
}
