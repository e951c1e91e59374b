use crate::classify::{LineClassifier, LineOutcome};
use crate::product::Product;

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor;

impl Extractor {
    /// Turn raw OCR text into products, in source line order.
    ///
    /// Single pass over the lines; the running category lives only for the
    /// duration of this call.
    pub fn extract(ocr_text: &str) -> Vec<Product> {
        let mut products = Vec::new();
        let mut current_category = String::new();
        let mut lines_scanned = 0usize;
        let mut categories = 0usize;

        for line in ocr_text.split('\n') {
            lines_scanned += 1;
            if line.trim().is_empty() {
                continue;
            }
            match LineClassifier::classify(line, &current_category) {
                LineOutcome::Category(category) => {
                    categories += 1;
                    current_category = category;
                }
                LineOutcome::Product(product) => products.push(product),
            }
        }

        tracing::debug!(
            lines = lines_scanned,
            categories,
            products = products.len(),
            "extracted products from OCR text"
        );
        products
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
