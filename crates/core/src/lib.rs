pub mod classify;
pub mod extract;
pub mod price;
pub mod product;

pub use classify::{LineClassifier, LineOutcome};
pub use extract::Extractor;
pub use price::{PriceMatch, PriceMatcher};
pub use product::{CellEdit, EditError, Product, ProductField, ProductSheet};
