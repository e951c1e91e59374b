//! Spreadsheet export of extracted products.
//!
//! Every writer emits the same layout: one header row with [`HEADER`], then one
//! row per product in `category, name, price` order. Prices are written as the
//! text that was matched, never reparsed into numbers.

pub mod csv;
#[cfg(feature = "xlsx")]
pub mod xlsx;

use menuscan_core::{Product, ProductField};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::csv::CsvWriter;
#[cfg(feature = "xlsx")]
pub use crate::xlsx::XlsxWriter;

/// Column labels of the exported sheet, in order.
pub const HEADER: [&str; 3] = ["Catégorie", "Nom du produit", "Prix HT"];

/// Base name used for downloads and intake output.
pub const DEFAULT_FILE_STEM: &str = "products";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[cfg(feature = "xlsx")]
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("Export format not available: {0}")]
    Unavailable(ExportFormat),
}

/// Data rows for `products`, one `[category, name, price]` per product.
pub fn rows(products: &[Product]) -> impl Iterator<Item = [&str; 3]> + '_ {
    products.iter().map(|p| ProductField::ALL.map(|f| p.get(f)))
}

/// Serializes products into a downloadable sheet.
pub trait SheetWriter: Send + Sync {
    fn write(&self, products: &[Product]) -> Result<Vec<u8>, ExportError>;
    fn content_type(&self) -> &'static str;
    fn file_extension(&self) -> &'static str;

    fn file_name(&self) -> String {
        format!("{DEFAULT_FILE_STEM}.{}", self.file_extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Xlsx => write!(f, "xlsx"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xlsx" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("Unknown export format: '{other}'")),
        }
    }
}

/// Writer for `format` with default settings.
pub fn writer_for(format: ExportFormat) -> Result<Box<dyn SheetWriter>, ExportError> {
    match format {
        #[cfg(feature = "xlsx")]
        ExportFormat::Xlsx => Ok(Box::new(XlsxWriter::default())),
        #[cfg(not(feature = "xlsx"))]
        ExportFormat::Xlsx => Err(ExportError::Unavailable(format)),
        ExportFormat::Csv => Ok(Box::new(CsvWriter::default())),
    }
}
