use menuscan_core::Product;

use crate::{rows, ExportError, SheetWriter, HEADER};

/// Comma-separated export, for tools that cannot open workbooks.
#[derive(Debug, Clone)]
pub struct CsvWriter {
    pub delimiter: u8,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvWriter {
    /// Build from a delimiter string, falling back to `,` when it is empty.
    pub fn with_delimiter(delimiter: &str) -> Self {
        let delimiter = delimiter.as_bytes().first().copied().unwrap_or(b',');
        Self { delimiter }
    }
}

impl SheetWriter for CsvWriter {
    fn write(&self, products: &[Product]) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());

        writer.write_record(HEADER)?;
        for row in rows(products) {
            writer.write_record(row)?;
        }

        writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
    }

    fn content_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }
}
