use menuscan_core::Product;
use rust_xlsxwriter::{Format, Workbook};

use crate::{rows, ExportError, SheetWriter, HEADER};

pub const WORKSHEET_NAME: &str = "Products";

/// Single-sheet `.xlsx` workbook. All cells are strings.
#[derive(Debug, Clone, Default)]
pub struct XlsxWriter;

impl SheetWriter for XlsxWriter {
    fn write(&self, products: &[Product]) -> Result<Vec<u8>, ExportError> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(WORKSHEET_NAME)?;

        for (col, label) in (0u16..).zip(HEADER) {
            worksheet.write_string_with_format(0, col, label, &bold)?;
        }
        for (row, cells) in (1u32..).zip(rows(products)) {
            for (col, cell) in (0u16..).zip(cells) {
                worksheet.write_string(row, col, cell)?;
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    fn content_type(&self) -> &'static str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }

    fn file_extension(&self) -> &'static str {
        "xlsx"
    }
}
