//! Single-sheet XLSX workbooks.

use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::error::ExportError;
use crate::table::{Cell, Table};

const MAX_SHEET_NAME: usize = 31;

/// Header row bold and frozen; money written as numbers with two decimals.
pub fn render(table: &Table) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0.00");
    let percent = Format::new().set_num_format("0.00");

    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name(&table.title))?;

    for (col, title) in table.headers.iter().enumerate() {
        sheet.write_string_with_format(0, column(col)?, title, &header)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let r = u32::try_from(r + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (c, cell) in row.iter().enumerate() {
            let c = column(c)?;
            match cell {
                Cell::Money(m) => {
                    sheet.write_number_with_format(r, c, m.as_rupees_f64(), &money)?;
                }
                Cell::Integer(n) => {
                    sheet.write_number(r, c, *n as f64)?;
                }
                Cell::Percent(p) => {
                    sheet.write_number_with_format(r, c, p.as_percent_f64(), &percent)?;
                }
                Cell::Text(_) | Cell::Date(_) => {
                    sheet.write_string(r, c, cell.plain())?;
                }
                Cell::Empty => {}
            }
        }
    }
    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

fn column(index: usize) -> Result<u16, XlsxError> {
    u16::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}

/// Excel sheet names are at most 31 characters and exclude `[]:*?/\`.
fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.trim().is_empty() { "Sheet1".to_string() } else { cleaned }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billforge_core::Money;

    #[test]
    fn writes_a_zip_container() {
        let mut table = Table::new("Sales 2024/25", ["Date", "Total"]);
        table.push_row([Cell::from("2024-04-01"), Cell::from(Money::from_paise(99_950))]);
        let bytes = render(&table).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn sheet_names_are_sanitised() {
        assert_eq!(sheet_name("Tax: Apr/May"), "Tax AprMay");
        assert_eq!(sheet_name("???"), "Sheet1");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }
}
