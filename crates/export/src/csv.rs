//! RFC 4180 CSV.

use crate::error::ExportError;
use crate::table::Table;

pub fn render(table: &Table) -> Result<Vec<u8>, ExportError> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.plain()))?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;
    use billforge_core::Money;

    #[test]
    fn quotes_fields_and_reads_back() {
        let mut table = Table::new("Customers", ["Name", "Address", "Balance"]);
        table.push_row([
            Cell::from("Acme, Inc."),
            Cell::from("12 \"Main\" Rd\nPune"),
            Cell::from(Money::from_paise(-1_005)),
        ]);
        let bytes = render(&table).unwrap();

        let mut reader = ::csv::Reader::from_reader(bytes.as_slice());
        assert_eq!(reader.headers().unwrap(), vec!["Name", "Address", "Balance"]);
        let records: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "Acme, Inc.");
        assert_eq!(&records[0][1], "12 \"Main\" Rd\nPune");
        assert_eq!(&records[0][2], "-10.05");
    }

    #[test]
    fn header_only_when_empty() {
        let bytes = render(&Table::new("Empty", ["A", "B"])).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "A,B\n");
    }
}
