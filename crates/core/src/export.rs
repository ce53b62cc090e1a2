//! CSV export of the data table.
//!
//! The export is written from the table model, not from rendered markup. Every cell is quoted and
//! inner double quotes are doubled; lines end with `\n`.

use crate::constants::{EXPORT_FILENAME_PREFIX, TABLE_HEADERS};
use crate::filters::FilterSelection;
use crate::report::TableRow;
use crate::{DashboardError, DashboardResult};
use chrono::NaiveDate;
use std::path::Path;

/// A rendered CSV document and the file name to save it under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

/// `hiv-testing-data-<year>-<month|all>-<YYYY-MM-DD>.csv`
pub fn export_filename(selection: &FilterSelection, date: NaiveDate) -> String {
    format!(
        "{}-{}-{}-{}.csv",
        EXPORT_FILENAME_PREFIX,
        selection.year,
        selection.month_label(),
        date.format("%Y-%m-%d")
    )
}

/// Writes the header and one line per row.
pub fn table_to_csv(rows: &[TableRow]) -> DashboardResult<String> {
    let lines = std::iter::once(TABLE_HEADERS.map(String::from))
        .chain(rows.iter().map(TableRow::cells));
    records_to_csv(lines)
}

/// Quotes every cell of every record.
pub fn records_to_csv<I, R>(records: I) -> DashboardResult<String>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());

    for record in records {
        writer.write_record(record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DashboardError::FileWrite(e.into_error()))?;
    String::from_utf8(bytes).map_err(DashboardError::CsvToString)
}

/// Builds the export for the rows of the current view.
pub fn export_table(
    rows: &[TableRow],
    selection: &FilterSelection,
    date: NaiveDate,
) -> DashboardResult<CsvExport> {
    Ok(CsvExport {
        filename: export_filename(selection, date),
        content: table_to_csv(rows)?,
    })
}

/// Writes `export` into `dir` under its own file name and returns the full path.
pub fn write_export(dir: &Path, export: &CsvExport) -> DashboardResult<std::path::PathBuf> {
    let path = dir.join(&export.filename);
    std::fs::write(&path, &export.content).map_err(DashboardError::FileWrite)?;
    tracing::info!("exported {}", path.display());
    Ok(path)
}
