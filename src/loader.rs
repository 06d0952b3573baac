use crate::config::AppConfig;
use crate::error::{DashboardError, ExtractionError, Result};
use crate::extractor::{extract, ExtractReport};
use crate::types::{Cell, Record};
use calamine::{open_workbook_auto_from_rs, Data, DataType, Range, Reader};
use std::io::Cursor;
use std::path::Path;
use tracing::info;

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(v) => Cell::Number(*v),
            Data::Int(v) => Cell::Number(*v as f64),
            Data::Bool(v) => Cell::Text(v.to_string()),
            Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_datetime() {
                Some(dt) => Cell::Date(dt),
                None => Cell::Invalid(format!("unreadable date {data:?}")),
            },
            Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Invalid(e.to_string()),
        }
    }
}

/// Rejects file names without one of the accepted spreadsheet extensions.
pub fn check_extension(name: &str, accepted: &[String]) -> Result<()> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext {
        Some(ext) if accepted.iter().any(|a| *a == ext) => Ok(()),
        _ => Err(DashboardError::UnsupportedFile {
            name: name.to_string(),
            accepted: accepted.join(", "),
        }),
    }
}

/// Decodes the first worksheet into a grid whose column indices are absolute
/// sheet positions, minus the leading `header_rows`.
pub fn decode_workbook(bytes: Vec<u8>, name: &str, header_rows: usize) -> std::result::Result<Vec<Vec<Cell>>, ExtractionError> {
    let unreadable = |source: calamine::Error| ExtractionError::Unreadable {
        name: name.to_string(),
        source,
    };
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(unreadable)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ExtractionError::NoWorksheet(name.to_string()))?
        .map_err(unreadable)?;
    Ok(grid_from_range(&range, header_rows))
}

/// Lays a worksheet range out on absolute sheet coordinates and drops the
/// leading `header_rows`.
pub fn grid_from_range(range: &Range<Data>, header_rows: usize) -> Vec<Vec<Cell>> {
    // calamine trims leading empty rows and columns; put them back.
    let (first_row, first_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    let mut grid: Vec<Vec<Cell>> = vec![Vec::new(); first_row];
    grid.extend(range.rows().map(|row| {
        let mut cells = vec![Cell::Empty; first_col];
        cells.extend(row.iter().map(Cell::from));
        cells
    }));
    grid.into_iter().skip(header_rows).collect()
}

/// Admission check, read, decode and extract one period's export.
///
/// An export that yields no classified records is rejected.
pub fn load_period(path: &str, label: &str, cfg: &AppConfig) -> Result<(Vec<Record>, ExtractReport)> {
    check_extension(path, &cfg.accepted_extensions)?;
    let bytes = std::fs::read(path).map_err(|source| DashboardError::FileRead {
        path: path.into(),
        source,
    })?;
    let wrap = |source: ExtractionError| DashboardError::Extraction {
        label: label.to_string(),
        source,
    };
    let grid = decode_workbook(bytes, path, cfg.header_rows).map_err(wrap)?;
    let (records, report) = extract(&grid, &cfg.columns).map_err(wrap)?;
    if records.is_empty() {
        return Err(DashboardError::EmptyResult(label.to_string()));
    }
    info!(
        file = path,
        rows = report.total_rows,
        retained = report.retained,
        unclassified = report.unclassified,
        malformed = report.malformed,
        "loaded {label} export"
    );
    Ok((records, report))
}
