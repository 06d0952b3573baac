use crate::config::ColumnMap;
use crate::error::{ExtractionError, RowError};
use crate::types::{Cell, Record, UNKNOWN};
use crate::util::{coerce_date, coerce_decimal, coerce_text};
use tracing::{debug, warn};

/// Rows at the top of every export that never hold data (title and a blank spacer).
const SPACER_ROWS: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub total_rows: usize,
    pub retained: usize,
    pub unclassified: usize,
    pub malformed: usize,
}

/// Turns a decoded grid into classified records.
///
/// Rows whose branch or officer is missing are dropped; rows with a malformed
/// text or date cell are logged and skipped. Sequence numbers are assigned
/// before either filter, so survivors keep their original positions.
pub fn extract(
    table: &[Vec<Cell>],
    columns: &ColumnMap,
) -> Result<(Vec<Record>, ExtractReport), ExtractionError> {
    if table.len() <= SPACER_ROWS {
        return Err(ExtractionError::InsufficientData { rows: table.len() });
    }

    let mut report = ExtractReport::default();
    let mut records = Vec::new();
    for (index, row) in table.iter().skip(SPACER_ROWS).enumerate() {
        report.total_rows += 1;
        match extract_row(index + 1, row, columns) {
            Ok(record) if record.is_classified() => records.push(record),
            Ok(record) => {
                debug!(row = index, branch = %record.branch, co = %record.co_officer, "dropping unclassified row");
                report.unclassified += 1;
            }
            Err(e) => {
                warn!(row = index, error = %e, "error processing row, skipping");
                report.malformed += 1;
            }
        }
    }
    report.retained = records.len();
    Ok((records, report))
}

fn extract_row(sequence_number: usize, row: &[Cell], columns: &ColumnMap) -> Result<Record, RowError> {
    let text = |col: usize, default: &str| -> Result<String, RowError> {
        Ok(coerce_text(row.get(col), col)?.unwrap_or_else(|| default.to_string()))
    };
    let date = |col: usize| -> Result<String, RowError> {
        Ok(coerce_date(row.get(col), col)?.unwrap_or_default())
    };
    let money = |col: usize| coerce_decimal(row.get(col));

    Ok(Record {
        sequence_number,
        member_id: text(columns.member_id, "")?,
        name: text(columns.name, "")?,
        branch: text(columns.branch, UNKNOWN)?,
        co_officer: text(columns.co_officer, UNKNOWN)?,
        due_total: money(columns.due_total),
        current_recovered: money(columns.current_recovered),
        total_overdue: money(columns.total_overdue),
        current_advance: money(columns.current_advance),
        opening_advance: money(columns.opening_advance),
        disbursement_date: date(columns.disbursement_date)?,
        last_installment_date: date(columns.last_installment_date)?,
        outstanding_loan_principal: money(columns.outstanding_loan_principal),
        cell_number: text(columns.cell_number, "")?,
    })
}
