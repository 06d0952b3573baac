use crate::error::Result;
use crate::types::{ClientRow, Counter, DashboardSnapshot, Dimension, GroupMetrics, GroupSummaryRow, Record};
use crate::util::{format_int, format_number};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

fn counter_cell(c: &Counter) -> String {
    format!("{} ({})", format_number(c.amount, 2), format_int(c.count))
}

pub fn summary_rows(groups: &[GroupMetrics]) -> Vec<GroupSummaryRow> {
    groups
        .iter()
        .map(|g| GroupSummaryRow {
            key: g.key.clone(),
            active: g.active_count,
            current_due: counter_cell(&g.current_due),
            current_recovered: counter_cell(&g.current_recovered),
            last_month_till: counter_cell(&g.last_month_till),
            remaining_due: counter_cell(&g.remaining_due),
            yesterday_recovered: counter_cell(&g.yesterday_recovered),
            today_recovered: counter_cell(&g.today_recovered),
            current_advance: counter_cell(&g.current_advance),
            opening_advance: counter_cell(&g.opening_advance),
            olp: format_number(g.outstanding_loan_principal_amount, 2),
            recovery_pct: format_number(g.recovery_percentage, 2),
        })
        .collect()
}

pub fn client_rows(clients: &[Record]) -> Vec<ClientRow> {
    clients
        .iter()
        .map(|r| ClientRow {
            sr_no: r.sequence_number,
            member_id: r.member_id.clone(),
            name: r.name.clone(),
            co_officer: r.co_officer.clone(),
            due_total: format_number(r.due_total, 2),
            current_recovered: format_number(r.current_recovered, 2),
            total_overdue: format_number(r.total_overdue, 2),
            last_installment_date: r.last_installment_date.clone(),
            cell_number: r.cell_number.clone(),
        })
        .collect()
}

/// Writes `branch_metrics.csv`, `co_metrics.csv` and `dashboard.json` into `dir`.
pub fn export_dashboard(dir: &Path, snapshot: &DashboardSnapshot) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let branch = dir.join("branch_metrics.csv");
    write_csv(&branch, &summary_rows(snapshot.groups(Dimension::ByBranch)))?;
    let co = dir.join("co_metrics.csv");
    write_csv(&co, &summary_rows(snapshot.groups(Dimension::ByOfficer)))?;
    let json = dir.join("dashboard.json");
    write_json(&json, snapshot)?;
    Ok(vec![branch, co, json])
}

pub fn print_totals(snapshot: &DashboardSnapshot) {
    let t = &snapshot.total_metrics;
    println!(
        "Total active clients: {}   Current due: {}   Recovered: {}   Recovery: {}%",
        format_int(t.total_active_clients),
        format_number(t.total_current_due_amount, 2),
        format_number(t.total_current_recovered_amount, 2),
        format_number(t.total_recovery_percentage, 2)
    );
    println!(
        "(Yesterday: {}, Today: {}, generated {})\n",
        snapshot.yesterday_date,
        snapshot.today_date,
        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::build_snapshot;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn record(branch: &str, co: &str, due: i64, recovered: i64) -> Record {
        Record {
            sequence_number: 1,
            member_id: "MEM001".into(),
            name: "Rajesh Kumar".into(),
            branch: branch.into(),
            co_officer: co.into(),
            due_total: Decimal::new(due, 0),
            current_recovered: Decimal::new(recovered, 0),
            total_overdue: Decimal::ZERO,
            current_advance: Decimal::ZERO,
            opening_advance: Decimal::ZERO,
            disbursement_date: String::new(),
            last_installment_date: String::new(),
            outstanding_loan_principal: Decimal::new(42000, 0),
            cell_number: String::new(),
        }
    }

    #[test]
    fn summary_row_formats_counters() {
        let snapshot = build_snapshot(
            &[record("Mumbai Central", "Priya Sharma", 15000, 8000)],
            &[],
            "",
            "",
            Utc::now(),
        );
        let rows = summary_rows(&snapshot.branch_metrics);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].current_due, "15,000.00 (1)");
        assert_eq!(rows[0].last_month_till, "0.00 (0)");
        assert_eq!(rows[0].olp, "42,000.00");
        assert_eq!(rows[0].recovery_pct, "53.33");
    }

    #[test]
    fn export_writes_one_csv_line_per_group() {
        let snapshot = build_snapshot(
            &[
                record("Mumbai Central", "Priya Sharma", 15000, 8000),
                record("Andheri East", "Priya Sharma", 100, 50),
            ],
            &[],
            "",
            "",
            Utc::now(),
        );
        let dir = tempfile::tempdir().unwrap();
        let files = export_dashboard(dir.path(), &snapshot).unwrap();
        assert_eq!(files.len(), 3);

        let branch_csv = std::fs::read_to_string(&files[0]).unwrap();
        assert_eq!(branch_csv.lines().count(), 3);
        assert!(branch_csv.starts_with("Key,Active,CurrentDue"));
        let co_csv = std::fs::read_to_string(&files[1]).unwrap();
        assert_eq!(co_csv.lines().count(), 2);

        let json = std::fs::read_to_string(&files[2]).unwrap();
        let parsed: DashboardSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.branch_metrics.len(), 2);
    }
}
