use crate::error::{DashboardError, Result};
use crate::types::DashboardSnapshot;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Write-once history of dashboards; readers only ever see the newest.
pub trait SnapshotStore {
    fn put_latest(&mut self, snapshot: &DashboardSnapshot) -> Result<()>;
    /// Most recent snapshot by timestamp, if any was stored.
    fn get_latest(&self) -> Result<Option<DashboardSnapshot>>;
}

/// One JSON document per line, appended on every put.
pub struct JsonlSnapshotStore {
    path: PathBuf,
}

impl JsonlSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for JsonlSnapshotStore {
    fn put_latest(&mut self, snapshot: &DashboardSnapshot) -> Result<()> {
        let line = serde_json::to_string(snapshot)?;
        let write_failed = |source: std::io::Error| DashboardError::FileWrite {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_failed)?;
        writeln!(file, "{line}").map_err(write_failed)?;
        info!(path = %self.path.display(), timestamp = %snapshot.timestamp, "stored dashboard snapshot");
        Ok(())
    }

    fn get_latest(&self) -> Result<Option<DashboardSnapshot>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DashboardError::FileRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let mut latest: Option<DashboardSnapshot> = None;
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let snapshot: DashboardSnapshot = match serde_json::from_str(&line) {
                Ok(s) => s,
                Err(e) => {
                    warn!(line = lineno + 1, error = %e, "skipping unreadable snapshot");
                    continue;
                }
            };
            if latest.as_ref().map_or(true, |l| snapshot.timestamp >= l.timestamp) {
                latest = Some(snapshot);
            }
        }
        Ok(latest)
    }
}

#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: Vec<DashboardSnapshot>,
}

impl SnapshotStore for MemorySnapshotStore {
    fn put_latest(&mut self, snapshot: &DashboardSnapshot) -> Result<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }

    fn get_latest(&self) -> Result<Option<DashboardSnapshot>> {
        Ok(self.snapshots.iter().max_by_key(|s| s.timestamp).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::build_snapshot;
    use chrono::{DateTime, Duration, Utc};

    fn snapshot_at(ts: DateTime<Utc>, today: &str) -> DashboardSnapshot {
        build_snapshot(&[], &[], "", today, ts)
    }

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn missing_file_means_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSnapshotStore::new(dir.path().join("snaps.jsonl"));
        assert!(store.get_latest().unwrap().is_none());
    }

    #[test]
    fn unwritable_location_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("snaps.jsonl");
        let mut store = JsonlSnapshotStore::new(&path);

        let err = store.put_latest(&snapshot_at(base(), "15-Jan-24")).unwrap_err();
        assert!(matches!(&err, DashboardError::FileWrite { path: p, .. } if *p == path));
        assert!(err.to_string().starts_with("Failed to write file"));
    }

    #[test]
    fn latest_is_chosen_by_timestamp_not_position() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonlSnapshotStore::new(dir.path().join("snaps.jsonl"));
        store.put_latest(&snapshot_at(base(), "15-Jan-24")).unwrap();
        store
            .put_latest(&snapshot_at(base() + Duration::days(1), "16-Jan-24"))
            .unwrap();
        store
            .put_latest(&snapshot_at(base() - Duration::days(1), "14-Jan-24"))
            .unwrap();

        let latest = store.get_latest().unwrap().unwrap();
        assert_eq!(latest.today_date, "16-Jan-24");
    }

    #[test]
    fn snapshot_survives_a_round_trip_through_the_file() {
        use crate::types::Record;
        use rust_decimal::Decimal;

        let record = Record {
            sequence_number: 1,
            member_id: "MEM001".into(),
            name: "Rajesh Kumar".into(),
            branch: "Mumbai Central".into(),
            co_officer: "Priya Sharma".into(),
            due_total: Decimal::new(15000, 0),
            current_recovered: Decimal::new(8000, 0),
            total_overdue: Decimal::new(7000, 0),
            current_advance: Decimal::new(500, 0),
            opening_advance: Decimal::new(1000, 0),
            disbursement_date: "15-Jan-23".into(),
            last_installment_date: "14-Jan-24".into(),
            outstanding_loan_principal: Decimal::new(42000, 0),
            cell_number: "9876543210".into(),
        };
        let snapshot = build_snapshot(&[record], &[], "14-Jan-24", "15-Jan-24", base());

        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonlSnapshotStore::new(dir.path().join("snaps.jsonl"));
        store.put_latest(&snapshot).unwrap();
        let loaded = store.get_latest().unwrap().unwrap();
        assert_eq!(loaded.total_metrics.total_active_clients, 1);
        assert_eq!(loaded.branch_metrics[0].clients[0].member_id, "MEM001");
        assert_eq!(loaded.branch_metrics[0].current_due.amount, Decimal::new(15000, 0));
        assert_eq!(loaded.branch_metrics[0].recovery_percentage, Decimal::new(5333, 2));
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snaps.jsonl");
        let mut store = JsonlSnapshotStore::new(&path);
        store.put_latest(&snapshot_at(base(), "15-Jan-24")).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{ not json").unwrap();

        let latest = store.get_latest().unwrap().unwrap();
        assert_eq!(latest.today_date, "15-Jan-24");
    }

    #[test]
    fn memory_store_returns_newest() {
        let mut store = MemorySnapshotStore::default();
        assert!(store.get_latest().unwrap().is_none());
        store
            .put_latest(&snapshot_at(base() + Duration::hours(1), "later"))
            .unwrap();
        store.put_latest(&snapshot_at(base(), "earlier")).unwrap();
        assert_eq!(store.get_latest().unwrap().unwrap().today_date, "later");
    }
}
