use crate::error::{DashboardError, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Which 0-based column each record field is read from.
///
/// Every entry has a default matching the standard recovery export, so an
/// override file only needs the columns that moved:
/// ```json
/// { "branch": 3, "cell_number": 30 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMap {
    pub member_id: usize,
    pub name: usize,
    pub branch: usize,
    pub co_officer: usize,
    pub due_total: usize,
    pub current_recovered: usize,
    pub total_overdue: usize,
    pub current_advance: usize,
    pub opening_advance: usize,
    pub disbursement_date: usize,
    pub last_installment_date: usize,
    pub outstanding_loan_principal: usize,
    pub cell_number: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            member_id: 1,
            name: 2,
            branch: 4,
            co_officer: 5,
            due_total: 10,
            current_recovered: 14,
            total_overdue: 21,
            current_advance: 18,
            opening_advance: 17,
            disbursement_date: 23,
            last_installment_date: 26,
            outstanding_loan_principal: 27,
            cell_number: 31,
        }
    }
}

impl ColumnMap {
    /// Loads overrides from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DashboardError::FileRead {
            path: PathBuf::from(path),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| DashboardError::Config(format!("invalid column map: {e}")))
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub current_file: String,
    pub prior_file: String,
    pub columns: ColumnMap,
    /// Column-header rows at the top of the sheet, dropped before extraction.
    pub header_rows: usize,
    pub accepted_extensions: Vec<String>,
    pub snapshot_path: PathBuf,
    pub export_dir: PathBuf,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            current_file: "current_month.xlsx".to_string(),
            prior_file: "last_month.xlsx".to_string(),
            columns: ColumnMap::default(),
            header_rows: 1,
            accepted_extensions: vec!["xlsx".to_string(), "xls".to_string()],
            snapshot_path: PathBuf::from("dashboard_snapshots.jsonl"),
            export_dir: PathBuf::from("."),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads the environment (after `.env` has been loaded by the caller).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup("CURRENT_FILE") {
            cfg.current_file = v;
        }
        if let Some(v) = lookup("PRIOR_FILE") {
            cfg.prior_file = v;
        }
        if let Some(path) = lookup("COLUMN_MAP_FILE") {
            cfg.columns = ColumnMap::load(&path)?;
        }
        if let Some(v) = lookup("HEADER_ROWS") {
            cfg.header_rows = v
                .trim()
                .parse()
                .map_err(|_| DashboardError::Config(format!("HEADER_ROWS must be a number, got {v:?}")))?;
        }
        if let Some(v) = lookup("ACCEPTED_EXTENSIONS") {
            let exts: Vec<String> = v
                .split(',')
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect();
            if exts.is_empty() {
                return Err(DashboardError::Config("ACCEPTED_EXTENSIONS is empty".to_string()));
            }
            cfg.accepted_extensions = exts;
        }
        if let Some(v) = lookup("SNAPSHOT_PATH") {
            cfg.snapshot_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("EXPORT_DIR") {
            cfg.export_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            cfg.log_level = v;
        }
        Ok(cfg)
    }
}
