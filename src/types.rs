use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Sentinel the extractor assigns to a missing branch or officer.
pub const UNKNOWN: &str = "Unknown";

/// One decoded spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
    /// Error cells (`#DIV/0!`, `#REF!`) and date serials with no calendar date.
    Invalid(String),
}

/// One loan account row for a single reporting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub sequence_number: usize,
    pub member_id: String,
    pub name: String,
    pub branch: String,
    pub co_officer: String,
    pub due_total: Decimal,
    pub current_recovered: Decimal,
    pub total_overdue: Decimal,
    pub current_advance: Decimal,
    pub opening_advance: Decimal,
    pub disbursement_date: String,
    pub last_installment_date: String,
    pub outstanding_loan_principal: Decimal,
    pub cell_number: String,
}

impl Record {
    /// Both classification fields were present in the source row.
    pub fn is_classified(&self) -> bool {
        self.branch != UNKNOWN && self.co_officer != UNKNOWN
    }
}

/// Grouping axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    ByBranch,
    ByOfficer,
}

impl Dimension {
    pub fn key_of<'a>(&self, record: &'a Record) -> &'a str {
        match self {
            Dimension::ByBranch => &record.branch,
            Dimension::ByOfficer => &record.co_officer,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::ByBranch => "Branch",
            Dimension::ByOfficer => "CO",
        }
    }
}

/// A (clients, amount) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub count: usize,
    pub amount: Decimal,
}

impl Counter {
    pub fn add(&mut self, amount: Decimal) {
        self.count += 1;
        self.amount += amount;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMetrics {
    pub key: String,
    pub active_count: usize,
    pub current_due: Counter,
    pub current_recovered: Counter,
    pub last_month_till: Counter,
    pub remaining_due: Counter,
    pub yesterday_recovered: Counter,
    pub today_recovered: Counter,
    pub current_advance: Counter,
    pub opening_advance: Counter,
    pub outstanding_loan_principal_amount: Decimal,
    pub recovery_percentage: Decimal,
    pub clients: Vec<Record>,
}

impl GroupMetrics {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            active_count: 0,
            current_due: Counter::default(),
            current_recovered: Counter::default(),
            last_month_till: Counter::default(),
            remaining_due: Counter::default(),
            yesterday_recovered: Counter::default(),
            today_recovered: Counter::default(),
            current_advance: Counter::default(),
            opening_advance: Counter::default(),
            outstanding_loan_principal_amount: Decimal::ZERO,
            recovery_percentage: Decimal::ZERO,
            clients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalMetrics {
    pub total_active_clients: usize,
    pub total_current_due_amount: Decimal,
    pub total_current_recovered_amount: Decimal,
    pub total_recovery_percentage: Decimal,
}

/// The persisted result of one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub timestamp: DateTime<Utc>,
    pub yesterday_date: String,
    pub today_date: String,
    pub total_metrics: TotalMetrics,
    pub branch_metrics: Vec<GroupMetrics>,
    pub co_metrics: Vec<GroupMetrics>,
}

impl DashboardSnapshot {
    pub fn groups(&self, dimension: Dimension) -> &[GroupMetrics] {
        match dimension {
            Dimension::ByBranch => &self.branch_metrics,
            Dimension::ByOfficer => &self.co_metrics,
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GroupSummaryRow {
    #[serde(rename = "Key")]
    #[tabled(rename = "Key")]
    pub key: String,
    #[serde(rename = "Active")]
    #[tabled(rename = "Active")]
    pub active: usize,
    #[serde(rename = "CurrentDue")]
    #[tabled(rename = "CurrentDue")]
    pub current_due: String,
    #[serde(rename = "CurrentRecovered")]
    #[tabled(rename = "CurrentRecovered")]
    pub current_recovered: String,
    #[serde(rename = "LastMonthTill")]
    #[tabled(rename = "LastMonthTill")]
    pub last_month_till: String,
    #[serde(rename = "RemainingDue")]
    #[tabled(rename = "RemainingDue")]
    pub remaining_due: String,
    #[serde(rename = "YesterdayRecovered")]
    #[tabled(rename = "YesterdayRecovered")]
    pub yesterday_recovered: String,
    #[serde(rename = "TodayRecovered")]
    #[tabled(rename = "TodayRecovered")]
    pub today_recovered: String,
    #[serde(rename = "CurrentAdvance")]
    #[tabled(rename = "CurrentAdvance")]
    pub current_advance: String,
    #[serde(rename = "OpeningAdvance")]
    #[tabled(rename = "OpeningAdvance")]
    pub opening_advance: String,
    #[serde(rename = "OLP")]
    #[tabled(rename = "OLP")]
    pub olp: String,
    #[serde(rename = "RecoveryPct")]
    #[tabled(rename = "RecoveryPct")]
    pub recovery_pct: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct ClientRow {
    #[tabled(rename = "SrNo")]
    pub sr_no: usize,
    #[tabled(rename = "MemberId")]
    pub member_id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "CO")]
    pub co_officer: String,
    #[tabled(rename = "DueTotal")]
    pub due_total: String,
    #[tabled(rename = "Recovered")]
    pub current_recovered: String,
    #[tabled(rename = "Overdue")]
    pub total_overdue: String,
    #[tabled(rename = "LastInstall")]
    pub last_installment_date: String,
    #[tabled(rename = "CellNo")]
    pub cell_number: String,
}
