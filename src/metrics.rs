use crate::types::{DashboardSnapshot, Dimension, GroupMetrics, Record, TotalMetrics};
use crate::util::recovery_percentage;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

// Each metric has its own comparator and constant; they are not uniform.
const DUE_FLOOR: Decimal = Decimal::TWO; // due_total > 2
const RECOVERED_FLOOR: Decimal = Decimal::TWO; // current_recovered > 2
const OVERDUE_FLOOR: Decimal = Decimal::from_parts(5, 0, 0, false, 0); // total_overdue > 5
const YESTERDAY_ADVANCE_CAP: Decimal = Decimal::TWO; // current_advance <= 2
const TODAY_ADVANCE_CAP: Decimal = Decimal::ONE; // current_advance <= 1
const ADVANCE_FLOOR: Decimal = Decimal::TWO; // current/opening advance > 2

/// Groups keyed by branch or officer, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct GroupedMetrics {
    groups: Vec<GroupMetrics>,
    index: HashMap<String, usize>,
    prior_due: HashMap<String, Decimal>,
}

impl GroupedMetrics {
    fn entry(&mut self, key: &str) -> &mut GroupMetrics {
        let pos = match self.index.get(key) {
            Some(&pos) => pos,
            None => {
                self.groups.push(GroupMetrics::new(key));
                self.index.insert(key.to_string(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        &mut self.groups[pos]
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut GroupMetrics> {
        let pos = *self.index.get(key)?;
        self.groups.get_mut(pos)
    }

    pub fn get(&self, key: &str) -> Option<&GroupMetrics> {
        self.index.get(key).map(|&pos| &self.groups[pos])
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupMetrics> {
        self.groups.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.key.as_str())
    }

    /// Prior-period due total for `key` (sum of prior `due_total > 2`).
    ///
    /// Diagnostic only: no metric reads it.
    pub fn prior_due(&self, key: &str) -> Option<Decimal> {
        self.prior_due.get(key).copied()
    }

    pub fn prior_due_index(&self) -> &HashMap<String, Decimal> {
        &self.prior_due
    }

    pub fn into_groups(self) -> Vec<GroupMetrics> {
        self.groups
    }
}

impl GroupMetrics {
    /// Accumulate one current-period record.
    fn add_current(&mut self, r: &Record, yesterday: &str, today: &str) {
        self.clients.push(r.clone());
        self.active_count += 1;

        if r.due_total > DUE_FLOOR {
            self.current_due.add(r.due_total);
        }
        if r.current_recovered > RECOVERED_FLOOR {
            self.current_recovered.add(r.current_recovered);
        }
        if r.total_overdue > OVERDUE_FLOOR {
            self.remaining_due.add(r.total_overdue);
        }
        if r.current_recovered > RECOVERED_FLOOR
            && r.last_installment_date == yesterday
            && r.current_advance <= YESTERDAY_ADVANCE_CAP
        {
            self.yesterday_recovered.add(r.current_recovered);
        }
        if r.last_installment_date == today
            && r.current_advance <= TODAY_ADVANCE_CAP
            && r.current_recovered > RECOVERED_FLOOR
        {
            self.today_recovered.add(r.current_recovered);
        }
        if r.current_advance > ADVANCE_FLOOR {
            self.current_advance.add(r.current_advance);
        }
        if r.opening_advance > ADVANCE_FLOOR {
            self.opening_advance.add(r.opening_advance);
        }
        self.outstanding_loan_principal_amount += r.outstanding_loan_principal;
    }
}

/// Groups `current` by `dimension` and joins `prior` onto the groups found.
///
/// Never fails; empty input gives an empty result. `yesterday` and `today`
/// are compared verbatim with `last_installment_date`.
pub fn aggregate(
    current: &[Record],
    prior: &[Record],
    dimension: Dimension,
    yesterday: &str,
    today: &str,
) -> GroupedMetrics {
    let mut out = GroupedMetrics::default();

    for r in prior {
        let due = out
            .prior_due
            .entry(dimension.key_of(r).to_string())
            .or_insert(Decimal::ZERO);
        if r.due_total > DUE_FLOOR {
            *due += r.due_total;
        }
    }

    for r in current {
        out.entry(dimension.key_of(r)).add_current(r, yesterday, today);
    }

    // Prior-only keys never become groups.
    for r in prior {
        if r.current_recovered <= RECOVERED_FLOOR {
            continue;
        }
        if let Some(group) = out.get_mut(dimension.key_of(r)) {
            group.last_month_till.add(r.current_recovered);
        }
    }

    for group in &mut out.groups {
        group.recovery_percentage =
            recovery_percentage(group.current_recovered.amount, group.current_due.amount);
    }
    out
}

impl TotalMetrics {
    pub fn from_groups<'a, I>(groups: I) -> Self
    where
        I: IntoIterator<Item = &'a GroupMetrics>,
    {
        let mut total_active_clients = 0;
        let mut due = Decimal::ZERO;
        let mut recovered = Decimal::ZERO;
        for g in groups {
            total_active_clients += g.active_count;
            due += g.current_due.amount;
            recovered += g.current_recovered.amount;
        }
        TotalMetrics {
            total_active_clients,
            total_current_due_amount: due,
            total_current_recovered_amount: recovered,
            total_recovery_percentage: recovery_percentage(recovered, due),
        }
    }
}

/// Aggregates both dimensions and assembles the snapshot to persist.
pub fn build_snapshot(
    current: &[Record],
    prior: &[Record],
    yesterday: &str,
    today: &str,
    timestamp: DateTime<Utc>,
) -> DashboardSnapshot {
    let by_branch = aggregate(current, prior, Dimension::ByBranch, yesterday, today);
    let by_co = aggregate(current, prior, Dimension::ByOfficer, yesterday, today);

    for (key, due) in by_branch.prior_due_index() {
        debug!(branch = %key, prior_due = %due, in_current = by_branch.get(key).is_some(), "prior-period due");
    }

    let total_metrics = TotalMetrics::from_groups(by_branch.iter());
    DashboardSnapshot {
        timestamp,
        yesterday_date: yesterday.to_string(),
        today_date: today.to_string(),
        total_metrics,
        branch_metrics: by_branch.into_groups(),
        co_metrics: by_co.into_groups(),
    }
}
