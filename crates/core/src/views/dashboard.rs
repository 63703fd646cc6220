//! Dashboard aggregation: status counts and a per-day histogram.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::define_enum;
use crate::types::Ticket;

define_enum! {
    /// How far back the dashboard looks.
    DateRange("date range") {
        All => "all",
        Last7Days => "7days",
        Last30Days => "30days",
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::All
    }
}

impl DateRange {
    /// Human label for the range selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All time",
            Self::Last7Days => "Last 7 days",
            Self::Last30Days => "Last 30 days",
        }
    }

    /// Oldest `created_at` still inside the range, if the range is bounded.
    #[must_use]
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::All => None,
            Self::Last7Days => Some(now - Duration::days(7)),
            Self::Last30Days => Some(now - Duration::days(30)),
        }
    }

    /// Whether a creation time falls inside the range.
    #[must_use]
    pub fn contains(self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.cutoff(now).is_none_or(|cutoff| created_at >= cutoff)
    }
}

/// Tickets created on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket {
    pub day: NaiveDate,
    /// Short label such as `Mar 4`.
    pub label: String,
    pub count: usize,
}

/// Counts shown on the dashboard for one date range.
///
/// `resolved + active + upcoming <= total`; every status falls in exactly
/// one bucket today, so the sum equals `total` unless a status is added that
/// belongs to none of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    pub total: usize,
    pub resolved: usize,
    pub active: usize,
    pub upcoming: usize,
    /// Oldest day first.
    pub buckets: Vec<DayBucket>,
}

impl DashboardSummary {
    /// Aggregate the tickets created inside `range`, as seen at `now`.
    #[must_use]
    pub fn compute(tickets: &[Ticket], range: DateRange, now: DateTime<Utc>) -> Self {
        let mut summary = Self::default();
        let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();

        for ticket in tickets.iter().filter(|t| range.contains(t.created_at, now)) {
            summary.total += 1;
            if ticket.status.is_resolved() {
                summary.resolved += 1;
            } else if ticket.status.is_active() {
                summary.active += 1;
            } else if ticket.status.is_upcoming() {
                summary.upcoming += 1;
            }
            *per_day.entry(ticket.created_at.date_naive()).or_insert(0) += 1;
        }

        summary.buckets = per_day
            .into_iter()
            .map(|(day, count)| DayBucket {
                day,
                label: day.format("%b %-d").to_string(),
                count,
            })
            .collect();
        summary
    }

    /// Share of resolved tickets, rounded to a whole percent.
    #[must_use]
    pub fn completion_rate(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        #[allow(clippy::cast_precision_loss)] // ticket counts are far below f64 precision
        let rate = (self.resolved as f64 / self.total as f64 * 100.0).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // 0..=100
        let rate = rate as u32;
        rate
    }

    /// Largest bucket, used to scale the histogram bars.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.buckets.iter().map(|b| b.count).max().unwrap_or(0)
    }
}
