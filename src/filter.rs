//! Date filtering for prediction lists
//!
//! The "today", "yesterday" and "this month" boundaries are computed once
//! per render in `DateBoundaries` and shared by the filter and the tab
//! counts, so the two can never disagree about where a day starts.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};

use crate::data::Prediction;

/// Which slice of predictions to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Yesterday,
    ThisMonth,
}

impl DateFilter {
    pub const ALL: [DateFilter; 4] = [
        DateFilter::All,
        DateFilter::Today,
        DateFilter::Yesterday,
        DateFilter::ThisMonth,
    ];

    /// Parses a filter name (case-insensitive)
    ///
    /// Accepts `all`, `today`, `yesterday`, and `month` / `this-month`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(DateFilter::All),
            "today" => Some(DateFilter::Today),
            "yesterday" => Some(DateFilter::Yesterday),
            "month" | "this-month" | "thismonth" => Some(DateFilter::ThisMonth),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DateFilter::All => "All",
            DateFilter::Today => "Today",
            DateFilter::Yesterday => "Yesterday",
            DateFilter::ThisMonth => "This month",
        }
    }
}

/// Calendar boundaries relative to a single "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBoundaries {
    pub today: NaiveDate,
    pub yesterday: NaiveDate,
    pub month_start: NaiveDate,
}

impl DateBoundaries {
    /// Computes the boundaries in the time zone of `now`
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let today = now.date_naive();
        Self {
            today,
            yesterday: today.pred_opt().unwrap_or(today),
            month_start: today.with_day(1).unwrap_or(today),
        }
    }

    /// Whether a local calendar date falls inside `filter`
    pub fn contains(&self, filter: DateFilter, date: NaiveDate) -> bool {
        match filter {
            DateFilter::All => true,
            DateFilter::Today => date == self.today,
            DateFilter::Yesterday => date == self.yesterday,
            DateFilter::ThisMonth => date >= self.month_start && date <= self.today,
        }
    }
}

/// Number of predictions under each filter tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TabCounts {
    pub all: usize,
    pub today: usize,
    pub yesterday: usize,
    pub this_month: usize,
}

impl TabCounts {
    pub fn get(&self, filter: DateFilter) -> usize {
        match filter {
            DateFilter::All => self.all,
            DateFilter::Today => self.today,
            DateFilter::Yesterday => self.yesterday,
            DateFilter::ThisMonth => self.this_month,
        }
    }
}

fn local_date<Tz: TimeZone>(prediction: &Prediction, tz: &Tz) -> NaiveDate {
    prediction.created_at.with_timezone(tz).date_naive()
}

/// Keeps the predictions created within `filter`, in their original order
pub fn filter_predictions<Tz: TimeZone>(
    records: &[Arc<Prediction>],
    filter: DateFilter,
    boundaries: &DateBoundaries,
    tz: &Tz,
) -> Vec<Arc<Prediction>> {
    records
        .iter()
        .filter(|p| boundaries.contains(filter, local_date(p, tz)))
        .cloned()
        .collect()
}

/// Counts every tab over the full, unfiltered list
pub fn tab_counts<Tz: TimeZone>(
    records: &[Arc<Prediction>],
    boundaries: &DateBoundaries,
    tz: &Tz,
) -> TabCounts {
    let mut counts = TabCounts {
        all: records.len(),
        ..TabCounts::default()
    };
    for record in records {
        let date = local_date(record, tz);
        if boundaries.contains(DateFilter::Today, date) {
            counts.today += 1;
        }
        if boundaries.contains(DateFilter::Yesterday, date) {
            counts.yesterday += 1;
        }
        if boundaries.contains(DateFilter::ThisMonth, date) {
            counts.this_month += 1;
        }
    }
    counts
}
