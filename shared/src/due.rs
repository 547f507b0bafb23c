//! Due-date classification and the ordering shared by every view.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::Task;

/// Tasks due within this many days of today (inclusive) count as due soon.
pub const SOON_WINDOW_DAYS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DueStatus {
    Late,
    Soon,
    Normal,
}

impl DueStatus {
    pub const ALL: [DueStatus; 3] = [DueStatus::Late, DueStatus::Soon, DueStatus::Normal];

    pub fn color(self) -> &'static str {
        match self {
            DueStatus::Late => "#dc3545",
            DueStatus::Soon => "orange",
            DueStatus::Normal => "#28a745",
        }
    }
}

/// The current local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Reads `YYYY-MM-DD` as a local calendar date built from its components.
///
/// Anything else, including impossible dates like `2024-02-30`, yields `None`.
pub fn parse_local_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.trim().split('-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    let day = parts.next()?.parse::<u32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn classify(due: Option<NaiveDate>, today: NaiveDate) -> DueStatus {
    let Some(due) = due else {
        return DueStatus::Normal;
    };
    if due < today {
        return DueStatus::Late;
    }
    // Both sides are whole days, so the difference is already the ceiling.
    let diff_days = (due - today).num_days();
    if diff_days <= SOON_WINDOW_DAYS {
        DueStatus::Soon
    } else {
        DueStatus::Normal
    }
}

/// Classifies raw due-date text; malformed text degrades to `Normal`.
pub fn classify_str(due: Option<&str>, today: NaiveDate) -> DueStatus {
    classify(due.and_then(parse_local_date), today)
}

/// Status first, then earliest due date, with undated tasks last in their tier.
pub fn compare(a: &Task, b: &Task, today: NaiveDate) -> Ordering {
    let (da, db) = (a.due(), b.due());
    classify(da, today)
        .cmp(&classify(db, today))
        .then_with(|| match (da, db) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Stable sort by [`compare`].
pub fn sort_tasks(tasks: &mut [Task], today: NaiveDate) {
    tasks.sort_by(|a, b| compare(a, b, today));
}
