//! Read-only projections of the task list: urgency columns, the month
//! calendar, the due-status pie and the completed-task window.
//!
//! Everything here takes "today" explicitly and never fails.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::due::{self, DueStatus};
use crate::{CompletedTask, Task, Urgency};

/// How far back the dashboard looks for completed tasks, in days.
pub const COMPLETED_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    pub high: Vec<Task>,
    pub medium: Vec<Task>,
    pub low: Vec<Task>,
}

impl Columns {
    pub fn build(tasks: &[Task], today: NaiveDate) -> Self {
        let mut columns = Columns::default();
        for task in tasks {
            columns.column_mut(task.urgency).push(task.clone());
        }
        for urgency in [Urgency::High, Urgency::Medium, Urgency::Low] {
            due::sort_tasks(columns.column_mut(urgency), today);
        }
        columns
    }

    pub fn column(&self, urgency: Urgency) -> &[Task] {
        match urgency {
            Urgency::High => &self.high,
            Urgency::Medium => &self.medium,
            Urgency::Low => &self.low,
        }
    }

    fn column_mut(&mut self, urgency: Urgency) -> &mut Vec<Task> {
        match urgency {
            Urgency::High => &mut self.high,
            Urgency::Medium => &mut self.medium,
            Urgency::Low => &mut self.low,
        }
    }
}

/// A validated (year, month) pair used to page through the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    year: i32,
    month: u32,
}

impl MonthCursor {
    /// `month` is 1-based.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn prev(self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { month: self.month - 1, ..self }
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { month: self.month + 1, ..self }
        }
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn days_in_month(self) -> u32 {
        let first = self.first_day();
        let next = self.next().first_day();
        u32::try_from((next - first).num_days()).unwrap_or(31)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntry {
    pub task: Task,
    pub status: DueStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    /// False for the leading and trailing days borrowed from adjacent months.
    pub in_month: bool,
    pub is_today: bool,
    pub tasks: Vec<CalendarEntry>,
}

/// Whole weeks, Sunday first, covering one month.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarMonth {
    pub cursor: MonthCursor,
    pub cells: Vec<CalendarCell>,
}

impl CalendarMonth {
    pub fn build(cursor: MonthCursor, tasks: &[Task], today: NaiveDate) -> Self {
        let first = cursor.first_day();
        let lead = first.weekday().num_days_from_sunday();
        let total = (lead + cursor.days_in_month()).div_ceil(7) * 7;
        let start = first - Duration::days(i64::from(lead));

        let mut by_day: HashMap<NaiveDate, Vec<&Task>> = HashMap::new();
        for task in tasks {
            if let Some(due) = task.due() {
                by_day.entry(due).or_default().push(task);
            }
        }

        let cells = (0..total)
            .map(|offset| {
                let date = start + Duration::days(i64::from(offset));
                let tasks = by_day
                    .get(&date)
                    .map(|due_here| {
                        due_here
                            .iter()
                            .map(|task| CalendarEntry {
                                task: (*task).clone(),
                                status: due::classify(Some(date), today),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                CalendarCell {
                    date,
                    in_month: date.month() == cursor.month && date.year() == cursor.year,
                    is_today: date == today,
                    tasks,
                }
            })
            .collect();

        Self { cursor, cells }
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarCell]> {
        self.cells.chunks(7)
    }

    pub fn cell(&self, date: NaiveDate) -> Option<&CalendarCell> {
        self.cells.iter().find(|c| c.date == date)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PieTally {
    pub late: usize,
    pub soon: usize,
    pub normal: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PieSector {
    pub status: DueStatus,
    pub count: usize,
    /// Degrees clockwise from 12 o'clock.
    pub start_deg: f64,
    pub sweep_deg: f64,
}

impl PieTally {
    pub fn from_tasks(tasks: &[Task], today: NaiveDate) -> Self {
        let mut tally = PieTally::default();
        for task in tasks {
            match task.status(today) {
                DueStatus::Late => tally.late += 1,
                DueStatus::Soon => tally.soon += 1,
                DueStatus::Normal => tally.normal += 1,
            }
        }
        tally
    }

    pub fn count(&self, status: DueStatus) -> usize {
        match status {
            DueStatus::Late => self.late,
            DueStatus::Soon => self.soon,
            DueStatus::Normal => self.normal,
        }
    }

    pub fn total(&self) -> usize {
        self.late + self.soon + self.normal
    }

    /// Non-empty sectors in Late, Soon, Normal order. An empty tally is one full Normal sector.
    pub fn sectors(&self) -> Vec<PieSector> {
        let total = self.total();
        if total == 0 {
            return vec![PieSector {
                status: DueStatus::Normal,
                count: 0,
                start_deg: 0.0,
                sweep_deg: 360.0,
            }];
        }

        let mut start = 0.0;
        DueStatus::ALL
            .into_iter()
            .filter(|status| self.count(*status) > 0)
            .map(|status| {
                let count = self.count(status);
                let sweep = count as f64 / total as f64 * 360.0;
                let sector = PieSector {
                    status,
                    count,
                    start_deg: start,
                    sweep_deg: sweep,
                };
                start += sweep;
                sector
            })
            .collect()
    }
}

impl PieSector {
    pub fn end_deg(&self) -> f64 {
        self.start_deg + self.sweep_deg
    }

    /// SVG path data for this wedge of a circle centred at (`cx`, `cy`).
    pub fn svg_path(&self, cx: f64, cy: f64, r: f64) -> String {
        let point = |deg: f64| {
            let rad = deg.to_radians();
            (cx + r * rad.sin(), cy - r * rad.cos())
        };
        let (sx, sy) = point(self.start_deg);
        let mut d = String::new();

        if self.sweep_deg >= 360.0 {
            // A single arc cannot close on itself; draw two halves.
            let (mx, my) = point(self.start_deg + 180.0);
            let _ = write!(
                d,
                "M {sx:.2} {sy:.2} A {r:.2} {r:.2} 0 1 1 {mx:.2} {my:.2} A {r:.2} {r:.2} 0 1 1 {sx:.2} {sy:.2} Z"
            );
            return d;
        }

        let (ex, ey) = point(self.end_deg());
        let large = u8::from(self.sweep_deg > 180.0);
        let _ = write!(
            d,
            "M {cx:.2} {cy:.2} L {sx:.2} {sy:.2} A {r:.2} {r:.2} 0 {large} 1 {ex:.2} {ey:.2} Z"
        );
        d
    }
}

/// Records whose local completion date lies in `[today - days, today]`.
pub fn completed_within(
    records: &[CompletedTask],
    today: NaiveDate,
    days: i64,
) -> Vec<&CompletedTask> {
    let earliest = today - Duration::days(days);
    records
        .iter()
        .filter(|record| {
            let day = record.completed_at.date_naive();
            day >= earliest && day <= today
        })
        .collect()
}

pub fn recently_completed(records: &[CompletedTask], today: NaiveDate) -> Vec<&CompletedTask> {
    completed_within(records, today, COMPLETED_WINDOW_DAYS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyProgress {
    pub completed: usize,
    pub goal: Option<u32>,
}

impl WeeklyProgress {
    pub fn new(records: &[CompletedTask], today: NaiveDate, goal: Option<u32>) -> Self {
        Self {
            completed: recently_completed(records, today).len(),
            goal,
        }
    }

    /// Share of the goal reached, capped at 1.0. `None` without a positive goal.
    pub fn fraction(&self) -> Option<f64> {
        self.positive_goal().map(|goal| (self.completed as f64 / f64::from(goal)).min(1.0))
    }

    /// Only a positive goal can be met; zero counts as no goal, as in [`Self::fraction`].
    pub fn goal_met(&self) -> bool {
        self.positive_goal().is_some_and(|goal| self.completed >= goal as usize)
    }

    fn positive_goal(&self) -> Option<u32> {
        self.goal.filter(|goal| *goal > 0)
    }
}
