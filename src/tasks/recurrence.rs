//! Monthly recurrence windows.
//!
//! A monthly task is due on its configured day of the month, clamped to the
//! last day when the month is shorter, and is actionable for `window_days`
//! on either side of that day. Everything here is a pure function of the
//! recurrence, the last satisfaction time and a reference instant `now`;
//! the window is recomputed for `now`'s month on every call.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Utc};

use super::model::{MonthlyRecurrence, Task};

/// The due instant of one monthly occurrence and its inclusive window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueWindow<Tz: TimeZone> {
    pub due: DateTime<Tz>,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> DueWindow<Tz> {
    /// Inclusive on both ends.
    pub fn contains<Tz2: TimeZone>(&self, instant: &DateTime<Tz2>) -> bool {
        *instant >= self.start && *instant <= self.end
    }
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// `day` clamped to the length of the month.
pub fn effective_due_day(day: u32, year: i32, month: u32) -> u32 {
    day.clamp(1, days_in_month(year, month))
}

/// Window of the occurrence that falls in `now`'s month.
pub fn due_window<Tz: TimeZone>(rec: MonthlyRecurrence, now: &DateTime<Tz>) -> DueWindow<Tz> {
    let day = effective_due_day(rec.day, now.year(), now.month());
    let due_date = NaiveDate::from_ymd_opt(now.year(), now.month(), day).unwrap_or(now.date_naive());
    let due = start_of_day(&now.timezone(), due_date);
    let radius = Duration::days(i64::from(rec.window_days));
    DueWindow {
        start: due.clone() - radius,
        end: due.clone() + radius,
        due,
    }
}

/// Whether the occurrence for `now`'s month was already satisfied.
///
/// A satisfaction only counts when it lies inside the window *and* in the
/// same month and year as `now`. Completing a task before its window opens
/// is therefore not recognised.
pub fn is_satisfied_in_window<Tz: TimeZone>(
    rec: MonthlyRecurrence,
    last_satisfied_at: Option<DateTime<Utc>>,
    now: &DateTime<Tz>,
) -> bool {
    let Some(last) = last_satisfied_at else {
        return false;
    };
    let window = due_window(rec, now);
    let last = last.with_timezone(&now.timezone());
    window.contains(&last) && last.month() == now.month() && last.year() == now.year()
}

/// Whether `now` is inside the window and this occurrence is still open.
pub fn is_due_now<Tz: TimeZone>(
    rec: MonthlyRecurrence,
    last_satisfied_at: Option<DateTime<Utc>>,
    now: &DateTime<Tz>,
) -> bool {
    due_window(rec, now).contains(now) && !is_satisfied_in_window(rec, last_satisfied_at, now)
}

/// Due-now check for a task; always false for one-off tasks.
pub fn task_due_now<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> bool {
    task.recurrence()
        .is_some_and(|rec| is_due_now(rec, task.last_satisfied_at, now))
}

/// Satisfied-this-window check for a task; always false for one-off tasks.
pub fn task_satisfied_in_window<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> bool {
    task.recurrence()
        .is_some_and(|rec| is_satisfied_in_window(rec, task.last_satisfied_at, now))
}

/// Midnight of `date` in `tz`.
///
/// On a DST gap the naive time is interpreted as UTC, which lands inside the
/// same calendar day.
pub fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz.from_utc_datetime(&midnight),
    }
}
