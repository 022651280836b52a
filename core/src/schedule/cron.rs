use crate::errors::TaskLoomErrors;
use crate::schedule::TaskSchedule;
use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc};
use std::collections::BTreeSet;

#[allow(unused_imports)]
use crate::scheduler::Scheduler;

const EXPECTED_FIELD_COUNT: usize = 5;

/// Upper bound on the day-by-day search for the next matching slot. Four
/// years covers every satisfiable combination of month, day-of-month and
/// day-of-week, leap days included.
const MAX_SEARCH_DAYS: u32 = 4 * 366 + 1;

const MONTH_NAMES: [(&str, u32); 12] = [
    ("JAN", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("APR", 4),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AUG", 8),
    ("SEP", 9),
    ("OCT", 10),
    ("NOV", 11),
    ("DEC", 12),
];

const DAY_NAMES: [(&str, u32); 7] = [
    ("SUN", 0),
    ("MON", 1),
    ("TUE", 2),
    ("WED", 3),
    ("THU", 4),
    ("FRI", 5),
    ("SAT", 6),
];

/// [`CronSchedule`] is an implementation of the [`TaskSchedule`] trait that
/// makes a task due according to a classic five-field cron expression
/// (minute, hour, day-of-month, month, day-of-week).
///
/// # Expression surface
/// Each field supports wildcards (``*``), single values, ranges (``a-b``),
/// steps (``*/n``, ``a-b/n``) and comma-separated lists; months and weekdays
/// also accept their three-letter names (``JAN``..``DEC``, ``SUN``..``SAT``,
/// Sunday being 0). An invalid expression fails with
/// [`TaskLoomErrors::Config`] at parse time, never later.
///
/// # Matching semantics
/// Matching is minute-granular: [`CronSchedule::next_run_after`] returns the
/// first matching minute boundary strictly after the given instant. When
/// both the day-of-month and the day-of-week fields are restricted, a day
/// matches if *either* field matches (the traditional cron disjunction);
/// when at most one is restricted, both must match, which the unrestricted
/// field does trivially.
///
/// # Examples
/// ```ignore
/// use taskloom::schedule::CronSchedule;
///
/// // At 12:00 (noon) every day
/// let schedule = CronSchedule::parse("0 12 * * *")?;
///
/// // Every 5 minutes on weekdays
/// let schedule = CronSchedule::parse("*/5 * * * 1-5")?;
/// ```
///
/// # See also
/// - [`TaskSchedule`]
/// - [`Scheduler`]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CronSchedule {
    minute: Vec<u32>,
    hour: Vec<u32>,
    day_of_month: Vec<u32>,
    month: Vec<u32>,
    day_of_week: Vec<u32>,
}

impl CronSchedule {
    /// Parses a five-field cron expression into its explicit, sorted field
    /// sets.
    ///
    /// # Returns
    /// The parsed schedule, or [`TaskLoomErrors::Config`] naming the
    /// offending expression when the syntax or a value is invalid.
    pub fn parse(expression: &str) -> Result<Self, TaskLoomErrors> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != EXPECTED_FIELD_COUNT {
            return Err(invalid_expression(expression));
        }

        let parsed = (|| {
            Some(Self {
                minute: parse_field(fields[0], 0, 59, &[])?,
                hour: parse_field(fields[1], 0, 23, &[])?,
                day_of_month: parse_field(fields[2], 1, 31, &[])?,
                month: parse_field(fields[3], 1, 12, &MONTH_NAMES)?,
                day_of_week: parse_field(fields[4], 0, 6, &DAY_NAMES)?,
            })
        })();

        parsed.ok_or_else(|| invalid_expression(expression))
    }

    /// The matching minutes, ascending.
    pub fn minutes(&self) -> &[u32] {
        &self.minute
    }

    /// The matching hours, ascending.
    pub fn hours(&self) -> &[u32] {
        &self.hour
    }

    /// The matching days of the month, ascending.
    pub fn days_of_month(&self) -> &[u32] {
        &self.day_of_month
    }

    /// The matching months, ascending.
    pub fn months(&self) -> &[u32] {
        &self.month
    }

    /// The matching days of the week (Sunday = 0), ascending.
    pub fn days_of_week(&self) -> &[u32] {
        &self.day_of_week
    }

    fn dom_restricted(&self) -> bool {
        self.day_of_month.len() != 31
    }

    fn dow_restricted(&self) -> bool {
        self.day_of_week.len() != 7
    }

    fn day_matches(&self, date: chrono::NaiveDate) -> bool {
        if !self.month.contains(&date.month()) {
            return false;
        }
        let dom = self.day_of_month.contains(&date.day());
        let dow = self
            .day_of_week
            .contains(&date.weekday().num_days_from_sunday());
        if self.dom_restricted() && self.dow_restricted() {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// Earliest (hour, minute) slot on a day, not before `floor` when given.
    fn first_slot(&self, floor: Option<(u32, u32)>) -> Option<(u32, u32)> {
        for &hour in &self.hour {
            for &minute in &self.minute {
                if let Some((floor_hour, floor_minute)) = floor
                    && (hour < floor_hour || (hour == floor_hour && minute < floor_minute))
                {
                    continue;
                }
                return Some((hour, minute));
            }
        }
        None
    }
}

impl TaskSchedule for CronSchedule {
    fn next_run_after(&self, last_run: DateTime<Utc>) -> Result<DateTime<Utc>, TaskLoomErrors> {
        let start = (last_run + TimeDelta::minutes(1))
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .ok_or_else(|| {
                TaskLoomErrors::InvariantViolation(
                    "truncating an instant to its minute cannot fail".to_owned(),
                )
            })?;

        let mut date = start.date_naive();
        for day_offset in 0..MAX_SEARCH_DAYS {
            if self.day_matches(date) {
                let floor = (day_offset == 0).then(|| (start.hour(), start.minute()));
                if let Some((hour, minute)) = self.first_slot(floor) {
                    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
                        TaskLoomErrors::InvariantViolation(format!(
                            "parsed cron slot {hour}:{minute} is out of range"
                        ))
                    })?;
                    return Ok(NaiveDateTime::new(date, time).and_utc());
                }
            }
            date = date.succ_opt().ok_or_else(|| {
                TaskLoomErrors::InvariantViolation(
                    "calendar overflow while searching for the next cron slot".to_owned(),
                )
            })?;
        }

        Err(TaskLoomErrors::Config(
            "Cron expression never matches a future instant".to_owned(),
        ))
    }
}

fn invalid_expression(expr: &str) -> TaskLoomErrors {
    TaskLoomErrors::Config(format!("`{expr}` is not a valid cron expression"))
}

/// Expands one comma-delimited cron field into its explicit sorted values.
fn parse_field(expr: &str, min: u32, max: u32, names: &[(&str, u32)]) -> Option<Vec<u32>> {
    let span = (max - min + 1) as usize;
    let mut values = BTreeSet::new();

    for part in expr.split(',') {
        let (value_expr, step) = split_step(part)?;
        if step == 0 || step >= span {
            return None;
        }
        let step = step as u32;

        let value_expr = resolve_name(value_expr, names);
        if let Some(single) = parse_number(&value_expr) {
            if step != 1 || single < min || single > max {
                return None;
            }
            values.insert(single);
        } else if value_expr == "*" {
            values.extend((min..=max).step_by(step as usize));
        } else if let Some((start_expr, end_expr)) = value_expr.split_once('-') {
            let start = parse_number(&resolve_name(start_expr, names))?;
            let end = parse_number(&resolve_name(end_expr, names))?;
            if start < min || end > max || start > end {
                return None;
            }
            values.extend((start..=end).step_by(step as usize));
        } else {
            return None;
        }
    }

    Some(values.into_iter().collect())
}

/// Splits a cron token into its base expression and step (default 1).
fn split_step(part: &str) -> Option<(&str, usize)> {
    match part.split_once('/') {
        None => Some((part, 1)),
        Some((value_expr, step_expr)) => {
            if step_expr.is_empty() || !step_expr.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            Some((value_expr, step_expr.parse().ok()?))
        }
    }
}

fn resolve_name<'a>(expr: &'a str, names: &[(&str, u32)]) -> std::borrow::Cow<'a, str> {
    match names.iter().find(|(name, _)| *name == expr) {
        Some((_, number)) => std::borrow::Cow::Owned(number.to_string()),
        None => std::borrow::Cow::Borrowed(expr),
    }
}

fn parse_number(expr: &str) -> Option<u32> {
    if expr.is_empty() || !expr.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    expr.parse().ok()
}
