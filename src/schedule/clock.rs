// src/schedule/clock.rs

//! Eligibility of recurring tasks.
//!
//! Pure functions over local wall-clock time; no IO. Two paths:
//!
//! - **Constrained**: the declared fields (month, day of month, day of week,
//!   hour, minute, in that order) are formatted from `now` and compared
//!   jointly against the declared values as one `a:b:c` string. A match
//!   additionally requires `now` to have reached the next period after the
//!   last run, where the period is one unit of the coarsest declared field.
//! - **Interval**: with no declared field, `now - last_run >= interval`.
//!
//! A task that never ran passes both the recurrence guard and the interval
//! check; field matching still applies.

use std::fmt;
use std::time::Duration;

use chrono::{Datelike, Months, NaiveDateTime, NaiveTime, SubsecRound, TimeDelta, Timelike};

use crate::task::{TaskDefinition, TimeConstraints};

/// Declarable calendar fields, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeField {
    Month,
    DayOfMonth,
    DayOfWeek,
    Hour,
    Minute,
}

impl TimeField {
    pub const ALL: [TimeField; 5] = [
        TimeField::Month,
        TimeField::DayOfMonth,
        TimeField::DayOfWeek,
        TimeField::Hour,
        TimeField::Minute,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TimeField::Month => "month",
            TimeField::DayOfMonth => "day of month",
            TimeField::DayOfWeek => "day of week (1 = Monday)",
            TimeField::Hour => "hour",
            TimeField::Minute => "minute",
        }
    }

    fn declared(self, c: &TimeConstraints) -> Option<u32> {
        match self {
            TimeField::Month => c.month,
            TimeField::DayOfMonth => c.day_of_month,
            TimeField::DayOfWeek => c.day_of_week,
            TimeField::Hour => c.hour,
            TimeField::Minute => c.minute,
        }
    }

    fn value_at(self, t: &NaiveDateTime) -> u32 {
        match self {
            TimeField::Month => t.month(),
            TimeField::DayOfMonth => t.day(),
            TimeField::DayOfWeek => t.weekday().number_from_monday(),
            TimeField::Hour => t.hour(),
            TimeField::Minute => t.minute(),
        }
    }

    /// Start of the period of this field's granularity containing `t`.
    fn truncate(self, t: NaiveDateTime) -> NaiveDateTime {
        let date = t.date();
        match self {
            TimeField::Month => date
                .with_day(1)
                .unwrap_or(date)
                .and_time(NaiveTime::MIN),
            TimeField::DayOfMonth | TimeField::DayOfWeek => date.and_time(NaiveTime::MIN),
            TimeField::Hour => date.and_time(
                NaiveTime::from_hms_opt(t.hour(), 0, 0).unwrap_or(NaiveTime::MIN),
            ),
            TimeField::Minute => date.and_time(
                NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(NaiveTime::MIN),
            ),
        }
    }

    /// `t` advanced by one unit of this field's granularity.
    fn advance(self, t: NaiveDateTime) -> NaiveDateTime {
        let next = match self {
            TimeField::Month => t.checked_add_months(Months::new(1)),
            TimeField::DayOfMonth | TimeField::DayOfWeek => t.checked_add_signed(TimeDelta::days(1)),
            TimeField::Hour => t.checked_add_signed(TimeDelta::hours(1)),
            TimeField::Minute => t.checked_add_signed(TimeDelta::minutes(1)),
        };
        next.unwrap_or(NaiveDateTime::MAX)
    }
}

/// Why a task is not eligible right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Declared fields do not match `now`.
    Mismatch {
        fields: Vec<TimeField>,
        expected: String,
        actual: String,
    },
    /// Fields match, but the task already ran in the current period.
    Cooldown { until: NaiveDateTime },
    /// Interval-only task ran too recently.
    IntervalNotElapsed {
        last_run: NaiveDateTime,
        interval: Duration,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Mismatch {
                fields,
                expected,
                actual,
            } => {
                let labels: Vec<_> = fields.iter().map(|f| f.label()).collect();
                write!(
                    f,
                    "scheduled for {expected} ({}), current time is {actual}",
                    labels.join(":")
                )
            }
            SkipReason::Cooldown { until } => {
                write!(f, "already ran this period; not before {}", until.format("%Y-%m-%d %H:%M:%S"))
            }
            SkipReason::IntervalNotElapsed { last_run, interval } => write!(
                f,
                "last run at {}, interval of {}s not yet elapsed",
                last_run.format("%Y-%m-%d %H:%M:%S"),
                interval.as_secs()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Skip(SkipReason),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Boolean shorthand for [`check`].
pub fn is_eligible(
    task: &TaskDefinition,
    now: NaiveDateTime,
    last_run: Option<NaiveDateTime>,
) -> bool {
    check(task, now, last_run).is_eligible()
}

/// Decide whether `task` may run at `now`, given its last run (if any).
pub fn check(
    task: &TaskDefinition,
    now: NaiveDateTime,
    last_run: Option<NaiveDateTime>,
) -> Eligibility {
    let declared: Vec<(TimeField, u32)> = TimeField::ALL
        .iter()
        .filter_map(|&field| field.declared(&task.constraints).map(|v| (field, v)))
        .collect();

    let Some(&(coarsest, _)) = declared.first() else {
        return check_interval(task.interval, now, last_run);
    };

    let expected = declared
        .iter()
        .map(|(_, v)| format!("{v:02}"))
        .collect::<Vec<_>>()
        .join(":");
    let actual = declared
        .iter()
        .map(|(field, _)| format!("{:02}", field.value_at(&now)))
        .collect::<Vec<_>>()
        .join(":");

    if expected != actual {
        return Eligibility::Skip(SkipReason::Mismatch {
            fields: declared.iter().map(|(f, _)| *f).collect(),
            expected,
            actual,
        });
    }

    if let Some(last) = last_run {
        let until = next_allowed_run(coarsest, last);
        if now < until {
            return Eligibility::Skip(SkipReason::Cooldown { until });
        }
    }

    Eligibility::Eligible
}

/// One-line summary of when `task` runs, e.g. `hour=03 minute=00` or
/// `every 60s`.
pub fn describe(task: &TaskDefinition) -> String {
    let declared: Vec<String> = TimeField::ALL
        .iter()
        .filter_map(|&field| {
            field.declared(&task.constraints).map(|v| {
                let key = match field {
                    TimeField::Month => "month",
                    TimeField::DayOfMonth => "day_of_month",
                    TimeField::DayOfWeek => "day_of_week",
                    TimeField::Hour => "hour",
                    TimeField::Minute => "minute",
                };
                format!("{key}={v:02}")
            })
        })
        .collect();

    if declared.is_empty() {
        format!("every {}s", task.interval.as_secs())
    } else {
        declared.join(" ")
    }
}

/// First instant after `last_run`'s period of `field` granularity.
pub fn next_allowed_run(field: TimeField, last_run: NaiveDateTime) -> NaiveDateTime {
    field.advance(field.truncate(last_run))
}

fn check_interval(
    interval: Duration,
    now: NaiveDateTime,
    last_run: Option<NaiveDateTime>,
) -> Eligibility {
    let Some(last) = last_run else {
        return Eligibility::Eligible;
    };

    // Whole seconds only, so cron jitter below a second cannot cost a run.
    let elapsed = now.trunc_subsecs(0) - last.trunc_subsecs(0);
    let needed = TimeDelta::from_std(interval).unwrap_or(TimeDelta::MAX);
    if elapsed >= needed {
        Eligibility::Eligible
    } else {
        Eligibility::Skip(SkipReason::IntervalNotElapsed {
            last_run: last,
            interval,
        })
    }
}
