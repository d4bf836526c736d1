//! Time window resolution.
//!
//! Turns the `--from-date/--to-date` and `--last-days/--last-hours` options
//! into an inclusive epoch-second range. Absolute dates are read as wall
//! clock time in a configured IANA zone.

use crate::error::{Result, WcError};
use crate::model::TimeWindow;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Zone used when neither config nor flags name one.
pub const DEFAULT_TIME_ZONE: &str = "Asia/Jerusalem";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Raw window options as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub last_days: Option<i64>,
    pub last_hours: Option<i64>,
}

impl WindowSpec {
    /// No option given at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.from_date.is_none()
            && self.to_date.is_none()
            && self.last_days.is_none()
            && self.last_hours.is_none()
    }

    /// Check option combinations and value syntax without touching the clock
    /// or any time zone.
    ///
    /// # Errors
    ///
    /// Returns [`WcError::ConflictingWindow`] for mutually exclusive options,
    /// [`WcError::InvalidArgument`] for negative amounts and
    /// [`WcError::InvalidDate`] for unparseable dates.
    pub fn validate(&self) -> Result<()> {
        if self.last_days.is_some() && self.last_hours.is_some() {
            return Err(WcError::conflicting_window("--last-days with --last-hours"));
        }

        let relative = if self.last_days.is_some() {
            Some("--last-days")
        } else if self.last_hours.is_some() {
            Some("--last-hours")
        } else {
            None
        };
        let absolute = if self.from_date.is_some() {
            Some("--from-date")
        } else if self.to_date.is_some() {
            Some("--to-date")
        } else {
            None
        };
        if let (Some(rel), Some(abs)) = (relative, absolute) {
            return Err(WcError::conflicting_window(format!("{rel} with {abs}")));
        }

        for (value, option) in [(self.last_days, "--last-days"), (self.last_hours, "--last-hours")]
        {
            if let Some(n) = value.filter(|n| *n < 0) {
                return Err(WcError::invalid_argument(format!(
                    "{option} must not be negative (got {n})"
                )));
            }
        }

        if let Some(from) = &self.from_date {
            parse_naive(from, false).ok_or_else(|| WcError::invalid_date(from, "--from-date"))?;
        }
        if let Some(to) = &self.to_date {
            parse_naive(to, true).ok_or_else(|| WcError::invalid_date(to, "--to-date"))?;
        }

        Ok(())
    }

    /// Resolve to an epoch range, or `None` when no option was given.
    ///
    /// # Errors
    ///
    /// Everything [`validate`](Self::validate) rejects, plus an absolute
    /// window whose start is after its end and amounts too large to
    /// represent.
    pub fn resolve(&self, tz: Tz, now: DateTime<Utc>) -> Result<Option<TimeWindow>> {
        self.validate()?;

        if let Some(days) = self.last_days {
            let span = Duration::try_days(days)
                .ok_or_else(|| WcError::invalid_argument(format!("--last-days {days} is too large")))?;
            return relative_window(now, span, "--last-days").map(Some);
        }
        if let Some(hours) = self.last_hours {
            let span = Duration::try_hours(hours).ok_or_else(|| {
                WcError::invalid_argument(format!("--last-hours {hours} is too large"))
            })?;
            return relative_window(now, span, "--last-hours").map(Some);
        }

        if self.from_date.is_none() && self.to_date.is_none() {
            return Ok(None);
        }

        let min_epoch = match &self.from_date {
            Some(from) => to_epoch(from, false, tz, "--from-date")?,
            None => i64::MIN,
        };
        let max_epoch = match &self.to_date {
            Some(to) => to_epoch(to, true, tz, "--to-date")?,
            None => i64::MAX,
        };
        if min_epoch > max_epoch {
            return Err(WcError::invalid_argument(format!(
                "--from-date {} is later than --to-date {}",
                self.from_date.as_deref().unwrap_or_default(),
                self.to_date.as_deref().unwrap_or_default(),
            )));
        }

        debug!(min_epoch, max_epoch, zone = %tz, "Resolved absolute window");
        Ok(Some(TimeWindow::new(min_epoch, max_epoch)))
    }
}

/// Look up an IANA zone by name.
///
/// # Errors
///
/// Returns [`WcError::InvalidTimeZone`] if the name is unknown.
pub fn parse_time_zone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| WcError::InvalidTimeZone {
            name: name.to_string(),
        })
}

fn relative_window(now: DateTime<Utc>, span: Duration, option: &str) -> Result<TimeWindow> {
    let start = now
        .checked_sub_signed(span)
        .ok_or_else(|| WcError::invalid_argument(format!("{option} reaches before year 0")))?;
    debug!(start = %start, end = %now, "Resolved relative window");
    Ok(TimeWindow::new(start.timestamp(), now.timestamp()))
}

/// Parse a date or date-time without a zone. Date-only values take the start
/// of the day, or its last second when `end_of_day` is set.
fn parse_naive(input: &str, end_of_day: bool) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        let time = if end_of_day {
            NaiveTime::from_hms_opt(23, 59, 59)?
        } else {
            NaiveTime::from_hms_opt(0, 0, 0)?
        };
        return Some(date.and_time(time));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

fn to_epoch(input: &str, end_of_day: bool, tz: Tz, option: &'static str) -> Result<i64> {
    let naive = parse_naive(input, end_of_day).ok_or_else(|| WcError::invalid_date(input, option))?;
    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        // Repeated wall time: widen the window.
        LocalResult::Ambiguous(earliest, latest) => {
            if end_of_day {
                latest
            } else {
                earliest
            }
        }
        // Skipped wall time: the first instant after the gap.
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .ok_or_else(|| WcError::invalid_date(input, option))?,
    };
    Ok(local.with_timezone(&Utc).timestamp())
}
