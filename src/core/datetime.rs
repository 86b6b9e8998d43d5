//! Date math for partially specified dates coming out of extraction.
//!
//! Extraction never hands back a full timestamp, only whichever
//! components the user mentioned ("friday at 3", "in two weeks",
//! "on the 12th"). `CalendarMath` fills in the rest relative to the
//! user's current time and timezone.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::ai::skills::find_meeting_time::ports::DateExtrapolator;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativeChange {
    Add,
    Subtract,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[serde(alias = "minutes")]
    Minute,
    #[serde(alias = "hours")]
    Hour,
    #[serde(alias = "days")]
    Day,
    #[serde(alias = "weeks")]
    Week,
    #[serde(alias = "months")]
    Month,
    #[serde(alias = "years")]
    Year,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeTime {
    pub unit: TimeUnit,
    pub value: i64,
}

/// The date components extraction may produce for a single point in
/// time. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateComponents {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_weekday: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    /// Wall clock time formatted as `HH:mm`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_time_change_from_now: Option<RelativeChange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relative_time_from_now: Vec<RelativeTime>,
}

impl DateComponents {
    pub fn is_empty(&self) -> bool {
        self == &DateComponents::default()
    }

    /// Fill each missing component from `fallback`, one sub-field at
    /// a time.
    pub fn or(&self, fallback: &DateComponents) -> DateComponents {
        DateComponents {
            year: self.year.or(fallback.year),
            month: self.month.or(fallback.month),
            day: self.day.or(fallback.day),
            iso_weekday: self.iso_weekday.or(fallback.iso_weekday),
            hour: self.hour.or(fallback.hour),
            minute: self.minute.or(fallback.minute),
            start_time: self
                .start_time
                .clone()
                .filter(|s| !s.is_empty())
                .or_else(|| fallback.start_time.clone()),
            relative_time_change_from_now: self
                .relative_time_change_from_now
                .or(fallback.relative_time_change_from_now),
            relative_time_from_now: if self.relative_time_from_now.is_empty() {
                fallback.relative_time_from_now.clone()
            } else {
                self.relative_time_from_now.clone()
            },
        }
    }
}

/// Which end of a day to snap to when no time of day was given.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Boundary {
    Start,
    End,
    Exact,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CalendarMath;

impl CalendarMath {
    fn resolve_time(
        components: &DateComponents,
        boundary: Boundary,
        now: NaiveTime,
        same_day: bool,
    ) -> Result<NaiveTime> {
        if let Some(hour) = components.hour {
            return NaiveTime::from_hms_opt(hour, components.minute.unwrap_or(0), 0)
                .ok_or(anyhow!("Invalid time {}:{:?}", hour, components.minute));
        }
        if let Some(start_time) = components.start_time.as_deref().filter(|s| !s.is_empty()) {
            return NaiveTime::parse_from_str(start_time, "%H:%M")
                .with_context(|| format!("Invalid start time {}", start_time));
        }
        let time = match boundary {
            Boundary::Start if same_day => now,
            Boundary::Start => NaiveTime::from_hms_opt(0, 0, 0).expect("valid time"),
            Boundary::End => NaiveTime::from_hms_opt(23, 59, 0).expect("valid time"),
            Boundary::Exact => now,
        };
        Ok(time)
    }

    fn shift(dt: DateTime<Tz>, unit: TimeUnit, amount: i64) -> Result<DateTime<Tz>> {
        let out_of_range = || anyhow!("Date out of range shifting by {} {:?}", amount, unit);
        let by_delta = |delta: Option<TimeDelta>| -> Result<DateTime<Tz>> {
            delta
                .and_then(|d| dt.checked_add_signed(d))
                .ok_or_else(out_of_range)
        };
        let by_months = |n: i64| -> Result<DateTime<Tz>> {
            let months = u32::try_from(n.unsigned_abs())
                .map(Months::new)
                .map_err(|_| out_of_range())?;
            let shifted = if n >= 0 {
                dt.checked_add_months(months)
            } else {
                dt.checked_sub_months(months)
            };
            shifted.ok_or_else(out_of_range)
        };
        match unit {
            TimeUnit::Minute => by_delta(TimeDelta::try_minutes(amount)),
            TimeUnit::Hour => by_delta(TimeDelta::try_hours(amount)),
            TimeUnit::Day => by_delta(TimeDelta::try_days(amount)),
            TimeUnit::Week => by_delta(TimeDelta::try_weeks(amount)),
            TimeUnit::Month => by_months(amount),
            TimeUnit::Year => by_months(amount.checked_mul(12).ok_or_else(out_of_range)?),
        }
    }

    pub fn resolve(
        &self,
        current_time: &str,
        timezone: &str,
        components: &DateComponents,
        boundary: Boundary,
    ) -> Result<Option<String>> {
        if components.is_empty() {
            return Ok(None);
        }
        let tz: Tz = timezone
            .parse()
            .map_err(|e| anyhow!("Unknown timezone {}: {}", timezone, e))?;
        let now = DateTime::parse_from_rfc3339(current_time)
            .with_context(|| format!("Invalid current time {}", current_time))?
            .with_timezone(&tz);

        if !components.relative_time_from_now.is_empty() {
            let sign = match components.relative_time_change_from_now {
                Some(RelativeChange::Subtract) => -1,
                _ => 1,
            };
            let mut dt = now;
            for rel in &components.relative_time_from_now {
                let amount = rel
                    .value
                    .checked_mul(sign)
                    .ok_or(anyhow!("Relative offset out of range {}", rel.value))?;
                dt = Self::shift(dt, rel.unit, amount)?;
            }
            if components.hour.is_some() || components.start_time.is_some() {
                let time = Self::resolve_time(components, Boundary::Exact, dt.time(), true)?;
                dt = tz
                    .from_local_datetime(&dt.date_naive().and_time(time))
                    .earliest()
                    .ok_or(anyhow!("Nonexistent local time"))?;
            }
            return Ok(Some(dt.to_rfc3339()));
        }

        let today = now.date_naive();
        let date = if components.year.is_some()
            || components.month.is_some()
            || components.day.is_some()
        {
            let year = components.year.unwrap_or(today.year());
            let month = components.month.unwrap_or(today.month());
            let day = match (components.day, components.month) {
                (Some(day), _) => day,
                // "in june" means the start of june
                (None, Some(_)) => 1,
                (None, None) => today.day(),
            };
            NaiveDate::from_ymd_opt(year, month, day)
                .ok_or(anyhow!("Invalid date {}-{}-{}", year, month, day))?
        } else if let Some(weekday) = components.iso_weekday {
            if !(1..=7).contains(&weekday) {
                anyhow::bail!("Invalid ISO weekday {}", weekday);
            }
            let current = today.weekday().number_from_monday();
            let ahead = (weekday + 7 - current) % 7;
            today + TimeDelta::days(ahead as i64)
        } else {
            today
        };

        let time = Self::resolve_time(components, boundary, now.time(), date == today)?;
        let resolved = tz
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .ok_or(anyhow!("Nonexistent local time {} {}", date, time))?;

        Ok(Some(resolved.to_rfc3339()))
    }
}

impl DateExtrapolator for CalendarMath {
    fn extrapolate(
        &self,
        current_time: &str,
        timezone: &str,
        components: &DateComponents,
        boundary: Boundary,
    ) -> Result<Option<String>> {
        self.resolve(current_time, timezone, components, boundary)
    }
}

pub fn parse_iso(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).with_context(|| format!("Invalid ISO date {}", value))
}

/// Add (or subtract with a negative value) whole days to an ISO
/// timestamp, keeping its offset.
pub fn shift_days(value: &str, days: i64) -> Result<String> {
    let dt = parse_iso(value)?;
    TimeDelta::try_days(days)
        .and_then(|d| dt.checked_add_signed(d))
        .map(|dt| dt.to_rfc3339())
        .ok_or(anyhow!("Cannot shift {} by {} days", value, days))
}

/// Human readable rendering used in emails, e.g. "Friday, May 3,
/// 2024 9:00 AM".
pub fn format_in_timezone(value: &str, timezone: &str) -> Result<String> {
    let tz: Tz = timezone
        .parse()
        .map_err(|e| anyhow!("Unknown timezone {}: {}", timezone, e))?;
    let dt = parse_iso(value)?.with_timezone(&tz);
    Ok(dt.format("%A, %B %-d, %Y %-I:%M %p").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // A Wednesday, 08:00 in New York
    const NOW: &str = "2024-05-01T12:00:00Z";
    const TZ: &str = "America/New_York";

    #[test]
    fn it_returns_none_without_components() {
        let actual = CalendarMath
            .resolve(NOW, TZ, &DateComponents::default(), Boundary::Start)
            .unwrap();
        assert_eq!(actual, None);
    }

    #[test]
    fn it_resolves_absolute_date_and_hour() {
        let components = DateComponents {
            month: Some(5),
            day: Some(3),
            hour: Some(9),
            ..Default::default()
        };
        let actual = CalendarMath
            .resolve(NOW, TZ, &components, Boundary::Start)
            .unwrap();
        assert_eq!(actual, Some("2024-05-03T09:00:00-04:00".to_string()));
    }

    #[test]
    fn it_resolves_next_iso_weekday_at_start_of_day() {
        let components = DateComponents {
            iso_weekday: Some(5),
            ..Default::default()
        };
        let actual = CalendarMath
            .resolve(NOW, TZ, &components, Boundary::Start)
            .unwrap();
        assert_eq!(actual, Some("2024-05-03T00:00:00-04:00".to_string()));
    }

    #[test]
    fn it_snaps_end_boundary_to_end_of_day() {
        let components = DateComponents {
            day: Some(10),
            ..Default::default()
        };
        let actual = CalendarMath
            .resolve(NOW, TZ, &components, Boundary::End)
            .unwrap();
        assert_eq!(actual, Some("2024-05-10T23:59:00-04:00".to_string()));
    }

    #[test]
    fn it_parses_start_time() {
        let components = DateComponents {
            day: Some(2),
            start_time: Some("14:30".to_string()),
            ..Default::default()
        };
        let actual = CalendarMath
            .resolve(NOW, TZ, &components, Boundary::Start)
            .unwrap();
        assert_eq!(actual, Some("2024-05-02T14:30:00-04:00".to_string()));
    }

    #[test]
    fn it_applies_relative_offsets() {
        let components = DateComponents {
            relative_time_change_from_now: Some(RelativeChange::Add),
            relative_time_from_now: vec![RelativeTime {
                unit: TimeUnit::Day,
                value: 2,
            }],
            ..Default::default()
        };
        let actual = CalendarMath
            .resolve(NOW, TZ, &components, Boundary::Exact)
            .unwrap();
        assert_eq!(actual, Some("2024-05-03T08:00:00-04:00".to_string()));
    }

    #[test]
    fn it_rejects_out_of_range_relative_offsets() {
        let offset = |unit: TimeUnit, value: i64, change: RelativeChange| DateComponents {
            relative_time_change_from_now: Some(change),
            relative_time_from_now: vec![RelativeTime { unit, value }],
            ..Default::default()
        };
        let cases = [
            offset(TimeUnit::Day, 1_000_000_000_000, RelativeChange::Add),
            offset(TimeUnit::Minute, i64::MAX, RelativeChange::Add),
            offset(TimeUnit::Year, i64::MAX / 2, RelativeChange::Add),
            offset(TimeUnit::Month, 4_294_967_296, RelativeChange::Add),
            offset(TimeUnit::Month, 4_294_967_296, RelativeChange::Subtract),
            offset(TimeUnit::Week, i64::MIN, RelativeChange::Subtract),
        ];
        for components in cases {
            assert!(
                CalendarMath
                    .resolve(NOW, TZ, &components, Boundary::Exact)
                    .is_err(),
                "{:?}",
                components.relative_time_from_now
            );
        }

        let months_back = offset(TimeUnit::Month, 2, RelativeChange::Subtract);
        let actual = CalendarMath
            .resolve(NOW, TZ, &months_back, Boundary::Exact)
            .unwrap();
        assert_eq!(actual, Some("2024-03-01T08:00:00-05:00".to_string()));
    }

    #[test]
    fn it_rejects_unknown_timezones() {
        let components = DateComponents {
            day: Some(2),
            ..Default::default()
        };
        assert!(
            CalendarMath
                .resolve(NOW, "Mars/Olympus_Mons", &components, Boundary::Start)
                .is_err()
        );
    }

    #[test]
    fn it_merges_components_per_field() {
        let this_turn = DateComponents {
            hour: Some(15),
            ..Default::default()
        };
        let previous = DateComponents {
            day: Some(20),
            hour: Some(9),
            ..Default::default()
        };
        let merged = this_turn.or(&previous);
        assert_eq!(merged.hour, Some(15));
        assert_eq!(merged.day, Some(20));
    }

    #[test]
    fn it_shifts_and_formats() {
        assert_eq!(
            shift_days("2024-05-08T10:00:00-04:00", -1).unwrap(),
            "2024-05-07T10:00:00-04:00"
        );
        assert!(shift_days("2024-05-08T10:00:00-04:00", i64::MAX).is_err());
        assert_eq!(
            format_in_timezone("2024-05-03T13:00:00Z", TZ).unwrap(),
            "Friday, May 3, 2024 9:00 AM"
        );
    }
}
