use anyhow::Result;

use super::models::{Populated, RecurExtraction, RecurrenceRule};
use super::ports::DateExtrapolator;
use super::request::{Turn, merge_components, pick};
use crate::core::datetime::Boundary;

/// Build the recurrence rule for the request, if the user asked for a
/// repeating meeting in any ranked turn.
pub fn build_recurrence(
    turns: &[Turn],
    current_time: &str,
    timezone: &str,
    dates: &dyn DateExtrapolator,
) -> Result<Option<RecurrenceRule>> {
    let recurs: Vec<&RecurExtraction> = turns
        .iter()
        .filter_map(|t| t.date_time.recur.as_ref())
        .collect();
    let Some(frequency) = recurs.iter().find_map(|r| r.frequency) else {
        return Ok(None);
    };

    let interval = recurs
        .iter()
        .find_map(|r| r.interval.filter(|i| i.is_populated()))
        .or_else(|| {
            pick(turns, |t| {
                t.request.params.recurrence.as_ref().and_then(|r| r.interval)
            })
        });
    let by_week_day = recurs
        .iter()
        .map(|r| &r.by_week_day)
        .find(|days| days.is_populated())
        .cloned()
        .unwrap_or_default();
    let by_month_day = recurs
        .iter()
        .map(|r| &r.by_month_day)
        .find(|days| days.is_populated())
        .cloned()
        .unwrap_or_default();
    let occurrence = recurs
        .iter()
        .find_map(|r| r.occurrence.filter(|o| o.is_populated()));

    let end_components = merge_components(turns, |t| {
        t.date_time.recur.as_ref().and_then(|r| r.end_date.clone())
    });
    let extrapolated_end = if end_components.is_empty() {
        None
    } else {
        dates.extrapolate(current_time, timezone, &end_components, Boundary::Exact)?
    };
    // Explicit end dates from the request extraction, earliest turn first
    let end_date = extrapolated_end.or_else(|| {
        turns.iter().rev().find_map(|t| {
            t.request
                .params
                .recurrence
                .as_ref()
                .and_then(|r| r.end_date.clone())
                .filter(|d| d.is_populated())
        })
    });

    Ok(Some(RecurrenceRule {
        frequency,
        interval,
        by_week_day,
        by_month_day,
        occurrence,
        end_date,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::skills::find_meeting_time::models::{
        DateTimeExtraction, Frequency, RecurrenceParams, RequestExtraction, RequestParams,
    };
    use crate::core::datetime::{CalendarMath, DateComponents};

    const NOW: &str = "2024-05-01T12:00:00-04:00";
    const TZ: &str = "America/New_York";

    fn recurring(recur: RecurExtraction) -> DateTimeExtraction {
        DateTimeExtraction {
            recur: Some(recur),
            ..Default::default()
        }
    }

    #[test]
    fn it_skips_recurrence_without_frequency() {
        let request = RequestExtraction::default();
        let date_time = recurring(RecurExtraction {
            interval: Some(2),
            ..Default::default()
        });
        let actual =
            build_recurrence(&[Turn::new(&request, &date_time)], NOW, TZ, &CalendarMath).unwrap();
        assert_eq!(actual, None);
    }

    #[test]
    fn it_builds_rule_from_a_single_turn() {
        let request = RequestExtraction {
            params: RequestParams {
                recurrence: Some(RecurrenceParams {
                    frequency: Some(Frequency::Weekly),
                    interval: Some(2),
                    end_date: Some("2024-08-01T00:00:00-04:00".to_string()),
                }),
                ..Default::default()
            },
        };
        let date_time = recurring(RecurExtraction {
            frequency: Some(Frequency::Weekly),
            by_week_day: vec!["MO".to_string()],
            ..Default::default()
        });
        let actual = build_recurrence(&[Turn::new(&request, &date_time)], NOW, TZ, &CalendarMath)
            .unwrap()
            .unwrap();
        assert_eq!(actual.frequency, Frequency::Weekly);
        assert_eq!(actual.interval, Some(2));
        assert_eq!(actual.by_week_day, vec!["MO".to_string()]);
        assert_eq!(actual.end_date.as_deref(), Some("2024-08-01T00:00:00-04:00"));
    }

    #[test]
    fn it_resolves_end_date_per_sub_field() {
        let request = RequestExtraction::default();
        let this_turn = recurring(RecurExtraction {
            frequency: Some(Frequency::Daily),
            end_date: Some(DateComponents {
                hour: Some(15),
                ..Default::default()
            }),
            ..Default::default()
        });
        let prev_turn = recurring(RecurExtraction {
            by_month_day: vec![1, 15],
            end_date: Some(DateComponents {
                month: Some(6),
                day: Some(20),
                hour: Some(9),
                ..Default::default()
            }),
            ..Default::default()
        });
        let turns = [
            Turn::new(&request, &this_turn),
            Turn::new(&request, &prev_turn),
        ];
        let actual = build_recurrence(&turns, NOW, TZ, &CalendarMath)
            .unwrap()
            .unwrap();
        assert_eq!(actual.end_date.as_deref(), Some("2024-06-20T15:00:00-04:00"));
        assert_eq!(actual.by_month_day, vec![1, 15]);
        assert_eq!(actual.frequency, Frequency::Daily);
    }

    #[test]
    fn it_activates_from_previous_turn_frequency() {
        let request = RequestExtraction::default();
        let this_turn = DateTimeExtraction::default();
        let prev_turn = recurring(RecurExtraction {
            frequency: Some(Frequency::Monthly),
            occurrence: Some(6),
            ..Default::default()
        });
        let turns = [
            Turn::new(&request, &this_turn),
            Turn::new(&request, &prev_turn),
        ];
        let actual = build_recurrence(&turns, NOW, TZ, &CalendarMath)
            .unwrap()
            .unwrap();
        assert_eq!(actual.frequency, Frequency::Monthly);
        assert_eq!(actual.occurrence, Some(6));
        assert_eq!(actual.end_date, None);
    }
}
