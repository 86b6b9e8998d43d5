//! Builds a `MeetingRequest` from extraction results and merges it
//! into what earlier turns already collected.
//!
//! A fresh request and a follow up answer go through the same builder.
//! The only difference is how many turns are ranked: a fresh request
//! has just the current turn, a follow up has the current turn and the
//! one before it. Every field takes the first populated value in rank
//! order and falls back to the user's preferences and then a builtin
//! default.

use anyhow::Result;
use tracing::debug;

use super::models::{
    AttendeeDraft, DateTimeExtraction, MeetingRequest, Populated, PrevDataExtra,
    RequestExtraction,
};
use super::ports::DateExtrapolator;
use super::recurrence::build_recurrence;
use crate::core::datetime::{Boundary, DateComponents, shift_days};
use crate::store::models::ChatMeetingPreferences;

pub const DEFAULT_DURATION_MINUTES: i64 = 30;
pub const DEFAULT_PRIORITY: i64 = 1;
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Extraction results for a single user turn.
#[derive(Clone, Copy, Debug)]
pub struct Turn<'a> {
    pub request: &'a RequestExtraction,
    pub date_time: &'a DateTimeExtraction,
}

impl<'a> Turn<'a> {
    pub fn new(request: &'a RequestExtraction, date_time: &'a DateTimeExtraction) -> Self {
        Self { request, date_time }
    }
}

pub struct BuildContext<'a> {
    pub user_id: &'a str,
    pub timezone: &'a str,
    pub current_time: &'a str,
    pub preferences: &'a ChatMeetingPreferences,
    pub dates: &'a dyn DateExtrapolator,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BuiltRequest {
    pub request: MeetingRequest,
    /// The extrapolated window, before explicit times or defaults
    /// were applied.
    pub extra: PrevDataExtra,
}

/// First populated value across the ranked turns.
pub fn pick<T, F>(turns: &[Turn], get: F) -> Option<T>
where
    T: Populated,
    F: Fn(&Turn) -> Option<T>,
{
    turns.iter().filter_map(get).find(|v| v.is_populated())
}

/// Date components assembled one sub-field at a time across the
/// ranked turns.
pub fn merge_components<F>(turns: &[Turn], get: F) -> DateComponents
where
    F: Fn(&Turn) -> Option<DateComponents>,
{
    turns
        .iter()
        .filter_map(get)
        .fold(DateComponents::default(), |acc, next| acc.or(&next))
}

fn title(turn: &Turn) -> Option<String> {
    let params = &turn.request.params;
    [
        params.title.clone(),
        params.summary.clone(),
        params.description.clone(),
        params.task_list.first().map(|t| t.task.clone()),
    ]
    .into_iter()
    .flatten()
    .find(|t| t.is_populated())
}

fn description(turn: &Turn) -> Option<String> {
    let params = &turn.request.params;
    [params.description.clone(), params.notes.clone()]
        .into_iter()
        .flatten()
        .find(|d| d.is_populated())
}

fn extrapolate(
    ctx: &BuildContext,
    components: &DateComponents,
    boundary: Boundary,
) -> Result<Option<String>> {
    if components.is_empty() {
        return Ok(None);
    }
    ctx.dates
        .extrapolate(ctx.current_time, ctx.timezone, components, boundary)
}

pub fn build_request(turns: &[Turn], ctx: &BuildContext) -> Result<BuiltRequest> {
    let prefs = ctx.preferences;

    let window_start = merge_components(turns, |t| t.date_time.find_time_window_start.clone());
    let window_end = merge_components(turns, |t| t.date_time.find_time_window_end.clone());
    let extrapolated_start = extrapolate(ctx, &window_start, Boundary::Start)?;
    let extrapolated_end = extrapolate(ctx, &window_end, Boundary::End)?;

    let window_start_date = match pick(turns, |t| t.request.params.start_time.clone()) {
        Some(explicit) => explicit,
        None => extrapolated_start
            .clone()
            .unwrap_or_else(|| ctx.current_time.to_string()),
    };
    let window_end_date = match pick(turns, |t| t.request.params.end_time.clone()) {
        Some(explicit) => explicit,
        None => match extrapolated_end.clone() {
            Some(end) => end,
            None => shift_days(ctx.current_time, DEFAULT_WINDOW_DAYS)?,
        },
    };

    let duration = pick(turns, |t| t.date_time.duration)
        .or(prefs.duration.filter(|d| d.is_populated()))
        .unwrap_or(DEFAULT_DURATION_MINUTES);

    let request = MeetingRequest {
        user_id: ctx.user_id.to_string(),
        timezone: ctx.timezone.to_string(),
        title: pick(turns, title),
        attendees: pick(turns, |t| Some(t.request.params.attendees.clone())).unwrap_or_default(),
        method: turns
            .first()
            .and_then(|t| t.date_time.method.clone())
            .filter(|m| m.is_populated()),
        duration: Some(duration),
        description: pick(turns, description),
        conference_app: pick(turns, |t| {
            t.request.params.conference.as_ref().and_then(|c| c.app.clone())
        })
        .or(prefs.conference_app.clone().filter(|a| a.is_populated())),
        window_start_date: Some(window_start_date),
        window_end_date: Some(window_end_date),
        buffer_time: pick(turns, |t| t.request.params.buffer_time.clone())
            .or(prefs.buffer_time.clone()),
        reminders: pick(turns, |t| Some(t.request.params.alarms.clone()))
            .unwrap_or_else(|| prefs.reminders.clone()),
        priority: Some(pick(turns, |t| t.request.params.priority).unwrap_or(DEFAULT_PRIORITY)),
        time_preferences: pick(turns, |t| Some(t.date_time.time_preferences.clone()))
            .unwrap_or_default(),
        location: pick(turns, |t| t.request.params.location.clone()),
        transparency: pick(turns, |t| t.request.params.transparency),
        visibility: pick(turns, |t| t.request.params.visibility),
        recur: build_recurrence(turns, ctx.current_time, ctx.timezone, ctx.dates)?,
    };
    debug!(
        "Built request from {} turn(s): title={:?} attendees={}",
        turns.len(),
        request.title,
        request.attendees.len()
    );

    Ok(BuiltRequest {
        request,
        extra: PrevDataExtra {
            window_start_date: extrapolated_start,
            window_end_date: extrapolated_end,
        },
    })
}

fn prefer<T: Populated + Clone>(prev: &T, new: &T) -> T {
    if prev.is_populated() || !new.is_populated() {
        prev.clone()
    } else {
        new.clone()
    }
}

/// Combine the attendees collected so far with the ones from this turn.
///
/// When every earlier attendee already has an email the earlier list
/// stands. Otherwise this turn is answering for the ones without an
/// email, so they are replaced by this turn's attendees. A host from
/// this turn is kept only when the earlier list has none; a second host
/// is dropped rather than demoted to a guest.
pub fn merge_attendees(prev: &[AttendeeDraft], new: &[AttendeeDraft]) -> Vec<AttendeeDraft> {
    let complete = prev.iter().all(|a| a.email().is_some());
    let mut merged: Vec<AttendeeDraft> = if complete || new.is_empty() {
        prev.to_vec()
    } else {
        prev.iter().filter(|a| a.email().is_some()).cloned().collect()
    };
    let take_all = !complete && !new.is_empty();
    for attendee in new {
        let wanted = if attendee.is_host {
            !merged.iter().any(|a| a.is_host)
        } else {
            take_all
        };
        if !wanted {
            continue;
        }
        let duplicate = attendee.email().is_some_and(|email| {
            merged
                .iter()
                .any(|a| a.email().is_some_and(|e| e.eq_ignore_ascii_case(email)))
        });
        if !duplicate {
            merged.push(attendee.clone());
        }
    }
    merged
}

/// Merge a freshly built request into the one stored from earlier
/// turns. Populated earlier values win.
pub fn merge_requests(prev: &MeetingRequest, new: &MeetingRequest) -> MeetingRequest {
    MeetingRequest {
        user_id: prefer(&prev.user_id, &new.user_id),
        timezone: prefer(&prev.timezone, &new.timezone),
        title: prefer(&prev.title, &new.title),
        attendees: merge_attendees(&prev.attendees, &new.attendees),
        method: prefer(&prev.method, &new.method),
        duration: prefer(&prev.duration, &new.duration),
        description: prefer(&prev.description, &new.description),
        conference_app: prefer(&prev.conference_app, &new.conference_app),
        window_start_date: prefer(&prev.window_start_date, &new.window_start_date),
        window_end_date: prefer(&prev.window_end_date, &new.window_end_date),
        buffer_time: prefer(&prev.buffer_time, &new.buffer_time),
        reminders: prefer(&prev.reminders, &new.reminders),
        priority: prefer(&prev.priority, &new.priority),
        time_preferences: prefer(&prev.time_preferences, &new.time_preferences),
        location: prefer(&prev.location, &new.location),
        transparency: prefer(&prev.transparency, &new.transparency),
        visibility: prefer(&prev.visibility, &new.visibility),
        recur: prefer(&prev.recur, &new.recur),
    }
}
