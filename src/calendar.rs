//! Event calendar queries.
//!
//! Pure functions over the event collection: which event is current (live
//! or next upcoming), and the upcoming/past split used by the public
//! calendar, the admin archive and the driver profile pages.
//!
//! Dates are ISO-8601 local text without a timezone. Future/past decisions
//! compare the raw strings lexicographically against `now` rendered as ISO
//! text, matching the storage sort order; only the live-window check parses
//! the date, because it needs duration arithmetic.

use chrono::{Duration, NaiveDateTime};

use crate::store::Event;

/// Grace window beyond the stated duration before an event stops counting
/// as live, to tolerate overruns.
const LIVE_GRACE_HOURS: f64 = 2.0;

/// Wall-clock "now" in local time, the reference point for every query.
/// Event dates are stored as local datetimes without a timezone.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Render a timestamp the way event dates are stored, for string comparison
pub fn iso_string(now: NaiveDateTime) -> String {
    now.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Parse a stored event date. Accepts second and minute precision
/// ("2024-06-01T19:00:00" / "2024-06-01T19:00"), with optional fractional
/// seconds. Returns `None` for anything else.
pub fn parse_event_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
}

/// The event a visitor should be pointed at right now
#[derive(Debug, Clone, Copy)]
pub struct CurrentEvent<'a> {
    pub event: &'a Event,
    /// Within the live window, so the caller can render a LIVE badge
    pub is_live: bool,
}

/// Resolve the live event, or failing that the next upcoming one.
///
/// An event is live while `date <= now < date + duration + 2h`. The first
/// live event in input order wins; overlapping schedules are the operator's
/// problem. Events with malformed dates are skipped, not fatal. With no live
/// event, the earliest event whose date string is greater than `now` is
/// returned; `None` if nothing is scheduled.
pub fn resolve_current_or_next(events: &[Event], now: NaiveDateTime) -> Option<CurrentEvent<'_>> {
    for event in events {
        if event.date.is_empty() {
            continue;
        }
        let Some(start) = parse_event_date(&event.date) else {
            continue;
        };

        let window_secs = ((event.duration_hours() + LIVE_GRACE_HOURS) * 3600.0) as i64;
        let end = start + Duration::seconds(window_secs);

        if start <= now && now < end {
            return Some(CurrentEvent {
                event,
                is_live: true,
            });
        }
    }

    let now_iso = iso_string(now);
    events
        .iter()
        .filter(|e| e.date.as_str() > now_iso.as_str())
        .min_by(|a, b| a.date.cmp(&b.date))
        .map(|event| CurrentEvent {
            event,
            is_live: false,
        })
}

/// Split events into upcoming (ascending) and past (descending).
///
/// Uses the same string comparison as the storage order. Events with an
/// empty date compare below any ISO timestamp and land in the past list.
pub fn partition(events: &[Event], now: NaiveDateTime) -> (Vec<&Event>, Vec<&Event>) {
    let now_iso = iso_string(now);

    let mut upcoming: Vec<&Event> = Vec::new();
    let mut past: Vec<&Event> = Vec::new();
    for event in events {
        if event.date.as_str() > now_iso.as_str() {
            upcoming.push(event);
        } else {
            past.push(event);
        }
    }

    upcoming.sort_by(|a, b| a.date.cmp(&b.date));
    // Most recent first: ascending sort, then reversed, same comparison as
    // above so both views agree on the boundary.
    past.sort_by(|a, b| a.date.cmp(&b.date));
    past.reverse();

    (upcoming, past)
}

/// Upcoming/past split restricted to events a driver is entered in
pub fn partition_for_driver<'a>(
    events: &'a [Event],
    driver_id: &str,
    now: NaiveDateTime,
) -> (Vec<&'a Event>, Vec<&'a Event>) {
    let entered: Vec<Event> = events
        .iter()
        .filter(|e| e.has_driver(driver_id))
        .cloned()
        .collect();
    let (upcoming, past) = partition(&entered, now);

    // Re-borrow from the original slice so callers get references into the
    // store, not into a temporary.
    let pick = |subset: Vec<&Event>| -> Vec<&'a Event> {
        subset
            .into_iter()
            .filter_map(|e| events.iter().find(|orig| orig.id == e.id))
            .collect()
    };
    (pick(upcoming), pick(past))
}

/// Whether an event's start lies in the past (parsed comparison).
///
/// Used by the event detail page to decide between preview and result
/// rendering; unparsable dates count as not past.
pub fn is_past(event: &Event, now: NaiveDateTime) -> bool {
    match parse_event_date(&event.date) {
        Some(start) => start < now,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Event;

    fn event(id: &str, date: &str, duration: &str) -> Event {
        Event {
            id: id.to_string(),
            date: date.to_string(),
            duration: if duration.is_empty() {
                None
            } else {
                Some(duration.to_string())
            },
            ..Default::default()
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        parse_event_date(s).unwrap()
    }

    #[test]
    fn test_next_future_event_selected() {
        let events = vec![
            event("1", "2024-01-01T10:00", "1"),
            event("2", "2024-06-01T10:00", "1"),
        ];
        let now = at("2024-03-01T00:00");

        let current = resolve_current_or_next(&events, now).unwrap();
        assert_eq!(current.event.id, "2");
        assert!(!current.is_live);
    }

    #[test]
    fn test_live_within_duration_plus_grace() {
        // 1h duration + 2h grace => live until 13:00
        let events = vec![event("1", "2024-01-01T10:00", "1")];

        let current = resolve_current_or_next(&events, at("2024-01-01T11:30")).unwrap();
        assert!(current.is_live);

        let after = resolve_current_or_next(&events, at("2024-01-01T13:00"));
        assert!(after.is_none(), "window is half-open at the end");
    }

    #[test]
    fn test_live_window_start_inclusive() {
        let events = vec![event("1", "2024-01-01T10:00", "1")];
        let current = resolve_current_or_next(&events, at("2024-01-01T10:00")).unwrap();
        assert!(current.is_live);
    }

    #[test]
    fn test_first_live_event_wins_in_input_order() {
        let events = vec![
            event("b", "2024-01-01T10:30", "2"),
            event("a", "2024-01-01T10:00", "2"),
        ];
        let current = resolve_current_or_next(&events, at("2024-01-01T11:00")).unwrap();
        assert_eq!(current.event.id, "b");
    }

    #[test]
    fn test_malformed_dates_skipped_not_fatal() {
        let events = vec![
            event("bad", "next tuesday", "1"),
            event("2", "2024-06-01T10:00", "1"),
        ];
        let current = resolve_current_or_next(&events, at("2024-03-01T00:00")).unwrap();
        assert_eq!(current.event.id, "2");
    }

    #[test]
    fn test_no_events_no_result() {
        assert!(resolve_current_or_next(&[], at("2024-03-01T00:00")).is_none());

        let only_past = vec![event("1", "2020-01-01T10:00", "1")];
        assert!(resolve_current_or_next(&only_past, at("2024-03-01T00:00")).is_none());
    }

    #[test]
    fn test_partition_splits_and_orders() {
        let events = vec![
            event("1", "2024-01-01T10:00", "1"),
            event("2", "2024-06-01T10:00", "1"),
            event("3", "2024-05-01T10:00", "1"),
            event("0", "2023-01-01T10:00", "1"),
        ];
        let (upcoming, past) = partition(&events, at("2024-03-01T00:00"));

        let up: Vec<&str> = upcoming.iter().map(|e| e.id.as_str()).collect();
        let pa: Vec<&str> = past.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(up, vec!["3", "2"], "upcoming ascending");
        assert_eq!(pa, vec!["1", "0"], "past descending");
        assert_eq!(up.len() + pa.len(), events.len());
    }

    #[test]
    fn test_partition_empty_date_goes_to_past() {
        let events = vec![event("1", "", "1"), event("2", "2024-06-01T10:00", "1")];
        let (upcoming, past) = partition(&events, at("2024-03-01T00:00"));

        assert_eq!(upcoming.len(), 1);
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].id, "1");
    }

    #[test]
    fn test_partition_boundary_is_not_upcoming() {
        // date == now compares equal, not greater, so it is already past
        let events = vec![event("1", "2024-03-01T00:00:00", "1")];
        let (upcoming, past) = partition(&events, at("2024-03-01T00:00"));
        assert!(upcoming.is_empty());
        assert_eq!(past.len(), 1);
    }

    #[test]
    fn test_driver_partition_filters_lineup() {
        let mut e1 = event("1", "2024-01-01T10:00", "1");
        e1.drivers = vec!["42".to_string()];
        let mut e2 = event("2", "2024-06-01T10:00", "1");
        e2.drivers = vec!["42".to_string(), "7".to_string()];
        let e3 = event("3", "2024-07-01T10:00", "1");
        let events = vec![e1, e2, e3];

        let (upcoming, past) = partition_for_driver(&events, "42", at("2024-03-01T00:00"));
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, "2");
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].id, "1");
    }

    #[test]
    fn test_is_past_uses_parsed_comparison() {
        let e = event("1", "2024-01-01T10:00", "1");
        assert!(is_past(&e, at("2024-01-01T10:01")));
        assert!(!is_past(&e, at("2024-01-01T09:59")));
        assert!(!is_past(&event("2", "garbled", "1"), at("2024-01-01T10:01")));
    }

    #[test]
    fn test_minute_and_second_precision_parse() {
        assert!(parse_event_date("2024-06-01T19:00").is_some());
        assert!(parse_event_date("2024-06-01T19:00:30").is_some());
        assert!(parse_event_date("2024-06-01T19:00:30.250").is_some());
        assert!(parse_event_date("01.06.2024 19:00").is_none());
    }
}
