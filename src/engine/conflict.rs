use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::Window;

use super::store::Store;

/// Whether a requested booking window collides with an existing one.
///
/// An all-day request only collides with another all-day booking; a timed
/// request collides with anything it overlaps, all-day bookings included.
pub fn window_conflicts(requested: &Window, existing: &Window) -> bool {
    if requested.is_all_day() {
        existing.is_all_day()
    } else {
        requested.overlaps(existing)
    }
}

/// First slot-claiming event at `venue_id` on `date` that blocks `window`.
///
/// `exclude` is the event being updated, which never blocks itself.
pub(crate) fn find_booking_conflict(
    store: &Store,
    venue_id: Ulid,
    date: NaiveDate,
    window: &Window,
    exclude: Option<Ulid>,
) -> Option<Ulid> {
    store
        .events_at_venue(venue_id)
        .filter(|event| Some(event.id) != exclude)
        .filter(|event| event.date == date && event.status.claims_slot())
        .find(|event| window_conflicts(window, &event.window()))
        .map(|event| event.id)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::*;

    fn w(start: &str, end: &str) -> Window {
        let bound = |s: &str| if s.is_empty() { None } else { parse_clock_time(s) };
        Window::new(bound(start), bound(end))
    }

    fn booking(venue_id: Ulid, date: NaiveDate, window: Window, status: EventStatus) -> Event {
        Event {
            id: Ulid::new(),
            company: "acme".into(),
            venue_id: Some(venue_id),
            title: "booking".into(),
            date,
            start: window.start,
            end: window.end,
            guests: 0,
            budget: Budget::default(),
            status,
            kind: None,
            area: None,
            folder: None,
            staff: BTreeSet::new(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, d).unwrap()
    }

    #[test]
    fn all_day_request_only_meets_all_day() {
        assert!(!window_conflicts(&w("", ""), &w("10:00", "12:00")));
        assert!(!window_conflicts(&w("09:00", ""), &w("10:00", "12:00")));
        assert!(window_conflicts(&w("", ""), &w("", "")));
        assert!(window_conflicts(&w("", "18:00"), &w("08:00", "")));
    }

    #[test]
    fn timed_request_meets_all_day_and_overlaps() {
        assert!(window_conflicts(&w("09:00", "10:00"), &w("", "")));
        assert!(window_conflicts(&w("09:00", "10:00"), &w("09:30", "11:00")));
        assert!(!window_conflicts(&w("09:00", "10:00"), &w("10:00", "11:00")));
    }

    #[test]
    fn finds_blocking_pending_all_day_event() {
        let venue_id = Ulid::new();
        let mut store = Store::new();
        let existing = booking(venue_id, day(3), w("", ""), EventStatus::Pending);
        store.apply(&Record::EventSaved(existing.clone()));

        let hit = find_booking_conflict(&store, venue_id, day(3), &w("09:00", "10:00"), None);
        assert_eq!(hit, Some(existing.id));
    }

    #[test]
    fn ignores_other_days_venues_statuses_and_self() {
        let venue_id = Ulid::new();
        let mut store = Store::new();
        let requested = w("10:00", "12:00");
        for status in [
            EventStatus::Ongoing,
            EventStatus::Completed,
            EventStatus::Failed,
            EventStatus::Cancelled,
        ] {
            store.apply(&Record::EventSaved(booking(venue_id, day(3), requested, status)));
        }
        store.apply(&Record::EventSaved(booking(venue_id, day(4), requested, EventStatus::Confirmed)));
        store.apply(&Record::EventSaved(booking(Ulid::new(), day(3), requested, EventStatus::Confirmed)));
        let own = booking(venue_id, day(3), requested, EventStatus::Confirmed);
        store.apply(&Record::EventSaved(own.clone()));

        assert_eq!(find_booking_conflict(&store, venue_id, day(3), &requested, Some(own.id)), None);
        assert_eq!(find_booking_conflict(&store, venue_id, day(3), &requested, None), Some(own.id));
    }
}
