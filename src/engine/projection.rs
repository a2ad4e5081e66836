use chrono::NaiveDateTime;

use crate::model::*;

/// Occupancy of a venue from the events booked there.
pub fn venue_status<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    now: NaiveDateTime,
) -> VenueStatus {
    let (today, time) = (now.date(), now.time());
    let mut upcoming = false;
    for event in events {
        let window = event.window();
        let running = matches!(event.status, EventStatus::Confirmed | EventStatus::Ongoing)
            && event.date == today
            && window.contains(time);
        if running {
            return VenueStatus::Occupied;
        }
        if event.status.claims_slot()
            && (event.date > today || (event.date == today && window.starts_after(time)))
        {
            upcoming = true;
        }
    }
    if upcoming {
        VenueStatus::Pending
    } else {
        VenueStatus::Empty
    }
}

/// A staff member is active while one of their events is running today.
pub fn staff_status<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    now: NaiveDateTime,
) -> StaffStatus {
    let (today, time) = (now.date(), now.time());
    let working = events.into_iter().any(|event| {
        event.date == today
            && match event.status {
                EventStatus::Ongoing => true,
                EventStatus::Confirmed => event.window().contains(time),
                _ => false,
            }
    });
    if working {
        StaffStatus::Active
    } else {
        StaffStatus::Inactive
    }
}

/// Capacity 0 never fills.
pub fn table_status(capacity: u32, seated: u32) -> TableStatus {
    if capacity > 0 && seated >= capacity {
        TableStatus::Full
    } else {
        TableStatus::Waiting
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;
    use ulid::Ulid;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    fn at(time: &str) -> NaiveDateTime {
        today().and_time(parse_clock_time(time).unwrap())
    }

    fn event(date: NaiveDate, start: &str, end: &str, status: EventStatus) -> Event {
        let bound = |s: &str| if s.is_empty() { None } else { parse_clock_time(s) };
        Event {
            id: Ulid::new(),
            company: "acme".into(),
            venue_id: None,
            title: "e".into(),
            date,
            start: bound(start),
            end: bound(end),
            guests: 0,
            budget: Budget::default(),
            status,
            kind: None,
            area: None,
            folder: None,
            staff: BTreeSet::new(),
        }
    }

    #[test]
    fn venue_occupied_then_empty() {
        let events = [event(today(), "10:00", "12:00", EventStatus::Confirmed)];
        assert_eq!(venue_status(&events, at("11:00")), VenueStatus::Occupied);
        assert_eq!(venue_status(&events, at("13:00")), VenueStatus::Empty);
        assert_eq!(venue_status(&events, at("09:00")), VenueStatus::Pending);
    }

    #[test]
    fn ongoing_counts_as_occupied() {
        let events = [event(today(), "10:00", "12:00", EventStatus::Ongoing)];
        assert_eq!(venue_status(&events, at("10:30")), VenueStatus::Occupied);
    }

    #[test]
    fn pending_needs_future_slot_claim() {
        let tomorrow = today().succ_opt().unwrap();
        let events = [
            event(tomorrow, "", "", EventStatus::Pending),
            event(today(), "08:00", "09:00", EventStatus::Pending),
        ];
        assert_eq!(venue_status(&events, at("12:00")), VenueStatus::Pending);

        let cancelled = [event(tomorrow, "", "", EventStatus::Cancelled)];
        assert_eq!(venue_status(&cancelled, at("12:00")), VenueStatus::Empty);

        // Pending and no start: still "later today".
        let open = [event(today(), "", "", EventStatus::Pending)];
        assert_eq!(venue_status(&open, at("12:00")), VenueStatus::Pending);
    }

    #[test]
    fn venue_without_events_is_empty() {
        assert_eq!(venue_status(&[], at("12:00")), VenueStatus::Empty);
    }

    #[test]
    fn staff_active_only_while_running_today() {
        let tomorrow = today().succ_opt().unwrap();
        let confirmed = event(today(), "14:00", "16:00", EventStatus::Confirmed);
        let ongoing = event(today(), "", "", EventStatus::Ongoing);
        let later = event(tomorrow, "", "", EventStatus::Ongoing);
        let pending = event(today(), "", "", EventStatus::Pending);

        assert_eq!(staff_status([&confirmed], at("15:00")), StaffStatus::Active);
        assert_eq!(staff_status([&confirmed], at("16:00")), StaffStatus::Inactive);
        assert_eq!(staff_status([&ongoing], at("01:00")), StaffStatus::Active);
        assert_eq!(staff_status([&later, &pending], at("15:00")), StaffStatus::Inactive);
    }

    #[test]
    fn table_fill() {
        assert_eq!(table_status(10, 8), TableStatus::Waiting);
        assert_eq!(table_status(10, 10), TableStatus::Full);
        assert_eq!(table_status(0, 500), TableStatus::Waiting);
    }
}
