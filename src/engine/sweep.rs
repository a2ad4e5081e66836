use chrono::NaiveDateTime;

use crate::model::{Event, EventStatus};

/// The event's window is over: an earlier day, or today with an end at or before now.
fn has_elapsed(event: &Event, now: NaiveDateTime) -> bool {
    let today = now.date();
    event.date < today || (event.date == today && event.window().has_ended_by(now.time()))
}

/// Status an event should carry at `now`. Pure; the first matching rule wins.
///
/// 1. pending and elapsed → failed
/// 2. confirmed or ongoing and elapsed → completed
/// 3. confirmed, today, inside its window → ongoing
///
/// Anything else, `cancelled` included, keeps its status.
pub fn compute_status(event: &Event, now: NaiveDateTime) -> EventStatus {
    match event.status {
        EventStatus::Pending if has_elapsed(event, now) => EventStatus::Failed,
        EventStatus::Confirmed | EventStatus::Ongoing if has_elapsed(event, now) => {
            EventStatus::Completed
        }
        EventStatus::Confirmed
            if event.date == now.date() && event.window().contains(now.time()) =>
        {
            EventStatus::Ongoing
        }
        status => status,
    }
}

/// The status change due at `now`, if any.
pub fn transition(event: &Event, now: NaiveDateTime) -> Option<EventStatus> {
    let next = compute_status(event, now);
    (next != event.status).then_some(next)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{NaiveDate, NaiveTime};
    use ulid::Ulid;

    use super::*;
    use crate::model::{parse_clock_time, Budget};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 10).unwrap()
    }

    fn at(time: &str) -> NaiveDateTime {
        today().and_time(parse_clock_time(time).unwrap())
    }

    fn event(date: NaiveDate, start: &str, end: &str, status: EventStatus) -> Event {
        let bound = |s: &str| -> Option<NaiveTime> { if s.is_empty() { None } else { parse_clock_time(s) } };
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
    fn confirmed_inside_window_becomes_ongoing() {
        let e = event(today(), "14:00", "16:00", EventStatus::Confirmed);
        assert_eq!(compute_status(&e, at("15:00")), EventStatus::Ongoing);
        assert_eq!(compute_status(&e, at("13:59")), EventStatus::Confirmed);
    }

    #[test]
    fn pending_from_yesterday_fails() {
        let yesterday = today().pred_opt().unwrap();
        let e = event(yesterday, "", "", EventStatus::Pending);
        assert_eq!(compute_status(&e, at("08:00")), EventStatus::Failed);
    }

    #[test]
    fn elapsed_today_uses_end_time() {
        let pending = event(today(), "09:00", "11:00", EventStatus::Pending);
        assert_eq!(compute_status(&pending, at("11:00")), EventStatus::Failed);
        assert_eq!(compute_status(&pending, at("10:59")), EventStatus::Pending);

        let ongoing = event(today(), "09:00", "11:00", EventStatus::Ongoing);
        assert_eq!(compute_status(&ongoing, at("12:00")), EventStatus::Completed);

        // No end: nothing elapses until the day is over.
        let open = event(today(), "09:00", "", EventStatus::Pending);
        assert_eq!(compute_status(&open, at("23:59")), EventStatus::Pending);
    }

    #[test]
    fn open_windows_for_ongoing() {
        let all_day = event(today(), "", "", EventStatus::Confirmed);
        assert_eq!(compute_status(&all_day, at("00:00")), EventStatus::Ongoing);

        let until = event(today(), "", "12:00", EventStatus::Confirmed);
        assert_eq!(compute_status(&until, at("11:00")), EventStatus::Ongoing);

        let from = event(today(), "12:00", "", EventStatus::Confirmed);
        assert_eq!(compute_status(&from, at("11:00")), EventStatus::Confirmed);
        assert_eq!(compute_status(&from, at("12:00")), EventStatus::Ongoing);
    }

    #[test]
    fn future_and_cancelled_untouched() {
        let tomorrow = today().succ_opt().unwrap();
        let future = event(tomorrow, "", "", EventStatus::Confirmed);
        assert_eq!(transition(&future, at("12:00")), None);

        let yesterday = today().pred_opt().unwrap();
        let cancelled = event(yesterday, "", "", EventStatus::Cancelled);
        assert_eq!(transition(&cancelled, at("12:00")), None);
    }

    #[test]
    fn sweep_is_idempotent() {
        let yesterday = today().pred_opt().unwrap();
        let cases = [
            event(today(), "14:00", "16:00", EventStatus::Confirmed),
            event(yesterday, "", "", EventStatus::Pending),
            event(yesterday, "", "", EventStatus::Confirmed),
            event(today(), "", "", EventStatus::Pending),
        ];
        for mut e in cases {
            e.status = compute_status(&e, at("15:00"));
            assert_eq!(transition(&e, at("15:00")), None, "{e:?}");
        }
    }
}
