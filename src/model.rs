use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Parse a wall-clock time written as `HH:MM` (seconds tolerated).
pub fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

pub fn format_clock_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Parse a calendar day written as `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Same-day time window `[start, end)`. Either bound may be missing.
///
/// A window missing either bound is "all day": it is treated as unbounded on
/// that side for overlap purposes. `start < end` is not required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Window {
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl Window {
    pub fn new(start: Option<NaiveTime>, end: Option<NaiveTime>) -> Self {
        Self { start, end }
    }

    pub fn all_day() -> Self {
        Self::default()
    }

    /// Both bounds, or `None` when the window is all-day.
    pub fn bounds(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((self.start?, self.end?))
    }

    pub fn is_all_day(&self) -> bool {
        self.bounds().is_none()
    }

    /// Half-open intersection; an all-day window overlaps everything.
    pub fn overlaps(&self, other: &Window) -> bool {
        match (self.bounds(), other.bounds()) {
            (Some((a_start, a_end)), Some((b_start, b_end))) => a_start < b_end && b_start < a_end,
            _ => true,
        }
    }

    /// Whether `t` falls inside the window. Missing bounds are open.
    pub fn contains(&self, t: NaiveTime) -> bool {
        self.start.is_none_or(|s| s <= t) && self.end.is_none_or(|e| t < e)
    }

    /// The window has a known end and it is at or before `t`.
    pub fn has_ended_by(&self, t: NaiveTime) -> bool {
        self.end.is_some_and(|e| e <= t)
    }

    /// Nothing of the window has started yet at `t` (no start counts as "later today").
    pub fn starts_after(&self, t: NaiveTime) -> bool {
        self.start.is_none_or(|s| s > t)
    }
}

/// Free-text budget. Only its digits are authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Budget(String);

impl Budget {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Spending ceiling: the digits of the raw text read as one number.
    ///
    /// `None` means "no limit": no digits, a zero amount, or an amount too large
    /// to represent.
    pub fn limit(&self) -> Option<u64> {
        let digits: String = self.0.chars().filter(char::is_ascii_digit).collect();
        digits.parse::<u64>().ok().filter(|&amount| amount > 0)
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

/// Lowercase wire names for the status enums, in both directions.
macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseStatusError { kind: $kind, value: s.to_string() }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    Pending,
    Confirmed,
    /// Derived: confirmed and currently inside its window.
    Ongoing,
    /// Derived terminal.
    Completed,
    /// Derived terminal: the window elapsed while still pending.
    Failed,
    /// Explicit terminal, only ever set by a user.
    Cancelled,
}

wire_enum!(EventStatus, "event status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Ongoing => "ongoing",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl EventStatus {
    /// Statuses that hold a venue slot and therefore block other bookings.
    pub fn claims_slot(&self) -> bool {
        matches!(self, EventStatus::Pending | EventStatus::Confirmed)
    }

    /// Cancelled or past; such an event holds no venue slot and needs no check.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            EventStatus::Cancelled | EventStatus::Completed | EventStatus::Failed
        )
    }

    /// Statuses a caller may set; the rest are derived from the clock.
    pub fn is_explicit(&self) -> bool {
        matches!(
            self,
            EventStatus::Pending | EventStatus::Confirmed | EventStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VenueStatus {
    #[default]
    Empty,
    Pending,
    Occupied,
}

wire_enum!(VenueStatus, "venue status", {
    Empty => "empty",
    Pending => "pending",
    Occupied => "occupied",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StaffStatus {
    Active,
    #[default]
    Inactive,
}

wire_enum!(StaffStatus, "staff status", {
    Active => "active",
    Inactive => "inactive",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableStatus {
    #[default]
    Waiting,
    Full,
}

wire_enum!(TableStatus, "table status", {
    Waiting => "waiting",
    Full => "full",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InviteStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

wire_enum!(InviteStatus, "invite status", {
    Pending => "pending",
    Accepted => "accepted",
    Declined => "declined",
});

// ── Rows ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Ulid,
    pub company: String,
    pub venue_id: Option<Ulid>,
    pub title: String,
    pub date: NaiveDate,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub guests: u32,
    pub budget: Budget,
    pub status: EventStatus,
    pub kind: Option<String>,
    pub area: Option<String>,
    pub folder: Option<String>,
    /// Staff assigned directly to the event.
    pub staff: BTreeSet<Ulid>,
}

impl Event {
    pub fn window(&self) -> Window {
        Window::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: Ulid,
    pub company: String,
    pub name: String,
    pub capacity: u32,
    /// Projection of the venue's events.
    pub status: VenueStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: Ulid,
    pub company: String,
    pub name: String,
    pub role: Option<String>,
    /// Projection of the staff member's assignments.
    pub status: StaffStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Ulid,
    pub event_id: Ulid,
    pub title: String,
    pub done: bool,
    pub staff: BTreeSet<Ulid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTable {
    pub id: Ulid,
    pub event_id: Ulid,
    pub name: String,
    /// 0 = unlimited.
    pub capacity: u32,
    /// Projection of the table's invites.
    pub status: TableStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub id: Ulid,
    pub event_id: Ulid,
    pub table_id: Option<Ulid>,
    pub name: String,
    /// Party size.
    pub personnes: u32,
    pub status: InviteStatus,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: Ulid,
    pub event_id: Ulid,
    pub name: String,
    pub amount: u64,
    pub advance: u64,
}

/// The record types. One committed transaction is a `Vec<Record>`; this is the WAL format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    EventSaved(Event),
    EventStatusChanged { id: Ulid, status: EventStatus },
    EventDeleted { id: Ulid },
    VenueSaved(Venue),
    VenueStatusProjected { id: Ulid, status: VenueStatus },
    VenueDeleted { id: Ulid },
    StaffSaved(Staff),
    StaffStatusProjected { id: Ulid, status: StaffStatus },
    StaffDeleted { id: Ulid },
    TaskSaved(Task),
    TaskDeleted { id: Ulid, event_id: Ulid },
    TableSaved(EventTable),
    TableStatusProjected { id: Ulid, event_id: Ulid, status: TableStatus },
    TableDeleted { id: Ulid, event_id: Ulid },
    InviteSaved(Invite),
    InviteDeleted { id: Ulid, event_id: Ulid },
    ProviderSaved(Provider),
    ProviderDeleted { id: Ulid, event_id: Ulid },
}

impl Record {
    /// Change-feed channel: the owning event for event-scoped rows, otherwise the row itself.
    pub fn channel(&self) -> Ulid {
        match self {
            Record::EventSaved(e) => e.id,
            Record::VenueSaved(v) => v.id,
            Record::StaffSaved(s) => s.id,
            Record::TaskSaved(t) => t.event_id,
            Record::TableSaved(t) => t.event_id,
            Record::InviteSaved(i) => i.event_id,
            Record::ProviderSaved(p) => p.event_id,
            Record::EventStatusChanged { id, .. }
            | Record::EventDeleted { id }
            | Record::VenueStatusProjected { id, .. }
            | Record::VenueDeleted { id }
            | Record::StaffStatusProjected { id, .. }
            | Record::StaffDeleted { id } => *id,
            Record::TaskDeleted { event_id, .. }
            | Record::TableStatusProjected { event_id, .. }
            | Record::TableDeleted { event_id, .. }
            | Record::InviteDeleted { event_id, .. }
            | Record::ProviderDeleted { event_id, .. } => *event_id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Record::EventSaved(_) => "event_saved",
            Record::EventStatusChanged { .. } => "event_status_changed",
            Record::EventDeleted { .. } => "event_deleted",
            Record::VenueSaved(_) => "venue_saved",
            Record::VenueStatusProjected { .. } => "venue_status_projected",
            Record::VenueDeleted { .. } => "venue_deleted",
            Record::StaffSaved(_) => "staff_saved",
            Record::StaffStatusProjected { .. } => "staff_status_projected",
            Record::StaffDeleted { .. } => "staff_deleted",
            Record::TaskSaved(_) => "task_saved",
            Record::TaskDeleted { .. } => "task_deleted",
            Record::TableSaved(_) => "table_saved",
            Record::TableStatusProjected { .. } => "table_status_projected",
            Record::TableDeleted { .. } => "table_deleted",
            Record::InviteSaved(_) => "invite_saved",
            Record::InviteDeleted { .. } => "invite_deleted",
            Record::ProviderSaved(_) => "provider_saved",
            Record::ProviderDeleted { .. } => "provider_deleted",
        }
    }
}

// ── Operation inputs ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub id: Ulid,
    /// When set, must name the engine's own tenant.
    pub company: Option<String>,
    pub venue_id: Option<Ulid>,
    pub title: String,
    pub date: NaiveDate,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub guests: u32,
    pub budget: Budget,
    /// Defaults to `pending`.
    pub status: Option<EventStatus>,
    pub kind: Option<String>,
    pub area: Option<String>,
    pub folder: Option<String>,
    pub staff: BTreeSet<Ulid>,
}

impl EventDraft {
    pub fn new(id: Ulid, title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id,
            company: None,
            venue_id: None,
            title: title.into(),
            date,
            start: None,
            end: None,
            guests: 0,
            budget: Budget::default(),
            status: None,
            kind: None,
            area: None,
            folder: None,
            staff: BTreeSet::new(),
        }
    }

    pub fn at_venue(mut self, venue_id: Ulid) -> Self {
        self.venue_id = Some(venue_id);
        self
    }

    pub fn between(mut self, start: Option<NaiveTime>, end: Option<NaiveTime>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_budget(mut self, budget: impl Into<String>) -> Self {
        self.budget = Budget::new(budget);
        self
    }

    pub fn with_staff(mut self, staff: impl IntoIterator<Item = Ulid>) -> Self {
        self.staff = staff.into_iter().collect();
        self
    }
}

/// Partial event update. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventPatch {
    pub company: Option<String>,
    pub venue_id: Option<Option<Ulid>>,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub start: Option<Option<NaiveTime>>,
    pub end: Option<Option<NaiveTime>>,
    pub guests: Option<u32>,
    pub budget: Option<Budget>,
    pub status: Option<EventStatus>,
    pub kind: Option<Option<String>>,
    pub area: Option<Option<String>>,
    pub folder: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventFilter {
    pub company: Option<String>,
    pub id: Option<Ulid>,
    pub venue_id: Option<Ulid>,
    pub date: Option<NaiveDate>,
    pub status: Option<EventStatus>,
}

impl EventFilter {
    /// Row filter before the sweep runs; `status` is applied to swept rows.
    pub fn selects(&self, event: &Event) -> bool {
        self.id.is_none_or(|id| event.id == id)
            && self.venue_id.is_none_or(|v| event.venue_id == Some(v))
            && self.date.is_none_or(|d| event.date == d)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueDraft {
    pub id: Ulid,
    pub company: Option<String>,
    pub name: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VenuePatch {
    pub company: Option<String>,
    pub name: Option<String>,
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffDraft {
    pub id: Ulid,
    pub company: Option<String>,
    pub name: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StaffPatch {
    pub company: Option<String>,
    pub name: Option<String>,
    pub role: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub id: Ulid,
    pub event_id: Ulid,
    pub title: String,
    pub done: bool,
    pub staff: BTreeSet<Ulid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub done: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDraft {
    pub id: Ulid,
    pub event_id: Ulid,
    pub name: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TablePatch {
    pub name: Option<String>,
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteDraft {
    pub id: Ulid,
    pub event_id: Ulid,
    pub table_id: Option<Ulid>,
    pub name: String,
    pub personnes: u32,
    pub status: InviteStatus,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvitePatch {
    pub table_id: Option<Option<Ulid>>,
    pub name: Option<String>,
    pub personnes: Option<u32>,
    pub status: Option<InviteStatus>,
    pub present: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDraft {
    pub id: Ulid,
    pub event_id: Ulid,
    pub name: String,
    pub amount: u64,
    pub advance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderPatch {
    pub name: Option<String>,
    pub amount: Option<u64>,
    pub advance: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Option<NaiveTime> {
        parse_clock_time(s)
    }

    fn w(start: &str, end: &str) -> Window {
        let bound = |s: &str| if s.is_empty() { None } else { t(s) };
        Window::new(bound(start), bound(end))
    }

    #[test]
    fn clock_time_parsing() {
        assert_eq!(t("09:05"), NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(t(" 14:00 "), NaiveTime::from_hms_opt(14, 0, 0));
        assert_eq!(t("14:00:30"), NaiveTime::from_hms_opt(14, 0, 30));
        assert_eq!(t("25:00"), None);
        assert_eq!(t("noon"), None);
        assert_eq!(format_clock_time(NaiveTime::from_hms_opt(7, 3, 0).unwrap()), "07:03");
    }

    #[test]
    fn timed_windows_overlap_half_open() {
        assert!(w("10:00", "12:00").overlaps(&w("11:00", "13:00")));
        assert!(w("10:00", "12:00").overlaps(&w("10:30", "11:00")));
        assert!(!w("10:00", "12:00").overlaps(&w("12:00", "14:00"))); // adjacent
        assert!(!w("10:00", "12:00").overlaps(&w("08:00", "10:00")));
    }

    #[test]
    fn open_bounds_overlap_everything() {
        assert!(w("", "").overlaps(&w("10:00", "12:00")));
        assert!(w("10:00", "").overlaps(&w("06:00", "07:00")));
        assert!(w("", "09:00").overlaps(&w("20:00", "21:00")));
        assert!(w("", "").overlaps(&w("", "")));
    }

    #[test]
    fn overlap_is_symmetric() {
        let shapes = [
            w("", ""),
            w("10:00", ""),
            w("", "12:00"),
            w("10:00", "12:00"),
            w("12:00", "14:00"),
            w("11:00", "11:30"),
            w("16:00", "14:00"),
        ];
        for a in &shapes {
            for b in &shapes {
                assert_eq!(a.overlaps(b), b.overlaps(a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn window_contains_four_cases() {
        let noon = t("12:00").unwrap();
        assert!(w("11:00", "13:00").contains(noon));
        assert!(w("12:00", "13:00").contains(noon)); // start inclusive
        assert!(!w("11:00", "12:00").contains(noon)); // end exclusive
        assert!(w("", "").contains(noon));
        assert!(w("", "12:30").contains(noon));
        assert!(!w("", "12:00").contains(noon));
        assert!(w("12:00", "").contains(noon));
        assert!(!w("12:01", "").contains(noon));
    }

    #[test]
    fn window_end_and_start_tests() {
        let noon = t("12:00").unwrap();
        assert!(w("10:00", "12:00").has_ended_by(noon));
        assert!(!w("10:00", "12:01").has_ended_by(noon));
        assert!(!w("10:00", "").has_ended_by(noon));
        assert!(w("", "").starts_after(noon));
        assert!(w("12:01", "13:00").starts_after(noon));
        assert!(!w("12:00", "13:00").starts_after(noon));
    }

    #[test]
    fn budget_limit_strips_non_digits() {
        assert_eq!(Budget::new("15000").limit(), Some(15_000));
        assert_eq!(Budget::new("15 000 €").limit(), Some(15_000));
        assert_eq!(Budget::new("$1,250").limit(), Some(1_250));
        assert_eq!(Budget::new("1500.50").limit(), Some(150_050));
    }

    #[test]
    fn budget_without_amount_is_unlimited() {
        assert_eq!(Budget::new("").limit(), None);
        assert_eq!(Budget::new("to be discussed").limit(), None);
        assert_eq!(Budget::new("0").limit(), None);
        assert_eq!(Budget::new("000 €").limit(), None);
        assert_eq!(Budget::new("99999999999999999999999").limit(), None);
    }

    #[test]
    fn status_wire_names() {
        assert_eq!("ongoing".parse::<EventStatus>().unwrap(), EventStatus::Ongoing);
        assert_eq!("Cancelled".parse::<EventStatus>().unwrap(), EventStatus::Cancelled);
        assert_eq!(EventStatus::Failed.to_string(), "failed");
        assert_eq!("occupied".parse::<VenueStatus>().unwrap(), VenueStatus::Occupied);
        assert_eq!(StaffStatus::default(), StaffStatus::Inactive);
        assert_eq!(TableStatus::Full.as_str(), "full");
        let err = "done".parse::<EventStatus>().unwrap_err();
        assert_eq!(err.kind, "event status");
    }

    #[test]
    fn explicit_and_claiming_statuses() {
        assert!(EventStatus::Pending.claims_slot());
        assert!(EventStatus::Confirmed.claims_slot());
        assert!(!EventStatus::Ongoing.claims_slot());
        assert!(!EventStatus::Cancelled.claims_slot());
        assert!(!EventStatus::Ongoing.is_settled());
        assert!(EventStatus::Failed.is_settled());
        assert!(EventStatus::Cancelled.is_explicit());
        assert!(!EventStatus::Completed.is_explicit());
        assert!(!EventStatus::Failed.is_explicit());
    }

    #[test]
    fn event_filter_selects() {
        let venue = Ulid::new();
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let event = Event {
            id: Ulid::new(),
            company: "acme".into(),
            venue_id: Some(venue),
            title: "Gala".into(),
            date,
            start: None,
            end: None,
            guests: 0,
            budget: Budget::default(),
            status: EventStatus::Pending,
            kind: None,
            area: None,
            folder: None,
            staff: BTreeSet::new(),
        };
        assert!(EventFilter::default().selects(&event));
        assert!(EventFilter { venue_id: Some(venue), date: Some(date), ..Default::default() }.selects(&event));
        assert!(!EventFilter { venue_id: Some(Ulid::new()), ..Default::default() }.selects(&event));
        assert!(!EventFilter { date: date.succ_opt(), ..Default::default() }.selects(&event));
    }

    #[test]
    fn record_channels() {
        let event_id = Ulid::new();
        let invite = Invite {
            id: Ulid::new(),
            event_id,
            table_id: None,
            name: "Ada".into(),
            personnes: 2,
            status: InviteStatus::Accepted,
            present: false,
        };
        assert_eq!(Record::InviteSaved(invite).channel(), event_id);
        assert_eq!(Record::TableDeleted { id: Ulid::new(), event_id }.channel(), event_id);
        let venue_id = Ulid::new();
        assert_eq!(
            Record::VenueStatusProjected { id: venue_id, status: VenueStatus::Pending }.channel(),
            venue_id
        );
    }

    #[test]
    fn record_serialization_roundtrip() {
        let record = Record::EventSaved(Event {
            id: Ulid::new(),
            company: "acme".into(),
            venue_id: Some(Ulid::new()),
            title: "Wedding".into(),
            date: NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
            start: t("14:00"),
            end: None,
            guests: 120,
            budget: Budget::new("25 000"),
            status: EventStatus::Confirmed,
            kind: Some("wedding".into()),
            area: None,
            folder: Some("events/wedding".into()),
            staff: [Ulid::new(), Ulid::new()].into_iter().collect(),
        });
        let bytes = bincode::serialize(&vec![record.clone()]).unwrap();
        let decoded: Vec<Record> = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, vec![record]);
    }
}
