use std::collections::{BTreeSet, HashMap};

use ulid::Ulid;

use crate::model::*;

/// Prior value of one row, captured before a record is applied.
pub(crate) enum Undo {
    Event(Ulid, Option<Event>),
    Venue(Ulid, Option<Venue>),
    Staff(Ulid, Option<Staff>),
    Task(Ulid, Option<Task>),
    Table(Ulid, Option<EventTable>),
    Invite(Ulid, Option<Invite>),
    Provider(Ulid, Option<Provider>),
}

/// All rows of one tenant. Rows change only through [`Store::apply`].
#[derive(Default)]
pub struct Store {
    pub(crate) events: HashMap<Ulid, Event>,
    pub(crate) venues: HashMap<Ulid, Venue>,
    pub(crate) staff: HashMap<Ulid, Staff>,
    pub(crate) tasks: HashMap<Ulid, Task>,
    pub(crate) tables: HashMap<Ulid, EventTable>,
    pub(crate) invites: HashMap<Ulid, Invite>,
    pub(crate) providers: HashMap<Ulid, Provider>,
    /// venue id → ids of events booked there
    venue_events: HashMap<Ulid, BTreeSet<Ulid>>,
    /// event id → ids of its tasks, tables, invites and providers
    children: HashMap<Ulid, BTreeSet<Ulid>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Record application ──────────────────────────────────

    pub(crate) fn apply(&mut self, record: &Record) -> Undo {
        match record {
            Record::EventSaved(event) => Undo::Event(event.id, self.put_event(event.clone())),
            Record::EventStatusChanged { id, status } => {
                let prior = self.events.get(id).cloned();
                if let Some(event) = self.events.get_mut(id) {
                    event.status = *status;
                }
                Undo::Event(*id, prior)
            }
            Record::EventDeleted { id } => Undo::Event(*id, self.remove_event(id)),

            Record::VenueSaved(venue) => Undo::Venue(venue.id, self.venues.insert(venue.id, venue.clone())),
            Record::VenueStatusProjected { id, status } => {
                let prior = self.venues.get(id).cloned();
                if let Some(venue) = self.venues.get_mut(id) {
                    venue.status = *status;
                }
                Undo::Venue(*id, prior)
            }
            Record::VenueDeleted { id } => Undo::Venue(*id, self.venues.remove(id)),

            Record::StaffSaved(staff) => Undo::Staff(staff.id, self.staff.insert(staff.id, staff.clone())),
            Record::StaffStatusProjected { id, status } => {
                let prior = self.staff.get(id).cloned();
                if let Some(staff) = self.staff.get_mut(id) {
                    staff.status = *status;
                }
                Undo::Staff(*id, prior)
            }
            Record::StaffDeleted { id } => Undo::Staff(*id, self.staff.remove(id)),

            Record::TaskSaved(task) => Undo::Task(task.id, self.put_task(task.clone())),
            Record::TaskDeleted { id, .. } => Undo::Task(*id, self.remove_task(id)),

            Record::TableSaved(table) => Undo::Table(table.id, self.put_table(table.clone())),
            Record::TableStatusProjected { id, status, .. } => {
                let prior = self.tables.get(id).cloned();
                if let Some(table) = self.tables.get_mut(id) {
                    table.status = *status;
                }
                Undo::Table(*id, prior)
            }
            Record::TableDeleted { id, .. } => Undo::Table(*id, self.remove_table(id)),

            Record::InviteSaved(invite) => Undo::Invite(invite.id, self.put_invite(invite.clone())),
            Record::InviteDeleted { id, .. } => Undo::Invite(*id, self.remove_invite(id)),

            Record::ProviderSaved(provider) => {
                Undo::Provider(provider.id, self.put_provider(provider.clone()))
            }
            Record::ProviderDeleted { id, .. } => Undo::Provider(*id, self.remove_provider(id)),
        }
    }

    /// Restore a row to the value captured in `undo`.
    pub(crate) fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::Event(id, prior) => {
                self.remove_event(&id);
                if let Some(event) = prior {
                    self.put_event(event);
                }
            }
            Undo::Venue(id, prior) => {
                self.venues.remove(&id);
                if let Some(venue) = prior {
                    self.venues.insert(id, venue);
                }
            }
            Undo::Staff(id, prior) => {
                self.staff.remove(&id);
                if let Some(staff) = prior {
                    self.staff.insert(id, staff);
                }
            }
            Undo::Task(id, prior) => {
                self.remove_task(&id);
                if let Some(task) = prior {
                    self.put_task(task);
                }
            }
            Undo::Table(id, prior) => {
                self.remove_table(&id);
                if let Some(table) = prior {
                    self.put_table(table);
                }
            }
            Undo::Invite(id, prior) => {
                self.remove_invite(&id);
                if let Some(invite) = prior {
                    self.put_invite(invite);
                }
            }
            Undo::Provider(id, prior) => {
                self.remove_provider(&id);
                if let Some(provider) = prior {
                    self.put_provider(provider);
                }
            }
        }
    }

    // ── Index-maintaining writes ────────────────────────────

    fn put_event(&mut self, event: Event) -> Option<Event> {
        let prior = self.remove_event(&event.id);
        if let Some(venue_id) = event.venue_id {
            self.venue_events.entry(venue_id).or_default().insert(event.id);
        }
        self.events.insert(event.id, event);
        prior
    }

    fn remove_event(&mut self, id: &Ulid) -> Option<Event> {
        let prior = self.events.remove(id)?;
        if let Some(venue_id) = prior.venue_id
            && let Some(ids) = self.venue_events.get_mut(&venue_id)
        {
            ids.remove(id);
            if ids.is_empty() {
                self.venue_events.remove(&venue_id);
            }
        }
        Some(prior)
    }

    fn link_child(&mut self, event_id: Ulid, id: Ulid) {
        self.children.entry(event_id).or_default().insert(id);
    }

    fn unlink_child(&mut self, event_id: Ulid, id: &Ulid) {
        if let Some(ids) = self.children.get_mut(&event_id) {
            ids.remove(id);
            if ids.is_empty() {
                self.children.remove(&event_id);
            }
        }
    }

    fn put_task(&mut self, task: Task) -> Option<Task> {
        self.link_child(task.event_id, task.id);
        self.tasks.insert(task.id, task)
    }

    fn remove_task(&mut self, id: &Ulid) -> Option<Task> {
        let prior = self.tasks.remove(id)?;
        self.unlink_child(prior.event_id, id);
        Some(prior)
    }

    fn put_table(&mut self, table: EventTable) -> Option<EventTable> {
        self.link_child(table.event_id, table.id);
        self.tables.insert(table.id, table)
    }

    fn remove_table(&mut self, id: &Ulid) -> Option<EventTable> {
        let prior = self.tables.remove(id)?;
        self.unlink_child(prior.event_id, id);
        Some(prior)
    }

    fn put_invite(&mut self, invite: Invite) -> Option<Invite> {
        self.link_child(invite.event_id, invite.id);
        self.invites.insert(invite.id, invite)
    }

    fn remove_invite(&mut self, id: &Ulid) -> Option<Invite> {
        let prior = self.invites.remove(id)?;
        self.unlink_child(prior.event_id, id);
        Some(prior)
    }

    fn put_provider(&mut self, provider: Provider) -> Option<Provider> {
        self.link_child(provider.event_id, provider.id);
        self.providers.insert(provider.id, provider)
    }

    fn remove_provider(&mut self, id: &Ulid) -> Option<Provider> {
        let prior = self.providers.remove(id)?;
        self.unlink_child(prior.event_id, id);
        Some(prior)
    }

    // ── Scans ───────────────────────────────────────────────

    pub fn events_at_venue(&self, venue_id: Ulid) -> impl Iterator<Item = &Event> {
        self.venue_events
            .get(&venue_id)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.events.get(id))
    }

    fn children_of(&self, event_id: Ulid) -> impl Iterator<Item = &Ulid> {
        self.children.get(&event_id).into_iter().flatten()
    }

    pub fn tasks_of(&self, event_id: Ulid) -> impl Iterator<Item = &Task> {
        self.children_of(event_id).filter_map(move |id| self.tasks.get(id))
    }

    pub fn tables_of(&self, event_id: Ulid) -> impl Iterator<Item = &EventTable> {
        self.children_of(event_id).filter_map(move |id| self.tables.get(id))
    }

    pub fn invites_of(&self, event_id: Ulid) -> impl Iterator<Item = &Invite> {
        self.children_of(event_id).filter_map(move |id| self.invites.get(id))
    }

    pub fn providers_of(&self, event_id: Ulid) -> impl Iterator<Item = &Provider> {
        self.children_of(event_id).filter_map(move |id| self.providers.get(id))
    }

    pub fn invites_at_table(&self, table_id: Ulid) -> impl Iterator<Item = &Invite> {
        let event_id = self.tables.get(&table_id).map(|t| t.event_id);
        event_id
            .into_iter()
            .flat_map(move |event_id| self.invites_of(event_id))
            .filter(move |invite| invite.table_id == Some(table_id))
    }

    /// Party sizes seated at a table, optionally leaving one invite out.
    pub fn seated_at(&self, table_id: Ulid, exclude: Option<Ulid>) -> u32 {
        self.invites_at_table(table_id)
            .filter(|invite| Some(invite.id) != exclude)
            .fold(0u32, |acc, invite| acc.saturating_add(invite.personnes))
    }

    /// Provider amounts committed against an event, optionally leaving one provider out.
    pub fn committed_spend(&self, event_id: Ulid, exclude: Option<Ulid>) -> u64 {
        self.providers_of(event_id)
            .filter(|provider| Some(provider.id) != exclude)
            .fold(0u64, |acc, provider| acc.saturating_add(provider.amount))
    }

    /// Events a staff member works on, directly or through one of the event's tasks.
    pub fn events_for_staff(&self, staff_id: Ulid) -> impl Iterator<Item = &Event> {
        let mut ids: BTreeSet<Ulid> = self
            .events
            .values()
            .filter(|event| event.staff.contains(&staff_id))
            .map(|event| event.id)
            .collect();
        ids.extend(
            self.tasks
                .values()
                .filter(|task| task.staff.contains(&staff_id))
                .map(|task| task.event_id),
        );
        ids.into_iter().filter_map(move |id| self.events.get(&id))
    }

    /// Staff linked to an event, directly or through its tasks.
    pub fn staff_of(&self, event_id: Ulid) -> BTreeSet<Ulid> {
        let mut staff = self
            .events
            .get(&event_id)
            .map(|event| event.staff.clone())
            .unwrap_or_default();
        for task in self.tasks_of(event_id) {
            staff.extend(task.staff.iter().copied());
        }
        staff
    }

    /// Records that rebuild the current state from an empty store.
    pub fn snapshot(&self) -> Vec<Record> {
        fn sorted<T: Clone>(rows: &HashMap<Ulid, T>) -> Vec<T> {
            let mut ids: Vec<&Ulid> = rows.keys().collect();
            ids.sort();
            ids.into_iter().map(|id| rows[id].clone()).collect()
        }

        let mut records = Vec::new();
        records.extend(sorted(&self.venues).into_iter().map(Record::VenueSaved));
        records.extend(sorted(&self.staff).into_iter().map(Record::StaffSaved));
        records.extend(sorted(&self.events).into_iter().map(Record::EventSaved));
        records.extend(sorted(&self.tasks).into_iter().map(Record::TaskSaved));
        records.extend(sorted(&self.tables).into_iter().map(Record::TableSaved));
        records.extend(sorted(&self.invites).into_iter().map(Record::InviteSaved));
        records.extend(sorted(&self.providers).into_iter().map(Record::ProviderSaved));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(venue_id: Option<Ulid>) -> Event {
        Event {
            id: Ulid::new(),
            company: "acme".into(),
            venue_id,
            title: "Launch".into(),
            date: NaiveDate::from_ymd_opt(2026, 5, 20).unwrap(),
            start: None,
            end: None,
            guests: 0,
            budget: Budget::default(),
            status: EventStatus::Pending,
            kind: None,
            area: None,
            folder: None,
            staff: BTreeSet::new(),
        }
    }

    fn invite(event_id: Ulid, table_id: Option<Ulid>, personnes: u32) -> Invite {
        Invite {
            id: Ulid::new(),
            event_id,
            table_id,
            name: "guest".into(),
            personnes,
            status: InviteStatus::Accepted,
            present: false,
        }
    }

    #[test]
    fn venue_index_follows_moves() {
        let mut store = Store::new();
        let (a, b) = (Ulid::new(), Ulid::new());
        let mut e = event(Some(a));
        store.apply(&Record::EventSaved(e.clone()));
        assert_eq!(store.events_at_venue(a).count(), 1);

        e.venue_id = Some(b);
        store.apply(&Record::EventSaved(e.clone()));
        assert_eq!(store.events_at_venue(a).count(), 0);
        assert_eq!(store.events_at_venue(b).count(), 1);

        store.apply(&Record::EventDeleted { id: e.id });
        assert_eq!(store.events_at_venue(b).count(), 0);
    }

    #[test]
    fn revert_restores_prior_rows_and_indexes() {
        let mut store = Store::new();
        let venue_id = Ulid::new();
        let e = event(Some(venue_id));
        store.apply(&Record::EventSaved(e.clone()));

        let undo_status = store.apply(&Record::EventStatusChanged {
            id: e.id,
            status: EventStatus::Failed,
        });
        let undo_delete = store.apply(&Record::EventDeleted { id: e.id });
        assert!(store.events.is_empty());

        store.revert(undo_delete);
        store.revert(undo_status);
        assert_eq!(store.events.get(&e.id), Some(&e));
        assert_eq!(store.events_at_venue(venue_id).count(), 1);
    }

    #[test]
    fn seating_sums_and_exclusions() {
        let mut store = Store::new();
        let e = event(None);
        let table = EventTable {
            id: Ulid::new(),
            event_id: e.id,
            name: "T1".into(),
            capacity: 10,
            status: TableStatus::Waiting,
        };
        store.apply(&Record::EventSaved(e.clone()));
        store.apply(&Record::TableSaved(table.clone()));
        let first = invite(e.id, Some(table.id), 5);
        store.apply(&Record::InviteSaved(first.clone()));
        store.apply(&Record::InviteSaved(invite(e.id, Some(table.id), 3)));
        store.apply(&Record::InviteSaved(invite(e.id, None, 4)));

        assert_eq!(store.seated_at(table.id, None), 8);
        assert_eq!(store.seated_at(table.id, Some(first.id)), 3);
        assert_eq!(store.invites_of(e.id).count(), 3);
    }

    #[test]
    fn staff_linked_through_tasks() {
        let mut store = Store::new();
        let (direct, via_task) = (Ulid::new(), Ulid::new());
        let mut e = event(None);
        e.staff.insert(direct);
        store.apply(&Record::EventSaved(e.clone()));
        store.apply(&Record::TaskSaved(Task {
            id: Ulid::new(),
            event_id: e.id,
            title: "Decor".into(),
            done: false,
            staff: [via_task].into_iter().collect(),
        }));

        assert_eq!(store.staff_of(e.id), [direct, via_task].into_iter().collect());
        assert_eq!(store.events_for_staff(via_task).count(), 1);
        assert_eq!(store.events_for_staff(Ulid::new()).count(), 0);
    }

    #[test]
    fn snapshot_rebuilds_state() {
        let mut store = Store::new();
        let e = event(None);
        store.apply(&Record::EventSaved(e.clone()));
        store.apply(&Record::ProviderSaved(Provider {
            id: Ulid::new(),
            event_id: e.id,
            name: "Catering".into(),
            amount: 4_000,
            advance: 1_000,
        }));

        let mut rebuilt = Store::new();
        for record in store.snapshot() {
            rebuilt.apply(&record);
        }
        assert_eq!(rebuilt.events, store.events);
        assert_eq!(rebuilt.committed_spend(e.id, None), 4_000);
    }
}
