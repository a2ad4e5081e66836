use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::conflict::find_booking_conflict;
use super::guards::check_budget;
use super::store::Store;
use super::{Engine, EngineError, Impact, Txn};

// ── Field checks ─────────────────────────────────────────

pub(super) fn check_name(field: &'static str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::invalid(field, "must not be empty"));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("name too long"));
    }
    Ok(())
}

fn check_metadata(value: Option<&str>) -> Result<(), EngineError> {
    if value.is_some_and(|v| v.len() > MAX_METADATA_LEN) {
        return Err(EngineError::LimitExceeded("metadata too long"));
    }
    Ok(())
}

fn check_budget_text(budget: &Budget) -> Result<(), EngineError> {
    if budget.as_str().len() > MAX_BUDGET_LEN {
        return Err(EngineError::LimitExceeded("budget too long"));
    }
    Ok(())
}

fn check_authored_status(status: EventStatus) -> Result<(), EngineError> {
    if !status.is_explicit() {
        return Err(EngineError::invalid(
            "status",
            format!("{status} is derived from the clock and cannot be set"),
        ));
    }
    Ok(())
}

/// Reject an event write whose venue slot is already claimed.
fn admit_booking(store: &Store, event: &Event) -> Result<(), EngineError> {
    let Some(venue_id) = event.venue_id else {
        return Ok(());
    };
    if event.status.is_settled() {
        return Ok(());
    }
    if let Some(other) =
        find_booking_conflict(store, venue_id, event.date, &event.window(), Some(event.id))
    {
        metrics::counter!(observability::ADMISSION_REJECTED_TOTAL, "reason" => "conflict")
            .increment(1);
        return Err(EngineError::Conflict {
            venue_id,
            date: event.date,
            event_id: other,
        });
    }
    Ok(())
}

/// Whether an update moves, reshapes or re-claims the event's venue slot.
fn touches_slot(current: &Event, next: &Event) -> bool {
    current.venue_id != next.venue_id
        || current.date != next.date
        || current.window() != next.window()
        || current.status != next.status
}

impl Engine {
    // ── Events ───────────────────────────────────────────

    pub async fn create_event(&self, draft: EventDraft) -> Result<Event, EngineError> {
        self.check_scope(draft.company.as_deref())?;
        check_name("title", &draft.title)?;
        for meta in [&draft.kind, &draft.area, &draft.folder] {
            check_metadata(meta.as_deref())?;
        }
        check_budget_text(&draft.budget)?;
        if draft.staff.len() > MAX_STAFF_PER_ASSIGNMENT {
            return Err(EngineError::LimitExceeded("too many staff on event"));
        }
        let status = draft.status.unwrap_or(EventStatus::Pending);
        check_authored_status(status)?;

        let mut guard = self.state.write().await;
        if guard.events.len() >= MAX_EVENTS_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many events"));
        }
        if guard.events.contains_key(&draft.id) {
            return Err(EngineError::AlreadyExists(draft.id));
        }
        if let Some(venue_id) = draft.venue_id
            && !guard.venues.contains_key(&venue_id)
        {
            return Err(EngineError::NotFound(venue_id));
        }
        if let Some(missing) = draft.staff.iter().find(|s| !guard.staff.contains_key(*s)) {
            return Err(EngineError::NotFound(*missing));
        }

        let event = Event {
            id: draft.id,
            company: self.tenant.clone(),
            venue_id: draft.venue_id,
            title: draft.title,
            date: draft.date,
            start: draft.start,
            end: draft.end,
            guests: draft.guests,
            budget: draft.budget,
            status,
            kind: draft.kind,
            area: draft.area,
            folder: draft.folder,
            staff: draft.staff,
        };
        admit_booking(&guard, &event)?;

        let now = self.now();
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::EventSaved(event.clone()));
        let impact = Impact::of_event(txn.store(), event.id);
        self.on_event_changed(&mut txn, impact, now);
        self.commit(txn).await?;

        info!("event {} created on {} ({})", event.id, event.date, event.status);
        Ok(event)
    }

    pub async fn update_event(&self, id: Ulid, patch: EventPatch) -> Result<Event, EngineError> {
        self.check_scope(patch.company.as_deref())?;
        if let Some(title) = &patch.title {
            check_name("title", title)?;
        }
        for meta in [&patch.kind, &patch.area, &patch.folder].into_iter().flatten() {
            check_metadata(meta.as_deref())?;
        }
        if let Some(budget) = &patch.budget {
            check_budget_text(budget)?;
        }
        if let Some(status) = patch.status {
            check_authored_status(status)?;
        }

        let mut guard = self.state.write().await;
        let current = guard.events.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        let mut next = current.clone();
        if let Some(venue_id) = patch.venue_id {
            next.venue_id = venue_id;
        }
        if let Some(title) = patch.title {
            next.title = title;
        }
        if let Some(date) = patch.date {
            next.date = date;
        }
        if let Some(start) = patch.start {
            next.start = start;
        }
        if let Some(end) = patch.end {
            next.end = end;
        }
        if let Some(guests) = patch.guests {
            next.guests = guests;
        }
        if let Some(budget) = patch.budget {
            next.budget = budget;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(kind) = patch.kind {
            next.kind = kind;
        }
        if let Some(area) = patch.area {
            next.area = area;
        }
        if let Some(folder) = patch.folder {
            next.folder = folder;
        }
        if next == current {
            return Ok(current);
        }

        if next.venue_id != current.venue_id
            && let Some(venue_id) = next.venue_id
            && !guard.venues.contains_key(&venue_id)
        {
            return Err(EngineError::NotFound(venue_id));
        }
        if touches_slot(&current, &next) {
            admit_booking(&guard, &next)?;
        }
        if next.budget != current.budget {
            check_budget(id, &next.budget, guard.committed_spend(id, None))?;
        }

        let now = self.now();
        let mut txn = Txn::new(&mut guard);
        let mut impact = Impact::of_event(txn.store(), id);
        txn.push(Record::EventSaved(next.clone()));
        impact.merge(Impact::of_event(txn.store(), id));
        self.on_event_changed(&mut txn, impact, now);
        self.commit(txn).await?;

        info!("event {id} updated ({})", next.status);
        Ok(next)
    }

    /// Delete an event with its tasks, tables, invites and providers.
    pub async fn delete_event(&self, id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.state.write().await;
        if !guard.events.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }

        let now = self.now();
        let mut txn = Txn::new(&mut guard);
        let impact = Impact::of_event(txn.store(), id);
        let store = txn.store();
        let mut cascade: Vec<Record> = store
            .providers_of(id)
            .map(|p| Record::ProviderDeleted { id: p.id, event_id: id })
            .collect();
        cascade.extend(store.invites_of(id).map(|i| Record::InviteDeleted { id: i.id, event_id: id }));
        cascade.extend(store.tables_of(id).map(|t| Record::TableDeleted { id: t.id, event_id: id }));
        cascade.extend(store.tasks_of(id).map(|t| Record::TaskDeleted { id: t.id, event_id: id }));
        for record in cascade {
            txn.push(record);
        }
        txn.push(Record::EventDeleted { id });
        self.on_event_changed(&mut txn, impact, now);
        self.commit(txn).await?;
        self.notify.remove(&id);

        info!("event {id} deleted");
        Ok(())
    }

    pub async fn assign_staff(&self, event_id: Ulid, staff_id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.state.write().await;
        let event = guard.events.get(&event_id).ok_or(EngineError::NotFound(event_id))?;
        if !guard.staff.contains_key(&staff_id) {
            return Err(EngineError::NotFound(staff_id));
        }
        if event.staff.contains(&staff_id) {
            return Ok(());
        }
        if event.staff.len() >= MAX_STAFF_PER_ASSIGNMENT {
            return Err(EngineError::LimitExceeded("too many staff on event"));
        }
        let mut next = event.clone();
        next.staff.insert(staff_id);

        let now = self.now();
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::EventSaved(next));
        self.on_event_changed(&mut txn, Impact::staff([staff_id]), now);
        self.commit(txn).await?;
        info!("staff {staff_id} assigned to event {event_id}");
        Ok(())
    }

    pub async fn unassign_staff(&self, event_id: Ulid, staff_id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.state.write().await;
        let event = guard.events.get(&event_id).ok_or(EngineError::NotFound(event_id))?;
        if !event.staff.contains(&staff_id) {
            return Err(EngineError::NotFound(staff_id));
        }
        let mut next = event.clone();
        next.staff.remove(&staff_id);

        let now = self.now();
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::EventSaved(next));
        self.on_event_changed(&mut txn, Impact::staff([staff_id]), now);
        self.commit(txn).await?;
        info!("staff {staff_id} unassigned from event {event_id}");
        Ok(())
    }

    // ── Venues ───────────────────────────────────────────

    pub async fn create_venue(&self, draft: VenueDraft) -> Result<Venue, EngineError> {
        self.check_scope(draft.company.as_deref())?;
        check_name("name", &draft.name)?;

        let mut guard = self.state.write().await;
        if guard.venues.len() >= MAX_VENUES_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many venues"));
        }
        if guard.venues.contains_key(&draft.id) {
            return Err(EngineError::AlreadyExists(draft.id));
        }
        let venue = Venue {
            id: draft.id,
            company: self.tenant.clone(),
            name: draft.name,
            capacity: draft.capacity,
            status: VenueStatus::Empty,
        };
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::VenueSaved(venue.clone()));
        self.commit(txn).await?;
        info!("venue {} created", venue.id);
        Ok(venue)
    }

    /// Name and capacity only; the status stays a projection.
    pub async fn update_venue(&self, id: Ulid, patch: VenuePatch) -> Result<Venue, EngineError> {
        self.check_scope(patch.company.as_deref())?;
        if let Some(name) = &patch.name {
            check_name("name", name)?;
        }
        let mut guard = self.state.write().await;
        let mut venue = guard.venues.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        if let Some(name) = patch.name {
            venue.name = name;
        }
        if let Some(capacity) = patch.capacity {
            venue.capacity = capacity;
        }
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::VenueSaved(venue.clone()));
        self.commit(txn).await?;
        Ok(venue)
    }

    /// Rejected with `InUse` while any event still references the venue.
    pub async fn delete_venue(&self, id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.state.write().await;
        if !guard.venues.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }
        if guard.events_at_venue(id).next().is_some() {
            return Err(EngineError::InUse(id));
        }
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::VenueDeleted { id });
        self.commit(txn).await?;
        self.notify.remove(&id);
        info!("venue {id} deleted");
        Ok(())
    }

    // ── Staff ────────────────────────────────────────────

    pub async fn create_staff(&self, draft: StaffDraft) -> Result<Staff, EngineError> {
        self.check_scope(draft.company.as_deref())?;
        check_name("name", &draft.name)?;
        if let Some(role) = &draft.role {
            check_name("role", role)?;
        }

        let mut guard = self.state.write().await;
        if guard.staff.len() >= MAX_STAFF_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many staff"));
        }
        if guard.staff.contains_key(&draft.id) {
            return Err(EngineError::AlreadyExists(draft.id));
        }
        let staff = Staff {
            id: draft.id,
            company: self.tenant.clone(),
            name: draft.name,
            role: draft.role,
            status: StaffStatus::Inactive,
        };
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::StaffSaved(staff.clone()));
        self.commit(txn).await?;
        info!("staff {} created", staff.id);
        Ok(staff)
    }

    /// Name and role only; the status stays a projection.
    pub async fn update_staff(&self, id: Ulid, patch: StaffPatch) -> Result<Staff, EngineError> {
        self.check_scope(patch.company.as_deref())?;
        if let Some(name) = &patch.name {
            check_name("name", name)?;
        }
        if let Some(Some(role)) = &patch.role {
            check_name("role", role)?;
        }
        let mut guard = self.state.write().await;
        let mut staff = guard.staff.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        if let Some(name) = patch.name {
            staff.name = name;
        }
        if let Some(role) = patch.role {
            staff.role = role;
        }
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::StaffSaved(staff.clone()));
        self.commit(txn).await?;
        Ok(staff)
    }

    /// Deletes the staff member and every assignment row naming them.
    pub async fn delete_staff(&self, id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.state.write().await;
        if !guard.staff.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }
        let mut released: Vec<Record> = guard
            .events
            .values()
            .filter(|event| event.staff.contains(&id))
            .map(|event| {
                let mut event = event.clone();
                event.staff.remove(&id);
                Record::EventSaved(event)
            })
            .collect();
        released.extend(guard.tasks.values().filter(|task| task.staff.contains(&id)).map(|task| {
            let mut task = task.clone();
            task.staff.remove(&id);
            Record::TaskSaved(task)
        }));

        let mut txn = Txn::new(&mut guard);
        for record in released {
            txn.push(record);
        }
        txn.push(Record::StaffDeleted { id });
        self.commit(txn).await?;
        self.notify.remove(&id);
        info!("staff {id} deleted");
        Ok(())
    }
}
