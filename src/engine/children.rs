use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::guards::{check_budget, check_seating};
use super::mutations::check_name;
use super::store::Store;
use super::{Engine, EngineError, Impact, Txn};

/// The table an invite wants to sit at; it must belong to the invite's event.
fn seating_table(store: &Store, table_id: Ulid, event_id: Ulid) -> Result<&EventTable, EngineError> {
    let table = store.tables.get(&table_id).ok_or(EngineError::NotFound(table_id))?;
    if table.event_id != event_id {
        return Err(EngineError::invalid("table_id", "table belongs to another event"));
    }
    Ok(table)
}

fn check_party_size(personnes: u32) -> Result<(), EngineError> {
    if personnes == 0 {
        return Err(EngineError::invalid("personnes", "party size must be at least 1"));
    }
    if personnes > MAX_PARTY_SIZE {
        return Err(EngineError::LimitExceeded("party too large"));
    }
    Ok(())
}

fn check_advance(amount: u64, advance: u64) -> Result<(), EngineError> {
    if advance > amount {
        return Err(EngineError::invalid("advance", format!("{advance} exceeds amount {amount}")));
    }
    Ok(())
}

fn check_child_room(count: usize, what: &'static str) -> Result<(), EngineError> {
    if count >= MAX_CHILDREN_PER_EVENT {
        return Err(EngineError::LimitExceeded(what));
    }
    Ok(())
}

impl Engine {
    // ── Tasks ────────────────────────────────────────────

    pub async fn create_task(&self, draft: TaskDraft) -> Result<Task, EngineError> {
        check_name("title", &draft.title)?;
        if draft.staff.len() > MAX_STAFF_PER_ASSIGNMENT {
            return Err(EngineError::LimitExceeded("too many staff on task"));
        }
        let mut guard = self.state.write().await;
        if !guard.events.contains_key(&draft.event_id) {
            return Err(EngineError::NotFound(draft.event_id));
        }
        if guard.tasks.contains_key(&draft.id) {
            return Err(EngineError::AlreadyExists(draft.id));
        }
        check_child_room(guard.tasks_of(draft.event_id).count(), "too many tasks on event")?;
        if let Some(missing) = draft.staff.iter().find(|s| !guard.staff.contains_key(*s)) {
            return Err(EngineError::NotFound(*missing));
        }

        let task = Task {
            id: draft.id,
            event_id: draft.event_id,
            title: draft.title,
            done: draft.done,
            staff: draft.staff,
        };
        let now = self.now();
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::TaskSaved(task.clone()));
        self.on_event_changed(&mut txn, Impact::staff(task.staff.iter().copied()), now);
        self.commit(txn).await?;
        info!("task {} created on event {}", task.id, task.event_id);
        Ok(task)
    }

    pub async fn update_task(&self, id: Ulid, patch: TaskPatch) -> Result<Task, EngineError> {
        if let Some(title) = &patch.title {
            check_name("title", title)?;
        }
        let mut guard = self.state.write().await;
        let mut task = guard.tasks.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(done) = patch.done {
            task.done = done;
        }
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::TaskSaved(task.clone()));
        self.commit(txn).await?;
        Ok(task)
    }

    pub async fn delete_task(&self, id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.state.write().await;
        let task = guard.tasks.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        let now = self.now();
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::TaskDeleted { id, event_id: task.event_id });
        self.on_event_changed(&mut txn, Impact::staff(task.staff), now);
        self.commit(txn).await?;
        info!("task {id} deleted");
        Ok(())
    }

    pub async fn assign_task_staff(&self, task_id: Ulid, staff_id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.state.write().await;
        let mut task = guard.tasks.get(&task_id).cloned().ok_or(EngineError::NotFound(task_id))?;
        if !guard.staff.contains_key(&staff_id) {
            return Err(EngineError::NotFound(staff_id));
        }
        if task.staff.len() >= MAX_STAFF_PER_ASSIGNMENT {
            return Err(EngineError::LimitExceeded("too many staff on task"));
        }
        if !task.staff.insert(staff_id) {
            return Ok(());
        }
        let now = self.now();
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::TaskSaved(task));
        self.on_event_changed(&mut txn, Impact::staff([staff_id]), now);
        self.commit(txn).await
    }

    pub async fn unassign_task_staff(&self, task_id: Ulid, staff_id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.state.write().await;
        let mut task = guard.tasks.get(&task_id).cloned().ok_or(EngineError::NotFound(task_id))?;
        if !task.staff.remove(&staff_id) {
            return Err(EngineError::NotFound(staff_id));
        }
        let now = self.now();
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::TaskSaved(task));
        self.on_event_changed(&mut txn, Impact::staff([staff_id]), now);
        self.commit(txn).await
    }

    // ── Tables ───────────────────────────────────────────

    pub async fn create_table(&self, draft: TableDraft) -> Result<EventTable, EngineError> {
        check_name("name", &draft.name)?;
        let mut guard = self.state.write().await;
        if !guard.events.contains_key(&draft.event_id) {
            return Err(EngineError::NotFound(draft.event_id));
        }
        if guard.tables.contains_key(&draft.id) {
            return Err(EngineError::AlreadyExists(draft.id));
        }
        check_child_room(guard.tables_of(draft.event_id).count(), "too many tables on event")?;

        let table = EventTable {
            id: draft.id,
            event_id: draft.event_id,
            name: draft.name,
            capacity: draft.capacity,
            status: TableStatus::Waiting,
        };
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::TableSaved(table.clone()));
        self.commit(txn).await?;
        Ok(table)
    }

    /// A capacity below the guests already seated is a `Capacity` error.
    pub async fn update_table(&self, id: Ulid, patch: TablePatch) -> Result<EventTable, EngineError> {
        if let Some(name) = &patch.name {
            check_name("name", name)?;
        }
        let mut guard = self.state.write().await;
        let mut table = guard.tables.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        let seated = guard.seated_at(id, None);
        if let Some(name) = patch.name {
            table.name = name;
        }
        if let Some(capacity) = patch.capacity {
            if capacity > 0 && seated > capacity {
                return Err(EngineError::Capacity {
                    table_id: id,
                    capacity,
                    seated,
                    requested: 0,
                });
            }
            table.capacity = capacity;
        }
        table.status = super::projection::table_status(table.capacity, seated);

        let mut txn = Txn::new(&mut guard);
        txn.push(Record::TableSaved(table.clone()));
        self.commit(txn).await?;
        Ok(table)
    }

    /// Deleting a table unseats its invites.
    pub async fn delete_table(&self, id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.state.write().await;
        let event_id = guard.tables.get(&id).map(|t| t.event_id).ok_or(EngineError::NotFound(id))?;
        let unseated: Vec<Invite> = guard
            .invites_at_table(id)
            .cloned()
            .map(|mut invite| {
                invite.table_id = None;
                invite
            })
            .collect();

        let mut txn = Txn::new(&mut guard);
        for invite in unseated {
            txn.push(Record::InviteSaved(invite));
        }
        txn.push(Record::TableDeleted { id, event_id });
        self.commit(txn).await?;
        info!("table {id} deleted");
        Ok(())
    }

    // ── Invites ──────────────────────────────────────────

    pub async fn create_invite(&self, draft: InviteDraft) -> Result<Invite, EngineError> {
        check_name("name", &draft.name)?;
        check_party_size(draft.personnes)?;
        let mut guard = self.state.write().await;
        if !guard.events.contains_key(&draft.event_id) {
            return Err(EngineError::NotFound(draft.event_id));
        }
        if guard.invites.contains_key(&draft.id) {
            return Err(EngineError::AlreadyExists(draft.id));
        }
        check_child_room(guard.invites_of(draft.event_id).count(), "too many invites on event")?;
        if let Some(table_id) = draft.table_id {
            let table = seating_table(&guard, table_id, draft.event_id)?;
            check_seating(table, guard.seated_at(table_id, None), draft.personnes)?;
        }

        let invite = Invite {
            id: draft.id,
            event_id: draft.event_id,
            table_id: draft.table_id,
            name: draft.name,
            personnes: draft.personnes,
            status: draft.status,
            present: draft.present,
        };
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::InviteSaved(invite.clone()));
        if let Some(table_id) = invite.table_id {
            self.project_table(&mut txn, table_id);
        }
        self.commit(txn).await?;
        Ok(invite)
    }

    pub async fn update_invite(&self, id: Ulid, patch: InvitePatch) -> Result<Invite, EngineError> {
        if let Some(name) = &patch.name {
            check_name("name", name)?;
        }
        if let Some(personnes) = patch.personnes {
            check_party_size(personnes)?;
        }
        let mut guard = self.state.write().await;
        let current = guard.invites.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        let mut next = current.clone();
        if let Some(table_id) = patch.table_id {
            next.table_id = table_id;
        }
        if let Some(name) = patch.name {
            next.name = name;
        }
        if let Some(personnes) = patch.personnes {
            next.personnes = personnes;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(present) = patch.present {
            next.present = present;
        }
        if let Some(table_id) = next.table_id {
            let table = seating_table(&guard, table_id, next.event_id)?;
            check_seating(table, guard.seated_at(table_id, Some(id)), next.personnes)?;
        }

        let mut txn = Txn::new(&mut guard);
        txn.push(Record::InviteSaved(next.clone()));
        if let Some(old) = current.table_id
            && current.table_id != next.table_id
        {
            self.project_table(&mut txn, old);
        }
        if let Some(table_id) = next.table_id {
            self.project_table(&mut txn, table_id);
        }
        self.commit(txn).await?;
        Ok(next)
    }

    pub async fn delete_invite(&self, id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.state.write().await;
        let invite = guard.invites.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::InviteDeleted { id, event_id: invite.event_id });
        if let Some(table_id) = invite.table_id {
            self.project_table(&mut txn, table_id);
        }
        self.commit(txn).await
    }

    // ── Providers ────────────────────────────────────────

    pub async fn create_provider(&self, draft: ProviderDraft) -> Result<Provider, EngineError> {
        check_name("name", &draft.name)?;
        check_advance(draft.amount, draft.advance)?;
        let mut guard = self.state.write().await;
        let event = guard.events.get(&draft.event_id).ok_or(EngineError::NotFound(draft.event_id))?;
        if guard.providers.contains_key(&draft.id) {
            return Err(EngineError::AlreadyExists(draft.id));
        }
        check_child_room(guard.providers_of(draft.event_id).count(), "too many providers on event")?;
        let total = guard.committed_spend(draft.event_id, None).saturating_add(draft.amount);
        check_budget(draft.event_id, &event.budget, total)?;

        let provider = Provider {
            id: draft.id,
            event_id: draft.event_id,
            name: draft.name,
            amount: draft.amount,
            advance: draft.advance,
        };
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::ProviderSaved(provider.clone()));
        self.commit(txn).await?;
        Ok(provider)
    }

    pub async fn update_provider(&self, id: Ulid, patch: ProviderPatch) -> Result<Provider, EngineError> {
        if let Some(name) = &patch.name {
            check_name("name", name)?;
        }
        let mut guard = self.state.write().await;
        let mut provider = guard.providers.get(&id).cloned().ok_or(EngineError::NotFound(id))?;
        if let Some(name) = patch.name {
            provider.name = name;
        }
        if let Some(amount) = patch.amount {
            provider.amount = amount;
        }
        if let Some(advance) = patch.advance {
            provider.advance = advance;
        }
        check_advance(provider.amount, provider.advance)?;

        let event = guard
            .events
            .get(&provider.event_id)
            .ok_or(EngineError::NotFound(provider.event_id))?;
        let total = guard
            .committed_spend(provider.event_id, Some(id))
            .saturating_add(provider.amount);
        check_budget(provider.event_id, &event.budget, total)?;

        let mut txn = Txn::new(&mut guard);
        txn.push(Record::ProviderSaved(provider.clone()));
        self.commit(txn).await?;
        Ok(provider)
    }

    pub async fn delete_provider(&self, id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.state.write().await;
        let event_id = guard
            .providers
            .get(&id)
            .map(|p| p.event_id)
            .ok_or(EngineError::NotFound(id))?;
        let mut txn = Txn::new(&mut guard);
        txn.push(Record::ProviderDeleted { id, event_id });
        self.commit(txn).await
    }
}
