use chrono::NaiveDateTime;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::model::*;
use crate::observability;

use super::sweep;
use super::{Engine, EngineError, Impact, Txn};

fn sorted_by_id<T>(rows: impl Iterator<Item = T>, id: impl Fn(&T) -> Ulid) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by_key(|row| id(row));
    rows
}

impl Engine {
    /// Events matching `filter`, ordered by date, start time, then id.
    ///
    /// Every selected row is swept against the clock first and any status
    /// change is persisted before the rows are returned. `filter.status`
    /// applies to the swept status.
    pub async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, EngineError> {
        self.check_scope(filter.company.as_deref())?;
        let now = self.now();

        let stale: Vec<Ulid> = {
            let guard = self.state.read().await;
            guard
                .events
                .values()
                .filter(|event| filter.selects(event) && sweep::transition(event, now).is_some())
                .map(|event| event.id)
                .collect()
        };
        if !stale.is_empty() {
            self.sweep_events(&stale, now).await;
        }

        let guard = self.state.read().await;
        let mut events: Vec<Event> = guard
            .events
            .values()
            .filter(|event| filter.selects(event))
            .filter(|event| filter.status.is_none_or(|status| event.status == status))
            .cloned()
            .collect();
        events.sort_by(|a, b| (a.date, a.start, a.id).cmp(&(b.date, b.start, b.id)));
        Ok(events)
    }

    pub async fn get_event(&self, id: Ulid) -> Result<Event, EngineError> {
        let filter = EventFilter {
            id: Some(id),
            ..Default::default()
        };
        self.list_events(&filter)
            .await?
            .into_iter()
            .next()
            .ok_or(EngineError::NotFound(id))
    }

    /// Persist due status transitions, one transaction per event.
    /// A failed row is logged and left for the next read.
    pub(super) async fn sweep_events(&self, ids: &[Ulid], now: NaiveDateTime) -> usize {
        let mut guard = self.state.write().await;
        let mut swept = 0;
        for &id in ids {
            // Another reader may have swept it while we waited for the guard.
            let Some(next) = guard.events.get(&id).and_then(|event| sweep::transition(event, now))
            else {
                continue;
            };
            let mut txn = Txn::new(&mut guard);
            let impact = Impact::of_event(txn.store(), id);
            txn.push(Record::EventStatusChanged { id, status: next });
            self.on_event_changed(&mut txn, impact, now);
            match self.commit(txn).await {
                Ok(()) => {
                    swept += 1;
                    debug!("event {id} swept to {next}");
                    metrics::counter!(observability::SWEEP_TRANSITIONS_TOTAL, "status" => next.as_str())
                        .increment(1);
                }
                Err(e) => warn!("sweep of event {id} failed: {e}"),
            }
        }
        swept
    }

    // ── Plain reads ──────────────────────────────────────

    pub async fn get_venue(&self, id: Ulid) -> Result<Venue, EngineError> {
        let guard = self.state.read().await;
        guard.venues.get(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    pub async fn list_venues(&self) -> Vec<Venue> {
        let guard = self.state.read().await;
        sorted_by_id(guard.venues.values().cloned(), |v| v.id)
    }

    pub async fn get_staff(&self, id: Ulid) -> Result<Staff, EngineError> {
        let guard = self.state.read().await;
        guard.staff.get(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    pub async fn list_staff(&self) -> Vec<Staff> {
        let guard = self.state.read().await;
        sorted_by_id(guard.staff.values().cloned(), |s| s.id)
    }

    /// `None` lists rows of every event.
    pub async fn list_tasks(&self, event_id: Option<Ulid>) -> Vec<Task> {
        let guard = self.state.read().await;
        match event_id {
            Some(event_id) => sorted_by_id(guard.tasks_of(event_id).cloned(), |t| t.id),
            None => sorted_by_id(guard.tasks.values().cloned(), |t| t.id),
        }
    }

    pub async fn list_tables(&self, event_id: Option<Ulid>) -> Vec<EventTable> {
        let guard = self.state.read().await;
        match event_id {
            Some(event_id) => sorted_by_id(guard.tables_of(event_id).cloned(), |t| t.id),
            None => sorted_by_id(guard.tables.values().cloned(), |t| t.id),
        }
    }

    pub async fn list_invites(&self, event_id: Option<Ulid>) -> Vec<Invite> {
        let guard = self.state.read().await;
        match event_id {
            Some(event_id) => sorted_by_id(guard.invites_of(event_id).cloned(), |i| i.id),
            None => sorted_by_id(guard.invites.values().cloned(), |i| i.id),
        }
    }

    pub async fn list_providers(&self, event_id: Option<Ulid>) -> Vec<Provider> {
        let guard = self.state.read().await;
        match event_id {
            Some(event_id) => sorted_by_id(guard.providers_of(event_id).cloned(), |p| p.id),
            None => sorted_by_id(guard.providers.values().cloned(), |p| p.id),
        }
    }
}
