mod children;
mod conflict;
mod error;
mod guards;
mod maintenance;
mod mutations;
pub mod projection;
mod queries;
mod store;
pub mod sweep;

pub use conflict::window_conflicts;
pub use error::EngineError;
pub use maintenance::ReconcileReport;
pub use store::Store;

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::debug;
use ulid::Ulid;

use crate::clock::Clock;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::observability;
use crate::wal::Wal;

use store::Undo;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        txn: Vec<Record>,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        snapshot: Vec<Record>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type Pending = (Vec<Record>, oneshot::Sender<io::Result<()>>);

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Drain every Append already queued behind it.
/// 3. One flush_sync for the whole batch, then answer every sender.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { txn, response } => {
                let mut batch = vec![(txn, response)];
                let mut deferred = None;
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { txn, response }) => batch.push((txn, response)),
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }
                commit_batch(&mut wal, &mut batch);
                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<Pending>) {
    metrics::histogram!(observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[Pending]) -> io::Result<()> {
    let mut append_err = None;
    for (txn, _) in batch {
        if let Err(e) = wal.append_buffered(txn) {
            append_err = Some(e);
            break;
        }
    }
    // Flush even after a failed append so no buffered bytes leak into the next batch.
    let flush_err = wal.flush_sync().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { snapshot, response } => {
            let result = Wal::write_compact_file(wal.path(), &snapshot)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { txn, response } => {
            let mut batch = vec![(txn, response)];
            commit_batch(wal, &mut batch);
        }
    }
}

// ── Transactions ─────────────────────────────────────────

/// Records applied to the store but not yet durable.
///
/// Each `push` applies its record immediately, so later reads inside the
/// same transaction see it. [`Engine::commit`] makes the whole set durable
/// as one WAL entry or reverts every row.
pub(crate) struct Txn<'a> {
    store: &'a mut Store,
    records: Vec<Record>,
    undo: Vec<Undo>,
}

impl<'a> Txn<'a> {
    pub(crate) fn new(store: &'a mut Store) -> Self {
        Self {
            store,
            records: Vec::new(),
            undo: Vec::new(),
        }
    }

    pub(crate) fn store(&self) -> &Store {
        self.store
    }

    pub(crate) fn push(&mut self, record: Record) {
        self.undo.push(self.store.apply(&record));
        self.records.push(record);
    }

    fn rollback(self) {
        for undo in self.undo.into_iter().rev() {
            self.store.revert(undo);
        }
    }
}

/// Venues and staff whose projections an event change may move.
#[derive(Debug, Default)]
pub(crate) struct Impact {
    venues: BTreeSet<Ulid>,
    staff: BTreeSet<Ulid>,
}

impl Impact {
    /// Venue and linked staff of an event as it currently stands in `store`.
    pub(crate) fn of_event(store: &Store, event_id: Ulid) -> Self {
        Self {
            venues: store
                .events
                .get(&event_id)
                .and_then(|event| event.venue_id)
                .into_iter()
                .collect(),
            staff: store.staff_of(event_id),
        }
    }

    pub(crate) fn staff(ids: impl IntoIterator<Item = Ulid>) -> Self {
        Self {
            venues: BTreeSet::new(),
            staff: ids.into_iter().collect(),
        }
    }

    pub(crate) fn merge(&mut self, other: Impact) {
        self.venues.extend(other.venues);
        self.staff.extend(other.staff);
    }
}

/// One tenant's rows, WAL and change feed.
pub struct Engine {
    tenant: String,
    pub(super) state: RwLock<Store>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    clock: Arc<dyn Clock>,
}

impl Engine {
    /// Replay `wal_path` and start the group-commit writer.
    pub fn new(
        tenant: impl Into<String>,
        wal_path: PathBuf,
        notify: Arc<NotifyHub>,
        clock: Arc<dyn Clock>,
    ) -> io::Result<Self> {
        let txns = Wal::recover(&wal_path)?;
        let mut store = Store::new();
        for record in txns.iter().flatten() {
            store.apply(record);
        }
        let tenant = tenant.into();
        debug!(
            "tenant {tenant}: replayed {} transactions ({} events)",
            txns.len(),
            store.events.len()
        );

        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        Ok(Self {
            tenant,
            state: RwLock::new(store),
            wal_tx,
            notify,
            clock,
        })
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub(super) fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// A payload or filter may name a company, but only this engine's own.
    pub(super) fn check_scope(&self, company: Option<&str>) -> Result<(), EngineError> {
        match company {
            Some(requested) if requested != self.tenant => Err(EngineError::Scope {
                tenant: self.tenant.clone(),
                requested: requested.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Make a transaction durable, then publish its records.
    /// A failed append reverts every row the transaction touched.
    pub(super) async fn commit(&self, txn: Txn<'_>) -> Result<(), EngineError> {
        if txn.records.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.wal_append(txn.records.clone()).await {
            txn.rollback();
            return Err(e);
        }
        for record in &txn.records {
            self.notify.send(record);
        }
        Ok(())
    }

    /// Write one transaction via the background group-commit writer.
    async fn wal_append(&self, txn: Vec<Record>) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append { txn, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    // ── Projectors ───────────────────────────────────────

    /// Cascade an event change into every venue and staff projection it touched.
    pub(super) fn on_event_changed(&self, txn: &mut Txn<'_>, impact: Impact, now: NaiveDateTime) {
        for venue_id in impact.venues {
            self.project_venue(txn, venue_id, now);
        }
        for staff_id in impact.staff {
            self.project_staff(txn, staff_id, now);
        }
    }

    /// Returns whether the venue's status moved.
    pub(super) fn project_venue(&self, txn: &mut Txn<'_>, id: Ulid, now: NaiveDateTime) -> bool {
        let store = txn.store();
        let Some(current) = store.venues.get(&id).map(|venue| venue.status) else {
            debug!("venue {id} vanished, projection skipped");
            return false;
        };
        let next = projection::venue_status(store.events_at_venue(id), now);
        if next == current {
            return false;
        }
        debug!("venue {id}: {current} -> {next}");
        metrics::counter!(observability::PROJECTION_UPDATES_TOTAL, "kind" => "venue").increment(1);
        txn.push(Record::VenueStatusProjected { id, status: next });
        true
    }

    pub(super) fn project_staff(&self, txn: &mut Txn<'_>, id: Ulid, now: NaiveDateTime) -> bool {
        let store = txn.store();
        let Some(current) = store.staff.get(&id).map(|staff| staff.status) else {
            debug!("staff {id} vanished, projection skipped");
            return false;
        };
        let next = projection::staff_status(store.events_for_staff(id), now);
        if next == current {
            return false;
        }
        debug!("staff {id}: {current} -> {next}");
        metrics::counter!(observability::PROJECTION_UPDATES_TOTAL, "kind" => "staff").increment(1);
        txn.push(Record::StaffStatusProjected { id, status: next });
        true
    }

    pub(super) fn project_table(&self, txn: &mut Txn<'_>, id: Ulid) -> bool {
        let store = txn.store();
        let Some(table) = store.tables.get(&id) else {
            debug!("table {id} vanished, projection skipped");
            return false;
        };
        let (event_id, current) = (table.event_id, table.status);
        let next = projection::table_status(table.capacity, store.seated_at(id, None));
        if next == current {
            return false;
        }
        debug!("table {id}: {current} -> {next}");
        metrics::counter!(observability::PROJECTION_UPDATES_TOTAL, "kind" => "table").increment(1);
        txn.push(Record::TableStatusProjected { id, event_id, status: next });
        true
    }
}
