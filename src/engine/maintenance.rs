use tokio::sync::oneshot;
use ulid::Ulid;

use crate::model::Record;

use super::sweep;
use super::{Engine, EngineError, Txn, WalCommand};

/// What one reconciliation pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub events_swept: usize,
    pub venues_projected: usize,
    pub staff_projected: usize,
    pub tables_projected: usize,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Engine {
    /// Sweep every event, then re-derive every venue, staff and table status.
    ///
    /// The scheduled counterpart of the on-read sweep: projections that only
    /// move because time passed (a venue emptying at the end of an event)
    /// catch up here without any event being touched.
    pub async fn reconcile(&self) -> Result<ReconcileReport, EngineError> {
        let now = self.now();
        let stale: Vec<Ulid> = {
            let guard = self.state.read().await;
            guard
                .events
                .values()
                .filter(|event| sweep::transition(event, now).is_some())
                .map(|event| event.id)
                .collect()
        };
        let mut report = ReconcileReport {
            events_swept: self.sweep_events(&stale, now).await,
            ..Default::default()
        };

        let mut guard = self.state.write().await;
        let venues: Vec<Ulid> = guard.venues.keys().copied().collect();
        let staff: Vec<Ulid> = guard.staff.keys().copied().collect();
        let tables: Vec<Ulid> = guard.tables.keys().copied().collect();

        let mut txn = Txn::new(&mut guard);
        for id in venues {
            report.venues_projected += usize::from(self.project_venue(&mut txn, id, now));
        }
        for id in staff {
            report.staff_projected += usize::from(self.project_staff(&mut txn, id, now));
        }
        for id in tables {
            report.tables_projected += usize::from(self.project_table(&mut txn, id));
        }
        self.commit(txn).await?;
        Ok(report)
    }

    /// Rewrite the WAL as the minimal record set for the current state.
    ///
    /// The read guard is held until the swap completes, so no commit can
    /// land between the snapshot and the rewrite.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let guard = self.state.read().await;
        let snapshot: Vec<Record> = guard.snapshot();
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { snapshot, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        let result = rx
            .await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()));
        drop(guard);
        result
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
