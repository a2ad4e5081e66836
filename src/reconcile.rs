use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::Engine;

/// Background task that catches derived statuses up with the clock.
///
/// Reads already sweep the rows they return; this pass also moves venue and
/// staff projections whose events nobody is reading.
pub async fn run_reconciler(engine: Arc<Engine>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        match engine.reconcile().await {
            Ok(report) if report.is_empty() => {}
            Ok(report) => info!("tenant {}: reconciled {report:?}", engine.tenant()),
            Err(e) => warn!("tenant {}: reconcile failed: {e}", engine.tenant()),
        }
    }
}

/// Background task that compacts the WAL once enough appends accumulate.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let appends = engine.wal_appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        match engine.compact_wal().await {
            Ok(()) => debug!("tenant {}: compacted WAL after {appends} appends", engine.tenant()),
            Err(e) => warn!("tenant {}: compaction failed: {e}", engine.tenant()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::*;
    use crate::notify::NotifyHub;
    use chrono::{NaiveDate, NaiveTime};
    use std::path::PathBuf;
    use ulid::Ulid;

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("soiree_test_reconcile");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn reconciler_empties_venue_without_reads() {
        let day = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let clock = Arc::new(ManualClock::at(day, hm(11, 0)));
        let engine = Arc::new(
            Engine::new("acme", test_wal_path("empties.wal"), Arc::new(NotifyHub::new()), clock.clone()).unwrap(),
        );

        let venue = Ulid::new();
        engine
            .create_venue(VenueDraft {
                id: venue,
                company: None,
                name: "Loft".into(),
                capacity: 0,
            })
            .await
            .unwrap();
        engine
            .create_event(
                EventDraft::new(Ulid::new(), "Brunch", day)
                    .at_venue(venue)
                    .between(parse_clock_time("10:00"), parse_clock_time("12:00"))
                    .with_status(EventStatus::Confirmed),
            )
            .await
            .unwrap();
        assert_eq!(engine.get_venue(venue).await.unwrap().status, VenueStatus::Occupied);

        clock.set_time(hm(13, 0));
        tokio::spawn(run_reconciler(engine.clone(), Duration::from_millis(10)));

        let mut status = VenueStatus::Occupied;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = engine.get_venue(venue).await.unwrap().status;
            if status == VenueStatus::Empty {
                break;
            }
        }
        assert_eq!(status, VenueStatus::Empty);
    }
}
