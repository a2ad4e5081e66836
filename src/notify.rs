use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::Record;

const CHANNEL_CAPACITY: usize = 256;

/// Change feed keyed by channel (event id for event-scoped rows, venue or staff id otherwise).
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Record>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a channel. Creates the channel if needed.
    pub fn subscribe(&self, channel: Ulid) -> broadcast::Receiver<Record> {
        let sender = self
            .channels
            .entry(channel)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Publish a committed record on its channel. No-op if nobody is listening.
    pub fn send(&self, record: &Record) {
        if let Some(sender) = self.channels.get(&record.channel()) {
            let _ = sender.send(record.clone());
        }
    }

    /// Drop a channel once its row is gone.
    pub fn remove(&self, channel: &Ulid) {
        self.channels.remove(channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventStatus;

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let event_id = Ulid::new();
        let mut rx = hub.subscribe(event_id);

        let record = Record::EventStatusChanged { id: event_id, status: EventStatus::Ongoing };
        hub.send(&record);

        assert_eq!(rx.recv().await.unwrap(), record);
    }

    #[tokio::test]
    async fn event_scoped_rows_route_to_their_event() {
        let hub = NotifyHub::new();
        let event_id = Ulid::new();
        let mut rx = hub.subscribe(event_id);

        let record = Record::InviteDeleted { id: Ulid::new(), event_id };
        hub.send(&record);
        assert_eq!(rx.recv().await.unwrap(), record);
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        hub.send(&Record::VenueDeleted { id: Ulid::new() });
    }

    #[tokio::test]
    async fn removed_channel_closes_receivers() {
        let hub = NotifyHub::new();
        let id = Ulid::new();
        let mut rx = hub.subscribe(id);
        hub.remove(&id);
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
