use async_trait::async_trait;
use frames_types::{events::KioskEvent, Result};
use futures::{stream::BoxStream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::trace;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: KioskEvent) -> Result<()>;
    fn subscribe(&self) -> BoxStream<'static, KioskEvent>;
}

/// In-process fan-out backed by a broadcast channel. Slow subscribers
/// miss events rather than stalling the capture loop.
#[derive(Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<KioskEvent>,
}

impl LocalBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

#[async_trait]
impl EventPublisher for LocalBus {
    async fn publish(&self, event: KioskEvent) -> Result<()> {
        if self.tx.send(event).is_err() {
            trace!("No event subscribers attached");
        }
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, KioskEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move { event.ok() })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frames_types::events::{EventPayload, LifecyclePhase};

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = LocalBus::new(8);
        let mut events = bus.subscribe();
        bus.publish(KioskEvent::lifecycle(LifecyclePhase::Armed, None))
            .await
            .expect("publish");
        let event = events.next().await.expect("event");
        assert!(matches!(
            event.payload,
            EventPayload::Lifecycle(ref l) if l.phase == LifecyclePhase::Armed
        ));
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_fine() {
        let bus = LocalBus::new(2);
        bus.publish(KioskEvent::lifecycle(LifecyclePhase::Idle, None))
            .await
            .expect("publish");
    }
}
