use tokio::sync::broadcast;
use tracing::debug;

/// Payload-free signals broadcast to decoupled listeners.
///
/// UI surfaces subscribe and re-fetch on receipt; the sender never waits on
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// A sync cycle completed successfully; invoice listings should reload.
    SyncCompleted,
    /// The account's extraction credits changed (e.g. after an upload).
    CreditsChanged,
}

/// Process-wide publish/subscribe bus.
///
/// Owned by whatever shared context wires the engine together and handed to
/// the components that publish, rather than living as an ambient global.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(16);
        EventBus { tx }
    }

    /// Registers a listener. Each receiver sees every event published after
    /// the subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event. Publishing with no live subscribers is not an
    /// error; signals are advisory.
    pub fn publish(&self, event: AppEvent) {
        debug!("Publishing event: {:?}", event);
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(AppEvent::SyncCompleted);
        bus.publish(AppEvent::CreditsChanged);

        assert_eq!(rx.recv().await.unwrap(), AppEvent::SyncCompleted);
        assert_eq!(rx.recv().await.unwrap(), AppEvent::CreditsChanged);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(AppEvent::SyncCompleted);
    }
}
