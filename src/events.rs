//! Asset change notifications.
//!
//! The watcher and the build pipeline publish events here; embedding
//! applications subscribe to drive cache invalidation or live reload.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

/// A change to the asset tree or its built artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetEvent {
    /// A source file was added or modified (lowercased relative path).
    Changed(String),
    /// A source file was deleted.
    Removed(String),
    /// A stale generated artifact was dropped.
    Pruned(String),
}

/// Fan-out hub for asset events.
#[derive(Default)]
pub struct EventHub {
    subscribers: Mutex<Vec<Sender<AssetEvent>>>,
}

impl EventHub {
    /// Subscribe to all future events.
    pub fn subscribe(&self) -> Receiver<AssetEvent> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver an event to every live subscriber, dropping disconnected ones.
    pub fn emit(&self, event: AssetEvent) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_events() {
        let hub = EventHub::default();
        let a = hub.subscribe();
        let b = hub.subscribe();

        hub.emit(AssetEvent::Changed("js/main.js".into()));
        assert_eq!(a.try_recv().unwrap(), AssetEvent::Changed("js/main.js".into()));
        assert_eq!(b.try_recv().unwrap(), AssetEvent::Changed("js/main.js".into()));
    }

    #[test]
    fn test_disconnected_subscribers_dropped() {
        let hub = EventHub::default();
        drop(hub.subscribe());
        let live = hub.subscribe();

        hub.emit(AssetEvent::Removed("old.css".into()));
        assert_eq!(live.try_recv().unwrap(), AssetEvent::Removed("old.css".into()));
        assert_eq!(hub.subscribers.lock().len(), 1);
    }
}
