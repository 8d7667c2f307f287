use tokio::sync::broadcast;

/// Which slice of the snapshot a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeScope {
    Refs,
    History,
    WorkingTree,
}

/// Delivered to subscribers after each published snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Version of the snapshot this event describes.
    pub version: u64,
    pub scope: ChangeScope,
}

/// Publish/subscribe fan-out for model changes.
///
/// Built on a broadcast channel: each subscriber gets its own receiver, so a
/// slow, panicked, or dropped subscriber never affects delivery to the rest.
#[derive(Debug)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a subscriber. Unsubscribe by dropping the receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn notify(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}
