use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::trace;

use crate::dto::realtime::RealtimeMessage;

/// Per-game broadcast channels keyed by share code.
///
/// Channels are created on first subscription and dropped once the last subscriber
/// is gone.
pub struct RealtimeHub {
    channels: DashMap<String, broadcast::Sender<RealtimeMessage>>,
    capacity: usize,
}

impl RealtimeHub {
    /// Create an empty hub whose channels buffer `capacity` messages per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to the updates of the game shared under `share_code`.
    pub fn subscribe(&self, share_code: &str) -> broadcast::Receiver<RealtimeMessage> {
        self.channels
            .entry(normalize(share_code))
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Deliver `message` to every current subscriber of `share_code`.
    pub fn publish(&self, share_code: &str, message: RealtimeMessage) {
        let key = normalize(share_code);
        let delivered = match self.channels.get(&key) {
            Some(sender) => sender.send(message).unwrap_or(0),
            None => 0,
        };
        if delivered == 0 {
            self.channels
                .remove_if(&key, |_, sender| sender.receiver_count() == 0);
        }
        trace!(share_code = %key, delivered, "published game update");
    }

    /// Number of live subscribers of `share_code`.
    pub fn subscriber_count(&self, share_code: &str) -> usize {
        self.channels
            .get(&normalize(share_code))
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

fn normalize(share_code: &str) -> String {
    share_code.trim().to_ascii_uppercase()
}
