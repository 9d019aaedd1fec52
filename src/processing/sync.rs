//! Processing synchronization protocol.
//!
//! The tuner and the player never call each other when a job completes.
//! The tuner publishes a typed [`FileProcessed`] event on a [`ProcessedBus`];
//! whoever owns a player subscribes and hands the event to
//! `PlaybackController::notify_processed`, which decides whether the event
//! still applies.

use crate::defaults;
use crate::processing::request::RequestToken;
use tokio::sync::broadcast;

/// The request context a completion belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub token: RequestToken,
    /// Source locator the request was built from.
    pub source: String,
}

/// "A processing job finished" notification.
#[derive(Debug, Clone, PartialEq)]
pub struct FileProcessed {
    /// Locator of the processed file. `None` or empty is rejected by players.
    pub locator: Option<String>,
    /// Request context, absent for bare notifications from external callers.
    pub origin: Option<RequestOrigin>,
}

impl FileProcessed {
    /// Bare notification without request context; applied last-writer-wins.
    pub fn new(locator: Option<String>) -> Self {
        Self {
            locator,
            origin: None,
        }
    }

    pub fn for_request(origin: RequestOrigin, locator: impl Into<String>) -> Self {
        Self {
            locator: Some(locator.into()),
            origin: Some(origin),
        }
    }

    /// The locator, if present and non-blank.
    pub fn usable_locator(&self) -> Option<&str> {
        self.locator.as_deref().filter(|l| !l.trim().is_empty())
    }
}

/// What a player did with a [`FileProcessed`] event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// New source assigned and loading.
    Swapped,
    /// Missing or empty locator; nothing changed.
    Rejected,
    /// The event belongs to a request the player no longer waits for.
    Stale,
}

/// Publish/subscribe channel for [`FileProcessed`] events.
#[derive(Debug, Clone)]
pub struct ProcessedBus {
    sender: broadcast::Sender<FileProcessed>,
}

impl ProcessedBus {
    pub fn new() -> Self {
        Self::with_capacity(defaults::PROCESSED_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FileProcessed> {
        self.sender.subscribe()
    }

    /// Publish an event. Returns how many subscribers will see it.
    pub fn publish(&self, event: FileProcessed) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                log::debug!(target: "processing::sync", "processed event published with no subscribers");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ProcessedBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(token: u64) -> RequestOrigin {
        RequestOrigin {
            token: RequestToken(token),
            source: "a.mp3".to_string(),
        }
    }

    #[test]
    fn test_usable_locator_rejects_blank() {
        assert_eq!(FileProcessed::new(None).usable_locator(), None);
        assert_eq!(FileProcessed::new(Some(String::new())).usable_locator(), None);
        assert_eq!(FileProcessed::new(Some("  ".to_string())).usable_locator(), None);
        assert_eq!(
            FileProcessed::new(Some("b.mp3".to_string())).usable_locator(),
            Some("b.mp3")
        );
    }

    #[test]
    fn test_publish_without_subscribers_returns_zero() {
        let bus = ProcessedBus::new();
        assert_eq!(bus.publish(FileProcessed::new(Some("x".to_string()))), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let bus = ProcessedBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let event = FileProcessed::for_request(origin(1), "a_pitch.mp3");
        assert_eq!(bus.publish(event.clone()), 2);

        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
    }

    #[test]
    fn test_subscriber_count_tracks_receivers() {
        let bus = ProcessedBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        let receiver = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(receiver);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
