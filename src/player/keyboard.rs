//! Scoped keyboard subscriptions.
//!
//! [`KeyDispatcher`] is the process-wide key event source. Components
//! subscribe to a key and receive a [`KeySubscription`] guard; dropping the
//! guard removes exactly the binding it created, so a component that mounts
//! and unmounts repeatedly never leaves handlers behind.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Space,
    Escape,
    Char(char),
}

/// What a bound key asks its owner to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    TogglePlayback,
}

pub type SubscriptionId = u64;

/// A key press travelling through the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    /// Set when a handler claimed the key; the host must skip its default
    /// action (e.g. scrolling on space).
    pub default_prevented: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            default_prevented: false,
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_id: SubscriptionId,
    bindings: BTreeMap<SubscriptionId, (Key, KeyAction)>,
}

#[derive(Debug, Clone, Default)]
pub struct KeyDispatcher {
    registry: Arc<Mutex<Registry>>,
}

impl KeyDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `action`. The binding lives as long as the returned guard.
    pub fn subscribe(&self, key: Key, action: KeyAction) -> KeySubscription {
        let id = match self.registry.lock() {
            Ok(mut registry) => {
                registry.next_id += 1;
                let id = registry.next_id;
                registry.bindings.insert(id, (key, action));
                id
            }
            Err(poisoned) => {
                let mut registry = poisoned.into_inner();
                registry.next_id += 1;
                let id = registry.next_id;
                registry.bindings.insert(id, (key, action));
                id
            }
        };
        log::debug!(target: "player::keyboard", "subscribed #{} to {:?}", id, key);
        KeySubscription {
            id,
            key,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Route a key press to its subscribers.
    ///
    /// Returns the subscriptions that claimed the key, in registration order.
    pub fn dispatch(&self, event: &mut KeyEvent) -> Vec<(SubscriptionId, KeyAction)> {
        let targets: Vec<(SubscriptionId, KeyAction)> = match self.registry.lock() {
            Ok(registry) => registry
                .bindings
                .iter()
                .filter(|(_, (key, _))| *key == event.key)
                .map(|(id, (_, action))| (*id, *action))
                .collect(),
            Err(_) => Vec::new(),
        };
        if !targets.is_empty() {
            event.default_prevented = true;
        }
        targets
    }

    /// Number of live bindings for `key`.
    pub fn handler_count(&self, key: Key) -> usize {
        self.registry
            .lock()
            .map(|registry| registry.bindings.values().filter(|(k, _)| *k == key).count())
            .unwrap_or(0)
    }
}

/// Guard for a live key binding. Deregisters on drop.
#[derive(Debug)]
pub struct KeySubscription {
    id: SubscriptionId,
    key: Key,
    registry: Weak<Mutex<Registry>>,
}

impl KeySubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn key(&self) -> Key {
        self.key
    }
}

impl Drop for KeySubscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let removed = match registry.lock() {
            Ok(mut registry) => registry.bindings.remove(&self.id).is_some(),
            Err(poisoned) => poisoned.into_inner().bindings.remove(&self.id).is_some(),
        };
        if removed {
            log::debug!(target: "player::keyboard", "released #{}", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_registers_and_drop_releases() {
        let dispatcher = KeyDispatcher::new();
        let subscription = dispatcher.subscribe(Key::Space, KeyAction::TogglePlayback);
        assert_eq!(dispatcher.handler_count(Key::Space), 1);

        drop(subscription);
        assert_eq!(dispatcher.handler_count(Key::Space), 0);
    }

    #[test]
    fn test_dispatch_prevents_default_when_claimed() {
        let dispatcher = KeyDispatcher::new();
        let subscription = dispatcher.subscribe(Key::Space, KeyAction::TogglePlayback);

        let mut event = KeyEvent::new(Key::Space);
        let targets = dispatcher.dispatch(&mut event);

        assert!(event.default_prevented);
        assert_eq!(targets, vec![(subscription.id(), KeyAction::TogglePlayback)]);
    }

    #[test]
    fn test_unbound_key_passes_through() {
        let dispatcher = KeyDispatcher::new();
        let _subscription = dispatcher.subscribe(Key::Space, KeyAction::TogglePlayback);

        let mut event = KeyEvent::new(Key::Char('k'));
        assert!(dispatcher.dispatch(&mut event).is_empty());
        assert!(!event.default_prevented);
    }

    #[test]
    fn test_drop_removes_only_its_own_binding() {
        let dispatcher = KeyDispatcher::new();
        let first = dispatcher.subscribe(Key::Space, KeyAction::TogglePlayback);
        let second = dispatcher.subscribe(Key::Space, KeyAction::TogglePlayback);
        assert_ne!(first.id(), second.id());

        drop(first);
        let mut event = KeyEvent::new(Key::Space);
        assert_eq!(
            dispatcher.dispatch(&mut event),
            vec![(second.id(), KeyAction::TogglePlayback)]
        );
    }

    #[test]
    fn test_subscription_outliving_dispatcher_drops_cleanly() {
        let dispatcher = KeyDispatcher::new();
        let subscription = dispatcher.subscribe(Key::Escape, KeyAction::TogglePlayback);
        drop(dispatcher);
        drop(subscription);
    }
}
