//! Combat event hub.
//!
//! Every subscriber owns its own channel, so independent systems (damage
//! popups, aggro-on-damage, run statistics) each see every event.
//!
//! A subscriber that falls more than its backlog limit behind loses damage
//! events. Lifecycle events are always delivered.

use crossbeam_channel::{unbounded, Receiver, Sender};
use emberfall_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Default per-subscriber backlog limit for damage events.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Events emitted by the combat core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// A combatant lost health.
    DamageTaken {
        /// Who was hit.
        target: EntityId,
        /// Who dealt the hit.
        attacker: EntityId,
        /// Final damage.
        amount: f32,
        /// Whether the hit was critical.
        critical: bool,
    },
    /// A combatant's health reached zero.
    Died {
        /// Who died.
        entity: EntityId,
    },
}

impl CombatEvent {
    /// Whether the event marks an actor's lifecycle and must never be dropped.
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Died { .. })
    }

    /// Entity the event is about.
    #[must_use]
    pub fn subject(&self) -> EntityId {
        match self {
            Self::DamageTaken { target, .. } => *target,
            Self::Died { entity } => *entity,
        }
    }
}

/// Handle returned by [`EventHub::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: Receiver<CombatEvent>,
}

impl Subscription {
    /// Identifier to pass to [`EventHub::unsubscribe`].
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<CombatEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

/// Fan-out event hub.
#[derive(Debug)]
pub struct EventHub {
    subscribers: Vec<(u64, Sender<CombatEvent>)>,
    next_id: u64,
    capacity: usize,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventHub {
    /// Creates a hub that drops damage events for subscribers `capacity` events behind.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 1,
            capacity: capacity.max(1),
        }
    }

    /// Registers a new subscriber.
    pub fn subscribe(&mut self) -> Subscription {
        let (sender, receiver) = unbounded();
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, sender));
        Subscription { id, receiver }
    }

    /// Removes a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: u64) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    /// Publishes an event to every subscriber.
    pub fn publish(&mut self, event: CombatEvent) {
        trace!(?event, subscribers = self.subscribers.len(), "Publishing combat event");
        let capacity = self.capacity;
        // Subscribers whose receiver was dropped are pruned here.
        self.subscribers.retain(|(id, sender)| {
            if !event.is_lifecycle() && sender.len() >= capacity {
                warn!(subscriber = id, ?event, "Subscriber backlog full, dropping event");
                return true;
            }
            sender.send(event).is_ok()
        });
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_subscribers_see_every_event() {
        let mut hub = EventHub::default();
        let a = hub.subscribe();
        let b = hub.subscribe();
        let entity = EntityId::new();

        hub.publish(CombatEvent::Died { entity });
        assert_eq!(a.drain(), vec![CombatEvent::Died { entity }]);
        assert_eq!(b.pending_count(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut hub = EventHub::default();
        let a = hub.subscribe();
        let b = hub.subscribe();
        hub.unsubscribe(a.id());
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(CombatEvent::Died { entity: EntityId::new() });
        assert_eq!(a.pending_count(), 0);
        assert_eq!(b.pending_count(), 1);
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let mut hub = EventHub::default();
        let a = hub.subscribe();
        drop(a);
        hub.publish(CombatEvent::Died { entity: EntityId::new() });
        assert_eq!(hub.subscriber_count(), 0);
    }

    fn damage(target: EntityId) -> CombatEvent {
        CombatEvent::DamageTaken {
            target,
            attacker: EntityId::new(),
            amount: 1.0,
            critical: false,
        }
    }

    #[test]
    fn test_full_backlog_drops_damage_without_blocking() {
        let mut hub = EventHub::new(1);
        let a = hub.subscribe();
        let entity = EntityId::new();
        hub.publish(damage(entity));
        hub.publish(damage(entity));
        assert_eq!(a.drain().len(), 1);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_death_survives_full_backlog() {
        let mut hub = EventHub::new(2);
        let a = hub.subscribe();
        let entity = EntityId::new();
        for _ in 0..5 {
            hub.publish(damage(entity));
        }
        hub.publish(CombatEvent::Died { entity });

        let events = a.drain();
        assert_eq!(events.len(), 3);
        assert_eq!(events.last(), Some(&CombatEvent::Died { entity }));
    }
}
