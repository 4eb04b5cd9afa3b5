//! Delayed hit delivery.
//!
//! Follow-up hits (double hits, delayed detonations) wait here as plain timers and
//! are delivered by the host's step loop once due.

use tracing::{debug, trace};

use crate::damage::HitContext;
use crate::world::{HitReceiver, WorldQuery};

/// A hit waiting to be delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledHit {
    /// The hit to deliver.
    pub context: HitContext,
    /// Seconds until delivery.
    pub remaining: f32,
}

impl ScheduledHit {
    /// Creates a hit due after `delay` seconds.
    #[must_use]
    pub fn new(context: HitContext, delay: f32) -> Self {
        Self {
            context,
            remaining: delay,
        }
    }
}

/// Queue of pending delayed hits.
#[derive(Debug, Default)]
pub struct HitScheduler {
    pending: Vec<ScheduledHit>,
}

impl HitScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a hit.
    pub fn schedule(&mut self, hit: ScheduledHit) {
        trace!(target = %hit.context.target, delay = hit.remaining, "Hit scheduled");
        self.pending.push(hit);
    }

    /// Queues several hits.
    pub fn extend(&mut self, hits: impl IntoIterator<Item = ScheduledHit>) {
        for hit in hits {
            self.schedule(hit);
        }
    }

    /// Advances timers and delivers every hit that came due, in scheduling order.
    ///
    /// Hits whose target no longer exists are dropped. Returns how many were delivered.
    pub fn tick<W>(&mut self, dt: f32, world: &mut W, rng: &mut fastrand::Rng) -> usize
    where
        W: WorldQuery + HitReceiver,
    {
        let mut due = Vec::new();
        self.pending.retain_mut(|hit| {
            hit.remaining -= dt;
            if hit.remaining <= 0.0 {
                due.push(hit.context.clone());
                false
            } else {
                true
            }
        });

        let mut delivered = 0;
        for context in due {
            if world.position_of(context.target).is_none() {
                debug!(target = %context.target, "Delayed hit dropped, target gone");
                continue;
            }
            world.deliver_hit(&context, rng);
            delivered += 1;
        }
        delivered
    }

    /// Drops every pending hit dealt by `attacker`.
    pub fn cancel_from(&mut self, attacker: emberfall_common::EntityId) {
        self.pending.retain(|hit| hit.context.attacker != attacker);
    }

    /// Number of pending hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
