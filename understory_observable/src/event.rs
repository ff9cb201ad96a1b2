// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Weakly-held event handlers with RAII subscription handles.
//!
//! An [`Event`] never owns its handlers. Subscribing returns a [`Subscription`]
//! that holds the only strong reference to the handler; the event keeps a
//! `Weak` pointer that is pruned lazily once the handle is gone. This is what
//! keeps parent/child model graphs collectible: the watched object's event list
//! cannot extend the lifetime of whoever is listening.
//!
//! Dispatch snapshots the live handlers under the event lock and invokes them
//! after the lock is released, so a handler may freely subscribe, unsubscribe
//! or raise other events (including this one) without deadlocking.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use smallvec::SmallVec;

type Handler<A> = dyn Fn(&A) + Send + Sync;

/// Error returned when an event refuses a subscription.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    /// The event is not open to outside listeners.
    #[error("event `{0}` does not accept external subscriptions")]
    Restricted(&'static str),
}

/// A change event whose handlers are held weakly.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use understory_observable::Event;
///
/// let event = Event::<u32>::new("Ticked");
/// let seen = Arc::new(AtomicUsize::new(0));
///
/// let counter = seen.clone();
/// let subscription = event
///     .subscribe(move |v| {
///         counter.fetch_add(*v as usize, Ordering::SeqCst);
///     })
///     .unwrap();
///
/// event.raise(&2);
/// drop(subscription);
/// event.raise(&40);
///
/// assert_eq!(seen.load(Ordering::SeqCst), 2);
/// ```
pub struct Event<A> {
    name: &'static str,
    restricted: bool,
    slots: Arc<Mutex<Slots<A>>>,
}

struct Slots<A> {
    next_id: u64,
    entries: Vec<(u64, Weak<Handler<A>>)>,
}

impl<A: 'static> Event<A> {
    /// Creates a new open event.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            restricted: false,
            slots: Arc::new(Mutex::new(Slots {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Creates an event that refuses outside subscriptions.
    ///
    /// Owners can still raise it; [`Event::subscribe`] returns
    /// [`SubscribeError::Restricted`].
    #[must_use]
    pub fn restricted(name: &'static str) -> Self {
        Self {
            restricted: true,
            ..Self::new(name)
        }
    }

    /// Returns the event name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if the event refuses outside subscriptions.
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// Subscribes `handler` and returns the handle that keeps it alive.
    pub fn subscribe<F>(&self, handler: F) -> Result<Subscription, SubscribeError>
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        if self.restricted {
            return Err(SubscribeError::Restricted(self.name));
        }

        let handler: Arc<Handler<A>> = Arc::new(handler);
        let id = {
            let mut slots = lock(&self.slots);
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.push((id, Arc::downgrade(&handler)));
            id
        };

        let detach: Weak<dyn Detach> = {
            let slots: Arc<dyn Detach> = self.slots.clone();
            Arc::downgrade(&slots)
        };

        Ok(Subscription {
            id,
            event: self.name,
            handler: Some(Box::new(handler)),
            detach,
        })
    }

    /// Invokes every live handler with `args`.
    ///
    /// Returns the number of handlers invoked.
    pub fn raise(&self, args: &A) -> usize {
        let live: SmallVec<[Arc<Handler<A>>; 4]> = {
            let mut slots = lock(&self.slots);
            slots.entries.retain(|(_, weak)| weak.strong_count() > 0);
            slots
                .entries
                .iter()
                .filter_map(|(_, weak)| weak.upgrade())
                .collect()
        };

        for handler in &live {
            handler(args);
        }
        live.len()
    }

    /// Returns the number of handlers that are still alive.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        lock(&self.slots)
            .entries
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    /// Returns `true` if at least one live handler is attached.
    #[must_use]
    pub fn has_handlers(&self) -> bool {
        self.handler_count() > 0
    }
}

impl<A> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = lock(&self.slots).entries.len();
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("restricted", &self.restricted)
            .field("slots", &count)
            .finish()
    }
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<A> Detach for Mutex<Slots<A>> {
    fn detach(&self, id: u64) {
        lock(self).entries.retain(|(slot, _)| *slot != id);
    }
}

/// Handle for an event subscription.
///
/// The handle owns the handler. Dropping it (or calling
/// [`Subscription::unsubscribe`]) detaches the handler from the event. The
/// handle never keeps the event's owner alive.
#[must_use = "dropping a subscription detaches the handler immediately"]
pub struct Subscription {
    id: u64,
    event: &'static str,
    handler: Option<Box<dyn Any + Send + Sync>>,
    detach: Weak<dyn Detach>,
}

impl Subscription {
    /// Detaches the handler now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Returns `true` while the event this handle belongs to is still alive.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.handler.is_some() && self.detach.strong_count() > 0
    }

    /// Returns the name of the event this handle belongs to.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        self.event
    }

    fn release(&mut self) {
        if self.handler.take().is_some()
            && let Some(slots) = self.detach.upgrade()
        {
            slots.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("attached", &self.is_attached())
            .finish()
    }
}

pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(event: &Event<u32>) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let inner = hits.clone();
        let sub = event
            .subscribe(move |_| {
                inner.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        (hits, sub)
    }

    #[test]
    fn raise_reaches_live_handlers() {
        let event = Event::new("Changed");
        let (a, _sa) = counter(&event);
        let (b, _sb) = counter(&event);

        assert_eq!(event.raise(&1), 2);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_handle_detaches() {
        let event = Event::new("Changed");
        let (hits, sub) = counter(&event);
        assert_eq!(event.handler_count(), 1);

        drop(sub);
        assert_eq!(event.handler_count(), 0);
        assert_eq!(event.raise(&1), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_is_explicit_detach() {
        let event = Event::new("Changed");
        let (_, sub) = counter(&event);
        assert!(sub.is_attached());
        sub.unsubscribe();
        assert!(!event.has_handlers());
    }

    #[test]
    fn restricted_event_refuses_subscriptions() {
        let event = Event::<u32>::restricted("Hidden");
        let err = event.subscribe(|_| {}).unwrap_err();
        assert_eq!(err, SubscribeError::Restricted("Hidden"));
        assert!(event.is_restricted());
    }

    #[test]
    fn handle_outlives_event() {
        let event = Event::<u32>::new("Short");
        let (_, sub) = counter(&event);
        drop(event);
        assert!(!sub.is_attached());
        drop(sub);
    }

    #[test]
    fn handlers_may_reenter_the_event() {
        let event = Arc::new(Event::<u32>::new("Reentrant"));
        let nested = Arc::new(Mutex::new(Vec::new()));

        let ev = Arc::downgrade(&event);
        let store = nested.clone();
        let _sub = event
            .subscribe(move |v| {
                if let Some(ev) = ev.upgrade() {
                    // Subscribing from inside dispatch must not deadlock.
                    let late = ev.subscribe(|_| {}).unwrap();
                    lock(&store).push(late);
                    if *v > 0 {
                        ev.raise(&(v - 1));
                    }
                }
            })
            .unwrap();

        event.raise(&2);
        assert!(lock(&nested).len() >= 3);
    }

    #[test]
    fn debug_mentions_name() {
        let event = Event::<u32>::new("Named");
        let text = format!("{event:?}");
        assert!(text.contains("Named"));
    }
}
