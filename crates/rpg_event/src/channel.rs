//! Typed sender/listener endpoints.
//!
//! Each binding between a sender and a listener owns one inbox queue. The
//! sender holds a weak handle to it, the listener the strong one, so
//! unbinding or dropping the listener discards whatever was still queued for
//! that binding and the sender stops delivering to it.
//!
//! Per frame the driver calls [`EventSender::propagate`] on every sender and
//! then [`EventListener::dispatch`] (or [`EventListener::drain`]) on every
//! listener. Events arrive exactly once, in send order per sender.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

static NEXT_ENDPOINT: AtomicU64 = AtomicU64::new(1);

fn next_endpoint() -> u64 {
    NEXT_ENDPOINT.fetch_add(1, Ordering::Relaxed)
}

type Inbox<E> = Rc<RefCell<VecDeque<E>>>;

/// Reacts to events of type `E`.
///
/// Subsystems listening to several event types implement this trait once per
/// type.
pub trait EventHandler<E> {
    /// Process one event.
    fn handle(&mut self, event: &E);
}

impl<E, F> EventHandler<E> for F
where
    F: FnMut(&E),
{
    fn handle(&mut self, event: &E) {
        (self)(event)
    }
}

#[derive(Debug)]
struct Target<E> {
    listener: u64,
    inbox: Weak<RefCell<VecDeque<E>>>,
}

/// Buffers events of type `E` during a frame and fans them out to every
/// bound listener on [`propagate`](Self::propagate).
#[derive(Debug)]
pub struct EventSender<E> {
    id: u64,
    outbox: Vec<E>,
    targets: Vec<Target<E>>,
}

impl<E> EventSender<E> {
    /// A sender with no listeners bound.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_endpoint(),
            outbox: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Buffer an event until the next propagation.
    pub fn send(&mut self, event: E) {
        self.outbox.push(event);
    }

    /// Number of buffered, not yet propagated events.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Buffered events, oldest first.
    #[must_use]
    pub fn buffered(&self) -> &[E] {
        &self.outbox
    }

    /// Number of listeners still alive and bound to this sender.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| t.inbox.strong_count() > 0)
            .count()
    }

    /// Connect `listener` to this sender. Binding twice has no effect.
    pub fn bind(&mut self, listener: &mut EventListener<E>) {
        if listener.is_bound_to(self) {
            return;
        }
        let inbox: Inbox<E> = Rc::new(RefCell::new(VecDeque::new()));
        self.targets.push(Target {
            listener: listener.id,
            inbox: Rc::downgrade(&inbox),
        });
        listener.bindings.push(Binding {
            sender: self.id,
            inbox,
        });
    }

    /// Disconnect `listener`. Events already delivered to it through this
    /// binding but not yet dispatched are dropped.
    ///
    /// Returns `true` if the two were bound.
    pub fn unbind(&mut self, listener: &mut EventListener<E>) -> bool {
        self.targets.retain(|t| t.listener != listener.id);
        let before = listener.bindings.len();
        listener.bindings.retain(|b| b.sender != self.id);
        before != listener.bindings.len()
    }

    /// Drop all buffered events without delivering them.
    pub fn clear(&mut self) {
        self.outbox.clear();
    }
}

impl<E: Clone> EventSender<E> {
    /// Deliver every buffered event to every bound listener's inbox, then
    /// empty the buffer. Returns the number of events propagated.
    pub fn propagate(&mut self) -> usize {
        self.targets.retain(|t| t.inbox.strong_count() > 0);
        let count = self.outbox.len();
        if count == 0 {
            return 0;
        }
        for target in &self.targets {
            if let Some(inbox) = target.inbox.upgrade() {
                inbox.borrow_mut().extend(self.outbox.iter().cloned());
            }
        }
        trace!(
            event = std::any::type_name::<E>(),
            count,
            listeners = self.targets.len(),
            "propagated events"
        );
        self.outbox.clear();
        count
    }
}

impl<E> Default for EventSender<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct Binding<E> {
    sender: u64,
    inbox: Inbox<E>,
}

/// Receives events of type `E` from the senders it is bound to.
#[derive(Debug)]
pub struct EventListener<E> {
    id: u64,
    bindings: Vec<Binding<E>>,
}

impl<E> EventListener<E> {
    /// A listener bound to no sender.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_endpoint(),
            bindings: Vec::new(),
        }
    }

    /// Returns `true` if this listener is bound to `sender`.
    #[must_use]
    pub fn is_bound_to(&self, sender: &EventSender<E>) -> bool {
        self.bindings.iter().any(|b| b.sender == sender.id)
    }

    /// Number of senders this listener is bound to.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }

    /// Number of delivered, not yet dispatched events.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.bindings.iter().map(|b| b.inbox.borrow().len()).sum()
    }

    /// Take every delivered event, binding by binding in bind order, and
    /// empty the inbox.
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::with_capacity(self.pending());
        for binding in &self.bindings {
            events.extend(binding.inbox.borrow_mut().drain(..));
        }
        events
    }

    /// Invoke `handler` once per delivered event and empty the inbox.
    /// Returns the number of events handled.
    pub fn dispatch<H>(&mut self, handler: &mut H) -> usize
    where
        H: EventHandler<E> + ?Sized,
    {
        let events = self.drain();
        for event in &events {
            handler.handle(event);
        }
        events.len()
    }
}

impl<E> Default for EventListener<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    #[derive(Default)]
    struct Recorder {
        seen: Vec<u32>,
    }

    impl EventHandler<Ping> for Recorder {
        fn handle(&mut self, event: &Ping) {
            self.seen.push(event.0);
        }
    }

    #[test]
    fn test_events_dispatch_in_send_order_once() {
        let mut sender = EventSender::new();
        let mut listener = EventListener::new();
        sender.bind(&mut listener);

        sender.send(Ping(1));
        sender.send(Ping(2));
        sender.send(Ping(3));
        assert_eq!(sender.propagate(), 3);
        assert_eq!(sender.pending(), 0);

        let mut recorder = Recorder::default();
        assert_eq!(listener.dispatch(&mut recorder), 3);
        assert_eq!(recorder.seen, vec![1, 2, 3]);

        // inbox is empty afterwards
        assert_eq!(listener.dispatch(&mut recorder), 0);
        assert_eq!(recorder.seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_nothing_arrives_before_propagation() {
        let mut sender = EventSender::new();
        let mut listener = EventListener::new();
        sender.bind(&mut listener);
        sender.send(Ping(1));
        assert_eq!(listener.pending(), 0);
        assert_eq!(sender.buffered(), &[Ping(1)]);
    }

    #[test]
    fn test_unbind_drops_in_flight_events() {
        let mut sender = EventSender::new();
        let mut listener = EventListener::new();
        sender.bind(&mut listener);
        sender.send(Ping(1));
        sender.propagate();

        assert!(sender.unbind(&mut listener));
        sender.send(Ping(2));
        sender.propagate();

        let mut recorder = Recorder::default();
        assert_eq!(listener.dispatch(&mut recorder), 0);
        assert!(recorder.seen.is_empty());
        assert!(!sender.unbind(&mut listener));
    }

    #[test]
    fn test_every_listener_gets_a_copy() {
        let mut sender = EventSender::new();
        let mut a = EventListener::new();
        let mut b = EventListener::new();
        sender.bind(&mut a);
        sender.bind(&mut b);
        assert_eq!(sender.bound_count(), 2);

        sender.send(Ping(7));
        sender.propagate();
        assert_eq!(a.drain(), vec![Ping(7)]);
        assert_eq!(b.drain(), vec![Ping(7)]);
    }

    #[test]
    fn test_bind_twice_delivers_once() {
        let mut sender = EventSender::new();
        let mut listener = EventListener::new();
        sender.bind(&mut listener);
        sender.bind(&mut listener);
        assert_eq!(listener.bound_count(), 1);
        sender.send(Ping(1));
        sender.propagate();
        assert_eq!(listener.drain().len(), 1);
    }

    #[test]
    fn test_dropped_listener_detaches() {
        let mut sender = EventSender::new();
        {
            let mut listener = EventListener::new();
            sender.bind(&mut listener);
            assert_eq!(sender.bound_count(), 1);
        }
        assert_eq!(sender.bound_count(), 0);
        sender.send(Ping(1));
        assert_eq!(sender.propagate(), 1);
    }

    #[test]
    fn test_multiple_senders_drain_in_bind_order() {
        let mut first = EventSender::new();
        let mut second = EventSender::new();
        let mut listener = EventListener::new();
        second.bind(&mut listener);
        first.bind(&mut listener);

        first.send(Ping(1));
        second.send(Ping(10));
        second.send(Ping(11));
        first.propagate();
        second.propagate();

        assert_eq!(listener.drain(), vec![Ping(10), Ping(11), Ping(1)]);
    }

    #[test]
    fn test_closure_handler() {
        let mut sender = EventSender::new();
        let mut listener = EventListener::new();
        sender.bind(&mut listener);
        sender.send(Ping(4));
        sender.send(Ping(5));
        sender.propagate();

        let mut sum = 0;
        let mut add = |p: &Ping| sum += p.0;
        listener.dispatch(&mut add);
        assert_eq!(sum, 9);
    }
}
