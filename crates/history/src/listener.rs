//! Listener fanout with per-listener failure isolation.
//!
//! Listeners are zero-argument callbacks notified after every mutating
//! operation. A panicking listener is caught and logged; it must never
//! corrupt history state, break other observers, or propagate into the
//! caller of the mutating operation.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error};

/// Token identifying a subscription, used to unsubscribe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut()>;

/// Registry of change listeners, invoked in subscription order.
#[derive(Default)]
pub(crate) struct ListenerSet {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and immediately invoke it once, so a newly
    /// mounted observer can render current state without an initial fetch.
    pub fn subscribe(&mut self, listener: impl FnMut() + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        debug!(listener = id.0, total = self.listeners.len(), "Listener subscribed");

        let (_, listener) = self.listeners.last_mut().unwrap();
        invoke_isolated(id, listener);
        id
    }

    /// Remove a listener. Returns `false` if the id was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        let removed = self.listeners.len() < before;
        if removed {
            debug!(listener = id.0, total = self.listeners.len(), "Listener unsubscribed");
        }
        removed
    }

    /// Invoke all listeners in subscription order, isolating failures.
    pub fn notify_all(&mut self) {
        for (id, listener) in &mut self.listeners {
            invoke_isolated(*id, listener);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn invoke_isolated(id: ListenerId, listener: &mut Listener) {
    if panic::catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
        error!(listener = id.0, "History listener panicked; continuing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn subscribe_invokes_immediately() {
        let mut set = ListenerSet::new();
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        set.subscribe(move || *counter.borrow_mut() += 1);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn notify_all_runs_in_subscription_order() {
        let mut set = ListenerSet::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let order = order.clone();
            set.subscribe(move || order.borrow_mut().push(name));
        }
        order.borrow_mut().clear();

        set.notify_all();
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_removes_listener() {
        let mut set = ListenerSet::new();
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        let id = set.subscribe(move || *counter.borrow_mut() += 1);
        assert_eq!(set.len(), 1);

        assert!(set.unsubscribe(id));
        assert!(set.is_empty());
        set.notify_all();
        assert_eq!(*calls.borrow(), 1); // only the initial call

        assert!(!set.unsubscribe(id)); // already gone
    }

    #[test]
    fn panicking_listener_does_not_break_others() {
        let mut set = ListenerSet::new();
        let calls = Rc::new(RefCell::new(0));

        set.subscribe(|| {});
        set.subscribe(|| panic!("broken observer"));
        let counter = calls.clone();
        set.subscribe(move || *counter.borrow_mut() += 1);
        assert_eq!(*calls.borrow(), 1);

        set.notify_all(); // must not propagate the panic
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn panic_during_subscribe_still_registers() {
        let mut set = ListenerSet::new();
        let id = set.subscribe(|| panic!("broken from the start"));
        assert_eq!(set.len(), 1);
        set.notify_all();
        assert!(set.unsubscribe(id));
    }
}
