use std::cell::RefCell;
use std::rc::Rc;
use std::rc::Weak;
use std::time::Duration;
use std::time::Instant;

use crate::host::Clipboard;
use crate::host::Document;
use crate::host::MemoryClipboard;
use crate::host::NodeId;
use crate::input::InputEvent;

/// A pointer-down observed at window level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerDownEvent {
    pub x: u16,
    pub y: u16,
    /// Deepest element under the pointer, if any.
    pub target: Option<NodeId>,
}

/// Mutable view of the host handed to listeners.
pub struct HostContext<'a> {
    pub document: &'a mut Document,
    pub clipboard: &'a mut dyn Clipboard,
    timers: &'a mut TimerQueue,
    now: Instant,
}

impl HostContext<'_> {
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Schedules `callback` to run `delay` after the current dispatch time.
    pub fn set_timeout(&mut self, delay: Duration, callback: impl FnOnce(&mut Document) + 'static) {
        self.timers.push(self.now + delay, Box::new(callback));
    }
}

type PointerDownListener = Box<dyn FnMut(&PointerDownEvent, &mut HostContext<'_>)>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    entries: Vec<(u64, PointerDownListener)>,
    dispatching: bool,
    removed_while_dispatching: Vec<u64>,
}

/// RAII guard for a window-level listener. Dropping it deregisters the listener.
#[must_use = "dropping this guard removes the listener"]
pub struct Subscription {
    registry: Weak<RefCell<ListenerRegistry>>,
    id: u64,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.borrow_mut();
        if registry.dispatching {
            registry.removed_while_dispatching.push(self.id);
        } else {
            registry.entries.retain(|(id, _)| *id != self.id);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(listener = self.id, "pointer-down listener removed");
    }
}

struct Timer {
    deadline: Instant,
    seq: u64,
    callback: Box<dyn FnOnce(&mut Document)>,
}

#[derive(Default)]
struct TimerQueue {
    next_seq: u64,
    pending: Vec<Timer>,
}

impl TimerQueue {
    fn push(&mut self, deadline: Instant, callback: Box<dyn FnOnce(&mut Document)>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Timer {
            deadline,
            seq,
            callback,
        });
    }

    fn take_due(&mut self, now: Instant) -> Vec<Timer> {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|t| t.deadline <= now);
        self.pending = pending;
        due.sort_by_key(|t| (t.deadline, t.seq));
        due
    }
}

/// The host a component is mounted into: element tree, window-level listeners, timers and
/// clipboard.
///
/// Nothing here runs on its own. The app forwards pointer-downs through
/// [`Window::dispatch_pointer_down`] (or [`Window::dispatch_input`]) and calls
/// [`Window::run_timers`] from its event loop.
pub struct Window {
    document: Document,
    clipboard: Box<dyn Clipboard>,
    timers: TimerQueue,
    listeners: Rc<RefCell<ListenerRegistry>>,
}

impl Default for Window {
    fn default() -> Self {
        Self::new(MemoryClipboard::new())
    }
}

impl Window {
    pub fn new(clipboard: impl Clipboard + 'static) -> Self {
        Self {
            document: Document::new(),
            clipboard: Box::new(clipboard),
            timers: TimerQueue::default(),
            listeners: Rc::new(RefCell::new(ListenerRegistry::default())),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Registers `listener` for every pointer-down dispatched to this window.
    pub fn add_pointer_down_listener(
        &mut self,
        listener: impl FnMut(&PointerDownEvent, &mut HostContext<'_>) + 'static,
    ) -> Subscription {
        let mut registry = self.listeners.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, Box::new(listener)));

        #[cfg(feature = "tracing")]
        tracing::trace!(listener = id, "pointer-down listener registered");

        Subscription {
            registry: Rc::downgrade(&self.listeners),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    /// Hit-tests `(x, y)` and invokes every registered listener. Returns the resolved target.
    pub fn dispatch_pointer_down(&mut self, x: u16, y: u16, now: Instant) -> Option<NodeId> {
        let event = PointerDownEvent {
            x,
            y,
            target: self.document.hit_test(x, y),
        };

        let mut entries = {
            let mut registry = self.listeners.borrow_mut();
            registry.dispatching = true;
            std::mem::take(&mut registry.entries)
        };

        {
            let mut ctx = HostContext {
                document: &mut self.document,
                clipboard: self.clipboard.as_mut(),
                timers: &mut self.timers,
                now,
            };
            for (_, listener) in entries.iter_mut() {
                listener(&event, &mut ctx);
            }
        }

        let mut registry = self.listeners.borrow_mut();
        registry.dispatching = false;
        let removed = std::mem::take(&mut registry.removed_while_dispatching);
        entries.retain(|(id, _)| !removed.contains(id));
        let added = std::mem::take(&mut registry.entries);
        entries.extend(added.into_iter().filter(|(id, _)| !removed.contains(id)));
        registry.entries = entries;

        event.target
    }

    /// Forwards left-button pointer-downs to [`Self::dispatch_pointer_down`]. Other events are
    /// ignored.
    pub fn dispatch_input(&mut self, event: &InputEvent, now: Instant) -> Option<NodeId> {
        match event {
            InputEvent::Mouse(m) if m.is_left_down() => self.dispatch_pointer_down(m.x, m.y, now),
            _ => None,
        }
    }

    pub fn set_timeout(
        &mut self,
        now: Instant,
        delay: Duration,
        callback: impl FnOnce(&mut Document) + 'static,
    ) {
        self.timers.push(now + delay, Box::new(callback));
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending.len()
    }

    /// Earliest pending deadline, useful for sizing an event-loop poll timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.pending.iter().map(|t| t.deadline).min()
    }

    /// Fires every timer due at `now`, in deadline order. Returns how many fired.
    pub fn run_timers(&mut self, now: Instant) -> usize {
        let due = self.timers.take_due(now);
        let fired = due.len();
        for timer in due {
            (timer.callback)(&mut self.document);
        }

        #[cfg(feature = "tracing")]
        if fired > 0 {
            tracing::trace!(fired, "timers fired");
        }

        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseEvent;
    use ratatui::layout::Rect;
    use std::cell::Cell;

    #[test]
    fn dropping_subscription_removes_listener() {
        let mut window = Window::default();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let sub = window.add_pointer_down_listener(move |_, _| counter.set(counter.get() + 1));
        assert_eq!(window.listener_count(), 1);

        let now = Instant::now();
        window.dispatch_pointer_down(0, 0, now);
        assert_eq!(hits.get(), 1);

        drop(sub);
        assert_eq!(window.listener_count(), 0);
        window.dispatch_pointer_down(0, 0, now);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn each_listener_sees_the_hit_target() {
        let mut window = Window::default();
        let root = window.document().root();
        let node = window
            .document_mut()
            .create_element(root, Rect::new(0, 0, 5, 1))
            .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&seen);
        let b = Rc::clone(&seen);
        let _s1 = window.add_pointer_down_listener(move |ev, _| a.borrow_mut().push(ev.target));
        let _s2 = window.add_pointer_down_listener(move |ev, _| b.borrow_mut().push(ev.target));

        let target = window.dispatch_input(
            &InputEvent::Mouse(MouseEvent::left_down(2, 0)),
            Instant::now(),
        );
        assert_eq!(target, Some(node));
        assert_eq!(*seen.borrow(), vec![Some(node), Some(node)]);
    }

    #[test]
    fn hover_is_not_a_pointer_down() {
        let mut window = Window::default();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let _sub = window.add_pointer_down_listener(move |_, _| counter.set(counter.get() + 1));
        window.dispatch_input(&InputEvent::Mouse(MouseEvent::moved(1, 1)), Instant::now());
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn listener_timers_fire_in_order_and_only_when_due() {
        let mut window = Window::default();
        let root = window.document().root();
        let node = window
            .document_mut()
            .create_element(root, Rect::new(0, 0, 1, 1))
            .unwrap();

        let _sub = window.add_pointer_down_listener(move |_, ctx| {
            ctx.set_timeout(Duration::from_secs(2), move |doc| {
                doc.set_attribute(node, "state", "late");
            });
            ctx.set_timeout(Duration::from_secs(1), move |doc| {
                doc.set_attribute(node, "state", "early");
            });
        });

        let t0 = Instant::now();
        window.dispatch_pointer_down(0, 0, t0);
        assert_eq!(window.pending_timers(), 2);
        assert_eq!(window.next_deadline(), Some(t0 + Duration::from_secs(1)));

        assert_eq!(window.run_timers(t0 + Duration::from_millis(500)), 0);
        assert_eq!(window.run_timers(t0 + Duration::from_secs(3)), 2);
        assert_eq!(window.document().attribute(node, "state"), Some("late"));
        assert_eq!(window.pending_timers(), 0);
    }

    #[test]
    fn listener_removed_during_dispatch_is_dropped_afterwards() {
        let mut window = Window::default();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let held = Rc::clone(&slot);
        let _first = window.add_pointer_down_listener(move |_, _| {
            held.borrow_mut().take();
        });
        let second = window.add_pointer_down_listener(|_, _| {});
        *slot.borrow_mut() = Some(second);
        assert_eq!(window.listener_count(), 2);

        window.dispatch_pointer_down(0, 0, Instant::now());
        assert_eq!(window.listener_count(), 1);
    }
}
