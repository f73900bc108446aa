/*

The event queue
===============

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use super::constants::*;
use super::windows::WinId;

/** Input events wait in the queue until the interpreter asks for them, so
    cap it rather than let a stuck worker accumulate them forever. */
pub const EVENT_QUEUE_MAX_LENGTH: usize = 100;

/** How long a producer will wait for space before dropping the event */
const PUSH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    CharInput,
    LineInput,
    MouseInput,
    Timer,
    Arrange,
    Redraw,
    SoundNotify,
    Hyperlink,
    /** Sentinel pushed by `stop()` so a blocked `select` observes the abort */
    Abort,
    /** Marker for a queued forced keypress; resolved inside `select` */
    ForcedCharInput,
    /** Marker for a queued forced line of input; resolved inside `select` */
    ForcedLineInput,
}

impl EventKind {
    /** Events spawned by the library itself, as opposed to player input.
        These are the only kinds `select_poll` may return. */
    pub fn is_internal(&self) -> bool {
        matches!(self, EventKind::Timer | EventKind::Arrange | EventKind::Redraw | EventKind::SoundNotify)
    }

    pub fn evtype(&self) -> u32 {
        match self {
            EventKind::CharInput => evtype_CharInput,
            EventKind::LineInput => evtype_LineInput,
            EventKind::MouseInput => evtype_MouseInput,
            EventKind::Timer => evtype_Timer,
            EventKind::Arrange => evtype_Arrange,
            EventKind::Redraw => evtype_Redraw,
            EventKind::SoundNotify => evtype_SoundNotify,
            EventKind::Hyperlink => evtype_Hyperlink,
            _ => evtype_None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub win: Option<WinId>,
    pub val1: u32,
    pub val2: u32,
}

impl Event {
    pub fn new(kind: EventKind, win: Option<WinId>, val1: u32, val2: u32) -> Self {
        Event {kind, win, val1, val2}
    }

    /** The numeric Glk event type, for C-facing event structs */
    pub fn evtype(&self) -> u32 {
        self.kind.evtype()
    }
}

struct QueueState {
    queue: VecDeque<Event>,
    open: bool,
}

/** A bounded multi-producer event queue. The worker thread is the only
    consumer; the UI thread and the host's input feeders are producers. */
pub struct EventQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl Default for EventQueue {
    fn default() -> Self {
        EventQueue::new(EVENT_QUEUE_MAX_LENGTH)
    }
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        EventQueue {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                open: true,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /** Append an event, waiting up to the push timeout for space. A full
        queue after the timeout, or a closed queue, drops the event. */
    pub fn push(&self, event: Event) {
        let deadline = Instant::now() + PUSH_TIMEOUT;
        let mut state = lock_or_poisoned(&self.state);
        while state.open && state.queue.len() >= self.capacity {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!("event queue full; dropping {:?} event", event.kind);
                return;
            }
            let (next, result) = self.wait_not_full(state, deadline - now);
            state = next;
            if result.timed_out() && state.queue.len() >= self.capacity {
                tracing::warn!("event queue full; dropping {:?} event", event.kind);
                return;
            }
        }
        if !state.open {
            return;
        }
        state.queue.push_back(event);
        self.not_empty.notify_one();
    }

    fn wait_not_full<'a>(&self, state: std::sync::MutexGuard<'a, QueueState>, timeout: Duration)
        -> (std::sync::MutexGuard<'a, QueueState>, std::sync::WaitTimeoutResult)
    {
        match self.not_full.wait_timeout(state, timeout) {
            Ok(res) => res,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /** Remove the first event, blocking until one arrives. A closed empty
        queue yields the abort sentinel so the consumer can never deadlock
        against a departed producer. */
    pub fn pop_blocking(&self) -> Event {
        let mut state = lock_or_poisoned(&self.state);
        loop {
            if let Some(event) = state.queue.pop_front() {
                self.not_full.notify_one();
                return event;
            }
            if !state.open {
                return Event::new(EventKind::Abort, None, 0, 0);
            }
            state = match self.not_empty.wait(state) {
                Ok(next) => next,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /** Remove and return only the first internally-spawned event, leaving
        player input in place for a later blocking select. */
    pub fn pop_poll(&self) -> Option<Event> {
        let mut state = lock_or_poisoned(&self.state);
        let pos = state.queue.iter().position(|event| event.kind.is_internal())?;
        let event = state.queue.remove(pos);
        self.not_full.notify_one();
        event
    }

    pub fn clear(&self) {
        let mut state = lock_or_poisoned(&self.state);
        state.queue.clear();
        self.not_full.notify_all();
    }

    /** Close the queue: producers drop silently, the consumer unblocks */
    pub fn close(&self) {
        let mut state = lock_or_poisoned(&self.state);
        state.open = false;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        lock_or_poisoned(&self.state).queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn lock_or_poisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_order() {
        let queue = EventQueue::default();
        queue.push(Event::new(EventKind::Timer, None, 1, 0));
        queue.push(Event::new(EventKind::CharInput, None, 2, 0));
        queue.push(Event::new(EventKind::Arrange, None, 3, 0));
        assert_eq!(queue.pop_blocking().val1, 1);
        assert_eq!(queue.pop_blocking().val1, 2);
        assert_eq!(queue.pop_blocking().val1, 3);
    }

    #[test]
    fn poll_skips_player_input() {
        let queue = EventQueue::default();
        queue.push(Event::new(EventKind::CharInput, None, 65, 0));
        queue.push(Event::new(EventKind::Timer, None, 0, 0));
        queue.push(Event::new(EventKind::Arrange, None, 0, 0));

        let polled = queue.pop_poll().unwrap();
        assert_eq!(polled.kind, EventKind::Timer);
        // The input event was not consumed
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_blocking().kind, EventKind::CharInput);
        assert_eq!(queue.pop_poll().unwrap().kind, EventKind::Arrange);
        assert!(queue.pop_poll().is_none());
    }

    #[test]
    fn events_expose_their_numeric_type() {
        assert_eq!(Event::new(EventKind::LineInput, None, 0, 0).evtype(), evtype_LineInput);
        assert_eq!(Event::new(EventKind::Timer, None, 0, 0).evtype(), evtype_Timer);
        assert_eq!(Event::new(EventKind::Hyperlink, None, 0, 0).evtype(), evtype_Hyperlink);
        // The abort sentinel and forced-input markers have no Glk type
        assert_eq!(Event::new(EventKind::Abort, None, 0, 0).evtype(), evtype_None);
        assert_eq!(Event::new(EventKind::ForcedCharInput, None, 0, 0).evtype(), evtype_None);
    }

    #[test]
    fn blocked_pop_wakes_on_push() {
        let queue = Arc::new(EventQueue::default());
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop_blocking())
        };
        thread::sleep(Duration::from_millis(50));
        queue.push(Event::new(EventKind::Redraw, None, 7, 0));
        let event = consumer.join().unwrap();
        assert_eq!(event.kind, EventKind::Redraw);
        assert_eq!(event.val1, 7);
    }

    #[test]
    fn full_queue_drops_after_timeout() {
        // A tiny capacity and no consumer: the push must return, not hang
        let queue = EventQueue::new(2);
        queue.push(Event::new(EventKind::Timer, None, 0, 0));
        queue.push(Event::new(EventKind::Timer, None, 1, 0));
        let start = Instant::now();
        queue.push(Event::new(EventKind::Timer, None, 2, 0));
        assert!(start.elapsed() >= PUSH_TIMEOUT);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn blocked_push_proceeds_when_space_opens() {
        let queue = Arc::new(EventQueue::new(1));
        queue.push(Event::new(EventKind::Timer, None, 0, 0));
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(Event::new(EventKind::Timer, None, 1, 0)))
        };
        thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.pop_blocking().val1, 0);
        producer.join().unwrap();
        assert_eq!(queue.pop_blocking().val1, 1);
    }

    #[test]
    fn closed_queue_returns_abort_sentinel() {
        let queue = EventQueue::default();
        queue.close();
        queue.push(Event::new(EventKind::Timer, None, 0, 0));
        assert_eq!(queue.pop_blocking().kind, EventKind::Abort);
        assert!(queue.is_empty());
    }
}
