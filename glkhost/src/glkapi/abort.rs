/*

Abort and shutdown coordination
===============================

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

use std::sync::{Condvar, Mutex};

use super::events::lock_or_poisoned;

/** Why the worker thread is unwinding. Carried as a panic payload through
    the interpreter's frames and caught by the thread entry wrapper, since
    the interpreter code cannot be expected to propagate a Result. */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionTermination {
    /** The host asked the session to stop */
    Aborted,
    /** The interpreter called glk_exit() */
    Exited,
}

/** The abort flag, under its own lock so it can be set from any thread
    without touching the structural state. */
#[derive(Default)]
pub struct AbortFlag {
    flag: Mutex<bool>,
}

impl AbortFlag {
    pub fn signal(&self) {
        *lock_or_poisoned(&self.flag) = true;
    }

    pub fn is_signalled(&self) -> bool {
        *lock_or_poisoned(&self.flag)
    }

    pub fn reset(&self) {
        *lock_or_poisoned(&self.flag) = false;
    }
}

/** The final-keypress gate: after a normal exit the worker waits here until
    the player dismisses the session (or the host aborts it). */
#[derive(Default)]
pub struct ShutdownGate {
    pressed: Mutex<bool>,
    cond: Condvar,
}

impl ShutdownGate {
    pub fn notify(&self) {
        *lock_or_poisoned(&self.pressed) = true;
        self.cond.notify_all();
    }

    pub fn wait(&self) {
        let mut pressed = lock_or_poisoned(&self.pressed);
        while !*pressed {
            pressed = match self.cond.wait(pressed) {
                Ok(next) => next,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    pub fn reset(&self) {
        *lock_or_poisoned(&self.pressed) = false;
    }
}

struct ArrangeState {
    /** A resize has happened and no layout pass has run since */
    needs_rearrange: bool,
    /** The next layout pass must not push an Arrange event */
    ignore_next_arrange: bool,
}

/** The arrangement gate. The UI thread marks pending rearranges; the worker
    rendezvouses with the next completed layout pass before reading sizes. */
pub struct ArrangeGate {
    state: Mutex<ArrangeState>,
    rearranged: Condvar,
}

impl Default for ArrangeGate {
    fn default() -> Self {
        ArrangeGate {
            state: Mutex::new(ArrangeState {
                needs_rearrange: false,
                ignore_next_arrange: false,
            }),
            rearranged: Condvar::new(),
        }
    }
}

impl ArrangeGate {
    pub fn mark_needs_rearrange(&self) {
        lock_or_poisoned(&self.state).needs_rearrange = true;
    }

    pub fn needs_rearrange(&self) -> bool {
        lock_or_poisoned(&self.state).needs_rearrange
    }

    /** Called at the end of a layout pass. Returns whether the Arrange
        event should be suppressed. */
    pub fn layout_complete(&self) -> bool {
        let mut state = lock_or_poisoned(&self.state);
        state.needs_rearrange = false;
        let suppress = state.ignore_next_arrange;
        state.ignore_next_arrange = false;
        self.rearranged.notify_all();
        suppress
    }

    /** Make the next layout pass silent (used when the worker itself caused
        the relayout, e.g. by opening or closing a window). */
    pub fn suppress_next_arrange(&self) {
        lock_or_poisoned(&self.state).ignore_next_arrange = true;
    }

    /** Worker-side: wait until no rearrange is pending */
    pub fn wait_for_layout(&self) {
        let mut state = lock_or_poisoned(&self.state);
        while state.needs_rearrange {
            state = match self.rearranged.wait(state) {
                Ok(next) => next,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}
