/*

Input request state and forced input
====================================

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use super::events::lock_or_poisoned;

/** The keyboard request state of a window */
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputRequest {
    #[default]
    None,
    CharLatin1,
    CharUnicode,
    LineLatin1,
    LineUnicode,
}

impl InputRequest {
    pub fn is_char(&self) -> bool {
        matches!(self, InputRequest::CharLatin1 | InputRequest::CharUnicode)
    }

    pub fn is_line(&self) -> bool {
        matches!(self, InputRequest::LineLatin1 | InputRequest::LineUnicode)
    }

    pub fn is_some(&self) -> bool {
        *self != InputRequest::None
    }
}

/** A queue of programmatically fed input values. The host pushes values
    (with matching marker events); `select` pops them when a window has a
    matching request. Values with no matching request stay queued. */
pub struct ForcedInputQueue<T> {
    queue: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> Default for ForcedInputQueue<T> {
    fn default() -> Self {
        ForcedInputQueue {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }
}

impl<T> ForcedInputQueue<T> {
    pub fn push(&self, value: T) {
        lock_or_poisoned(&self.queue).push_back(value);
        self.available.notify_one();
    }

    pub fn pop(&self) -> T {
        let mut queue = lock_or_poisoned(&self.queue);
        loop {
            if let Some(value) = queue.pop_front() {
                return value;
            }
            queue = match self.available.wait(queue) {
                Ok(next) => next,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        lock_or_poisoned(&self.queue).pop_front()
    }

    pub fn is_pending(&self) -> bool {
        !lock_or_poisoned(&self.queue).is_empty()
    }

    pub fn clear(&self) {
        lock_or_poisoned(&self.queue).clear();
    }
}
