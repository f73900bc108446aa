/*

The UI message bridge
=====================

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use super::events::lock_or_poisoned;
use super::windows::WinId;

/** Payloads of the messages the worker thread sends to the UI thread. Each
    variant is one widget-affecting operation; anything a variant needs
    travels in the variant, never through shared state. */
#[derive(Debug)]
pub enum MessageKind {
    PrintString(String),
    CreateWindow {
        wintype: super::constants::WindowType,
    },
    DestroyWidget,
    /** Recompute the layout and push an Arrange event */
    Arrange,
    /** Recompute the layout without telling the interpreter */
    ArrangeSilently,
    /** Replied (with 1) only after the next completed layout pass */
    SyncArrange,
    ClearWindow,
    MoveCursor {
        x: u32,
        y: u32,
    },
    SetStyle(u32),
    SetHyperlink(u32),
    RequestCharInput {
        unicode: bool,
    },
    CancelCharInput,
    /** Echo a forced keypress as if the player had typed it */
    ForceCharInput(u32),
    RequestLineInput {
        maxlen: u32,
        initial: String,
        unicode: bool,
        /** Whether the entered text stays in the buffer afterwards */
        echo: bool,
        /** Extra keycodes that complete the input, besides Return */
        terminators: Vec<u32>,
    },
    /** Replied with the number of characters in the input so far */
    CancelLineInput,
    /** Insert forced text into the input area and confirm it; replied once
        the text has been echoed */
    ForceLineInput(String),
    DrawImage {
        image: u32,
        val1: i32,
        val2: i32,
    },
    FillRect {
        color: u32,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    /** Replied with the measured metric value */
    MeasureStyle {
        style: u32,
        hint: u32,
    },
    SetTimer(u32),
    /** Show the final "press any key" prompt */
    ShutdownPrompt(Option<String>),
    /** Always the last message of a session */
    Shutdown,
}

/** A reply travelling back over a message's reply slot */
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Int(i64),
    Str(Option<String>),
}

impl Reply {
    /** Lenient extraction; a mistyped reply degrades to the default */
    pub fn into_int(self) -> i64 {
        match self {
            Reply::Int(val) => val,
            Reply::Str(_) => 0,
        }
    }

    pub fn into_str(self) -> Option<String> {
        match self {
            Reply::Str(val) => val,
            Reply::Int(_) => None,
        }
    }
}

/** A one-shot rendezvous for a message's reply. Only `send_and_await`
    creates these, so a fire-and-forget message can never be awaited. */
pub struct ReplySlot {
    value: Mutex<Option<Reply>>,
    filled: Condvar,
}

impl ReplySlot {
    fn new() -> Arc<Self> {
        Arc::new(ReplySlot {
            value: Mutex::new(None),
            filled: Condvar::new(),
        })
    }

    /** First write wins; later fills are ignored */
    pub fn fill(&self, reply: Reply) {
        let mut value = lock_or_poisoned(&self.value);
        if value.is_none() {
            *value = Some(reply);
            self.filled.notify_all();
        }
    }

    fn fill_default(&self) {
        self.fill(Reply::Int(0));
    }

    fn wait(&self) -> Reply {
        let mut value = lock_or_poisoned(&self.value);
        loop {
            if let Some(reply) = value.take() {
                return reply;
            }
            value = match self.filled.wait(value) {
                Ok(next) => next,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

pub struct Message {
    pub kind: MessageKind,
    pub win: Option<WinId>,
    reply: Option<Arc<ReplySlot>>,
}

impl Message {
    /** Take the reply slot in order to respond. Handlers that don't call
        this still unblock the waiter: dropping the message fills the
        default. */
    pub fn take_reply_slot(&mut self) -> Option<Arc<ReplySlot>> {
        self.reply.take()
    }

    pub fn respond(&mut self, reply: Reply) {
        if let Some(slot) = self.reply.take() {
            slot.fill(reply);
        }
    }
}

impl Drop for Message {
    fn drop(&mut self) {
        if let Some(slot) = self.reply.take() {
            slot.fill_default();
        }
    }
}

struct BridgeState {
    queue: VecDeque<Message>,
    open: bool,
}

/** The unbounded worker-to-UI message queue, with optional per-message
    synchronous replies. */
pub struct MessageBridge {
    state: Mutex<BridgeState>,
    not_empty: Condvar,
}

impl Default for MessageBridge {
    fn default() -> Self {
        MessageBridge {
            state: Mutex::new(BridgeState {
                queue: VecDeque::new(),
                open: true,
            }),
            not_empty: Condvar::new(),
        }
    }
}

impl MessageBridge {
    /** Fire and forget. Silently dropped once the bridge is closed. */
    pub fn send(&self, kind: MessageKind, win: Option<WinId>) {
        let mut state = lock_or_poisoned(&self.state);
        if !state.open {
            return;
        }
        state.queue.push_back(Message {kind, win, reply: None});
        self.not_empty.notify_one();
    }

    /** Send and block until the UI thread replies with an integer. Returns
        0 without blocking if the bridge is closed. */
    pub fn send_and_await_int(&self, kind: MessageKind, win: Option<WinId>) -> i64 {
        self.send_and_await(kind, win).map_or(0, Reply::into_int)
    }

    /** As `send_and_await_int`, for string replies */
    pub fn send_and_await_string(&self, kind: MessageKind, win: Option<WinId>) -> Option<String> {
        self.send_and_await(kind, win).and_then(Reply::into_str)
    }

    fn send_and_await(&self, kind: MessageKind, win: Option<WinId>) -> Option<Reply> {
        let slot = ReplySlot::new();
        {
            let mut state = lock_or_poisoned(&self.state);
            if !state.open {
                return None;
            }
            state.queue.push_back(Message {
                kind,
                win,
                reply: Some(slot.clone()),
            });
            self.not_empty.notify_one();
        }
        Some(slot.wait())
    }

    /** Non-blocking receive, for the UI thread's idle drain */
    pub fn try_recv(&self) -> Option<Message> {
        lock_or_poisoned(&self.state).queue.pop_front()
    }

    /** Blocking receive, for the UI-side shutdown drain. `None` once the
        bridge is closed and empty. */
    pub fn recv_blocking(&self) -> Option<Message> {
        let mut state = lock_or_poisoned(&self.state);
        loop {
            if let Some(msg) = state.queue.pop_front() {
                return Some(msg);
            }
            if !state.open {
                return None;
            }
            state = match self.not_empty.wait(state) {
                Ok(next) => next,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /** Close the bridge and release anyone awaiting a queued reply */
    pub fn close(&self) {
        let drained: Vec<Message> = {
            let mut state = lock_or_poisoned(&self.state);
            state.open = false;
            self.not_empty.notify_all();
            state.queue.drain(..).collect()
        };
        // Dropping outside the lock fills the default replies
        drop(drained);
    }

    pub fn len(&self) -> usize {
        lock_or_poisoned(&self.state).queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
