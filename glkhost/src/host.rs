/*

The UI-thread host
==================

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

//! The embedder-facing half of a session. `GlkHost` lives on the UI thread:
//! it spawns the worker, drains the message bridge into a [`WidgetSystem`],
//! runs layout passes, and feeds player input back to the worker.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::glkapi::abort::SessionTermination;
use crate::glkapi::constants::WindowType;
use crate::glkapi::events::{lock_or_poisoned, Event, EventKind};
use crate::glkapi::input::InputRequest;
use crate::glkapi::messages::{Message, MessageKind, Reply};
use crate::glkapi::windows::{allocate_recurse, Rect, WinId};
use crate::glkapi::{GlkSession, SessionConfig};
use crate::plugin::{GlkPlugin, PluginError};
use crate::{GlkFileSystem, StdFileSystem};

#[derive(Error, Debug)]
pub enum HostError {
    #[error("session is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("failed to spawn the worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/** Widget mutation, called only from the UI thread. Every method has a
    no-op default so an embedder implements just what it renders. */
pub trait WidgetSystem {
    /** Create the widget for a window and report its measurement units
        (pixel width of a '0', pixel height of a line). */
    fn create_widget(&mut self, _win: WinId, _wintype: WindowType) -> (f64, f64) {
        (1.0, 1.0)
    }
    fn destroy_widget(&mut self, _win: WinId) {}
    fn print(&mut self, _win: WinId, _text: &str) {}
    fn clear(&mut self, _win: WinId) {}
    fn move_cursor(&mut self, _win: WinId, _x: u32, _y: u32) {}
    fn set_style(&mut self, _win: WinId, _style: u32) {}
    fn set_hyperlink(&mut self, _win: WinId, _linkval: u32) {}
    fn measure_style(&mut self, _win: WinId, _style: u32, _hint: u32) -> i64 {
        0
    }
    fn request_char_input(&mut self, _win: WinId, _unicode: bool) {}
    fn cancel_char_input(&mut self, _win: WinId) {}
    fn request_line_input(&mut self, _win: WinId, _maxlen: u32, _initial: &str,
                          _echo: bool, _terminators: &[u32]) {}
    /** Cancel line input and return the number of characters entered so far */
    fn cancel_line_input(&mut self, _win: WinId) -> i64 {
        0
    }
    fn char_input_forced(&mut self, _win: WinId, _keycode: u32) {}
    fn line_input_forced(&mut self, _win: WinId, _text: &str) {}
    fn draw_image(&mut self, _win: WinId, _image: u32, _val1: i32, _val2: i32) {}
    fn fill_rect(&mut self, _win: WinId, _color: u32, _x: i32, _y: i32, _width: u32, _height: u32) {}
    fn set_timer(&mut self, _millis: u32) {}
    fn shutdown_prompt(&mut self, _message: Option<&str>) {}
}

/** A widget system that renders nothing. Used headless and in tests. */
#[derive(Default)]
pub struct NullWidgets {}

impl WidgetSystem for NullWidgets {}

pub struct GlkHost {
    session: Arc<GlkSession>,
    widgets: Box<dyn WidgetSystem>,
    worker: Option<JoinHandle<()>>,
    /** SyncArrange messages waiting for the next completed layout pass */
    pending_syncs: Vec<Message>,
    width: f64,
    height: f64,
    stopped: bool,
}

impl GlkHost {
    pub fn new(config: SessionConfig, widgets: Box<dyn WidgetSystem>) -> Self {
        GlkHost::with_filesystem(config, widgets, Box::<StdFileSystem>::default())
    }

    pub fn with_filesystem(config: SessionConfig, widgets: Box<dyn WidgetSystem>,
                           filesystem: Box<dyn GlkFileSystem>) -> Self {
        GlkHost {
            session: Arc::new(GlkSession::new(config, filesystem)),
            widgets,
            worker: None,
            pending_syncs: vec![],
            width: 0.0,
            height: 0.0,
            stopped: false,
        }
    }

    pub fn session(&self) -> &Arc<GlkSession> {
        &self.session
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /** Load and run an interpreter plugin on the worker thread */
    pub fn run(&mut self, plugin: GlkPlugin, args: Vec<String>) -> Result<(), HostError> {
        plugin.check_entry()?;
        self.run_entry(move |_session| {
            match plugin.startup_code(&args) {
                Ok(true) => {
                    if let Err(err) = plugin.glk_main() {
                        tracing::error!("plugin entry failed: {err}");
                    }
                },
                Ok(false) => tracing::warn!("plugin startup code declined to run"),
                Err(err) => tracing::error!("plugin startup failed: {err}"),
            }
        })
    }

    /** Run a native entry point on the worker thread. The closure makes
        ordinary Glk calls against the session it is given. */
    pub fn run_entry(&mut self, entry: impl FnOnce(Arc<GlkSession>) + Send + 'static)
        -> Result<(), HostError>
    {
        if self.worker.is_some() {
            return Err(HostError::AlreadyRunning);
        }
        let session = self.session.clone();
        let handle = thread::Builder::new()
            .name("glk-worker".to_owned())
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| entry(session.clone())));
                match result {
                    // Returned without calling exit: run the normal shutdown
                    Ok(()) => session.shutdown(false),
                    Err(payload) => {
                        if payload.downcast_ref::<SessionTermination>().is_none() {
                            // A real panic in the interpreter. The session
                            // state is suspect, so skip the orderly teardown
                            // and just tell the UI we are done.
                            tracing::error!("interpreter thread panicked");
                            session.bridge.send(MessageKind::Shutdown, None);
                        }
                    },
                }
            })?;
        self.worker = Some(handle);
        Ok(())
    }

    /** Ask the session to stop. Wakes all three worker blocking points:
        the event queue, any message await (via the later drain), and the
        shutdown-keypress gate. */
    pub fn stop(&self) {
        self.session.abort.signal();
        self.session.events.push(Event::new(EventKind::Abort, None, 0, 0));
        self.session.shutdown_gate.notify();
    }

    /** Drain and perform everything the worker has queued. Call from the
        UI loop's idle handler. Returns true once the session has stopped. */
    pub fn process_pending(&mut self) -> bool {
        while let Some(msg) = self.session.bridge.try_recv() {
            if self.perform(msg) {
                self.stopped = true;
            }
        }
        self.stopped
    }

    /** Block until the worker has shut down, performing messages along the
        way. The final-keypress prompt is auto-confirmed while draining. */
    pub fn wait_for_exit(&mut self) {
        loop {
            let Some(msg) = self.session.bridge.recv_blocking() else { break };
            let was_prompt = matches!(msg.kind, MessageKind::ShutdownPrompt(_));
            let done = self.perform(msg);
            if was_prompt {
                self.session.shutdown_gate.notify();
            }
            if done {
                break;
            }
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("worker thread ended abnormally");
            }
        }
        self.session.bridge.close();
        self.stopped = true;
    }

    fn perform(&mut self, mut msg: Message) -> bool {
        let win = msg.win;
        match std::mem::replace(&mut msg.kind, MessageKind::Shutdown) {
            MessageKind::PrintString(text) => {
                if let Some(win) = win {
                    self.widgets.print(win, &text);
                }
            },
            MessageKind::CreateWindow {wintype} => {
                if let Some(win_id) = win {
                    let (unit_width, unit_height) = self.widgets.create_widget(win_id, wintype);
                    let state = self.session.lock_state();
                    if let Some(window) = state.windows.get(win_id) {
                        let mut size = lock_or_poisoned(&window.size);
                        size.unit_width = unit_width;
                        size.unit_height = unit_height;
                    }
                }
                msg.respond(Reply::Int(1));
            },
            MessageKind::DestroyWidget => {
                if let Some(win) = win {
                    self.widgets.destroy_widget(win);
                }
            },
            MessageKind::Arrange => self.arrange_now(false),
            MessageKind::ArrangeSilently => self.arrange_now(true),
            MessageKind::SyncArrange => {
                if self.session.arrange.needs_rearrange() {
                    self.pending_syncs.push(msg);
                }
                else {
                    msg.respond(Reply::Int(1));
                }
            },
            MessageKind::ClearWindow => {
                if let Some(win) = win {
                    self.widgets.clear(win);
                }
            },
            MessageKind::MoveCursor {x, y} => {
                if let Some(win) = win {
                    self.widgets.move_cursor(win, x, y);
                }
            },
            MessageKind::SetStyle(style) => {
                if let Some(win) = win {
                    self.widgets.set_style(win, style);
                }
            },
            MessageKind::SetHyperlink(linkval) => {
                if let Some(win) = win {
                    self.widgets.set_hyperlink(win, linkval);
                }
            },
            MessageKind::RequestCharInput {unicode} => {
                if let Some(win) = win {
                    self.widgets.request_char_input(win, unicode);
                }
            },
            MessageKind::CancelCharInput => {
                if let Some(win) = win {
                    self.widgets.cancel_char_input(win);
                }
            },
            MessageKind::ForceCharInput(keycode) => {
                if let Some(win) = win {
                    self.widgets.char_input_forced(win, keycode);
                }
            },
            MessageKind::RequestLineInput {maxlen, initial, echo, terminators, ..} => {
                if let Some(win) = win {
                    self.widgets.request_line_input(win, maxlen, &initial, echo, &terminators);
                }
            },
            MessageKind::CancelLineInput => {
                let count = win.map_or(0, |win| self.widgets.cancel_line_input(win));
                msg.respond(Reply::Int(count));
            },
            MessageKind::ForceLineInput(text) => {
                if let Some(win) = win {
                    self.widgets.line_input_forced(win, &text);
                }
                msg.respond(Reply::Int(text.chars().count() as i64));
            },
            MessageKind::DrawImage {image, val1, val2} => {
                if let Some(win) = win {
                    self.widgets.draw_image(win, image, val1, val2);
                }
            },
            MessageKind::FillRect {color, x, y, width, height} => {
                if let Some(win) = win {
                    self.widgets.fill_rect(win, color, x, y, width, height);
                }
            },
            MessageKind::MeasureStyle {style, hint} => {
                let measured = win.map_or(0, |win| self.widgets.measure_style(win, style, hint));
                msg.respond(Reply::Int(measured));
            },
            MessageKind::SetTimer(millis) => {
                self.widgets.set_timer(millis);
            },
            MessageKind::ShutdownPrompt(message) => {
                self.widgets.shutdown_prompt(message.as_deref());
            },
            MessageKind::Shutdown => return true,
        }
        false
    }

    /** The layout pass. Allocates the whole tree top-down, answers waiting
        SyncArrange rendezvous, and pushes an Arrange event if any window
        visibly changed size (unless this pass was marked silent). */
    fn arrange_now(&mut self, silent: bool) {
        if silent {
            self.session.arrange.suppress_next_arrange();
        }
        let arrange = {
            let mut state = self.session.lock_state();
            let spacing = state.spacing;
            let rect = Rect::new(0.0, 0.0, self.width, self.height);
            state.root_window
                .and_then(|root| allocate_recurse(&mut state.windows, root, rect, spacing))
        };
        let suppressed = self.session.arrange.layout_complete();
        for mut msg in self.pending_syncs.drain(..) {
            msg.respond(Reply::Int(1));
        }
        if !suppressed {
            if let Some(changed) = arrange {
                let root = self.session.lock_state().root_window;
                // An event window of None means "everything changed"
                let win = if Some(changed) == root {None} else {Some(changed)};
                self.session.events.push(Event::new(EventKind::Arrange, win, 0, 0));
            }
        }
    }

    /** The toplevel was resized. Runs a layout pass immediately. */
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.session.arrange.mark_needs_rearrange();
        self.arrange_now(false);
    }

    // Programmatic input

    /** Queue a keypress as if the player had typed it. With a target window
        the key waits for that window's character request; with `None` it goes
        to whichever window next has one pending. */
    pub fn feed_char_input(&self, win: Option<WinId>, keycode: u32) {
        self.session.forced_char.push(keycode);
        self.session.events.push(Event::new(EventKind::ForcedCharInput, win, 0, 0));
    }

    /** Queue a line of input for a pending line request */
    pub fn feed_line_input(&self, win: Option<WinId>, text: &str) {
        self.session.forced_line.push(text.to_owned());
        self.session.events.push(Event::new(EventKind::ForcedLineInput, win, 0, 0));
    }

    // Real player input, reported by the widget system's signal handlers

    /** A key was pressed in a window. Consumed only if the window has a
        pending character request. */
    pub fn key_pressed(&self, win_id: WinId, keycode: u32) -> bool {
        let consumed = {
            let mut state = self.session.lock_state();
            match state.windows.get_mut(win_id) {
                Some(win) if win.input.is_char() => {
                    win.input = InputRequest::None;
                    true
                },
                _ => false,
            }
        };
        if consumed {
            self.session.events.push(Event::new(EventKind::CharInput, Some(win_id), keycode, 0));
        }
        consumed
    }

    /** A full line was entered in a window with a pending line request */
    pub fn line_entered(&self, win_id: WinId, text: &str) -> bool {
        let count = {
            let mut state = self.session.lock_state();
            match state.windows.get_mut(win_id) {
                Some(win) if win.input.is_line() => {
                    let text: String = text.chars().take(win.line_input_max as usize).collect();
                    let count = text.chars().count() as u32;
                    win.input = InputRequest::None;
                    win.line_input_max = 0;
                    win.last_line_input = Some(text);
                    Some(count)
                },
                _ => None,
            }
        };
        match count {
            Some(count) => {
                self.session.events.push(Event::new(EventKind::LineInput, Some(win_id), count, 0));
                true
            },
            None => false,
        }
    }

    pub fn mouse_clicked(&self, win_id: WinId, x: u32, y: u32) -> bool {
        let consumed = {
            let mut state = self.session.lock_state();
            match state.windows.get_mut(win_id) {
                Some(win) if win.mouse_request => {
                    win.mouse_request = false;
                    true
                },
                _ => false,
            }
        };
        if consumed {
            self.session.events.push(Event::new(EventKind::MouseInput, Some(win_id), x, y));
        }
        consumed
    }

    pub fn hyperlink_clicked(&self, win_id: WinId, linkval: u32) -> bool {
        let consumed = {
            let mut state = self.session.lock_state();
            match state.windows.get_mut(win_id) {
                Some(win) if win.hyperlink_request => {
                    win.hyperlink_request = false;
                    true
                },
                _ => false,
            }
        };
        if consumed {
            self.session.events.push(Event::new(EventKind::Hyperlink, Some(win_id), linkval, 0));
        }
        consumed
    }

    /** The player dismissed the final shutdown prompt */
    pub fn confirm_shutdown(&self) {
        self.session.shutdown_gate.notify();
    }

    /** The embedder's timer fired. Pushes a Timer event if the interpreter
        still wants them. */
    pub fn fire_timer(&self) {
        if self.session.lock_state().timer_interval != 0 {
            self.session.events.push(Event::new(EventKind::Timer, None, 0, 0));
        }
    }
}
