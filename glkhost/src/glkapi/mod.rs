/*

The Glk session
===============

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

//! The worker-thread side of the Glk API: object lifecycles, the window
//! tree, output buffering, input requests, and the shutdown protocol. All
//! widget work is forwarded over the message bridge to the UI thread.

pub mod abort;
pub mod common;
pub mod constants;
pub mod events;
pub mod filerefs;
pub mod input;
pub(crate) mod macros;
pub mod messages;
pub mod objects;
pub mod streams;
pub mod windows;

use std::panic::resume_unwind;
use std::sync::{Mutex, MutexGuard};

use abort::{AbortFlag, ArrangeGate, SessionTermination, ShutdownGate};
use common::*;
use constants::*;
use events::{lock_or_poisoned, Event, EventKind, EventQueue};
use filerefs::{filename_for_name, FileRef, FrefId};
use input::{ForcedInputQueue, InputRequest};
use macros::*;
use messages::{MessageBridge, MessageKind};
use objects::GlkObjectStore;
use streams::{Stream, StreamData, StreamResult, StrId};
use windows::*;

use crate::{GlkFileSystem, ResourceMap};
use GlkApiError::*;

/** Session options fixed at construction */
pub struct SessionConfig {
    /** Interactive sessions wait for a final keypress before shutting down */
    pub interactive: bool,
    /** Pixel gap between bordered split children */
    pub spacing: f64,
    /** Extra text for the shutdown prompt */
    pub final_message: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            interactive: true,
            spacing: 0.0,
            final_message: None,
        }
    }
}

/** Everything guarded by the session-wide structural lock */
pub struct SessionState {
    pub windows: GlkObjectStore<Window>,
    pub streams: GlkObjectStore<Stream>,
    pub filerefs: GlkObjectStore<FileRef>,
    pub root_window: Option<WinId>,
    pub current_stream: Option<StrId>,
    pub timer_interval: u32,
    pub spacing: f64,
    interrupt_handler: Option<Box<dyn FnOnce() + Send>>,
    resource_map: Option<Box<dyn ResourceMap>>,
    filesystem: Box<dyn GlkFileSystem>,
}

/** One Glk session, shared between the worker and UI threads */
pub struct GlkSession {
    pub bridge: MessageBridge,
    pub events: EventQueue,
    pub abort: AbortFlag,
    pub arrange: ArrangeGate,
    pub shutdown_gate: ShutdownGate,
    pub forced_char: ForcedInputQueue<u32>,
    pub forced_line: ForcedInputQueue<String>,
    state: Mutex<SessionState>,
    interactive: bool,
    final_message: Option<String>,
}

impl GlkSession {
    pub fn new(config: SessionConfig, filesystem: Box<dyn GlkFileSystem>) -> Self {
        GlkSession {
            bridge: MessageBridge::default(),
            events: EventQueue::default(),
            abort: AbortFlag::default(),
            arrange: ArrangeGate::default(),
            shutdown_gate: ShutdownGate::default(),
            forced_char: ForcedInputQueue::default(),
            forced_line: ForcedInputQueue::default(),
            state: Mutex::new(SessionState {
                windows: GlkObjectStore::new(),
                streams: GlkObjectStore::new(),
                filerefs: GlkObjectStore::new(),
                root_window: None,
                current_stream: None,
                timer_interval: 0,
                spacing: config.spacing,
                interrupt_handler: None,
                resource_map: None,
                filesystem,
            }),
            interactive: config.interactive,
            final_message: config.final_message,
        }
    }

    pub fn lock_state(&self) -> MutexGuard<SessionState> {
        lock_or_poisoned(&self.state)
    }

    // Windows

    pub fn window_open(&self, splitwin: Option<WinId>, method: u32, size: u32,
                       wintype: u32, rock: u32) -> Option<WinId> {
        forgiving!(self.try_window_open(splitwin, method, size, wintype, rock), None)
    }

    fn try_window_open(&self, splitwin: Option<WinId>, method: u32, size: u32,
                       wintype: u32, rock: u32) -> GlkResult<Option<WinId>> {
        let wintype = window_type(wintype)?;

        let win_id = {
            let mut state = self.lock_state();
            match (state.root_window, splitwin) {
                (None, Some(_)) => return Err(SplitMustBeNull),
                (Some(_), None) => return Err(InvalidSplitwin),
                (Some(_), Some(split_id)) => {
                    if !state.windows.contains(split_id) {
                        return Err(InvalidSplitwin);
                    }
                    let (division, ..) = validate_winmethod(method, wintype)?;
                    if division == winmethod_Proportional && size > 100 {
                        return Err(InvalidProportion);
                    }
                },
                (None, None) => {},
            }
            let win = Window::new(WindowData::for_wintype(wintype), wintype);
            // Register first so the stream can point back at the window
            let win_id = state.windows.register(win, rock);
            let str_id = state.streams.register(Stream::window(win_id), 0);
            if let Some(win) = state.windows.get_mut(win_id) {
                win.stream = Some(str_id);
            }
            win_id
        };

        // The widget must exist (and report its units) before any splice,
        // so await its creation with the structural lock released
        self.bridge.send_and_await_int(MessageKind::CreateWindow {wintype}, Some(win_id));
        self.tick();

        {
            let mut state = self.lock_state();
            match splitwin {
                None => {
                    state.root_window = Some(win_id);
                },
                Some(split_id) => {
                    // The split window may have been closed while we waited
                    let Some(split) = state.windows.get(split_id) else {
                        self.discard_halfmade_window(&mut state, win_id);
                        return Err(InvalidSplitwin);
                    };
                    let grandparent = split.parent;
                    let mut pairdata = PairWindow::new(method, size);
                    pairdata.key = Some(win_id);
                    if pairdata.constrained_first() {
                        pairdata.child1 = Some(win_id);
                        pairdata.child2 = Some(split_id);
                    }
                    else {
                        pairdata.child1 = Some(split_id);
                        pairdata.child2 = Some(win_id);
                    }
                    let mut pairwin = Window::new(pairdata.into(), WindowType::Pair);
                    pairwin.parent = grandparent;
                    let pair_id = state.windows.register(pairwin, 0);
                    if let Some(win) = state.windows.get_mut(win_id) {
                        win.parent = Some(pair_id);
                    }
                    if let Some(split) = state.windows.get_mut(split_id) {
                        split.parent = Some(pair_id);
                    }
                    match grandparent {
                        Some(gp_id) => {
                            if let Some(WindowData::Pair(gp)) = state.windows.get_mut(gp_id).map(|win| &mut win.data) {
                                gp.replace_child(split_id, pair_id);
                            }
                        },
                        None => {
                            state.root_window = Some(pair_id);
                        },
                    }
                },
            }
        }

        self.bridge.send(MessageKind::ArrangeSilently, None);
        Ok(Some(win_id))
    }

    fn discard_halfmade_window(&self, state: &mut SessionState, win_id: WinId) {
        if let Some(win) = state.windows.unregister(win_id) {
            if let Some(str_id) = win.stream {
                state.streams.unregister(str_id);
            }
        }
        self.bridge.send(MessageKind::DestroyWidget, Some(win_id));
    }

    pub fn window_close(&self, win_id: WinId) -> Option<StreamResult> {
        forgiving!(self.try_window_close(win_id), None)
    }

    fn try_window_close(&self, win_id: WinId) -> GlkResult<Option<StreamResult>> {
        // Settle any pending resize so the final arrangement is current
        self.sync_arrange();

        let mut state = self.lock_state();
        let win = state.windows.get(win_id).ok_or(InvalidReference)?;
        let parent = win.parent;
        let own_stream = win.stream;

        let result = own_stream
            .and_then(|str_id| state.streams.get(str_id))
            .map(|stream| stream.result())
            .unwrap_or_default();

        let mut doomed = subtree_ids(&state.windows, win_id);

        // Splice the sibling into the grandparent's place
        match parent {
            Some(pair_id) => {
                let sibling = match state.windows.get(pair_id).map(|win| &win.data) {
                    Some(WindowData::Pair(pair)) => pair.sibling_of(win_id),
                    _ => None,
                };
                let sibling = sibling.ok_or(InvalidReference)?;
                let grandparent = state.windows.get(pair_id).and_then(|win| win.parent);
                if let Some(sib) = state.windows.get_mut(sibling) {
                    sib.parent = grandparent;
                }
                match grandparent {
                    Some(gp_id) => {
                        if let Some(WindowData::Pair(gp)) = state.windows.get_mut(gp_id).map(|win| &mut win.data) {
                            gp.replace_child(pair_id, sibling);
                        }
                    },
                    None => {
                        state.root_window = Some(sibling);
                    },
                }
                doomed.push(pair_id);
            },
            None => {
                state.root_window = None;
            },
        }

        // Any surviving pair keyed on a doomed window loses its key: its
        // fixed split will size to zero from now on
        for id in state.windows.ids() {
            if doomed.contains(&id) {
                continue;
            }
            if let Some(WindowData::Pair(pair)) = state.windows.get_mut(id).map(|win| &mut win.data) {
                if pair.key.is_some_and(|key| doomed.contains(&key)) {
                    pair.key = None;
                }
            }
        }

        for &id in &doomed {
            let Some(win) = state.windows.unregister(id) else { continue };
            if win.wintype != WindowType::Pair {
                self.bridge.send(MessageKind::DestroyWidget, Some(id));
            }
            if let Some(str_id) = win.stream {
                if state.current_stream == Some(str_id) {
                    state.current_stream = None;
                }
                state.streams.unregister(str_id);
            }
        }

        drop(state);
        self.bridge.send(MessageKind::ArrangeSilently, None);
        Ok(Some(result))
    }

    pub fn window_get_size(&self, win_id: WinId) -> (u32, u32) {
        forgiving!(self.try_window_get_size(win_id), (0, 0))
    }

    fn try_window_get_size(&self, win_id: WinId) -> GlkResult<(u32, u32)> {
        {
            let state = self.lock_state();
            let win = win!(state, win_id);
            if matches!(win.wintype, WindowType::Blank | WindowType::Pair) {
                return Ok((0, 0));
            }
        }
        // Rendezvous with the layout pass so a resize already seen by the
        // UI thread is reflected in what we report
        self.sync_arrange();
        let state = self.lock_state();
        let win = win!(state, win_id);
        let size = win.size();
        Ok(match (&win.data, win.wintype) {
            (WindowData::Grid(grid), _) => (grid.width as u32, grid.height as u32),
            (_, WindowType::Buffer) => (
                (size.width / size.unit_width) as u32,
                (size.height / size.unit_height) as u32,
            ),
            (_, WindowType::Graphics) => (size.width as u32, size.height as u32),
            _ => (0, 0),
        })
    }

    pub fn window_get_arrangement(&self, win_id: WinId) -> Option<(u32, u32, Option<WinId>)> {
        forgiving!(self.try_window_get_arrangement(win_id), None)
    }

    fn try_window_get_arrangement(&self, win_id: WinId) -> GlkResult<Option<(u32, u32, Option<WinId>)>> {
        self.sync_arrange();
        let state = self.lock_state();
        match &win!(state, win_id).data {
            WindowData::Pair(pair) => Ok(Some((pair.split_method, pair.constraint_size, pair.key))),
            _ => Err(NotAPairWindow),
        }
    }

    pub fn window_set_arrangement(&self, win_id: WinId, method: u32, size: u32, keywin: Option<WinId>) {
        forgiving!(self.try_window_set_arrangement(win_id, method, size, keywin), ())
    }

    fn try_window_set_arrangement(&self, win_id: WinId, method: u32, size: u32,
                                  keywin: Option<WinId>) -> GlkResult<()> {
        self.sync_arrange();
        let mut state = self.lock_state();
        {
            let win = win!(state, win_id);
            if !matches!(win.data, WindowData::Pair(_)) {
                return Err(NotAPairWindow);
            }
        }
        if let Some(key_id) = keywin {
            let key = win!(state, key_id);
            if key.wintype == WindowType::Pair {
                return Err(SplitCantBePair);
            }
            validate_winmethod(method, key.wintype)?;
            if !subtree_ids(&state.windows, win_id).contains(&key_id) {
                return Err(KeyWindowNotDescendant);
            }
        }
        if (method & winmethod_DivisionMask) == winmethod_Proportional && size > 100 {
            return Err(InvalidProportion);
        }
        if let Some(WindowData::Pair(pair)) = state.windows.get_mut(win_id).map(|win| &mut win.data) {
            pair.split_method = method;
            pair.constraint_size = size;
            if keywin.is_some() {
                // The key may move to the other child of the pair; the
                // resulting layout can be surprising but is accepted
                pair.key = keywin;
            }
        }
        drop(state);
        self.bridge.send(MessageKind::ArrangeSilently, None);
        Ok(())
    }

    pub fn window_get_root(&self) -> Option<WinId> {
        self.lock_state().root_window
    }

    pub fn window_get_parent(&self, win_id: WinId) -> Option<WinId> {
        forgiving!(self.try_window_get_parent(win_id), None)
    }

    fn try_window_get_parent(&self, win_id: WinId) -> GlkResult<Option<WinId>> {
        let state = self.lock_state();
        Ok(win!(state, win_id).parent)
    }

    pub fn window_get_sibling(&self, win_id: WinId) -> Option<WinId> {
        forgiving!(self.try_window_get_sibling(win_id), None)
    }

    fn try_window_get_sibling(&self, win_id: WinId) -> GlkResult<Option<WinId>> {
        let state = self.lock_state();
        let parent = win!(state, win_id).parent;
        Ok(parent.and_then(|pair_id| {
            match state.windows.get(pair_id).map(|win| &win.data) {
                Some(WindowData::Pair(pair)) => pair.sibling_of(win_id),
                _ => None,
            }
        }))
    }

    pub fn window_get_type(&self, win_id: WinId) -> u32 {
        let state = self.lock_state();
        state.windows.get(win_id).map_or(0, |win| win.wintype as u32)
    }

    pub fn window_get_rock(&self, win_id: WinId) -> u32 {
        self.lock_state().windows.rock(win_id).unwrap_or(0)
    }

    pub fn window_get_stream(&self, win_id: WinId) -> Option<StrId> {
        self.lock_state().windows.get(win_id).and_then(|win| win.stream)
    }

    pub fn window_iterate(&self, prev: Option<WinId>) -> Option<(WinId, u32)> {
        self.lock_state().windows.iterate(prev).map(|result| (result.id, result.rock))
    }

    pub fn window_clear(&self, win_id: WinId) {
        forgiving!(self.try_window_clear(win_id), ())
    }

    fn try_window_clear(&self, win_id: WinId) -> GlkResult<()> {
        let mut state = self.lock_state();
        {
            let win = win_mut!(state, win_id);
            if win.input.is_line() {
                return Err(PendingKeyboardRequest);
            }
            win.data.clear();
            // Clearing supersedes whatever is buffered
            win.pending_text.clear();
        }
        self.queue_message(&mut state, MessageKind::ClearWindow, Some(win_id));
        Ok(())
    }

    pub fn window_move_cursor(&self, win_id: WinId, x: u32, y: u32) {
        forgiving!(self.try_window_move_cursor(win_id, x, y), ())
    }

    fn try_window_move_cursor(&self, win_id: WinId, x: u32, y: u32) -> GlkResult<()> {
        self.sync_arrange();
        let mut state = self.lock_state();
        match &mut win_mut!(state, win_id).data {
            WindowData::Grid(grid) => grid.move_cursor(x, y),
            _ => return Err(InvalidWindowType),
        }
        self.queue_message(&mut state, MessageKind::MoveCursor {x, y}, Some(win_id));
        Ok(())
    }

    pub fn window_set_echo_stream(&self, win_id: WinId, str_id: Option<StrId>) {
        forgiving!(self.try_window_set_echo_stream(win_id, str_id), ())
    }

    fn try_window_set_echo_stream(&self, win_id: WinId, str_id: Option<StrId>) -> GlkResult<()> {
        let mut state = self.lock_state();
        if let Some(str_id) = str_id {
            if !state.streams.contains(str_id) {
                return Err(InvalidReference);
            }
            if state.windows.get(win_id).and_then(|win| win.stream) == Some(str_id) {
                tracing::warn!("refusing to echo a window to its own stream");
                return Ok(());
            }
        }
        win_mut!(state, win_id).echo_stream = str_id;
        Ok(())
    }

    pub fn window_get_echo_stream(&self, win_id: WinId) -> Option<StrId> {
        self.lock_state().windows.get(win_id).and_then(|win| win.echo_stream)
    }

    // Graphics

    pub fn window_fill_rect(&self, win_id: WinId, color: u32, x: i32, y: i32, width: u32, height: u32) {
        forgiving!(self.try_graphics_op(win_id, MessageKind::FillRect {color, x, y, width, height}), ())
    }

    pub fn window_draw_image(&self, win_id: WinId, image: u32, val1: i32, val2: i32) {
        let mut state = self.lock_state();
        let kind = MessageKind::DrawImage {image, val1, val2};
        match state.windows.get(win_id).map(|win| win.wintype) {
            Some(WindowType::Graphics) | Some(WindowType::Buffer) => {
                self.queue_message(&mut state, kind, Some(win_id));
            },
            _ => tracing::warn!("draw_image on a non-drawable window"),
        }
    }

    fn try_graphics_op(&self, win_id: WinId, kind: MessageKind) -> GlkResult<()> {
        let mut state = self.lock_state();
        if win!(state, win_id).wintype != WindowType::Graphics {
            return Err(InvalidWindowType);
        }
        self.queue_message(&mut state, kind, Some(win_id));
        Ok(())
    }

    pub fn measure_style(&self, win_id: WinId, style: u32, hint: u32) -> i64 {
        let measured = self.bridge.send_and_await_int(MessageKind::MeasureStyle {style, hint}, Some(win_id));
        self.tick();
        measured
    }

    // Input requests

    pub fn request_char_event(&self, win_id: WinId, unicode: bool) {
        forgiving!(self.try_request_char_event(win_id, unicode), ())
    }

    fn try_request_char_event(&self, win_id: WinId, unicode: bool) -> GlkResult<()> {
        let mut state = self.lock_state();
        {
            let win = win_mut!(state, win_id);
            if win.input.is_some() {
                return Err(PendingKeyboardRequest);
            }
            if !win.accepts_char_input() {
                return Err(WindowDoesntSupportCharInput);
            }
            win.input = if unicode {InputRequest::CharUnicode} else {InputRequest::CharLatin1};
        }
        self.queue_message(&mut state, MessageKind::RequestCharInput {unicode}, Some(win_id));
        drop(state);
        // A forced keypress may already be waiting for this request
        if self.forced_char.is_pending() {
            self.events.push(Event::new(EventKind::ForcedCharInput, Some(win_id), 0, 0));
        }
        Ok(())
    }

    pub fn cancel_char_event(&self, win_id: WinId) {
        let mut state = self.lock_state();
        let Some(win) = state.windows.get_mut(win_id) else {
            tracing::warn!("cancel_char_event: invalid window");
            return;
        };
        if win.input.is_char() {
            win.input = InputRequest::None;
            self.queue_message(&mut state, MessageKind::CancelCharInput, Some(win_id));
        }
    }

    pub fn request_line_event(&self, win_id: WinId, maxlen: u32, initial: &str, unicode: bool) {
        forgiving!(self.try_request_line_event(win_id, maxlen, initial, unicode), ())
    }

    fn try_request_line_event(&self, win_id: WinId, maxlen: u32, initial: &str,
                              unicode: bool) -> GlkResult<()> {
        let mut state = self.lock_state();
        let (echo, terminators);
        {
            let win = win_mut!(state, win_id);
            if win.input.is_some() {
                return Err(PendingKeyboardRequest);
            }
            if !win.is_text() {
                return Err(WindowDoesntSupportCharInput);
            }
            win.input = if unicode {InputRequest::LineUnicode} else {InputRequest::LineLatin1};
            win.line_input_max = maxlen;
            // The settings calls only store these; the request applies them
            echo = win.echo_line_input;
            terminators = win.line_terminators.clone();
        }
        self.queue_message(&mut state, MessageKind::RequestLineInput {
            maxlen,
            initial: initial.to_owned(),
            unicode,
            echo,
            terminators,
        }, Some(win_id));
        drop(state);
        if self.forced_line.is_pending() {
            self.events.push(Event::new(EventKind::ForcedLineInput, Some(win_id), 0, 0));
        }
        Ok(())
    }

    /** Cancel a pending line input request. Returns the input event the
        request would have produced, with the characters entered so far. */
    pub fn cancel_line_event(&self, win_id: WinId) -> Option<Event> {
        forgiving!(self.try_cancel_line_event(win_id), None)
    }

    fn try_cancel_line_event(&self, win_id: WinId) -> GlkResult<Option<Event>> {
        {
            let mut state = self.lock_state();
            let win = win_mut!(state, win_id);
            if !win.input.is_line() {
                return Ok(None);
            }
            // The widget needs the buffer flushed before it can measure
            // the partial input
            self.flush_window(&mut state, win_id);
        }
        let count = self.bridge.send_and_await_int(MessageKind::CancelLineInput, Some(win_id));
        self.tick();
        let mut state = self.lock_state();
        if let Some(win) = state.windows.get_mut(win_id) {
            win.input = InputRequest::None;
            win.line_input_max = 0;
        }
        Ok(Some(Event::new(EventKind::LineInput, Some(win_id), count.max(0) as u32, 0)))
    }

    pub fn set_echo_line_event(&self, win_id: WinId, echo: bool) {
        if let Some(win) = self.lock_state().windows.get_mut(win_id) {
            win.echo_line_input = echo;
        }
    }

    pub fn set_terminators_line_event(&self, win_id: WinId, keycodes: &[u32]) {
        if let Some(win) = self.lock_state().windows.get_mut(win_id) {
            win.line_terminators = keycodes.to_vec();
        }
    }

    pub fn request_mouse_event(&self, win_id: WinId) {
        if let Some(win) = self.lock_state().windows.get_mut(win_id) {
            if matches!(win.wintype, WindowType::Grid | WindowType::Graphics) {
                win.mouse_request = true;
            }
        }
    }

    pub fn cancel_mouse_event(&self, win_id: WinId) {
        if let Some(win) = self.lock_state().windows.get_mut(win_id) {
            win.mouse_request = false;
        }
    }

    pub fn request_hyperlink_event(&self, win_id: WinId) {
        if let Some(win) = self.lock_state().windows.get_mut(win_id) {
            if win.is_text() {
                win.hyperlink_request = true;
            }
        }
    }

    pub fn cancel_hyperlink_event(&self, win_id: WinId) {
        if let Some(win) = self.lock_state().windows.get_mut(win_id) {
            win.hyperlink_request = false;
        }
    }

    /** The text delivered by the window's last line input event */
    pub fn line_input_text(&self, win_id: WinId) -> Option<String> {
        self.lock_state().windows.get(win_id).and_then(|win| win.last_line_input.clone())
    }

    // Styles and output

    pub fn set_style(&self, style: u32) {
        let mut state = self.lock_state();
        let Some(win_id) = state.current_stream
            .and_then(|str_id| state.streams.get(str_id))
            .and_then(|stream| stream.window_id()) else { return };
        if let Some(WindowData::Buffer(buffer)) = state.windows.get_mut(win_id).map(|win| &mut win.data) {
            buffer.style = style;
        }
        self.queue_message(&mut state, MessageKind::SetStyle(style), Some(win_id));
    }

    pub fn set_hyperlink(&self, linkval: u32) {
        let mut state = self.lock_state();
        let Some(win_id) = state.current_stream
            .and_then(|str_id| state.streams.get(str_id))
            .and_then(|stream| stream.window_id()) else { return };
        self.queue_message(&mut state, MessageKind::SetHyperlink(linkval), Some(win_id));
    }

    pub fn put_string(&self, text: &str) {
        let str_id = self.lock_state().current_stream;
        if let Some(str_id) = str_id {
            self.put_string_stream(str_id, text);
        }
        else {
            tracing::warn!("put_string with no current stream");
        }
    }

    pub fn put_char(&self, char: char) {
        self.put_string(&char.to_string());
    }

    pub fn put_string_stream(&self, str_id: StrId, text: &str) {
        let mut state = self.lock_state();
        forgiving!(self.write_to_stream(&mut state, str_id, text, true), ())
    }

    fn write_to_stream(&self, state: &mut SessionState, str_id: StrId, text: &str,
                       follow_echo: bool) -> GlkResult<()> {
        let stream = str_mut!(state, str_id);
        stream.put_string(text)?;
        if let Some(win_id) = stream.window_id() {
            let echo = {
                let win = win_mut!(state, win_id);
                win.pending_text.push_str(text);
                win.data.put_string(text);
                win.echo_stream
            };
            if follow_echo {
                if let Some(echo_id) = echo {
                    // A broken echo stream must not fail the primary write
                    if let Err(err) = self.write_to_stream(state, echo_id, text, false) {
                        tracing::warn!("echo stream write failed: {err}");
                    }
                }
            }
        }
        Ok(())
    }

    pub fn get_char_stream(&self, str_id: StrId) -> i32 {
        let mut state = self.lock_state();
        let result: GlkResult<Option<char>> = (|| {
            str_mut!(state, str_id).get_char()
        })();
        forgiving!(result, None).map_or(-1, |char| char as i32)
    }

    // Streams

    pub fn stream_open_memory(&self, len: usize, fmode: u32, rock: u32) -> Option<StrId> {
        forgiving!(self.try_stream_open_memory(len, fmode, rock), None)
    }

    fn try_stream_open_memory(&self, len: usize, fmode: u32, rock: u32) -> GlkResult<Option<StrId>> {
        let fmode = file_mode(fmode)?;
        let mut state = self.lock_state();
        let str_id = state.streams.register(Stream::memory(vec!['\0'; len], fmode), rock);
        Ok(Some(str_id))
    }

    pub fn stream_open_file(&self, fref_id: FrefId, fmode: u32, rock: u32) -> Option<StrId> {
        forgiving!(self.try_stream_open_file(fref_id, fmode, rock), None)
    }

    fn try_stream_open_file(&self, fref_id: FrefId, fmode: u32, rock: u32) -> GlkResult<Option<StrId>> {
        let fmode = file_mode(fmode)?;
        let mut state = self.lock_state();
        let filename = state.filerefs.get(fref_id).ok_or(InvalidReference)?.filename.clone();
        let content = state.filesystem.file_read(&filename);
        if fmode == FileMode::Read && content.is_none() {
            tracing::warn!("stream_open_file: no such file {filename}");
            return Ok(None);
        }
        let stream = Stream::file(filename, content.unwrap_or_default(), fmode);
        Ok(Some(state.streams.register(stream, rock)))
    }

    pub fn stream_close(&self, str_id: StrId) -> Option<StreamResult> {
        forgiving!(self.try_stream_close(str_id), None)
    }

    fn try_stream_close(&self, str_id: StrId) -> GlkResult<Option<StreamResult>> {
        let mut state = self.lock_state();
        if str_mut!(state, str_id).is_window() {
            return Err(CannotCloseWindowStream);
        }
        let stream = state.streams.unregister(str_id).ok_or(InvalidReference)?;
        if state.current_stream == Some(str_id) {
            state.current_stream = None;
        }
        // Detach it from any window echoing to it
        for win_id in state.windows.ids() {
            if let Some(win) = state.windows.get_mut(win_id) {
                if win.echo_stream == Some(str_id) {
                    win.echo_stream = None;
                }
            }
        }
        let result = stream.result();
        if let StreamData::File(file) = stream.data {
            if file.needs_writeback() && !state.filesystem.file_write(&file.filename, file.content()) {
                tracing::warn!("failed to write back {}", file.filename);
            }
        }
        Ok(Some(result))
    }

    pub fn stream_set_current(&self, str_id: Option<StrId>) {
        let mut state = self.lock_state();
        match str_id {
            Some(str_id) if !state.streams.contains(str_id) => {
                tracing::warn!("stream_set_current: invalid stream");
            },
            _ => state.current_stream = str_id,
        }
    }

    pub fn stream_get_current(&self) -> Option<StrId> {
        self.lock_state().current_stream
    }

    pub fn stream_get_rock(&self, str_id: StrId) -> u32 {
        self.lock_state().streams.rock(str_id).unwrap_or(0)
    }

    pub fn stream_iterate(&self, prev: Option<StrId>) -> Option<(StrId, u32)> {
        self.lock_state().streams.iterate(prev).map(|result| (result.id, result.rock))
    }

    // Filerefs

    pub fn fileref_create_by_name(&self, usage: u32, name: &str, rock: u32) -> FrefId {
        let mut state = self.lock_state();
        let filename = filename_for_name(name, usage);
        state.filerefs.register(FileRef::new(filename, usage), rock)
    }

    pub fn fileref_create_temp(&self, usage: u32, rock: u32) -> FrefId {
        let mut state = self.lock_state();
        let filename = state.filesystem.temporary_filename();
        state.filerefs.register(FileRef::temp(filename, usage), rock)
    }

    pub fn fileref_destroy(&self, fref_id: FrefId) {
        if self.lock_state().filerefs.unregister(fref_id).is_none() {
            tracing::warn!("fileref_destroy: invalid fileref");
        }
    }

    pub fn fileref_does_file_exist(&self, fref_id: FrefId) -> bool {
        let state = self.lock_state();
        state.filerefs.get(fref_id)
            .map_or(false, |fref| state.filesystem.file_exists(&fref.filename))
    }

    pub fn fileref_delete_file(&self, fref_id: FrefId) {
        let state = self.lock_state();
        if let Some(fref) = state.filerefs.get(fref_id) {
            state.filesystem.file_delete(&fref.filename);
        }
    }

    pub fn fileref_get_rock(&self, fref_id: FrefId) -> u32 {
        self.lock_state().filerefs.rock(fref_id).unwrap_or(0)
    }

    pub fn fileref_iterate(&self, prev: Option<FrefId>) -> Option<(FrefId, u32)> {
        self.lock_state().filerefs.iterate(prev).map(|result| (result.id, result.rock))
    }

    // Timers, interrupts, resources

    pub fn request_timer_events(&self, millis: u32) {
        let mut state = self.lock_state();
        state.timer_interval = millis;
        drop(state);
        self.bridge.send(MessageKind::SetTimer(millis), None);
    }

    pub fn set_interrupt_handler(&self, handler: impl FnOnce() + Send + 'static) {
        self.lock_state().interrupt_handler = Some(Box::new(handler));
    }

    pub fn set_resource_map(&self, map: Box<dyn ResourceMap>) {
        self.lock_state().resource_map = Some(map);
    }

    pub fn load_resource(&self, usage: crate::ResourceUsage, number: u32)
        -> Result<Vec<u8>, crate::ResourceError>
    {
        let mut state = self.lock_state();
        match state.resource_map.as_mut() {
            Some(map) => map.load(usage, number),
            None => Err(crate::ResourceError::NotFound(number)),
        }
    }

    // The event loop

    /** Block until an event is available. This is a liveness point: an
        aborted session terminates here instead of returning. */
    pub fn select(&self) -> Event {
        loop {
            {
                let mut state = self.lock_state();
                self.flush_all_windows(&mut state);
            }
            let event = self.events.pop_blocking();
            self.tick();
            match event.kind {
                // If tick() didn't unwind, the sentinel was stale
                EventKind::Abort => continue,
                EventKind::ForcedCharInput => {
                    if let Some(event) = self.deliver_forced_char(event) {
                        return event;
                    }
                },
                EventKind::ForcedLineInput => {
                    if let Some(event) = self.deliver_forced_line(event) {
                        return event;
                    }
                },
                _ => return event,
            }
        }
    }

    /** Return the first internally-spawned event, if any. Player input is
        left queued for a later `select`. */
    pub fn select_poll(&self) -> Option<Event> {
        self.tick();
        {
            let mut state = self.lock_state();
            self.flush_all_windows(&mut state);
        }
        self.events.pop_poll()
    }

    /** The liveness check: every potentially-long-running entry point calls
        this so an abort can never be missed. */
    pub fn tick(&self) {
        if !self.abort.is_signalled() {
            return;
        }
        let handler = self.lock_state().interrupt_handler.take();
        if let Some(handler) = handler {
            handler();
        }
        self.shutdown(true);
        // Unwind without tripping the panic hook; the thread entry wrapper
        // downcasts this payload
        resume_unwind(Box::new(SessionTermination::Aborted));
    }

    /** Normal programmatic exit, never returns */
    pub fn exit(&self) -> ! {
        self.shutdown(false);
        resume_unwind(Box::new(SessionTermination::Exited))
    }

    fn deliver_forced_char(&self, marker: Event) -> Option<Event> {
        let target = {
            let state = self.lock_state();
            let requested = |id: WinId| {
                state.windows.get(id).map_or(false, |win| win.input.is_char())
            };
            marker.win.filter(|&id| requested(id))
                .or_else(|| state.windows.ids().into_iter().find(|&id| requested(id)))
        };
        // No matching request: drop the marker, keep the value queued
        let win_id = target?;
        let keycode = self.forced_char.try_pop()?;
        let mut state = self.lock_state();
        let keycode = {
            let win = state.windows.get_mut(win_id)?;
            let latin1 = win.input == InputRequest::CharLatin1;
            win.input = InputRequest::None;
            if latin1 && keycode > 0xff && keycode < keycode_Func12 {
                keycode_Unknown
            }
            else {
                keycode
            }
        };
        self.queue_message(&mut state, MessageKind::ForceCharInput(keycode), Some(win_id));
        Some(Event::new(EventKind::CharInput, Some(win_id), keycode, 0))
    }

    fn deliver_forced_line(&self, marker: Event) -> Option<Event> {
        let target = {
            let state = self.lock_state();
            let requested = |id: WinId| {
                state.windows.get(id).map_or(false, |win| win.input.is_line())
            };
            marker.win.filter(|&id| requested(id))
                .or_else(|| state.windows.ids().into_iter().find(|&id| requested(id)))
        };
        let win_id = target?;
        let text = self.forced_line.try_pop()?;
        let (text, count) = {
            let mut state = self.lock_state();
            let win = state.windows.get_mut(win_id)?;
            let max = win.line_input_max as usize;
            let text: String = text.chars().take(max).collect();
            let count = text.chars().count() as u32;
            win.input = InputRequest::None;
            win.line_input_max = 0;
            win.last_line_input = Some(text.clone());
            self.flush_window(&mut state, win_id);
            (text, count)
        };
        // Rendezvous so the text has been echoed before the event returns
        self.bridge.send_and_await_int(MessageKind::ForceLineInput(text), Some(win_id));
        self.tick();
        Some(Event::new(EventKind::LineInput, Some(win_id), count, 0))
    }

    // Output buffering

    fn flush_window(&self, state: &mut SessionState, win_id: WinId) {
        if let Some(win) = state.windows.get_mut(win_id) {
            if !win.pending_text.is_empty() {
                let text = std::mem::take(&mut win.pending_text);
                self.bridge.send(MessageKind::PrintString(text), Some(win_id));
            }
        }
    }

    pub(crate) fn flush_all_windows(&self, state: &mut SessionState) {
        for win_id in state.windows.ids() {
            self.flush_window(state, win_id);
        }
    }

    /** Send a message, first flushing the target window's buffered text if
        the message's effect depends on everything printed so far. */
    fn queue_message(&self, state: &mut SessionState, kind: MessageKind, win: Option<WinId>) {
        if requires_flush(&kind) {
            if let Some(win_id) = win {
                self.flush_window(state, win_id);
            }
        }
        self.bridge.send(kind, win);
    }

    /** Rendezvous with the layout pass if a resize is outstanding. Like
        every message await, this is an abort wake point. */
    pub fn sync_arrange(&self) {
        if self.arrange.needs_rearrange() {
            self.bridge.send_and_await_int(MessageKind::SyncArrange, None);
            self.tick();
        }
    }

    // Shutdown

    /** The full shutdown sequence. Runs on the worker thread; afterwards
        the session state is reset and the final Shutdown message is the
        last thing on the bridge. */
    pub(crate) fn shutdown(&self, aborted: bool) {
        // Pre-shutdown: quiesce everything that could still produce work
        let prompt = {
            let mut state = self.lock_state();
            if state.timer_interval != 0 {
                state.timer_interval = 0;
                self.bridge.send(MessageKind::SetTimer(0), None);
            }
            for win_id in state.windows.ids() {
                let Some(win) = state.windows.get_mut(win_id) else { continue };
                let input = win.input;
                win.input = InputRequest::None;
                win.mouse_request = false;
                win.hyperlink_request = false;
                if input.is_char() {
                    tracing::warn!("shutdown with pending char input request");
                    self.bridge.send(MessageKind::CancelCharInput, Some(win_id));
                }
                else if input.is_line() {
                    tracing::warn!("shutdown with pending line input request");
                    self.bridge.send(MessageKind::CancelLineInput, Some(win_id));
                }
            }
            self.flush_all_windows(&mut state);
            state.resource_map = None;
            state.interrupt_handler = None;
            let has_text_window = state.windows.ids().into_iter()
                .any(|id| state.windows.get(id).map_or(false, |win| win.is_text()));
            self.interactive && !aborted && has_text_window
        };

        // Let any in-flight resize finish so the final state is consistent
        self.arrange.wait_for_layout();

        if prompt {
            self.bridge.send(MessageKind::ShutdownPrompt(self.final_message.clone()), None);
            self.shutdown_gate.wait();
        }

        // Post-shutdown: tear the object graph down and reset for a
        // possible next session
        {
            let mut state = self.lock_state();
            for str_id in state.streams.ids() {
                let Some(stream) = state.streams.unregister(str_id) else { continue };
                if let StreamData::File(file) = stream.data {
                    if file.needs_writeback() && !state.filesystem.file_write(&file.filename, file.content()) {
                        tracing::warn!("failed to write back {}", file.filename);
                    }
                }
            }
            for fref_id in state.filerefs.ids() {
                let Some(fref) = state.filerefs.unregister(fref_id) else { continue };
                if fref.temporary {
                    state.filesystem.file_delete(&fref.filename);
                }
            }
            for win_id in state.windows.ids() {
                if state.windows.get(win_id).map_or(false, |win| win.wintype != WindowType::Pair) {
                    self.bridge.send(MessageKind::DestroyWidget, Some(win_id));
                }
                state.windows.unregister(win_id);
            }
            state.root_window = None;
            state.current_stream = None;
            state.timer_interval = 0;
        }

        self.events.clear();
        self.abort.reset();
        self.forced_char.clear();
        self.forced_line.clear();
        self.shutdown_gate.reset();

        self.bridge.send(MessageKind::Shutdown, None);
    }
}

fn requires_flush(kind: &MessageKind) -> bool {
    matches!(kind,
        MessageKind::MoveCursor {..}
        | MessageKind::SetStyle(_)
        | MessageKind::SetHyperlink(_)
        | MessageKind::ClearWindow
        | MessageKind::RequestCharInput {..}
        | MessageKind::RequestLineInput {..}
        | MessageKind::CancelCharInput
        | MessageKind::CancelLineInput
        | MessageKind::ForceCharInput(_)
        | MessageKind::ForceLineInput(_)
        | MessageKind::DrawImage {..}
        | MessageKind::FillRect {..})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StdFileSystem;
    use std::sync::Arc;
    use std::thread;

    /** Answer awaited messages with defaults so worker-side calls don't
        block. Stops at the first Shutdown. */
    fn spawn_pump(session: Arc<GlkSession>) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            while let Some(msg) = session.bridge.recv_blocking() {
                if matches!(msg.kind, MessageKind::Shutdown) {
                    break;
                }
                drop(msg);
            }
        })
    }

    fn make_session() -> Arc<GlkSession> {
        Arc::new(GlkSession::new(SessionConfig::default(), Box::<StdFileSystem>::default()))
    }

    #[test]
    fn first_window_becomes_root() {
        let session = make_session();
        let pump = spawn_pump(session.clone());

        assert!(session.window_open(Some(fake_win_id()), 0, 0, wintype_TextBuffer, 0).is_none());
        let root = session.window_open(None, 0, 0, wintype_TextBuffer, 42).unwrap();
        assert_eq!(session.window_get_root(), Some(root));
        assert_eq!(session.window_get_rock(root), 42);
        assert_eq!(session.window_get_type(root), wintype_TextBuffer);
        assert!(session.window_get_parent(root).is_none());

        session.bridge.close();
        pump.join().unwrap();
    }

    #[test]
    fn open_rejects_a_proportion_over_100() {
        let session = make_session();
        let pump = spawn_pump(session.clone());

        let main = session.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        let bad = session.window_open(Some(main), winmethod_Above | winmethod_Proportional, 150,
            wintype_TextGrid, 2);
        assert!(bad.is_none());
        // The tree is untouched: no pair, no half-made window
        assert_eq!(session.window_get_root(), Some(main));
        assert_eq!(session.lock_state().windows.len(), 1);

        session.bridge.close();
        pump.join().unwrap();
    }

    #[test]
    fn split_inserts_a_pair_window() {
        let session = make_session();
        let pump = spawn_pump(session.clone());

        let main = session.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        let status = session.window_open(Some(main), winmethod_Above | winmethod_Fixed, 2,
            wintype_TextGrid, 2).unwrap();

        let pair = session.window_get_parent(status).unwrap();
        assert_eq!(session.window_get_parent(main), Some(pair));
        assert_eq!(session.window_get_root(), Some(pair));
        assert_eq!(session.window_get_type(pair), wintype_Pair);
        assert_eq!(session.window_get_sibling(status), Some(main));
        assert_eq!(session.window_get_sibling(main), Some(status));

        let (method, size, key) = session.window_get_arrangement(pair).unwrap();
        assert_eq!(method, winmethod_Above | winmethod_Fixed);
        assert_eq!(size, 2);
        assert_eq!(key, Some(status));

        session.bridge.close();
        pump.join().unwrap();
    }

    #[test]
    fn closing_a_split_window_splices_the_sibling() {
        let session = make_session();
        let pump = spawn_pump(session.clone());

        let main = session.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        let status = session.window_open(Some(main), winmethod_Above | winmethod_Fixed, 2,
            wintype_TextGrid, 2).unwrap();
        let pair = session.window_get_parent(status).unwrap();

        session.window_close(status).unwrap();

        assert_eq!(session.window_get_root(), Some(main));
        assert!(session.window_get_parent(main).is_none());
        assert_eq!(session.window_get_type(pair), 0);
        assert_eq!(session.window_get_type(status), 0);
        // Only the main window and its stream remain
        assert_eq!(session.lock_state().windows.len(), 1);
        assert_eq!(session.lock_state().streams.len(), 1);

        session.bridge.close();
        pump.join().unwrap();
    }

    #[test]
    fn closing_root_empties_the_tree() {
        let session = make_session();
        let pump = spawn_pump(session.clone());

        let main = session.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        let status = session.window_open(Some(main), winmethod_Above | winmethod_Fixed, 2,
            wintype_TextGrid, 2).unwrap();
        let pair = session.window_get_parent(status).unwrap();

        session.window_close(pair).unwrap();
        assert!(session.window_get_root().is_none());
        assert_eq!(session.lock_state().windows.len(), 0);
        assert_eq!(session.lock_state().streams.len(), 0);

        session.bridge.close();
        pump.join().unwrap();
    }

    #[test]
    fn closing_a_key_window_clears_key_pointers() {
        let session = make_session();
        let pump = spawn_pump(session.clone());

        let main = session.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        let status = session.window_open(Some(main), winmethod_Above | winmethod_Fixed, 2,
            wintype_TextGrid, 2).unwrap();
        // Split the status line; its pair is keyed on the grid
        let extra = session.window_open(Some(status), winmethod_Left | winmethod_Proportional, 50,
            wintype_TextBuffer, 3).unwrap();
        let outer = session.window_get_parent(main).unwrap();

        session.window_close(status).unwrap();

        // The outer pair was keyed on the closed grid
        let (_, _, key) = session.window_get_arrangement(outer).unwrap();
        assert_eq!(key, None);
        assert_eq!(session.window_get_sibling(extra), Some(main));

        session.bridge.close();
        pump.join().unwrap();
    }

    #[test]
    fn set_arrangement_validates_and_stores() {
        let session = make_session();
        let pump = spawn_pump(session.clone());

        let main = session.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        let status = session.window_open(Some(main), winmethod_Above | winmethod_Fixed, 2,
            wintype_TextGrid, 2).unwrap();
        let pair = session.window_get_parent(status).unwrap();

        session.window_set_arrangement(pair, winmethod_Above | winmethod_Fixed, 4, None);
        let (method, size, key) = session.window_get_arrangement(pair).unwrap();
        assert_eq!((method, size, key), (winmethod_Above | winmethod_Fixed, 4, Some(status)));

        // Over-100 proportions are rejected and nothing changes
        session.window_set_arrangement(pair, winmethod_Above | winmethod_Proportional, 150, None);
        let (method, size, _) = session.window_get_arrangement(pair).unwrap();
        assert_eq!((method, size), (winmethod_Above | winmethod_Fixed, 4));

        // A key window outside the pair is rejected
        let outside = session.window_open(Some(main), winmethod_Below | winmethod_Proportional, 50,
            wintype_TextBuffer, 5).unwrap();
        session.window_set_arrangement(pair, winmethod_Above | winmethod_Fixed, 4, Some(outside));
        let (_, _, key) = session.window_get_arrangement(pair).unwrap();
        assert_eq!(key, Some(status));

        session.bridge.close();
        pump.join().unwrap();
    }

    #[test]
    fn window_iteration_matches_the_tree() {
        let session = make_session();
        let pump = spawn_pump(session.clone());

        let main = session.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        let status = session.window_open(Some(main), winmethod_Above | winmethod_Fixed, 2,
            wintype_TextGrid, 2).unwrap();

        let mut seen = vec![];
        let mut prev = None;
        while let Some((id, _)) = session.window_iterate(prev) {
            seen.push(id);
            prev = Some(id);
        }
        assert_eq!(seen.len(), 3);
        assert!(seen.contains(&main));
        assert!(seen.contains(&status));

        session.bridge.close();
        pump.join().unwrap();
    }

    #[test]
    fn double_input_request_is_rejected() {
        let session = make_session();
        let pump = spawn_pump(session.clone());

        let main = session.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        session.request_char_event(main, false);
        // Second request is forgiven but must not change the state
        session.request_line_event(main, 80, "", false);
        {
            let state = session.lock_state();
            assert_eq!(state.windows.get(main).unwrap().input, InputRequest::CharLatin1);
        }
        session.cancel_char_event(main);
        {
            let state = session.lock_state();
            assert_eq!(state.windows.get(main).unwrap().input, InputRequest::None);
        }

        session.bridge.close();
        pump.join().unwrap();
    }

    #[test]
    fn cancelled_line_input_reports_a_zero_count_event() {
        let session = make_session();
        let pump = spawn_pump(session.clone());

        let main = session.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        assert!(session.cancel_line_event(main).is_none());
        session.request_line_event(main, 80, "", false);
        let event = session.cancel_line_event(main).unwrap();
        assert_eq!(event.kind, EventKind::LineInput);
        assert_eq!(event.win, Some(main));
        assert_eq!(event.val1, 0);

        session.bridge.close();
        pump.join().unwrap();
    }

    #[test]
    fn window_output_is_buffered_until_flush() {
        let session = make_session();

        let pump = spawn_pump(session.clone());
        let main = session.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        session.bridge.close();
        pump.join().unwrap();

        let str_id = session.window_get_stream(main).unwrap();
        session.put_string_stream(str_id, "Hello, ");
        session.put_string_stream(str_id, "world.");
        {
            let state = session.lock_state();
            assert_eq!(state.windows.get(main).unwrap().pending_text, "Hello, world.");
            assert_eq!(state.streams.get(str_id).unwrap().result().write_count, 13);
        }
    }

    #[test]
    fn echo_stream_mirrors_window_output() {
        let session = make_session();
        let pump = spawn_pump(session.clone());
        let main = session.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        session.bridge.close();
        pump.join().unwrap();

        let echo = session.stream_open_memory(32, filemode_Write, 0).unwrap();
        session.window_set_echo_stream(main, Some(echo));
        // A window must not echo to its own stream
        let own = session.window_get_stream(main).unwrap();
        session.window_set_echo_stream(main, Some(own));
        assert_eq!(session.window_get_echo_stream(main), Some(echo));

        session.put_string_stream(own, "score: 10");
        let result = session.stream_close(echo).unwrap();
        assert_eq!(result.write_count, 9);
        assert_eq!(session.window_get_echo_stream(main), None);
    }

    /** An id that was never issued by the session's own stores */
    fn fake_win_id() -> WinId {
        let mut orphan: GlkObjectStore<Window> = GlkObjectStore::new();
        let blank = || Window::new(WindowData::for_wintype(WindowType::Blank), WindowType::Blank);
        // A second-generation id cannot collide with a fresh store's first
        let id = orphan.register(blank(), 0);
        orphan.unregister(id);
        orphan.register(blank(), 0)
    }
}
