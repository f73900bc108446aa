/*

End-to-end session tests
========================

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

//! These tests drive a whole session: the test thread plays the UI loop
//! (pumping the message bridge) while a worker thread makes Glk calls.

use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;

use glkhost::glkapi::constants::*;
use glkhost::glkapi::events::EventKind;
use glkhost::host::{GlkHost, NullWidgets, WidgetSystem};
use glkhost::glkapi::windows::WinId;
use glkhost::glkapi::SessionConfig;

/** Records every widget call, with fixed 10x10 measurement units */
#[derive(Clone, Default)]
struct RecordingWidgets {
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingWidgets {
    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl WidgetSystem for RecordingWidgets {
    fn create_widget(&mut self, _win: WinId, wintype: WindowType) -> (f64, f64) {
        self.record(format!("create {wintype:?}"));
        (10.0, 10.0)
    }
    fn destroy_widget(&mut self, _win: WinId) {
        self.record("destroy".to_owned());
    }
    fn print(&mut self, _win: WinId, text: &str) {
        self.record(format!("print {text:?}"));
    }
    fn move_cursor(&mut self, _win: WinId, x: u32, y: u32) {
        self.record(format!("move_cursor {x},{y}"));
    }
    fn request_line_input(&mut self, _win: WinId, maxlen: u32, _initial: &str,
                          echo: bool, terminators: &[u32]) {
        self.record(format!("request_line {maxlen} echo={echo} terminators={terminators:?}"));
    }
    fn char_input_forced(&mut self, _win: WinId, keycode: u32) {
        self.record(format!("forced_char {keycode}"));
    }
    fn line_input_forced(&mut self, _win: WinId, text: &str) {
        self.record(format!("forced_line {text:?}"));
    }
    fn shutdown_prompt(&mut self, _message: Option<&str>) {
        self.record("shutdown_prompt".to_owned());
    }
}

fn batch_config() -> SessionConfig {
    SessionConfig {
        interactive: false,
        ..Default::default()
    }
}

/** Pump the host until the worker signals over the channel */
fn pump_until_ready(host: &mut GlkHost, ready: &Receiver<()>) {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        host.process_pending();
        if ready.try_recv().is_ok() {
            // One more drain for anything queued just before the signal
            host.process_pending();
            return;
        }
        assert!(Instant::now() < deadline, "worker never became ready");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn line_input_round_trip() {
    let mut host = GlkHost::new(batch_config(), Box::<NullWidgets>::default());
    host.resize(800.0, 600.0);

    host.run_entry(|glk| {
        let main = glk.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        let stream = glk.window_get_stream(main).unwrap();
        glk.put_string_stream(stream, "What now?\n");
        glk.request_line_event(main, 80, "", false);
        let event = glk.select();
        assert_eq!(event.kind, EventKind::LineInput);
        assert_eq!(event.win, Some(main));
        assert_eq!(event.val1, 8);
        assert_eq!(glk.line_input_text(main).as_deref(), Some("go north"));
        glk.exit();
    }).unwrap();

    host.feed_line_input(None, "go north");
    host.wait_for_exit();
    assert!(host.is_stopped());
}

#[test]
fn char_input_fed_before_the_request_is_kept() {
    let mut host = GlkHost::new(batch_config(), Box::<NullWidgets>::default());

    // No request is pending yet: the value must wait in its queue
    host.feed_char_input(None, keycode_Return);

    host.run_entry(|glk| {
        let main = glk.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        glk.request_char_event(main, false);
        let event = glk.select();
        assert_eq!(event.kind, EventKind::CharInput);
        assert_eq!(event.val1, keycode_Return);

        // Out-of-range value for a Latin-1 request degrades to Unknown
        glk.request_char_event(main, false);
        let event = glk.select();
        assert_eq!(event.kind, EventKind::CharInput);
        assert_eq!(event.val1, keycode_Unknown);
        glk.exit();
    }).unwrap();

    host.feed_char_input(None, 0x2713);
    host.wait_for_exit();
    assert!(host.is_stopped());
}

#[test]
fn stop_unblocks_a_worker_waiting_for_events() {
    let mut host = GlkHost::new(batch_config(), Box::<NullWidgets>::default());

    let (ready, rx) = channel();
    host.run_entry(move |glk| {
        glk.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        ready.send(()).unwrap();
        // Loops forever unless the abort protocol works
        loop {
            glk.select();
        }
    }).unwrap();

    pump_until_ready(&mut host, &rx);
    host.stop();
    host.wait_for_exit();

    assert!(host.is_stopped());
    // Post-shutdown left the session reset
    let session = host.session();
    assert!(!session.abort.is_signalled());
    assert!(session.events.is_empty());
    assert_eq!(session.lock_state().windows.len(), 0);
    assert_eq!(session.lock_state().streams.len(), 0);
}

#[test]
fn stop_unblocks_a_worker_awaiting_a_reply() {
    let mut host = GlkHost::new(batch_config(), Box::<NullWidgets>::default());

    let (ready, rx) = channel();
    host.run_entry(move |glk| {
        let main = glk.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        ready.send(()).unwrap();
        // Never selects; every iteration blocks on a message reply instead
        loop {
            glk.measure_style(main, 0, 0);
        }
    }).unwrap();

    pump_until_ready(&mut host, &rx);
    host.stop();
    host.wait_for_exit();
    assert!(host.is_stopped());
}

#[test]
fn stop_wakes_the_shutdown_keypress_gate() {
    let widgets = RecordingWidgets::default();
    let config = SessionConfig {
        interactive: true,
        final_message: Some("Game over".to_owned()),
        ..Default::default()
    };
    let mut host = GlkHost::new(config, Box::new(widgets.clone()));

    host.run_entry(|glk| {
        glk.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        // Returning normally triggers the interactive shutdown prompt
    }).unwrap();

    // Pump until the prompt appears
    let deadline = Instant::now() + Duration::from_secs(10);
    while !widgets.log().iter().any(|entry| entry == "shutdown_prompt") {
        host.process_pending();
        assert!(Instant::now() < deadline, "prompt never shown");
        thread::sleep(Duration::from_millis(1));
    }

    host.stop();
    host.wait_for_exit();
    assert!(host.is_stopped());
}

#[test]
fn resize_reports_the_resized_subtree() {
    let mut host = GlkHost::new(batch_config(), Box::new(RecordingWidgets::default()));

    let (ready, rx) = channel();
    host.run_entry(move |glk| {
        let main = glk.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        let status = glk.window_open(Some(main), winmethod_Above | winmethod_Fixed, 2,
            wintype_TextGrid, 2).unwrap();
        ready.send(()).unwrap();
        let event = glk.select();
        assert_eq!(event.kind, EventKind::Arrange);
        // Only the grid visibly changed, so it is the reported window
        assert_eq!(event.win, Some(status));

        // And the new size is already visible without another rendezvous
        let (width, height) = glk.window_get_size(status);
        assert_eq!(height, 2);
        assert_eq!(width, 80);
        glk.exit();
    }).unwrap();

    pump_until_ready(&mut host, &rx);
    host.resize(800.0, 600.0);
    host.wait_for_exit();
    assert!(host.is_stopped());
}

#[test]
fn buffered_output_flushes_before_cursor_moves() {
    let widgets = RecordingWidgets::default();
    let mut host = GlkHost::new(batch_config(), Box::new(widgets.clone()));
    host.resize(800.0, 600.0);

    host.run_entry(|glk| {
        let grid = glk.window_open(None, 0, 0, wintype_TextGrid, 1).unwrap();
        let stream = glk.window_get_stream(grid).unwrap();
        glk.put_string_stream(stream, "Score:");
        glk.window_move_cursor(grid, 0, 1);
        glk.put_string_stream(stream, "Moves:");
        glk.exit();
    }).unwrap();

    host.wait_for_exit();

    let log = widgets.log();
    let print1 = log.iter().position(|entry| entry == "print \"Score:\"").unwrap();
    let cursor = log.iter().position(|entry| entry == "move_cursor 0,1").unwrap();
    let print2 = log.iter().position(|entry| entry == "print \"Moves:\"").unwrap();
    assert!(print1 < cursor, "buffered text must land before the cursor move");
    assert!(cursor < print2);
}

#[test]
fn line_input_settings_are_applied_at_request_time() {
    let widgets = RecordingWidgets::default();
    let mut host = GlkHost::new(batch_config(), Box::new(widgets.clone()));

    host.run_entry(|glk| {
        let main = glk.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        glk.set_echo_line_event(main, false);
        glk.set_terminators_line_event(main, &[keycode_Escape]);
        glk.request_line_event(main, 80, "", false);
        let event = glk.select();
        assert_eq!(event.kind, EventKind::LineInput);
        glk.exit();
    }).unwrap();

    host.feed_line_input(None, "wait");
    host.wait_for_exit();

    let expected = format!("request_line 80 echo=false terminators=[{keycode_Escape}]");
    assert!(widgets.log().iter().any(|entry| entry == &expected),
        "line request missing its settings: {:?}", widgets.log());
}

#[test]
fn forced_line_input_is_echoed_through_the_widget() {
    let widgets = RecordingWidgets::default();
    let mut host = GlkHost::new(batch_config(), Box::new(widgets.clone()));

    host.run_entry(|glk| {
        let main = glk.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        // A short buffer truncates the forced text
        glk.request_line_event(main, 5, "", false);
        let event = glk.select();
        assert_eq!(event.kind, EventKind::LineInput);
        assert_eq!(event.val1, 5);
        assert_eq!(glk.line_input_text(main).as_deref(), Some("inven"));
        glk.exit();
    }).unwrap();

    host.feed_line_input(None, "inventory");
    host.wait_for_exit();

    assert!(widgets.log().iter().any(|entry| entry == "forced_line \"inven\""));
}

#[test]
fn shutdown_is_the_last_message() {
    let widgets = RecordingWidgets::default();
    let mut host = GlkHost::new(batch_config(), Box::new(widgets.clone()));

    host.run_entry(|glk| {
        let main = glk.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        let stream = glk.window_get_stream(main).unwrap();
        glk.put_string_stream(stream, "Goodbye.");
        glk.exit();
    }).unwrap();

    host.wait_for_exit();
    assert!(host.is_stopped());

    let log = widgets.log();
    // Pre-shutdown flushed the farewell text, then the widget was torn down
    assert!(log.iter().any(|entry| entry == "print \"Goodbye.\""));
    assert_eq!(log.last().map(String::as_str), Some("destroy"));
    // Nothing left on the bridge after the drain
    assert!(host.session().bridge.is_empty());
}

/** An in-memory file system, so file lifecycle tests touch no disk */
#[derive(Clone, Default)]
struct MemFiles {
    files: Arc<Mutex<std::collections::HashMap<String, Vec<u8>>>>,
}

impl glkhost::GlkFileSystem for MemFiles {
    fn file_exists(&self, filename: &str) -> bool {
        self.files.lock().unwrap().contains_key(filename)
    }
    fn file_delete(&self, filename: &str) {
        self.files.lock().unwrap().remove(filename);
    }
    fn file_read(&self, filename: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(filename).cloned()
    }
    fn file_write(&self, filename: &str, buf: &[u8]) -> bool {
        self.files.lock().unwrap().insert(filename.to_owned(), buf.to_vec());
        true
    }
    fn temporary_filename(&self) -> String {
        format!("temp-{}", self.files.lock().unwrap().len())
    }
}

#[test]
fn file_streams_write_back_on_close_and_temps_vanish_on_shutdown() {
    let files = MemFiles::default();
    let mut host = GlkHost::with_filesystem(batch_config(),
        Box::<NullWidgets>::default(), Box::new(files.clone()));

    host.run_entry(|glk| {
        let fref = glk.fileref_create_by_name(fileusage_SavedGame, "quest", 0);
        assert!(!glk.fileref_does_file_exist(fref));

        let stream = glk.stream_open_file(fref, filemode_Write, 0).unwrap();
        glk.put_string_stream(stream, "chapter 1");
        let result = glk.stream_close(stream).unwrap();
        assert_eq!(result.write_count, 9);
        assert!(glk.fileref_does_file_exist(fref));

        // Reading it back through a new stream
        let stream = glk.stream_open_file(fref, filemode_Read, 0).unwrap();
        assert_eq!(glk.get_char_stream(stream), 'c' as i32);
        glk.stream_close(stream).unwrap();
        glk.fileref_destroy(fref);

        // A dirty temp stream left open: shutdown writes it back, then
        // deletes the temporary file with its fileref
        let temp = glk.fileref_create_temp(fileusage_Data, 0);
        let stream = glk.stream_open_file(temp, filemode_Write, 0).unwrap();
        glk.put_string_stream(stream, "scratch");
        glk.exit();
    }).unwrap();

    host.wait_for_exit();
    assert!(host.is_stopped());

    let files = files.files.lock().unwrap();
    assert_eq!(files.get("quest.glksave").map(Vec::as_slice), Some(b"chapter 1".as_slice()));
    assert!(!files.keys().any(|name| name.starts_with("temp-")));
}

#[test]
fn select_poll_returns_only_internal_events() {
    let mut host = GlkHost::new(batch_config(), Box::<NullWidgets>::default());

    let (ready, rx) = channel();
    let (polled, poll_rx) = channel();
    host.run_entry(move |glk| {
        let main = glk.window_open(None, 0, 0, wintype_TextBuffer, 1).unwrap();
        glk.request_char_event(main, false);
        glk.request_timer_events(50);
        ready.send(()).unwrap();

        // Wait for both the keypress and the timer to be queued
        poll_rx.recv().unwrap();
        let event = glk.select_poll().unwrap();
        assert_eq!(event.kind, EventKind::Timer);

        // The keypress was skipped, not consumed
        let event = glk.select();
        assert_eq!(event.kind, EventKind::CharInput);
        assert_eq!(event.val1, 'x' as u32);
        glk.exit();
    }).unwrap();

    pump_until_ready(&mut host, &rx);
    let main = host.session().window_get_root().unwrap();
    assert!(host.key_pressed(main, 'x' as u32));
    host.fire_timer();
    polled.send(()).unwrap();
    host.wait_for_exit();
    assert!(host.is_stopped());
}
