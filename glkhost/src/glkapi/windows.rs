/*

Glk windows
===========

Copyright (c) 2026 the glkhost authors
MIT licenced

*/

use std::sync::{Arc, Mutex};

use enum_dispatch::enum_dispatch;

use super::constants::*;
use super::events::lock_or_poisoned;
use super::input::InputRequest;
use super::objects::{GlkId, GlkObjectStore};
use super::streams::StrId;

pub type WinId = GlkId<Window>;

/** Pixel size and measurement units of a window's widget. Written by the
    UI thread during layout, read by the worker; guarded by its own lock so
    neither side needs the structural lock for a size query. */
#[derive(Clone, Copy, Debug)]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
    pub unit_width: f64,
    pub unit_height: f64,
}

impl Default for WindowSize {
    fn default() -> Self {
        WindowSize {
            width: 0.0,
            height: 0.0,
            unit_width: 1.0,
            unit_height: 1.0,
        }
    }
}

pub type SharedWindowSize = Arc<Mutex<WindowSize>>;

pub struct Window {
    pub wintype: WindowType,
    pub data: WindowData,
    pub parent: Option<WinId>,
    /** The window stream; every non-pair window has one */
    pub stream: Option<StrId>,
    pub echo_stream: Option<StrId>,
    pub input: InputRequest,
    /** Worker-side buffered output, flushed to the UI in batches */
    pub pending_text: String,
    pub echo_line_input: bool,
    pub line_terminators: Vec<u32>,
    pub line_input_max: u32,
    pub mouse_request: bool,
    pub hyperlink_request: bool,
    /** The text delivered by the last line input event */
    pub last_line_input: Option<String>,
    pub size: SharedWindowSize,
}

impl Window {
    pub fn new(data: WindowData, wintype: WindowType) -> Self {
        Window {
            wintype,
            data,
            parent: None,
            stream: None,
            echo_stream: None,
            input: InputRequest::None,
            pending_text: String::new(),
            echo_line_input: true,
            line_terminators: vec![],
            line_input_max: 0,
            mouse_request: false,
            hyperlink_request: false,
            last_line_input: None,
            size: Arc::new(Mutex::new(WindowSize::default())),
        }
    }

    pub fn size(&self) -> WindowSize {
        *lock_or_poisoned(&self.size)
    }

    pub fn is_text(&self) -> bool {
        matches!(self.wintype, WindowType::Buffer | WindowType::Grid)
    }

    pub fn accepts_char_input(&self) -> bool {
        matches!(self.wintype, WindowType::Buffer | WindowType::Grid | WindowType::Graphics)
    }
}

#[enum_dispatch]
pub enum WindowData {
    Blank(BlankWindow),
    Buffer(BufferWindow),
    Graphics(GraphicsWindow),
    Grid(GridWindow),
    Pair(PairWindow),
}

impl WindowData {
    pub fn for_wintype(wintype: WindowType) -> Self {
        match wintype {
            WindowType::Buffer => BufferWindow::default().into(),
            WindowType::Graphics => GraphicsWindow::default().into(),
            WindowType::Grid => GridWindow::default().into(),
            _ => BlankWindow::default().into(),
        }
    }
}

#[enum_dispatch(WindowData)]
pub trait WindowOperations {
    fn clear(&mut self) {}
    fn put_string(&mut self, _str: &str) {}
}

#[derive(Default)]
pub struct BlankWindow {}

impl WindowOperations for BlankWindow {}

#[derive(Default)]
pub struct BufferWindow {
    pub style: u32,
    pub hyperlink: u32,
}

impl WindowOperations for BufferWindow {}

#[derive(Default)]
pub struct GraphicsWindow {
    pub background: u32,
}

impl WindowOperations for GraphicsWindow {}

/** The worker-side mirror of a text grid's character matrix. Kept so that
    cursor moves can be clamped and resizes reflowed without a round trip. */
#[derive(Default)]
pub struct GridWindow {
    pub width: usize,
    pub height: usize,
    pub x: usize,
    pub y: usize,
    lines: Vec<Vec<char>>,
}

impl GridWindow {
    /** When a grid shrinks the bottom/right area is thrown away; when it
        grows the new area is filled with blanks. */
    pub fn update_size(&mut self, width: usize, height: usize) {
        self.lines.resize(height, vec![' '; width]);
        for line in &mut self.lines {
            line.resize(width, ' ');
        }
        self.width = width;
        self.height = height;
        self.x = self.x.min(width);
        self.y = self.y.min(height);
    }

    pub fn move_cursor(&mut self, x: u32, y: u32) {
        self.x = (x as usize).min(self.width);
        self.y = (y as usize).min(self.height);
    }

    pub fn line(&self, y: usize) -> Option<String> {
        self.lines.get(y).map(|line| line.iter().collect())
    }
}

impl WindowOperations for GridWindow {
    fn clear(&mut self) {
        let (width, height) = (self.width, self.height);
        self.update_size(0, 0);
        self.update_size(width, height);
        self.x = 0;
        self.y = 0;
    }

    fn put_string(&mut self, str: &str) {
        for char in str.chars() {
            if char == '\n' {
                self.x = 0;
                self.y += 1;
                continue;
            }
            if self.x >= self.width {
                self.x = 0;
                self.y += 1;
            }
            if self.y >= self.height {
                break;
            }
            self.lines[self.y][self.x] = char;
            self.x += 1;
        }
    }
}

pub struct PairWindow {
    /** The split method as passed to window_open, kept whole so that
        get_arrangement returns exactly what was stored */
    pub split_method: u32,
    pub constraint_size: u32,
    pub child1: Option<WinId>,
    pub child2: Option<WinId>,
    pub key: Option<WinId>,
}

impl PairWindow {
    pub fn new(split_method: u32, constraint_size: u32) -> Self {
        PairWindow {
            split_method,
            constraint_size,
            child1: None,
            child2: None,
            key: None,
        }
    }

    pub fn division(&self) -> u32 {
        self.split_method & winmethod_DivisionMask
    }

    pub fn direction(&self) -> u32 {
        self.split_method & winmethod_DirMask
    }

    pub fn has_border(&self) -> bool {
        (self.split_method & winmethod_BorderMask) == winmethod_Border
    }

    pub fn vertical(&self) -> bool {
        matches!(self.direction(), winmethod_Left | winmethod_Right)
    }

    /** Is the constrained (new) child the first one? */
    pub fn constrained_first(&self) -> bool {
        matches!(self.direction(), winmethod_Left | winmethod_Above)
    }

    pub fn sibling_of(&self, child: WinId) -> Option<WinId> {
        if self.child1 == Some(child) {
            self.child2
        }
        else if self.child2 == Some(child) {
            self.child1
        }
        else {
            None
        }
    }

    pub fn replace_child(&mut self, old: WinId, new: WinId) {
        if self.child1 == Some(old) {
            self.child1 = Some(new);
        }
        else if self.child2 == Some(old) {
            self.child2 = Some(new);
        }
    }
}

impl WindowOperations for PairWindow {}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {x, y, width, height}
    }
}

/** Recursively give the windows their allocated space. Returns a window
    containing all descendants whose visible size changed, or `None` if
    nothing needs redrawing. Runs on the UI thread with the structural
    state locked. */
pub fn allocate_recurse(
    windows: &mut GlkObjectStore<Window>,
    win_id: WinId,
    rect: Rect,
    spacing: f64,
) -> Option<WinId> {
    if rect.width == 0.0 || rect.height == 0.0 {
        // Just don't show this window
        return Some(win_id);
    }

    let pair = match windows.get(win_id) {
        Some(win) => match &win.data {
            WindowData::Pair(pair) => Some((
                pair.division(),
                pair.direction(),
                pair.has_border(),
                pair.constraint_size,
                pair.child1,
                pair.child2,
                pair.key,
            )),
            _ => None,
        },
        None => return None,
    };

    if let Some((division, direction, bordered, constraint, child1, child2, key)) = pair {
        let mut border = if bordered {spacing} else {0.0};
        // If the space gets too small to honor the border, ignore it in
        // this window and below
        let horizontal = direction == winmethod_Left || direction == winmethod_Right;
        if (horizontal && border > rect.width) || (!horizontal && border > rect.height) {
            border = 0.0;
        }

        // Measure the constrained child
        let constrained = if division == winmethod_Fixed {
            // If the key window has been closed, default to 0; otherwise
            // size by the key window's units
            match key.and_then(|key| windows.get(key)) {
                Some(keywin) => {
                    let units = keywin.size();
                    let unit = if horizontal {units.unit_width} else {units.unit_height};
                    let avail = if horizontal {rect.width} else {rect.height};
                    (constraint as f64 * unit).clamp(0.0, avail - border)
                },
                None => 0.0,
            }
        }
        else {
            let fraction = constraint as f64 / 100.0;
            let avail = if horizontal {rect.width} else {rect.height};
            (fraction * (avail - border)).ceil().max(0.0)
        };

        let (rect1, rect2) = split_rect(rect, direction, constrained, border);

        // A zero-size child is hidden and its sibling takes the whole box
        let (child1, child2) = match (child1, child2) {
            (Some(child1), Some(child2)) => (child1, child2),
            // A pair without both children is mid-surgery; skip it
            _ => return None,
        };
        if rect1.width == 0.0 || rect1.height == 0.0 {
            allocate_recurse(windows, child2, rect, spacing);
            return Some(win_id);
        }
        if rect2.width == 0.0 || rect2.height == 0.0 {
            allocate_recurse(windows, child1, rect, spacing);
            return Some(win_id);
        }

        let arrange1 = allocate_recurse(windows, child1, rect1, spacing);
        let arrange2 = allocate_recurse(windows, child2, rect2, spacing);
        return match (arrange1, arrange2) {
            (None, arrange2) => arrange2,
            (arrange1, None) => arrange1,
            _ => Some(win_id),
        };
    }

    // Leaf windows take the allocation directly
    let win = windows.get_mut(win_id)?;
    let changed = {
        let mut size = lock_or_poisoned(&win.size);
        let changed = if win.wintype == WindowType::Grid {
            let new_width = (rect.width / size.unit_width) as usize;
            let new_height = (rect.height / size.unit_height) as usize;
            match &mut win.data {
                WindowData::Grid(grid) => {
                    let changed = grid.width != new_width || grid.height != new_height;
                    grid.update_size(new_width, new_height);
                    changed
                },
                _ => false,
            }
        }
        else {
            false
        };
        size.width = rect.width;
        size.height = rect.height;
        changed
    };
    if changed {Some(win_id)} else {None}
}

/** Fill in both children's rects given the constrained child's extent along
    the split axis. The constrained child is first for Left/Above splits. */
fn split_rect(rect: Rect, direction: u32, constrained: f64, border: f64) -> (Rect, Rect) {
    match direction {
        winmethod_Left => {
            let w1 = constrained;
            let w2 = (rect.width - border - w1).max(0.0);
            (Rect::new(rect.x, rect.y, w1, rect.height),
             Rect::new(rect.x + w1 + border, rect.y, w2, rect.height))
        },
        winmethod_Right => {
            let w2 = constrained;
            let w1 = (rect.width - border - w2).max(0.0);
            (Rect::new(rect.x, rect.y, w1, rect.height),
             Rect::new(rect.x + w1 + border, rect.y, w2, rect.height))
        },
        winmethod_Above => {
            let h1 = constrained;
            let h2 = (rect.height - border - h1).max(0.0);
            (Rect::new(rect.x, rect.y, rect.width, h1),
             Rect::new(rect.x, rect.y + h1 + border, rect.width, h2))
        },
        _ => {
            let h2 = constrained;
            let h1 = (rect.height - border - h2).max(0.0);
            (Rect::new(rect.x, rect.y, rect.width, h1),
             Rect::new(rect.x, rect.y + h1 + border, rect.width, h2))
        },
    }
}

/** Collect a window and all its descendants, leaves and pairs alike */
pub fn subtree_ids(windows: &GlkObjectStore<Window>, win_id: WinId) -> Vec<WinId> {
    let mut result = vec![win_id];
    if let Some(win) = windows.get(win_id) {
        if let WindowData::Pair(pair) = &win.data {
            if let Some(child) = pair.child1 {
                result.extend(subtree_ids(windows, child));
            }
            if let Some(child) = pair.child2 {
                result.extend(subtree_ids(windows, child));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> GlkObjectStore<Window> {
        GlkObjectStore::new()
    }

    fn leaf(store: &mut GlkObjectStore<Window>, wintype: WindowType, unit: f64) -> WinId {
        let win = Window::new(WindowData::for_wintype(wintype), wintype);
        {
            let mut size = win.size.lock().unwrap();
            size.unit_width = unit;
            size.unit_height = unit;
        }
        store.register(win, 0)
    }

    fn pair(store: &mut GlkObjectStore<Window>, method: u32, size: u32,
            child1: WinId, child2: WinId, key: WinId) -> WinId {
        let mut data = PairWindow::new(method, size);
        data.child1 = Some(child1);
        data.child2 = Some(child2);
        data.key = Some(key);
        let id = store.register(Window::new(data.into(), WindowType::Pair), 0);
        store.get_mut(child1).unwrap().parent = Some(id);
        store.get_mut(child2).unwrap().parent = Some(id);
        id
    }

    #[test]
    fn fixed_split_uses_key_window_units() {
        let mut store = make_store();
        let buffer = leaf(&mut store, WindowType::Buffer, 10.0);
        let grid = leaf(&mut store, WindowType::Grid, 8.0);
        let root = pair(&mut store, winmethod_Above | winmethod_Fixed, 3, grid, buffer, grid);

        allocate_recurse(&mut store, root, Rect::new(0.0, 0.0, 800.0, 600.0), 0.0);

        // 3 rows of 8px units
        assert_eq!(store.get(grid).unwrap().size().height, 24.0);
        assert_eq!(store.get(buffer).unwrap().size().height, 576.0);
        assert_eq!(store.get(buffer).unwrap().size().width, 800.0);
    }

    #[test]
    fn fixed_split_with_closed_key_collapses() {
        let mut store = make_store();
        let buffer = leaf(&mut store, WindowType::Buffer, 10.0);
        let grid = leaf(&mut store, WindowType::Grid, 8.0);
        let root = pair(&mut store, winmethod_Above | winmethod_Fixed, 3, grid, buffer, grid);
        // The key window vanished but the pair survived
        store.get_mut(root).unwrap().data = {
            let mut data = PairWindow::new(winmethod_Above | winmethod_Fixed, 3);
            data.child1 = Some(grid);
            data.child2 = Some(buffer);
            data.key = None;
            data.into()
        };

        let arrange = allocate_recurse(&mut store, root, Rect::new(0.0, 0.0, 800.0, 600.0), 0.0);

        // Constrained child hidden, sibling takes the whole box
        assert_eq!(arrange, Some(root));
        assert_eq!(store.get(buffer).unwrap().size().height, 600.0);
    }

    #[test]
    fn proportional_split_rounds_up() {
        let mut store = make_store();
        let upper = leaf(&mut store, WindowType::Buffer, 10.0);
        let lower = leaf(&mut store, WindowType::Buffer, 10.0);
        let root = pair(&mut store, winmethod_Above | winmethod_Proportional, 33, upper, lower, upper);

        allocate_recurse(&mut store, root, Rect::new(0.0, 0.0, 100.0, 101.0), 0.0);

        // ceil(0.33 * 101) = 34
        assert_eq!(store.get(upper).unwrap().size().height, 34.0);
        assert_eq!(store.get(lower).unwrap().size().height, 67.0);
    }

    #[test]
    fn border_consumes_space_between_children() {
        let mut store = make_store();
        let left = leaf(&mut store, WindowType::Buffer, 10.0);
        let right = leaf(&mut store, WindowType::Buffer, 10.0);
        let root = pair(&mut store, winmethod_Left | winmethod_Proportional, 50, left, right, left);

        allocate_recurse(&mut store, root, Rect::new(0.0, 0.0, 102.0, 50.0), 2.0);

        assert_eq!(store.get(left).unwrap().size().width, 50.0);
        assert_eq!(store.get(right).unwrap().size().width, 50.0);
    }

    #[test]
    fn grid_resize_reports_the_changed_window() {
        let mut store = make_store();
        let grid = leaf(&mut store, WindowType::Grid, 10.0);

        let first = allocate_recurse(&mut store, grid, Rect::new(0.0, 0.0, 200.0, 100.0), 0.0);
        assert_eq!(first, Some(grid));
        match &store.get(grid).unwrap().data {
            WindowData::Grid(gridwin) => {
                assert_eq!((gridwin.width, gridwin.height), (20, 10));
            },
            _ => unreachable!(),
        }

        // Same size again: no visible change
        let second = allocate_recurse(&mut store, grid, Rect::new(0.0, 0.0, 200.0, 100.0), 0.0);
        assert_eq!(second, None);
    }

    #[test]
    fn grid_reflow_preserves_top_left_content() {
        let mut grid = GridWindow::default();
        grid.update_size(10, 3);
        grid.put_string("hello");
        grid.update_size(4, 2);
        assert_eq!(grid.line(0).unwrap(), "hell");
        grid.update_size(6, 2);
        assert_eq!(grid.line(0).unwrap(), "hell  ");
    }

    #[test]
    fn grid_put_string_wraps_and_clips() {
        let mut grid = GridWindow::default();
        grid.update_size(3, 2);
        grid.put_string("abcdefgh");
        assert_eq!(grid.line(0).unwrap(), "abc");
        assert_eq!(grid.line(1).unwrap(), "def");
    }
}
