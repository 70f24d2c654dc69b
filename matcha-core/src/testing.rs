//! Test utilities for matcha applications
//!
//! - [`key`]: Create a `KeyEvent` from a string (e.g. `key("ctrl+p")`)
//! - [`RenderHarness`]: Build, pack and dispatch synchronously, no tasks
//! - [`TestScreen`]: In-memory [`Screen`] for driving the full runtime
//!
//! # Example
//!
//! ```
//! use matcha_core::prelude::*;
//! use matcha_core::testing::{key, RenderHarness};
//!
//! struct Greeting;
//!
//! impl Component for Greeting {
//!     fn render(&self, ctx: &mut Context<'_>) -> Element {
//!         let (name, set_name) = ctx.use_state(|| String::from("world"));
//!         ctx.use_event(move |event| {
//!             if event.is_key("enter") {
//!                 set_name.set("matcha".into());
//!                 return true;
//!             }
//!             false
//!         });
//!         text(format!("hello {name}"))
//!     }
//! }
//!
//! let mut harness = RenderHarness::new(Element::component(Greeting));
//! assert_eq!(harness.render_lines(), vec!["hello world"]);
//!
//! assert!(harness.dispatch(EventKind::Key(key("enter"))).is_handled());
//! assert_eq!(harness.render_lines(), vec!["hello matcha"]);
//! ```

use std::sync::{Arc, Mutex};

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::backend::{Backend, TestBackend};
use ratatui::buffer::Buffer;
use ratatui::layout::Size;
use ratatui::style::Style;
use ratatui::Terminal;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::component::Element;
use crate::context::AppHandle;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::{lock, ScreenError};
use crate::event::EventKind;
use crate::grid::Grid;
use crate::keys::parse_key_string;
use crate::layout::Packer;
use crate::node::Tree;
use crate::reconciler::Reconciler;
use crate::scheduler::{RenderRequests, RenderTrigger};
use crate::screen::{put_cell, EventStream, Screen};
use crate::style::StyleResolver;

/// Create a `KeyEvent` from a key string.
///
/// # Examples
///
/// ```
/// use matcha_core::testing::key;
/// use crossterm::event::{KeyCode, KeyModifiers};
///
/// let k = key("ctrl+p");
/// assert_eq!(k.code, KeyCode::Char('p'));
/// assert!(k.modifiers.contains(KeyModifiers::CONTROL));
///
/// assert_eq!(key("shift+tab").code, KeyCode::BackTab);
/// ```
///
/// # Panics
///
/// Panics if the key string cannot be parsed.
pub fn key(s: &str) -> KeyEvent {
    parse_key_string(s).unwrap_or_else(|| panic!("Invalid key string: {:?}", s))
}

fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent {
        code,
        modifiers,
        kind: KeyEventKind::Press,
        state: KeyEventState::empty(),
    }
}

/// Create a `KeyEvent` for a character with no modifiers.
pub fn char_key(c: char) -> KeyEvent {
    press(KeyCode::Char(c), KeyModifiers::empty())
}

/// Create a `KeyEvent` for a character with Ctrl modifier.
pub fn ctrl_key(c: char) -> KeyEvent {
    press(KeyCode::Char(c), KeyModifiers::CONTROL)
}

/// Create a `KeyEvent` for a character with Alt modifier.
pub fn alt_key(c: char) -> KeyEvent {
    press(KeyCode::Char(c), KeyModifiers::ALT)
}

/// Left button press at `(x, y)`.
pub fn mouse_down(x: u16, y: u16) -> EventKind {
    EventKind::Mouse(MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column: x,
        row: y,
        modifiers: KeyModifiers::NONE,
    })
}

/// Render a grid as plain text, one line per row.
pub fn grid_to_string(grid: &Grid) -> String {
    grid.to_lines().join("\n")
}

/// Symbols of each buffer row, styles dropped.
pub fn buffer_lines(buffer: &Buffer) -> Vec<String> {
    let width = buffer.area.width as usize;
    if width == 0 {
        return Vec::new();
    }
    buffer
        .content
        .chunks(width)
        .map(|row| row.iter().map(|cell| cell.symbol()).collect())
        .collect()
}

/// Synchronous build/pack/dispatch loop for component tests.
///
/// Render requests are collected instead of acted on; call
/// [`render`](Self::render) to produce the next frame.
pub struct RenderHarness {
    root: Element,
    app: AppHandle,
    reconciler: Reconciler,
    packer: Packer,
    dispatcher: Dispatcher,
    requests: RenderRequests,
    tree: Option<Tree>,
}

impl RenderHarness {
    pub fn new(root: impl Into<Element>) -> Self {
        let (trigger, requests) = RenderTrigger::channel(64);
        let app = AppHandle::new(trigger, CancellationToken::new());
        Self {
            root: root.into(),
            reconciler: Reconciler::new(app.clone()),
            packer: Packer::default(),
            dispatcher: Dispatcher::new(&app),
            app,
            requests,
            tree: None,
        }
    }

    pub fn with_style_resolver(mut self, resolver: Arc<dyn StyleResolver>) -> Self {
        self.packer = Packer::new(resolver);
        self
    }

    /// Build and pack a frame at the origin, keeping its tree for dispatch.
    pub fn render(&mut self) -> Grid {
        let mut tree = self.reconciler.build(&self.root);
        let grid = self.packer.pack(&mut tree, 0, 0);
        self.tree = Some(tree);
        grid
    }

    pub fn render_lines(&mut self) -> Vec<String> {
        self.render().to_lines()
    }

    /// Tree of the last [`render`](Self::render).
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Dispatch against the last rendered tree, rendering first if needed.
    pub fn dispatch(&mut self, event: EventKind) -> DispatchOutcome {
        if self.tree.is_none() {
            self.render();
        }
        match &self.tree {
            Some(tree) => self.dispatcher.dispatch(tree, &event),
            None => DispatchOutcome::Unhandled,
        }
    }

    /// Dispatch a key given as a key string.
    pub fn press(&mut self, key_str: &str) -> DispatchOutcome {
        self.dispatch(EventKind::Key(key(key_str)))
    }

    /// Render requests made since the last call.
    pub fn render_requests(&mut self) -> usize {
        self.requests.drain()
    }

    pub fn app(&self) -> &AppHandle {
        &self.app
    }

    pub fn is_quit(&self) -> bool {
        self.app.is_quit()
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    initialized: bool,
    shut_down: bool,
    mouse: bool,
    last_frame: Vec<String>,
}

/// In-memory screen on top of ratatui's `TestBackend`
///
/// Paired with a [`ScreenProbe`] that feeds input and observes frames from
/// outside the runtime.
pub struct TestScreen {
    terminal: Terminal<TestBackend>,
    state: Arc<Mutex<ProbeState>>,
    frames: watch::Sender<u64>,
    input: Option<mpsc::UnboundedReceiver<EventKind>>,
    unavailable: bool,
    mouse_supported: bool,
}

impl TestScreen {
    pub fn new(width: u16, height: u16) -> (Self, ScreenProbe) {
        let terminal = Terminal::new(TestBackend::new(width, height))
            .unwrap_or_else(|err| panic!("test backend failed: {err}"));
        let state = Arc::new(Mutex::new(ProbeState::default()));
        let (frames_tx, frames_rx) = watch::channel(0);
        let (input_tx, input_rx) = mpsc::unbounded_channel();

        let screen = Self {
            terminal,
            state: state.clone(),
            frames: frames_tx,
            input: Some(input_rx),
            unavailable: false,
            mouse_supported: true,
        };
        let probe = ScreenProbe {
            state,
            frames: frames_rx,
            input: Some(input_tx),
        };
        (screen, probe)
    }

    /// Fail [`Screen::initialize`] with [`ScreenError::Unavailable`].
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Report [`ScreenError::NoMouseSupport`] from [`Screen::enable_mouse`].
    pub fn without_mouse(mut self) -> Self {
        self.mouse_supported = false;
        self
    }
}

impl Screen for TestScreen {
    fn initialize(&mut self) -> Result<(), ScreenError> {
        if self.unavailable {
            return Err(ScreenError::Unavailable("test screen unavailable".into()));
        }
        lock(&self.state).initialized = true;
        Ok(())
    }

    fn enable_mouse(&mut self) -> Result<(), ScreenError> {
        if !self.mouse_supported {
            return Err(ScreenError::NoMouseSupport);
        }
        lock(&self.state).mouse = true;
        Ok(())
    }

    fn size(&self) -> Result<Size, ScreenError> {
        Ok(self.terminal.size()?)
    }

    fn clear(&mut self) -> Result<(), ScreenError> {
        self.terminal.autoresize()?;
        self.terminal.current_buffer_mut().reset();
        Ok(())
    }

    fn write_cell(&mut self, x: u16, y: u16, symbol: char, combining: &[char], style: Style) {
        put_cell(self.terminal.current_buffer_mut(), x, y, symbol, combining, style);
    }

    fn show(&mut self) -> Result<(), ScreenError> {
        self.terminal.flush()?;
        self.terminal.swap_buffers();
        self.terminal.backend_mut().flush()?;

        lock(&self.state).last_frame = buffer_lines(self.terminal.backend().buffer());
        self.frames.send_modify(|frames| *frames += 1);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), ScreenError> {
        lock(&self.state).shut_down = true;
        Ok(())
    }

    fn events(&mut self, _cancel: CancellationToken) -> EventStream {
        match self.input.take() {
            Some(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
            None => Box::pin(tokio_stream::empty()),
        }
    }
}

/// Test-side handle of a [`TestScreen`]
pub struct ScreenProbe {
    state: Arc<Mutex<ProbeState>>,
    frames: watch::Receiver<u64>,
    input: Option<mpsc::UnboundedSender<EventKind>>,
}

impl ScreenProbe {
    /// Feed an input event. Ignored after [`close_input`](Self::close_input).
    pub fn send(&self, event: EventKind) {
        if let Some(input) = &self.input {
            let _ = input.send(event);
        }
    }

    /// End the input stream, as a closed terminal would.
    pub fn close_input(&mut self) {
        self.input = None;
    }

    /// Frames shown so far.
    pub fn frames(&self) -> u64 {
        *self.frames.borrow()
    }

    /// Wait until at least `count` frames have been shown.
    pub async fn wait_for_frames(&self, count: u64) {
        let mut frames = self.frames.clone();
        let _ = frames.wait_for(|&shown| shown >= count).await;
    }

    /// Rows of the last shown frame, padded to the screen width.
    pub fn last_frame_lines(&self) -> Vec<String> {
        lock(&self.state).last_frame.clone()
    }

    pub fn is_initialized(&self) -> bool {
        lock(&self.state).initialized
    }

    pub fn is_mouse_enabled(&self) -> bool {
        lock(&self.state).mouse
    }

    pub fn is_shut_down(&self) -> bool {
        lock(&self.state).shut_down
    }
}

/// Pause tokio time for deterministic timer tests.
#[cfg(feature = "testing-time")]
pub fn pause_time() {
    tokio::time::pause();
}

/// Resume tokio time after [`pause_time`].
#[cfg(feature = "testing-time")]
pub fn resume_time() {
    tokio::time::resume();
}

/// Advance paused tokio time by `duration`.
#[cfg(feature = "testing-time")]
pub async fn advance_time(duration: std::time::Duration) {
    tokio::time::advance(duration).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{column, text, Component};
    use crate::context::Context;

    #[test]
    fn test_key_simple() {
        let k = key("q");
        assert_eq!(k.code, KeyCode::Char('q'));
        assert_eq!(k.modifiers, KeyModifiers::empty());
    }

    #[test]
    fn test_key_special() {
        assert_eq!(key("esc").code, KeyCode::Esc);
        assert_eq!(key("enter").code, KeyCode::Enter);
        assert_eq!(key("shift+tab").code, KeyCode::BackTab);
    }

    #[test]
    fn test_modifier_keys() {
        assert!(ctrl_key('c').modifiers.contains(KeyModifiers::CONTROL));
        assert!(alt_key('x').modifiers.contains(KeyModifiers::ALT));
        assert_eq!(char_key('x').modifiers, KeyModifiers::empty());
    }

    #[test]
    fn test_buffer_lines() {
        let mut buffer = Buffer::empty(ratatui::layout::Rect::new(0, 0, 3, 2));
        put_cell(&mut buffer, 0, 1, 'z', &[], Style::default());
        assert_eq!(buffer_lines(&buffer), vec!["   ", "z  "]);
    }

    struct Counter;

    impl Component for Counter {
        fn render(&self, ctx: &mut Context<'_>) -> Element {
            let (count, set_count) = ctx.use_state(|| 0u32);
            ctx.use_event(move |event| {
                if event.char() == Some('+') {
                    set_count.update(|n| n + 1);
                    return true;
                }
                false
            });
            text(format!("count {count}"))
        }
    }

    #[test]
    fn test_harness_render_and_dispatch() {
        let mut harness = RenderHarness::new(Element::component(Counter));
        assert_eq!(harness.render_lines(), vec!["count 0"]);

        assert!(harness.dispatch(EventKind::Key(char_key('+'))).is_handled());
        assert!(harness.render_requests() >= 1);
        assert_eq!(harness.render_lines(), vec!["count 1"]);

        assert!(!harness.press("q").is_handled());
        assert!(!harness.is_quit());
    }

    #[test]
    fn test_harness_dispatch_renders_first() {
        let mut harness = RenderHarness::new(column([text("a")]));
        assert!(harness.tree().is_none());
        harness.dispatch(EventKind::Tick);
        assert_eq!(harness.tree().map(Tree::len), Some(2));
    }

    #[test]
    fn test_screen_records_frames() {
        let (mut screen, probe) = TestScreen::new(4, 2);
        screen.initialize().unwrap();
        screen.clear().unwrap();
        screen.write_cell(1, 0, 'x', &[], Style::default());
        screen.write_cell(9, 9, 'y', &[], Style::default());
        screen.show().unwrap();

        assert!(probe.is_initialized());
        assert_eq!(probe.frames(), 1);
        assert_eq!(probe.last_frame_lines(), vec![" x  ", "    "]);

        screen.clear().unwrap();
        screen.show().unwrap();
        assert_eq!(probe.last_frame_lines(), vec!["    ", "    "]);
    }

    #[test]
    fn test_screen_failure_modes() {
        let (screen, _probe) = TestScreen::new(1, 1);
        let mut screen = screen.unavailable().without_mouse();
        assert!(matches!(screen.initialize(), Err(ScreenError::Unavailable(_))));
        assert!(matches!(screen.enable_mouse(), Err(ScreenError::NoMouseSupport)));
    }

    #[tokio::test]
    async fn test_probe_input_stream() {
        use tokio_stream::StreamExt;

        let (mut screen, mut probe) = TestScreen::new(1, 1);
        let mut events = screen.events(CancellationToken::new());
        probe.send(EventKind::Tick);
        probe.close_input();
        assert_eq!(events.next().await, Some(EventKind::Tick));
        assert_eq!(events.next().await, None);
    }
}
