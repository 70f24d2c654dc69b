//! The screen capability the runtime paints to and reads events from

use std::io::{self, Stdout};
use std::pin::Pin;

use crossterm::event::{
    DisableBracketedPaste, DisableFocusChange, DisableMouseCapture, EnableBracketedPaste,
    EnableFocusChange, EnableMouseCapture,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::buffer::Buffer;
use ratatui::layout::Size;
use ratatui::style::Style;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{PollerConfig, RuntimeConfig};
use crate::error::ScreenError;
use crate::event::EventKind;
use crate::input::{process_raw_event, spawn_event_poller};

/// Asynchronous source of structured input events
pub type EventStream = Pin<Box<dyn Stream<Item = EventKind> + Send>>;

/// A character-cell display plus its input source
///
/// The runtime calls `clear`, a series of `write_cell`, then `show` once per
/// frame. Writes outside [`size`](Screen::size) are ignored.
pub trait Screen: Send + 'static {
    /// Acquire the terminal. Failure here aborts the run before any frame.
    fn initialize(&mut self) -> Result<(), ScreenError>;

    /// Start reporting mouse events.
    ///
    /// [`ScreenError::NoMouseSupport`] is recoverable.
    fn enable_mouse(&mut self) -> Result<(), ScreenError> {
        Err(ScreenError::NoMouseSupport)
    }

    fn size(&self) -> Result<Size, ScreenError>;

    /// Start a new frame with every cell blank.
    fn clear(&mut self) -> Result<(), ScreenError>;

    fn write_cell(&mut self, x: u16, y: u16, symbol: char, combining: &[char], style: Style);

    /// Flush the frame to the display.
    fn show(&mut self) -> Result<(), ScreenError>;

    /// Release the terminal. Must be safe to call more than once.
    fn shutdown(&mut self) -> Result<(), ScreenError>;

    /// Input events until `cancel` fires or the source ends.
    fn events(&mut self, cancel: CancellationToken) -> EventStream;
}

/// Write one cell into a ratatui buffer, ignoring positions outside it.
pub(crate) fn put_cell(
    buffer: &mut Buffer,
    x: u16,
    y: u16,
    symbol: char,
    combining: &[char],
    style: Style,
) {
    let Some(cell) = buffer.cell_mut((x, y)) else {
        return;
    };
    if combining.is_empty() {
        cell.set_char(symbol);
    } else {
        let mut grapheme = String::with_capacity(1 + combining.len());
        grapheme.push(symbol);
        grapheme.extend(combining);
        cell.set_symbol(&grapheme);
    }
    cell.set_style(style);
}

/// Screen backed by stdout through crossterm
///
/// Uses raw mode and the alternate screen. Frames are diffed against the
/// previous one by ratatui's double buffer, so only changed cells are sent.
pub struct CrosstermScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    poller: PollerConfig,
    queue: usize,
    bracketed_paste: bool,
    focus_change: bool,
    mouse_captured: bool,
    active: bool,
}

impl CrosstermScreen {
    pub fn new() -> Result<Self, ScreenError> {
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
            .map_err(|err| ScreenError::Unavailable(err.to_string()))?;
        Ok(Self {
            terminal,
            poller: PollerConfig::default(),
            queue: RuntimeConfig::default().event_queue,
            bracketed_paste: true,
            focus_change: true,
            mouse_captured: false,
            active: false,
        })
    }

    /// Apply the poller, queue and terminal mode settings of `config`.
    pub fn with_config(mut self, config: &RuntimeConfig) -> Self {
        self.poller = config.poller;
        self.queue = config.event_queue;
        self.bracketed_paste = config.bracketed_paste;
        self.focus_change = config.focus_change;
        self
    }
}

impl Screen for CrosstermScreen {
    fn initialize(&mut self) -> Result<(), ScreenError> {
        enable_raw_mode().map_err(|err| ScreenError::Unavailable(err.to_string()))?;
        self.active = true;

        let backend = self.terminal.backend_mut();
        execute!(backend, EnterAlternateScreen)?;
        if self.bracketed_paste {
            execute!(backend, EnableBracketedPaste)?;
        }
        if self.focus_change {
            execute!(backend, EnableFocusChange)?;
        }
        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        info!("terminal initialized");
        Ok(())
    }

    fn enable_mouse(&mut self) -> Result<(), ScreenError> {
        execute!(self.terminal.backend_mut(), EnableMouseCapture).map_err(mouse_error)?;
        self.mouse_captured = true;
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
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), ScreenError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let backend = self.terminal.backend_mut();
        if self.mouse_captured {
            execute!(backend, DisableMouseCapture)?;
            self.mouse_captured = false;
        }
        if self.bracketed_paste {
            execute!(backend, DisableBracketedPaste)?;
        }
        if self.focus_change {
            execute!(backend, DisableFocusChange)?;
        }
        execute!(backend, LeaveAlternateScreen)?;
        disable_raw_mode()?;
        self.terminal.show_cursor()?;
        info!("terminal restored");
        Ok(())
    }

    fn events(&mut self, cancel: CancellationToken) -> EventStream {
        let (tx, rx) = mpsc::channel(self.queue.max(1));
        let _poller = spawn_event_poller(tx, self.poller, cancel);
        debug!(capacity = self.queue, "event poller started");
        Box::pin(ReceiverStream::new(rx).map(process_raw_event))
    }
}

/// Only an unsupported mouse mode is a missing capability; anything else is
/// a terminal failure.
fn mouse_error(err: io::Error) -> ScreenError {
    match err.kind() {
        io::ErrorKind::Unsupported => ScreenError::NoMouseSupport,
        _ => ScreenError::Io(err),
    }
}

impl Drop for CrosstermScreen {
    fn drop(&mut self) {
        // restore the terminal even when the runtime unwinds
        let _ = self.shutdown();
    }
}
