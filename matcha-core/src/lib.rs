//! Core runtime for matcha, a reactive terminal UI library
//!
//! Applications describe their UI as a tree of components. Each frame the
//! runtime rebuilds that tree, packs it into a grid of cells, paints the grid
//! and routes input events back through the painted tree.
//!
//! # Core Concepts
//!
//! - **Component**: renders to an [`Element`]: text, a column, a row, or
//!   another component
//! - **Hooks**: per-component state reached through the render [`Context`]
//!   (`use_state`, `use_atom`, `use_focus`, `use_event`)
//! - **Atom**: shared state cell whose setters re-render every subscriber
//! - **Dispatch**: events bubble from the focused (or pointed-at) component
//!   toward the root until a handler reports them handled
//! - **Screen**: the display and input source the runtime drives
//!
//! # Basic Example
//!
//! ```
//! use matcha_core::prelude::*;
//! use matcha_core::testing::RenderHarness;
//!
//! struct Counter;
//!
//! impl Component for Counter {
//!     fn render(&self, ctx: &mut Context<'_>) -> Element {
//!         let (count, set_count) = ctx.use_state(|| 0i32);
//!         ctx.use_event(move |event| {
//!             if event.is_key("up") {
//!                 set_count.update(|n| n + 1);
//!                 return true;
//!             }
//!             false
//!         });
//!         column([text("Counter"), text(format!("{count}"))])
//!     }
//! }
//!
//! let mut harness = RenderHarness::new(Element::component(Counter));
//! assert_eq!(harness.render_lines(), vec!["Counter", "0      "]);
//! harness.press("up");
//! assert_eq!(harness.render_lines(), vec!["Counter", "1      "]);
//! ```
//!
//! On a real terminal, hand the root to [`App`] (or [`run`]) inside a tokio
//! runtime.

pub mod atom;
pub mod component;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod focus;
pub mod grid;
pub mod handler;
pub mod input;
pub mod keys;
pub mod layout;
pub mod node;
pub mod reconciler;
pub mod runtime;
pub mod scheduler;
pub mod screen;
pub mod state;
pub mod style;
pub mod testing;

// Authoring surface
pub use atom::{Atom, AtomSetter, SubscriptionId};
pub use component::{column, row, styled, text, Component, Element, Text};
pub use context::{AppHandle, Context};
pub use focus::{Focus, FocusRegistry, FocusableId};
pub use state::{Setter, StateKey, StateStore};

// Tree, layout and dispatch
pub use dispatch::{node_at, DispatchOutcome, Dispatcher};
pub use grid::{Cell, Grid};
pub use handler::{Handler, HandlerRegistry};
pub use layout::Packer;
pub use node::{ComponentId, Node, NodeIndex, NodeKind, Tree};
pub use reconciler::Reconciler;

// Styling
pub use style::{
    ansi16, parse_color, Borders, DefaultStyleResolver, Margin, StyleResolver, TextStyle,
};

// Events and input
pub use event::{EventClass, EventKind};
pub use input::{process_raw_event, spawn_event_poller, RawEvent};
pub use keys::{format_key_for_display, parse_key_string};

// Runtime
pub use config::{PollerConfig, RuntimeConfig};
pub use error::{Error, ScreenError, StyleError};
pub use runtime::{run, App};
pub use scheduler::{Phase, RenderTrigger, Scheduler};
pub use screen::{CrosstermScreen, EventStream, Screen};

// Re-export ratatui types for convenience
pub use ratatui::{
    layout::{Rect, Size},
    style::{Color, Modifier, Style},
};

// Testing exports
pub use testing::{
    alt_key, char_key, ctrl_key, grid_to_string, key, mouse_down, RenderHarness, ScreenProbe,
    TestScreen,
};

#[cfg(feature = "testing-time")]
pub use testing::{advance_time, pause_time, resume_time};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::atom::{Atom, AtomSetter};
    pub use crate::component::{column, row, styled, text, Component, Element, Text};
    pub use crate::config::RuntimeConfig;
    pub use crate::context::{AppHandle, Context};
    pub use crate::error::Error;
    pub use crate::event::EventKind;
    pub use crate::focus::{Focus, FocusableId};
    pub use crate::runtime::{run, App};
    pub use crate::state::Setter;
    pub use crate::style::{Borders, Margin, TextStyle};

    // Re-export ratatui types
    pub use ratatui::style::{Color, Modifier, Style};
}
