//! matcha: reactive components for terminal user interfaces
//!
//! Components render to text, columns and rows; hooks keep their state
//! between frames; events bubble from the focused component to the root.
//!
//! # Example
//! ```ignore
//! use matcha::prelude::*;
//!
//! struct Hello;
//!
//! impl Component for Hello {
//!     fn render(&self, ctx: &mut Context<'_>) -> Element {
//!         let app = ctx.handle();
//!         ctx.use_event(move |event| {
//!             if event.is_key("q") {
//!                 app.quit();
//!                 return true;
//!             }
//!             false
//!         });
//!         styled("hello, press q", TextStyle::default().bold())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), matcha::Error> {
//!     run(Element::component(Hello)).await
//! }
//! ```

// Re-export everything from core
pub use matcha_core::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use matcha_core::prelude::*;

    // Event helpers
    pub use matcha_core::{format_key_for_display, parse_key_string, EventClass};
}
