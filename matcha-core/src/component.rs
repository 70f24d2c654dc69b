//! Component trait and the element vocabulary components render to

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::style::TextStyle;

/// A user-defined UI component
///
/// Components are declarative: `render` describes what the component looks
/// like right now, in terms of other elements. State lives outside the
/// component, in slots reached through the [`Context`] hooks, so `render`
/// can be called any number of times.
///
/// Hook calls must happen in the same order and the same number of times on
/// every render of a given position. Changing the sequence is a programming
/// error and aborts the render pass.
///
/// # Example
///
/// ```ignore
/// use matcha::prelude::*;
///
/// struct Counter;
///
/// impl Component for Counter {
///     fn render(&self, ctx: &mut Context<'_>) -> Element {
///         let (count, set_count) = ctx.use_state(|| 0i32);
///
///         ctx.use_event(move |event| {
///             if event.is_key("up") {
///                 set_count.update(|n| n + 1);
///                 return true;
///             }
///             false
///         });
///
///         text(format!("Count: {count}"))
///     }
/// }
/// ```
pub trait Component: Send + Sync + 'static {
    /// Describe this component for the current frame.
    fn render(&self, ctx: &mut Context<'_>) -> Element;

    /// Name used in logs and tree outlines.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A styled text leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub content: String,
    pub style: TextStyle,
}

impl Text {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            style: TextStyle::default(),
        }
    }

    /// Replace the style.
    pub fn style(mut self, style: impl Into<TextStyle>) -> Self {
        self.style = style.into();
        self
    }
}

/// What a component renders to
///
/// `Text`, `Column` and `Row` are terminal shapes the reconciler handles
/// directly. `Component` is expanded by calling its `render`.
#[derive(Clone)]
pub enum Element {
    Text(Text),
    /// Children stacked top to bottom
    Column(Vec<Element>),
    /// Children stacked left to right
    Row(Vec<Element>),
    Component(Arc<dyn Component>),
}

impl Element {
    /// Wrap a user component.
    pub fn component(component: impl Component) -> Self {
        Element::Component(Arc::new(component))
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Element::Text(_) => "Text",
            Element::Column(_) => "Column",
            Element::Row(_) => "Row",
            Element::Component(component) => component.name(),
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Element::Column(children) => f.debug_tuple("Column").field(children).finish(),
            Element::Row(children) => f.debug_tuple("Row").field(children).finish(),
            Element::Component(component) => {
                f.debug_tuple("Component").field(&component.name()).finish()
            }
        }
    }
}

impl From<Text> for Element {
    fn from(text: Text) -> Self {
        Element::Text(text)
    }
}

impl From<&str> for Element {
    fn from(content: &str) -> Self {
        Element::Text(Text::new(content))
    }
}

impl From<String> for Element {
    fn from(content: String) -> Self {
        Element::Text(Text::new(content))
    }
}

/// An unstyled text leaf.
pub fn text(content: impl Into<String>) -> Element {
    Element::Text(Text::new(content))
}

/// A text leaf with a style.
pub fn styled(content: impl Into<String>, style: impl Into<TextStyle>) -> Element {
    Element::Text(Text::new(content).style(style))
}

/// Stack children vertically.
pub fn column(children: impl IntoIterator<Item = Element>) -> Element {
    Element::Column(children.into_iter().collect())
}

/// Stack children horizontally.
pub fn row(children: impl IntoIterator<Item = Element>) -> Element {
    Element::Row(children.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::{Color, Style};

    struct Label;

    impl Component for Label {
        fn render(&self, _ctx: &mut Context<'_>) -> Element {
            text("label")
        }
    }

    #[test]
    fn test_builders() {
        let tree = column([text("a"), row(["b".into(), "c".into()])]);
        match tree {
            Element::Column(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[1], Element::Row(row) if row.len() == 2));
            }
            other => panic!("expected column, got {other:?}"),
        }
    }

    #[test]
    fn test_styled_text() {
        let style = Style::default().fg(Color::Red);
        let Element::Text(leaf) = styled("x", style) else {
            panic!("expected text");
        };
        assert_eq!(leaf.style.style, style);
        assert_eq!(leaf.content, "x");
    }

    #[test]
    fn test_component_label() {
        let element = Element::component(Label);
        assert!(element.label().ends_with("Label"));
        assert!(format!("{element:?}").starts_with("Component("));
        assert_eq!(text("t").label(), "Text");
    }
}
