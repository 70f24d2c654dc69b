//! Style descriptors and their rasterization into cell grids
//!
//! A [`TextStyle`] describes how a text leaf looks: cell attributes, optional
//! borders with per-side colors, and margins. A [`StyleResolver`] turns a
//! content string plus a descriptor into a [`Grid`]; the layout engine only
//! ever talks to the trait.

use std::str::FromStr;

use bitflags::bitflags;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::border;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::StyleError;
use crate::grid::{Cell, Grid};

bitflags! {
    /// Which sides of a text leaf carry a border
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Borders: u8 {
        const TOP = 0b0001;
        const RIGHT = 0b0010;
        const BOTTOM = 0b0100;
        const LEFT = 0b1000;
        const ALL = Self::TOP.bits() | Self::RIGHT.bits() | Self::BOTTOM.bits() | Self::LEFT.bits();
    }
}

/// Blank cells around the bordered box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Margin {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl Margin {
    /// Margins in CSS order: top, right, bottom, left.
    pub const fn new(top: u16, right: u16, bottom: u16, left: u16) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// The same margin on every side.
    pub const fn uniform(value: u16) -> Self {
        Self::new(value, value, value, value)
    }
}

/// Side index into [`TextStyle::border_styles`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Top = 0,
    Right = 1,
    Bottom = 2,
    Left = 3,
}

/// Abstract style of a text leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    /// Attributes and colors of content cells
    pub style: Style,
    /// Sides that carry a border
    pub borders: Borders,
    /// Glyphs used to draw the border
    pub border_set: border::Set,
    /// Per-side border styles: top, right, bottom, left
    pub border_styles: [Style; 4],
    /// Blank space outside the border
    pub margin: Margin,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            style: Style::default(),
            borders: Borders::empty(),
            border_set: border::PLAIN,
            border_styles: [Style::default(); 4],
            margin: Margin::default(),
        }
    }
}

impl From<Style> for TextStyle {
    fn from(style: Style) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }
}

impl TextStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fg(mut self, color: Color) -> Self {
        self.style = self.style.fg(color);
        self
    }

    pub fn bg(mut self, color: Color) -> Self {
        self.style = self.style.bg(color);
        self
    }

    pub fn add_modifier(mut self, modifier: Modifier) -> Self {
        self.style = self.style.add_modifier(modifier);
        self
    }

    pub fn bold(self) -> Self {
        self.add_modifier(Modifier::BOLD)
    }

    pub fn italic(self) -> Self {
        self.add_modifier(Modifier::ITALIC)
    }

    pub fn underlined(self) -> Self {
        self.add_modifier(Modifier::UNDERLINED)
    }

    /// Enable borders on the given sides.
    pub fn borders(mut self, borders: Borders) -> Self {
        self.borders = borders;
        self
    }

    /// Use a different border glyph set, e.g. `border::ROUNDED`.
    pub fn border_set(mut self, set: border::Set) -> Self {
        self.border_set = set;
        self
    }

    /// Style the border on each of the given sides.
    pub fn border_style(mut self, sides: Borders, style: Style) -> Self {
        for (flag, side) in [
            (Borders::TOP, Side::Top),
            (Borders::RIGHT, Side::Right),
            (Borders::BOTTOM, Side::Bottom),
            (Borders::LEFT, Side::Left),
        ] {
            if sides.contains(flag) {
                self.border_styles[side as usize] = style;
            }
        }
        self
    }

    pub fn margin(mut self, margin: Margin) -> Self {
        self.margin = margin;
        self
    }

    fn side(&self, side: Side) -> Style {
        self.border_styles[side as usize]
    }
}

/// Rasterizes a content string under a [`TextStyle`]
///
/// Implementations must be pure: the same inputs always produce the same
/// grid. The returned grid is positioned at the origin; the layout engine
/// moves it.
pub trait StyleResolver: Send + Sync {
    fn resolve(&self, content: &str, style: &TextStyle) -> Grid;
}

/// Margin, border and grapheme aware resolver
///
/// Each grapheme cluster occupies one cell. Line breaks start a new row.
/// Corners take the style of the top or bottom border.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStyleResolver;

impl StyleResolver for DefaultStyleResolver {
    fn resolve(&self, content: &str, style: &TextStyle) -> Grid {
        let lines: Vec<Vec<&str>> = content
            .split('\n')
            .map(|line| line.trim_end_matches('\r').graphemes(true).collect())
            .collect();

        let inner_height = clamp(lines.len());
        let inner_width = clamp(lines.iter().map(Vec::len).max().unwrap_or(0));

        let b = style.borders;
        let m = style.margin;
        let top = u16::from(b.contains(Borders::TOP));
        let left = u16::from(b.contains(Borders::LEFT));
        let right = u16::from(b.contains(Borders::RIGHT));
        let bottom = u16::from(b.contains(Borders::BOTTOM));

        let box_width = left.saturating_add(inner_width).saturating_add(right);
        let box_height = top.saturating_add(inner_height).saturating_add(bottom);
        let width = m.left.saturating_add(box_width).saturating_add(m.right);
        let height = m.top.saturating_add(box_height).saturating_add(m.bottom);

        let mut grid = Grid::new(Rect::new(0, 0, width, height));

        // Content
        let origin_col = m.left.saturating_add(left);
        let origin_row = m.top.saturating_add(top);
        for (row, line) in lines.iter().enumerate().take(inner_height as usize) {
            for (col, grapheme) in line.iter().enumerate().take(inner_width as usize) {
                grid.set(
                    origin_col.saturating_add(col as u16),
                    origin_row.saturating_add(row as u16),
                    Cell::from_grapheme(grapheme, style.style),
                );
            }
        }

        if b.is_empty() || box_width == 0 || box_height == 0 {
            return grid;
        }

        let set = &style.border_set;
        let first_col = m.left;
        let last_col = first_col.saturating_add(box_width - 1);
        let first_row = m.top;
        let last_row = first_row.saturating_add(box_height - 1);

        // Vertical sides skip the rows owned by the top and bottom borders
        let side_rows =
            first_row.saturating_add(top)..last_row.saturating_add(1).saturating_sub(bottom);
        if b.contains(Borders::LEFT) {
            for row in side_rows.clone() {
                grid.set(first_col, row, border_cell(set.vertical_left, style.side(Side::Left)));
            }
        }
        if b.contains(Borders::RIGHT) {
            for row in side_rows {
                grid.set(last_col, row, border_cell(set.vertical_right, style.side(Side::Right)));
            }
        }

        if b.contains(Borders::TOP) {
            let edge = style.side(Side::Top);
            for col in first_col..=last_col {
                grid.set(col, first_row, border_cell(set.horizontal_top, edge));
            }
            if b.contains(Borders::LEFT) {
                grid.set(first_col, first_row, border_cell(set.top_left, edge));
            }
            if b.contains(Borders::RIGHT) {
                grid.set(last_col, first_row, border_cell(set.top_right, edge));
            }
        }
        if b.contains(Borders::BOTTOM) {
            let edge = style.side(Side::Bottom);
            for col in first_col..=last_col {
                grid.set(col, last_row, border_cell(set.horizontal_bottom, edge));
            }
            if b.contains(Borders::LEFT) {
                grid.set(first_col, last_row, border_cell(set.bottom_left, edge));
            }
            if b.contains(Borders::RIGHT) {
                grid.set(last_col, last_row, border_cell(set.bottom_right, edge));
            }
        }

        grid
    }
}

fn clamp(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn border_cell(symbol: &str, style: Style) -> Cell {
    Cell::from_grapheme(symbol, style)
}

/// Parse a color string: a name (`"red"`, `"lightblue"`), a hex triplet
/// (`"#ff8800"`) or a palette index (`"42"`).
pub fn parse_color(input: &str) -> Result<Color, StyleError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(StyleError::MalformedColor(input.to_string()));
    }
    if let Some(hex) = trimmed.strip_prefix('#') {
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StyleError::MalformedColor(input.to_string()));
        }
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        let index: u16 = trimmed
            .parse()
            .map_err(|_| StyleError::MalformedColor(input.to_string()))?;
        return u8::try_from(index)
            .map(Color::Indexed)
            .map_err(|_| StyleError::ColorOutOfRange { index, max: 255 });
    }
    Color::from_str(trimmed).map_err(|_| StyleError::MalformedColor(input.to_string()))
}

/// One of the 16 standard terminal colors, by palette index.
pub fn ansi16(index: u16) -> Result<Color, StyleError> {
    const PALETTE: [Color; 16] = [
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Yellow,
        Color::Blue,
        Color::Magenta,
        Color::Cyan,
        Color::Gray,
        Color::DarkGray,
        Color::LightRed,
        Color::LightGreen,
        Color::LightYellow,
        Color::LightBlue,
        Color::LightMagenta,
        Color::LightCyan,
        Color::White,
    ];
    PALETTE
        .get(index as usize)
        .copied()
        .ok_or(StyleError::ColorOutOfRange { index, max: 15 })
}
