//! Positioned grids of styled character cells

use ratatui::layout::Rect;
use ratatui::style::Style;

/// One character cell: a display rune, its combining runes, and a style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Base rune
    pub symbol: char,
    /// Combining runes drawn in the same cell
    pub combining: Vec<char>,
    /// Resolved display style
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank()
    }
}

impl Cell {
    /// A space with the default style.
    pub fn blank() -> Self {
        Self {
            symbol: ' ',
            combining: Vec::new(),
            style: Style::default(),
        }
    }

    /// A single rune with the default style.
    pub fn new(symbol: char) -> Self {
        Self {
            symbol,
            ..Self::blank()
        }
    }

    /// Build a cell from a grapheme cluster.
    ///
    /// The first rune is the symbol, the rest are combining runes.
    pub fn from_grapheme(grapheme: &str, style: Style) -> Self {
        let mut chars = grapheme.chars();
        let symbol = chars.next().unwrap_or(' ');
        Self {
            symbol,
            combining: chars.collect(),
            style,
        }
    }

    /// Replace the style.
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// The full grapheme as a string.
    pub fn grapheme(&self) -> String {
        let mut s = String::with_capacity(1 + self.combining.len());
        s.push(self.symbol);
        s.extend(&self.combining);
        s
    }
}

/// A rectangle whose far edges are clamped to the `u16` coordinate space.
pub fn clamped_rect(x: u16, y: u16, width: u16, height: u16) -> Rect {
    Rect {
        x,
        y,
        width: x.saturating_add(width) - x,
        height: y.saturating_add(height) - y,
    }
}

/// Outcome of copying one grid into another
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Blit {
    /// Cells copied into the target
    pub written: usize,
    /// Cells dropped because they fell outside the target
    pub clipped: usize,
}

/// A rectangle of cells at an absolute screen position
///
/// Cells are stored row-major. Local coordinates (`col`, `row`) are
/// relative to the grid origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    area: Rect,
    cells: Vec<Cell>,
}

impl Grid {
    /// A blank grid covering `area`.
    pub fn new(area: Rect) -> Self {
        let len = area.width as usize * area.height as usize;
        Self {
            area,
            cells: vec![Cell::blank(); len],
        }
    }

    /// A zero-sized grid at the given origin.
    pub fn empty(x: u16, y: u16) -> Self {
        Self::new(Rect {
            x,
            y,
            width: 0,
            height: 0,
        })
    }

    /// The covered rectangle.
    pub fn area(&self) -> Rect {
        self.area
    }

    /// Grid width in cells.
    pub fn width(&self) -> u16 {
        self.area.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> u16 {
        self.area.height
    }

    /// Move the grid to a new origin without touching its cells.
    ///
    /// The grid never extends past `u16::MAX`; columns or rows pushed beyond
    /// it are dropped.
    pub fn set_origin(&mut self, x: u16, y: u16) {
        let moved = clamped_rect(x, y, self.area.width, self.area.height);
        if moved.width == self.area.width && moved.height == self.area.height {
            self.area = moved;
            return;
        }

        let mut resized = Grid::new(moved);
        for row in 0..moved.height {
            for col in 0..moved.width {
                if let Some(cell) = self.get(col, row) {
                    resized.set(col, row, cell.clone());
                }
            }
        }
        *self = resized;
    }

    fn index(&self, col: u16, row: u16) -> Option<usize> {
        (col < self.area.width && row < self.area.height)
            .then(|| row as usize * self.area.width as usize + col as usize)
    }

    /// Cell at local coordinates.
    pub fn get(&self, col: u16, row: u16) -> Option<&Cell> {
        self.index(col, row).map(|i| &self.cells[i])
    }

    /// Mutable cell at local coordinates.
    pub fn get_mut(&mut self, col: u16, row: u16) -> Option<&mut Cell> {
        self.index(col, row).map(|i| &mut self.cells[i])
    }

    /// Write a cell at local coordinates. Returns `false` if out of bounds.
    pub fn set(&mut self, col: u16, row: u16, cell: Cell) -> bool {
        match self.get_mut(col, row) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// Copy `child` into this grid at the child's absolute position.
    ///
    /// Bounds-safe: cells of the child that fall outside this grid are not
    /// written and are counted in [`Blit::clipped`].
    pub fn blit(&mut self, child: &Grid) -> Blit {
        let mut result = Blit::default();
        let dx = i32::from(child.area.x) - i32::from(self.area.x);
        let dy = i32::from(child.area.y) - i32::from(self.area.y);

        for row in 0..child.area.height {
            for col in 0..child.area.width {
                let Some(cell) = child.get(col, row) else {
                    continue;
                };
                let target_col = i32::from(col) + dx;
                let target_row = i32::from(row) + dy;
                let target = u16::try_from(target_col)
                    .ok()
                    .zip(u16::try_from(target_row).ok())
                    .and_then(|(c, r)| self.index(c, r));
                match target {
                    Some(i) => {
                        self.cells[i] = cell.clone();
                        result.written += 1;
                    }
                    None => result.clipped += 1,
                }
            }
        }
        result
    }

    /// Iterate over rows of cells.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        let width = self.area.width.max(1) as usize;
        self.cells
            .chunks(width)
            .take(if self.area.width == 0 { 0 } else { self.area.height as usize })
    }

    /// Plain text of each row, without styles.
    pub fn to_lines(&self) -> Vec<String> {
        self.rows()
            .map(|row| row.iter().map(Cell::grapheme).collect())
            .collect()
    }
}
