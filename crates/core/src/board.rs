//! Board module - manages the game grid
//!
//! The board is a `width x height` grid where each cell is empty or holds the color of
//! the piece that filled it. Storage is a flat row-major vector sized once per game, so
//! the per-tick paths (collision tests, line clears) never allocate.
//!
//! Coordinates: `(x, y)` with `x` in `0..width` left to right and `y` in `0..height`
//! top to bottom. Cells with `y < 0` lie above the visible board and are legal for a
//! falling piece.

use rand::Rng;

use crate::piece::Block;
use crate::types::{Cell, GameMode, Rgb, GARBAGE_COLOR};

/// Window found by [`Board::find_densest_mixed_region`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Center column.
    pub x: i8,
    /// Center row.
    pub y: i8,
    /// `occupied * empty` inside the window.
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    width: u8,
    height: u8,
    /// Flat array of cells, row-major order (y * width + x)
    cells: Vec<Cell>,
}

impl Board {
    /// Create a new empty board
    pub fn new(width: u8, height: u8) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    /// Empty board with the dimensions of a mode.
    pub fn for_mode(mode: GameMode) -> Self {
        let (w, h) = mode.grid();
        Self::new(w, h)
    }

    /// Build from row-major cells. `None` if the length does not match.
    pub fn from_cells(width: u8, height: u8, cells: Vec<Cell>) -> Option<Self> {
        if cells.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            cells,
        })
    }

    /// Build from rows of `#` (occupied, given color) and `.` (empty).
    ///
    /// Rows shorter than `width` are padded with empty cells; missing rows are added at the
    /// top so the pattern sits on the floor.
    pub fn from_ascii(width: u8, height: u8, rows: &[&str], color: Rgb) -> Self {
        let mut board = Self::new(width, height);
        let offset = height as usize - rows.len().min(height as usize);
        for (i, row) in rows.iter().take(height as usize).enumerate() {
            for (x, b) in row.bytes().take(width as usize).enumerate() {
                if b == b'#' {
                    board.set(x as i8, (offset + i) as i8, Some(color));
                }
            }
        }
        board
    }

    #[inline(always)]
    fn index(&self, x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= self.width as i8 || y < 0 || y >= self.height as i8 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        self.index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match self.index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Check if position is occupied (within bounds and filled)
    pub fn is_occupied(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(Some(_)))
    }

    fn row(&self, y: usize) -> &[Cell] {
        let w = self.width as usize;
        &self.cells[y * w..(y + 1) * w]
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        y < self.height as usize && self.row(y).iter().all(|cell| cell.is_some())
    }

    /// Whether the given absolute cells fit.
    ///
    /// Columns outside `0..width` and rows `>= height` never fit. Rows above the board are
    /// skipped. With `ignore_occupancy` only the bounds are checked.
    pub fn fits(&self, cells: &[(i8, i8)], ignore_occupancy: bool) -> bool {
        cells.iter().all(|&(x, y)| {
            if x < 0 || x >= self.width as i8 || y >= self.height as i8 {
                return false;
            }
            y < 0 || ignore_occupancy || !self.is_occupied(x, y)
        })
    }

    pub fn is_valid_position(&self, block: &Block) -> bool {
        self.fits(&block.cells(), false)
    }

    /// Copy the block's in-range cells into the grid. No legality check.
    pub fn place(&mut self, block: &Block) {
        let color = Some(block.color());
        for (x, y) in block.cells() {
            self.set(x, y, color);
        }
    }

    /// Rows the block can still fall before it stops.
    pub fn drop_distance(&self, block: &Block, ignore_occupancy: bool) -> i8 {
        let mut distance = 0;
        while self.fits(&block.moved(0, distance + 1).cells(), ignore_occupancy) {
            distance += 1;
        }
        distance
    }

    /// Remove every full row, shifting the rest down, and return how many were removed.
    /// Uses a two-pointer pass from the bottom; no allocation.
    pub fn clear_full_lines(&mut self) -> u32 {
        let width = self.width as usize;
        let mut write_y = self.height as usize;
        let mut cleared = 0;

        for read_y in (0..self.height as usize).rev() {
            if self.is_row_full(read_y) {
                cleared += 1;
            } else {
                write_y -= 1;
                if write_y != read_y {
                    let src = read_y * width;
                    self.cells.copy_within(src..src + width, write_y * width);
                }
            }
        }

        self.cells[..write_y * width].fill(None);
        cleared
    }

    /// True iff any cell of `row` is occupied.
    pub fn is_topped_out(&self, row: i8) -> bool {
        if row < 0 || row >= self.height as i8 {
            return false;
        }
        self.row(row as usize).iter().any(|c| c.is_some())
    }

    /// Push `count` garbage rows in from the bottom.
    ///
    /// Existing content moves up by `count`; whatever crosses the top is discarded. Each new
    /// row is full except one uniformly random gap column.
    pub fn add_garbage<R: Rng + ?Sized>(&mut self, count: u32, rng: &mut R) {
        let count = (count as usize).min(self.height as usize);
        if count == 0 {
            return;
        }
        let width = self.width as usize;
        let height = self.height as usize;

        self.cells.copy_within(count * width.., 0);
        for y in height - count..height {
            let gap = rng.random_range(0..width);
            for x in 0..width {
                self.cells[y * width + x] = if x == gap { None } else { Some(GARBAGE_COLOR) };
            }
        }
    }

    /// Empty the square of side `2 * radius + 1` around `(cx, cy)`, clipped to the board.
    /// Returns the number of cells that were occupied.
    pub fn clear_area(&mut self, cx: i8, cy: i8, radius: i8) -> u32 {
        let mut cleared = 0;
        for y in cy - radius..=cy + radius {
            for x in cx - radius..=cx + radius {
                if let Some(idx) = self.index(x, y) {
                    if self.cells[idx].take().is_some() {
                        cleared += 1;
                    }
                }
            }
        }
        cleared
    }

    /// Drop the bottom `n` rows and insert empty rows on top.
    /// Returns the number of occupied cells removed.
    pub fn clear_bottom_rows(&mut self, n: u32) -> u32 {
        let n = (n as usize).min(self.height as usize);
        let width = self.width as usize;
        let keep = (self.height as usize - n) * width;

        let removed = self.cells[keep..].iter().filter(|c| c.is_some()).count() as u32;
        self.cells.copy_within(..keep, n * width);
        self.cells[..n * width].fill(None);
        removed
    }

    /// Window (fully inside the board) maximizing `occupied * empty`.
    ///
    /// Scans rows top to bottom, columns left to right; the first strictly best window
    /// wins. `None` when no window mixes occupied and empty cells.
    pub fn find_densest_mixed_region(&self, radius: i8) -> Option<Region> {
        let r = radius.max(0);
        let mut best: Option<Region> = None;

        for y in r..self.height as i8 - r {
            for x in r..self.width as i8 - r {
                let mut filled = 0u32;
                let mut empty = 0u32;
                for wy in y - r..=y + r {
                    for wx in x - r..=x + r {
                        if self.is_occupied(wx, wy) {
                            filled += 1;
                        } else {
                            empty += 1;
                        }
                    }
                }
                let score = filled * empty;
                if score > best.map_or(0, |b| b.score) {
                    best = Some(Region { x, y, score });
                }
            }
        }
        best
    }

    /// Let every column settle: occupied cells fall to the floor keeping their order.
    /// Returns true if anything moved.
    pub fn compress_columns(&mut self) -> bool {
        let width = self.width as usize;
        let height = self.height as usize;
        let mut moved = false;

        for x in 0..width {
            let mut write_y = height;
            for read_y in (0..height).rev() {
                let cell = self.cells[read_y * width + x];
                if cell.is_some() {
                    write_y -= 1;
                    if write_y != read_y {
                        self.cells[write_y * width + x] = cell;
                        self.cells[read_y * width + x] = None;
                        moved = true;
                    }
                }
            }
        }
        moved
    }

    /// Number of occupied cells.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width as usize)
    }

    pub fn to_rows(&self) -> Vec<Vec<Cell>> {
        self.rows().map(|r| r.to_vec()).collect()
    }

    /// Clear the entire board
    pub fn clear(&mut self) {
        self.cells.fill(None);
    }
}
