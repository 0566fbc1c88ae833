//! Active piece - a catalog shape placed on the grid
//!
//! A [`Block`] is a shape reference plus origin and rotation index. Its cells are the
//! origin plus the filled offsets of the current rotation matrix. Blocks are cheap
//! `Copy` values: moves and rotations produce candidates that the controller validates
//! against the board before committing.

use arrayvec::ArrayVec;

use crate::catalog::{Matrix, ShapeDef};
use crate::types::{Rgb, MAX_PIECE_CELLS};

/// Absolute board coordinates of a piece.
pub type Cells = ArrayVec<(i8, i8), MAX_PIECE_CELLS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    shape: &'static ShapeDef,
    pub x: i8,
    pub y: i8,
    rotation: u8,
}

impl Block {
    pub fn new(shape: &'static ShapeDef, x: i8, y: i8) -> Self {
        Self {
            shape,
            x,
            y,
            rotation: 0,
        }
    }

    /// Spawn position: horizontally centered by the rotation-0 width, `y = 0`.
    pub fn spawn(shape: &'static ShapeDef, board_width: u8) -> Self {
        let x = (board_width as i8 - shape.width(0) as i8) / 2;
        Self::new(shape, x, 0)
    }

    pub fn shape(&self) -> &'static ShapeDef {
        self.shape
    }

    pub fn symbol(&self) -> &'static str {
        self.shape.symbol
    }

    pub fn color(&self) -> Rgb {
        self.shape.color
    }

    /// Rotation index, always in `0..state_count`.
    pub fn rotation(&self) -> u8 {
        self.rotation
    }

    pub fn matrix(&self) -> Matrix {
        self.shape.matrix(self.rotation)
    }

    /// Occupied cells in absolute coordinates.
    pub fn cells(&self) -> Cells {
        self.shape
            .offsets(self.rotation)
            .into_iter()
            .map(|(dx, dy)| (self.x + dx, self.y + dy))
            .collect()
    }

    /// Copy shifted by `(dx, dy)`.
    pub fn moved(&self, dx: i8, dy: i8) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn rotate_clockwise(&mut self) {
        self.rotation = (self.rotation + 1) % self.shape.state_count();
    }

    pub fn rotate_counterclockwise(&mut self) {
        let n = self.shape.state_count();
        self.rotation = (self.rotation + n - 1) % n;
    }

    /// Topmost occupied row.
    pub fn top(&self) -> i8 {
        self.cells().iter().map(|&(_, y)| y).min().unwrap_or(self.y)
    }
}

/// Owned description of a piece as seen on the wire.
///
/// Remote pieces arrive as a raw matrix rather than a catalog symbol, so this carries the
/// matrix itself. Used for outbound state and for the display-only opponent board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceState {
    pub x: i8,
    pub y: i8,
    pub rotation: u8,
    pub color: Rgb,
    /// Current rotation matrix, `true` for filled.
    pub matrix: Vec<Vec<bool>>,
}

impl PieceState {
    /// Absolute filled cells. Cells whose coordinates do not fit in `i8` are skipped.
    pub fn cells(&self) -> Vec<(i8, i8)> {
        let offset = |origin: i8, d: usize| i8::try_from(d).ok().and_then(|d| origin.checked_add(d));
        let mut out = Vec::with_capacity(MAX_PIECE_CELLS);
        for (dy, row) in self.matrix.iter().enumerate() {
            for (dx, &filled) in row.iter().enumerate() {
                if !filled {
                    continue;
                }
                if let (Some(x), Some(y)) = (offset(self.x, dx), offset(self.y, dy)) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    /// Whether the piece could plausibly sit on a `width` x `height` board: the matrix is no
    /// larger than the board and the origin lies within one board size of it.
    pub fn fits_board(&self, width: u8, height: u8) -> bool {
        let (w, h) = (i16::from(width), i16::from(height));
        self.matrix.len() <= height as usize
            && self.matrix.iter().all(|row| row.len() <= width as usize)
            && (-w..=w).contains(&i16::from(self.x))
            && (-h..=h).contains(&i16::from(self.y))
    }
}

impl From<&Block> for PieceState {
    fn from(block: &Block) -> Self {
        Self {
            x: block.x,
            y: block.y,
            rotation: block.rotation,
            color: block.color(),
            matrix: block
                .matrix()
                .iter()
                .map(|row| row.bytes().map(|b| b == b'#').collect())
                .collect(),
        }
    }
}

/// Partial update of a [`PieceState`]; absent fields keep their previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieceUpdate {
    pub x: Option<i8>,
    pub y: Option<i8>,
    pub rotation: Option<u8>,
    pub color: Option<Rgb>,
    pub matrix: Option<Vec<Vec<bool>>>,
}

impl PieceUpdate {
    /// Merge into `previous`. Without a previous piece every field must be present.
    pub fn merge(self, previous: Option<&PieceState>) -> Option<PieceState> {
        match previous {
            Some(prev) => Some(PieceState {
                x: self.x.unwrap_or(prev.x),
                y: self.y.unwrap_or(prev.y),
                rotation: self.rotation.unwrap_or(prev.rotation),
                color: self.color.unwrap_or(prev.color),
                matrix: self.matrix.unwrap_or_else(|| prev.matrix.clone()),
            }),
            None => Some(PieceState {
                x: self.x?,
                y: self.y?,
                rotation: self.rotation.unwrap_or(0),
                color: self.color?,
                matrix: self.matrix?,
            }),
        }
    }
}
