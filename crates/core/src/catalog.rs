//! Piece catalog - immutable shape and rotation-state tables
//!
//! Every shape is an ordered list of rotation matrices (rows of `#` / `.`) plus a display
//! color. Rotation never transforms geometry at runtime: rotating a piece only moves its
//! index through this list.
//!
//! Two families are available:
//! - **Tetrominoes**: the seven 4-cell pieces, laid out on SRS-style matrices
//! - **Pentominoes**: the eighteen 5-cell pieces (mirror images are separate shapes)

use arrayvec::ArrayVec;
use rand::Rng;

use crate::types::{PieceFamily, Rgb, MAX_PIECE_CELLS};

/// One rotation state: rows of `#` (filled) and `.` (empty).
pub type Matrix = &'static [&'static str];

/// Cell offsets of one rotation state relative to the matrix origin.
pub type Offsets = ArrayVec<(i8, i8), MAX_PIECE_CELLS>;

/// Static definition of a piece shape.
#[derive(Debug, PartialEq, Eq)]
pub struct ShapeDef {
    /// Wire symbol ("T", "F_MIRROR", ...)
    pub symbol: &'static str,
    pub color: Rgb,
    pub states: &'static [Matrix],
}

impl ShapeDef {
    /// Number of rotation states (1, 2 or 4).
    pub fn state_count(&self) -> u8 {
        self.states.len() as u8
    }

    /// Matrix for a rotation index (taken modulo the state count).
    pub fn matrix(&self, rotation: u8) -> Matrix {
        self.states[rotation as usize % self.states.len()]
    }

    /// Column count of a rotation state's matrix.
    pub fn width(&self, rotation: u8) -> u8 {
        self.matrix(rotation)
            .iter()
            .map(|row| row.len())
            .max()
            .unwrap_or(0) as u8
    }

    /// Offsets of filled cells, row-major.
    pub fn offsets(&self, rotation: u8) -> Offsets {
        let mut out = Offsets::new();
        for (dy, row) in self.matrix(rotation).iter().enumerate() {
            for (dx, b) in row.bytes().enumerate() {
                if b == b'#' {
                    out.push((dx as i8, dy as i8));
                }
            }
        }
        out
    }
}

const CYAN: Rgb = Rgb::new(130, 238, 253);
const YELLOW: Rgb = Rgb::new(255, 245, 157);
const PURPLE: Rgb = Rgb::new(209, 196, 233);
const GREEN: Rgb = Rgb::new(165, 214, 167);
const RED: Rgb = Rgb::new(255, 171, 145);
const BLUE: Rgb = Rgb::new(144, 202, 249);
const ORANGE: Rgb = Rgb::new(255, 204, 128);

const PINK: Rgb = Rgb::new(248, 187, 208);
const TEAL: Rgb = Rgb::new(178, 223, 219);
const LIME: Rgb = Rgb::new(220, 237, 200);
const MAGENTA: Rgb = Rgb::new(244, 143, 177);
const NAVY: Rgb = Rgb::new(159, 168, 218);
const OLIVE: Rgb = Rgb::new(230, 238, 156);
const MAROON: Rgb = Rgb::new(239, 154, 154);
const AQUA: Rgb = Rgb::new(128, 222, 234);
const FUCHSIA: Rgb = Rgb::new(240, 98, 146);
const SILVER: Rgb = Rgb::new(207, 216, 220);
const GOLD: Rgb = Rgb::new(255, 229, 127);
const CORAL: Rgb = Rgb::new(255, 138, 101);

/// The seven tetrominoes.
pub static TETROMINOES: [ShapeDef; 7] = [
    ShapeDef {
        symbol: "I",
        color: CYAN,
        states: &[
            &["....", "####", "....", "...."],
            &["..#.", "..#.", "..#.", "..#."],
            &["....", "....", "####", "...."],
            &[".#..", ".#..", ".#..", ".#.."],
        ],
    },
    ShapeDef {
        symbol: "O",
        color: YELLOW,
        states: &[&["##", "##"]],
    },
    ShapeDef {
        symbol: "T",
        color: PURPLE,
        states: &[
            &[".#.", "###", "..."],
            &[".#.", ".##", ".#."],
            &["...", "###", ".#."],
            &[".#.", "##.", ".#."],
        ],
    },
    ShapeDef {
        symbol: "S",
        color: GREEN,
        states: &[
            &[".##", "##.", "..."],
            &[".#.", ".##", "..#"],
            &["...", ".##", "##."],
            &["#..", "##.", ".#."],
        ],
    },
    ShapeDef {
        symbol: "Z",
        color: RED,
        states: &[
            &["##.", ".##", "..."],
            &["..#", ".##", ".#."],
            &["...", "##.", ".##"],
            &[".#.", "##.", "#.."],
        ],
    },
    ShapeDef {
        symbol: "J",
        color: BLUE,
        states: &[
            &["#..", "###", "..."],
            &[".##", ".#.", ".#."],
            &["...", "###", "..#"],
            &[".#.", ".#.", "##."],
        ],
    },
    ShapeDef {
        symbol: "L",
        color: ORANGE,
        states: &[
            &["..#", "###", "..."],
            &[".#.", ".#.", ".##"],
            &["...", "###", "#.."],
            &["##.", ".#.", ".#."],
        ],
    },
];

/// The eighteen pentominoes.
pub static PENTOMINOES: [ShapeDef; 18] = [
    ShapeDef {
        symbol: "F",
        color: PINK,
        states: &[
            &[".##", "##.", ".#."],
            &[".#.", "###", "..#"],
            &[".#.", ".##", "##."],
            &["#..", "###", ".#."],
        ],
    },
    ShapeDef {
        symbol: "F_MIRROR",
        color: TEAL,
        states: &[
            &["##.", ".##", ".#."],
            &["..#", "###", ".#."],
            &[".#.", "##.", ".##"],
            &[".#.", "###", "#.."],
        ],
    },
    ShapeDef {
        symbol: "I",
        color: CYAN,
        states: &[
            &["#####"],
            &["#", "#", "#", "#", "#"],
        ],
    },
    ShapeDef {
        symbol: "L",
        color: LIME,
        states: &[
            &["#.", "#.", "#.", "##"],
            &["####", "#..."],
            &["##", ".#", ".#", ".#"],
            &["...#", "####"],
        ],
    },
    ShapeDef {
        symbol: "L_MIRROR",
        color: MAGENTA,
        states: &[
            &[".#", ".#", ".#", "##"],
            &["#...", "####"],
            &["##", "#.", "#.", "#."],
            &["####", "...#"],
        ],
    },
    ShapeDef {
        symbol: "N",
        color: NAVY,
        states: &[
            &[".#", "##", "#.", "#."],
            &["##..", ".###"],
            &[".#", ".#", "##", "#."],
            &["###.", "..##"],
        ],
    },
    ShapeDef {
        symbol: "N_MIRROR",
        color: OLIVE,
        states: &[
            &["#.", "##", ".#", ".#"],
            &[".###", "##.."],
            &["#.", "#.", "##", ".#"],
            &["..##", "###."],
        ],
    },
    ShapeDef {
        symbol: "P",
        color: MAROON,
        states: &[
            &["##", "##", "#."],
            &["###", ".##"],
            &[".#", "##", "##"],
            &["##.", "###"],
        ],
    },
    ShapeDef {
        symbol: "P_MIRROR",
        color: AQUA,
        states: &[
            &["##", "##", ".#"],
            &[".##", "###"],
            &["#.", "##", "##"],
            &["###", "##."],
        ],
    },
    ShapeDef {
        symbol: "T",
        color: PURPLE,
        states: &[
            &["###", ".#.", ".#."],
            &["..#", "###", "..#"],
            &[".#.", ".#.", "###"],
            &["#..", "###", "#.."],
        ],
    },
    ShapeDef {
        symbol: "U",
        color: FUCHSIA,
        states: &[
            &["#.#", "###"],
            &["##", "#.", "##"],
            &["###", "#.#"],
            &["##", ".#", "##"],
        ],
    },
    ShapeDef {
        symbol: "V",
        color: SILVER,
        states: &[
            &["#..", "#..", "###"],
            &["###", "#..", "#.."],
            &["###", "..#", "..#"],
            &["..#", "..#", "###"],
        ],
    },
    ShapeDef {
        symbol: "W",
        color: GOLD,
        states: &[
            &["#..", "##.", ".##"],
            &[".##", "##.", "#.."],
            &["##.", ".##", "..#"],
            &["..#", ".##", "##."],
        ],
    },
    ShapeDef {
        symbol: "X",
        color: CORAL,
        states: &[
            &[".#.", "###", ".#."],
        ],
    },
    ShapeDef {
        symbol: "Y",
        color: GREEN,
        states: &[
            &[".#", "##", ".#", ".#"],
            &["..#.", "####"],
            &["#.", "#.", "##", "#."],
            &["####", ".#.."],
        ],
    },
    ShapeDef {
        symbol: "Y_MIRROR",
        color: RED,
        states: &[
            &["#.", "##", "#.", "#."],
            &["####", "..#."],
            &[".#", ".#", "##", ".#"],
            &[".#..", "####"],
        ],
    },
    ShapeDef {
        symbol: "Z",
        color: BLUE,
        states: &[
            &["##.", ".#.", ".##"],
            &["..#", "###", "#.."],
            &["##.", ".#.", ".##"],
            &["..#", "###", "#.."],
        ],
    },
    ShapeDef {
        symbol: "Z_MIRROR",
        color: ORANGE,
        states: &[
            &[".##", ".#.", "##."],
            &["#..", "###", "..#"],
            &[".##", ".#.", "##."],
            &["#..", "###", "..#"],
        ],
    },
];

/// All shapes of a family.
pub fn shapes(family: PieceFamily) -> &'static [ShapeDef] {
    match family {
        PieceFamily::Tetromino => &TETROMINOES,
        PieceFamily::Pentomino => &PENTOMINOES,
    }
}

/// Resolve a wire symbol within a family (case-insensitive).
pub fn lookup(family: PieceFamily, symbol: &str) -> Option<&'static ShapeDef> {
    shapes(family)
        .iter()
        .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
}

/// Uniform random shape from a family.
pub fn random_shape<R: Rng + ?Sized>(family: PieceFamily, rng: &mut R) -> &'static ShapeDef {
    let all = shapes(family);
    &all[rng.random_range(0..all.len())]
}
