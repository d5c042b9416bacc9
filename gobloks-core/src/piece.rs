//! Polyomino bitboards
//!
//! A piece is packed into a `u64` treated as an 8x8 grid: cell `(x, y)` is
//! bit `x + 8 * y`, so each byte is one row. Every stored representation is
//! normalized (bounding box touches `(0, 0)`), which makes the eight
//! dihedral images of a shape directly comparable as integers.

use crate::board::Point;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Side length of the piece grid
pub const GRID: i32 = 8;

/// Largest piece the grid can hold in every orientation
pub const MAX_DEGREE: usize = 8;

/// High bit of every row
const COLUMN_MASK: u64 = 0x8080_8080_8080_8080;

/// Gathers the high bit of each row into the top byte
const COLUMN_MAGIC: u64 = 0x0002_0408_1020_4081;

const ROW_MASK: u64 = 0xff;

/// Diagonal offsets paired with the two orthogonal neighbours they share
const DIAGONALS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PieceError {
    #[error("coordinate out of piece grid: ({0}, {1})")]
    OutOfGrid(i32, i32),
    #[error("piece has no cells")]
    Empty,
    #[error("degree {0} exceeds maximum of {MAX_DEGREE}")]
    DegreeTooLarge(usize),
}

// ============================================================================
// BIT PRIMITIVES
// ============================================================================

/// Mirror axis
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Reverse the order of rows
    Horizontal,
    /// Reverse the order of cells within each row
    Vertical,
}

#[inline]
fn bit(x: i32, y: i32) -> u64 {
    1u64 << (x + GRID * y)
}

#[inline]
fn occupied(repr: u64, x: i32, y: i32) -> bool {
    (0..GRID).contains(&x) && (0..GRID).contains(&y) && repr & bit(x, y) != 0
}

/// Extract column `col` as a byte whose bit `y` is cell `(col, y)`
#[inline]
fn column(repr: u64, col: u32) -> u64 {
    (((repr << (7 - col)) & COLUMN_MASK).wrapping_mul(COLUMN_MAGIC)) >> 56
}

/// Shift a representation so its bounding box touches the origin
pub fn normalize(repr: u64) -> u64 {
    if repr == 0 {
        return 0;
    }
    let min_row = repr.trailing_zeros() / 8;
    let min_col = (0..8)
        .map(|row| ((repr >> (row * 8)) & ROW_MASK) as u8)
        .filter(|bits| *bits != 0)
        .map(u8::trailing_zeros)
        .min()
        .unwrap_or(0);
    repr >> (min_col + 8 * min_row)
}

/// Rotate a quarter turn: cell `(x, y)` moves to `(y, 7 - x)`, then normalize
pub fn rotate90(repr: u64) -> u64 {
    let mut out = 0u64;
    for col in 0..8u32 {
        out |= column(repr, col) << (8 * (7 - col));
    }
    normalize(out)
}

pub fn reflect(repr: u64, axis: Axis) -> u64 {
    let mirrored = match axis {
        Axis::Horizontal => repr.swap_bytes(),
        Axis::Vertical => repr.reverse_bits().swap_bytes(),
    };
    normalize(mirrored)
}

/// The eight dihedral images of a representation, identity first
pub fn symmetries(repr: u64) -> [u64; 8] {
    let mut out = [0u64; 8];
    let mut current = normalize(repr);
    for i in 0..4 {
        out[i] = current;
        out[i + 4] = reflect(current, Axis::Horizontal);
        current = rotate90(current);
    }
    out
}

/// Minimum representation over all rotations and reflections
pub fn canonical_hash(repr: u64) -> u64 {
    symmetries(repr).into_iter().min().unwrap_or(0)
}

pub fn pack(points: &[Point]) -> Result<u64, PieceError> {
    points.iter().try_fold(0u64, |acc, p| {
        if (0..GRID).contains(&p.x) && (0..GRID).contains(&p.y) {
            Ok(acc | bit(p.x, p.y))
        } else {
            Err(PieceError::OutOfGrid(p.x, p.y))
        }
    })
}

pub fn to_points(repr: u64) -> Vec<Point> {
    let mut points = Vec::with_capacity(repr.count_ones() as usize);
    let mut rest = repr;
    while rest != 0 {
        let idx = rest.trailing_zeros() as i32;
        points.push(Point::new(idx % GRID, idx / GRID));
        rest &= rest - 1;
    }
    points
}

/// Free corners of a shape, limited to the piece grid
pub fn corners(repr: u64) -> Vec<Point> {
    let mut found = BTreeSet::new();
    for p in to_points(repr) {
        for (dx, dy) in DIAGONALS {
            let (cx, cy) = (p.x + dx, p.y + dy);
            if !(0..GRID).contains(&cx) || !(0..GRID).contains(&cy) {
                continue;
            }
            if occupied(repr, cx, cy) || occupied(repr, cx, p.y) || occupied(repr, p.x, cy) {
                continue;
            }
            found.insert(Point::new(cx, cy));
        }
    }
    found.into_iter().collect()
}

// ============================================================================
// PIECE
// ============================================================================

/// A polyomino in one concrete orientation.
///
/// Two pieces are the same shape when their hashes match and the same
/// placed orientation when their representations match too.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    #[serde(rename = "body")]
    repr: u64,
    hash: u64,
}

impl Piece {
    pub const EMPTY: Piece = Piece { repr: 0, hash: 0 };

    pub const MONOMINO: Piece = Piece { repr: 1, hash: 1 };

    pub fn from_repr(repr: u64) -> Self {
        let repr = normalize(repr);
        Self { repr, hash: canonical_hash(repr) }
    }

    /// Build from coordinates already inside the piece grid
    pub fn from_points(points: &[Point]) -> Result<Self, PieceError> {
        let repr = pack(points)?;
        if repr == 0 {
            return Err(PieceError::Empty);
        }
        Ok(Self::from_repr(repr))
    }

    /// Build from absolute board coordinates.
    ///
    /// Returns the piece and the offset of its bounding box, so that
    /// `piece.to_points()` translated by the offset gives back the input.
    pub fn from_cells(cells: &[Point]) -> Result<(Self, Point), PieceError> {
        let min_x = cells.iter().map(|p| p.x).min().ok_or(PieceError::Empty)?;
        let min_y = cells.iter().map(|p| p.y).min().ok_or(PieceError::Empty)?;
        let offset = Point::new(min_x, min_y);
        let local = cells
            .iter()
            .map(|p| match (p.x.checked_sub(min_x), p.y.checked_sub(min_y)) {
                (Some(x), Some(y)) => Ok(Point::new(x, y)),
                _ => Err(PieceError::OutOfGrid(p.x, p.y)),
            })
            .collect::<Result<Vec<Point>, _>>()?;
        Ok((Self::from_points(&local)?, offset))
    }

    pub fn repr(&self) -> u64 {
        self.repr
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn size(&self) -> usize {
        self.repr.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.repr == 0
    }

    /// Same shape, ignoring orientation
    pub fn is_same(&self, other: &Piece) -> bool {
        self.hash == other.hash
    }

    pub fn rotate90(&self) -> Self {
        Self { repr: rotate90(self.repr), hash: self.hash }
    }

    pub fn reflect(&self, axis: Axis) -> Self {
        Self { repr: reflect(self.repr, axis), hash: self.hash }
    }

    /// The orientation whose representation equals the hash
    pub fn canonical(&self) -> Self {
        Self { repr: self.hash, hash: self.hash }
    }

    /// Distinct orientations of this shape
    pub fn orientations(&self) -> Vec<Piece> {
        let mut seen = Vec::with_capacity(8);
        for repr in symmetries(self.repr) {
            if !seen.contains(&repr) {
                seen.push(repr);
            }
        }
        seen.into_iter().map(|repr| Piece { repr, hash: self.hash }).collect()
    }

    pub fn to_points(&self) -> Vec<Point> {
        to_points(self.repr)
    }

    pub fn corners(&self) -> Vec<Point> {
        corners(self.repr)
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..GRID {
            let row: String = (0..GRID)
                .map(|x| if occupied(self.repr, x, y) { '#' } else { '.' })
                .collect();
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}

// ============================================================================
// PIECE SET
// ============================================================================

/// Pieces keyed by canonical hash, each stored in canonical orientation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PieceSet {
    pieces: FxHashMap<u64, Piece>,
}

impl PieceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the shape was already present
    pub fn insert(&mut self, piece: Piece) -> bool {
        if self.pieces.contains_key(&piece.hash) {
            return false;
        }
        self.pieces.insert(piece.hash, piece.canonical());
        true
    }

    pub fn remove(&mut self, hash: u64) -> Option<Piece> {
        self.pieces.remove(&hash)
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.pieces.contains_key(&hash)
    }

    pub fn get(&self, hash: u64) -> Option<&Piece> {
        self.pieces.get(&hash)
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    /// Pieces ordered by size, then hash
    pub fn sorted(&self) -> Vec<Piece> {
        let mut out: Vec<Piece> = self.pieces.values().copied().collect();
        out.sort_by_key(|p| (p.size(), p.hash));
        out
    }

    pub fn total_cells(&self) -> usize {
        self.pieces.values().map(Piece::size).sum()
    }
}

impl FromIterator<Piece> for PieceSet {
    fn from_iter<I: IntoIterator<Item = Piece>>(iter: I) -> Self {
        let mut set = PieceSet::new();
        for piece in iter {
            set.insert(piece);
        }
        set
    }
}

impl Serialize for PieceSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.sorted().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PieceSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pieces = Vec::<Piece>::deserialize(deserializer)?;
        Ok(pieces.into_iter().collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================
