//! Circular board geometry and placement legality
//!
//! The board is a square grid indexed `[x][y]` whose cells outside an
//! inscribed circle are permanently reserved. Each player gets one origin
//! cell on the circumference; their first piece must cover it, and every
//! later piece must touch their territory corner-to-corner and never
//! edge-to-edge.

use crate::circle::Circle;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;
use std::ops::{Add, Sub};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Largest radius a board may be built with
pub const MAX_RADIUS: i32 = 4096;

/// Orthogonal neighbour offsets
pub const ORTHOGONALS: [Point; 4] = [
    Point::new(1, 0),
    Point::new(-1, 0),
    Point::new(0, 1),
    Point::new(0, -1),
];

/// Diagonal neighbour offsets
pub const DIAGONALS: [Point; 4] = [
    Point::new(1, 1),
    Point::new(1, -1),
    Point::new(-1, 1),
    Point::new(-1, -1),
];

// ============================================================================
// CORE TYPES
// ============================================================================

/// 1-based player identifier
pub type PlayerId = u16;

/// No player
pub const PID_NONE: PlayerId = 0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cell ownership word.
///
/// The low 16 bits hold a player id; the high bits flag vacancy, origin
/// cells and reserved (off-board) cells. An unclaimed origin carries its
/// player's id together with both the origin and vacant flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Owner(pub u32);

impl Owner {
    pub const PLAYER_MASK: u32 = 0xffff;
    const VACANT_BIT: u32 = 1 << 29;
    const ORIGIN_BIT: u32 = 1 << 30;
    const RESERVED_BIT: u32 = 1 << 31;

    pub const VACANT: Owner = Owner(Self::VACANT_BIT);
    pub const RESERVED: Owner = Owner(Self::RESERVED_BIT);

    pub const fn player(pid: PlayerId) -> Self {
        Owner(pid as u32)
    }

    pub const fn origin(pid: PlayerId) -> Self {
        Owner(pid as u32 | Self::ORIGIN_BIT | Self::VACANT_BIT)
    }

    pub fn pid(self) -> PlayerId {
        (self.0 & Self::PLAYER_MASK) as PlayerId
    }

    pub fn is_vacant(self) -> bool {
        self.0 & Self::VACANT_BIT != 0
    }

    pub fn is_origin(self) -> bool {
        self.0 & Self::ORIGIN_BIT != 0
    }

    pub fn is_reserved(self) -> bool {
        self.0 & Self::RESERVED_BIT != 0
    }

    /// Cell is claimed by `pid`
    pub fn is_owned_by(self, pid: PlayerId) -> bool {
        pid != PID_NONE && !self.is_vacant() && !self.is_reserved() && self.pid() == pid
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoardError {
    #[error("board needs at least one player")]
    NoPlayers,
    #[error("invalid or duplicate player id: {0}")]
    InvalidPlayer(PlayerId),
    #[error("tightening factor must be positive and finite, got {0}")]
    InvalidDensity(f64),
    #[error("board radius too large")]
    RadiusOverflow,
    #[error("no room on the circumference for another origin")]
    NoOriginRoom,
    #[error("out of bounds: {0}")]
    OutOfBounds(Point),
    #[error("square is occupied: {0}")]
    Occupied(Point),
    #[error("illegal placement")]
    IllegalPlacement,
}

// ============================================================================
// BOARD
// ============================================================================

#[derive(Clone, Debug)]
pub struct Board {
    layout: Vec<Vec<Owner>>,
    radius: i32,
    origins: FxHashMap<PlayerId, Point>,
}

impl Board {
    /// Build a board sized so that `tightening_factor * pi * r^2` is about
    /// `players.len() * cells_per_player`, with origins spread evenly by
    /// angle around the rim.
    pub fn new(
        players: &[PlayerId],
        cells_per_player: usize,
        tightening_factor: f64,
    ) -> Result<Self, BoardError> {
        if players.is_empty() {
            return Err(BoardError::NoPlayers);
        }
        if !tightening_factor.is_finite() || tightening_factor <= 0.0 {
            return Err(BoardError::InvalidDensity(tightening_factor));
        }
        let mut seen = BTreeSet::new();
        for &pid in players {
            if pid == PID_NONE || !seen.insert(pid) {
                return Err(BoardError::InvalidPlayer(pid));
            }
        }

        let cells = players
            .len()
            .checked_mul(cells_per_player)
            .ok_or(BoardError::RadiusOverflow)?;
        let exact = (cells as f64 / tightening_factor / PI).sqrt();
        if !exact.is_finite() || exact > MAX_RADIUS as f64 {
            return Err(BoardError::RadiusOverflow);
        }

        // every player needs a distinct rim cell
        let mut radius = exact as i32;
        let circle = loop {
            let circle = Circle::bresenham(radius, Point::new(radius, radius));
            if circle.circumference.len() >= players.len() {
                break circle;
            }
            radius += 1;
            if radius > MAX_RADIUS {
                return Err(BoardError::RadiusOverflow);
            }
        };

        let diameter = (2 * radius + 1) as usize;
        let mut layout = vec![vec![Owner::RESERVED; diameter]; diameter];

        let mut spans: FxHashMap<i32, (i32, i32)> = FxHashMap::default();
        for p in &circle.circumference {
            let span = spans.entry(p.y).or_insert((p.x, p.x));
            span.0 = span.0.min(p.x);
            span.1 = span.1.max(p.x);
        }
        for (y, (lo, hi)) in spans {
            for x in lo..=hi {
                layout[x as usize][y as usize] = Owner::VACANT;
            }
        }

        let mut board = Self { layout, radius, origins: FxHashMap::default() };
        let step = 2.0 * PI / players.len() as f64;
        let mut taken = Vec::with_capacity(players.len());
        for (i, &pid) in players.iter().enumerate() {
            let pt = circle
                .point_on_circle(step * i as f64, &taken)
                .ok_or(BoardError::NoOriginRoom)?;
            board.occupy(pt, Owner::origin(pid))?;
            board.origins.insert(pid, pt);
            taken.push(pt);
        }

        Ok(board)
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Side length of the square grid
    pub fn diameter(&self) -> usize {
        self.layout.len()
    }

    pub fn origin(&self, pid: PlayerId) -> Option<Point> {
        self.origins.get(&pid).copied()
    }

    pub fn players(&self) -> Vec<PlayerId> {
        let mut pids: Vec<PlayerId> = self.origins.keys().copied().collect();
        pids.sort_unstable();
        pids
    }

    /// Raw ownership grid, indexed `[x][y]`
    pub fn snapshot(&self) -> Vec<Vec<Owner>> {
        self.layout.clone()
    }

    /// Ownership of a playable cell; `None` when off the board
    pub fn owner_at(&self, p: Point) -> Option<Owner> {
        if p.x < 0 || p.y < 0 {
            return None;
        }
        let owner = *self.layout.get(p.x as usize)?.get(p.y as usize)?;
        (!owner.is_reserved()).then_some(owner)
    }

    pub fn in_bounds(&self, p: Point) -> bool {
        self.owner_at(p).is_some()
    }

    pub fn is_vacant(&self, p: Point) -> bool {
        self.owner_at(p).is_some_and(Owner::is_vacant)
    }

    fn owned_by(&self, p: Point, pid: PlayerId) -> bool {
        self.owner_at(p).is_some_and(|o| o.is_owned_by(pid))
    }

    fn set(&mut self, p: Point, owner: Owner) {
        self.layout[p.x as usize][p.y as usize] = owner;
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    pub fn occupy(&mut self, p: Point, owner: Owner) -> Result<(), BoardError> {
        match self.owner_at(p) {
            None => Err(BoardError::OutOfBounds(p)),
            Some(o) if !o.is_vacant() => Err(BoardError::Occupied(p)),
            Some(_) => {
                self.set(p, owner);
                Ok(())
            }
        }
    }

    /// Clear a cell; an origin cell goes back to its unclaimed state
    pub fn vacate(&mut self, p: Point) {
        if !self.in_bounds(p) {
            return;
        }
        let restored = self
            .origins
            .iter()
            .find(|(_, origin)| **origin == p)
            .map(|(&pid, _)| Owner::origin(pid))
            .unwrap_or(Owner::VACANT);
        self.set(p, restored);
    }

    /// Validate and commit. Either every cell is claimed or the board is
    /// left exactly as it was.
    pub fn place(&mut self, cells: &[Point], pid: PlayerId) -> Result<(), BoardError> {
        if !self.valid_placement(cells, pid) {
            return Err(BoardError::IllegalPlacement);
        }

        let mut applied: Vec<(Point, Owner)> = Vec::with_capacity(cells.len());
        for &p in cells {
            let previous = self.owner_at(p).unwrap_or(Owner::RESERVED);
            if let Err(e) = self.occupy(p, Owner::player(pid)) {
                for (q, prev) in applied.into_iter().rev() {
                    self.set(q, prev);
                }
                return Err(e);
            }
            applied.push((p, previous));
        }
        Ok(())
    }

    // ========================================================================
    // LEGALITY
    // ========================================================================

    fn is_own_origin(&self, p: Point, pid: PlayerId) -> bool {
        self.owner_at(p)
            .is_some_and(|o| o.is_origin() && o.is_vacant() && o.pid() == pid)
    }

    fn touches_edge(&self, p: Point, pid: PlayerId) -> bool {
        ORTHOGONALS.iter().any(|&d| self.owned_by(p + d, pid))
    }

    fn touches_corner(&self, p: Point, pid: PlayerId) -> bool {
        DIAGONALS.iter().any(|&d| self.owned_by(p + d, pid))
    }

    pub fn valid_placement(&self, cells: &[Point], pid: PlayerId) -> bool {
        if cells.is_empty() || pid == PID_NONE {
            return false;
        }
        let mut anchored = false;
        for &p in cells {
            let Some(owner) = self.owner_at(p) else {
                return false;
            };
            if !owner.is_vacant() {
                return false;
            }
            if owner.is_origin() && owner.pid() != pid {
                return false;
            }
            if self.touches_edge(p, pid) {
                return false;
            }
            anchored |= self.is_own_origin(p, pid) || self.touches_corner(p, pid);
        }
        anchored
    }

    /// Cells `pid` may extend from: vacant, diagonal to their territory and
    /// not edge-adjacent to it
    pub fn has_corner(&self, p: Point, pid: PlayerId) -> bool {
        self.is_vacant(p) && self.touches_corner(p, pid) && !self.touches_edge(p, pid)
    }

    pub fn find_territory(&self, pid: PlayerId) -> Vec<Point> {
        let mut territory = Vec::new();
        for (x, column) in self.layout.iter().enumerate() {
            for (y, owner) in column.iter().enumerate() {
                if owner.is_owned_by(pid) {
                    territory.push(Point::new(x as i32, y as i32));
                }
            }
        }
        territory
    }

    /// Free corners around the given cells, without duplicates
    pub fn find_corners(&self, territory: &[Point], pid: PlayerId) -> Vec<Point> {
        let mut corners = BTreeSet::new();
        for &t in territory {
            for &d in &DIAGONALS {
                let c = t + d;
                if self.has_corner(c, pid) {
                    corners.insert(c);
                }
            }
        }
        corners.into_iter().collect()
    }

    /// The player's origin has been claimed by them
    pub fn origin_claimed(&self, pid: PlayerId) -> bool {
        self.origin(pid).is_some_and(|p| self.owned_by(p, pid))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.diameter();
        for y in (0..size).rev() {
            for x in 0..size {
                let o = self.layout[x][y];
                if o.is_reserved() {
                    write!(f, "   ")?;
                } else if o.is_origin() {
                    write!(f, " *{}", o.pid() % 10)?;
                } else if o.is_vacant() {
                    write!(f, "  .")?;
                } else {
                    write!(f, "{:>3}", o.pid())?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
