//! Legal placement search
//!
//! Every placement a player can make must cover one of their anchors: the
//! origin before their first move, a free corner of their territory after.
//! The search fans out one rayon task per piece; each task tries every
//! orientation aligned every possible way onto every anchor and streams
//! legal cell sets back over a channel.

use crate::board::{Board, PlayerId, Point};
use crate::piece::{Piece, PieceError, PieceSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

/// A set of absolute board cells covered by one piece
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Placement(BTreeSet<Point>);

impl Placement {
    pub fn new(cells: impl IntoIterator<Item = Point>) -> Self {
        Self(cells.into_iter().collect())
    }

    pub fn cells(&self) -> impl Iterator<Item = &Point> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<Point> {
        self.0.iter().copied().collect()
    }

    pub fn contains(&self, p: &Point) -> bool {
        self.0.contains(p)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shares at least one cell with `cells`
    pub fn overlaps(&self, cells: &Placement) -> bool {
        self.0.iter().any(|p| cells.contains(p))
    }

    /// The shape covering these cells, in the orientation they form
    pub fn piece(&self) -> Result<Piece, PieceError> {
        Piece::from_cells(&self.to_vec()).map(|(piece, _)| piece)
    }
}

impl FromIterator<Point> for Placement {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Cells a player's next piece must cover one of
pub fn anchors(board: &Board, pid: PlayerId) -> Vec<Point> {
    match board.origin(pid) {
        Some(origin) if !board.origin_claimed(pid) => vec![origin],
        _ => board.find_corners(&board.find_territory(pid), pid),
    }
}

/// Every legal placement for `pid` using `pieces`.
///
/// With `stop_at_first` the search returns as soon as any placement is
/// found, so the result holds at most one entry.
pub fn search(
    board: &Board,
    pid: PlayerId,
    pieces: &PieceSet,
    stop_at_first: bool,
) -> BTreeSet<Placement> {
    let anchors = anchors(board, pid);
    search_from(board, pid, pieces, &anchors, stop_at_first)
}

/// Like [`search`] but restricted to placements covering one of `anchors`
pub fn search_from(
    board: &Board,
    pid: PlayerId,
    pieces: &PieceSet,
    anchors: &[Point],
    stop_at_first: bool,
) -> BTreeSet<Placement> {
    if anchors.is_empty() || pieces.is_empty() {
        return BTreeSet::new();
    }

    let pieces = pieces.sorted();
    let found = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel();

    pieces.par_iter().for_each_with(tx, |tx, piece| {
        for orientation in piece.orientations() {
            let cells = orientation.to_points();
            for &anchor in anchors {
                for &pivot in &cells {
                    if stop_at_first && found.load(Ordering::Acquire) {
                        return;
                    }
                    let shift = anchor - pivot;
                    let target: Vec<Point> = cells.iter().map(|&c| c + shift).collect();
                    if !board.valid_placement(&target, pid) {
                        continue;
                    }
                    if stop_at_first && found.swap(true, Ordering::AcqRel) {
                        return;
                    }
                    if tx.send(Placement::new(target)).is_err() {
                        return;
                    }
                }
            }
        }
    });

    // every sender was dropped when the parallel loop joined
    let results: BTreeSet<Placement> = rx.into_iter().collect();
    tracing::trace!(pid, anchors = anchors.len(), found = results.len(), "placement search");
    results
}

/// Whether `pid` has any legal move left
pub fn has_placement(board: &Board, pid: PlayerId, pieces: &PieceSet) -> bool {
    !search(board, pid, pieces, true).is_empty()
}
