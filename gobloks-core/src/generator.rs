//! Polyomino enumeration
//!
//! Pieces grow one cell at a time. Each level of growth runs on its own
//! thread; level `k` reads the distinct `k-1` cell shapes from the level
//! before it and passes its own distinct shapes on to level `k+1`, while
//! every accepted shape also flows into a shared results channel.

use crate::board::ORTHOGONALS;
use crate::piece::{Piece, PieceError, PieceSet, MAX_DEGREE};
use rustc_hash::FxHashSet;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::thread;

/// Capacity of each link between growth levels
const LINK_CAPACITY: usize = 64;

/// Every distinct shape up to some degree
#[derive(Clone, Debug, Default)]
pub struct GeneratedPieces {
    pub pieces: PieceSet,
    pub total_cells: usize,
}

/// All shapes made by adding one cell to `piece`, one per canonical hash.
/// The empty piece grows into the monomino.
pub fn generate_next_pieces(piece: &Piece) -> Vec<Piece> {
    if piece.is_empty() {
        return vec![Piece::MONOMINO];
    }

    let cells = piece.to_points();
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();

    for &cell in &cells {
        for &dir in &ORTHOGONALS {
            let next = cell + dir;
            if cells.contains(&next) {
                continue;
            }
            let mut grown = cells.clone();
            grown.push(next);
            // a cell to the left or above shifts the whole shape back in
            let Ok((candidate, _)) = Piece::from_cells(&grown) else {
                continue;
            };
            if seen.insert(candidate.hash()) {
                out.push(candidate);
            }
        }
    }
    out
}

fn grow_level(input: Receiver<Piece>, next: Option<SyncSender<Piece>>, results: Sender<Piece>) {
    let mut seen = FxHashSet::default();
    for piece in input {
        for candidate in generate_next_pieces(&piece) {
            if !seen.insert(candidate.hash()) {
                continue;
            }
            if results.send(candidate).is_err() {
                return;
            }
            if let Some(next) = &next {
                if next.send(candidate).is_err() {
                    return;
                }
            }
        }
    }
}

/// Enumerate every distinct polyomino with `1..=degree` cells
pub fn generate_piece_set(degree: usize) -> Result<GeneratedPieces, PieceError> {
    if degree > MAX_DEGREE {
        return Err(PieceError::DegreeTooLarge(degree));
    }
    if degree == 0 {
        return Ok(GeneratedPieces::default());
    }

    let pieces: PieceSet = thread::scope(|scope| {
        let (result_tx, result_rx) = mpsc::channel();
        let (seed_tx, seed_rx) = mpsc::sync_channel(1);

        let mut input = seed_rx;
        for level in 1..=degree {
            let (next_tx, next_rx) = mpsc::sync_channel(LINK_CAPACITY);
            let next = (level < degree).then_some(next_tx);
            let rx = std::mem::replace(&mut input, next_rx);
            let results = result_tx.clone();
            scope.spawn(move || grow_level(rx, next, results));
        }
        drop(result_tx);

        // the first worker owns its receiver, so this cannot fail
        let _ = seed_tx.send(Piece::EMPTY);
        drop(seed_tx);

        result_rx.into_iter().collect()
    });

    let total_cells = pieces.total_cells();
    tracing::debug!(degree, pieces = pieces.len(), total_cells, "generated piece set");
    Ok(GeneratedPieces { pieces, total_cells })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_grows_into_monomino() {
        assert_eq!(generate_next_pieces(&Piece::EMPTY), vec![Piece::MONOMINO]);
    }

    #[test]
    fn test_monomino_grows_into_domino() {
        let next = generate_next_pieces(&Piece::MONOMINO);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].size(), 2);
    }

    #[test]
    fn test_degree_sweep() {
        let counts: Vec<usize> = (0..=5)
            .map(|d| generate_piece_set(d).unwrap().pieces.len())
            .collect();
        assert_eq!(counts, vec![0, 1, 2, 4, 9, 21]);
    }

    #[test]
    fn test_total_cells() {
        // 1 + 2 + 3*2 + 4*5 + 5*12
        assert_eq!(generate_piece_set(5).unwrap().total_cells, 89);
        assert_eq!(generate_piece_set(0).unwrap().total_cells, 0);
    }

    #[test]
    fn test_sizes_per_level() {
        let set = generate_piece_set(6).unwrap().pieces;
        let hexominoes = set.iter().filter(|p| p.size() == 6).count();
        assert_eq!(hexominoes, 35);
        assert!(set.iter().all(|p| p.repr() == p.hash()));
    }

    #[test]
    fn test_degree_too_large() {
        assert_eq!(
            generate_piece_set(MAX_DEGREE + 1).unwrap_err(),
            PieceError::DegreeTooLarge(MAX_DEGREE + 1)
        );
    }
}
