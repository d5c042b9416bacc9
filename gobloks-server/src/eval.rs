//! Background look-ahead worker
//!
//! After every move the game hands a deep copy of its state to this
//! worker, which recomputes each player's mobility with a full search off
//! the game lock and keeps the latest result.

use gobloks_core::{evaluate, Evaluation, GameState, PieceSet, PlayerId};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// A frozen position to analyse
pub struct Lookahead {
    pub state: GameState,
    pub inventories: Vec<(PlayerId, PieceSet)>,
    /// Size of each player's placement cache when the copy was taken
    pub cached: Vec<(PlayerId, usize)>,
}

type Latest = Arc<Mutex<Option<Evaluation>>>;

pub struct EvalEngine {
    tx: Option<Sender<Lookahead>>,
    latest: Latest,
}

impl EvalEngine {
    pub fn spawn(name: String) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let latest: Latest = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&latest);
        thread::Builder::new()
            .name(name)
            .spawn(move || run(rx, slot))?;
        Ok(Self { tx: Some(tx), latest })
    }

    /// Queue a position; dropped silently once stopped
    pub fn submit(&self, lookahead: Lookahead) {
        if let Some(tx) = &self.tx {
            if tx.send(lookahead).is_err() {
                tracing::debug!("evaluation worker already gone");
            }
        }
    }

    /// Close the queue. The worker exits after its current position.
    pub fn stop(&mut self) {
        self.tx = None;
    }

    pub fn is_running(&self) -> bool {
        self.tx.is_some()
    }

    pub fn latest(&self) -> Option<Evaluation> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

fn run(rx: Receiver<Lookahead>, latest: Latest) {
    for mut lookahead in rx.iter() {
        // only the newest position matters
        while let Ok(newer) = rx.try_recv() {
            lookahead = newer;
        }

        let evaluation = evaluate(&lookahead.state, &lookahead.inventories);
        for (pid, cached) in &lookahead.cached {
            if let Some(eval) = evaluation.player(*pid) {
                if eval.mobility != *cached {
                    tracing::warn!(
                        pid,
                        cached,
                        searched = eval.mobility,
                        "placement cache disagrees with full search"
                    );
                }
            }
        }
        tracing::debug!(turn = evaluation.turn, ?evaluation.players, "position evaluated");
        *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(evaluation);
    }
}
