//! Game metadata persistence
//!
//! Only lobby-level facts live here: the config, the seated players and
//! the status flags. Board state is never persisted.

use crate::config::GameConfig;
use crate::messages::PlayerSummary;
use gobloks_core::GameStatus;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

pub type GameId = u64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("no stored game with id {0}")]
    Missing(GameId),
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub gid: GameId,
    pub config: GameConfig,
    pub status: GameStatus,
    pub players: Vec<PlayerSummary>,
}

impl GameRecord {
    pub fn is_waiting(&self) -> bool {
        self.config.public
            && !self.status.has(GameStatus::FULL)
            && !self.status.has(GameStatus::COMPLETE)
    }
}

pub trait GameStore: Send + Sync {
    fn add_game(&self, config: &GameConfig) -> Result<GameId, StoreError>;
    fn update_game_status(&self, gid: GameId, status: GameStatus) -> Result<(), StoreError>;
    fn update_game_players(&self, gid: GameId, players: Vec<PlayerSummary>) -> Result<(), StoreError>;
    fn remove_game(&self, gid: GameId) -> Result<(), StoreError>;
    fn get_game(&self, gid: GameId) -> Option<GameRecord>;
    /// Public games still looking for players, oldest first
    fn waiting_games(&self, page: usize, page_size: usize) -> Vec<GameRecord>;
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicU64,
    records: RwLock<BTreeMap<GameId, GameRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, gid: GameId, f: impl FnOnce(&mut GameRecord)) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records.get_mut(&gid).ok_or(StoreError::Missing(gid))?;
        f(record);
        Ok(())
    }
}

impl GameStore for MemoryStore {
    fn add_game(&self, config: &GameConfig) -> Result<GameId, StoreError> {
        let gid = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let record = GameRecord {
            gid,
            config: config.clone(),
            status: GameStatus::default(),
            players: Vec::new(),
        };
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(gid, record);
        Ok(gid)
    }

    fn update_game_status(&self, gid: GameId, status: GameStatus) -> Result<(), StoreError> {
        self.update(gid, |record| record.status = status)
    }

    fn update_game_players(&self, gid: GameId, players: Vec<PlayerSummary>) -> Result<(), StoreError> {
        self.update(gid, |record| record.players = players)
    }

    fn remove_game(&self, gid: GameId) -> Result<(), StoreError> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&gid)
            .map(|_| ())
            .ok_or(StoreError::Missing(gid))
    }

    fn get_game(&self, gid: GameId) -> Option<GameRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&gid)
            .cloned()
    }

    fn waiting_games(&self, page: usize, page_size: usize) -> Vec<GameRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|record| record.is_waiting())
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect()
    }
}
