//! Active game registry
//!
//! Owns every running game plus the session tokens handed out on join.
//! Games are created through the store so that ids and lobby metadata
//! come from the same place.

use crate::config::GameConfig;
use crate::game::{lock_game, Game, GameError, SharedGame};
use crate::store::{GameId, GameRecord, GameStore};
use gobloks_core::PlayerId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Who a session token speaks for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
    pub gid: GameId,
    pub pid: PlayerId,
}

pub struct GameManager {
    games: RwLock<FxHashMap<GameId, SharedGame>>,
    sessions: RwLock<FxHashMap<String, Session>>,
    store: Arc<dyn GameStore>,
    rng: Mutex<ChaCha20Rng>,
    grace_period: Duration,
}

impl GameManager {
    pub fn new(store: Arc<dyn GameStore>, grace_period: Duration) -> Self {
        Self::with_rng(store, grace_period, ChaCha20Rng::from_entropy())
    }

    /// Deterministic tokens, for tests
    pub fn with_rng(store: Arc<dyn GameStore>, grace_period: Duration, rng: ChaCha20Rng) -> Self {
        Self {
            games: RwLock::new(FxHashMap::default()),
            sessions: RwLock::new(FxHashMap::default()),
            store,
            rng: Mutex::new(rng),
            grace_period,
        }
    }

    pub fn store(&self) -> &dyn GameStore {
        self.store.as_ref()
    }

    pub fn create(&self, config: GameConfig) -> Result<GameId, GameError> {
        config.validate()?;
        let gid = self.store.add_game(&config)?;
        let game = match Game::new(gid, config, Arc::clone(&self.store), self.grace_period) {
            Ok(game) => game,
            Err(e) => {
                let _ = self.store.remove_game(gid);
                return Err(e);
            }
        };
        self.games
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(gid, game);
        Ok(gid)
    }

    pub fn find(&self, gid: GameId) -> Option<SharedGame> {
        self.games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&gid)
            .cloned()
    }

    pub fn list(&self) -> Vec<GameId> {
        let mut ids: Vec<GameId> = self
            .games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.games.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn waiting_games(&self, page: usize, page_size: usize) -> Vec<GameRecord> {
        self.store.waiting_games(page, page_size)
    }

    /// Drop a game, its sessions and its stored record
    pub fn delete(&self, gid: GameId) -> bool {
        let removed = self
            .games
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&gid);
        let Some(game) = removed else {
            return false;
        };
        lock_game(&game).shutdown();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, session| session.gid != gid);
        if let Err(e) = self.store.remove_game(gid) {
            tracing::warn!(gid, error = %e, "stored game already gone");
        }
        tracing::info!(gid, "game removed");
        true
    }

    /// Seat a player and hand back their session token
    pub fn join(&self, gid: GameId, name: &str, color: &str) -> Result<(PlayerId, String), GameError> {
        let game = self.find(gid).ok_or(GameError::NotFound(gid))?;
        let pid = lock_game(&game).add_player(name, color)?;
        Ok((pid, self.issue_token(gid, pid)))
    }

    pub fn issue_token(&self, gid: GameId, pid: PlayerId) -> String {
        let bytes: [u8; 16] = self.rng.lock().unwrap_or_else(PoisonError::into_inner).gen();
        let token: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), Session { gid, pid });
        token
    }

    pub fn resolve_token(&self, token: &str) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .copied()
    }

    /// Remove every game idle past its limit, returning their ids
    pub fn sweep_stale(&self, now: Instant) -> Vec<GameId> {
        let stale: Vec<GameId> = self
            .games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, game)| lock_game(game).is_stale(now))
            .map(|(&gid, _)| gid)
            .collect();
        for &gid in &stale {
            self.delete(gid);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::game::ActionError;
    use crate::store::MemoryStore;

    fn manager() -> GameManager {
        GameManager::with_rng(
            Arc::new(MemoryStore::new()),
            Duration::from_secs(15),
            ChaCha20Rng::seed_from_u64(7),
        )
    }

    fn small() -> GameConfig {
        GameConfig { players: 2, block_degree: 3, ..Default::default() }
    }

    #[test]
    fn test_create_find_delete() {
        let m = manager();
        let gid = m.create(small()).unwrap();
        assert!(m.find(gid).is_some());
        assert_eq!(m.list(), vec![gid]);
        assert_eq!(m.waiting_games(0, 10).len(), 1);

        assert!(m.delete(gid));
        assert!(m.find(gid).is_none());
        assert!(!m.delete(gid));
        assert!(m.store().get_game(gid).is_none());
    }

    #[test]
    fn test_invalid_config_stores_nothing() {
        let m = manager();
        let err = m.create(GameConfig { block_degree: 0, ..small() }).unwrap_err();
        assert!(matches!(err, GameError::Config(ConfigError::BlockDegree(0))));
        assert!(m.is_empty());
        assert!(m.waiting_games(0, 10).is_empty());
    }

    #[test]
    fn test_join_issues_tokens() {
        let m = manager();
        let gid = m.create(small()).unwrap();
        let (pid1, token1) = m.join(gid, "ana", "red").unwrap();
        let (pid2, token2) = m.join(gid, "bo", "blue").unwrap();
        assert_eq!((pid1, pid2), (1, 2));
        assert_ne!(token1, token2);
        assert_eq!(token1.len(), 32);
        assert_eq!(m.resolve_token(&token2), Some(Session { gid, pid: 2 }));
        assert_eq!(m.resolve_token("nope"), None);

        let err = m.join(gid, "cy", "green").unwrap_err();
        assert!(matches!(err, GameError::Action(ActionError::LobbyFull)));
        assert!(matches!(m.join(99, "x", "y"), Err(GameError::NotFound(99))));

        // full games leave the lobby
        assert!(m.waiting_games(0, 10).is_empty());
    }

    #[test]
    fn test_delete_revokes_sessions() {
        let m = manager();
        let gid = m.create(small()).unwrap();
        let (_, token) = m.join(gid, "ana", "red").unwrap();
        m.delete(gid);
        assert_eq!(m.resolve_token(&token), None);
    }

    #[test]
    fn test_sweep_stale() {
        let m = manager();
        let idle = m.create(small()).unwrap();
        let timed = m
            .create(GameConfig { time_control_seconds: 60, ..small() })
            .unwrap();

        let now = Instant::now();
        assert!(m.sweep_stale(now).is_empty());

        // timed games expire after 5 * players * time control
        let swept = m.sweep_stale(now + Duration::from_secs(601));
        assert_eq!(swept, vec![timed]);
        assert!(m.find(idle).is_some());

        let swept = m.sweep_stale(now + Duration::from_secs(8 * 24 * 3600));
        assert_eq!(swept, vec![idle]);
        assert!(m.is_empty());
    }
}
