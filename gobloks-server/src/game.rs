//! Turn engine
//!
//! One [`Game`] owns a board, its seated players with their clocks, and
//! every socket watching it. All mutation happens under the game's mutex:
//! HTTP handlers, socket tasks and timer callbacks each lock it for the
//! whole of their critical section.
//!
//! Each player carries a cache of every legal placement they have. It is
//! seeded by a full search when they join and afterwards only patched
//! around the cells of each new move. A full search is run again only to
//! confirm that an emptied cache really means the player is stuck.

use crate::config::{ConfigError, GameConfig};
use crate::eval::{EvalEngine, Lookahead};
use crate::messages::{PlayerSummary, SocketMessage};
use crate::sockets::{ConnectionId, Outbound, SocketRegistry};
use crate::store::{GameId, GameStore, StoreError};
use crate::timer::Timer;
use gobloks_core::board::ORTHOGONALS;
use gobloks_core::{
    generate_piece_set, has_placement, next_in_rotation, search, search_from, winners, Board,
    BoardError, Evaluation, GameState, GameStatus, PieceError, PieceSet, Placement, PlayerId,
    PlayerStatus, Point, PID_NONE,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Longest chat message relayed
const MAX_CHAT_LEN: usize = 500;

// ============================================================================
// ERRORS
// ============================================================================

/// Rejections of a player action. The game is left untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("player inactive")]
    PlayerInactive,
    #[error("waiting for all players")]
    WaitingForPlayers,
    #[error("game is over")]
    GameOver,
    #[error("no such player: {0}")]
    UnknownPlayer(PlayerId),
    #[error("piece not in inventory")]
    PieceNotOwned,
    #[error("invalid placement")]
    IllegalPlacement,
    #[error("no more hints")]
    HintsExhausted,
    #[error("no hint available")]
    NoHintAvailable,
    #[error("game full")]
    LobbyFull,
    #[error(transparent)]
    Board(#[from] BoardError),
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("invalid game config: {0}")]
    Config(#[from] ConfigError),
    #[error("piece generation failed: {0}")]
    Piece(#[from] PieceError),
    #[error("board construction failed: {0}")]
    Board(#[from] BoardError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("failed to start evaluation worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("game not found: {0}")]
    NotFound(GameId),
    #[error(transparent)]
    Action(#[from] ActionError),
}

// ============================================================================
// CORE TYPES
// ============================================================================

pub type SharedGame = Arc<Mutex<Game>>;

/// Lock a game, recovering the guard if a previous holder panicked
pub fn lock_game(game: &Mutex<Game>) -> MutexGuard<'_, Game> {
    game.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Copy, Debug)]
enum Expiry {
    Clock,
    Grace,
}

pub struct Player {
    pub pid: PlayerId,
    pub name: String,
    pub color: String,
    pub status: PlayerStatus,
    pub pieces: PieceSet,
    pub hints: u32,
    clock: Option<Timer>,
    grace: Option<Timer>,
    placements: BTreeSet<Placement>,
    connection: Option<ConnectionId>,
}

impl Player {
    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            pid: self.pid,
            name: self.name.clone(),
            color: self.color.clone(),
            status: self.status,
            time_left_ms: self.clock.as_ref().map(Timer::time_left_ms),
        }
    }

    pub fn placements(&self) -> &BTreeSet<Placement> {
        &self.placements
    }

    fn pause_clock(&self) {
        if let Some(clock) = &self.clock {
            clock.pause();
        }
    }
}

pub struct Game {
    gid: GameId,
    config: GameConfig,
    starting_pieces: PieceSet,
    state: GameState,
    seats: Vec<PlayerId>,
    players: Vec<Option<Player>>,
    sockets: SocketRegistry,
    store: Arc<dyn GameStore>,
    eval: EvalEngine,
    grace_period: Duration,
    last_active: Instant,
    self_ref: Weak<Mutex<Game>>,
}

impl Game {
    /// Build a game: generate the piece set, size the board to it and
    /// start the evaluation worker. Nothing is returned on failure.
    pub fn new(
        gid: GameId,
        config: GameConfig,
        store: Arc<dyn GameStore>,
        grace_period: Duration,
    ) -> Result<SharedGame, GameError> {
        config.validate()?;
        let generated = generate_piece_set(config.block_degree)?;
        let seats: Vec<PlayerId> = (1..=config.players).collect();
        let board = Board::new(&seats, generated.total_cells, config.density)?;
        let eval = EvalEngine::spawn(format!("gobloks-eval-{}", gid))?;

        tracing::info!(
            gid,
            players = config.players,
            degree = config.block_degree,
            radius = board.radius(),
            "game created"
        );

        Ok(Arc::new_cyclic(|weak| {
            Mutex::new(Game {
                gid,
                players: (0..seats.len()).map(|_| None).collect(),
                seats,
                config,
                starting_pieces: generated.pieces,
                state: GameState::new(board),
                sockets: SocketRegistry::new(),
                store,
                eval,
                grace_period,
                last_active: Instant::now(),
                self_ref: weak.clone(),
            })
        }))
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn gid(&self) -> GameId {
        self.gid
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn turn(&self) -> PlayerId {
        self.state.turn
    }

    pub fn status(&self) -> GameStatus {
        self.state.status
    }

    pub fn player(&self, pid: PlayerId) -> Option<&Player> {
        let index = usize::from(pid).checked_sub(1)?;
        self.players.get(index)?.as_ref()
    }

    fn player_mut(&mut self, pid: PlayerId) -> Option<&mut Player> {
        let index = usize::from(pid).checked_sub(1)?;
        self.players.get_mut(index)?.as_mut()
    }

    pub fn summaries(&self) -> Vec<PlayerSummary> {
        self.players.iter().flatten().map(Player::summary).collect()
    }

    pub fn evaluation(&self) -> Option<Evaluation> {
        self.eval.latest()
    }

    fn is_active(&self, pid: PlayerId) -> bool {
        self.player(pid).is_some_and(|p| p.status.is_active())
    }

    fn any_active(&self) -> bool {
        self.players.iter().flatten().any(|p| p.status.is_active())
    }

    /// No activity for longer than the config allows
    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_active) >= self.config.stale_after()
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    // ========================================================================
    // LOBBY
    // ========================================================================

    pub fn add_player(&mut self, name: &str, color: &str) -> Result<PlayerId, ActionError> {
        if self.state.is_complete() {
            return Err(ActionError::GameOver);
        }
        let Some(index) = self.players.iter().position(Option::is_none) else {
            return Err(ActionError::LobbyFull);
        };
        let pid = self.seats[index];

        let clock = self.config.is_timed().then(|| {
            Timer::new(
                self.config.time_control(),
                self.config.time_bonus(),
                self.expiry_handler(pid, Expiry::Clock),
            )
        });
        let placements = search(&self.state.board, pid, &self.starting_pieces, false);

        self.players[index] = Some(Player {
            pid,
            name: name.to_string(),
            color: color.to_string(),
            status: PlayerStatus(PlayerStatus::JOINED),
            pieces: self.starting_pieces.clone(),
            hints: self.config.hints,
            clock,
            grace: None,
            placements,
            connection: None,
        });
        self.touch();
        tracing::info!(gid = self.gid, pid, name, "player joined");

        if self.players.iter().all(Option::is_some) {
            self.state.status.set(GameStatus::FULL);
            self.state.turn = self.seats[0];
            self.start_clock(self.state.turn);
            self.persist_status();
            self.broadcast_status();
            tracing::info!(gid = self.gid, "game full");
        }

        self.persist_players();
        self.broadcast_players();
        self.announce(format!("{} joined the game", name));
        Ok(pid)
    }

    fn check_action(&self, pid: PlayerId) -> Result<(), ActionError> {
        let player = self.player(pid).ok_or(ActionError::UnknownPlayer(pid))?;
        if self.state.is_complete() {
            return Err(ActionError::GameOver);
        }
        if !self.state.status.has(GameStatus::FULL) {
            return Err(ActionError::WaitingForPlayers);
        }
        if !player.status.is_active() {
            return Err(ActionError::PlayerInactive);
        }
        if self.config.turn_based && self.state.turn != pid {
            return Err(ActionError::NotYourTurn);
        }
        Ok(())
    }

    // ========================================================================
    // MOVES
    // ========================================================================

    pub fn place_piece(&mut self, pid: PlayerId, cells: &[Point]) -> Result<(), ActionError> {
        self.check_action(pid)?;

        let placement = Placement::new(cells.iter().copied());
        if placement.is_empty() || placement.len() != cells.len() {
            return Err(ActionError::IllegalPlacement);
        }
        if !placement.cells().all(|&c| self.state.board.in_bounds(c)) {
            return Err(ActionError::IllegalPlacement);
        }
        let piece = placement.piece().map_err(|_| ActionError::IllegalPlacement)?;
        {
            let player = self.player(pid).ok_or(ActionError::UnknownPlayer(pid))?;
            if !player.pieces.contains(piece.hash()) {
                return Err(ActionError::PieceNotOwned);
            }
            if !player.placements.contains(&placement) {
                return Err(ActionError::IllegalPlacement);
            }
        }

        self.state.board.place(&placement.to_vec(), pid)?;
        if let Some(player) = self.player_mut(pid) {
            player.pieces.remove(piece.hash());
            player.pause_clock();
        }
        self.state.status.set(GameStatus::IN_PROGRESS);
        self.touch();
        tracing::debug!(gid = self.gid, pid, cells = placement.len(), "piece placed");

        self.sockets.broadcast(SocketMessage::BoardUpdate {
            owner: pid,
            placed_cells: placement.clone(),
        });
        self.update_placements(pid, &placement, piece.hash());
        self.send_private_state(pid);

        if self.config.turn_based || self.state.turn == pid {
            self.next_turn();
        } else {
            self.disable_stuck_players();
            if !self.is_active(self.state.turn) {
                self.next_turn();
            }
        }

        self.broadcast_players();
        self.submit_lookahead();
        Ok(())
    }

    /// Patch every cache around the newly claimed cells
    fn update_placements(&mut self, pid: PlayerId, placed: &Placement, hash: u64) {
        for player in self.players.iter_mut().flatten() {
            player.placements.retain(|p| !p.overlaps(placed));
        }

        let board = &self.state.board;
        let Some(index) = usize::from(pid).checked_sub(1) else {
            return;
        };
        let Some(Some(player)) = self.players.get_mut(index) else {
            return;
        };
        player.placements.retain(|p| {
            !touches_edge(p, placed) && p.piece().map(|piece| piece.hash()) != Ok(hash)
        });
        let corners = board.find_corners(&placed.to_vec(), pid);
        let fresh = search_from(board, pid, &player.pieces, &corners, false);
        player.placements.extend(fresh);
    }

    /// Disable every active player whose cache is empty and for whom a
    /// full search confirms there is nothing left to place
    fn disable_stuck_players(&mut self) {
        let board = &self.state.board;
        let mut stuck = Vec::new();
        for player in self.players.iter_mut().flatten() {
            if !player.status.is_active() || !player.placements.is_empty() {
                continue;
            }
            if has_placement(board, player.pid, &player.pieces) {
                tracing::warn!(
                    gid = self.gid,
                    pid = player.pid,
                    "empty placement cache with moves left, reseeding"
                );
                player.placements = search(board, player.pid, &player.pieces, false);
                continue;
            }
            player.status.set(PlayerStatus::DISABLED);
            player.pause_clock();
            stuck.push(player.name.clone());
        }
        for name in stuck {
            tracing::debug!(gid = self.gid, name, "player out of moves");
            self.announce(format!("{} has no moves left", name));
        }
    }

    /// Pass the turn to the next active player, or end the game
    fn next_turn(&mut self) {
        if self.state.is_complete() {
            return;
        }
        self.disable_stuck_players();

        let current = self.state.turn;
        match next_in_rotation(&self.seats, current, |pid| self.is_active(pid)) {
            None => self.end_game(),
            Some(next) => {
                self.state.turn = next;
                self.start_clock(next);
                tracing::debug!(gid = self.gid, turn = next, "turn passed");
                self.broadcast_status();
            }
        }
    }

    fn start_clock(&self, pid: PlayerId) {
        let Some(clock) = self.player(pid).and_then(|p| p.clock.as_ref()) else {
            return;
        };
        if let Err(e) = clock.start() {
            tracing::warn!(gid = self.gid, pid, error = %e, "could not start clock");
        }
    }

    fn end_game(&mut self) {
        if self.state.is_complete() {
            return;
        }
        let best = winners(self.players.iter().flatten().map(|p| (p.pid, &p.pieces)));
        let flag = if best.len() == 1 { PlayerStatus::WINNER } else { PlayerStatus::DRAWN };
        for &pid in &best {
            if let Some(player) = self.player_mut(pid) {
                player.status.set(flag);
            }
        }

        self.state.status.set(GameStatus::COMPLETE);
        self.state.turn = PID_NONE;
        self.eval.stop();
        for player in self.players.iter_mut().flatten() {
            player.pause_clock();
            player.grace = None;
        }

        let names: Vec<String> = best
            .iter()
            .filter_map(|&pid| self.player(pid).map(|p| p.name.clone()))
            .collect();
        let message = match names.as_slice() {
            [winner] => format!("{} wins!", winner),
            _ => format!("Draw between {}", names.join(", ")),
        };
        tracing::info!(gid = self.gid, winners = ?best, "game over");

        self.persist_status();
        self.broadcast_status();
        self.broadcast_players();
        self.announce(message);
    }

    /// One cell of a cached placement that extends the player's territory
    pub fn hint(&mut self, pid: PlayerId) -> Result<Point, ActionError> {
        self.check_action(pid)?;
        let player = self.player(pid).ok_or(ActionError::UnknownPlayer(pid))?;
        if player.hints == 0 {
            return Err(ActionError::HintsExhausted);
        }

        let board = &self.state.board;
        let hint = if !board.origin_claimed(pid) {
            board.origin(pid).filter(|_| !player.placements.is_empty())
        } else {
            let corners = board.find_corners(&board.find_territory(pid), pid);
            player
                .placements
                .iter()
                .find_map(|p| corners.iter().find(|c| p.contains(c)).copied())
        };
        let hint = hint.ok_or(ActionError::NoHintAvailable)?;

        if let Some(player) = self.player_mut(pid) {
            player.hints -= 1;
        }
        self.send_private_state(pid);
        Ok(hint)
    }

    // ========================================================================
    // TIMEOUTS AND CONNECTIONS
    // ========================================================================

    fn expiry_handler(&self, pid: PlayerId, kind: Expiry) -> impl Fn() + Send + Sync + 'static {
        let game = self.self_ref.clone();
        move || {
            let Some(game) = game.upgrade() else {
                return;
            };
            let mut game = lock_game(&game);
            match kind {
                Expiry::Clock => game.handle_timeout(pid),
                Expiry::Grace => game.handle_grace_expired(pid),
            }
        }
    }

    fn handle_timeout(&mut self, pid: PlayerId) {
        if self.state.is_complete() || !self.is_active(pid) {
            return;
        }
        tracing::info!(gid = self.gid, pid, "clock expired");
        self.retire_player(pid, PlayerStatus::TIMED_OUT, "ran out of time");
    }

    fn handle_grace_expired(&mut self, pid: PlayerId) {
        if self.state.is_complete() || !self.is_active(pid) {
            return;
        }
        if self.player(pid).is_some_and(|p| p.status.has(PlayerStatus::CONNECTED)) {
            return;
        }
        tracing::info!(gid = self.gid, pid, "disconnect grace expired");
        self.retire_player(pid, 0, "left the game");
    }

    /// Take a player out of play and move the game along without them
    fn retire_player(&mut self, pid: PlayerId, flags: u8, reason: &str) {
        let Some(player) = self.player_mut(pid) else {
            return;
        };
        player.status.set(flags | PlayerStatus::DISABLED);
        player.pause_clock();
        player.grace = None;
        let name = player.name.clone();

        self.announce(format!("{} {}", name, reason));
        if self.state.turn == pid || !self.any_active() {
            self.next_turn();
        }
        self.persist_players();
        self.broadcast_players();
    }

    pub fn connect_socket(&mut self, pid: PlayerId, tx: Outbound) -> Result<ConnectionId, ActionError> {
        if self.player(pid).is_none() {
            return Err(ActionError::UnknownPlayer(pid));
        }
        let id = self.sockets.connect(pid, tx);
        let name = match self.player_mut(pid) {
            Some(player) => {
                player.status.set(PlayerStatus::CONNECTED);
                player.connection = Some(id);
                player.grace = None;
                player.name.clone()
            }
            None => return Err(ActionError::UnknownPlayer(pid)),
        };
        self.touch();
        tracing::debug!(gid = self.gid, pid, connection = id, "socket connected");

        self.send_private_state(pid);
        self.sockets.send(pid, SocketMessage::BoardState(self.state.board.snapshot()));
        self.sockets.send(
            pid,
            SocketMessage::GameStatus { turn: self.state.turn, status: self.state.status },
        );
        self.broadcast_players();
        self.announce(format!("{} connected", name));
        Ok(id)
    }

    pub fn disconnect_socket(&mut self, pid: PlayerId, id: ConnectionId) {
        self.sockets.disconnect(id);
        let in_play = self.state.status.has(GameStatus::FULL) && !self.state.is_complete();
        let handler = self.expiry_handler(pid, Expiry::Grace);
        let grace_period = self.grace_period;
        let gid = self.gid;

        let Some(player) = self.player_mut(pid) else {
            return;
        };
        if player.connection != Some(id) {
            return;
        }
        player.connection = None;
        player.status.clear(PlayerStatus::CONNECTED);
        if in_play && player.status.is_active() {
            let grace = Timer::new(grace_period, Duration::ZERO, handler);
            if let Err(e) = grace.start() {
                tracing::warn!(gid, pid, error = %e, "could not start grace timer");
            }
            player.grace = Some(grace);
        }
        let name = player.name.clone();
        tracing::debug!(gid, pid, connection = id, "socket disconnected");

        self.broadcast_players();
        self.announce(format!("{} disconnected", name));
    }

    pub fn chat(&mut self, pid: PlayerId, text: &str) {
        if self.player(pid).is_none() {
            return;
        }
        let message: String = text.trim().chars().take(MAX_CHAT_LEN).collect();
        if message.is_empty() {
            return;
        }
        self.sockets.broadcast(SocketMessage::ChatMessage { origin: pid, message });
    }

    /// Stop every background task this game owns
    pub fn shutdown(&mut self) {
        self.eval.stop();
        for player in self.players.iter_mut().flatten() {
            player.pause_clock();
            player.grace = None;
        }
    }

    // ========================================================================
    // NOTIFICATIONS
    // ========================================================================

    fn send_private_state(&mut self, pid: PlayerId) {
        let Some(player) = self.player(pid) else {
            return;
        };
        let msg = SocketMessage::PrivateGameState {
            pid,
            pieces: player.pieces.clone(),
            hints: player.hints,
        };
        self.sockets.send(pid, msg);
    }

    fn broadcast_players(&mut self) {
        let summaries = self.summaries();
        self.sockets.broadcast(SocketMessage::PlayerUpdate(summaries));
    }

    fn broadcast_status(&mut self) {
        self.sockets.broadcast(SocketMessage::GameStatus {
            turn: self.state.turn,
            status: self.state.status,
        });
    }

    fn announce(&mut self, message: String) {
        self.sockets.broadcast(SocketMessage::system(message));
    }

    fn persist_status(&self) {
        if let Err(e) = self.store.update_game_status(self.gid, self.state.status) {
            tracing::warn!(gid = self.gid, error = %e, "failed to persist game status");
        }
    }

    fn persist_players(&self) {
        if let Err(e) = self.store.update_game_players(self.gid, self.summaries()) {
            tracing::warn!(gid = self.gid, error = %e, "failed to persist players");
        }
    }

    fn submit_lookahead(&self) {
        if self.state.is_complete() {
            return;
        }
        let active: Vec<&Player> = self
            .players
            .iter()
            .flatten()
            .filter(|p| p.status.is_active())
            .collect();
        self.eval.submit(Lookahead {
            state: self.state.clone(),
            inventories: active.iter().map(|p| (p.pid, p.pieces.clone())).collect(),
            cached: active.iter().map(|p| (p.pid, p.placements.len())).collect(),
        });
    }
}

fn touches_edge(placement: &Placement, placed: &Placement) -> bool {
    placement
        .cells()
        .any(|&c| ORTHOGONALS.iter().any(|&d| placed.contains(&(c + d))))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tokio::sync::mpsc::unbounded_channel;

    fn config(players: u16, degree: usize) -> GameConfig {
        GameConfig {
            players,
            block_degree: degree,
            density: 1.0,
            hints: 2,
            ..Default::default()
        }
    }

    fn create(config: GameConfig) -> SharedGame {
        let store = Arc::new(MemoryStore::new());
        let gid = store.add_game(&config).unwrap();
        Game::new(gid, config, store, Duration::from_secs(15)).unwrap()
    }

    fn full_game(config: GameConfig) -> SharedGame {
        let game = create(config);
        {
            let mut g = lock_game(&game);
            for i in 0..g.seats.len() {
                g.add_player(&format!("p{}", i + 1), "#000").unwrap();
            }
        }
        game
    }

    fn first_move(g: &Game, pid: PlayerId) -> Vec<Point> {
        g.player(pid).unwrap().placements().iter().next().unwrap().to_vec()
    }

    #[test]
    fn test_construction_errors() {
        let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
        let bad = GameConfig { players: 0, ..Default::default() };
        let err = Game::new(1, bad, store, Duration::ZERO).err().unwrap();
        assert!(matches!(err, GameError::Config(ConfigError::Players(0))));
    }

    #[test]
    fn test_lobby_fills() {
        let game = create(config(2, 3));
        let mut g = lock_game(&game);
        assert_eq!(g.add_player("ana", "red").unwrap(), 1);
        assert!(!g.status().has(GameStatus::FULL));
        assert_eq!(g.turn(), PID_NONE);

        assert_eq!(g.add_player("bo", "blue").unwrap(), 2);
        assert!(g.status().has(GameStatus::FULL));
        assert_eq!(g.turn(), 1);
        assert_eq!(g.add_player("cy", "green"), Err(ActionError::LobbyFull));

        let p = g.player(1).unwrap();
        assert_eq!(p.pieces.len(), 4);
        assert!(!p.placements().is_empty());
        assert!(p.status.has(PlayerStatus::JOINED));
    }

    #[test]
    fn test_actions_rejected_while_waiting() {
        let game = create(config(2, 3));
        let mut g = lock_game(&game);
        g.add_player("ana", "red").unwrap();
        let cells = first_move(&g, 1);
        assert_eq!(g.place_piece(1, &cells), Err(ActionError::WaitingForPlayers));
        assert_eq!(g.place_piece(9, &cells), Err(ActionError::UnknownPlayer(9)));
    }

    #[test]
    fn test_turn_order() {
        let game = full_game(config(2, 3));
        let mut g = lock_game(&game);
        let cells = first_move(&g, 2);
        assert_eq!(g.place_piece(2, &cells), Err(ActionError::NotYourTurn));

        let cells = first_move(&g, 1);
        g.place_piece(1, &cells).unwrap();
        assert_eq!(g.turn(), 2);
        assert!(g.status().has(GameStatus::IN_PROGRESS));
        assert_eq!(g.player(1).unwrap().pieces.len(), 3);
    }

    #[test]
    fn test_rejected_moves_change_nothing() {
        let game = full_game(config(2, 3));
        let mut g = lock_game(&game);
        let before = g.state().board.snapshot();

        let center = Point::new(g.state().board.radius(), g.state().board.radius());
        assert_eq!(g.place_piece(1, &[center]), Err(ActionError::IllegalPlacement));
        assert_eq!(g.place_piece(1, &[]), Err(ActionError::IllegalPlacement));

        let origin = g.state().board.origin(1).unwrap();
        let five = [0, 1, 2, 3, 4].map(|i| origin - Point::new(i, 0));
        assert_eq!(g.place_piece(1, &five), Err(ActionError::PieceNotOwned));

        let far = [Point::new(i32::MAX, 0), Point::new(i32::MIN, 0)];
        assert_eq!(g.place_piece(1, &far), Err(ActionError::IllegalPlacement));
        let off_board = [Point::new(-1, -1)];
        assert_eq!(g.place_piece(1, &off_board), Err(ActionError::IllegalPlacement));

        assert_eq!(g.state().board.snapshot(), before);
        assert_eq!(g.turn(), 1);
        assert_eq!(g.player(1).unwrap().pieces.len(), 4);
    }

    #[test]
    fn test_cache_tracks_full_search() {
        let game = full_game(config(3, 4));
        let mut g = lock_game(&game);

        for _ in 0..200 {
            if g.state().is_complete() {
                break;
            }
            let turn = g.turn();
            let cells = first_move(&g, turn);
            g.place_piece(turn, &cells).unwrap();

            for pid in 1..=3 {
                let p = g.player(pid).unwrap();
                if !p.status.is_active() {
                    continue;
                }
                let fresh = search(&g.state().board, pid, &p.pieces, false);
                assert_eq!(p.placements(), &fresh, "cache drifted for player {}", pid);
            }
        }

        assert!(g.state().is_complete());
        assert_eq!(g.turn(), PID_NONE);
        let marked = g
            .summaries()
            .iter()
            .filter(|s| s.status.has_any(PlayerStatus::WINNER | PlayerStatus::DRAWN))
            .count();
        assert!(marked >= 1);
    }

    #[test]
    fn test_stuck_player_is_disabled_and_skipped() {
        let game = full_game(config(3, 3));
        let mut g = lock_game(&game);
        if let Some(p) = g.player_mut(2) {
            p.pieces = PieceSet::new();
            p.placements.clear();
        }

        let cells = first_move(&g, 1);
        g.place_piece(1, &cells).unwrap();
        assert!(g.player(2).unwrap().status.has(PlayerStatus::DISABLED));
        assert_eq!(g.turn(), 3);
        assert_eq!(g.place_piece(2, &[Point::new(0, 0)]), Err(ActionError::PlayerInactive));
    }

    #[test]
    fn test_empty_cache_with_moves_is_reseeded() {
        let game = full_game(config(2, 3));
        let mut g = lock_game(&game);
        if let Some(p) = g.player_mut(2) {
            p.placements.clear();
        }

        let cells = first_move(&g, 1);
        g.place_piece(1, &cells).unwrap();
        let p = g.player(2).unwrap();
        assert!(p.status.is_active());
        assert_eq!(g.turn(), 2);
        assert_eq!(p.placements(), &search(&g.state().board, 2, &p.pieces, false));
    }

    #[test]
    fn test_single_winner() {
        let game = full_game(config(2, 3));
        let mut g = lock_game(&game);
        // a tiny board where player 1 sits on player 2's origin
        g.state.board = Board::new(&[1, 2], 0, 1.0).unwrap();
        let blocked = g.state.board.origin(2).unwrap();
        g.state.board.occupy(blocked, gobloks_core::Owner::player(1)).unwrap();
        if let Some(p) = g.player_mut(1) {
            p.pieces = PieceSet::new();
            p.placements.clear();
        }
        if let Some(p) = g.player_mut(2) {
            p.pieces = [gobloks_core::Piece::MONOMINO].into_iter().collect();
            p.placements.clear();
        }

        g.next_turn();
        assert!(g.state().is_complete());
        assert!(g.player(1).unwrap().status.has(PlayerStatus::WINNER));
        let loser = g.player(2).unwrap().status;
        assert!(loser.has(PlayerStatus::DISABLED));
        assert!(!loser.has_any(PlayerStatus::WINNER | PlayerStatus::DRAWN));
    }

    #[test]
    fn test_draw() {
        let game = full_game(config(2, 3));
        let mut g = lock_game(&game);
        for pid in [1, 2] {
            if let Some(p) = g.player_mut(pid) {
                p.pieces = PieceSet::new();
                p.placements.clear();
            }
        }
        g.next_turn();
        assert!(g.state().is_complete());
        for pid in [1, 2] {
            let status = g.player(pid).unwrap().status;
            assert!(status.has(PlayerStatus::DRAWN | PlayerStatus::DISABLED));
        }
        assert_eq!(g.place_piece(1, &[Point::new(0, 0)]), Err(ActionError::GameOver));
    }

    #[test]
    fn test_hints() {
        let game = full_game(config(2, 3));
        let mut g = lock_game(&game);
        let origin = g.state().board.origin(1).unwrap();
        assert_eq!(g.hint(1).unwrap(), origin);
        assert_eq!(g.player(1).unwrap().hints, 1);

        let cells = first_move(&g, 1);
        g.place_piece(1, &cells).unwrap();
        let cells = first_move(&g, 2);
        g.place_piece(2, &cells).unwrap();
        let hint = g.hint(1).unwrap();
        assert!(g.state().board.has_corner(hint, 1));
        assert!(g.player(1).unwrap().placements().iter().any(|p| p.contains(&hint)));

        assert_eq!(g.hint(1), Err(ActionError::HintsExhausted));
        assert_eq!(g.player(1).unwrap().hints, 0);
    }

    #[test]
    fn test_failed_hint_is_free() {
        let game = full_game(config(2, 3));
        let mut g = lock_game(&game);
        if let Some(p) = g.player_mut(1) {
            p.placements.clear();
        }
        assert_eq!(g.hint(1), Err(ActionError::NoHintAvailable));
        assert_eq!(g.player(1).unwrap().hints, 2);
    }

    #[test]
    fn test_hint_follows_action_rules() {
        let game = create(config(2, 3));
        let mut g = lock_game(&game);
        g.add_player("ana", "red").unwrap();
        assert_eq!(g.hint(1), Err(ActionError::WaitingForPlayers));
        assert_eq!(g.player(1).unwrap().hints, 2);

        g.add_player("bo", "blue").unwrap();
        assert_eq!(g.hint(2), Err(ActionError::NotYourTurn));
        assert_eq!(g.player(2).unwrap().hints, 2);
        assert_eq!(g.hint(9), Err(ActionError::UnknownPlayer(9)));
    }

    #[test]
    fn test_free_play_keeps_turn() {
        let game = full_game(GameConfig { turn_based: false, ..config(2, 3) });
        let mut g = lock_game(&game);
        let cells = first_move(&g, 2);
        g.place_piece(2, &cells).unwrap();
        assert_eq!(g.turn(), 1);

        let cells = first_move(&g, 1);
        g.place_piece(1, &cells).unwrap();
        assert_eq!(g.turn(), 2);
    }

    #[test]
    fn test_connect_sends_state() {
        let game = full_game(config(2, 3));
        let mut g = lock_game(&game);
        let (tx, mut rx) = unbounded_channel();
        g.connect_socket(1, tx).unwrap();
        assert!(g.player(1).unwrap().status.has(PlayerStatus::CONNECTED));

        let first = rx.try_recv().unwrap();
        assert!(matches!(&*first, SocketMessage::PrivateGameState { pid: 1, hints: 2, .. }));
        assert!(matches!(&*rx.try_recv().unwrap(), SocketMessage::BoardState(_)));
        assert!(matches!(&*rx.try_recv().unwrap(), SocketMessage::GameStatus { turn: 1, .. }));

        let cells = first_move(&g, 1);
        g.place_piece(1, &cells).unwrap();
        let mut saw_update = false;
        while let Ok(msg) = rx.try_recv() {
            if let SocketMessage::BoardUpdate { owner, placed_cells } = &*msg {
                assert_eq!(*owner, 1);
                assert_eq!(placed_cells.to_vec().len(), cells.len());
                saw_update = true;
            }
        }
        assert!(saw_update);

        let (tx, _rx) = unbounded_channel();
        assert_eq!(g.connect_socket(5, tx), Err(ActionError::UnknownPlayer(5)));
    }

    #[test]
    fn test_stale_after_a_week_untimed() {
        let game = create(config(2, 2));
        let g = lock_game(&game);
        let now = Instant::now();
        assert!(!g.is_stale(now));
        assert!(g.is_stale(now + Duration::from_secs(7 * 24 * 3600 + 1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_expiry_retires_player() {
        let game = full_game(GameConfig { time_control_seconds: 10, ..config(2, 3) });
        tokio::time::sleep(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;

        let g = lock_game(&game);
        let status = g.player(1).unwrap().status;
        assert!(status.has(PlayerStatus::TIMED_OUT | PlayerStatus::DISABLED));
        assert_eq!(g.turn(), 2);
        let left = g.player(2).unwrap().summary().time_left_ms.unwrap();
        assert!((8_000..=10_000).contains(&left));
    }

    #[tokio::test(start_paused = true)]
    async fn test_longest_clock_starts() {
        let longest = GameConfig {
            time_control_seconds: crate::config::MAX_TIME_CONTROL_SECONDS,
            time_bonus_seconds: crate::config::MAX_TIME_CONTROL_SECONDS,
            ..config(2, 3)
        };
        let game = full_game(longest);
        let g = lock_game(&game);
        assert_eq!(g.turn(), 1);
        let left = g.player(1).unwrap().summary().time_left_ms.unwrap();
        assert_eq!(left, crate::config::MAX_TIME_CONTROL_SECONDS * 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_pauses_clock_with_bonus() {
        let game = full_game(GameConfig {
            time_control_seconds: 30,
            time_bonus_seconds: 2,
            ..config(2, 3)
        });
        tokio::time::advance(Duration::from_secs(5)).await;
        {
            let mut g = lock_game(&game);
            let cells = first_move(&g, 1);
            g.place_piece(1, &cells).unwrap();
            assert_eq!(g.player(1).unwrap().summary().time_left_ms, Some(27_000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_grace() {
        let game = full_game(config(2, 3));
        let (tx, _rx) = unbounded_channel();
        let conn = lock_game(&game).connect_socket(2, tx).unwrap();
        lock_game(&game).disconnect_socket(2, conn);
        assert!(!lock_game(&game).player(2).unwrap().status.has(PlayerStatus::CONNECTED));

        tokio::time::sleep(Duration::from_secs(16)).await;
        tokio::task::yield_now().await;

        let g = lock_game(&game);
        let status = g.player(2).unwrap().status;
        assert!(status.has(PlayerStatus::DISABLED));
        assert!(!status.has(PlayerStatus::TIMED_OUT));
        assert_eq!(g.turn(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_cancels_grace() {
        let game = full_game(config(2, 3));
        let (tx, _rx) = unbounded_channel();
        let conn = lock_game(&game).connect_socket(1, tx).unwrap();
        lock_game(&game).disconnect_socket(1, conn);

        tokio::time::advance(Duration::from_secs(5)).await;
        let (tx, _rx2) = unbounded_channel();
        lock_game(&game).connect_socket(1, tx).unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(lock_game(&game).player(1).unwrap().status.is_active());
    }
}
