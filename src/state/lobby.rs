use rand::Rng;

use super::{encode, AppState};
use crate::error::{GameError, GameResult};
use crate::types::{GameConfig, GameState, Player, GAME_CODE_LENGTH};

/// Game codes are uppercase alphanumeric so they survive being read aloud
/// and pasted into share links.
const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random game code. Collisions are not checked: the code space
/// is large relative to the number of concurrent games, and a collision
/// costs an overwritten lobby, not corruption.
fn generate_game_code() -> String {
    let mut rng = rand::rng();
    (0..GAME_CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

impl AppState {
    /// Create a new game with the creator seated as leader.
    ///
    /// This write is the sole source-of-truth write for a new game.
    pub async fn create_game(
        &self,
        config: GameConfig,
        creator_name: &str,
    ) -> GameResult<(GameState, Player)> {
        let name = creator_name.trim();
        if name.is_empty() {
            return Err(GameError::EmptyName);
        }

        let leader = Player::new(name.to_string(), true);
        let state = GameState::new(generate_game_code(), config.sanitized(), leader.clone());
        self.write_game(&state).await?;

        tracing::info!(game = %state.id, leader = %leader.name, "game created");
        Ok((state, leader))
    }

    /// Join an existing game by code.
    ///
    /// Mid-round joiners are held in the waiting list until the next round
    /// starts. Only the affected list is written back, which keeps the
    /// write surface small when several players join at once.
    pub async fn join_game(&self, code: &str, name: &str) -> GameResult<(GameState, Player)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::EmptyName);
        }

        let mut state = self.read_game(code).await?;
        if state.name_taken(name) {
            return Err(GameError::DuplicateName(name.to_string()));
        }

        let game_path = Self::game_path(code);
        let player = if state.is_playing {
            let player = Player::new(name.to_string(), false);
            state.waiting_players.push(player.clone());
            self.store
                .write(
                    &format!("{}/waitingPlayers", game_path),
                    encode(&state.waiting_players)?,
                )
                .await?;
            tracing::info!(game = %state.id, player = %player.name, "joined waiting list");
            player
        } else {
            let player = Player::new(name.to_string(), state.players.is_empty());
            state.players.push(player.clone());
            self.store
                .write(&format!("{}/players", game_path), encode(&state.players)?)
                .await?;
            tracing::info!(game = %state.id, player = %player.name, "joined lobby");
            player
        };

        Ok((state, player))
    }

    /// Remove a player from the game, promoting a new leader or deleting
    /// the game as needed. Returns the updated state, or `None` when the
    /// last seated player left and the game was deleted.
    pub async fn leave_game(&self, code: &str, player_id: &str) -> GameResult<Option<GameState>> {
        let state = self.read_game(code).await?;
        self.remove_from_roster(state, player_id).await
    }

    /// Leader-initiated removal. Silently ignored for anyone else; the
    /// kicked player's own client notices its absence on the next push.
    pub async fn kick_player(
        &self,
        code: &str,
        requester_id: &str,
        target_id: &str,
    ) -> GameResult<Option<GameState>> {
        let state = self.read_game(code).await?;
        let requester_leads = state
            .players
            .iter()
            .any(|p| p.id == requester_id && p.is_leader);
        if !requester_leads {
            tracing::debug!(game = %state.id, requester = %requester_id, "kick ignored: not leader");
            return Ok(Some(state));
        }

        tracing::info!(game = %state.id, target = %target_id, "player kicked");
        self.remove_from_roster(state, target_id).await
    }

    /// Shared removal path for leave and kick, so the leadership and
    /// game-destruction invariants hold under any sequence of either.
    async fn remove_from_roster(
        &self,
        mut state: GameState,
        player_id: &str,
    ) -> GameResult<Option<GameState>> {
        if let Some(idx) = state.players.iter().position(|p| p.id == player_id) {
            let removed = state.players.remove(idx);

            if state.players.is_empty() {
                // Last seated player gone: the game itself goes too.
                self.delete_game(&state.id).await?;
                tracing::info!(game = %state.id, "last player left, game deleted");
                return Ok(None);
            }

            if removed.is_leader {
                state.players[0].is_leader = true;
                tracing::info!(
                    game = %state.id,
                    new_leader = %state.players[0].name,
                    "leadership transferred"
                );
            }

            self.write_game(&state).await?;
            return Ok(Some(state));
        }

        // Not seated; maybe waiting out the current round.
        let before = state.waiting_players.len();
        state.waiting_players.retain(|p| p.id != player_id);
        if state.waiting_players.len() != before {
            self.store
                .write(
                    &format!("{}/waitingPlayers", Self::game_path(&state.id)),
                    encode(&state.waiting_players)?,
                )
                .await?;
        }
        Ok(Some(state))
    }
}
