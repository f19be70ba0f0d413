use rand::Rng;
use serde_json::Value;
use std::collections::HashSet;

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::locations;
use crate::types::GameState;

/// Draw `count` distinct indices out of `0..pool_size` by splicing each
/// pick out of a shrinking index pool. Uniform over the combination space;
/// caps at the pool size when fewer players than spies are seated.
fn pick_spy_indices(count: usize, pool_size: usize) -> HashSet<usize> {
    let mut pool: Vec<usize> = (0..pool_size).collect();
    let mut spies = HashSet::new();
    let mut rng = rand::rng();
    for _ in 0..count.min(pool_size) {
        let drawn = rng.random_range(0..pool.len());
        spies.insert(pool.remove(drawn));
    }
    spies
}

impl AppState {
    /// Start a round: seat the waiting list, deal roles, open the clock.
    pub async fn start_round(&self, code: &str) -> GameResult<GameState> {
        let mut state = self.read_game(code).await?;
        state.merge_waiting();
        if state.players.is_empty() {
            return Err(GameError::EmptyRoster);
        }

        let spies = pick_spy_indices(state.config.num_spies as usize, state.players.len());
        for (idx, player) in state.players.iter_mut().enumerate() {
            player.is_spy = spies.contains(&idx);
        }

        let location = locations::random_location(&state.config.country);
        state.location = Some(location.to_string());

        // The leader opens questioning; fall back to the first seat if the
        // roster somehow lost its leader flag.
        state.current_turn = state
            .leader()
            .or_else(|| state.players.first())
            .map(|p| p.id.clone());

        state.is_playing = true;
        state.time_remaining = state.config.time_limit;
        state.votes.clear();
        state.mission_aborted = false;

        self.write_game(&state).await?;
        tracing::info!(
            game = %state.id,
            players = state.players.len(),
            spies = spies.len(),
            "round started"
        );
        tracing::debug!(game = %state.id, location, "location selected");
        Ok(state)
    }

    /// End the round and return everyone to the lobby. The normal path back,
    /// as opposed to the abort flag.
    pub async fn end_round(&self, code: &str) -> GameResult<GameState> {
        let mut state = self.read_game(code).await?;
        state.merge_waiting();
        for player in &mut state.players {
            player.is_spy = false;
        }
        state.is_playing = false;
        state.location = None;
        state.time_remaining = state.config.time_limit;
        state.current_turn = None;
        state.votes.clear();
        state.mission_aborted = false;

        self.write_game(&state).await?;
        tracing::info!(game = %state.id, players = state.players.len(), "round ended");
        Ok(state)
    }

    /// Raise the out-of-band abort flag. Observing non-leader clients reset
    /// to the home screen without the lobby merge that `end_round` does;
    /// the flag is cleared by the next round start or end.
    pub async fn abort_mission(&self, code: &str) -> GameResult<()> {
        // Confirm the game still exists before flagging it.
        self.read_game(code).await?;
        self.store
            .write(
                &format!("{}/missionAborted", Self::game_path(code)),
                Value::Bool(true),
            )
            .await
    }
}
