mod lobby;
mod round;

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{GameError, GameResult};
use crate::store::StateStore;
use crate::types::GameState;

/// Shared application state.
///
/// Owns nothing but a handle to the shared store; every operation is a
/// read-modify-write cycle against it, and every participant observes the
/// results through its subscription. The store arbitrates nothing (the last
/// write wins), so these operations deliberately take no locks of their own.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StateStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Store path of a game's document.
    pub fn game_path(code: &str) -> String {
        format!("games/{}", code)
    }

    /// Read and normalize a game document.
    pub async fn read_game(&self, code: &str) -> GameResult<GameState> {
        let value = self
            .store
            .read(&Self::game_path(code))
            .await?
            .ok_or(GameError::NotFound)?;
        serde_json::from_value(value).map_err(|e| GameError::Corrupt(e.to_string()))
    }

    /// Write a game's full document.
    pub(crate) async fn write_game(&self, state: &GameState) -> GameResult<()> {
        self.store
            .write(&Self::game_path(&state.id), encode(state)?)
            .await
    }

    /// Delete a game's document entirely.
    pub(crate) async fn delete_game(&self, code: &str) -> GameResult<()> {
        self.store.write(&Self::game_path(code), Value::Null).await
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> GameResult<Value> {
    serde_json::to_value(value).map_err(|e| GameError::Corrupt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::GameConfig;

    fn app() -> AppState {
        AppState::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_read_game_not_found() {
        let app = app();
        assert!(matches!(
            app.read_game("ZZZZZZ").await,
            Err(GameError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_read_game_normalizes_sparse_document() {
        let app = app();
        app.store
            .write(
                "games/A1B2C3",
                serde_json::json!({
                    "id": "A1B2C3",
                    "config": { "numSpies": 1, "timeLimit": 480, "country": "Canada" }
                }),
            )
            .await
            .unwrap();

        let state = app.read_game("A1B2C3").await.unwrap();
        assert!(state.players.is_empty());
        assert!(state.waiting_players.is_empty());
        assert!(state.votes.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_reported() {
        let app = app();
        app.store
            .write("games/A1B2C3", serde_json::json!({"id": 42}))
            .await
            .unwrap();

        assert!(matches!(
            app.read_game("A1B2C3").await,
            Err(GameError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let app = app();
        let (created, _) = app
            .create_game(GameConfig::default(), "Alice")
            .await
            .unwrap();

        let read_back = app.read_game(&created.id).await.unwrap();
        assert_eq!(read_back.id, created.id);
        assert_eq!(read_back.players[0].name, "Alice");
    }
}
