//! HTTP API endpoints.
//!
//! The landing page uses these to vet a share-link code before opening a
//! WebSocket session.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::GameError;
use crate::state::AppState;
use crate::types::GAME_CODE_LENGTH;

/// Lobby summary; deliberately omits roles and the location.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub code: String,
    pub player_count: usize,
    pub is_playing: bool,
}

/// Look up a game by its share code.
///
/// GET /api/games/{code}
pub async fn get_game_summary(
    Path(code): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let code = code.trim().to_uppercase();
    if code.len() != GAME_CODE_LENGTH {
        return (StatusCode::NOT_FOUND, "No such game").into_response();
    }

    match state.read_game(&code).await {
        Ok(game) => Json(GameSummary {
            code: game.id,
            player_count: game.players.len(),
            is_playing: game.is_playing,
        })
        .into_response(),
        Err(GameError::NotFound) => (StatusCode::NOT_FOUND, "No such game").into_response(),
        Err(e) => {
            tracing::error!("Failed to look up game {}: {}", code, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Store unavailable").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::GameConfig;

    fn app() -> Arc<AppState> {
        Arc::new(AppState::new(Arc::new(MemoryStore::new())))
    }

    #[tokio::test]
    async fn test_summary_for_existing_game() {
        let app = app();
        let (game, _) = app
            .create_game(GameConfig::default(), "Alice")
            .await
            .unwrap();

        let response =
            get_game_summary(Path(game.id.to_lowercase()), State(app.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_codes_are_not_found() {
        let app = app();

        let response = get_game_summary(Path("ZZZZZZ".to_string()), State(app.clone())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get_game_summary(Path("TOOLONGCODE".to_string()), State(app)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
