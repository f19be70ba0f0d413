use serde::{Deserialize, Serialize};

use crate::types::{GameConfig, GameState, Player, PlayerId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new game with the sender as leader.
    CreateGame { config: GameConfig, name: String },
    /// Join an existing game by its 6-character code.
    JoinGame { code: String, name: String },
    /// Leave the current game.
    LeaveGame,
    // Leader-only messages
    KickPlayer { player_id: PlayerId },
    StartRound,
    EndRound,
    /// Raise the out-of-band abort flag for everyone else.
    AbortMission,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        server_now: String,
        /// Pre-resolved game for a well-formed share-link code, so the
        /// client can go straight to the name prompt.
        #[serde(skip_serializing_if = "Option::is_none")]
        game: Option<GameState>,
    },
    /// Reply to a successful create or join; `player` is the caller's
    /// identity token for the rest of the session.
    GameJoined {
        state: GameState,
        player: Player,
    },
    /// Pushed whenever any participant changed the game document.
    StateSync {
        state: GameState,
    },
    /// Local countdown tick; never hits the store.
    TimerTick {
        seconds: u32,
    },
    /// This session's player vanished from both rosters.
    Removed,
    /// The leader force-terminated the round out-of-band.
    MissionAborted,
    /// The game document was deleted.
    GameClosed,
    Error {
        code: String,
        msg: String,
    },
}
