use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque ID types for type safety
pub type GameId = String;
pub type PlayerId = String;

/// Game codes are the invite/share token; exactly this many characters.
pub const GAME_CODE_LENGTH: usize = 6;

pub const MIN_SPIES: u32 = 1;
pub const MAX_SPIES: u32 = 3;

/// Settings chosen when a game is created. Immutable for the game's
/// lifetime; re-read before each round start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub num_spies: u32,
    /// Round length in seconds.
    pub time_limit: u32,
    /// Selects which location pool gets sampled.
    pub country: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            num_spies: 1,
            time_limit: 480,
            country: crate::locations::DEFAULT_COUNTRY.to_string(),
        }
    }
}

impl GameConfig {
    /// Clamp out-of-range values so the config is safe to use.
    pub fn sanitized(mut self) -> Self {
        let spies = self.num_spies.clamp(MIN_SPIES, MAX_SPIES);
        if spies != self.num_spies {
            tracing::warn!(
                requested = self.num_spies,
                clamped = spies,
                "numSpies out of range"
            );
            self.num_spies = spies;
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub is_leader: bool,
    #[serde(default)]
    pub is_spy: bool,
    #[serde(default)]
    pub score: u32,
}

impl Player {
    pub fn new(name: String, is_leader: bool) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name,
            is_leader,
            is_spy: false,
            score: 0,
        }
    }
}

/// One game's full document as stored at `games/{code}`.
///
/// Field names serialize in camelCase so documents stay shape-compatible
/// with what the browser client writes. Lists, the vote map, and flags all
/// carry `#[serde(default)]`, making this struct the single defaulting step
/// that normalizes sparse documents on read, so nothing downstream has to
/// reason about absent fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub id: GameId,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub time_remaining: u32,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub players: Vec<Player>,
    /// Joined mid-round; merged into `players` at the next round start.
    #[serde(default)]
    pub waiting_players: Vec<Player>,
    #[serde(default)]
    pub current_turn: Option<PlayerId>,
    #[serde(default)]
    pub votes: HashMap<PlayerId, bool>,
    /// Out-of-band forced-termination flag, set by the leader.
    #[serde(default)]
    pub mission_aborted: bool,
    pub config: GameConfig,
}

impl GameState {
    /// Fresh lobby with the creator seated as leader.
    pub fn new(id: GameId, config: GameConfig, creator: Player) -> Self {
        Self {
            id,
            is_playing: false,
            time_remaining: config.time_limit,
            location: None,
            players: vec![creator],
            waiting_players: Vec::new(),
            current_turn: None,
            votes: HashMap::new(),
            mission_aborted: false,
            config,
        }
    }

    /// Whether `name` clashes (case-insensitively, trimmed) with any seated
    /// or waiting player.
    pub fn name_taken(&self, name: &str) -> bool {
        let wanted = name.trim().to_lowercase();
        self.players
            .iter()
            .chain(self.waiting_players.iter())
            .any(|p| p.name.to_lowercase() == wanted)
    }

    /// Whether the player appears in either roster.
    pub fn contains_player(&self, player_id: &str) -> bool {
        self.players
            .iter()
            .chain(self.waiting_players.iter())
            .any(|p| p.id == player_id)
    }

    pub fn find_player(&self, player_id: &str) -> Option<&Player> {
        self.players
            .iter()
            .chain(self.waiting_players.iter())
            .find(|p| p.id == player_id)
    }

    pub fn leader(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_leader)
    }

    /// Move everyone who joined mid-round onto the table.
    pub fn merge_waiting(&mut self) {
        self.players.append(&mut self.waiting_players);
    }
}
