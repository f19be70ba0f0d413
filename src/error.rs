//! Error types for game operations.
//!
//! None of these are fatal: every failure leaves the caller on its current
//! screen and a fresh user action may retry.

/// Result type for controller operations
pub type GameResult<T> = Result<T, GameError>;

/// Errors that can occur while operating on a game.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// No game document exists at the given code.
    #[error("game not found")]
    NotFound,

    /// The requested name clashes with a seated or waiting player.
    #[error("the name \"{0}\" is already taken")]
    DuplicateName(String),

    /// A blank (or whitespace-only) name was submitted.
    #[error("name must not be empty")]
    EmptyName,

    /// A round was started with nobody at the table. The UI precondition
    /// normally prevents this.
    #[error("cannot start a round with no players")]
    EmptyRoster,

    /// The acting player is not part of the game it addressed.
    #[error("player is not part of this game")]
    NotInGame,

    /// A store read/write failed, including lost connectivity.
    #[error("state store unavailable: {0}")]
    StoreUnavailable(String),

    /// The stored document could not be decoded.
    #[error("stored game document is corrupt: {0}")]
    Corrupt(String),
}

impl GameError {
    /// Stable wire code for `error { code, msg }` messages.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "GAME_NOT_FOUND",
            Self::DuplicateName(_) => "DUPLICATE_NAME",
            Self::EmptyName => "EMPTY_NAME",
            Self::EmptyRoster => "EMPTY_ROSTER",
            Self::NotInGame => "NOT_IN_GAME",
            // Undecodable documents surface as store trouble; the
            // distinction only matters in logs.
            Self::StoreUnavailable(_) | Self::Corrupt(_) => "STORE_UNAVAILABLE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes_are_stable() {
        assert_eq!(GameError::NotFound.code(), "GAME_NOT_FOUND");
        assert_eq!(
            GameError::DuplicateName("Alice".to_string()).code(),
            "DUPLICATE_NAME"
        );
        assert_eq!(GameError::EmptyName.code(), "EMPTY_NAME");
        assert_eq!(
            GameError::Corrupt("bad field".to_string()).code(),
            "STORE_UNAVAILABLE"
        );
    }
}
