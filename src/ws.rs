//! WebSocket sessions.
//!
//! One socket is one participant. Each session keeps its own cached copy of
//! the game document, its own player identity, its own store subscription,
//! and its own local countdown: exactly the state a browser tab would hold.
//! All game mutations go through the shared store; the session learns about
//! everyone's writes (including its own) from the subscription.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::SplitSink, stream::StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::store::StoreSubscription;
use crate::timer::Countdown;
use crate::types::{GameState, Player, GAME_CODE_LENGTH};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Share-link game code (`?game=A1B2C3`), forwarded from the page URL.
    pub game: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: game={:?}", params.game);
    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// One participant's connection state.
pub struct Session {
    app: Arc<AppState>,
    /// Cached copy of the last pushed game document.
    pub game: Option<GameState>,
    /// Which roster entry is "self".
    pub player: Option<Player>,
    pub subscription: Option<StoreSubscription>,
    pub countdown: Countdown,
}

impl Session {
    pub fn new(app: Arc<AppState>) -> Self {
        Self {
            app,
            game: None,
            player: None,
            subscription: None,
            countdown: Countdown::new(),
        }
    }

    /// Whether the cached roster lists this session's player as leader.
    pub fn is_leader(&self) -> bool {
        match (&self.game, &self.player) {
            (Some(state), Some(player)) => state
                .players
                .iter()
                .any(|p| p.id == player.id && p.is_leader),
            _ => false,
        }
    }

    /// Handle one client message, returning the direct reply if any.
    /// Mutations also reach this session (and everyone else) as store
    /// pushes, so most successful actions need no direct reply.
    pub async fn handle(&mut self, msg: ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::CreateGame { config, name } => {
                if self.player.is_some() {
                    return Some(already_in_game());
                }
                match self.app.create_game(config, &name).await {
                    Ok((state, player)) => self.enter_game(state, player).await,
                    Err(e) => Some(error_message(e)),
                }
            }

            ClientMessage::JoinGame { code, name } => {
                if self.player.is_some() {
                    return Some(already_in_game());
                }
                let code = code.trim().to_uppercase();
                match self.app.join_game(&code, &name).await {
                    Ok((state, player)) => self.enter_game(state, player).await,
                    Err(e) => Some(error_message(e)),
                }
            }

            ClientMessage::LeaveGame => {
                let (code, player_id) = match (&self.game, &self.player) {
                    (Some(state), Some(player)) => (state.id.clone(), player.id.clone()),
                    _ => return Some(not_in_game()),
                };
                // Unsubscribe first so our own removal push isn't observed.
                self.reset();
                if let Err(e) = self.app.leave_game(&code, &player_id).await {
                    // The game may already be gone; leaving is best-effort.
                    tracing::debug!("leave failed: {}", e);
                }
                None
            }

            ClientMessage::KickPlayer { player_id } => {
                let (code, requester_id) = match self.leader_context("remove players") {
                    Ok(ctx) => ctx,
                    Err(e) => return Some(e),
                };
                match self.app.kick_player(&code, &requester_id, &player_id).await {
                    Ok(_) => None,
                    Err(e) => Some(error_message(e)),
                }
            }

            ClientMessage::StartRound => {
                let (code, _) = match self.leader_context("start the round") {
                    Ok(ctx) => ctx,
                    Err(e) => return Some(e),
                };
                match self.app.start_round(&code).await {
                    Ok(_) => None,
                    Err(e) => Some(error_message(e)),
                }
            }

            ClientMessage::EndRound => {
                let (code, _) = match self.leader_context("end the round") {
                    Ok(ctx) => ctx,
                    Err(e) => return Some(e),
                };
                match self.app.end_round(&code).await {
                    Ok(_) => None,
                    Err(e) => Some(error_message(e)),
                }
            }

            ClientMessage::AbortMission => {
                let (code, _) = match self.leader_context("abort the mission") {
                    Ok(ctx) => ctx,
                    Err(e) => return Some(e),
                };
                match self.app.abort_mission(&code).await {
                    Ok(()) => None,
                    Err(e) => Some(error_message(e)),
                }
            }
        }
    }

    /// React to one pushed document change.
    ///
    /// Observation order matters and mirrors what every client of the
    /// shared store does: an aborted mission wins over a kick, and both win
    /// over a plain sync.
    pub fn apply_store_event(&mut self, value: Option<Value>) -> Option<ServerMessage> {
        let me = self.player.clone()?;

        let Some(value) = value else {
            self.reset();
            return Some(ServerMessage::GameClosed);
        };

        let state: GameState = match serde_json::from_value(value) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("ignoring undecodable game push: {}", e);
                return None;
            }
        };

        if state.mission_aborted && !me.is_leader {
            self.reset();
            return Some(ServerMessage::MissionAborted);
        }

        if !state.contains_player(&me.id) {
            self.reset();
            return Some(ServerMessage::Removed);
        }

        // Leadership may have moved to this player; refresh the identity.
        if let Some(updated) = state.find_player(&me.id) {
            self.player = Some(updated.clone());
        }

        if state.is_playing && state.time_remaining > 0 {
            self.countdown.arm(state.time_remaining);
        } else {
            self.countdown.disarm();
        }

        self.game = Some(state.clone());
        Some(ServerMessage::StateSync { state })
    }

    /// The subscription channel died under us.
    pub fn store_closed(&mut self) -> ServerMessage {
        self.reset();
        error_message(GameError::StoreUnavailable(
            "lost connection to the shared store".to_string(),
        ))
    }

    /// Resolve the current game for a leader-only action.
    fn leader_context(&self, action: &str) -> Result<(String, String), ServerMessage> {
        let (state, player) = match (&self.game, &self.player) {
            (Some(state), Some(player)) => (state, player),
            _ => return Err(not_in_game()),
        };
        if !self.is_leader() {
            return Err(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only the leader can {}", action),
            });
        }
        Ok((state.id.clone(), player.id.clone()))
    }

    async fn enter_game(&mut self, state: GameState, player: Player) -> Option<ServerMessage> {
        match self
            .app
            .store
            .subscribe(&AppState::game_path(&state.id))
            .await
        {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                if state.is_playing {
                    self.countdown.arm(state.time_remaining);
                }
                let reply = ServerMessage::GameJoined {
                    state: state.clone(),
                    player: player.clone(),
                };
                self.game = Some(state);
                self.player = Some(player);
                Some(reply)
            }
            Err(e) => Some(error_message(e)),
        }
    }

    fn reset(&mut self) {
        self.game = None;
        self.player = None;
        self.subscription = None;
        self.countdown.disarm();
    }
}

fn error_message(e: GameError) -> ServerMessage {
    ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    }
}

fn not_in_game() -> ServerMessage {
    error_message(GameError::NotInGame)
}

fn already_in_game() -> ServerMessage {
    ServerMessage::Error {
        code: "ALREADY_IN_GAME".to_string(),
        msg: "Leave the current game first".to_string(),
    }
}

/// Wait for the next pushed change on the session's subscription.
///
/// Pends forever while unsubscribed. Returns `None` when the channel is
/// closed; skipped (lagged) pushes are safe to drop because every event
/// carries the full document.
pub async fn next_store_event(subscription: &mut Option<StoreSubscription>) -> Option<Option<Value>> {
    let Some(rx) = subscription else {
        std::future::pending::<()>().await;
        unreachable!()
    };
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event.value),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "session lagged behind store pushes");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

async fn send(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("Failed to encode server message: {}", e);
            Ok(())
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, app: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Share links pre-resolve their game so the client can jump straight to
    // the name prompt. Malformed or unknown codes fall through silently.
    let linked = match params.game.as_deref() {
        Some(code) if code.len() == GAME_CODE_LENGTH => {
            app.read_game(&code.to_uppercase()).await.ok()
        }
        _ => None,
    };

    let welcome = ServerMessage::Welcome {
        protocol: "1.0".to_string(),
        server_now: chrono::Utc::now().to_rfc3339(),
        game: linked,
    };
    if send(&mut sender, &welcome).await.is_err() {
        tracing::error!("Failed to send welcome message");
        return;
    }

    let mut session = Session::new(app);

    loop {
        tokio::select! {
            // Pushed document changes from the shared store
            event = next_store_event(&mut session.subscription) => {
                let reply = match event {
                    Some(value) => session.apply_store_event(value),
                    None => Some(session.store_closed()),
                };
                if let Some(msg) = reply {
                    if send(&mut sender, &msg).await.is_err() {
                        break;
                    }
                }
            }

            // Local per-second countdown while a round is running
            seconds = session.countdown.tick() => {
                if send(&mut sender, &ServerMessage::TimerTick { seconds }).await.is_err() {
                    break;
                }
            }

            // Client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if let Some(response) = session.handle(client_msg).await {
                                    if send(&mut sender, &response).await.is_err() {
                                        tracing::error!("Failed to send response");
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                };
                                let _ = send(&mut sender, &error).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Dropping the session drops its subscription and countdown. The roster
    // entry stays until the player leaves or is kicked, the same as a
    // closed browser tab.
    tracing::info!("WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::GameConfig;

    fn session() -> Session {
        Session::new(Arc::new(AppState::new(Arc::new(MemoryStore::new()))))
    }

    #[tokio::test]
    async fn test_create_game_replies_with_identity() {
        let mut session = session();
        let reply = session
            .handle(ClientMessage::CreateGame {
                config: GameConfig::default(),
                name: "Alice".to_string(),
            })
            .await;

        match reply {
            Some(ServerMessage::GameJoined { state, player }) => {
                assert_eq!(state.players.len(), 1);
                assert!(player.is_leader);
            }
            other => panic!("expected GameJoined, got {:?}", other),
        }
        assert!(session.subscription.is_some());
        assert!(session.is_leader());
    }

    #[tokio::test]
    async fn test_join_unknown_game_reports_not_found() {
        let mut session = session();
        let reply = session
            .handle(ClientMessage::JoinGame {
                code: "zzzzzz".to_string(),
                name: "Bob".to_string(),
            })
            .await;

        match reply {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "GAME_NOT_FOUND"),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_leader_only_actions_rejected_for_non_leader() {
        let app = Arc::new(AppState::new(Arc::new(MemoryStore::new())));
        let mut leader = Session::new(app.clone());
        leader
            .handle(ClientMessage::CreateGame {
                config: GameConfig::default(),
                name: "Alice".to_string(),
            })
            .await;
        let code = leader.game.as_ref().unwrap().id.clone();

        let mut follower = Session::new(app);
        follower
            .handle(ClientMessage::JoinGame {
                code,
                name: "Bob".to_string(),
            })
            .await;

        let reply = follower.handle(ClientMessage::StartRound).await;
        match reply {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "UNAUTHORIZED"),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_actions_without_a_game_report_not_in_game() {
        let mut session = session();
        let reply = session.handle(ClientMessage::StartRound).await;
        match reply {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "NOT_IN_GAME"),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_push_without_self_means_removed() {
        let mut session = session();
        session
            .handle(ClientMessage::CreateGame {
                config: GameConfig::default(),
                name: "Alice".to_string(),
            })
            .await;

        // A push in which our player no longer appears anywhere.
        let mut state = session.game.clone().unwrap();
        state.players.clear();
        state
            .players
            .push(Player::new("Someone".to_string(), true));
        let value = serde_json::to_value(&state).unwrap();

        let reply = session.apply_store_event(Some(value));
        assert!(matches!(reply, Some(ServerMessage::Removed)));
        assert!(session.player.is_none());
        assert!(session.subscription.is_none());
    }

    #[tokio::test]
    async fn test_abort_flag_resets_non_leader() {
        let app = Arc::new(AppState::new(Arc::new(MemoryStore::new())));
        let mut leader = Session::new(app.clone());
        leader
            .handle(ClientMessage::CreateGame {
                config: GameConfig::default(),
                name: "Alice".to_string(),
            })
            .await;
        let code = leader.game.as_ref().unwrap().id.clone();

        let mut follower = Session::new(app.clone());
        follower
            .handle(ClientMessage::JoinGame {
                code: code.clone(),
                name: "Bob".to_string(),
            })
            .await;

        let mut state = app.read_game(&code).await.unwrap();
        state.mission_aborted = true;
        let value = serde_json::to_value(&state).unwrap();

        // The leader ignores its own flag; the follower resets.
        let leader_reply = leader.apply_store_event(Some(value.clone()));
        assert!(matches!(
            leader_reply,
            Some(ServerMessage::StateSync { .. })
        ));

        let follower_reply = follower.apply_store_event(Some(value));
        assert!(matches!(
            follower_reply,
            Some(ServerMessage::MissionAborted)
        ));
        assert!(follower.player.is_none());
    }

    #[tokio::test]
    async fn test_deleted_game_closes_session() {
        let mut session = session();
        session
            .handle(ClientMessage::CreateGame {
                config: GameConfig::default(),
                name: "Alice".to_string(),
            })
            .await;

        let reply = session.apply_store_event(None);
        assert!(matches!(reply, Some(ServerMessage::GameClosed)));
        assert!(session.game.is_none());
    }

    #[tokio::test]
    async fn test_leadership_refresh_on_push() {
        let app = Arc::new(AppState::new(Arc::new(MemoryStore::new())));
        let mut leader = Session::new(app.clone());
        leader
            .handle(ClientMessage::CreateGame {
                config: GameConfig::default(),
                name: "Alice".to_string(),
            })
            .await;
        let code = leader.game.as_ref().unwrap().id.clone();

        let mut follower = Session::new(app.clone());
        follower
            .handle(ClientMessage::JoinGame {
                code: code.clone(),
                name: "Bob".to_string(),
            })
            .await;
        assert!(!follower.is_leader());

        // The leader leaves; Bob is promoted in the store.
        let alice_id = leader.player.as_ref().unwrap().id.clone();
        app.leave_game(&code, &alice_id).await.unwrap();

        let pushed = app.read_game(&code).await.unwrap();
        let value = serde_json::to_value(&pushed).unwrap();
        follower.apply_store_event(Some(value));

        assert!(follower.is_leader());
        assert!(follower.player.as_ref().unwrap().is_leader);
    }

    #[tokio::test]
    async fn test_push_arms_and_disarms_countdown() {
        let app = Arc::new(AppState::new(Arc::new(MemoryStore::new())));
        let mut session = Session::new(app.clone());
        session
            .handle(ClientMessage::CreateGame {
                config: GameConfig::default(),
                name: "Alice".to_string(),
            })
            .await;
        let code = session.game.as_ref().unwrap().id.clone();

        let started = app.start_round(&code).await.unwrap();
        session.apply_store_event(Some(serde_json::to_value(&started).unwrap()));
        assert_eq!(session.countdown.remaining(), 480);

        let ended = app.end_round(&code).await.unwrap();
        session.apply_store_event(Some(serde_json::to_value(&ended).unwrap()));
        // Disarmed; remaining keeps its last value but the clock is idle.
        assert!(matches!(
            session.game.as_ref().map(|g| g.is_playing),
            Some(false)
        ));
    }
}
