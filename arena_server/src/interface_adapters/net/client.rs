use crate::domain::entity::SessionId;
use crate::domain::errors::UserStoreError;
use crate::domain::input::PlayerInput;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage, WorldUpdateDto};
use crate::interface_adapters::state::{Accounts, AppState};
use crate::interface_adapters::utils::ids::next_id;
use crate::use_cases::{GameEvent, LobbyHandle, ServerEvent, ServerState, WorldUpdate};

use axum::{
    Error, Json,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::watch::Receiver;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    JoinRequired,
    JoinTimeout,
    UnknownUser,
    ClosedBeforeJoin,
}

#[derive(Debug, serde::Deserialize)]
pub struct LobbyQuery {
    // The lobby id the client wants to join.
    #[serde(default)]
    lobby_id: Option<String>,
}

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each world update once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::WorldUpdate(WorldUpdateDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize world update");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                // Store the latest bytes for lag recovery.
                let _ = world_latest_tx.send(bytes.clone());
                let _ = world_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    missed = n,
                    "world serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

/// Registry hook: every room gets its own serializer as soon as it exists.
pub fn spawn_lobby_serializer(lobby: &LobbyHandle) {
    tokio::spawn(world_update_serializer(
        lobby.world_tx.subscribe(),
        lobby.world_bytes_tx.clone(),
        lobby.world_latest_tx.clone(),
    ));
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> impl IntoResponse {
    let lobby_id = query
        .lobby_id
        .unwrap_or_else(|| state.default_lobby_id.to_string());

    let lobby = match state.lobby_registry.get_lobby(&lobby_id).await {
        Some(lobby) => lobby,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "lobby not found".to_string(),
                }),
            )
                .into_response();
        }
    };

    let accounts = state.accounts.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, lobby, accounts))
}

async fn handle_socket(mut socket: WebSocket, lobby: LobbyHandle, accounts: Arc<Accounts>) {
    // Separate connection id for correlating logs before/after a session exists.
    let conn_id = next_id();
    let span = info_span!(
        "conn",
        conn_id,
        lobby_id = %lobby.lobby_id,
        session_id = tracing::field::Empty
    );
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&mut socket, &lobby, &accounts).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            warn!(error = ?e, "failed to bootstrap connection");
            let _ = socket.close().await;
            return;
        }
    };

    // Only the channels in `ctx` may keep the room reachable from here on.
    drop(lobby);

    span.record("session_id", ctx.session_id.0);
    info!(username = %ctx.username, "client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

#[derive(Debug, Default)]
struct ConnStats {
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
    // Count lag recovery snapshots sent to this client.
    lag_recovery_count: u64,
}

impl ConnStats {
    fn sent(&mut self, bytes: usize) {
        self.msgs_out += 1;
        self.bytes_out += bytes as u64;
    }
}

struct LogThrottle {
    input_full: Instant,
    world_lag: Instant,
    events_lag: Instant,
    invalid_input: Instant,
}

impl LogThrottle {
    fn new() -> Self {
        let now = Instant::now() - LOG_THROTTLE;
        Self {
            input_full: now,
            world_lag: now,
            events_lag: now,
            invalid_input: now,
        }
    }
}

struct ConnCtx {
    pub session_id: SessionId,
    pub username: String,
    pub input_tx: mpsc::Sender<GameEvent>,
    pub world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub world_latest_rx: watch::Receiver<Utf8Bytes>,
    pub server_state_rx: watch::Receiver<ServerState>,
    pub events_rx: broadcast::Receiver<ServerEvent>,
    pub stats: ConnStats,
    pub throttle: LogThrottle,
    pub close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct JoinHandshake {
    username: String,
    user_id: Option<String>,
    bytes_in: u64,
    msgs_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    lobby: &LobbyHandle,
    accounts: &Accounts,
) -> Result<ConnCtx, NetError> {
    // Subscribe to updates *before* doing anything else (awaits) to not miss packets.
    let world_bytes_rx = lobby.world_bytes_tx.subscribe();
    let world_latest_rx = lobby.world_latest_tx.subscribe();
    let server_state_rx = lobby.server_state_tx.subscribe();
    let events_rx = lobby.events_tx.subscribe();

    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    let username = match resolve_username(accounts, &join).await {
        Ok(username) => username,
        Err(UserStoreError::StorageFailure) => {
            let _ = send_close_with_reason(socket, close_code::ERROR, "user store unavailable")
                .await;
            return Err(NetError::UnknownUser);
        }
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "unknown user").await;
            return Err(NetError::UnknownUser);
        }
    };

    let session_id = SessionId(next_id());

    // Join happens before the identity so the first snapshot already holds the characters.
    // If anything after Join fails, compensate with Leave.
    lobby
        .input_tx
        .send(GameEvent::Join {
            session_id,
            username: username.clone(),
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    let mut stats = ConnStats {
        msgs_in: join.msgs_in,
        bytes_in: join.bytes_in,
        ..ConnStats::default()
    };

    let identity_msg = ServerMessage::Identity {
        session_id: session_id.0,
    };
    // Clone as soon as we borrow to avoid holding the watch lock across an await.
    let initial_state = server_state_rx.borrow().clone();
    let state_msg = ServerMessage::GameState(initial_state.into());
    for msg in [&identity_msg, &state_msg] {
        match send_message(socket, msg).await {
            Ok(bytes) => stats.sent(bytes),
            Err(err) => {
                let _ = lobby.input_tx.send(GameEvent::Leave { session_id }).await;
                return Err(err);
            }
        }
    }

    Ok(ConnCtx {
        session_id,
        username,
        input_tx: lobby.input_tx.clone(),
        world_bytes_rx,
        world_latest_rx,
        server_state_rx,
        events_rx,
        stats,
        throttle: LogThrottle::new(),
        close_frame: None,
    })
}

/// Registered accounts join under their stored name; guests under the name they sent.
async fn resolve_username(
    accounts: &Accounts,
    join: &JoinHandshake,
) -> Result<String, UserStoreError> {
    if let Some(user_id) = join.user_id.as_deref().filter(|id| !id.trim().is_empty()) {
        return accounts.get_user(user_id.trim()).await.map(|user| user.username);
    }
    let username: String = join.username.trim().chars().take(MAX_USERNAME_LEN).collect();
    if username.is_empty() {
        return Err(UserStoreError::InvalidUsername);
    }
    Ok(username)
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_USERNAME_LEN: usize = 20;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                let payload = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                return Ok(JoinHandshake {
                    username: payload.username,
                    user_id: payload.user_id,
                    bytes_in,
                    msgs_in: 1,
                });
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn sanitize_input(input: PlayerInput) -> Option<PlayerInput> {
    if !input.aim.is_finite() {
        return None;
    }
    Some(input)
}

/// Maps a parsed client message to the room event it stands for.
fn to_game_event(session_id: SessionId, msg: ClientMessage) -> Option<GameEvent> {
    let event = match msg {
        // Repeated joins after bootstrap are ignored to keep the session stable.
        ClientMessage::Join(_) => return None,
        ClientMessage::Input(input) => GameEvent::Input {
            session_id,
            input: sanitize_input(input.into())?,
        },
        ClientMessage::SwitchCharacter => GameEvent::SwitchCharacter { session_id },
        ClientMessage::ChatMessage { text } => GameEvent::Chat { session_id, text },
        ClientMessage::InventoryAction(action) => GameEvent::Inventory {
            session_id,
            action: action.into(),
        },
        ClientMessage::DropItem { slot_index } => GameEvent::DropItem {
            session_id,
            slot_index,
        },
        ClientMessage::ShopTrade { trade_id } => GameEvent::ShopTrade {
            session_id,
            trade_id,
        },
        ClientMessage::ReadyForRematch => GameEvent::ReadyForRematch { session_id },
    };
    Some(event)
}

fn forward_event(
    session_id: SessionId,
    input_tx: &mpsc::Sender<GameEvent>,
    msg: ClientMessage,
    throttle: &mut LogThrottle,
) -> Result<LoopControl, NetError> {
    let Some(event) = to_game_event(session_id, msg) else {
        if should_log(&mut throttle.invalid_input) {
            warn!(session_id = session_id.0, "message dropped (duplicate join or NaN/inf aim)");
        }
        return Ok(LoopControl::Continue);
    };

    match input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(&mut throttle.input_full) {
                warn!(session_id = session_id.0, "input channel full; dropping event");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let session_id = ctx.session_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        input_tx,
        world_bytes_rx,
        world_latest_rx,
        server_state_rx,
        events_rx,
        stats,
        throttle,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, session_id, input_tx, stats, throttle, close_frame) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            world_msg = world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => match forward_world_bytes(bytes, socket, stats).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut throttle.world_lag) {
                            warn!(missed = n, "world updates lagged; sending snapshot");
                        }

                        // Resync strategy: send the latest world snapshot.
                        let latest = world_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            stats.lag_recovery_count += 1;
                            match forward_world_bytes(latest, socket, stats).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => room_closed(close_frame),
                }
            }

            changed_state = server_state_rx.changed() => {
                match changed_state {
                    Ok(()) => match forward_server_state(server_state_rx, socket, stats).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(_) => room_closed(close_frame),
                }
            }

            event = events_rx.recv() => {
                match event {
                    Ok(event) => match forward_event_message(&event, session_id, socket, stats).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut throttle.events_lag) {
                            warn!(missed = n, "room events lagged; some were skipped");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => room_closed(close_frame),
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(session_id, input_tx, stats).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

// The room was retired (rematch redirect or removal) and its channels closed.
fn room_closed(close_frame: &mut Option<CloseFrame>) -> bool {
    if close_frame.is_none() {
        *close_frame = Some(CloseFrame {
            code: close_code::AWAY,
            reason: "room closed".into(),
        });
        info!("room closed; disconnecting");
    }
    true
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    session_id: SessionId,
    input_tx: &mpsc::Sender<GameEvent>,
    stats: &mut ConnStats,
    throttle: &mut LogThrottle,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                stats.msgs_in += 1;
                stats.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => {
                        stats.invalid_json = 0;
                        forward_event(session_id, input_tx, msg, throttle)
                    }
                    Err(parse_err) => {
                        stats.invalid_json += 1;
                        if should_log(&mut throttle.invalid_input) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if stats.invalid_json >= MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    stats: &mut ConnStats,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket
        .send(Message::Text(world_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            stats.sent(bytes_len);
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send world update");
            LoopControl::Disconnect
        }
    }
}

async fn forward_server_state(
    server_state_rx: &Receiver<ServerState>,
    socket: &mut WebSocket,
    stats: &mut ConnStats,
) -> LoopControl {
    let st = server_state_rx.borrow().clone();
    let msg = ServerMessage::GameState(st.into());
    match send_message(socket, &msg).await {
        Ok(bytes) => {
            stats.sent(bytes);
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send server state");
            LoopControl::Disconnect
        }
    }
}

async fn forward_event_message(
    event: &ServerEvent,
    session_id: SessionId,
    socket: &mut WebSocket,
    stats: &mut ConnStats,
) -> LoopControl {
    let Some(msg) = ServerMessage::from_event(event, session_id) else {
        return LoopControl::Continue;
    };
    match send_message(socket, &msg).await {
        Ok(bytes) => {
            stats.sent(bytes);
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send room event");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(
    session_id: SessionId,
    input_tx: &mpsc::Sender<GameEvent>,
    stats: &ConnStats,
) -> Result<(), NetError> {
    debug!(
        msgs_in = stats.msgs_in,
        msgs_out = stats.msgs_out,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        invalid_json = stats.invalid_json,
        lag_recovery_count = stats.lag_recovery_count,
        "connection stats"
    );
    info!("client disconnected");

    // A retired room no longer takes events; its characters went with it.
    if input_tx.is_closed() {
        return Ok(());
    }
    input_tx
        .send(GameEvent::Leave { session_id })
        .await
        .map_err(|_| NetError::InputClosed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface_adapters::protocol::PlayerInputDto;

    #[test]
    fn when_aim_is_not_finite_then_input_is_dropped() {
        let dto = PlayerInputDto {
            aim_x: f32::NAN,
            ..PlayerInputDto::default()
        };
        assert!(to_game_event(SessionId(1), ClientMessage::Input(dto)).is_none());
    }

    #[test]
    fn when_shop_trade_arrives_then_it_is_routed_to_the_session() {
        let msg = ClientMessage::ShopTrade {
            trade_id: "arrows".to_string(),
        };
        match to_game_event(SessionId(4), msg) {
            Some(GameEvent::ShopTrade {
                session_id,
                trade_id,
            }) => {
                assert_eq!(session_id, SessionId(4));
                assert_eq!(trade_id, "arrows");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn when_join_repeats_after_bootstrap_then_it_is_ignored() {
        let msg = ClientMessage::Join(crate::interface_adapters::protocol::JoinPayload {
            username: "again".to_string(),
            user_id: None,
        });
        assert!(to_game_event(SessionId(1), msg).is_none());
    }

    #[test]
    fn when_throttle_window_has_not_passed_then_logging_is_suppressed() {
        let mut last = Instant::now() - LOG_THROTTLE;
        assert!(should_log(&mut last));
        assert!(!should_log(&mut last));
    }
}
