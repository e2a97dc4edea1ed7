//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::player::PlayerId;
use crate::game::{AccountLink, Command, SessionMsg};
use crate::http::middleware::{verify_jwt, JwtClaims};
use crate::util::rate_limit::SessionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Optional JWT; guests connect without one
    pub token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let token = query.token.filter(|t| !t.is_empty());

    let claims = match (token, state.config.jwt_secret.as_deref()) {
        (None, _) => None,
        (Some(_), None) => {
            warn!("Token supplied but JWT_SECRET is unset, connecting as guest");
            None
        }
        (Some(token), Some(secret)) => match verify_jwt(&token, secret) {
            Ok(claims) => Some(claims),
            Err(e) => {
                warn!(error = %e, "WebSocket auth failed");
                return e.into_response();
            }
        },
    };

    ws.on_upgrade(move |socket| handle_socket(socket, claims, state))
}

/// Look up (or create) the account's progress so it can seed the player
async fn load_account(state: &AppState, claims: &JwtClaims) -> Option<AccountLink> {
    match state
        .progress_store
        .ensure(claims.sub, &claims.default_display_name())
        .await
    {
        Ok(record) => Some(AccountLink {
            account_id: claims.sub,
            display_name: Some(record.display_name.clone()),
            progress: record.to_persistent_data(),
        }),
        Err(e) => {
            // Playing on as the account would overwrite stored progress
            error!(account_id = %claims.sub, error = %e, "Failed to load progress, connecting as guest");
            None
        }
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, claims: Option<JwtClaims>, state: AppState) {
    let player_id = Uuid::new_v4();
    let account = match &claims {
        Some(claims) => load_account(&state, claims).await,
        None => None,
    };
    info!(
        player_id = %player_id,
        account_id = ?account.as_ref().map(|a| a.account_id),
        "New WebSocket connection"
    );

    let (session_tx, session_rx) = mpsc::unbounded_channel();
    // Subscribe before connecting so no world event is missed
    let events_rx = state.game.events_tx.subscribe();

    let connect = Command::Connect {
        player_id,
        account,
        session: session_tx,
    };
    if state.game.command_tx.send(connect).await.is_err() {
        error!(player_id = %player_id, "Game loop is gone, dropping connection");
        return;
    }

    let (ws_sink, ws_stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(player_id, ws_sink, session_rx, events_rx));
    let command_tx = state.game.command_tx.clone();

    tokio::select! {
        _ = read_loop(player_id, ws_stream, &command_tx) => {}
        _ = &mut writer => {
            debug!(player_id = %player_id, "Writer finished first");
        }
    }
    writer.abort();

    let _ = command_tx.send(Command::Disconnect { player_id }).await;
    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Reader loop: WebSocket -> tick task
async fn read_loop(
    player_id: PlayerId,
    mut ws_stream: SplitStream<WebSocket>,
    command_tx: &mpsc::Sender<Command>,
) {
    let rate_limiter = SessionRateLimiter::new();

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_inbound() {
                    debug!(player_id = %player_id, "Rate limited inbound message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        if command_tx
                            .send(Command::Client { player_id, msg })
                            .await
                            .is_err()
                        {
                            debug!(player_id = %player_id, "Command channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Writer loop: direct messages and world broadcasts -> WebSocket
async fn write_loop(
    player_id: PlayerId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut session_rx: mpsc::UnboundedReceiver<SessionMsg>,
    mut events_rx: broadcast::Receiver<ServerMsg>,
) {
    loop {
        tokio::select! {
            // Direct messages first so init precedes the first state frame
            biased;

            direct = session_rx.recv() => match direct {
                Some(SessionMsg::Send(msg)) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Some(SessionMsg::Close) => {
                    let _ = ws_sink.send(Message::Close(None)).await;
                    break;
                }
                None => break,
            },
            event = events_rx.recv() => match event {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Snapshots are full state, skipping some is harmless
                    warn!(player_id = %player_id, lagged_count = n, "Client lagged behind broadcasts");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(player_id = %player_id, "Broadcast channel closed");
                    break;
                }
            },
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
