//! WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS (refused while draining)
//! - Resolve the session principal from `?token=` according to `auth.mode`
//! - Attach the connection to the hub, then forward decoded client events
//! - Lifecycle: ping + idle timeout + bounded socket writes; always detach from the hub on exit

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration, Instant};
use tracing::Instrument;

use pulse_core::error::{PulseError, Result};
use pulse_core::protocol::event::{ClientEvent, ServerEvent};

use crate::app_state::AppState;
use crate::auth::{self, Principal};
use crate::realtime::{ConnId, ConnectionHandle, HubEvent};
use crate::transport::codec::{decode, encode, Inbound};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
) -> Response {
    if app.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, "draining").into_response();
    }
    app.metrics().ws_upgrades.inc(&[]);

    ws.on_upgrade(move |socket| async move {
        let conn_id = app.hub().next_conn_id();
        let span = tracing::info_span!("session", conn = conn_id);
        async move {
            tracing::debug!("connection opened");
            match run_session(app, q, socket, conn_id).await {
                Ok(()) => tracing::debug!("connection closed"),
                Err(e) => tracing::debug!(error = %e, "connection closed with error"),
            }
        }
        .instrument(span)
        .await
    })
}

async fn run_session(app: AppState, q: WsQuery, socket: WebSocket, conn_id: ConnId) -> Result<()> {
    let (mut ws_tx, ws_rx) = socket.split();

    let principal = match auth::authenticate(app.cfg().auth.mode, app.validator(), q.token.as_deref()).await {
        Ok(p) => p,
        Err(e) => {
            app.metrics().auth_failures.inc(&[]);
            tracing::info!(error = %e, "session refused");
            if let Ok(m) = encode(&ServerEvent::error(&e)) {
                let _ = ws_tx.send(m).await;
            }
            let _ = ws_tx.close().await;
            return Err(e);
        }
    };

    let (out_tx, out_rx) = mpsc::channel::<Message>(app.cfg().gateway.outbound_queue);

    // sys.ready goes first: once the hub knows the handle, broadcasts may follow
    let ready = ServerEvent::Ready {
        socket_id: conn_id.to_string(),
        user: principal.user().map(str::to_string),
    };
    let _ = out_tx.try_send(encode(&ready)?);

    let hub = app.hub().clone();
    hub.send(HubEvent::Connected(ConnectionHandle::new(conn_id, out_tx.clone())))
        .await?;

    let res = session_loop(&app, &principal, conn_id, out_tx, out_rx, &mut ws_tx, ws_rx).await;

    // the hub must learn about every exit path, or the identity would stay online
    let _ = hub.send(HubEvent::Disconnected { conn: conn_id }).await;
    let _ = ws_tx.close().await;
    res
}

fn error_frame(err: &PulseError) -> Option<Message> {
    encode(&ServerEvent::error(err)).ok()
}

async fn session_loop(
    app: &AppState,
    principal: &Principal,
    conn_id: ConnId,
    out_tx: mpsc::Sender<Message>,
    mut out_rx: mpsc::Receiver<Message>,
    ws_tx: &mut SplitSink<WebSocket, Message>,
    mut ws_rx: SplitStream<WebSocket>,
) -> Result<()> {
    let hub = app.hub();
    let metrics = app.metrics();
    let gw = &app.cfg().gateway;
    let ping_every = Duration::from_millis(gw.ping_interval_ms);
    let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);
    let write_timeout = Duration::from_millis(gw.write_timeout_ms);
    let max_frame_bytes = gw.max_frame_bytes;

    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    // only inbound frames push the deadline; outbound traffic does not count as activity
    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break; };
                match timeout(write_timeout, ws_tx.send(m)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => break,
                    Err(_) => {
                        metrics.write_timeouts.inc(&[]);
                        tracing::debug!("write timeout");
                        break;
                    }
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(incoming) = incoming else { break; };
                let Ok(msg) = incoming else { break; };
                idle.as_mut().reset(Instant::now() + idle_timeout);

                match decode(msg, max_frame_bytes) {
                    Ok(Inbound::Event(ClientEvent::AddUser { user_id })) => {
                        let user_id = principal.bind_identity(user_id);
                        hub.send(HubEvent::Announce { conn: conn_id, user_id }).await?;
                    }
                    Ok(Inbound::Event(ClientEvent::SendMessage(intent))) => {
                        let intent = principal.bind_sender(intent);
                        hub.send(HubEvent::Message { conn: conn_id, intent }).await?;
                    }
                    // pongs to client pings are sent by the ws layer itself
                    Ok(Inbound::Heartbeat) => {}
                    Ok(Inbound::Close) => break,
                    Err(e) => {
                        metrics.decode_errors.inc(&[("code", e.client_code().as_str())]);
                        tracing::debug!(error = %e, "frame rejected");
                        if let Some(m) = error_frame(&e) {
                            let _ = out_tx.try_send(m);
                        }
                    }
                }
            }

            // ping
            _ = ping_tick.tick() => {
                let _ = out_tx.try_send(Message::Ping(Vec::new()));
            }

            // idle timeout
            _ = &mut idle => {
                tracing::debug!("idle timeout");
                if let Some(m) = error_frame(&PulseError::Timeout) {
                    let _ = timeout(write_timeout, ws_tx.send(m)).await;
                }
                break;
            }
        }
    }

    Ok(())
}
