// =============================================================================
// WebSocket Handler: live dashboard feed
// =============================================================================
//
// Clients connect to `/api/v1/ws?ticker=<T>&period=<P>` and receive:
//   1. An immediate DashboardView for the selection.
//   2. A fresh DashboardView every `live_refresh_secs`. Fetches go through the
//      caches, so the provider is hit at most once per cache TTL.
//
// Views are built on a separate feed task and handed over through a channel,
// so Ping / Close frames are answered while a fetch is still in flight.
//
// A failed fetch is reported as `{"error": "..."}` and the feed keeps going.
// Ping is answered with Pong; Close or a receive error ends the connection.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::rest::{resolve_selection, SelectionQuery};
use crate::app_state::AppState;
use crate::companies::Company;
use crate::types::Period;

// =============================================================================
// WebSocket upgrade handler
// =============================================================================

/// Validates the selection before looking at the upgrade; a bad ticker or
/// period is rejected with 400 instead of an open socket.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SelectionQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let (company, period) = match resolve_selection(&state, &query) {
        Ok(sel) => sel,
        Err(rejection) => {
            warn!("WebSocket connection rejected: invalid selection");
            return rejection.into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            debug!(error = %rejection, "not a WebSocket upgrade request");
            return rejection.into_response();
        }
    };

    info!(ticker = company.ticker, period = %period, "WebSocket connection accepted, upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, company, period))
}

// =============================================================================
// Connection handler
// =============================================================================

async fn handle_ws_connection(
    socket: WebSocket,
    state: Arc<AppState>,
    company: Company,
    period: Period,
) {
    let (mut sender, mut receiver) = socket.split();
    let (mut views, feed) = spawn_feed(state, company, period);
    let mut sent: u64 = 0;

    loop {
        tokio::select! {
            payload = views.recv() => {
                let Some(json) = payload else {
                    debug!("feed task ended");
                    break;
                };
                if let Err(e) = sender.send(Message::Text(json)).await {
                    debug!(error = %e, "WebSocket send failed, disconnecting");
                    break;
                }
                sent += 1;
                debug!(seq = sent, "WebSocket view sent");
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(error = %e, "Failed to send Pong, disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket Close frame received, disconnecting");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Text / Binary / Pong carry no commands.
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error, disconnecting");
                        break;
                    }
                    None => {
                        info!("WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    feed.abort();
    info!(ticker = company.ticker, sent, "WebSocket connection closed");
}

// =============================================================================
// Feed task
// =============================================================================

/// Produce one serialised view per tick until the receiver goes away. The
/// first tick fires immediately and delivers the initial view.
fn spawn_feed(
    state: Arc<AppState>,
    company: Company,
    period: Period,
) -> (mpsc::Receiver<String>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        let mut push_interval = interval(Duration::from_secs(state.config.live_refresh_secs));
        push_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = push_interval.tick() => {}
                _ = tx.closed() => break,
            }

            let Some(payload) = render_payload(&state, company, period).await else {
                continue;
            };
            if tx.send(payload).await.is_err() {
                break;
            }
        }
    });

    (rx, handle)
}

/// Current view as JSON, or an `{"error": ...}` body when the fetch fails.
/// `None` only if serialisation itself fails.
async fn render_payload(state: &AppState, company: Company, period: Period) -> Option<String> {
    let payload = match state.dashboard(company, period).await {
        Ok(view) => serde_json::to_string(&view),
        Err(e) => {
            warn!(ticker = company.ticker, error = %e, "live fetch failed");
            serde_json::to_string(&serde_json::json!({
                "error": format!("Unable to fetch stock data for {}: {e}", company.name),
            }))
        }
    };

    match payload {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(error = %e, "Failed to serialize dashboard view");
            None
        }
    }
}
