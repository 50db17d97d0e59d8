use std::{convert::Infallible, time::Duration};

use axum::{
    extract::ws::{Message, WebSocket},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::{
    sync::broadcast::error::RecvError,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

use crate::{
    clock::{TICK_PERIOD, now_millis},
    dao::{
        api::GameApi,
        models::{GamePatch, GameRecord},
    },
    dto::{
        game::ScoreboardView,
        realtime::RealtimeMessage,
        sse::{Handshake, ServerEvent},
    },
    error::ServiceError,
    session::ViewerSession,
    state::SharedState,
};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Look a game up by the code its viewers were given.
pub async fn find_by_share_code(
    state: &SharedState,
    share_code: &str,
) -> Result<GameRecord, ServiceError> {
    let share_code = share_code.trim();
    if share_code.is_empty() {
        return Err(ServiceError::InvalidInput("share code is empty".into()));
    }
    let store = state.require_game_store().await?;
    store
        .find_by_share_code(share_code.to_string())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no game shared as `{share_code}`")))
}

/// Forward the raw realtime channel of `record` to a viewer WebSocket.
///
/// The first message carries every column of the record so the client starts from a
/// complete picture. Inbound frames other than close are ignored.
pub async fn handle_socket(state: SharedState, socket: WebSocket, record: GameRecord) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates = state.realtime().subscribe(&record.share_code);
    let share_code = record.share_code.clone();
    info!(share_code = %share_code, "viewer websocket connected");

    let initial = RealtimeMessage::GameUpdate(GamePatch::full(&record));
    if send_message(&mut sender, &initial).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(err)) => {
                    warn!(share_code = %share_code, error = %err, "viewer websocket receive error");
                    break;
                }
                Some(Ok(_)) => {}
            },
            update = updates.recv() => {
                let message = match update {
                    Ok(message) => message,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(share_code = %share_code, skipped, "viewer lagged; resending full record");
                        match state.gateway().get(record.id).await {
                            Ok(fresh) => RealtimeMessage::GameUpdate(GamePatch::full(&fresh)),
                            Err(err) => {
                                warn!(share_code = %share_code, error = %err, "failed to reload game for lagged viewer");
                                continue;
                            }
                        }
                    }
                    Err(RecvError::Closed) => break,
                };
                if send_message(&mut sender, &message).await.is_err() {
                    break;
                }
            }
        }
    }

    info!(share_code = %share_code, "viewer websocket disconnected");
}

async fn send_message<S>(sender: &mut S, message: &RealtimeMessage) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "failed to serialize realtime message");
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}

/// Stream fully resolved scoreboards of `record` as server-sent events.
///
/// A `handshake` event comes first, then one `scoreboard` event per realtime update.
/// While the game clock runs a `scoreboard` event is also emitted every second with
/// the clock interpolated from the persisted checkpoint.
pub fn scoreboard_stream(
    state: SharedState,
    record: GameRecord,
    degraded: bool,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut updates = state.realtime().subscribe(&record.share_code);
    let max_elapsed_secs = state.config().engine.max_resume_elapsed_secs;
    let share_code = record.share_code.clone();
    info!(share_code = %share_code, "viewer SSE stream connected");

    let stream = async_stream::stream! {
        let handshake = Handshake { share_code: share_code.clone(), degraded };
        if let Some(event) = encode("handshake", &handshake) {
            yield Ok(event);
        }

        let mut viewer = ViewerSession::new(record, max_elapsed_secs);
        let mut ticker = interval(TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            if let Some(event) = encode("scoreboard", &ScoreboardView::from(viewer.view(now_millis()))) {
                yield Ok(event);
            }

            tokio::select! {
                update = updates.recv() => match update {
                    Ok(RealtimeMessage::GameUpdate(patch)) => viewer.apply(patch),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(share_code = %share_code, skipped, "viewer stream lagged; reloading game");
                        match state.gateway().get(viewer.game_id()).await {
                            Ok(fresh) => viewer = ViewerSession::new(fresh, max_elapsed_secs),
                            Err(err) => warn!(share_code = %share_code, error = %err, "failed to reload game for lagged viewer"),
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = ticker.tick(), if viewer.is_running() => {}
            }
        }
        debug!(share_code = %share_code, "viewer SSE stream ended");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

fn encode<T: serde::Serialize>(name: &str, payload: &T) -> Option<Event> {
    match ServerEvent::json(Some(name.to_string()), payload) {
        Ok(server_event) => {
            let mut event = Event::default().data(server_event.data);
            if let Some(name) = server_event.event {
                event = event.event(name);
            }
            Some(event)
        }
        Err(err) => {
            warn!(event = name, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}
