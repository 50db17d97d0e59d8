//! Coalescing writer pushing a session's changes to the remote store.
//!
//! Two paths share one actor task per game. Debounced patches are merged and written
//! once the stream of changes has been quiet for the debounce window. Immediate
//! patches (the time-critical clock fields) are written as soon as they arrive.
//! Failed writes are logged and dropped from the immediate path; a failed debounced
//! write stays pending and goes out with the next debounce cycle.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dao::{api::GameApi, models::GamePatch};

enum SyncCommand {
    Debounced(GamePatch),
    Immediate(GamePatch),
    Flush(oneshot::Sender<()>),
}

/// Handle to the writer task of one game.
///
/// Dropping the handle closes the channel; the task then writes whatever is still
/// pending and exits.
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<SyncCommand>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Spawn the writer for `game_id`.
    pub fn spawn(api: Arc<dyn GameApi>, game_id: Uuid, debounce: Duration) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(api, game_id, debounce, rx));
        Self { commands, task }
    }

    /// Queue `patch` on the debounced path, restarting the debounce window.
    pub fn sync_state(&self, patch: GamePatch) {
        if patch.is_empty() {
            return;
        }
        self.send(SyncCommand::Debounced(patch));
    }

    /// Write `patch` without waiting for the debounce window.
    pub fn write_now(&self, patch: GamePatch) {
        if patch.is_empty() {
            return;
        }
        self.send(SyncCommand::Immediate(patch));
    }

    /// Write the pending debounced patch now and wait until it went out.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        self.send(SyncCommand::Flush(ack));
        let _ = done.await;
    }

    /// Close the writer, waiting for the final flush.
    pub async fn shutdown(self) {
        let Self { commands, task } = self;
        drop(commands);
        if let Err(err) = task.await {
            warn!(error = %err, "sync writer task ended abnormally");
        }
    }

    fn send(&self, command: SyncCommand) {
        if self.commands.send(command).is_err() {
            warn!("sync writer already stopped; dropping write");
        }
    }
}

async fn run(
    api: Arc<dyn GameApi>,
    game_id: Uuid,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<SyncCommand>,
) {
    let mut pending: Option<GamePatch> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(at) => tokio::select! {
                command = rx.recv() => command,
                _ = sleep_until(at) => {
                    deadline = None;
                    write_pending(api.as_ref(), game_id, &mut pending).await;
                    continue;
                }
            },
            None => rx.recv().await,
        };

        match command {
            Some(SyncCommand::Debounced(patch)) => {
                match pending.as_mut() {
                    Some(base) => base.merge(patch),
                    None => pending = Some(patch),
                }
                deadline = Some(Instant::now() + debounce);
            }
            Some(SyncCommand::Immediate(patch)) => {
                if let Err(err) = api.update(game_id, patch).await {
                    warn!(game_id = %game_id, error = %err, "time field write failed");
                }
            }
            Some(SyncCommand::Flush(ack)) => {
                deadline = None;
                write_pending(api.as_ref(), game_id, &mut pending).await;
                let _ = ack.send(());
            }
            None => {
                write_pending(api.as_ref(), game_id, &mut pending).await;
                debug!(game_id = %game_id, "sync writer closed");
                break;
            }
        }
    }
}

async fn write_pending(api: &dyn GameApi, game_id: Uuid, pending: &mut Option<GamePatch>) {
    let Some(patch) = pending.take() else {
        return;
    };
    if let Err(err) = api.update(game_id, patch.clone()).await {
        warn!(game_id = %game_id, error = %err, "state write failed; keeping it for the next cycle");
        *pending = Some(patch);
    }
}
