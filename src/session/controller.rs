use std::{collections::HashMap, sync::Arc};

use tokio::{
    sync::{
        Mutex,
        broadcast::{self, error::RecvError},
        mpsc,
    },
    task::JoinHandle,
    time::{Instant, sleep},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clock::{ClockEvent, ClockId, ClockSet, now_millis},
    config::EngineConfig,
    dao::{api::GameApi, models::GamePatch, storage::StorageResult},
    display,
    dto::realtime::RealtimeMessage,
    services::records::{FinalReport, RecordsSink},
    state::{
        RealtimeHub,
        game::TeamInfo,
        state_machine::{Effect, FinalResult, Outcome, Scoreboard, Transition},
    },
    sync::SyncHandle,
};

use super::{Reconciler, Snapshot};

/// Collaborators a controller session is built from.
#[derive(Clone)]
pub struct SessionDeps {
    /// Remote store access.
    pub api: Arc<dyn GameApi>,
    /// Realtime channels; the session listens on its game's channel.
    pub hub: Arc<RealtimeHub>,
    /// Destination of final results.
    pub records: Arc<dyn RecordsSink>,
    /// Engine timings.
    pub rules: EngineConfig,
}

#[derive(Debug, Clone, Copy)]
enum CelebrationTimer {
    Commit(Uuid),
    Expire(Uuid),
}

/// The session holding write authority over one game.
///
/// Operator commands, clock events, celebration timers and realtime patches are all
/// applied under one lock, so the scoreboard has a single writer. Every task the
/// session owns is cancelled by [`ControllerSession::shutdown`] or when the session
/// is dropped.
pub struct ControllerSession {
    game_id: Uuid,
    share_code: String,
    inner: Arc<Mutex<Inner>>,
    pump: JoinHandle<()>,
}

impl ControllerSession {
    /// Load `game_id`, decode its display state and resume its clocks.
    pub async fn open(deps: SessionDeps, game_id: Uuid) -> StorageResult<Self> {
        let record = deps.api.get(game_id).await?;
        let display = display::decode(&record.display_state);
        let mut board = Scoreboard::new(
            record.mode,
            deps.rules.clone(),
            record.state.clone(),
            display,
        );
        let last_bundle = bundle_of(&board);
        let restored = board.restore(now_millis());

        let (clock_tx, clock_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let clocks = ClockSet::new(
            board.state.game_clock_seconds,
            board.state.play_clock_seconds,
            board
                .display
                .timeout_clock_seconds
                .unwrap_or(deps.rules.timeout_seconds),
            board.display.stopwatch_seconds,
            clock_tx,
        );
        let remote = deps.hub.subscribe(&record.share_code);

        let mut inner = Inner {
            game_id,
            share_code: record.share_code.clone(),
            home_team: record.home_team,
            away_team: record.away_team,
            board,
            clocks,
            reconciler: Reconciler::controller(deps.rules.quarantine()),
            sync: Some(SyncHandle::spawn(
                deps.api.clone(),
                game_id,
                deps.rules.debounce(),
            )),
            records: deps.records,
            celebrations: HashMap::new(),
            timers: timer_tx,
            heartbeat_secs: deps.rules.heartbeat_secs.max(1),
            last_bundle,
            game_running_seen: false,
            time_dirty: false,
        };
        if let Outcome::Ignored(reason) = inner.execute(restored) {
            warn!(game_id = %game_id, reason, "game clock could not be resumed");
        }

        let inner = Arc::new(Mutex::new(inner));
        let pump = tokio::spawn(pump(Arc::clone(&inner), clock_rx, timer_rx, remote));
        info!(game_id = %game_id, share_code = %record.share_code, "controller session opened");

        Ok(Self {
            game_id,
            share_code: record.share_code,
            inner,
            pump,
        })
    }

    /// Game this session controls.
    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// Share code of the game.
    pub fn share_code(&self) -> &str {
        &self.share_code
    }

    /// Run one scoreboard operation and carry out its effects.
    pub async fn apply<F>(&self, operation: F) -> Outcome
    where
        F: FnOnce(&mut Scoreboard) -> Transition,
    {
        let mut inner = self.inner.lock().await;
        if inner.sync.is_none() {
            return Outcome::Ignored("session closed");
        }
        inner.mirror_clocks();
        let transition = operation(&mut inner.board);
        inner.execute(transition)
    }

    /// Current scoreboard.
    pub async fn snapshot(&self) -> Snapshot {
        let mut inner = self.inner.lock().await;
        inner.mirror_clocks();
        inner.snapshot()
    }

    /// Stop every clock and timer, then flush the pending write.
    ///
    /// The persisted running flag and checkpoint are left as they are so that the
    /// next session resumes the game clock.
    pub async fn shutdown(&self) {
        self.pump.abort();
        let sync = self.inner.lock().await.close();
        if let Some(sync) = sync {
            sync.shutdown().await;
            info!(game_id = %self.game_id, "controller session closed");
        }
    }
}

impl Drop for ControllerSession {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn pump(
    inner: Arc<Mutex<Inner>>,
    mut clocks: mpsc::UnboundedReceiver<ClockEvent>,
    mut timers: mpsc::UnboundedReceiver<CelebrationTimer>,
    mut remote: broadcast::Receiver<RealtimeMessage>,
) {
    let mut remote_open = true;
    loop {
        tokio::select! {
            Some(event) = clocks.recv() => inner.lock().await.on_clock_event(event),
            Some(timer) = timers.recv() => inner.lock().await.on_celebration_timer(timer),
            message = remote.recv(), if remote_open => match message {
                Ok(RealtimeMessage::GameUpdate(patch)) => inner.lock().await.on_remote_update(patch),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "controller lagged behind realtime updates");
                }
                Err(RecvError::Closed) => remote_open = false,
            },
            else => break,
        }
    }
}

struct Inner {
    game_id: Uuid,
    share_code: String,
    home_team: TeamInfo,
    away_team: TeamInfo,
    board: Scoreboard,
    clocks: ClockSet,
    reconciler: Reconciler,
    sync: Option<SyncHandle>,
    records: Arc<dyn RecordsSink>,
    celebrations: HashMap<Uuid, JoinHandle<()>>,
    timers: mpsc::UnboundedSender<CelebrationTimer>,
    heartbeat_secs: u32,
    /// Last debounced bundle handed to the writer or received from the channel.
    last_bundle: Option<GamePatch>,
    /// Game clock running state the persisted time fields reflect.
    game_running_seen: bool,
    time_dirty: bool,
}

impl Inner {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            game_id: self.game_id,
            share_code: self.share_code.clone(),
            mode: self.board.mode(),
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            state: self.board.state.clone(),
            display: self.board.display.clone(),
        }
    }

    fn mirror_clocks(&mut self) {
        for id in [ClockId::Game, ClockId::Play, ClockId::Stopwatch] {
            self.board.on_tick(id, self.clocks.get(id).value());
        }
        if self.board.display.timeout_team.is_some() {
            self.board
                .on_tick(ClockId::Timeout, self.clocks.timeout.value());
        }
    }

    fn execute(&mut self, transition: Transition) -> Outcome {
        for effect in transition.effects {
            match effect {
                Effect::StartClock(id) => {
                    let halt_at = match id {
                        ClockId::Game => self.board.game_clock_halt_mark(),
                        _ => None,
                    };
                    if !self.clocks.get_mut(id).start(halt_at) {
                        debug!(game_id = %self.game_id, clock = ?id, "clock did not start");
                    }
                }
                Effect::StopClock(id) => {
                    self.clocks.get_mut(id).stop();
                    if id != ClockId::Timeout || self.board.display.timeout_team.is_some() {
                        self.board.on_tick(id, self.clocks.get(id).value());
                    }
                }
                Effect::SetClock(id, seconds) => {
                    let value = self.clocks.get_mut(id).set(seconds);
                    self.board.on_tick(id, value);
                    match id {
                        ClockId::Game => {
                            if self.clocks.game.is_running() {
                                self.rerun_game_clock(value);
                            }
                            self.time_dirty = true;
                        }
                        ClockId::Play => self.time_dirty = true,
                        ClockId::Timeout | ClockId::Stopwatch => {}
                    }
                }
                Effect::CommitScore(id) => self.arm_celebration(CelebrationTimer::Commit(id)),
                Effect::ExpireCelebration(id) => {
                    self.arm_celebration(CelebrationTimer::Expire(id))
                }
                Effect::ReportFinal(result) => self.report_final(result),
            }
        }
        self.settle();
        transition.outcome
    }

    /// A running game clock was moved to `value`: the warning is raised at once if
    /// it is now due, otherwise the run restarts against a fresh halt mark.
    fn rerun_game_clock(&mut self, value: u32) {
        if self.board.two_minute_warning_due(value) {
            self.raise_two_minute_warning();
            return;
        }
        self.clocks.game.stop();
        let halt_at = self.board.game_clock_halt_mark();
        self.clocks.game.start(halt_at);
        self.board.record_game_clock_run(true, now_millis());
    }

    fn raise_two_minute_warning(&mut self) {
        self.clocks.game.stop();
        self.board.on_tick(ClockId::Game, self.clocks.game.value());
        let transition = self.board.on_two_minute_warning();
        self.execute(transition);
    }

    /// Persist what the last change left behind: time fields when the game clock
    /// started, stopped or was moved, and the debounced bundle when it differs.
    fn settle(&mut self) {
        let running = self.clocks.game.is_running();
        if running != self.game_running_seen {
            self.game_running_seen = running;
            if !running {
                self.reconciler.note_local_stop(Instant::now());
            }
            self.board.record_game_clock_run(running, now_millis());
            self.time_dirty = true;
        }
        if std::mem::take(&mut self.time_dirty) {
            self.write_time_fields();
        }
        self.schedule_bundle();
    }

    fn write_time_fields(&self) {
        if let Some(sync) = &self.sync {
            sync.write_now(GamePatch::time_fields(&self.board.state));
        }
    }

    fn schedule_bundle(&mut self) {
        let Some(bundle) = bundle_of(&self.board) else {
            return;
        };
        if self.last_bundle.as_ref() == Some(&bundle) {
            return;
        }
        if let Some(sync) = &self.sync {
            sync.sync_state(bundle.clone());
        }
        self.last_bundle = Some(bundle);
    }

    fn arm_celebration(&mut self, timer: CelebrationTimer) {
        let (CelebrationTimer::Commit(id) | CelebrationTimer::Expire(id)) = timer;
        let delay = self.board.celebration_delay_left(id, now_millis());
        let timers = self.timers.clone();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            let _ = timers.send(timer);
        });
        if let Some(previous) = self.celebrations.insert(id, handle) {
            previous.abort();
        }
    }

    fn report_final(&self, result: FinalResult) {
        let report = FinalReport {
            game_id: self.game_id,
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            result,
        };
        let sink = Arc::clone(&self.records);
        tokio::spawn(async move {
            let game_id = report.game_id;
            if let Err(err) = sink.report(report).await {
                warn!(game_id = %game_id, error = %err, "failed to report final result");
            }
        });
    }

    fn is_current(&self, clock: ClockId, generation: u64) -> bool {
        self.clocks.get(clock).generation() == generation
    }

    fn on_clock_event(&mut self, event: ClockEvent) {
        match event {
            ClockEvent::Tick {
                clock,
                generation,
                value,
            } => {
                if !self.is_current(clock, generation) {
                    return;
                }
                if clock == ClockId::Timeout && self.board.display.timeout_team.is_none() {
                    return;
                }
                self.board.on_tick(clock, value);
                if clock == ClockId::Game && self.board.two_minute_warning_due(value) {
                    self.raise_two_minute_warning();
                    return;
                }
                self.heartbeat(clock, value);
            }
            ClockEvent::Halted {
                clock, generation, ..
            } => {
                if !self.is_current(clock, generation) {
                    return;
                }
                if clock == ClockId::Game {
                    let transition = self.board.on_two_minute_warning();
                    self.execute(transition);
                } else {
                    self.settle();
                }
            }
            ClockEvent::Expired { clock, generation } => {
                if !self.is_current(clock, generation) {
                    return;
                }
                match clock {
                    ClockId::Game if self.clocks.game.value() == 0 => {
                        let transition = self.board.on_game_clock_expired();
                        self.execute(transition);
                    }
                    ClockId::Timeout => {
                        let transition = self.board.end_timeout();
                        self.execute(transition);
                    }
                    _ => self.settle(),
                }
            }
        }
    }

    fn heartbeat(&mut self, clock: ClockId, value: u32) {
        let every = self.heartbeat_secs;
        match clock {
            ClockId::Game => {
                let elapsed = self
                    .board
                    .state
                    .started_at_seconds
                    .map(|start| start.saturating_sub(value));
                if elapsed.is_some_and(|elapsed| elapsed > 0 && elapsed % every == 0) {
                    self.write_time_fields();
                }
            }
            ClockId::Timeout | ClockId::Stopwatch if value % every == 0 => self.schedule_bundle(),
            _ => {}
        }
    }

    fn on_celebration_timer(&mut self, timer: CelebrationTimer) {
        let transition = match timer {
            CelebrationTimer::Commit(id) => {
                self.celebrations.remove(&id);
                self.board.commit_score(id)
            }
            CelebrationTimer::Expire(id) => {
                self.celebrations.remove(&id);
                self.board.expire_celebration(id)
            }
        };
        self.execute(transition);
    }

    fn on_remote_update(&mut self, patch: GamePatch) {
        let patch = self.reconciler.reconcile(patch, Instant::now());
        if patch.is_empty() {
            return;
        }
        patch.apply_to(&mut self.board.state);
        if let Some(team) = patch.home_team {
            self.home_team = team;
        }
        if let Some(team) = patch.away_team {
            self.away_team = team;
        }
        self.last_bundle = bundle_of(&self.board);
    }

    fn close(&mut self) -> Option<SyncHandle> {
        self.clocks.stop_all();
        for (_, handle) in self.celebrations.drain() {
            handle.abort();
        }
        self.sync.take()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for handle in self.celebrations.values() {
            handle.abort();
        }
    }
}

fn bundle_of(board: &Scoreboard) -> Option<GamePatch> {
    match display::encode(&board.display) {
        Ok(raw) => Some(GamePatch::bundle(&board.state, raw)),
        Err(err) => {
            warn!(error = %err, "failed to encode display state");
            None
        }
    }
}
