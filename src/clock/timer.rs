use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
};
use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle, time::sleep};

use super::{ClockEvent, ClockId, TICK_PERIOD};

/// Which way a clock counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Counts toward zero and expires there.
    Down,
    /// Counts up without bound.
    Up,
}

/// State shared between a clock and its tick task.
#[derive(Debug)]
struct Shared {
    value: AtomicU32,
    running: AtomicBool,
    generation: AtomicU64,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }
}

/// A clock owning its tick task.
///
/// Each run is a task that sleeps one period, checks that its run is still current,
/// moves the value by one second and reschedules itself. Stopping flips the running
/// flag, bumps the run generation and aborts the task, so no tick lands after
/// `stop` returns. Dropping the clock aborts any pending tick.
#[derive(Debug)]
pub struct ClockTimer {
    id: ClockId,
    direction: Direction,
    max: u32,
    period: Duration,
    shared: Arc<Shared>,
    events: mpsc::UnboundedSender<ClockEvent>,
    task: Option<JoinHandle<()>>,
}

impl ClockTimer {
    /// A countdown clock clamped to `max`.
    pub fn countdown(
        id: ClockId,
        seconds: u32,
        max: u32,
        events: mpsc::UnboundedSender<ClockEvent>,
    ) -> Self {
        Self::build(id, Direction::Down, seconds.min(max), max, events)
    }

    /// A count-up clock.
    pub fn count_up(id: ClockId, seconds: u32, events: mpsc::UnboundedSender<ClockEvent>) -> Self {
        Self::build(id, Direction::Up, seconds, u32::MAX, events)
    }

    fn build(
        id: ClockId,
        direction: Direction,
        seconds: u32,
        max: u32,
        events: mpsc::UnboundedSender<ClockEvent>,
    ) -> Self {
        Self {
            id,
            direction,
            max,
            period: TICK_PERIOD,
            shared: Arc::new(Shared {
                value: AtomicU32::new(seconds),
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
            events,
            task: None,
        }
    }

    /// Which clock this is.
    pub fn id(&self) -> ClockId {
        self.id
    }

    /// Current value in seconds.
    pub fn value(&self) -> u32 {
        self.shared.value.load(Ordering::SeqCst)
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Identifier of the current (or last) run.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Start a run. A countdown stops by itself when it reaches `halt_at` (if above
    /// zero and below the current value) or zero.
    ///
    /// Returns `false` when already running or when a countdown is at zero.
    pub fn start(&mut self, halt_at: Option<u32>) -> bool {
        if self.is_running() {
            return false;
        }
        let value = self.value();
        if self.direction == Direction::Down && value == 0 {
            return false;
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.running.store(true, Ordering::SeqCst);
        let halt_at = match self.direction {
            Direction::Down => halt_at.filter(|mark| *mark > 0 && *mark < value),
            Direction::Up => None,
        };

        if let Some(previous) = self.task.take() {
            previous.abort();
        }
        self.task = Some(tokio::spawn(run(
            self.id,
            self.direction,
            self.period,
            Arc::clone(&self.shared),
            generation,
            halt_at,
            self.events.clone(),
        )));
        true
    }

    /// Stop the current run. Idempotent; returns whether a run was in progress.
    pub fn stop(&mut self) -> bool {
        let was_running = self.shared.running.swap(false, Ordering::SeqCst);
        if was_running {
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        was_running
    }

    /// Move the value by `delta` seconds, clamped to `[0, max]`. A running clock keeps
    /// running.
    pub fn adjust(&mut self, delta: i32) -> u32 {
        let next = (i64::from(self.value()) + i64::from(delta)).clamp(0, i64::from(self.max)) as u32;
        self.shared.value.store(next, Ordering::SeqCst);
        next
    }

    /// Overwrite the value, clamped to `max`. A running clock keeps running.
    pub fn set(&mut self, seconds: u32) -> u32 {
        let next = seconds.min(self.max);
        self.shared.value.store(next, Ordering::SeqCst);
        next
    }
}

impl Drop for ClockTimer {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    clock: ClockId,
    direction: Direction,
    period: Duration,
    shared: Arc<Shared>,
    generation: u64,
    halt_at: Option<u32>,
    events: mpsc::UnboundedSender<ClockEvent>,
) {
    loop {
        sleep(period).await;
        if !shared.is_current(generation) {
            return;
        }

        let step = |current: u32| match direction {
            Direction::Down => Some(current.saturating_sub(1)),
            Direction::Up => Some(current.saturating_add(1)),
        };
        let value = match shared
            .value
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, step)
        {
            Ok(previous) | Err(previous) => step(previous).unwrap_or(previous),
        };

        let _ = events.send(ClockEvent::Tick {
            clock,
            generation,
            value,
        });

        if direction == Direction::Down && value == 0 {
            shared.running.store(false, Ordering::SeqCst);
            let _ = events.send(ClockEvent::Expired { clock, generation });
            return;
        }
        if halt_at == Some(value) {
            shared.running.store(false, Ordering::SeqCst);
            let _ = events.send(ClockEvent::Halted {
                clock,
                generation,
                value,
            });
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ClockEvent>) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_once_per_second() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = ClockTimer::countdown(ClockId::Game, 900, 900, tx);
        assert!(clock.start(None));
        settle().await;
        assert_eq!(clock.value(), 900);

        for _ in 0..8 {
            advance(Duration::from_secs(1)).await;
            settle().await;
        }
        assert_eq!(clock.value(), 892);
        assert_eq!(drain(&mut rx).len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = ClockTimer::countdown(ClockId::Play, 40, 40, tx);
        clock.start(None);
        settle().await;
        advance(Duration::from_secs(3)).await;
        settle().await;
        assert!(clock.stop());
        assert!(!clock.stop());
        let frozen = clock.value();
        advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(clock.value(), frozen);
        drain(&mut rx);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_expires_at_zero() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = ClockTimer::countdown(ClockId::Timeout, 2, 60, tx);
        clock.start(None);
        settle().await;
        for _ in 0..3 {
            advance(Duration::from_secs(1)).await;
            settle().await;
        }
        assert_eq!(clock.value(), 0);
        assert!(!clock.is_running());
        let events = drain(&mut rx);
        assert!(matches!(
            events.last(),
            Some(ClockEvent::Expired {
                clock: ClockId::Timeout,
                ..
            })
        ));
        assert!(!clock.start(None));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_halts_at_mark() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = ClockTimer::countdown(ClockId::Game, 122, 900, tx);
        clock.start(Some(120));
        settle().await;
        for _ in 0..4 {
            advance(Duration::from_secs(1)).await;
            settle().await;
        }
        assert_eq!(clock.value(), 120);
        assert!(!clock.is_running());
        let generation = clock.generation();
        assert!(drain(&mut rx).contains(&ClockEvent::Halted {
            clock: ClockId::Game,
            generation,
            value: 120,
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn adjust_clamps_and_count_up_climbs() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut game = ClockTimer::countdown(ClockId::Game, 890, 900, tx.clone());
        assert_eq!(game.adjust(30), 900);
        assert_eq!(game.adjust(-1000), 0);

        let mut stopwatch = ClockTimer::count_up(ClockId::Stopwatch, 0, tx);
        stopwatch.start(None);
        settle().await;
        for _ in 0..3 {
            advance(Duration::from_secs(1)).await;
            settle().await;
        }
        assert_eq!(stopwatch.value(), 3);
        assert!(stopwatch.is_running());
    }
}
