//! Countdown and count-up clocks driven by self-rescheduling ticks.

pub mod resume;
mod timer;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use utoipa::ToSchema;

use crate::state::game::{MAX_GAME_CLOCK_SECONDS, MAX_PLAY_CLOCK_SECONDS};

pub use self::resume::{Checkpoint, Resume, resume};
pub use self::timer::{ClockTimer, Direction};

/// Interval between two ticks of any clock.
pub const TICK_PERIOD: std::time::Duration = std::time::Duration::from_secs(1);

/// Identifies one of the session clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClockId {
    /// Game clock, counting down the period.
    Game,
    /// Play clock.
    Play,
    /// Timeout clock, active while the timeout overlay is up.
    Timeout,
    /// Count-up timer of the simple game mode.
    Stopwatch,
}

/// Notifications emitted by running clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// One second elapsed.
    Tick {
        /// Clock that ticked.
        clock: ClockId,
        /// Run the tick belongs to.
        generation: u64,
        /// Value after the tick.
        value: u32,
    },
    /// The clock stopped itself at its halt mark.
    Halted {
        /// Clock that halted.
        clock: ClockId,
        /// Run the halt belongs to.
        generation: u64,
        /// Value at which it halted.
        value: u32,
    },
    /// A countdown reached zero and stopped.
    Expired {
        /// Clock that expired.
        clock: ClockId,
        /// Run the expiry belongs to.
        generation: u64,
    },
}

/// The four clocks owned by a controller session.
pub struct ClockSet {
    /// Game clock.
    pub game: ClockTimer,
    /// Play clock.
    pub play: ClockTimer,
    /// Timeout clock.
    pub timeout: ClockTimer,
    /// Simple-mode stopwatch.
    pub stopwatch: ClockTimer,
}

impl ClockSet {
    /// Build the clocks with their initial values; all of them start stopped.
    pub fn new(
        game_seconds: u32,
        play_seconds: u32,
        timeout_seconds: u32,
        stopwatch_seconds: u32,
        events: mpsc::UnboundedSender<ClockEvent>,
    ) -> Self {
        Self {
            game: ClockTimer::countdown(
                ClockId::Game,
                game_seconds,
                MAX_GAME_CLOCK_SECONDS,
                events.clone(),
            ),
            play: ClockTimer::countdown(
                ClockId::Play,
                play_seconds,
                MAX_PLAY_CLOCK_SECONDS,
                events.clone(),
            ),
            timeout: ClockTimer::countdown(ClockId::Timeout, timeout_seconds, u32::MAX, events.clone()),
            stopwatch: ClockTimer::count_up(ClockId::Stopwatch, stopwatch_seconds, events),
        }
    }

    /// Borrow one clock.
    pub fn get(&self, id: ClockId) -> &ClockTimer {
        match id {
            ClockId::Game => &self.game,
            ClockId::Play => &self.play,
            ClockId::Timeout => &self.timeout,
            ClockId::Stopwatch => &self.stopwatch,
        }
    }

    /// Mutably borrow one clock.
    pub fn get_mut(&mut self, id: ClockId) -> &mut ClockTimer {
        match id {
            ClockId::Game => &mut self.game,
            ClockId::Play => &mut self.play,
            ClockId::Timeout => &mut self.timeout,
            ClockId::Stopwatch => &mut self.stopwatch,
        }
    }

    /// Stop every clock and cancel their pending ticks.
    pub fn stop_all(&mut self) {
        self.game.stop();
        self.play.stop();
        self.timeout.stop();
        self.stopwatch.stop();
    }
}

/// Current wall clock in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
