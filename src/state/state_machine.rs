use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    clock::{Checkpoint, ClockId, Resume, resume},
    config::EngineConfig,
    display::DisplayState,
    state::{
        game::{
            Distance, GameMode, GameState, MAX_GAME_CLOCK_SECONDS, MAX_PLAY_CLOCK_SECONDS, Quarter,
            Side, format_clock,
        },
        overlays::{
            CelebrationKind, FlagStage, PenaltyRecord, ReviewResult, ScoreCelebration,
            ScoringPhase, TurnoverBanner, TurnoverKind, VisibilityToggle,
        },
        penalty::{DownAndDistance, PenaltyCall, enforce},
    },
};

/// Game clock value at which the two-minute warning fires.
pub const TWO_MINUTE_MARK: u32 = 120;

/// Whether an operation changed the scoreboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation was applied.
    Applied,
    /// The operation is not legal right now and was dropped.
    Ignored(&'static str),
}

/// Side effect the owning session has to carry out after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start one clock.
    StartClock(ClockId),
    /// Stop one clock.
    StopClock(ClockId),
    /// Overwrite one clock's value.
    SetClock(ClockId, u32),
    /// Commit the deferred score of this celebration once the delay elapsed.
    CommitScore(Uuid),
    /// Take this cosmetic celebration down once the delay elapsed.
    ExpireCelebration(Uuid),
    /// The game just went final.
    ReportFinal(FinalResult),
}

/// Result of an operation: what happened and what the session must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Whether anything changed.
    pub outcome: Outcome,
    /// Side effects to execute, in order.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn applied(effects: Vec<Effect>) -> Self {
        Self {
            outcome: Outcome::Applied,
            effects,
        }
    }

    fn done() -> Self {
        Self::applied(Vec::new())
    }

    fn ignored(reason: &'static str) -> Self {
        debug!(reason, "operation ignored");
        Self {
            outcome: Outcome::Ignored(reason),
            effects: Vec::new(),
        }
    }

    /// Whether the operation was applied.
    pub fn is_applied(&self) -> bool {
        self.outcome == Outcome::Applied
    }
}

/// Final score handed to the records services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FinalResult {
    /// Home score.
    pub score_home: u32,
    /// Away score.
    pub score_away: u32,
    /// Winner, `None` for a tie.
    pub winner: Option<Side>,
    /// Last period played.
    #[schema(value_type = String)]
    pub last_period: Quarter,
}

/// Conversion attempt after a touchdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtraPoint {
    /// Kick through the uprights.
    KickGood,
    /// Kick missed or blocked.
    KickMissed,
    /// Two-point conversion successful.
    TwoPointGood,
    /// Two-point conversion failed.
    TwoPointFailed,
    /// No attempt.
    Skip,
    /// Put the try under review before deciding.
    Review,
}

/// How a kickoff ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum KickoffOutcome {
    /// Returned by the receiving team.
    Return,
    /// Touchback.
    Touchback,
    /// Onside kick recovered by the kicking team.
    OnsideRecovered,
}

/// How a score of some number of points is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreKind {
    Touchdown,
    FieldGoal,
    Safety,
    Adjustment,
}

impl ScoreKind {
    fn classify(points: i32) -> Self {
        match points {
            6..=8 => ScoreKind::Touchdown,
            3 => ScoreKind::FieldGoal,
            2 => ScoreKind::Safety,
            _ => ScoreKind::Adjustment,
        }
    }
}

/// Live scoreboard of one game and the flow rules that govern it.
///
/// Operations never fail: an illegal request comes back as [`Outcome::Ignored`] with
/// the scoreboard untouched. Clock values are mirrored here by the owning session,
/// which also executes the returned [`Effect`]s.
#[derive(Debug, Clone)]
pub struct Scoreboard {
    mode: GameMode,
    rules: EngineConfig,
    /// Persisted core fields.
    pub state: GameState,
    /// Persisted overlay bag.
    pub display: DisplayState,
}

impl Scoreboard {
    /// Wrap a loaded game.
    pub fn new(mode: GameMode, rules: EngineConfig, state: GameState, display: DisplayState) -> Self {
        Self {
            mode,
            rules,
            state,
            display,
        }
    }

    /// Rule set in effect.
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Current value of one clock.
    pub fn clock_value(&self, clock: ClockId) -> u32 {
        match clock {
            ClockId::Game => self.state.game_clock_seconds,
            ClockId::Play => self.state.play_clock_seconds,
            ClockId::Timeout => self.display.timeout_clock_seconds.unwrap_or(0),
            ClockId::Stopwatch => self.display.stopwatch_seconds,
        }
    }

    /// Value at which a starting game clock must halt by itself, if any.
    pub fn game_clock_halt_mark(&self) -> Option<u32> {
        (self.state.quarter.has_two_minute_warning()
            && !self.display.two_minute_warning_issued
            && self.state.game_clock_seconds > TWO_MINUTE_MARK)
            .then_some(TWO_MINUTE_MARK)
    }

    /// Whether a running game clock showing `value` owes the two-minute warning.
    pub fn two_minute_warning_due(&self, value: u32) -> bool {
        self.state.quarter.has_two_minute_warning()
            && !self.display.two_minute_warning_issued
            && (1..=TWO_MINUTE_MARK).contains(&value)
    }

    fn full_mode(&self) -> bool {
        self.mode == GameMode::Full
    }

    fn clock_max(&self, clock: ClockId) -> u32 {
        match clock {
            ClockId::Game => MAX_GAME_CLOCK_SECONDS,
            ClockId::Play => MAX_PLAY_CLOCK_SECONDS,
            ClockId::Timeout => self.rules.timeout_seconds,
            ClockId::Stopwatch => u32::MAX,
        }
    }

    fn clock_allowed(&self, clock: ClockId) -> Result<(), &'static str> {
        match (self.mode, clock) {
            (GameMode::Simple, ClockId::Stopwatch) => Ok(()),
            (GameMode::Simple, _) => Err("only the stopwatch runs in simple mode"),
            (GameMode::Full, ClockId::Stopwatch) => Err("stopwatch only runs in simple mode"),
            (GameMode::Full, ClockId::Timeout) if self.display.timeout_team.is_none() => {
                Err("no timeout in progress")
            }
            (GameMode::Full, _) => Ok(()),
        }
    }

    fn period_length(&self, quarter: Quarter) -> u32 {
        let length = if quarter.is_overtime() {
            self.rules.overtime_seconds
        } else {
            self.rules.quarter_seconds
        };
        length.min(MAX_GAME_CLOCK_SECONDS)
    }

    fn write_clock(&mut self, clock: ClockId, value: u32) {
        match clock {
            ClockId::Game => self.state.game_clock_seconds = value,
            ClockId::Play => self.state.play_clock_seconds = value,
            ClockId::Timeout => self.display.timeout_clock_seconds = Some(value),
            ClockId::Stopwatch => self.display.stopwatch_seconds = value,
        }
    }

    // ---- clocks ----

    /// Start a clock.
    pub fn start_clock(&mut self, clock: ClockId) -> Transition {
        if let Err(reason) = self.clock_allowed(clock) {
            return Transition::ignored(reason);
        }
        if clock == ClockId::Game {
            if !self.state.quarter.is_period() {
                return Transition::ignored("no period in progress");
            }
            if self.display.end_of_period {
                return Transition::ignored("period has ended");
            }
            if self.state.timer_running {
                return Transition::ignored("game clock already running");
            }
            self.display.two_minute_warning = false;
        }
        if clock != ClockId::Stopwatch && self.clock_value(clock) == 0 {
            return Transition::ignored("clock at zero");
        }
        Transition::applied(vec![Effect::StartClock(clock)])
    }

    /// Stop a clock.
    pub fn stop_clock(&mut self, clock: ClockId) -> Transition {
        if let Err(reason) = self.clock_allowed(clock) {
            return Transition::ignored(reason);
        }
        if clock == ClockId::Game && !self.state.timer_running {
            return Transition::ignored("game clock not running");
        }
        Transition::applied(vec![Effect::StopClock(clock)])
    }

    /// Move a clock by `delta` seconds, clamped to its range.
    pub fn adjust_clock(&mut self, clock: ClockId, delta: i32) -> Transition {
        if let Err(reason) = self.clock_allowed(clock) {
            return Transition::ignored(reason);
        }
        let value = (i64::from(self.clock_value(clock)) + i64::from(delta))
            .clamp(0, i64::from(self.clock_max(clock))) as u32;
        self.write_clock(clock, value);
        Transition::applied(vec![Effect::SetClock(clock, value)])
    }

    /// Set a clock to `seconds`, or to its natural starting value.
    pub fn reset_clock(&mut self, clock: ClockId, seconds: Option<u32>) -> Transition {
        if let Err(reason) = self.clock_allowed(clock) {
            return Transition::ignored(reason);
        }
        let default = match clock {
            ClockId::Game => self.period_length(self.state.quarter),
            ClockId::Play => self.rules.play_clock_seconds,
            ClockId::Timeout => self.rules.timeout_seconds,
            ClockId::Stopwatch => 0,
        };
        let value = seconds.unwrap_or(default).min(self.clock_max(clock));
        self.write_clock(clock, value);
        Transition::applied(vec![Effect::SetClock(clock, value)])
    }

    /// Mirror a clock tick.
    pub fn on_tick(&mut self, clock: ClockId, value: u32) {
        self.write_clock(clock, value);
    }

    /// Record that the game clock started or stopped at `now_ms`.
    pub fn record_game_clock_run(&mut self, running: bool, now_ms: i64) {
        self.state.timer_running = running;
        if running {
            self.state.started_at_wall_clock = Some(now_ms);
            self.state.started_at_seconds = Some(self.state.game_clock_seconds);
        } else {
            self.state.clear_checkpoint();
        }
    }

    /// The game clock stopped itself at the two-minute mark.
    pub fn on_two_minute_warning(&mut self) -> Transition {
        if !self.state.quarter.has_two_minute_warning() || self.display.two_minute_warning_issued {
            return Transition::ignored("two-minute warning not due");
        }
        self.display.two_minute_warning = true;
        self.display.two_minute_warning_issued = true;
        Transition::applied(vec![Effect::StopClock(ClockId::Play)])
    }

    /// Dismiss the two-minute warning decision point.
    pub fn dismiss_two_minute_warning(&mut self) -> Transition {
        if !self.display.two_minute_warning {
            return Transition::ignored("no two-minute warning on screen");
        }
        self.display.two_minute_warning = false;
        Transition::done()
    }

    /// The game clock ran out.
    ///
    /// Q1 to Q3 end the period. Q4 and overtime finish the game unless the score is
    /// tied, in which case the flow pauses at end of period.
    pub fn on_game_clock_expired(&mut self) -> Transition {
        self.state.game_clock_seconds = 0;
        self.state.timer_running = false;
        self.state.clear_checkpoint();
        match self.state.quarter {
            Quarter::First | Quarter::Second | Quarter::Third => self.next_quarter(),
            Quarter::Fourth | Quarter::Overtime(_) if self.state.is_tied() => {
                self.display.end_of_period = true;
                Transition::applied(vec![Effect::StopClock(ClockId::Play)])
            }
            Quarter::Fourth | Quarter::Overtime(_) => self.next_quarter(),
            _ => Transition::ignored("game clock expired outside a period"),
        }
    }

    /// Rebuild clocks and timers for a game loaded from storage.
    ///
    /// A game clock persisted as running is resumed from its checkpoint, or stopped
    /// at zero (ending the period if it ran out while unloaded). Pending celebrations
    /// and a running timeout get their timers back.
    pub fn restore(&mut self, now_ms: i64) -> Transition {
        let mut effects = Vec::new();
        let mut outcome = Outcome::Applied;

        if self.state.timer_running {
            let checkpoint = Checkpoint::from_columns(
                self.state.started_at_wall_clock,
                self.state.started_at_seconds,
            );
            match resume(checkpoint, now_ms, self.rules.max_resume_elapsed_secs) {
                Resume::Running { remaining } => {
                    self.state.game_clock_seconds = remaining.min(MAX_GAME_CLOCK_SECONDS);
                    self.state.timer_running = false;
                    self.state.clear_checkpoint();
                    effects.push(Effect::SetClock(ClockId::Game, self.state.game_clock_seconds));
                    effects.push(Effect::StartClock(ClockId::Game));
                }
                Resume::Expired => {
                    effects.push(Effect::SetClock(ClockId::Game, 0));
                    let expired = self.on_game_clock_expired();
                    effects.extend(expired.effects);
                }
                Resume::Corrupt { reason } => {
                    warn!(reason, "discarding game clock checkpoint");
                    self.state.game_clock_seconds = 0;
                    self.state.timer_running = false;
                    self.state.clear_checkpoint();
                    effects.push(Effect::SetClock(ClockId::Game, 0));
                    outcome = Outcome::Ignored(reason);
                }
            }
        } else if self.state.started_at_wall_clock.is_some() || self.state.started_at_seconds.is_some()
        {
            self.state.clear_checkpoint();
        }

        if let Some(celebration) = &self.display.celebration {
            effects.push(if celebration.deferred {
                Effect::CommitScore(celebration.id)
            } else {
                Effect::ExpireCelebration(celebration.id)
            });
        }

        if self.full_mode() && self.display.timeout_team.is_some() {
            match self.display.timeout_clock_seconds {
                Some(seconds) if seconds > 0 => {
                    effects.push(Effect::SetClock(ClockId::Timeout, seconds));
                    effects.push(Effect::StartClock(ClockId::Timeout));
                }
                _ => {
                    self.display.timeout_team = None;
                    self.display.timeout_clock_seconds = None;
                }
            }
        }

        Transition { outcome, effects }
    }

    // ---- periods ----

    /// Advance to the next period.
    pub fn next_quarter(&mut self) -> Transition {
        if !self.full_mode() {
            return Transition::ignored("simple mode has no periods");
        }
        let tied = self.state.is_tied();
        let next = match self.state.quarter {
            Quarter::Pregame => Quarter::First,
            Quarter::First => Quarter::Second,
            Quarter::Second => Quarter::Halftime,
            Quarter::Halftime => Quarter::Third,
            Quarter::Third => Quarter::Fourth,
            Quarter::Fourth if tied => Quarter::Overtime(1),
            Quarter::Overtime(n) if tied => Quarter::Overtime(n.saturating_add(1)),
            Quarter::Fourth | Quarter::Overtime(_) => Quarter::Final,
            Quarter::Final | Quarter::FinalTie => return Transition::ignored("game is over"),
        };
        self.enter(next)
    }

    /// Step back one period, undoing a premature advance.
    pub fn previous_quarter(&mut self) -> Transition {
        if !self.full_mode() {
            return Transition::ignored("simple mode has no periods");
        }
        let previous = match self.state.quarter {
            Quarter::Pregame => return Transition::ignored("already at pregame"),
            Quarter::First => Quarter::Pregame,
            Quarter::Second => Quarter::First,
            Quarter::Halftime => Quarter::Second,
            Quarter::Third => Quarter::Halftime,
            Quarter::Fourth => Quarter::Third,
            Quarter::Overtime(1) => Quarter::Fourth,
            Quarter::Overtime(n) => Quarter::Overtime(n - 1),
            Quarter::Final | Quarter::FinalTie => {
                self.display.last_period.take().unwrap_or(Quarter::Fourth)
            }
        };
        if self.state.quarter.is_final() {
            self.display.final_reported = false;
        }
        self.state.quarter = previous;
        self.display.end_of_period = false;
        self.display.two_minute_warning = false;
        Transition::applied(vec![
            Effect::StopClock(ClockId::Game),
            Effect::StopClock(ClockId::Play),
        ])
    }

    /// Finish a game tied at the end of Q4 or an overtime period.
    pub fn declare_tie(&mut self) -> Transition {
        if !self.full_mode() {
            return Transition::ignored("simple mode has no periods");
        }
        let eligible = matches!(self.state.quarter, Quarter::Fourth | Quarter::Overtime(_));
        if !eligible || !self.display.end_of_period || !self.state.is_tied() {
            return Transition::ignored("no tied period has ended");
        }
        self.enter(Quarter::FinalTie)
    }

    fn enter(&mut self, next: Quarter) -> Transition {
        let from = self.state.quarter;
        let mut effects = vec![
            Effect::StopClock(ClockId::Game),
            Effect::StopClock(ClockId::Play),
        ];
        self.state.quarter = next;
        self.display.end_of_period = false;
        self.display.two_minute_warning = false;
        self.display.two_minute_warning_issued = false;

        match next {
            Quarter::First => self.state.reset_timeouts(self.rules.regulation_timeouts),
            Quarter::Third => self.state.reset_timeouts(self.rules.regulation_timeouts),
            Quarter::Overtime(_) => self.state.reset_timeouts(self.rules.overtime_timeouts),
            _ => {}
        }

        if next.is_final() {
            self.display.last_period = Some(from);
            if !self.display.final_reported {
                self.display.final_reported = true;
                effects.push(Effect::ReportFinal(FinalResult {
                    score_home: self.state.score_home,
                    score_away: self.state.score_away,
                    winner: self.winner(),
                    last_period: from,
                }));
            }
        } else {
            let length = self.period_length(next);
            self.state.game_clock_seconds = length;
            self.state.play_clock_seconds = self.rules.play_clock_seconds.min(MAX_PLAY_CLOCK_SECONDS);
            effects.push(Effect::SetClock(ClockId::Game, length));
            effects.push(Effect::SetClock(ClockId::Play, self.state.play_clock_seconds));
        }
        Transition::applied(effects)
    }

    fn winner(&self) -> Option<Side> {
        match self.state.score_home.cmp(&self.state.score_away) {
            std::cmp::Ordering::Greater => Some(Side::Home),
            std::cmp::Ordering::Less => Some(Side::Away),
            std::cmp::Ordering::Equal => None,
        }
    }

    // ---- scoring ----

    /// Award `points` to `team`.
    ///
    /// In the full game, touchdowns (6 to 8) and field goals (3) are held behind a
    /// celebration and committed later through [`Scoreboard::commit_score`]; a safety
    /// (2) commits at once with a cosmetic celebration. Anything else is a plain
    /// adjustment.
    pub fn score(&mut self, team: Side, points: i32, meta: Option<String>) -> Transition {
        let kind = if self.full_mode() {
            ScoreKind::classify(points)
        } else {
            ScoreKind::Adjustment
        };
        if kind == ScoreKind::Adjustment {
            self.state.add_score(team, points);
            return Transition::done();
        }
        if !self.state.quarter.is_period() {
            return Transition::ignored("no period in progress");
        }
        if self
            .display
            .celebration
            .as_ref()
            .is_some_and(|celebration| celebration.deferred)
        {
            return Transition::ignored("a score is already being celebrated");
        }

        let id = Uuid::new_v4();
        let mut effects = vec![
            Effect::StopClock(ClockId::Game),
            Effect::StopClock(ClockId::Play),
        ];
        self.display.turnover = None;
        let points = points as u8;
        match kind {
            ScoreKind::Touchdown | ScoreKind::FieldGoal => {
                let celebration_kind = if kind == ScoreKind::Touchdown {
                    CelebrationKind::Touchdown
                } else {
                    CelebrationKind::FieldGoal
                };
                self.display.celebration = Some(ScoreCelebration {
                    id,
                    kind: celebration_kind,
                    team,
                    points,
                    meta,
                    deferred: true,
                    shown_at: None,
                });
                effects.push(Effect::CommitScore(id));
            }
            ScoreKind::Safety => {
                self.state.add_score(team, i32::from(points));
                self.display.celebration = Some(ScoreCelebration {
                    id,
                    kind: CelebrationKind::Safety,
                    team,
                    points,
                    meta,
                    deferred: false,
                    shown_at: None,
                });
                self.display.scoring = ScoringPhase::PendingKickoff {
                    kicking: team.opponent(),
                };
                effects.push(Effect::ExpireCelebration(id));
            }
            ScoreKind::Adjustment => {}
        }
        Transition::applied(effects)
    }

    /// Commit the score held by celebration `id`. Committing twice is a no-op.
    pub fn commit_score(&mut self, id: Uuid) -> Transition {
        let Some(celebration) = self
            .display
            .celebration
            .take_if(|celebration| celebration.id == id && celebration.deferred)
        else {
            return Transition::ignored("no pending celebration with this id");
        };
        self.state.add_score(celebration.team, i32::from(celebration.points));
        self.display.scoring = match (celebration.kind, celebration.points) {
            (CelebrationKind::Touchdown, 6) => ScoringPhase::PendingExtraPoint {
                team: celebration.team,
            },
            _ => ScoringPhase::PendingKickoff {
                kicking: celebration.team,
            },
        };
        Transition::done()
    }

    /// Time left before celebration `id` ends, stamping it as shown at `now_ms` the
    /// first time it is asked for.
    pub fn celebration_delay_left(&mut self, id: Uuid, now_ms: i64) -> Duration {
        let delay = self.rules.celebration_delay();
        let Some(celebration) = self
            .display
            .celebration
            .as_mut()
            .filter(|celebration| celebration.id == id)
        else {
            return delay;
        };
        let shown_at = *celebration.shown_at.get_or_insert(now_ms);
        let elapsed = u64::try_from(now_ms.saturating_sub(shown_at)).unwrap_or(0);
        delay.saturating_sub(Duration::from_millis(elapsed))
    }

    /// Take down cosmetic celebration `id`.
    pub fn expire_celebration(&mut self, id: Uuid) -> Transition {
        match self
            .display
            .celebration
            .take_if(|celebration| celebration.id == id && !celebration.deferred)
        {
            Some(_) => Transition::done(),
            None => Transition::ignored("no cosmetic celebration with this id"),
        }
    }

    /// Resolve the try after a touchdown.
    pub fn extra_point(&mut self, attempt: ExtraPoint) -> Transition {
        let ScoringPhase::PendingExtraPoint { team } = self.display.scoring else {
            return Transition::ignored("no extra point pending");
        };
        let mut effects = Vec::new();
        match attempt {
            ExtraPoint::Review => {
                if self.display.overlay_open() {
                    return Transition::ignored("another overlay is open");
                }
                self.display
                    .review
                    .open(Some("Extra point".to_string()), None);
                return Transition::done();
            }
            ExtraPoint::KickGood => self.state.add_score(team, 1),
            ExtraPoint::TwoPointGood => {
                self.state.add_score(team, 2);
                let id = Uuid::new_v4();
                self.display.celebration = Some(ScoreCelebration {
                    id,
                    kind: CelebrationKind::TwoPoint,
                    team,
                    points: 2,
                    meta: None,
                    deferred: false,
                    shown_at: None,
                });
                effects.push(Effect::ExpireCelebration(id));
            }
            ExtraPoint::KickMissed | ExtraPoint::TwoPointFailed | ExtraPoint::Skip => {}
        }
        self.display.scoring = ScoringPhase::PendingKickoff { kicking: team };
        Transition::applied(effects)
    }

    /// Record a kickoff. `kicking` defaults to the team the scoring sequence expects.
    pub fn kickoff(&mut self, kicking: Option<Side>, outcome: KickoffOutcome) -> Transition {
        if !self.full_mode() {
            return Transition::ignored("simple mode has no possession");
        }
        let expected = match self.display.scoring {
            ScoringPhase::PendingKickoff { kicking } => Some(kicking),
            ScoringPhase::PendingExtraPoint { .. } => {
                return Transition::ignored("extra point still pending");
            }
            ScoringPhase::Idle => None,
        };
        let Some(kicking) = kicking.or(expected) else {
            return Transition::ignored("kicking team unknown");
        };
        let receiving = match outcome {
            KickoffOutcome::OnsideRecovered => kicking,
            KickoffOutcome::Return | KickoffOutcome::Touchback => kicking.opponent(),
        };
        self.display.scoring = ScoringPhase::Idle;
        self.change_possession(Some(receiving));
        Transition::done()
    }

    /// Possession changed hands by turnover, on downs or by punt.
    pub fn turnover(&mut self, kind: TurnoverKind, gaining: Option<Side>) -> Transition {
        if !self.full_mode() {
            return Transition::ignored("simple mode has no possession");
        }
        let Some(team) = gaining.or(self.state.possession.map(Side::opponent)) else {
            return Transition::ignored("gaining team unknown");
        };
        self.display.turnover = Some(TurnoverBanner { kind, team });
        self.change_possession(Some(team));
        Transition::done()
    }

    /// Take the turnover banner down.
    pub fn dismiss_turnover(&mut self) -> Transition {
        match self.display.turnover.take() {
            Some(_) => Transition::done(),
            None => Transition::ignored("no turnover banner"),
        }
    }

    // ---- down, distance, possession ----

    /// Set possession directly.
    pub fn set_possession(&mut self, team: Option<Side>) -> Transition {
        if !self.full_mode() {
            return Transition::ignored("simple mode has no possession");
        }
        if self.state.possession == team {
            return Transition::ignored("possession unchanged");
        }
        self.change_possession(team);
        Transition::done()
    }

    fn change_possession(&mut self, team: Option<Side>) {
        let changed = self.state.possession != team;
        self.state.possession = team;
        if changed && team.is_some() && !self.display.flag.is_enforcing() {
            self.state.down = DownAndDistance::FIRST_AND_TEN.down;
            self.state.distance = DownAndDistance::FIRST_AND_TEN.distance;
        }
    }

    /// Set the down.
    pub fn set_down(&mut self, down: u8) -> Transition {
        if !self.full_mode() {
            return Transition::ignored("simple mode has no downs");
        }
        if !(1..=4).contains(&down) {
            return Transition::ignored("down out of range");
        }
        self.state.down = down;
        Transition::done()
    }

    /// Set the distance.
    pub fn set_distance(&mut self, distance: Distance) -> Transition {
        if !self.full_mode() {
            return Transition::ignored("simple mode has no downs");
        }
        if matches!(distance, Distance::Yards(0)) {
            return Transition::ignored("distance must be positive");
        }
        self.state.distance = distance;
        Transition::done()
    }

    // ---- timeouts ----

    /// Charge `team` a timeout and run the timeout clock.
    pub fn call_timeout(&mut self, team: Side) -> Transition {
        if !self.full_mode() {
            return Transition::ignored("simple mode has no timeouts");
        }
        if !self.state.quarter.is_period() {
            return Transition::ignored("no period in progress");
        }
        if self.display.timeout_team.is_some() {
            return Transition::ignored("timeout already in progress");
        }
        let left = self.state.timeouts_mut(team);
        if *left == 0 {
            return Transition::ignored("no timeouts left");
        }
        *left -= 1;
        let seconds = self.rules.timeout_seconds;
        self.display.timeout_team = Some(team);
        self.display.timeout_clock_seconds = Some(seconds);
        Transition::applied(vec![
            Effect::StopClock(ClockId::Game),
            Effect::StopClock(ClockId::Play),
            Effect::SetClock(ClockId::Timeout, seconds),
            Effect::StartClock(ClockId::Timeout),
        ])
    }

    /// End the timeout overlay, by operator action or because its clock ran out.
    pub fn end_timeout(&mut self) -> Transition {
        if self.display.timeout_team.take().is_none() {
            return Transition::ignored("no timeout in progress");
        }
        self.display.timeout_clock_seconds = None;
        self.state.play_clock_seconds = self
            .rules
            .play_clock_reset_seconds
            .min(MAX_PLAY_CLOCK_SECONDS);
        Transition::applied(vec![
            Effect::StopClock(ClockId::Timeout),
            Effect::SetClock(ClockId::Play, self.state.play_clock_seconds),
        ])
    }

    // ---- penalty flag ----

    /// Throw a flag.
    pub fn throw_flag(&mut self) -> Transition {
        if !self.full_mode() {
            return Transition::ignored("simple mode has no overlays");
        }
        if self.display.overlay_open() {
            return Transition::ignored("another overlay is open");
        }
        self.display.flag.stage = FlagStage::Thrown;
        self.display.flag.penalties.clear();
        self.display.flag.pending.clear();
        Transition::done()
    }

    /// List the fouls on the thrown flag.
    pub fn flag_details(&mut self, calls: Vec<PenaltyCall>) -> Transition {
        if !self.display.flag.is_enforcing() {
            return Transition::ignored("no flag thrown");
        }
        if calls.is_empty() {
            return Transition::ignored("no fouls listed");
        }
        let quarter = self.state.quarter;
        let time = format_clock(self.state.game_clock_seconds);
        self.display.flag.penalties = calls
            .iter()
            .map(|call| PenaltyRecord {
                team: call.team,
                name: call.name.clone(),
                yards: call.yards,
                quarter,
                time: time.clone(),
            })
            .collect();
        self.display.flag.pending = calls;
        self.display.flag.stage = FlagStage::Details;
        Transition::done()
    }

    /// Enforce every listed foul and log it.
    pub fn apply_flag(&mut self) -> Transition {
        if self.display.flag.stage != FlagStage::Details {
            return Transition::ignored("no fouls to enforce");
        }
        let pending = std::mem::take(&mut self.display.flag.pending);
        let mut current = DownAndDistance {
            down: self.state.down,
            distance: self.state.distance,
        };
        for call in &pending {
            current = enforce(call, self.state.possession, current);
        }
        self.state.down = current.down;
        self.state.distance = current.distance;
        self.display
            .penalty_log
            .extend(self.display.flag.penalties.iter().cloned());
        self.display.flag.stage = FlagStage::Applied;
        Transition::done()
    }

    /// Take the flag down, enforced or not.
    pub fn clear_flag(&mut self) -> Transition {
        if !self.display.flag.is_open() {
            return Transition::ignored("no flag on screen");
        }
        self.display.flag = Default::default();
        Transition::done()
    }

    // ---- review and challenge ----

    /// Announce a replay review.
    pub fn open_review(&mut self, reason: Option<String>, call_on_field: Option<String>) -> Transition {
        if !self.full_mode() {
            return Transition::ignored("simple mode has no overlays");
        }
        if self.display.overlay_open() {
            return Transition::ignored("another overlay is open");
        }
        self.display.review.open(reason, call_on_field);
        Transition::applied(vec![Effect::StopClock(ClockId::Game)])
    }

    /// Rule on the review.
    pub fn resolve_review(&mut self, result: ReviewResult) -> Transition {
        if self.display.review.rule(result) {
            Transition::done()
        } else {
            Transition::ignored("no review awaiting a ruling")
        }
    }

    /// Take the review down.
    pub fn close_review(&mut self) -> Transition {
        if !self.display.review.is_open() {
            return Transition::ignored("no review on screen");
        }
        self.display.review = Default::default();
        Transition::done()
    }

    /// A coach challenges the call. The team must hold a timeout.
    pub fn open_challenge(
        &mut self,
        team: Side,
        reason: Option<String>,
        call_on_field: Option<String>,
    ) -> Transition {
        if !self.full_mode() {
            return Transition::ignored("simple mode has no overlays");
        }
        if self.display.overlay_open() {
            return Transition::ignored("another overlay is open");
        }
        if self.state.timeouts(team) == 0 {
            return Transition::ignored("challenge requires a timeout");
        }
        self.display.challenge.team = Some(team);
        self.display.challenge.review.open(reason, call_on_field);
        Transition::applied(vec![Effect::StopClock(ClockId::Game)])
    }

    /// Rule on the challenge; an upheld call costs the challenger a timeout.
    pub fn resolve_challenge(&mut self, result: ReviewResult) -> Transition {
        if !self.display.challenge.review.rule(result) {
            return Transition::ignored("no challenge awaiting a ruling");
        }
        if let (ReviewResult::Upheld, Some(team)) = (result, self.display.challenge.team) {
            let left = self.state.timeouts_mut(team);
            *left = left.saturating_sub(1);
        }
        Transition::done()
    }

    /// Take the challenge down.
    pub fn close_challenge(&mut self) -> Transition {
        if !self.display.challenge.is_open() {
            return Transition::ignored("no challenge on screen");
        }
        self.display.challenge = Default::default();
        Transition::done()
    }

    // ---- presentation ----

    /// Show or hide one scoreboard element.
    pub fn set_visibility(&mut self, toggle: VisibilityToggle, visible: bool) -> Transition {
        self.display.visibility.set(toggle, visible);
        Transition::done()
    }

    /// Bump a named quick-stat counter.
    pub fn record_stat(&mut self, name: &str, team: Side, delta: i32) -> Transition {
        let name = name.trim();
        if name.is_empty() {
            return Transition::ignored("stat name is empty");
        }
        self.display
            .quick_stats
            .entry(name.to_string())
            .or_default()
            .bump(team, delta);
        Transition::done()
    }
}
