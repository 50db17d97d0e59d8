use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    clock::ClockId,
    dto::game::ScoreboardView,
    state::{
        game::{Distance, Side},
        overlays::{ReviewResult, TurnoverKind, VisibilityToggle},
        penalty::PenaltyCall,
        state_machine::{ExtraPoint, KickoffOutcome, Outcome, Scoreboard, Transition},
    },
};

/// One operator action, tagged by `type`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerCommand {
    /// Start a clock.
    StartClock {
        /// Clock to start.
        clock: ClockId,
    },
    /// Stop a clock.
    StopClock {
        /// Clock to stop.
        clock: ClockId,
    },
    /// Nudge a clock by a signed number of seconds.
    AdjustClock {
        /// Clock to adjust.
        clock: ClockId,
        /// Seconds to add, negative to remove.
        delta: i32,
    },
    /// Reset a clock to its default or to an explicit value.
    ResetClock {
        /// Clock to reset.
        clock: ClockId,
        /// Explicit value.
        #[serde(default)]
        seconds: Option<u32>,
    },
    /// Add points to a team.
    Score {
        /// Scoring team.
        team: Side,
        /// Points, negative to correct a mistake.
        points: i32,
        /// Free-form description such as the scorer.
        #[serde(default)]
        meta: Option<String>,
    },
    /// Conversion attempt following a touchdown.
    ExtraPoint {
        /// How the try ended.
        attempt: ExtraPoint,
    },
    /// Kickoff result.
    Kickoff {
        /// Kicking team, defaulting to the one owed the kick.
        #[serde(default)]
        kicking: Option<Side>,
        /// How the kick ended.
        outcome: KickoffOutcome,
    },
    /// Advance to the next period.
    NextQuarter,
    /// Go back one period.
    PreviousQuarter,
    /// Finish a tied game as a tie.
    DeclareTie,
    /// Charge a timeout to a team.
    CallTimeout {
        /// Team calling it.
        team: Side,
    },
    /// End the running timeout.
    EndTimeout,
    /// Set the down.
    SetDown {
        /// 1 to 4.
        down: u8,
    },
    /// Set yards to go.
    SetDistance {
        /// Yardage, `inches` or `goal`.
        #[schema(value_type = String)]
        distance: Distance,
    },
    /// Give or clear possession.
    SetPossession {
        /// Team with the ball.
        #[serde(default)]
        team: Option<Side>,
    },
    /// Show a turnover banner.
    Turnover {
        /// How the ball changed hands.
        kind: TurnoverKind,
        /// Team gaining the ball, defaulting to the defense.
        #[serde(default)]
        gaining: Option<Side>,
    },
    /// Take the turnover banner down.
    DismissTurnover,
    /// A flag is on the field.
    ThrowFlag,
    /// Announce the fouls of the open flag.
    FlagDetails {
        /// Fouls called.
        calls: Vec<PenaltyCall>,
    },
    /// Enforce the announced fouls.
    ApplyFlag,
    /// Pick the flag up.
    ClearFlag,
    /// Open a replay review.
    OpenReview {
        /// Reason shown on screen.
        #[serde(default)]
        reason: Option<String>,
        /// Call under review.
        #[serde(default)]
        call_on_field: Option<String>,
    },
    /// Rule on the open review.
    ResolveReview {
        /// Ruling.
        result: ReviewResult,
    },
    /// Take the review down.
    CloseReview,
    /// A coach challenges the call.
    OpenChallenge {
        /// Challenging team.
        team: Side,
        /// Reason shown on screen.
        #[serde(default)]
        reason: Option<String>,
        /// Call under challenge.
        #[serde(default)]
        call_on_field: Option<String>,
    },
    /// Rule on the challenge.
    ResolveChallenge {
        /// Ruling.
        result: ReviewResult,
    },
    /// Take the challenge down.
    CloseChallenge,
    /// Take the two-minute warning down.
    DismissTwoMinuteWarning,
    /// Show or hide one scoreboard element.
    SetVisibility {
        /// Element.
        toggle: VisibilityToggle,
        /// New visibility.
        visible: bool,
    },
    /// Bump a quick-stat counter.
    RecordStat {
        /// Counter name.
        name: String,
        /// Team.
        team: Side,
        /// Amount, usually 1.
        #[serde(default = "one")]
        delta: i32,
    },
}

fn one() -> i32 {
    1
}

impl ControllerCommand {
    /// Run the command against a scoreboard.
    pub fn apply(self, board: &mut Scoreboard) -> Transition {
        use ControllerCommand as C;
        match self {
            C::StartClock { clock } => board.start_clock(clock),
            C::StopClock { clock } => board.stop_clock(clock),
            C::AdjustClock { clock, delta } => board.adjust_clock(clock, delta),
            C::ResetClock { clock, seconds } => board.reset_clock(clock, seconds),
            C::Score { team, points, meta } => board.score(team, points, meta),
            C::ExtraPoint { attempt } => board.extra_point(attempt),
            C::Kickoff { kicking, outcome } => board.kickoff(kicking, outcome),
            C::NextQuarter => board.next_quarter(),
            C::PreviousQuarter => board.previous_quarter(),
            C::DeclareTie => board.declare_tie(),
            C::CallTimeout { team } => board.call_timeout(team),
            C::EndTimeout => board.end_timeout(),
            C::SetDown { down } => board.set_down(down),
            C::SetDistance { distance } => board.set_distance(distance),
            C::SetPossession { team } => board.set_possession(team),
            C::Turnover { kind, gaining } => board.turnover(kind, gaining),
            C::DismissTurnover => board.dismiss_turnover(),
            C::ThrowFlag => board.throw_flag(),
            C::FlagDetails { calls } => board.flag_details(calls),
            C::ApplyFlag => board.apply_flag(),
            C::ClearFlag => board.clear_flag(),
            C::OpenReview {
                reason,
                call_on_field,
            } => board.open_review(reason, call_on_field),
            C::ResolveReview { result } => board.resolve_review(result),
            C::CloseReview => board.close_review(),
            C::OpenChallenge {
                team,
                reason,
                call_on_field,
            } => board.open_challenge(team, reason, call_on_field),
            C::ResolveChallenge { result } => board.resolve_challenge(result),
            C::CloseChallenge => board.close_challenge(),
            C::DismissTwoMinuteWarning => board.dismiss_two_minute_warning(),
            C::SetVisibility { toggle, visible } => board.set_visibility(toggle, visible),
            C::RecordStat { name, team, delta } => board.record_stat(&name, team, delta),
        }
    }
}

/// Result of one command.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommandResponse {
    /// Whether the command changed anything.
    pub applied: bool,
    /// Why the command was ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Scoreboard after the command.
    pub scoreboard: ScoreboardView,
}

impl CommandResponse {
    /// Build the response from an outcome and the resulting scoreboard.
    pub fn new(outcome: Outcome, scoreboard: ScoreboardView) -> Self {
        let (applied, reason) = match outcome {
            Outcome::Applied => (true, None),
            Outcome::Ignored(reason) => (false, Some(reason.to_string())),
        };
        Self {
            applied,
            reason,
            scoreboard,
        }
    }
}
