//! Overlay sequences shown on top of the scoreboard.
//!
//! Each sequence tracks its own stage. Only one of flag, review and challenge may be
//! open (stage > 0) at a time; the flow refuses to open a second one until the
//! operator closes the first.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    game::{Quarter, Side},
    penalty::PenaltyCall,
};

/// Raised when a persisted stage number is out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stage {0} out of range")]
pub struct StageOutOfRange(u8);

/// Stage of a penalty flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum FlagStage {
    /// No flag on screen.
    #[default]
    Hidden,
    /// "FLAG" banner.
    Thrown,
    /// Foul details listed.
    Details,
    /// Enforcement applied.
    Applied,
}

impl From<FlagStage> for u8 {
    fn from(value: FlagStage) -> Self {
        match value {
            FlagStage::Hidden => 0,
            FlagStage::Thrown => 1,
            FlagStage::Details => 2,
            FlagStage::Applied => 3,
        }
    }
}

impl TryFrom<u8> for FlagStage {
    type Error = StageOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FlagStage::Hidden),
            1 => Ok(FlagStage::Thrown),
            2 => Ok(FlagStage::Details),
            3 => Ok(FlagStage::Applied),
            other => Err(StageOutOfRange(other)),
        }
    }
}

/// Stage of a review or challenge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ReviewStage {
    /// Nothing on screen.
    #[default]
    Hidden,
    /// Review announced.
    Shown,
    /// Ruling displayed.
    Ruled,
}

impl From<ReviewStage> for u8 {
    fn from(value: ReviewStage) -> Self {
        match value {
            ReviewStage::Hidden => 0,
            ReviewStage::Shown => 1,
            ReviewStage::Ruled => 2,
        }
    }
}

impl TryFrom<u8> for ReviewStage {
    type Error = StageOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReviewStage::Hidden),
            1 => Ok(ReviewStage::Shown),
            2 => Ok(ReviewStage::Ruled),
            other => Err(StageOutOfRange(other)),
        }
    }
}

/// A penalty as listed on screen and in the game's penalty log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyRecord {
    /// Offending team.
    pub team: Side,
    /// Foul name.
    pub name: String,
    /// Yardage assessed.
    pub yards: u8,
    /// Period in which the foul occurred.
    pub quarter: Quarter,
    /// Game clock at the time, `m:ss`.
    pub time: String,
}

/// Penalty flag overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagSequence {
    /// Current stage.
    pub stage: FlagStage,
    /// Fouls listed on this flag.
    pub penalties: Vec<PenaltyRecord>,
    /// Calls waiting for enforcement, parallel to `penalties`.
    pub pending: Vec<PenaltyCall>,
}

impl FlagSequence {
    /// Whether the flag is on screen.
    pub fn is_open(&self) -> bool {
        self.stage != FlagStage::Hidden
    }

    /// Whether fouls are waiting to be enforced.
    pub fn is_enforcing(&self) -> bool {
        matches!(self.stage, FlagStage::Thrown | FlagStage::Details)
    }
}

/// Outcome of a replay review or challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewResult {
    /// Call on the field stands.
    Upheld,
    /// Call on the field overturned.
    Reversed,
}

/// Replay review overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSequence {
    /// Current stage.
    pub stage: ReviewStage,
    /// What is under review.
    pub reason: Option<String>,
    /// Ruling on the field.
    pub call_on_field: Option<String>,
    /// Ruling after review.
    pub result: Option<ReviewResult>,
}

impl ReviewSequence {
    /// Whether the review is on screen.
    pub fn is_open(&self) -> bool {
        self.stage != ReviewStage::Hidden
    }

    pub(crate) fn open(&mut self, reason: Option<String>, call_on_field: Option<String>) {
        *self = Self {
            stage: ReviewStage::Shown,
            reason,
            call_on_field,
            result: None,
        };
    }

    pub(crate) fn rule(&mut self, result: ReviewResult) -> bool {
        if self.stage != ReviewStage::Shown {
            return false;
        }
        self.stage = ReviewStage::Ruled;
        self.result = Some(result);
        true
    }
}

/// Coach's challenge overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeSequence {
    /// Challenging team.
    pub team: Option<Side>,
    /// Review part of the challenge.
    #[serde(flatten)]
    pub review: ReviewSequence,
}

impl ChallengeSequence {
    /// Whether the challenge is on screen.
    pub fn is_open(&self) -> bool {
        self.review.is_open()
    }
}

/// Kind of score being celebrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CelebrationKind {
    /// Touchdown, optionally with the conversion folded in.
    #[serde(rename = "touchdown")]
    Touchdown,
    /// Field goal.
    #[serde(rename = "fieldgoal")]
    FieldGoal,
    /// Safety.
    #[serde(rename = "safety")]
    Safety,
    /// Successful two-point conversion.
    #[serde(rename = "2pt")]
    TwoPoint,
}

/// Score animation shown before (or while) the score changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCelebration {
    /// Identifies the celebration so timers fire against the right one.
    pub id: Uuid,
    /// Kind of score.
    #[serde(rename = "type")]
    pub kind: CelebrationKind,
    /// Scoring team.
    pub team: Side,
    /// Points awarded.
    pub points: u8,
    /// Free-form caption.
    #[serde(default)]
    pub meta: Option<String>,
    /// Points still have to be added when the celebration ends.
    #[serde(default)]
    pub deferred: bool,
    /// Wall clock (ms) the celebration went on screen; its timer counts from here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shown_at: Option<i64>,
}

/// How possession changed hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TurnoverKind {
    /// Pass intercepted.
    Interception,
    /// Fumble lost.
    Fumble,
    /// Failed fourth down.
    Downs,
    /// Punt.
    Punt,
}

/// Banner announcing a change of possession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnoverBanner {
    /// How the ball changed hands.
    pub kind: TurnoverKind,
    /// Team that gained possession.
    pub team: Side,
}

/// What the scoring sequence is waiting for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ScoringPhase {
    /// Nothing pending.
    #[default]
    Idle,
    /// Touchdown committed; conversion not yet chosen.
    PendingExtraPoint {
        /// Team that scored.
        team: Side,
    },
    /// A kickoff has to be selected.
    PendingKickoff {
        /// Team kicking off.
        kicking: Side,
    },
}

/// Elements the operator can hide from the scoreboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visibility {
    /// Down and distance strip.
    pub down_distance: bool,
    /// Possession marker.
    pub possession: bool,
    /// Play clock.
    pub play_clock: bool,
    /// Timeout indicators.
    pub timeouts: bool,
    /// Quick stats panel.
    pub quick_stats: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            down_distance: true,
            possession: true,
            play_clock: true,
            timeouts: true,
            quick_stats: false,
        }
    }
}

/// One element of [`Visibility`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityToggle {
    /// Down and distance strip.
    DownDistance,
    /// Possession marker.
    Possession,
    /// Play clock.
    PlayClock,
    /// Timeout indicators.
    Timeouts,
    /// Quick stats panel.
    QuickStats,
}

impl Visibility {
    /// Show or hide one element.
    pub fn set(&mut self, toggle: VisibilityToggle, visible: bool) {
        let slot = match toggle {
            VisibilityToggle::DownDistance => &mut self.down_distance,
            VisibilityToggle::Possession => &mut self.possession,
            VisibilityToggle::PlayClock => &mut self.play_clock,
            VisibilityToggle::Timeouts => &mut self.timeouts,
            VisibilityToggle::QuickStats => &mut self.quick_stats,
        };
        *slot = visible;
    }
}

/// Per-team counter shown in the quick stats panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatLine {
    /// Home value.
    pub home: i32,
    /// Away value.
    pub away: i32,
}

impl StatLine {
    /// Add `delta` to one side.
    pub fn bump(&mut self, side: Side, delta: i32) {
        match side {
            Side::Home => self.home += delta,
            Side::Away => self.away += delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_serialize_as_numbers() {
        let flag = FlagSequence {
            stage: FlagStage::Details,
            ..Default::default()
        };
        let json = serde_json::to_value(&flag).unwrap();
        assert_eq!(json["stage"], 2);
        assert!(serde_json::from_str::<FlagStage>("4").is_err());
    }

    #[test]
    fn challenge_flattens_review_fields() {
        let mut challenge = ChallengeSequence {
            team: Some(Side::Away),
            ..Default::default()
        };
        challenge
            .review
            .open(Some("Catch".into()), Some("Incomplete".into()));
        let json = serde_json::to_value(&challenge).unwrap();
        assert_eq!(json["team"], "away");
        assert_eq!(json["stage"], 1);
        assert_eq!(json["call_on_field"], "Incomplete");
    }

    #[test]
    fn ruling_requires_an_open_review() {
        let mut review = ReviewSequence::default();
        assert!(!review.rule(ReviewResult::Upheld));
        review.open(None, None);
        assert!(review.rule(ReviewResult::Reversed));
        assert!(!review.rule(ReviewResult::Upheld));
        assert_eq!(review.result, Some(ReviewResult::Reversed));
    }

    #[test]
    fn celebration_kind_labels() {
        assert_eq!(
            serde_json::to_string(&CelebrationKind::TwoPoint).unwrap(),
            "\"2pt\""
        );
        assert_eq!(
            serde_json::to_string(&CelebrationKind::FieldGoal).unwrap(),
            "\"fieldgoal\""
        );
    }
}
