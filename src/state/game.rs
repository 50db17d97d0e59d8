use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use utoipa::ToSchema;

/// Highest value the game clock can hold (15:00).
pub const MAX_GAME_CLOCK_SECONDS: u32 = 900;
/// Highest value the play clock can hold.
pub const MAX_PLAY_CLOCK_SECONDS: u32 = 40;

/// One of the two teams on the scoreboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Home team.
    Home,
    /// Away team.
    Away,
}

impl Side {
    /// The other team.
    pub fn opponent(self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

/// Periods of a game, in the order they are played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum Quarter {
    /// Before kickoff.
    Pregame,
    /// First quarter.
    First,
    /// Second quarter.
    Second,
    /// Break between the halves.
    Halftime,
    /// Third quarter.
    Third,
    /// Fourth quarter.
    Fourth,
    /// Overtime period, numbered from 1.
    Overtime(u8),
    /// Game over with a winner.
    Final,
    /// Game over, tied.
    FinalTie,
}

impl Quarter {
    /// Whether the game clock runs during this period.
    pub fn is_period(self) -> bool {
        matches!(
            self,
            Quarter::First
                | Quarter::Second
                | Quarter::Third
                | Quarter::Fourth
                | Quarter::Overtime(_)
        )
    }

    /// Whether the game is over.
    pub fn is_final(self) -> bool {
        matches!(self, Quarter::Final | Quarter::FinalTie)
    }

    /// Whether this is an overtime period.
    pub fn is_overtime(self) -> bool {
        matches!(self, Quarter::Overtime(_))
    }

    /// Periods where the two-minute warning applies.
    pub fn has_two_minute_warning(self) -> bool {
        matches!(self, Quarter::Second | Quarter::Fourth)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quarter::Pregame => f.write_str("pregame"),
            Quarter::First => f.write_str("q1"),
            Quarter::Second => f.write_str("q2"),
            Quarter::Halftime => f.write_str("halftime"),
            Quarter::Third => f.write_str("q3"),
            Quarter::Fourth => f.write_str("q4"),
            Quarter::Overtime(1) => f.write_str("ot"),
            Quarter::Overtime(n) => write!(f, "ot{n}"),
            Quarter::Final => f.write_str("final"),
            Quarter::FinalTie => f.write_str("final_tie"),
        }
    }
}

/// Error returned when a persisted quarter or distance label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised {kind} `{value}`")]
pub struct ParseLabelError {
    kind: &'static str,
    value: String,
}

impl FromStr for Quarter {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let quarter = match s {
            "pregame" => Quarter::Pregame,
            "q1" => Quarter::First,
            "q2" => Quarter::Second,
            "halftime" => Quarter::Halftime,
            "q3" => Quarter::Third,
            "q4" => Quarter::Fourth,
            "ot" => Quarter::Overtime(1),
            "final" => Quarter::Final,
            "final_tie" => Quarter::FinalTie,
            other => match other.strip_prefix("ot").map(str::parse::<u8>) {
                Some(Ok(n)) if n >= 1 => Quarter::Overtime(n),
                _ => {
                    return Err(ParseLabelError {
                        kind: "quarter",
                        value: s.to_string(),
                    });
                }
            },
        };
        Ok(quarter)
    }
}

/// Yards to gain for a first down, or one of the special markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum Distance {
    /// Plain yardage.
    Yards(u8),
    /// Less than a yard to go.
    Inches,
    /// Goal to go.
    Goal,
}

impl Distance {
    /// Yardage used for arithmetic, inches counting as zero. `None` for goal to go.
    pub fn yards(self) -> Option<i32> {
        match self {
            Distance::Yards(yards) => Some(i32::from(yards)),
            Distance::Inches => Some(0),
            Distance::Goal => None,
        }
    }
}

impl Default for Distance {
    fn default() -> Self {
        Distance::Yards(10)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Yards(yards) => write!(f, "{yards}"),
            Distance::Inches => f.write_str("inches"),
            Distance::Goal => f.write_str("goal"),
        }
    }
}

impl FromStr for Distance {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "goal" => Ok(Distance::Goal),
            "inches" => Ok(Distance::Inches),
            other => other
                .parse::<u8>()
                .ok()
                .filter(|yards| *yards > 0)
                .map(Distance::Yards)
                .ok_or_else(|| ParseLabelError {
                    kind: "distance",
                    value: s.to_string(),
                }),
        }
    }
}

/// Which rule set the scoreboard follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Quarters, downs, clocks and overlays.
    #[default]
    Full,
    /// Scores and a count-up stopwatch only.
    Simple,
}

/// Team metadata shown on the scoreboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TeamInfo {
    /// Display name.
    pub name: String,
    /// Short label such as `HOME`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    /// CSS color string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Core live fields of a game, persisted as flat columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GameState {
    /// Home score.
    pub score_home: u32,
    /// Away score.
    pub score_away: u32,
    /// Current period.
    #[schema(value_type = String)]
    pub quarter: Quarter,
    /// Remaining game clock time.
    pub game_clock_seconds: u32,
    /// Remaining play clock time.
    pub play_clock_seconds: u32,
    /// Whether the game clock is running.
    pub timer_running: bool,
    /// Wall clock (ms since epoch) at which the running game clock was last checkpointed.
    #[serde(default)]
    pub started_at_wall_clock: Option<i64>,
    /// Game clock value at the checkpoint.
    #[serde(default)]
    pub started_at_seconds: Option<u32>,
    /// Current down, 1 to 4.
    pub down: u8,
    /// Yards to go.
    #[schema(value_type = String)]
    pub distance: Distance,
    /// Team with the ball.
    #[serde(default)]
    pub possession: Option<Side>,
    /// Timeouts left for the home team.
    pub home_timeouts: u8,
    /// Timeouts left for the away team.
    pub away_timeouts: u8,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            score_home: 0,
            score_away: 0,
            quarter: Quarter::Pregame,
            game_clock_seconds: MAX_GAME_CLOCK_SECONDS,
            play_clock_seconds: MAX_PLAY_CLOCK_SECONDS,
            timer_running: false,
            started_at_wall_clock: None,
            started_at_seconds: None,
            down: 1,
            distance: Distance::default(),
            possession: None,
            home_timeouts: 3,
            away_timeouts: 3,
        }
    }
}

impl GameState {
    /// Score of one team.
    pub fn score(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.score_home,
            Side::Away => self.score_away,
        }
    }

    /// Apply a signed delta to one team's score, never going below zero.
    pub fn add_score(&mut self, side: Side, delta: i32) {
        let slot = match side {
            Side::Home => &mut self.score_home,
            Side::Away => &mut self.score_away,
        };
        *slot = slot.saturating_add_signed(delta);
    }

    /// Whether both teams have the same score.
    pub fn is_tied(&self) -> bool {
        self.score_home == self.score_away
    }

    /// Timeouts left for one team.
    pub fn timeouts(&self, side: Side) -> u8 {
        match side {
            Side::Home => self.home_timeouts,
            Side::Away => self.away_timeouts,
        }
    }

    /// Mutable access to one team's timeouts.
    pub fn timeouts_mut(&mut self, side: Side) -> &mut u8 {
        match side {
            Side::Home => &mut self.home_timeouts,
            Side::Away => &mut self.away_timeouts,
        }
    }

    /// Give both teams the same number of timeouts.
    pub fn reset_timeouts(&mut self, count: u8) {
        self.home_timeouts = count;
        self.away_timeouts = count;
    }

    /// Clear the running-clock checkpoint.
    pub fn clear_checkpoint(&mut self) {
        self.started_at_wall_clock = None;
        self.started_at_seconds = None;
    }
}

/// Format clock seconds as `m:ss`.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_labels_round_trip() {
        for quarter in [
            Quarter::Pregame,
            Quarter::First,
            Quarter::Halftime,
            Quarter::Overtime(1),
            Quarter::Overtime(3),
            Quarter::FinalTie,
        ] {
            assert_eq!(quarter.to_string().parse::<Quarter>().unwrap(), quarter);
        }
        assert_eq!(Quarter::Overtime(2).to_string(), "ot2");
        assert!("ot0".parse::<Quarter>().is_err());
        assert!("fifth".parse::<Quarter>().is_err());
    }

    #[test]
    fn distance_labels() {
        assert_eq!("goal".parse::<Distance>().unwrap(), Distance::Goal);
        assert_eq!("7".parse::<Distance>().unwrap(), Distance::Yards(7));
        assert!("0".parse::<Distance>().is_err());
        assert_eq!(
            serde_json::to_string(&Distance::Inches).unwrap(),
            "\"inches\""
        );
    }

    #[test]
    fn score_never_goes_negative() {
        let mut state = GameState::default();
        state.add_score(Side::Away, 3);
        state.add_score(Side::Away, -7);
        assert_eq!(state.score_away, 0);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(862), "14:22");
        assert_eq!(format_clock(5), "0:05");
    }
}
