use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::game::{Distance, GameMode, GameState, Quarter, Side, TeamInfo};

/// Persisted game row: flat scalar columns plus the opaque `display_state` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Stable identifier of the game.
    pub id: Uuid,
    /// Short code viewers use to subscribe.
    pub share_code: String,
    /// Home team metadata.
    pub home_team: TeamInfo,
    /// Away team metadata.
    pub away_team: TeamInfo,
    /// Rule set of the game.
    #[serde(default)]
    pub mode: GameMode,
    /// Live columns.
    #[serde(flatten)]
    pub state: GameState,
    /// Encoded display state bag.
    #[serde(default)]
    pub display_state: String,
    /// Creation time, ms since epoch.
    pub created_at: i64,
    /// Last write, ms since epoch.
    pub updated_at: i64,
}

impl GameRecord {
    /// Apply every field present in `patch`.
    pub fn apply(&mut self, patch: &GamePatch) {
        patch.apply_to(&mut self.state);
        if let Some(value) = &patch.display_state {
            self.display_state.clone_from(value);
        }
        if let Some(value) = &patch.home_team {
            self.home_team.clone_from(value);
        }
        if let Some(value) = &patch.away_team {
            self.away_team.clone_from(value);
        }
    }
}

/// Partial update of a [`GameRecord`].
///
/// Absent fields are left untouched. Nullable columns use a double option so that
/// `Some(None)` clears the column while `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GamePatch {
    /// Home score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_home: Option<u32>,
    /// Away score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_away: Option<u32>,
    /// Current period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub quarter: Option<Quarter>,
    /// Game clock value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_clock_seconds: Option<u32>,
    /// Play clock value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_clock_seconds: Option<u32>,
    /// Whether the game clock runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_running: Option<bool>,
    /// Checkpoint wall clock.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<i64>)]
    pub started_at_wall_clock: Option<Option<i64>>,
    /// Checkpoint clock value.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<u32>)]
    pub started_at_seconds: Option<Option<u32>>,
    /// Current down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<u8>,
    /// Yards to go.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub distance: Option<Distance>,
    /// Team in possession.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<Side>)]
    pub possession: Option<Option<Side>>,
    /// Home timeouts left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_timeouts: Option<u8>,
    /// Away timeouts left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_timeouts: Option<u8>,
    /// Encoded display state bag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_state: Option<String>,
    /// Home team metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_team: Option<TeamInfo>,
    /// Away team metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_team: Option<TeamInfo>,
}

impl GamePatch {
    /// Write the live columns present in this patch into `state`.
    pub fn apply_to(&self, state: &mut GameState) {
        if let Some(value) = self.score_home {
            state.score_home = value;
        }
        if let Some(value) = self.score_away {
            state.score_away = value;
        }
        if let Some(value) = self.quarter {
            state.quarter = value;
        }
        if let Some(value) = self.game_clock_seconds {
            state.game_clock_seconds = value;
        }
        if let Some(value) = self.play_clock_seconds {
            state.play_clock_seconds = value;
        }
        if let Some(value) = self.timer_running {
            state.timer_running = value;
        }
        if let Some(value) = self.started_at_wall_clock {
            state.started_at_wall_clock = value;
        }
        if let Some(value) = self.started_at_seconds {
            state.started_at_seconds = value;
        }
        if let Some(value) = self.down {
            state.down = value;
        }
        if let Some(value) = self.distance {
            state.distance = value;
        }
        if let Some(value) = self.possession {
            state.possession = value;
        }
        if let Some(value) = self.home_timeouts {
            state.home_timeouts = value;
        }
        if let Some(value) = self.away_timeouts {
            state.away_timeouts = value;
        }
    }

    /// Time-critical columns of `state`: clocks, running flag and checkpoint.
    pub fn time_fields(state: &GameState) -> Self {
        Self {
            game_clock_seconds: Some(state.game_clock_seconds),
            play_clock_seconds: Some(state.play_clock_seconds),
            timer_running: Some(state.timer_running),
            started_at_wall_clock: Some(state.started_at_wall_clock),
            started_at_seconds: Some(state.started_at_seconds),
            ..Default::default()
        }
    }

    /// Columns written together on the debounced path.
    pub fn bundle(state: &GameState, display_state: String) -> Self {
        Self {
            score_home: Some(state.score_home),
            score_away: Some(state.score_away),
            quarter: Some(state.quarter),
            play_clock_seconds: Some(state.play_clock_seconds),
            down: Some(state.down),
            distance: Some(state.distance),
            possession: Some(state.possession),
            home_timeouts: Some(state.home_timeouts),
            away_timeouts: Some(state.away_timeouts),
            display_state: Some(display_state),
            ..Default::default()
        }
    }

    /// Every column of `record`, as sent to a viewer that just connected.
    pub fn full(record: &GameRecord) -> Self {
        let mut patch = Self::bundle(&record.state, record.display_state.clone());
        patch.merge(Self::time_fields(&record.state));
        patch.home_team = Some(record.home_team.clone());
        patch.away_team = Some(record.away_team.clone());
        patch
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether any time-critical field is set.
    pub fn has_time_fields(&self) -> bool {
        self.game_clock_seconds.is_some()
            || self.play_clock_seconds.is_some()
            || self.timer_running.is_some()
            || self.started_at_wall_clock.is_some()
            || self.started_at_seconds.is_some()
    }

    /// Drop the time-critical fields.
    pub fn strip_time_fields(&mut self) {
        self.game_clock_seconds = None;
        self.play_clock_seconds = None;
        self.timer_running = None;
        self.started_at_wall_clock = None;
        self.started_at_seconds = None;
    }

    /// Fold `newer` into `self`; fields set in `newer` win.
    pub fn merge(&mut self, newer: GamePatch) {
        fn take<T>(slot: &mut Option<T>, newer: Option<T>) {
            if newer.is_some() {
                *slot = newer;
            }
        }
        take(&mut self.score_home, newer.score_home);
        take(&mut self.score_away, newer.score_away);
        take(&mut self.quarter, newer.quarter);
        take(&mut self.game_clock_seconds, newer.game_clock_seconds);
        take(&mut self.play_clock_seconds, newer.play_clock_seconds);
        take(&mut self.timer_running, newer.timer_running);
        take(&mut self.started_at_wall_clock, newer.started_at_wall_clock);
        take(&mut self.started_at_seconds, newer.started_at_seconds);
        take(&mut self.down, newer.down);
        take(&mut self.distance, newer.distance);
        take(&mut self.possession, newer.possession);
        take(&mut self.home_timeouts, newer.home_timeouts);
        take(&mut self.away_timeouts, newer.away_timeouts);
        take(&mut self.display_state, newer.display_state);
        take(&mut self.home_team, newer.home_team);
        take(&mut self.away_team, newer.away_team);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_option_distinguishes_null_from_absent() {
        let cleared: GamePatch = serde_json::from_str(r#"{"possession":null}"#).unwrap();
        assert_eq!(cleared.possession, Some(None));
        let untouched: GamePatch = serde_json::from_str("{}").unwrap();
        assert_eq!(untouched.possession, None);
        assert!(untouched.is_empty());

        let json = serde_json::to_value(&cleared).unwrap();
        assert_eq!(json, serde_json::json!({ "possession": null }));
    }

    #[test]
    fn merge_prefers_newer_fields() {
        let mut base = GamePatch {
            down: Some(2),
            score_home: Some(7),
            ..Default::default()
        };
        base.merge(GamePatch {
            down: Some(3),
            possession: Some(Some(Side::Away)),
            ..Default::default()
        });
        assert_eq!(base.down, Some(3));
        assert_eq!(base.score_home, Some(7));
        assert_eq!(base.possession, Some(Some(Side::Away)));
    }

    #[test]
    fn stripping_removes_only_time_fields() {
        let mut patch = GamePatch::time_fields(&GameState::default());
        patch.score_away = Some(3);
        assert!(patch.has_time_fields());
        patch.strip_time_fields();
        assert!(!patch.has_time_fields());
        assert_eq!(patch.score_away, Some(3));
    }

    #[test]
    fn record_serializes_flat() {
        let record = GameRecord {
            id: Uuid::nil(),
            share_code: "ABC123".into(),
            home_team: TeamInfo::default(),
            away_team: TeamInfo::default(),
            mode: GameMode::Full,
            state: GameState::default(),
            display_state: String::new(),
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["quarter"], "pregame");
        assert_eq!(json["game_clock_seconds"], 900);

        let mut applied = record.clone();
        applied.apply(&GamePatch {
            started_at_wall_clock: Some(Some(42)),
            distance: Some(Distance::Goal),
            ..Default::default()
        });
        assert_eq!(applied.state.started_at_wall_clock, Some(42));
        assert_eq!(applied.state.distance, Distance::Goal);
    }
}
