use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    display::DisplayState,
    dto::validation::{validate_color, validate_team_name},
    session::Snapshot,
    state::game::{GameMode, GameState, TeamInfo, format_clock},
};

/// Payload used to create a game record.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// Home team.
    #[validate(nested)]
    pub home_team: TeamInput,
    /// Away team.
    #[validate(nested)]
    pub away_team: TeamInput,
    /// Rule set; defaults to the full game.
    #[serde(default)]
    pub mode: GameMode,
}

/// Team definition supplied at creation.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TeamInput {
    /// Display name.
    #[validate(length(max = 64), custom(function = "validate_team_name"))]
    pub name: String,
    /// Short label.
    #[serde(default)]
    #[validate(length(min = 1, max = 6))]
    pub abbreviation: Option<String>,
    /// `#rgb` or `#rrggbb` color.
    #[serde(default)]
    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,
}

impl From<TeamInput> for TeamInfo {
    fn from(input: TeamInput) -> Self {
        Self {
            name: input.name.trim().to_string(),
            abbreviation: input.abbreviation,
            color: input.color.map(|color| color.to_ascii_lowercase()),
        }
    }
}

/// Identifiers of a freshly created game.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateGameResponse {
    /// Game identifier used by the controller.
    pub id: Uuid,
    /// Code viewers subscribe with.
    pub share_code: String,
}

/// Fully resolved scoreboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoreboardView {
    /// Game identifier.
    pub game_id: Uuid,
    /// Share code.
    pub share_code: String,
    /// Rule set.
    pub mode: GameMode,
    /// Home team metadata.
    pub home_team: TeamInfo,
    /// Away team metadata.
    pub away_team: TeamInfo,
    /// Live columns.
    #[serde(flatten)]
    pub state: GameState,
    /// Game clock as `m:ss`.
    pub game_clock: String,
    /// Overlay and presentation state.
    #[schema(value_type = Object)]
    pub display: DisplayState,
}

impl From<Snapshot> for ScoreboardView {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            game_id: snapshot.game_id,
            share_code: snapshot.share_code,
            mode: snapshot.mode,
            home_team: snapshot.home_team,
            away_team: snapshot.away_team,
            game_clock: format_clock(snapshot.state.game_clock_seconds),
            state: snapshot.state,
            display: snapshot.display,
        }
    }
}
