//! Live sessions: the controller owning a game's clocks and the passive viewer
//! projection.

mod controller;
pub mod reconciler;
#[cfg(test)]
pub(crate) mod testing;
mod viewer;

use uuid::Uuid;

use crate::{
    display::DisplayState,
    state::game::{GameMode, GameState, TeamInfo},
};

pub use self::controller::{ControllerSession, SessionDeps};
pub use self::reconciler::{Authority, Reconciler};
pub use self::viewer::ViewerSession;

/// Fully resolved scoreboard of one game at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Game identifier.
    pub game_id: Uuid,
    /// Share code viewers subscribe with.
    pub share_code: String,
    /// Rule set.
    pub mode: GameMode,
    /// Home team metadata.
    pub home_team: TeamInfo,
    /// Away team metadata.
    pub away_team: TeamInfo,
    /// Core fields.
    pub state: GameState,
    /// Overlay bag.
    pub display: DisplayState,
}
