use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    clock::{Checkpoint, Resume, resume},
    dao::models::{GamePatch, GameRecord},
    display::{self, DisplayState},
};

use super::{Reconciler, Snapshot};

/// Read-only projection of a game rebuilt from realtime patches.
///
/// While the game clock runs the displayed value is derived from the persisted
/// checkpoint, so the projection keeps counting between heartbeats.
#[derive(Debug, Clone)]
pub struct ViewerSession {
    record: GameRecord,
    display: DisplayState,
    reconciler: Reconciler,
    max_elapsed_secs: i64,
}

impl ViewerSession {
    /// Start from a freshly loaded record.
    pub fn new(record: GameRecord, max_elapsed_secs: i64) -> Self {
        let display = display::decode(&record.display_state);
        Self {
            record,
            display,
            reconciler: Reconciler::viewer(),
            max_elapsed_secs,
        }
    }

    /// Merge a realtime patch wholesale.
    pub fn apply(&mut self, patch: GamePatch) {
        let patch = self.reconciler.reconcile(patch, Instant::now());
        self.record.apply(&patch);
        if let Some(raw) = &patch.display_state {
            self.display = display::decode(raw);
        }
    }

    /// Game being watched.
    pub fn game_id(&self) -> Uuid {
        self.record.id
    }

    /// Whether the persisted game clock is running.
    pub fn is_running(&self) -> bool {
        self.record.state.timer_running
    }

    /// Scoreboard as it should look at `now_ms`.
    pub fn view(&self, now_ms: i64) -> Snapshot {
        let mut state = self.record.state.clone();
        if state.timer_running {
            let checkpoint =
                Checkpoint::from_columns(state.started_at_wall_clock, state.started_at_seconds);
            match resume(checkpoint, now_ms, self.max_elapsed_secs) {
                Resume::Running { remaining } => {
                    state.game_clock_seconds = remaining.min(state.game_clock_seconds)
                }
                Resume::Expired => state.game_clock_seconds = 0,
                Resume::Corrupt { .. } => {}
            }
        }
        Snapshot {
            game_id: self.record.id,
            share_code: self.record.share_code.clone(),
            mode: self.record.mode,
            home_team: self.record.home_team.clone(),
            away_team: self.record.away_team.clone(),
            state,
            display: self.display.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        session::testing::record_in,
        state::{
            game::{Quarter, Side},
            overlays::{TurnoverBanner, TurnoverKind},
        },
    };

    #[tokio::test]
    async fn running_clock_is_interpolated_from_the_checkpoint() {
        let mut viewer = ViewerSession::new(record_in(Quarter::First), 86_400);
        viewer.apply(GamePatch {
            game_clock_seconds: Some(900),
            timer_running: Some(true),
            started_at_wall_clock: Some(Some(1_000_000)),
            started_at_seconds: Some(Some(900)),
            ..Default::default()
        });
        assert_eq!(viewer.view(1_012_400).state.game_clock_seconds, 888);

        viewer.apply(GamePatch {
            game_clock_seconds: Some(880),
            ..Default::default()
        });
        assert_eq!(viewer.view(1_012_400).state.game_clock_seconds, 880);
        assert_eq!(viewer.view(2_000_000).state.game_clock_seconds, 0);
    }

    #[tokio::test]
    async fn display_bag_is_replaced_by_each_update() {
        let mut viewer = ViewerSession::new(record_in(Quarter::Second), 86_400);
        let mut bag = DisplayState::default();
        bag.turnover = Some(TurnoverBanner {
            kind: TurnoverKind::Interception,
            team: Side::Away,
        });
        viewer.apply(GamePatch {
            score_away: Some(3),
            display_state: Some(display::encode(&bag).unwrap()),
            ..Default::default()
        });
        let view = viewer.view(0);
        assert_eq!(view.state.score_away, 3);
        assert_eq!(view.display.turnover, bag.turnover);

        viewer.apply(GamePatch {
            display_state: Some("garbage".into()),
            ..Default::default()
        });
        assert_eq!(viewer.view(0).display, DisplayState::default());
    }
}
