use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::dao::models::GamePatch;

/// Whether the session owns the game's clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Single writer of the time-critical fields.
    Controller,
    /// Read-only projection that trusts every patch.
    Viewer,
}

/// Filters incoming realtime patches before they touch local state.
///
/// A controller is the only writer of the time fields and of the display bag, so it
/// never takes them from the channel. During the quarantine window after a local stop
/// any patch carrying time fields is an echo of a write from before the stop and is
/// dropped whole. Viewers merge everything.
#[derive(Debug, Clone)]
pub struct Reconciler {
    authority: Authority,
    quarantine: Duration,
    stopped_at: Option<Instant>,
}

impl Reconciler {
    /// Reconciler of a controller session.
    pub fn controller(quarantine: Duration) -> Self {
        Self {
            authority: Authority::Controller,
            quarantine,
            stopped_at: None,
        }
    }

    /// Reconciler of a passive viewer.
    pub fn viewer() -> Self {
        Self {
            authority: Authority::Viewer,
            quarantine: Duration::ZERO,
            stopped_at: None,
        }
    }

    /// Authority this reconciler filters for.
    pub fn authority(&self) -> Authority {
        self.authority
    }

    /// The local game clock was stopped at `at`; opens the quarantine window.
    pub fn note_local_stop(&mut self, at: Instant) {
        self.stopped_at = Some(at);
    }

    /// Whether remote time fields are being ignored at `now`.
    pub fn in_quarantine(&self, now: Instant) -> bool {
        self.stopped_at
            .is_some_and(|stopped| now.saturating_duration_since(stopped) < self.quarantine)
    }

    /// Reduce `patch` to the fields this session accepts.
    pub fn reconcile(&self, mut patch: GamePatch, now: Instant) -> GamePatch {
        if self.authority == Authority::Viewer {
            return patch;
        }
        if patch.has_time_fields() {
            if self.in_quarantine(now) {
                debug!("dropping stale patch inside the quarantine window");
                return GamePatch::default();
            }
            patch.strip_time_fields();
        }
        patch.display_state = None;
        patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::GameState;

    fn clock_patch(seconds: u32) -> GamePatch {
        let mut patch = GamePatch::time_fields(&GameState {
            game_clock_seconds: seconds,
            timer_running: true,
            started_at_wall_clock: Some(1_000),
            started_at_seconds: Some(seconds),
            ..Default::default()
        });
        patch.score_home = Some(14);
        patch.display_state = Some("{}".into());
        patch
    }

    #[tokio::test(start_paused = true)]
    async fn quarantine_drops_stale_patches_after_stop() {
        let mut reconciler = Reconciler::controller(Duration::from_secs(2));
        let stopped = Instant::now();
        reconciler.note_local_stop(stopped);

        let filtered =
            reconciler.reconcile(clock_patch(895), stopped + Duration::from_millis(1_500));
        assert!(filtered.is_empty());

        let score_only = GamePatch {
            score_away: Some(7),
            ..Default::default()
        };
        let kept = reconciler.reconcile(score_only, stopped + Duration::from_millis(1_500));
        assert_eq!(kept.score_away, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn controller_never_takes_remote_time_fields() {
        let mut reconciler = Reconciler::controller(Duration::from_secs(2));
        let stopped = Instant::now();
        reconciler.note_local_stop(stopped);

        let later = reconciler.reconcile(clock_patch(895), stopped + Duration::from_secs(3));
        assert!(!later.has_time_fields());
        assert_eq!(later.score_home, Some(14));
        assert_eq!(later.display_state, None);

        let fresh = Reconciler::controller(Duration::from_secs(2));
        let filtered = fresh.reconcile(clock_patch(700), Instant::now());
        assert!(!filtered.has_time_fields());
        assert_eq!(filtered.score_home, Some(14));
    }

    #[tokio::test(start_paused = true)]
    async fn viewer_trusts_everything() {
        let reconciler = Reconciler::viewer();
        assert_eq!(reconciler.authority(), Authority::Viewer);
        let patch = clock_patch(700);
        assert_eq!(reconciler.reconcile(patch.clone(), Instant::now()), patch);
    }
}
