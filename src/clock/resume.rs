//! Reconstruction of a running game clock after the session was unloaded.

use serde::{Deserialize, Serialize};

/// Persisted snapshot of a running game clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Wall clock (ms since epoch) when the snapshot was taken.
    pub started_at_wall_clock: i64,
    /// Game clock value at that instant.
    pub started_at_seconds: u32,
}

impl Checkpoint {
    /// Pair the two persisted columns; either one missing means no checkpoint.
    pub fn from_columns(wall_clock: Option<i64>, seconds: Option<u32>) -> Option<Self> {
        Some(Self {
            started_at_wall_clock: wall_clock?,
            started_at_seconds: seconds?,
        })
    }
}

/// What to do with a game clock persisted as running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    /// Keep running from `remaining` seconds.
    Running {
        /// Reconstructed clock value.
        remaining: u32,
    },
    /// The period ran out while unloaded; stop at zero and end the period.
    Expired,
    /// The checkpoint cannot be trusted; stop at zero without ending the period.
    Corrupt {
        /// Why the checkpoint was rejected.
        reason: &'static str,
    },
}

/// Compute the clock value for a game clock persisted as running.
///
/// `elapsed` is whole seconds since the checkpoint and must fall in
/// `[0, max_elapsed_secs)`.
pub fn resume(checkpoint: Option<Checkpoint>, now_ms: i64, max_elapsed_secs: i64) -> Resume {
    let Some(checkpoint) = checkpoint else {
        return Resume::Corrupt {
            reason: "running clock without checkpoint",
        };
    };
    let delta_ms = now_ms.saturating_sub(checkpoint.started_at_wall_clock);
    if delta_ms < 0 {
        return Resume::Corrupt {
            reason: "checkpoint in the future",
        };
    }
    let elapsed = delta_ms / 1000;
    if elapsed >= max_elapsed_secs {
        return Resume::Corrupt {
            reason: "checkpoint too old",
        };
    }

    let remaining = i64::from(checkpoint.started_at_seconds) - elapsed;
    if remaining <= 0 {
        Resume::Expired
    } else {
        Resume::Running {
            remaining: remaining as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;

    fn at(seconds: u32) -> Option<Checkpoint> {
        Some(Checkpoint {
            started_at_wall_clock: 1_000_000,
            started_at_seconds: seconds,
        })
    }

    #[test]
    fn elapsed_time_is_subtracted() {
        assert_eq!(
            resume(at(872), 1_000_000 + 30_000, DAY),
            Resume::Running { remaining: 842 }
        );
        // partial seconds are floored
        assert_eq!(
            resume(at(872), 1_000_000 + 30_999, DAY),
            Resume::Running { remaining: 842 }
        );
    }

    #[test]
    fn exhausted_clock_expires() {
        assert_eq!(resume(at(10), 1_000_000 + 10_000, DAY), Resume::Expired);
        assert_eq!(resume(at(10), 1_000_000 + 600_000, DAY), Resume::Expired);
    }

    #[test]
    fn implausible_checkpoints_are_corrupt() {
        assert!(matches!(
            resume(at(900), 999_000, DAY),
            Resume::Corrupt { .. }
        ));
        assert!(matches!(
            resume(at(900), 1_000_000 + DAY * 1000, DAY),
            Resume::Corrupt { .. }
        ));
        assert!(matches!(resume(None, 0, DAY), Resume::Corrupt { .. }));
    }

    #[test]
    fn checkpoint_needs_both_columns() {
        assert!(Checkpoint::from_columns(Some(1), None).is_none());
        assert!(Checkpoint::from_columns(None, Some(1)).is_none());
        assert_eq!(
            Checkpoint::from_columns(Some(5), Some(7)),
            Some(Checkpoint {
                started_at_wall_clock: 5,
                started_at_seconds: 7
            })
        );
    }
}
