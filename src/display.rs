//! Display state bag and its transport codec.
//!
//! The bag travels as one JSON string next to the flat game columns. It carries a
//! `"v"` schema version; blobs written before versioning decode as version 0. Every
//! field has a default, and a field that fails to decode falls back to its default
//! without discarding the rest of the bag.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, serde_as};
use thiserror::Error;
use tracing::warn;

use crate::state::{
    game::{Quarter, Side},
    overlays::{
        ChallengeSequence, FlagSequence, PenaltyRecord, ReviewSequence, ScoreCelebration,
        ScoringPhase, StatLine, TurnoverBanner, Visibility,
    },
};

/// Schema version written by [`encode`].
pub const DISPLAY_STATE_VERSION: u8 = 1;

/// Failures of the display state codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The transport string is not a JSON object.
    #[error("malformed display state")]
    Malformed(#[source] serde_json::Error),
    /// The bag could not be serialized.
    #[error("failed to serialize display state")]
    Serialize(#[source] serde_json::Error),
}

/// Transient overlay and presentation state of a game.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayState {
    /// Schema version the bag was written with.
    #[serde(rename = "v", default = "legacy_version")]
    pub version: u8,
    /// Penalty flag overlay.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub flag: FlagSequence,
    /// Replay review overlay.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub review: ReviewSequence,
    /// Coach's challenge overlay.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub challenge: ChallengeSequence,
    /// Score celebration on screen.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub celebration: Option<ScoreCelebration>,
    /// Conversion / kickoff decision pending after a score.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub scoring: ScoringPhase,
    /// Change-of-possession banner.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub turnover: Option<TurnoverBanner>,
    /// Team that called the timeout on screen.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub timeout_team: Option<Side>,
    /// Timeout clock value while the timeout overlay is up.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub timeout_clock_seconds: Option<u32>,
    /// Two-minute warning decision point on screen.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub two_minute_warning: bool,
    /// Two-minute warning already given this period.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub two_minute_warning_issued: bool,
    /// Game clock expired on a tie; waiting for overtime or a declared tie.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub end_of_period: bool,
    /// Period played before the game went final.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub last_period: Option<Quarter>,
    /// Final result already reported to the records services.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub final_reported: bool,
    /// Penalties enforced so far.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub penalty_log: Vec<PenaltyRecord>,
    /// Named counters in insertion order.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub quick_stats: IndexMap<String, StatLine>,
    /// Visibility toggles.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub visibility: Visibility,
    /// Count-up timer of the simple game mode.
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub stopwatch_seconds: u32,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            version: DISPLAY_STATE_VERSION,
            flag: FlagSequence::default(),
            review: ReviewSequence::default(),
            challenge: ChallengeSequence::default(),
            celebration: None,
            scoring: ScoringPhase::default(),
            turnover: None,
            timeout_team: None,
            timeout_clock_seconds: None,
            two_minute_warning: false,
            two_minute_warning_issued: false,
            end_of_period: false,
            last_period: None,
            final_reported: false,
            penalty_log: Vec::new(),
            quick_stats: IndexMap::new(),
            visibility: Visibility::default(),
            stopwatch_seconds: 0,
        }
    }
}

fn legacy_version() -> u8 {
    0
}

impl DisplayState {
    /// Whether any of the exclusive overlays (flag, review, challenge) is open.
    pub fn overlay_open(&self) -> bool {
        self.flag.is_open() || self.review.is_open() || self.challenge.is_open()
    }
}

/// Serialize the bag for transport, stamping the current schema version.
pub fn encode(state: &DisplayState) -> Result<String, CodecError> {
    let mut stamped = state.clone();
    stamped.version = DISPLAY_STATE_VERSION;
    serde_json::to_string(&stamped).map_err(CodecError::Serialize)
}

/// Parse a transport string strictly at the document level.
///
/// Individual fields still fall back to their defaults.
pub fn try_decode(raw: &str) -> Result<DisplayState, CodecError> {
    serde_json::from_str(raw).map_err(CodecError::Malformed)
}

/// Parse a transport string, never failing.
///
/// Empty input yields the defaults silently; malformed input is logged and yields
/// the defaults.
pub fn decode(raw: &str) -> DisplayState {
    if raw.trim().is_empty() {
        return DisplayState::default();
    }
    match try_decode(raw) {
        Ok(state) => {
            if state.version > DISPLAY_STATE_VERSION {
                warn!(
                    version = state.version,
                    supported = DISPLAY_STATE_VERSION,
                    "display state written by a newer schema; unknown fields dropped"
                );
            }
            state
        }
        Err(err) => {
            warn!(error = %err, "malformed display state; using defaults");
            DisplayState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::overlays::{FlagStage, ReviewStage};

    #[test]
    fn encode_stamps_version() {
        let state = DisplayState {
            version: 0,
            ..Default::default()
        };
        let raw = encode(&state).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["v"], 1);
    }

    #[test]
    fn missing_fields_take_documented_defaults() {
        let decoded = decode(r#"{"v":1,"two_minute_warning":true}"#);
        assert!(decoded.two_minute_warning);
        assert_eq!(decoded.flag.stage, FlagStage::Hidden);
        assert!(decoded.visibility.down_distance);
        assert!(!decoded.visibility.quick_stats);
        assert_eq!(decoded.scoring, ScoringPhase::Idle);
    }

    #[test]
    fn unversioned_blob_decodes_as_legacy() {
        let decoded = decode(r#"{"review":{"stage":1,"reason":"Catch"}}"#);
        assert_eq!(decoded.version, 0);
        assert_eq!(decoded.review.stage, ReviewStage::Shown);
        assert_eq!(decoded.review.reason.as_deref(), Some("Catch"));
    }

    #[test]
    fn bad_field_falls_back_alone() {
        let decoded = decode(
            r#"{"v":1,"flag":{"stage":9},"timeout_team":"home","quick_stats":"nope"}"#,
        );
        assert_eq!(decoded.flag, FlagSequence::default());
        assert_eq!(decoded.timeout_team, Some(Side::Home));
        assert!(decoded.quick_stats.is_empty());
    }

    #[test]
    fn garbage_and_empty_input_yield_defaults() {
        assert_eq!(decode(""), DisplayState::default());
        assert_eq!(decode("not json"), DisplayState::default());
        assert!(try_decode("42").is_err());
    }

    #[test]
    fn quick_stats_keep_insertion_order() {
        let mut state = DisplayState::default();
        state
            .quick_stats
            .entry("sacks".into())
            .or_default()
            .bump(Side::Home, 1);
        state
            .quick_stats
            .entry("first_downs".into())
            .or_default()
            .bump(Side::Away, 2);
        let decoded = decode(&encode(&state).unwrap());
        let keys: Vec<_> = decoded.quick_stats.keys().cloned().collect();
        assert_eq!(keys, vec!["sacks", "first_downs"]);
        assert_eq!(decoded.quick_stats["first_downs"].away, 2);
    }
}
