//! Hand-off of final results to the team-records and bracket services.

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::state::{game::TeamInfo, state_machine::FinalResult};

/// Payload sent once a game goes final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalReport {
    /// Game that finished.
    pub game_id: Uuid,
    /// Home team metadata.
    pub home_team: TeamInfo,
    /// Away team metadata.
    pub away_team: TeamInfo,
    /// Score and winner.
    #[serde(flatten)]
    pub result: FinalResult,
}

/// Failures while delivering a report.
#[derive(Debug, Error)]
pub enum RecordsError {
    /// The request could not be sent.
    #[cfg(feature = "remote-records")]
    #[error("failed to reach `{url}`")]
    Request {
        /// Target endpoint.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered with a non-success status.
    #[error("`{url}` answered with status {status}")]
    Status {
        /// Target endpoint.
        url: String,
        /// HTTP status code.
        status: u16,
    },
}

/// Destination for final results. Delivery is best effort: callers log failures
/// and move on.
pub trait RecordsSink: Send + Sync {
    /// Deliver `report`.
    fn report(&self, report: FinalReport) -> BoxFuture<'static, Result<(), RecordsError>>;
}

/// Sink that only logs the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRecordsSink;

impl RecordsSink for LogRecordsSink {
    fn report(&self, report: FinalReport) -> BoxFuture<'static, Result<(), RecordsError>> {
        Box::pin(async move {
            info!(
                game_id = %report.game_id,
                score_home = report.result.score_home,
                score_away = report.result.score_away,
                winner = ?report.result.winner,
                "game final"
            );
            Ok(())
        })
    }
}

#[cfg(feature = "remote-records")]
pub use self::http::HttpRecordsSink;

#[cfg(feature = "remote-records")]
mod http {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use reqwest::Client;
    use tracing::debug;

    use super::{FinalReport, RecordsError, RecordsSink};
    use crate::config::RecordsConfig;

    /// Posts the report as JSON to the configured team-records and bracket endpoints.
    #[derive(Clone)]
    pub struct HttpRecordsSink {
        client: Client,
        endpoints: Arc<[String]>,
    }

    impl HttpRecordsSink {
        /// Build a sink for the configured endpoints; `None` when none is set.
        pub fn from_config(config: &RecordsConfig) -> Option<Self> {
            let endpoints: Vec<String> = [&config.team_records_url, &config.bracket_results_url]
                .into_iter()
                .flatten()
                .filter(|url| !url.trim().is_empty())
                .cloned()
                .collect();
            if endpoints.is_empty() {
                return None;
            }
            Some(Self {
                client: Client::new(),
                endpoints: endpoints.into(),
            })
        }
    }

    impl RecordsSink for HttpRecordsSink {
        fn report(&self, report: FinalReport) -> BoxFuture<'static, Result<(), RecordsError>> {
            let sink = self.clone();
            Box::pin(async move {
                for url in sink.endpoints.iter() {
                    let response = sink
                        .client
                        .post(url)
                        .json(&report)
                        .send()
                        .await
                        .map_err(|source| RecordsError::Request {
                            url: url.clone(),
                            source,
                        })?;
                    if !response.status().is_success() {
                        return Err(RecordsError::Status {
                            url: url.clone(),
                            status: response.status().as_u16(),
                        });
                    }
                    debug!(url = %url, game_id = %report.game_id, "final result delivered");
                }
                Ok(())
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn blank_endpoints_disable_the_sink() {
            let config = RecordsConfig {
                team_records_url: Some("  ".into()),
                bracket_results_url: None,
            };
            assert!(HttpRecordsSink::from_config(&config).is_none());

            let config = RecordsConfig {
                team_records_url: Some("http://records.local/results".into()),
                bracket_results_url: Some("http://brackets.local/results".into()),
            };
            let sink = HttpRecordsSink::from_config(&config).unwrap();
            assert_eq!(sink.endpoints.len(), 2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::{Quarter, Side};

    #[test]
    fn report_serializes_flat() {
        let report = FinalReport {
            game_id: Uuid::nil(),
            home_team: TeamInfo {
                name: "Hawks".into(),
                ..Default::default()
            },
            away_team: TeamInfo::default(),
            result: FinalResult {
                score_home: 21,
                score_away: 14,
                winner: Some(Side::Home),
                last_period: Quarter::Fourth,
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["score_home"], 21);
        assert_eq!(json["winner"], "home");
        assert_eq!(json["last_period"], "q4");
        assert_eq!(json["home_team"]["name"], "Hawks");
    }
}
