//! In-process fakes for session tests.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::{
    dao::{
        api::GameApi,
        models::{GamePatch, GameRecord},
        storage::{StorageError, StorageResult},
    },
    dto::realtime::RealtimeMessage,
    services::records::{FinalReport, RecordsError, RecordsSink},
    state::{
        RealtimeHub,
        game::{GameMode, GameState, Quarter, TeamInfo},
    },
};

/// A game record sitting in `quarter` with default values elsewhere.
pub(crate) fn record_in(quarter: Quarter) -> GameRecord {
    GameRecord {
        id: Uuid::new_v4(),
        share_code: "TEST01".into(),
        home_team: TeamInfo {
            name: "Hawks".into(),
            ..Default::default()
        },
        away_team: TeamInfo {
            name: "Owls".into(),
            ..Default::default()
        },
        mode: GameMode::Full,
        state: GameState {
            quarter,
            ..Default::default()
        },
        display_state: String::new(),
        created_at: 0,
        updated_at: 0,
    }
}

/// Single-record store that logs every write and echoes it on the hub.
pub(crate) struct FakeApi {
    record: Mutex<GameRecord>,
    writes: Mutex<Vec<GamePatch>>,
    hub: Arc<RealtimeHub>,
}

impl FakeApi {
    pub(crate) fn new(record: GameRecord, hub: Arc<RealtimeHub>) -> Arc<Self> {
        Arc::new(Self {
            record: Mutex::new(record),
            writes: Mutex::new(Vec::new()),
            hub,
        })
    }

    pub(crate) fn record(&self) -> GameRecord {
        self.record.lock().unwrap().clone()
    }

    pub(crate) fn writes(&self) -> Vec<GamePatch> {
        self.writes.lock().unwrap().clone()
    }

    /// Writes carrying the time-critical fields.
    pub(crate) fn time_writes(&self) -> usize {
        self.writes()
            .iter()
            .filter(|patch| patch.timer_running.is_some())
            .count()
    }

    /// Debounced bundle writes.
    pub(crate) fn bundle_writes(&self) -> Vec<GamePatch> {
        self.writes()
            .into_iter()
            .filter(|patch| patch.display_state.is_some())
            .collect()
    }
}

impl GameApi for FakeApi {
    fn get(&self, id: Uuid) -> BoxFuture<'static, StorageResult<GameRecord>> {
        let record = self.record();
        Box::pin(async move {
            if record.id == id {
                Ok(record)
            } else {
                Err(StorageError::Missing { id })
            }
        })
    }

    fn update(&self, id: Uuid, patch: GamePatch) -> BoxFuture<'static, StorageResult<()>> {
        let result = {
            let mut record = self.record.lock().unwrap();
            if record.id == id {
                record.apply(&patch);
                self.writes.lock().unwrap().push(patch.clone());
                Ok(record.share_code.clone())
            } else {
                Err(StorageError::Missing { id })
            }
        };
        if let Ok(share_code) = &result {
            self.hub
                .publish(share_code, RealtimeMessage::GameUpdate(patch));
        }
        Box::pin(async move { result.map(|_| ()) })
    }
}

/// Records sink keeping every report.
#[derive(Default)]
pub(crate) struct CollectingSink {
    reports: Mutex<Vec<FinalReport>>,
}

impl CollectingSink {
    pub(crate) fn reports(&self) -> Vec<FinalReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl RecordsSink for CollectingSink {
    fn report(&self, report: FinalReport) -> BoxFuture<'static, Result<(), RecordsError>> {
        self.reports.lock().unwrap().push(report);
        Box::pin(async { Ok(()) })
    }
}
