mod common;

use std::time::Duration;

use scorebug_back::{
    clock::{ClockId, now_millis},
    dao::{game_store::GameStore, models::GamePatch},
    dto::{command::ControllerCommand, realtime::RealtimeMessage},
    services::game_service,
    session::ViewerSession,
    state::game::{Distance, Quarter, Side},
};
use tokio::time::sleep;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[tokio::test(start_paused = true)]
async fn operator_burst_is_persisted_as_one_write() {
    let (state, store) = common::app().await;
    let game = common::create_game(&state).await;
    game_service::open_control(&state, game.id).await.unwrap();
    sleep(ms(500)).await;
    let before = store.bundle_writes().len();

    for command in [
        ControllerCommand::NextQuarter,
        ControllerCommand::SetPossession {
            team: Some(Side::Home),
        },
        ControllerCommand::SetDown { down: 3 },
        ControllerCommand::SetDistance {
            distance: Distance::Yards(5),
        },
    ] {
        let response = game_service::apply_command(&state, game.id, command)
            .await
            .unwrap();
        assert!(response.applied);
    }

    sleep(ms(50)).await;
    assert_eq!(store.bundle_writes().len(), before);

    sleep(ms(100)).await;
    assert_eq!(store.bundle_writes().len(), before + 1);
    let stored = store.record(game.id).await;
    assert_eq!(stored.state.quarter, Quarter::First);
    assert_eq!(stored.state.down, 3);
    assert_eq!(stored.state.distance, Distance::Yards(5));
    assert_eq!(stored.state.possession, Some(Side::Home));

    game_service::close_control(&state, game.id).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn running_clock_resumes_across_sessions() {
    let (state, store) = common::app().await;
    let game = common::create_game(&state).await;
    game_service::open_control(&state, game.id).await.unwrap();
    game_service::apply_command(&state, game.id, ControllerCommand::NextQuarter)
        .await
        .unwrap();

    let start = ControllerCommand::StartClock {
        clock: ClockId::Game,
    };
    game_service::apply_command(&state, game.id, start.clone())
        .await
        .unwrap();
    sleep(ms(8_010)).await;
    let stopped = game_service::apply_command(
        &state,
        game.id,
        ControllerCommand::StopClock {
            clock: ClockId::Game,
        },
    )
    .await
    .unwrap();
    assert_eq!(stopped.scoreboard.state.game_clock_seconds, 892);
    assert!(!stopped.scoreboard.state.timer_running);

    game_service::apply_command(&state, game.id, start)
        .await
        .unwrap();
    sleep(ms(10)).await;
    game_service::close_control(&state, game.id).await.unwrap();

    let stored = store.record(game.id).await;
    assert!(stored.state.timer_running);
    assert_eq!(stored.state.started_at_seconds, Some(892));
    let Some(started_at) = stored.state.started_at_wall_clock else {
        panic!("running clock must carry a checkpoint");
    };

    // The controller was away for 30 seconds of wall time.
    store
        .tamper(
            game.id,
            GamePatch {
                started_at_wall_clock: Some(Some(started_at - 30_000)),
                ..Default::default()
            },
        )
        .await;

    let view = game_service::open_control(&state, game.id)
        .await
        .unwrap()
        .snapshot()
        .await;
    assert_eq!(view.state.game_clock_seconds, 862);
    assert!(view.state.timer_running);

    sleep(ms(2_010)).await;
    let view = game_service::view(&state, game.id).await.unwrap();
    assert_eq!(view.state.game_clock_seconds, 860);
    assert_eq!(view.game_clock, "14:20");

    game_service::close_control(&state, game.id).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn viewer_projection_follows_controller_writes() {
    let (state, _store) = common::app().await;
    let game = common::create_game(&state).await;
    let session = game_service::open_control(&state, game.id).await.unwrap();
    let store = state.game_store().await.unwrap();
    let record = store.find_game(game.id).await.unwrap().unwrap();

    let max_elapsed_secs = state.config().engine.max_resume_elapsed_secs;
    let mut viewer = ViewerSession::new(record, max_elapsed_secs);
    let mut updates = state.realtime().subscribe(&game.share_code);

    game_service::apply_command(&state, game.id, ControllerCommand::NextQuarter)
        .await
        .unwrap();
    game_service::apply_command(
        &state,
        game.id,
        ControllerCommand::Score {
            team: Side::Away,
            points: 3,
            meta: None,
        },
    )
    .await
    .unwrap();
    game_service::apply_command(
        &state,
        game.id,
        ControllerCommand::StartClock {
            clock: ClockId::Game,
        },
    )
    .await
    .unwrap();
    sleep(ms(5_500)).await;

    while let Ok(RealtimeMessage::GameUpdate(patch)) = updates.try_recv() {
        viewer.apply(patch);
    }
    let seen = viewer.view(now_millis());
    let live = session.snapshot().await;
    assert_eq!(seen.state.quarter, Quarter::First);
    assert_eq!(seen.state.score_away, live.state.score_away);
    assert!(seen.state.timer_running);
    assert_eq!(seen.state.game_clock_seconds, 895);

    game_service::close_control(&state, game.id).await.unwrap();
}
