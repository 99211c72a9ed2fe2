use bomzh::config::Config;
use bomzh::game::dice::ScriptedDice;
use bomzh::game::GameError;
use serde_json::json;

mod common;

fn config_in(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = dir.join("data").to_string_lossy().into_owned();
    config.server.static_dir = dir.join("static").to_string_lossy().into_owned();
    config.game.moves_file = common::seeds_dir().join("moves.json").to_string_lossy().into_owned();
    config.game.bosses_file = common::seeds_dir().join("bosses.json").to_string_lossy().into_owned();
    config.game.rng_seed = Some(3);
    config
}

#[tokio::test]
async fn players_survive_a_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path());

    {
        let router = bomzh::app::build_router(&config).await.unwrap();
        let resp = router
            .handle(common::post_json("/action", json!({"user_id": "77", "action": "train_strength"})))
            .await;
        assert_eq!(resp.status, 200);
        let started = router
            .handle(common::post_json("/battle/start", json!({"user_id": "77", "boss_id": "drunk_neighbor"})))
            .await;
        assert_eq!(started.status, 200);
    }

    let router = bomzh::app::build_router(&config).await.unwrap();
    let user = router.service().get_player("77").await.unwrap();
    assert_eq!(user.strength, 11);
    assert_eq!(user.energy, 85);
    assert!(user.has_active_battle());
    assert_eq!(user.battle.as_ref().unwrap().boss_id, "drunk_neighbor");
    assert_eq!(router.service().player_count().await, 1);
}

#[tokio::test]
async fn loot_is_paid_once_across_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let payout = {
        let svc = common::service_in(tmp.path(), common::scenario_catalog(), ScriptedDice::constant(0.5)).await;
        svc.start_battle("8", "thug").await.unwrap();
        for _ in 0..5 {
            svc.take_turn("8", "jab").await.unwrap();
        }
        svc.end_battle("8").await.unwrap()
    };
    assert!(payout.player_won);
    assert_eq!(payout.user.money_rub, 130);

    let svc = common::service_in(tmp.path(), common::scenario_catalog(), ScriptedDice::constant(0.5)).await;
    assert!(matches!(svc.end_battle("8").await, Err(GameError::NotActive)));
    let user = svc.get_player("8").await.unwrap();
    assert_eq!(user.money_rub, 130);
    assert_eq!(user.exp, 40);
}

#[tokio::test]
async fn rejected_requests_leave_the_file_alone() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = common::service_in(tmp.path(), common::scenario_catalog(), ScriptedDice::constant(0.5)).await;
    assert!(svc.perform_action("", "dig_trash").await.is_err());
    assert!(svc.start_battle("bad id!", "thug").await.is_err());
    assert_eq!(svc.player_count().await, 0);
    assert!(!tmp.path().join("players.json").exists());
}

#[tokio::test]
async fn storage_failure_is_a_generic_500_and_keeps_memory_state() {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("data");
    let svc = common::service_in(&data, common::scenario_catalog(), ScriptedDice::constant(0.5)).await;
    let router = common::router_for(std::sync::Arc::clone(&svc), tmp.path());
    std::fs::remove_dir_all(&data).unwrap();

    let direct = svc.perform_action("5", "dig_trash").await;
    assert!(matches!(direct, Err(GameError::Storage(_))));

    let resp = router
        .handle(common::post_json("/action", json!({"user_id": "5", "action": "dig_trash"})))
        .await;
    assert_eq!(resp.status, 500);
    let body = resp.body_json().unwrap();
    assert_eq!(body["error"], "internal server error");
    assert_eq!(body["code"], "server_error");
    assert!(!body.to_string().contains("No such file"));

    // both digs were applied in memory even though neither reached the disk
    let user = svc.get_player("5").await.unwrap();
    assert_eq!(user.energy, 80);
    assert_eq!(user.money_rub, 120);
    assert_eq!(svc.metrics().snapshot().storage_errors, 2);
    assert!(!data.exists());
}
