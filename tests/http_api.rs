use bomzh::game::dice::ScriptedDice;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

mod common;
use common::{get, post_json};

#[tokio::test]
async fn health_user_and_action_routes() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = common::service_in(tmp.path(), common::scenario_catalog(), ScriptedDice::constant(0.5)).await;
    let router = common::router_for(svc, tmp.path());

    let health = router.handle(get("/")).await;
    assert_eq!(health.status, 200);
    assert_eq!(health.body_json().unwrap()["status"], "ok");

    let user = router.handle(get("/user/555")).await.body_json().unwrap();
    assert_eq!(user["user"]["user_id"], "555");
    assert_eq!(user["user"]["energy"], 100);

    let by_query = router.handle(get("/user?user_id=555")).await;
    assert_eq!(by_query.status, 200);

    let acted = router
        .handle(post_json("/action", json!({"user_id": 555, "action": "dig_trash"})))
        .await;
    assert_eq!(acted.status, 200);
    let body = acted.body_json().unwrap();
    assert_eq!(body["user"]["money_rub"], 110);
    assert_eq!(body["user"]["energy"], 90);
    assert_eq!(body["action"], "dig_trash");
}

#[tokio::test]
async fn error_mapping() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = common::service_in(tmp.path(), common::scenario_catalog(), ScriptedDice::constant(0.5)).await;
    let router = common::router_for(svc, tmp.path());

    let cases = vec![
        (post_json("/action", json!({"action": "dig_trash"})), 400, "validation_error"),
        (post_json("/action", json!({"user_id": "1", "action": "beg"})), 400, "unknown_action"),
        (post_json("/battle/start", json!({"user_id": "1", "boss_id": "dragon"})), 404, "unknown_boss"),
        (post_json("/battle/turn", json!({"user_id": "1", "move_id": "jab"})), 409, "not_active"),
        (post_json("/battle/end", json!({"user_id": "1"})), 409, "not_active"),
        (get("/user?user_id="), 400, "validation_error"),
        (get("/user/bad%20id"), 400, "validation_error"),
    ];
    for (req, status, code) in cases {
        let path = req.path.clone();
        let resp = router.handle(req).await;
        assert_eq!(resp.status, status, "{}", path);
        assert_eq!(resp.body_json().unwrap()["code"], code, "{}", path);
    }

    let malformed = bomzh::http::Request::new("POST", "/action")
        .unwrap()
        .with_body("{nope");
    assert_eq!(router.handle(malformed).await.status, 400);

    // drain energy, then a costly action is refused
    for _ in 0..10 {
        router
            .handle(post_json("/action", json!({"user_id": "2", "action": "dig_trash"})))
            .await;
    }
    let tired = router
        .handle(post_json("/action", json!({"user_id": "2", "action": "dig_trash"})))
        .await;
    assert_eq!(tired.status, 400);
    assert_eq!(tired.body_json().unwrap()["code"], "insufficient_energy");

    let started = router
        .handle(post_json("/battle/start", json!({"user_id": "3", "boss_id": "thug"})))
        .await;
    assert_eq!(started.status, 200);
    let again = router
        .handle(post_json("/battle/start", json!({"user_id": "3", "boss_id": "thug"})))
        .await;
    assert_eq!(again.status, 409);
    let early = router
        .handle(post_json("/battle/end", json!({"user_id": "3"})))
        .await;
    assert_eq!(early.body_json().unwrap()["code"], "not_finished");
    let bad_move = router
        .handle(post_json("/battle/turn", json!({"user_id": "3", "move_id": "uppercut"})))
        .await;
    assert_eq!(bad_move.status, 404);

    let wrong_method = router.handle(post_json("/metrics", json!({}))).await;
    assert_eq!(wrong_method.status, 405);
}

#[tokio::test]
async fn battle_flow_over_http() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = common::service_in(tmp.path(), common::scenario_catalog(), ScriptedDice::constant(0.5)).await;
    let router = common::router_for(Arc::clone(&svc), tmp.path());

    let config = router.handle(get("/battle/config")).await.body_json().unwrap();
    assert_eq!(config["moves"]["jab"]["base_damage"], 10);
    assert_eq!(config["bosses"]["thug"]["max_hp"], 100);

    let start = router
        .handle(post_json("/battle/start", json!({"user_id": "7", "boss_id": "THUG"})))
        .await
        .body_json()
        .unwrap();
    assert_eq!(start["battle"]["boss_hp"], 100);
    assert_eq!(start["battle"]["active"], true);

    let mut last = serde_json::Value::Null;
    for _ in 0..5 {
        last = router
            .handle(post_json("/battle/turn", json!({"user_id": "7", "move_id": "jab"})))
            .await
            .body_json()
            .unwrap();
    }
    assert_eq!(last["finished"], true);
    assert_eq!(last["player_won"], true);
    assert_eq!(last["battle"]["boss_hp"], 0);
    assert!(last["log"].as_array().unwrap().len() >= 2);
    assert_eq!(last["user"]["energy"], 75);

    let end = router
        .handle(post_json("/battle/end", json!({"user_id": "7"})))
        .await
        .body_json()
        .unwrap();
    assert_eq!(end["player_won"], true);
    assert_eq!(end["loot"]["exp"], 40);
    assert!(end["user"].get("battle").is_none());

    let twice = router
        .handle(post_json("/battle/end", json!({"user_id": "7"})))
        .await;
    assert_eq!(twice.status, 409);

    let metrics = router.handle(get("/metrics")).await.body_json().unwrap();
    assert_eq!(metrics["metrics"]["battles_started"], 1);
    assert_eq!(metrics["metrics"]["battles_won"], 1);
    assert_eq!(metrics["metrics"]["loot_payouts"], 1);
    assert_eq!(metrics["players"], 1);
}

#[tokio::test]
async fn cors_and_static_files() {
    let tmp = tempfile::tempdir().unwrap();
    let static_dir = tmp.path().join("static");
    std::fs::create_dir_all(static_dir.join("js")).unwrap();
    std::fs::write(static_dir.join("index.html"), "<html>game</html>").unwrap();
    std::fs::write(static_dir.join("js/app.js"), "void 0;").unwrap();
    let svc = common::service_in(&tmp.path().join("data"), common::scenario_catalog(), ScriptedDice::constant(0.5)).await;
    let router = common::router_for(svc, &static_dir);

    let preflight = router
        .handle(bomzh::http::Request::new("OPTIONS", "/action").unwrap())
        .await;
    assert_eq!(preflight.status, 204);
    let wire = String::from_utf8(preflight.to_bytes()).unwrap();
    assert!(wire.contains("Access-Control-Allow-Origin: *"));
    assert!(wire.contains("Access-Control-Allow-Methods: GET, POST, OPTIONS"));

    let app = router.handle(get("/app")).await;
    assert_eq!(app.status, 200);
    assert_eq!(app.body, b"<html>game</html>");
    assert_eq!(router.handle(get("/js/app.js")).await.status, 200);
    assert_eq!(router.handle(get("/../data/players.json")).await.status, 404);
    assert_eq!(router.handle(get("/missing.png")).await.status, 404);
}

#[tokio::test]
async fn serves_over_tcp_until_shutdown() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = common::service_in(tmp.path(), common::scenario_catalog(), ScriptedDice::constant(0.5)).await;
    let router = Arc::new(common::router_for(svc, tmp.path()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(bomzh::http::serve(listener, router, async {
        let _ = stop_rx.await;
    }));

    let body = r#"{"user_id":"42","action":"collect_bottles"}"#;
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "POST /action HTTP/1.1\r\nHost: test\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 200 OK"), "{}", raw);
    assert!(raw.contains("Access-Control-Allow-Origin: *"));
    assert!(raw.contains("\"money_rub\":105"));

    let _ = stop_tx.send(());
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn fleeing_ends_the_fight_without_loot() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = common::service_in(tmp.path(), common::scenario_catalog(), ScriptedDice::constant(0.5)).await;
    let router = common::router_for(svc, tmp.path());

    let nothing = router
        .handle(post_json("/battle/flee", json!({"user_id": "9"})))
        .await;
    assert_eq!(nothing.status, 409);

    router
        .handle(post_json("/battle/start", json!({"user_id": "9", "boss_id": "thug"})))
        .await;
    let fled = router
        .handle(post_json("/battle/flee", json!({"user_id": "9"})))
        .await
        .body_json()
        .unwrap();
    assert_eq!(fled["finished"], true);
    assert_eq!(fled["player_won"], false);
    assert_eq!(fled["user"]["energy"], 100);
    assert!(fled["log"][0].as_str().unwrap().contains("flee"));

    let end = router
        .handle(post_json("/battle/end", json!({"user_id": "9"})))
        .await
        .body_json()
        .unwrap();
    assert_eq!(end["player_won"], false);
    assert_eq!(end["loot"]["exp"], 0);
    assert_eq!(end["user"]["money_rub"], 100);

    let rematch = router
        .handle(post_json("/battle/start", json!({"user_id": "9", "boss_id": "thug"})))
        .await;
    assert_eq!(rematch.status, 200);
}
