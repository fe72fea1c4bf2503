mod support;

use futures::StreamExt;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn when_client_joins_then_identity_comes_first() {
    let mut socket = support::connect().await;
    support::send_join(&mut socket).await;

    let first = socket
        .next()
        .await
        .expect("stream open")
        .expect("valid frame");
    let value: serde_json::Value =
        serde_json::from_str(first.to_text().expect("text frame")).expect("json message");

    assert_eq!(value["type"], "Identity");
    assert!(value["data"]["connection_id"].is_string());
}

#[tokio::test]
async fn when_client_joins_lobby_then_game_state_reports_lobby() {
    let (mut socket, _) = support::join_lobby().await;

    let state = support::next_matching(&mut socket, |v| v["type"] == "GameState").await;

    assert!(state["data"]["Lobby"]["required"].is_number());
}

#[tokio::test]
async fn when_client_has_no_character_then_it_is_prompted_to_select() {
    let (mut socket, _) = support::join_lobby().await;

    let notice = support::next_matching(&mut socket, |v| {
        v["type"] == "Notice" && v["data"]["kind"] == "select_character"
    })
    .await;

    assert_eq!(notice["data"]["kind"], "select_character");
}

#[tokio::test]
async fn when_client_selects_character_then_world_updates_show_their_player() {
    let (mut socket, connection_id) = support::join_lobby().await;

    support::select_character(&mut socket, "blue").await;

    let update = support::next_matching(&mut socket, |v| {
        v["type"] == "WorldUpdate"
            && v["data"]["players"].as_array().is_some_and(|players| {
                players
                    .iter()
                    .any(|p| p["id"] == connection_id.as_str() && p["archetype"] == "blue")
            })
    })
    .await;

    let players = update["data"]["players"].as_array().expect("players");
    let me = players
        .iter()
        .find(|p| p["id"] == connection_id.as_str())
        .expect("own player");
    assert_eq!(me["lives"], 3);
    assert_eq!(me["alive"], true);
}

#[tokio::test]
async fn when_first_message_is_not_join_then_server_closes() {
    let mut socket = support::connect().await;
    support::send_json(&mut socket, serde_json::json!({"type": "StartLevel"})).await;

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return true,
                Some(Ok(_)) => {}
            }
        }
    })
    .await
    .expect("close in time");

    assert!(closed);
}
