mod support;

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn create_lobby(lobby_id: &str) {
    let base_url = support::ensure_server();
    let res = reqwest::Client::new()
        .post(format!("{base_url}/lobbies"))
        .json(&serde_json::json!({ "lobby_id": lobby_id }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
}

// Reads text frames until one has the wanted `type`.
async fn next_of_type(socket: &mut Socket, wanted: &str) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let frame = socket
                .next()
                .await
                .expect("socket should stay open")
                .expect("frame should be valid");
            if let Message::Text(text) = frame {
                let value: serde_json::Value =
                    serde_json::from_str(&text).expect("server sends json");
                if value["type"] == wanted {
                    return value;
                }
            }
        }
    })
    .await
    .expect("message should arrive in time")
}

async fn join(lobby_id: &str, username: &str) -> Socket {
    let (mut socket, _) = connect_async(support::ws_url(lobby_id))
        .await
        .expect("websocket should connect");
    let join = serde_json::json!({ "type": "join", "data": { "username": username } });
    socket
        .send(Message::Text(join.to_string().into()))
        .await
        .expect("join should send");
    socket
}

#[tokio::test]
async fn when_client_joins_then_it_gets_identity_and_its_characters() {
    let lobby_id = format!("ws-{}", uuid::Uuid::new_v4());
    create_lobby(&lobby_id).await;
    let mut socket = join(&lobby_id, "pilot").await;

    let identity = next_of_type(&mut socket, "identity").await;
    let session_id = identity["data"]["session_id"]
        .as_u64()
        .expect("session id");

    let characters = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let update = next_of_type(&mut socket, "world_update").await;
            let mine: Vec<serde_json::Value> = update["data"]["entities"]
                .as_array()
                .expect("entities")
                .iter()
                .filter(|e| e["kind"] == "player" && e["session_id"] == session_id)
                .cloned()
                .collect();
            if !mine.is_empty() {
                return mine;
            }
        }
    })
    .await
    .expect("characters should appear");

    assert_eq!(characters.len(), 2);
    assert_eq!(
        characters.iter().filter(|c| c["is_active"] == true).count(),
        1
    );
    assert!(characters.iter().all(|c| c["username"] == "pilot"));
}

#[tokio::test]
async fn when_client_chats_then_the_room_hears_it() {
    let lobby_id = format!("ws-{}", uuid::Uuid::new_v4());
    create_lobby(&lobby_id).await;
    let mut speaker = join(&lobby_id, "speaker").await;
    next_of_type(&mut speaker, "identity").await;
    let mut listener = join(&lobby_id, "listener").await;
    next_of_type(&mut listener, "identity").await;

    let chat = serde_json::json!({ "type": "chat_message", "data": { "text": "gl hf" } });
    speaker
        .send(Message::Text(chat.to_string().into()))
        .await
        .expect("chat should send");

    let heard = next_of_type(&mut listener, "chat_message").await;
    assert_eq!(heard["data"]["from"], "speaker");
    assert_eq!(heard["data"]["text"], "gl hf");
}

#[tokio::test]
async fn when_first_message_is_not_join_then_socket_is_closed() {
    let (mut socket, _) = connect_async(support::ws_url("test"))
        .await
        .expect("websocket should connect");
    socket
        .send(Message::Text(r#"{"type":"switch_character"}"#.to_string().into()))
        .await
        .expect("message should send");

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(frame) = socket.next().await {
            match frame {
                Ok(Message::Close(frame)) => return frame.map(|f| f.reason.as_str().to_string()),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
        None
    })
    .await
    .expect("socket should close in time");

    assert_eq!(closed.as_deref(), Some("join required"));
}
