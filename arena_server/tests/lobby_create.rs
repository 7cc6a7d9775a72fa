mod support;

#[tokio::test]
async fn test_lobby_creation() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let lobby_id = format!("test-{}", uuid::Uuid::new_v4());
    let payload = serde_json::json!({ "lobby_id": lobby_id });

    let res = client
        .post(format!("{base_url}/lobbies"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(body["lobby_id"], lobby_id.as_str());

    // Same id again is a conflict.
    let res = client
        .post(format!("{base_url}/lobbies"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);
}
