mod support;

#[tokio::test]
async fn when_account_is_registered_then_it_can_log_in_and_be_listed() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    // Unique per run; usernames allow letters, digits and underscores only.
    let username = format!("u_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);
    let credentials = serde_json::json!({ "username": username, "password": "secret42" });

    let res = client
        .post(format!("{base_url}/auth/register"))
        .json(&credentials)
        .send()
        .await
        .expect("register request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let registered: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(registered["success"], true);
    let user_id = registered["user_id"]
        .as_str()
        .expect("user id")
        .to_string();

    let res = client
        .post(format!("{base_url}/auth/login"))
        .json(&credentials)
        .send()
        .await
        .expect("login request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let logged_in: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(logged_in["user_id"], user_id.as_str());
    assert_eq!(logged_in["username"], username.as_str());

    let users: Vec<serde_json::Value> = client
        .get(format!("{base_url}/users"))
        .send()
        .await
        .expect("list request should succeed")
        .json()
        .await
        .expect("json body");
    assert!(users.iter().any(|u| u["user_id"] == user_id.as_str()));
}

#[tokio::test]
async fn when_password_is_too_short_then_registration_is_rejected() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base_url}/auth/register"))
        .json(&serde_json::json!({ "username": "shorty", "password": "123" }))
        .send()
        .await
        .expect("register request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(body["success"], false);
}
