use crate::interface_adapters::net::accounts::{get_user, list_users, login, register};
use crate::interface_adapters::net::{create_lobby_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/lobbies", post(create_lobby_handler))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/users", get(list_users))
        .route("/users/{user_id}", get(get_user))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::physics::PhysicsWorld;
    use crate::domain::ports::{UserRecord, UserStore};
    use crate::frameworks::physics::ArcadePhysics;
    use crate::interface_adapters::state::SystemClock;
    use crate::use_cases::{AccountService, LobbyRegistry, LobbySettings, SimulationConfig};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct MemoryStore {
        users: Mutex<Vec<UserRecord>>,
    }

    #[async_trait]
    impl UserStore for MemoryStore {
        async fn load(&self) -> Result<Vec<UserRecord>, String> {
            Ok(self.users.lock().await.clone())
        }

        async fn save(&self, users: &[UserRecord]) -> Result<(), String> {
            *self.users.lock().await = users.to_vec();
            Ok(())
        }
    }

    fn physics() -> Box<dyn PhysicsWorld> {
        Box::new(ArcadePhysics::new())
    }

    fn build_test_app() -> Router {
        let lobby_registry = Arc::new(LobbyRegistry::new(LobbySettings {
            input_channel_capacity: 16,
            world_broadcast_capacity: 4,
            events_broadcast_capacity: 16,
            tick_interval: Duration::from_millis(50),
            rematch_grace: Duration::from_millis(10),
            simulation: SimulationConfig::default(),
            seed: Some(3),
            physics,
            on_created: |_| {},
        }));
        let store: Arc<dyn UserStore> = Arc::new(MemoryStore::default());
        app(Arc::new(AppState {
            lobby_registry,
            default_lobby_id: Arc::from("test"),
            accounts: Arc::new(AccountService::new(store, SystemClock)),
        }))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("expected request to build")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("expected response body");
        serde_json::from_slice(&body).expect("expected json body")
    }

    #[tokio::test]
    async fn when_user_registers_then_login_returns_the_same_id() {
        let app = build_test_app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/register",
                r#"{"username":"alice","password":"hunter22"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let registered = json_body(response).await;
        assert_eq!(registered["success"], true);
        let user_id = registered["user_id"].as_str().expect("user id").to_string();

        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/login",
                r#"{"username":"ALICE","password":"hunter22"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let logged_in = json_body(response).await;
        assert_eq!(logged_in["user_id"], user_id.as_str());
        assert_eq!(logged_in["username"], "alice");

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/users/{user_id}"))
                    .body(Body::empty())
                    .expect("expected request to build"),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["username"], "alice");
    }

    #[tokio::test]
    async fn when_password_is_wrong_then_login_returns_401_and_message() {
        let app = build_test_app();
        app.clone()
            .oneshot(post_json(
                "/auth/register",
                r#"{"username":"bob_1","password":"secret1"}"#,
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(post_json(
                "/auth/login",
                r#"{"username":"bob_1","password":"nope123"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let payload = json_body(response).await;
        assert_eq!(payload["success"], false);
        assert_eq!(payload["message"], "Invalid username or password");
        assert!(payload.get("user_id").is_none());
    }

    #[tokio::test]
    async fn when_username_is_taken_then_register_returns_409() {
        let app = build_test_app();
        let body = r#"{"username":"carol","password":"secret1"}"#;
        app.clone()
            .oneshot(post_json("/auth/register", body))
            .await
            .unwrap();

        let response = app.oneshot(post_json("/auth/register", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["message"], "Username already exists");
    }

    #[tokio::test]
    async fn when_user_id_is_unknown_then_lookup_returns_404() {
        let app = build_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/users/missing")
                    .body(Body::empty())
                    .expect("expected request to build"),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "User not found");
    }

    #[tokio::test]
    async fn when_lobby_id_is_blank_then_create_returns_400() {
        let app = build_test_app();

        let response = app
            .oneshot(post_json("/lobbies", r#"{"lobby_id":"  "}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "lobby_id is required");
    }
}
