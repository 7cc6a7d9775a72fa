// Framework bootstrap for the arena server runtime.

use crate::domain::physics::PhysicsWorld;
use crate::domain::ports::UserStore;
use crate::frameworks::config;
use crate::frameworks::physics::ArcadePhysics;
use crate::frameworks::users::JsonFileUserStore;
use crate::interface_adapters::net::spawn_lobby_serializer;
use crate::interface_adapters::routes::app;
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::use_cases::{AccountService, LobbyRegistry, LobbySettings, SimulationConfig};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves on `listener` with the user store configured by `USERS_FILE`.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    serve(listener, config::users_file()).await
}

pub async fn serve(listener: tokio::net::TcpListener, users_file: PathBuf) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(users_file).await?;
    let app = app(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn arcade_physics() -> Box<dyn PhysicsWorld> {
    Box::new(ArcadePhysics::new())
}

fn lobby_settings() -> LobbySettings {
    LobbySettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        world_broadcast_capacity: config::WORLD_BROADCAST_CAPACITY,
        events_broadcast_capacity: config::EVENTS_BROADCAST_CAPACITY,
        tick_interval: config::TICK_INTERVAL,
        rematch_grace: config::REMATCH_GRACE,
        simulation: SimulationConfig {
            tuning: config::tuning(),
            cheats_enabled: config::cheats_enabled(),
            ..SimulationConfig::default()
        },
        seed: config::world_seed(),
        physics: arcade_physics,
        on_created: spawn_lobby_serializer,
    }
}

async fn build_state(users_file: PathBuf) -> Result<Arc<AppState>> {
    tracing::debug!(users_file = %users_file.display(), "user store configured");
    let store: Arc<dyn UserStore> = Arc::new(JsonFileUserStore::new(users_file));
    let accounts = AccountService::new(store, SystemClock);

    // The registry owns every room's world task.
    let lobby_registry = Arc::new(LobbyRegistry::new(lobby_settings()));

    // Keep the default lobby pinned so it is recreated after each rematch.
    let default_lobby = lobby_registry
        .create_lobby(config::DEFAULT_LOBBY_ID.to_string(), Vec::new(), true)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to create default lobby: {e:?}")))?;

    Ok(Arc::new(AppState {
        lobby_registry,
        default_lobby_id: default_lobby.lobby_id.clone(),
        accounts: Arc::new(accounts),
    }))
}
