// Framework bootstrap for the side-scroller session server.

use crate::domain::ports::{OnlineBackend, SessionSettings};
use crate::frameworks::config::{self, SessionBackendKind};
use crate::frameworks::levels::load_catalog;
use crate::frameworks::save_game::SaveGameStore;
use crate::interface_adapters::clients::backend::HttpSessionBackend;
use crate::interface_adapters::net::{
    create_session_handler, delete_session_handler, directory_join_handler,
    directory_search_handler, get_session_handler, list_sessions_handler,
    world_update_serializer, ws_handler,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::connection_ids::ConnectionIds;
use crate::use_cases::game::world_task;
use crate::use_cases::{
    Authority, AuthoritySettings, FlowNotice, GameEvent, SessionDirectory, SessionRegistry,
    WorldExit, WorldUpdate,
};

use axum::{
    Router,
    extract::ws::Utf8Bytes,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{Notify, broadcast, mpsc, watch};

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

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let (state, shutdown) = build_state(address).await?;
    // Start the Web Server
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route(
            "/sessions",
            post(create_session_handler).get(list_sessions_handler),
        )
        .route(
            "/sessions/{server_name}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/directory/search", post(directory_search_handler))
        .route("/directory/join", post(directory_join_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn shutdown_signal(shutdown: Arc<Notify>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
    // notify_one keeps a permit if the world task is mid-tick.
    shutdown.notify_one();
}

fn build_backend(
    registry: &Arc<SessionRegistry>,
) -> Result<Option<Arc<dyn OnlineBackend>>> {
    match config::session_backend() {
        SessionBackendKind::Local => Ok(Some(registry.clone() as Arc<dyn OnlineBackend>)),
        SessionBackendKind::Http(base_url) => {
            let timeout = config::session_backend_timeout();
            let backend = HttpSessionBackend::new(base_url.clone(), timeout).map_err(|e| {
                std::io::Error::other(format!("failed to initialize session backend: {e}"))
            })?;
            tracing::debug!(
                %base_url,
                timeout_ms = timeout.as_millis(),
                "http session backend configured"
            );
            Ok(Some(Arc::new(backend)))
        }
        SessionBackendKind::None => {
            tracing::warn!("no session backend configured");
            Ok(None)
        }
    }
}

async fn build_state(address: SocketAddr) -> Result<(Arc<AppState>, Arc<Notify>)> {
    let catalog = load_catalog(config::levels_path().as_deref()).await?;
    let profile = SaveGameStore::new(config::save_game_path())
        .load_and_repair()
        .await;

    // Setup the session registry and the directory that advertises through it.
    let registry = Arc::new(SessionRegistry::new());
    let directory = Arc::new(SessionDirectory::new(build_backend(&registry)?));
    let session_name = config::session_name();

    // A server that cannot host its session does not start.
    directory
        .create_session(SessionSettings {
            server_name: session_name.clone(),
            host_user_name: profile.player_name.clone(),
            max_players: config::max_players(),
            connect_address: address.to_string(),
            presence: true,
        })
        .await
        .map_err(|e| {
            tracing::error!(%session_name, error = %e, "failed to host session");
            std::io::Error::other(format!("failed to host session: {e}"))
        })?;

    // Setup Channels
    // input_tx/rx: All client events go to the single world task.
    let (input_tx, input_rx) = mpsc::channel::<GameEvent>(config::INPUT_CHANNEL_CAPACITY);
    // world_tx: Player snapshots, serialized once for every client.
    let (world_tx, _) = broadcast::channel::<WorldUpdate>(config::WORLD_BROADCAST_CAPACITY);
    let (world_bytes_tx, _) = broadcast::channel::<Utf8Bytes>(config::WORLD_BROADCAST_CAPACITY);
    let (world_latest_tx, _) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
    let (notice_tx, _) = broadcast::channel::<FlowNotice>(config::NOTICE_BROADCAST_CAPACITY);

    let authority = Authority::new(AuthoritySettings::new(
        config::min_players_to_start(),
        catalog,
    ));
    let (server_state_tx, _) = watch::channel(authority.server_state());
    let shutdown = Arc::new(Notify::new());

    // Spawn the world task. An unrecoverable exit ends the process.
    let world = tokio::spawn(world_task(
        authority,
        input_rx,
        world_tx.clone(),
        notice_tx.clone(),
        server_state_tx.clone(),
        config::TICK_INTERVAL,
        shutdown.clone(),
    ));
    tokio::spawn(async move {
        match world.await {
            Ok(WorldExit::Shutdown) => tracing::info!("world task stopped"),
            Ok(WorldExit::HardQuit) => {
                tracing::error!("game over route unresolvable; quitting");
                std::process::exit(1);
            }
            Err(e) => {
                tracing::error!(error = %e, "world task failed");
                std::process::exit(1);
            }
        }
    });

    // Spawn the world update serializer task in the adapter layer.
    tokio::spawn(world_update_serializer(
        world_tx.subscribe(),
        world_bytes_tx.clone(),
        world_latest_tx.clone(),
    ));

    let state = Arc::new(AppState {
        connection_ids: ConnectionIds::new(),
        input_tx,
        world_bytes_tx,
        world_latest_tx,
        notice_tx,
        server_state_tx,
        registry,
        directory,
        session_name: Arc::from(session_name.as_str()),
    });
    Ok((state, shutdown))
}
