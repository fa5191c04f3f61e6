//! Kura Kura lobby server
//!
//! Keeps users and rooms in memory and referees every room's game with
//! `kurakura-core`. Players speak the JSON session contract from
//! `kurakura_core::protocol` on `POST /rpc` and poll the room they sit in.
//!
//! Settings come from `KURAKURA_*` environment variables (see `config.rs`);
//! log verbosity from `RUST_LOG`.

mod config;
mod lobby;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kurakura_core::{Color, Grid, Outcome, Reply};

use crate::config::Config;
use crate::lobby::{Lobby, Room};

// =============================================================================
// Shared State
// =============================================================================

struct AppStateInner {
    lobby: Mutex<Lobby>,
}

type AppState = Arc<AppStateInner>;

impl AppStateInner {
    /// Lock the lobby, recovering it if a handler panicked while holding it.
    fn lobby(&self) -> MutexGuard<'_, Lobby> {
        self.lobby.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// JSON Models
// =============================================================================

#[derive(Serialize)]
struct PlayerModel {
    name: String,
    color: Color,
}

#[derive(Serialize)]
struct RoomModel {
    id: String,
    host: PlayerModel,
    guest: Option<PlayerModel>,
    size: usize,
    grid: Grid,
    active: Color,
    move_number: u32,
    outcome: Option<Outcome>,
    /// `[x, y]` of every stone on a completed line.
    winning_cells: Vec<(usize, usize)>,
    age_secs: u64,
}

#[derive(Serialize)]
struct HealthModel {
    status: String,
    users: usize,
    rooms: usize,
}

#[derive(Serialize)]
struct ErrorModel {
    detail: String,
}

fn room_to_model(room: &Room, lobby: &Lobby) -> RoomModel {
    // Ids double as credentials, so players are shown by name only.
    let player = |id: &str| PlayerModel {
        name: lobby.user_name(id).unwrap_or_default().to_string(),
        color: room.seat_of(id).unwrap_or(Color::Black),
    };

    RoomModel {
        id: room.id.clone(),
        host: player(&room.host),
        guest: room.guest.as_deref().map(player),
        size: room.game.grid().size(),
        grid: room.game.grid().clone(),
        active: room.game.active(),
        move_number: room.game.move_number(),
        outcome: room.game.outcome(),
        winning_cells: room.game.winning_cells(),
        age_secs: room.created_at.elapsed().as_secs(),
    }
}

fn room_not_found(id: &str) -> (StatusCode, Json<ErrorModel>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorModel {
            detail: format!("no room {id}"),
        }),
    )
}

// =============================================================================
// Handlers
// =============================================================================

async fn rpc(State(state): State<AppState>, body: String) -> (StatusCode, Json<Reply>) {
    let reply = state.lobby().handle_json(&body);
    let status = match &reply {
        Ok(response) => {
            info!(?response, "request handled");
            StatusCode::OK
        }
        Err(err) => {
            warn!(%err, "request refused");
            StatusCode::BAD_REQUEST
        }
    };
    (status, Json(reply))
}

async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomModel>, (StatusCode, Json<ErrorModel>)> {
    let lobby = state.lobby();
    let room = lobby.room(&room_id).ok_or_else(|| room_not_found(&room_id))?;
    Ok(Json(room_to_model(room, &lobby)))
}

async fn get_board(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<String, (StatusCode, Json<ErrorModel>)> {
    let lobby = state.lobby();
    let room = lobby.room(&room_id).ok_or_else(|| room_not_found(&room_id))?;
    Ok(room.game.grid().to_string())
}

async fn health(State(state): State<AppState>) -> Json<HealthModel> {
    let lobby = state.lobby();
    Json(HealthModel {
        status: "ok".to_string(),
        users: lobby.user_count(),
        rooms: lobby.room_count(),
    })
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/rpc", post(rpc))
        .route("/rooms/{room_id}", get(get_room))
        .route("/rooms/{room_id}/board", get(get_board))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Idle Sweep
// =============================================================================

fn spawn_sweeper(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            state.lobby().sweep(Instant::now());
        }
    });
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(?config, "starting Kura Kura lobby");

    let state: AppState = Arc::new(AppStateInner {
        lobby: Mutex::new(Lobby::new(config.lobby_settings())),
    });
    spawn_sweeper(state.clone(), config.idle_timeout() / 4);

    let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;
    info!("Kura Kura lobby listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;

    Ok(())
}
