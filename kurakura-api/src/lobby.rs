//! Users, rooms and the games played in them.
//!
//! A room is created by its host, who plays Black, and joined by exactly one
//! guest, who plays White. Every request is answered synchronously; the lobby
//! holds no locks or tasks of its own. Idle rooms and users are dropped by
//! [`Lobby::sweep`], which the server calls on a timer.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use kurakura_core::protocol::{RoomId, UserId};
use kurakura_core::{Color, Move, Reply, Request, RequestError, Response, TurnDetails, TurnLoop};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LobbySettings {
    pub board_size: usize,
    pub max_name_len: usize,
    /// Stones in a row needed to win.
    pub win_len: usize,
    /// Rooms and roomless users untouched for this long are dropped.
    pub idle_timeout: Duration,
}

#[derive(Debug)]
struct User {
    name: String,
    room: Option<RoomId>,
    last_seen: Instant,
}

#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub host: UserId,
    pub guest: Option<UserId>,
    pub game: TurnLoop,
    pub created_at: Instant,
    /// Last join or turn.
    pub last_active: Instant,
}

impl Room {
    pub fn host_color(&self) -> Color {
        Color::Black
    }

    /// Color played by `user`, if they sit in this room.
    pub fn seat_of(&self, user: &str) -> Option<Color> {
        if self.host == user {
            Some(self.host_color())
        } else if self.guest.as_deref() == Some(user) {
            Some(self.host_color().opponent())
        } else {
            None
        }
    }
}

#[derive(Debug)]
pub struct Lobby {
    settings: LobbySettings,
    users: HashMap<UserId, User>,
    rooms: HashMap<RoomId, Room>,
}

impl Lobby {
    pub fn new(settings: LobbySettings) -> Self {
        Lobby {
            settings,
            users: HashMap::new(),
            rooms: HashMap::new(),
        }
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn user_name(&self, id: &str) -> Option<&str> {
        self.users.get(id).map(|user| user.name.as_str())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Parse and answer one raw request.
    pub fn handle_json(&mut self, body: &str) -> Reply {
        match serde_json::from_str::<Request>(body) {
            Ok(request) => self.handle(request),
            Err(err) => {
                debug!(%err, "malformed request body");
                Err(RequestError::InvalidJson)
            }
        }
    }

    /// Answer one request. Refusals are logged by the caller.
    pub fn handle(&mut self, request: Request) -> Reply {
        match request {
            Request::CreateUser {} => Ok(self.create_user()),
            Request::SetName { auth, name } => self.set_name(&auth, name),
            Request::CreateRoom { auth } => self.create_room(&auth),
            Request::JoinRoom { auth, room } => self.join_room(&auth, &room),
            Request::TakeTurn { auth, details } => self.take_turn(&auth, details),
        }
    }

    /// Drop rooms idle for longer than the configured timeout, then users
    /// left without a room and idle as long. Returns (rooms, users) removed.
    pub fn sweep(&mut self, now: Instant) -> (usize, usize) {
        let max_idle = self.settings.idle_timeout;
        let idle = |since: Instant| now.saturating_duration_since(since) > max_idle;

        let stale: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| idle(room.last_active))
            .map(|room| room.id.clone())
            .collect();
        for id in &stale {
            if let Some(room) = self.rooms.remove(id) {
                for member in std::iter::once(&room.host).chain(room.guest.as_ref()) {
                    if let Some(user) = self.users.get_mut(member) {
                        user.room = None;
                    }
                }
                debug!(room = %id, move_number = room.game.move_number(), "idle room closed");
            }
        }

        let users_before = self.users.len();
        self.users
            .retain(|_, user| user.room.is_some() || !idle(user.last_seen));
        let removed = (stale.len(), users_before - self.users.len());

        if removed != (0, 0) {
            info!(
                rooms = removed.0,
                users = removed.1,
                "swept idle rooms and users"
            );
        }
        removed
    }

    fn create_user(&mut self) -> Response {
        let id = Uuid::new_v4().to_string();
        self.users.insert(
            id.clone(),
            User {
                name: String::new(),
                room: None,
                last_seen: Instant::now(),
            },
        );
        info!(users = self.users.len(), "user created");
        Response::UserCreated { id }
    }

    fn set_name(&mut self, auth: &str, name: String) -> Reply {
        let user = self.users.get_mut(auth).ok_or(RequestError::UserNotFound)?;
        user.last_seen = Instant::now();
        if name.len() > self.settings.max_name_len {
            return Err(RequestError::NameTooLong);
        }
        user.name = name;
        Ok(Response::NameSet {})
    }

    fn create_room(&mut self, auth: &str) -> Reply {
        let now = Instant::now();
        let user = self.users.get_mut(auth).ok_or(RequestError::UserNotFound)?;
        user.last_seen = now;
        if user.room.is_some() {
            return Err(RequestError::UserAlreadyHasRoom);
        }

        let id = Uuid::new_v4().to_string();
        user.room = Some(id.clone());
        self.rooms.insert(
            id.clone(),
            Room {
                id: id.clone(),
                host: auth.to_string(),
                guest: None,
                game: TurnLoop::new(self.settings.board_size).with_win_len(self.settings.win_len),
                created_at: now,
                last_active: now,
            },
        );
        info!(room = %id, size = self.settings.board_size, "room created");
        Ok(Response::RoomCreated { id })
    }

    fn join_room(&mut self, auth: &str, room_id: &str) -> Reply {
        let now = Instant::now();
        let user = self.users.get_mut(auth).ok_or(RequestError::UserNotFound)?;
        user.last_seen = now;
        if user.room.is_some() {
            return Err(RequestError::UserAlreadyHasRoom);
        }
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or(RequestError::RoomNotFound)?;
        if room.guest.is_some() {
            return Err(RequestError::RoomAlreadyHasGuest);
        }

        room.guest = Some(auth.to_string());
        room.last_active = now;
        user.room = Some(room.id.clone());
        info!(room = %room.id, "guest joined");
        Ok(Response::RoomJoined {})
    }

    fn take_turn(&mut self, auth: &str, details: TurnDetails) -> Reply {
        let now = Instant::now();
        let user = self.users.get_mut(auth).ok_or(RequestError::UserNotFound)?;
        user.last_seen = now;
        let room_id = user.room.as_ref().ok_or(RequestError::UserDoesntHaveRoom)?;
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or(RequestError::RoomNotFound)?;
        if room.guest.is_none() {
            return Err(RequestError::RoomDoesntHaveGuest);
        }
        if room.game.is_over() {
            return Err(RequestError::GameAlreadyOver);
        }
        if room.seat_of(auth) != Some(room.game.active()) {
            return Err(RequestError::NotYourTurn);
        }

        let turn = room.game.receive_remote_move(Move::from(details))?;
        room.last_active = now;
        info!(room = %room.id, move_number = turn.move_number, color = %turn.color, "turn taken");
        if let Some(outcome) = turn.outcome {
            info!(room = %room.id, ?outcome, "game decided");
        }
        Ok(Response::TurnTaken {})
    }
}
