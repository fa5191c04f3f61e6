//! Session contract between players and the lobby server.
//!
//! Every message is externally tagged JSON:
//!
//! ```text
//! -> {"CreateUser":{}}
//! <- {"Ok":{"UserCreated":{"id":"6f1c…"}}}
//!
//! -> {"TakeTurn":{"auth":"6f1c…","details":{"play_row":2,"play_col":1,
//!     "spin_origin_row":3,"spin_origin_col":2,"spin_size":3,"spin_direction":"CW"}}}
//! <- {"Err":"NotYourTurn"}
//! ```

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

pub use crate::SpinDirection;
use crate::{Move, MoveError};

/// Opaque user id; doubles as the caller's credential.
pub type UserId = String;

pub type RoomId = String;

/// A move as it travels on the wire, in row/column terms.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct TurnDetails {
    pub play_row: usize,
    pub play_col: usize,
    pub spin_origin_row: usize,
    pub spin_origin_col: usize,
    pub spin_size: usize,
    pub spin_direction: SpinDirection,
}

impl From<Move> for TurnDetails {
    fn from(mov: Move) -> Self {
        TurnDetails {
            play_row: mov.place_y,
            play_col: mov.place_x,
            spin_origin_row: mov.spin_y,
            spin_origin_col: mov.spin_x,
            spin_size: mov.spin_size,
            spin_direction: mov.spin_direction,
        }
    }
}

impl From<TurnDetails> for Move {
    fn from(details: TurnDetails) -> Self {
        Move {
            place_x: details.play_col,
            place_y: details.play_row,
            spin_x: details.spin_origin_col,
            spin_y: details.spin_origin_row,
            spin_size: details.spin_size,
            spin_direction: details.spin_direction,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Request {
    CreateUser {},
    SetName { auth: UserId, name: String },
    CreateRoom { auth: UserId },
    JoinRoom { auth: UserId, room: RoomId },
    TakeTurn { auth: UserId, details: TurnDetails },
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Response {
    UserCreated { id: UserId },
    NameSet {},
    RoomCreated { id: RoomId },
    RoomJoined {},
    TurnTaken {},
}

#[derive(Clone, PartialEq, Eq, Debug, Display, Error, Serialize, Deserialize)]
pub enum RequestError {
    #[display("user not found")]
    UserNotFound,
    #[display("room not found")]
    RoomNotFound,
    #[display("user is already in a room")]
    UserAlreadyHasRoom,
    #[display("room already has a guest")]
    RoomAlreadyHasGuest,
    #[display("name is too long")]
    NameTooLong,
    #[display("user is not in a room")]
    UserDoesntHaveRoom,
    #[display("room is waiting for a guest")]
    RoomDoesntHaveGuest,
    #[display("it is not this user's turn")]
    NotYourTurn,
    #[display("the game is already over")]
    GameAlreadyOver,
    #[display("invalid turn: {error}")]
    InvalidTurn { error: MoveError },
    #[display("request is not valid JSON")]
    InvalidJson,
}

impl From<MoveError> for RequestError {
    fn from(error: MoveError) -> Self {
        match error {
            MoveError::GameOver => RequestError::GameAlreadyOver,
            error => RequestError::InvalidTurn { error },
        }
    }
}

/// What the server sends back for one [`Request`].
pub type Reply = Result<Response, RequestError>;
