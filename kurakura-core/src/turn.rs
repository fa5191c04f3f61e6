//! Turn loop: commits moves to the board and alternates the players.
//!
//! Local moves come from a [`MoveBuilder`](crate::MoveBuilder) and are trusted;
//! each accepted local move is handed to a [`TurnSink`] (typically the network
//! session). Moves from a peer go through [`TurnLoop::receive_remote_move`],
//! which validates them first and never echoes them to the sink.
//!
//! The loop also referees: after every move it checks for `win_len` in a row
//! and refuses further moves once the game is decided.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Color, Grid, Move, MoveError, Outcome, DEFAULT_WIN_LEN};

/// Whose turn it is.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct TurnState {
    pub active: Color,
    /// 1-based number of the move about to be played.
    pub move_number: u32,
}

impl TurnState {
    /// State before move `move_number`; the color follows from its parity.
    pub fn at(move_number: u32) -> TurnState {
        TurnState {
            active: Color::for_move(move_number),
            move_number,
        }
    }

    fn advance(&mut self) {
        self.active = self.active.opponent();
        self.move_number += 1;
    }
}

impl Default for TurnState {
    fn default() -> Self {
        TurnState::at(1)
    }
}

/// A move that has been committed to the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct AcceptedTurn {
    pub mov: Move,
    pub color: Color,
    pub move_number: u32,
    /// Set when this move decided the game.
    pub outcome: Option<Outcome>,
}

/// Receives moves played locally, e.g. to send them to the opponent.
pub trait TurnSink {
    fn move_accepted(&mut self, turn: &AcceptedTurn);
}

/// Sink for games with nobody to notify.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Offline;

impl TurnSink for Offline {
    fn move_accepted(&mut self, _turn: &AcceptedTurn) {}
}

impl TurnSink for Vec<AcceptedTurn> {
    fn move_accepted(&mut self, turn: &AcceptedTurn) {
        self.push(*turn);
    }
}

impl<T: TurnSink + ?Sized> TurnSink for &mut T {
    fn move_accepted(&mut self, turn: &AcceptedTurn) {
        (**self).move_accepted(turn);
    }
}

impl<T: TurnSink + ?Sized> TurnSink for Box<T> {
    fn move_accepted(&mut self, turn: &AcceptedTurn) {
        (**self).move_accepted(turn);
    }
}

/// The committed board plus whose turn it is.
#[derive(Clone, Debug)]
pub struct TurnLoop<S = Offline> {
    grid: Grid,
    state: TurnState,
    win_len: usize,
    outcome: Option<Outcome>,
    sink: S,
}

impl TurnLoop<Offline> {
    /// A fresh game with nobody listening.
    pub fn new(size: usize) -> Self {
        TurnLoop::with_sink(size, Offline)
    }
}

impl<S: TurnSink> TurnLoop<S> {
    /// A fresh game on an empty `size×size` board, Black to move.
    pub fn with_sink(size: usize, sink: S) -> Self {
        TurnLoop::resume(Grid::new(size), 1, sink)
    }

    /// Continue a game from a saved board, about to play `move_number`.
    pub fn resume(grid: Grid, move_number: u32, sink: S) -> Self {
        assert!(move_number >= 1, "move numbers start at 1");
        let outcome = grid.outcome(DEFAULT_WIN_LEN);
        TurnLoop {
            grid,
            state: TurnState::at(move_number),
            win_len: DEFAULT_WIN_LEN,
            outcome,
            sink,
        }
    }

    /// Play to `win_len` in a row instead of [`DEFAULT_WIN_LEN`].
    pub fn with_win_len(mut self, win_len: usize) -> Self {
        self.win_len = win_len;
        self.outcome = self.grid.outcome(win_len);
        self
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn state(&self) -> TurnState {
        self.state
    }

    #[inline]
    pub fn active(&self) -> Color {
        self.state.active
    }

    #[inline]
    pub fn move_number(&self) -> u32 {
        self.state.move_number
    }

    #[inline]
    pub fn win_len(&self) -> usize {
        self.win_len
    }

    /// How the game ended, or None while it is still on.
    #[inline]
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Stones on a completed line, row by row.
    pub fn winning_cells(&self) -> Vec<(usize, usize)> {
        self.grid.winning_cells(self.win_len)
    }

    /// Label the next stone will carry.
    pub fn next_label(&self) -> String {
        self.state.move_number.to_string()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Commit a move built locally and notify the sink.
    ///
    /// The move is trusted; panics if it breaks [`Move::check`] or the game
    /// is already over.
    pub fn on_move_confirmed(&mut self, mov: Move) -> AcceptedTurn {
        assert!(self.outcome.is_none(), "the game is already over");
        let turn = self.commit(mov);
        self.sink.move_accepted(&turn);
        turn
    }

    /// Commit a move received from the opponent.
    ///
    /// Invalid moves are rejected and leave the game untouched.
    pub fn receive_remote_move(&mut self, mov: Move) -> Result<AcceptedTurn, MoveError> {
        if self.outcome.is_some() {
            debug!(move_number = self.state.move_number, ?mov, "move after the game ended");
            return Err(MoveError::GameOver);
        }
        if let Err(err) = mov.check(&self.grid) {
            debug!(move_number = self.state.move_number, ?mov, %err, "rejected remote move");
            return Err(err);
        }
        Ok(self.commit(mov))
    }

    fn commit(&mut self, mov: Move) -> AcceptedTurn {
        let TurnState {
            active,
            move_number,
        } = self.state;

        self.grid = self
            .grid
            .apply_move(&mov, active, move_number.to_string());
        self.state.advance();
        self.outcome = self.grid.outcome(self.win_len);

        debug!(move_number, color = %active, ?mov, "move accepted");
        if let Some(outcome) = self.outcome {
            info!(move_number, ?outcome, "game over");
        }
        AcceptedTurn {
            mov,
            color: active,
            move_number,
            outcome: self.outcome,
        }
    }
}
