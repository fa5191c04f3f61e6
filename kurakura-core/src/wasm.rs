//! WASM bindings for kurakura-core
//!
//! Drives one board from browser pointer events. The page forwards raw pixel
//! coordinates, sends whatever `confirm` returns to the server and feeds the
//! opponent's turns back through `receiveRemoteTurn`.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::{BoardGeometry, Color, Move, MoveBuilder, PointerEvent, TurnDetails, TurnLoop};

fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

/// WASM-friendly wrapper around a game in progress
#[wasm_bindgen]
pub struct WasmGame {
    turns: TurnLoop,
    builder: MoveBuilder,
    geometry: BoardGeometry,
    /// Color this page plays; None for two players sharing one screen.
    seat: Option<Color>,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new empty board drawn with `tile_size` pixel cells
    #[wasm_bindgen(constructor)]
    pub fn new(size: usize, tile_size: f64) -> WasmGame {
        WasmGame {
            turns: TurnLoop::new(size),
            builder: MoveBuilder::new(size),
            geometry: BoardGeometry::new(size, tile_size),
            seat: None,
        }
    }

    /// Play only `"black"` or `"white"`; anything else means both
    #[wasm_bindgen(js_name = setSeat)]
    pub fn set_seat(&mut self, color: Option<String>) {
        self.seat = color.and_then(|c| c.parse().ok());
        self.builder.abandon();
    }

    /// Stones in a row needed to win (5 unless set)
    #[wasm_bindgen(js_name = setWinLen)]
    pub fn set_win_len(&mut self, win_len: usize) {
        self.turns = self.turns.clone().with_win_len(win_len);
    }

    /// Move the board's top-left corner, in pixels
    #[wasm_bindgen(js_name = setOrigin)]
    pub fn set_origin(&mut self, x: f64, y: f64) {
        self.geometry = self.geometry.with_origin(x, y);
    }

    fn our_turn(&self) -> bool {
        !self.turns.is_over() && self.seat.map_or(true, |seat| seat == self.turns.active())
    }

    fn pointer(&mut self, event: PointerEvent) {
        if self.our_turn() {
            self.builder.handle(event, self.turns.grid(), &self.geometry);
        }
    }

    pub fn click(&mut self, x: f64, y: f64) {
        self.pointer(PointerEvent::Click { x, y });
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.pointer(PointerEvent::Down { x, y });
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.pointer(PointerEvent::Move { x, y });
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, x: f64, y: f64) {
        self.pointer(PointerEvent::Up { x, y });
    }

    /// Drop the move under construction
    pub fn abandon(&mut self) {
        self.builder.abandon();
    }

    /// Commit the previewed move. Returns the turn details to send, or null
    pub fn confirm(&mut self) -> JsValue {
        if self.turns.is_over() {
            self.builder.abandon();
            return JsValue::NULL;
        }
        match self.builder.confirm() {
            Some(mov) => {
                self.turns.on_move_confirmed(mov);
                to_js(&TurnDetails::from(mov))
            }
            None => JsValue::NULL,
        }
    }

    /// Apply the opponent's turn details
    #[wasm_bindgen(js_name = receiveRemoteTurn)]
    pub fn receive_remote_turn(&mut self, details: JsValue) -> Result<(), JsValue> {
        let details: TurnDetails = serde_wasm_bindgen::from_value(details)?;
        self.turns
            .receive_remote_move(Move::from(details))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.builder.abandon();
        Ok(())
    }

    /// Committed board as rows of cells
    pub fn grid(&self) -> JsValue {
        to_js(self.turns.grid())
    }

    /// Board as it would look if the move under construction were played
    pub fn preview(&self) -> JsValue {
        let grid = self
            .builder
            .preview(self.turns.grid(), self.turns.active(), &self.turns.next_label());
        to_js(&grid)
    }

    #[wasm_bindgen(js_name = moveState)]
    pub fn move_state(&self) -> JsValue {
        to_js(&self.builder.move_state())
    }

    #[wasm_bindgen(js_name = spinState)]
    pub fn spin_state(&self) -> JsValue {
        to_js(&self.builder.spin_state())
    }

    /// Highlighted rectangle `{x1, y1, x2, y2}`, or null
    #[wasm_bindgen(js_name = spinRect)]
    pub fn spin_rect(&self) -> JsValue {
        to_js(&self.builder.spin_rect())
    }

    /// "black" or "white"
    #[wasm_bindgen(js_name = activeColor)]
    pub fn active_color(&self) -> String {
        self.turns.active().to_string()
    }

    #[wasm_bindgen(js_name = moveNumber)]
    pub fn move_number(&self) -> u32 {
        self.turns.move_number()
    }

    /// `"BlackWin"`, `"WhiteWin"`, `"DoubleWin"`, `"Stalemate"`, or null
    pub fn outcome(&self) -> JsValue {
        to_js(&self.turns.outcome())
    }

    /// `[x, y]` pairs of the stones on a completed line
    #[wasm_bindgen(js_name = winningCells)]
    pub fn winning_cells(&self) -> JsValue {
        to_js(&self.turns.winning_cells())
    }

    /// Text rendering of the committed board
    pub fn render(&self) -> String {
        self.turns.grid().to_string()
    }
}
