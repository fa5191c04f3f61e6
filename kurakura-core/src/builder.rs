//! Move construction from raw pointer input.
//!
//! A move is built in two phases. First the player clicks an empty cell to
//! choose where the stone goes; then they drag out the square to spin:
//!
//! ```text
//!  Place ──click empty cell──▶ Spin { place }
//!
//!  Spin:
//!    Start ──down──▶ Drag ──up, square──▶ Preview ──confirm──▶ Move, back to Place
//!      ▲               │                    │
//!      └──up, not square                    └──down──▶ Cancel ──up──▶ Start
//! ```
//!
//! Malformed gestures are reverted rather than reported; the only output is
//! the [`Move`] returned by [`MoveBuilder::confirm`].

use serde::{Deserialize, Serialize};

use crate::{Color, Grid, Move, SpinDirection, Square, Stone};

/// Which half of the move is being built.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum MoveState {
    Place,
    Spin { place_x: usize, place_y: usize },
}

/// Progress of the spin-square gesture.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum SpinState {
    Start,
    /// Pointer held down; `(x1, y1)` is the anchor cell.
    Drag { x1: usize, y1: usize },
    /// A square is selected and shown spun.
    Preview,
    /// Pointer went down on a preview; waiting for release.
    Cancel,
}

/// Rectangle of cells between two corners, inclusive.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct SpinRect {
    pub x1: usize,
    pub y1: usize,
    pub x2: usize,
    pub y2: usize,
}

impl SpinRect {
    /// The 1×1 rectangle on `(x, y)`.
    pub fn cell(x: usize, y: usize) -> SpinRect {
        SpinRect {
            x1: x,
            y1: y,
            x2: x,
            y2: y,
        }
    }

    #[inline]
    pub fn left(&self) -> usize {
        self.x1.min(self.x2)
    }

    #[inline]
    pub fn top(&self) -> usize {
        self.y1.min(self.y2)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.x1.abs_diff(self.x2) + 1
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.y1.abs_diff(self.y2) + 1
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.width() == self.height()
    }

    /// The square this rectangle selects, if it is one.
    pub fn square(&self) -> Option<Square> {
        self.is_square().then(|| Square {
            x: self.left(),
            y: self.top(),
            size: self.width(),
        })
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.left()
            && x < self.left() + self.width()
            && y >= self.top()
            && y < self.top() + self.height()
    }
}

/// Pointer input in pixels, relative to the same origin as [`BoardGeometry`].
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub enum PointerEvent {
    Click { x: f64, y: f64 },
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up { x: f64, y: f64 },
}

/// Where the board sits on screen.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct BoardGeometry {
    pub origin_x: f64,
    pub origin_y: f64,
    pub tile_size: f64,
    /// Board side in cells.
    pub size: usize,
}

impl BoardGeometry {
    pub fn new(size: usize, tile_size: f64) -> BoardGeometry {
        BoardGeometry {
            origin_x: 0.0,
            origin_y: 0.0,
            tile_size,
            size,
        }
    }

    pub fn with_origin(self, origin_x: f64, origin_y: f64) -> BoardGeometry {
        BoardGeometry {
            origin_x,
            origin_y,
            ..self
        }
    }

    fn tile(&self, px: f64, py: f64) -> (f64, f64) {
        (
            ((px - self.origin_x) / self.tile_size).floor(),
            ((py - self.origin_y) / self.tile_size).floor(),
        )
    }

    /// Cell under a pixel, or None off the board.
    pub fn cell_at(&self, px: f64, py: f64) -> Option<(usize, usize)> {
        let (cx, cy) = self.tile(px, py);
        let n = self.size as f64;
        if cx >= 0.0 && cy >= 0.0 && cx < n && cy < n {
            Some((cx as usize, cy as usize))
        } else {
            None
        }
    }

    /// Cell under a pixel, clamped to the nearest edge cell.
    pub fn clamped_cell_at(&self, px: f64, py: f64) -> (usize, usize) {
        let (cx, cy) = self.tile(px, py);
        let max = self.size.saturating_sub(1) as f64;
        (cx.clamp(0.0, max) as usize, cy.clamp(0.0, max) as usize)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
    Place,
    Spin {
        place_x: usize,
        place_y: usize,
        spin: SpinState,
        rect: Option<SpinRect>,
    },
}

/// Builds one move at a time for a board of fixed size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveBuilder {
    size: usize,
    phase: Phase,
}

impl MoveBuilder {
    pub fn new(size: usize) -> MoveBuilder {
        MoveBuilder {
            size,
            phase: Phase::Place,
        }
    }

    pub fn move_state(&self) -> MoveState {
        match self.phase {
            Phase::Place => MoveState::Place,
            Phase::Spin {
                place_x, place_y, ..
            } => MoveState::Spin { place_x, place_y },
        }
    }

    /// Spin gesture state; `Start` while still placing.
    pub fn spin_state(&self) -> SpinState {
        match self.phase {
            Phase::Place => SpinState::Start,
            Phase::Spin { spin, .. } => spin,
        }
    }

    /// Rectangle to highlight, if any.
    pub fn spin_rect(&self) -> Option<SpinRect> {
        match self.phase {
            Phase::Place => None,
            Phase::Spin { rect, .. } => rect,
        }
    }

    fn clamp(&self, x: usize, y: usize) -> (usize, usize) {
        let max = self.size.saturating_sub(1);
        (x.min(max), y.min(max))
    }

    // ========== Cell-level input ==========

    /// Choose the placement cell. Returns whether the click was taken.
    pub fn click(&mut self, grid: &Grid, x: usize, y: usize) -> bool {
        if self.phase != Phase::Place || !grid.is_empty(x, y) {
            return false;
        }
        self.phase = Phase::Spin {
            place_x: x,
            place_y: y,
            spin: SpinState::Start,
            rect: None,
        };
        true
    }

    pub fn pointer_down(&mut self, x: usize, y: usize) {
        let (x, y) = self.clamp(x, y);
        let Phase::Spin { spin, rect, .. } = &mut self.phase else {
            return;
        };
        match *spin {
            SpinState::Start => {
                *spin = SpinState::Drag { x1: x, y1: y };
                *rect = Some(SpinRect::cell(x, y));
            }
            SpinState::Preview => {
                *spin = SpinState::Cancel;
                *rect = None;
            }
            SpinState::Drag { .. } | SpinState::Cancel => {}
        }
    }

    pub fn pointer_move(&mut self, x: usize, y: usize) {
        let (x, y) = self.clamp(x, y);
        let Phase::Spin { spin, rect, .. } = &mut self.phase else {
            return;
        };
        match *spin {
            SpinState::Drag { x1, y1 } => {
                *rect = Some(SpinRect {
                    x1,
                    y1,
                    x2: x,
                    y2: y,
                });
            }
            // Hover highlight.
            SpinState::Start => *rect = Some(SpinRect::cell(x, y)),
            SpinState::Preview | SpinState::Cancel => {}
        }
    }

    pub fn pointer_up(&mut self) {
        let Phase::Spin { spin, rect, .. } = &mut self.phase else {
            return;
        };
        match *spin {
            SpinState::Cancel => *spin = SpinState::Start,
            SpinState::Drag { .. } => {
                if rect.is_some_and(|r| r.is_square()) {
                    *spin = SpinState::Preview;
                } else {
                    *spin = SpinState::Start;
                    *rect = None;
                }
            }
            SpinState::Start | SpinState::Preview => {}
        }
    }

    /// Emit the previewed move and start over. None unless previewing.
    pub fn confirm(&mut self) -> Option<Move> {
        let Phase::Spin {
            place_x,
            place_y,
            spin: SpinState::Preview,
            rect: Some(rect),
        } = self.phase
        else {
            return None;
        };
        let square = rect.square()?;

        self.phase = Phase::Place;
        Some(Move {
            place_x,
            place_y,
            spin_x: square.x,
            spin_y: square.y,
            spin_size: square.size,
            spin_direction: SpinDirection::Clockwise,
        })
    }

    /// Drop the pending placement and go back to placing.
    pub fn abandon(&mut self) {
        self.phase = Phase::Place;
    }

    // ========== Pixel-level input ==========

    /// Route a pointer event through `geometry`.
    pub fn handle(&mut self, event: PointerEvent, grid: &Grid, geometry: &BoardGeometry) {
        match event {
            PointerEvent::Click { x, y } => {
                if let Some((cx, cy)) = geometry.cell_at(x, y) {
                    self.click(grid, cx, cy);
                }
            }
            PointerEvent::Down { x, y } => {
                let (cx, cy) = geometry.clamped_cell_at(x, y);
                self.pointer_down(cx, cy);
            }
            PointerEvent::Move { x, y } => {
                let (cx, cy) = geometry.clamped_cell_at(x, y);
                self.pointer_move(cx, cy);
            }
            PointerEvent::Up { .. } => self.pointer_up(),
        }
    }

    // ========== Preview ==========

    /// The board to show while building: the pending stone placed, and spun
    /// once a square is previewed. `grid` itself is not modified.
    ///
    /// Falls back to `grid` when the pending placement no longer fits it,
    /// e.g. after a remote move landed mid-gesture.
    pub fn preview(&self, grid: &Grid, color: Color, label: &str) -> Grid {
        let Phase::Spin {
            place_x,
            place_y,
            spin,
            rect,
        } = self.phase
        else {
            return grid.clone();
        };
        if !grid.is_empty(place_x, place_y) {
            return grid.clone();
        }

        let placed = grid.place(place_x, place_y, Stone::new(color, label));
        match (spin, rect.and_then(|r| r.square())) {
            (SpinState::Preview, Some(square)) if square.fits(grid.size()) => placed.spin(square),
            _ => placed,
        }
    }
}
