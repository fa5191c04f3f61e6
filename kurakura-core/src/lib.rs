//! Kura Kura game logic.
//!
//! Kura Kura is five-in-a-row with a twist: after placing a stone, the player
//! spins a square region of the board a quarter turn clockwise, carrying every
//! stone inside it along.
//!
//! # Coordinates
//!
//! ```text
//! x = column (0..N, left to right)
//! y = row    (0..N, top to bottom)
//!
//! Cells are stored row-major (index = y * N + x):
//!
//!   (0,0) (1,0) (2,0)
//!   (0,1) (1,1) (2,1)
//!   (0,2) (1,2) (2,2)
//! ```
//!
//! # Spin
//!
//! Spinning the `n×n` square whose top-left cell is `(sx, sy)`:
//!
//! ```text
//! new[y][x] = rotate(old[sy + n - 1 - (x - sx)][sx + (y - sy)])
//!
//!   a b c        g d a
//!   d e f   ->   h e b
//!   g h i        i f c
//! ```
//!
//! `rotate` turns the stone in the cell by another 90° and carries the cell's
//! board lines around with it. A counter-clockwise spin is three clockwise
//! ones.
//!
//! # Winning
//!
//! A game is decided once `win_len` stones of one color line up along a row,
//! a column or a down-right diagonal. A spin can complete lines for both
//! players at once, which is a [`Outcome::DoubleWin`]. A full board with no
//! line is a [`Outcome::Stalemate`].
//!
//! # Diagrams
//!
//! Positions can be written one row per line, `.` for an empty cell and a digit
//! for the stone placed on that move (odd = Black, even = White):
//!
//! ```
//! use kurakura_core::{Color, Grid};
//!
//! let grid = Grid::from_diagram("..2\n.1.\n...").unwrap();
//! assert_eq!(grid.stone(1, 1).unwrap().color, Color::Black);
//! assert_eq!(grid.stone(2, 0).unwrap().label, "2");
//! ```

pub mod builder;
pub mod protocol;
pub mod render;
pub mod turn;

#[cfg(feature = "wasm")]
pub mod wasm;

use std::str::FromStr;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

pub use builder::{BoardGeometry, MoveBuilder, MoveState, PointerEvent, SpinRect, SpinState};
pub use protocol::{Reply, Request, RequestError, Response, TurnDetails};
pub use turn::{AcceptedTurn, Offline, TurnLoop, TurnSink, TurnState};

/// Board side used by the web client.
pub const DEFAULT_BOARD_SIZE: usize = 6;

/// Stones in a row needed to win.
pub const DEFAULT_WIN_LEN: usize = 5;

/// Row, column and down-right diagonal.
const WIN_DIRECTIONS: [(usize, usize); 3] = [(1, 0), (0, 1), (1, 1)];

/// Stone color. Black always opens.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
}

impl Color {
    /// Get the opponent color.
    #[inline]
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Color of the stone placed on move `move_number` (1-based).
    #[inline]
    pub fn for_move(move_number: u32) -> Color {
        if move_number % 2 == 1 {
            Color::Black
        } else {
            Color::White
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display("unknown color {input:?}")]
pub struct ParseColorError {
    pub input: String,
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "black" => Ok(Color::Black),
            "white" => Ok(Color::White),
            _ => Err(ParseColorError {
                input: s.to_string(),
            }),
        }
    }
}

/// A stone on the board.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct Stone {
    pub color: Color,
    /// Number of the move that placed this stone.
    pub label: String,
    /// Orientation in degrees: 0, 90, 180 or 270.
    pub rotation: u16,
}

fn is_quarter_turn(rotation: u16) -> bool {
    rotation < 360 && rotation % 90 == 0
}

impl Stone {
    /// A freshly placed, unrotated stone.
    pub fn new(color: Color, label: impl Into<String>) -> Stone {
        Stone {
            color,
            label: label.into(),
            rotation: 0,
        }
    }

    /// The same stone after a quarter turn clockwise.
    #[inline]
    pub fn spun(&self) -> Stone {
        Stone {
            rotation: (self.rotation % 360 + 90) % 360,
            ..self.clone()
        }
    }
}

/// Board lines drawn from the center of a cell towards its edges.
///
/// On a fresh board a cell has a line towards every neighbor; after spins the
/// lines travel with their cell. Purely decorative.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default, Serialize, Deserialize)]
pub struct Lines {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Lines {
    /// Lines for cell `(x, y)` of a fresh `size×size` board.
    pub fn for_cell(x: usize, y: usize, size: usize) -> Lines {
        Lines {
            top: y > 0,
            right: x + 1 < size,
            bottom: y + 1 < size,
            left: x > 0,
        }
    }

    /// Quarter turn clockwise: top -> right -> bottom -> left -> top.
    #[inline]
    pub fn spun(self) -> Lines {
        Lines {
            top: self.left,
            right: self.top,
            bottom: self.right,
            left: self.bottom,
        }
    }
}

/// One board cell.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    pub stone: Option<Stone>,
    pub lines: Lines,
}

impl Cell {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stone.is_none()
    }

    fn spun(&self) -> Cell {
        Cell {
            stone: self.stone.as_ref().map(Stone::spun),
            lines: self.lines.spun(),
        }
    }
}

/// A square region of the board, by top-left cell and side length.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct Square {
    pub x: usize,
    pub y: usize,
    pub size: usize,
}

impl Square {
    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.x + self.size && y >= self.y && y < self.y + self.size
    }

    /// Check the square is non-empty and lies entirely on a `board_size` board.
    pub fn fits(&self, board_size: usize) -> bool {
        let within = |start: usize| {
            start
                .checked_add(self.size)
                .is_some_and(|end| end <= board_size)
        };
        self.size >= 1 && within(self.x) && within(self.y)
    }
}

/// Which way a square spins.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default, Serialize, Deserialize)]
pub enum SpinDirection {
    #[default]
    #[serde(rename = "CW")]
    Clockwise,
    #[serde(rename = "CCW")]
    CounterClockwise,
}

/// A complete move: where the stone goes and which square spins.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub place_x: usize,
    pub place_y: usize,
    pub spin_x: usize,
    pub spin_y: usize,
    pub spin_size: usize,
    /// Moves from the builder always spin clockwise.
    #[serde(default)]
    pub spin_direction: SpinDirection,
}

impl Move {
    /// The square this move spins.
    #[inline]
    pub fn spin(&self) -> Square {
        Square {
            x: self.spin_x,
            y: self.spin_y,
            size: self.spin_size,
        }
    }

    /// Check that this move can be applied to `grid`.
    ///
    /// Moves built by [`MoveBuilder`] always pass; moves arriving from a peer
    /// must be checked before they reach [`Grid::apply_move`].
    pub fn check(&self, grid: &Grid) -> Result<(), MoveError> {
        let size = grid.size();
        if !grid.in_bounds(self.place_x, self.place_y) {
            return Err(MoveError::PlacementOutOfBounds {
                x: self.place_x,
                y: self.place_y,
                size,
            });
        }
        if !grid.is_empty(self.place_x, self.place_y) {
            return Err(MoveError::CellOccupied {
                x: self.place_x,
                y: self.place_y,
            });
        }
        if self.spin_size == 0 {
            return Err(MoveError::EmptySpin);
        }
        if !self.spin().fits(size) {
            return Err(MoveError::SpinOutOfBounds {
                x: self.spin_x,
                y: self.spin_y,
                spin_size: self.spin_size,
                size,
            });
        }
        Ok(())
    }
}

/// Why a move cannot be applied.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Error, Serialize, Deserialize)]
pub enum MoveError {
    #[display("placement ({x}, {y}) is off the {size}x{size} board")]
    PlacementOutOfBounds { x: usize, y: usize, size: usize },
    #[display("cell ({x}, {y}) already holds a stone")]
    CellOccupied { x: usize, y: usize },
    #[display("spin square must be at least 1x1")]
    EmptySpin,
    #[display("{spin_size}x{spin_size} spin at ({x}, {y}) does not fit the {size}x{size} board")]
    SpinOutOfBounds {
        x: usize,
        y: usize,
        spin_size: usize,
        size: usize,
    },
    #[display("the game is already over")]
    GameOver,
}

/// How a game ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Outcome {
    BlackWin,
    WhiteWin,
    /// One spin completed a line for each player.
    DoubleWin,
    /// Full board, no line.
    Stalemate,
}

impl Outcome {
    pub fn won_by(color: Color) -> Outcome {
        match color {
            Color::Black => Outcome::BlackWin,
            Color::White => Outcome::WhiteWin,
        }
    }

    /// The single winner, if there is one.
    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::BlackWin => Some(Color::Black),
            Outcome::WhiteWin => Some(Color::White),
            Outcome::DoubleWin | Outcome::Stalemate => None,
        }
    }
}

/// Why a diagram could not be read.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
pub enum DiagramError {
    #[display("diagram has no rows")]
    Empty,
    #[display("row {row} has {width} cells, expected {size}")]
    NotSquare { row: usize, width: usize, size: usize },
    #[display("unknown symbol {symbol:?} at row {row}, column {col}")]
    UnknownSymbol { row: usize, col: usize, symbol: char },
}

/// Why a list of rows is not a board.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
pub enum GridShapeError {
    #[display("grid has no rows")]
    Empty,
    #[display("row {row} has {width} cells, expected {size}")]
    Ragged { row: usize, width: usize, size: usize },
    #[display("stone at row {row}, column {col} has rotation {rotation}")]
    BadRotation { row: usize, col: usize, rotation: u16 },
}

/// Square board of cells.
///
/// The engine never edits a grid in place: [`Grid::place`], [`Grid::spin`] and
/// [`Grid::apply_move`] return a new grid and leave `self` untouched, so a
/// preview can be computed against the committed board at any time.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<Cell>>", try_from = "Vec<Vec<Cell>>")]
pub struct Grid {
    size: usize,
    /// Row-major (y * size + x).
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an empty `size×size` board.
    pub fn new(size: usize) -> Grid {
        assert!(size > 0, "board size must be at least 1");
        let mut cells = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                cells.push(Cell {
                    stone: None,
                    lines: Lines::for_cell(x, y, size),
                });
            }
        }
        Grid { size, cells }
    }

    /// Side length of the board.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(self.in_bounds(x, y));
        y * self.size + x
    }

    #[inline]
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size
    }

    /// Get cell at `(x, y)`, or None if out of bounds.
    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// Get the stone at `(x, y)`, if any.
    pub fn stone(&self, x: usize, y: usize) -> Option<&Stone> {
        self.cell(x, y).and_then(|cell| cell.stone.as_ref())
    }

    /// Check `(x, y)` is on the board and holds no stone.
    #[inline]
    pub fn is_empty(&self, x: usize, y: usize) -> bool {
        self.cell(x, y).is_some_and(Cell::is_empty)
    }

    /// Rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.cells.chunks(self.size)
    }

    /// All stones with their coordinates, row by row.
    pub fn stones(&self) -> impl Iterator<Item = (usize, usize, &Stone)> + '_ {
        self.cells.iter().enumerate().filter_map(|(idx, cell)| {
            cell.stone
                .as_ref()
                .map(|stone| (idx % self.size, idx / self.size, stone))
        })
    }

    /// Number of stones on the board.
    pub fn stone_count(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }

    // ========== Place & Spin ==========

    /// A copy of this board with `stone` placed at `(x, y)`.
    ///
    /// Panics if the cell is off the board or already taken; callers check
    /// with [`Grid::is_empty`] or [`Move::check`] first.
    pub fn place(&self, x: usize, y: usize, stone: Stone) -> Grid {
        assert!(
            self.in_bounds(x, y),
            "placement ({x}, {y}) is off the {0}x{0} board",
            self.size
        );
        let idx = self.index(x, y);
        assert!(
            self.cells[idx].is_empty(),
            "cell ({x}, {y}) already holds a stone"
        );

        let mut cells = self.cells.clone();
        cells[idx].stone = Some(stone);
        Grid {
            size: self.size,
            cells,
        }
    }

    /// A copy of this board with `square` turned a quarter clockwise.
    ///
    /// Panics if the square is empty or does not fit on the board.
    pub fn spin(&self, square: Square) -> Grid {
        assert!(
            square.fits(self.size),
            "{0}x{0} spin at ({1}, {2}) does not fit the {3}x{3} board",
            square.size,
            square.x,
            square.y,
            self.size
        );
        let Square {
            x: sx,
            y: sy,
            size: n,
        } = square;

        let mut cells = Vec::with_capacity(self.cells.len());
        for y in 0..self.size {
            for x in 0..self.size {
                let cell = if square.contains(x, y) {
                    let src_row = sy + n - 1 - (x - sx);
                    let src_col = sx + (y - sy);
                    self.cells[self.index(src_col, src_row)].spun()
                } else {
                    self.cells[self.index(x, y)].clone()
                };
                cells.push(cell);
            }
        }

        Grid {
            size: self.size,
            cells,
        }
    }

    /// A copy of this board with `square` turned a quarter counter-clockwise.
    pub fn spin_ccw(&self, square: Square) -> Grid {
        self.spin(square).spin(square).spin(square)
    }

    /// Spin `square` a quarter turn towards `direction`.
    pub fn spin_toward(&self, square: Square, direction: SpinDirection) -> Grid {
        match direction {
            SpinDirection::Clockwise => self.spin(square),
            SpinDirection::CounterClockwise => self.spin_ccw(square),
        }
    }

    /// Play `mov` for `color`: place a stone labelled `label`, then spin.
    ///
    /// Panics if the move breaks [`Move::check`].
    pub fn apply_move(&self, mov: &Move, color: Color, label: impl Into<String>) -> Grid {
        self.place(mov.place_x, mov.place_y, Stone::new(color, label))
            .spin_toward(mov.spin(), mov.spin_direction)
    }

    // ========== Outcome ==========

    /// Cells on a line of `win_len` same-colored stones, row by row.
    pub fn winning_cells(&self, win_len: usize) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        if win_len == 0 || win_len > self.size {
            return cells;
        }

        for (x, y, first) in self.stones() {
            for (dx, dy) in WIN_DIRECTIONS {
                let reach = win_len - 1;
                if !self.in_bounds(x + dx * reach, y + dy * reach) {
                    continue;
                }
                let line = (1..win_len).all(|i| {
                    self.stone(x + dx * i, y + dy * i)
                        .is_some_and(|stone| stone.color == first.color)
                });
                if line {
                    cells.extend((0..win_len).map(|i| (x + dx * i, y + dy * i)));
                }
            }
        }

        cells.sort_by_key(|&(x, y)| (y, x));
        cells.dedup();
        cells
    }

    /// Result of the game on this board, or None while it is still open.
    pub fn outcome(&self, win_len: usize) -> Option<Outcome> {
        let winners = self.winning_cells(win_len);
        let mut colors = winners
            .iter()
            .filter_map(|&(x, y)| self.stone(x, y))
            .map(|stone| stone.color);

        match colors.next() {
            Some(first) if colors.all(|color| color == first) => Some(Outcome::won_by(first)),
            Some(_) => Some(Outcome::DoubleWin),
            None if self.stone_count() == self.cells.len() => Some(Outcome::Stalemate),
            None => None,
        }
    }

    // ========== Diagrams ==========

    /// Read a board from its diagram (see the crate docs).
    pub fn from_diagram(text: &str) -> Result<Grid, DiagramError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if rows.is_empty() {
            return Err(DiagramError::Empty);
        }

        let size = rows.len();
        let mut grid = Grid::new(size);

        for (y, row) in rows.iter().enumerate() {
            let width = row.chars().count();
            if width != size {
                return Err(DiagramError::NotSquare {
                    row: y,
                    width,
                    size,
                });
            }

            for (x, symbol) in row.chars().enumerate() {
                match symbol {
                    '.' => {}
                    '1'..='9' => {
                        let number = symbol as u32 - '0' as u32;
                        let idx = grid.index(x, y);
                        grid.cells[idx].stone =
                            Some(Stone::new(Color::for_move(number), symbol.to_string()));
                    }
                    _ => {
                        return Err(DiagramError::UnknownSymbol {
                            row: y,
                            col: x,
                            symbol,
                        })
                    }
                }
            }
        }

        Ok(grid)
    }
}

impl From<Grid> for Vec<Vec<Cell>> {
    fn from(grid: Grid) -> Self {
        grid.rows().map(<[Cell]>::to_vec).collect()
    }
}

impl TryFrom<Vec<Vec<Cell>>> for Grid {
    type Error = GridShapeError;

    fn try_from(rows: Vec<Vec<Cell>>) -> Result<Self, Self::Error> {
        let size = rows.len();
        if size == 0 {
            return Err(GridShapeError::Empty);
        }

        let mut cells = Vec::with_capacity(size * size);
        for (row, cells_in_row) in rows.into_iter().enumerate() {
            if cells_in_row.len() != size {
                return Err(GridShapeError::Ragged {
                    row,
                    width: cells_in_row.len(),
                    size,
                });
            }
            for (col, cell) in cells_in_row.iter().enumerate() {
                if let Some(stone) = &cell.stone {
                    if !is_quarter_turn(stone.rotation) {
                        return Err(GridShapeError::BadRotation {
                            row,
                            col,
                            rotation: stone.rotation,
                        });
                    }
                }
            }
            cells.extend(cells_in_row);
        }

        Ok(Grid { size, cells })
    }
}


#[cfg(test)]
mod tests {
    use rand::prelude::*;

    use super::testutil::{random_grid, random_move};
    use super::*;

    fn mv(place: (usize, usize), spin: (usize, usize), spin_size: usize) -> Move {
        Move {
            place_x: place.0,
            place_y: place.1,
            spin_x: spin.0,
            spin_y: spin.1,
            spin_size,
            spin_direction: SpinDirection::Clockwise,
        }
    }

    #[test]
    fn test_color_opponent() {
        assert_eq!(Color::Black.opponent(), Color::White);
        assert_eq!(Color::White.opponent(), Color::Black);
    }

    #[test]
    fn test_color_for_move() {
        assert_eq!(Color::for_move(1), Color::Black);
        assert_eq!(Color::for_move(2), Color::White);
        assert_eq!(Color::for_move(9), Color::Black);
    }

    #[test]
    fn test_color_from_str() {
        assert_eq!("black".parse::<Color>(), Ok(Color::Black));
        assert_eq!("White".parse::<Color>(), Ok(Color::White));
        assert!("red".parse::<Color>().is_err());
    }

    #[test]
    fn test_stone_spun_wraps() {
        let mut stone = Stone::new(Color::Black, "1");
        for expected in [90, 180, 270, 0] {
            stone = stone.spun();
            assert_eq!(stone.rotation, expected);
        }
        assert_eq!(stone.label, "1");
        assert_eq!(stone.color, Color::Black);
    }

    // ========== Board Lines ==========

    #[test]
    fn test_lines_for_cell() {
        let corner = Lines::for_cell(0, 0, 6);
        assert_eq!(
            corner,
            Lines {
                top: false,
                right: true,
                bottom: true,
                left: false
            }
        );

        let edge = Lines::for_cell(5, 3, 6);
        assert!(edge.top && edge.bottom && edge.left && !edge.right);

        let interior = Lines::for_cell(2, 3, 6);
        assert!(interior.top && interior.right && interior.bottom && interior.left);

        assert_eq!(Lines::for_cell(0, 0, 1), Lines::default());
    }

    #[test]
    fn test_lines_spun_cycle() {
        let top_only = Lines {
            top: true,
            ..Lines::default()
        };
        let once = top_only.spun();
        assert!(once.right && !once.top && !once.bottom && !once.left);
        assert!(once.spun().bottom);
        assert!(once.spun().spun().left);
        assert_eq!(once.spun().spun().spun(), top_only);
    }

    // ========== Grid ==========

    #[test]
    fn test_new_grid_is_empty() {
        let grid = Grid::new(6);
        assert_eq!(grid.size(), 6);
        assert_eq!(grid.stone_count(), 0);
        for y in 0..6 {
            for x in 0..6 {
                assert!(grid.is_empty(x, y));
            }
        }
        assert!(!grid.is_empty(6, 0));
        assert!(grid.cell(0, 6).is_none());
    }

    #[test]
    fn test_place_sets_stone_without_touching_input() {
        let grid = Grid::new(4);
        let placed = grid.place(1, 2, Stone::new(Color::White, "2"));

        assert_eq!(grid.stone_count(), 0);
        assert_eq!(placed.stone_count(), 1);
        assert_eq!(placed.stone(1, 2), Some(&Stone::new(Color::White, "2")));
        assert_eq!(placed.cell(1, 2).unwrap().lines, grid.cell(1, 2).unwrap().lines);
    }

    #[test]
    #[should_panic(expected = "already holds a stone")]
    fn test_place_on_occupied_cell_panics() {
        let grid = Grid::new(3).place(0, 0, Stone::new(Color::Black, "1"));
        grid.place(0, 0, Stone::new(Color::White, "2"));
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_spin_out_of_bounds_panics() {
        Grid::new(4).spin(Square { x: 2, y: 2, size: 3 });
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_spin_empty_square_panics() {
        Grid::new(4).spin(Square { x: 0, y: 0, size: 0 });
    }

    #[test]
    fn test_stones_iterates_with_coordinates() {
        let grid = Grid::from_diagram("1..\n..2\n.3.").unwrap();
        let found: Vec<(usize, usize, &str)> = grid
            .stones()
            .map(|(x, y, stone)| (x, y, stone.label.as_str()))
            .collect();
        assert_eq!(found, vec![(0, 0, "1"), (2, 1, "2"), (1, 2, "3")]);
    }

    // ========== Spin ==========

    #[test]
    fn test_spin_1x1_turns_stone_in_place() {
        let grid = Grid::from_diagram("...\n.1.\n...").unwrap();
        let spun = grid.spin(Square { x: 1, y: 1, size: 1 });

        assert_eq!(spun.stone(1, 1).unwrap().rotation, 90);
        assert_eq!(spun.stone_count(), 1);
    }

    #[test]
    fn test_spin_2x2_clockwise() {
        // 1 2      3 1
        // 3 4  ->  4 2
        let grid = Grid::from_diagram("12\n34").unwrap();
        let spun = grid.spin(Square { x: 0, y: 0, size: 2 });

        assert_eq!(spun.stone(0, 0).unwrap().label, "3");
        assert_eq!(spun.stone(1, 0).unwrap().label, "1");
        assert_eq!(spun.stone(0, 1).unwrap().label, "4");
        assert_eq!(spun.stone(1, 1).unwrap().label, "2");
        assert!(spun.stones().all(|(_, _, stone)| stone.rotation == 90));
    }

    #[test]
    fn test_spin_full_board_matches_formula() {
        let grid = Grid::from_diagram("1.2\n...\n3..").unwrap();
        let spun = grid.spin(Square { x: 0, y: 0, size: 3 });

        // Top row is the old left column read bottom-up.
        assert_eq!(spun.stone(0, 0).unwrap().label, "3");
        assert!(spun.stone(1, 0).is_none());
        assert_eq!(spun.stone(2, 0).unwrap().label, "1");
        // Old top-right corner lands in the bottom-right corner.
        assert_eq!(spun.stone(2, 2).unwrap().label, "2");
        assert_eq!(spun.stone_count(), 3);
    }

    #[test]
    fn test_spin_carries_lines() {
        // The top-left corner of a 2x2 board has lines right and down; after
        // a full-board spin it sits in the top-right corner with lines down
        // and left.
        let spun = Grid::new(2).spin(Square { x: 0, y: 0, size: 2 });
        let lines = spun.cell(1, 0).unwrap().lines;
        assert_eq!(
            lines,
            Lines {
                top: false,
                right: false,
                bottom: true,
                left: true
            }
        );
        // A full-board spin of a fresh board reproduces the fresh layout.
        assert_eq!(spun, Grid::new(2));
    }

    #[test]
    fn test_spin_does_not_mutate_input() {
        let grid = Grid::from_diagram("12.\n...\n...").unwrap();
        let before = grid.clone();
        let _ = grid.spin(Square { x: 0, y: 0, size: 2 });
        assert_eq!(grid, before);
    }

    #[test]
    fn test_spin_four_times_is_identity() {
        let mut rng = rand::rng();

        for _ in 0..200 {
            let size = rng.random_range(1..=7);
            let grid = random_grid(&mut rng, size, 0.5);
            let n = rng.random_range(1..=size);
            let square = Square {
                x: rng.random_range(0..=size - n),
                y: rng.random_range(0..=size - n),
                size: n,
            };

            let mut spun = grid.clone();
            for k in 1..=4u16 {
                spun = spun.spin(square);
                for (x, y, stone) in spun.stones() {
                    if !square.contains(x, y) {
                        continue;
                    }
                    // Find where the stone started by its unique label.
                    let (_, _, before) = grid
                        .stones()
                        .find(|(_, _, s)| s.label == stone.label)
                        .unwrap();
                    assert_eq!(stone.rotation, (before.rotation + 90 * k) % 360);
                }
            }
            assert_eq!(spun, grid, "four spins of {:?} must be the identity", square);
        }
    }

    #[test]
    fn test_spin_leaves_outside_cells_untouched() {
        let mut rng = rand::rng();

        for _ in 0..200 {
            let size = rng.random_range(1..=8);
            let grid = random_grid(&mut rng, size, 0.4);
            let n = rng.random_range(1..=size);
            let square = Square {
                x: rng.random_range(0..=size - n),
                y: rng.random_range(0..=size - n),
                size: n,
            };
            let spun = grid.spin(square);

            for y in 0..size {
                for x in 0..size {
                    if !square.contains(x, y) {
                        assert_eq!(spun.cell(x, y), grid.cell(x, y));
                    }
                }
            }
        }
    }

    #[test]
    fn test_spin_ccw_is_three_clockwise_spins() {
        let mut rng = rand::rng();

        for _ in 0..200 {
            let size = rng.random_range(1..=7);
            let grid = random_grid(&mut rng, size, 0.5);
            let n = rng.random_range(1..=size);
            let square = Square {
                x: rng.random_range(0..=size - n),
                y: rng.random_range(0..=size - n),
                size: n,
            };

            let ccw = grid.spin_ccw(square);
            assert_eq!(ccw, grid.spin(square).spin(square).spin(square));
            assert_eq!(ccw.spin(square), grid);
            assert_eq!(grid.spin_toward(square, SpinDirection::CounterClockwise), ccw);
            assert_eq!(grid.spin_toward(square, SpinDirection::Clockwise), grid.spin(square));

            for (x, y, stone) in ccw.stones() {
                if !square.contains(x, y) {
                    continue;
                }
                let (_, _, before) = grid
                    .stones()
                    .find(|(_, _, s)| s.label == stone.label)
                    .unwrap();
                assert_eq!(stone.rotation, (before.rotation + 270) % 360);
            }
        }
    }

    #[test]
    fn test_spin_2x2_counter_clockwise() {
        // 1 2      2 4
        // 3 4  ->  1 3
        let grid = Grid::from_diagram("12\n34").unwrap();
        let spun = grid.spin_ccw(Square { x: 0, y: 0, size: 2 });

        assert_eq!(spun.stone(0, 0).unwrap().label, "2");
        assert_eq!(spun.stone(1, 0).unwrap().label, "4");
        assert_eq!(spun.stone(0, 1).unwrap().label, "1");
        assert_eq!(spun.stone(1, 1).unwrap().label, "3");
        assert!(spun.stones().all(|(_, _, stone)| stone.rotation == 270));
    }

    // ========== Apply Move ==========

    #[test]
    fn test_apply_move_adds_exactly_one_stone() {
        let mut rng = rand::rng();

        for _ in 0..300 {
            let size = rng.random_range(1..=7);
            let grid = random_grid(&mut rng, size, 0.3);
            let Some(mov) = random_move(&mut rng, &grid) else {
                continue;
            };

            let next = grid.apply_move(&mov, Color::Black, "new");
            assert_eq!(next.stone_count(), grid.stone_count() + 1);

            let placed: Vec<_> = next
                .stones()
                .filter(|(_, _, stone)| stone.label == "new")
                .collect();
            assert_eq!(placed.len(), 1);

            let (x, y, stone) = placed[0];
            if mov.spin().contains(mov.place_x, mov.place_y) {
                assert_eq!(stone.rotation, 90);
                assert!(mov.spin().contains(x, y));
            } else {
                assert_eq!(stone.rotation, 0);
                assert_eq!((x, y), (mov.place_x, mov.place_y));
            }
        }
    }

    #[test]
    fn test_apply_move_place_inside_spin() {
        // Place at the top-left of a 2x2 spin: the new stone ends up
        // top-right, turned once.
        let grid = Grid::new(3);
        let next = grid.apply_move(&mv((0, 0), (0, 0), 2), Color::Black, "1");

        assert!(next.stone(0, 0).is_none());
        let stone = next.stone(1, 0).unwrap();
        assert_eq!(stone.label, "1");
        assert_eq!(stone.rotation, 90);
    }

    #[test]
    fn test_apply_move_counter_clockwise() {
        let mov = Move {
            spin_direction: SpinDirection::CounterClockwise,
            ..mv((0, 0), (0, 0), 2)
        };
        let next = Grid::new(3).apply_move(&mov, Color::Black, "1");

        // Top-left goes to bottom-left when turning counter-clockwise.
        assert!(next.stone(0, 0).is_none());
        let stone = next.stone(0, 1).unwrap();
        assert_eq!(stone.label, "1");
        assert_eq!(stone.rotation, 270);
    }

    // ========== Outcome ==========

    #[test]
    fn test_open_board_has_no_outcome() {
        let grid = Grid::from_diagram(
            "
            1357..
            ......
            ......
            ......
            ......
            ......
            ",
        )
        .unwrap();
        assert_eq!(grid.outcome(5), None);
        assert!(grid.winning_cells(5).is_empty());
        assert_eq!(grid.outcome(4), Some(Outcome::BlackWin));
    }

    #[test]
    fn test_row_column_and_diagonal_win() {
        let row = Grid::from_diagram("...\n246\n...").unwrap();
        assert_eq!(row.outcome(3), Some(Outcome::WhiteWin));
        assert_eq!(row.winning_cells(3), vec![(0, 1), (1, 1), (2, 1)]);

        let column = Grid::from_diagram("..1\n..3\n..5").unwrap();
        assert_eq!(column.outcome(3), Some(Outcome::BlackWin));
        assert_eq!(column.winning_cells(3), vec![(2, 0), (2, 1), (2, 2)]);

        let diagonal = Grid::from_diagram("1..\n.3.\n..5").unwrap();
        assert_eq!(diagonal.outcome(3), Some(Outcome::BlackWin));
        assert_eq!(diagonal.winning_cells(3), vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn test_anti_diagonal_does_not_win() {
        let grid = Grid::from_diagram("..1\n.3.\n5..").unwrap();
        assert_eq!(grid.outcome(3), None);
    }

    #[test]
    fn test_longer_line_marks_every_stone() {
        let grid = Grid::from_diagram("1357\n....\n....\n....").unwrap();
        assert_eq!(
            grid.winning_cells(3),
            vec![(0, 0), (1, 0), (2, 0), (3, 0)]
        );
    }

    #[test]
    fn test_double_win() {
        let grid = Grid::from_diagram("135\n...\n246").unwrap();
        assert_eq!(grid.outcome(3), Some(Outcome::DoubleWin));
        assert_eq!(grid.winning_cells(3).len(), 6);
        assert_eq!(Outcome::DoubleWin.winner(), None);
    }

    #[test]
    fn test_full_board_stalemate() {
        // x x o
        // o o x
        // x x o
        let grid = Grid::from_diagram("132\n465\n798").unwrap();
        assert_eq!(grid.outcome(3), Some(Outcome::Stalemate));
        assert_eq!(grid.outcome(4), Some(Outcome::Stalemate));
        assert_eq!(Grid::from_diagram("1").unwrap().outcome(1), Some(Outcome::BlackWin));
    }

    #[test]
    fn test_spin_can_complete_a_line() {
        // Spinning the top-left 2x2 lines up three blacks on the top row.
        let grid = Grid::from_diagram("1.5\n3..\n...").unwrap();
        assert_eq!(grid.outcome(3), None);
        let spun = grid.spin(Square { x: 0, y: 0, size: 2 });
        assert_eq!(spun.outcome(3), Some(Outcome::BlackWin));
        assert_eq!(Outcome::BlackWin.winner(), Some(Color::Black));
    }

    // ========== Move Validation ==========

    #[test]
    fn test_move_check_accepts_legal_move() {
        let grid = Grid::from_diagram("1..\n...\n...").unwrap();
        assert_eq!(mv((1, 1), (0, 0), 3).check(&grid), Ok(()));
        assert_eq!(mv((2, 2), (2, 2), 1).check(&grid), Ok(()));
    }

    #[test]
    fn test_move_check_errors() {
        let grid = Grid::from_diagram("1..\n...\n...").unwrap();

        assert_eq!(
            mv((3, 0), (0, 0), 1).check(&grid),
            Err(MoveError::PlacementOutOfBounds { x: 3, y: 0, size: 3 })
        );
        assert_eq!(
            mv((0, 0), (0, 0), 1).check(&grid),
            Err(MoveError::CellOccupied { x: 0, y: 0 })
        );
        assert_eq!(
            mv((1, 1), (0, 0), 0).check(&grid),
            Err(MoveError::EmptySpin)
        );
        assert_eq!(
            mv((1, 1), (1, 1), 3).check(&grid),
            Err(MoveError::SpinOutOfBounds {
                x: 1,
                y: 1,
                spin_size: 3,
                size: 3
            })
        );
        assert!(mv((1, 1), (usize::MAX, 0), 2).check(&grid).is_err());
    }

    #[test]
    fn test_move_error_display() {
        let err = MoveError::CellOccupied { x: 2, y: 4 };
        assert_eq!(err.to_string(), "cell (2, 4) already holds a stone");
    }

    // ========== Diagrams ==========

    #[test]
    fn test_from_diagram_colors_by_parity() {
        let grid = Grid::from_diagram(
            "
            12
            3.
            ",
        )
        .unwrap();
        assert_eq!(grid.size(), 2);
        assert_eq!(grid.stone(0, 0).unwrap().color, Color::Black);
        assert_eq!(grid.stone(1, 0).unwrap().color, Color::White);
        assert_eq!(grid.stone(0, 1).unwrap().color, Color::Black);
        assert!(grid.stone(1, 1).is_none());
        assert!(grid.stones().all(|(_, _, s)| s.rotation == 0));
        assert_eq!(grid.cell(1, 1).unwrap().lines, Lines::for_cell(1, 1, 2));
    }

    #[test]
    fn test_from_diagram_errors() {
        assert_eq!(Grid::from_diagram(""), Err(DiagramError::Empty));
        assert_eq!(
            Grid::from_diagram("..\n..."),
            Err(DiagramError::NotSquare {
                row: 1,
                width: 3,
                size: 2
            })
        );
        assert_eq!(
            Grid::from_diagram(".x\n.."),
            Err(DiagramError::UnknownSymbol {
                row: 0,
                col: 1,
                symbol: 'x'
            })
        );
        assert!(Grid::from_diagram("0.\n..").is_err());
    }

    // ========== Serialization ==========

    #[test]
    fn test_grid_json_roundtrip_keeps_rotation() {
        let grid = Grid::from_diagram("12.\n...\n..3")
            .unwrap()
            .spin(Square { x: 0, y: 0, size: 2 })
            .spin(Square { x: 1, y: 0, size: 1 });

        let json = serde_json::to_string(&grid).unwrap();
        let back: Grid = serde_json::from_str(&json).unwrap();

        assert_eq!(back, grid);
        assert_eq!(back.stone(1, 0).unwrap().rotation, 180);
    }

    #[test]
    fn test_grid_json_shape() {
        let grid = Grid::new(1).place(0, 0, Stone::new(Color::White, "2"));
        let value = serde_json::to_value(&grid).unwrap();
        assert_eq!(
            value,
            serde_json::json!([[{
                "stone": {"color": "white", "label": "2", "rotation": 0},
                "lines": {"top": false, "right": false, "bottom": false, "left": false}
            }]])
        );
    }

    #[test]
    fn test_grid_deserialize_rejects_ragged_rows() {
        let cell = serde_json::json!({"stone": null, "lines": {"top": false, "right": false, "bottom": false, "left": false}});
        let ragged = serde_json::json!([[cell, cell], [cell]]);
        assert!(serde_json::from_value::<Grid>(ragged).is_err());
        assert!(serde_json::from_value::<Grid>(serde_json::json!([])).is_err());
    }

    #[test]
    fn test_move_json_uses_camel_case() {
        let value = serde_json::to_value(mv((1, 2), (0, 1), 3)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "placeX": 1, "placeY": 2, "spinX": 0, "spinY": 1, "spinSize": 3,
                "spinDirection": "CW"
            })
        );

        // Older payloads without a direction spin clockwise.
        let bare: Move = serde_json::from_value(serde_json::json!(
            {"placeX": 1, "placeY": 2, "spinX": 0, "spinY": 1, "spinSize": 3}
        ))
        .unwrap();
        assert_eq!(bare, mv((1, 2), (0, 1), 3));
    }

    #[test]
    fn test_grid_deserialize_rejects_bad_rotation() {
        let lines = serde_json::json!({"top": false, "right": false, "bottom": false, "left": false});
        let with_rotation = |rotation: u32| {
            serde_json::json!([[{
                "stone": {"color": "black", "label": "1", "rotation": rotation},
                "lines": lines
            }]])
        };

        let err = Grid::try_from(vec![vec![Cell {
            stone: Some(Stone {
                rotation: 65500,
                ..Stone::new(Color::Black, "1")
            }),
            lines: Lines::default(),
        }]])
        .unwrap_err();
        assert_eq!(
            err,
            GridShapeError::BadRotation {
                row: 0,
                col: 0,
                rotation: 65500
            }
        );

        assert!(serde_json::from_value::<Grid>(with_rotation(65500)).is_err());
        assert!(serde_json::from_value::<Grid>(with_rotation(45)).is_err());
        assert!(serde_json::from_value::<Grid>(with_rotation(360)).is_err());
        let grid: Grid = serde_json::from_value(with_rotation(270)).unwrap();
        assert_eq!(grid.spin(Square { x: 0, y: 0, size: 1 }).stone(0, 0).unwrap().rotation, 0);
    }

    #[test]
    fn test_stone_spun_never_overflows() {
        let stone = Stone {
            rotation: u16::MAX,
            ..Stone::new(Color::White, "2")
        };
        assert!(stone.spun().rotation < 360);
    }
}
