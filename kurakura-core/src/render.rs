//! Text rendering of a board.
//!
//! Each cell is four columns wide. Stones show their color (`x` Black,
//! `o` White), their label and the way they face; empty cells show the board
//! lines meeting in them.
//!
//! ```text
//! x 1↑  ┬   ┐
//!   ├ o 2→  ┤
//!   └   ┴ x 3↓
//! ```

use std::fmt;

use crate::{Cell, Color, Grid, Lines, Stone};

fn arrow(rotation: u16) -> char {
    match rotation % 360 {
        90 => '→',
        180 => '↓',
        270 => '←',
        _ => '↑',
    }
}

fn junction(lines: Lines) -> char {
    match (lines.top, lines.right, lines.bottom, lines.left) {
        (true, true, true, true) => '┼',
        (false, true, true, true) => '┬',
        (true, false, true, true) => '┤',
        (true, true, false, true) => '┴',
        (true, true, true, false) => '├',
        (false, true, true, false) => '┌',
        (false, false, true, true) => '┐',
        (true, false, false, true) => '┘',
        (true, true, false, false) => '└',
        (true, false, true, false) => '│',
        (false, true, false, true) => '─',
        (true, false, false, false) => '╵',
        (false, true, false, false) => '╶',
        (false, false, true, false) => '╷',
        (false, false, false, true) => '╴',
        (false, false, false, false) => '·',
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::Black => "black",
            Color::White => "white",
        })
    }
}

impl fmt::Display for Stone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self.color {
            Color::Black => 'x',
            Color::White => 'o',
        };
        write!(f, "{symbol}{:>2}{}", self.label, arrow(self.rotation))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stone {
            Some(stone) => write!(f, "{stone}"),
            None => write!(f, "  {} ", junction(self.lines)),
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for cell in row {
                write!(f, "{cell}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
