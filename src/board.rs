//! Game board: settled cells, borders and line clearing

use crate::collision::{self, Rect};
use crate::piece::Piece;
use ratatui::style::Color;

/// A grid coordinate. Row 0 is the top of the well, y increases downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// The cells left over from one locked piece
#[derive(Debug, Clone)]
pub struct LockedPiece {
    pub cells: Vec<Cell>,
    pub color: Color,
}

/// The four walls around the well, one cell thick
#[derive(Debug, Clone, Copy)]
pub struct Borders {
    pub up: Rect,
    pub down: Rect,
    pub left: Rect,
    pub right: Rect,
}

impl Borders {
    fn around(columns: i32, rows: i32) -> Self {
        Self {
            up: Rect::new(-1, -1, columns + 2, 1),
            down: Rect::new(-1, rows, columns + 2, 1),
            left: Rect::new(-1, -1, 1, rows + 2),
            right: Rect::new(columns, -1, 1, rows + 2),
        }
    }
}

/// The game board
#[derive(Debug, Clone)]
pub struct Board {
    columns: i32,
    rows: i32,
    borders: Borders,
    /// Settled cells grouped by the piece they came from
    pieces: Vec<LockedPiece>,
}

impl Board {
    /// Create an empty board. Odd widths lose their last column so that a
    /// row can always be filled exactly.
    pub fn new(columns: i32, rows: i32) -> Self {
        let columns = columns - columns % 2;
        Self {
            columns,
            rows,
            borders: Borders::around(columns, rows),
            pieces: Vec::new(),
        }
    }

    /// Number of cells that make a full row
    pub fn columns(&self) -> i32 {
        self.columns
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    #[allow(dead_code)]
    pub fn borders(&self) -> &Borders {
        &self.borders
    }

    /// Merge a piece's cells into the settled set
    pub fn lock(&mut self, piece: &Piece) {
        self.lock_cells(piece.cells().to_vec(), piece.color());
    }

    /// Add a group of settled cells
    pub fn lock_cells(&mut self, cells: Vec<Cell>, color: Color) {
        self.pieces.push(LockedPiece { cells, color });
    }

    /// Does any cell overlap a settled cell?
    pub fn collides(&self, cells: &[Cell]) -> bool {
        self.pieces
            .iter()
            .any(|piece| collision::hits_cells(cells, &piece.cells))
    }

    /// Does any cell overlap the floor?
    pub fn hits_floor(&self, cells: &[Cell]) -> bool {
        collision::hits_rects(cells, &[self.borders.down])
    }

    /// Does any cell overlap the left, right or top wall?
    pub fn hits_walls(&self, cells: &[Cell]) -> bool {
        collision::hits_rects(
            cells,
            &[self.borders.left, self.borders.up, self.borders.right],
        )
    }

    /// Count the settled cells on row `y`
    pub fn cells_in_row(&self, y: i32) -> usize {
        self.settled().filter(|(cell, _)| cell.y == y).count()
    }

    /// A row is full when every column holds a settled cell
    pub fn is_row_full(&self, y: i32) -> bool {
        self.cells_in_row(y) == self.columns as usize
    }

    /// Remove row `y` and drop everything above it by one
    pub fn clear_row(&mut self, y: i32) {
        for piece in &mut self.pieces {
            piece.cells.retain(|cell| cell.y != y);
            for cell in &mut piece.cells {
                if cell.y < y {
                    cell.y += 1;
                }
            }
        }
        self.prune_empty_pieces();
    }

    /// Forget locked pieces whose cells were all cleared
    pub fn prune_empty_pieces(&mut self) {
        self.pieces.retain(|piece| !piece.cells.is_empty());
    }

    /// Iterate over every settled cell and its colour
    pub fn settled(&self) -> impl Iterator<Item = (Cell, Color)> + '_ {
        self.pieces
            .iter()
            .flat_map(|piece| piece.cells.iter().map(move |&cell| (cell, piece.color)))
    }

    pub fn settled_count(&self) -> usize {
        self.pieces.iter().map(|piece| piece.cells.len()).sum()
    }

    #[allow(dead_code)]
    pub fn locked_pieces(&self) -> &[LockedPiece] {
        &self.pieces
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.settled_count() == 0
    }

    /// Is the cell inside the playable area?
    pub fn in_bounds(&self, cell: Cell) -> bool {
        (0..self.columns).contains(&cell.x) && (0..self.rows).contains(&cell.y)
    }
}
