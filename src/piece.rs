//! Active falling piece logic

use crate::board::Cell;
use crate::tetromino::{Rotation, Shape};
use ratatui::style::Color;

/// An active falling piece
///
/// Moves are staged with [`Piece::translate`] and [`Piece::rotate`] and only
/// become visible in [`Piece::cells`] after [`Piece::commit`].
#[derive(Debug, Clone)]
pub struct Piece {
    /// Canonical offsets, never modified after spawn
    offsets: Vec<Cell>,
    /// Absolute cells as of the last commit
    cells: Vec<Cell>,
    anchor: Cell,
    rotation: Rotation,
    rotatable: bool,
    color: Color,
    /// Translation staged since the last commit
    pending: Cell,
}

/// Saved piece state for speculative moves
#[derive(Debug, Clone, PartialEq)]
pub struct PieceSnapshot {
    cells: Vec<Cell>,
    anchor: Cell,
    rotation: Rotation,
}

impl Piece {
    /// Create a piece from a canonical shape with its anchor at `anchor`
    pub fn spawn(shape: &Shape, anchor: Cell) -> Self {
        let mut piece = Self {
            offsets: shape.cells.clone(),
            cells: Vec::with_capacity(shape.cells.len()),
            anchor,
            rotation: Rotation::Zero,
            rotatable: shape.rotatable,
            color: shape.color,
            pending: Cell::new(0, 0),
        };
        piece.commit();
        piece
    }

    /// Stage a move by (dx, dy). Nothing changes until [`Piece::commit`].
    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.pending.x += dx;
        self.pending.y += dy;
    }

    /// Stage a rotation. Ignored for shapes that cannot rotate.
    pub fn rotate(&mut self) {
        if self.rotatable {
            self.rotation = self.rotation.toggled();
        }
    }

    /// Recompute every cell from the canonical offsets, then apply the
    /// staged translation to the anchor.
    pub fn commit(&mut self) {
        self.anchor = self.anchor.offset(self.pending.x, self.pending.y);
        self.pending = Cell::new(0, 0);

        let anchor = self.anchor;
        let rotation = self.rotation;
        self.cells.clear();
        self.cells.extend(
            self.offsets
                .iter()
                .map(|&offset| {
                    let rotated = rotation.apply(offset);
                    anchor.offset(rotated.x, rotated.y)
                }),
        );
    }

    pub fn snapshot(&self) -> PieceSnapshot {
        PieceSnapshot {
            cells: self.cells.clone(),
            anchor: self.anchor,
            rotation: self.rotation,
        }
    }

    /// Roll back to a snapshot, dropping anything staged since
    pub fn restore(&mut self, snapshot: PieceSnapshot) {
        self.cells = snapshot.cells;
        self.anchor = snapshot.anchor;
        self.rotation = snapshot.rotation;
        self.pending = Cell::new(0, 0);
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[allow(dead_code)]
    pub fn offsets(&self) -> &[Cell] {
        &self.offsets
    }

    pub fn anchor(&self) -> Cell {
        self.anchor
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Whether any cell sits on row `y`
    #[allow(dead_code)]
    pub fn occupies_row(&self, y: i32) -> bool {
        self.cells.iter().any(|cell| cell.y == y)
    }

    /// Cells on the piece's lowest row (largest y)
    pub fn cells_at_max_row(&self) -> Vec<Cell> {
        let Some(max_y) = self.cells.iter().map(|cell| cell.y).max() else {
            return Vec::new();
        };
        self.cells.iter().copied().filter(|cell| cell.y == max_y).collect()
    }
}
