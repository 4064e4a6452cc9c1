//! Collision detection between piece cells and obstacles

use crate::board::Cell;

/// An axis-aligned rectangle in grid units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The unit rectangle covered by a cell
    pub const fn unit(cell: Cell) -> Self {
        Self::new(cell.x, cell.y, 1, 1)
    }

    /// Half-open overlap test. Touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Does any cell overlap any of the rectangles?
pub fn hits_rects(cells: &[Cell], obstacles: &[Rect]) -> bool {
    cells.iter().any(|&cell| {
        let unit = Rect::unit(cell);
        obstacles.iter().any(|rect| rect.intersects(&unit))
    })
}

/// Does any cell overlap any obstacle cell?
///
/// Cells are grid aligned unit squares, so overlap is coordinate equality.
pub fn hits_cells<'a>(cells: &[Cell], obstacles: impl IntoIterator<Item = &'a Cell>) -> bool {
    obstacles.into_iter().any(|obstacle| cells.contains(obstacle))
}
