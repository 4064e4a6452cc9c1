//! Canonical shape definitions
//!
//! Every shape is a list of (x, y) offsets from the piece anchor, with x
//! increasing rightward and y increasing downward.

use crate::board::Cell;
use ratatui::style::Color;

/// A canonical shape from the shape table
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Offsets relative to the anchor, in the unrotated orientation
    pub cells: Vec<Cell>,
    /// Presentation colour, never inspected by the simulation
    pub color: Color,
    /// Whether the shape may rotate (the square never does)
    pub rotatable: bool,
}

impl Shape {
    pub fn new(offsets: &[(i32, i32)], color: Color, rotatable: bool) -> Self {
        Self {
            cells: offsets.iter().map(|&(x, y)| Cell::new(x, y)).collect(),
            color,
            rotatable,
        }
    }
}

/// The seven classic pieces
pub fn default_shapes() -> Vec<Shape> {
    vec![
        Shape::new(&[(0, 0), (1, 0), (2, 0), (3, 0)], Color::Red, true), // I
        Shape::new(&[(0, 0), (1, 0), (0, 1), (-1, 1)], Color::Green, true), // S
        Shape::new(&[(0, 0), (1, 0), (2, 0), (2, 1)], Color::Blue, true), // J
        Shape::new(&[(0, 0), (0, 1), (1, 0), (1, 1)], Color::Rgb(255, 69, 0), false), // O
        Shape::new(&[(-1, 0), (0, 0), (0, 1), (1, 1)], Color::Rgb(255, 125, 0), true), // Z
        Shape::new(&[(0, 0), (1, 0), (2, 0), (1, 1)], Color::Rgb(128, 0, 128), true), // T
        Shape::new(&[(0, 0), (1, 0), (2, 0), (0, 1)], Color::Cyan, true), // L
    ]
}

/// Rotation states. Only two are ever used: pieces flip between their
/// canonical orientation and a quarter turn of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Zero,
    Quarter,
}

impl Rotation {
    /// Flip between the two states
    pub fn toggled(self) -> Rotation {
        match self {
            Rotation::Zero => Rotation::Quarter,
            Rotation::Quarter => Rotation::Zero,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::Zero => 0,
            Rotation::Quarter => 90,
        }
    }

    /// Apply the rotation matrix to a canonical offset.
    ///
    /// `x' = x·cos θ − y·sin θ`, `y' = y·cos θ + x·sin θ`. With θ limited to
    /// 0° and 90° the sines and cosines are 0 or 1, so this stays exact.
    pub fn apply(self, offset: Cell) -> Cell {
        match self {
            Rotation::Zero => offset,
            Rotation::Quarter => Cell::new(-offset.y, offset.x),
        }
    }
}
