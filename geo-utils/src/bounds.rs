use serde::{Deserialize, Serialize};

use crate::codec::Position;

/// An axis-aligned longitude/latitude box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn around(position: &Position) -> Self {
        Self::new(position.lng, position.lat, position.lng, position.lat)
    }

    /// Smallest box covering every position, or `None` for an empty input.
    pub fn covering<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Option<Self> {
        positions
            .into_iter()
            .map(Self::around)
            .reduce(|acc, b| acc.union(&b))
    }

    pub fn union(&self, other: &Bounds) -> Self {
        Self {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// True when the box has no area, e.g. a single point or a straight
    /// horizontal line. NaN extents are degenerate as well.
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    pub fn center(&self) -> Position {
        Position::new(
            self.west + self.width() / 2.0,
            self.south + self.height() / 2.0,
        )
    }
}
