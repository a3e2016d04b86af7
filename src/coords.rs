//! Cube/axial coordinates for the hex grid, plus the corner and side
//! references used while stitching tiles into a shared vertex/edge graph.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
    NorthEast,
}

/// Corner of a pointy-top hex, clockwise from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum Corner {
    North,
    NorthEast,
    SouthEast,
    South,
    SouthWest,
    NorthWest,
}

impl Corner {
    pub const ALL: [Corner; 6] = [
        Corner::North,
        Corner::NorthEast,
        Corner::SouthEast,
        Corner::South,
        Corner::SouthWest,
        Corner::NorthWest,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Side of a pointy-top hex. A side's endpoints are the two corners it spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum Side {
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
    NorthEast,
}

impl Side {
    pub const ALL: [Side; 6] = [
        Side::East,
        Side::SouthEast,
        Side::SouthWest,
        Side::West,
        Side::NorthWest,
        Side::NorthEast,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// The corners a side connects.
    pub const fn corners(self) -> (Corner, Corner) {
        match self {
            Side::East => (Corner::NorthEast, Corner::SouthEast),
            Side::SouthEast => (Corner::SouthEast, Corner::South),
            Side::SouthWest => (Corner::South, Corner::SouthWest),
            Side::West => (Corner::SouthWest, Corner::NorthWest),
            Side::NorthWest => (Corner::NorthWest, Corner::North),
            Side::NorthEast => (Corner::North, Corner::NorthEast),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CubeCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CubeCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        debug_assert!(x + y + z == 0, "cube coordinates must sum to zero");
        Self { x, y, z }
    }

    pub fn from_axial(q: i32, r: i32) -> Self {
        CubeCoord::new(q, -q - r, r)
    }

    pub fn to_axial(self) -> (i32, i32) {
        (self.x, self.z)
    }

    pub fn add(self, other: CubeCoord) -> Self {
        CubeCoord::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn neighbor(self, direction: Direction) -> Self {
        self.add(UNIT_VECTORS[&direction])
    }

    pub fn neighbors(self) -> impl Iterator<Item = CubeCoord> {
        UNIT_VECTORS.values().map(move |vec| self.add(*vec))
    }
}

impl Default for CubeCoord {
    fn default() -> Self {
        CubeCoord::new(0, 0, 0)
    }
}

pub static UNIT_VECTORS: Lazy<HashMap<Direction, CubeCoord>> = Lazy::new(|| {
    use Direction::*;
    HashMap::from([
        (NorthEast, CubeCoord::new(1, 0, -1)),
        (SouthWest, CubeCoord::new(-1, 0, 1)),
        (NorthWest, CubeCoord::new(0, 1, -1)),
        (SouthEast, CubeCoord::new(0, -1, 1)),
        (East, CubeCoord::new(1, -1, 0)),
        (West, CubeCoord::new(-1, 1, 0)),
    ])
});

/// Every coordinate within `radius` rings of the origin, in a fixed axial
/// scan order so that ids derived from the ordering are deterministic.
pub fn coords_within_radius(radius: u8) -> Vec<CubeCoord> {
    let radius = radius as i32;
    let mut coords = Vec::new();
    for q in -radius..=radius {
        let r_lo = (-radius).max(-q - radius);
        let r_hi = radius.min(-q + radius);
        for r in r_lo..=r_hi {
            coords.push(CubeCoord::from_axial(q, r));
        }
    }
    coords
}

/// Number of hexes a board of the given radius contains.
pub fn hex_count_for_radius(radius: u8) -> usize {
    let r = radius as usize;
    1 + 3 * r * (r + 1)
}
