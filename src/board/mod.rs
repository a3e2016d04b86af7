//! The board graph: a flat arena of hexes, vertices and edges with all
//! cross-references expressed as integer ids. The arena is immutable after
//! generation; occupancy (buildings, roads, robber) lives on the game state.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::IntoEnumIterator;

use crate::coords::{coords_within_radius, hex_count_for_radius, Corner, CubeCoord, Direction, Side};
use crate::error::EngineError;
use crate::types::Resource;

pub type HexId = u16;
pub type VertexId = u16;
pub type EdgeId = u16;

#[derive(Debug, Clone)]
pub struct Hex {
    pub id: HexId,
    pub coord: CubeCoord,
    pub resource: Option<Resource>,
    pub token: Option<u8>,
    /// Corner vertices in [`Corner::ALL`] order.
    pub vertices: [VertexId; 6],
    /// Side edges in [`Side::ALL`] order.
    pub edges: [EdgeId; 6],
}

impl Hex {
    pub fn is_desert(&self) -> bool {
        self.resource.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Vertex {
    pub id: VertexId,
    pub hexes: SmallVec<[HexId; 3]>,
    pub edges: SmallVec<[EdgeId; 3]>,
    pub neighbors: SmallVec<[VertexId; 3]>,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub vertices: (VertexId, VertexId),
    pub hexes: SmallVec<[HexId; 2]>,
}

impl Edge {
    pub fn touches(&self, vertex: VertexId) -> bool {
        self.vertices.0 == vertex || self.vertices.1 == vertex
    }

    pub fn other_endpoint(&self, vertex: VertexId) -> VertexId {
        if self.vertices.0 == vertex {
            self.vertices.1
        } else {
            self.vertices.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: u16,
    pub edge: EdgeId,
    pub vertices: (VertexId, VertexId),
    pub rate: u8,
    /// `None` means the port trades any resource at its rate.
    pub resource: Option<Resource>,
}

/// A port placement request: which coastal edge, at what rate, for what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    pub edge: EdgeId,
    pub rate: u8,
    pub resource: Option<Resource>,
}

/// Shape and material lists for board generation. `resources` must have one
/// entry per hex (`None` = desert) and `tokens` one entry per non-desert hex.
#[derive(Debug, Clone)]
pub struct BoardLayout {
    pub radius: u8,
    pub resources: Vec<Option<Resource>>,
    pub tokens: Vec<u8>,
    /// Pinned port placements; `None` spreads the standard assignment
    /// around the coast.
    pub ports: Option<Vec<PortSpec>>,
    /// Shuffle resources, tokens and port assignments with the game rng.
    pub shuffle: bool,
}

impl BoardLayout {
    /// The classic 19-hex board: 4 wood, 3 brick, 4 sheep, 4 wheat, 3 ore,
    /// one desert, tokens 2-12, nine coastal ports.
    pub fn standard() -> Self {
        Self {
            radius: 2,
            resources: STANDARD_RESOURCES.clone(),
            tokens: STANDARD_TOKENS.to_vec(),
            ports: None,
            shuffle: true,
        }
    }

    /// The standard layout for radius 2, or a cycled resource/token fill for
    /// other radii, always with exactly one desert.
    pub fn for_radius(radius: u8) -> Self {
        if radius == 2 {
            return Self::standard();
        }
        let hex_count = hex_count_for_radius(radius);
        let mut resources: Vec<Option<Resource>> = (0..hex_count.saturating_sub(1))
            .map(|i| Some(Resource::ALL[i % Resource::ALL.len()]))
            .collect();
        resources.push(None);
        const TOKEN_CYCLE: [u8; 10] = [2, 3, 4, 5, 6, 8, 9, 10, 11, 12];
        let tokens = (0..hex_count.saturating_sub(1))
            .map(|i| TOKEN_CYCLE[i % TOKEN_CYCLE.len()])
            .collect();
        Self {
            radius,
            resources,
            tokens,
            ports: None,
            shuffle: true,
        }
    }
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self::standard()
    }
}

static STANDARD_RESOURCES: Lazy<Vec<Option<Resource>>> = Lazy::new(|| {
    let mut resources = Vec::with_capacity(19);
    resources.extend(std::iter::repeat(Some(Resource::Wood)).take(4));
    resources.extend(std::iter::repeat(Some(Resource::Brick)).take(3));
    resources.extend(std::iter::repeat(Some(Resource::Sheep)).take(4));
    resources.extend(std::iter::repeat(Some(Resource::Wheat)).take(4));
    resources.extend(std::iter::repeat(Some(Resource::Ore)).take(3));
    resources.push(None);
    resources
});

const STANDARD_TOKENS: &[u8] = &[2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

static STANDARD_PORT_ASSIGNMENTS: Lazy<Vec<(u8, Option<Resource>)>> = Lazy::new(|| {
    vec![
        (2, Some(Resource::Wood)),
        (2, Some(Resource::Brick)),
        (2, Some(Resource::Sheep)),
        (2, Some(Resource::Wheat)),
        (2, Some(Resource::Ore)),
        (3, None),
        (3, None),
        (3, None),
        (3, None),
    ]
});

#[derive(Debug, Clone)]
pub struct Board {
    radius: u8,
    hexes: Vec<Hex>,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    ports: Vec<Port>,
    coord_index: HashMap<CubeCoord, HexId>,
}

impl Board {
    /// Build a board from a layout. Fails with `ConfigError` when the
    /// material lists do not match the board shape.
    pub fn generate(layout: &BoardLayout, rng: &mut impl rand::Rng) -> Result<Self, EngineError> {
        if layout.radius < 1 {
            return Err(EngineError::ConfigError(
                "board radius must be at least 1".into(),
            ));
        }
        let hex_count = hex_count_for_radius(layout.radius);
        if layout.resources.len() != hex_count {
            return Err(EngineError::ConfigError(format!(
                "layout has {} resource entries for {} hexes",
                layout.resources.len(),
                hex_count
            )));
        }
        let desert_count = layout.resources.iter().filter(|r| r.is_none()).count();
        if layout.tokens.len() != hex_count - desert_count {
            return Err(EngineError::ConfigError(format!(
                "layout has {} tokens for {} producing hexes",
                layout.tokens.len(),
                hex_count - desert_count
            )));
        }
        if let Some(bad) = layout
            .tokens
            .iter()
            .find(|&&t| !(2..=12).contains(&t) || t == 7)
        {
            return Err(EngineError::ConfigError(format!(
                "token {bad} is not a legal dice token"
            )));
        }

        let mut resources = layout.resources.clone();
        let mut tokens = layout.tokens.clone();
        if layout.shuffle {
            resources.shuffle(rng);
            tokens.shuffle(rng);
        }

        let mut board = Self::skeleton(layout.radius);
        let mut token_iter = tokens.into_iter();
        for (hex, resource) in board.hexes.iter_mut().zip(resources) {
            hex.resource = resource;
            hex.token = if resource.is_some() {
                token_iter.next()
            } else {
                None
            };
        }

        match &layout.ports {
            Some(specs) => board.apply_ports(specs)?,
            None => {
                let specs = board.default_port_specs(rng, layout.shuffle);
                board.apply_ports(&specs)?;
            }
        }
        Ok(board)
    }

    /// A standard randomized board.
    pub fn standard(rng: &mut impl rand::Rng) -> Self {
        Self::generate(&BoardLayout::standard(), rng)
            .expect("standard layout is always consistent")
    }

    /// Lay out the bare graph for a radius: hexes in scan order, vertices
    /// and edges deduplicated by reusing ids already assigned to built
    /// neighbor tiles.
    fn skeleton(radius: u8) -> Self {
        let coords = coords_within_radius(radius);
        let mut coord_index: HashMap<CubeCoord, HexId> = HashMap::new();
        let mut hex_corners: Vec<[VertexId; 6]> = Vec::with_capacity(coords.len());
        let mut hex_sides: Vec<[EdgeId; 6]> = Vec::with_capacity(coords.len());
        let mut edge_endpoints: Vec<(VertexId, VertexId)> = Vec::new();
        let mut vertex_count: VertexId = 0;

        for (hex_index, &coord) in coords.iter().enumerate() {
            let mut corners: [Option<VertexId>; 6] = [None; 6];
            let mut sides: [Option<EdgeId>; 6] = [None; 6];

            for direction in Direction::iter() {
                let neighbor_coord = coord.neighbor(direction);
                let Some(&neighbor_id) = coord_index.get(&neighbor_coord) else {
                    continue;
                };
                let (corner_pairs, (my_side, their_side)) = shared_refs(direction);
                for (mine, theirs) in corner_pairs {
                    corners[mine.index()] =
                        Some(hex_corners[neighbor_id as usize][theirs.index()]);
                }
                sides[my_side.index()] =
                    Some(hex_sides[neighbor_id as usize][their_side.index()]);
            }

            let corners = corners.map(|slot| {
                slot.unwrap_or_else(|| {
                    let id = vertex_count;
                    vertex_count += 1;
                    id
                })
            });
            let mut resolved_sides = [0 as EdgeId; 6];
            for side in Side::ALL {
                resolved_sides[side.index()] = match sides[side.index()] {
                    Some(id) => id,
                    None => {
                        let (a, b) = side.corners();
                        let id = edge_endpoints.len() as EdgeId;
                        edge_endpoints.push((corners[a.index()], corners[b.index()]));
                        id
                    }
                };
            }

            coord_index.insert(coord, hex_index as HexId);
            hex_corners.push(corners);
            hex_sides.push(resolved_sides);
        }

        let mut vertices: Vec<Vertex> = (0..vertex_count)
            .map(|id| Vertex {
                id,
                ..Vertex::default()
            })
            .collect();
        let mut edges: Vec<Edge> = edge_endpoints
            .iter()
            .enumerate()
            .map(|(id, &vertices)| Edge {
                id: id as EdgeId,
                vertices,
                hexes: SmallVec::new(),
            })
            .collect();
        let hexes: Vec<Hex> = coords
            .into_iter()
            .enumerate()
            .map(|(id, coord)| Hex {
                id: id as HexId,
                coord,
                resource: None,
                token: None,
                vertices: hex_corners[id],
                edges: hex_sides[id],
            })
            .collect();

        for hex in &hexes {
            for &vertex_id in &hex.vertices {
                vertices[vertex_id as usize].hexes.push(hex.id);
            }
            for &edge_id in &hex.edges {
                edges[edge_id as usize].hexes.push(hex.id);
            }
        }
        for edge in &edges {
            let (a, b) = edge.vertices;
            vertices[a as usize].edges.push(edge.id);
            vertices[b as usize].edges.push(edge.id);
            vertices[a as usize].neighbors.push(b);
            vertices[b as usize].neighbors.push(a);
        }

        Self {
            radius,
            hexes,
            vertices,
            edges,
            ports: Vec::new(),
            coord_index,
        }
    }

    /// Spread the standard port assignments evenly around the coastline.
    fn default_port_specs(&self, rng: &mut impl rand::Rng, shuffle: bool) -> Vec<PortSpec> {
        let coastal = self.coastal_edges();
        if coastal.is_empty() {
            return Vec::new();
        }

        let mut assignments: Vec<(u8, Option<Resource>)> =
            if self.hexes.len() == 19 && coastal.len() >= 9 {
                STANDARD_PORT_ASSIGNMENTS.clone()
            } else {
                let count = (coastal.len() / 3).clamp(1, 9);
                vec![(3, None); count]
            };
        if shuffle {
            assignments.shuffle(rng);
        }

        let step = coastal.len() as f64 / assignments.len() as f64;
        let mut chosen: Vec<usize> = Vec::with_capacity(assignments.len());
        for i in 0..assignments.len() {
            let candidate = ((i as f64 * step) as usize) % coastal.len();
            if !chosen.contains(&candidate) {
                chosen.push(candidate);
            }
        }
        let mut backfill = 0;
        while chosen.len() < assignments.len() && backfill < coastal.len() {
            if !chosen.contains(&backfill) {
                chosen.push(backfill);
            }
            backfill += 1;
        }
        chosen.sort_unstable();

        chosen
            .into_iter()
            .zip(assignments)
            .map(|(index, (rate, resource))| PortSpec {
                edge: coastal[index],
                rate,
                resource,
            })
            .collect()
    }

    fn apply_ports(&mut self, specs: &[PortSpec]) -> Result<(), EngineError> {
        let coastal: HashSet<EdgeId> = self.coastal_edges().into_iter().collect();
        let mut used: HashSet<EdgeId> = HashSet::new();
        let mut ports = Vec::with_capacity(specs.len());

        for (index, spec) in specs.iter().enumerate() {
            let edge = self
                .edge(spec.edge)
                .ok_or_else(|| {
                    EngineError::ConfigError(format!("port edge {} is not a valid edge", spec.edge))
                })?
                .clone();
            if !coastal.contains(&spec.edge) {
                return Err(EngineError::ConfigError(format!(
                    "port edge {} is not coastal",
                    spec.edge
                )));
            }
            if !used.insert(spec.edge) {
                return Err(EngineError::ConfigError(format!(
                    "port edge {} assigned twice",
                    spec.edge
                )));
            }
            if !(2..=4).contains(&spec.rate) {
                return Err(EngineError::ConfigError(format!(
                    "port rate {} must be 2, 3 or 4",
                    spec.rate
                )));
            }
            if spec.rate == 2 && spec.resource.is_none() {
                return Err(EngineError::ConfigError(
                    "a 2:1 port must name a resource".into(),
                ));
            }
            ports.push(Port {
                id: index as u16,
                edge: spec.edge,
                vertices: edge.vertices,
                rate: spec.rate,
                resource: spec.resource,
            });
        }
        self.ports = ports;
        Ok(())
    }

    pub fn radius(&self) -> u8 {
        self.radius
    }

    pub fn hexes(&self) -> &[Hex] {
        &self.hexes
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn hex(&self, id: HexId) -> Option<&Hex> {
        self.hexes.get(id as usize)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id as usize)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id as usize)
    }

    pub fn hex_at(&self, coord: CubeCoord) -> Option<HexId> {
        self.coord_index.get(&coord).copied()
    }

    pub fn adjacent_hexes(&self, vertex: VertexId) -> impl Iterator<Item = &Hex> {
        self.vertices
            .get(vertex as usize)
            .into_iter()
            .flat_map(|v| v.hexes.iter())
            .map(|&hex_id| &self.hexes[hex_id as usize])
    }

    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        let vertex = self.vertex(a)?;
        vertex
            .edges
            .iter()
            .copied()
            .find(|&edge_id| self.edges[edge_id as usize].touches(b))
    }

    /// Edges bordering exactly one hex. Only these carry ports.
    pub fn coastal_edges(&self) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|edge| edge.hexes.len() == 1)
            .map(|edge| edge.id)
            .collect()
    }

    pub fn ports_at(&self, vertex: VertexId) -> impl Iterator<Item = &Port> {
        self.ports
            .iter()
            .filter(move |port| port.vertices.0 == vertex || port.vertices.1 == vertex)
    }

    pub fn port_at(&self, vertex: VertexId) -> Option<&Port> {
        self.ports_at(vertex).next()
    }

    /// The desert hex if the layout has one, else hex 0. Starting spot for
    /// the robber.
    pub fn initial_robber_hex(&self) -> HexId {
        self.hexes
            .iter()
            .find(|hex| hex.is_desert())
            .map(|hex| hex.id)
            .unwrap_or(0)
    }
}

/// Which of a freshly-placed tile's corners and side coincide with an
/// already-built neighbor in the given direction.
fn shared_refs(direction: Direction) -> ([(Corner, Corner); 2], (Side, Side)) {
    use Corner::*;
    match direction {
        Direction::East => (
            [(NorthEast, NorthWest), (SouthEast, SouthWest)],
            (Side::East, Side::West),
        ),
        Direction::SouthEast => (
            [(South, NorthWest), (SouthEast, North)],
            (Side::SouthEast, Side::NorthWest),
        ),
        Direction::SouthWest => (
            [(South, NorthEast), (SouthWest, North)],
            (Side::SouthWest, Side::NorthEast),
        ),
        Direction::West => (
            [(NorthWest, NorthEast), (SouthWest, SouthEast)],
            (Side::West, Side::East),
        ),
        Direction::NorthWest => (
            [(North, SouthEast), (NorthWest, South)],
            (Side::NorthWest, Side::SouthEast),
        ),
        Direction::NorthEast => (
            [(North, SouthWest), (NorthEast, South)],
            (Side::NorthEast, Side::SouthWest),
        ),
    }
}
