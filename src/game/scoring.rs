//! Derived scores: longest road, largest army, victory points. Nothing here
//! is authoritative state except the title holders, which carry the
//! holder-retention tie rule across recomputations.

use std::collections::HashSet;

use itertools::Itertools;

use crate::board::{EdgeId, VertexId};
use crate::game::action::GameEvent;
use crate::game::state::GameState;

/// Minimum path length before the longest-road title is awarded.
pub const LONGEST_ROAD_MINIMUM: u8 = 5;
/// Minimum knights played before the largest-army title is awarded.
pub const LARGEST_ARMY_MINIMUM: u8 = 3;

impl GameState {
    /// Victory points, always recomputed from primary state: settlements,
    /// cities, revealed victory-point cards, and the two +2 titles.
    pub fn victory_points(&self, player: usize) -> u8 {
        let state = &self.players[player];
        let mut points = state.settlements.len() as u8
            + 2 * state.cities.len() as u8
            + state.victory_card_count();
        if self.longest_road_holder == Some(player) {
            points += 2;
        }
        if self.largest_army_holder == Some(player) {
            points += 2;
        }
        points
    }

    /// Length of the player's longest simple road path right now.
    pub fn longest_road_length(&self, player: usize) -> u8 {
        self.compute_longest_road(player)
    }

    pub(crate) fn recompute_road_lengths(&mut self) {
        for player in 0..self.players.len() {
            self.longest_road_lengths[player] = self.compute_longest_road(player);
        }
    }

    /// Recompute every road length and settle who holds the title. The
    /// holder keeps it on a tie; a tie among non-holders that beats the
    /// holder leaves the title vacant.
    pub(crate) fn refresh_longest_road(&mut self, events: &mut Vec<GameEvent>) {
        self.recompute_road_lengths();
        let best = self
            .longest_road_lengths
            .iter()
            .copied()
            .max()
            .unwrap_or(0);
        let contenders: Vec<usize> = self
            .longest_road_lengths
            .iter()
            .positions(|&length| length == best)
            .collect();

        let new_holder = if best >= LONGEST_ROAD_MINIMUM {
            resolve_title(&contenders, self.longest_road_holder)
        } else {
            None
        };
        if new_holder != self.longest_road_holder {
            self.longest_road_holder = new_holder;
            events.push(GameEvent::LongestRoadChanged {
                holder: new_holder,
                length: best,
            });
        }
    }

    pub(crate) fn refresh_largest_army(&mut self, events: &mut Vec<GameEvent>) {
        let best = self
            .players
            .iter()
            .map(|p| p.knights_played)
            .max()
            .unwrap_or(0);
        let contenders: Vec<usize> = self
            .players
            .iter()
            .positions(|p| p.knights_played == best)
            .collect();

        let new_holder = if best >= LARGEST_ARMY_MINIMUM {
            resolve_title(&contenders, self.largest_army_holder)
        } else {
            None
        };
        if new_holder != self.largest_army_holder {
            self.largest_army_holder = new_holder;
            events.push(GameEvent::LargestArmyChanged {
                holder: new_holder,
                size: best,
            });
        }
    }

    fn compute_longest_road(&self, player: usize) -> u8 {
        let roads = &self.players[player].roads;
        if roads.is_empty() {
            return 0;
        }
        let mut best = 0;
        for &edge_id in roads {
            let Some(edge) = self.board.edge(edge_id) else {
                continue;
            };
            for start in [edge.vertices.0, edge.vertices.1] {
                let mut used = HashSet::from([edge_id]);
                best = best.max(self.walk_roads(player, start, &mut used));
            }
        }
        best as u8
    }

    /// Depth-first extension of a path of own roads. An opponent building on
    /// the vertex cuts the path; own buildings and open junctions pass.
    fn walk_roads(&self, player: usize, vertex: VertexId, used: &mut HashSet<EdgeId>) -> usize {
        let mut best = used.len();
        if let Some(building) = self.buildings.get(&vertex) {
            if building.owner != player {
                return best;
            }
        }
        let Some(site) = self.board.vertex(vertex) else {
            return best;
        };
        for &edge_id in &site.edges {
            if used.contains(&edge_id) {
                continue;
            }
            if self.road_owners.get(&edge_id) != Some(&player) {
                continue;
            }
            let Some(edge) = self.board.edge(edge_id) else {
                continue;
            };
            let next = edge.other_endpoint(vertex);
            used.insert(edge_id);
            best = best.max(self.walk_roads(player, next, used));
            used.remove(&edge_id);
        }
        best
    }
}

/// Unique leader takes the title; the sitting holder survives ties; a tie
/// among challengers leaves it unheld.
fn resolve_title(contenders: &[usize], current: Option<usize>) -> Option<usize> {
    match contenders {
        [single] => Some(*single),
        _ => current.filter(|holder| contenders.contains(holder)),
    }
}
