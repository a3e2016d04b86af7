use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Resource;

/// A multiset of resource cards. Mutations either fully apply or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceBundle {
    counts: [u8; Resource::ALL.len()],
}

impl Default for ResourceBundle {
    fn default() -> Self {
        Self::empty()
    }
}

impl ResourceBundle {
    pub const fn from_counts(counts: [u8; 5]) -> Self {
        Self { counts }
    }

    pub const fn empty() -> Self {
        Self {
            counts: [0; Resource::ALL.len()],
        }
    }

    pub fn single(resource: Resource, amount: u8) -> Self {
        let mut bundle = Self::empty();
        bundle.add(resource, amount);
        bundle
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().map(|&v| v as u32).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&v| v == 0)
    }

    pub fn get(&self, resource: Resource) -> u8 {
        self.counts[resource.index()]
    }

    pub fn add(&mut self, resource: Resource, amount: u8) {
        let idx = resource.index();
        self.counts[idx] = self.counts[idx].saturating_add(amount);
    }

    pub fn add_bundle(&mut self, other: &ResourceBundle) {
        for (idx, value) in other.counts.iter().enumerate() {
            self.counts[idx] = self.counts[idx].saturating_add(*value);
        }
    }

    pub fn subtract(&mut self, resource: Resource, amount: u8) -> Result<(), ResourceError> {
        let idx = resource.index();
        if self.counts[idx] < amount {
            return Err(ResourceError::Shortage {
                resource,
                available: self.counts[idx],
                requested: amount,
            });
        }
        self.counts[idx] -= amount;
        Ok(())
    }

    pub fn subtract_bundle(&mut self, other: &ResourceBundle) -> Result<(), ResourceError> {
        if !self.covers(other) {
            return Err(ResourceError::BundleShortage);
        }
        for (idx, value) in other.counts.iter().enumerate() {
            self.counts[idx] -= *value;
        }
        Ok(())
    }

    /// Whether every count in `other` is available here.
    pub fn covers(&self, other: &ResourceBundle) -> bool {
        self.counts
            .iter()
            .zip(other.counts.iter())
            .all(|(have, need)| have >= need)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, u8)> + '_ {
        Resource::ALL.into_iter().zip(self.counts.iter().copied())
    }

    pub fn iter_nonzero(&self) -> impl Iterator<Item = (Resource, u8)> + '_ {
        self.iter().filter(|(_, amount)| *amount > 0)
    }
}

impl fmt::Display for ResourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter_nonzero()
            .map(|(resource, amount)| format!("{amount}x{resource}"))
            .collect();
        if parts.is_empty() {
            write!(f, "nothing")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("have {available} {resource}, need {requested}")]
    Shortage {
        resource: Resource,
        available: u8,
        requested: u8,
    },
    #[error("holdings do not cover the requested bundle")]
    BundleShortage,
}

// Build costs, in [wood, brick, sheep, wheat, ore] order.
pub const ROAD_COST: ResourceBundle = ResourceBundle::from_counts([1, 1, 0, 0, 0]);
pub const SETTLEMENT_COST: ResourceBundle = ResourceBundle::from_counts([1, 1, 1, 1, 0]);
pub const CITY_COST: ResourceBundle = ResourceBundle::from_counts([0, 0, 0, 2, 3]);
pub const DEV_CARD_COST: ResourceBundle = ResourceBundle::from_counts([0, 0, 1, 1, 1]);
