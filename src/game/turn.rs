use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::state::{IntegrityError, PlayerId};

/// 固定座次的轮转调度。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnScheduler {
    order: Vec<PlayerId>,
    owner: PlayerId,
}

impl TurnScheduler {
    /// `order` 中第一位先手。
    pub fn new(order: Vec<PlayerId>) -> Result<Self, IntegrityError> {
        let owner = *order.first().ok_or(IntegrityError::EmptySeating)?;
        Self::with_owner(order, owner)
    }

    pub fn with_owner(order: Vec<PlayerId>, owner: PlayerId) -> Result<Self, IntegrityError> {
        let scheduler = Self { order, owner };
        scheduler.validate()?;
        Ok(scheduler)
    }

    pub fn validate(&self) -> Result<(), IntegrityError> {
        if self.order.is_empty() {
            return Err(IntegrityError::EmptySeating);
        }
        let mut seen = HashSet::new();
        for player_id in &self.order {
            if !seen.insert(*player_id) {
                return Err(IntegrityError::DuplicateSeat {
                    player_id: *player_id,
                });
            }
        }
        if !self.contains(self.owner) {
            return Err(IntegrityError::UnknownTurnOwner {
                player_id: self.owner,
            });
        }
        Ok(())
    }

    pub fn order(&self) -> &[PlayerId] {
        &self.order
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.order.contains(&player_id)
    }

    /// `current` 的下家（循环）。
    pub fn next_after(&self, current: PlayerId) -> Option<PlayerId> {
        let index = self.order.iter().position(|id| *id == current)?;
        Some(self.order[(index + 1) % self.order.len()])
    }

    pub fn advance(&mut self) -> PlayerId {
        if let Some(next) = self.next_after(self.owner) {
            self.owner = next;
        }
        self.owner
    }

    pub fn force_to(&mut self, player_id: PlayerId) -> Result<(), IntegrityError> {
        if !self.contains(player_id) {
            return Err(IntegrityError::UnknownTurnOwner { player_id });
        }
        self.owner = player_id;
        Ok(())
    }
}
