//! 对局配置（可由前端以 JSON 传入）。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::{DeckKind, IntegrityError, PlayerId};

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealRemainder {
    /// 余牌进入弃牌堆。
    Discard,
    /// 余牌归最后一位。
    LastSeat,
}

impl Default for DealRemainder {
    fn default() -> Self {
        DealRemainder::Discard
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "type")]
pub enum ConfigError {
    #[error("player count {count} outside {min}..={max}")]
    PlayerCount {
        count: usize,
        min: usize,
        max: usize,
    },
    #[error("seat {player_id} does not exist")]
    UnknownSeat { player_id: PlayerId },
    #[error("invalid seating: {error}")]
    Seating { error: IntegrityError },
    #[error("invalid config: {message}")]
    Parse { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub player_count: usize,
    pub deck: DeckKind,
    pub remainder: DealRemainder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub human_seats: Vec<PlayerId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

impl MatchConfig {
    pub fn for_players(player_count: usize) -> Self {
        Self {
            player_count,
            ..Self::default()
        }
    }

    /// 联机房间：双副牌，余牌归最后一位。
    pub fn online(player_count: usize) -> Self {
        Self {
            player_count,
            deck: DeckKind::Double,
            remainder: DealRemainder::LastSeat,
            seed: None,
            human_seats: (0..player_count).filter_map(|seat| PlayerId::try_from(seat).ok()).collect(),
            names: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_human_seats(mut self, seats: Vec<PlayerId>) -> Self {
        self.human_seats = seats;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = serde_json::from_str(json).map_err(|error| ConfigError::Parse {
            message: error.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.player_count) {
            return Err(ConfigError::PlayerCount {
                count: self.player_count,
                min: MIN_PLAYERS,
                max: MAX_PLAYERS,
            });
        }
        if let Some(seat) = self
            .human_seats
            .iter()
            .find(|seat| usize::from(**seat) >= self.player_count)
        {
            return Err(ConfigError::UnknownSeat { player_id: *seat });
        }
        Ok(())
    }

    pub fn is_human(&self, player_id: PlayerId) -> bool {
        self.human_seats.contains(&player_id)
    }

    pub fn name_for(&self, player_id: PlayerId) -> String {
        if let Some(name) = self.names.get(usize::from(player_id)) {
            return name.clone();
        }
        if self.is_human(player_id) {
            format!("Player {}", player_id + 1)
        } else {
            format!("CPU {}", player_id)
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            player_count: MIN_PLAYERS,
            deck: DeckKind::Single,
            remainder: DealRemainder::Discard,
            seed: None,
            human_seats: vec![0],
            names: Vec::new(),
        }
    }
}
