use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, DealRemainder, MatchConfig};

use super::{
    card::{format_cards, Card, DeckKind},
    domination::TakeCheck,
    strength::{rank, Strength},
    turn::TurnScheduler,
};

/// 座位标识。
pub type PlayerId = u8;

/// 状态内保留的最近事件条数；更早的事件被丢弃。
pub const EVENT_LOG_LIMIT: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayerRole {
    Human,
    Agent,
}

impl Default for PlayerRole {
    fn default() -> Self {
        PlayerRole::Human
    }
}

/// 玩家：手牌只在配牌时排序一次。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub role: PlayerRole,
    #[serde(default)]
    pub hand: Vec<Card>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, role: PlayerRole, hand: Vec<Card>) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            hand,
        }
    }

    pub fn is_agent(&self) -> bool {
        self.role == PlayerRole::Agent
    }

    pub fn find_card_in_hand_index(&self, card: Card) -> Option<usize> {
        self.hand.iter().position(|held| *held == card)
    }

    /// 取出 `indices` 处的牌，其余保持原顺序。
    pub fn take_indices(&mut self, indices: &[usize]) -> Vec<Card> {
        let mut taken = Vec::with_capacity(indices.len());
        let mut index = 0;
        self.hand.retain(|card| {
            let keep = !indices.contains(&index);
            if !keep {
                taken.push(*card);
            }
            index += 1;
            keep
        });
        taken
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
    Pass,
    EightCut,
    Take,
}

/// 对局事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum MatchEvent {
    CardsPlayed {
        player_id: PlayerId,
        cards: Vec<Card>,
    },
    RevolutionToggled {
        active: bool,
    },
    SouthEffectTriggered {
        player_id: PlayerId,
    },
    EightCut {
        player_id: PlayerId,
    },
    Passed {
        player_id: PlayerId,
    },
    FieldCleared {
        reason: ClearReason,
    },
    FieldTaken {
        player_id: PlayerId,
        cards: Vec<Card>,
    },
    TurnChanged {
        player_id: PlayerId,
    },
    MatchWon {
        winner: PlayerId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchOutcome {
    pub winner: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("seating order is empty")]
    EmptySeating,
    #[error("seat {player_id} appears twice in the seating order")]
    DuplicateSeat { player_id: PlayerId },
    #[error("turn owner {player_id} is not seated")]
    UnknownTurnOwner { player_id: PlayerId },
    #[error("seat {player_id} has no player")]
    SeatWithoutPlayer { player_id: PlayerId },
    #[error("player {player_id} is not seated")]
    PlayerWithoutSeat { player_id: PlayerId },
    #[error("locked count {locked} does not match field size {field}")]
    LockedCountMismatch { locked: usize, field: usize },
    #[error("south effect active on an empty field")]
    SouthEffectWithoutField,
    #[error("card {card} counted {actual} times, deck holds {expected}")]
    CardCountMismatch {
        card: Card,
        expected: usize,
        actual: usize,
    },
}

/// 对局整体状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchState {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub field: Vec<Card>,
    #[serde(default)]
    pub field_stack: Vec<Vec<Card>>,
    #[serde(default)]
    pub locked_count: usize,
    #[serde(default)]
    pub revolution_active: bool,
    #[serde(default)]
    pub south_effect_active: bool,
    pub seating: TurnScheduler,
    #[serde(default)]
    pub deck: DeckKind,
    #[serde(default)]
    pub discard: Vec<Card>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<MatchEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MatchOutcome>,
}

pub fn new_match(player_count: usize, seed: Option<u64>) -> Result<MatchState, ConfigError> {
    let mut config = MatchConfig::for_players(player_count);
    config.seed = seed;
    MatchState::new_match(&config)
}

impl MatchState {
    pub fn new_match(config: &MatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self::deal_with(config, &mut rng)
    }

    pub fn deal_with<R: Rng + ?Sized>(config: &MatchConfig, rng: &mut R) -> Result<Self, ConfigError> {
        config.validate()?;
        let seats = config.player_count;
        let mut deck = config.deck.cards();
        deck.shuffle(rng);

        let per_seat = deck.len() / seats;
        let mut remaining = deck.into_iter();
        let mut players = Vec::with_capacity(seats);
        for seat in 0..seats {
            let id = seat as PlayerId;
            let count = if seat + 1 == seats && config.remainder == DealRemainder::LastSeat {
                remaining.len()
            } else {
                per_seat
            };
            let mut hand: Vec<Card> = remaining.by_ref().take(count).collect();
            hand.sort_by_key(|card| rank(*card));
            let role = if config.is_human(id) {
                PlayerRole::Human
            } else {
                PlayerRole::Agent
            };
            players.push(Player::new(id, config.name_for(id), role, hand));
        }
        let discard: Vec<Card> = remaining.collect();

        let order = players.iter().map(|player| player.id).collect();
        let seating = TurnScheduler::new(order).map_err(|error| ConfigError::Seating { error })?;

        log::info!(
            "dealt {} cards to {} seats ({} set aside)",
            config.deck.len() - discard.len(),
            seats,
            discard.len()
        );

        Ok(Self {
            players,
            field: Vec::new(),
            field_stack: Vec::new(),
            locked_count: 0,
            revolution_active: false,
            south_effect_active: false,
            seating,
            deck: config.deck,
            discard,
            event_log: Vec::new(),
            outcome: None,
        })
    }

    /// 由给定手牌构造状态；未持有的牌全部进入弃牌堆。
    pub fn from_parts(
        players: Vec<Player>,
        seating: TurnScheduler,
        deck: DeckKind,
    ) -> Result<Self, IntegrityError> {
        let mut state = Self {
            players,
            field: Vec::new(),
            field_stack: Vec::new(),
            locked_count: 0,
            revolution_active: false,
            south_effect_active: false,
            seating,
            deck,
            discard: Vec::new(),
            event_log: Vec::new(),
            outcome: None,
        };
        state.rebuild_discard()?;
        Ok(state)
    }

    /// 弃牌堆 = 整副牌 - 所有手牌 - 场上牌。
    pub fn rebuild_discard(&mut self) -> Result<(), IntegrityError> {
        let mut counts: HashMap<Card, usize> = HashMap::new();
        for card in self.players.iter().flat_map(|p| p.hand.iter()).chain(self.field.iter()) {
            *counts.entry(*card).or_default() += 1;
        }

        let mut discard = Vec::new();
        for card in DeckKind::distinct_cards() {
            let expected = self.deck.count_of(card);
            let actual = counts.remove(&card).unwrap_or(0);
            if actual > expected {
                return Err(IntegrityError::CardCountMismatch {
                    card,
                    expected,
                    actual,
                });
            }
            discard.extend(std::iter::repeat(card).take(expected - actual));
        }
        if let Some((card, actual)) = counts.into_iter().next() {
            return Err(IntegrityError::CardCountMismatch {
                card,
                expected: 0,
                actual,
            });
        }
        self.discard = discard;
        Ok(())
    }

    pub fn turn_owner(&self) -> PlayerId {
        self.seating.owner()
    }

    pub fn strength(&self) -> Strength {
        Strength::new(self.revolution_active, self.south_effect_active)
    }

    pub fn take_check(&self) -> TakeCheck {
        TakeCheck::new(self.field_stack.len(), self.locked_count)
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    pub fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|player| player.id == id)
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn record_event(&mut self, event: MatchEvent) {
        self.event_log.push(event);
        if self.event_log.len() > EVENT_LOG_LIMIT {
            let overflow = self.event_log.len() - EVENT_LOG_LIMIT;
            self.event_log.drain(..overflow);
        }
    }

    pub fn declare_victory(&mut self, winner: PlayerId) -> MatchOutcome {
        let outcome = MatchOutcome { winner };
        if self.outcome.is_none() {
            log::info!("player {winner} emptied their hand");
            self.outcome = Some(outcome.clone());
        }
        outcome
    }

    /// 新牌上场，被压下的旧牌进入弃牌堆。
    pub fn place_on_field(&mut self, cards: Vec<Card>) {
        let previous = std::mem::replace(&mut self.field, cards);
        self.discard.extend(previous);
        self.locked_count = self.field.len();
        self.field_stack.push(self.field.clone());
    }

    /// 清空场面及相关标记，返回场上的牌。
    pub fn lift_field(&mut self) -> Vec<Card> {
        self.field_stack.clear();
        self.locked_count = 0;
        self.south_effect_active = false;
        std::mem::take(&mut self.field)
    }

    pub fn clear_field(&mut self) {
        let cleared = self.lift_field();
        self.discard.extend(cleared);
    }

    pub fn card_total(&self) -> usize {
        self.players.iter().map(|p| p.hand.len()).sum::<usize>() + self.field.len() + self.discard.len()
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        self.seating.validate()?;
        for player_id in self.seating.order() {
            if self.get_player(*player_id).is_none() {
                return Err(IntegrityError::SeatWithoutPlayer {
                    player_id: *player_id,
                });
            }
        }
        for player in &self.players {
            if !self.seating.contains(player.id) {
                return Err(IntegrityError::PlayerWithoutSeat {
                    player_id: player.id,
                });
            }
        }

        if self.locked_count != self.field.len() {
            return Err(IntegrityError::LockedCountMismatch {
                locked: self.locked_count,
                field: self.field.len(),
            });
        }
        if self.south_effect_active && self.field.is_empty() {
            return Err(IntegrityError::SouthEffectWithoutField);
        }

        let mut counts: HashMap<Card, usize> = HashMap::new();
        for card in self
            .players
            .iter()
            .flat_map(|p| p.hand.iter())
            .chain(self.field.iter())
            .chain(self.discard.iter())
        {
            *counts.entry(*card).or_default() += 1;
        }
        for card in DeckKind::distinct_cards() {
            let expected = self.deck.count_of(card);
            let actual = counts.remove(&card).unwrap_or(0);
            if actual != expected {
                return Err(IntegrityError::CardCountMismatch {
                    card,
                    expected,
                    actual,
                });
            }
        }
        if let Some((card, actual)) = counts.into_iter().next() {
            return Err(IntegrityError::CardCountMismatch {
                card,
                expected: 0,
                actual,
            });
        }

        Ok(())
    }

    pub fn history_text(&self) -> String {
        self.field_stack
            .iter()
            .map(|group| format_cards(group))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn view_for(&self, player_id: PlayerId) -> Option<MatchView> {
        let me = self.get_player(player_id)?;
        let opponents = self
            .seating
            .order()
            .iter()
            .filter(|id| **id != player_id)
            .filter_map(|id| self.get_player(*id))
            .map(|player| SeatSummary {
                id: player.id,
                name: player.name.clone(),
                hand_size: player.hand.len(),
            })
            .collect();

        Some(MatchView {
            player_id,
            hand: me.hand.clone(),
            field: self.field.clone(),
            field_stack: self.field_stack.clone(),
            turn_owner: self.turn_owner(),
            is_my_turn: !self.is_finished() && self.turn_owner() == player_id,
            revolution_active: self.revolution_active,
            south_effect_active: self.south_effect_active,
            can_take: self.take_check().is_eligible(),
            opponents,
            outcome: self.outcome.clone(),
            history_text: self.history_text(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatSummary {
    pub id: PlayerId,
    pub name: String,
    pub hand_size: usize,
}

/// 渲染层所需的只读视图。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchView {
    pub player_id: PlayerId,
    pub hand: Vec<Card>,
    pub field: Vec<Card>,
    pub field_stack: Vec<Vec<Card>>,
    pub turn_owner: PlayerId,
    pub is_my_turn: bool,
    pub revolution_active: bool,
    pub south_effect_active: bool,
    pub can_take: bool,
    pub opponents: Vec<SeatSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MatchOutcome>,
    pub history_text: String,
}
