use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    card::Card,
    effects::PlayEffects,
    legality::{check_play, PlayViolation},
    state::{ClearReason, IntegrityError, MatchEvent, MatchOutcome, MatchState, PlayerId},
    strength::rank,
};

/// 玩家意图：出牌（手牌下标）、过、倒す。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Intent {
    Play { indices: Vec<usize> },
    Pass,
    Take,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchAction {
    pub player_id: PlayerId,
    pub intent: Intent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("the match is already finished")]
    MatchFinished,
    #[error("it is player {expected}'s turn, not player {actual}'s")]
    OutOfTurn { expected: PlayerId, actual: PlayerId },
    #[error("player {player_id} is not in this match")]
    UnknownPlayer { player_id: PlayerId },
    #[error("no cards selected")]
    EmptySelection,
    #[error("hand index {index} is out of range or repeated")]
    InvalidSelection { index: usize },
    #[error("illegal play: {reason}")]
    IllegalPlay { reason: PlayViolation },
    #[error("taking needs {required} stacked plays, field has {actual}")]
    IllegalTake { required: usize, actual: usize },
    #[error("inconsistent match state: {error}")]
    IntegrityViolation { error: IntegrityError },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: MatchState,
    pub events: Vec<MatchEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MatchOutcome>,
}

impl RuleResolution {
    pub fn new(state: MatchState, events: Vec<MatchEvent>) -> Self {
        let outcome = state.outcome.clone();
        Self {
            state,
            events,
            outcome,
        }
    }
}

/// 规则引擎：在副本上结算，被拒绝时调用方的状态保持不变。
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    fn ensure_running(state: &MatchState) -> Result<(), RuleError> {
        if state.is_finished() {
            return Err(RuleError::MatchFinished);
        }
        Ok(())
    }

    fn ensure_integrity(state: &MatchState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    fn ensure_turn_owner(state: &MatchState, player_id: PlayerId) -> Result<(), RuleError> {
        if state.player_index(player_id).is_none() {
            return Err(RuleError::UnknownPlayer { player_id });
        }
        let expected = state.turn_owner();
        if expected != player_id {
            return Err(RuleError::OutOfTurn {
                expected,
                actual: player_id,
            });
        }
        Ok(())
    }

    fn ensure_actionable(state: &MatchState, player_id: PlayerId) -> Result<(), RuleError> {
        Self::ensure_running(state)?;
        Self::ensure_integrity(state)?;
        Self::ensure_turn_owner(state, player_id)
    }

    fn ensure_selection(hand_len: usize, indices: &[usize]) -> Result<(), RuleError> {
        if indices.is_empty() {
            return Err(RuleError::EmptySelection);
        }
        for (position, index) in indices.iter().enumerate() {
            if *index >= hand_len || indices[..position].contains(index) {
                return Err(RuleError::InvalidSelection { index: *index });
            }
        }
        Ok(())
    }

    fn emit(state: &mut MatchState, events: &mut Vec<MatchEvent>, event: MatchEvent) {
        state.record_event(event.clone());
        events.push(event);
    }

    fn resolve<F>(state: &MatchState, transition: F) -> Result<RuleResolution, RuleError>
    where
        F: FnOnce(&mut MatchState) -> Result<Vec<MatchEvent>, RuleError>,
    {
        let mut next = state.clone();
        let events = transition(&mut next)?;
        Ok(RuleResolution::new(next, events))
    }

    pub fn apply(
        &self,
        state: &MatchState,
        player_id: PlayerId,
        intent: &Intent,
    ) -> Result<RuleResolution, RuleError> {
        match intent {
            Intent::Play { indices } => self.play(state, player_id, indices),
            Intent::Pass => self.pass(state, player_id),
            Intent::Take => self.take(state, player_id),
        }
    }

    pub fn play(
        &self,
        state: &MatchState,
        player_id: PlayerId,
        indices: &[usize],
    ) -> Result<RuleResolution, RuleError> {
        Self::resolve(state, |state| Self::play_in_place(state, player_id, indices))
    }

    pub fn pass(&self, state: &MatchState, player_id: PlayerId) -> Result<RuleResolution, RuleError> {
        Self::resolve(state, |state| Self::pass_in_place(state, player_id))
    }

    pub fn take(&self, state: &MatchState, player_id: PlayerId) -> Result<RuleResolution, RuleError> {
        Self::resolve(state, |state| Self::take_in_place(state, player_id))
    }

    fn play_in_place(
        state: &mut MatchState,
        player_id: PlayerId,
        indices: &[usize],
    ) -> Result<Vec<MatchEvent>, RuleError> {
        Self::ensure_actionable(state, player_id)?;

        let player_index = state
            .player_index(player_id)
            .ok_or(RuleError::UnknownPlayer { player_id })?;
        let hand = &state.players[player_index].hand;
        Self::ensure_selection(hand.len(), indices)?;

        let mut cards: Vec<Card> = indices.iter().map(|index| hand[*index]).collect();
        cards.sort_by_key(|card| rank(*card));
        check_play(&cards, &state.field, state.strength())
            .map_err(|reason| RuleError::IllegalPlay { reason })?;

        let effects = PlayEffects::detect(&cards);
        state.players[player_index].take_indices(indices);
        state.place_on_field(cards.clone());

        log::debug!(
            "player {player_id} played {} card(s), stack depth {}",
            cards.len(),
            state.field_stack.len()
        );

        let mut events = Vec::new();
        Self::emit(state, &mut events, MatchEvent::CardsPlayed { player_id, cards });

        if effects.revolution {
            state.revolution_active = !state.revolution_active;
            let active = state.revolution_active;
            Self::emit(state, &mut events, MatchEvent::RevolutionToggled { active });
        }
        if effects.south_effect {
            state.south_effect_active = true;
            Self::emit(state, &mut events, MatchEvent::SouthEffectTriggered { player_id });
        }

        if state.players[player_index].hand.is_empty() {
            let outcome = state.declare_victory(player_id);
            Self::emit(
                state,
                &mut events,
                MatchEvent::MatchWon {
                    winner: outcome.winner,
                },
            );
            return Ok(events);
        }

        if effects.eight_cut {
            state.clear_field();
            state
                .seating
                .force_to(player_id)
                .map_err(|error| RuleError::IntegrityViolation { error })?;
            Self::emit(state, &mut events, MatchEvent::EightCut { player_id });
            Self::emit(
                state,
                &mut events,
                MatchEvent::FieldCleared {
                    reason: ClearReason::EightCut,
                },
            );
            return Ok(events);
        }

        let next = state.seating.advance();
        Self::emit(state, &mut events, MatchEvent::TurnChanged { player_id: next });
        Ok(events)
    }

    /// 空场过牌不做任何事，也不产生事件。
    fn pass_in_place(state: &mut MatchState, player_id: PlayerId) -> Result<Vec<MatchEvent>, RuleError> {
        Self::ensure_actionable(state, player_id)?;

        if state.field.is_empty() {
            log::debug!("player {player_id} passed on an empty field, ignoring");
            return Ok(Vec::new());
        }

        state.clear_field();
        let mut events = Vec::new();
        Self::emit(state, &mut events, MatchEvent::Passed { player_id });
        Self::emit(
            state,
            &mut events,
            MatchEvent::FieldCleared {
                reason: ClearReason::Pass,
            },
        );
        let next = state.seating.advance();
        Self::emit(state, &mut events, MatchEvent::TurnChanged { player_id: next });
        Ok(events)
    }

    fn take_in_place(state: &mut MatchState, player_id: PlayerId) -> Result<Vec<MatchEvent>, RuleError> {
        Self::ensure_actionable(state, player_id)?;

        let check = state.take_check();
        if !check.is_eligible() {
            return Err(RuleError::IllegalTake {
                required: check.required,
                actual: check.actual,
            });
        }

        let next = state
            .seating
            .next_after(player_id)
            .ok_or(RuleError::UnknownPlayer { player_id })?;

        let cards = state.lift_field();
        if let Some(player) = state.get_player_mut(player_id) {
            player.hand.extend_from_slice(&cards);
        }
        log::debug!("player {player_id} took {} card(s) from the field", cards.len());

        state
            .seating
            .force_to(next)
            .map_err(|error| RuleError::IntegrityViolation { error })?;

        let mut events = Vec::new();
        Self::emit(state, &mut events, MatchEvent::FieldTaken { player_id, cards });
        Self::emit(
            state,
            &mut events,
            MatchEvent::FieldCleared {
                reason: ClearReason::Take,
            },
        );
        Self::emit(state, &mut events, MatchEvent::TurnChanged { player_id: next });
        Ok(events)
    }
}

pub fn apply_play(
    state: &MatchState,
    player_id: PlayerId,
    indices: &[usize],
) -> Result<MatchState, RuleError> {
    RuleEngine::new().play(state, player_id, indices).map(|res| res.state)
}

pub fn apply_pass(state: &MatchState, player_id: PlayerId) -> Result<MatchState, RuleError> {
    RuleEngine::new().pass(state, player_id).map(|res| res.state)
}

pub fn apply_take(state: &MatchState, player_id: PlayerId) -> Result<MatchState, RuleError> {
    RuleEngine::new().take(state, player_id).map(|res| res.state)
}
