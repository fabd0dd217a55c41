use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{card::Card, strength::Strength};

/// 出牌不合法的原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "type")]
pub enum PlayViolation {
    #[error("no cards selected")]
    Empty,
    #[error("selected cards do not share one value")]
    MixedValues,
    #[error("field holds {expected} cards but {actual} were played")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("play does not beat the field")]
    NotStronger,
}

/// 一组牌的代表值（非赤牌）；全是赤牌时为赤牌。
pub fn representative(cards: &[Card]) -> Option<Card> {
    cards
        .iter()
        .copied()
        .find(|card| !card.is_wild())
        .or_else(|| cards.first().copied())
}

pub fn is_uniform(cards: &[Card]) -> bool {
    let mut values = cards.iter().filter(|card| !card.is_wild());
    match values.next() {
        Some(first) => values.all(|card| card == first),
        None => true,
    }
}

pub fn check_play(cards: &[Card], field: &[Card], strength: Strength) -> Result<(), PlayViolation> {
    let candidate = representative(cards).ok_or(PlayViolation::Empty)?;
    if !is_uniform(cards) {
        return Err(PlayViolation::MixedValues);
    }
    let Some(current) = representative(field) else {
        return Ok(());
    };
    if cards.len() != field.len() {
        return Err(PlayViolation::SizeMismatch {
            expected: field.len(),
            actual: cards.len(),
        });
    }
    if !strength.is_stronger(candidate, current) {
        return Err(PlayViolation::NotStronger);
    }
    Ok(())
}

pub fn can_play(cards: &[Card], field: &[Card], strength: Strength) -> bool {
    check_play(cards, field, strength).is_ok()
}
