use serde::{Deserialize, Serialize};

use super::card::{Card, Wind};

/// 一次出牌触发的特殊效果（革命 / 南面 / 8切）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayEffects {
    pub revolution: bool,
    pub south_effect: bool,
    pub eight_cut: bool,
}

impl PlayEffects {
    /// 在状态变更之前对待出的牌判定。
    pub fn detect(cards: &[Card]) -> Self {
        Self {
            revolution: is_revolution(cards),
            south_effect: triggers_south_effect(cards),
            eight_cut: triggers_eight_cut(cards),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.revolution || self.south_effect || self.eight_cut)
    }
}

pub fn is_revolution(cards: &[Card]) -> bool {
    if cards.len() != 4 {
        return false;
    }
    let all_same = cards.iter().all(|card| *card == cards[0]);
    let four_winds = Wind::ALL
        .iter()
        .all(|wind| cards.contains(&Card::Wind(*wind)));
    all_same || four_winds
}

pub fn triggers_south_effect(cards: &[Card]) -> bool {
    cards.contains(&Card::SOUTH)
}

pub fn triggers_eight_cut(cards: &[Card]) -> bool {
    cards.contains(&Card::EIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_of_a_kind_is_a_revolution() {
        assert!(is_revolution(&[Card::Numeral(5); 4]));
        assert!(!is_revolution(&[Card::Numeral(5); 3]));
        assert!(!is_revolution(&[
            Card::Numeral(5),
            Card::Numeral(5),
            Card::Numeral(5),
            Card::Wild
        ]));
    }

    #[test]
    fn four_winds_in_any_order_is_a_revolution() {
        let winds = [
            Card::Wind(Wind::North),
            Card::Wind(Wind::East),
            Card::Wind(Wind::West),
            Card::Wind(Wind::South),
        ];
        assert!(is_revolution(&winds));

        let missing_west = [
            Card::Wind(Wind::North),
            Card::Wind(Wind::East),
            Card::Wind(Wind::East),
            Card::Wind(Wind::South),
        ];
        assert!(!is_revolution(&missing_west));
    }

    #[test]
    fn all_three_effects_fire_together() {
        let effects = PlayEffects::detect(&[Card::EIGHT; 4]);
        assert!(effects.revolution);
        assert!(effects.eight_cut);
        assert!(!effects.south_effect);

        let south = PlayEffects::detect(&[Card::SOUTH, Card::Wild]);
        assert!(south.south_effect);
        assert!(!south.eight_cut);

        assert!(PlayEffects::detect(&[Card::Numeral(3)]).is_empty());
    }
}
