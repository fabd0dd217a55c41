//! 牌力顺序：革命与南面共同决定是否反转。

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::card::{Card, Wind};

/// 基础牌力：最弱 3 → 1，最强赤牌 → 14。
pub fn rank(card: Card) -> u8 {
    match card {
        Card::Wild => 14,
        Card::Numeral(2) => 13,
        Card::Numeral(1) => 12,
        Card::Wind(Wind::North) => 11,
        Card::Wind(Wind::West) => 10,
        Card::Wind(Wind::South) => 9,
        Card::Wind(Wind::East) => 8,
        Card::Numeral(value) => value.saturating_sub(2),
    }
}

pub fn effective_reversed(revolution_active: bool, south_effect_active: bool) -> bool {
    revolution_active ^ south_effect_active
}

/// 当前生效的强弱比较器。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strength {
    reversed: bool,
}

impl Strength {
    pub fn new(revolution_active: bool, south_effect_active: bool) -> Self {
        Self {
            reversed: effective_reversed(revolution_active, south_effect_active),
        }
    }

    pub fn normal() -> Self {
        Self { reversed: false }
    }

    pub fn reversed() -> Self {
        Self { reversed: true }
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// 赤牌无论是否反转都压过其他牌。
    pub fn is_stronger(&self, a: Card, b: Card) -> bool {
        match (a.is_wild(), b.is_wild()) {
            (true, false) => true,
            (false, true) => false,
            _ => {
                let (ra, rb) = (rank(a), rank(b));
                if self.reversed {
                    ra < rb
                } else {
                    ra > rb
                }
            }
        }
    }

    /// 升序键：当前顺序下最弱的牌在前。
    pub fn sort_key(&self, card: Card) -> i16 {
        if card.is_wild() {
            return i16::MAX;
        }
        let base = i16::from(rank(card));
        if self.reversed {
            -base
        } else {
            base
        }
    }

    pub fn compare(&self, a: Card, b: Card) -> Ordering {
        self.sort_key(a).cmp(&self.sort_key(b))
    }
}
