use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 赤牌在共享文档中的编码。
pub const WILD_CODE: u8 = 99;

const COPIES_PER_VALUE: usize = 4;
const WILD_COPIES: usize = 2;

static SINGLE_DECK: Lazy<Vec<Card>> = Lazy::new(|| {
    let mut deck = Vec::with_capacity(DeckKind::Single.len());
    for value in 1..=9 {
        deck.extend(std::iter::repeat(Card::Numeral(value)).take(COPIES_PER_VALUE));
    }
    for wind in Wind::ALL {
        deck.extend(std::iter::repeat(Card::Wind(wind)).take(COPIES_PER_VALUE));
    }
    deck.extend(std::iter::repeat(Card::Wild).take(WILD_COPIES));
    deck
});

/// 风牌（东南西北）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Wind {
    East,
    South,
    West,
    North,
}

impl Wind {
    pub const ALL: [Wind; 4] = [Wind::East, Wind::South, Wind::West, Wind::North];

    pub fn code(self) -> u8 {
        match self {
            Wind::East => 10,
            Wind::South => 11,
            Wind::West => 12,
            Wind::North => 13,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Wind::East => "東",
            Wind::South => "南",
            Wind::West => "西",
            Wind::North => "北",
        }
    }
}

/// 牌：数牌 1-9、风牌或赤牌。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Card {
    /// 数值须在 1-9 之间。外部输入请用 `Card::numeral` 或 `Card::try_from(u8)` 构造；
    /// 反序列化同样经过 `try_from`，越界值只可能由代码直接构造，`integrity_check` 会拒绝它。
    Numeral(u8),
    Wind(Wind),
    Wild,
}

impl Card {
    pub const SOUTH: Card = Card::Wind(Wind::South);
    pub const EIGHT: Card = Card::Numeral(8);

    pub fn numeral(value: u8) -> Result<Self, CardCodeError> {
        if (1..=9).contains(&value) {
            Ok(Card::Numeral(value))
        } else {
            Err(CardCodeError { code: value })
        }
    }

    pub fn is_wild(self) -> bool {
        matches!(self, Card::Wild)
    }

    pub fn code(self) -> u8 {
        match self {
            Card::Numeral(value) => value,
            Card::Wind(wind) => wind.code(),
            Card::Wild => WILD_CODE,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Card::Numeral(value) => write!(f, "{value}"),
            Card::Wind(wind) => f.write_str(wind.glyph()),
            Card::Wild => f.write_str("赤"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown card code {code}")]
pub struct CardCodeError {
    pub code: u8,
}

impl From<Card> for u8 {
    fn from(card: Card) -> Self {
        card.code()
    }
}

impl TryFrom<u8> for Card {
    type Error = CardCodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1..=9 => Ok(Card::Numeral(code)),
            10 => Ok(Card::Wind(Wind::East)),
            11 => Ok(Card::Wind(Wind::South)),
            12 => Ok(Card::Wind(Wind::West)),
            13 => Ok(Card::Wind(Wind::North)),
            WILD_CODE => Ok(Card::Wild),
            _ => Err(CardCodeError { code }),
        }
    }
}

/// 牌组规格：单副（本地对战）或双副（联机房间）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckKind {
    Single,
    Double,
}

impl Default for DeckKind {
    fn default() -> Self {
        DeckKind::Single
    }
}

impl DeckKind {
    fn copies(self) -> usize {
        match self {
            DeckKind::Single => 1,
            DeckKind::Double => 2,
        }
    }

    pub fn len(self) -> usize {
        (9 * COPIES_PER_VALUE + Wind::ALL.len() * COPIES_PER_VALUE + WILD_COPIES) * self.copies()
    }

    pub fn cards(self) -> Vec<Card> {
        let mut cards = Vec::with_capacity(self.len());
        for _ in 0..self.copies() {
            cards.extend_from_slice(&SINGLE_DECK);
        }
        cards
    }

    /// 该规格整副牌中 `card` 的张数。
    pub fn count_of(self, card: Card) -> usize {
        let per_copy = match card {
            Card::Numeral(1..=9) | Card::Wind(_) => COPIES_PER_VALUE,
            Card::Wild => WILD_COPIES,
            Card::Numeral(_) => 0,
        };
        per_copy * self.copies()
    }

    /// 牌组中所有不同的牌面。
    pub fn distinct_cards() -> impl Iterator<Item = Card> {
        (1..=9)
            .map(Card::Numeral)
            .chain(Wind::ALL.into_iter().map(Card::Wind))
            .chain(std::iter::once(Card::Wild))
    }
}

pub fn format_cards(cards: &[Card]) -> String {
    let glyphs: Vec<String> = cards.iter().map(Card::to_string).collect();
    format!("({})", glyphs.join(","))
}
