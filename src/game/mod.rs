//! 游戏核心逻辑模块（牌力、合法性、特效、状态机）。

pub mod card;
pub mod domination;
pub mod effects;
pub mod legality;
pub mod rules;
pub mod state;
pub mod strength;
pub mod turn;

pub use card::{format_cards, Card, CardCodeError, DeckKind, Wind, WILD_CODE};
pub use domination::{take_eligible, TakeCheck};
pub use effects::PlayEffects;
pub use legality::{can_play, check_play, representative, PlayViolation};
pub use rules::{
    apply_pass, apply_play, apply_take, Intent, MatchAction, RuleEngine, RuleError,
    RuleResolution,
};
pub use state::{
    new_match, ClearReason, IntegrityError, MatchEvent, MatchOutcome, MatchState, MatchView,
    Player, PlayerId, PlayerRole, SeatSummary,
};
pub use strength::{effective_reversed, rank, Strength};
pub use turn::TurnScheduler;
