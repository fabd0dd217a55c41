use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::game::{
    representative, Card, Intent, MatchEvent, MatchState, PlayerId, RuleEngine, RuleError,
    RuleResolution,
};

const DEFAULT_THINK_DELAY_MS: u32 = 500;
const DEFAULT_MAX_AGENT_STEPS: usize = 512;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiStrategy {
    /// 出能压过场面的最弱一组，否则过；从不倒す。
    Classic,
    /// 段数足够时先倒す，其余同 `Classic`。
    Dominating,
}

impl Default for AiStrategy {
    fn default() -> Self {
        AiStrategy::Classic
    }
}

impl FromStr for AiStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classic" | "default" => Ok(AiStrategy::Classic),
            "dominating" | "take" => Ok(AiStrategy::Dominating),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AiConfig {
    pub strategy: AiStrategy,
    pub think_delay_ms: u32,
    pub max_steps: usize,
}

impl AiConfig {
    pub fn from_strategy(strategy: AiStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: AiStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_think_delay(mut self, delay_ms: u32) -> Self {
        self.think_delay_ms = delay_ms;
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            strategy: AiStrategy::Classic,
            think_delay_ms: DEFAULT_THINK_DELAY_MS,
            max_steps: DEFAULT_MAX_AGENT_STEPS,
        }
    }
}

/// 同点数的一组手牌及其下标。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardGroup {
    pub card: Card,
    pub indices: Vec<usize>,
}

impl CardGroup {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// 按点数分组，按当前强弱顺序由弱到强排列。
pub fn group_by_value(state: &MatchState, hand: &[Card]) -> Vec<CardGroup> {
    let mut groups: Vec<CardGroup> = Vec::new();
    for (index, card) in hand.iter().enumerate() {
        match groups.iter_mut().find(|group| group.card == *card) {
            Some(group) => group.indices.push(index),
            None => groups.push(CardGroup {
                card: *card,
                indices: vec![index],
            }),
        }
    }
    let strength = state.strength();
    groups.sort_by_key(|group| strength.sort_key(group.card));
    groups
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    pub player_id: PlayerId,
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<Card>,
    pub strategy: AiStrategy,
}

#[derive(Debug, Clone, Default)]
pub struct AiAgent {
    config: AiConfig,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// 当前轮到者的决策；对局结束时返回 `None`。
    pub fn decide_action(&self, state: &MatchState) -> Option<AiDecision> {
        if state.is_finished() {
            return None;
        }
        let player_id = state.turn_owner();
        let player = state.get_player(player_id)?;
        let strategy = self.config.strategy;

        if strategy == AiStrategy::Dominating && state.take_check().is_eligible() {
            return Some(AiDecision {
                player_id,
                intent: Intent::Take,
                cards: state.field.clone(),
                strategy,
            });
        }

        let groups = group_by_value(state, &player.hand);
        let choice = match representative(&state.field) {
            None => groups.into_iter().next(),
            Some(current) => {
                let strength = state.strength();
                groups.into_iter().find(|group| {
                    group.len() == state.field.len() && strength.is_stronger(group.card, current)
                })
            }
        };

        let decision = match choice {
            Some(group) => AiDecision {
                player_id,
                cards: vec![group.card; group.len()],
                intent: Intent::Play {
                    indices: group.indices,
                },
                strategy,
            },
            None => AiDecision {
                player_id,
                intent: Intent::Pass,
                cards: Vec::new(),
                strategy,
            },
        };
        Some(decision)
    }

    /// 电脑玩家连续行动，直到轮到人类或对局结束。
    pub fn run_agents(&self, state: &MatchState) -> Result<RuleResolution, RuleError> {
        let engine = RuleEngine::new();
        let mut current = state.clone();
        let mut events: Vec<MatchEvent> = Vec::new();

        for _ in 0..self.config.max_steps {
            let owner_is_agent = current
                .get_player(current.turn_owner())
                .map(|player| player.is_agent())
                .unwrap_or(false);
            if current.is_finished() || !owner_is_agent {
                break;
            }
            let Some(decision) = self.decide_action(&current) else {
                break;
            };
            log::debug!("agent {} chose {:?}", decision.player_id, decision.intent);
            let mut resolution = engine.apply(&current, decision.player_id, &decision.intent)?;
            events.append(&mut resolution.events);
            current = resolution.state;
        }

        Ok(RuleResolution::new(current, events))
    }
}

/// 默认策略下当前轮到者的意图。
pub fn agent_decide(state: &MatchState) -> Option<Intent> {
    AiAgent::default()
        .decide_action(state)
        .map(|decision| decision.intent)
}
