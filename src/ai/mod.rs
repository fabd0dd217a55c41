//! 电脑玩家（无前瞻的确定性启发式）。

pub mod heuristic;

pub use heuristic::{
    agent_decide, group_by_value, AiAgent, AiConfig, AiDecision, AiStrategy, CardGroup,
};
