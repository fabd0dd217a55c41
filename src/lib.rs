pub mod ai;
pub mod config;
pub mod game;
pub mod sync;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, Serializer};
use std::fmt::Display;
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{agent_decide, AiAgent, AiConfig, AiDecision, AiStrategy};
pub use config::{ConfigError, DealRemainder, MatchConfig};
pub use game::{
    apply_pass, apply_play, apply_take, new_match, Card, DeckKind, Intent, IntegrityError,
    MatchAction, MatchEvent, MatchOutcome, MatchState, MatchView, Player, PlayerId, RuleEngine,
    RuleError, RuleResolution, Strength,
};
pub use sync::{
    plan_update, start_room, DocumentPatch, DocumentStore, MemoryStore, OnlineSeat,
    RoomDocument, RoomStatus, SyncError,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    utils::init_logging(log::LevelFilter::Info);
}

/// 输出普通 JS 对象（而非 `Map`），房间记录才能原样写回共享存储。
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    from_value(value).map_err(JsValue::from)
}

fn to_js_error<E: Serialize + Display>(error: E) -> JsValue {
    to_js(&error).unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn serde_to_js_error<E: Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: &RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(resolution).map_err(serde_to_js_error)
}

fn agent_config(base: &AiConfig, strategy: Option<&str>) -> AiConfig {
    match strategy.and_then(|value| AiStrategy::from_str(value).ok()) {
        Some(strategy) => base.clone().with_strategy(strategy),
        None => base.clone(),
    }
}

#[derive(Serialize)]
struct AgentMoveResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<AiDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<RuleResolution>,
}

#[wasm_bindgen]
pub struct MatchEngine {
    state: MatchState,
    agent: AiConfig,
}

#[wasm_bindgen]
impl MatchEngine {
    /// `config_json` 为 `MatchConfig`，缺省字段取默认值。
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<MatchEngine, JsValue> {
        let config = match config_json {
            Some(json) => MatchConfig::from_json(&json).map_err(to_js_error)?,
            None => MatchConfig::default(),
        };
        let state = MatchState::new_match(&config).map_err(to_js_error)?;
        Ok(MatchEngine {
            state,
            agent: AiConfig::default(),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: MatchState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        state
            .integrity_check()
            .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
        self.state = state;
        Ok(())
    }

    pub fn set_agent_json(&mut self, json: &str) -> Result<(), JsValue> {
        self.agent = serde_json::from_str(json).map_err(serde_to_js_error)?;
        Ok(())
    }

    pub fn turn_owner(&self) -> PlayerId {
        self.state.turn_owner()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn view_json(&self, player_id: PlayerId) -> Result<String, JsValue> {
        let view = self
            .state
            .view_for(player_id)
            .ok_or_else(|| to_js_error(RuleError::UnknownPlayer { player_id }))?;
        serde_json::to_string(&view).map_err(serde_to_js_error)
    }

    pub fn history_text(&self) -> String {
        self.state.history_text()
    }

    /// `action_json` 为 `MatchAction`，如 `{"player_id":0,"intent":{"type":"Pass"}}`。
    pub fn apply_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: MatchAction = serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        self.apply_intent(action.player_id, &action.intent)
    }

    pub fn play_json(&mut self, player_id: PlayerId, indices_json: &str) -> Result<String, JsValue> {
        let indices: Vec<usize> = serde_json::from_str(indices_json).map_err(serde_to_js_error)?;
        self.apply_intent(player_id, &Intent::Play { indices })
    }

    pub fn pass(&mut self, player_id: PlayerId) -> Result<String, JsValue> {
        self.apply_intent(player_id, &Intent::Pass)
    }

    pub fn take(&mut self, player_id: PlayerId) -> Result<String, JsValue> {
        self.apply_intent(player_id, &Intent::Take)
    }

    /// 当前轮到的电脑玩家走一步。
    pub fn agent_move(&mut self, strategy: Option<String>) -> Result<String, JsValue> {
        let config = agent_config(&self.agent, strategy.as_deref());
        let decision = AiAgent::new(config).decide_action(&self.state);
        let applied = match &decision {
            Some(decision) => Some(self.resolve(decision.player_id, &decision.intent)?),
            None => None,
        };
        let response = AgentMoveResponse { decision, applied };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    /// 电脑玩家连续行动，直到轮到人类。
    pub fn run_agents(&mut self) -> Result<String, JsValue> {
        let resolution = AiAgent::new(self.agent.clone())
            .run_agents(&self.state)
            .map_err(to_js_error)?;
        self.state = resolution.state.clone();
        make_resolution_json(&resolution)
    }

    pub fn think_agent(&self, strategy: Option<String>, delay_ms: Option<u32>) -> Promise {
        let state = self.state.clone();
        let config = agent_config(&self.agent, strategy.as_deref());
        let delay = delay_ms.unwrap_or(config.think_delay_ms);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let decision = AiAgent::new(config).decide_action(&state);
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    fn resolve(&mut self, player_id: PlayerId, intent: &Intent) -> Result<RuleResolution, JsValue> {
        let resolution = RuleEngine::new()
            .apply(&self.state, player_id, intent)
            .map_err(to_js_error)?;
        self.state = resolution.state.clone();
        Ok(resolution)
    }

    fn apply_intent(&mut self, player_id: PlayerId, intent: &Intent) -> Result<String, JsValue> {
        let resolution = self.resolve(player_id, intent)?;
        make_resolution_json(&resolution)
    }
}

/// 按人数与种子发牌，返回新的对局状态。
#[wasm_bindgen(js_name = "newMatch")]
pub fn new_match_js(player_count: u32, seed: Option<u32>) -> Result<JsValue, JsValue> {
    let state = new_match(player_count as usize, seed.map(u64::from)).map_err(to_js_error)?;
    to_js(&state)
}

#[wasm_bindgen(js_name = "applyPlay")]
pub fn apply_play_js(state: JsValue, player_id: PlayerId, indices: JsValue) -> Result<JsValue, JsValue> {
    let state: MatchState = from_js(state)?;
    let indices: Vec<usize> = from_js(indices)?;
    match RuleEngine::new().play(&state, player_id, &indices) {
        Ok(resolution) => to_js(&resolution),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "applyPass")]
pub fn apply_pass_js(state: JsValue, player_id: PlayerId) -> Result<JsValue, JsValue> {
    let state: MatchState = from_js(state)?;
    match RuleEngine::new().pass(&state, player_id) {
        Ok(resolution) => to_js(&resolution),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "applyTake")]
pub fn apply_take_js(state: JsValue, player_id: PlayerId) -> Result<JsValue, JsValue> {
    let state: MatchState = from_js(state)?;
    match RuleEngine::new().take(&state, player_id) {
        Ok(resolution) => to_js(&resolution),
        Err(error) => Err(to_js_error(error)),
    }
}

/// 默认策略下当前轮到者的意图；对局结束时返回 `null`。
#[wasm_bindgen(js_name = "agentDecide")]
pub fn agent_decide_js(state: JsValue) -> Result<JsValue, JsValue> {
    let state: MatchState = from_js(state)?;
    to_js(&agent_decide(&state))
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: MatchState = from_js(state)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

#[wasm_bindgen(js_name = "planRoomUpdate")]
pub fn plan_room_update(doc: JsValue, handle: &str, intent: JsValue) -> Result<JsValue, JsValue> {
    let doc: RoomDocument = from_js(doc)?;
    let intent: Intent = from_js(intent)?;
    let update = plan_update(&doc, handle, &intent).map_err(to_js_error)?;
    to_js(&update)
}

#[wasm_bindgen(js_name = "startRoom")]
pub fn start_room_js(doc: JsValue, seed: Option<u32>) -> Result<JsValue, JsValue> {
    let doc: RoomDocument = from_js(doc)?;
    let patch = start_room(&doc, seed.map(u64::from)).map_err(to_js_error)?;
    to_js(&patch)
}

#[wasm_bindgen(js_name = "applyRoomPatch")]
pub fn apply_room_patch(doc: JsValue, patch: JsValue) -> Result<JsValue, JsValue> {
    let mut doc: RoomDocument = from_js(doc)?;
    let patch: DocumentPatch = from_js(patch)?;
    doc.apply(&patch).map_err(to_js_error)?;
    to_js(&doc)
}
