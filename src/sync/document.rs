use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::{
    Card, DeckKind, MatchOutcome, MatchState, Player, PlayerId, PlayerRole, TurnScheduler,
};

use super::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl Default for RoomStatus {
    fn default() -> Self {
        RoomStatus::Waiting
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRecord {
    pub name: String,
    #[serde(default)]
    pub hand: Vec<Card>,
}

fn room_deck() -> DeckKind {
    DeckKind::Double
}

/// 共享房间记录。座位 i 对应 `turn_order[i]`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDocument {
    #[serde(default)]
    pub status: RoomStatus,
    #[serde(default)]
    pub players: BTreeMap<String, SeatRecord>,
    #[serde(default)]
    pub field: Vec<Card>,
    #[serde(default)]
    pub field_stack: Vec<Vec<Card>>,
    #[serde(default)]
    pub locked_count: usize,
    #[serde(default)]
    pub is_reversed: bool,
    #[serde(default, alias = "nanmenActive")]
    pub south_effect_active: bool,
    #[serde(default)]
    pub turn_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(default)]
    pub version: u64,
    #[serde(default = "room_deck")]
    pub deck: DeckKind,
}

impl Default for RoomDocument {
    fn default() -> Self {
        Self {
            status: RoomStatus::Waiting,
            players: BTreeMap::new(),
            field: Vec::new(),
            field_stack: Vec::new(),
            locked_count: 0,
            is_reversed: false,
            south_effect_active: false,
            turn_order: Vec::new(),
            turn: None,
            winner: None,
            version: 0,
            deck: room_deck(),
        }
    }
}

impl RoomDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json).map_err(|error| SyncError::Malformed {
            message: error.to_string(),
        })
    }

    pub fn with_player(mut self, handle: impl Into<String>, name: impl Into<String>) -> Self {
        self.players.insert(
            handle.into(),
            SeatRecord {
                name: name.into(),
                hand: Vec::new(),
            },
        );
        self
    }

    pub fn seat_of(&self, handle: &str) -> Option<PlayerId> {
        let index = self.turn_order.iter().position(|seated| seated == handle)?;
        PlayerId::try_from(index).ok()
    }

    pub fn handle_of(&self, seat: PlayerId) -> Option<&str> {
        self.turn_order.get(usize::from(seat)).map(String::as_str)
    }

    pub fn ensure_playing(&self) -> Result<(), SyncError> {
        if self.status != RoomStatus::Playing {
            return Err(SyncError::NotPlaying {
                status: self.status,
            });
        }
        Ok(())
    }

    /// 由房间记录完整重建对局，不保留旧副本的任何内容。
    pub fn to_state(&self) -> Result<MatchState, SyncError> {
        let mut players = Vec::with_capacity(self.turn_order.len());
        let mut order = Vec::with_capacity(self.turn_order.len());
        for (index, handle) in self.turn_order.iter().enumerate() {
            let record = self.players.get(handle).ok_or_else(|| SyncError::UnknownSeat {
                handle: handle.clone(),
            })?;
            let seat = PlayerId::try_from(index).map_err(|_| SyncError::Malformed {
                message: format!("too many seats ({})", self.turn_order.len()),
            })?;
            players.push(Player::new(
                seat,
                record.name.clone(),
                PlayerRole::Human,
                record.hand.clone(),
            ));
            order.push(seat);
        }

        let turn = self.turn.as_deref().ok_or_else(|| SyncError::Malformed {
            message: "no turn owner".to_string(),
        })?;
        let owner = self.seat_of(turn).ok_or_else(|| SyncError::UnknownSeat {
            handle: turn.to_string(),
        })?;
        let seating = TurnScheduler::with_owner(order, owner).map_err(|error| SyncError::Malformed {
            message: error.to_string(),
        })?;

        let mut state = MatchState::from_parts(players, seating, self.deck).map_err(|error| {
            SyncError::Malformed {
                message: error.to_string(),
            }
        })?;
        state.field = self.field.clone();
        state.field_stack = self.field_stack.clone();
        state.locked_count = self.locked_count;
        state.revolution_active = self.is_reversed;
        state.south_effect_active = self.south_effect_active;
        state.rebuild_discard().map_err(|error| SyncError::Malformed {
            message: error.to_string(),
        })?;

        if self.status == RoomStatus::Finished {
            state.outcome = self.finished_seat(&state).map(|winner| MatchOutcome { winner });
        }
        Ok(state)
    }

    /// 胜者是手牌为空的座位；名字可能重复，只在多个空手座位间区分时使用。
    fn finished_seat(&self, state: &MatchState) -> Option<PlayerId> {
        let emptied: Vec<&Player> = state
            .players
            .iter()
            .filter(|player| player.hand.is_empty())
            .collect();
        match emptied.as_slice() {
            [] => None,
            [only] => Some(only.id),
            several => several
                .iter()
                .find(|player| self.winner.as_deref() == Some(player.name.as_str()))
                .or_else(|| several.first())
                .map(|player| player.id),
        }
    }

    /// 应用补丁；`base_version` 不一致时拒绝，且不重试。
    pub fn apply(&mut self, patch: &DocumentPatch) -> Result<u64, SyncError> {
        if patch.base_version != self.version {
            return Err(SyncError::StaleVersion {
                expected: patch.base_version,
                actual: self.version,
            });
        }
        if let Some(handle) = patch.hands.keys().find(|handle| !self.players.contains_key(*handle)) {
            return Err(SyncError::UnknownSeat {
                handle: handle.clone(),
            });
        }

        if let Some(status) = patch.status {
            self.status = status;
        }
        for (handle, hand) in &patch.hands {
            if let Some(record) = self.players.get_mut(handle) {
                record.hand = hand.clone();
            }
        }
        if let Some(field) = &patch.field {
            self.field = field.clone();
        }
        if let Some(stack) = &patch.field_stack {
            self.field_stack = stack.clone();
        }
        if let Some(locked) = patch.locked_count {
            self.locked_count = locked;
        }
        if let Some(reversed) = patch.is_reversed {
            self.is_reversed = reversed;
        }
        if let Some(south) = patch.south_effect_active {
            self.south_effect_active = south;
        }
        if let Some(order) = &patch.turn_order {
            self.turn_order = order.clone();
        }
        if let Some(turn) = &patch.turn {
            self.turn = Some(turn.clone());
        }
        if let Some(winner) = &patch.winner {
            self.winner = Some(winner.clone());
        }

        self.version += 1;
        Ok(self.version)
    }
}

/// 部分更新；未设置的字段保持原值。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    pub base_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RoomStatus>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hands: BTreeMap<String, Vec<Card>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<Vec<Card>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_stack: Option<Vec<Vec<Card>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_reversed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub south_effect_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_order: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

impl DocumentPatch {
    /// 以 `state` 整体替换所有手牌与场面。
    pub fn from_state(doc: &RoomDocument, state: &MatchState) -> Result<Self, SyncError> {
        let mut hands = BTreeMap::new();
        for player in &state.players {
            let handle = doc.handle_of(player.id).ok_or_else(|| SyncError::Malformed {
                message: format!("seat {} has no handle", player.id),
            })?;
            hands.insert(handle.to_string(), player.hand.clone());
        }
        let turn = doc
            .handle_of(state.turn_owner())
            .map(str::to_string)
            .ok_or_else(|| SyncError::Malformed {
                message: format!("seat {} has no handle", state.turn_owner()),
            })?;

        let mut patch = Self {
            base_version: doc.version,
            hands,
            field: Some(state.field.clone()),
            field_stack: Some(state.field_stack.clone()),
            locked_count: Some(state.locked_count),
            is_reversed: Some(state.revolution_active),
            south_effect_active: Some(state.south_effect_active),
            turn: Some(turn),
            ..Self::default()
        };
        if let Some(outcome) = &state.outcome {
            patch.status = Some(RoomStatus::Finished);
            patch.winner = state.get_player(outcome.winner).map(|player| player.name.clone());
        }
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_hand(doc: &mut RoomDocument, handle: &str, hand: Vec<Card>) {
        doc.players.get_mut(handle).expect("handle should be seated").hand = hand;
    }

    fn playing_room() -> RoomDocument {
        let mut doc = RoomDocument::new()
            .with_player("p_1", "Aki")
            .with_player("p_2", "Ren");
        doc.status = RoomStatus::Playing;
        doc.turn_order = vec!["p_2".to_string(), "p_1".to_string()];
        doc.turn = Some("p_2".to_string());
        set_hand(&mut doc, "p_1", vec![Card::Numeral(3), Card::Wild]);
        set_hand(&mut doc, "p_2", vec![Card::Numeral(5)]);
        doc
    }

    #[test]
    fn parses_shared_record_with_card_codes() {
        let json = r#"{
            "status": "playing",
            "players": {
                "p_1": {"name": "Aki", "hand": [3, 99]},
                "p_2": {"name": "Ren", "hand": [11]}
            },
            "field": [10, 10],
            "fieldStack": [[10, 10]],
            "lockedCount": 2,
            "isReversed": true,
            "nanmenActive": false,
            "turnOrder": ["p_1", "p_2"],
            "turn": "p_2"
        }"#;
        let doc = RoomDocument::from_json(json).expect("record should parse");
        assert_eq!(doc.deck, DeckKind::Double);
        assert_eq!(doc.version, 0);

        let state = doc.to_state().expect("record should rebuild");
        assert_eq!(state.turn_owner(), 1);
        assert_eq!(state.players[0].name, "Aki");
        assert_eq!(state.players[0].hand, vec![Card::Numeral(3), Card::Wild]);
        assert!(state.revolution_active);
        assert_eq!(state.locked_count, 2);
        state.integrity_check().expect("rebuilt state should be consistent");
    }

    #[test]
    fn seats_follow_turn_order() {
        let doc = playing_room();
        assert_eq!(doc.seat_of("p_2"), Some(0));
        assert_eq!(doc.seat_of("p_1"), Some(1));
        assert_eq!(doc.seat_of("p_9"), None);
        assert_eq!(doc.handle_of(1), Some("p_1"));
    }

    #[test]
    fn missing_seat_record_is_reported() {
        let mut doc = playing_room();
        doc.turn_order.push("ghost".to_string());
        assert_eq!(
            doc.to_state(),
            Err(SyncError::UnknownSeat {
                handle: "ghost".to_string()
            })
        );
    }

    #[test]
    fn stale_patch_is_rejected_without_side_effects() {
        let mut doc = playing_room();
        let patch = DocumentPatch {
            base_version: 0,
            turn: Some("p_1".to_string()),
            ..DocumentPatch::default()
        };
        assert_eq!(doc.apply(&patch), Ok(1));
        assert_eq!(doc.turn.as_deref(), Some("p_1"));

        let stale = DocumentPatch {
            base_version: 0,
            turn: Some("p_2".to_string()),
            ..DocumentPatch::default()
        };
        assert_eq!(
            doc.apply(&stale),
            Err(SyncError::StaleVersion {
                expected: 0,
                actual: 1
            })
        );
        assert_eq!(doc.turn.as_deref(), Some("p_1"));
        assert_eq!(doc.version, 1);
    }

    #[test]
    fn patch_for_unknown_handle_is_rejected() {
        let mut doc = playing_room();
        let mut patch = DocumentPatch::default();
        patch.hands.insert("p_9".to_string(), Vec::new());
        assert!(matches!(doc.apply(&patch), Err(SyncError::UnknownSeat { .. })));
        assert_eq!(doc.version, 0);
    }

    #[test]
    fn finished_room_restores_outcome() {
        let mut doc = playing_room();
        doc.status = RoomStatus::Finished;
        doc.winner = Some("Ren".to_string());
        set_hand(&mut doc, "p_2", Vec::new());
        let state = doc.to_state().expect("record should rebuild");
        assert_eq!(state.outcome, Some(MatchOutcome { winner: 0 }));
        assert!(doc.ensure_playing().is_err());
    }

    #[test]
    fn shared_names_do_not_hide_the_real_winner() {
        let mut doc = RoomDocument::new()
            .with_player("p_1", "名無し")
            .with_player("p_2", "名無し");
        doc.status = RoomStatus::Finished;
        doc.turn_order = vec!["p_1".to_string(), "p_2".to_string()];
        doc.turn = Some("p_2".to_string());
        doc.winner = Some("名無し".to_string());
        set_hand(&mut doc, "p_1", vec![Card::Numeral(7)]);
        let state = doc.to_state().expect("record should rebuild");
        assert_eq!(state.outcome, Some(MatchOutcome { winner: 1 }));
    }
}
