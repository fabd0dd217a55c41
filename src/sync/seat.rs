use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::game::{Intent, MatchState, MatchView, PlayerId, RuleEngine, RuleResolution};

use super::{DocumentPatch, DocumentStore, RoomDocument, RoomStatus, SyncError};

/// 一次本地意图的计划结果：待写入的补丁与引擎裁定。
/// 裁定没有任何事件时（空场过牌）没有补丁，记录与版本都不动。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<DocumentPatch>,
    pub resolution: RuleResolution,
}

/// 在重建的对局上结算 `handle` 的意图，并计划写回内容。
pub fn plan_update(doc: &RoomDocument, handle: &str, intent: &Intent) -> Result<RoomUpdate, SyncError> {
    doc.ensure_playing()?;
    let seat = doc.seat_of(handle).ok_or_else(|| SyncError::UnknownSeat {
        handle: handle.to_string(),
    })?;
    let state = doc.to_state()?;
    let resolution = RuleEngine::new().apply(&state, seat, intent)?;
    let patch = if resolution.events.is_empty() {
        None
    } else {
        Some(DocumentPatch::from_state(doc, &resolution.state)?)
    };
    Ok(RoomUpdate { patch, resolution })
}

pub fn start_room(doc: &RoomDocument, seed: Option<u64>) -> Result<DocumentPatch, SyncError> {
    let mut rng = match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    start_room_with(doc, &mut rng)
}

/// 房主发牌：打乱座次，发房间牌组，第一位先手。
pub fn start_room_with<R: Rng + ?Sized>(
    doc: &RoomDocument,
    rng: &mut R,
) -> Result<DocumentPatch, SyncError> {
    if doc.status != RoomStatus::Waiting {
        return Err(SyncError::AlreadyStarted { status: doc.status });
    }

    let mut handles: Vec<String> = doc.players.keys().cloned().collect();
    handles.shuffle(rng);

    let mut config = MatchConfig::online(handles.len());
    config.deck = doc.deck;
    config.names = handles
        .iter()
        .filter_map(|handle| doc.players.get(handle))
        .map(|seat| seat.name.clone())
        .collect();
    let state = MatchState::deal_with(&config, rng)?;

    let hands: BTreeMap<String, _> = handles
        .iter()
        .cloned()
        .zip(state.players.iter().map(|player| player.hand.clone()))
        .collect();
    log::info!("room starting with {} seats", handles.len());

    Ok(DocumentPatch {
        base_version: doc.version,
        status: Some(RoomStatus::Playing),
        hands,
        field: Some(Vec::new()),
        field_stack: Some(Vec::new()),
        locked_count: Some(0),
        is_reversed: Some(false),
        south_effect_active: Some(false),
        turn: handles.first().cloned(),
        turn_order: Some(handles),
        winner: None,
    })
}

/// 单个联机席位的本地副本。每次观察都整体替换，不做增量合并。
#[derive(Debug, Clone)]
pub struct OnlineSeat {
    room_id: String,
    handle: String,
    document: Option<RoomDocument>,
    replica: Option<MatchState>,
    seat: Option<PlayerId>,
}

impl OnlineSeat {
    pub fn new(room_id: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            handle: handle.into(),
            document: None,
            replica: None,
            seat: None,
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn version(&self) -> Option<u64> {
        self.document.as_ref().map(|doc| doc.version)
    }

    pub fn state(&self) -> Option<&MatchState> {
        self.replica.as_ref()
    }

    pub fn observe(&mut self, doc: &RoomDocument) -> Result<(), SyncError> {
        let replica = match doc.status {
            RoomStatus::Waiting => None,
            RoomStatus::Playing | RoomStatus::Finished => Some(doc.to_state()?),
        };
        self.seat = doc.seat_of(&self.handle);
        self.replica = replica;
        self.document = Some(doc.clone());
        Ok(())
    }

    pub fn refresh<S: DocumentStore + ?Sized>(&mut self, store: &S) -> Result<(), SyncError> {
        let doc = store.read(&self.room_id)?;
        self.observe(&doc)
    }

    pub fn view(&self) -> Option<MatchView> {
        self.replica.as_ref()?.view_for(self.seat?)
    }

    pub fn is_my_turn(&self) -> bool {
        self.view().map(|view| view.is_my_turn).unwrap_or(false)
    }

    /// 基于最近观察到的记录计划并按其版本写入；并发写入时返回 `StaleVersion`，不重试。
    pub fn submit<S: DocumentStore + ?Sized>(
        &mut self,
        store: &mut S,
        intent: &Intent,
    ) -> Result<RuleResolution, SyncError> {
        let doc = self.document.as_ref().ok_or(SyncError::NotPlaying {
            status: RoomStatus::Waiting,
        })?;
        let update = plan_update(doc, &self.handle, intent)?;
        if let Some(patch) = &update.patch {
            let updated = store.update(&self.room_id, patch)?;
            self.observe(&updated)?;
        }
        Ok(update.resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Card, DeckKind, MatchEvent};
    use crate::sync::MemoryStore;

    fn lobby() -> RoomDocument {
        RoomDocument::new()
            .with_player("p_1", "Aki")
            .with_player("p_2", "Ren")
            .with_player("p_3", "Sora")
    }

    fn started_store() -> (MemoryStore, RoomDocument) {
        let mut store = MemoryStore::new();
        let doc = lobby();
        store.create("room", doc.clone()).expect("create should succeed");
        let patch = start_room(&doc, Some(5)).expect("lobby should start");
        let started = store.update("room", &patch).expect("start patch should apply");
        (store, started)
    }

    #[test]
    fn start_room_deals_double_deck_to_shuffled_seats() {
        let (_, doc) = started_store();
        assert_eq!(doc.status, RoomStatus::Playing);
        assert_eq!(doc.turn_order.len(), 3);
        assert_eq!(doc.turn.as_deref(), doc.turn_order.first().map(String::as_str));

        let sizes: Vec<usize> = doc
            .turn_order
            .iter()
            .map(|handle| doc.players[handle].hand.len())
            .collect();
        assert_eq!(sizes, vec![36, 36, 36]);

        let state = doc.to_state().expect("started room should rebuild");
        assert_eq!(state.deck, DeckKind::Double);
        state.integrity_check().expect("dealt room should be consistent");
        assert_eq!(state.card_total(), 108);
    }

    #[test]
    fn start_room_only_once() {
        let (_, doc) = started_store();
        assert!(matches!(
            start_room(&doc, Some(1)),
            Err(SyncError::AlreadyStarted { .. })
        ));
    }

    #[test]
    fn plan_update_rejects_out_of_turn_and_unknown_handles() {
        let (_, doc) = started_store();
        let waiting = doc.turn_order[1].clone();
        assert!(matches!(
            plan_update(&doc, &waiting, &Intent::Pass),
            Err(SyncError::Rule { .. })
        ));
        assert!(matches!(
            plan_update(&doc, "p_x", &Intent::Pass),
            Err(SyncError::UnknownSeat { .. })
        ));
        assert!(matches!(
            plan_update(&lobby(), "p_1", &Intent::Pass),
            Err(SyncError::NotPlaying { .. })
        ));
    }

    #[test]
    fn winning_play_marks_room_finished() {
        let mut doc = RoomDocument::new()
            .with_player("p_1", "Aki")
            .with_player("p_2", "Ren");
        doc.status = RoomStatus::Playing;
        doc.turn_order = vec!["p_1".to_string(), "p_2".to_string()];
        doc.turn = Some("p_1".to_string());
        doc.players.get_mut("p_1").expect("seated").hand = vec![Card::Numeral(4)];
        doc.players.get_mut("p_2").expect("seated").hand = vec![Card::Numeral(6), Card::Numeral(7)];

        let update = plan_update(&doc, "p_1", &Intent::Play { indices: vec![0] })
            .expect("winning play is legal");
        let patch = update.patch.expect("winning play writes");
        assert_eq!(patch.status, Some(RoomStatus::Finished));
        assert_eq!(patch.winner.as_deref(), Some("Aki"));
        assert!(update
            .resolution
            .events
            .contains(&MatchEvent::MatchWon { winner: 0 }));

        doc.apply(&patch).expect("patch is current");
        assert_eq!(doc.status, RoomStatus::Finished);
        assert!(doc.players["p_1"].hand.is_empty());
    }

    #[test]
    fn pass_on_empty_field_writes_nothing() {
        let mut store = MemoryStore::new();
        let mut doc = RoomDocument::new()
            .with_player("p_1", "Aki")
            .with_player("p_2", "Ren");
        doc.status = RoomStatus::Playing;
        doc.turn_order = vec!["p_1".to_string(), "p_2".to_string()];
        doc.turn = Some("p_1".to_string());
        doc.players.get_mut("p_1").expect("seated").hand = vec![Card::Numeral(4), Card::Numeral(5)];
        doc.players.get_mut("p_2").expect("seated").hand = vec![Card::Numeral(6), Card::Numeral(7)];
        store.create("room", doc.clone()).expect("create should succeed");

        let update = plan_update(&doc, "p_1", &Intent::Pass).expect("empty-field pass is legal");
        assert!(update.patch.is_none());
        assert!(update.resolution.events.is_empty());

        let mut seat = OnlineSeat::new("room", "p_1");
        seat.observe(&doc).expect("room should rebuild");
        seat.submit(&mut store, &Intent::Pass).expect("empty-field pass is legal");
        assert_eq!(store.read("room").expect("room exists").version, 0);
        assert_eq!(seat.version(), Some(0));
        assert!(seat.is_my_turn());

        // 另一个标签页基于同一版本的写入不会因此过期。
        let mut other_tab = OnlineSeat::new("room", "p_1");
        other_tab.observe(&doc).expect("room should rebuild");
        other_tab
            .submit(&mut store, &Intent::Play { indices: vec![0] })
            .expect("write against version 0 still applies");
        assert_eq!(store.read("room").expect("room exists").version, 1);
    }

    #[test]
    fn seats_replace_replica_on_each_observation() {
        let (mut store, doc) = started_store();
        let opener = doc.turn_order[0].clone();
        let follower = doc.turn_order[1].clone();

        let mut first = OnlineSeat::new("room", opener.clone());
        let mut second = OnlineSeat::new("room", follower);
        first.observe(&doc).expect("room should rebuild");
        second.observe(&doc).expect("room should rebuild");
        assert!(first.is_my_turn());
        assert!(!second.is_my_turn());

        let resolution = first
            .submit(&mut store, &Intent::Play { indices: vec![0] })
            .expect("opening play is legal");
        assert_eq!(resolution.state.field.len(), 1);
        assert_eq!(first.version(), Some(2));
        assert!(!first.is_my_turn());

        second.refresh(&store).expect("room should rebuild");
        assert!(second.is_my_turn());
        let view = second.view().expect("seat should be visible");
        assert_eq!(view.field, resolution.state.field);
        assert_eq!(view.opponents.iter().map(|o| o.hand_size).sum::<usize>(), 35 + 36);
        assert_eq!(first.handle(), opener);
    }

    #[test]
    fn concurrent_writer_gets_stale_version() {
        let (mut store, doc) = started_store();
        let opener = doc.turn_order[0].clone();

        // 同一席位的两个标签页。
        let mut tab_a = OnlineSeat::new("room", opener.clone());
        let mut tab_b = OnlineSeat::new("room", opener);
        tab_a.observe(&doc).expect("room should rebuild");
        tab_b.observe(&doc).expect("room should rebuild");

        tab_a
            .submit(&mut store, &Intent::Play { indices: vec![0] })
            .expect("first write wins");
        let error = tab_b
            .submit(&mut store, &Intent::Play { indices: vec![0] })
            .expect_err("second write is stale");
        assert_eq!(
            error,
            SyncError::StaleVersion {
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(store.read("room").expect("room exists").version, 2);
    }
}
