use jang_fugou::ai::{AiAgent, AiConfig, AiStrategy};
use jang_fugou::game::{ClearReason, MatchEvent, MatchState};
use jang_fugou::sync::{start_room, DocumentStore, MemoryStore, OnlineSeat, RoomDocument, RoomStatus};
use jang_fugou::{agent_decide, Intent, MatchConfig, RuleEngine};

const STEP_LIMIT: usize = 2_000;

fn all_agents(player_count: usize, seed: u64) -> MatchState {
    let config = MatchConfig::for_players(player_count)
        .with_seed(seed)
        .with_human_seats(Vec::new());
    MatchState::new_match(&config).expect("deal should succeed")
}

fn assert_consistent(state: &MatchState) {
    state.integrity_check().expect("state should stay consistent");
    assert_eq!(state.card_total(), state.deck.len());
    assert_eq!(state.locked_count, state.field.len());
    assert!(!state.south_effect_active || !state.field.is_empty());
    assert!(state.field_stack.len() >= usize::from(!state.field.is_empty()));
}

/// 逐步执行决策，检查每个中间状态。
fn play_out(mut state: MatchState, agent: &AiAgent) -> (MatchState, Vec<MatchEvent>) {
    let engine = RuleEngine::new();
    let mut events = Vec::new();
    for _ in 0..STEP_LIMIT {
        let Some(decision) = agent.decide_action(&state) else {
            break;
        };
        let resolution = engine
            .apply(&state, decision.player_id, &decision.intent)
            .expect("agent decisions should be legal");
        events.extend(resolution.events);
        state = resolution.state;
        assert_consistent(&state);
    }
    (state, events)
}

#[test]
fn classic_agents_finish_every_seeded_match() {
    for seed in 0..20 {
        for players in [2, 3, 4, 5] {
            let start = all_agents(players, seed);
            assert_consistent(&start);
            let (end, events) = play_out(start, &AiAgent::default());

            let outcome = end.outcome.clone().expect("match should finish");
            let winner = end.get_player(outcome.winner).expect("winner is seated");
            assert!(winner.hand.is_empty());
            assert!(end
                .players
                .iter()
                .filter(|player| player.id != outcome.winner)
                .all(|player| !player.hand.is_empty()));
            assert_eq!(events.last(), Some(&MatchEvent::MatchWon { winner: outcome.winner }));
            assert!(!events
                .iter()
                .any(|event| matches!(event, MatchEvent::FieldTaken { .. })));

            let toggles = events
                .iter()
                .filter(|event| matches!(event, MatchEvent::RevolutionToggled { .. }))
                .count();
            assert_eq!(end.revolution_active, toggles % 2 == 1);
        }
    }
}

#[test]
fn dominating_agents_keep_the_deck_intact() {
    let agent = AiAgent::new(AiConfig::from_strategy(AiStrategy::Dominating));
    let mut takes = 0;
    for seed in 0..10 {
        let (end, events) = play_out(all_agents(3, seed), &agent);
        assert_consistent(&end);
        for pair in events.windows(2) {
            if let MatchEvent::FieldTaken { .. } = pair[0] {
                takes += 1;
                assert_eq!(pair[1], MatchEvent::FieldCleared { reason: ClearReason::Take });
            }
        }
    }
    assert!(takes > 0, "dominating agents should take at least once");
}

#[test]
fn run_agents_matches_step_by_step_play() {
    let start = all_agents(3, 77);
    let batched = AiAgent::new(AiConfig {
        max_steps: STEP_LIMIT,
        ..AiConfig::default()
    })
    .run_agents(&start)
    .expect("agent decisions should be legal");
    let (stepped, _) = play_out(start, &AiAgent::default());
    assert_eq!(batched.state.outcome, stepped.outcome);
    assert_eq!(batched.outcome, stepped.outcome);
}

#[test]
fn agent_stops_for_the_human_seat() {
    let config = MatchConfig::for_players(3).with_seed(4);
    let state = MatchState::new_match(&config).expect("deal should succeed");
    assert_eq!(state.turn_owner(), 0);

    let opened = RuleEngine::new()
        .apply(&state, 0, &Intent::Play { indices: vec![0] })
        .expect("opening play is legal")
        .state;
    let resolution = AiAgent::default()
        .run_agents(&opened)
        .expect("agent decisions should be legal");
    assert!(resolution.state.is_finished() || resolution.state.turn_owner() == 0);
}

#[test]
fn online_room_plays_to_completion() {
    let mut store = MemoryStore::new();
    let lobby = RoomDocument::new()
        .with_player("p_1", "Aki")
        .with_player("p_2", "Ren")
        .with_player("p_3", "Sora");
    store.create("room", lobby.clone()).expect("create should succeed");
    let patch = start_room(&lobby, Some(21)).expect("lobby should start");
    store.update("room", &patch).expect("start patch should apply");

    let mut seats: Vec<OnlineSeat> = ["p_1", "p_2", "p_3"]
        .iter()
        .map(|handle| OnlineSeat::new("room", *handle))
        .collect();

    for _ in 0..STEP_LIMIT {
        for seat in seats.iter_mut() {
            seat.refresh(&store).expect("room should rebuild");
        }
        let doc = store.read("room").expect("room exists");
        if doc.status == RoomStatus::Finished {
            break;
        }
        let seat = seats
            .iter_mut()
            .find(|seat| seat.is_my_turn())
            .expect("exactly one seat holds the turn");
        let intent = seat
            .state()
            .and_then(agent_decide)
            .expect("running match has a decision");
        seat.submit(&mut store, &intent).expect("write should be current");
    }

    let doc = store.read("room").expect("room exists");
    assert_eq!(doc.status, RoomStatus::Finished);
    let winner = doc.winner.clone().expect("finished room names a winner");
    let record = doc
        .players
        .values()
        .find(|seat| seat.name == winner)
        .expect("winner is seated");
    assert!(record.hand.is_empty());

    let state = doc.to_state().expect("finished room should rebuild");
    assert_consistent(&state);
    assert_eq!(state.card_total(), 108);
}
