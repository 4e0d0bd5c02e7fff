mod common;

use serde_json::json;

use common::{bet, event_ref, wire_event, Harness};
use wager_engine::domain::{
    BetMarket, BetResult, Event, OverUnder, PropDirection, PropSelection,
};
use wager_engine::sweep::run_sweep;

const START: &str = "2024-01-01T19:00:00Z";
const AFTER: &str = "2024-01-02T02:00:00Z";

fn nba_event(id: &str, finalized: bool, home: Option<f64>, away: Option<f64>) -> Event {
    wire_event(json!({
        "eventID": id,
        "leagueID": "NBA",
        "status": {"started": true, "finalized": finalized, "startsAt": START},
        "teams": {
            "home": {"names": {"long": "Boston Celtics", "medium": "Celtics", "short": "BOS"}, "score": home},
            "away": {"names": {"long": "New York Knicks", "medium": "Knicks", "short": "NYK"}, "score": away}
        },
        "players": {
            "JAYSON_TATUM_1_NBA": {"name": "Jayson Tatum", "firstName": "Jayson", "lastName": "Tatum"}
        },
        "results": {"game": {
            "JAYSON_TATUM_1_NBA": {"points": 20, "rebounds": "5", "assists": 7}
        }}
    }))
}

fn moneyline(selection: &str) -> BetMarket {
    BetMarket::Moneyline {
        selection: selection.to_string(),
    }
}

fn prop(player: &str, stat: &str, line: f64) -> BetMarket {
    BetMarket::PlayerProp(PropSelection {
        player_name: player.to_string(),
        player_key: None,
        legacy_player_id: None,
        stat_type: stat.to_string(),
        direction: PropDirection::Over,
        line: Some(line),
    })
}

fn harness_with_final_game() -> Harness {
    let h = Harness::new(AFTER);
    h.provider.insert(nba_event("EVT1", true, Some(100.0), Some(98.0)));
    h
}

fn evt1() -> wager_engine::domain::EventRef {
    event_ref(Some("EVT1"), "Celtics", "Knicks", START)
}

#[tokio::test]
async fn grades_each_market_type() {
    let h = harness_with_final_game();
    let settler = h.settler();

    let cases = vec![
        (moneyline("Celtics"), BetResult::Win),
        (moneyline("Knicks"), BetResult::Loss),
        (
            BetMarket::Spread {
                selection: "Knicks".to_string(),
                line: 3.5,
            },
            BetResult::Win,
        ),
        (
            BetMarket::Total {
                direction: OverUnder::Over,
                line: 198.0,
            },
            BetResult::Push,
        ),
        (prop("Jayson Tatum", "PRA", 30.5), BetResult::Win),
    ];

    for (market, expected) in cases {
        let label = market.label();
        let b = bet(evt1(), market, "-110");
        let settled = settler.settle_bet(&b).await.unwrap();
        assert_eq!(settled.result, expected, "{label}");
    }

    // One provider call; everything after that is served by the cache.
    assert_eq!(h.provider.total_calls(), 1);
}

#[tokio::test]
async fn missing_player_after_game_end_is_void_with_reason() {
    let h = harness_with_final_game();
    let b = bet(evt1(), prop("LeBron James", "Points", 25.5), "-110");

    let settled = h.settler().settle_bet(&b).await.unwrap();
    assert_eq!(settled.result, BetResult::Void);
    assert!(settled.reason.is_some_and(|r| !r.is_empty()));
}

#[tokio::test]
async fn unfinished_or_unavailable_games_stay_pending() {
    let h = Harness::new(AFTER);
    h.provider.insert(nba_event("EVT1", false, Some(100.0), Some(98.0)));
    h.provider.insert(nba_event("EVT2", true, Some(100.0), None));
    let settler = h.settler();

    let not_final = bet(evt1(), moneyline("Celtics"), "-110");
    assert_eq!(settler.settle_bet(&not_final).await.unwrap().result, BetResult::Pending);

    let no_score = bet(event_ref(Some("EVT2"), "Celtics", "Knicks", START), moneyline("Celtics"), "-110");
    assert_eq!(settler.settle_bet(&no_score).await.unwrap().result, BetResult::Pending);

    let down = Harness::new(AFTER);
    down.provider.set_failing(true);
    let b = bet(evt1(), moneyline("Celtics"), "-110");
    assert_eq!(down.settler().settle_bet(&b).await.unwrap().result, BetResult::Pending);
}

#[tokio::test]
async fn stale_event_id_settles_through_team_fallback() {
    let h = harness_with_final_game();
    let stale = event_ref(Some("OLD"), "Knicks", "Celtics", START);
    let b = bet(stale, moneyline("Celtics"), "-110");

    assert_eq!(h.settler().settle_bet(&b).await.unwrap().result, BetResult::Win);
}

#[tokio::test]
async fn sweep_settles_legs_before_their_parlay() {
    let h = harness_with_final_game();
    let parent = bet(evt1(), BetMarket::Parlay, "+264");
    let leg1 = bet(evt1(), moneyline("Celtics"), "-150").with_parent(parent.id);
    let leg2 = bet(
        evt1(),
        BetMarket::Total {
            direction: OverUnder::Under,
            line: 250.5,
        },
        "-110",
    )
    .with_parent(parent.id);
    let parent_id = parent.id;
    h.store.insert(parent);
    h.store.insert(leg1);
    h.store.insert(leg2);

    let report = run_sweep(h.store.as_ref(), &h.settler(), h.clock.as_ref(), 100)
        .await
        .unwrap();
    assert_eq!(report.examined, 3);
    assert_eq!(report.settled, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.locked, 3);
    assert_eq!(h.store.get(parent_id).unwrap().result(), BetResult::Win);
}

#[tokio::test]
async fn parlay_outcomes() {
    let h = Harness::new(AFTER);
    h.provider.insert(nba_event("EVT1", true, Some(100.0), Some(98.0)));
    h.provider.insert(nba_event("EVT2", false, None, None));
    let settler = h.settler();

    // Pending leg holds the parent.
    let waiting = bet(evt1(), BetMarket::Parlay, "+300");
    h.store.insert(bet(evt1(), moneyline("Celtics"), "-150").with_parent(waiting.id));
    h.store.insert(
        bet(event_ref(Some("EVT2"), "Celtics", "Knicks", START), moneyline("Knicks"), "+130")
            .with_parent(waiting.id),
    );
    assert_eq!(settler.settle_bet(&waiting).await.unwrap().result, BetResult::Pending);

    // A pushed leg voids the parent.
    let pushed = bet(evt1(), BetMarket::Parlay, "+300");
    h.store.insert(bet(evt1(), moneyline("Celtics"), "-150").with_parent(pushed.id));
    h.store.insert(
        bet(
            evt1(),
            BetMarket::Spread {
                selection: "Knicks".to_string(),
                line: 2.0,
            },
            "-110",
        )
        .with_parent(pushed.id),
    );
    let settled = settler.settle_bet(&pushed).await.unwrap();
    assert_eq!(settled.result, BetResult::Void);
    assert!(settled.reason.is_some());

    // A losing leg loses it.
    let lost = bet(evt1(), BetMarket::Parlay, "+300");
    h.store.insert(bet(evt1(), moneyline("Knicks"), "+130").with_parent(lost.id));
    h.store.insert(bet(evt1(), moneyline("Celtics"), "-150").with_parent(lost.id));
    assert_eq!(settler.settle_bet(&lost).await.unwrap().result, BetResult::Loss);

    // No legs at all.
    let empty = bet(evt1(), BetMarket::Parlay, "+300");
    assert_eq!(settler.settle_bet(&empty).await.unwrap().result, BetResult::Void);
}

#[tokio::test]
async fn sweep_counts_failures_and_keeps_going() {
    let h = harness_with_final_game();
    let parent = bet(evt1(), BetMarket::Parlay, "+264");
    h.store.break_legs_of(parent.id);
    h.store.insert(parent);
    let single = bet(evt1(), moneyline("Celtics"), "-150");
    let single_id = single.id;
    h.store.insert(single);

    let report = run_sweep(h.store.as_ref(), &h.settler(), h.clock.as_ref(), 100)
        .await
        .unwrap();
    assert_eq!(report.examined, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.settled, 1);
    assert_eq!(h.store.get(single_id).unwrap().result(), BetResult::Win);
}

#[tokio::test]
async fn sweep_does_not_overwrite_concurrent_settlement() {
    use wager_engine::storage::BetStore;

    let h = harness_with_final_game();
    let b = bet(evt1(), moneyline("Knicks"), "+130");
    let id = b.id;
    h.store.insert(b);
    h.store.freeze_pending();

    // Someone else settles it between our read and our write.
    assert!(h.store.record_result(id, BetResult::Void, Some("manual")).await.unwrap());

    let report = run_sweep(h.store.as_ref(), &h.settler(), h.clock.as_ref(), 100)
        .await
        .unwrap();
    assert_eq!(report.lost_race, 1);
    assert_eq!(report.settled, 0);
    assert_eq!(h.store.get(id).unwrap().result(), BetResult::Void);
}

#[tokio::test]
async fn unreadable_rows_are_counted_without_stopping_the_sweep() {
    let h = harness_with_final_game();
    h.store
        .insert_unreadable(uuid::Uuid::new_v4(), "unknown variant `teaser`");
    let b = bet(evt1(), moneyline("Celtics"), "-150");
    let id = b.id;
    h.store.insert(b);

    let report = run_sweep(h.store.as_ref(), &h.settler(), h.clock.as_ref(), 100)
        .await
        .unwrap();
    assert_eq!(report.examined, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.settled, 1);
    assert_eq!(h.store.get(id).unwrap().result(), BetResult::Win);
}

#[tokio::test]
async fn settling_a_parlay_directly_persists_its_legs() {
    let h = harness_with_final_game();
    let parent = bet(evt1(), BetMarket::Parlay, "+264");
    let leg1 = bet(evt1(), moneyline("Celtics"), "-150").with_parent(parent.id);
    let leg2 = bet(evt1(), moneyline("Knicks"), "+130").with_parent(parent.id);
    let (id1, id2) = (leg1.id, leg2.id);
    h.store.insert(leg1);
    h.store.insert(leg2);

    let settled = h.settler().settle_bet(&parent).await.unwrap();
    assert_eq!(settled.result, BetResult::Loss);
    assert_eq!(h.store.get(id1).unwrap().result(), BetResult::Win);
    assert_eq!(h.store.get(id2).unwrap().result(), BetResult::Loss);
}
