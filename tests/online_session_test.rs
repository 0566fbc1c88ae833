//! Two real clients matched through a real broker.

use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use blockfall::adapter::{
    run_broker, LinkConfig, NetLink, OnlineSession, ServerConfig, SessionPhase,
};
use blockfall::core::{EndReason, RuleConfig};
use blockfall::types::{GameAction, Side, TICK_MS};

fn start_broker(rt: &tokio::runtime::Runtime) -> String {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        sequence_len: 100,
        ..ServerConfig::default()
    };
    let (ready_tx, ready_rx) = oneshot::channel();
    rt.spawn(async move {
        let _ = run_broker(config, Some(ready_tx)).await;
    });
    let addr = rt
        .block_on(async { tokio::time::timeout(Duration::from_secs(2), ready_rx).await })
        .expect("broker did not signal ready")
        .expect("ready channel dropped");
    addr.to_string()
}

fn session(server: &str, name: &str) -> OnlineSession<NetLink> {
    let link = NetLink::start(LinkConfig {
        server: server.to_string(),
        player_name: name.to_string(),
    })
    .unwrap();
    let rules = RuleConfig {
        debuff_chance: 0.0,
        ..RuleConfig::default()
    };
    OnlineSession::new(link, rules, 17)
}

fn pump_until(
    sessions: &mut [&mut OnlineSession<NetLink>],
    done: impl Fn(&[&mut OnlineSession<NetLink>]) -> bool,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done(sessions) {
        assert!(Instant::now() < deadline, "timed out");
        for s in sessions.iter_mut() {
            s.pump();
            s.tick(TICK_MS);
        }
        std::thread::sleep(Duration::from_millis(TICK_MS as u64));
    }
}

#[test]
fn online_sessions_match_and_mirror_each_other() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = start_broker(&rt);

    let mut ann = session(&server, "ann");
    pump_until(&mut [&mut ann], |s| s[0].phase() == SessionPhase::Waiting);

    let mut bob = session(&server, "bob");
    pump_until(&mut [&mut ann, &mut bob], |s| {
        s.iter().all(|x| x.phase() == SessionPhase::Playing)
    });

    assert_eq!(ann.battle().unwrap().side(), Side::One);
    assert_eq!(bob.battle().unwrap().side(), Side::Two);
    assert_eq!(ann.opponent_name(), Some("bob"));
    assert_eq!(ann.game_id(), bob.game_id());

    // Bob scores; ann's mirror of bob catches up through OPPONENT_STATE.
    bob.apply_action(GameAction::HardDrop);
    let bob_score = bob.battle().unwrap().local().score();
    assert!(bob_score > 0);
    pump_until(&mut [&mut ann, &mut bob], |s| {
        s[0].battle().unwrap().remote().score() == bob_score
    });

    // Bob leaves; ann wins by disconnect.
    drop(bob);
    pump_until(&mut [&mut ann], |s| s[0].phase() == SessionPhase::Finished);
    let result = ann.result().unwrap();
    assert_eq!(result.winner, Some(Side::One));
    assert_eq!(result.reason, EndReason::OpponentDisconnected);
}
