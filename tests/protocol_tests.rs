//! Protocol tests - wire format of the online battle messages

use blockfall::adapter::protocol::{
    create_debuff, create_game_end, encode, outbound_message, remote_event, GameEndReason,
};
use blockfall::adapter::{parse_message, Message, ParsedMessage};
use blockfall::core::{EndReason, MatchResult, OutboundEvent, RemoteEvent};
use blockfall::types::{DebuffKind, Rgb, Side};

fn known(json: &str) -> Message {
    match parse_message(json).unwrap() {
        ParsedMessage::Known(msg) => msg,
        ParsedMessage::Unknown(t) => panic!("unexpected unknown type {t}"),
    }
}

#[test]
fn test_join_defaults_player_name() {
    assert_eq!(
        known(r#"{"type":"JOIN"}"#),
        Message::Join {
            player_name: "Player".to_string()
        }
    );
}

#[test]
fn test_unknown_type_is_not_an_error() {
    assert_eq!(
        parse_message(r#"{"type":"PING","x":1}"#).unwrap(),
        ParsedMessage::Unknown("PING".to_string())
    );
    assert!(parse_message("{oops").is_err());
    assert!(parse_message(r#"{"type":"GARBAGE","lines":"many"}"#).is_err());
}

#[test]
fn test_opponent_state_fields_are_lenient() {
    let msg = known(
        r#"{"type":"OPPONENT_STATE","grid":[[0,[10,20,30]],[7,0]],"score":"lots","lines":3,
            "piece":{"x":4,"y":"?","shape":[[1,1],[0,1]]}}"#,
    );
    let Some(RemoteEvent::OpponentState(update)) = remote_event(msg) else {
        panic!("expected opponent state");
    };
    let grid = update.grid.unwrap();
    assert_eq!(grid[0], vec![None, Some(Rgb::new(10, 20, 30))]);
    // Anything other than an RGB triple reads as empty.
    assert_eq!(grid[1], vec![None, None]);
    assert_eq!(update.score, None);
    assert_eq!(update.lines, Some(3));

    let piece = update.piece.unwrap();
    assert_eq!(piece.x, Some(4));
    assert_eq!(piece.y, None);
    assert_eq!(
        piece.matrix,
        Some(vec![vec![true, true], vec![false, true]])
    );
}

#[test]
fn test_debuff_duration_in_seconds() {
    let line = encode(&create_debuff(DebuffKind::Ink, 2_500)).unwrap();
    let v: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(v["type"], "DEBUFF");
    assert_eq!(v["debuff"], "ink");
    assert_eq!(v["duration"], 2.5);

    assert_eq!(
        remote_event(known(r#"{"type":"DEBUFF","debuff":"speed_up"}"#)),
        Some(RemoteEvent::Debuff {
            kind: DebuffKind::SpeedUp,
            duration_ms: 5_000
        })
    );
    assert_eq!(
        remote_event(known(r#"{"type":"DEBUFF","debuff":"confetti"}"#)),
        None
    );
}

#[test]
fn test_game_end_roles_and_reasons() {
    let line = encode(&create_game_end(None, GameEndReason::Timeout)).unwrap();
    assert_eq!(line, r#"{"type":"GAME_END","winner":0,"reason":"TIMEOUT"}"#);

    let event = remote_event(known(
        r#"{"type":"GAME_END","winner":2,"reason":"OPPONENT_TOPPED_OUT"}"#,
    ));
    assert_eq!(
        event,
        Some(RemoteEvent::GameEnd(MatchResult {
            winner: Some(Side::Two),
            reason: EndReason::TopOut
        }))
    );
}

#[test]
fn test_outbound_events_map_to_messages() {
    assert_eq!(
        outbound_message(&OutboundEvent::Garbage(2)),
        Message::Garbage { lines: 2 }
    );
    assert_eq!(outbound_message(&OutboundEvent::GameOver), Message::GameOver);
    assert_eq!(
        encode(&Message::TimeSync { remaining: 1500 }).unwrap(),
        r#"{"type":"TIME_SYNC","remaining":1500}"#
    );
    assert_eq!(remote_event(Message::Waiting), None);
}
