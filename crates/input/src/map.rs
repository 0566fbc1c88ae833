//! Key mapping from terminal events to game actions.

use crate::types::{GameAction, Side};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Map keyboard input to game actions for a single player.
pub fn map_solo_key(key: KeyEvent) -> Option<GameAction> {
    match key.code {
        // Movement
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(GameAction::MoveLeft),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(GameAction::MoveRight),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(GameAction::SoftDrop),

        // Rotation
        KeyCode::Up
        | KeyCode::Char('w')
        | KeyCode::Char('W')
        | KeyCode::Char('x')
        | KeyCode::Char('X') => Some(GameAction::RotateCw),
        KeyCode::Char('z') | KeyCode::Char('Z') => Some(GameAction::RotateCcw),

        // Actions
        KeyCode::Char(' ') => Some(GameAction::HardDrop),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(GameAction::Hold),
        KeyCode::Char('e') | KeyCode::Char('E') | KeyCode::Tab => Some(GameAction::UseModifier),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(GameAction::Pause),

        // Restart
        KeyCode::Char('r') | KeyCode::Char('R') => Some(GameAction::Restart),

        _ => None,
    }
}

/// Map keyboard input for two players sharing one keyboard.
///
/// Player one uses the left hand (WASD), player two the arrows and the keys around them.
pub fn map_battle_key(key: KeyEvent) -> Option<(Side, GameAction)> {
    let one = |action| Some((Side::One, action));
    let two = |action| Some((Side::Two, action));

    match key.code {
        // Player one
        KeyCode::Char('a') | KeyCode::Char('A') => one(GameAction::MoveLeft),
        KeyCode::Char('d') | KeyCode::Char('D') => one(GameAction::MoveRight),
        KeyCode::Char('s') | KeyCode::Char('S') => one(GameAction::SoftDrop),
        KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Char('e') | KeyCode::Char('E') => {
            one(GameAction::RotateCw)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') => one(GameAction::RotateCcw),
        KeyCode::Char(' ') => one(GameAction::HardDrop),
        KeyCode::Char('f') | KeyCode::Char('F') => one(GameAction::Hold),
        KeyCode::Char('g') | KeyCode::Char('G') => one(GameAction::UseModifier),

        // Player two
        KeyCode::Left => two(GameAction::MoveLeft),
        KeyCode::Right => two(GameAction::MoveRight),
        KeyCode::Down => two(GameAction::SoftDrop),
        KeyCode::Up | KeyCode::Char('.') => two(GameAction::RotateCw),
        KeyCode::Char(',') => two(GameAction::RotateCcw),
        KeyCode::Enter => two(GameAction::HardDrop),
        KeyCode::Char('/') => two(GameAction::Hold),
        KeyCode::Char('m') | KeyCode::Char('M') => two(GameAction::UseModifier),

        _ => None,
    }
}

/// Check if key should quit the game.
pub fn should_quit(key: KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn test_movement_keys() {
        assert_eq!(
            map_solo_key(KeyEvent::from(KeyCode::Left)),
            Some(GameAction::MoveLeft)
        );
        assert_eq!(
            map_solo_key(KeyEvent::from(KeyCode::Char('D'))),
            Some(GameAction::MoveRight)
        );
        assert_eq!(
            map_solo_key(KeyEvent::from(KeyCode::Down)),
            Some(GameAction::SoftDrop)
        );
    }

    #[test]
    fn test_action_keys() {
        assert_eq!(
            map_solo_key(KeyEvent::from(KeyCode::Char(' '))),
            Some(GameAction::HardDrop)
        );
        assert_eq!(
            map_solo_key(KeyEvent::from(KeyCode::Char('x'))),
            Some(GameAction::RotateCw)
        );
        assert_eq!(
            map_solo_key(KeyEvent::from(KeyCode::Char('z'))),
            Some(GameAction::RotateCcw)
        );
        assert_eq!(
            map_solo_key(KeyEvent::from(KeyCode::Tab)),
            Some(GameAction::UseModifier)
        );
        assert_eq!(
            map_solo_key(KeyEvent::from(KeyCode::Char('c'))),
            Some(GameAction::Hold)
        );
        assert_eq!(map_solo_key(KeyEvent::from(KeyCode::Char('9'))), None);
    }

    #[test]
    fn test_battle_keys_split_by_side() {
        assert_eq!(
            map_battle_key(KeyEvent::from(KeyCode::Char('a'))),
            Some((Side::One, GameAction::MoveLeft))
        );
        assert_eq!(
            map_battle_key(KeyEvent::from(KeyCode::Char('q'))),
            Some((Side::One, GameAction::RotateCcw))
        );
        assert_eq!(
            map_battle_key(KeyEvent::from(KeyCode::Char('g'))),
            Some((Side::One, GameAction::UseModifier))
        );
        assert_eq!(
            map_battle_key(KeyEvent::from(KeyCode::Left)),
            Some((Side::Two, GameAction::MoveLeft))
        );
        assert_eq!(
            map_battle_key(KeyEvent::from(KeyCode::Enter)),
            Some((Side::Two, GameAction::HardDrop))
        );
        assert_eq!(
            map_battle_key(KeyEvent::from(KeyCode::Char('/'))),
            Some((Side::Two, GameAction::Hold))
        );
        assert_eq!(map_battle_key(KeyEvent::from(KeyCode::Char('p'))), None);
    }

    #[test]
    fn test_quit_keys() {
        assert!(should_quit(KeyEvent::from(KeyCode::Esc)));
        assert!(should_quit(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
        assert!(!should_quit(KeyEvent::from(KeyCode::Char('c'))));
        assert!(!should_quit(KeyEvent::from(KeyCode::Char('q'))));
    }
}
