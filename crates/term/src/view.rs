//! Text views of game snapshots.
//!
//! Pure: a snapshot goes in, styled lines come out. Each board cell is two columns wide
//! to compensate for the glyph aspect ratio of typical terminals.

use crate::core::snapshot::GameSnapshot;
use crate::core::{Notice, Phase};
use crate::types::{DebuffKind, ModifierKind, Rgb};

const FILLED: &str = "██";
const GHOST: &str = "[]";
const EMPTY: &str = " .";
const INKED: &str = "▓▓";

const FRAME_COLOR: Rgb = Rgb::new(120, 120, 140);
const GHOST_COLOR: Rgb = Rgb::new(90, 90, 100);
const INK_COLOR: Rgb = Rgb::new(30, 30, 40);
const LABEL_COLOR: Rgb = Rgb::new(200, 200, 120);
const ALERT_COLOR: Rgb = Rgb::new(230, 80, 80);

/// Gap between the board frame and the side panel, and between two boards.
const GAP: usize = 2;

/// A run of text with one foreground color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub fg: Option<Rgb>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: impl Into<String>) -> Self {
        let mut line = Self::new();
        line.push(text, None);
        line
    }

    pub fn push(&mut self, text: impl Into<String>, fg: Option<Rgb>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        // Merge with the previous span when the color matches.
        if let Some(last) = self.spans.last_mut() {
            if last.fg == fg {
                last.text.push_str(&text);
                return;
            }
        }
        self.spans.push(Span { text, fg });
    }

    pub fn append(&mut self, other: Line) {
        for span in other.spans {
            self.push(span.text, span.fg);
        }
    }

    /// Display width in columns (one per char).
    pub fn width(&self) -> usize {
        self.spans.iter().map(|s| s.text.chars().count()).sum()
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    fn pad_to(&mut self, width: usize) {
        let w = self.width();
        if w < width {
            self.push(" ".repeat(width - w), None);
        }
    }
}

/// Render one player: the framed board on the left, the status panel on the right.
///
/// Ink covers the middle third of the well. Earthquake shakes the board one column
/// sideways, alternating every 100 ms of the effect's remaining time.
pub fn render_lines(snap: &GameSnapshot) -> Vec<Line> {
    let board = board_lines(snap);
    let panel = panel_lines(snap);
    let board_width = board.first().map(Line::width).unwrap_or(0);

    let rows = board.len().max(panel.len());
    let mut out = Vec::with_capacity(rows);
    for i in 0..rows {
        let mut line = board.get(i).cloned().unwrap_or_default();
        if let Some(p) = panel.get(i) {
            line.pad_to(board_width + GAP);
            line.append(p.clone());
        }
        out.push(line);
    }
    out
}

/// Render two players side by side under a header with the match clock.
pub fn render_battle_lines(
    one: &GameSnapshot,
    two: &GameSnapshot,
    remaining_ms: u64,
    banner: Option<&str>,
) -> Vec<Line> {
    let left = render_lines(one);
    let right = render_lines(two);
    let left_width = left.iter().map(Line::width).max().unwrap_or(0);

    let mut out = Vec::with_capacity(left.len().max(right.len()) + 2);
    let mut header = Line::new();
    header.push(format!("TIME {}", format_clock(remaining_ms)), Some(LABEL_COLOR));
    if let Some(banner) = banner {
        header.push(format!("   {banner}"), Some(ALERT_COLOR));
    }
    out.push(header);
    out.push(Line::new());

    for i in 0..left.len().max(right.len()) {
        let mut line = left.get(i).cloned().unwrap_or_default();
        if let Some(r) = right.get(i) {
            line.pad_to(left_width + GAP * 2);
            line.append(r.clone());
        }
        out.push(line);
    }
    out
}

/// `m:ss`, rounding partial seconds up so the clock never shows 0:00 early.
pub fn format_clock(remaining_ms: u64) -> String {
    let secs = remaining_ms.div_ceil(1000);
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn board_lines(snap: &GameSnapshot) -> Vec<Line> {
    let width = snap.width as usize;
    let height = snap.height as usize;

    let mut grid: Vec<Vec<(&str, Option<Rgb>)>> = snap
        .board
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Some(rgb) => (FILLED, Some(*rgb)),
                    None => (EMPTY, Some(GHOST_COLOR)),
                })
                .collect()
        })
        .collect();

    let mut paint = |cells: &[(i8, i8)], glyph: &'static str, color: Rgb, overwrite: bool| {
        for &(x, y) in cells {
            if x < 0 || y < 0 || x as usize >= width || y as usize >= height {
                continue;
            }
            let slot = &mut grid[y as usize][x as usize];
            if overwrite || slot.0 == EMPTY {
                *slot = (glyph, Some(color));
            }
        }
    };
    if let Some(ghost) = &snap.ghost {
        paint(ghost, GHOST, GHOST_COLOR, false);
    }
    if let Some(piece) = &snap.current {
        paint(&piece.cells, FILLED, piece.color, true);
    }

    if snap.has_effect(DebuffKind::Ink) {
        for row in grid.iter_mut().take(height * 2 / 3).skip(height / 3) {
            for slot in row.iter_mut() {
                *slot = (INKED, Some(INK_COLOR));
            }
        }
    }

    let shaken = snap
        .effects
        .iter()
        .find(|e| e.kind == ModifierKind::Debuff(DebuffKind::Earthquake))
        .and_then(|e| e.remaining_ms)
        .is_some_and(|ms| (ms / 100) % 2 == 1);
    let indent = if shaken { " " } else { "" };

    let mut out = Vec::with_capacity(height + 2);
    let edge = "─".repeat(width * 2);
    let mut top = Line::plain(indent);
    top.push(format!("┌{edge}┐"), Some(FRAME_COLOR));
    out.push(top);
    for row in grid {
        let mut line = Line::plain(indent);
        line.push("│", Some(FRAME_COLOR));
        for (glyph, fg) in row {
            line.push(glyph, fg);
        }
        line.push("│", Some(FRAME_COLOR));
        out.push(line);
    }
    let mut bottom = Line::plain(indent);
    bottom.push(format!("└{edge}┘"), Some(FRAME_COLOR));
    out.push(bottom);

    // Keep the frame width stable while shaking.
    if !shaken {
        for line in &mut out {
            line.push(" ", None);
        }
    }
    out
}

fn panel_lines(snap: &GameSnapshot) -> Vec<Line> {
    let mut out = Vec::new();
    let label = |name: &str, value: String| {
        let mut line = Line::new();
        line.push(format!("{name:<8}"), Some(LABEL_COLOR));
        line.push(value, None);
        line
    };

    out.push(label("NEXT", snap.next.unwrap_or("??").to_string()));
    let held = match snap.held {
        Some(symbol) if snap.can_hold => symbol.to_string(),
        Some(symbol) => format!("{symbol} (used)"),
        None => "-".to_string(),
    };
    out.push(label("HOLD", held));
    out.push(Line::new());
    out.push(label("SCORE", snap.score.to_string()));
    out.push(label("LEVEL", snap.level.to_string()));
    out.push(label("LINES", snap.lines.to_string()));

    if snap.pending_garbage > 0 {
        let mut line = label("GARBAGE", String::new());
        line.push(snap.pending_garbage.to_string(), Some(ALERT_COLOR));
        out.push(line);
    }

    if !snap.inventory.is_empty() {
        let items: Vec<&str> = snap.inventory.iter().map(|k| k.as_str()).collect();
        out.push(Line::new());
        out.push(label("ITEMS", items.join(", ")));
    }
    if snap.powerup_block {
        out.push(Line::plain("* power-up piece *"));
    }

    if !snap.effects.is_empty() {
        out.push(Line::new());
        for effect in &snap.effects {
            let detail = match (effect.remaining_ms, effect.blocks_left) {
                (Some(ms), _) => format!("{}.{}s", ms / 1000, (ms % 1000) / 100),
                (None, Some(n)) => format!("x{n}"),
                (None, None) => String::new(),
            };
            let mut line = Line::new();
            line.push(format!("{} {detail}", effect.kind.as_str()), Some(ALERT_COLOR));
            out.push(line);
        }
    }

    if let Some(notice) = snap.notice {
        out.push(Line::new());
        let mut line = Line::new();
        line.push(notice_text(notice), Some(ALERT_COLOR));
        out.push(line);
    }

    if snap.phase == Phase::ToppedOut {
        out.push(Line::new());
        let mut line = Line::new();
        line.push("GAME OVER", Some(ALERT_COLOR));
        out.push(line);
    } else if snap.paused {
        out.push(Line::new());
        out.push(Line::plain("PAUSED"));
    }
    out
}

fn notice_text(notice: Notice) -> String {
    match notice {
        Notice::InventoryFull => "INVENTORY FULL".to_string(),
        Notice::InventoryEmpty => "NO ITEMS".to_string(),
        Notice::PowerUpAwarded(kind) => format!("got {}", kind.as_str()),
        Notice::DebuffGranted(kind) => format!("got {}", kind.as_str()),
        Notice::ModifierUsed(kind) => format!("used {}", kind.as_str()),
        Notice::DebuffReceived(kind) => format!("hit by {}", kind.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Controller, RuleConfig};
    use crate::types::GameMode;

    fn started(mode: GameMode) -> Controller {
        let mut ctl = Controller::new(mode, RuleConfig::default(), 7);
        ctl.start();
        ctl
    }

    fn all_text(lines: &[Line]) -> String {
        lines.iter().map(|l| l.text() + "\n").collect()
    }

    #[test]
    fn test_line_merges_same_color_spans() {
        let mut line = Line::new();
        line.push("ab", None);
        line.push("cd", None);
        line.push("ef", Some(FRAME_COLOR));
        line.push("", None);
        assert_eq!(line.spans.len(), 2);
        assert_eq!(line.text(), "abcdef");
        assert_eq!(line.width(), 6);
    }

    #[test]
    fn test_board_is_framed_two_columns_per_cell() {
        let snap = started(GameMode::Classic).snapshot();
        let lines = render_lines(&snap);
        assert!(lines.len() >= 22);
        assert!(lines[0].text().starts_with('┌'));
        assert!(lines[21].text().starts_with('└'));
        // Frame: 10 cells * 2 columns + 2 borders.
        let top: String = lines[0].text().chars().take(22).collect();
        assert!(top.ends_with('┐'));
    }

    #[test]
    fn test_panel_shows_counters_and_pieces() {
        let snap = started(GameMode::Classic).snapshot();
        let text = all_text(&render_lines(&snap));
        assert!(text.contains("SCORE   0"));
        assert!(text.contains("LEVEL   1"));
        assert!(text.contains(&format!("NEXT    {}", snap.next.unwrap())));
        assert!(text.contains("HOLD    -"));
        assert!(!text.contains("GAME OVER"));
    }

    #[test]
    fn test_current_piece_is_drawn() {
        let snap = started(GameMode::Classic).snapshot();
        let piece = snap.current.clone().unwrap();
        let (x, y) = piece.cells[0];
        let row = render_lines(&snap)[y as usize + 1].text();
        let col = 1 + x as usize * 2;
        let glyph: String = row.chars().skip(col).take(2).collect();
        assert_eq!(glyph, FILLED);
    }

    #[test]
    fn test_fog_hides_next() {
        let mut ctl = started(GameMode::Battle);
        ctl.apply_debuff(DebuffKind::Fog, 5_000);
        let text = all_text(&render_lines(&ctl.snapshot()));
        assert!(text.contains("NEXT    ??"));
        assert!(text.contains("fog 5.0s"));
    }

    #[test]
    fn test_ink_covers_middle_rows() {
        let mut ctl = started(GameMode::Battle);
        ctl.apply_debuff(DebuffKind::Ink, 5_000);
        let lines = render_lines(&ctl.snapshot());
        // Board row 10 sits on line 11 below the top frame.
        assert!(lines[11].text().contains(INKED));
        assert!(!lines[1].text().contains(INKED));
        assert!(!lines[20].text().contains(INKED));
    }

    #[test]
    fn test_battle_view_places_boards_side_by_side() {
        let one = started(GameMode::Battle).snapshot();
        let two = started(GameMode::Battle).snapshot();
        let lines = render_battle_lines(&one, &two, 61_500, Some("PLAYER 1 WINS"));
        assert_eq!(lines[0].text(), "TIME 1:02   PLAYER 1 WINS");
        assert_eq!(lines[2].text().matches('┌').count(), 2);
    }

    #[test]
    fn test_clock_format() {
        assert_eq!(format_clock(180_000), "3:00");
        assert_eq!(format_clock(59_001), "1:00");
        assert_eq!(format_clock(9_000), "0:09");
        assert_eq!(format_clock(0), "0:00");
    }
}
