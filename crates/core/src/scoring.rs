//! Scoring module - line clears, drops, levels and gravity speed
//!
//! All functions are pure and take their tables from [`RuleConfig`] so a tuned rule set
//! flows through without touching the controller.
//!
//! - A `k`-line clear awards `line_scores[k] * level * multiplier`, truncated.
//! - Levels start at 1 and advance every `lines_per_level` lines.
//! - The fall interval is `base * factor^(level - 1)`, floored, and halved under the
//!   speed-up debuff.

use crate::rules::RuleConfig;

/// Points for clearing `lines` rows at once.
///
/// Clears larger than the table (a vertical pentomino I clears five) use its last entry.
pub fn line_clear_score(rules: &RuleConfig, lines: u32, level: u32, multiplier: f64) -> u32 {
    if lines == 0 {
        return 0;
    }
    let table = &rules.line_scores;
    let base = table
        .get(lines as usize)
        .or_else(|| table.last())
        .copied()
        .unwrap_or(0);
    (base as f64 * level as f64 * multiplier) as u32
}

/// Points for a manual drop of `rows` rows.
pub fn drop_score(rules: &RuleConfig, rows: u32, hard: bool) -> u32 {
    let per_row = if hard {
        rules.hard_drop_score
    } else {
        rules.soft_drop_score
    };
    rows * per_row
}

/// Level reached after clearing `total_lines` lines.
pub fn level_for_lines(rules: &RuleConfig, total_lines: u32) -> u32 {
    total_lines / rules.lines_per_level.max(1) + 1
}

/// Milliseconds between automatic fall steps.
pub fn fall_interval_ms(rules: &RuleConfig, level: u32, speed_up: bool) -> u32 {
    let exponent = level.saturating_sub(1) as i32;
    let interval = rules.base_fall_ms as f64 * rules.fall_speed_factor.powi(exponent);
    let interval = (interval as u32).max(rules.min_fall_ms);
    if speed_up {
        (interval / 2).max(1)
    } else {
        interval
    }
}

/// Garbage rows sent to the opponent for a clear of `lines`.
///
/// Clears larger than the table use its last entry.
pub fn garbage_for_clear(rules: &RuleConfig, lines: u32) -> u32 {
    let table = &rules.garbage_table;
    table
        .get(lines as usize)
        .or_else(|| table.last())
        .copied()
        .unwrap_or(0)
}
