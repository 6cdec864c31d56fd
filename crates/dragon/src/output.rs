// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal formatting shared by the command handlers.

use std::io::{IsTerminal, Write};

use colored::Colorize;
use dragon_core::types::ReviewItem;
use dragon_core::{DAY_MS, DragonError};

/// Colors are on unless `--plain` was given or stdout is not a TTY.
pub fn use_color(plain: bool) -> bool {
    !plain && std::io::stdout().is_terminal()
}

pub fn print_error(err: &DragonError, use_color: bool) {
    if use_color {
        eprintln!("{} {err}", "error:".red().bold());
    } else {
        eprintln!("error: {err}");
    }
}

/// `2026-01-05 08:30` in UTC, or the raw value if it is out of range.
pub fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// How far `due` is from `now`, in whole days.
pub fn relative_due(due: i64, now: i64) -> String {
    let delta = due - now;
    if delta <= 0 {
        return "due".to_string();
    }
    let days = (delta + DAY_MS - 1) / DAY_MS;
    if days == 1 {
        "in 1 day".to_string()
    } else {
        format!("in {days} days")
    }
}

/// One table row: box, key, due date.
pub fn item_line(item: &ReviewItem, now: i64, use_color: bool) -> String {
    let due = relative_due(item.due, now);
    let due = if use_color && item.is_due(now) {
        due.green().to_string()
    } else {
        due
    };
    format!(
        "  [{}] {:<24} {} ({})",
        item.srs_box,
        item.key,
        format_timestamp(item.due),
        due
    )
}

/// Pretty-print `value` as JSON on its own line.
pub fn write_json<T: serde::Serialize + ?Sized>(
    out: &mut dyn Write,
    value: &T,
) -> Result<(), DragonError> {
    let rendered = serde_json::to_string_pretty(value)?;
    writeln!(out, "{rendered}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(1_735_689_600_000), "2025-01-01 00:00");
    }

    #[test]
    fn relative_due_rounds_up_to_days() {
        assert_eq!(relative_due(100, 100), "due");
        assert_eq!(relative_due(50, 100), "due");
        assert_eq!(relative_due(1 + DAY_MS / 2, 1), "in 1 day");
        assert_eq!(relative_due(3 * DAY_MS, 0), "in 3 days");
    }
}
