// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deck commands: `add`, `grade`, `remove`, `due`, `list`, `stats`, `events`.

use std::io::Write;
use std::str::FromStr;

use colored::Colorize;
use serde_json::json;

use dragon_core::DragonError;
use dragon_core::types::{Grade, ItemType, ReviewItem};
use dragon_srs::{AddOptions, AddOutcome};

use crate::app::App;
use crate::output::{self, format_timestamp, item_line, write_json};

fn parse_item_type(raw: &str) -> Result<ItemType, DragonError> {
    ItemType::from_str(&raw.to_ascii_lowercase()).map_err(|_| {
        DragonError::InvalidInput(format!(
            "unknown item type '{raw}' (expected word, phrase or character)"
        ))
    })
}

fn parse_grade(raw: &str) -> Result<Grade, DragonError> {
    Grade::from_str(&raw.to_ascii_lowercase()).map_err(|_| {
        DragonError::InvalidInput(format!(
            "unknown grade '{raw}' (expected again, hard, good or easy)"
        ))
    })
}

/// Accept a full key, or bare text that names a word.
fn resolve_key(app: &App, raw: &str) -> String {
    if app.engine.get(raw).is_some() || raw.contains(':') {
        raw.to_string()
    } else {
        ReviewItem::key_for(ItemType::Word, raw)
    }
}

pub fn add(
    app: &App,
    text: &str,
    item_type: &str,
    initial_box: Option<i64>,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DragonError::InvalidInput("text must not be empty".to_string()));
    }
    let item_type = parse_item_type(item_type)?;

    match app
        .engine
        .add_item(text, item_type, AddOptions { initial_box })
    {
        AddOutcome::Added(item) => writeln!(
            out,
            "added {} (box {}, due {})",
            item.key,
            item.srs_box,
            format_timestamp(item.due)
        )?,
        AddOutcome::Existing(item) => {
            writeln!(out, "{} is already in the deck (box {})", item.key, item.srs_box)?
        }
    }
    Ok(())
}

pub fn grade(
    app: &App,
    key: &str,
    grade: &str,
    use_color: bool,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    let grade = parse_grade(grade)?;
    let key = resolve_key(app, key);

    match app.engine.grade_item(&key, grade) {
        Some(item) => {
            let label = if use_color {
                match grade {
                    Grade::Again => grade.to_string().red().to_string(),
                    Grade::Hard => grade.to_string().yellow().to_string(),
                    Grade::Good | Grade::Easy => grade.to_string().green().to_string(),
                }
            } else {
                grade.to_string()
            };
            writeln!(
                out,
                "{} graded {label}: box {}, next review {}",
                item.key,
                item.srs_box,
                format_timestamp(item.due)
            )?;
        }
        None => writeln!(out, "{key} is not in the deck")?,
    }
    Ok(())
}

pub fn remove(app: &App, key: &str, out: &mut dyn Write) -> Result<(), DragonError> {
    let key = resolve_key(app, key);
    match app.engine.remove_item(&key) {
        Some(item) => writeln!(out, "removed {}", item.key)?,
        None => writeln!(out, "{key} is not in the deck")?,
    }
    Ok(())
}

pub fn due(
    app: &App,
    limit: Option<usize>,
    json: bool,
    use_color: bool,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    let now = app.engine.now();
    let mut items = app.engine.list_due(now).into_vec();
    let total = items.len();
    if let Some(limit) = limit {
        items.truncate(limit);
    }

    if json {
        return write_json(out, &items);
    }
    if items.is_empty() {
        writeln!(out, "nothing due")?;
        return Ok(());
    }
    writeln!(out, "{total} due")?;
    for item in &items {
        writeln!(out, "{}", item_line(item, now, use_color))?;
    }
    if items.len() < total {
        writeln!(out, "  ... {} more", total - items.len())?;
    }
    Ok(())
}

pub fn list(app: &App, json: bool, out: &mut dyn Write) -> Result<(), DragonError> {
    let items = app.engine.list_all();
    if json {
        return write_json(out, &items);
    }
    let now = app.engine.now();
    for item in &items {
        writeln!(out, "{}", item_line(item, now, false))?;
    }
    writeln!(out, "{} item(s)", items.len())?;
    Ok(())
}

pub fn stats(app: &App, json: bool, out: &mut dyn Write) -> Result<(), DragonError> {
    let stats = app.engine.stats(app.engine.now());
    if json {
        return write_json(
            out,
            &json!({
                "total": stats.total,
                "due": stats.due,
                "perBox": stats.per_box,
            }),
        );
    }
    writeln!(out, "total: {}", stats.total)?;
    writeln!(out, "due:   {}", stats.due)?;
    for (i, count) in stats.per_box.iter().enumerate() {
        writeln!(out, "box {}: {count}", i + 1)?;
    }
    Ok(())
}

/// Print or clear the current profile's activity log.
///
/// Reads go to the backend, so pending engine writes are flushed first.
pub async fn events(
    app: &App,
    clear: bool,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    app.engine.flush().await;
    let profile = app.current_profile().await?;

    if clear {
        app.backend.events_clear(profile.as_deref()).await?;
        writeln!(out, "activity log cleared")?;
        return Ok(());
    }

    let events = app.backend.events_read_all(profile.as_deref()).await?;
    if json {
        return write_json(out, &events);
    }
    for event in &events {
        writeln!(
            out,
            "  {} {:<14} {}",
            output::format_timestamp(event.timestamp()),
            event.kind(),
            serde_json::to_string(event)?
        )?;
    }
    writeln!(out, "{} event(s)", events.len())?;
    Ok(())
}
