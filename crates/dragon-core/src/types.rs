// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the storage backends and the scheduling engine.
//!
//! Field names serialize in the camelCase layout the persisted blobs use
//! (`addedAt`, `lastActiveAt`, ...), with `type` and `box` spelled out
//! explicitly since they are Rust keywords.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lowest spaced-repetition box.
pub const MIN_BOX: u8 = 1;

/// Highest spaced-repetition box.
pub const MAX_BOX: u8 = 5;

/// Kind of learning content a review item holds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemType {
    #[default]
    Word,
    Phrase,
    Character,
}

/// Feedback given by the learner on a review attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

impl Grade {
    /// All grades, weakest first.
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];
}

/// One grading event in an item's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the grade was given (ms since epoch).
    pub t: i64,
    pub grade: Grade,
}

/// The unit under spaced repetition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    /// `{type}:{text}`, unique within a profile.
    pub key: String,
    /// Display and playback string.
    pub text: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Mastery tier in `MIN_BOX..=MAX_BOX`.
    #[serde(rename = "box")]
    pub srs_box: u8,
    /// Eligible for review at or after this timestamp (ms since epoch).
    pub due: i64,
    /// Creation timestamp, never changed afterwards.
    pub added_at: i64,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl ReviewItem {
    /// Derive the identity key for a piece of content.
    pub fn key_for(item_type: ItemType, text: &str) -> String {
        format!("{item_type}:{text}")
    }

    /// Whether the item is eligible for review at `now`.
    pub fn is_due(&self, now: i64) -> bool {
        self.due <= now
    }
}

/// Avatar shown for a profile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Avatar {
    #[default]
    Male,
    Female,
    Child,
}

/// Isolation boundary for all scoped state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub avatar: Avatar,
    pub created_at: i64,
    pub last_active_at: i64,
    /// Argon2 PHC string. `None` means the profile is not locked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_hash: Option<String>,
}

impl Profile {
    pub fn is_locked(&self) -> bool {
        self.pin_hash.is_some()
    }
}

/// An append-only record of a domain action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActivityEvent {
    #[serde(rename = "audio.play")]
    AudioPlay {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dialect: Option<String>,
        t: i64,
    },

    #[serde(rename = "srs.grade")]
    SrsGrade { key: String, grade: Grade, t: i64 },

    #[serde(rename = "srs.add")]
    SrsAdd { key: String, t: i64 },

    #[serde(rename = "tone.analysis")]
    ToneAnalysis {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dialect: Option<String>,
        t: i64,
    },
}

impl ActivityEvent {
    /// The `type` tag as persisted.
    pub fn kind(&self) -> &'static str {
        match self {
            ActivityEvent::AudioPlay { .. } => "audio.play",
            ActivityEvent::SrsGrade { .. } => "srs.grade",
            ActivityEvent::SrsAdd { .. } => "srs.add",
            ActivityEvent::ToneAnalysis { .. } => "tone.analysis",
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            ActivityEvent::AudioPlay { t, .. }
            | ActivityEvent::SrsGrade { t, .. }
            | ActivityEvent::SrsAdd { t, .. }
            | ActivityEvent::ToneAnalysis { t, .. } => *t,
        }
    }
}

/// Which storage backend is serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    /// JSON blobs in a key-value store.
    Local,
    /// Embedded SQLite database.
    Relational,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn key_is_type_colon_text() {
        assert_eq!(ReviewItem::key_for(ItemType::Word, "你好"), "word:你好");
        assert_eq!(ReviewItem::key_for(ItemType::Character, "玉"), "character:玉");
    }

    #[test]
    fn review_item_uses_persisted_field_names() {
        let item = ReviewItem {
            key: "phrase:谢谢你".into(),
            text: "谢谢你".into(),
            item_type: ItemType::Phrase,
            srs_box: 2,
            due: 10,
            added_at: 5,
            history: vec![HistoryEntry {
                t: 7,
                grade: Grade::Good,
            }],
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "phrase");
        assert_eq!(value["box"], 2);
        assert_eq!(value["addedAt"], 5);
        assert_eq!(value["history"][0]["grade"], "good");
    }

    #[test]
    fn missing_history_decodes_as_empty() {
        let json = r#"{"key":"word:a","text":"a","type":"word","box":1,"due":0,"addedAt":0}"#;
        let item: ReviewItem = serde_json::from_str(json).unwrap();
        assert!(item.history.is_empty());
    }

    #[test]
    fn activity_event_is_tagged_by_type() {
        let ev = ActivityEvent::SrsGrade {
            key: "word:你好".into(),
            grade: Grade::Easy,
            t: 42,
        };
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(value["type"], "srs.grade");
        assert_eq!(value["grade"], "easy");
        assert_eq!(ev.kind(), "srs.grade");
        assert_eq!(ev.timestamp(), 42);

        let audio: ActivityEvent =
            serde_json::from_str(r#"{"type":"audio.play","text":"你好","t":1}"#).unwrap();
        assert_eq!(
            audio,
            ActivityEvent::AudioPlay {
                text: "你好".into(),
                dialect: None,
                t: 1
            }
        );
    }

    #[test]
    fn enums_parse_from_lowercase() {
        assert_eq!(Grade::from_str("again").unwrap(), Grade::Again);
        assert_eq!(ItemType::from_str("character").unwrap(), ItemType::Character);
        assert_eq!(Avatar::from_str("child").unwrap(), Avatar::Child);
        assert_eq!(BackendKind::Relational.to_string(), "relational");
    }

    #[test]
    fn profile_without_pin_omits_hash() {
        let profile = Profile {
            id: "p1".into(),
            name: "Mei".into(),
            avatar: Avatar::Female,
            created_at: 1,
            last_active_at: 2,
            pin_hash: None,
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("pinHash"));
        assert!(!profile.is_locked());
    }
}
