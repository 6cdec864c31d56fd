// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leitner box transitions and review intervals.

use dragon_core::types::{Grade, MAX_BOX, MIN_BOX};
use dragon_core::DAY_MS;

/// Review interval in days, indexed by box. Index 0 is unused.
pub const INTERVAL_DAYS: [i64; 6] = [0, 1, 3, 7, 16, 30];

/// Clamp any requested box into `MIN_BOX..=MAX_BOX`.
pub fn clamp_box(requested: i64) -> u8 {
    requested.clamp(i64::from(MIN_BOX), i64::from(MAX_BOX)) as u8
}

/// Days until the next review for an item in `srs_box`.
pub fn interval_days(srs_box: u8) -> i64 {
    INTERVAL_DAYS[usize::from(clamp_box(i64::from(srs_box)))]
}

/// The box an item moves to after being graded.
pub fn next_box(current: u8, grade: Grade) -> u8 {
    let current = i64::from(clamp_box(i64::from(current)));
    let next = match grade {
        Grade::Again => current - 1,
        Grade::Hard => current,
        Grade::Good => current + 1,
        Grade::Easy => current + 2,
    };
    clamp_box(next)
}

/// Due timestamp for an item that lands in `srs_box` at `now`.
pub fn next_due(now: i64, srs_box: u8) -> i64 {
    now + interval_days(srs_box) * DAY_MS
}
