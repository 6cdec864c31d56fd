// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spaced-repetition scheduling for Dragon Bridge.
//!
//! - [`SchedulingEngine`]: in-memory item map for the active profile with
//!   Leitner-box grading and fire-and-forget persistence.
//! - [`ProfileManager`]: profile list, current-profile pointer, PIN locks
//!   and per-profile settings. Switching publishes
//!   [`dragon_bus::BusEvent::ProfileChanged`], which running engines follow.

pub mod algorithm;
pub mod engine;
pub mod persist;
pub mod profiles;

pub use engine::{AddOptions, AddOutcome, ReviewQueue, SchedulingEngine, Stats};
pub use persist::{PersistOp, PersistQueue};
pub use profiles::{ProfileManager, SwitchOutcome};
