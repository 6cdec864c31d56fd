// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions at the seams between the engine and its backends.
//!
//! Traits use `#[async_trait]` so they stay object safe behind `Arc<dyn _>`.

pub mod storage;

pub use storage::StorageBackend;
