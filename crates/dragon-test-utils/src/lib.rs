// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Dragon Bridge integration tests.
//!
//! - [`MockBackend`] - in-memory storage backend with failure injection,
//!   call recording and gates that hold writes or loads until released.

pub mod mock_backend;

pub use mock_backend::{MockBackend, RecordedCall};
