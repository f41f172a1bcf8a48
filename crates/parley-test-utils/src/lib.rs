// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock completion provider with scripted results
//! - [`MockChannel`] - Mock messaging channel with message injection and capture
//! - [`MockHistory`] - In-memory history store with switchable failures
//! - [`FailingCache`] - Ticket cache that always errors
//! - [`TestHarness`] - Orchestrator wired to the mocks and a temp SQLite file

pub mod harness;
pub mod mock_channel;
pub mod mock_history;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_channel::{MockChannel, inbound_text};
pub use mock_history::{FailingCache, MockHistory};
pub use mock_provider::{MockProvider, RecordedRequest};
