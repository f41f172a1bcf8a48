// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user request pacing for the Parley relay.
//!
//! [`PacingGate`] admits at most one action per user per action class within
//! the class cooldown, using an atomic set-if-absent ticket in a
//! [`parley_core::TicketCache`]. Cache failures fail open.
//! [`MemoryTicketCache`] is the in-process cache used by `parley serve`.

pub mod gate;
pub mod memory;

pub use gate::{Admission, PacingGate, wait_seconds};
pub use memory::MemoryTicketCache;
