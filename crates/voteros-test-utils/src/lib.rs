// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for VoterOS integration tests.
//!
//! Provides an in-memory gateway and row builders for fast, deterministic
//! tests without a backend.
//!
//! # Components
//!
//! - [`MockGateway`] - in-memory `DataGateway` with injectable change events,
//!   failure switches, and captured writes
//! - [`records`] - JSON row builders shaped like the backend tables

pub mod mock_gateway;
pub mod records;

pub use mock_gateway::MockGateway;
