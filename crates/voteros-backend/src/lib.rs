// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data gateway for the hosted backend.
//!
//! [`SupabaseGateway`] implements [`DataGateway`](voteros_core::DataGateway)
//! on top of two transports: the REST table surface ([`rest::RestClient`])
//! for point-in-time reads and writes, and the realtime websocket
//! ([`realtime::RealtimeClient`]) for per-table change notifications.

pub mod gateway;
pub mod protocol;
pub mod realtime;
pub mod rest;

pub use gateway::SupabaseGateway;
pub use realtime::RealtimeClient;
pub use rest::RestClient;
