// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component A — Agent Link Manager (§4.A). One logical duplex session per
//! connected agent: inbound telemetry/checkResult frames, outbound commands,
//! liveness tracking, and identity.

pub mod auth;
pub mod commands;
pub mod session;
pub mod sweeper;
pub mod ws;

pub use auth::AuthRateLimiter;
pub use session::{AgentSession, InboundFrame, SessionTable};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
