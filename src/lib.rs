//! calldesk: operator-side client for an AI calling agent.
//!
//! While the agent is on a live call it may stop and ask a human for
//! information. This crate receives those requests (WebSocket push or
//! polling), shows them with a countdown, and posts the operator's answer
//! back before the call times out. It also wraps the backend's dashboard
//! and campaign-planning chat endpoints.

pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod console;
pub mod errors;
pub mod hitl;
pub mod models;
pub mod notification;
pub mod transport;
