//! HTTP access to the call-orchestration backend.

mod client;

pub use client::BackendClient;
