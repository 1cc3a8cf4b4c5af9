//! Human-in-the-loop requests raised by the calling agent mid-call.
//!
//! `registry` and `countdown` hold the data, `dispatch` is the state
//! machine over it, `client` runs that machine on a task and `submit`
//! posts operator answers.

pub mod client;
pub mod countdown;
pub mod dispatch;
pub mod registry;
pub mod submit;

pub use client::{HitlClient, HitlHandle, PendingSummary};
pub use dispatch::{Effect, ExpiryNotice, HitlEvent, HitlState, LinkStatus, SubmitOutcome};
pub use registry::HitlRegistry;
